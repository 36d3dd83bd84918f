//! # Dockhand Terminal Detection (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//!
//! ## Overview
//!
//! Progress rendering behaves differently depending on where standard output
//! goes. On an interactive terminal, rows are redrawn in place with ANSI cursor
//! movements and a progress bar sized for the terminal width. Anywhere else
//! (pipes, files, CI logs) only the stable lines are printed.
//!
//! `TerminalInfo` captures both facts once, at the start of a rendering
//! session, and is then passed by value to the renderer. Nothing in the
//! rendering path queries the terminal again.
//!
//! ## Examples
//!
//! ```rust
//! use crate::common::ui::TerminalInfo;
//!
//! let terminal = TerminalInfo::detect_stdout();
//! if terminal.is_terminal {
//!     println!("rendering live progress in {} columns", terminal.width);
//! }
//! ```
//!
use is_terminal::IsTerminal;
use terminal_size::{terminal_size, Width};
use tracing::debug;

/// Width assumed when stdout is a terminal whose size cannot be queried.
pub const DEFAULT_TERMINAL_WIDTH: u16 = 200;

/// Output-device facts captured once per rendering session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalInfo {
    /// Whether stdout is an interactive terminal.
    pub is_terminal: bool,
    /// Terminal width in columns.
    pub width: u16,
}

impl TerminalInfo {
    /// Builds a `TerminalInfo` from known values.
    pub fn new(is_terminal: bool, width: u16) -> Self {
        Self { is_terminal, width }
    }

    /// Non-terminal output. Used for quiet mode and whenever output is discarded.
    pub fn plain() -> Self {
        Self::new(false, 0)
    }

    /// Inspects the process's standard output.
    pub fn detect_stdout() -> Self {
        let is_terminal = std::io::stdout().is_terminal();
        let width = match terminal_size() {
            Some((Width(w), _)) if w > 0 => w,
            _ => DEFAULT_TERMINAL_WIDTH,
        };
        let info = Self::new(is_terminal, width);
        debug!("Detected output terminal: {:?}", info);
        info
    }
}
