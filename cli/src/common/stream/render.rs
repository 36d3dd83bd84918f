//! # Progress Rendering (`common::stream::render`)
//!
//! File: cli/src/common/stream/render.rs
//!
//! ## Overview
//!
//! `TerminalRenderer` turns decoded `ProgressMessage`s into output lines.
//!
//! On a terminal, every message that carries both an `id` and progress owns a
//! row. Rows are numbered in the order their ids first appear. The cursor rests
//! on the line below the last row; updating a row moves the cursor up by
//! `diff = rows - row`, redraws the line, and moves back down by the same amount.
//! A new id is drawn where the cursor rests (`diff = 0`) and then a newline
//! opens the resting line below it.
//!
//! Off a terminal there are no cursor movements, and progress updates without
//! stream text are not printed at all. Stream text is always printed verbatim.
//!
//! ## Line layout
//!
//! ```text
//! [2014-03-01T10:00:00.000000000Z ]ID: (from IMAGE) STATUS PROGRESS
//! ```
//!
//! The time prefix appears only when the message carries a time.
//!
use crate::core::error::Result;
use anyhow::{anyhow, Context};
use chrono::{DateTime, SecondsFormat};
use std::{collections::HashMap, io::Write};
use tracing::trace;

use super::progress::{ProgressDetail, ProgressMessage};
use crate::common::ui::TerminalInfo;

/// Cells inside the brackets of a progress bar.
const BAR_CELLS: i64 = 50;
/// Narrowest terminal that gets a progress bar.
const BAR_MIN_WIDTH: u16 = 110;
/// Narrowest terminal that gets a time-left estimate.
const ETA_MIN_WIDTH: u16 = 50;

const ERASE_LINE: &str = "\x1b[2K\r";

/// Row bookkeeping for one rendering session.
#[derive(Debug, Default, Clone)]
pub struct RenderState {
    rows: HashMap<String, usize>,
    diff: usize,
}

impl RenderState {
    /// Row assigned to `id`, if it has been seen.
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.rows.get(id).copied()
    }

    /// Distinct ids seen so far.
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Lines between the resting cursor and the row last positioned to.
    pub fn diff(&self) -> usize {
        self.diff
    }

    /// Positions on `id`'s row. Returns `true` if the id is new.
    fn position(&mut self, id: &str) -> bool {
        match self.rows.get(id) {
            Some(&row) => {
                self.diff = self.rows.len() - row;
                false
            }
            None => {
                let row = self.rows.len();
                self.rows.insert(id.to_string(), row);
                self.diff = 0;
                true
            }
        }
    }
}

/// Writes decoded messages to `out`.
pub struct TerminalRenderer<W: Write> {
    out: W,
    terminal: TerminalInfo,
    state: RenderState,
    summary: Option<String>,
    clock: fn() -> i64,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, terminal: TerminalInfo) -> Self {
        Self {
            out,
            terminal,
            state: RenderState::default(),
            summary: None,
            clock: now_unix,
        }
    }

    /// Replaces the clock used for time-left estimates.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Last stream text (trimmed), or the last plain status line.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Renders one message. A message reporting a failure is not printed; the
    /// failure is returned instead.
    pub fn render(&mut self, message: &ProgressMessage) -> Result<()> {
        if let Some(failure) = message.failure() {
            return Err(anyhow!(failure));
        }
        let tty = self.terminal.is_terminal;
        let positioned = !message.id.is_empty() && message.is_progress();
        let mut new_row = false;
        if positioned {
            new_row = self.state.position(&message.id);
            trace!(
                "Row for '{}': {:?}, diff {}",
                message.id,
                self.state.row_of(&message.id),
                self.state.diff
            );
            // ESC[0A still moves one line on common terminals.
            if tty && self.state.diff > 0 {
                write!(self.out, "\x1b[{}A", self.state.diff)?;
            }
        }

        self.display(message)?;

        if positioned && tty {
            if new_row {
                writeln!(self.out)?;
            } else if self.state.diff > 0 {
                write!(self.out, "\x1b[{}B", self.state.diff)?;
            }
        }
        self.out.flush().context("Failed to flush progress output")?;
        self.record_summary(message);
        Ok(())
    }

    fn display(&mut self, message: &ProgressMessage) -> Result<()> {
        let tty = self.terminal.is_terminal;
        let bare_progress = message.is_progress() && message.stream.is_empty();
        if bare_progress && !tty {
            return Ok(());
        }
        let mut line = String::new();
        let mut endl = "";
        if bare_progress {
            line.push_str(ERASE_LINE);
            endl = "\r";
        }
        if message.time != 0 {
            if let Some(time) = DateTime::from_timestamp(message.time, 0) {
                line.push_str(&time.to_rfc3339_opts(SecondsFormat::Nanos, true));
                line.push(' ');
            }
        }
        if !message.id.is_empty() {
            line.push_str(&message.id);
            line.push_str(": ");
        }
        if !message.from.is_empty() {
            line.push_str(&format!("(from {}) ", message.from));
        }

        match (&message.progress_detail, message.progress.as_str()) {
            (Some(detail), _) if tty => {
                let progress = format_progress(detail, self.terminal.width, (self.clock)());
                line.push_str(&format!("{} {}{}", message.status, progress, endl));
            }
            (None, progress) if tty && !progress.is_empty() => {
                line.push_str(&format!("{} {}{}", message.status, progress, endl));
            }
            _ if !message.stream.is_empty() => line.push_str(&message.stream),
            _ => {
                line.push_str(&message.status);
                line.push('\n');
            }
        }
        self.out
            .write_all(line.as_bytes())
            .context("Failed to write progress output")?;
        Ok(())
    }

    fn record_summary(&mut self, message: &ProgressMessage) {
        let stream = message.stream.trim();
        if !stream.is_empty() {
            self.summary = Some(stream.to_string());
        } else if !message.is_progress() && !message.status.is_empty() {
            self.summary = Some(message.status.clone());
        }
    }
}

/// `[=========>        ]  1.234 MB/2.5 MB 3s`
///
/// Empty when neither `current` nor `total` is positive. The bar needs more
/// than 110 columns and the time-left estimate more than 50.
pub fn format_progress(detail: &ProgressDetail, width: u16, now: i64) -> String {
    if detail.current <= 0 && detail.total <= 0 {
        return String::new();
    }
    let current = format!("{:.3} MB", detail.current as f64 / 1e6);
    if detail.total <= 0 {
        return format!("{:>8}", current);
    }
    let total = format!("{:.3} MB", detail.total as f64 / 1e6);
    let percentage = ((detail.current as f64 / detail.total as f64 * 100.0) as i64) / 2;

    let mut out = String::new();
    if width > BAR_MIN_WIDTH {
        let filled = percentage.clamp(0, BAR_CELLS) as usize;
        let spaces = (BAR_CELLS - percentage).max(0) as usize;
        out.push('[');
        out.push_str(&"=".repeat(filled));
        out.push('>');
        out.push_str(&" ".repeat(spaces));
        out.push_str("] ");
    }
    out.push_str(&format!("{:>8}/{}", current, total));

    if detail.current > 0 && detail.start > 0 && percentage < 50 && width > ETA_MIN_WIDTH {
        let elapsed = i128::from((now - detail.start).max(0));
        let remaining = i128::from(detail.total - detail.current);
        let left = remaining * elapsed / i128::from(detail.current);
        out.push(' ');
        out.push_str(&format_duration(left.max(0) as i64));
    }
    out
}

/// Whole seconds as `45s`, `1m30s` or `2h0m5s`.
pub fn format_duration(secs: i64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
