//! # `.dockerignore` Matching (`common::archive::ignore`)
//!
//! File: cli/src/common/archive/ignore.rs
//!
//! ## Overview
//!
//! `IgnoreMatcher` holds the exclusion patterns read from a context's
//! `.dockerignore` and answers whether a context-relative path is excluded.
//!
//! ## Pattern rules
//!
//! - One pattern per line. Blank lines are ignored, no other syntax is special
//!   (no comments, no `!` negation).
//! - Patterns are lexically cleaned (`./a//b/` becomes `a/b`) before use.
//! - Shell glob syntax: `*`, `?`, `[...]`, `[^...]` and `\\` escapes.
//!   Wildcards never cross a `/`, and a run of stars is a single `*`, so `**`
//!   has no recursive meaning.
//! - Inside a class, `]` and `-` must be escaped to be members, so `[]a]` and
//!   `[a-]` are malformed. `!` is an ordinary member, not a negation.
//! - A pattern must match the whole relative path. Excluding a directory
//!   excludes its subtree because the walker never descends into it.
//! - Patterns are compiled once, when the file is loaded. A malformed pattern is
//!   reported there, before any part of the archive is produced.
//!
use crate::core::error::{DockhandError, Result};
use anyhow::anyhow;
use glob::{MatchOptions, Pattern, PatternError};
use std::{fs, io, path::Path};
use tracing::{debug, warn};

use super::DOCKERIGNORE;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled set of exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<Pattern>,
}

impl IgnoreMatcher {
    /// A matcher that excludes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads `<root>/.dockerignore`. A missing file yields an empty matcher;
    /// any other read failure is an `IgnoreFileRead` error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(DOCKERIGNORE);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!("Loading exclusion patterns from {}", path.display());
                Self::parse(&contents)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::empty()),
            Err(e) => Err(anyhow!(DockhandError::IgnoreFileRead {
                path: path.display().to_string(),
                source: e,
            })),
        }
    }

    /// Compiles the patterns in the contents of an ignore file.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut patterns = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let pattern = translate_pattern(&clean_path(line))
                .and_then(|translated| Pattern::new(&translated))
                .map_err(|e| {
                    anyhow!(DockhandError::IgnorePattern {
                        pattern: line.to_string(),
                        source: e,
                    })
                })?;
            patterns.push(pattern);
        }
        debug!("Compiled {} exclusion pattern(s)", patterns.len());
        Ok(Self { patterns })
    }

    /// Number of compiled patterns.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.patterns.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `relative_path` (relative to the context root, `/`-separated)
    /// matches any pattern.
    ///
    /// A pattern that matches the context root itself is skipped with a
    /// warning: excluding the whole context is never what the user meant.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        let path = clean_path(relative_path);
        for pattern in &self.patterns {
            if !pattern.matches_with(&path, MATCH_OPTIONS) {
                continue;
            }
            if path == "." {
                warn!(
                    "Can't exclude whole path, excluding pattern: {}",
                    pattern.as_str()
                );
                continue;
            }
            return true;
        }
        false
    }
}

/// Lexically cleans a `/`-separated path: drops empty and `.` segments,
/// resolves `..` against earlier segments and strips trailing slashes.
/// An empty result is `"."`.
pub(crate) fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

fn bad_pattern(pos: usize, msg: &'static str) -> PatternError {
    PatternError { pos, msg }
}

/// Rewrites a `.dockerignore` pattern into `glob` syntax: star runs collapse,
/// escapes become literals and character classes are re-encoded.
fn translate_pattern(pattern: &str) -> std::result::Result<String, PatternError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                if !out.ends_with('*') {
                    out.push('*');
                }
            }
            '\\' => {
                let c = *chars
                    .get(i + 1)
                    .ok_or_else(|| bad_pattern(i, "dangling escape"))?;
                push_literal(&mut out, c);
                i += 1;
            }
            '[' => i = translate_class(&chars, i, &mut out)?,
            c => out.push(c),
        }
        i += 1;
    }
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    match c {
        '*' | '?' | '[' => {
            out.push('[');
            out.push(c);
            out.push(']');
        }
        _ => out.push(c),
    }
}

/// Reads one class member character at `i`. Unescaped `-` and `]` cannot
/// start a member.
fn class_char(
    chars: &[char],
    i: usize,
    start: usize,
) -> std::result::Result<(char, usize), PatternError> {
    match chars.get(i) {
        None => Err(bad_pattern(start, "unclosed character class")),
        Some('-') | Some(']') => Err(bad_pattern(i, "invalid character class member")),
        Some('\\') => chars
            .get(i + 1)
            .map(|c| (*c, i + 2))
            .ok_or_else(|| bad_pattern(i, "dangling escape")),
        Some(c) => Ok((*c, i + 1)),
    }
}

/// Parses the class opening at `start` and appends its `glob` form. Returns the
/// index of the closing `]`.
fn translate_class(
    chars: &[char],
    start: usize,
    out: &mut String,
) -> std::result::Result<usize, PatternError> {
    let mut i = start + 1;
    let negated = chars.get(i) == Some(&'^');
    if negated {
        i += 1;
    }
    let mut ranges = Vec::new();
    loop {
        match chars.get(i) {
            None => return Err(bad_pattern(start, "unclosed character class")),
            Some(']') if !ranges.is_empty() => break,
            _ => {}
        }
        let (lo, next) = class_char(chars, i, start)?;
        i = next;
        let mut hi = lo;
        if chars.get(i) == Some(&'-') {
            let (end, next) = class_char(chars, i + 1, start)?;
            hi = end;
            i = next;
        }
        ranges.push((lo, hi));
    }
    out.push_str(&encode_class(negated, &ranges, start)?);
    Ok(i)
}

/// `glob` reads `!` first as negation, `]` only first as a member and `-`
/// between two characters as a range, so members are ordered around that.
fn encode_class(
    negated: bool,
    ranges: &[(char, char)],
    start: usize,
) -> std::result::Result<String, PatternError> {
    let mut bracket = false;
    let mut dash = false;
    let mut bang = false;
    let mut members = Vec::new();
    for &(lo, hi) in ranges {
        if lo == hi {
            match lo {
                ']' => bracket = true,
                '-' => dash = true,
                '!' => bang = true,
                c => members.push(c.to_string()),
            }
            continue;
        }
        if [lo, hi].iter().any(|c| *c == ']' || *c == '-') {
            return Err(bad_pattern(start, "unsupported range in character class"));
        }
        if lo == '!' && hi > '!' {
            bang = true;
            members.push(format!("\"-{}", hi));
        } else {
            members.push(format!("{}-{}", lo, hi));
        }
    }

    let mut body = String::new();
    if bracket {
        body.push(']');
    }
    body.extend(members);
    if bang {
        if body.is_empty() && !dash && !negated {
            return Ok("!".to_string());
        }
        body.push('!');
    }
    if dash {
        body.push('-');
    }
    if !negated && body.starts_with('!') {
        // Only `!` and `-` remain; `-!` reads as two members.
        body = "-!".to_string();
    }
    Ok(format!("[{}{}]", if negated { "!" } else { "" }, body))
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("a/b/"), "a/b");
        assert_eq!(clean_path("./a//b"), "a/b");
        assert_eq!(clean_path("a/../b"), "b");
        assert_eq!(clean_path("../a"), "../a");
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("./"), ".");
        assert_eq!(clean_path("/x/../y"), "/y");
    }

    #[test]
    fn test_star_does_not_cross_separator() -> Result<()> {
        let matcher = IgnoreMatcher::parse("*.log\n")?;
        assert!(matcher.is_excluded("a.log"));
        assert!(!matcher.is_excluded("logs/a.log"));
        Ok(())
    }

    #[test]
    fn test_double_star_is_not_recursive() -> Result<()> {
        let matcher = IgnoreMatcher::parse("**/*.tmp")?;
        assert!(matcher.is_excluded("cache/x.tmp"));
        assert!(!matcher.is_excluded("cache/deep/x.tmp"));
        Ok(())
    }

    #[test]
    fn test_patterns_are_cleaned() -> Result<()> {
        let matcher = IgnoreMatcher::parse("./node_modules/\n\n  build  \n")?;
        assert_eq!(matcher.len(), 2);
        assert!(matcher.is_excluded("node_modules"));
        assert!(matcher.is_excluded("build"));
        assert!(!matcher.is_excluded("src/build.rs"));
        Ok(())
    }

    #[test]
    fn test_root_matching_pattern_is_skipped() -> Result<()> {
        let matcher = IgnoreMatcher::parse(".\n*.md\n")?;
        assert!(!matcher.is_excluded("."));
        assert!(matcher.is_excluded("README.md"));
        Ok(())
    }

    #[test]
    fn test_malformed_pattern_is_rejected() {
        let err = IgnoreMatcher::parse("[abc\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DockhandError>(),
            Some(DockhandError::IgnorePattern { .. })
        ));
    }

    #[test]
    fn test_caret_negates_a_class() -> Result<()> {
        let matcher = IgnoreMatcher::parse("[^a-c]*.txt\n")?;
        assert!(matcher.is_excluded("notes.txt"));
        assert!(!matcher.is_excluded("build.txt"));
        Ok(())
    }

    #[test]
    fn test_bang_is_an_ordinary_class_member() -> Result<()> {
        let matcher = IgnoreMatcher::parse("[!x]\n")?;
        assert!(matcher.is_excluded("!"));
        assert!(matcher.is_excluded("x"));
        assert!(!matcher.is_excluded("y"));
        Ok(())
    }

    #[test]
    fn test_class_members_that_must_be_escaped() -> Result<()> {
        for pattern in ["[]a]", "[a-]", "[-a]", "[]", "[^]"] {
            assert!(
                IgnoreMatcher::parse(pattern).is_err(),
                "{} should be rejected",
                pattern
            );
        }
        let matcher = IgnoreMatcher::parse("[\\]a]\nlog[\\-_]x\n")?;
        assert!(matcher.is_excluded("]"));
        assert!(matcher.is_excluded("a"));
        assert!(matcher.is_excluded("log-x"));
        assert!(matcher.is_excluded("log_x"));
        assert!(!matcher.is_excluded("logax"));
        Ok(())
    }

    #[test]
    fn test_escaped_wildcards_are_literal() -> Result<()> {
        let matcher = IgnoreMatcher::parse("a\\*b\n")?;
        assert!(matcher.is_excluded("a*b"));
        assert!(!matcher.is_excluded("axb"));
        assert!(IgnoreMatcher::parse("trailing\\").is_err());
        Ok(())
    }

    #[test]
    fn test_translate_pattern() {
        assert_eq!(translate_pattern("**/*.tmp").unwrap(), "*/*.tmp");
        assert_eq!(translate_pattern("[^a-z]").unwrap(), "[!a-z]");
        assert_eq!(translate_pattern("[!a]").unwrap(), "[a!]");
        assert_eq!(translate_pattern("[!]").unwrap(), "!");
        assert_eq!(translate_pattern("[^!]").unwrap(), "[!!]");
        assert_eq!(translate_pattern("[\\]\\-]").unwrap(), "[]-]");
        assert_eq!(translate_pattern("\\[x").unwrap(), "[[]x");
    }

    #[test]
    fn test_load_missing_file_is_empty() -> Result<()> {
        let temp_dir = tempdir()?;
        let matcher = IgnoreMatcher::load(temp_dir.path())?;
        assert!(matcher.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_unreadable_file_is_an_error() -> Result<()> {
        let temp_dir = tempdir()?;
        // A directory where the file should be cannot be read as text.
        fs::create_dir(temp_dir.path().join(DOCKERIGNORE))?;
        let err = IgnoreMatcher::load(temp_dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DockhandError>(),
            Some(DockhandError::IgnoreFileRead { .. })
        ));
        Ok(())
    }
}
