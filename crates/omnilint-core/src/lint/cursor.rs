//! Lazy line cursor with significant-line look-ahead.

use std::iter::Enumerate;
use std::str::Split;

/// Shape of a single trimmed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    /// `//` or `#` comment.
    Comment,
    /// `Keyword:` with the keyword as written (not uppercased).
    Header { keyword: &'a str, inline: bool },
    /// Starts with `-`.
    ListItem,
    Text,
}

impl LineKind<'_> {
    /// Blank lines and comments never open or close a section.
    pub fn is_significant(&self) -> bool {
        !matches!(self, LineKind::Blank | LineKind::Comment)
    }
}

/// One line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based.
    pub number: u32,
    /// Trimmed text.
    pub text: &'a str,
    pub kind: LineKind<'a>,
}

pub fn classify(trimmed: &str) -> LineKind<'_> {
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with("//") || trimmed.starts_with('#') {
        return LineKind::Comment;
    }
    let letters = trimmed
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if letters > 0 && trimmed.as_bytes().get(letters) == Some(&b':') {
        return LineKind::Header {
            keyword: &trimmed[..letters],
            inline: trimmed.len() > letters + 1,
        };
    }
    if trimmed.starts_with('-') {
        return LineKind::ListItem;
    }
    LineKind::Text
}

/// Walks a document line by line without materializing it.
///
/// Lines are split on `\n` only, so a trailing newline produces a final
/// empty line and `lines_seen` after exhaustion equals the document's line
/// count.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    inner: Enumerate<Split<'a, char>>,
    seen: u32,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            inner: text.split('\n').enumerate(),
            seen: 0,
        }
    }

    /// Number of lines consumed so far.
    pub fn lines_seen(&self) -> u32 {
        self.seen
    }

    /// Next significant line after the current position, without consuming anything.
    pub fn peek_next_significant(&self) -> Option<Line<'a>> {
        self.inner
            .clone()
            .map(|(idx, raw)| make_line(idx, raw))
            .find(|l| l.kind.is_significant())
    }
}

impl<'a> Iterator for LineCursor<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, raw) = self.inner.next()?;
        self.seen = self.seen.saturating_add(1);
        Some(make_line(idx, raw))
    }
}

fn make_line(idx: usize, raw: &str) -> Line<'_> {
    let text = raw.trim();
    Line {
        number: u32::try_from(idx).map_or(u32::MAX, |n| n.saturating_add(1)),
        text,
        kind: classify(text),
    }
}
