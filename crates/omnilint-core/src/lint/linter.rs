//! Section grammar linter.
//!
//! A single forward pass over the document. The only look-ahead is the
//! empty-section check, which peeks past blank and comment lines to the next
//! significant line. Every line is visited even after errors so that one run
//! reports all independent defects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::cursor::{Line, LineCursor, LineKind};
use super::section::{Section, SectionBody, SectionKeyword};

/// A line-addressed diagnostic. Line 0 addresses the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub line: u32,
    pub message: String,
}

impl ValidationError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    /// Document-level diagnostic (line 0).
    pub fn document(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }
}

/// Full linter output: recognised headers plus diagnostics.
#[derive(Debug, Clone, Default)]
pub struct LintReport {
    pub sections: Vec<Section>,
    pub errors: Vec<ValidationError>,
    /// Number of lines in the document (`split('\n')` semantics).
    pub line_count: u32,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Lint a document and return only the diagnostics.
pub fn lint(text: &str) -> Vec<ValidationError> {
    SectionLinter::new(text).run().errors
}

/// Scanner state over one document.
pub struct SectionLinter<'a> {
    cursor: LineCursor<'a>,
    /// `None` until the first known header.
    current: Option<usize>,
    found: HashMap<SectionKeyword, u32>,
    report: LintReport,
}

impl<'a> SectionLinter<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            cursor: LineCursor::new(text),
            current: None,
            found: HashMap::new(),
            report: LintReport::default(),
        }
    }

    pub fn run(mut self) -> LintReport {
        while let Some(line) = self.cursor.next() {
            match line.kind {
                LineKind::Blank | LineKind::Comment => {}
                LineKind::Header { keyword, inline } => self.on_header(&line, keyword, inline),
                LineKind::ListItem => {
                    if self.current.is_none() {
                        self.push(line.number, "List item found outside of any section.");
                    }
                }
                LineKind::Text => {
                    if self.current.is_none() {
                        self.push(
                            line.number,
                            "Content found before any valid section header (e.g., INTENT:).",
                        );
                    }
                }
            }
        }

        self.report.line_count = self.cursor.lines_seen();
        let missing_at = self.report.line_count.saturating_add(1);
        for keyword in SectionKeyword::CANONICAL {
            if keyword.is_mandatory() && !self.found.contains_key(&keyword) {
                self.push(
                    missing_at,
                    format!("Missing mandatory section: '{keyword}'."),
                );
            }
        }

        tracing::trace!(
            lines = self.report.line_count,
            sections = self.report.sections.len(),
            errors = self.report.errors.len(),
            "lint finished"
        );
        self.report
    }

    fn on_header(&mut self, line: &Line<'a>, raw_keyword: &str, inline: bool) {
        let upper = raw_keyword.to_ascii_uppercase();
        let Some(keyword) = SectionKeyword::parse(&upper) else {
            self.push(
                line.number,
                format!(
                    "Unknown keyword '{upper}'. Expected one of: {}",
                    SectionKeyword::canonical_list()
                ),
            );
            return;
        };

        if self.found.contains_key(&keyword) {
            self.push(
                line.number,
                format!("Duplicate section '{keyword}'. Each section should appear only once."),
            );
        }
        self.found.insert(keyword, line.number);

        if self.current.is_some_and(|cur| keyword.index() < cur) {
            self.push(
                line.number,
                format!("Section '{keyword}' appears out of order. Canonical order violation."),
            );
        }
        self.current = Some(keyword.index());

        let body = if inline {
            SectionBody::Inline
        } else {
            match self.cursor.peek_next_significant() {
                Some(next) if !matches!(next.kind, LineKind::Header { .. }) => SectionBody::Block,
                _ => SectionBody::Empty,
            }
        };
        if body == SectionBody::Empty {
            self.push(
                line.number,
                format!("Section '{keyword}' must have content or list items."),
            );
        }

        self.report.sections.push(Section {
            keyword,
            line: line.number,
            body,
        });
    }

    fn push(&mut self, line: u32, message: impl Into<String>) {
        self.report.errors.push(ValidationError::new(line, message));
    }
}
