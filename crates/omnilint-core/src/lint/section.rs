//! Canonical OmniLang sections.

use std::fmt;

/// Section keywords in canonical document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKeyword {
    Intent,
    Actor,
    Context,
    Assumption,
    Rule,
    Constraint,
    Impact,
    Trace,
    Review,
}

impl SectionKeyword {
    /// All keywords, canonical order.
    pub const CANONICAL: [SectionKeyword; 9] = [
        SectionKeyword::Intent,
        SectionKeyword::Actor,
        SectionKeyword::Context,
        SectionKeyword::Assumption,
        SectionKeyword::Rule,
        SectionKeyword::Constraint,
        SectionKeyword::Impact,
        SectionKeyword::Trace,
        SectionKeyword::Review,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKeyword::Intent => "INTENT",
            SectionKeyword::Actor => "ACTOR",
            SectionKeyword::Context => "CONTEXT",
            SectionKeyword::Assumption => "ASSUMPTION",
            SectionKeyword::Rule => "RULE",
            SectionKeyword::Constraint => "CONSTRAINT",
            SectionKeyword::Impact => "IMPACT",
            SectionKeyword::Trace => "TRACE",
            SectionKeyword::Review => "REVIEW",
        }
    }

    /// Resolve an already-uppercased keyword.
    pub fn parse(upper: &str) -> Option<Self> {
        Self::CANONICAL.into_iter().find(|k| k.as_str() == upper)
    }

    /// Position in the canonical sequence.
    pub fn index(self) -> usize {
        self as usize
    }

    /// ASSUMPTION and REVIEW may be left out.
    pub fn is_mandatory(self) -> bool {
        !matches!(self, SectionKeyword::Assumption | SectionKeyword::Review)
    }

    /// Comma-separated canonical list, used in diagnostics.
    pub fn canonical_list() -> String {
        Self::CANONICAL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for SectionKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What follows a section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionBody {
    /// Text after the colon on the header line.
    Inline,
    /// Content on the following lines (list items or free text).
    Block,
    /// Nothing before the next header or end of input.
    Empty,
}

/// A section header as seen by the linter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub keyword: SectionKeyword,
    /// 1-based line of the header.
    pub line: u32,
    pub body: SectionBody,
}
