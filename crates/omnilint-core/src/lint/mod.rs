//! OmniLang structural linting.
//!
//! - [`linter`]: strict section grammar, line-addressed diagnostics.
//! - [`rules`]: lenient IF/THEN summaries for display.
//!
//! The two passes read the same text and never influence each other.

pub mod cursor;
pub mod linter;
pub mod rules;
pub mod section;

pub use linter::{lint, LintReport, SectionLinter, ValidationError};
pub use rules::{extract_rules, RuleSummary};
pub use section::{Section, SectionBody, SectionKeyword};
