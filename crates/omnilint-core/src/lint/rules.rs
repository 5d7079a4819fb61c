//! Lenient IF/THEN rule extraction.
//!
//! Runs independently of the grammar linter: a malformed document can still
//! yield rule summaries, and nothing here ever produces a diagnostic.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// A pattern that fails to build disables extraction; it never fails a request.
static RULE_LINE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)^-\s*IF\s+(.+?)\s+THEN\s+(.+)$")
        .map_err(|e| tracing::error!(error = %e, "rule pattern failed to compile"))
        .ok()
});

/// Display summary of one `- IF <condition> THEN <action>` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub condition: String,
    pub action: String,
}

/// Collect every rule-shaped line in document order.
pub fn extract_rules(text: &str) -> Vec<RuleSummary> {
    let Some(re) = RULE_LINE.as_ref() else {
        return Vec::new();
    };
    text.split('\n')
        .filter_map(|line| {
            let caps = re.captures(line.trim())?;
            Some(RuleSummary {
                condition: caps.get(1)?.as_str().trim().to_string(),
                action: caps.get(2)?.as_str().trim().to_string(),
            })
        })
        .collect()
}
