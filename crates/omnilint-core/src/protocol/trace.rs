//! Engine decision-trace parsing.
//!
//! An engine announces each action it decided on with a line containing
//! `-> EXECUTE: <name>`. Everything else on stdout is free-form text for
//! humans and is passed through untouched.

/// Marker that precedes an action name in engine output.
pub const EXECUTE_MARKER: &str = "-> EXECUTE: ";

/// Collect action names in order of appearance.
///
/// The marker may appear anywhere on the line; the remainder of the line is
/// trimmed and kept only if non-empty.
pub fn extract_actions(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let idx = line.find(EXECUTE_MARKER)?;
            let name = line[idx + EXECUTE_MARKER.len()..].trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}
