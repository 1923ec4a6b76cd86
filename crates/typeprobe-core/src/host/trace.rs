//! Resolution traces.
//!
//! Every resolution call records the decisions it makes as plain text lines.
//! The conditional-exports lines follow a fixed wording because the
//! fallback-condition check parses them back; everything else is
//! descriptive only.

/// Fixed trace lines and line prefixes.
pub mod messages {
    pub const ENTERING_CONDITIONAL_EXPORTS: &str = "Entering conditional exports.";
    pub const EXITING_CONDITIONAL_EXPORTS: &str = "Exiting conditional exports.";
    pub const MATCHED_CONDITION: &str = "Matched 'exports' condition '";
    pub const NON_MATCHING_CONDITION: &str = "Saw non-matching condition '";
    pub const FAILED_CONDITION: &str = "Failed to resolve under condition '";
    pub const RESOLVED_CONDITION: &str = "Resolved under condition '";
}

/// Ordered decision log for one resolution call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveTrace {
    lines: Vec<String>,
}

impl ResolveTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a free-form line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn entering_conditions(&mut self) {
        self.push(messages::ENTERING_CONDITIONAL_EXPORTS);
    }

    pub fn exiting_conditions(&mut self) {
        self.push(messages::EXITING_CONDITIONAL_EXPORTS);
    }

    pub fn matched_condition(&mut self, condition: &str) {
        self.push(format!("{}{condition}'.", messages::MATCHED_CONDITION));
    }

    pub fn non_matching_condition(&mut self, condition: &str) {
        self.push(format!("{}{condition}'.", messages::NON_MATCHING_CONDITION));
    }

    pub fn failed_condition(&mut self, condition: &str) {
        self.push(format!("{}{condition}'.", messages::FAILED_CONDITION));
    }

    pub fn resolved_condition(&mut self, condition: &str) {
        self.push(format!("{}{condition}'.", messages::RESOLVED_CONDITION));
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Whether a trace shows a conditional-exports region that resolved only
/// after an earlier condition at the same nesting level failed.
#[must_use]
pub fn resolved_through_fallback(trace: &[String]) -> bool {
    let mut i = 0;
    while i < trace.len() {
        if trace[i] == messages::ENTERING_CONDITIONAL_EXPORTS {
            i += 1;
            if scan_region(trace, &mut i) {
                return true;
            }
        } else {
            i += 1;
        }
    }
    false
}

/// Scan one region starting just after its "entering" line. Leaves `i`
/// past the region's "exiting" line.
fn scan_region(trace: &[String], i: &mut usize) -> bool {
    let mut seen_failure = false;
    let mut resolved = false;
    let mut fallback = false;
    while *i < trace.len() {
        let line = trace[*i].as_str();
        *i += 1;
        if line == messages::ENTERING_CONDITIONAL_EXPORTS {
            fallback |= scan_region(trace, i);
        } else if line == messages::EXITING_CONDITIONAL_EXPORTS {
            break;
        } else if line.starts_with(messages::FAILED_CONDITION) {
            seen_failure |= !resolved;
        } else if line.starts_with(messages::RESOLVED_CONDITION) {
            fallback |= seen_failure && !resolved;
            resolved = true;
        }
    }
    fallback
}
