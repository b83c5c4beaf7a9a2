//! LLM style check
//!
//! Turns a model's free-text review of a source file into located
//! diagnostics. The pipeline per file is:
//!
//! 1. build the numbered prompt and look it up in the reply cache
//! 2. on a miss, ask the backend and persist the reply
//! 3. parse the reply into [`Finding`]s ([`finding`])
//! 4. anchor each finding on the host tree or raw text ([`locate`])
//! 5. shape the message for the host formatter ([`message`])
//!
//! [`driver::ReconciliationDriver`] runs the steps and owns every failure:
//! nothing raised while checking one file reaches the host.

pub mod driver;
pub mod finding;
pub mod locate;
pub mod message;
pub mod taxonomy;

pub use driver::{FileReport, ReconciliationDriver};
pub use finding::{parse_reply, Finding, Severity};
pub use locate::{resolve, LocationKind, ResolvedLocation, SourceIndex};
pub use message::{escape_template, format_message, render_template, FormattedMessage};
pub use taxonomy::{RuleCategory, RuleTag, TaxonomyTable, GENERIC_MARKER};

use serde::Deserialize;

/// Settings the host passes to the check
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    /// When false the check does nothing for any file
    pub enabled: bool,
    /// When false, `[WARN]` findings are dropped
    pub show_warnings: bool,
    /// Tab stop used for visual columns
    pub tab_width: usize,
    /// Added to every computed visual column
    pub column_offset: i64,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            show_warnings: true,
            tab_width: 4,
            column_offset: 0,
        }
    }
}

impl CheckSettings {
    pub fn sanitize(&mut self) {
        self.tab_width = self.tab_width.max(1);
    }
}
