//! Reply parsing
//!
//! Turns the backend's free-form reply into [`Finding`]s. Each non-blank
//! reply line is one candidate finding; metadata is pulled out of its
//! parenthesized groups:
//!
//! ```text
//! [ERROR] Name 'doStuff' is not camelCase (2.2.1) (line 10)
//! ^^^^^^^                                  ^^^^^   ^^^^^^^
//! severity                          section code   line reference
//! ```

use super::taxonomy::{RuleTag, TaxonomyTable, GENERIC_MARKER};
use regex::Regex;
use std::sync::OnceLock;

/// Severity class of a reply line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

const ERROR_TAGS: [&str; 2] = ["[error]", "[violation]"];
const WARNING_TAGS: [&str; 2] = ["[warn]", "[warning]"];

impl Severity {
    /// Classify a trimmed reply line by its leading tag (case-insensitive)
    pub fn classify(line: &str) -> Self {
        let lower = line.trim_start().to_lowercase();
        if ERROR_TAGS.iter().any(|tag| lower.starts_with(tag)) {
            Severity::Error
        } else if WARNING_TAGS.iter().any(|tag| lower.starts_with(tag)) {
            Severity::Warning
        } else {
            Severity::Info
        }
    }

    /// Errors always surface; everything else only when warnings are shown
    pub fn is_visible(&self, show_warnings: bool) -> bool {
        *self == Severity::Error || show_warnings
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One parsed, not-yet-located observation from a reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    /// 1-based line the reply points at
    pub target_line: Option<usize>,
    /// Last free-text parenthesized group
    pub payload: Option<String>,
    pub rule_tag: Option<RuleTag>,
    pub identifier_hint: Option<String>,
    /// The trimmed reply line this finding came from
    pub text: String,
}

impl Finding {
    /// Parse a single reply line. Visibility filtering happens in
    /// [`parse_reply`]; this always produces a finding.
    pub fn parse_line(line: &str, taxonomy: &TaxonomyTable) -> Self {
        let text = line.trim().to_string();
        let groups = paren_groups(&text);

        let target_line = groups.iter().find_map(|g| line_reference(g));
        let payload = groups
            .iter()
            .rev()
            .map(|g| g.trim())
            .find(|g| !g.is_empty() && !is_metadata_group(g))
            .map(str::to_string);
        let rule_tag = groups
            .iter()
            .filter(|g| is_section_code(g))
            .find_map(|g| taxonomy.lookup(g));
        let identifier_hint = extract_identifier(payload.as_deref().unwrap_or(&text));

        Self {
            severity: Severity::classify(&text),
            target_line,
            payload,
            rule_tag,
            identifier_hint,
            text,
        }
    }

    /// Text shown in the diagnostic before the marker
    pub fn display_text(&self) -> &str {
        self.payload.as_deref().unwrap_or(&self.text)
    }

    /// Rule tag name, or the generic marker when unclassified
    pub fn marker_name(&self) -> &'static str {
        self.rule_tag.map(|t| t.name).unwrap_or(GENERIC_MARKER)
    }

    pub fn is_documentation(&self) -> bool {
        self.rule_tag.is_some_and(|t| t.is_documentation())
    }
}

/// Split a reply into findings, preserving reply order.
///
/// Blank lines are dropped; lines whose severity is hidden by
/// `show_warnings` never become findings.
pub fn parse_reply(reply: &str, taxonomy: &TaxonomyTable, show_warnings: bool) -> Vec<Finding> {
    reply
        .split(is_line_break)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| Severity::classify(line).is_visible(show_warnings))
        .map(|line| Finding::parse_line(line, taxonomy))
        .collect()
}

pub(crate) fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn paren_group_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^()]*)\)").expect("valid paren group regex"))
}

fn line_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:(?:line|ln|l)\.?\s*)?(\d+)\s*$").expect("valid line ref regex")
    })
}

fn section_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+(?:\.\d+)+\s*$").expect("valid section regex"))
}

fn quoted_identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([A-Za-z_][A-Za-z0-9_]*)'").expect("valid quoted regex"))
}

fn bare_identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid identifier regex"))
}

/// Contents of every innermost `( ... )` group, left to right
pub(crate) fn paren_groups(line: &str) -> Vec<&str> {
    paren_group_regex()
        .captures_iter(line)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// `(10)`, `(line 10)`, `(L10)` → 10. Line zero is not a line.
pub(crate) fn line_reference(group: &str) -> Option<usize> {
    line_reference_regex()
        .captures(group)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|line| *line >= 1)
}

pub(crate) fn is_section_code(group: &str) -> bool {
    section_code_regex().is_match(group)
}

fn is_metadata_group(group: &str) -> bool {
    is_section_code(group) || line_reference(group).is_some()
}

/// Quoted identifier first; otherwise the *last* bare identifier-shaped word.
///
/// The bare fallback binds to whatever word ends the text, which is often
/// plain English rather than a symbol. Callers rely on this exact ordering.
pub(crate) fn extract_identifier(text: &str) -> Option<String> {
    if let Some(quoted) = quoted_identifier_regex()
        .captures(text)
        .and_then(|c| c.get(1))
    {
        return Some(quoted.as_str().to_string());
    }
    bare_identifier_regex()
        .find_iter(text)
        .last()
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TaxonomyTable {
        TaxonomyTable::default()
    }

    #[test]
    fn test_severity_classification() {
        assert_eq!(Severity::classify("[ERROR] bad"), Severity::Error);
        assert_eq!(Severity::classify("[Violation] bad"), Severity::Error);
        assert_eq!(Severity::classify("[warn] meh"), Severity::Warning);
        assert_eq!(Severity::classify("[WARNING] meh"), Severity::Warning);
        assert_eq!(Severity::classify("Consider renaming"), Severity::Info);
        assert_eq!(Severity::classify("error without brackets"), Severity::Info);
    }

    #[test]
    fn test_warnings_hidden_when_disabled() {
        let reply = "[warn] Name 'x' is short (12)\n[error] Name 'y' is bad (13)\nplain note (14)";
        let findings = parse_reply(reply, &table(), false);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].target_line, Some(13));

        let findings = parse_reply(reply, &table(), true);
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[2].severity, Severity::Info);
    }

    #[test]
    fn test_blank_lines_and_mixed_line_endings() {
        let reply = "\r\n[ERROR] one (1)\r\n\r\n   \n[ERROR] two (2)\r[ERROR] three (3)";
        let lines: Vec<_> = parse_reply(reply, &table(), true)
            .into_iter()
            .map(|f| f.target_line)
            .collect();
        assert_eq!(lines, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_section_code_and_quoted_identifier() {
        let f = Finding::parse_line(
            "[ERROR] Constant 'MAX_SIZE' must be upper snake case (2.3.1)",
            &table(),
        );
        assert_eq!(f.rule_tag.map(|t| t.name), Some("ConstantName"));
        assert_eq!(f.identifier_hint.as_deref(), Some("MAX_SIZE"));
        assert_eq!(f.target_line, None);
        assert_eq!(f.payload, None);
    }

    #[test]
    fn test_line_reference_forms() {
        assert_eq!(line_reference("10"), Some(10));
        assert_eq!(line_reference(" line 10 "), Some(10));
        assert_eq!(line_reference("Line 7"), Some(7));
        assert_eq!(line_reference("L42"), Some(42));
        assert_eq!(line_reference("ln. 3"), Some(3));
        assert_eq!(line_reference("0"), None);
        assert_eq!(line_reference("2.3.1"), None);
        assert_eq!(line_reference("expected 3 words"), None);
    }

    #[test]
    fn test_first_line_reference_wins() {
        let f = Finding::parse_line("[ERROR] (12) (2.2.1) (see also 40) (30)", &table());
        assert_eq!(f.target_line, Some(12));
    }

    #[test]
    fn test_payload_is_last_free_text_group() {
        let f = Finding::parse_line(
            "[ERROR] (12) (2.2.1) (first note) (Method 'Foo' should be lowerCamelCase)",
            &table(),
        );
        assert_eq!(
            f.payload.as_deref(),
            Some("Method 'Foo' should be lowerCamelCase")
        );
        assert_eq!(f.identifier_hint.as_deref(), Some("Foo"));
        assert_eq!(f.display_text(), "Method 'Foo' should be lowerCamelCase");
    }

    #[test]
    fn test_first_known_section_code_wins() {
        let f = Finding::parse_line("[ERROR] x (9.9.9) (2.4.1) (2.5.1)", &table());
        assert_eq!(f.rule_tag.map(|t| t.name), Some("ParameterName"));
    }

    #[test]
    fn test_unknown_section_uses_generic_marker() {
        let f = Finding::parse_line("[ERROR] x (9.9.9)", &table());
        assert!(f.rule_tag.is_none());
        assert_eq!(f.marker_name(), "LLMStyle");
    }

    #[test]
    fn test_bare_identifier_fallback_takes_last_word() {
        // Known false-positive binding: the trailing English word wins.
        assert_eq!(
            extract_identifier("rename value to count please").as_deref(),
            Some("please")
        );
        assert_eq!(extract_identifier("10abc 20").as_deref(), Some("abc"));
        assert_eq!(extract_identifier("42 ..."), None);
    }

    #[test]
    fn test_quoted_identifier_preferred_over_bare() {
        assert_eq!(
            extract_identifier("name 'doStuff' is not camelCase").as_deref(),
            Some("doStuff")
        );
        assert_eq!(
            extract_identifier("'not an ident' then 'ok_1'").as_deref(),
            Some("ok_1")
        );
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let reply = "[ERROR] Name 'doStuff' is not camelCase (2.2.1) (line 10)\n\
                     [warn] Field 'x' (2.3.2) (4) (too short)\n\
                     free text without anything";
        let first = parse_reply(reply, &table(), true);
        let second = parse_reply(reply, &table(), true);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_end_to_end_reply_line() {
        let f = Finding::parse_line(
            "[ERROR] Name 'doStuff' is not camelCase (2.2.1) (line 10)",
            &table(),
        );
        assert_eq!(f.severity, Severity::Error);
        assert_eq!(f.target_line, Some(10));
        assert_eq!(f.rule_tag.map(|t| t.name), Some("MethodName"));
        assert_eq!(f.identifier_hint.as_deref(), Some("doStuff"));
        assert_eq!(f.payload, None);
    }
}
