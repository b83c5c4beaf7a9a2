//! Diagnostic message formatting
//!
//! Builds the text a finding is reported with and shapes it for the host's
//! template syntax. The host formatter treats `'`, `%`, `{`, `}`, `(` and
//! `)` as meta characters; documentation rules hand their message to the
//! host as the template itself, so those messages are escaped here.

use super::finding::Finding;
use super::locate::SourceIndex;
use super::taxonomy::{RuleCategory, RuleTag};

/// Template that passes a single argument through verbatim
pub const PASSTHROUGH_TEMPLATE: &str = "{0}";

/// How a category's message reaches the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTransform {
    /// `{0}` template, message as the argument
    Passthrough,
    /// Comment rewrite, message escaped into the template
    Documentation,
}

const CATEGORY_TRANSFORMS: [(RuleCategory, MessageTransform); 2] = [
    (RuleCategory::Documentation, MessageTransform::Documentation),
    (RuleCategory::Naming, MessageTransform::Passthrough),
];

impl MessageTransform {
    pub fn for_tag(tag: Option<RuleTag>) -> Self {
        tag.and_then(|tag| {
            CATEGORY_TRANSFORMS
                .iter()
                .find(|(category, _)| *category == tag.category)
                .map(|(_, transform)| *transform)
        })
        .unwrap_or(MessageTransform::Passthrough)
    }
}

/// Template plus optional argument, ready for the host logger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    pub template: String,
    pub argument: Option<String>,
}

impl FormattedMessage {
    pub fn render(&self) -> String {
        let args: Vec<&str> = self.argument.as_deref().into_iter().collect();
        render_template(&self.template, &args)
    }
}

/// Format a finding's message. `source` supplies the target line for the
/// documentation rewrite.
pub fn format_message(finding: &Finding, source: &SourceIndex) -> FormattedMessage {
    let marker = format!("[{}]", finding.marker_name());
    let message = format!("{} {}", finding.display_text(), marker);

    match MessageTransform::for_tag(finding.rule_tag) {
        MessageTransform::Passthrough => FormattedMessage {
            template: PASSTHROUGH_TEMPLATE.to_string(),
            argument: Some(message),
        },
        MessageTransform::Documentation => {
            let message = finding
                .target_line
                .and_then(|line| source.line(line))
                .and_then(extract_comment_text)
                .filter(|comment| !comment.is_empty())
                .map(|comment| documentation_sentence(&comment, &marker))
                .unwrap_or(message);
            FormattedMessage {
                template: escape_template(&message),
                argument: None,
            }
        }
    }
}

fn documentation_sentence(comment: &str, marker: &str) -> String {
    format!(
        "The comment starting with '// {}' is used to describe the method's overall purpose, \
         a Javadoc comment starting with '/**' should be used instead {}",
        comment, marker
    )
}

/// Text of the first `//` or `/* ... */` comment on a source line
pub fn extract_comment_text(line: &str) -> Option<String> {
    let line = line.trim();

    if let Some(idx) = line.find("//") {
        return Some(line[idx + 2..].trim().to_string());
    }

    let open = line.find("/*")?;
    let start = open + 2;
    let body = match line.find("*/") {
        Some(end) if end > start => &line[start..end],
        _ => &line[start..],
    };
    Some(body.trim().to_string())
}

/// Escape a message so the host template formatter reproduces it literally
pub fn escape_template(message: &str) -> String {
    let escaped = message
        .replace('\'', "''")
        .replace('%', "%%")
        .replace('{', "'{'")
        .replace('}', "'}'")
        .replace('(', "'('")
        .replace(')', "')'");

    if escaped.len() >= 2 && escaped.starts_with('\'') && escaped.ends_with('\'') {
        escaped
    } else {
        format!("'{}'", escaped)
    }
}

fn is_quotable_meta(c: char) -> bool {
    matches!(c, '(' | ')' | '{' | '}')
}

/// Render a host message template.
///
/// - `'c'` for `c` in `(){}` is a literal `c`
/// - `''` is a literal quote
/// - a lone `'` opens or closes a quoted run and is dropped
/// - `%%` is a literal `%`
/// - `{n}` outside a quoted run is argument `n`; a missing argument is kept
///   as written
pub fn render_template(template: &str, args: &[&str]) -> String {
    let chars: Vec<char> = template.chars().collect();
    let at = |i: usize| chars.get(i).copied();
    let mut out = String::with_capacity(template.len());
    let mut quoted = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' => {
                let next = at(i + 1);
                if next.is_some_and(is_quotable_meta) && at(i + 2) == Some('\'') {
                    out.push(chars[i + 1]);
                    i += 3;
                } else if next == Some('\'')
                    && !(at(i + 2).is_some_and(is_quotable_meta) && at(i + 3) == Some('\''))
                {
                    out.push('\'');
                    i += 2;
                } else {
                    // A quote run boundary; also the leading wrap quote when an
                    // escaped meta character follows it directly.
                    quoted = !quoted;
                    i += 1;
                }
            }
            '%' if at(i + 1) == Some('%') => {
                out.push('%');
                i += 2;
            }
            '{' if !quoted => {
                let close = chars[i + 1..].iter().position(|&ch| ch == '}');
                let placeholder = close.map(|len| chars[i + 1..i + 1 + len].iter().collect::<String>());
                let arg = placeholder
                    .as_deref()
                    .and_then(|p| p.trim().parse::<usize>().ok())
                    .and_then(|n| args.get(n));
                match (close, arg) {
                    (Some(len), Some(arg)) => {
                        out.push_str(arg);
                        i += len + 2;
                    }
                    _ => {
                        out.push('{');
                        i += 1;
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}
