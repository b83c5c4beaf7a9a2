//! Prompt construction
//!
//! The prompt is the rule template followed by the file under review with
//! every line numbered, so the model can cite lines the resolver can map
//! back onto the tree. The exact text is also the cache key, so any change
//! here invalidates every cached reply.

use crate::check::locate::split_lines;
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Rule template shipped with the binary
pub const DEFAULT_TEMPLATE: &str = include_str!("prompt_template.txt");

const CODE_SEPARATOR: &str = "\n\nCode:\n";

/// Load a template from `path`, or the built-in one when `None`
pub fn load_template(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template {}", path.display())),
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

/// Prefix each line with its 1-based number, right-aligned to the width of
/// the largest number, followed by `.`. Every line ends with `\n`.
///
/// ```text
///  9.    }
/// 10.}
/// ```
pub fn add_line_numbers(source: &str) -> String {
    let mut lines = split_lines(source);
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        lines.push("");
    }

    let width = lines.len().to_string().len();
    let mut numbered = String::with_capacity(source.len() + lines.len() * (width + 2));
    for (i, line) in lines.iter().enumerate() {
        numbered.push_str(&format!("{:>width$}.", i + 1, width = width));
        numbered.push_str(line);
        numbered.push('\n');
    }
    numbered
}

/// Template, separator, then the numbered source
pub fn build_prompt(template: &str, source: &str) -> String {
    format!("{}{}{}", template, CODE_SEPARATOR, add_line_numbers(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_line_numbers_are_right_aligned() {
        let source = (1..=10).map(|i| format!("l{}", i)).collect::<Vec<_>>().join("\n");
        let numbered = add_line_numbers(&source);
        let lines: Vec<&str> = numbered.lines().collect();
        assert_eq!(lines[0], " 1.l1");
        assert_eq!(lines[8], " 9.l9");
        assert_eq!(lines[9], "10.l10");
        assert!(numbered.ends_with("10.l10\n"));
    }

    #[test]
    fn test_crlf_and_trailing_newlines() {
        assert_eq!(add_line_numbers("a\r\nb\n\n"), "1.a\n2.b\n");
        assert_eq!(add_line_numbers(""), "1.\n");
        assert_eq!(add_line_numbers("a\n\nb"), "1.a\n2.\n3.b\n");
    }

    #[test]
    fn test_lone_carriage_returns_number_like_the_locator() {
        let source = "class A {\r\tint foo;\r}\r";
        assert_eq!(add_line_numbers(source), "1.class A {\n2.\tint foo;\n3.}\n");
        assert_eq!(
            add_line_numbers(source).lines().count(),
            crate::check::SourceIndex::from_source(source).len()
        );
    }

    #[test]
    fn test_build_prompt_layout() {
        let prompt = build_prompt("Rules", "class A {}");
        assert_eq!(prompt, "Rules\n\nCode:\n1.class A {}\n");
    }

    #[test]
    fn test_default_template_lists_sections() {
        for code in ["1.1.1", "1.1.2", "2.1.1", "2.2.1", "2.3.1", "2.3.2", "2.4.1", "2.5.1", "2.6.1"] {
            assert!(DEFAULT_TEMPLATE.contains(code), "missing {code}");
        }
    }

    #[test]
    fn test_load_template_override() {
        use std::io::Write;
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Custom rules").unwrap();
        assert_eq!(load_template(Some(file.path())).unwrap(), "Custom rules");
        assert_eq!(load_template(None).unwrap(), DEFAULT_TEMPLATE);
        assert!(load_template(Some(Path::new("/nonexistent/template.txt"))).is_err());
    }
}
