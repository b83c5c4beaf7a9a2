//! Location resolution
//!
//! Maps a finding's `(line, identifier)` hint to the most precise anchor
//! available, degrading in a fixed order:
//!
//! 1. `ExactNode` - an identifier node on that line in the host tree
//! 2. `VisualColumn` - the identifier found in the raw line text
//! 3. `LineOnly` - the line alone
//! 4. `FileLevel` - no usable line
//!
//! Resolution never fails and never mutates its inputs.

use super::finding::is_line_break;
use super::CheckSettings;
use crate::host::{AstNode, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    ExactNode,
    VisualColumn,
    LineOnly,
    FileLevel,
}

/// Where a diagnostic is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedLocation {
    pub kind: LocationKind,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ResolvedLocation {
    pub fn exact_node(node: &AstNode) -> Self {
        Self {
            kind: LocationKind::ExactNode,
            line: Some(node.line),
            column: Some(node.column),
        }
    }

    pub fn visual_column(line: usize, column: usize) -> Self {
        Self {
            kind: LocationKind::VisualColumn,
            line: Some(line),
            column: Some(column),
        }
    }

    pub fn line_only(line: usize) -> Self {
        Self {
            kind: LocationKind::LineOnly,
            line: Some(line),
            column: None,
        }
    }

    pub fn file_level() -> Self {
        Self {
            kind: LocationKind::FileLevel,
            line: None,
            column: None,
        }
    }
}

/// Lines of the file under analysis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceIndex {
    lines: Vec<String>,
}

impl SourceIndex {
    pub fn from_source(source: &str) -> Self {
        Self {
            lines: split_lines(source).into_iter().map(str::to_string).collect(),
        }
    }

    /// 1-based line lookup
    pub fn line(&self, one_based: usize) -> Option<&str> {
        one_based
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Split on any line terminator: `\r\n`, `\n`, a lone `\r`, and the
/// Unicode breaks. A trailing terminator does not start a new line.
pub fn split_lines(source: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = source;
    while !rest.is_empty() {
        let Some(idx) = rest.find(is_line_break) else {
            lines.push(rest);
            break;
        };
        lines.push(&rest[..idx]);
        let tail = &rest[idx..];
        let width = if tail.starts_with("\r\n") {
            2
        } else {
            tail.chars().next().map_or(1, char::len_utf8)
        };
        rest = &tail[width..];
    }
    lines
}

/// Resolve a finding's position hint against the tree and raw source
pub fn resolve(
    target_line: Option<usize>,
    identifier: Option<&str>,
    root: &AstNode,
    source: &SourceIndex,
    settings: &CheckSettings,
) -> ResolvedLocation {
    let Some(line) = target_line else {
        return ResolvedLocation::file_level();
    };

    let Some(identifier) = identifier else {
        return ResolvedLocation::line_only(line);
    };

    if let Some(node) = find_ident_at_line(root, line, identifier) {
        return ResolvedLocation::exact_node(node);
    }

    let column = source.line(line).and_then(|text| {
        find_column_raw(text, identifier).map(|raw| {
            let visual = to_visual_column(text, raw, settings.tab_width) as i64;
            (visual + settings.column_offset).max(0) as usize
        })
    });

    match column {
        Some(column) => ResolvedLocation::visual_column(line, column),
        None => ResolvedLocation::line_only(line),
    }
}

/// Pre-order search for an identifier named `name` on `line`.
///
/// Definition nodes on the line also match through their first identifier
/// child, so a method is found by its name even when the host attaches the
/// name token below a modifiers/type subtree.
///
/// Walks with an explicit stack; host trees can be arbitrarily deep.
pub fn find_ident_at_line<'a>(root: &'a AstNode, line: usize, name: &str) -> Option<&'a AstNode> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind == NodeKind::Ident && node.line == line && node.text_eq(name) {
            return Some(node);
        }

        if node.kind.is_definition() && node.line == line {
            if let Some(id) = node.find_first_child(&NodeKind::Ident) {
                if id.text_eq(name) {
                    return Some(id);
                }
            }
        }

        stack.extend(node.children.iter().rev());
    }
    None
}

/// Char offset of `identifier` in `text`: whole word first, then substring
pub fn find_column_raw(text: &str, identifier: &str) -> Option<usize> {
    if identifier.is_empty() {
        return None;
    }
    let byte_offset = text
        .match_indices(identifier)
        .map(|(idx, _)| idx)
        .find(|&idx| {
            let before = text[..idx].chars().next_back();
            let after = text[idx + identifier.len()..].chars().next();
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
        .or_else(|| text.find(identifier))?;
    Some(text[..byte_offset].chars().count())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Expand tabs up to `raw_index` (a char offset) and return the column
pub fn to_visual_column(line: &str, raw_index: usize, tab_width: usize) -> usize {
    let tab_width = tab_width.max(1);
    line.chars().take(raw_index).fold(0, |col, ch| {
        if ch == '\t' {
            col + tab_width - (col % tab_width)
        } else {
            col + 1
        }
    })
}
