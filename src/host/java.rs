//! Java host built on tree-sitter
//!
//! Converts a tree-sitter-java syntax tree into the owned [`AstNode`] form
//! the resolver walks. Only named nodes are kept. Declarations map onto the
//! definition kinds with their name as an `Ident` child, so a name can be
//! found on its declaring line.

use super::{AstNode, NodeKind};
use std::cell::RefCell;
use tree_sitter::{Node, Parser};

thread_local! {
    static JAVA_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // Ignore error here - will be caught at parse time if language fails
        let _ = p.set_language(&tree_sitter_java::LANGUAGE.into());
        p
    });
}

/// Parse Java source into the host tree
pub fn parse(source: &str) -> anyhow::Result<AstNode> {
    let tree = JAVA_PARSER
        .with(|p| p.borrow_mut().parse(source, None))
        .ok_or_else(|| anyhow::anyhow!("Failed to parse Java source"))?;
    let root = tree.root_node();
    if root.has_error() {
        log::debug!("Java source has syntax errors; checking the partial tree");
    }
    Ok(convert(&root, source))
}

fn node_kind(kind: &str) -> NodeKind {
    match kind {
        "program" => NodeKind::Root,
        "identifier" | "type_identifier" => NodeKind::Ident,
        "class_declaration"
        | "interface_declaration"
        | "enum_declaration"
        | "record_declaration"
        | "annotation_type_declaration" => NodeKind::ClassDef,
        "method_declaration" | "constructor_declaration" => NodeKind::MethodDef,
        "variable_declarator" | "enum_constant" => NodeKind::VariableDef,
        "formal_parameter" | "spread_parameter" | "catch_formal_parameter" | "type_parameter" => {
            NodeKind::ParameterDef
        }
        other => NodeKind::Other(other.to_string()),
    }
}

/// Build the owned tree without recursion. Nodes are flattened in pre-order,
/// so every descendant sits after its ancestor; folding from the back then
/// attaches each finished subtree to its parent.
fn convert(root: &Node, source: &str) -> AstNode {
    let mut flat: Vec<(Option<usize>, AstNode)> = Vec::new();
    let mut pending: Vec<(Node, Option<usize>)> = vec![(*root, None)];
    while let Some((node, parent)) = pending.pop() {
        let index = flat.len();
        flat.push((parent, leaf(&node, source)));
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        pending.extend(children.into_iter().rev().map(|child| (child, Some(index))));
    }

    let mut converted = None;
    while let Some((parent, mut node)) = flat.pop() {
        // Children were attached last-first
        node.children.reverse();
        match parent {
            Some(parent) => flat[parent].1.children.push(node),
            None => converted = Some(node),
        }
    }
    converted.unwrap_or_else(|| AstNode::new(NodeKind::Root, 1, 0))
}

fn leaf(node: &Node, source: &str) -> AstNode {
    let kind = node_kind(node.kind());
    let text = if kind == NodeKind::Ident {
        node.utf8_text(source.as_bytes()).ok().map(str::to_string)
    } else {
        None
    };
    let mut converted = AstNode::new(kind, node.start_position().row + 1, char_column(node, source));
    converted.text = text;
    converted
}

/// Tree-sitter columns are byte offsets; the host reports characters.
fn char_column(node: &Node, source: &str) -> usize {
    let start = node.start_byte();
    let byte_column = node.start_position().column;
    start
        .checked_sub(byte_column)
        .and_then(|line_start| source.get(line_start..start))
        .map(|prefix| prefix.chars().count())
        .unwrap_or(byte_column)
}
