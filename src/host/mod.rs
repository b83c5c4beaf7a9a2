//! Host engine contract
//!
//! The check runs inside a host that owns the syntax tree and the diagnostic
//! log. This module is the seam: an owned [`AstNode`] tree the host builds
//! for each file, and a [`DiagnosticSink`] that receives located messages.

pub mod java;

use crate::check::{render_template, ResolvedLocation, Severity};
use std::path::Path;

/// Node types the location resolver distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Ident,
    ClassDef,
    MethodDef,
    VariableDef,
    ParameterDef,
    /// Any other grammar node, keyed by the grammar's own name
    Other(String),
}

impl NodeKind {
    /// Definition nodes whose first identifier child names them
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            NodeKind::ClassDef | NodeKind::MethodDef | NodeKind::VariableDef | NodeKind::ParameterDef
        )
    }
}

/// A syntax tree node as exposed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    pub kind: NodeKind,
    /// 1-based line
    pub line: usize,
    /// 0-based column
    pub column: usize,
    pub text: Option<String>,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(kind: NodeKind, line: usize, column: usize) -> Self {
        Self {
            kind,
            line,
            column,
            text: None,
            children: Vec::new(),
        }
    }

    pub fn ident(name: &str, line: usize, column: usize) -> Self {
        let mut node = Self::new(NodeKind::Ident, line, column);
        node.text = Some(name.to_string());
        node
    }

    pub fn with_children(mut self, children: Vec<AstNode>) -> Self {
        self.children = children;
        self
    }

    /// First direct child of the given kind
    pub fn find_first_child(&self, kind: &NodeKind) -> Option<&AstNode> {
        self.children.iter().find(|c| &c.kind == kind)
    }

    pub fn text_eq(&self, name: &str) -> bool {
        self.text.as_deref() == Some(name)
    }

    /// Number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

// Long expression chains nest thousands of levels deep; dropping them
// recursively would overflow the stack.
impl Drop for AstNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// A located message handed to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: ResolvedLocation,
    /// Message template in the host's format syntax
    pub template: String,
    /// Single argument substituted for `{0}`, if the template takes one
    pub argument: Option<String>,
}

impl Diagnostic {
    /// The message as the host's template formatter renders it
    pub fn message(&self) -> String {
        let args: Vec<&str> = self.argument.as_deref().into_iter().collect();
        render_template(&self.template, &args)
    }

    /// `[SEVERITY] path:line[:col]: message`, with a 1-based column
    pub fn to_line(&self, path: &Path) -> String {
        let position = match (self.location.line, self.location.column) {
            (Some(line), Some(column)) => format!(":{}:{}", line, column + 1),
            (Some(line), None) => format!(":{}", line),
            _ => String::new(),
        };
        format!(
            "[{}] {}{}: {}",
            self.severity,
            path.display(),
            position,
            self.message()
        )
    }
}

/// Receives diagnostics for the file currently being checked
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}
