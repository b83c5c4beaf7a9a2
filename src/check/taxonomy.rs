//! Section code → rule tag table
//!
//! Replies cite style-guide sections as dotted codes such as `(2.3.1)`.
//! The table maps each known code to the canonical rule tag used in
//! diagnostic markers, plus the category that selects how the message is
//! formatted.

use std::collections::HashMap;

/// How a rule's message is shaped before it reaches the host logger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    /// Javadoc rules: comment rewrite plus template escaping
    Documentation,
    /// Naming rules: message passed through as an opaque argument
    Naming,
}

/// A classified rule from the taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleTag {
    pub name: &'static str,
    pub category: RuleCategory,
}

impl RuleTag {
    pub const fn new(name: &'static str, category: RuleCategory) -> Self {
        Self { name, category }
    }

    pub fn is_documentation(&self) -> bool {
        self.category == RuleCategory::Documentation
    }
}

/// Marker used when a finding cites no known section
pub const GENERIC_MARKER: &str = "LLMStyle";

const DEFAULT_SECTIONS: [(&str, RuleTag); 9] = [
    // 1 - Documentation
    ("1.1.1", RuleTag::new("SummaryJavadoc", RuleCategory::Documentation)),
    ("1.1.2", RuleTag::new("JavadocRequired", RuleCategory::Documentation)),
    // 2 - Naming conventions
    ("2.1.1", RuleTag::new("ClassName", RuleCategory::Naming)),
    ("2.2.1", RuleTag::new("MethodName", RuleCategory::Naming)),
    ("2.3.1", RuleTag::new("ConstantName", RuleCategory::Naming)),
    ("2.3.2", RuleTag::new("MemberName", RuleCategory::Naming)),
    ("2.4.1", RuleTag::new("ParameterName", RuleCategory::Naming)),
    ("2.5.1", RuleTag::new("LocalVariableName", RuleCategory::Naming)),
    ("2.6.1", RuleTag::new("TypeVariableName", RuleCategory::Naming)),
];

/// Read-only mapping from section code to rule tag.
///
/// Built once and shared by reference; nothing mutates it after
/// construction.
#[derive(Debug, Clone)]
pub struct TaxonomyTable {
    sections: HashMap<&'static str, RuleTag>,
}

impl Default for TaxonomyTable {
    fn default() -> Self {
        Self::from_entries(DEFAULT_SECTIONS)
    }
}

impl TaxonomyTable {
    pub fn from_entries(entries: impl IntoIterator<Item = (&'static str, RuleTag)>) -> Self {
        Self {
            sections: entries.into_iter().collect(),
        }
    }

    /// Look up a dotted section code such as `"2.3.1"`
    pub fn lookup(&self, code: &str) -> Option<RuleTag> {
        self.sections.get(code.trim()).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.lookup(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// All tags in the table, sorted by section code
    pub fn entries(&self) -> Vec<(&'static str, RuleTag)> {
        let mut entries: Vec<_> = self.sections.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
