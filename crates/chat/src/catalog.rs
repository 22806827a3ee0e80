//! Tool catalog: the descriptors fetched from the tool host, adapted to the
//! shape the model's function-calling interface expects.

use crate::model::ToolSpec;

impl From<mcp::Tool> for ToolSpec {
    /// Adapt one tool descriptor. The input schema is carried verbatim; only
    /// the field names change. A missing description becomes an empty string.
    fn from(tool: mcp::Tool) -> Self {
        Self {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            parameters: tool.input_schema,
        }
    }
}

/// The tools available for a session.
///
/// Built once at connect time from the host's descriptors and read-only
/// thereafter. Order follows the host's listing.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    specs: Vec<ToolSpec>,
}

impl ToolCatalog {
    /// Build the catalog from the host's descriptors.
    pub fn new(tools: Vec<mcp::Tool>) -> Self {
        Self {
            specs: tools.into_iter().map(ToolSpec::from).collect(),
        }
    }

    /// The adapted specs, in listing order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Look up a spec by tool name.
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Whether a tool of this name is in the catalog.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Tool names, in listing order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }
}
