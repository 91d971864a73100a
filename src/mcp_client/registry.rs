//! Tool catalog — the merged, filtered view of every ready upstream's tools.
//!
//! Provides:
//! - Insertion in upstream configuration order, rejecting duplicate names
//! - Tool lookup by namespaced name (`server_toolname`)
//! - Owner lookup so a call can be routed without re-parsing the name

use std::collections::HashMap;

use super::types::Tool;

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Aggregated tool catalog across all upstreams.
///
/// Keeps insertion order for `tools/list` and an index for routing.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: Vec<Tool>,
    /// `tool_name → (upstream name, position in tools)`.
    index: HashMap<String, (String, usize)>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool owned by `upstream`.
    ///
    /// Returns `false` (and keeps the first entry) when the name is taken.
    pub fn insert(&mut self, upstream: &str, tool: Tool) -> bool {
        if let Some((owner, _)) = self.index.get(&tool.name) {
            tracing::warn!(
                tool = %tool.name,
                kept = %owner,
                dropped = %upstream,
                "duplicate tool name in catalog, keeping first"
            );
            return false;
        }

        self.index
            .insert(tool.name.clone(), (upstream.to_string(), self.tools.len()));
        self.tools.push(tool);
        true
    }

    /// All tools, in insertion order.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Look up a tool by its namespaced name.
    #[cfg(test)]
    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|(_, idx)| &self.tools[*idx])
    }

    /// The upstream that owns a tool.
    pub fn owner_of(&self, name: &str) -> Option<&str> {
        self.index.get(name).map(|(owner, _)| owner.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names, in insertion order.
    #[cfg(test)]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
