//! Name-based tool dispatch and citation bookkeeping.

use super::{Citation, Tool, ToolDeclaration, ToolOutput};
use crate::error::{LecternError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

/// Citations gathered while answering one request.
///
/// Keyed by the reporting tool's registration index, so the first non-empty
/// list in registration order wins and each tool's last report replaces its
/// previous one.
#[derive(Debug, Clone, Default)]
pub struct CitationCollector {
    by_tool: BTreeMap<usize, Vec<Citation>>,
}

impl CitationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, index: usize, citations: Vec<Citation>) {
        self.by_tool.insert(index, citations);
    }

    /// First non-empty citation list in tool registration order.
    pub fn latest(&self) -> Vec<Citation> {
        self.by_tool
            .values()
            .find(|c| !c.is_empty())
            .cloned()
            .unwrap_or_default()
    }

    pub fn into_latest(self) -> Vec<Citation> {
        self.by_tool
            .into_values()
            .find(|c| !c.is_empty())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tool.values().all(Vec::is_empty)
    }
}

/// Registered tools, kept in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    /// Last citations reported by each tool, parallel to `tools`.
    citations: RwLock<Vec<Vec<Citation>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later registration under the same name replaces
    /// the earlier tool but keeps its position.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_shared(Arc::new(tool))
    }

    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.declaration().name;
        if name.trim().is_empty() {
            return Err(LecternError::Tool(
                "tool declaration must have a name".to_string(),
            ));
        }

        let tool_tracks = tool.tracks_citations();
        let citations = self
            .citations
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);

        match self.index.get(&name) {
            Some(&i) => {
                warn!(tool = %name, "Replacing previously registered tool");
                self.tools[i] = tool;
                citations[i].clear();
            }
            None => {
                self.index.insert(name.clone(), self.tools.len());
                self.tools.push(tool);
                citations.push(Vec::new());
                info!(tool = %name, tracks_citations = tool_tracks, "Registered tool");
            }
        }
        Ok(())
    }

    /// Declarations of all tools in registration order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|t| t.declaration()).collect()
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

    /// Execute a tool by name.
    ///
    /// Unknown names are not an error: they yield a "not found" text for the
    /// model. Citations go to the registry-wide cache.
    pub async fn execute(&self, name: &str, args: &serde_json::Value) -> Result<String> {
        let mut collector = CitationCollector::new();
        self.execute_collecting(name, args, &mut collector).await
    }

    /// Execute a tool by name, recording its citations into `collector`.
    #[instrument(skip(self, args, collector))]
    pub async fn execute_collecting(
        &self,
        name: &str,
        args: &serde_json::Value,
        collector: &mut CitationCollector,
    ) -> Result<String> {
        let Some(&i) = self.index.get(name) else {
            debug!("Unknown tool requested");
            return Ok(not_found(name));
        };

        let tool = &self.tools[i];
        let ToolOutput { text, citations } = tool.execute(args).await?;

        // Only tools that declare citation tracking may touch the stored lists
        if let Some(citations) = citations.filter(|_| tool.tracks_citations()) {
            debug!(count = citations.len(), "Tool reported citations");
            collector.record(i, citations.clone());
            let mut cache = self.citations.write().unwrap_or_else(PoisonError::into_inner);
            cache[i] = citations;
        }

        Ok(text)
    }

    /// First non-empty citation list across tools in registration order.
    pub fn latest_citations(&self) -> Vec<Citation> {
        let cache = self.citations.read().unwrap_or_else(PoisonError::into_inner);
        cache.iter().find(|c| !c.is_empty()).cloned().unwrap_or_default()
    }

    /// Reset every tool's stored citations.
    pub fn clear_citations(&self) {
        let mut cache = self.citations.write().unwrap_or_else(PoisonError::into_inner);
        cache.iter_mut().for_each(Vec::clear);
    }
}

/// Text returned for a tool name nothing is registered under.
pub(crate) fn not_found(name: &str) -> String {
    format!("Tool '{}' not found", name)
}
