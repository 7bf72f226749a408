use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{DependencyView, IdGraph};
use crate::types::{AliasDecl, ComponentRecord, DeclarationOrigin};

/// Merged metadata for one component id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy_method: Option<String>,
    pub is_declaratively_defined: bool,
    pub is_marker_defined: bool,
}

impl ComponentInfo {
    fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            class_name: None,
            scope: None,
            init_method: None,
            destroy_method: None,
            is_declaratively_defined: false,
            is_marker_defined: false,
        }
    }

    /// Only ever seen as a reference target, never declared.
    pub fn is_dangling(&self) -> bool {
        !self.is_declaratively_defined && !self.is_marker_defined
    }

    /// Declared both in markup and by an in-source marker.
    pub fn is_dual_defined(&self) -> bool {
        self.is_declaratively_defined && self.is_marker_defined
    }

    fn merge(&mut self, record: &ComponentRecord) {
        match record.origin {
            DeclarationOrigin::Declarative => self.is_declaratively_defined = true,
            DeclarationOrigin::Marker => self.is_marker_defined = true,
        }
        fill(&mut self.class_name, &record.class_name);
        fill(&mut self.scope, &record.scope);
        fill(&mut self.init_method, &record.init_method);
        fill(&mut self.destroy_method, &record.destroy_method);
    }
}

impl AsRef<str> for ComponentInfo {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

/// First writer wins.
fn fill(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none() {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            *slot = Some(v.to_string());
        }
    }
}

/// Directed graph of DI components, edge `x -> y` meaning `x` requires `y`.
///
/// Markup and marker declarations are two write paths into the same nodes,
/// so a component declared both ways is one node with both origin flags set.
/// Referenced components that were never declared still get a node.
#[derive(Debug, Clone)]
pub struct ComponentWiringGraph {
    inner: IdGraph<ComponentInfo>,
    aliases: HashMap<String, String>,
}

impl ComponentWiringGraph {
    pub fn new() -> Self {
        Self {
            inner: IdGraph::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register a component declared in markup. Returns its resolved id.
    pub fn add_declarative(&mut self, record: &ComponentRecord) -> Option<String> {
        self.merge_record(record, DeclarationOrigin::Declarative)
    }

    /// Register a component discovered from an in-source marker. Returns its resolved id.
    pub fn add_marker(&mut self, record: &ComponentRecord) -> Option<String> {
        self.merge_record(record, DeclarationOrigin::Marker)
    }

    /// Register a record through the write path named by its origin tag.
    pub fn add_record(&mut self, record: &ComponentRecord) -> Option<String> {
        match record.origin {
            DeclarationOrigin::Declarative => self.add_declarative(record),
            DeclarationOrigin::Marker => self.add_marker(record),
        }
    }

    /// Make `alias` resolve to `canonical` for records and references added later.
    pub fn register_alias(&mut self, alias: &str, canonical: &str) {
        let alias = alias.trim();
        let canonical = canonical.trim();
        if alias.is_empty() || canonical.is_empty() || alias == canonical {
            return;
        }
        self.aliases
            .entry(alias.to_string())
            .or_insert_with(|| canonical.to_string());
    }

    pub fn add_alias(&mut self, decl: &AliasDecl) {
        self.register_alias(&decl.alias, &decl.canonical);
    }

    /// Follow the alias table from `id` to its canonical id.
    pub fn resolve(&self, id: &str) -> String {
        let mut current = id;
        let mut seen = BTreeSet::new();
        while let Some(next) = self.aliases.get(current) {
            if !seen.insert(current) {
                break;
            }
            current = next;
        }
        current.to_string()
    }

    fn merge_record(
        &mut self,
        record: &ComponentRecord,
        origin: DeclarationOrigin,
    ) -> Option<String> {
        let Some(raw_id) = record.component_id() else {
            debug!(?record.source, "skipping component record without id or class");
            return None;
        };
        let id = self.resolve(&raw_id);

        let from = self
            .inner
            .ensure_node(&id, || ComponentInfo::placeholder(&id));
        if let Some(info) = self.inner.node_mut(&id) {
            let mut tagged = record.clone();
            tagged.origin = origin;
            let was_declared = !info.is_dangling();
            info.merge(&tagged);
            if was_declared {
                debug!(id = %id, %origin, "merged repeated component declaration");
            }
        }

        for reference in &record.references {
            let reference = reference.trim();
            if reference.is_empty() {
                continue;
            }
            let target = self.resolve(reference);
            let to = self
                .inner
                .ensure_node(&target, || ComponentInfo::placeholder(&target));
            self.inner.add_edge(from, to);
        }
        Some(id)
    }

    /// Merged metadata for `id`, or `None` when it was never seen.
    /// Aliases answer for their canonical component.
    pub fn get_info(&self, id: &str) -> Option<ComponentInfo> {
        self.inner.node(&self.resolve(id)).cloned()
    }

    /// Metadata for every node, keyed by id.
    pub fn get_all_component_info(&self) -> BTreeMap<String, ComponentInfo> {
        self.inner
            .graph
            .node_weights()
            .map(|info| (info.id.clone(), info.clone()))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.index.contains_key(&self.resolve(id))
    }

    pub fn node_count(&self) -> usize {
        self.inner.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.graph.edge_count()
    }

    /// All edges as `(from, to)` pairs, sorted.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.inner.edge_pairs()
    }

    /// Ids referenced somewhere but never declared.
    pub fn dangling_references(&self) -> BTreeSet<String> {
        self.inner
            .graph
            .node_weights()
            .filter(|info| info.is_dangling())
            .map(|info| info.id.clone())
            .collect()
    }
}

impl Default for ComponentWiringGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyView for ComponentWiringGraph {
    fn nodes(&self) -> BTreeSet<String> {
        self.inner.ids()
    }

    fn dependencies_of(&self, id: &str) -> BTreeSet<String> {
        self.inner.neighbors(&self.resolve(id), Direction::Outgoing)
    }

    fn dependents_of(&self, id: &str) -> BTreeSet<String> {
        self.inner.neighbors(&self.resolve(id), Direction::Incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_markup_and_marker_converge_on_one_node() {
        let mut graph = ComponentWiringGraph::new();
        graph.add_declarative(&ComponentRecord::declarative("com.acme.UserService").with_id("userService"));
        graph.add_marker(&ComponentRecord::marker("com.acme.UserService"));

        assert_eq!(graph.node_count(), 1);
        let info = graph.get_info("userService").unwrap();
        assert!(info.is_declaratively_defined);
        assert!(info.is_marker_defined);
        assert!(info.is_dual_defined());
    }

    #[test]
    fn test_readding_records_is_idempotent() {
        let mut graph = ComponentWiringGraph::new();
        let record = ComponentRecord::declarative("com.acme.OrderService")
            .with_reference("orderRepository")
            .with_reference("clock");
        graph.add_declarative(&record);
        let (nodes, edges) = (graph.node_count(), graph.edge_count());

        graph.add_declarative(&record);
        graph.add_marker(&ComponentRecord::marker("com.acme.OrderService").with_reference("clock"));

        assert_eq!(graph.node_count(), nodes);
        assert_eq!(graph.edge_count(), edges);
        assert_eq!(edges, 2);
    }

    #[test]
    fn test_first_writer_wins_for_metadata() {
        let mut graph = ComponentWiringGraph::new();
        graph.add_declarative(
            &ComponentRecord::declarative("com.acme.LegacyMailer")
                .with_id("mailer")
                .with_scope("singleton"),
        );
        graph.add_declarative(
            &ComponentRecord::declarative("com.acme.NewMailer")
                .with_id("mailer")
                .with_scope("prototype"),
        );

        let info = graph.get_info("mailer").unwrap();
        assert_eq!(info.class_name.as_deref(), Some("com.acme.LegacyMailer"));
        assert_eq!(info.scope.as_deref(), Some("singleton"));
    }

    #[test]
    fn test_metadata_filled_when_previously_unknown() {
        let mut graph = ComponentWiringGraph::new();
        graph.add_marker(&ComponentRecord::marker("com.acme.Api").with_reference("client"));
        assert_eq!(graph.get_info("client").unwrap().class_name, None);

        graph.add_declarative(&ComponentRecord::declarative("com.acme.HttpClient").with_id("client"));
        let info = graph.get_info("client").unwrap();
        assert_eq!(info.class_name.as_deref(), Some("com.acme.HttpClient"));
        assert!(info.is_declaratively_defined);
        assert!(!info.is_marker_defined);
    }

    #[test]
    fn test_dangling_reference_creates_node() {
        let mut graph = ComponentWiringGraph::new();
        graph.add_marker(&ComponentRecord::marker("com.acme.ReportJob").with_reference("missingDataSource"));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.dependencies_of("reportJob"), set(&["missingDataSource"]));
        let missing = graph.get_info("missingDataSource").unwrap();
        assert!(missing.is_dangling());
        assert_eq!(graph.dangling_references(), set(&["missingDataSource"]));
    }

    #[test]
    fn test_record_without_identity_is_skipped() {
        let mut graph = ComponentWiringGraph::new();
        let record = ComponentRecord::new(DeclarationOrigin::Declarative, None).with_reference("x");
        assert_eq!(graph.add_declarative(&record), None);
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_add_record_dispatches_on_origin() {
        let mut graph = ComponentWiringGraph::new();
        graph.add_record(&ComponentRecord::marker("com.acme.Cache"));
        let info = graph.get_info("cache").unwrap();
        assert!(info.is_marker_defined);
        assert!(!info.is_declaratively_defined);
    }

    #[test]
    fn test_aliases_resolve_records_and_references() {
        let mut graph = ComponentWiringGraph::new();
        graph.register_alias("ds", "dataSource");
        graph.register_alias("primaryDs", "ds");
        graph.add_declarative(&ComponentRecord::declarative("com.acme.Dao").with_reference("primaryDs"));
        graph.add_declarative(&ComponentRecord::declarative("com.zaxxer.HikariDataSource").with_id("ds"));

        assert_eq!(graph.dependencies_of("dao"), set(&["dataSource"]));
        assert!(!graph.nodes().contains("ds"));
        assert!(graph.get_info("dataSource").unwrap().is_declaratively_defined);
    }

    #[test]
    fn test_queries_accept_aliases() {
        let mut graph = ComponentWiringGraph::new();
        graph.register_alias("ds", "dataSource");
        graph.register_alias("primaryDs", "ds");
        graph.add_declarative(&ComponentRecord::declarative("com.acme.Dao").with_reference("dataSource"));
        graph.add_declarative(
            &ComponentRecord::declarative("com.zaxxer.HikariDataSource")
                .with_id("dataSource")
                .with_reference("pool"),
        );

        let info = graph.get_info("primaryDs").unwrap();
        assert_eq!(info.id, "dataSource");
        assert!(graph.contains("ds"));
        assert_eq!(graph.dependents_of("primaryDs"), set(&["dao"]));
        assert_eq!(graph.dependencies_of("ds"), set(&["pool"]));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_alias_loops_terminate() {
        let mut graph = ComponentWiringGraph::new();
        graph.register_alias("a", "b");
        graph.register_alias("b", "a");
        let resolved = graph.resolve("a");
        assert!(resolved == "a" || resolved == "b");
    }

    #[test]
    fn test_self_reference_is_kept() {
        let mut graph = ComponentWiringGraph::new();
        graph.add_marker(&ComponentRecord::marker("com.acme.Node").with_reference("node"));
        assert_eq!(graph.dependencies_of("node"), set(&["node"]));
    }

    #[test]
    fn test_unknown_id_queries() {
        let graph = ComponentWiringGraph::new();
        assert!(graph.get_info("neverSeen").is_none());
        assert!(graph.dependencies_of("neverSeen").is_empty());
        assert!(graph.dependents_of("neverSeen").is_empty());
    }

    #[test]
    fn test_component_info_map_is_a_copy() {
        let mut graph = ComponentWiringGraph::new();
        graph.add_marker(&ComponentRecord::marker("com.acme.A").with_reference("b"));

        let mut all = graph.get_all_component_info();
        all.clear();
        let mut info = graph.get_info("a").unwrap();
        info.is_declaratively_defined = true;

        assert_eq!(graph.get_all_component_info().len(), 2);
        assert!(!graph.get_info("a").unwrap().is_declaratively_defined);
    }
}
