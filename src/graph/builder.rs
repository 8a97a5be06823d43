//! Per-bucket dependency graph construction.
//!
//! Graphs are rebuilt from scratch on every orchestration pass and never
//! persisted. An edge is only admitted if it keeps the graph acyclic; an edge
//! that would close a cycle is dropped and logged, and the pass continues.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::graph::resolver::DependencyResolver;
use crate::registry::registry::ComponentRegistry;
use crate::traits::LatticeError;

/// Priority-ordered bucket classification.
///
/// Each bucket is a list of type tags. A component lands in the first bucket
/// matching any of its tags; components matching none land in an implicit
/// final catch-all bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketSpec {
    buckets: Vec<Vec<String>>,
}

impl BucketSpec {
    /// Spec with only the catch-all bucket; every component shares one graph.
    pub fn single() -> Self {
        Self::default()
    }

    pub fn new<I, J, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            buckets: buckets
                .into_iter()
                .map(|tags| tags.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Number of buckets including the catch-all.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len() + 1
    }

    /// Index of the first bucket matching any of the given tags.
    pub fn bucket_for(&self, kinds: &[String]) -> usize {
        self.buckets
            .iter()
            .position(|tags| tags.iter().any(|tag| kinds.contains(tag)))
            .unwrap_or(self.buckets.len())
    }
}

/// Directed acyclic graph over component names within one bucket.
///
/// Edge `from -> to` means "`from` depends on `to`": `to` must reach the
/// current phase first during build, and `from` must release resources first
/// during teardown.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    dependencies: Vec<Vec<usize>>,
    /// Reverse adjacency, maintained in parallel for ordering and the cycle
    /// probe
    dependents: Vec<Vec<usize>>,
}

impl DependencyGraph {
    pub fn add_vertex(&mut self, name: &str) -> usize {
        if let Some(&existing) = self.index.get(name) {
            return existing;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        self.dependencies.push(Vec::new());
        self.dependents.push(Vec::new());
        id
    }

    /// Add `from -> to` unless it would close a cycle.
    ///
    /// Returns `false` when the edge was dropped to preserve acyclicity.
    pub fn try_add_edge(&mut self, from: usize, to: usize) -> bool {
        if from == to || self.dependencies[from].contains(&to) {
            return true;
        }
        if self.reaches(to, from) {
            return false;
        }
        self.dependencies[from].push(to);
        self.dependents[to].push(from);
        true
    }

    /// Whether `target` is reachable from `start` along dependency edges.
    fn reaches(&self, start: usize, target: usize) -> bool {
        let mut stack = vec![start];
        let mut visited = HashSet::new();
        while let Some(vertex) = stack.pop() {
            if vertex == target {
                return true;
            }
            if visited.insert(vertex) {
                stack.extend(self.dependencies[vertex].iter().copied());
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&from), Some(&to)) => self.dependencies[from].contains(&to),
            _ => false,
        }
    }

    /// Names `name` directly depends on.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&id| {
                self.dependencies[id]
                    .iter()
                    .map(|&dep| self.names[dep].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn dependency_ids(&self, id: usize) -> &[usize] {
        &self.dependencies[id]
    }

    pub(crate) fn dependent_ids(&self, id: usize) -> &[usize] {
        &self.dependents[id]
    }
}

/// Builds one graph per phase bucket from resolved dependencies.
pub struct GraphBuilder<'a> {
    registry: &'a ComponentRegistry,
    resolver: DependencyResolver<'a>,
    spec: &'a BucketSpec,
    graphs: Vec<DependencyGraph>,
    /// Per-pass memo so each component's dependencies are resolved once
    processed: HashSet<String>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        registry: &'a ComponentRegistry,
        resolver: DependencyResolver<'a>,
        spec: &'a BucketSpec,
    ) -> Self {
        let graphs = (0..spec.bucket_count())
            .map(|_| DependencyGraph::default())
            .collect();
        Self {
            registry,
            resolver,
            spec,
            graphs,
            processed: HashSet::new(),
        }
    }

    /// Add a component and its resolved dependencies to its bucket's graph.
    pub fn add_to_graph(&mut self, name: &str) -> Result<(), LatticeError> {
        if !self.processed.insert(name.to_string()) {
            return Ok(());
        }
        let Some(record) = self.registry.record(name) else {
            debug!("Component '{}' is not registered, skipping graph insertion", name);
            return Ok(());
        };

        let bucket = self.spec.bucket_for(&record.kinds);
        let graph = &mut self.graphs[bucket];
        let from = graph.add_vertex(name);

        for (dependency, _) in self.resolver.resolve(name)? {
            let to = graph.add_vertex(&dependency);
            if !graph.try_add_edge(from, to) {
                info!(
                    "Dropping dependency edge '{}' -> '{}': it would close a cycle",
                    name, dependency
                );
            }
        }
        Ok(())
    }

    /// Finished per-bucket graphs, in bucket priority order.
    pub fn into_graphs(self) -> Vec<DependencyGraph> {
        self.graphs
    }
}
