//! Dependency Resolver
//!
//! Builds the per-batch directed graph of plugin ids and produces a
//! topological load order. Names are interned into dense indices so the
//! cycle check and sort walk integer adjacency lists instead of re-hashing
//! strings. A fresh resolver is constructed for every registration batch.

use crate::plugin::error::{PluginError, PluginResult};
use std::collections::HashMap;

#[derive(Default)]
pub struct DependencyResolver {
    names: Vec<String>,
    index: HashMap<String, usize>,
    dependencies: Vec<Vec<usize>>,
    registered: Vec<bool>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, name: &str) -> usize {
        if let Some(&index) = self.index.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), index);
        self.dependencies.push(Vec::new());
        self.registered.push(false);
        index
    }

    /// Record a node and its dependency set, overwriting any prior entry
    /// for the same id
    pub fn add_node(&mut self, id: &str, dependencies: &[String]) {
        let node = self.intern(id);
        self.registered[node] = true;

        let mut edges = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            let target = self.intern(dependency);
            if target != node && !edges.contains(&target) {
                edges.push(target);
            }
        }
        self.dependencies[node] = edges;
    }

    pub fn node_count(&self) -> usize {
        self.registered.iter().filter(|r| **r).count()
    }

    /// DFS cycle check with an explicit recursion stack set
    pub fn has_circular_dependencies(&self) -> bool {
        let mut visited = vec![false; self.names.len()];
        let mut on_stack = vec![false; self.names.len()];

        for node in 0..self.names.len() {
            if !visited[node] && self.walk_for_cycle(node, &mut visited, &mut on_stack) {
                return true;
            }
        }
        false
    }

    fn walk_for_cycle(&self, node: usize, visited: &mut [bool], on_stack: &mut [bool]) -> bool {
        visited[node] = true;
        on_stack[node] = true;
        for &dependency in &self.dependencies[node] {
            if on_stack[dependency] {
                return true;
            }
            if !visited[dependency] && self.walk_for_cycle(dependency, visited, on_stack) {
                return true;
            }
        }
        on_stack[node] = false;
        false
    }

    /// Post-order DFS topological sort, in insertion order
    ///
    /// Dependencies sort before their dependents. The mid-traversal cycle
    /// check is defensive; callers are expected to run
    /// `has_circular_dependencies` first.
    pub fn resolve_load_order(&self) -> PluginResult<Vec<String>> {
        let mut visited = vec![false; self.names.len()];
        let mut on_stack = vec![false; self.names.len()];
        let mut order = Vec::with_capacity(self.node_count());

        for node in 0..self.names.len() {
            if !visited[node] {
                self.visit(node, &mut visited, &mut on_stack, &mut order)?;
            }
        }
        Ok(order)
    }

    fn visit(
        &self,
        node: usize,
        visited: &mut [bool],
        on_stack: &mut [bool],
        order: &mut Vec<String>,
    ) -> PluginResult<()> {
        visited[node] = true;
        on_stack[node] = true;
        for &dependency in &self.dependencies[node] {
            if on_stack[dependency] {
                return Err(PluginError::CircularDependency {
                    message: format!(
                        "dependency cycle through '{}' and '{}'",
                        self.names[node], self.names[dependency]
                    ),
                });
            }
            if !visited[dependency] {
                self.visit(dependency, visited, on_stack, order)?;
            }
        }
        on_stack[node] = false;
        if self.registered[node] {
            order.push(self.names[node].clone());
        }
        Ok(())
    }
}

impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes: Vec<(&str, Vec<&str>)> = self
            .names
            .iter()
            .enumerate()
            .filter(|(node, _)| self.registered[*node])
            .map(|(node, name)| {
                (
                    name.as_str(),
                    self.dependencies[node]
                        .iter()
                        .map(|&d| self.names[d].as_str())
                        .collect(),
                )
            })
            .collect();
        f.debug_struct("DependencyResolver")
            .field("nodes", &nodes)
            .finish()
    }
}
