use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use crate::context::RunContext;

/// Node execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

type NodeFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;
type NodeFn = Box<dyn for<'a> Fn(&'a RunContext) -> NodeFuture<'a> + Send + Sync>;

struct DagNode {
    name: String,
    dependencies: Vec<String>,
    work: NodeFn,
    status: NodeStatus,
}

/// Directed acyclic graph of pipeline stages, executed in dependency
/// order. A node whose dependency failed is skipped rather than run;
/// whether a single node failure aborts the whole run is controlled by
/// `fail_fast` at `execute` time.
#[derive(Default)]
pub struct Dag {
    nodes: Vec<DagNode>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DagSummary {
    pub total_nodes: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub node_statuses: HashMap<String, NodeStatus>,
    pub execution_order: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DagError {
    #[error("node {0} already exists")]
    DuplicateNode(String),
    #[error("node {node} depends on non-existent node {dep}")]
    UnknownDependency { node: String, dep: String },
    #[error("DAG contains a cycle")]
    Cycle,
}

impl Dag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. `work` receives the shared `RunContext` and
    /// returns `Err` with a message on failure.
    pub fn add_node<F>(&mut self, name: &str, dependencies: &[&str], work: F) -> Result<(), DagError>
    where
        F: for<'a> Fn(&'a RunContext) -> NodeFuture<'a> + Send + Sync + 'static,
    {
        if self.nodes.iter().any(|n| n.name == name) {
            return Err(DagError::DuplicateNode(name.to_string()));
        }
        self.nodes.push(DagNode {
            name: name.to_string(),
            dependencies: dependencies.iter().map(|s| s.to_string()).collect(),
            work: Box::new(work),
            status: NodeStatus::Pending,
        });
        Ok(())
    }

    fn validate(&self) -> Result<(), DagError> {
        let names: HashSet<&str> = self.nodes.iter().map(|n| n.name.as_str()).collect();
        for node in &self.nodes {
            for dep in &node.dependencies {
                if !names.contains(dep.as_str()) {
                    return Err(DagError::UnknownDependency {
                        node: node.name.clone(),
                        dep: dep.clone(),
                    });
                }
            }
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut rec_stack: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if !visited.contains(node.name.as_str())
                && self.has_cycle(&node.name, &mut visited, &mut rec_stack)
            {
                return Err(DagError::Cycle);
            }
        }
        Ok(())
    }

    fn has_cycle<'a>(
        &'a self,
        name: &'a str,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut HashSet<&'a str>,
    ) -> bool {
        visited.insert(name);
        rec_stack.insert(name);

        let node = self.nodes.iter().find(|n| n.name == name).expect("node exists");
        for dep in &node.dependencies {
            let dep = dep.as_str();
            if !visited.contains(dep) {
                if self.has_cycle(dep, visited, rec_stack) {
                    return true;
                }
            } else if rec_stack.contains(dep) {
                return true;
            }
        }

        rec_stack.remove(name);
        false
    }

    /// Kahn's algorithm, breaking ties lexicographically so the order is
    /// deterministic across runs with the same graph shape.
    fn execution_order(&self) -> Result<Vec<String>, DagError> {
        let mut in_degree: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.name.as_str(), 0)).collect();
        for node in &self.nodes {
            for dep in &node.dependencies {
                *in_degree.get_mut(dep.as_str()).expect("dep validated") += 0;
            }
        }
        for node in &self.nodes {
            for _dep in &node.dependencies {
                *in_degree.get_mut(node.name.as_str()).expect("node exists") += 1;
            }
        }

        let mut queue: Vec<&str> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&name, _)| name)
            .collect();
        queue.sort_unstable();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(current) = {
            queue.sort_unstable();
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        } {
            order.push(current.to_string());
            for node in &self.nodes {
                if node.dependencies.iter().any(|d| d == current) {
                    let degree = in_degree.get_mut(node.name.as_str()).expect("node exists");
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push(node.name.as_str());
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(DagError::Cycle);
        }
        Ok(order)
    }

    /// Run every node in topological order. If `fail_fast` is false
    /// (the default batch behaviour), a failed node's dependents are
    /// skipped but independent branches keep running.
    pub async fn execute(&mut self, ctx: &RunContext, fail_fast: bool) -> Result<DagSummary, DagError> {
        self.validate()?;
        let order = self.execution_order()?;

        tracing::info!(order = %order.join(" -> "), "DAG execution order resolved");

        let mut completed: HashSet<String> = HashSet::new();
        let mut failed: HashSet<String> = HashSet::new();
        // Names that should block their dependents from running: nodes
        // that themselves failed, plus nodes that were skipped (whether
        // for a failed dependency or the time budget) so a skip
        // propagates transitively (A fails -> B skips -> C skips).
        let mut blocking: HashSet<String> = HashSet::new();

        for name in &order {
            let idx = self.nodes.iter().position(|n| &n.name == name).expect("node exists");

            if ctx.time_budget_exceeded() {
                self.nodes[idx].status = NodeStatus::Skipped;
                blocking.insert(name.clone());
                ctx.add_error(name, "skipped: time budget exceeded", None);
                tracing::warn!(node = %name, "skipping node, time budget exceeded");
                continue;
            }

            let deps_failed = self.nodes[idx]
                .dependencies
                .iter()
                .any(|d| blocking.contains(d));

            if deps_failed {
                self.nodes[idx].status = NodeStatus::Skipped;
                blocking.insert(name.clone());
                tracing::warn!(node = %name, "skipping node, a dependency failed");
                continue;
            }

            self.nodes[idx].status = NodeStatus::Running;
            tracing::info!(node = %name, "executing node");

            let result = (self.nodes[idx].work)(ctx).await;
            match result {
                Ok(()) => {
                    self.nodes[idx].status = NodeStatus::Success;
                    completed.insert(name.clone());
                    tracing::info!(node = %name, "node completed successfully");
                }
                Err(message) => {
                    self.nodes[idx].status = NodeStatus::Failed;
                    failed.insert(name.clone());
                    blocking.insert(name.clone());
                    ctx.add_error(name, message.clone(), None);
                    tracing::error!(node = %name, error = %message, "node failed");
                    if fail_fast {
                        break;
                    }
                }
            }
        }

        let node_statuses = self
            .nodes
            .iter()
            .map(|n| (n.name.clone(), n.status))
            .collect();
        let skipped = self
            .nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Skipped)
            .count();

        Ok(DagSummary {
            total_nodes: self.nodes.len(),
            completed: completed.len(),
            failed: failed.len(),
            skipped,
            node_statuses,
            execution_order: order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentineldesk_common::config::RunMode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn runs_nodes_in_dependency_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut dag = Dag::new();

        let o1 = Arc::clone(&order);
        dag.add_node("a", &[], move |_ctx| {
            let o = Arc::clone(&o1);
            Box::pin(async move {
                o.lock().unwrap().push("a");
                Ok(())
            })
        })
        .unwrap();

        let o2 = Arc::clone(&order);
        dag.add_node("b", &["a"], move |_ctx| {
            let o = Arc::clone(&o2);
            Box::pin(async move {
                o.lock().unwrap().push("b");
                Ok(())
            })
        })
        .unwrap();

        let ctx = RunContext::new(RunMode::Incremental, None, None);
        let summary = dag.execute(&ctx, false).await.unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn dependents_of_a_failed_node_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dag = Dag::new();

        dag.add_node("a", &[], |_ctx| Box::pin(async { Err("boom".to_string()) }))
            .unwrap();

        let c = Arc::clone(&calls);
        dag.add_node("b", &["a"], move |_ctx| {
            let c = Arc::clone(&c);
            Box::pin(async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .unwrap();

        let ctx = RunContext::new(RunMode::Incremental, None, None);
        let summary = dag.execute(&ctx, false).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.error_count(), 1);
    }

    #[tokio::test]
    async fn a_skip_propagates_transitively_through_a_chain() {
        // A -> B -> C: A fails, so B is skipped (not failed), and C must
        // skip too because its dependency never ran successfully.
        let c_calls = Arc::new(AtomicUsize::new(0));
        let mut dag = Dag::new();

        dag.add_node("a", &[], |_ctx| Box::pin(async { Err("boom".to_string()) }))
            .unwrap();
        dag.add_node("b", &["a"], |_ctx| Box::pin(async { Ok(()) })).unwrap();

        let c = Arc::clone(&c_calls);
        dag.add_node("c", &["b"], move |_ctx| {
            let c = Arc::clone(&c);
            Box::pin(async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .unwrap();

        let ctx = RunContext::new(RunMode::Incremental, None, None);
        let summary = dag.execute(&ctx, false).await.unwrap();

        assert_eq!(summary.node_statuses["a"], NodeStatus::Failed);
        assert_eq!(summary.node_statuses["b"], NodeStatus::Skipped);
        assert_eq!(summary.node_statuses["c"], NodeStatus::Skipped);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_node_names_are_rejected() {
        let mut dag = Dag::new();
        dag.add_node("a", &[], |_ctx| Box::pin(async { Ok(()) })).unwrap();
        let err = dag.add_node("a", &[], |_ctx| Box::pin(async { Ok(()) }));
        assert!(matches!(err, Err(DagError::DuplicateNode(_))));
    }

    #[test]
    fn cycles_are_detected() {
        let mut dag = Dag::new();
        dag.add_node("a", &["b"], |_ctx| Box::pin(async { Ok(()) })).unwrap();
        dag.add_node("b", &["a"], |_ctx| Box::pin(async { Ok(()) })).unwrap();
        assert!(matches!(dag.validate(), Err(DagError::Cycle)));
    }
}
