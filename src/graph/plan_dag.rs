use crate::error::{PlanError, PlanResult};
use crate::task::Task;
use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Scheduling dependencies between tasks. An edge `a -> b` means `a` must
/// be scheduled before `b`.
pub struct PlanDag {
    pub graph: DiGraph<usize, ()>,
    nodes: Vec<NodeIndex>,
    priorities: Vec<u32>,
}

impl PlanDag {
    /// Edges come from explicit predecessors, from each child to its
    /// summary, and from a summary's predecessors to everything the summary
    /// spans. Null tasks take no part.
    pub fn build(tasks: &[Task]) -> Self {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(tasks.len(), tasks.len());
        let nodes: Vec<NodeIndex> = (0..tasks.len()).map(|i| graph.add_node(i)).collect();
        let live = |i: usize| tasks.get(i).is_some_and(|t| !t.is_null());

        for (i, task) in tasks.iter().enumerate() {
            if task.is_null() {
                continue;
            }
            for predecessor in &task.predecessors {
                if live(predecessor.task) {
                    graph.update_edge(nodes[predecessor.task], nodes[i], ());
                }
            }
            if let Some(parent) = task.parent().filter(|p| live(*p)) {
                graph.update_edge(nodes[i], nodes[parent], ());
            }
            if let Some(range) = task.summary_range() {
                for predecessor in &task.predecessors {
                    if !live(predecessor.task) {
                        continue;
                    }
                    for child in range.clone().filter(|c| live(*c)) {
                        graph.update_edge(nodes[predecessor.task], nodes[child], ());
                    }
                }
            }
        }

        Self {
            graph,
            nodes,
            priorities: tasks.iter().map(|t| t.priority).collect(),
        }
    }

    /// True if `before` has to be scheduled ahead of `after`, directly or
    /// through other tasks.
    pub fn depends_on(&self, after: usize, before: usize) -> bool {
        match (self.nodes.get(before), self.nodes.get(after)) {
            (Some(&from), Some(&to)) if from != to => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    /// Dependency first, then higher priority, then lower index.
    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        if self.depends_on(b, a) {
            return Ordering::Less;
        }
        if self.depends_on(a, b) {
            return Ordering::Greater;
        }
        let priority = |i: usize| self.priorities.get(i).copied().unwrap_or(0);
        priority(b).cmp(&priority(a)).then(a.cmp(&b))
    }

    /// Every task index in scheduling order. Among tasks whose
    /// dependencies are satisfied, higher priority and then lower index go
    /// first.
    pub fn scheduling_order(&self) -> PlanResult<Vec<usize>> {
        let count = self.nodes.len();
        let mut waiting: Vec<usize> = self
            .nodes
            .iter()
            .map(|&n| self.graph.neighbors_directed(n, petgraph::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<(u32, Reverse<usize>)> = (0..count)
            .filter(|&i| waiting[i] == 0)
            .map(|i| (self.priorities[i], Reverse(i)))
            .collect();

        let mut order = Vec::with_capacity(count);
        while let Some((_, Reverse(i))) = ready.pop() {
            order.push(i);
            for next in self.graph.neighbors_directed(self.nodes[i], petgraph::Outgoing) {
                let j = self.graph[next];
                waiting[j] -= 1;
                if waiting[j] == 0 {
                    ready.push((self.priorities[j], Reverse(j)));
                }
            }
        }

        if order.len() < count {
            return Err(PlanError::CyclicPredecessors {
                tasks: self.cyclic_tasks(),
            });
        }
        Ok(order)
    }

    /// Task indices that sit on a dependency cycle, ascending.
    pub fn cyclic_tasks(&self) -> Vec<usize> {
        let mut tasks: Vec<usize> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || self.graph.contains_edge(component[0], component[0])
            })
            .flatten()
            .map(|node| self.graph[node])
            .collect();
        tasks.sort_unstable();
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predecessors::Predecessors;

    fn task(title: &str, predecessors: &str, priority: u32) -> Task {
        let mut task = Task::new(title);
        task.predecessors = predecessors.parse::<Predecessors>().unwrap();
        task.priority = priority;
        task
    }

    #[test]
    fn order_prefers_priority_then_index() {
        let tasks = vec![task("a", "", 100), task("b", "", 500), task("c", "", 100)];
        let dag = PlanDag::build(&tasks);
        assert_eq!(dag.scheduling_order().unwrap(), vec![1, 0, 2]);
        assert_eq!(dag.compare(1, 0), Ordering::Less);
        assert_eq!(dag.compare(0, 2), Ordering::Less);
    }

    #[test]
    fn predecessors_win_over_priority() {
        let tasks = vec![task("a", "1", 900), task("b", "", 1)];
        let dag = PlanDag::build(&tasks);
        assert_eq!(dag.scheduling_order().unwrap(), vec![1, 0]);
        assert_eq!(dag.compare(1, 0), Ordering::Less);
        assert!(dag.depends_on(0, 1));
    }

    #[test]
    fn cycles_report_involved_tasks() {
        let tasks = vec![task("a", "2", 100), task("b", "", 100), task("c", "0", 100), task("d", "3", 100)];
        let dag = PlanDag::build(&tasks);
        assert_eq!(
            dag.scheduling_order(),
            Err(PlanError::CyclicPredecessors { tasks: vec![0, 2, 3] })
        );
    }
}
