//! Orden topológico (Kahn) y detección de ciclos (DFS) sobre los steps.
//!
//! Los nodos se indexan por posición de declaración. Las referencias a ids
//! inexistentes se ignoran aquí: el validador ya las reporta.
use std::collections::{BTreeSet, HashMap};

use indexmap::IndexSet;

use crate::errors::DslError;
use crate::model::Step;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    ids: Vec<String>,
    /// Para cada nodo, los nodos de los que depende (sus `inputs`).
    parents: Vec<IndexSet<usize>>,
    /// Para cada nodo, los nodos que lo consumen.
    children: Vec<IndexSet<usize>>,
}

impl DependencyGraph {
    pub fn from_steps(steps: &[Step]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(steps.len());
        for (i, s) in steps.iter().enumerate() {
            index.entry(s.id.as_str()).or_insert(i);
        }
        let mut parents = vec![IndexSet::new(); steps.len()];
        let mut children = vec![IndexSet::new(); steps.len()];
        for (i, s) in steps.iter().enumerate() {
            for input in &s.inputs {
                if let Some(&p) = index.get(input.as_str()) {
                    parents[i].insert(p);
                    children[p].insert(i);
                }
            }
        }
        Self { ids: steps.iter().map(|s| s.id.clone()).collect(),
               parents,
               children }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids de los steps que consumen el resultado de `id`.
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.ids
            .iter()
            .position(|x| x == id)
            .map(|i| self.children[i].iter().map(|&c| self.ids[c].as_str()).collect())
            .unwrap_or_default()
    }

    /// Kahn: entre los nodos listos siempre se elige el declarado antes, así
    /// un modelo ya ordenado se ejecuta en su orden de declaración.
    pub fn topological_order(&self) -> Result<Vec<String>, DslError> {
        let n = self.ids.len();
        let mut in_degree: Vec<usize> = self.parents.iter().map(IndexSet::len).collect();
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = ready.pop_first() {
            order.push(node);
            for &child in &self.children[node] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.insert(child);
                }
            }
        }

        if order.len() != n {
            let path = self.find_cycles()
                           .into_iter()
                           .next()
                           .unwrap_or_else(|| (0..n).filter(|&i| in_degree[i] > 0).map(|i| self.ids[i].clone()).collect());
            return Err(DslError::CircularDependency { path });
        }
        Ok(order.into_iter().map(|i| self.ids[i].clone()).collect())
    }

    /// DFS desde cada nodo siguiendo las dependencias. Un nodo revisitado
    /// mientras sigue en el camino actual cierra un ciclo; se devuelve el
    /// camino completo, p.ej. `["a", "b", "a"]`.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            OnPath,
            Done,
        }

        let n = self.ids.len();
        let mut mark = vec![Mark::New; n];
        let mut cycles = Vec::new();

        for root in 0..n {
            if mark[root] != Mark::New {
                continue;
            }
            // Pila explícita: (nodo, siguiente padre a visitar).
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            let mut path: Vec<usize> = vec![root];
            mark[root] = Mark::OnPath;

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                if let Some(&parent) = self.parents[node].get_index(next) {
                    frame.1 += 1;
                    match mark[parent] {
                        Mark::New => {
                            mark[parent] = Mark::OnPath;
                            stack.push((parent, 0));
                            path.push(parent);
                        }
                        Mark::OnPath => {
                            let start = path.iter().position(|&p| p == parent).unwrap_or(0);
                            let mut cycle: Vec<String> = path[start..].iter().map(|&i| self.ids[i].clone()).collect();
                            cycle.push(self.ids[parent].clone());
                            cycles.push(cycle);
                        }
                        Mark::Done => {}
                    }
                } else {
                    mark[node] = Mark::Done;
                    stack.pop();
                    path.pop();
                }
            }
        }
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, inputs: &[&str]) -> Step {
        Step::new(id, "noop").with_inputs(inputs.iter().copied())
    }

    #[test]
    fn declaration_order_is_kept_when_valid() {
        let g = DependencyGraph::from_steps(&[step("a", &[]), step("b", &["a"]), step("c", &[]), step("d", &["b", "c"])]);
        assert_eq!(g.topological_order().unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn dependencies_come_first_even_if_declared_later() {
        let g = DependencyGraph::from_steps(&[step("z", &["y"]), step("y", &[]), step("x", &[])]);
        assert_eq!(g.topological_order().unwrap(), vec!["y", "x", "z"]);
    }

    #[test]
    fn two_node_cycle_is_reported_with_path() {
        let g = DependencyGraph::from_steps(&[step("a", &["b"]), step("b", &["a"])]);
        let cycles = g.find_cycles();
        assert_eq!(cycles, vec![vec!["a".to_string(), "b".to_string(), "a".to_string()]]);
        match g.topological_order() {
            Err(DslError::CircularDependency { path }) => {
                assert!(path.contains(&"a".to_string()) && path.contains(&"b".to_string()))
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let g = DependencyGraph::from_steps(&[step("a", &["a"])]);
        assert_eq!(g.find_cycles(), vec![vec!["a".to_string(), "a".to_string()]]);
    }

    #[test]
    fn unknown_inputs_are_ignored() {
        let g = DependencyGraph::from_steps(&[step("a", &["ghost"])]);
        assert_eq!(g.topological_order().unwrap(), vec!["a"]);
        assert!(g.find_cycles().is_empty());
    }

    #[test]
    fn dependents_lists_consumers() {
        let g = DependencyGraph::from_steps(&[step("a", &[]), step("b", &["a"]), step("c", &["a"])]);
        assert_eq!(g.dependents("a"), vec!["b", "c"]);
        assert!(g.dependents("c").is_empty());
    }
}
