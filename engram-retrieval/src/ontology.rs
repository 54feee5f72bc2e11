//! The declared domain relationship graph and its traversal. Relations load
//! from the `domain_ontology` table into a petgraph digraph; augmentation
//! BFSes from a resolved entity's type toward the query's target tables and
//! compiles the discovered path into one parameterized JOIN.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use engram_core::domain::primary_key_column;
use engram_core::models::OntologyRelation;

/// Traversal depth limit.
pub const MAX_HOPS: usize = 3;

pub struct OntologyGraph {
    graph: DiGraph<String, OntologyRelation>,
    nodes: HashMap<String, NodeIndex>,
}

impl OntologyGraph {
    pub fn new(relations: &[OntologyRelation]) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let mut node = |graph: &mut DiGraph<String, OntologyRelation>,
                        nodes: &mut HashMap<String, NodeIndex>,
                        ty: &str| {
            *nodes
                .entry(ty.to_string())
                .or_insert_with(|| graph.add_node(ty.to_string()))
        };
        for relation in relations {
            let from = node(&mut graph, &mut nodes, &relation.from_entity_type);
            let to = node(&mut graph, &mut nodes, &relation.to_entity_type);
            graph.add_edge(from, to, relation.clone());
        }
        Self { graph, nodes }
    }

    /// Shortest relation path from one entity type to another, within
    /// `max_hops`. `None` when unreachable.
    pub fn path(
        &self,
        from_type: &str,
        to_type: &str,
        max_hops: usize,
    ) -> Option<Vec<OntologyRelation>> {
        let start = *self.nodes.get(from_type)?;
        let goal = *self.nodes.get(to_type)?;
        if start == goal {
            return Some(Vec::new());
        }

        let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::new();
        let mut came_from: HashMap<NodeIndex, EdgeIndex> = HashMap::new();
        queue.push_back((start, 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_hops {
                continue;
            }
            for edge in self.graph.edges(current) {
                let next = edge.target();
                if next == start || came_from.contains_key(&next) {
                    continue;
                }
                came_from.insert(next, edge.id());
                if next == goal {
                    return Some(self.rebuild(start, goal, &came_from));
                }
                queue.push_back((next, depth + 1));
            }
        }
        None
    }

    fn rebuild(
        &self,
        start: NodeIndex,
        goal: NodeIndex,
        came_from: &HashMap<NodeIndex, EdgeIndex>,
    ) -> Vec<OntologyRelation> {
        let mut path = Vec::new();
        let mut current = goal;
        while current != start {
            let edge = came_from[&current];
            path.push(self.graph[edge].clone());
            let (source, _) = self.graph.edge_endpoints(edge).expect("edge endpoints");
            current = source;
        }
        path.reverse();
        path
    }
}

/// Compile a relation path into one JOIN query from the path's first table,
/// keyed by that table's primary key (`?1`). Selects the final table's rows.
pub fn compile_join(path: &[OntologyRelation]) -> Option<String> {
    let first = path.first()?;
    let root_table = &first.join_spec.from_table;
    let root_pk = primary_key_column(root_table)?;

    let mut query = format!(
        "SELECT t{}.* FROM {} AS t0",
        path.len(),
        root_table
    );
    for (i, relation) in path.iter().enumerate() {
        query.push_str(&format!(
            " JOIN {} AS t{} ON t{}.{} = t{}.{}",
            relation.join_spec.to_table,
            i + 1,
            i,
            relation.join_spec.from_field,
            i + 1,
            relation.join_spec.to_field,
        ));
    }
    query.push_str(&format!(" WHERE t0.{root_pk} = ?1"));
    Some(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::domain::default_relations;

    #[test]
    fn bfs_finds_two_hop_path() {
        let graph = OntologyGraph::new(&default_relations());
        let path = graph.path("customer", "invoice", MAX_HOPS).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].join_spec.to_table, "sales_orders");
        assert_eq!(path[1].join_spec.to_table, "invoices");
    }

    #[test]
    fn hop_limit_is_enforced() {
        let graph = OntologyGraph::new(&default_relations());
        // customer → so → invoice → payment is exactly 3 hops.
        assert!(graph.path("customer", "payment", MAX_HOPS).is_some());
        assert!(graph.path("customer", "payment", 2).is_none());
    }

    #[test]
    fn unreachable_types_yield_none() {
        let graph = OntologyGraph::new(&default_relations());
        // Edges are directed; nothing leads back to the customer.
        assert!(graph.path("invoice", "customer", MAX_HOPS).is_none());
        assert!(graph.path("customer", "unknown_type", MAX_HOPS).is_none());
    }

    #[test]
    fn join_compiles_along_the_path() {
        let graph = OntologyGraph::new(&default_relations());
        let path = graph.path("customer", "invoice", MAX_HOPS).unwrap();
        let query = compile_join(&path).unwrap();
        assert!(query.starts_with("SELECT t2.* FROM customers AS t0"));
        assert!(query.contains("JOIN sales_orders AS t1 ON t0.customer_id = t1.customer_id"));
        assert!(query.contains("JOIN invoices AS t2 ON t1.so_id = t2.so_id"));
        assert!(query.ends_with("WHERE t0.customer_id = ?1"));
    }
}
