use std::collections::HashMap;

use crate::er_resolver::Schema;

/// Entities ordered so that foreign-key parents come before their children.
///
/// Cycles are not broken. The walk still terminates, and every edge that
/// closed a cycle is listed in `back_edges` as `(child, parent)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DependencyOrder {
    pub entities: Vec<String>,
    pub back_edges: Vec<(String, String)>,
}

impl DependencyOrder {
    pub fn has_cycles(&self) -> bool {
        !self.back_edges.is_empty()
    }

    pub fn position(&self, entity: &str) -> Option<usize> {
        self.entities.iter().position(|e| e == entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(String::as_str)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first post-order over entities in name order, visiting each
/// entity's parents (in foreign-key order) before the entity itself.
pub fn dependency_order(schema: &Schema) -> DependencyOrder {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut order = DependencyOrder::default();

    for root in schema.entities.keys() {
        if marks.contains_key(root.as_str()) {
            continue;
        }
        marks.insert(root.as_str(), Mark::Visiting);
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];

        while let Some(&(name, next)) = stack.last() {
            let fks = schema.foreign_keys(name);
            let Some(fk) = fks.get(next) else {
                marks.insert(name, Mark::Done);
                order.entities.push(name.to_string());
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let parent = fk.parent.as_str();
            match marks.get(parent) {
                None => {
                    marks.insert(parent, Mark::Visiting);
                    stack.push((parent, 0));
                }
                Some(Mark::Visiting) => {
                    tracing::warn!(
                        entity = name,
                        parent,
                        "foreign key closes a cycle, parent may not be ready before child"
                    );
                    order.back_edges.push((name.to_string(), parent.to_string()));
                }
                Some(Mark::Done) => {}
            }
        }
    }

    tracing::debug!(order = ?order.entities, "dependency order");
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::er_parser::parse_er;
    use crate::er_resolver::{UndeclaredEntities, resolve};

    fn order_of(input: &str) -> DependencyOrder {
        let schema = resolve(&parse_er(input), UndeclaredEntities::Synthesize).unwrap();
        dependency_order(&schema)
    }

    #[test]
    fn order_parent_first() {
        let order = order_of("B ||--o{ A\n");
        assert_eq!(order.entities, vec!["B", "A"]);
        assert!(!order.has_cycles());
    }

    #[test]
    fn order_independent_entities_by_name() {
        let order = order_of("entity C {\n}\nentity A {\n}\nentity B {\n}\n");
        assert_eq!(order.entities, vec!["A", "B", "C"]);
    }

    #[test]
    fn order_chain() {
        let order = order_of("C ||--o{ B\nB ||--o{ A\n");
        assert_eq!(order.entities, vec!["C", "B", "A"]);
    }

    #[test]
    fn order_multiple_parents() {
        let order = order_of("Z ||--o{ A\nY ||--o{ A\nY ||--o{ Z\n");
        assert_eq!(order.entities, vec!["Y", "Z", "A"]);
    }

    #[test]
    fn order_cycle_terminates_and_is_reported() {
        let order = order_of("A ||--o{ B\nB ||--o{ A\n");
        assert_eq!(order.entities.len(), 2);
        assert!(order.has_cycles());
        assert_eq!(order.back_edges, vec![("B".to_string(), "A".to_string())]);
    }

    #[test]
    fn order_self_reference_is_back_edge() {
        let order = order_of("Node ||--o{ Node\n");
        assert_eq!(order.entities, vec!["Node"]);
        assert_eq!(order.back_edges, vec![("Node".to_string(), "Node".to_string())]);
    }

    #[test]
    fn order_long_chain_does_not_recurse() {
        let input: String = (0..5000)
            .map(|i| format!("E{:05} ||--o{{ E{:05}\n", i + 1, i))
            .collect();
        let order = order_of(&input);
        assert_eq!(order.entities.len(), 5001);
        assert_eq!(order.entities.first().map(String::as_str), Some("E05000"));
        assert_eq!(order.entities.last().map(String::as_str), Some("E00000"));
    }
}
