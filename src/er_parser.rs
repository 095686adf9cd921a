use std::collections::BTreeMap;
use std::mem;

use crate::er_ast::*;
use crate::er_grammar::{Line, classify_line};

enum State {
    Idle,
    InEntity(Entity),
}

/// Builds the model from ER-DSL text. Unparseable lines are skipped, so this
/// never fails.
pub fn parse_er(input: &str) -> ErModel {
    let mut entities: BTreeMap<String, Entity> = BTreeMap::new();
    let mut relationships: Vec<Relationship> = Vec::new();
    let mut state = State::Idle;

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        match classify_line(raw) {
            Line::EntityOpen(name) => {
                if let State::InEntity(open) = mem::replace(&mut state, State::Idle) {
                    tracing::debug!(entity = %open.name, line = line_no, "entity block left open");
                    finish_entity(&mut entities, open);
                }
                state = State::InEntity(Entity::new(name));
            }
            Line::EntityClose => match mem::replace(&mut state, State::Idle) {
                State::InEntity(entity) => finish_entity(&mut entities, entity),
                State::Idle => tracing::debug!(line = line_no, "stray `}}` outside entity"),
            },
            Line::Attribute(attr) => match &mut state {
                State::InEntity(entity) => entity.attributes.push(attr),
                State::Idle => {
                    tracing::debug!(line = line_no, attribute = %attr.name, "attribute outside entity ignored")
                }
            },
            Line::Relationship {
                left,
                connector,
                right,
                label,
            } => relationships.push(Relationship {
                left,
                right,
                connector,
                label,
                line: line_no,
            }),
            Line::Blank | Line::Separator => {}
            Line::Unrecognized => {
                tracing::debug!(line = line_no, text = raw.trim(), "skipping unrecognized line")
            }
        }
    }

    if let State::InEntity(open) = state {
        tracing::warn!(entity = %open.name, "entity block not closed before end of input");
        finish_entity(&mut entities, open);
    }

    tracing::info!(
        entities = entities.len(),
        relationships = relationships.len(),
        "parsed ER model"
    );

    ErModel {
        entities,
        relationships,
    }
}

fn finish_entity(entities: &mut BTreeMap<String, Entity>, mut entity: Entity) {
    entity.primary_key = entity
        .attributes
        .iter()
        .rev()
        .find(|a| a.is_generated())
        .map(|a| a.name.clone());

    if entities.contains_key(&entity.name) {
        tracing::debug!(entity = %entity.name, "entity redeclared, replacing earlier block");
    }
    entities.insert(entity.name.clone(), entity);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute_names(model: &ErModel, entity: &str) -> Vec<String> {
        model.entities[entity]
            .attributes
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    #[test]
    fn parse_single_entity() {
        let input = "\
@startuml
entity Person {
  id : number <<generated>>
  --
  firstname : text
  lastname : text
}
@enduml
";
        let model = parse_er(input);
        assert_eq!(model.entities.len(), 1);
        assert_eq!(attribute_names(&model, "Person"), vec!["id", "firstname", "lastname"]);
        assert_eq!(model.entities["Person"].primary_key.as_deref(), Some("id"));
        assert!(model.relationships.is_empty());
    }

    #[test]
    fn parse_entity_without_generated_attribute_has_no_key() {
        let model = parse_er("entity Tag {\n  label : text\n}\n");
        assert_eq!(model.entities["Tag"].primary_key, None);
    }

    #[test]
    fn parse_last_generated_attribute_wins() {
        let input = "entity A {\n  a : number <<generated>>\n  b : number <<generated>>\n}\n";
        let model = parse_er(input);
        assert_eq!(model.entities["A"].primary_key.as_deref(), Some("b"));
    }

    #[test]
    fn parse_attribute_outside_entity_ignored() {
        let input = "stray : text\nentity A {\n  id : number\n}\nother : text\n";
        let model = parse_er(input);
        assert_eq!(attribute_names(&model, "A"), vec!["id"]);
    }

    #[test]
    fn parse_relationship_before_entities() {
        let input = "\
A ||--o{ B
entity A {
  id : number <<generated>>
}
entity B {
  id : number <<generated>>
}
";
        let model = parse_er(input);
        assert_eq!(model.relationships.len(), 1);
        let rel = &model.relationships[0];
        assert_eq!(rel.left, "A");
        assert_eq!(rel.right, "B");
        assert_eq!(rel.line, 1);
        assert_eq!(model.entities.len(), 2);
    }

    #[test]
    fn parse_relationship_inside_entity_block_is_collected() {
        let input = "entity A {\n  id : number\n  A ||--o{ B\n}\n";
        let model = parse_er(input);
        assert_eq!(model.relationships.len(), 1);
        assert_eq!(attribute_names(&model, "A"), vec!["id"]);
    }

    #[test]
    fn parse_unclosed_entity_is_finalized() {
        let input = "entity A {\n  id : number <<generated>>\nentity B {\n  name : text\n";
        let model = parse_er(input);
        assert_eq!(attribute_names(&model, "A"), vec!["id"]);
        assert_eq!(attribute_names(&model, "B"), vec!["name"]);
        assert_eq!(model.entities["A"].primary_key.as_deref(), Some("id"));
    }

    #[test]
    fn parse_redeclared_entity_replaces_attributes() {
        let input = "entity A {\n  x : text\n}\nentity A {\n  y : text\n}\n";
        let model = parse_er(input);
        assert_eq!(attribute_names(&model, "A"), vec!["y"]);
    }

    #[test]
    fn parse_empty_entity() {
        let model = parse_er("entity Empty {\n}\n");
        assert!(model.entities["Empty"].attributes.is_empty());
        assert!(model.entities["Empty"].declared);
    }

    #[test]
    fn parse_stray_close_brace_is_skipped() {
        let input = "}\nentity A {\n  id : number <<generated>>\n}\n}\n";
        let model = parse_er(input);
        assert_eq!(model.entities.len(), 1);
        assert_eq!(attribute_names(&model, "A"), vec!["id"]);
        assert_eq!(model.entities["A"].primary_key.as_deref(), Some("id"));
    }
}
