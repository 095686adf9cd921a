use std::collections::BTreeMap;

use crate::er_ast::*;

/// What to do with entity names that only appear in relationship lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndeclaredEntities {
    /// Create an empty placeholder entity with no primary key.
    #[default]
    Synthesize,
    Reject,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ResolveError {
    #[error("relationship `{relationship}` on line {line} references undeclared entity `{entity}`")]
    UndeclaredEntity {
        entity: String,
        relationship: String,
        line: usize,
    },
    #[error("join table `{table}` from the relationship on line {line} clashes with another table of the same name")]
    JoinTableNameClash { table: String, line: usize },
}

/// A foreign-key column derived from a one-to-many relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub parent: String,
    pub parent_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinColumn {
    pub column: String,
    pub entity: String,
}

/// Synthetic table for a many-to-many relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinTable {
    pub name: String,
    pub left: JoinColumn,
    pub right: JoinColumn,
    /// Line of the relationship that introduced the table.
    pub line: usize,
}

impl JoinTable {
    pub fn columns(&self) -> [&str; 2] {
        [&self.left.column, &self.right.column]
    }
}

/// The resolved, immutable view every backend consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub entities: BTreeMap<String, Entity>,
    pub foreign_keys: BTreeMap<String, Vec<ForeignKey>>,
    pub join_tables: Vec<JoinTable>,
}

/// One output column of an entity table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column<'a> {
    pub name: &'a str,
    /// `None` for derived foreign-key columns.
    pub attribute: Option<&'a Attribute>,
    pub foreign_key: Option<&'a ForeignKey>,
}

impl Schema {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn foreign_keys(&self, entity: &str) -> &[ForeignKey] {
        self.foreign_keys.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Declared attributes in declaration order, then derived foreign keys in
    /// relationship order. A declared attribute named like a derived key
    /// column doubles as that key.
    pub fn columns(&self, entity: &str) -> Vec<Column<'_>> {
        let Some(e) = self.entities.get(entity) else {
            return Vec::new();
        };
        let fks = self.foreign_keys(entity);

        let mut columns: Vec<Column<'_>> = e
            .attributes
            .iter()
            .map(|attr| Column {
                name: &attr.name,
                attribute: Some(attr),
                foreign_key: fks.iter().find(|fk| fk.column == attr.name),
            })
            .collect();

        for fk in fks {
            if e.attribute(&fk.column).is_none() {
                columns.push(Column {
                    name: &fk.column,
                    attribute: None,
                    foreign_key: Some(fk),
                });
            }
        }
        columns
    }

    pub fn column_names(&self, entity: &str) -> Vec<String> {
        self.columns(entity)
            .iter()
            .map(|c| c.name.to_string())
            .collect()
    }
}

pub fn foreign_key_column(parent: &str) -> String {
    format!("{parent}_id")
}

pub fn resolve(model: &ErModel, undeclared: UndeclaredEntities) -> Result<Schema, ResolveError> {
    let mut entities = model.entities.clone();
    let mut foreign_keys: BTreeMap<String, Vec<ForeignKey>> = BTreeMap::new();
    let mut join_tables: Vec<JoinTable> = Vec::new();

    for rel in &model.relationships {
        for name in [&rel.left, &rel.right] {
            ensure_entity(&mut entities, name, rel, undeclared)?;
        }

        match rel.kind() {
            RelationshipKind::OneToMany { parent } => {
                let (parent, child) = match parent {
                    Side::Left => (&rel.left, &rel.right),
                    Side::Right => (&rel.right, &rel.left),
                };
                add_foreign_key(&mut foreign_keys, &entities, parent, child);
            }
            RelationshipKind::ManyToMany => add_join_table(&mut join_tables, rel)?,
        }
    }

    if let Some(jt) = join_tables
        .iter()
        .find(|jt| entities.keys().any(|name| name.eq_ignore_ascii_case(&jt.name)))
    {
        return Err(ResolveError::JoinTableNameClash {
            table: jt.name.clone(),
            line: jt.line,
        });
    }

    for fks in foreign_keys.values_mut() {
        for fk in fks.iter_mut() {
            fk.parent_key = entities
                .get(&fk.parent)
                .and_then(|p| p.primary_key.clone());
        }
    }

    tracing::info!(
        entities = entities.len(),
        foreign_keys = foreign_keys.values().map(Vec::len).sum::<usize>(),
        join_tables = join_tables.len(),
        "resolved relationships"
    );

    Ok(Schema {
        entities,
        foreign_keys,
        join_tables,
    })
}

fn ensure_entity(
    entities: &mut BTreeMap<String, Entity>,
    name: &str,
    rel: &Relationship,
    undeclared: UndeclaredEntities,
) -> Result<(), ResolveError> {
    if entities.contains_key(name) {
        return Ok(());
    }
    match undeclared {
        UndeclaredEntities::Synthesize => {
            tracing::warn!(
                entity = name,
                line = rel.line,
                "entity only referenced by a relationship, adding empty placeholder"
            );
            entities.insert(name.to_string(), Entity::placeholder(name));
            Ok(())
        }
        UndeclaredEntities::Reject => Err(ResolveError::UndeclaredEntity {
            entity: name.to_string(),
            relationship: rel.to_string(),
            line: rel.line,
        }),
    }
}

fn add_foreign_key(
    foreign_keys: &mut BTreeMap<String, Vec<ForeignKey>>,
    entities: &BTreeMap<String, Entity>,
    parent: &str,
    child: &str,
) {
    let derived = foreign_key_column(parent);
    // A declared `person_id` is the same column as the derived `Person_id`,
    // unless it is the child's own key (self-reference).
    let declared = entities.get(child).and_then(|e| {
        e.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(&derived))
            .map(|a| (e, a))
    });
    let column = match declared {
        Some((e, a)) if e.is_primary_key(&a.name) => format!("parent_{derived}"),
        Some((_, a)) => a.name.clone(),
        None => derived,
    };

    let fks = foreign_keys.entry(child.to_string()).or_default();
    if fks.iter().any(|fk| fk.column.eq_ignore_ascii_case(&column)) {
        tracing::debug!(entity = child, column = %column, "foreign key already derived");
        return;
    }
    fks.push(ForeignKey {
        column,
        parent: parent.to_string(),
        parent_key: None,
    });
}

fn add_join_table(join_tables: &mut Vec<JoinTable>, rel: &Relationship) -> Result<(), ResolveError> {
    let name = format!("{}_{}", rel.left, rel.right);
    if let Some(existing) = join_tables.iter().find(|jt| jt.name.eq_ignore_ascii_case(&name)) {
        if existing.left.entity == rel.left && existing.right.entity == rel.right {
            tracing::debug!(table = %name, line = rel.line, "join table already declared");
            return Ok(());
        }
        return Err(ResolveError::JoinTableNameClash {
            table: name,
            line: rel.line,
        });
    }
    if join_tables
        .iter()
        .any(|jt| jt.left.entity == rel.right && jt.right.entity == rel.left)
    {
        tracing::warn!(
            table = %name,
            line = rel.line,
            "many-to-many pair also declared in the opposite order, emitting a second join table"
        );
    }

    let left_column = foreign_key_column(&rel.left);
    let mut right_column = foreign_key_column(&rel.right);
    if right_column == left_column {
        right_column.push_str("_2");
    }

    join_tables.push(JoinTable {
        name,
        left: JoinColumn {
            column: left_column,
            entity: rel.left.clone(),
        },
        right: JoinColumn {
            column: right_column,
            entity: rel.right.clone(),
        },
        line: rel.line,
    });
    Ok(())
}
