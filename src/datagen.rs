use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, RngCore};

use crate::er_ast::*;
use crate::er_order::DependencyOrder;
use crate::er_resolver::{Column, ForeignKey, JoinColumn, JoinTable, Schema};

pub const DEFAULT_ROWS: usize = 4;
const DATE_YEAR: i32 = 2024;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Text(String),
    Null,
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Null => Ok(()),
        }
    }
}

/// Supplies values for non-key columns, keyed by entity and attribute.
/// Returning `None` falls back to the type default.
pub trait ValueSource {
    fn value(&self, row: &RowContext<'_>, attribute: &Attribute, rng: &mut dyn RngCore) -> Option<Value>;
}

/// The row being filled, plus everything generated before it.
pub struct RowContext<'a> {
    pub entity: &'a str,
    pub row_index: usize,
    /// Every column of the table, in output order.
    pub columns: &'a [String],
    /// Values produced so far, a prefix of `columns`.
    pub values: &'a [Value],
    pub tables: &'a [Table],
    pub keys: &'a HashMap<&'a str, Vec<i64>>,
}

impl<'a> RowContext<'a> {
    /// A value already produced for this row. Column names match
    /// case-insensitively.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.values.get(idx)
    }

    /// A table generated earlier in this run.
    pub fn table(&self, name: &str) -> Option<&'a Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Primary keys generated so far for `entity`; empty when it has none yet.
    pub fn keys(&self, entity: &str) -> &'a [i64] {
        self.keys
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(entity))
            .map(|(_, keys)| keys.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    pub rows: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { rows: DEFAULT_ROWS }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GenerationError {
    #[error("`{entity}.{column}` references `{parent}`, which has no primary key")]
    MissingParentKey {
        entity: String,
        column: String,
        parent: String,
    },
    #[error("`{entity}.{column}` references `{parent}`, which has no generated keys to pick from")]
    EmptyKeyPool {
        entity: String,
        column: String,
        parent: String,
    },
    #[error("entity `{0}` is in the processing order but not in the schema")]
    UnknownEntity(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Entity,
    Join,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.rows.get(row)?.get(idx)
    }

    pub fn column_values(&self, column: &str) -> Vec<&Value> {
        match self.columns.iter().position(|c| c == column) {
            Some(idx) => self.rows.iter().filter_map(|row| row.get(idx)).collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    /// Entity tables in dependency order, then join tables.
    pub tables: Vec<Table>,
}

impl Dataset {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

pub fn generate<R: Rng>(
    schema: &Schema,
    order: &DependencyOrder,
    options: &GenerateOptions,
    source: &dyn ValueSource,
    rng: &mut R,
) -> Result<Dataset, GenerationError> {
    let rng: &mut dyn RngCore = rng;
    let mut keys: HashMap<&str, Vec<i64>> = HashMap::new();
    let mut dataset = Dataset::default();

    for name in order.iter() {
        let entity = schema
            .entity(name)
            .ok_or_else(|| GenerationError::UnknownEntity(name.to_string()))?;
        let table = entity_table(schema, entity, options.rows, &dataset.tables, &keys, source, rng)?;
        if entity.primary_key.is_some() {
            keys.insert(name, (1..=options.rows as i64).collect());
        }
        tracing::debug!(entity = name, rows = table.rows.len(), "generated entity rows");
        dataset.tables.push(table);
    }

    for jt in &schema.join_tables {
        let table = join_table(schema, jt, options.rows, &keys, rng)?;
        tracing::debug!(table = %jt.name, rows = table.rows.len(), "generated join rows");
        dataset.tables.push(table);
    }

    Ok(dataset)
}

fn entity_table(
    schema: &Schema,
    entity: &Entity,
    rows: usize,
    tables: &[Table],
    keys: &HashMap<&str, Vec<i64>>,
    source: &dyn ValueSource,
    rng: &mut dyn RngCore,
) -> Result<Table, GenerationError> {
    let columns = schema.columns(&entity.name);
    let names: Vec<String> = columns.iter().map(|c| c.name.to_string()).collect();
    let mut table_rows = Vec::with_capacity(rows);

    for row_idx in 0..rows {
        let mut row: Vec<Value> = Vec::with_capacity(columns.len());
        for col in &columns {
            let context = RowContext {
                entity: &entity.name,
                row_index: row_idx,
                columns: &names,
                values: &row,
                tables,
                keys,
            };
            let value = column_value(entity, col, rows, &context, source, rng)?;
            row.push(value);
        }
        table_rows.push(row);
    }

    Ok(Table {
        name: entity.name.clone(),
        kind: TableKind::Entity,
        columns: names,
        rows: table_rows,
    })
}

fn column_value(
    entity: &Entity,
    column: &Column<'_>,
    rows: usize,
    context: &RowContext<'_>,
    source: &dyn ValueSource,
    rng: &mut dyn RngCore,
) -> Result<Value, GenerationError> {
    if entity.is_primary_key(column.name) {
        return Ok(Value::Int(context.row_index as i64 + 1));
    }
    if let Some(fk) = column.foreign_key {
        return pick_foreign_key(entity, fk, rows, context.keys, rng);
    }
    Ok(match column.attribute {
        Some(attr) => source
            .value(context, attr, rng)
            .unwrap_or_else(|| default_value(attr, rng)),
        None => Value::Null,
    })
}

fn pick_foreign_key(
    entity: &Entity,
    fk: &ForeignKey,
    rows: usize,
    keys: &HashMap<&str, Vec<i64>>,
    rng: &mut dyn RngCore,
) -> Result<Value, GenerationError> {
    if fk.parent_key.is_none() {
        return Err(GenerationError::MissingParentKey {
            entity: entity.name.clone(),
            column: fk.column.clone(),
            parent: fk.parent.clone(),
        });
    }

    // Self-reference: the table's own keys are 1..=rows once it is complete.
    if fk.parent == entity.name {
        return Ok(Value::Int(rng.random_range(1..=rows as i64)));
    }

    match keys.get(fk.parent.as_str()).and_then(|pool| pool.choose(rng)) {
        Some(&key) => Ok(Value::Int(key)),
        None => Err(GenerationError::EmptyKeyPool {
            entity: entity.name.clone(),
            column: fk.column.clone(),
            parent: fk.parent.clone(),
        }),
    }
}

fn join_table(
    schema: &Schema,
    jt: &JoinTable,
    rows: usize,
    keys: &HashMap<&str, Vec<i64>>,
    rng: &mut dyn RngCore,
) -> Result<Table, GenerationError> {
    let mut table = Table {
        name: jt.name.clone(),
        kind: TableKind::Join,
        columns: jt.columns().iter().map(|c| c.to_string()).collect(),
        rows: Vec::with_capacity(rows),
    };
    if rows == 0 {
        return Ok(table);
    }

    let left = join_pool(schema, jt, &jt.left, keys)?;
    let right = join_pool(schema, jt, &jt.right, keys)?;

    // Shuffled zip first so every key of the smaller side shows up.
    let mut left_order = left.to_vec();
    let mut right_order = right.to_vec();
    left_order.shuffle(rng);
    right_order.shuffle(rng);
    let mut pairs: Vec<(i64, i64)> = left_order
        .into_iter()
        .zip(right_order)
        .take(rows)
        .collect();

    let mut seen: HashSet<(i64, i64)> = pairs.iter().copied().collect();
    let capacity = left.len() * right.len();
    while pairs.len() < rows && seen.len() < capacity {
        if let (Some(&l), Some(&r)) = (left.choose(rng), right.choose(rng)) {
            if seen.insert((l, r)) {
                pairs.push((l, r));
            }
        }
    }

    if pairs.len() < rows {
        tracing::warn!(
            table = %jt.name,
            requested = rows,
            generated = pairs.len(),
            "not enough distinct key pairs for join table"
        );
    }

    table.rows = pairs
        .into_iter()
        .map(|(l, r)| vec![Value::Int(l), Value::Int(r)])
        .collect();
    Ok(table)
}

fn join_pool<'k>(
    schema: &Schema,
    jt: &JoinTable,
    side: &JoinColumn,
    keys: &'k HashMap<&str, Vec<i64>>,
) -> Result<&'k [i64], GenerationError> {
    let has_key = schema
        .entity(&side.entity)
        .is_some_and(|e| e.primary_key.is_some());
    if !has_key {
        return Err(GenerationError::MissingParentKey {
            entity: jt.name.clone(),
            column: side.column.clone(),
            parent: side.entity.clone(),
        });
    }
    match keys.get(side.entity.as_str()) {
        Some(pool) if !pool.is_empty() => Ok(pool.as_slice()),
        _ => Err(GenerationError::EmptyKeyPool {
            entity: jt.name.clone(),
            column: side.column.clone(),
            parent: side.entity.clone(),
        }),
    }
}

/// Type-keyed fallback for attributes the value source does not know.
pub fn default_value(attr: &Attribute, rng: &mut dyn RngCore) -> Value {
    match &attr.attr_type {
        AttrType::Number => Value::Int(rng.random_range(1..=100)),
        AttrType::Boolean => Value::Int(rng.random_range(0..=1)),
        AttrType::DateTime => Value::Text(random_date(rng)),
        AttrType::Text | AttrType::Other(_) => {
            Value::Text(format!("{}_{}", attr.name, rng.random_range(1..=100u32)))
        }
    }
}

fn random_date(rng: &mut dyn RngCore) -> String {
    let ordinal: u32 = rng.random_range(1..=365);
    NaiveDate::from_yo_opt(DATE_YEAR, ordinal)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
