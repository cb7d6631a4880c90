//! In-memory relational store.
//!
//! Enforces primary keys, unique and not-null columns and foreign keys the
//! same way the SQLite schema does, and records every operation in an
//! ordered journal. Used by tests that assert on load ordering or inject
//! failures.

use super::{RelationalStore, Row, StoreSession, Table};
use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One journaled store operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum StoreOp {
    Connect,
    EnsureSchema,
    Delete { table: Table },
    Insert { table: Table, rows: usize },
    Commit { table: Table },
    Rollback { table: Table },
    Release,
}

#[derive(Debug, Default)]
struct MemoryState {
    schema_ready: bool,
    tables: BTreeMap<Table, Vec<Row>>,
    journal: Vec<StoreOp>,
    connections: usize,
    refuse_after: Option<usize>,
    failures: HashMap<Table, StoreError>,
}

/// Simulated relational store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `n` successful connections; every later attempt fails with a
    /// connection error.
    pub fn refuse_connections_after(&self, n: usize) {
        self.state.lock().refuse_after = Some(n);
    }

    /// Make every replace on `table` fail with `error` after its deletes ran.
    pub fn inject_failure(&self, table: Table, error: StoreError) {
        self.state.lock().failures.insert(table, error);
    }

    pub fn journal(&self) -> Vec<StoreOp> {
        self.state.lock().journal.clone()
    }

    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.state
            .lock()
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().connections
    }
}

impl RelationalStore for MemoryStore {
    fn connect(&self) -> StoreResult<Box<dyn StoreSession + '_>> {
        let mut state = self.state.lock();
        if let Some(limit) = state.refuse_after
            && state.connections >= limit
        {
            return Err(StoreError::Connection(
                "memory store refused the connection".to_string(),
            ));
        }
        state.connections += 1;
        state.journal.push(StoreOp::Connect);
        Ok(Box::new(MemorySession { store: self }))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

struct MemorySession<'a> {
    store: &'a MemoryStore,
}

impl Drop for MemorySession<'_> {
    fn drop(&mut self) {
        self.store.state.lock().journal.push(StoreOp::Release);
    }
}

impl StoreSession for MemorySession<'_> {
    fn ensure_schema(&mut self) -> StoreResult<()> {
        let mut state = self.store.state.lock();
        state.journal.push(StoreOp::EnsureSchema);
        state.schema_ready = true;
        for table in Table::ALL {
            state.tables.entry(table).or_default();
        }
        Ok(())
    }

    fn replace_rows(&mut self, clears: &[Table], table: Table, rows: &[Row]) -> StoreResult<usize> {
        let mut state = self.store.state.lock();
        if !state.schema_ready {
            return Err(StoreError::Schema(format!("no such table: {}", table)));
        }

        let mut staged = state.tables.clone();
        let outcome = stage_replace(&mut staged, &mut state.journal, clears, table, rows)
            .and_then(|inserted| match state.failures.get(&table) {
                Some(error) => Err(error.clone()),
                None => Ok(inserted),
            });

        match outcome {
            Ok(inserted) => {
                state.tables = staged;
                state.journal.push(StoreOp::Commit { table });
                Ok(inserted)
            }
            Err(error) => {
                state.journal.push(StoreOp::Rollback { table });
                Err(error)
            }
        }
    }

    fn count_rows(&mut self, table: Table) -> StoreResult<usize> {
        let state = self.store.state.lock();
        if !state.schema_ready {
            return Err(StoreError::Schema(format!("no such table: {}", table)));
        }
        Ok(state.tables.get(&table).map_or(0, Vec::len))
    }
}

fn stage_replace(
    tables: &mut BTreeMap<Table, Vec<Row>>,
    journal: &mut Vec<StoreOp>,
    clears: &[Table],
    table: Table,
    rows: &[Row],
) -> StoreResult<usize> {
    for clear in clears {
        journal.push(StoreOp::Delete { table: *clear });
        tables.entry(*clear).or_default().clear();
        check_no_dependents(tables, *clear)?;
    }

    journal.push(StoreOp::Insert {
        table,
        rows: rows.len(),
    });

    let schema = table.schema();
    let constraint = |message: String| StoreError::Constraint {
        table: table.name().to_string(),
        message,
    };

    // Key sets are built once per insert, then extended row by row.
    let existing = tables.get(&table).map(Vec::as_slice).unwrap_or_default();
    let mut unique_keys: Vec<(usize, HashSet<String>)> = schema
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.primary_key || c.unique)
        .map(|(i, _)| (i, existing.iter().filter_map(|r| r[i].key_text()).collect()))
        .collect();
    let parent_keys: Vec<(usize, &str, HashSet<String>)> = schema
        .foreign_keys
        .iter()
        .filter_map(|fk| {
            let child_index = schema.column_index(fk.column)?;
            let parent_index = fk.references.schema().primary_key_index()?;
            let keys = tables
                .get(&fk.references)
                .map(|rows| rows.iter().filter_map(|r| r[parent_index].key_text()).collect())
                .unwrap_or_default();
            Some((child_index, fk.column, keys))
        })
        .collect();

    let mut accepted = Vec::with_capacity(rows.len());
    for row in rows {
        check_shape(table, row)?;

        for (i, keys) in unique_keys.iter_mut() {
            if let Some(key) = row[*i].key_text()
                && !keys.insert(key)
            {
                return Err(constraint(format!(
                    "UNIQUE constraint failed: {}.{}",
                    table, schema.columns[*i].name
                )));
            }
        }

        for (i, column, keys) in &parent_keys {
            if let Some(key) = row[*i].key_text()
                && !keys.contains(&key)
            {
                return Err(constraint(format!(
                    "FOREIGN KEY constraint failed: {}.{} = {}",
                    table, column, key
                )));
            }
        }

        accepted.push(row.clone());
    }

    tables.entry(table).or_default().extend(accepted);
    Ok(rows.len())
}

/// Deleting a parent's rows fails while a child still references them.
fn check_no_dependents(tables: &BTreeMap<Table, Vec<Row>>, parent: Table) -> StoreResult<()> {
    for child in Table::ALL {
        for fk in child.schema().foreign_keys {
            if fk.references != parent {
                continue;
            }
            let referencing = tables.get(&child).is_some_and(|rows| !rows.is_empty());
            if referencing {
                return Err(StoreError::Constraint {
                    table: parent.name().to_string(),
                    message: format!(
                        "FOREIGN KEY constraint failed: {} rows still reference {}",
                        child, parent
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Width and not-null checks for one row.
fn check_shape(table: Table, row: &Row) -> StoreResult<()> {
    let schema = table.schema();
    if row.len() != schema.columns.len() {
        return Err(StoreError::Data {
            table: table.name().to_string(),
            message: format!(
                "expected {} values, got {}",
                schema.columns.len(),
                row.len()
            ),
        });
    }

    for (value, column) in row.iter().zip(schema.columns) {
        if value.is_null() && !column.nullable {
            return Err(StoreError::Constraint {
                table: table.name().to_string(),
                message: format!("NOT NULL constraint failed: {}.{}", table, column.name),
            });
        }
    }
    Ok(())
}
