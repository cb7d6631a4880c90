//! Dependency-ordered load into the relational store.
//!
//! The store is refreshed table by table. Each table's delete-then-insert
//! runs in its own transaction, so a failure rolls back that table alone.
//! A connectivity failure stops every table that has not started yet.
//! Constraint and data failures stay local to their table.
//!
//! The orchestrator never returns an error; every outcome, including an
//! aborted run, is described by the returned [`LoadSummary`].

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{StoreError, StoreResult};
use crate::store::{RelationalStore, Row, StoreSession, Table, to_rows};
use crate::types::CleanBatch;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One step of the load protocol: clear `clears` (children first), then
/// insert into `table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStep {
    pub table: Table,
    pub clears: &'static [Table],
}

/// Parents load before children. Every delete of a parent is preceded by
/// deletes of the tables referencing it.
pub const LOAD_SEQUENCE: [LoadStep; 4] = [
    LoadStep {
        table: Table::Customers,
        clears: &[Table::OrderItems, Table::Orders, Table::Customers],
    },
    LoadStep {
        table: Table::Products,
        clears: &[Table::OrderItems, Table::Products],
    },
    LoadStep {
        table: Table::Orders,
        clears: &[Table::Orders],
    },
    LoadStep {
        table: Table::OrderItems,
        clears: &[Table::OrderItems],
    },
];

/// What happened to one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TableOutcome {
    Loaded { inserted: usize },
    Skipped { reason: String },
    Failed { error: StoreError, fatal: bool },
    NotAttempted,
}

impl TableOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableLoad {
    pub table: Table,
    pub outcome: TableOutcome,
    /// Row count read back after the load, when the store was reachable.
    pub rows_in_store: Option<usize>,
}

/// Result of one load run, in load order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub schema_ready: bool,
    /// A fatal failure stopped the remaining tables.
    pub aborted: bool,
    pub tables: Vec<TableLoad>,
}

impl LoadSummary {
    /// Every table skipped without opening the store.
    pub fn skipped(reason: &str) -> Self {
        Self {
            schema_ready: false,
            aborted: false,
            tables: LOAD_SEQUENCE
                .iter()
                .map(|step| TableLoad {
                    table: step.table,
                    outcome: TableOutcome::Skipped {
                        reason: reason.to_string(),
                    },
                    rows_in_store: None,
                })
                .collect(),
        }
    }

    pub fn outcome(&self, table: Table) -> Option<&TableOutcome> {
        self.tables.iter().find(|t| t.table == table).map(|t| &t.outcome)
    }

    pub fn rows_in_store(&self, table: Table) -> Option<usize> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .and_then(|t| t.rows_in_store)
    }

    pub fn has_failures(&self) -> bool {
        self.aborted || self.tables.iter().any(|t| t.outcome.is_failure())
    }

    pub fn loaded_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| matches!(t.outcome, TableOutcome::Loaded { .. }))
            .count()
    }
}

/// Loads a [`CleanBatch`] following [`LOAD_SEQUENCE`].
pub struct LoadOrchestrator<'a> {
    store: &'a dyn RelationalStore,
    sink: &'a dyn DiagnosticSink,
    connect_attempts: u32,
    connect_backoff: Duration,
}

impl<'a> LoadOrchestrator<'a> {
    pub fn new(store: &'a dyn RelationalStore, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            store,
            sink,
            connect_attempts: 1,
            connect_backoff: Duration::ZERO,
        }
    }

    /// Retry failed connection attempts up to `attempts` in total, pausing
    /// `backoff` between them.
    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.connect_attempts = attempts.max(1);
        self.connect_backoff = backoff;
        self
    }

    pub fn load(&self, batch: &CleanBatch) -> LoadSummary {
        self.load_with_progress(batch, |_, _| {})
    }

    /// Load every table, calling `on_table` after each step with the step
    /// index and its result.
    pub fn load_with_progress(
        &self,
        batch: &CleanBatch,
        mut on_table: impl FnMut(usize, &TableLoad),
    ) -> LoadSummary {
        let mut summary = LoadSummary {
            schema_ready: false,
            aborted: false,
            tables: Vec::with_capacity(LOAD_SEQUENCE.len()),
        };

        match self.bootstrap() {
            Ok(()) => summary.schema_ready = true,
            Err(e) => {
                self.record_failure(None, &e);
                summary.aborted = true;
            }
        }

        for (index, step) in LOAD_SEQUENCE.iter().enumerate() {
            let outcome = if summary.aborted {
                TableOutcome::NotAttempted
            } else {
                self.load_step(step, &rows_for(batch, step.table))
            };
            if let TableOutcome::Failed { fatal: true, .. } = outcome {
                summary.aborted = true;
            }

            let load = TableLoad {
                table: step.table,
                outcome,
                rows_in_store: None,
            };
            on_table(index, &load);
            summary.tables.push(load);
        }

        if !summary.aborted {
            self.verify(&mut summary);
        }

        info!(
            "Load finished: {} of {} tables loaded{}",
            summary.loaded_count(),
            LOAD_SEQUENCE.len(),
            if summary.aborted { ", aborted" } else { "" }
        );
        summary
    }

    fn bootstrap(&self) -> StoreResult<()> {
        let mut session = self.connect()?;
        session.ensure_schema()?;
        debug!("Schema ready on {}", self.store.describe());
        Ok(())
    }

    fn load_step(&self, step: &LoadStep, rows: &[Row]) -> TableOutcome {
        if rows.is_empty() {
            let reason = "no cleaned rows to load".to_string();
            self.sink
                .record(Diagnostic::info(step.table.name(), format!("skipped: {reason}")));
            return TableOutcome::Skipped { reason };
        }

        let result = self
            .connect()
            .and_then(|mut session| session.replace_rows(step.clears, step.table, rows));

        match result {
            Ok(inserted) => {
                info!("Loaded {} rows into {}", inserted, step.table);
                TableOutcome::Loaded { inserted }
            }
            Err(error) => {
                self.record_failure(Some(step.table), &error);
                let fatal = error.is_fatal();
                TableOutcome::Failed { error, fatal }
            }
        }
    }

    fn verify(&self, summary: &mut LoadSummary) {
        let mut session = match self.connect() {
            Ok(session) => session,
            Err(e) => {
                self.sink.record(Diagnostic::warning(
                    "load",
                    format!("row counts unavailable: {e}"),
                ));
                return;
            }
        };

        for load in &mut summary.tables {
            match session.count_rows(load.table) {
                Ok(count) => load.rows_in_store = Some(count),
                Err(e) => self.sink.record(Diagnostic::warning(
                    load.table.name(),
                    format!("row count unavailable: {e}"),
                )),
            }
        }
    }

    fn connect(&self) -> StoreResult<Box<dyn StoreSession + 'a>> {
        let store: &'a dyn RelationalStore = self.store;
        let mut attempt = 1;
        loop {
            match store.connect() {
                Ok(session) => return Ok(session),
                Err(e) if e.is_fatal() && attempt < self.connect_attempts => {
                    warn!(
                        "Connection attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, self.connect_attempts, e, self.connect_backoff
                    );
                    std::thread::sleep(self.connect_backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn record_failure(&self, table: Option<Table>, error: &StoreError) {
        let source = table.map(|t| t.name()).unwrap_or("load");
        let message = if error.is_fatal() {
            format!("{error}; remaining loads stopped")
        } else {
            format!("{error}; table rolled back")
        };
        self.sink.record(Diagnostic::error(source, message));
    }
}

fn rows_for(batch: &CleanBatch, table: Table) -> Vec<Row> {
    match table {
        Table::Customers => to_rows(&batch.customers),
        Table::Products => to_rows(&batch.products),
        Table::Orders => to_rows(&batch.orders),
        Table::OrderItems => to_rows(&batch.order_items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, Severity};
    use crate::store::{MemoryStore, StoreOp};
    use crate::types::{Customer, Order, OrderItem, Product};
    use pretty_assertions::assert_eq;

    fn batch() -> CleanBatch {
        CleanBatch {
            customers: vec![Customer {
                customer_id: "001".to_string(),
                first_name: Some("Asha".to_string()),
                last_name: None,
                email: "asha@example.com".to_string(),
                phone: None,
                city: None,
                registration_date: None,
            }],
            products: vec![Product {
                product_id: "010".to_string(),
                product_name: Some("Phone".to_string()),
                category: Some("Electronics".to_string()),
                price: 50.0,
                stock_quantity: 3,
            }],
            sales: Vec::new(),
            orders: vec![Order {
                order_id: "1".to_string(),
                customer_id: "001".to_string(),
                order_date: None,
                total_amount: 100.0,
                status: None,
            }],
            order_items: vec![OrderItem {
                order_item_id: 1,
                order_id: "1".to_string(),
                product_id: "010".to_string(),
                quantity: 2,
                unit_price: 50.0,
                subtotal: 100.0,
            }],
        }
    }

    #[test]
    fn test_load_sequence_clears_children_first() {
        for step in LOAD_SEQUENCE {
            assert_eq!(step.clears.last(), Some(&step.table));
        }
        let order: Vec<Table> = LOAD_SEQUENCE.iter().map(|s| s.table).collect();
        assert_eq!(
            order,
            vec![Table::Customers, Table::Products, Table::Orders, Table::OrderItems]
        );
    }

    #[test]
    fn test_full_load() {
        let store = MemoryStore::new();
        let sink = CollectingSink::new();
        let summary = LoadOrchestrator::new(&store, &sink).load(&batch());

        assert!(summary.schema_ready);
        assert!(!summary.has_failures());
        assert_eq!(summary.loaded_count(), 4);
        assert_eq!(summary.rows_in_store(Table::OrderItems), Some(1));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_reload_is_full_replace() {
        let store = MemoryStore::new();
        let sink = CollectingSink::new();
        let orchestrator = LoadOrchestrator::new(&store, &sink);
        orchestrator.load(&batch());
        let summary = orchestrator.load(&batch());

        for table in Table::ALL {
            assert_eq!(summary.rows_in_store(table), Some(1));
        }
    }

    #[test]
    fn test_no_parent_delete_after_child_insert() {
        let store = MemoryStore::new();
        let sink = CollectingSink::new();
        LoadOrchestrator::new(&store, &sink).load(&batch());

        let journal = store.journal();
        let position = |op: &StoreOp| journal.iter().position(|j| j == op);
        let items_insert = position(&StoreOp::Insert {
            table: Table::OrderItems,
            rows: 1,
        })
        .unwrap();
        let last_products_delete = journal
            .iter()
            .rposition(|j| *j == StoreOp::Delete { table: Table::Products })
            .unwrap();
        assert!(last_products_delete < items_insert);
    }

    #[test]
    fn test_constraint_failure_is_local() {
        let store = MemoryStore::new();
        store.inject_failure(
            Table::Customers,
            StoreError::Constraint {
                table: "customers".to_string(),
                message: "UNIQUE constraint failed: customers.email".to_string(),
            },
        );
        let sink = CollectingSink::new();
        let summary = LoadOrchestrator::new(&store, &sink).load(&batch());

        assert!(matches!(
            summary.outcome(Table::Customers),
            Some(TableOutcome::Failed { fatal: false, .. })
        ));
        assert_eq!(
            summary.outcome(Table::Products),
            Some(&TableOutcome::Loaded { inserted: 1 })
        );
        assert!(!summary.aborted);
        // Orders and their items then fail their own foreign keys, locally.
        assert!(matches!(
            summary.outcome(Table::Orders),
            Some(TableOutcome::Failed { fatal: false, .. })
        ));
        assert_eq!(sink.count(Severity::Error), 3);
        assert_eq!(sink.diagnostics()[0].source, "customers");
    }

    #[test]
    fn test_connection_failure_stops_later_loads() {
        let store = MemoryStore::new();
        // Bootstrap and customers connect, products is refused.
        store.refuse_connections_after(2);
        let sink = CollectingSink::new();
        let summary = LoadOrchestrator::new(&store, &sink).load(&batch());

        assert!(summary.aborted);
        assert_eq!(
            summary.outcome(Table::Customers),
            Some(&TableOutcome::Loaded { inserted: 1 })
        );
        assert!(matches!(
            summary.outcome(Table::Products),
            Some(TableOutcome::Failed { fatal: true, .. })
        ));
        assert_eq!(summary.outcome(Table::Orders), Some(&TableOutcome::NotAttempted));
        assert_eq!(summary.outcome(Table::OrderItems), Some(&TableOutcome::NotAttempted));
        assert!(
            !store
                .journal()
                .iter()
                .any(|op| *op == StoreOp::Insert { table: Table::Orders, rows: 1 })
        );
    }

    #[test]
    fn test_bootstrap_failure_aborts_everything() {
        let store = MemoryStore::new();
        store.refuse_connections_after(0);
        let sink = CollectingSink::new();
        let summary = LoadOrchestrator::new(&store, &sink).load(&batch());

        assert!(!summary.schema_ready);
        assert!(summary.aborted);
        assert!(
            summary
                .tables
                .iter()
                .all(|t| t.outcome == TableOutcome::NotAttempted)
        );
        assert_eq!(sink.diagnostics()[0].source, "load");
    }

    #[test]
    fn test_empty_table_skipped() {
        let store = MemoryStore::new();
        let sink = CollectingSink::new();
        let mut input = batch();
        input.order_items.clear();
        let summary = LoadOrchestrator::new(&store, &sink).load(&input);

        assert!(matches!(
            summary.outcome(Table::OrderItems),
            Some(TableOutcome::Skipped { .. })
        ));
        assert_eq!(sink.count(Severity::Info), 1);
        assert!(!summary.has_failures());
    }

    /// Refuses the first `failures` connection attempts, then delegates.
    struct FlakyStore {
        inner: MemoryStore,
        failures: parking_lot::Mutex<u32>,
    }

    impl RelationalStore for FlakyStore {
        fn connect(&self) -> StoreResult<Box<dyn StoreSession + '_>> {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(StoreError::Connection("server not ready".to_string()));
            }
            self.inner.connect()
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[test]
    fn test_retry_recovers_from_refused_connection() {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            failures: parking_lot::Mutex::new(2),
        };
        let sink = CollectingSink::new();
        let summary = LoadOrchestrator::new(&store, &sink)
            .with_retry(3, Duration::from_millis(1))
            .load(&batch());

        assert!(!summary.has_failures());
        assert_eq!(summary.loaded_count(), 4);
    }

    #[test]
    fn test_single_attempt_without_retry() {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            failures: parking_lot::Mutex::new(1),
        };
        let sink = CollectingSink::new();
        let summary = LoadOrchestrator::new(&store, &sink).load(&batch());

        assert!(summary.aborted);
        assert_eq!(store.inner.connection_count(), 0);
    }

    #[test]
    fn test_progress_callback_per_table() {
        let store = MemoryStore::new();
        let sink = CollectingSink::new();
        let mut seen = Vec::new();
        LoadOrchestrator::new(&store, &sink).load_with_progress(&batch(), |index, load| {
            seen.push((index, load.table));
        });
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[3], (3, Table::OrderItems));
    }
}
