//! Integration tests for the retail ETL pipeline.
//!
//! These tests run the whole pipeline over the fixture exports, against
//! both the SQLite store and the in-memory store.

use pretty_assertions::assert_eq;
use retail_etl::{
    CollectingSink, EtlConfig, MemoryStore, Pipeline, PipelineStage, Severity, SqliteStore,
    StoreError, StoreOp, Table, TableOutcome,
};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config(data_dir: &Path, output: &TempDir) -> EtlConfig {
    EtlConfig::builder()
        .data_dir(data_dir)
        .output_dir(output.path().join("output"))
        .build()
        .unwrap()
}

fn run_memory(config: EtlConfig, store: Arc<MemoryStore>) -> (retail_etl::RunSummary, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let summary = Pipeline::builder()
        .config(config)
        .store(store)
        .diagnostics(sink.clone())
        .build()
        .unwrap()
        .run()
        .unwrap();
    (summary, sink)
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}

// ============================================================================
// End-to-end with SQLite
// ============================================================================

#[test]
fn test_full_run_into_sqlite() {
    let out = TempDir::new().unwrap();
    let config = config(&fixtures_path(), &out);
    let db_path = config.database_path.clone();

    let summary = Pipeline::builder()
        .config(config)
        .diagnostics(Arc::new(CollectingSink::new()))
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.raw.customers, 6);
    assert_eq!(summary.cleaned.customers, 5);
    assert_eq!(summary.cleaned.products, 6);
    assert_eq!(summary.cleaned.sales, 5);
    assert_eq!(summary.orders, 5);
    assert_eq!(summary.order_items, 5);

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(count(&conn, "customers"), 5);
    assert_eq!(count(&conn, "products"), 6);
    assert_eq!(count(&conn, "orders"), 5);
    assert_eq!(count(&conn, "order_items"), 5);

    let email: String = conn
        .query_row("SELECT email FROM customers WHERE customer_id = '003'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(email, "unknown_email_003");

    let phone: Option<String> = conn
        .query_row("SELECT phone FROM customers WHERE customer_id = '001'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(phone.as_deref(), Some("+91-9876543210"));

    let phone: Option<String> = conn
        .query_row("SELECT phone FROM customers WHERE customer_id = '004'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(phone, None);

    let (price, category): (f64, String) = conn
        .query_row(
            "SELECT price, category FROM products WHERE product_id = '003'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(price, 2999.0);
    assert_eq!(category, "Electronics");

    let (item_id, subtotal): (i64, f64) = conn
        .query_row(
            "SELECT order_item_id, subtotal FROM order_items WHERE order_id = '007'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(item_id, 5);
    assert_eq!(subtotal, 2600.0);
}

#[test]
fn test_rerun_is_idempotent() {
    let out = TempDir::new().unwrap();
    let config = config(&fixtures_path(), &out);
    let output_dir = config.output_dir.clone();
    let db_path = config.database_path.clone();

    let pipeline = Pipeline::builder()
        .config(config)
        .store(Arc::new(SqliteStore::new(&db_path)))
        .diagnostics(Arc::new(CollectingSink::new()))
        .build()
        .unwrap();

    let first = pipeline.run().unwrap();
    let orders_first = fs::read(output_dir.join("orders.csv")).unwrap();
    let items_first = fs::read(output_dir.join("order_items.csv")).unwrap();
    let report_first = fs::read(output_dir.join("data_quality_report.txt")).unwrap();

    let second = pipeline.run().unwrap();
    assert_eq!(fs::read(output_dir.join("orders.csv")).unwrap(), orders_first);
    assert_eq!(fs::read(output_dir.join("order_items.csv")).unwrap(), items_first);
    assert_eq!(
        fs::read(output_dir.join("data_quality_report.txt")).unwrap(),
        report_first
    );

    for table in Table::ALL {
        assert_eq!(
            first.load.rows_in_store(table),
            second.load.rows_in_store(table),
            "row count of {table} changed between runs"
        );
    }

    let sink = CollectingSink::new();
    let sources = pipeline.extract(&sink);
    assert_eq!(pipeline.transform(&sources, &sink), pipeline.transform(&sources, &sink));
}

#[test]
fn test_missing_status_stored_as_pending() {
    let data = TempDir::new().unwrap();
    for name in ["customers_raw.csv", "products_raw.csv"] {
        fs::copy(fixtures_path().join(name), data.path().join(name)).unwrap();
    }
    fs::write(
        data.path().join("sales_raw.csv"),
        "transaction_id,customer_id,product_id,quantity,unit_price,transaction_date,status\n\
         T001,C001,P001,1,100,2024-02-01,\n\
         T002,C002,P002,1,100,2024-02-02,Completed\n",
    )
    .unwrap();
    let out = TempDir::new().unwrap();
    let config = config(data.path(), &out);
    let db_path = config.database_path.clone();

    let summary = Pipeline::builder()
        .config(config)
        .diagnostics(Arc::new(CollectingSink::new()))
        .build()
        .unwrap()
        .run()
        .unwrap();
    assert!(summary.is_success());

    let conn = Connection::open(&db_path).unwrap();
    let statuses: Vec<String> = conn
        .prepare("SELECT status FROM orders ORDER BY order_id")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(statuses, vec!["Pending".to_string(), "Completed".to_string()]);
}

#[test]
fn test_quality_report_file() {
    let out = TempDir::new().unwrap();
    let (summary, _) = run_memory(config(&fixtures_path(), &out), Arc::new(MemoryStore::new()));

    let text = fs::read_to_string(out.path().join("output/data_quality_report.txt")).unwrap();
    assert_eq!(
        text,
        "Data Quality Report (ETL Summary):\n\n\
         File: customers_raw.csv\n\
         - Records Processed: 6\n\
         - Duplicates Removed: 1\n\
         - Missing Values Handled: 1\n\
         - Records Loaded Successfully: 5\n\n\
         File: products_raw.csv\n\
         - Records Processed: 6\n\
         - Duplicates Removed: 0\n\
         - Missing Values Handled: 2\n\
         - Records Loaded Successfully: 6\n\n\
         File: sales_raw.csv\n\
         - Records Processed: 8\n\
         - Duplicates Removed: 1\n\
         - Missing Values Handled: 2\n\
         - Records Loaded Successfully: 5\n\n"
    );
    assert!(out.path().join("output/data_quality_report.json").is_file());
    assert_eq!(summary.quality.sources.len(), 3);
}

// ============================================================================
// Load ordering against the simulated store
// ============================================================================

#[test]
fn test_no_products_delete_after_order_items_insert() {
    let out = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    run_memory(config(&fixtures_path(), &out), store.clone());

    let journal = store.journal();
    let first_items_insert = journal
        .iter()
        .position(|op| matches!(op, StoreOp::Insert { table: Table::OrderItems, .. }))
        .unwrap();
    assert!(
        !journal[first_items_insert..]
            .iter()
            .any(|op| *op == StoreOp::Delete { table: Table::Products })
    );

    let inserts: Vec<Table> = journal
        .iter()
        .filter_map(|op| match op {
            StoreOp::Insert { table, .. } => Some(*table),
            _ => None,
        })
        .collect();
    assert_eq!(
        inserts,
        vec![Table::Customers, Table::Products, Table::Orders, Table::OrderItems]
    );
    assert_eq!(journal[1], StoreOp::EnsureSchema);
}

#[test]
fn test_every_session_is_released() {
    let out = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    run_memory(config(&fixtures_path(), &out), store.clone());

    let journal = store.journal();
    let connects = journal.iter().filter(|op| **op == StoreOp::Connect).count();
    let releases = journal.iter().filter(|op| **op == StoreOp::Release).count();
    assert_eq!(connects, releases);
    assert_eq!(connects, store.connection_count());
}

#[test]
fn test_customers_constraint_failure_does_not_block_products() {
    let out = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.inject_failure(
        Table::Customers,
        StoreError::Constraint {
            table: "customers".to_string(),
            message: "UNIQUE constraint failed: customers.email".to_string(),
        },
    );

    let (summary, sink) = run_memory(config(&fixtures_path(), &out), store.clone());

    assert!(!summary.is_success());
    assert!(!summary.load.aborted);
    assert!(matches!(
        summary.load.outcome(Table::Customers),
        Some(TableOutcome::Failed { fatal: false, .. })
    ));
    assert_eq!(
        summary.load.outcome(Table::Products),
        Some(&TableOutcome::Loaded { inserted: 6 })
    );
    assert_eq!(store.rows(Table::Products).len(), 6);
    assert!(store.journal().contains(&StoreOp::Rollback { table: Table::Customers }));
    assert!(
        sink.diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Error && d.source == "customers")
    );
}

#[test]
fn test_connection_failure_stops_later_loads() {
    let out = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    // Schema bootstrap and the customers load connect; products is refused.
    store.refuse_connections_after(2);

    let (summary, _) = run_memory(config(&fixtures_path(), &out), store.clone());

    assert!(summary.load.aborted);
    assert_eq!(
        summary.load.outcome(Table::Customers),
        Some(&TableOutcome::Loaded { inserted: 5 })
    );
    assert_eq!(summary.load.outcome(Table::Orders), Some(&TableOutcome::NotAttempted));
    assert_eq!(summary.load.outcome(Table::OrderItems), Some(&TableOutcome::NotAttempted));

    let touched_after_failure = store.journal().iter().any(|op| {
        matches!(
            op,
            StoreOp::Insert { table: Table::Orders | Table::OrderItems | Table::Products, .. }
        )
    });
    assert!(!touched_after_failure);
}

// ============================================================================
// Cleaning behavior visible in the outputs
// ============================================================================

#[test]
fn test_duplicate_transaction_collapses_everywhere() {
    let out = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    run_memory(config(&fixtures_path(), &out), store.clone());

    let order_ids: Vec<String> = store
        .rows(Table::Orders)
        .iter()
        .filter_map(|row| row[0].key_text())
        .collect();
    assert_eq!(order_ids, vec!["001", "002", "003", "005", "007"]);

    let items = store.rows(Table::OrderItems);
    let for_002 = items
        .iter()
        .filter(|row| row[1].key_text().as_deref() == Some("002"))
        .count();
    assert_eq!(for_002, 1);

    let csv = fs::read_to_string(out.path().join("output/orders.csv")).unwrap();
    assert_eq!(csv.lines().filter(|l| l.starts_with("002,")).count(), 1);
}

#[test]
fn test_artifacts_written_before_load() {
    let out = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    // Even a store that refuses everything leaves the artifacts in place.
    store.refuse_connections_after(0);

    let (summary, _) = run_memory(config(&fixtures_path(), &out), store);

    assert!(summary.load.aborted);
    assert_eq!(summary.artifacts.len(), 2);
    let items = fs::read_to_string(out.path().join("output/order_items.csv")).unwrap();
    assert_eq!(items.lines().count(), 6);
}

#[test]
fn test_missing_source_degrades_to_nothing_to_load() {
    let data = TempDir::new().unwrap();
    for name in ["customers_raw.csv", "products_raw.csv"] {
        fs::copy(fixtures_path().join(name), data.path().join(name)).unwrap();
    }
    let out = TempDir::new().unwrap();

    let (summary, sink) = run_memory(config(data.path(), &out), Arc::new(MemoryStore::new()));

    assert_eq!(summary.cleaned.sales, 0);
    assert!(matches!(
        summary.load.outcome(Table::Orders),
        Some(TableOutcome::Skipped { .. })
    ));
    assert_eq!(
        summary.load.outcome(Table::Customers),
        Some(&TableOutcome::Loaded { inserted: 5 })
    );
    assert!(summary.is_success());
    assert!(
        sink.diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Error && d.source == "sales")
    );
}

#[test]
fn test_missing_columns_reported() {
    let data = TempDir::new().unwrap();
    fs::copy(
        fixtures_path().join("customers_raw.csv"),
        data.path().join("customers_raw.csv"),
    )
    .unwrap();
    fs::copy(
        fixtures_path().join("sales_raw.csv"),
        data.path().join("sales_raw.csv"),
    )
    .unwrap();
    fs::write(
        data.path().join("products_raw.csv"),
        "product_id,product_name\nP001,Phone\n",
    )
    .unwrap();
    let out = TempDir::new().unwrap();

    let (summary, sink) = run_memory(config(data.path(), &out), Arc::new(MemoryStore::new()));

    assert_eq!(summary.raw.products, 1);
    assert_eq!(summary.cleaned.products, 0);
    // Without products every order item fails its foreign key.
    assert!(matches!(
        summary.load.outcome(Table::OrderItems),
        Some(TableOutcome::Failed { fatal: false, .. })
    ));
    let errors: Vec<String> = sink
        .diagnostics()
        .into_iter()
        .filter(|d| d.source == "products" && d.severity == Severity::Error)
        .map(|d| d.message)
        .collect();
    assert!(errors[0].contains("category"));
}

// ============================================================================
// Dry Run
// ============================================================================

fn dry_run_config(output: &TempDir) -> EtlConfig {
    EtlConfig::builder()
        .data_dir(fixtures_path())
        .output_dir(output.path().join("output"))
        .dry_run(true)
        .build()
        .unwrap()
}

#[test]
fn test_dry_run_leaves_store_untouched() {
    let out = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let (summary, _sink) = run_memory(dry_run_config(&out), store.clone());

    assert!(store.journal().is_empty());
    assert_eq!(store.connection_count(), 0);
    for table in Table::ALL {
        assert!(store.rows(table).is_empty());
    }

    assert!(summary.is_success());
    assert!(!summary.load.schema_ready);
    assert_eq!(summary.load.loaded_count(), 0);
    for table in Table::ALL {
        assert_eq!(
            summary.load.outcome(table),
            Some(&TableOutcome::Skipped {
                reason: "dry run".to_string()
            })
        );
        assert_eq!(summary.load.rows_in_store(table), None);
    }
}

#[test]
fn test_dry_run_still_transforms_and_reports() {
    let out = TempDir::new().unwrap();
    let (summary, _sink) = run_memory(dry_run_config(&out), Arc::new(MemoryStore::new()));

    assert_eq!(summary.raw.sales, 8);
    assert_eq!(summary.cleaned.customers, 5);
    assert_eq!(summary.cleaned.products, 6);
    assert_eq!(summary.cleaned.sales, 5);
    assert_eq!(summary.orders, 5);
    assert_eq!(summary.order_items, 5);
    assert_eq!(summary.artifacts.len(), 2);
    assert_eq!(summary.report_files.len(), 2);
    assert_eq!(summary.quality.sources.len(), 3);
    assert!(out.path().join("output/orders.csv").is_file());
    assert!(out.path().join("output/data_quality_report.txt").is_file());
}

#[test]
fn test_dry_run_never_creates_database() {
    let out = TempDir::new().unwrap();
    let config = dry_run_config(&out);
    let db_path = config.database_path.clone();

    let summary = Pipeline::builder()
        .config(config)
        .diagnostics(Arc::new(CollectingSink::new()))
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert!(summary.is_success());
    assert!(!db_path.exists());
}

// ============================================================================
// Progress Reporting
// ============================================================================

#[test]
fn test_progress_stages_in_order() {
    let out = TempDir::new().unwrap();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let recorded = stages.clone();

    Pipeline::builder()
        .config(config(&fixtures_path(), &out))
        .store(Arc::new(MemoryStore::new()))
        .diagnostics(Arc::new(CollectingSink::new()))
        .on_progress(move |update| {
            let mut stages = recorded.lock().unwrap();
            if stages.last() != Some(&update.stage) {
                stages.push(update.stage);
            }
        })
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(
        *stages.lock().unwrap(),
        vec![
            PipelineStage::Extracting,
            PipelineStage::Cleaning,
            PipelineStage::Decomposing,
            PipelineStage::Exporting,
            PipelineStage::Loading,
            PipelineStage::Reporting,
            PipelineStage::Complete,
        ]
    );
}
