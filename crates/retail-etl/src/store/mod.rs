//! Relational store abstraction.
//!
//! The four target tables are described once, statically, by
//! [`TableSchema`] values. A [`RelationalStore`] hands out sessions; a
//! [`StoreSession`] creates the schema, atomically replaces a table's rows
//! and reads row counts back. Two stores exist: [`SqliteStore`] for real
//! runs and [`MemoryStore`], which enforces the same keys in memory and
//! journals every operation.

mod memory;
mod sqlite;

pub use memory::{MemoryStore, StoreOp};
pub use sqlite::SqliteStore;

use crate::error::StoreResult;
use crate::types::{Customer, Order, OrderItem, Product};
use serde::{Deserialize, Serialize};

// =============================================================================
// Schema description
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    /// ISO `YYYY-MM-DD` text.
    Date,
}

impl SqlType {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Date => "DATE",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
    /// SQL literal used as the column default.
    pub default: Option<&'static str>,
}

impl ColumnDef {
    pub const fn key(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            primary_key: true,
            nullable: false,
            unique: false,
            default: None,
        }
    }

    pub const fn required(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            nullable: false,
            unique: false,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            nullable: true,
            unique: false,
            default: None,
        }
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn with_default(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    fn ddl(&self) -> String {
        let mut ddl = format!("{} {}", self.name, self.sql_type.sql());
        if self.primary_key {
            ddl.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            ddl.push_str(" NOT NULL");
        }
        if self.unique {
            ddl.push_str(" UNIQUE");
        }
        if let Some(default) = self.default {
            ddl.push_str(" DEFAULT ");
            ddl.push_str(default);
        }
        ddl
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: Table,
}

impl ForeignKey {
    pub const fn new(column: &'static str, references: Table) -> Self {
        Self { column, references }
    }
}

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub foreign_keys: &'static [ForeignKey],
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn primary_key_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.primary_key)
    }

    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnDef::ddl).collect();
        for fk in self.foreign_keys {
            let parent = fk.references.schema();
            let parent_key = parent
                .primary_key_index()
                .map(|i| parent.columns[i].name)
                .unwrap_or(fk.column);
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                fk.column, parent.name, parent_key
            ));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            parts.join(",\n    ")
        )
    }

    pub fn insert_sql(&self) -> String {
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            self.column_names().join(", "),
            placeholders
        )
    }
}

// =============================================================================
// Target tables
// =============================================================================

pub static CUSTOMERS: TableSchema = TableSchema {
    name: "customers",
    columns: &[
        ColumnDef::key("customer_id", SqlType::Text),
        ColumnDef::optional("first_name", SqlType::Text),
        ColumnDef::optional("last_name", SqlType::Text),
        ColumnDef::required("email", SqlType::Text).unique(),
        ColumnDef::optional("phone", SqlType::Text),
        ColumnDef::optional("city", SqlType::Text),
        ColumnDef::optional("registration_date", SqlType::Date),
    ],
    foreign_keys: &[],
};

pub static PRODUCTS: TableSchema = TableSchema {
    name: "products",
    columns: &[
        ColumnDef::key("product_id", SqlType::Text),
        ColumnDef::optional("product_name", SqlType::Text),
        ColumnDef::optional("category", SqlType::Text),
        ColumnDef::required("price", SqlType::Real),
        ColumnDef::required("stock_quantity", SqlType::Integer).with_default("0"),
    ],
    foreign_keys: &[],
};

/// Stored for an order whose sale carried no status. Same value as the
/// `orders.status` column default.
pub const DEFAULT_ORDER_STATUS: &str = "Pending";

pub static ORDERS: TableSchema = TableSchema {
    name: "orders",
    columns: &[
        ColumnDef::key("order_id", SqlType::Text),
        ColumnDef::required("customer_id", SqlType::Text),
        ColumnDef::optional("order_date", SqlType::Date),
        ColumnDef::required("total_amount", SqlType::Real),
        ColumnDef::optional("status", SqlType::Text).with_default("'Pending'"),
    ],
    foreign_keys: &[ForeignKey::new("customer_id", Table::Customers)],
};

pub static ORDER_ITEMS: TableSchema = TableSchema {
    name: "order_items",
    columns: &[
        ColumnDef::key("order_item_id", SqlType::Integer),
        ColumnDef::required("order_id", SqlType::Text),
        ColumnDef::required("product_id", SqlType::Text),
        ColumnDef::required("quantity", SqlType::Integer),
        ColumnDef::required("unit_price", SqlType::Real),
        ColumnDef::required("subtotal", SqlType::Real),
    ],
    foreign_keys: &[
        ForeignKey::new("order_id", Table::Orders),
        ForeignKey::new("product_id", Table::Products),
    ],
};

/// The four target tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Customers,
    Products,
    Orders,
    OrderItems,
}

impl Table {
    /// Parents before children.
    pub const ALL: [Table; 4] = [
        Table::Customers,
        Table::Products,
        Table::Orders,
        Table::OrderItems,
    ];

    pub fn name(&self) -> &'static str {
        self.schema().name
    }

    pub fn schema(&self) -> &'static TableSchema {
        match self {
            Self::Customers => &CUSTOMERS,
            Self::Products => &PRODUCTS,
            Self::Orders => &ORDERS,
            Self::OrderItems => &ORDER_ITEMS,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Values and rows
// =============================================================================

/// A single cell bound into a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text form used for key comparison. `None` for NULL.
    pub fn key_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(i.to_string()),
            Self::Real(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

pub type Row = Vec<SqlValue>;

/// A clean entity that maps onto one row of a target table.
pub trait TableRow {
    const TABLE: Table;

    /// Cell values in the table's column order.
    fn values(&self) -> Row;
}

impl TableRow for Customer {
    const TABLE: Table = Table::Customers;

    fn values(&self) -> Row {
        vec![
            self.customer_id.clone().into(),
            self.first_name.clone().into(),
            self.last_name.clone().into(),
            self.email.clone().into(),
            self.phone.clone().into(),
            self.city.clone().into(),
            self.registration_date.clone().into(),
        ]
    }
}

impl TableRow for Product {
    const TABLE: Table = Table::Products;

    fn values(&self) -> Row {
        vec![
            self.product_id.clone().into(),
            self.product_name.clone().into(),
            self.category.clone().into(),
            self.price.into(),
            self.stock_quantity.into(),
        ]
    }
}

impl TableRow for Order {
    const TABLE: Table = Table::Orders;

    fn values(&self) -> Row {
        vec![
            self.order_id.clone().into(),
            self.customer_id.clone().into(),
            self.order_date.clone().into(),
            self.total_amount.into(),
            self.status
                .clone()
                .unwrap_or_else(|| DEFAULT_ORDER_STATUS.to_string())
                .into(),
        ]
    }
}

impl TableRow for OrderItem {
    const TABLE: Table = Table::OrderItems;

    fn values(&self) -> Row {
        vec![
            self.order_item_id.into(),
            self.order_id.clone().into(),
            self.product_id.clone().into(),
            self.quantity.into(),
            self.unit_price.into(),
            self.subtotal.into(),
        ]
    }
}

/// Convert a slice of entities into rows.
pub fn to_rows<T: TableRow>(items: &[T]) -> Vec<Row> {
    items.iter().map(T::values).collect()
}

// =============================================================================
// Store traits
// =============================================================================

/// A relational store the loader can open sessions on.
pub trait RelationalStore: Send + Sync {
    /// Open a session. Failure here is a connectivity failure.
    fn connect(&self) -> StoreResult<Box<dyn StoreSession + '_>>;

    /// Short human-readable description (path or kind).
    fn describe(&self) -> String;
}

/// One open session. Dropping it releases the underlying connection.
pub trait StoreSession {
    /// Create all four tables if they do not exist yet.
    fn ensure_schema(&mut self) -> StoreResult<()>;

    /// Atomically delete every row of each table in `clears` (in the given
    /// order), then insert `rows` into `table`. Nothing is changed when any
    /// step fails.
    fn replace_rows(&mut self, clears: &[Table], table: Table, rows: &[Row]) -> StoreResult<usize>;

    fn count_rows(&mut self, table: Table) -> StoreResult<usize>;
}
