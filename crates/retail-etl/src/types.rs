use serde::{Deserialize, Serialize};

// ============================================================================
// Raw records (as extracted, every field text)
// ============================================================================

/// A row shape read from one raw CSV source.
///
/// `COLUMNS` lists the columns the cleaners consume, in the order
/// [`from_fields`](Self::from_fields) expects them.
pub trait RawRecord: Sized {
    /// Source name used in diagnostics and reports.
    const SOURCE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_fields(fields: Vec<Option<String>>) -> Self;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCustomer {
    pub customer_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub registration_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProduct {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub stock_quantity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSale {
    pub transaction_id: Option<String>,
    pub customer_id: Option<String>,
    pub product_id: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub transaction_date: Option<String>,
    pub status: Option<String>,
}

impl RawRecord for RawCustomer {
    const SOURCE: &'static str = "customers";
    const COLUMNS: &'static [&'static str] = &[
        "customer_id",
        "first_name",
        "last_name",
        "email",
        "phone",
        "city",
        "registration_date",
    ];

    fn from_fields(fields: Vec<Option<String>>) -> Self {
        let mut it = fields.into_iter();
        Self {
            customer_id: it.next().flatten(),
            first_name: it.next().flatten(),
            last_name: it.next().flatten(),
            email: it.next().flatten(),
            phone: it.next().flatten(),
            city: it.next().flatten(),
            registration_date: it.next().flatten(),
        }
    }
}

impl RawRecord for RawProduct {
    const SOURCE: &'static str = "products";
    const COLUMNS: &'static [&'static str] = &[
        "product_id",
        "product_name",
        "category",
        "price",
        "stock_quantity",
    ];

    fn from_fields(fields: Vec<Option<String>>) -> Self {
        let mut it = fields.into_iter();
        Self {
            product_id: it.next().flatten(),
            product_name: it.next().flatten(),
            category: it.next().flatten(),
            price: it.next().flatten(),
            stock_quantity: it.next().flatten(),
        }
    }
}

impl RawRecord for RawSale {
    const SOURCE: &'static str = "sales";
    const COLUMNS: &'static [&'static str] = &[
        "transaction_id",
        "customer_id",
        "product_id",
        "quantity",
        "unit_price",
        "transaction_date",
        "status",
    ];

    fn from_fields(fields: Vec<Option<String>>) -> Self {
        let mut it = fields.into_iter();
        Self {
            transaction_id: it.next().flatten(),
            customer_id: it.next().flatten(),
            product_id: it.next().flatten(),
            quantity: it.next().flatten(),
            unit_price: it.next().flatten(),
            transaction_date: it.next().flatten(),
            status: it.next().flatten(),
        }
    }
}

// ============================================================================
// Clean entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Never empty; `unknown_email_<id>` when the source had none.
    pub email: String,
    /// `+<country>-<10 digits>`.
    pub phone: Option<String>,
    pub city: Option<String>,
    /// `YYYY-MM-DD`.
    pub registration_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub price: f64,
    pub stock_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub transaction_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub transaction_date: Option<String>,
    pub status: Option<String>,
}

impl Sale {
    /// Line total, `quantity × unit_price`.
    pub fn amount(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// One order per transaction. Projection of a sale, not an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: Option<String>,
    pub total_amount: f64,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// 1-based position in the cleaned sales batch.
    pub order_item_id: i64,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// Everything the transform stage produces for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanBatch {
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
    pub sales: Vec<Sale>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
}
