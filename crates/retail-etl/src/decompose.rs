//! Sales decomposition into orders and order items.
//!
//! Every cleaned sale is one transaction, and every transaction becomes one
//! order with exactly one item. Orders are a projection of the sale, not an
//! aggregation over several lines.

use crate::types::{Order, OrderItem, Sale};
use std::collections::HashSet;
use tracing::debug;

/// Project sales onto orders, dropping exact duplicate projections.
///
/// First occurrence wins and source order is preserved.
pub fn split_to_orders(sales: &[Sale]) -> Vec<Order> {
    let mut seen: HashSet<(String, String, Option<String>, u64, Option<String>)> = HashSet::new();
    let orders: Vec<Order> = sales
        .iter()
        .map(|sale| Order {
            order_id: sale.transaction_id.clone(),
            customer_id: sale.customer_id.clone(),
            order_date: sale.transaction_date.clone(),
            total_amount: sale.amount(),
            status: sale.status.clone(),
        })
        .filter(|order| {
            seen.insert((
                order.order_id.clone(),
                order.customer_id.clone(),
                order.order_date.clone(),
                order.total_amount.to_bits(),
                order.status.clone(),
            ))
        })
        .collect();

    debug!("Split {} sales into {} orders", sales.len(), orders.len());
    orders
}

/// One item per sale, numbered from 1 in batch order.
///
/// The ordinal is only stable for one run over one cleaned batch.
pub fn split_to_order_items(sales: &[Sale]) -> Vec<OrderItem> {
    sales
        .iter()
        .enumerate()
        .map(|(index, sale)| OrderItem {
            order_item_id: index as i64 + 1,
            order_id: sale.transaction_id.clone(),
            product_id: sale.product_id.clone(),
            quantity: sale.quantity,
            unit_price: sale.unit_price,
            subtotal: sale.amount(),
        })
        .collect()
}
