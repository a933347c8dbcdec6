use axum::Json;
use serde::Serialize;

// ─── Domain type ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Item {
    pub id: u32,
    pub name: &'static str,
    /// Whole currency units
    pub price: u32,
}

/// Fixed catalogue, served in this order.
pub static ITEMS: [Item; 3] = [
    Item { id: 1, name: "Laptop", price: 1200 },
    Item { id: 2, name: "Headphones", price: 80 },
    Item { id: 3, name: "Mouse", price: 25 },
];

// ─── GET /items ──────────────────────────────────────────────────

pub async fn list_items() -> Json<&'static [Item]> {
    Json(&ITEMS[..])
}
