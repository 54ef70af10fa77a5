use serde::{Deserialize, Serialize};

use crate::model::placement::SkuId;
use crate::model::MapType;

/// A customer order: arrival time in virtual minutes plus the requested SKU
/// multiset. Duplicates in `items` represent quantity. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub arrival_min: f64,
    pub items: Vec<SkuId>,
    pub item_counts: MapType<SkuId, u32>,
}

impl Order {
    pub fn new(arrival_min: f64, items: Vec<SkuId>) -> Self {
        let mut item_counts: MapType<SkuId, u32> = MapType::new();
        for sku in &items {
            *item_counts.entry(sku.clone()).or_default() += 1;
        }
        Self {
            arrival_min,
            items,
            item_counts,
        }
    }

    /// Distinct SKUs, in id order.
    pub fn unique_skus(&self) -> impl Iterator<Item = &SkuId> {
        self.item_counts.keys()
    }
}

/// Sorts an order stream by arrival time, preserving the relative order of
/// simultaneous arrivals.
pub fn sort_by_arrival(orders: &mut [Order]) {
    orders.sort_by(|a, b| a.arrival_min.total_cmp(&b.arrival_min));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_counts_fold_duplicates() {
        let order = Order::new(
            1.5,
            vec![SkuId::from("A"), SkuId::from("B"), SkuId::from("A")],
        );
        assert_eq!(order.item_counts[&SkuId::from("A")], 2);
        assert_eq!(order.item_counts[&SkuId::from("B")], 1);
        assert_eq!(order.unique_skus().count(), 2);
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let mut orders = vec![
            Order::new(2.0, vec![SkuId::from("B")]),
            Order::new(0.0, vec![SkuId::from("A")]),
            Order::new(2.0, vec![SkuId::from("C")]),
        ];
        sort_by_arrival(&mut orders);
        assert_eq!(orders[0].items[0], SkuId::from("A"));
        assert_eq!(orders[1].items[0], SkuId::from("B"));
        assert_eq!(orders[2].items[0], SkuId::from("C"));
    }
}
