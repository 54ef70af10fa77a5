use crate::model::order::Order;

/// Orders grouped for a single picking trip, with the arrival window that
/// formed them.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub orders: Vec<Order>,
    pub first_arrival_min: f64,
    pub last_arrival_min: f64,
}

impl Batch {
    fn from_buffer(buffer: &[Order]) -> Option<Self> {
        let first = buffer.first()?;
        let last = buffer.last()?;
        Some(Self {
            orders: buffer.to_vec(),
            first_arrival_min: first.arrival_min,
            last_arrival_min: last.arrival_min,
        })
    }
}

/// Groups an arrival-sorted stream into batches of exactly `batch_size`
/// orders; a trailing partial buffer is flushed as the final batch.
pub fn size_batches(orders: &[Order], batch_size: usize) -> Vec<Batch> {
    debug_assert!(batch_size >= 1);
    let mut batches = Vec::new();
    let mut buffer: Vec<Order> = Vec::with_capacity(batch_size);
    for order in orders {
        buffer.push(order.clone());
        if buffer.len() == batch_size {
            batches.extend(Batch::from_buffer(&buffer));
            buffer.clear();
        }
    }
    batches.extend(Batch::from_buffer(&buffer));
    batches
}

/// Groups an arrival-sorted stream into time windows: a batch closes when an
/// incoming order arrives `threshold_min` or more after the batch's first
/// order; that order then opens the next batch.
pub fn time_batches(orders: &[Order], threshold_min: f64) -> Vec<Batch> {
    debug_assert!(threshold_min > 0.0);
    let mut batches = Vec::new();
    let mut buffer: Vec<Order> = Vec::new();
    let mut first_time = 0.0;
    for order in orders {
        if buffer.is_empty() {
            first_time = order.arrival_min;
            buffer.push(order.clone());
        } else if order.arrival_min - first_time >= threshold_min {
            batches.extend(Batch::from_buffer(&buffer));
            first_time = order.arrival_min;
            buffer = vec![order.clone()];
        } else {
            buffer.push(order.clone());
        }
    }
    batches.extend(Batch::from_buffer(&buffer));
    batches
}
