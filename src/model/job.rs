use serde::{Deserialize, Serialize};

use crate::model::grid::Cell;
use crate::model::order::Order;

pub type JobId = u32;

/// A unit of pickable work: a single order under FCFS, or a batch. Built by
/// the policy compiler; read-only for the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Earliest virtual minute at which the job may be dispatched. Never
    /// before the arrival of any contained order.
    pub release_min: f64,
    /// Nominal service duration before the congestion multiplier.
    pub service_min: f64,
    pub n_orders: usize,
    pub orders: Vec<Order>,
    /// Nearest-neighbor visit sequence from the station, cached at compile
    /// time so dispatch and animation replay the exact tour.
    pub visits: Vec<Cell>,
}

impl Job {
    pub fn first_arrival_min(&self) -> f64 {
        self.orders
            .iter()
            .map(|o| o.arrival_min)
            .fold(f64::INFINITY, f64::min)
    }
}
