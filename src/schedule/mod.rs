use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::model::grid::Grid;
use crate::model::job::{Job, JobId};
use crate::model::order::Order;
use crate::model::placement::SkuPlacement;
use crate::routing::tours::{batch_tour, order_tour, TourPlan};
use crate::schedule::batching::{size_batches, time_batches, Batch};

pub mod batching;

/// Guards the meters→minutes conversion against a zero speed.
const SPEED_EPS: f64 = 1e-9;

/// Release discipline selector as it appears in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Fcfs,
    SizeBatch,
    TimeBatch,
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PolicyKind::Fcfs => "fcfs",
            PolicyKind::SizeBatch => "size_batch",
            PolicyKind::TimeBatch => "time_batch",
        };
        write!(f, "{name}")
    }
}

/// A release policy with its parameters bound. The set is closed: the
/// simulator selects by tag at construction time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    Fcfs,
    SizeBatch { batch_size: usize },
    TimeBatch { threshold_min: f64 },
}

impl Policy {
    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::Fcfs => PolicyKind::Fcfs,
            Policy::SizeBatch { .. } => PolicyKind::SizeBatch,
            Policy::TimeBatch { .. } => PolicyKind::TimeBatch,
        }
    }

    pub fn is_batching(&self) -> bool {
        !matches!(self, Policy::Fcfs)
    }
}

fn service_min(tour: &TourPlan, speed_m_per_min: f64) -> f64 {
    tour.meters / speed_m_per_min.max(SPEED_EPS)
}

fn job_from_batch(
    id: JobId,
    batch: Batch,
    release_min: f64,
    tour: TourPlan,
    speed_m_per_min: f64,
) -> Job {
    Job {
        id,
        release_min,
        service_min: service_min(&tour, speed_m_per_min),
        n_orders: batch.orders.len(),
        orders: batch.orders,
        visits: tour.visits,
    }
}

/// Compiles an arrival-sorted order stream into jobs under the given policy.
/// Every job's tour is resolved here, so unreachable or unknown SKUs surface
/// before the simulation starts. The result is non-decreasing in release
/// time.
pub fn compile_jobs(
    policy: &Policy,
    orders: &[Order],
    grid: &Grid,
    placement: &SkuPlacement,
    speed_m_per_min: f64,
) -> anyhow::Result<Vec<Job>> {
    let jobs = match policy {
        Policy::Fcfs => {
            let mut jobs = Vec::with_capacity(orders.len());
            for (id, order) in orders.iter().enumerate() {
                let tour = order_tour(grid, placement, order, true)
                    .with_context(|| format!("job {id}: tour failed"))?;
                jobs.push(Job {
                    id: id as JobId,
                    release_min: order.arrival_min,
                    service_min: service_min(&tour, speed_m_per_min),
                    n_orders: 1,
                    orders: vec![order.clone()],
                    visits: tour.visits,
                });
            }
            jobs
        }
        Policy::SizeBatch { batch_size } => {
            let batches = size_batches(orders, *batch_size);
            let mut jobs = Vec::with_capacity(batches.len());
            for (id, batch) in batches.into_iter().enumerate() {
                let tour = batch_tour(grid, placement, &batch.orders, true)
                    .with_context(|| format!("job {id}: batch tour failed"))?;
                // The batch only becomes picker-visible once its last order
                // has arrived.
                let release_min = batch.last_arrival_min;
                jobs.push(job_from_batch(
                    id as JobId,
                    batch,
                    release_min,
                    tour,
                    speed_m_per_min,
                ));
            }
            jobs
        }
        Policy::TimeBatch { threshold_min } => {
            let batches = time_batches(orders, *threshold_min);
            let last_idx = batches.len().saturating_sub(1);
            let mut jobs = Vec::with_capacity(batches.len());
            for (id, batch) in batches.into_iter().enumerate() {
                let tour = batch_tour(grid, placement, &batch.orders, true)
                    .with_context(|| format!("job {id}: batch tour failed"))?;
                // A window-closed batch waits out its window; the trailing
                // flush is visible as soon as its last order arrives.
                let release_min = if id < last_idx {
                    (batch.first_arrival_min + threshold_min).max(batch.last_arrival_min)
                } else {
                    batch.last_arrival_min
                };
                jobs.push(job_from_batch(
                    id as JobId,
                    batch,
                    release_min,
                    tour,
                    speed_m_per_min,
                ));
            }
            jobs
        }
    };

    debug_assert!(jobs
        .windows(2)
        .all(|w| w[0].release_min <= w[1].release_min));
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::grid::Cell;
    use crate::model::placement::{SkuCellMap, SkuId};

    fn env() -> (Grid, SkuPlacement) {
        let grid = Grid::default_layout();
        let map: SkuCellMap = [
            (SkuId::from("A"), Cell::new(1, 1)),
            (SkuId::from("B"), Cell::new(2, 3)),
            (SkuId::from("C"), Cell::new(0, 4)),
        ]
        .into_iter()
        .collect();
        let placement = SkuPlacement::new(map, &grid).unwrap();
        (grid, placement)
    }

    fn orders_at(arrivals: &[f64]) -> Vec<Order> {
        arrivals
            .iter()
            .map(|&t| Order::new(t, vec![SkuId::from("A")]))
            .collect()
    }

    #[test]
    fn fcfs_emits_one_job_per_order() {
        let (grid, placement) = env();
        let orders = orders_at(&[0.0, 0.7, 1.9]);
        let jobs = compile_jobs(&Policy::Fcfs, &orders, &grid, &placement, 60.0).unwrap();
        assert_eq!(jobs.len(), 3);
        for (job, order) in jobs.iter().zip(&orders) {
            assert_eq!(job.release_min, order.arrival_min);
            assert_eq!(job.n_orders, 1);
            // Round trip to (1,1): 4 steps = 4 m at 60 m/min.
            assert!((job.service_min - 4.0 / 60.0).abs() < 1e-12);
        }
        assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn size_batch_releases_when_the_batch_closes() {
        let (grid, placement) = env();
        let orders = orders_at(&[0.0, 0.4, 1.1, 2.5, 2.6]);
        let policy = Policy::SizeBatch { batch_size: 2 };
        let jobs = compile_jobs(&policy, &orders, &grid, &placement, 60.0).unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].release_min, 0.4);
        assert_eq!(jobs[1].release_min, 2.5);
        assert_eq!(jobs[2].release_min, 2.6);
        assert_eq!(jobs[2].n_orders, 1);
    }

    #[test]
    fn time_batch_release_times_follow_the_window() {
        let (grid, placement) = env();
        let orders = orders_at(&[0.0, 0.5, 1.0, 3.5]);
        let policy = Policy::TimeBatch { threshold_min: 2.0 };
        let jobs = compile_jobs(&policy, &orders, &grid, &placement, 60.0).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].n_orders, 3);
        assert_eq!(jobs[0].release_min, 2.0);
        assert_eq!(jobs[1].n_orders, 1);
        assert_eq!(jobs[1].release_min, 3.5);
    }

    #[test]
    fn release_times_never_precede_contained_arrivals() {
        let (grid, placement) = env();
        let orders = orders_at(&[0.0, 0.2, 5.0, 5.1, 5.2, 9.0]);
        for policy in [
            Policy::Fcfs,
            Policy::SizeBatch { batch_size: 4 },
            Policy::TimeBatch { threshold_min: 1.5 },
        ] {
            let jobs = compile_jobs(&policy, &orders, &grid, &placement, 60.0).unwrap();
            for job in &jobs {
                let last = job
                    .orders
                    .iter()
                    .map(|o| o.arrival_min)
                    .fold(f64::NEG_INFINITY, f64::max);
                assert!(job.release_min >= last);
                assert!(job.service_min >= 0.0);
            }
            assert!(jobs.windows(2).all(|w| w[0].release_min <= w[1].release_min));
        }
    }

    #[test]
    fn batch_jobs_route_the_union_of_stops() {
        let (grid, placement) = env();
        let orders = vec![
            Order::new(0.0, vec![SkuId::from("A"), SkuId::from("B")]),
            Order::new(0.1, vec![SkuId::from("B"), SkuId::from("C")]),
        ];
        let policy = Policy::SizeBatch { batch_size: 2 };
        let jobs = compile_jobs(&policy, &orders, &grid, &placement, 60.0).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].visits.len(), 3);
    }
}
