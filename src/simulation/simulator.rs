use std::collections::VecDeque;

use anyhow::ensure;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::model::grid::{Cell, Grid};
use crate::model::job::{Job, JobId};
use crate::model::order::{sort_by_arrival, Order};
use crate::model::placement::SkuPlacement;
use crate::routing::tour_path;
use crate::schedule::{compile_jobs, Policy, PolicyKind};
use crate::simulation::callback::SimulationCallback;
use crate::simulation::event_queue::EventQueue;
use crate::simulation::sim_event::{PickerId, SimEvent};
use crate::trace::{fuse_timeline, Keyframe, KeyframeTrack, MotionState, Trace, TraceMeta};

/// Slowdown per additional concurrently active picker in `light` mode.
const LIGHT_CONGESTION_ALPHA: f64 = 0.15;

/// Floor for the animation tick so a degenerate `round_dt` cannot stall the
/// keyframe emitter.
const MIN_ANIMATION_DT: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionMode {
    #[default]
    Off,
    Light,
}

impl std::fmt::Display for CongestionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CongestionMode::Off => write!(f, "off"),
            CongestionMode::Light => write!(f, "light"),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_time_threshold() -> f64 {
    2.0
}

fn default_round_dt() -> f64 {
    0.25
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub policy: PolicyKind,
    pub n_pickers: usize,
    pub speed_m_per_min: f64,
    #[serde(default)]
    pub congestion: CongestionMode,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_time_threshold")]
    pub time_threshold_min: f64,
    #[serde(default)]
    pub horizon_min: Option<f64>,
    /// Animation discretization quantum, minutes.
    #[serde(default = "default_round_dt")]
    pub round_dt: f64,
}

impl SimConfig {
    pub fn fcfs(n_pickers: usize, speed_m_per_min: f64) -> Self {
        Self {
            policy: PolicyKind::Fcfs,
            n_pickers,
            speed_m_per_min,
            congestion: CongestionMode::Off,
            batch_size: default_batch_size(),
            time_threshold_min: default_time_threshold(),
            horizon_min: None,
            round_dt: default_round_dt(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.n_pickers >= 1, "n_pickers must be at least 1");
        ensure!(
            self.speed_m_per_min > 0.0,
            "speed_m_per_min must be positive"
        );
        ensure!(self.round_dt > 0.0, "round_dt must be positive");
        if let Some(horizon) = self.horizon_min {
            ensure!(horizon > 0.0, "horizon_min must be positive when set");
        }
        match self.policy {
            PolicyKind::SizeBatch => {
                ensure!(self.batch_size >= 1, "batch_size must be at least 1")
            }
            PolicyKind::TimeBatch => ensure!(
                self.time_threshold_min > 0.0,
                "time_threshold_min must be positive"
            ),
            PolicyKind::Fcfs => {}
        }
        Ok(())
    }

    /// Binds the policy tag to its parameters.
    pub fn policy(&self) -> Policy {
        match self.policy {
            PolicyKind::Fcfs => Policy::Fcfs,
            PolicyKind::SizeBatch => Policy::SizeBatch {
                batch_size: self.batch_size,
            },
            PolicyKind::TimeBatch => Policy::TimeBatch {
                threshold_min: self.time_threshold_min,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PickerState {
    pub busy_until: f64,
    pub busy_time: f64,
    pub completed_orders: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GanttSegment {
    pub start_min: f64,
    pub end_min: f64,
    pub job_id: JobId,
}

/// Every accumulator the event loop writes, in one place.
#[derive(Debug, Clone, Default)]
struct Telemetry {
    ts_queue: Vec<(f64, usize)>,
    ts_completed: Vec<(f64, usize)>,
    gantt: Vec<Vec<GanttSegment>>,
    waits: Vec<f64>,
    batch_sizes: Vec<usize>,
    batch_release: Vec<f64>,
    batch_fill: Vec<f64>,
    distance_total_m: f64,
    orders_completed: usize,
    picker_tours: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimResult {
    pub makespan_min: f64,
    pub orders_completed: usize,
    pub throughput_per_hour: f64,
    pub avg_wait_min: f64,
    pub wait_p90_min: f64,
    pub wait_p95_min: f64,
    pub picker_utilization: Vec<f64>,
    pub picker_idle_min: Vec<f64>,
    pub picker_tours: Vec<u32>,
    pub distance_total_m: f64,
    pub distance_per_order_avg_m: f64,
    pub batches_count: usize,
    pub batch_avg_size: f64,
    pub batch_pct_ge2: f64,
    pub batch_avg_release_min: f64,
    pub batch_avg_fill_min: f64,
    pub ts_queue: Vec<(f64, usize)>,
    pub ts_completed: Vec<(f64, usize)>,
    pub gantt: Vec<Vec<GanttSegment>>,
    pub waits_raw: Vec<f64>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Linear-interpolation percentile over a sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = q / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

/// Event-driven scheduler over a finite picker pool. Owns all mutable
/// simulation state; the grid and compiled jobs are read-only inputs.
pub struct Simulator {
    grid: Grid,
    cfg: SimConfig,
    policy: Policy,
    jobs: Vec<Job>,

    now: f64,
    events: EventQueue<SimEvent>,
    waiting: VecDeque<Job>,
    pickers: Vec<PickerState>,
    telemetry: Telemetry,
    tracks: Vec<KeyframeTrack>,
    callbacks: Vec<Box<dyn SimulationCallback>>,
}

impl Simulator {
    /// Validates the configuration and placement, compiles the order stream
    /// into jobs, and seeds the event queue. All fatal conditions
    /// (configuration, placement, routing) surface here; `run` cannot fail.
    pub fn new(
        grid: Grid,
        placement: &SkuPlacement,
        mut orders: Vec<Order>,
        cfg: SimConfig,
    ) -> anyhow::Result<Self> {
        cfg.validate()?;
        sort_by_arrival(&mut orders);
        let policy = cfg.policy();
        let jobs = compile_jobs(&policy, &orders, &grid, placement, cfg.speed_m_per_min)?;

        let mut events = EventQueue::new();
        for job in &jobs {
            events.push(job.release_min, SimEvent::Arrival { job: job.clone() });
        }

        let station = grid.station();
        let tracks = (0..cfg.n_pickers)
            .map(|_| {
                let mut track = KeyframeTrack::default();
                track.push(Keyframe {
                    time: 0.0,
                    cell: station,
                    state: MotionState::Idle,
                    job_id: None,
                });
                track
            })
            .collect();

        let telemetry = Telemetry {
            ts_queue: vec![(0.0, 0)],
            ts_completed: vec![(0.0, 0)],
            gantt: vec![Vec::new(); cfg.n_pickers],
            picker_tours: vec![0; cfg.n_pickers],
            ..Telemetry::default()
        };

        debug!(
            jobs = jobs.len(),
            pickers = cfg.n_pickers,
            policy = %policy.kind(),
            "simulator ready"
        );

        Ok(Self {
            pickers: vec![PickerState::default(); cfg.n_pickers],
            grid,
            cfg,
            policy,
            jobs,
            now: 0.0,
            events,
            waiting: VecDeque::new(),
            telemetry,
            tracks,
            callbacks: Vec::new(),
        })
    }

    pub fn add_callback(&mut self, callback: Box<dyn SimulationCallback>) {
        self.callbacks.push(callback);
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn pickers(&self) -> &[PickerState] {
        &self.pickers
    }

    /// Drains the event queue (or halts at the horizon) and reports KPIs
    /// against the clipped window.
    pub fn run(&mut self) -> SimResult {
        while let Some((time, event)) = self.events.pop() {
            if let Some(horizon) = self.cfg.horizon_min {
                if time > horizon {
                    self.now = horizon;
                    break;
                }
            }
            self.now = time;
            for callback in &mut self.callbacks {
                callback.visit_event(&event, time);
            }
            match event {
                SimEvent::Arrival { job } => {
                    trace!(job = job.id, time, "job released");
                    self.waiting.push_back(job);
                    self.telemetry.ts_queue.push((self.now, self.waiting.len()));
                    self.dispatch_waiting();
                }
                SimEvent::PickerFree { picker, job } => {
                    trace!(picker, job = job.id, time, "picker free");
                    self.pickers[picker].completed_orders += job.n_orders;
                    self.telemetry.orders_completed += job.n_orders;
                    self.telemetry
                        .ts_completed
                        .push((self.now, self.telemetry.orders_completed));
                    self.telemetry.ts_queue.push((self.now, self.waiting.len()));
                    self.dispatch_waiting();
                }
            }
        }
        self.finish()
    }

    /// Fuses the per-picker keyframe tracks into the renderable timeline.
    /// Meaningful once `run` has completed.
    pub fn trace(&self) -> Trace {
        Trace {
            meta: TraceMeta::from_grid(&self.grid),
            timeline: fuse_timeline(&self.tracks, self.effective_makespan()),
        }
    }

    fn effective_makespan(&self) -> f64 {
        let makespan = self
            .pickers
            .iter()
            .map(|p| p.busy_until)
            .fold(self.now, f64::max);
        match self.cfg.horizon_min {
            Some(horizon) => makespan.min(horizon),
            None => makespan,
        }
    }

    /// Free picker with the smallest `busy_until`, ties to the lowest id.
    fn free_picker(&self) -> Option<PickerId> {
        self.pickers
            .iter()
            .enumerate()
            .filter(|(_, p)| p.busy_until <= self.now)
            .min_by_key(|(id, p)| (OrderedFloat(p.busy_until), *id))
            .map(|(id, _)| id)
    }

    fn dispatch_waiting(&mut self) {
        while !self.waiting.is_empty() {
            let Some(picker) = self.free_picker() else {
                break;
            };
            let Some(job) = self.waiting.pop_front() else {
                break;
            };
            self.start_job(picker, job);
        }
    }

    fn congestion_multiplier(&self, concurrent: usize) -> f64 {
        match self.cfg.congestion {
            CongestionMode::Off => 1.0,
            CongestionMode::Light => {
                1.0 + LIGHT_CONGESTION_ALPHA * concurrent.saturating_sub(1) as f64
            }
        }
    }

    fn start_job(&mut self, picker: PickerId, job: Job) {
        let path = tour_path(self.grid.station(), &job.visits, true);
        self.telemetry.distance_total_m += self.grid.meters(path.len().saturating_sub(1));

        // The newly dispatched picker counts toward its own slowdown.
        let active = self
            .pickers
            .iter()
            .filter(|p| p.busy_until > self.now)
            .count();
        let duration = job.service_min * self.congestion_multiplier(active + 1);

        self.telemetry.gantt[picker].push(GanttSegment {
            start_min: self.now,
            end_min: self.now + duration,
            job_id: job.id,
        });
        for order in &job.orders {
            self.telemetry
                .waits
                .push((self.now - order.arrival_min).max(0.0));
        }
        if self.policy.is_batching() {
            self.telemetry.batch_sizes.push(job.n_orders);
            self.telemetry.batch_release.push(job.release_min);
            self.telemetry
                .batch_fill
                .push((job.release_min - job.first_arrival_min()).max(0.0));
        }

        self.animate_job(picker, job.id, &path, self.now, duration);

        let state = &mut self.pickers[picker];
        state.busy_until = self.now + duration;
        state.busy_time += duration;
        self.telemetry.picker_tours[picker] += 1;

        trace!(
            picker,
            job = job.id,
            start = self.now,
            duration,
            "job dispatched"
        );
        for callback in &mut self.callbacks {
            callback.visit_dispatch(picker, &job, self.now, duration);
        }
        self.events
            .push(self.now + duration, SimEvent::PickerFree { picker, job });
    }

    /// Emits the keyframes for one job: dispatch, animation ticks at
    /// `round_dt`, cell boundaries, and the terminal idle frame at
    /// `start + duration`.
    fn animate_job(
        &mut self,
        picker: PickerId,
        job_id: JobId,
        path: &[Cell],
        start: f64,
        duration: f64,
    ) {
        let track = &mut self.tracks[picker];
        let Some(&origin) = path.first() else {
            return;
        };
        if path.len() < 2 {
            track.push(Keyframe {
                time: start,
                cell: origin,
                state: MotionState::Moving,
                job_id: Some(job_id),
            });
            track.push(Keyframe {
                time: start + duration,
                cell: origin,
                state: MotionState::Idle,
                job_id: None,
            });
            return;
        }

        let segments = path.len() - 1;
        let per_cell = duration / segments as f64;
        let dt = self.cfg.round_dt.max(MIN_ANIMATION_DT);

        track.push(Keyframe {
            time: start,
            cell: origin,
            state: MotionState::Moving,
            job_id: Some(job_id),
        });
        let mut t = start;
        for i in 0..segments {
            let seg_end = if i + 1 == segments {
                start + duration
            } else {
                start + (i as f64 + 1.0) * per_cell
            };
            // In-transit ticks hold the departure cell of the segment.
            while t + dt < seg_end - 1e-9 {
                t += dt;
                track.push(Keyframe {
                    time: t,
                    cell: path[i],
                    state: MotionState::Moving,
                    job_id: Some(job_id),
                });
            }
            t = seg_end;
            if i + 1 == segments {
                track.push(Keyframe {
                    time: t,
                    cell: path[i + 1],
                    state: MotionState::Idle,
                    job_id: None,
                });
            } else {
                track.push(Keyframe {
                    time: t,
                    cell: path[i + 1],
                    state: MotionState::Moving,
                    job_id: Some(job_id),
                });
            }
        }
    }

    fn finish(&self) -> SimResult {
        let makespan = self.effective_makespan();
        let completed = self.telemetry.orders_completed;

        let throughput_per_hour = if makespan > 0.0 {
            completed as f64 * 60.0 / makespan
        } else {
            0.0
        };

        let mut sorted_waits = self.telemetry.waits.clone();
        sorted_waits.sort_by(f64::total_cmp);

        let clipped_busy: Vec<f64> = self
            .telemetry
            .gantt
            .iter()
            .map(|segments| {
                segments
                    .iter()
                    .map(|s| (s.end_min.min(makespan) - s.start_min.min(makespan)).max(0.0))
                    .sum()
            })
            .collect();
        let picker_utilization: Vec<f64> = clipped_busy
            .iter()
            .map(|&b| if makespan > 0.0 { b / makespan } else { 0.0 })
            .collect();
        let picker_idle_min: Vec<f64> = clipped_busy
            .iter()
            .map(|&b| (makespan - b).max(0.0))
            .collect();

        let batches_count = self.telemetry.batch_sizes.len();
        let batch_pct_ge2 = if batches_count > 0 {
            100.0 * self.telemetry.batch_sizes.iter().filter(|&&s| s >= 2).count() as f64
                / batches_count as f64
        } else {
            0.0
        };
        let batch_avg_size = if batches_count > 0 {
            self.telemetry.batch_sizes.iter().sum::<usize>() as f64 / batches_count as f64
        } else {
            0.0
        };

        SimResult {
            makespan_min: makespan,
            orders_completed: completed,
            throughput_per_hour,
            avg_wait_min: mean(&self.telemetry.waits),
            wait_p90_min: percentile(&sorted_waits, 90.0),
            wait_p95_min: percentile(&sorted_waits, 95.0),
            picker_utilization,
            picker_idle_min,
            picker_tours: self.telemetry.picker_tours.clone(),
            distance_total_m: self.telemetry.distance_total_m,
            distance_per_order_avg_m: if completed > 0 {
                self.telemetry.distance_total_m / completed as f64
            } else {
                0.0
            },
            batches_count,
            batch_avg_size,
            batch_pct_ge2,
            batch_avg_release_min: mean(&self.telemetry.batch_release),
            batch_avg_fill_min: mean(&self.telemetry.batch_fill),
            ts_queue: self.telemetry.ts_queue.clone(),
            ts_completed: self.telemetry.ts_completed.clone(),
            gantt: self.telemetry.gantt.clone(),
            waits_raw: self.telemetry.waits.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_linearly() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&xs, 50.0), 2.0);
        assert!((percentile(&xs, 90.0) - 3.6).abs() < 1e-12);
        assert_eq!(percentile(&xs, 100.0), 4.0);
        assert_eq!(percentile(&[], 90.0), 0.0);
        assert_eq!(percentile(&[7.0], 95.0), 7.0);
    }

    #[test]
    fn congestion_multiplier_counts_extra_pickers() {
        let grid = Grid::default_layout();
        let placement = SkuPlacement::default();
        let mut cfg = SimConfig::fcfs(2, 60.0);
        cfg.congestion = CongestionMode::Light;
        let sim = Simulator::new(grid, &placement, vec![], cfg).unwrap();
        assert_eq!(sim.congestion_multiplier(1), 1.0);
        assert!((sim.congestion_multiplier(2) - 1.15).abs() < 1e-12);
        assert!((sim.congestion_multiplier(3) - 1.30).abs() < 1e-12);
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        let mut cfg = SimConfig::fcfs(0, 60.0);
        assert!(cfg.validate().is_err());
        cfg.n_pickers = 1;
        cfg.speed_m_per_min = 0.0;
        assert!(cfg.validate().is_err());
        cfg.speed_m_per_min = 60.0;
        cfg.round_dt = 0.0;
        assert!(cfg.validate().is_err());
        cfg.round_dt = 0.25;
        cfg.policy = PolicyKind::SizeBatch;
        cfg.batch_size = 0;
        assert!(cfg.validate().is_err());
        cfg.policy = PolicyKind::TimeBatch;
        cfg.time_threshold_min = 0.0;
        assert!(cfg.validate().is_err());
        cfg.time_threshold_min = 2.0;
        cfg.horizon_min = Some(0.0);
        assert!(cfg.validate().is_err());
        cfg.horizon_min = Some(120.0);
        assert!(cfg.validate().is_ok());
    }
}
