use std::path::Path;
use std::time::Instant;

use anyhow::Context as _;
use humantime::format_duration;
use serde::Serialize;
use tracing::{info, warn};

use crate::demand::{make_orders, Catalog, OrderSpec, PopularityMode};
use crate::model::grid::Grid;
use crate::model::order::Order;
use crate::model::placement::SkuPlacement;
use crate::schedule::PolicyKind;
use crate::simulation::simulator::{CongestionMode, SimConfig, SimResult, Simulator};

/// One CSV row per simulated scenario. A failed scenario keeps its factor
/// columns and carries zeros with `failed = true`.
#[derive(Debug, Clone, Serialize)]
pub struct KpiRow {
    pub policy: String,
    pub n_pickers: usize,
    pub speed_m_per_min: f64,
    pub congestion: String,
    pub batch_size: usize,
    pub time_threshold_min: f64,
    pub sku_popularity: String,
    pub seed: u64,
    pub orders_total: usize,
    pub makespan_min: f64,
    pub throughput_per_hour: f64,
    pub avg_wait_min: f64,
    pub util_avg: f64,
    pub util_max: f64,
    pub failed: bool,
}

impl KpiRow {
    fn from_result(cfg: &SimConfig, popularity: PopularityMode, seed: u64, res: &SimResult) -> Self {
        let util_avg = if res.picker_utilization.is_empty() {
            0.0
        } else {
            res.picker_utilization.iter().sum::<f64>() / res.picker_utilization.len() as f64
        };
        let util_max = res
            .picker_utilization
            .iter()
            .copied()
            .fold(0.0, f64::max);
        Self {
            policy: cfg.policy.to_string(),
            n_pickers: cfg.n_pickers,
            speed_m_per_min: cfg.speed_m_per_min,
            congestion: cfg.congestion.to_string(),
            batch_size: cfg.batch_size,
            time_threshold_min: cfg.time_threshold_min,
            sku_popularity: popularity.to_string(),
            seed,
            orders_total: res.orders_completed,
            makespan_min: res.makespan_min,
            throughput_per_hour: res.throughput_per_hour,
            avg_wait_min: res.avg_wait_min,
            util_avg,
            util_max,
            failed: false,
        }
    }

    fn from_failure(cfg: &SimConfig, popularity: PopularityMode, seed: u64) -> Self {
        Self {
            policy: cfg.policy.to_string(),
            n_pickers: cfg.n_pickers,
            speed_m_per_min: cfg.speed_m_per_min,
            congestion: cfg.congestion.to_string(),
            batch_size: cfg.batch_size,
            time_threshold_min: cfg.time_threshold_min,
            sku_popularity: popularity.to_string(),
            seed,
            orders_total: 0,
            makespan_min: 0.0,
            throughput_per_hour: 0.0,
            avg_wait_min: 0.0,
            util_avg: 0.0,
            util_max: 0.0,
            failed: true,
        }
    }
}

/// Scenario domain for a sweep: the cartesian product of every factor list,
/// with batch parameters only expanded for the policies that use them.
#[derive(Debug, Clone)]
pub struct ExperimentGrid {
    pub policies: Vec<PolicyKind>,
    pub n_pickers: Vec<usize>,
    pub speeds: Vec<f64>,
    pub congestion_modes: Vec<CongestionMode>,
    pub batch_sizes: Vec<usize>,
    pub time_thresholds: Vec<f64>,
    pub popularity_modes: Vec<PopularityMode>,
    pub seeds: Vec<u64>,
    pub horizon_min: f64,
    pub lam_per_min: f64,
    pub n_skus: usize,
}

impl Default for ExperimentGrid {
    fn default() -> Self {
        Self {
            policies: vec![
                PolicyKind::Fcfs,
                PolicyKind::SizeBatch,
                PolicyKind::TimeBatch,
            ],
            n_pickers: vec![1, 2, 3],
            speeds: vec![60.0],
            congestion_modes: vec![CongestionMode::Off, CongestionMode::Light],
            batch_sizes: vec![5, 10, 15],
            time_thresholds: vec![1.0, 2.0, 5.0],
            popularity_modes: vec![PopularityMode::Uniform, PopularityMode::Concentrated],
            seeds: vec![7, 11, 23],
            horizon_min: 240.0,
            lam_per_min: 0.8,
            n_skus: 120,
        }
    }
}

impl ExperimentGrid {
    /// Scenario configs for one (seed, popularity) environment.
    fn configs(&self) -> Vec<SimConfig> {
        let mut configs = Vec::new();
        for &policy in &self.policies {
            for &n_pickers in &self.n_pickers {
                for &speed in &self.speeds {
                    for &congestion in &self.congestion_modes {
                        let base = SimConfig {
                            policy,
                            n_pickers,
                            speed_m_per_min: speed,
                            congestion,
                            horizon_min: Some(self.horizon_min),
                            ..SimConfig::fcfs(n_pickers, speed)
                        };
                        match policy {
                            PolicyKind::Fcfs => configs.push(base),
                            PolicyKind::SizeBatch => {
                                for &batch_size in &self.batch_sizes {
                                    configs.push(SimConfig { batch_size, ..base.clone() });
                                }
                            }
                            PolicyKind::TimeBatch => {
                                for &threshold in &self.time_thresholds {
                                    configs.push(SimConfig {
                                        time_threshold_min: threshold,
                                        ..base.clone()
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        configs
    }

    fn environment(
        &self,
        seed: u64,
        popularity: PopularityMode,
    ) -> anyhow::Result<(Grid, SkuPlacement, Vec<Order>)> {
        let grid = Grid::default_layout();
        let catalog = Catalog::new(self.n_skus);
        let ids = catalog.ids();
        let popular_count = (self.n_skus / 5).max(1);
        let placement =
            SkuPlacement::hotspot(&grid, &ids[..popular_count], &ids[popular_count..])?;
        let orders = make_orders(
            seed,
            self.horizon_min,
            self.lam_per_min,
            popularity,
            self.n_skus,
            OrderSpec::default(),
        )?;
        Ok((grid, placement, orders))
    }
}

/// Runs the full sweep, one CSV row per scenario. A scenario failure is
/// flagged and logged; the sweep continues.
pub fn run_grid(out_csv: &Path, grid_cfg: &ExperimentGrid) -> anyhow::Result<()> {
    if let Some(parent) = out_csv.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(out_csv)
        .with_context(|| format!("cannot open {}", out_csv.display()))?;

    let started = Instant::now();
    let mut rows = 0usize;
    for &seed in &grid_cfg.seeds {
        for &popularity in &grid_cfg.popularity_modes {
            let (grid, placement, orders) = grid_cfg.environment(seed, popularity)?;
            for cfg in grid_cfg.configs() {
                let scenario_started = Instant::now();
                let row = match Simulator::new(grid.clone(), &placement, orders.clone(), cfg.clone())
                {
                    Ok(mut sim) => {
                        let res = sim.run();
                        KpiRow::from_result(&cfg, popularity, seed, &res)
                    }
                    Err(err) => {
                        warn!(policy = %cfg.policy, seed, "scenario failed: {err:#}");
                        KpiRow::from_failure(&cfg, popularity, seed)
                    }
                };
                writer.serialize(&row)?;
                rows += 1;
                info!(
                    policy = %cfg.policy,
                    n_pickers = cfg.n_pickers,
                    seed,
                    elapsed = %format_duration(scenario_started.elapsed()),
                    "scenario done"
                );
            }
        }
    }
    writer.flush()?;
    info!(
        rows,
        elapsed = %format_duration(started.elapsed()),
        "sweep written to {}",
        out_csv.display()
    );
    Ok(())
}
