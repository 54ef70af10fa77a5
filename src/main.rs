use tracing::info;
use warepick::{
    callbacks::{dump_json, log_events::EventLogCallback},
    demand::{make_orders, Catalog, OrderSpec, PopularityMode},
    schedule::PolicyKind,
    simulation::simulator::{CongestionMode, SimConfig, Simulator},
    trace::pack_frames,
    Grid, SkuPlacement,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let grid = Grid::default_layout();
    let catalog = Catalog::new(120);
    let ids = catalog.ids();
    let placement = SkuPlacement::hotspot(&grid, &ids[..24], &ids[24..])?;
    let orders = make_orders(
        727,
        240.0,
        0.8,
        PopularityMode::Concentrated,
        120,
        OrderSpec::default(),
    )?;
    info!(orders = orders.len(), "demand sampled");

    for policy in [PolicyKind::Fcfs, PolicyKind::SizeBatch] {
        let cfg = SimConfig {
            policy,
            congestion: CongestionMode::Light,
            batch_size: 8,
            horizon_min: Some(240.0),
            ..SimConfig::fcfs(2, 60.0)
        };
        let mut sim = Simulator::new(grid.clone(), &placement, orders.clone(), cfg)?;
        sim.add_callback(Box::new(EventLogCallback));
        let res = sim.run();
        info!(
            %policy,
            completed = res.orders_completed,
            throughput = res.throughput_per_hour,
            avg_wait = res.avg_wait_min,
            "run finished"
        );

        let mut trace = sim.trace();
        trace.timeline = pack_frames(&trace.timeline, 0.25);
        let out = format!("logs/trace_{policy}.json");
        dump_json(&out, &trace)?;
        info!(frames = trace.timeline.len(), "trace written to {out}");
    }
    Ok(())
}
