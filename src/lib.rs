//! Discrete-event simulator of order-picking operations in a rectangular
//! warehouse grid: routing, release policies, an event-driven scheduler over
//! a picker pool, and a keyframe-based animation trace.

pub mod callbacks;
pub mod config;
pub mod demand;
pub mod experiments;
pub mod model;
pub mod routing;
pub mod schedule;
pub mod simulation;
pub mod trace;

pub use model::grid::{Cell, Grid};
pub use model::order::Order;
pub use model::placement::{SkuId, SkuPlacement};
pub use schedule::{Policy, PolicyKind};
pub use simulation::simulator::{CongestionMode, SimConfig, SimResult, Simulator};
pub use trace::Trace;
