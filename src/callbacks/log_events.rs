use tracing::debug;

use crate::model::job::Job;
use crate::simulation::callback::SimulationCallback;
use crate::simulation::sim_event::{PickerId, SimEvent};

/// Logs every scheduler event and dispatch decision through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventLogCallback;

impl SimulationCallback for EventLogCallback {
    fn visit_event(&mut self, event: &SimEvent, time: f64) {
        debug!(kind = event.kind(), time, "event");
    }

    fn visit_dispatch(&mut self, picker: PickerId, job: &Job, start: f64, duration_min: f64) {
        debug!(
            picker,
            job = job.id,
            orders = job.n_orders,
            start,
            duration_min,
            "dispatch"
        );
    }
}
