use crate::model::job::Job;
use crate::simulation::sim_event::{PickerId, SimEvent};

/// Observer seam on the scheduler loop. Callbacks see every processed event
/// and every dispatch decision; they cannot influence either.
pub trait SimulationCallback {
    fn visit_event(&mut self, _event: &SimEvent, _time: f64) {}

    fn visit_dispatch(&mut self, _picker: PickerId, _job: &Job, _start: f64, _duration_min: f64) {}
}
