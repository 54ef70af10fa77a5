use crate::model::job::Job;

pub type PickerId = usize;

/// Scheduler event payloads. The queue treats these opaquely; only the
/// dispatch switch inspects the tag.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// A job's release time has been reached; it joins the waiting queue.
    Arrival { job: Job },
    /// A picker finished its current job and may take the next one.
    PickerFree { picker: PickerId, job: Job },
}

impl SimEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::Arrival { .. } => "arrival",
            SimEvent::PickerFree { .. } => "picker_free",
        }
    }
}
