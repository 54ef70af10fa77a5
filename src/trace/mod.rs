use std::collections::BTreeSet;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::model::grid::{Cell, Grid};
use crate::model::job::JobId;

/// Picker motion state. The only transitions are
/// idle → moving (dispatch) and moving → idle (final cell reached).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionState {
    Idle,
    Moving,
}

/// Per-picker state sample: dispatches, cell boundaries, animation ticks,
/// and completions each emit one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keyframe {
    pub time: f64,
    pub cell: Cell,
    pub state: MotionState,
    pub job_id: Option<JobId>,
}

/// Keyframes of one picker, in non-decreasing time order.
#[derive(Debug, Clone, Default)]
pub struct KeyframeTrack {
    frames: Vec<Keyframe>,
}

impl KeyframeTrack {
    pub fn push(&mut self, frame: Keyframe) {
        debug_assert!(
            self.frames.last().map_or(true, |f| f.time <= frame.time),
            "keyframe times must be non-decreasing"
        );
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[Keyframe] {
        &self.frames
    }

    /// Last keyframe at or before `t`. Falls back to the first keyframe so a
    /// seeded track always samples.
    fn sample(&self, t: f64) -> Option<Keyframe> {
        let idx = self.frames.partition_point(|f| f.time <= t);
        if idx == 0 {
            self.frames.first().copied()
        } else {
            self.frames.get(idx - 1).copied()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickerSnapshot {
    pub picker_id: usize,
    pub x: i32,
    pub y: i32,
    pub state: MotionState,
    pub job_id: Option<JobId>,
}

/// Cross-picker snapshot at one timestamp; always carries every picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub t: f64,
    pub pickers: Vec<PickerSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceMeta {
    pub width: i32,
    pub height: i32,
    pub station: Cell,
    pub obstacles: Vec<[i32; 2]>,
}

/// Layout metadata plus the fused timeline, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub meta: TraceMeta,
    pub timeline: Vec<TraceFrame>,
}

impl TraceMeta {
    pub fn from_grid(grid: &Grid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            station: grid.station(),
            obstacles: grid.obstacles().iter().map(|c| [c.x, c.y]).collect(),
        }
    }
}

/// Merges per-picker keyframe tracks into one timeline: a frame at every
/// distinct keyframe timestamp (0.0 prepended, `end_time` appended when
/// missing), each picker contributing its last keyframe at or before the
/// frame time.
pub fn fuse_timeline(tracks: &[KeyframeTrack], end_time: f64) -> Vec<TraceFrame> {
    let mut times: BTreeSet<OrderedFloat<f64>> = tracks
        .iter()
        .flat_map(|track| track.frames().iter().map(|f| OrderedFloat(f.time)))
        .collect();
    times.insert(OrderedFloat(0.0));
    if times.last().map_or(true, |&t| t.0 < end_time) {
        times.insert(OrderedFloat(end_time));
    }

    times
        .into_iter()
        .map(|t| {
            let pickers = tracks
                .iter()
                .enumerate()
                .filter_map(|(picker_id, track)| {
                    let frame = track.sample(t.0)?;
                    Some(PickerSnapshot {
                        picker_id,
                        x: frame.cell.x,
                        y: frame.cell.y,
                        state: frame.state,
                        job_id: frame.job_id,
                    })
                })
                .collect();
            TraceFrame { t: t.0, pickers }
        })
        .collect()
}

fn round_to(t: f64, dt: f64) -> f64 {
    let quantized = (t / dt).round() * dt;
    // Snap away float dust so rounded instants collapse reliably.
    (quantized * 1e6).round() / 1e6
}

/// Downstream compaction: timestamps rounded to `round_dt`, the last frame
/// kept per rounded instant, and frames in which no picker moved dropped.
/// The first frame is always retained.
pub fn pack_frames(timeline: &[TraceFrame], round_dt: f64) -> Vec<TraceFrame> {
    debug_assert!(round_dt > 0.0);
    let mut by_time: Vec<TraceFrame> = Vec::new();
    for frame in timeline {
        let t = round_to(frame.t, round_dt);
        let rounded = TraceFrame {
            t,
            pickers: frame.pickers.clone(),
        };
        match by_time.last_mut() {
            Some(last) if last.t == t => *last = rounded,
            _ => by_time.push(rounded),
        }
    }

    let mut packed: Vec<TraceFrame> = Vec::new();
    for frame in by_time {
        let moved = packed.last().map_or(true, |prev| {
            prev.pickers.len() != frame.pickers.len()
                || prev
                    .pickers
                    .iter()
                    .zip(&frame.pickers)
                    .any(|(a, b)| (a.x, a.y) != (b.x, b.y))
        });
        if moved {
            packed.push(frame);
        }
    }
    packed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(time: f64, x: i32, y: i32, state: MotionState, job_id: Option<JobId>) -> Keyframe {
        Keyframe {
            time,
            cell: Cell::new(x, y),
            state,
            job_id,
        }
    }

    fn two_tracks() -> Vec<KeyframeTrack> {
        let mut a = KeyframeTrack::default();
        a.push(key(0.0, 0, 0, MotionState::Idle, None));
        a.push(key(1.0, 1, 0, MotionState::Moving, Some(0)));
        a.push(key(2.0, 2, 0, MotionState::Idle, None));
        let mut b = KeyframeTrack::default();
        b.push(key(0.0, 0, 0, MotionState::Idle, None));
        b.push(key(1.5, 0, 1, MotionState::Moving, Some(1)));
        vec![a, b]
    }

    #[test]
    fn fusion_samples_last_known_state() {
        let timeline = fuse_timeline(&two_tracks(), 2.0);
        let times: Vec<f64> = timeline.iter().map(|f| f.t).collect();
        assert_eq!(times, vec![0.0, 1.0, 1.5, 2.0]);
        for frame in &timeline {
            assert_eq!(frame.pickers.len(), 2);
        }
        // At t=1.5 picker 0 still shows its t=1.0 keyframe.
        let at_1_5 = &timeline[2];
        assert_eq!((at_1_5.pickers[0].x, at_1_5.pickers[0].y), (1, 0));
        assert_eq!((at_1_5.pickers[1].x, at_1_5.pickers[1].y), (0, 1));
    }

    #[test]
    fn fusion_appends_the_effective_end() {
        let timeline = fuse_timeline(&two_tracks(), 5.0);
        assert_eq!(timeline.last().map(|f| f.t), Some(5.0));
        let last = timeline.last().unwrap();
        assert_eq!((last.pickers[0].x, last.pickers[0].y), (2, 0));
    }

    #[test]
    fn fusion_is_idempotent_over_the_same_tracks() {
        let tracks = two_tracks();
        assert_eq!(fuse_timeline(&tracks, 2.0), fuse_timeline(&tracks, 2.0));
    }

    #[test]
    fn packing_collapses_rounded_instants_and_static_frames() {
        let snapshot = |x: i32| PickerSnapshot {
            picker_id: 0,
            x,
            y: 0,
            state: MotionState::Moving,
            job_id: Some(0),
        };
        let timeline = vec![
            TraceFrame {
                t: 0.0,
                pickers: vec![snapshot(0)],
            },
            TraceFrame {
                t: 0.24,
                pickers: vec![snapshot(0)],
            },
            TraceFrame {
                t: 0.26,
                pickers: vec![snapshot(1)],
            },
            TraceFrame {
                t: 0.74,
                pickers: vec![snapshot(1)],
            },
        ];
        let packed = pack_frames(&timeline, 0.25);
        // 0.24 and 0.26 both round to 0.25; the later wins. 0.74 rounds to
        // 0.75 but nothing moved, so it drops.
        assert_eq!(packed.len(), 2);
        assert_eq!(packed[0].t, 0.0);
        assert_eq!(packed[1].t, 0.25);
        assert_eq!(packed[1].pickers[0].x, 1);
    }
}
