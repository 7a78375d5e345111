//! Per-cue visibility over the normalized timeline.

use serde::Serialize;

/// Delay applied to every cue start so a subtitle never flashes on the
/// boundary frame before it.
pub const ACTIVATION_DELAY_SECS: f64 = 0.1;

/// Minimum normalized spacing between keyframes.
pub const KEYFRAME_EPSILON: f64 = 0.001;

/// One `(normalized time, opacity)` point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keyframe {
    pub time: f64,
    pub opacity: f32,
}

impl Keyframe {
    const fn new(time: f64, opacity: f32) -> Self {
        Self { time, opacity }
    }
}

/// Four discrete keyframes: hidden, shown at the (delayed) start, hidden at
/// the end, hidden at 1.0. Evaluated as a step function: the value at `t` is
/// the opacity of the last keyframe whose time is `<= t`.
///
/// Keyframe times are strictly increasing. The start is at least
/// [`KEYFRAME_EPSILON`] and the end at most `1 - KEYFRAME_EPSILON`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisibilitySchedule {
    keyframes: [Keyframe; 4],
}

impl VisibilitySchedule {
    /// Schedule for a cue on a video of `duration` seconds.
    ///
    /// When the delayed start does not come before the end, after clamping to
    /// the timeline, the cue is never shown: all four keyframes have opacity 0
    /// and sit `KEYFRAME_EPSILON` apart around the end.
    pub fn for_cue(start_time: f64, end_time: f64, duration: f64) -> Self {
        if !(duration.is_finite() && duration > 0.0) {
            return Self::hidden(0.0);
        }

        let normalize = |t: f64| {
            let n = t / duration;
            if n.is_nan() {
                0.0
            } else {
                n.clamp(0.0, 1.0)
            }
        };
        let start = normalize(start_time + ACTIVATION_DELAY_SECS).max(KEYFRAME_EPSILON);
        let end = normalize(end_time).min(1.0 - KEYFRAME_EPSILON);

        if start >= end {
            return Self::hidden(end);
        }

        Self {
            keyframes: [
                Keyframe::new(0.0, 0.0),
                Keyframe::new(start, 1.0),
                Keyframe::new(end, 0.0),
                Keyframe::new(1.0, 0.0),
            ],
        }
    }

    fn hidden(at: f64) -> Self {
        let at = at.clamp(KEYFRAME_EPSILON, 1.0 - 2.0 * KEYFRAME_EPSILON);
        Self {
            keyframes: [
                Keyframe::new(0.0, 0.0),
                Keyframe::new(at, 0.0),
                Keyframe::new(at + KEYFRAME_EPSILON, 0.0),
                Keyframe::new(1.0, 0.0),
            ],
        }
    }

    pub fn keyframes(&self) -> &[Keyframe; 4] {
        &self.keyframes
    }

    /// Opacity at normalized time `t`.
    pub fn opacity_at(&self, t: f64) -> f32 {
        self.keyframes
            .iter()
            .take_while(|k| k.time <= t)
            .last()
            .map(|k| k.opacity)
            .unwrap_or(0.0)
    }

    pub fn is_visible_at(&self, t: f64) -> bool {
        self.opacity_at(t) > 0.0
    }

    /// True when no keyframe ever shows the cue.
    pub fn is_never_visible(&self) -> bool {
        self.keyframes.iter().all(|k| k.opacity == 0.0)
    }
}
