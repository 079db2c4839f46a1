//! Playback gate: decides when the delay-line read cursor may advance.
//!
//! The gate is a small hysteresis state machine driven only by the current
//! buffer fill, so the output context can query it every frame without
//! locking.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Gate states. `Warming` and `Paused` both produce silence; only `Playing`
/// advances the read cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Initial buffering before playback has ever started.
    Warming,
    /// Output is live.
    Playing,
    /// Fill dropped too low after playback started; rebuffering.
    Paused,
}

impl GateState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => GateState::Playing,
            2 => GateState::Paused,
            _ => GateState::Warming,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            GateState::Warming => 0,
            GateState::Playing => 1,
            GateState::Paused => 2,
        }
    }
}

/// Events worth reporting when the gate changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    Started,
    Paused,
    Resumed,
}

/// Hysteresis thresholds, all in frames:
///
/// - `start`: Warming → Playing once fill first reaches the initial delay.
/// - `pause`: Playing → Paused when fill drops below this.
/// - `resume`: Paused → Playing once fill recovers to this.
/// - `underrun`: while Playing, fill below this raises the underrun flag,
///   which suspends censorship before the gate ever has to pause.
///
/// State lives in an `AtomicU8` written only by the output context; stats
/// readers take lock-free snapshots.
pub struct PlaybackGate {
    state: AtomicU8,
    underrun: AtomicBool,
    start_frames: u64,
    pause_frames: u64,
    resume_frames: u64,
    underrun_frames: u64,
}

impl PlaybackGate {
    /// Build a gate for the given initial delay and margins (all seconds).
    pub fn new(
        initial_delay_secs: f32,
        pause_margin_secs: f32,
        underrun_margin_secs: f32,
        sample_rate: u32,
    ) -> Self {
        let frames = |secs: f32| (secs.max(0.0) * sample_rate as f32) as u64;
        Self {
            state: AtomicU8::new(GateState::Warming.as_u8()),
            underrun: AtomicBool::new(false),
            start_frames: frames(initial_delay_secs),
            pause_frames: frames(initial_delay_secs - pause_margin_secs),
            resume_frames: frames(initial_delay_secs),
            underrun_frames: frames(initial_delay_secs - underrun_margin_secs),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> GateState {
        GateState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the fill is low enough that censorship should be skipped.
    pub fn is_underrun(&self) -> bool {
        self.underrun.load(Ordering::Acquire)
    }

    /// Advance the state machine for one output frame given the current
    /// fill. Returns `true` when the read cursor may advance; `false` means
    /// the frame must be silence.
    ///
    /// Output context only (single writer).
    pub fn advance(&self, fill: u64) -> bool {
        let can_play = match self.state() {
            GateState::Warming => {
                if fill >= self.start_frames {
                    self.set(GateState::Playing)
                } else {
                    false
                }
            }
            GateState::Playing => {
                if fill < self.pause_frames {
                    self.set(GateState::Paused)
                } else {
                    true
                }
            }
            GateState::Paused => {
                if fill >= self.resume_frames {
                    self.set(GateState::Playing)
                } else {
                    false
                }
            }
        };

        self.update_underrun(fill);
        can_play
    }

    /// Like [`advance`](Self::advance) but also reports state changes so the
    /// engine can log them.
    pub fn advance_reporting(&self, fill: u64) -> (bool, Option<GateTransition>) {
        let before = self.state();
        let can_play = self.advance(fill);
        let after = self.state();
        let transition = match (before, after) {
            (GateState::Warming, GateState::Playing) => Some(GateTransition::Started),
            (GateState::Playing, GateState::Paused) => Some(GateTransition::Paused),
            (GateState::Paused, GateState::Playing) => Some(GateTransition::Resumed),
            _ => None,
        };
        (can_play, transition)
    }

    fn set(&self, state: GateState) -> bool {
        self.state.store(state.as_u8(), Ordering::Release);
        state == GateState::Playing
    }

    fn update_underrun(&self, fill: u64) {
        if fill >= self.resume_frames {
            self.underrun.store(false, Ordering::Release);
        } else if self.state() == GateState::Playing && fill < self.underrun_frames {
            self.underrun.store(true, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 10s initial delay, 2s pause margin, 1s underrun margin at 1kHz for
    // readable frame counts.
    fn gate() -> PlaybackGate {
        PlaybackGate::new(10.0, 2.0, 1.0, 1000)
    }

    #[test]
    fn warms_until_initial_delay() {
        let g = gate();
        assert_eq!(g.state(), GateState::Warming);
        assert!(!g.advance(0));
        assert!(!g.advance(9_999));
        assert_eq!(g.state(), GateState::Warming);
        assert!(g.advance(10_000));
        assert_eq!(g.state(), GateState::Playing);
    }

    #[test]
    fn pauses_below_margin_and_resumes_with_hysteresis() {
        let g = gate();
        assert!(g.advance(10_000));

        // Still playing anywhere above the pause threshold.
        assert!(g.advance(8_000));
        assert_eq!(g.state(), GateState::Playing);

        // Drops below: paused, and stays paused until full recovery.
        assert!(!g.advance(7_999));
        assert_eq!(g.state(), GateState::Paused);
        assert!(!g.advance(9_000));
        assert!(!g.advance(9_999));
        assert_eq!(g.state(), GateState::Paused);

        assert!(g.advance(10_000));
        assert_eq!(g.state(), GateState::Playing);
    }

    #[test]
    fn warming_does_not_pause_early() {
        // Hysteresis only applies after playback has started once.
        let g = gate();
        assert!(!g.advance(500));
        assert_eq!(g.state(), GateState::Warming);
    }

    #[test]
    fn underrun_flag_trips_while_still_playing() {
        let g = gate();
        assert!(g.advance(10_000));
        assert!(!g.is_underrun());

        // Between underrun (9000) and pause (8000) thresholds: playing but
        // flagged.
        assert!(g.advance(8_500));
        assert!(g.is_underrun());
        assert_eq!(g.state(), GateState::Playing);

        // Cleared only at the resume threshold.
        assert!(g.advance(9_500));
        assert!(g.is_underrun());
        assert!(g.advance(10_000));
        assert!(!g.is_underrun());
    }

    #[test]
    fn reports_transitions_once() {
        let g = gate();
        let (_, t) = g.advance_reporting(10_000);
        assert_eq!(t, Some(GateTransition::Started));
        let (_, t) = g.advance_reporting(10_000);
        assert_eq!(t, None);
        let (_, t) = g.advance_reporting(1_000);
        assert_eq!(t, Some(GateTransition::Paused));
        let (_, t) = g.advance_reporting(10_000);
        assert_eq!(t, Some(GateTransition::Resumed));
    }
}
