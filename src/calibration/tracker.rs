//! Winner detection and hold confirmation
//!
//! Each sample is reduced to a [`Winner`]: nothing active, exactly one raw input
//! active, or several at once. The [`HoldTracker`] then requires the same unique
//! winner for a continuous hold before it confirms:
//!
//! ```text
//!   Unique(i) ──► candidate i ──(same i for hold)──► Confirmed(i)
//!                     │
//!                     └──(None | Contested | Unique(j))──► Reset ──► no candidate
//! ```

use std::fmt;
use std::time::Duration;

use crate::controller::device::RawSample;

/// A raw input index of a specific kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawInput {
    Button(usize),
    Axis(usize),
    Hat(usize),
}

impl fmt::Display for RawInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawInput::Button(i) => write!(f, "button {}", i),
            RawInput::Axis(i) => write!(f, "axis {}", i),
            RawInput::Hat(i) => write!(f, "hat {}", i),
        }
    }
}

/// Outcome of looking at a single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    None,
    Unique(RawInput),
    /// Number of inputs active at the same time
    Contested(usize),
}

impl Winner {
    fn from_active(mut active: impl Iterator<Item = RawInput>) -> Self {
        match (active.next(), active.next()) {
            (None, _) => Winner::None,
            (Some(input), None) => Winner::Unique(input),
            (Some(_), Some(_)) => Winner::Contested(2 + active.count()),
        }
    }
}

pub fn button_winner(sample: &RawSample) -> Winner {
    Winner::from_active(sample.pressed_buttons().map(RawInput::Button))
}

/// Axes deviating from their rest value by more than `threshold`
///
/// `baseline` is indexed by raw axis; missing entries rest at 0.0.
pub fn axis_winner(sample: &RawSample, baseline: &[f32], threshold: f32) -> Winner {
    Winner::from_active(
        sample
            .axes
            .iter()
            .enumerate()
            .filter(|(index, raw)| {
                let rest = baseline.get(*index).copied().unwrap_or(0.0);
                (*raw - rest).abs() > threshold
            })
            .map(|(index, _)| RawInput::Axis(index)),
    )
}

/// Trigger targets accept an axis or, failing that, a digital button
pub fn trigger_winner(sample: &RawSample, baseline: &[f32], threshold: f32) -> Winner {
    match axis_winner(sample, baseline, threshold) {
        Winner::None => button_winner(sample),
        decided => decided,
    }
}

/// First hat reporting "up"; hats are discrete so no hold applies
pub fn hat_up(sample: &RawSample) -> Option<RawInput> {
    sample
        .hats
        .iter()
        .position(|hat| hat.y == 1)
        .map(RawInput::Hat)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    Released,
    Switched(RawInput),
    Contested(usize),
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetReason::Released => write!(f, "released too early"),
            ResetReason::Switched(other) => write!(f, "{} took over", other),
            ResetReason::Contested(count) => write!(f, "{} inputs active at once", count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldStatus {
    Idle,
    Holding { input: RawInput, held: Duration },
    Reset { previous: RawInput, reason: ResetReason },
    Confirmed(RawInput),
}

#[derive(Debug, Clone)]
pub struct HoldTracker {
    hold: Duration,
    candidate: Option<(RawInput, Duration)>,
}

impl HoldTracker {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            candidate: None,
        }
    }

    pub fn candidate(&self) -> Option<RawInput> {
        self.candidate.map(|(input, _)| input)
    }

    /// Feeds one sample's winner observed at `now`
    pub fn observe(&mut self, winner: Winner, now: Duration) -> HoldStatus {
        let current = self.candidate.take();

        match (current, winner) {
            (None, Winner::None) | (None, Winner::Contested(_)) => HoldStatus::Idle,
            (None, Winner::Unique(input)) => self.hold_from(input, now, now),
            (Some((previous, since)), Winner::Unique(input)) if previous == input => {
                self.hold_from(input, since, now)
            }
            (Some((previous, _)), Winner::Unique(other)) => HoldStatus::Reset {
                previous,
                reason: ResetReason::Switched(other),
            },
            (Some((previous, _)), Winner::None) => HoldStatus::Reset {
                previous,
                reason: ResetReason::Released,
            },
            (Some((previous, _)), Winner::Contested(count)) => HoldStatus::Reset {
                previous,
                reason: ResetReason::Contested(count),
            },
        }
    }

    fn hold_from(&mut self, input: RawInput, since: Duration, now: Duration) -> HoldStatus {
        let held = now.saturating_sub(since);
        if held >= self.hold {
            return HoldStatus::Confirmed(input);
        }
        self.candidate = Some((input, since));
        HoldStatus::Holding { input, held }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::device::HatState;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn axes(values: &[f32]) -> RawSample {
        RawSample {
            axes: values.to_vec(),
            ..RawSample::default()
        }
    }

    fn buttons(pressed: &[usize]) -> RawSample {
        let mut buttons = vec![false; 12];
        for index in pressed {
            buttons[*index] = true;
        }
        RawSample {
            buttons,
            ..RawSample::default()
        }
    }

    #[test]
    fn single_press_is_unique() {
        assert_eq!(button_winner(&buttons(&[])), Winner::None);
        assert_eq!(
            button_winner(&buttons(&[4])),
            Winner::Unique(RawInput::Button(4))
        );
        assert_eq!(button_winner(&buttons(&[1, 4, 9])), Winner::Contested(3));
    }

    #[test]
    fn cross_talk_stays_below_threshold() {
        let sample = axes(&[0.95, 0.25, 0.0]);
        assert_eq!(
            axis_winner(&sample, &[0.0, 0.0, 0.0], 0.6),
            Winner::Unique(RawInput::Axis(0))
        );
    }

    #[test]
    fn deviation_is_measured_from_baseline() {
        // Trigger at rest near -1 reads as untouched
        let rest = axes(&[0.0, -0.98]);
        assert_eq!(axis_winner(&rest, &[0.0, -1.0], 0.6), Winner::None);

        let pressed = axes(&[0.0, 0.2]);
        assert_eq!(
            axis_winner(&pressed, &[0.0, -1.0], 0.6),
            Winner::Unique(RawInput::Axis(1))
        );
    }

    #[test]
    fn diagonal_press_is_contested() {
        let sample = axes(&[0.8, -0.7]);
        assert_eq!(axis_winner(&sample, &[], 0.6), Winner::Contested(2));
    }

    #[test]
    fn trigger_prefers_axis_over_button() {
        let mut sample = buttons(&[6]);
        sample.axes = vec![0.0, 0.0, 0.9];
        assert_eq!(
            trigger_winner(&sample, &[0.0, 0.0, 0.0], 0.6),
            Winner::Unique(RawInput::Axis(2))
        );

        sample.axes = vec![0.0, 0.0, 0.0];
        assert_eq!(
            trigger_winner(&sample, &[0.0, 0.0, 0.0], 0.6),
            Winner::Unique(RawInput::Button(6))
        );
    }

    #[test]
    fn hat_up_picks_first_up_hat() {
        let sample = RawSample {
            hats: vec![HatState::LEFT, HatState::new(1, 1), HatState::UP],
            ..RawSample::default()
        };
        assert_eq!(hat_up(&sample), Some(RawInput::Hat(1)));
        assert_eq!(hat_up(&RawSample::default()), None);
    }

    #[test]
    fn hold_confirms_after_duration() {
        let mut tracker = HoldTracker::new(ms(800));
        let winner = Winner::Unique(RawInput::Button(0));

        assert!(matches!(
            tracker.observe(winner, ms(0)),
            HoldStatus::Holding { held, .. } if held.is_zero()
        ));
        assert!(matches!(
            tracker.observe(winner, ms(500)),
            HoldStatus::Holding { held, .. } if held == ms(500)
        ));
        assert_eq!(
            tracker.observe(winner, ms(800)),
            HoldStatus::Confirmed(RawInput::Button(0))
        );
        assert_eq!(tracker.candidate(), None);
    }

    #[test]
    fn simultaneous_second_input_resets_candidate() {
        let mut tracker = HoldTracker::new(ms(800));
        tracker.observe(Winner::Unique(RawInput::Axis(0)), ms(0));
        tracker.observe(Winner::Unique(RawInput::Axis(0)), ms(700));

        assert_eq!(
            tracker.observe(Winner::Contested(2), ms(710)),
            HoldStatus::Reset {
                previous: RawInput::Axis(0),
                reason: ResetReason::Contested(2),
            }
        );
        assert_eq!(tracker.candidate(), None);

        // The hold timer starts over on re-acquisition
        tracker.observe(Winner::Unique(RawInput::Axis(0)), ms(720));
        assert!(matches!(
            tracker.observe(Winner::Unique(RawInput::Axis(0)), ms(1500)),
            HoldStatus::Holding { .. }
        ));
        assert_eq!(
            tracker.observe(Winner::Unique(RawInput::Axis(0)), ms(1520)),
            HoldStatus::Confirmed(RawInput::Axis(0))
        );
    }

    #[test]
    fn brief_contact_never_confirms() {
        let mut tracker = HoldTracker::new(ms(800));
        tracker.observe(Winner::Unique(RawInput::Button(3)), ms(0));
        assert_eq!(
            tracker.observe(Winner::None, ms(60)),
            HoldStatus::Reset {
                previous: RawInput::Button(3),
                reason: ResetReason::Released,
            }
        );
        assert_eq!(tracker.observe(Winner::None, ms(900)), HoldStatus::Idle);
    }

    #[test]
    fn switching_index_resets() {
        let mut tracker = HoldTracker::new(ms(800));
        tracker.observe(Winner::Unique(RawInput::Button(1)), ms(0));
        assert_eq!(
            tracker.observe(Winner::Unique(RawInput::Button(2)), ms(20)),
            HoldStatus::Reset {
                previous: RawInput::Button(1),
                reason: ResetReason::Switched(RawInput::Button(2)),
            }
        );
    }

    #[test]
    fn zero_hold_confirms_immediately() {
        let mut tracker = HoldTracker::new(Duration::ZERO);
        assert_eq!(
            tracker.observe(Winner::Unique(RawInput::Hat(0)), ms(5)),
            HoldStatus::Confirmed(RawInput::Hat(0))
        );
    }
}
