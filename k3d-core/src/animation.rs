/// Timed-action animation scheduler
use std::collections::VecDeque;

use crate::transform::Vec3;

/// One kind of motion an animation step can perform.
///
/// In a pattern the payload is the total amount over the step's duration;
/// per frame it is the increment to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    MoveForward(f64),
    MoveUp(f64),
    MoveLeft(f64),
    RotateYaw(f64),
    RotatePitch(f64),
    RotateRoll(f64),
    /// Per-axis factor reached at the end of the step
    Scale(Vec3),
    /// Face a world point every frame of the step
    Look(Vec3),
}

impl Action {
    /// The share of this action belonging to `fraction` of the step's duration
    fn portion(&self, fraction: f64) -> Action {
        match *self {
            Action::MoveForward(m) => Action::MoveForward(m * fraction),
            Action::MoveUp(m) => Action::MoveUp(m * fraction),
            Action::MoveLeft(m) => Action::MoveLeft(m * fraction),
            Action::RotateYaw(m) => Action::RotateYaw(m * fraction),
            Action::RotatePitch(m) => Action::RotatePitch(m * fraction),
            Action::RotateRoll(m) => Action::RotateRoll(m * fraction),
            Action::Scale(factor) => Action::Scale(factor.map(|f| f.powf(fraction))),
            Action::Look(target) => Action::Look(target),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub action: Action,
    pub duration_ms: f64,
}

/// An ordered list of steps, optionally looping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationPattern {
    pub steps: Vec<Step>,
    pub repeat: bool,
}

impl AnimationPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, action: Action, duration_ms: f64) -> Self {
        self.steps.push(Step {
            action,
            duration_ms,
        });
        self
    }

    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveStep {
    step: Step,
    remaining_ms: f64,
}

impl From<Step> for ActiveStep {
    fn from(step: Step) -> Self {
        Self {
            step,
            remaining_ms: step.duration_ms,
        }
    }
}

/// Working state of a pattern installed on an object
#[derive(Debug, Clone)]
pub struct Animation {
    pattern: AnimationPattern,
    queue: VecDeque<ActiveStep>,
}

impl Animation {
    pub fn new(pattern: AnimationPattern) -> Self {
        let queue = pattern.steps.iter().copied().map(ActiveStep::from).collect();
        Self { pattern, queue }
    }

    pub fn pattern(&self) -> &AnimationPattern {
        &self.pattern
    }

    /// True once a non-repeating pattern has run out of steps
    pub fn is_finished(&self) -> bool {
        self.queue.is_empty() && !self.pattern.repeat
    }

    /// Advance by one frame at `fps` and return the increment to apply.
    ///
    /// A step whose time has run out is dropped on the following frame
    /// without producing an action.
    pub fn advance(&mut self, fps: f64) -> Option<Action> {
        if self.queue.is_empty() && self.pattern.repeat {
            self.queue
                .extend(self.pattern.steps.iter().copied().map(ActiveStep::from));
        }

        let current = self.queue.front_mut()?;
        if current.remaining_ms <= 0.0 {
            self.queue.pop_front();
            return None;
        }

        let frame_ms = 1000.0 / fps;
        current.remaining_ms -= frame_ms;
        Some(current.step.action.portion(frame_ms / current.step.duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_is_spread_over_duration() {
        let pattern = AnimationPattern::new().then(Action::MoveForward(10.0), 1000.0);
        let mut animation = Animation::new(pattern);

        let mut total = 0.0;
        for _ in 0..50 {
            match animation.advance(50.0) {
                Some(Action::MoveForward(p)) => total += p,
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!((total - 10.0).abs() < 1e-9);

        assert_eq!(animation.advance(50.0), None);
        assert!(animation.is_finished());
        assert_eq!(animation.advance(50.0), None);
    }

    #[test]
    fn test_scale_compounds_to_factor() {
        let pattern = AnimationPattern::new().then(Action::Scale(Vec3::new(2.0, 1.0, 0.5)), 500.0);
        let mut animation = Animation::new(pattern);

        let mut factor = Vec3::new(1.0, 1.0, 1.0);
        while let Some(Action::Scale(f)) = animation.advance(100.0) {
            factor.component_mul_assign(&f);
        }
        assert!((factor - Vec3::new(2.0, 1.0, 0.5)).norm() < 1e-9);
    }

    #[test]
    fn test_steps_run_in_order() {
        let pattern = AnimationPattern::new()
            .then(Action::RotateYaw(1.0), 100.0)
            .then(Action::MoveUp(2.0), 100.0);
        let mut animation = Animation::new(pattern);

        assert!(matches!(animation.advance(10.0), Some(Action::RotateYaw(_))));
        assert_eq!(animation.advance(10.0), None);
        assert!(matches!(animation.advance(10.0), Some(Action::MoveUp(_))));
    }

    #[test]
    fn test_repeat_refills_queue() {
        let pattern = AnimationPattern::new()
            .then(Action::MoveLeft(1.0), 100.0)
            .repeating();
        let mut animation = Animation::new(pattern);

        assert!(animation.advance(10.0).is_some());
        assert_eq!(animation.advance(10.0), None);
        assert!(!animation.is_finished());
        assert_eq!(animation.advance(10.0), Some(Action::MoveLeft(1.0)));
    }

    #[test]
    fn test_pattern_is_copied() {
        let pattern = AnimationPattern::new().then(Action::RotateRoll(1.0), 100.0);
        let mut animation = Animation::new(pattern.clone());
        animation.advance(10.0);
        assert_eq!(animation.pattern(), &pattern);
    }

    #[test]
    fn test_zero_duration_step_is_skipped() {
        let pattern = AnimationPattern::new().then(Action::MoveUp(5.0), 0.0);
        let mut animation = Animation::new(pattern);
        assert_eq!(animation.advance(60.0), None);
        assert!(animation.is_finished());
    }
}
