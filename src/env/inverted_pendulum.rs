use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{GenerativeModel, Transition};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedPendulumState {
    pub angle: f64,
    pub angular_velocity: f64,
}

impl InvertedPendulumState {
    pub fn new(angle: f64, angular_velocity: f64) -> Self {
        Self {
            angle,
            angular_velocity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvertedPendulumAction {
    Left,
    Right,
    NoForce,
}

impl InvertedPendulumAction {
    pub const ALL: [InvertedPendulumAction; 3] = [
        InvertedPendulumAction::Left,
        InvertedPendulumAction::Right,
        InvertedPendulumAction::NoForce,
    ];

    fn force(&self) -> f64 {
        match self {
            InvertedPendulumAction::Left => -InvertedPendulum::ACTION_FORCE,
            InvertedPendulumAction::Right => InvertedPendulum::ACTION_FORCE,
            InvertedPendulumAction::NoForce => 0.0,
        }
    }
}

/// Pole balanced on a cart that can be pushed left or right. The episode
/// fails, with reward -1, once the pole leans `max_angle` or more; every
/// other step is worth 0.
#[derive(Debug, Clone)]
pub struct InvertedPendulum {
    action_noise: f64,
    max_angle: f64,
}

impl InvertedPendulum {
    pub const GRAVITY: f64 = 9.8;
    pub const CART_MASS: f64 = 8.0;
    pub const POLE_MASS: f64 = 2.0;
    pub const POLE_LENGTH: f64 = 0.5;
    pub const ACTION_FORCE: f64 = 50.0;
    pub const TIME_DELTA: f64 = 0.1;
    pub const MAX_ANGULAR_SPEED: f64 = 3.0 * PI;
    pub const ANGLE_RANGE: f64 = PI / 2.0;

    /// Noise free pendulum failing at `pi / 8`.
    pub fn new() -> Self {
        Self {
            action_noise: 0.0,
            max_angle: PI / 8.0,
        }
    }

    /// Adds a uniform force in `[-noise, noise]` to every push.
    pub fn with_action_noise(mut self, noise: f64) -> Self {
        self.action_noise = noise.abs();
        self
    }

    pub fn with_max_angle(mut self, max_angle: f64) -> Self {
        self.max_angle = max_angle;
        self
    }

    pub fn max_angle(&self) -> f64 {
        self.max_angle
    }

    pub fn failed(&self, s: &InvertedPendulumState) -> bool {
        s.angle.abs() >= self.max_angle
    }

    /// One Euler step of the pole dynamics under `force`.
    pub fn physics(s: &InvertedPendulumState, force: f64) -> InvertedPendulumState {
        let alpha = 1.0 / (Self::POLE_MASS + Self::CART_MASS);
        let (sin, cos) = s.angle.sin_cos();
        let numerator = Self::GRAVITY * sin
            - alpha
                * Self::POLE_MASS
                * Self::POLE_LENGTH
                * s.angular_velocity
                * s.angular_velocity
                * (2.0 * s.angle).sin()
                / 2.0
            - alpha * cos * force;
        let denominator = (4.0 / 3.0) * Self::POLE_LENGTH
            - alpha * Self::POLE_MASS * Self::POLE_LENGTH * cos * cos;
        let angular_acceleration = numerator / denominator;

        let angle = (s.angle + s.angular_velocity * Self::TIME_DELTA)
            .clamp(-Self::ANGLE_RANGE, Self::ANGLE_RANGE);
        let angular_velocity = (s.angular_velocity + angular_acceleration * Self::TIME_DELTA)
            .clamp(-Self::MAX_ANGULAR_SPEED, Self::MAX_ANGULAR_SPEED);
        InvertedPendulumState::new(angle, angular_velocity)
    }

    pub fn render(&self, s: &InvertedPendulumState) -> String {
        let columns = 41usize;
        let center = columns / 2;
        let offset = (s.angle / self.max_angle * center as f64).round() as i64;
        let pole = (center as i64 + offset).clamp(0, columns as i64 - 1) as usize;
        let line: String = (0..columns)
            .map(|i| {
                if i == pole {
                    'o'
                } else if i == 0 || i == columns - 1 {
                    '|'
                } else if i == center {
                    '.'
                } else {
                    ' '
                }
            })
            .collect();
        format!(
            "{}\nangle {:.4} angular velocity {:.4}",
            line, s.angle, s.angular_velocity
        )
    }
}

impl Default for InvertedPendulum {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerativeModel for InvertedPendulum {
    type State = InvertedPendulumState;
    type Action = InvertedPendulumAction;

    fn action_set(&self, _s: &InvertedPendulumState) -> Vec<InvertedPendulumAction> {
        InvertedPendulumAction::ALL.to_vec()
    }

    fn sample_outcome(
        &self,
        s: &InvertedPendulumState,
        a: &InvertedPendulumAction,
        rng: &mut StdRng,
    ) -> Result<Transition<InvertedPendulumState>> {
        let noise = if self.action_noise > 0.0 {
            rng.gen::<f64>() * 2.0 * self.action_noise - self.action_noise
        } else {
            0.0
        };
        let next = Self::physics(s, a.force() + noise);
        let failed = self.failed(&next);
        let reward = if failed { -1.0 } else { 0.0 };
        Ok(Transition::new(1.0, next, reward, failed))
    }

    fn terminal(&self, s: &InvertedPendulumState) -> bool {
        self.failed(s)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn upright_pole_without_force_stays_up() {
        let ip = InvertedPendulum::new();
        let mut rng = StdRng::seed_from_u64(0);
        let t = ip
            .sample_outcome(&InvertedPendulumState::default(), &InvertedPendulumAction::NoForce, &mut rng)
            .unwrap();
        assert_eq!(t.next_state, InvertedPendulumState::default());
        assert_eq!(t.reward, 0.0);
        assert!(!t.terminated);
    }

    #[test]
    fn pushes_turn_the_pole_the_other_way() {
        let up = InvertedPendulumState::default();
        let right = InvertedPendulum::physics(&up, InvertedPendulum::ACTION_FORCE);
        let left = InvertedPendulum::physics(&up, -InvertedPendulum::ACTION_FORCE);
        // the angle integrates the old velocity, so only the velocity moves
        assert_eq!(right.angle, 0.0);
        assert!(right.angular_velocity < 0.0);
        assert!((left.angular_velocity + right.angular_velocity).abs() < 1e-12);
    }

    #[test]
    fn leaning_past_the_limit_fails() {
        let ip = InvertedPendulum::new();
        let mut rng = StdRng::seed_from_u64(0);
        let s = InvertedPendulumState::new(0.35, 1.0);
        let t = ip
            .sample_outcome(&s, &InvertedPendulumAction::NoForce, &mut rng)
            .unwrap();
        assert!(t.next_state.angle >= ip.max_angle());
        assert_eq!(t.reward, -1.0);
        assert!(t.terminated);
        assert!(ip.terminal(&t.next_state));
    }

    #[test]
    fn action_noise_spreads_the_outcomes() {
        let ip = InvertedPendulum::new().with_action_noise(10.0);
        let mut rng = StdRng::seed_from_u64(4);
        let s = InvertedPendulumState::default();
        let a = ip.sample_outcome(&s, &InvertedPendulumAction::NoForce, &mut rng).unwrap();
        let b = ip.sample_outcome(&s, &InvertedPendulumAction::NoForce, &mut rng).unwrap();
        assert_ne!(a.next_state.angular_velocity, b.next_state.angular_velocity);
        let bound = InvertedPendulum::physics(&s, -10.0).angular_velocity.abs();
        assert!(a.next_state.angular_velocity.abs() <= bound + 1e-12);
    }
}
