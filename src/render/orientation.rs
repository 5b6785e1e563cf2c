use glam::{EulerRot, Quat};
use std::f32::consts::PI;

/// Tuning for the hover flip and the idle tilt.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OrientationSettings {
    /// Exponential approach rate, per second.
    pub speed: f32,
    /// Distance (radians) under which the yaw snaps onto its target.
    pub snap_epsilon: f32,
    pub breathing_rate: f32,
    pub breathing_amplitude: f32,
}

impl Default for OrientationSettings {
    fn default() -> Self {
        Self {
            speed: 3.0,
            snap_epsilon: 0.001,
            breathing_rate: 0.5,
            breathing_amplitude: 0.12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationState {
    pub base_facing: bool,
    pub hovered: bool,
    pub current_yaw: f32,
    pub breathing_pitch: f32,
}

pub fn base_facing_angle(base_facing: bool) -> f32 {
    if base_facing {
        0.0
    } else {
        PI
    }
}

#[derive(Debug, Clone)]
pub struct OrientationController {
    state: OrientationState,
    settings: OrientationSettings,
}

impl OrientationController {
    pub fn new(base_facing: bool, settings: OrientationSettings) -> Self {
        Self {
            state: OrientationState {
                base_facing,
                hovered: false,
                current_yaw: base_facing_angle(base_facing),
                breathing_pitch: 0.0,
            },
            settings,
        }
    }

    pub fn state(&self) -> OrientationState {
        self.state
    }

    pub fn pointer_enter(&mut self) {
        self.state.hovered = true;
    }

    pub fn pointer_leave(&mut self) {
        self.state.hovered = false;
    }

    /// Moves the rest orientation. The yaw is left alone so the next ticks
    /// animate towards the new target.
    pub fn set_base_facing(&mut self, base_facing: bool) {
        self.state.base_facing = base_facing;
    }

    pub fn target_yaw(&self) -> f32 {
        let base = base_facing_angle(self.state.base_facing);
        if self.state.hovered {
            base + PI
        } else {
            base
        }
    }

    #[cfg(test)]
    pub fn is_settled(&self) -> bool {
        self.state.current_yaw == self.target_yaw()
    }

    pub fn tick(&mut self, elapsed: f64, delta: f32) {
        let target = self.target_yaw();
        let mut yaw = self.state.current_yaw;
        if delta > 0.0 {
            let decay = (-self.settings.speed * delta).exp();
            yaw = target + (yaw - target) * decay;
        }
        if (yaw - target).abs() < self.settings.snap_epsilon {
            yaw = target;
        }
        self.state.current_yaw = yaw;
        self.state.breathing_pitch = breathing_pitch(elapsed, &self.settings);
    }

    /// Pitch (breathing, about X) applied after yaw (about Y).
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.state.current_yaw,
            self.state.breathing_pitch,
            0.0,
        )
    }
}

pub fn breathing_pitch(elapsed: f64, settings: &OrientationSettings) -> f32 {
    (elapsed * settings.breathing_rate as f64).sin() as f32 * settings.breathing_amplitude
}
