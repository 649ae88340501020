//! Fixed-timestep accumulator and display smoothing

use glam::Vec2;

use crate::consts::{MAX_SUBSTEPS, PILL_MAX_FRAME_MS, PILL_STEP_MS};
use crate::lerp;

/// Turns variable frame deltas into a whole number of fixed steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepper {
    step: f32,
    max_frame: f32,
    max_substeps: u32,
    accumulator: f32,
}

impl Default for FixedStepper {
    fn default() -> Self {
        Self::new(PILL_STEP_MS, PILL_MAX_FRAME_MS)
    }
}

impl FixedStepper {
    pub fn new(step: f32, max_frame: f32) -> Self {
        Self {
            step,
            max_frame,
            max_substeps: MAX_SUBSTEPS,
            accumulator: 0.0,
        }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Leftover time not yet consumed by a step
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Add a frame delta; returns how many fixed steps to run now
    pub fn advance(&mut self, frame_delta: f32) -> u32 {
        let delta = frame_delta.clamp(0.0, self.max_frame);
        self.accumulator += delta;

        let mut substeps = 0;
        while self.accumulator >= self.step && substeps < self.max_substeps {
            self.accumulator -= self.step;
            substeps += 1;
        }
        // Spiral guard: drop what the substep cap could not consume
        if substeps == self.max_substeps {
            self.accumulator = self.accumulator.min(self.step);
        }
        substeps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Display state that eases toward the simulated state each frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Smoothed {
    pub position: Vec2,
    pub angle: f32,
}

impl Smoothed {
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }

    pub fn approach(&mut self, position: Vec2, angle: f32, factor: f32) {
        self.position = self.position.lerp(position, factor);
        self.angle = lerp(self.angle, angle, factor);
    }
}
