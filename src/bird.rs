use crate::assets::{Assets, BIRD_FRAMES};
use crate::sprite::Mask;

pub const JUMP_VELOCITY: f64 = -10.5;
/// `0.5 * a` in `d = v*t + 0.5*a*t²`.
pub const HALF_GRAVITY: f64 = 1.5;
pub const TERMINAL_FALL: f64 = 16.0;
/// Extra lift applied whenever the bird is moving upward.
pub const JUMP_ADJUSTMENT: f64 = 2.0;
pub const MAX_ROTATION: f64 = 25.0;
pub const MAX_DIVE: f64 = -90.0;
pub const ROTATION_VELOCITY: f64 = 20.0;
/// Ticks each flap frame is held.
pub const ANIMATION_TIME: u32 = 5;

#[derive(Clone, Debug)]
pub struct Bird {
    pub x: f64,
    pub y: f64,
    pub vel: f64,
    pub tick_count: u32,
    /// `y` at the last jump; the bird keeps its nose up until it falls 50px below.
    pub height: f64,
    pub tilt: f64,
    anim_count: u32,
    frame: usize,
}

impl Bird {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, vel: 0.0, tick_count: 0, height: y, tilt: 0.0, anim_count: 0, frame: 0 }
    }

    pub fn jump(&mut self) {
        self.vel = JUMP_VELOCITY;
        self.tick_count = 0;
        self.height = self.y;
    }

    /// Integrates one tick and returns the displacement that was applied.
    pub fn advance(&mut self) -> f64 {
        self.tick_count += 1;
        let t = self.tick_count as f64;

        let mut d = self.vel * t + HALF_GRAVITY * t * t;
        if d >= TERMINAL_FALL {
            d = TERMINAL_FALL;
        }
        if d < 0.0 {
            d -= JUMP_ADJUSTMENT;
        }
        self.y += d;

        if d < 0.0 || self.y < self.height + 50.0 {
            if self.tilt < MAX_ROTATION {
                self.tilt = MAX_ROTATION;
            }
        } else {
            self.tilt = (self.tilt - ROTATION_VELOCITY).max(MAX_DIVE);
        }
        d
    }

    /// Steps the wing-flap animation: frames 0, 1, 2, 1, then the counter
    /// wraps one tick after the cycle ends, so a full flap lasts 21 ticks.
    pub fn animate(&mut self) {
        const T: u32 = ANIMATION_TIME;
        self.anim_count += 1;
        match self.anim_count {
            c if c < T => self.frame = 0,
            c if c < T * 2 => self.frame = 1,
            c if c < T * 3 => self.frame = 2,
            c if c < T * 4 => self.frame = 1,
            c if c == T * 4 + 1 => {
                self.frame = 1;
                self.anim_count = 0;
            }
            _ => {}
        }
        // no flapping in a nose dive
        if self.tilt <= -80.0 {
            self.frame = 1;
            self.anim_count = T * 2;
        }
    }

    pub fn frame(&self) -> usize {
        self.frame.min(BIRD_FRAMES - 1)
    }

    pub fn mask<'a>(&self, assets: &'a Assets) -> &'a Mask {
        &assets.bird_masks[self.frame()]
    }
}
