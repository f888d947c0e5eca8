pub const BASE_VELOCITY: f64 = 5.0;

/// Scrolling ground: two copies of the strip leapfrog each other.
#[derive(Clone, Debug)]
pub struct Base {
    pub y: f64,
    pub x1: f64,
    pub x2: f64,
    width: f64,
}

impl Base {
    pub fn new(y: f64, width: u32) -> Self {
        let width = width as f64;
        Self { y, x1: 0.0, x2: width, width }
    }

    pub fn advance(&mut self) {
        self.x1 -= BASE_VELOCITY;
        self.x2 -= BASE_VELOCITY;

        if self.x1 + self.width < 0.0 {
            self.x1 = self.x2 + self.width;
        }
        if self.x2 + self.width < 0.0 {
            self.x2 = self.x1 + self.width;
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_stay_one_width_apart() {
        let mut base = Base::new(730.0, 672);
        for _ in 0..10_000 {
            base.advance();
            assert_eq!((base.x1 - base.x2).abs(), 672.0);
            assert!(base.x1.min(base.x2) + base.width() >= -BASE_VELOCITY);
        }
    }

    #[test]
    fn leading_segment_wraps_behind_the_other() {
        let mut base = Base::new(730.0, 20);
        for _ in 0..5 {
            base.advance();
        }
        // x1 left the screen after 5 steps of 5px and was moved after x2
        assert_eq!(base.x2, -5.0);
        assert_eq!(base.x1, 15.0);
    }
}
