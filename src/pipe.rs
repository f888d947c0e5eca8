use crate::assets::Assets;
use crate::bird::Bird;
use rand::Rng;

pub const GAP: f64 = 150.0;
pub const PIPE_VELOCITY: f64 = 5.0;
/// Gap centers are drawn from `GAP_CENTER_MIN..GAP_CENTER_MAX`.
pub const GAP_CENTER_MIN: i32 = 50;
pub const GAP_CENTER_MAX: i32 = 450;

/// A top/bottom pipe pair sharing one x position.
#[derive(Clone, Debug)]
pub struct Pipe {
    pub x: f64,
    /// Gap center: the lower edge of the top pipe.
    pub height: f64,
    /// y of the top pipe sprite's upper edge.
    pub top: f64,
    /// y of the bottom pipe sprite's upper edge.
    pub bottom: f64,
    pub passed: bool,
}

impl Pipe {
    pub fn spawn<R: Rng>(x: f64, assets: &Assets, rng: &mut R) -> Self {
        let center = rng.gen_range(GAP_CENTER_MIN..GAP_CENTER_MAX) as f64;
        Self::with_gap(x, center, assets)
    }

    pub fn with_gap(x: f64, center: f64, assets: &Assets) -> Self {
        Self {
            x,
            height: center,
            top: center - assets.pipe_height() as f64,
            bottom: center + GAP,
            passed: false,
        }
    }

    pub fn advance(&mut self) {
        self.x -= PIPE_VELOCITY;
    }

    pub fn is_off_screen(&self, assets: &Assets) -> bool {
        self.x + (assets.pipe_width() as f64) < 0.0
    }

    /// Whether `bird` has flown past this pipe's leading edge.
    pub fn is_behind(&self, bird: &Bird) -> bool {
        self.x < bird.x
    }

    /// Marks the pipe passed the first time a bird gets ahead of it.
    /// Returns true only on that transition.
    pub fn mark_passed(&mut self, bird: &Bird) -> bool {
        if !self.passed && self.is_behind(bird) {
            self.passed = true;
            return true;
        }
        false
    }

    /// Box test first, then silhouette overlap against both halves.
    pub fn collides_with(&self, bird: &Bird, assets: &Assets) -> bool {
        let bird_mask = bird.mask(assets);
        let bx = bird.x as i32;
        let by = bird.y.round() as i32;
        let px = self.x as i32;

        let pipe_w = assets.pipe_width() as i32;
        if px >= bx + bird_mask.width as i32 || px + pipe_w <= bx {
            return false;
        }

        let top_y = self.top as i32;
        let bottom_y = self.bottom as i32;
        let bird_bottom = by + bird_mask.height as i32;
        let hits_top_box = by < top_y + assets.pipe_top_mask.height as i32;
        let hits_bottom_box = bird_bottom > bottom_y;

        let top_hit = hits_top_box
            && bird_mask
                .overlap(&assets.pipe_top_mask, (px - bx, top_y - by))
                .is_some();
        if top_hit {
            return true;
        }
        hits_bottom_box
            && bird_mask
                .overlap(&assets.pipe_bottom_mask, (px - bx, bottom_y - by))
                .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn gap_is_sampled_in_range_with_fixed_size() {
        let assets = Assets::builtin();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let p = Pipe::spawn(600.0, &assets, &mut rng);
            assert!(p.height >= 50.0 && p.height < 450.0);
            assert_eq!(p.top, p.height - 640.0);
            assert_eq!(p.bottom, p.height + GAP);
        }
    }

    #[test]
    fn passed_transitions_once() {
        let assets = Assets::builtin();
        let bird = Bird::new(230.0, 350.0);
        let mut p = Pipe::with_gap(240.0, 300.0, &assets);
        let mut transitions = 0;
        for _ in 0..10 {
            if p.mark_passed(&bird) {
                transitions += 1;
                assert!(p.x < bird.x);
            }
            p.advance();
        }
        assert_eq!(transitions, 1);
        assert!(p.passed);
    }

    #[test]
    fn bird_in_gap_does_not_collide() {
        let assets = Assets::builtin();
        let p = Pipe::with_gap(200.0, 300.0, &assets);
        let bird = Bird::new(230.0, 340.0);
        assert!(!p.collides_with(&bird, &assets));
    }

    #[test]
    fn bird_in_pipe_collides() {
        let assets = Assets::builtin();
        let p = Pipe::with_gap(200.0, 300.0, &assets);
        assert!(p.collides_with(&Bird::new(230.0, 250.0), &assets));
        assert!(p.collides_with(&Bird::new(230.0, 430.0), &assets));
    }

    #[test]
    fn distant_pipe_never_collides() {
        let assets = Assets::builtin();
        let p = Pipe::with_gap(600.0, 300.0, &assets);
        assert!(!p.collides_with(&Bird::new(230.0, 250.0), &assets));
    }

    #[test]
    fn off_screen_after_trailing_edge_passes() {
        let assets = Assets::builtin();
        let mut p = Pipe::with_gap(-100.0, 300.0, &assets);
        assert!(!p.is_off_screen(&assets));
        p.advance();
        assert!(p.is_off_screen(&assets));
    }
}
