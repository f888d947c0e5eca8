//! Visual assets, built once at startup and shared read-only afterwards.
//!
//! The built-in sprites are drawn procedurally at the classic Flappy Bird
//! source resolution and then scaled 2x. Any of them can be replaced by a PNG
//! from an asset directory, or by a text sprite sheet
//! (see [`crate::sprite::parse_sheet`]).

use crate::error::AssetError;
use crate::sprite::{Mask, Rgba, Sprite, parse_sheet};
use std::path::Path;
use tracing::{debug, info, warn};

pub const BIRD_FRAMES: usize = 3;

#[derive(Debug)]
pub struct Assets {
    pub bird_frames: [Sprite; BIRD_FRAMES],
    pub bird_masks: [Mask; BIRD_FRAMES],
    pub pipe_bottom: Sprite,
    pub pipe_top: Sprite,
    pub pipe_bottom_mask: Mask,
    pub pipe_top_mask: Mask,
    pub base: Sprite,
    pub background: Sprite,
}

impl Assets {
    pub fn builtin() -> Self {
        Self::from_sources([bird(0), bird(1), bird(2)], pipe(), base(), background())
    }

    /// Loads the built-in set, replacing each sprite found in `dir`.
    ///
    /// For every name (`bird1`..`bird3`, `pipe`, `base`, `bg`) a `<name>.png`
    /// wins over a `<name>.txt` sprite sheet; with neither the built-in is kept.
    pub fn load(dir: Option<&Path>) -> Result<Self, AssetError> {
        let Some(dir) = dir else {
            return Ok(Self::builtin());
        };
        if !dir.is_dir() {
            return Err(AssetError::MissingDir(dir.to_path_buf()));
        }
        let mut builtin = Vec::new();
        let mut load = |name: &'static str, fallback: fn() -> Sprite| -> Result<Sprite, AssetError> {
            match load_file(dir, name)? {
                Some(sprite) => Ok(sprite),
                None => {
                    builtin.push(name);
                    Ok(fallback())
                }
            }
        };
        let birds = [load("bird1", || bird(0))?, load("bird2", || bird(1))?, load("bird3", || bird(2))?];
        let (pipe, base, bg) = (load("pipe", pipe)?, load("base", base)?, load("bg", background)?);
        let assets = Self::from_sources(birds, pipe, base, bg);
        if builtin.len() == 6 {
            warn!(dir = %dir.display(), "no sprites found in asset directory, using built-ins");
        } else {
            info!(dir = %dir.display(), builtin = ?builtin, "assets loaded");
        }
        Ok(assets)
    }

    fn from_sources(birds: [Sprite; BIRD_FRAMES], pipe: Sprite, base: Sprite, background: Sprite) -> Self {
        let bird_frames = birds.map(|s| s.scale2x());
        let bird_masks = [bird_frames[0].mask(), bird_frames[1].mask(), bird_frames[2].mask()];
        let pipe_bottom = pipe.scale2x();
        let pipe_top = pipe_bottom.flip_vertical();
        Self {
            bird_masks,
            bird_frames,
            pipe_bottom_mask: pipe_bottom.mask(),
            pipe_top_mask: pipe_top.mask(),
            pipe_bottom,
            pipe_top,
            base: base.scale2x(),
            background: background.scale2x(),
        }
    }

    pub fn bird_width(&self) -> u32 {
        self.bird_frames[0].width
    }

    pub fn bird_height(&self) -> u32 {
        self.bird_frames[0].height
    }

    pub fn pipe_width(&self) -> u32 {
        self.pipe_top.width
    }

    pub fn pipe_height(&self) -> u32 {
        self.pipe_top.height
    }
}

fn load_file(dir: &Path, name: &str) -> Result<Option<Sprite>, AssetError> {
    let png = dir.join(format!("{name}.png"));
    let sprite = if png.exists() {
        let img = image::open(&png).map_err(|source| AssetError::Decode { path: png.clone(), source })?;
        Sprite::from(img.to_rgba8())
    } else {
        let sheet = dir.join(format!("{name}.txt"));
        if !sheet.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&sheet).map_err(|source| AssetError::Io { path: sheet, source })?;
        parse_sheet(name, &text)?
    };
    if sprite.width == 0 || sprite.height == 0 {
        return Err(AssetError::Empty(name.to_string()));
    }
    debug!(sprite = name, width = sprite.width, height = sprite.height, "loaded sprite");
    Ok(Some(sprite))
}

// ============================
// Built-in sprites
// ============================

const CLEAR: Rgba = [0, 0, 0, 0];
const OUTLINE: Rgba = [83, 56, 71, 255];

fn in_ellipse(x: u32, y: u32, cx: f32, cy: f32, rx: f32, ry: f32) -> bool {
    let dx = (x as f32 + 0.5 - cx) / rx;
    let dy = (y as f32 + 0.5 - cy) / ry;
    dx * dx + dy * dy <= 1.0
}

/// 34x24 bird; `frame` moves the wing up, level, or down.
fn bird(frame: usize) -> Sprite {
    let wing_dy = [-3.0, 0.0, 3.0][frame.min(BIRD_FRAMES - 1)];
    Sprite::from_fn(34, 24, |x, y| {
        if x >= 25 && x < 33 && (11..17).contains(&y) {
            return if y == 14 { [190, 60, 30, 255] } else { [250, 120, 50, 255] };
        }
        if in_ellipse(x, y, 23.0, 7.0, 4.5, 4.5) {
            let pupil = in_ellipse(x, y, 25.0, 7.0, 1.6, 2.2);
            return if pupil { OUTLINE } else { [255, 255, 255, 255] };
        }
        if in_ellipse(x, y, 10.0, 12.0 + wing_dy, 6.5, 3.5) {
            return [252, 250, 230, 255];
        }
        if in_ellipse(x, y, 16.0, 12.0, 14.0, 10.5) {
            return if in_ellipse(x, y, 16.0, 12.0, 12.5, 9.0) { [248, 200, 40, 255] } else { OUTLINE };
        }
        CLEAR
    })
}

/// 52x320 pipe with its lip at the top.
fn pipe() -> Sprite {
    const LIP: u32 = 24;
    Sprite::from_fn(52, 320, |x, y| {
        let (left, right) = if y < LIP { (0, 51) } else { (2, 49) };
        if x < left || x > right {
            return CLEAR;
        }
        if x == left || x == right || y == 0 || y == LIP - 1 {
            return OUTLINE;
        }
        match x * 100 / 52 {
            0..=15 => [150, 230, 80, 255],
            16..=60 => [116, 191, 46, 255],
            _ => [85, 128, 34, 255],
        }
    })
}

/// 336x112 ground strip: grass band over diagonally striped dirt.
fn base() -> Sprite {
    Sprite::from_fn(336, 112, |x, y| match y {
        0 => OUTLINE,
        1..=10 => {
            if (x + y) % 12 < 6 { [156, 230, 89, 255] } else { [115, 191, 46, 255] }
        }
        11..=13 => [84, 128, 34, 255],
        _ => [222, 216, 149, 255],
    })
}

/// 288x512 sky with a skyline near the bottom.
fn background() -> Sprite {
    Sprite::from_fn(288, 512, |x, y| {
        let skyline = 400 - ((x / 16) * 37 % 50);
        if y > skyline && y < 440 {
            return if (x % 16 == 5 || x % 16 == 10) && y % 8 == 4 {
                [240, 240, 190, 255]
            } else {
                [160, 210, 200, 255]
            };
        }
        if y >= 440 {
            return [90, 190, 80, 255];
        }
        let t = y as f32 / 512.0;
        [(78.0 + 40.0 * t) as u8, (192.0 + 20.0 * t) as u8, (202.0 + 10.0 * t) as u8, 255]
    })
}
