use crate::error::AssetError;
use image::RgbaImage;
use std::collections::HashMap;

pub type Rgba = [u8; 4];

/// An RGBA bitmap, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Rgba>,
}

impl Sprite {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        Self { width, height, pixels: vec![fill; (width * height) as usize] }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgba) -> Self {
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self { width, height, pixels }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, c: Rgba) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = c;
        }
    }

    /// Nearest-neighbour 2x upscale.
    pub fn scale2x(&self) -> Sprite {
        Sprite::from_fn(self.width * 2, self.height * 2, |x, y| self.pixel(x / 2, y / 2))
    }

    /// Upside-down copy, used for the top half of a pipe pair.
    pub fn flip_vertical(&self) -> Sprite {
        Sprite::from_fn(self.width, self.height, |x, y| self.pixel(x, self.height - 1 - y))
    }

    pub fn mask(&self) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            bits: self.pixels.iter().map(|p| p[3] > 0).collect(),
        }
    }
}

impl From<RgbaImage> for Sprite {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self { width, height, pixels: img.pixels().map(|p| p.0).collect() }
    }
}

/// Opaque-pixel silhouette of a sprite.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        self.bits[(y as u32 * self.width + x as u32) as usize]
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// First pixel (in this mask's coordinates) set in both masks when
    /// `other`'s top-left corner sits at `offset` relative to ours.
    pub fn overlap(&self, other: &Mask, offset: (i32, i32)) -> Option<(i32, i32)> {
        let (ox, oy) = offset;
        let x0 = ox.max(0);
        let y0 = oy.max(0);
        let x1 = (ox + other.width as i32).min(self.width as i32);
        let y1 = (oy + other.height as i32).min(self.height as i32);
        for y in y0..y1 {
            for x in x0..x1 {
                if self.get(x, y) && other.get(x - ox, y - oy) {
                    return Some((x, y));
                }
            }
        }
        None
    }
}

/// Parses a text sprite sheet.
///
/// Palette lines `K #RRGGBB` or `K #RRGGBBAA` come first, then a `---`
/// separator, then one line per pixel row using the palette keys. Blank
/// lines and lines starting with `;` are ignored.
pub fn parse_sheet(name: &str, text: &str) -> Result<Sprite, AssetError> {
    let malformed = |line: usize, reason: String| AssetError::Malformed {
        name: name.to_string(),
        line,
        reason,
    };

    let mut palette: HashMap<char, Rgba> = HashMap::new();
    let mut rows: Vec<(usize, &str)> = Vec::new();
    let mut in_rows = false;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim_end();
        if line.trim().is_empty() || line.starts_with(';') {
            continue;
        }
        if !in_rows {
            if line.trim() == "---" {
                in_rows = true;
                continue;
            }
            let mut parts = line.split_whitespace();
            let key = parts.next().unwrap_or_default();
            let colour = parts
                .next()
                .ok_or_else(|| malformed(line_no, "palette entry needs a colour".into()))?;
            let mut chars = key.chars();
            let (Some(k), None) = (chars.next(), chars.next()) else {
                return Err(malformed(line_no, format!("palette key `{key}` must be one character")));
            };
            let rgba = parse_colour(colour).ok_or_else(|| malformed(line_no, format!("bad colour `{colour}`")))?;
            palette.insert(k, rgba);
        } else {
            rows.push((line_no, line));
        }
    }

    if !in_rows {
        return Err(malformed(text.lines().count().max(1), "missing `---` separator".into()));
    }
    let Some(&(_, first)) = rows.first() else {
        return Err(AssetError::Empty(name.to_string()));
    };
    let width = first.chars().count() as u32;
    let height = rows.len() as u32;
    let mut sprite = Sprite::new(width, height, [0, 0, 0, 0]);
    for (y, (line_no, row)) in rows.iter().enumerate() {
        if row.chars().count() as u32 != width {
            return Err(malformed(*line_no, format!("row width differs from first row ({width})")));
        }
        for (x, ch) in row.chars().enumerate() {
            let c = palette
                .get(&ch)
                .ok_or_else(|| malformed(*line_no, format!("unknown palette key `{ch}`")))?;
            sprite.set(x as u32, y as u32, *c);
        }
    }
    Ok(sprite)
}

fn parse_colour(s: &str) -> Option<Rgba> {
    let hex = s.strip_prefix('#')?;
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let a = if hex.len() == 8 { byte(6)? } else { 255 };
    Some([byte(0)?, byte(2)?, byte(4)?, a])
}
