use crate::sim::{Simulation, WINDOW_HEIGHT, WINDOW_WIDTH};
use crate::sprite::Sprite;

const WIDTH: i32 = WINDOW_WIDTH as i32;
const HEIGHT: i32 = WINDOW_HEIGHT as i32;

pub type Color = (u8, u8, u8, u8);

/// Numbers shown in the training panel.
pub struct Hud<'a> {
    pub generation: u32,
    pub alive: usize,
    pub population: usize,
    pub best_fitness: f64,
    pub ticks_per_frame: u32,
    pub paused: bool,
    pub history: &'a [f64],
}

// ============================
// Scene
// ============================

/// Draws one frame back to front: background, pipes, score, base, birds.
pub fn draw_scene(frame: &mut [u8], sim: &Simulation) {
    let assets = sim.assets();
    clear_rgba(frame, 78, 192, 202, 255);
    blit(frame, &assets.background, 0, 0);

    for pipe in sim.pipes() {
        blit(frame, &assets.pipe_top, pipe.x as i32, pipe.top as i32);
        blit(frame, &assets.pipe_bottom, pipe.x as i32, pipe.bottom as i32);
    }

    let score = format!("SCORE: {}", sim.score());
    let w = text_width(&score, 3);
    draw_text(frame, &score, WIDTH - 10 - w, 10, 3, (255, 255, 255, 255));

    let base = sim.base();
    blit(frame, &assets.base, base.x1 as i32, base.y as i32);
    blit(frame, &assets.base, base.x2 as i32, base.y as i32);

    for agent in sim.agents() {
        let bird = &agent.bird;
        blit_rotated(frame, &assets.bird_frames[bird.frame()], bird.x as i32, bird.y as i32, bird.tilt);
    }
}

pub fn draw_hud(frame: &mut [u8], hud: &Hud) {
    let (px, py, pw, ph) = (8, 8, 230, 178);
    fill_rect_rgba(frame, px, py, pw, ph, 0, 0, 0, 140);
    stroke_rect_rgba(frame, px, py, pw, ph, 255, 255, 255, 60);
    let col = (220, 200, 240, 255);
    draw_text(frame, &format!("GEN: {}", hud.generation), px + 10, py + 10, 2, col);
    draw_text(frame, &format!("ALIVE: {}/{}", hud.alive, hud.population), px + 10, py + 30, 2, col);
    draw_text(frame, &format!("BEST: {:.1}", hud.best_fitness), px + 10, py + 50, 2, col);
    let speed = if hud.paused { "PAUSED  P".to_string() } else { format!("SPEED: {}X  +/-", hud.ticks_per_frame) };
    draw_text(frame, &speed, px + 10, py + 70, 2, (200, 220, 255, 255));
    draw_chart(frame, px + 10, py + 94, pw - 20, 74, hud.history);
}

// ============================
// Sprites
// ============================

/// Alpha-blends `sprite` with its top-left corner at `(x, y)`, clipped to the frame.
pub fn blit(frame: &mut [u8], sprite: &Sprite, x: i32, y: i32) {
    let (w, h) = (sprite.width as i32, sprite.height as i32);
    let (x0, y0) = (x.max(0), y.max(0));
    let (x1, y1) = ((x + w).min(WIDTH), (y + h).min(HEIGHT));
    for py in y0..y1 {
        for px in x0..x1 {
            let [r, g, b, a] = sprite.pixel((px - x) as u32, (py - y) as u32);
            if a > 0 {
                blend_pixel(frame, px, py, r, g, b, a);
            }
        }
    }
}

/// Blits `sprite` rotated counter-clockwise by `degrees` about the center of
/// its unrotated box at `(x, y)`. Nearest-neighbour sampling.
pub fn blit_rotated(frame: &mut [u8], sprite: &Sprite, x: i32, y: i32, degrees: f64) {
    if degrees == 0.0 {
        return blit(frame, sprite, x, y);
    }
    let (w, h) = (sprite.width as f64, sprite.height as f64);
    let (cx, cy) = (x as f64 + w / 2.0, y as f64 + h / 2.0);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let r = (w * w + h * h).sqrt() / 2.0;
    let (y0, y1) = (((cy - r).floor() as i32).max(0), ((cy + r).ceil() as i32).min(HEIGHT));
    let (x0, x1) = (((cx - r).floor() as i32).max(0), ((cx + r).ceil() as i32).min(WIDTH));
    for py in y0..y1 {
        for px in x0..x1 {
            let u = px as f64 + 0.5 - cx;
            let v = py as f64 + 0.5 - cy;
            let s = u * cos - v * sin + w / 2.0;
            let t = u * sin + v * cos + h / 2.0;
            if s < 0.0 || t < 0.0 || s >= w || t >= h {
                continue;
            }
            let [r, g, b, a] = sprite.pixel(s as u32, t as u32);
            if a > 0 {
                blend_pixel(frame, px, py, r, g, b, a);
            }
        }
    }
}

// ============================
// Primitives and text
// ============================

pub fn clear_rgba(frame: &mut [u8], r: u8, g: u8, b: u8, a: u8) {
    for px in frame.chunks_exact_mut(4) { px[0]=r; px[1]=g; px[2]=b; px[3]=a; }
}

pub fn blend_pixel(frame: &mut [u8], x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
    if x<0 || y<0 || x>=WIDTH || y>=HEIGHT {return;} let idx=((y*WIDTH+x)*4) as usize; if idx+3>=frame.len(){return;}
    let ar=a as u16; let iar=(255-a) as u16;
    for (i, c) in [r, g, b].into_iter().enumerate() {
        frame[idx+i] = (((c as u16)*ar + (frame[idx+i] as u16)*iar)/255) as u8;
    }
    frame[idx+3] = 255;
}

pub fn fill_rect_rgba(frame: &mut [u8], x: i32, y: i32, w: i32, h: i32, r: u8, g: u8, b: u8, a: u8) {
    let x2=(x+w).min(WIDTH); let y2=(y+h).min(HEIGHT);
    for py in y.max(0)..y2 { for px in x.max(0)..x2 { blend_pixel(frame, px, py, r,g,b,a); } }
}

pub fn stroke_rect_rgba(frame: &mut [u8], x: i32, y: i32, w: i32, h: i32, r: u8, g: u8, b: u8, a: u8) {
    if w<=0||h<=0 {return;} let x2=x+w-1; let y2=y+h-1;
    for px in x..=x2 { blend_pixel(frame, px, y, r,g,b,a); blend_pixel(frame, px, y2, r,g,b,a);}
    for py in y+1..y2 { blend_pixel(frame, x, py, r,g,b,a); blend_pixel(frame, x2, py, r,g,b,a);}
}

fn glyph_5x7(ch: char) -> Option<[u8;7]> {
    let c=ch.to_ascii_uppercase();
    Some(match c {
        'A'=>[0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001],
        'B'=>[0b11110,0b10001,0b11110,0b10001,0b10001,0b10001,0b11110],
        'C'=>[0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110],
        'D'=>[0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100],
        'E'=>[0b11111,0b10000,0b11110,0b10000,0b10000,0b10000,0b11111],
        'G'=>[0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01110],
        'I'=>[0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b11111],
        'L'=>[0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111],
        'N'=>[0b10001,0b11001,0b10101,0b10011,0b10001,0b10001,0b10001],
        'O'=>[0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110],
        'P'=>[0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000],
        'R'=>[0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001],
        'S'=>[0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110],
        'T'=>[0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100],
        'U'=>[0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110],
        'V'=>[0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100],
        'X'=>[0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001],
        '0'=>[0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110],
        '1'=>[0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110],
        '2'=>[0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111],
        '3'=>[0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110],
        '4'=>[0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010],
        '5'=>[0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110],
        '6'=>[0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110],
        '7'=>[0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000],
        '8'=>[0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110],
        '9'=>[0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100],
        ':'=>[0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000],
        '.'=>[0b00000,0b00000,0b00000,0b00000,0b00000,0b01100,0b01100],
        '/'=>[0b00001,0b00001,0b00010,0b00100,0b01000,0b10000,0b10000],
        '+'=>[0b00000,0b00100,0b00100,0b11111,0b00100,0b00100,0b00000],
        '-'=>[0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000],
        ' '=>[0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000],
        _ => return None,
    })
}

fn draw_char(frame: &mut [u8], ch: char, x: i32, y: i32, scale: i32, col: Color) -> i32 {
    if let Some(rows)=glyph_5x7(ch){
        for (ry,row) in rows.iter().enumerate(){
            for rx in 0..5 { if (row >> (4-rx)) & 1 == 1 {
                for sy in 0..scale { for sx in 0..scale {
                    blend_pixel(frame, x + rx*scale + sx, y + ry as i32*scale + sy, col.0,col.1,col.2,col.3);
                }}
            }}
        }
    }
    6*scale
}

pub fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * 6 * scale
}

pub fn draw_text(frame: &mut [u8], text: &str, x: i32, y: i32, scale: i32, col: Color) {
    let mut cx=x; for ch in text.chars(){ cx += draw_char(frame, ch, cx, y, scale, col); }
}

/// Bar chart of the most recent values that fit; negative values draw as empty bars.
pub fn draw_chart(frame: &mut [u8], x: i32, y: i32, w: i32, h: i32, data: &[f64]) {
    stroke_rect_rgba(frame, x, y, w, h, 200,200,200,120);
    let max_val = data.iter().copied().fold(0.0, f64::max);
    if data.is_empty() || max_val <= 0.0 { return; }
    let bars = data.len().min((w / 6).max(1) as usize);
    let bar_w = (w / bars as i32).max(2);
    for (i, &v) in data[data.len()-bars..].iter().enumerate() {
        let bh = (v.max(0.0) / max_val * (h - 2) as f64) as i32;
        let bx = x + 1 + i as i32 * bar_w;
        let by = y + h - 1 - bh;
        fill_rect_rgba(frame, bx, by, bar_w - 1, bh, 120, 180, 255, 160);
    }
}
