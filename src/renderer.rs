use glam::Vec2;
use gridcaster::Engine;
use gridcaster::config::OverlaySettings;
use gridcaster::frame::Frame;
use gridcaster::world::TileMap;

use crate::textures::{COLOR_KEY, TexturePalette};

#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    // BGRA8 in little-endian memory
    (b as u32) | ((g as u32) << 8) | ((r as u32) << 16)
    // Alpha at 0
}

#[inline]
fn shade(color: u32, factor: f32) -> u32 {
    if factor >= 1.0 {
        return color;
    }
    let scale = |c: u32| ((c & 0xFF) as f32 * factor) as u32;
    scale(color) | (scale(color >> 8) << 8) | (scale(color >> 16) << 16)
}

/// A rectangular region of the frame buffer.
struct Canvas<'a> {
    buf: &'a mut [u32],
    stride: usize,
    x0: usize,
    width: usize,
    height: usize,
}

impl Canvas<'_> {
    #[inline]
    fn put(&mut self, x: i32, y: i32, color: u32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.buf[y as usize * self.stride + self.x0 + x as usize] = color;
    }

    fn fill(&mut self, color: u32) {
        for y in 0..self.height {
            let row = y * self.stride + self.x0;
            self.buf[row..row + self.width].fill(color);
        }
    }

    // Integer Bresenham; endpoints may lie off-canvas.
    fn line(&mut self, a: Vec2, b: Vec2, color: u32) {
        if !a.is_finite() || !b.is_finite() {
            return;
        }
        let (mut x0, mut y0) = (a.x as i32, a.y as i32);
        let (x1, y1) = (b.x as i32, b.y as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let limit = (self.width + self.height) * 4;
        for _ in 0..limit {
            self.put(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Small X marker.
    fn cross(&mut self, p: Vec2, color: u32) {
        if !p.is_finite() {
            return;
        }
        let o = Vec2::splat(3.0);
        self.line(p - o, p + o, color);
        self.line(p + Vec2::new(o.x, -o.y), p + Vec2::new(-o.x, o.y), color);
    }

    fn circle(&mut self, center: Vec2, radius: f32, color: u32) {
        let points = ((radius * std::f32::consts::PI).ceil() as usize).max(8);
        let step = std::f32::consts::TAU / points as f32;
        let mut prev = center + Vec2::new(radius, 0.0);
        for i in 1..=points {
            let next = center + Vec2::from_angle(step * i as f32) * radius;
            self.line(prev, next, color);
            prev = next;
        }
    }
}

/// Paints the top-down debug view into the left half of `buf` and the
/// first-person view into the right half.
pub fn render_frame(
    buf: &mut [u32],
    width: usize,
    height: usize,
    engine: &Engine,
    palette: &TexturePalette,
) {
    let half = width / 2;
    let frame = engine.frame();

    let mut map_view = Canvas {
        buf: &mut *buf,
        stride: width,
        x0: 0,
        width: half,
        height,
    };
    draw_map(&mut map_view, engine, frame, engine.mode().overlay());

    let mut view = Canvas {
        buf,
        stride: width,
        x0: half,
        width: width - half,
        height,
    };
    draw_view(&mut view, engine, frame, palette);
}

fn draw_view(canvas: &mut Canvas<'_>, engine: &Engine, frame: &Frame, palette: &TexturePalette) {
    let sky = pack_rgb(30, 30, 70);
    let ground = pack_rgb(40, 40, 40);
    let mid = canvas.height / 2;
    for y in 0..canvas.height {
        let row = y * canvas.stride + canvas.x0;
        let color = if y < mid { sky } else { ground };
        canvas.buf[row..row + canvas.width].fill(color);
    }

    let textured = engine.stages().textures;
    let h = canvas.height as i32;
    for seg in frame.segments.iter().filter(|s| !s.is_empty()) {
        let x = seg.column as i32;
        let y0 = seg.top.max(0);
        let y1 = seg.bottom.min(h);
        if textured {
            let tex = palette.wall(seg.material);
            let u = (seg.texture_u as i64).min(tex.width() as i64 - 1);
            for y in y0..y1 {
                // i64: near walls have heights close to i32::MAX.
                let v = (y as i64 - seg.top as i64) * tex.height() as i64 / seg.height as i64;
                canvas.put(x, y, shade(tex.sample(u, v), seg.shade));
            }
        } else {
            let color = shade(palette.flat(seg.material), seg.shade);
            for y in y0..y1 {
                canvas.put(x, y, color);
            }
        }
    }

    let sprites = engine.map().sprites();
    for projected in frame.sprites.iter() {
        let tex = palette.sprite(sprites[projected.sprite].texture);
        for stripe in &projected.stripes {
            let (dst, src) = (stripe.screen, stripe.source);
            for y in dst.y.max(0)..(dst.y + dst.h).min(h) {
                let v = (y - dst.y) as i64 * src.h as i64 / dst.h as i64;
                let texel = tex.sample(src.x as i64, src.y as i64 + v);
                if texel != COLOR_KEY {
                    canvas.put(dst.x, y, texel);
                }
            }
        }
    }
}

fn draw_map(canvas: &mut Canvas<'_>, engine: &Engine, frame: &Frame, overlay: OverlaySettings) {
    canvas.fill(pack_rgb(0, 0, 0));
    let map = engine.map();
    let unit = (canvas.width / map.width())
        .min(canvas.height / map.height())
        .max(1) as f32;
    let to_screen = |p: Vec2| p * unit;

    draw_grid(canvas, map, unit);

    let sprite_color = pack_rgb(240, 200, 60);
    for sprite in map.sprites() {
        canvas.circle(to_screen(sprite.position), unit * 0.2, sprite_color);
    }

    let pose = engine.pose();
    let red = pack_rgb(255, 0, 0);
    let green = pack_rgb(144, 238, 144);
    let blue = pack_rgb(173, 216, 230);
    let white = pack_rgb(255, 255, 255);

    for trace in frame.traces() {
        let origin = trace.origin;
        if overlay.precalc_steps {
            canvas.cross(to_screen(trace.first_x), red);
            canvas.line(
                to_screen(origin),
                to_screen(Vec2::new(trace.first_x.x, origin.y)),
                red,
            );
            canvas.line(
                to_screen(trace.first_x),
                to_screen(Vec2::new(trace.first_x.x, origin.y)),
                red,
            );
            canvas.cross(to_screen(trace.first_y), green);
            canvas.line(
                to_screen(origin),
                to_screen(Vec2::new(origin.x, trace.first_y.y)),
                green,
            );
            canvas.line(
                to_screen(trace.first_y),
                to_screen(Vec2::new(origin.x, trace.first_y.y)),
                green,
            );
        }
        for crossing in &trace.crossings {
            let color = if crossing.east_west { red } else { green };
            if overlay.crossings {
                canvas.cross(to_screen(crossing.point), color);
            }
            if overlay.equal_distance_steps {
                let foot = if crossing.east_west {
                    Vec2::new(origin.x, crossing.point.y)
                } else {
                    Vec2::new(crossing.point.x, origin.y)
                };
                canvas.line(to_screen(crossing.point), to_screen(foot), color);
            }
        }
        if overlay.grid_steps {
            for cell in &trace.cells {
                canvas.cross(to_screen(cell.as_vec2() + Vec2::splat(0.5)), white);
            }
        }
        canvas.line(to_screen(origin), to_screen(trace.end()), blue);
    }

    if overlay.camera_plane {
        let center = pose.position + pose.direction;
        canvas.line(
            to_screen(center - pose.plane),
            to_screen(center + pose.plane),
            blue,
        );
    }

    let contact_color = pack_rgb(255, 140, 0);
    for contact in &frame.contacts {
        let c = contact.cell.as_vec2() + Vec2::splat(0.5);
        canvas.cross(to_screen(c), contact_color);
    }

    canvas.circle(
        to_screen(pose.position),
        engine.resolver().radius() * unit,
        white,
    );
    canvas.cross(to_screen(pose.position), white);
}

fn draw_grid(canvas: &mut Canvas<'_>, map: &TileMap, unit: f32) {
    let gray = pack_rgb(128, 128, 128);
    let solid = pack_rgb(127, 255, 212); // aquamarine
    let w = map.width() as f32 * unit;
    let h = map.height() as f32 * unit;
    for x in 0..=map.width() {
        let sx = x as f32 * unit;
        canvas.line(Vec2::new(sx, 0.0), Vec2::new(sx, h), gray);
    }
    for y in 0..=map.height() {
        let sy = y as f32 * unit;
        canvas.line(Vec2::new(0.0, sy), Vec2::new(w, sy), gray);
    }
    for y in 0..map.height() as i32 {
        for x in 0..map.width() as i32 {
            if map.is_solid(x, y) {
                let c = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) * unit;
                canvas.cross(c, solid);
            }
        }
    }
}
