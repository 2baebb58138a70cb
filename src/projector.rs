//! Wall hit distance → on-screen wall segment.

use crate::camera::camera_x;
use crate::config::EngineConfig;
use crate::raycaster::WallHit;

/// One column of wall as it should appear on screen. `top`/`bottom` are not
/// clipped to the viewport so texture V can be derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallSegment {
    pub column: usize,
    pub top: i32,
    pub bottom: i32,
    pub height: i32,
    pub material: i32,
    pub texture_u: f32,
    /// Brightness multiplier, `1.0` for unshaded faces.
    pub shade: f32,
}

impl WallSegment {
    pub fn empty(column: usize) -> Self {
        Self {
            column,
            top: 0,
            bottom: 0,
            height: 0,
            material: crate::world::EMPTY,
            texture_u: 0.0,
            shade: 1.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Projector {
    screen_height: f32,
    column_count: usize,
    half_fov: f32,
    wall_height_factor: f32,
    side_shade: f32,
    fish_eye_correction: bool,
}

impl Projector {
    pub fn new(config: &EngineConfig, column_count: usize, fish_eye_correction: bool) -> Self {
        Self {
            screen_height: config.view_height as f32,
            column_count,
            half_fov: 0.5 * config.fov(),
            wall_height_factor: config.wall_height_factor,
            side_shade: config.side_shade,
            fish_eye_correction,
        }
    }

    /// Distance scaled by the cosine of the ray's angular offset when
    /// fish-eye correction is on; the raw ray length otherwise.
    pub fn corrected_distance(&self, hit: &WallHit) -> f32 {
        if !self.fish_eye_correction {
            return hit.distance;
        }
        let ray_angle = self.half_fov * camera_x(hit.column, self.column_count);
        hit.distance * ray_angle.cos()
    }

    pub fn wall_height(&self, distance: f32) -> i32 {
        (self.screen_height / distance * self.wall_height_factor).abs() as i32
    }

    pub fn shade(&self, hit: &WallHit) -> f32 {
        if hit.east_west { self.side_shade } else { 1.0 }
    }

    pub fn project(&self, hit: &WallHit) -> WallSegment {
        if hit.is_miss() {
            return WallSegment::empty(hit.column);
        }
        let height = self.wall_height(self.corrected_distance(hit));
        let center = (self.screen_height * 0.5) as i32;
        let top = center.saturating_sub(height / 2);
        WallSegment {
            column: hit.column,
            top,
            bottom: top.saturating_add(height),
            height,
            material: hit.material,
            texture_u: hit.texture_u,
            shade: self.shade(hit),
        }
    }

    pub fn project_all(&self, hits: &[WallHit], out: &mut [WallSegment]) {
        for (hit, segment) in hits.iter().zip(out.iter_mut()) {
            *segment = self.project(hit);
        }
    }
}
