//! Player pose and the camera basis used to cast rays and place sprites.
//!
//! `direction` is kept unit length and `plane` perpendicular to it, scaled
//! by `tan(FOV / 2)`. Screen column offsets run from `-1` (left) to `1`.

use glam::Vec2;

use crate::world::PlayerStart;

/// Player position plus the camera basis derived from the view direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPose {
    pub position: Vec2, // world units, cell-fractional
    pub direction: Vec2, // unit length
    pub plane: Vec2,     // perpendicular to direction, length tan(FOV/2)
    plane_scale: f32,
}

/// A world point expressed in the (plane, direction) camera basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPoint {
    /// Sideways offset, in plane units.
    pub x: f32,
    /// Distance in front of the camera plane.
    pub depth: f32,
}

impl PlayerPose {
    pub fn new(position: Vec2, direction: Vec2, plane_scale: f32) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec2::X);
        Self {
            position,
            direction,
            plane: direction.perp() * plane_scale,
            plane_scale,
        }
    }

    pub fn from_start(start: &PlayerStart, plane_scale: f32) -> Self {
        Self::new(
            Vec2::from_array(start.position),
            Vec2::from_array(start.direction),
            plane_scale,
        )
    }

    /// Rotates the view; positive angles turn towards the camera plane
    /// (clockwise on a y-down map).
    pub fn rotate(&mut self, radians: f32) {
        if radians == 0.0 {
            return;
        }
        // Renormalize to keep repeated small rotations from drifting.
        self.direction = Vec2::from_angle(radians)
            .rotate(self.direction)
            .normalize();
        self.plane = self.direction.perp() * self.plane_scale;
    }

    /// Unit ray through the camera plane at `camera_x` in `-1..=1`.
    #[inline]
    pub fn ray_direction(&self, camera_x: f32) -> Vec2 {
        (self.direction + self.plane * camera_x).normalize()
    }

    /// Inverse camera-basis transform of a world point.
    #[inline]
    pub fn to_camera(&self, point: Vec2) -> CameraPoint {
        let d = point - self.position;
        let (dir, plane) = (self.direction, self.plane);
        let inv_det = 1.0 / (plane.x * dir.y - dir.x * plane.y);
        CameraPoint {
            x: inv_det * (dir.y * d.x - dir.x * d.y),
            depth: inv_det * (-plane.y * d.x + plane.x * d.y),
        }
    }

    #[inline]
    pub fn project_x(&self, cam: CameraPoint, screen_width: f32) -> f32 {
        0.5 * screen_width * (1.0 + cam.x / cam.depth)
    }
}

/// Camera-space offset of a screen column, `-1` at the left edge and `1` at
/// the right. A single column looks straight ahead.
#[inline]
pub fn camera_x(column: usize, column_count: usize) -> f32 {
    if column_count <= 1 {
        return 0.0;
    }
    (2.0 * column as f32) / (column_count - 1) as f32 - 1.0
}
