//! Circle-vs-cell collision and sub-stepped motion resolution.

use glam::{IVec2, Vec2};
use tracing::trace;

use crate::world::TileMap;

/// Which part of a rectangle a circle overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    None,
    /// Centre lies within the rectangle's Y span; horizontal normal.
    EdgeX,
    /// Centre lies within the rectangle's X span; vertical normal.
    EdgeY,
    /// Only a rounded corner region overlaps.
    Corner,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionInfo {
    pub kind: ContactKind,
    pub depth: f32,
    /// Unit vector pointing out of the rectangle.
    pub normal: Vec2,
}

impl CollisionInfo {
    pub const NONE: Self = Self {
        kind: ContactKind::None,
        depth: 0.0,
        normal: Vec2::ZERO,
    };

    pub fn is_hit(&self) -> bool {
        self.kind != ContactKind::None
    }

    pub fn correction(&self) -> Vec2 {
        self.normal * self.depth
    }
}

/// Axis-aligned rectangle in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn cell(cell: IVec2) -> Self {
        let min = cell.as_vec2();
        Self {
            min,
            max: min + Vec2::ONE,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

fn sign(v: f32) -> f32 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

/// Circle-vs-rectangle intersection test.
pub fn circle_rect(center: Vec2, radius: f32, rect: Aabb) -> CollisionInfo {
    let nearest = center.clamp(rect.min, rect.max);
    let offset = center - nearest;
    let dist_sq = offset.length_squared();
    if dist_sq > radius * radius {
        return CollisionInfo::NONE;
    }
    let depth = radius - dist_sq.sqrt();

    let in_x = center.x >= rect.min.x && center.x <= rect.max.x;
    let in_y = center.y >= rect.min.y && center.y <= rect.max.y;
    let rc = rect.center();

    if in_x && in_y {
        // Centre inside: leave through the nearest face.
        let to_min = center - rect.min;
        let to_max = rect.max - center;
        let pen = to_min.min(to_max);
        return if pen.x <= pen.y {
            let nx = if to_min.x <= to_max.x { -1.0 } else { 1.0 };
            CollisionInfo {
                kind: ContactKind::EdgeX,
                depth: radius + pen.x,
                normal: Vec2::new(nx, 0.0),
            }
        } else {
            let ny = if to_min.y <= to_max.y { -1.0 } else { 1.0 };
            CollisionInfo {
                kind: ContactKind::EdgeY,
                depth: radius + pen.y,
                normal: Vec2::new(0.0, ny),
            }
        };
    }

    let (kind, normal) = if in_x {
        (ContactKind::EdgeY, Vec2::new(0.0, sign(center.y - rc.y)))
    } else if in_y {
        (ContactKind::EdgeX, Vec2::new(sign(center.x - rc.x), 0.0))
    } else if offset.x.abs() > offset.y.abs() {
        (ContactKind::Corner, Vec2::new(sign(offset.x), 0.0))
    } else {
        (ContactKind::Corner, Vec2::new(0.0, sign(offset.y)))
    };

    CollisionInfo {
        kind,
        depth,
        normal,
    }
}

/// A contact found against one map cell, kept for the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellContact {
    pub cell: IVec2,
    pub info: CollisionInfo,
}

const MAX_SUBSTEPS: usize = 64;

/// Keeps the player's collision circle out of solid cells.
///
/// Each step is corrected in a single pass: the corrected position is not
/// re-tested, so tight multi-wall corners can leave a small residual
/// overlap.
#[derive(Debug, Clone, Copy)]
pub struct MotionResolver {
    radius: f32,
}

impl MotionResolver {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Returns the resolved position for moving from `position` by
    /// `displacement`. Contacts from the last step are written to
    /// `contacts`.
    ///
    /// Long moves are split into steps no longer than the radius, so the
    /// centre cannot cross a cell face within one step.
    pub fn resolve(
        &self,
        map: &TileMap,
        position: Vec2,
        displacement: Vec2,
        contacts: &mut Vec<CellContact>,
    ) -> Vec2 {
        contacts.clear();
        if displacement == Vec2::ZERO {
            return position;
        }

        let steps = if self.radius > 0.0 {
            ((displacement.length() / self.radius).ceil() as usize).clamp(1, MAX_SUBSTEPS)
        } else {
            1
        };
        let step = displacement / steps as f32;

        let mut current = position;
        for _ in 0..steps {
            current = self.resolve_step(map, current + step, contacts);
        }

        let correction = current - (position + displacement);
        if correction != Vec2::ZERO {
            trace!(
                steps,
                contacts = contacts.len(),
                dx = correction.x,
                dy = correction.y,
                "motion corrected"
            );
        }
        current
    }

    fn resolve_step(&self, map: &TileMap, candidate: Vec2, contacts: &mut Vec<CellContact>) -> Vec2 {
        contacts.clear();
        let target = candidate.floor().as_ivec2();

        let mut edge = Vec2::ZERO;
        let mut edge_hit = false;
        let mut corner: Option<CollisionInfo> = None;

        for dy in -1..=1 {
            for dx in -1..=1 {
                let cell = target + IVec2::new(dx, dy);
                if !map.is_solid(cell.x, cell.y) {
                    continue;
                }
                let info = circle_rect(candidate, self.radius, Aabb::cell(cell));
                match info.kind {
                    ContactKind::None => continue,
                    ContactKind::EdgeX | ContactKind::EdgeY => {
                        edge += info.correction();
                        edge_hit = true;
                    }
                    ContactKind::Corner => {
                        if corner.is_none_or(|c| info.depth > c.depth) {
                            corner = Some(info);
                        }
                    }
                }
                contacts.push(CellContact { cell, info });
            }
        }

        // Edges win over corners so sliding along a wall past a corner is
        // not corrected twice.
        let correction = if edge_hit {
            edge
        } else {
            corner.map_or(Vec2::ZERO, |c| c.correction())
        };
        candidate + correction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_at(x: i32, y: i32) -> Aabb {
        Aabb::cell(IVec2::new(x, y))
    }

    #[test]
    fn circle_above_top_edge_pushes_up() {
        // Rect spans y in [3, 4]; circle centre 0.1 above its top edge.
        let info = circle_rect(Vec2::new(2.5, 2.9), 0.25, unit_at(2, 3));
        assert_eq!(info.kind, ContactKind::EdgeY);
        assert_eq!(info.normal, Vec2::new(0.0, -1.0));
        assert!((info.depth - (0.25 - (3.0 - 2.9))).abs() < 1e-6);
    }

    #[test]
    fn circle_beside_left_edge_pushes_left() {
        let info = circle_rect(Vec2::new(1.8, 3.5), 0.25, unit_at(2, 3));
        assert_eq!(info.kind, ContactKind::EdgeX);
        assert_eq!(info.normal, Vec2::new(-1.0, 0.0));
        assert!((info.depth - 0.05).abs() < 1e-5);
    }

    #[test]
    fn corner_uses_axis_with_more_clearance() {
        // Up-left of the corner at (2, 3), further out in x than y.
        let info = circle_rect(Vec2::new(1.85, 2.9), 0.25, unit_at(2, 3));
        assert_eq!(info.kind, ContactKind::Corner);
        assert_eq!(info.normal, Vec2::new(-1.0, 0.0));
        let expected = 0.25 - Vec2::new(0.15, 0.1).length();
        assert!((info.depth - expected).abs() < 1e-5);
    }

    #[test]
    fn centre_inside_cell_exits_through_nearest_face() {
        // 0.05 past the left face, deep in y.
        let info = circle_rect(Vec2::new(9.05, 5.5), 0.25, unit_at(9, 5));
        assert_eq!(info.kind, ContactKind::EdgeX);
        assert_eq!(info.normal, Vec2::new(-1.0, 0.0));
        assert!((info.depth - 0.3).abs() < 1e-5);

        let info = circle_rect(Vec2::new(3.5, 3.9), 0.25, unit_at(3, 3));
        assert_eq!(info.kind, ContactKind::EdgeY);
        assert_eq!(info.normal, Vec2::new(0.0, 1.0));
        assert!((info.depth - 0.35).abs() < 1e-5);
    }

    #[test]
    fn long_move_into_wall_does_not_tunnel() {
        let map = TileMap::bordered(10, 10, 1).unwrap();
        let mut contacts = Vec::new();
        // Longer than the radius: would land inside the border cell.
        let resolved = MotionResolver::new(0.25).resolve(
            &map,
            Vec2::new(8.7, 5.5),
            Vec2::new(0.3, 0.0),
            &mut contacts,
        );
        assert!((resolved.x - 8.75).abs() < 1e-5);
        assert_eq!(resolved.y, 5.5);
        assert!(contacts.iter().all(|c| c.info.kind == ContactKind::EdgeX));
    }

    #[test]
    fn far_circle_does_not_touch() {
        let info = circle_rect(Vec2::new(1.0, 1.0), 0.25, unit_at(2, 3));
        assert!(!info.is_hit());
        assert_eq!(info, CollisionInfo::NONE);
    }

    #[test]
    fn zero_displacement_is_identity() {
        let map = TileMap::bordered(5, 5, 1).unwrap();
        let mut contacts = Vec::new();
        // Even when already touching a wall.
        let start = Vec2::new(1.1, 2.5);
        let resolved = MotionResolver::new(0.25).resolve(&map, start, Vec2::ZERO, &mut contacts);
        assert_eq!(resolved, start);
        assert!(contacts.is_empty());
    }

    #[test]
    fn free_move_is_unchanged() {
        let map = TileMap::bordered(8, 8, 1).unwrap();
        let mut contacts = Vec::new();
        let resolved = MotionResolver::new(0.25).resolve(
            &map,
            Vec2::new(4.0, 4.0),
            Vec2::new(0.1, -0.05),
            &mut contacts,
        );
        assert!(resolved.abs_diff_eq(Vec2::new(4.1, 3.95), 1e-6));
        assert!(contacts.is_empty());
    }

    #[test]
    fn moving_into_wall_stops_at_radius() {
        let map = TileMap::bordered(8, 8, 1).unwrap();
        let mut contacts = Vec::new();
        let resolved = MotionResolver::new(0.25).resolve(
            &map,
            Vec2::new(6.5, 4.5),
            Vec2::new(0.4, 0.0),
            &mut contacts,
        );
        assert!((resolved.x - 6.75).abs() < 1e-5);
        assert_eq!(resolved.y, 4.5);
        assert!(contacts.iter().any(|c| c.info.kind == ContactKind::EdgeX));
    }

    #[test]
    fn sliding_diagonally_keeps_tangent_motion() {
        let map = TileMap::bordered(8, 8, 1).unwrap();
        let mut contacts = Vec::new();
        let resolved = MotionResolver::new(0.25).resolve(
            &map,
            Vec2::new(3.5, 1.3),
            Vec2::new(0.2, -0.2),
            &mut contacts,
        );
        assert!((resolved.x - 3.7).abs() < 1e-5);
        assert!((resolved.y - 1.25).abs() < 1e-5);
    }

    #[test]
    fn edges_take_precedence_over_corners() {
        // Room corner: both walls hit on an edge, the diagonal cell only at
        // its corner.
        let map = TileMap::bordered(8, 8, 1).unwrap();
        let mut contacts = Vec::new();
        let resolved = MotionResolver::new(0.25).resolve(
            &map,
            Vec2::new(1.3, 1.3),
            Vec2::new(-0.2, -0.2),
            &mut contacts,
        );
        assert!(contacts.iter().any(|c| c.info.kind == ContactKind::Corner));
        assert!((resolved.x - 1.25).abs() < 1e-5);
        assert!((resolved.y - 1.25).abs() < 1e-5);
    }

    #[test]
    fn lone_corner_is_resolved_on_one_axis() {
        let mut cells = vec![crate::world::EMPTY; 25];
        cells[2 * 5 + 2] = 4;
        let map = TileMap::new(5, 5, cells).unwrap();
        let mut contacts = Vec::new();
        // Approach the pillar's top-left corner from up-left.
        let resolved = MotionResolver::new(0.25).resolve(
            &map,
            Vec2::new(1.6, 1.7),
            Vec2::new(0.25, 0.2),
            &mut contacts,
        );
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].info.kind, ContactKind::Corner);
        // Clearance is larger on x (0.15) than y (0.1): pushed back along x.
        assert!((resolved.y - 1.9).abs() < 1e-5);
        assert!(resolved.x < 1.85);
    }
}
