//! Grid ray marching (DDA), one ray per screen column.
//!
//! Rays march from the player's cell, always advancing along whichever axis
//! reaches its next grid line first, until they enter a cell whose material
//! is not [`EMPTY`]. The caller must supply a map whose walkable area is
//! enclosed by solid cells; rays that still run past `max_steps` report a
//! miss (infinite distance) rather than looping forever.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::{IVec2, Vec2};
use rayon::prelude::*;
use tracing::trace;

use crate::camera::{PlayerPose, camera_x};
use crate::world::{EMPTY, TileMap};

/// Result of one column's ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    /// Distance along the unit ray to the wall plane.
    pub distance: f32,
    /// The ray crossed an X grid line last (it struck an east/west face).
    pub east_west: bool,
    pub material: i32,
    /// Texture column in `0..texture_width`.
    pub texture_u: f32,
    pub column: usize,
}

impl WallHit {
    pub fn miss(column: usize) -> Self {
        Self {
            distance: f32::INFINITY,
            east_west: false,
            material: EMPTY,
            texture_u: 0.0,
            column,
        }
    }

    #[inline]
    pub fn is_miss(&self) -> bool {
        self.material == EMPTY
    }
}

/// Per-sprite "some ray stepped through this cell" flags for the current
/// frame. Written concurrently by the column loop.
#[derive(Debug, Default)]
pub struct SpriteVisibility {
    flags: Vec<AtomicBool>,
}

impl SpriteVisibility {
    pub fn new(sprite_count: usize) -> Self {
        Self {
            flags: (0..sprite_count).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    pub fn clear(&self) {
        for flag in &self.flags {
            flag.store(false, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn mark(&self, sprite: usize) {
        if let Some(flag) = self.flags.get(sprite) {
            flag.store(true, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn is_seen(&self, sprite: usize) -> bool {
        self.flags
            .get(sprite)
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    pub fn seen_count(&self) -> usize {
        (0..self.flags.len()).filter(|&i| self.is_seen(i)).count()
    }
}

/// A grid line crossing, for the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub point: Vec2,
    pub east_west: bool,
}

/// Every intermediate step of a single ray, kept for the top-down overlay.
#[derive(Debug, Clone, Default)]
pub struct RayTrace {
    pub origin: Vec2,
    pub direction: Vec2,
    /// Where the ray first meets a vertical (X) grid line.
    pub first_x: Vec2,
    /// Where the ray first meets a horizontal (Y) grid line.
    pub first_y: Vec2,
    pub crossings: Vec<Crossing>,
    pub cells: Vec<IVec2>,
    pub hit: Option<WallHit>,
}

impl RayTrace {
    /// End point of the ray: the last crossing, or the origin for a miss.
    pub fn end(&self) -> Vec2 {
        match self.hit {
            Some(hit) if !hit.is_miss() => self.origin + self.direction * hit.distance,
            _ => self.origin,
        }
    }
}

struct Dda {
    cell: IVec2,
    step: IVec2,
    delta: Vec2,
    side: Vec2,
}

impl Dda {
    fn new(origin: Vec2, dir: Vec2) -> Self {
        // Axis-aligned rays divide by zero here; the infinite delta means that
        // axis never wins the stepping race.
        let delta = Vec2::new(
            (1.0 + (dir.y / dir.x) * (dir.y / dir.x)).sqrt(),
            (1.0 + (dir.x / dir.y) * (dir.x / dir.y)).sqrt(),
        );
        let cell = origin.floor().as_ivec2();

        let (step_x, side_x) = if dir.x < 0.0 {
            (-1, (origin.x - cell.x as f32) * delta.x)
        } else {
            (1, (cell.x as f32 + 1.0 - origin.x) * delta.x)
        };
        let (step_y, side_y) = if dir.y < 0.0 {
            (-1, (origin.y - cell.y as f32) * delta.y)
        } else {
            (1, (cell.y as f32 + 1.0 - origin.y) * delta.y)
        };

        Self {
            cell,
            step: IVec2::new(step_x, step_y),
            delta,
            side: Vec2::new(side_x, side_y),
        }
    }
}

pub struct DdaRaycaster<'a> {
    map: &'a TileMap,
    texture_width: f32,
    max_steps: u32,
}

impl<'a> DdaRaycaster<'a> {
    pub fn new(map: &'a TileMap, texture_width: u32, max_steps: u32) -> Self {
        Self {
            map,
            texture_width: texture_width as f32,
            max_steps,
        }
    }

    /// Marches one ray. `visit` sees every cell entered, with the crossing
    /// point and axis that led into it.
    #[inline]
    fn march<F>(&self, origin: Vec2, dir: Vec2, column: usize, mut visit: F) -> WallHit
    where
        F: FnMut(IVec2, Vec2, bool),
    {
        let mut dda = Dda::new(origin, dir);

        for _ in 0..self.max_steps {
            // Ties go to the Y branch.
            let east_west = dda.side.x < dda.side.y;
            let crossing;
            if east_west {
                crossing = origin + dir * dda.side.x;
                dda.cell.x += dda.step.x;
                dda.side.x += dda.delta.x;
            } else {
                crossing = origin + dir * dda.side.y;
                dda.cell.y += dda.step.y;
                dda.side.y += dda.delta.y;
            }
            visit(dda.cell, crossing, east_west);

            let material = self.map.material_at(dda.cell.x, dda.cell.y);
            if material == EMPTY {
                continue;
            }

            // Undo the last increment: distance to the wall plane, not to the
            // next grid line.
            let distance = if east_west {
                dda.side.x - dda.delta.x
            } else {
                dda.side.y - dda.delta.y
            };
            let hit = origin + dir * distance;
            let along = if east_west { hit.y } else { hit.x };
            return WallHit {
                distance,
                east_west,
                material,
                texture_u: (along - along.floor()) * self.texture_width,
                column,
            };
        }

        WallHit::miss(column)
    }

    /// Casts the ray for `column` of `column_count`, marking sprite cells it
    /// passes through.
    pub fn cast_column(
        &self,
        pose: &PlayerPose,
        column: usize,
        column_count: usize,
        seen: &SpriteVisibility,
    ) -> WallHit {
        let dir = pose.ray_direction(camera_x(column, column_count));
        self.march(pose.position, dir, column, |cell, _, _| {
            if let Some(sprite) = self.map.sprite_index_at(cell.x, cell.y) {
                seen.mark(sprite);
            }
        })
    }

    /// Fills `walls` and `zbuffer` (same length, one slot per column).
    /// Each slot is written exactly once, so the parallel path needs no
    /// synchronisation beyond the sprite flags.
    pub fn cast_all(
        &self,
        pose: &PlayerPose,
        walls: &mut [WallHit],
        zbuffer: &mut [f32],
        seen: &SpriteVisibility,
        parallel: bool,
    ) {
        debug_assert_eq!(walls.len(), zbuffer.len());
        let count = walls.len();

        if parallel {
            walls
                .par_iter_mut()
                .zip(zbuffer.par_iter_mut())
                .enumerate()
                .for_each(|(column, (wall, depth))| {
                    *wall = self.cast_column(pose, column, count, seen);
                    *depth = wall.distance;
                });
        } else {
            for (column, (wall, depth)) in walls.iter_mut().zip(zbuffer.iter_mut()).enumerate() {
                *wall = self.cast_column(pose, column, count, seen);
                *depth = wall.distance;
            }
        }

        trace!(columns = count, parallel, "raycast pass complete");
    }

    /// Casts a ray and records every step into `out`, reusing its buffers.
    pub fn trace_ray(&self, origin: Vec2, dir: Vec2, column: usize, out: &mut RayTrace) {
        let dda = Dda::new(origin, dir);
        out.origin = origin;
        out.direction = dir;
        out.first_x = origin + dir * dda.side.x;
        out.first_y = origin + dir * dda.side.y;
        out.crossings.clear();
        out.cells.clear();

        let crossings = &mut out.crossings;
        let cells = &mut out.cells;
        let hit = self.march(origin, dir, column, |cell, point, east_west| {
            crossings.push(Crossing { point, east_west });
            cells.push(cell);
        });
        out.hit = Some(hit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> TileMap {
        TileMap::bordered(10, 10, 1).unwrap()
    }

    fn cast(map: &TileMap, origin: Vec2, dir: Vec2) -> WallHit {
        DdaRaycaster::new(map, 64, 256).march(origin, dir, 0, |_, _, _| {})
    }

    #[test]
    fn straight_east_from_cell_centre() {
        let map = room();
        let hit = cast(&map, Vec2::new(5.5, 5.5), Vec2::X);
        assert_eq!(hit.distance, 4.5);
        assert!(hit.east_west);
        assert_eq!(hit.material, 1);
        // Hit at y = 5.5 on the wall face.
        assert_eq!(hit.texture_u, 32.0);
    }

    #[test]
    fn straight_north_hits_horizontal_face() {
        let map = room();
        let hit = cast(&map, Vec2::new(3.25, 4.75), Vec2::NEG_Y);
        assert!((hit.distance - 3.75).abs() < 1e-6);
        assert!(!hit.east_west);
        assert_eq!(hit.texture_u, 0.25 * 64.0);
    }

    #[test]
    fn straight_west_uses_offset_into_cell() {
        let map = room();
        let hit = cast(&map, Vec2::new(5.3, 2.5), Vec2::NEG_X);
        assert!((hit.distance - 4.3).abs() < 1e-5);
        assert!(hit.east_west);
    }

    #[test]
    fn exact_diagonal_tie_steps_y_first() {
        // From a cell centre at 45 degrees both side distances start equal.
        let map = room();
        let raycaster = DdaRaycaster::new(&map, 64, 256);
        let mut trace = RayTrace::default();
        raycaster.trace_ray(Vec2::new(5.5, 5.5), Vec2::ONE.normalize(), 0, &mut trace);
        assert_eq!(trace.cells[0], IVec2::new(5, 6));
        assert!(!trace.crossings[0].east_west);
    }

    #[test]
    fn open_map_degrades_to_miss() {
        let map = TileMap::new(3, 3, vec![EMPTY; 9]).unwrap();
        // Out-of-bounds cells are solid, so this ray still terminates.
        let hit = cast(&map, Vec2::new(1.5, 1.5), Vec2::X);
        assert_eq!(hit.material, crate::world::BOUNDARY);

        let capped = DdaRaycaster::new(&map, 64, 1).march(Vec2::new(0.5, 1.5), Vec2::X, 3, |_, _, _| {});
        assert!(capped.is_miss());
        assert_eq!(capped.distance, f32::INFINITY);
        assert_eq!(capped.column, 3);
    }

    #[test]
    fn cast_all_fills_zbuffer_with_distances() {
        let map = room();
        let pose = PlayerPose::new(Vec2::new(5.5, 5.5), Vec2::X, 0.66);
        let seen = SpriteVisibility::new(0);
        let mut walls = vec![WallHit::miss(0); 9];
        let mut zbuffer = vec![0.0; 9];
        DdaRaycaster::new(&map, 64, 256).cast_all(&pose, &mut walls, &mut zbuffer, &seen, false);
        for (i, (wall, z)) in walls.iter().zip(&zbuffer).enumerate() {
            assert_eq!(wall.column, i);
            assert_eq!(wall.distance, *z);
            assert!(!wall.is_miss());
        }
        // Middle column looks straight along +X.
        assert_eq!(walls[4].distance, 4.5);
    }

    #[test]
    fn rays_mark_sprite_cells_they_cross() {
        let mut map = room();
        map.place_sprite(crate::world::Sprite::new(
            Vec2::new(7.5, 5.5),
            crate::world::TextureId(0),
        ))
        .unwrap();
        map.place_sprite(crate::world::Sprite::new(
            Vec2::new(2.5, 2.5),
            crate::world::TextureId(0),
        ))
        .unwrap();
        let pose = PlayerPose::new(Vec2::new(5.5, 5.5), Vec2::X, 0.66);
        let seen = SpriteVisibility::new(2);
        let raycaster = DdaRaycaster::new(&map, 64, 256);
        raycaster.cast_column(&pose, 0, 1, &seen);
        assert!(seen.is_seen(0));
        assert!(!seen.is_seen(1));
        seen.clear();
        assert_eq!(seen.seen_count(), 0);
    }

    #[test]
    fn trace_records_first_crossings_and_end() {
        let map = room();
        let raycaster = DdaRaycaster::new(&map, 64, 256);
        let mut trace = RayTrace::default();
        raycaster.trace_ray(Vec2::new(5.5, 5.5), Vec2::X, 0, &mut trace);
        assert_eq!(trace.first_x, Vec2::new(6.0, 5.5));
        assert!(!trace.first_y.is_finite());
        assert_eq!(trace.cells.len(), 4);
        assert_eq!(trace.end(), Vec2::new(10.0, 5.5));
    }
}
