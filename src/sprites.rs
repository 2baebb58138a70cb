//! Billboard sprite projection with per-column occlusion.
//!
//! Sprites are moved into camera space with the inverse of the
//! (plane, direction) basis. Each screen column a sprite covers becomes one
//! stripe, kept only where the sprite is nearer than the wall in the
//! z-buffer. Projected sprites are ordered far to near.

use tracing::trace;

use crate::camera::PlayerPose;
use crate::raycaster::SpriteVisibility;
use crate::world::{Rect, TileMap};

/// One visible column of a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteStripe {
    pub screen: Rect,
    pub source: Rect,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectedSprite {
    /// Index into [`TileMap::sprites`].
    pub sprite: usize,
    pub depth: f32,
    pub screen_x: f32,
    /// On-screen width and height in pixels.
    pub size: i32,
    pub stripes: Vec<SpriteStripe>,
}

/// Per-frame sprite output. Slots are allocated once per map sprite and
/// reused; `order` lists the projected ones far to near.
#[derive(Debug, Clone, Default)]
pub struct SpriteFrame {
    slots: Vec<ProjectedSprite>,
    order: Vec<usize>,
}

impl SpriteFrame {
    pub fn with_capacity(sprite_count: usize) -> Self {
        Self {
            slots: vec![ProjectedSprite::default(); sprite_count],
            order: Vec::with_capacity(sprite_count),
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.stripes.clear();
        }
        self.order.clear();
    }

    /// Projected sprites, far to near.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectedSprite> {
        self.order.iter().map(|&i| &self.slots[i])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn stripe_count(&self) -> usize {
        self.iter().map(|s| s.stripes.len()).sum()
    }
}

/// Largest on-screen sprite size, in pixels.
const MAX_SPRITE_SIZE: i64 = 1 << 30;

#[derive(Debug, Clone, Copy)]
pub struct SpriteProjector {
    screen_width: i32,
    screen_height: i32,
}

impl SpriteProjector {
    pub fn new(screen_width: usize, screen_height: usize) -> Self {
        Self {
            screen_width: screen_width as i32,
            screen_height: screen_height as i32,
        }
    }

    /// Projects every sprite flagged in `seen` into `out`.
    pub fn project(
        &self,
        map: &TileMap,
        pose: &PlayerPose,
        zbuffer: &[f32],
        seen: &SpriteVisibility,
        out: &mut SpriteFrame,
    ) {
        out.clear();
        if out.slots.len() < map.sprites().len() {
            out.slots
                .resize_with(map.sprites().len(), ProjectedSprite::default);
        }

        let width = self.screen_width as f32;
        for (index, sprite) in map.sprites().iter().enumerate() {
            if !seen.is_seen(index) {
                continue;
            }
            let cam = pose.to_camera(sprite.position);
            if cam.depth <= 0.0 {
                continue; // behind the camera plane
            }
            let screen_x = pose.project_x(cam, width);
            // Sprites hugging the camera plane project to enormous sizes;
            // keep the integer math in i64 over a clamped range.
            let size = (self.screen_height as f32 / cam.depth)
                .abs()
                .min(MAX_SPRITE_SIZE as f32) as i64;
            if size <= 0 {
                continue;
            }
            let centre_x = screen_x.clamp(i32::MIN as f32, i32::MAX as f32) as i64;
            let start_x = centre_x - size / 2;
            let end_x = start_x + size;
            let screen_width = self.screen_width as i64;
            if end_x <= 0 || start_x >= screen_width {
                continue;
            }
            let start_y = (self.screen_height as i64 / 2 - size / 2) as i32;

            let slot = &mut out.slots[index];
            slot.sprite = index;
            slot.depth = cam.depth;
            slot.screen_x = screen_x;
            slot.size = size as i32;

            let frame = sprite.frame;
            for x in start_x.max(0)..end_x.min(screen_width) {
                if cam.depth >= zbuffer[x as usize] {
                    continue;
                }
                let tex_x = (x - start_x) * frame.w as i64 / size;
                let source_x = (frame.x as i64 + tex_x).clamp(i32::MIN as i64, i32::MAX as i64);
                slot.stripes.push(SpriteStripe {
                    screen: Rect::new(x as i32, start_y, 1, size as i32),
                    source: Rect::new(source_x as i32, frame.y, 1, frame.h),
                });
            }
            out.order.push(index);
        }

        let slots = &out.slots;
        out.order
            .sort_by(|&a, &b| slots[b].depth.total_cmp(&slots[a].depth));

        trace!(
            projected = out.order.len(),
            stripes = out.stripe_count(),
            "sprites projected"
        );
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::world::{Sprite, TextureId};

    fn scene(sprites: &[Vec2]) -> (TileMap, SpriteVisibility) {
        let mut map = TileMap::bordered(12, 12, 1).unwrap();
        for &p in sprites {
            map.place_sprite(Sprite::new(p, TextureId(0))).unwrap();
        }
        let seen = SpriteVisibility::new(sprites.len());
        for i in 0..sprites.len() {
            seen.mark(i);
        }
        (map, seen)
    }

    fn pose() -> PlayerPose {
        PlayerPose::new(Vec2::new(2.5, 5.5), Vec2::X, 0.5)
    }

    #[test]
    fn sprite_ahead_is_centred_and_sized_by_depth() {
        let (map, seen) = scene(&[Vec2::new(6.5, 5.5)]);
        let zbuffer = vec![f32::INFINITY; 100];
        let mut out = SpriteFrame::default();
        SpriteProjector::new(100, 80).project(&map, &pose(), &zbuffer, &seen, &mut out);

        let projected: Vec<_> = out.iter().collect();
        assert_eq!(projected.len(), 1);
        let s = projected[0];
        assert!((s.depth - 4.0).abs() < 1e-5);
        assert!((s.screen_x - 50.0).abs() < 1e-3);
        assert_eq!(s.size, 20);
        assert_eq!(s.stripes.len(), 20);
        assert_eq!(s.stripes[0].screen, Rect::new(40, 30, 1, 20));
        assert_eq!(s.stripes[0].source, Rect::new(0, 0, 1, 64));
        assert_eq!(s.stripes[19].source.x, 19 * 64 / 20);
    }

    #[test]
    fn sprite_behind_wall_has_no_stripes() {
        let (map, seen) = scene(&[Vec2::new(6.5, 5.5)]);
        let zbuffer = vec![3.0; 100];
        let mut out = SpriteFrame::default();
        SpriteProjector::new(100, 80).project(&map, &pose(), &zbuffer, &seen, &mut out);
        assert_eq!(out.stripe_count(), 0);
    }

    #[test]
    fn partially_occluded_sprite_keeps_open_columns() {
        let (map, seen) = scene(&[Vec2::new(6.5, 5.5)]);
        let mut zbuffer = vec![f32::INFINITY; 100];
        for z in &mut zbuffer[40..50] {
            *z = 1.0;
        }
        let mut out = SpriteFrame::default();
        SpriteProjector::new(100, 80).project(&map, &pose(), &zbuffer, &seen, &mut out);
        let stripes = &out.iter().next().unwrap().stripes;
        assert_eq!(stripes.len(), 10);
        assert!(stripes.iter().all(|s| s.screen.x >= 50));
    }

    #[test]
    fn sprites_behind_camera_or_unseen_are_skipped() {
        let (map, seen) = scene(&[Vec2::new(1.5, 5.5), Vec2::new(8.5, 5.5)]);
        let fresh = SpriteVisibility::new(2);
        fresh.mark(0);
        let zbuffer = vec![f32::INFINITY; 100];
        let mut out = SpriteFrame::default();
        let projector = SpriteProjector::new(100, 80);

        projector.project(&map, &pose(), &zbuffer, &fresh, &mut out);
        assert!(out.is_empty());

        projector.project(&map, &pose(), &zbuffer, &seen, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out.iter().next().unwrap().sprite, 1);
    }

    #[test]
    fn sprite_outside_view_is_skipped() {
        // Far to the side, in front of the camera but off screen.
        let (map, seen) = scene(&[Vec2::new(3.5, 10.5)]);
        let zbuffer = vec![f32::INFINITY; 100];
        let mut out = SpriteFrame::default();
        SpriteProjector::new(100, 80).project(&map, &pose(), &zbuffer, &seen, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn sprite_touching_camera_plane_is_clamped() {
        // Depth far below one pixel's worth: the size saturates.
        let pose = PlayerPose::new(Vec2::new(5.5, 0.0), Vec2::Y, 0.66);
        let (map, seen) = scene(&[Vec2::new(5.5, 1e-12), Vec2::new(4.99, 1e-12)]);
        let zbuffer = vec![f32::INFINITY; 40];
        let mut out = SpriteFrame::default();
        SpriteProjector::new(40, 480).project(&map, &pose, &zbuffer, &seen, &mut out);

        // The off-centre one lands far off screen.
        assert_eq!(out.len(), 1);
        let s = out.iter().next().unwrap();
        assert_eq!(s.sprite, 0);
        assert_eq!(s.size as i64, MAX_SPRITE_SIZE);
        assert_eq!(s.stripes.len(), 40);
        for stripe in &s.stripes {
            assert!((0..64).contains(&stripe.source.x));
            assert!(stripe.screen.y < 0);
            assert!(stripe.screen.y as i64 + stripe.screen.h as i64 > 480);
        }
    }

    #[test]
    fn output_is_ordered_far_to_near() {
        let (map, seen) = scene(&[
            Vec2::new(4.5, 5.5),
            Vec2::new(9.5, 5.5),
            Vec2::new(6.5, 5.5),
        ]);
        let zbuffer = vec![f32::INFINITY; 100];
        let mut out = SpriteFrame::default();
        SpriteProjector::new(100, 80).project(&map, &pose(), &zbuffer, &seen, &mut out);
        let order: Vec<_> = out.iter().map(|s| s.sprite).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }
}
