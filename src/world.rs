//! Tile grid, sprite placements and map documents.

use std::path::Path;

use glam::{IVec2, Vec2};
use serde::Deserialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{LoadError, MapError};

/// Material id of a walkable cell.
pub const EMPTY: i32 = -1;
/// Material id reported for any cell outside the grid.
pub const BOUNDARY: i32 = 0;

/// Opaque handle into the renderer's sprite texture set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct TextureId(pub u16);

/// Integer rectangle, used both in texture space and on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

/// A camera-facing billboard anchored somewhere inside a grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub position: Vec2,
    pub cell: IVec2,
    pub texture: TextureId,
    /// Source frame inside the texture.
    pub frame: Rect,
}

impl Sprite {
    pub const DEFAULT_FRAME: Rect = Rect::new(0, 0, 64, 64);

    pub fn new(position: Vec2, texture: TextureId) -> Self {
        Self {
            position,
            cell: position.floor().as_ivec2(),
            texture,
            frame: Self::DEFAULT_FRAME,
        }
    }
}

/// Read-only grid of wall material ids plus at most one sprite per cell.
///
/// Any query outside `[0, width) x [0, height)` answers [`BOUNDARY`], so the
/// grid behaves as if wrapped in solid wall. Ray marching still relies on the
/// interior being enclosed to terminate early; see
/// [`DdaRaycaster`](crate::raycaster::DdaRaycaster).
#[derive(Debug, Clone)]
pub struct TileMap {
    width: usize,
    height: usize,
    cells: Vec<i32>,
    sprites: Vec<Sprite>,
    sprite_slots: Vec<Option<u32>>,
}

impl TileMap {
    pub fn new(width: usize, height: usize, cells: Vec<i32>) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::Empty { width, height });
        }
        let expected = width * height;
        if cells.len() != expected {
            return Err(MapError::CellCount {
                expected,
                found: cells.len(),
            });
        }
        if let Some(i) = cells.iter().position(|&id| id < EMPTY) {
            return Err(MapError::InvalidMaterial {
                x: i % width,
                y: i / width,
                id: cells[i],
            });
        }

        Ok(Self {
            width,
            height,
            cells,
            sprites: Vec::new(),
            sprite_slots: vec![None; expected],
        })
    }

    /// Empty interior surrounded by a one-cell border of `border` material.
    pub fn bordered(width: usize, height: usize, border: i32) -> Result<Self, MapError> {
        let mut cells = vec![EMPTY; width * height];
        for y in 0..height {
            for x in 0..width {
                if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                    cells[y * width + x] = border;
                }
            }
        }
        Self::new(width, height, cells)
    }

    pub fn from_document(doc: &MapDocument) -> Result<Self, MapError> {
        let mut map = Self::new(doc.width, doc.height, doc.cells.clone())?;
        for placement in &doc.sprites {
            let anchor = placement.anchor.unwrap_or([0.5, 0.5]);
            let position = Vec2::new(
                placement.x as f32 + anchor[0],
                placement.y as f32 + anchor[1],
            );
            let mut sprite = Sprite::new(position, placement.texture);
            sprite.cell = IVec2::new(placement.x, placement.y);
            if let Some([x, y, w, h]) = placement.frame {
                sprite.frame = Rect::new(x, y, w, h);
            }
            map.place_sprite(sprite)?;
        }
        debug!(
            width = map.width,
            height = map.height,
            sprites = map.sprites.len(),
            "tile map built"
        );
        Ok(map)
    }

    /// Attaches a sprite to the cell stored in `sprite.cell`.
    pub fn place_sprite(&mut self, sprite: Sprite) -> Result<usize, MapError> {
        let IVec2 { x, y } = sprite.cell;
        let slot = self
            .index(x, y)
            .ok_or(MapError::SpriteOutOfBounds { x, y })?;
        if self.sprite_slots[slot].is_some() {
            return Err(MapError::DuplicateSprite { x, y });
        }
        let id = self.sprites.len();
        self.sprite_slots[slot] = Some(id as u32);
        self.sprites.push(sprite);
        Ok(id)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Wall material at a cell; [`BOUNDARY`] outside the grid.
    #[inline]
    pub fn material_at(&self, x: i32, y: i32) -> i32 {
        match self.index(x, y) {
            Some(i) => self.cells[i],
            None => BOUNDARY,
        }
    }

    #[inline]
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        self.material_at(x, y) != EMPTY
    }

    pub fn sprite_at(&self, x: i32, y: i32) -> Option<&Sprite> {
        self.sprite_index_at(x, y).map(|i| &self.sprites[i])
    }

    #[inline]
    pub fn sprite_index_at(&self, x: i32, y: i32) -> Option<usize> {
        self.index(x, y)
            .and_then(|i| self.sprite_slots[i])
            .map(|id| id as usize)
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpritePlacement {
    pub x: i32,
    pub y: i32,
    pub texture: TextureId,
    /// Position inside the cell, `[0.5, 0.5]` when omitted.
    #[serde(default)]
    pub anchor: Option<[f32; 2]>,
    /// Source frame `[x, y, w, h]` in texture pixels.
    #[serde(default)]
    pub frame: Option<[i32; 4]>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlayerStart {
    pub position: [f32; 2],
    pub direction: [f32; 2],
}

/// On-disk map description (JSON).
#[derive(Debug, Clone, Deserialize)]
pub struct MapDocument {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<i32>,
    #[serde(default)]
    pub sprites: Vec<SpritePlacement>,
    #[serde(default)]
    pub player: Option<PlayerStart>,
    #[serde(default)]
    pub config: Option<EngineConfig>,
}

impl MapDocument {
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc = Self::parse(&text)?;
        debug!(path = %path.display(), "map document loaded");
        Ok(doc)
    }

    /// Walled 16x16 room with a few inner walls and three sprites.
    pub fn demo() -> Self {
        const W: usize = 16;
        const H: usize = 16;
        let mut cells = vec![EMPTY; W * H];
        let mut set = |x: usize, y: usize, id: i32| cells[y * W + x] = id;
        for i in 0..W {
            set(i, 0, 1);
            set(i, H - 1, 1);
        }
        for j in 0..H {
            set(0, j, 1);
            set(W - 1, j, 1);
        }
        // L-shaped block in the north-east corner.
        for (x, y) in [(12, 1), (12, 2), (12, 3), (11, 3), (10, 3)] {
            set(x, y, 2);
        }
        for y in 8..12 {
            set(4, y, 3);
        }
        set(9, 9, 0);
        set(10, 9, 0);

        let placements = [(7, 4, 0), (11, 11, 1), (2, 13, 0)];
        Self {
            width: W,
            height: H,
            cells,
            sprites: placements
                .into_iter()
                .map(|(x, y, t)| SpritePlacement {
                    x,
                    y,
                    texture: TextureId(t),
                    anchor: None,
                    frame: None,
                })
                .collect(),
            player: Some(PlayerStart {
                position: [5.5, 5.5],
                direction: [2.0, 1.0],
            }),
            config: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_cell_count() {
        let err = TileMap::new(3, 3, vec![EMPTY; 8]).unwrap_err();
        assert_eq!(
            err,
            MapError::CellCount {
                expected: 9,
                found: 8
            }
        );
    }

    #[test]
    fn rejects_material_below_empty() {
        let mut cells = vec![EMPTY; 4];
        cells[3] = -5;
        let err = TileMap::new(2, 2, cells).unwrap_err();
        assert_eq!(err, MapError::InvalidMaterial { x: 1, y: 1, id: -5 });
    }

    #[test]
    fn bordered_map_has_walkable_interior() {
        let map = TileMap::bordered(5, 4, 1).unwrap();
        assert_eq!(map.material_at(0, 0), 1);
        assert_eq!(map.material_at(4, 3), 1);
        assert_eq!(map.material_at(2, 2), EMPTY);
        assert!(!map.is_solid(1, 1));
    }

    #[test]
    fn sprite_lookup_by_cell() {
        let mut map = TileMap::bordered(6, 6, 1).unwrap();
        let id = map
            .place_sprite(Sprite::new(Vec2::new(2.25, 3.75), TextureId(4)))
            .unwrap();
        assert_eq!(id, 0);
        assert_eq!(map.sprite_index_at(2, 3), Some(0));
        assert_eq!(map.sprite_at(2, 3).map(|s| s.texture), Some(TextureId(4)));
        assert!(map.sprite_at(3, 3).is_none());
        assert!(map.sprite_at(-1, 3).is_none());
    }

    #[test]
    fn second_sprite_in_cell_is_rejected() {
        let mut map = TileMap::bordered(6, 6, 1).unwrap();
        map.place_sprite(Sprite::new(Vec2::new(2.5, 2.5), TextureId(0)))
            .unwrap();
        let err = map
            .place_sprite(Sprite::new(Vec2::new(2.1, 2.9), TextureId(1)))
            .unwrap_err();
        assert_eq!(err, MapError::DuplicateSprite { x: 2, y: 2 });
    }

    #[test]
    fn document_round_trip_through_json() {
        let text = r#"{
            "width": 3, "height": 3,
            "cells": [1,1,1, 1,-1,1, 1,1,1],
            "sprites": [{ "x": 1, "y": 1, "texture": 2, "anchor": [0.25, 0.5] }]
        }"#;
        let doc = MapDocument::parse(text).unwrap();
        let map = TileMap::from_document(&doc).unwrap();
        let sprite = map.sprite_at(1, 1).unwrap();
        assert_eq!(sprite.position, Vec2::new(1.25, 1.5));
        assert_eq!(sprite.frame, Sprite::DEFAULT_FRAME);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = MapDocument::parse("{ width: 3 }").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn demo_map_is_valid() {
        let doc = MapDocument::demo();
        let map = TileMap::from_document(&doc).unwrap();
        assert_eq!(map.sprites().len(), 3);
        assert_eq!(map.material_at(12, 2), 2);
    }
}
