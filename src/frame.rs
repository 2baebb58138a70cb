//! Per-frame pipeline: motion, raycast, wall projection, sprites, overlay
//! traces.
//!
//! All per-frame state lives in [`Frame`], sized once from the view width
//! and sprite count and overwritten in place every tick.

use std::path::Path;
use std::time::Duration;

use glam::Vec2;
use tracing::{debug, info};

use crate::camera::{PlayerPose, camera_x};
use crate::collision::{CellContact, MotionResolver};
use crate::config::{DisplayMode, EngineConfig, RayCount, StageToggle, Stages};
use crate::error::{LoadError, MapError};
use crate::projector::{Projector, WallSegment};
use crate::raycaster::{DdaRaycaster, RayTrace, SpriteVisibility, WallHit};
use crate::sprites::{SpriteFrame, SpriteProjector};
use crate::world::{MapDocument, TileMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotate {
    Left,
    Right,
    #[default]
    None,
}

/// What the input collaborator asks for this tick.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// World-space movement direction; normalized before use.
    pub move_intent: Vec2,
    pub rotate: Rotate,
    pub toggles: Vec<StageToggle>,
    pub next_mode: bool,
    pub dt: Duration,
}

/// Everything the renderer reads for one frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub walls: Vec<WallHit>,
    pub zbuffer: Vec<f32>,
    pub segments: Vec<WallSegment>,
    pub sprites: SpriteFrame,
    pub contacts: Vec<CellContact>,
    traces: Vec<RayTrace>,
    trace_count: usize,
    pub index: u64,
}

impl Frame {
    pub fn new(columns: usize, sprite_count: usize) -> Self {
        Self {
            walls: (0..columns).map(WallHit::miss).collect(),
            zbuffer: vec![f32::INFINITY; columns],
            segments: (0..columns).map(WallSegment::empty).collect(),
            sprites: SpriteFrame::with_capacity(sprite_count),
            contacts: Vec::with_capacity(9),
            traces: Vec::new(),
            trace_count: 0,
            index: 0,
        }
    }

    pub fn columns(&self) -> usize {
        self.walls.len()
    }

    /// Overlay ray traces produced this frame.
    pub fn traces(&self) -> &[RayTrace] {
        &self.traces[..self.trace_count]
    }
}

/// Engine session: owns the map, player pose, mode selection and the
/// reusable frame buffers.
pub struct Engine {
    map: TileMap,
    config: EngineConfig,
    pose: PlayerPose,
    resolver: MotionResolver,
    stages: Stages,
    mode: DisplayMode,
    seen: SpriteVisibility,
    frame: Frame,
}

impl Engine {
    pub fn new(map: TileMap, config: EngineConfig, pose: PlayerPose) -> Self {
        let columns = config.view_width.max(1);
        let sprites = map.sprites().len();
        info!(
            width = map.width(),
            height = map.height(),
            sprites,
            columns,
            "engine ready"
        );
        Self {
            resolver: MotionResolver::new(config.player_radius),
            seen: SpriteVisibility::new(sprites),
            frame: Frame::new(columns, sprites),
            stages: Stages::default(),
            mode: DisplayMode::default(),
            map,
            config,
            pose,
        }
    }

    /// Builds a session from a map document, using the document's config
    /// when it has one.
    pub fn from_document(doc: &MapDocument) -> Result<Self, MapError> {
        let config = doc.config.clone().unwrap_or_default();
        config.validate()?;
        let map = TileMap::from_document(doc)?;
        let pose = match &doc.player {
            Some(start) => PlayerPose::from_start(start, config.plane_scale()),
            None => PlayerPose::new(
                Vec2::new(map.width() as f32 * 0.5, map.height() as f32 * 0.5),
                Vec2::X,
                config.plane_scale(),
            ),
        };
        Ok(Self::new(map, config, pose))
    }

    /// Reads a JSON map document and builds a session from it.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let doc = MapDocument::load(path)?;
        Ok(Self::from_document(&doc)?)
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pose(&self) -> &PlayerPose {
        &self.pose
    }

    pub fn stages(&self) -> Stages {
        self.stages
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn resolver(&self) -> &MotionResolver {
        &self.resolver
    }

    /// Runs one simulation tick and returns its outputs.
    pub fn step(&mut self, input: &FrameInput) -> &Frame {
        self.apply_modes(input);
        self.apply_motion(input);
        self.cast();
        self.project_walls();
        self.project_sprites();
        self.trace_overlay();
        self.frame.index += 1;
        &self.frame
    }

    fn apply_modes(&mut self, input: &FrameInput) {
        for &toggle in &input.toggles {
            self.stages.toggle(toggle);
            debug!(?toggle, stages = ?self.stages, "stage toggled");
        }
        if input.next_mode {
            self.mode = self.mode.next();
            info!(mode = self.mode.name(), "display mode");
        }
    }

    fn apply_motion(&mut self, input: &FrameInput) {
        let dt = input
            .dt
            .min(Duration::from_millis(self.config.max_frame_dt_ms))
            .as_secs_f32();

        let turn = self.config.turn_speed() * dt;
        match input.rotate {
            Rotate::Left => self.pose.rotate(-turn),
            Rotate::Right => self.pose.rotate(turn),
            Rotate::None => {}
        }

        let displacement = input.move_intent.normalize_or_zero() * self.config.move_speed * dt;
        if self.stages.collision {
            self.pose.position = self.resolver.resolve(
                &self.map,
                self.pose.position,
                displacement,
                &mut self.frame.contacts,
            );
        } else {
            self.frame.contacts.clear();
            self.pose.position += displacement;
        }
    }

    fn cast(&mut self) {
        self.seen.clear();
        let raycaster = DdaRaycaster::new(
            &self.map,
            self.config.texture_size,
            self.config.max_ray_steps,
        );
        raycaster.cast_all(
            &self.pose,
            &mut self.frame.walls,
            &mut self.frame.zbuffer,
            &self.seen,
            self.config.parallel_columns,
        );
    }

    fn project_walls(&mut self) {
        let projector = Projector::new(
            &self.config,
            self.frame.columns(),
            self.stages.fish_eye_correction,
        );
        projector.project_all(&self.frame.walls, &mut self.frame.segments);
    }

    fn project_sprites(&mut self) {
        if !self.stages.sprites {
            self.frame.sprites.clear();
            return;
        }
        SpriteProjector::new(self.frame.columns(), self.config.view_height).project(
            &self.map,
            &self.pose,
            &self.frame.zbuffer,
            &self.seen,
            &mut self.frame.sprites,
        );
    }

    fn trace_overlay(&mut self) {
        let columns = self.frame.columns();
        let count = match self.mode.overlay().rays {
            RayCount::Single => 1,
            RayCount::Fixed(n) => n.min(columns),
            RayCount::AllColumns => columns,
        };
        if self.frame.traces.len() < count {
            self.frame.traces.resize_with(count, RayTrace::default);
        }

        let raycaster = DdaRaycaster::new(
            &self.map,
            self.config.texture_size,
            self.config.max_ray_steps,
        );
        for (i, trace) in self.frame.traces[..count].iter_mut().enumerate() {
            let column = if count == 1 {
                columns / 2
            } else {
                i * (columns - 1) / (count - 1)
            };
            let dir = if count == 1 {
                self.pose.direction
            } else {
                self.pose.ray_direction(camera_x(column, columns))
            };
            raycaster.trace_ray(self.pose.position, dir, column, trace);
        }
        self.frame.trace_count = count;
    }
}
