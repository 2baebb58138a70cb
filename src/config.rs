//! Tunable engine constants and display-mode selection.

use serde::Deserialize;

use crate::error::MapError;

/// Engine-wide constants. Every field has a default so a map document can
/// override any subset of them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fov_degrees: f32,
    /// Display scale applied to projected wall heights.
    pub wall_height_factor: f32,
    /// Wall texture width (and height) in pixels.
    pub texture_size: u32,
    /// Collision circle radius in world units.
    pub player_radius: f32,
    /// World units per second.
    pub move_speed: f32,
    pub turn_speed_degrees: f32,
    /// Upper bound on DDA steps per ray; a ray that exceeds it reports a miss.
    pub max_ray_steps: u32,
    /// Cast columns on the rayon pool instead of serially.
    pub parallel_columns: bool,
    /// Brightness multiplier for walls hit on their east/west face.
    pub side_shade: f32,
    pub view_width: usize,
    pub view_height: usize,
    pub max_frame_dt_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 66.0,
            wall_height_factor: 1.0,
            texture_size: 64,
            player_radius: 0.25,
            move_speed: 3.0,
            turn_speed_degrees: 120.0,
            max_ray_steps: 1024,
            parallel_columns: true,
            side_shade: 0.8,
            view_width: 640,
            view_height: 480,
            max_frame_dt_ms: 100,
        }
    }
}

impl EngineConfig {
    pub fn fov(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    /// Camera-plane length, `tan(FOV / 2)`.
    pub fn plane_scale(&self) -> f32 {
        (0.5 * self.fov()).tan()
    }

    pub fn turn_speed(&self) -> f32 {
        self.turn_speed_degrees.to_radians()
    }

    /// Rejects settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), MapError> {
        let invalid = |field, expected| Err(MapError::InvalidConfig { field, expected });
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return invalid("fov_degrees", "in (0, 180)");
        }
        if !(self.wall_height_factor.is_finite() && self.wall_height_factor > 0.0) {
            return invalid("wall_height_factor", "positive");
        }
        if self.texture_size == 0 {
            return invalid("texture_size", "at least 1");
        }
        if !(self.player_radius > 0.0 && self.player_radius < 0.5) {
            return invalid("player_radius", "in (0, 0.5)");
        }
        if !(self.move_speed.is_finite() && self.move_speed >= 0.0) {
            return invalid("move_speed", "finite and non-negative");
        }
        if !self.turn_speed_degrees.is_finite() {
            return invalid("turn_speed_degrees", "finite");
        }
        if self.max_ray_steps == 0 {
            return invalid("max_ray_steps", "at least 1");
        }
        if !(0.0..=1.0).contains(&self.side_shade) {
            return invalid("side_shade", "in [0, 1]");
        }
        if self.view_width == 0 || self.view_height == 0 {
            return invalid("view_width/view_height", "at least 1");
        }
        Ok(())
    }
}

/// How many rays the top-down overlay draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayCount {
    Single,
    Fixed(usize),
    /// One per view column.
    AllColumns,
}

/// Debug overlay content. Derived from a [`DisplayMode`], never edited
/// field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlaySettings {
    pub rays: RayCount,
    /// First X and Y grid crossings before stepping.
    pub precalc_steps: bool,
    /// Projection of each crossing back onto the ray origin's axes.
    pub equal_distance_steps: bool,
    /// Every grid crossing along the ray.
    pub crossings: bool,
    /// Centres of the cells the ray walked through.
    pub grid_steps: bool,
    pub camera_plane: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Default,
    Precalculations,
    EqualDistanceSteps,
    Collisions,
    MultipleRaysWithCollisions,
    MultipleRays,
}

impl DisplayMode {
    const ALL: [DisplayMode; 6] = [
        Self::Default,
        Self::Precalculations,
        Self::EqualDistanceSteps,
        Self::Collisions,
        Self::MultipleRaysWithCollisions,
        Self::MultipleRays,
    ];

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn overlay(self) -> OverlaySettings {
        let base = OverlaySettings {
            rays: RayCount::Single,
            precalc_steps: false,
            equal_distance_steps: false,
            crossings: false,
            grid_steps: false,
            camera_plane: false,
        };
        match self {
            Self::Default => base,
            Self::Precalculations => OverlaySettings {
                precalc_steps: true,
                ..base
            },
            Self::EqualDistanceSteps => OverlaySettings {
                equal_distance_steps: true,
                ..base
            },
            Self::Collisions => OverlaySettings {
                crossings: true,
                grid_steps: true,
                ..base
            },
            Self::MultipleRaysWithCollisions => OverlaySettings {
                rays: RayCount::Fixed(4),
                crossings: true,
                camera_plane: true,
                ..base
            },
            Self::MultipleRays => OverlaySettings {
                rays: RayCount::AllColumns,
                camera_plane: true,
                ..base
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Precalculations => "precalculations",
            Self::EqualDistanceSteps => "equal-distance-steps",
            Self::Collisions => "collisions",
            Self::MultipleRaysWithCollisions => "multiple-rays-with-collisions",
            Self::MultipleRays => "multiple-rays",
        }
    }
}

/// Optional pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stages {
    pub fish_eye_correction: bool,
    pub textures: bool,
    pub sprites: bool,
    pub collision: bool,
}

impl Default for Stages {
    fn default() -> Self {
        Self {
            fish_eye_correction: true,
            textures: true,
            sprites: true,
            collision: true,
        }
    }
}

/// A stage flip requested by the input layer for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageToggle {
    FishEye,
    Textures,
    Sprites,
    Collision,
}

impl Stages {
    pub fn toggle(&mut self, which: StageToggle) {
        let flag = match which {
            StageToggle::FishEye => &mut self.fish_eye_correction,
            StageToggle::Textures => &mut self.textures,
            StageToggle::Sprites => &mut self.sprites,
            StageToggle::Collision => &mut self.collision,
        };
        *flag = !*flag;
    }
}
