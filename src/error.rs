//! Load-time errors. Per-frame operations never fail.

use std::fmt;
use std::path::PathBuf;

/// Structural problems found while building a [`TileMap`](crate::world::TileMap)
/// from a map document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// Width or height is zero.
    Empty { width: usize, height: usize },
    /// `cells.len()` does not equal `width * height`.
    CellCount { expected: usize, found: usize },
    /// A material id below the empty sentinel (`-1`).
    InvalidMaterial { x: usize, y: usize, id: i32 },
    /// Sprite placement outside the grid.
    SpriteOutOfBounds { x: i32, y: i32 },
    /// Two sprites placed in the same cell.
    DuplicateSprite { x: i32, y: i32 },
    /// An engine setting outside its usable range.
    InvalidConfig {
        field: &'static str,
        expected: &'static str,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { width, height } => {
                write!(f, "map has no cells ({width}x{height})")
            }
            Self::CellCount { expected, found } => {
                write!(f, "expected {expected} cells, found {found}")
            }
            Self::InvalidMaterial { x, y, id } => {
                write!(f, "invalid material id {id} at ({x}, {y})")
            }
            Self::SpriteOutOfBounds { x, y } => {
                write!(f, "sprite placed outside the map at ({x}, {y})")
            }
            Self::DuplicateSprite { x, y } => {
                write!(f, "more than one sprite in cell ({x}, {y})")
            }
            Self::InvalidConfig { field, expected } => {
                write!(f, "config field `{field}` must be {expected}")
            }
        }
    }
}

impl std::error::Error for MapError {}

/// Failure loading a map document from disk or text.
#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Map(MapError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, .. } => write!(f, "failed to read map file {}", path.display()),
            Self::Parse(_) => f.write_str("malformed map document"),
            Self::Map(err) => write!(f, "invalid map: {err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Map(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

impl From<MapError> for LoadError {
    fn from(err: MapError) -> Self {
        Self::Map(err)
    }
}
