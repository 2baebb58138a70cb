//! Procedurally generated wall and sprite textures.

use gridcaster::world::TextureId;

use crate::renderer::pack_rgb;

/// Texel value treated as transparent in sprite textures.
pub const COLOR_KEY: u32 = 0x00FF_00FF;

pub struct Texture {
    width: u32,
    height: u32,
    texels: Vec<u32>,
}

impl Texture {
    fn generate(width: u32, height: u32, f: impl Fn(u32, u32) -> u32) -> Self {
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                texels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Wrapping lookup; out-of-range coordinates tile.
    #[inline]
    pub fn sample(&self, x: i64, y: i64) -> u32 {
        let xi = x.rem_euclid(self.width as i64) as usize;
        let yi = y.rem_euclid(self.height as i64) as usize;
        self.texels[yi * self.width as usize + xi]
    }
}

fn brick(size: u32, mortar: u32, face: u32) -> Texture {
    let course = (size / 4).max(1);
    Texture::generate(size, size, |x, y| {
        let row = y / course;
        let offset = if row % 2 == 0 { 0 } else { size / 4 };
        let bx = (x + offset) % (size / 2).max(1);
        if y % course == 0 || bx == 0 { mortar } else { face }
    })
}

fn checker(size: u32, a: u32, b: u32) -> Texture {
    let tile = (size / 8).max(1);
    Texture::generate(size, size, |x, y| {
        if (x / tile + y / tile) % 2 == 0 { a } else { b }
    })
}

fn panels(size: u32, frame: u32, fill: u32) -> Texture {
    let border = (size / 16).max(1);
    Texture::generate(size, size, |x, y| {
        let edge = x < border || y < border || x >= size - border || y >= size - border;
        let rivet = (x == size / 2) && (y % (size / 4).max(1) == size / 8);
        if edge || rivet { frame } else { fill }
    })
}

/// Filled disc with a darker rim on a transparent background.
fn orb(size: u32, fill: u32, rim: u32) -> Texture {
    let r = size as f32 * 0.4;
    let c = size as f32 * 0.5;
    Texture::generate(size, size, |x, y| {
        let dx = x as f32 + 0.5 - c;
        // Sit the orb on the floor.
        let dy = y as f32 + 0.5 - (size as f32 - r);
        let d = (dx * dx + dy * dy).sqrt();
        if d > r {
            COLOR_KEY
        } else if d > r * 0.85 {
            rim
        } else {
            fill
        }
    })
}

/// Column with a wider base, on a transparent background.
fn pillar(size: u32, stone: u32, shadow: u32) -> Texture {
    Texture::generate(size, size, |x, y| {
        let half = if y > size * 7 / 8 { size / 3 } else { size / 5 };
        let c = size / 2;
        if x + half < c || x >= c + half {
            COLOR_KEY
        } else if x >= c + half / 2 {
            shadow
        } else {
            stone
        }
    })
}

pub struct TexturePalette {
    walls: Vec<Texture>,
    flat: Vec<u32>,
    sprites: Vec<Texture>,
}

impl TexturePalette {
    pub fn generate(size: u32) -> Self {
        let size = size.max(8);
        let walls = vec![
            panels(size, pack_rgb(90, 90, 100), pack_rgb(140, 140, 155)),
            brick(size, pack_rgb(70, 60, 55), pack_rgb(165, 70, 50)),
            checker(size, pack_rgb(60, 110, 170), pack_rgb(40, 80, 130)),
            brick(size, pack_rgb(60, 60, 60), pack_rgb(120, 150, 90)),
        ];
        let flat = vec![
            pack_rgb(150, 150, 165),
            pack_rgb(220, 20, 60), // crimson
            pack_rgb(70, 130, 200),
            pack_rgb(130, 170, 100),
        ];
        let sprites = vec![
            orb(size, pack_rgb(240, 200, 60), pack_rgb(160, 120, 20)),
            pillar(size, pack_rgb(200, 200, 190), pack_rgb(130, 130, 120)),
        ];
        Self {
            walls,
            flat,
            sprites,
        }
    }

    pub fn wall(&self, material: i32) -> &Texture {
        &self.walls[material.rem_euclid(self.walls.len() as i32) as usize]
    }

    pub fn flat(&self, material: i32) -> u32 {
        self.flat[material.rem_euclid(self.flat.len() as i32) as usize]
    }

    pub fn sprite(&self, id: TextureId) -> &Texture {
        &self.sprites[id.0 as usize % self.sprites.len()]
    }
}
