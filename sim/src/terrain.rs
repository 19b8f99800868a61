//! Terrain map collaborator.
//!
//! The simulation only asks the map for a colour under a point and derives
//! two flags from it: green above one half is forest, blue above one half is
//! water. Forest slows fighters down; water drowns routing fighters.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Linear RGBA colour, each channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const OPEN: Rgba = Rgba::new(0.5, 0.4, 0.2, 1.0);
    pub const FOREST: Rgba = Rgba::new(0.1, 0.8, 0.1, 1.0);
    pub const WATER: Rgba = Rgba::new(0.1, 0.2, 0.9, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_forest(&self) -> bool {
        self.g > 0.5
    }

    pub fn is_water(&self) -> bool {
        self.b > 0.5
    }
}

/// Anything that can report the terrain colour at a world position.
pub trait TerrainMap: Send + Sync {
    fn sample(&self, x: f32, y: f32) -> Rgba;
}

/// Resource wrapper so the map can be shared with ECS systems.
#[derive(Resource, Clone)]
pub struct TerrainResource(pub Arc<dyn TerrainMap>);

impl TerrainResource {
    pub fn new(map: impl TerrainMap + 'static) -> Self {
        Self(Arc::new(map))
    }

    /// `(forest, water)` at a world position.
    pub fn classify(&self, x: f32, y: f32) -> (bool, bool) {
        let c = self.0.sample(x, y);
        (c.is_forest(), c.is_water())
    }
}

/// Raster map covering the square `[0, world_size]²`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainImage {
    /// Width and height of the raster in pixels.
    pub resolution: usize,
    /// Side length of the covered world square.
    pub world_size: f32,
    /// Pixels (row-major order).
    pub pixels: Vec<Rgba>,
}

impl TerrainImage {
    /// Create a map of open ground.
    pub fn new(resolution: usize, world_size: f32) -> Self {
        let resolution = resolution.max(1);
        Self {
            resolution,
            world_size,
            pixels: vec![Rgba::OPEN; resolution * resolution],
        }
    }

    /// Convert world coordinates to pixel coordinates, clamped to the image.
    pub fn world_to_pixel(&self, x: f32, y: f32) -> (usize, usize) {
        let scale = self.resolution as f32 / self.world_size;
        let last = self.resolution as i32 - 1;
        let px = ((x * scale).floor() as i32).clamp(0, last) as usize;
        let py = ((y * scale).floor() as i32).clamp(0, last) as usize;
        (px, py)
    }

    pub fn pixel(&self, px: usize, py: usize) -> Option<Rgba> {
        if px < self.resolution && py < self.resolution {
            Some(self.pixels[py * self.resolution + px])
        } else {
            None
        }
    }

    pub fn set_pixel(&mut self, px: usize, py: usize, color: Rgba) {
        if px < self.resolution && py < self.resolution {
            self.pixels[py * self.resolution + px] = color;
        }
    }

    /// Paint a filled disc in world coordinates.
    pub fn paint_disc(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba) {
        let (x0, y0) = self.world_to_pixel(cx - radius, cy - radius);
        let (x1, y1) = self.world_to_pixel(cx + radius, cy + radius);
        let pixel_size = self.world_size / self.resolution as f32;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let wx = (px as f32 + 0.5) * pixel_size;
                let wy = (py as f32 + 0.5) * pixel_size;
                if (wx - cx).powi(2) + (wy - cy).powi(2) <= radius * radius {
                    self.set_pixel(px, py, color);
                }
            }
        }
    }
}

impl TerrainMap for TerrainImage {
    fn sample(&self, x: f32, y: f32) -> Rgba {
        let (px, py) = self.world_to_pixel(x, y);
        self.pixel(px, py).unwrap_or(Rgba::OPEN)
    }
}
