//! Terrain grid - tile classification and walkability.
//!
//! The terrain is a fixed `width × height` array of tile codes generated once
//! from a seeded LCG, so a given seed always yields the same map. Water tiles are
//! never walkable; everything else is. The grid is immutable after generation.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resource wrapper for the terrain grid, shared read-only by ECS systems.
#[derive(Resource, Clone)]
pub struct TerrainResource(pub Arc<TerrainGrid>);

impl TerrainResource {
    pub fn new(grid: TerrainGrid) -> Self {
        Self(Arc::new(grid))
    }

    pub fn grid(&self) -> &TerrainGrid {
        &self.0
    }
}

/// Terrain code of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileKind {
    #[default]
    Grass = 0,
    Dirt = 1,
    /// Impassable for agents and projectiles.
    Water = 2,
}

impl TileKind {
    pub fn is_walkable(self) -> bool {
        !matches!(self, TileKind::Water)
    }
}

/// Integer tile address (column, row). Signed so off-grid neighbours can be
/// expressed and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighbour at `(dx, dy)`. Saturates at the `i32` range, which is always
    /// off-grid.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

/// Linear congruential generator used for terrain noise.
///
/// `s' = 1664525·s + 1013904223 (mod 2³²)`, sampled as `s' / (2³² - 1)`.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next sample in `[0, 1]`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        f64::from(self.state) / f64::from(u32::MAX)
    }
}

/// Grid of terrain tiles in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    tile_size: f32,
    tiles: Vec<TileKind>,
}

impl TerrainGrid {
    /// Generate terrain from the LCG: samples below `water` become water, below
    /// `dirt` become dirt, the rest grass.
    pub fn generate(width: u32, height: u32, tile_size: f32, seed: u32, water: f64, dirt: f64) -> Self {
        let mut rng = Lcg::new(seed);
        Self::from_fn(width, height, tile_size, |_| {
            let n = rng.next_f64();
            if n < water {
                TileKind::Water
            } else if n < dirt {
                TileKind::Dirt
            } else {
                TileKind::Grass
            }
        })
    }

    /// Build a grid by classifying every tile, visiting rows top to bottom.
    pub fn from_fn(
        width: u32,
        height: u32,
        tile_size: f32,
        mut classify: impl FnMut(TileCoord) -> TileKind,
    ) -> Self {
        let mut tiles = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                tiles.push(classify(TileCoord::new(x, y)));
            }
        }
        Self {
            width,
            height,
            tile_size,
            tiles,
        }
    }

    /// A grid where every tile has the same kind.
    pub fn filled(width: u32, height: u32, tile_size: f32, kind: TileKind) -> Self {
        Self::from_fn(width, height, tile_size, |_| kind)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn tiles(&self) -> &[TileKind] {
        &self.tiles
    }

    /// World-space extent `(width, height)`.
    pub fn world_size(&self) -> (f32, f32) {
        (
            self.width as f32 * self.tile_size,
            self.height as f32 * self.tile_size,
        )
    }

    pub fn in_bounds(&self, tile: TileCoord) -> bool {
        tile.x >= 0 && tile.y >= 0 && (tile.x as u32) < self.width && (tile.y as u32) < self.height
    }

    /// Row-major index of an in-bounds tile.
    pub fn index(&self, tile: TileCoord) -> Option<usize> {
        self.in_bounds(tile)
            .then(|| tile.y as usize * self.width as usize + tile.x as usize)
    }

    pub fn coord(&self, index: usize) -> TileCoord {
        let width = self.width as usize;
        TileCoord::new((index % width) as i32, (index / width) as i32)
    }

    pub fn tile(&self, tile: TileCoord) -> Option<TileKind> {
        self.index(tile).map(|i| self.tiles[i])
    }

    /// Tile containing a world position (floor division by the tile size).
    ///
    /// Far-off positions saturate at the `i32` range; NaN maps to `-1`, which is
    /// off-grid.
    pub fn world_to_tile(&self, world_x: f32, world_y: f32) -> TileCoord {
        let axis = |v: f32| {
            if v.is_nan() {
                -1
            } else {
                (v / self.tile_size).floor() as i32
            }
        };
        TileCoord::new(axis(world_x), axis(world_y))
    }

    /// World coordinates of a tile's centre.
    pub fn tile_center(&self, tile: TileCoord) -> (f32, f32) {
        (
            tile.x as f32 * self.tile_size + self.tile_size / 2.0,
            tile.y as f32 * self.tile_size + self.tile_size / 2.0,
        )
    }

    /// False off-grid or on water.
    pub fn is_walkable(&self, world_x: f32, world_y: f32) -> bool {
        if !world_x.is_finite() || !world_y.is_finite() {
            return false;
        }
        self.is_walkable_tile(self.world_to_tile(world_x, world_y))
    }

    pub fn is_walkable_tile(&self, tile: TileCoord) -> bool {
        self.tile(tile).is_some_and(TileKind::is_walkable)
    }

    /// Expanding ring search for the closest walkable tile.
    ///
    /// A walkable `tile` is returned as is. Otherwise rings of radius
    /// `1..=max_radius` are scanned (perimeter only, rows top to bottom, columns
    /// left to right) and the first walkable tile wins.
    pub fn find_nearest_walkable(&self, tile: TileCoord, max_radius: i32) -> Option<TileCoord> {
        if self.is_walkable_tile(tile) {
            return Some(tile);
        }
        for r in 1..=max_radius {
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx.abs() != r && dy.abs() != r {
                        continue;
                    }
                    let candidate = tile.offset(dx, dy);
                    if self.is_walkable_tile(candidate) {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// All walkable tiles in row-major order.
    pub fn walkable_tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, kind)| kind.is_walkable())
            .map(|(i, _)| self.coord(i))
    }

    /// Fraction of tiles that are walkable.
    pub fn walkable_fraction(&self) -> f32 {
        if self.tiles.is_empty() {
            return 0.0;
        }
        let walkable = self.tiles.iter().filter(|kind| kind.is_walkable()).count();
        walkable as f32 / self.tiles.len() as f32
    }
}

/// Snapshot of terrain for renderers and minimaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainSnapshot {
    pub width: u32,
    pub height: u32,
    pub tile_size: f32,
    /// Flattened tile codes (0 grass, 1 dirt, 2 water).
    pub tiles: Vec<u8>,
}

impl TerrainSnapshot {
    pub fn from_grid(grid: &TerrainGrid) -> Self {
        Self {
            width: grid.width,
            height: grid.height,
            tile_size: grid.tile_size,
            tiles: grid.tiles.iter().map(|kind| *kind as u8).collect(),
        }
    }
}
