//! Base map tiles: which ones are visible, downloading them in the background and
//! painting them.

use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, StrokeKind, Vec2, pos2};
use eyre::Context;
use log::{debug, error};
use once_cell::sync::Lazy;
use poll_promise::Promise;
use std::collections::HashMap;

use crate::config::MapConfig;
use crate::projection::MapProjection;
use crate::{MapError, TILE_SIZE, USER_AGENT};

// One client for every tile download.
static CLIENT: Lazy<reqwest::Result<reqwest::blocking::Client>> = Lazy::new(|| {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()
});

/// A unique identifier for a map tile.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TileId {
    /// The zoom level.
    pub z: u8,

    /// The x-coordinate of the tile.
    pub x: u32,

    /// The y-coordinate of the tile.
    pub y: u32,
}

// Enough for a full screen of tiles at a few zoom levels.
const MAX_CACHED_TILES: usize = 512;

type TileResult = Result<egui::ColorImage, eyre::Report>;

enum Tile {
    Loading(Promise<TileResult>),
    Loaded(egui::TextureHandle),
    Failed,
}

struct CachedTile {
    tile: Tile,
    last_used: u64,
}

fn download(url: &str) -> Result<egui::ColorImage, MapError> {
    debug!("Downloading tile from {}", url);
    let client = CLIENT
        .as_ref()
        .map_err(|e| MapError::TileDownloadError(e.to_string()))?;

    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(MapError::TileDownloadError(response.status().to_string()));
    }

    let image = image::load_from_memory(&response.bytes()?)?.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, &image.into_raw()))
}

/// Tiles seen so far, keyed by id. Once there are more than `capacity` tiles the least
/// recently requested ones are dropped by [`TileCache::evict`].
pub(crate) struct TileCache {
    tiles: HashMap<TileId, CachedTile>,
    capacity: usize,
    clock: u64,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::with_capacity(MAX_CACHED_TILES)
    }
}

impl TileCache {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            tiles: HashMap::new(),
            capacity,
            clock: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tiles.len()
    }

    fn touch(&mut self, tile_id: TileId, make: impl FnOnce() -> Tile) -> &mut Tile {
        self.clock += 1;
        let cached = self.tiles.entry(tile_id).or_insert_with(|| CachedTile {
            tile: make(),
            last_used: 0,
        });
        cached.last_used = self.clock;
        &mut cached.tile
    }

    /// Starts the download of a tile that was not seen before and uploads finished
    /// downloads to the GPU.
    pub(crate) fn request(&mut self, config: &dyn MapConfig, ctx: &egui::Context, tile_id: TileId) {
        let tile = self.touch(tile_id, || {
            let url = config.tile_url(&tile_id);
            Tile::Loading(Promise::spawn_thread("download_tile", move || {
                download(&url).with_context(|| format!("Failed to download tile from {}", url))
            }))
        });

        if let Tile::Loading(promise) = tile {
            match promise.ready() {
                Some(Ok(image)) => {
                    let texture = ctx.load_texture(
                        format!("tile_{}_{}_{}", tile_id.z, tile_id.x, tile_id.y),
                        image.clone(),
                        Default::default(),
                    );
                    *tile = Tile::Loaded(texture);
                }
                Some(Err(e)) => {
                    error!("{:?}", e);
                    *tile = Tile::Failed;
                }
                None => ctx.request_repaint(),
            }
        }
    }

    /// Drops the least recently requested tiles until at most `capacity` remain. Pending
    /// downloads that are dropped finish in the background and are discarded.
    pub(crate) fn evict(&mut self) {
        if self.tiles.len() <= self.capacity {
            return;
        }
        let mut by_age: Vec<(u64, TileId)> = self
            .tiles
            .iter()
            .map(|(id, cached)| (cached.last_used, *id))
            .collect();
        by_age.sort_unstable_by_key(|(last_used, _)| *last_used);

        let excess = self.tiles.len() - self.capacity;
        for (_, id) in by_age.into_iter().take(excess) {
            self.tiles.remove(&id);
        }
        debug!("Evicted {} tiles from the cache", excess);
    }

    /// Paints a tile with its top left corner at `pos`, or a placeholder while it is not
    /// available.
    pub(crate) fn draw(&self, painter: &Painter, tile_id: &TileId, pos: Pos2) {
        let tile_rect = Rect::from_min_size(pos, Vec2::splat(TILE_SIZE as f32));

        let (marker, color) = match self.tiles.get(tile_id).map(|cached| &cached.tile) {
            Some(Tile::Loaded(texture)) => {
                painter.image(
                    texture.id(),
                    tile_rect,
                    Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
                return;
            }
            Some(Tile::Failed) => ("!", Color32::RED),
            Some(Tile::Loading(_)) | None => ("?", Color32::ORANGE),
        };

        painter.rect_filled(tile_rect, 0.0, Color32::from_gray(220));
        painter.rect_stroke(
            tile_rect,
            0.0,
            Stroke::new(1.0, Color32::GRAY),
            StrokeKind::Inside,
        );
        painter.text(
            tile_rect.center(),
            Align2::CENTER_CENTER,
            marker,
            FontId::proportional(40.0),
            color,
        );
    }
}

/// The tiles covering the widget, with the screen position of their top left corners.
/// Tiles outside the world (when zoomed far out) are skipped.
pub(crate) fn visible_tiles(projection: &MapProjection) -> impl Iterator<Item = (TileId, Pos2)> {
    let rect = projection.widget_rect();
    let (center_x, center_y) = projection.center_tile();
    let zoom = projection.zoom();
    let world_tiles = 1i64 << zoom;

    let half_w = rect.width() as f64 / 2.0 / TILE_SIZE as f64;
    let half_h = rect.height() as f64 / 2.0 / TILE_SIZE as f64;

    let x_range = ((center_x - half_w).floor() as i64).max(0)
        ..=((center_x + half_w).floor() as i64).min(world_tiles - 1);
    let y_range = ((center_y - half_h).floor() as i64).max(0)
        ..=((center_y + half_h).floor() as i64).min(world_tiles - 1);

    let widget_center = rect.center();
    x_range.flat_map(move |x| {
        y_range.clone().map(move |y| {
            let offset = Vec2::new(
                ((x as f64 - center_x) * TILE_SIZE as f64) as f32,
                ((y as f64 - center_y) * TILE_SIZE as f64) as f32,
            );
            let tile_id = TileId {
                z: zoom,
                x: x as u32,
                y: y as u32,
            };
            (tile_id, widget_center + offset)
        })
    })
}
