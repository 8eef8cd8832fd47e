use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use bart_rendering::{Color, ImageKey, SceneImage};
use macroquad::{
    math::Vec2 as MacroquadVec2,
    shapes,
    texture::{self, DrawTextureParams, Texture2D},
};
use tracing::warn;

use crate::to_macroquad_color;

/// Lazily populated texture cache keyed by scene artwork.
///
/// Each file is read at most once. A file that cannot be loaded is remembered
/// as missing, reported once, and drawn with a vector stand-in from then on.
#[derive(Debug)]
pub(crate) struct ImageCache {
    root: PathBuf,
    textures: HashMap<ImageKey, Option<Texture2D>>,
}

impl ImageCache {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            root,
            textures: HashMap::new(),
        }
    }

    pub(crate) fn draw(&mut self, image: &SceneImage) {
        match self.texture(image.key) {
            Some(texture) => draw_centered(texture, image),
            None => draw_fallback(image),
        }
    }

    fn texture(&mut self, key: ImageKey) -> Option<Texture2D> {
        let root = &self.root;
        *self.textures.entry(key).or_insert_with(|| {
            let path = root.join(key.file_name());
            match load_texture(&path) {
                Ok(texture) => Some(texture),
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %format!("{error:#}"),
                        "image unavailable; drawing placeholder"
                    );
                    None
                }
            }
        })
    }
}

fn load_texture(path: &Path) -> Result<Texture2D> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read image at {}", path.display()))?;
    let decoded = image::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode image at {}", path.display()))?
        .to_rgba8();
    let width = u16::try_from(decoded.width()).context("image wider than the texture limit")?;
    let height = u16::try_from(decoded.height()).context("image taller than the texture limit")?;
    Ok(Texture2D::from_rgba8(width, height, decoded.as_raw()))
}

fn draw_centered(texture: Texture2D, image: &SceneImage) {
    let top_left = image.center - image.size * 0.5;
    let params = DrawTextureParams {
        dest_size: Some(MacroquadVec2::new(image.size.x, image.size.y)),
        ..DrawTextureParams::default()
    };
    texture::draw_texture_ex(
        texture,
        top_left.x,
        top_left.y,
        macroquad::color::WHITE,
        params,
    );
}

fn draw_fallback(image: &SceneImage) {
    match image.key {
        ImageKey::Balloon { stage, tier } => {
            let fill = Color::for_tier(tier);
            let radius = (40.0 + 8.0 * stage as f32).min(image.size.x * 0.5);
            let knot_y = image.center.y + radius;
            shapes::draw_line(
                image.center.x,
                knot_y,
                image.center.x,
                (image.center.y + image.size.y * 0.5).max(knot_y),
                2.0,
                macroquad::color::DARKGRAY,
            );
            shapes::draw_circle(
                image.center.x,
                image.center.y,
                radius,
                to_macroquad_color(fill),
            );
            shapes::draw_circle(
                image.center.x - radius * 0.35,
                image.center.y - radius * 0.35,
                radius * 0.2,
                to_macroquad_color(fill.lighten(0.6)),
            );
        }
        ImageKey::Bang => {
            let radius = image.size.x.min(image.size.y) * 0.5;
            shapes::draw_poly(
                image.center.x,
                image.center.y,
                12,
                radius,
                0.0,
                to_macroquad_color(Color::from_rgb_u8(0xff, 0xc1, 0x07)),
            );
            shapes::draw_poly(
                image.center.x,
                image.center.y,
                12,
                radius * 0.6,
                15.0,
                to_macroquad_color(Color::RED),
            );
        }
        // The clear colour stands in for a missing backdrop.
        ImageKey::Background(_) => {}
    }
}
