//! Poster rendering: frame/bar variants, logos and score text.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::error::{OverlayError, Result};
use crate::layout::{layout_band, BadgeInput, Rect};
use crate::naming::{backup_previous, poster_output_path};

const TEXT_COLOR: [u8; 3] = [255, 255, 255];

/// Overlay variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Black background with the poster shrunk above the band.
    Frame,
    /// Semi-transparent band over the bottom of the full-size poster.
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub kind: OverlayKind,
    /// Band height as a fraction of the poster height.
    pub height: f32,
    /// Band opacity, 0 to 1. Only used by [`OverlayKind::Bar`].
    pub transparency: f32,
}

/// One logo plus its score text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub logo_path: PathBuf,
    pub text: String,
}

/// A badge with its logo already decoded.
#[derive(Debug, Clone)]
pub struct LoadedBadge {
    pub logo: RgbaImage,
    pub text: String,
}

/// Draws rating badges onto posters.
///
/// Without a font, badges are drawn logo-only.
#[derive(Debug, Default)]
pub struct OverlayRenderer {
    font: Option<fontdue::Font>,
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_bytes(bytes: &[u8]) -> Result<Self> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| OverlayError::Font(e.to_string()))?;
        Ok(Self { font: Some(font) })
    }

    pub fn from_font_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::with_font_bytes(&bytes)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Composite `original` and write `<name>-poster.png` beside it.
    ///
    /// Earlier `-poster.jpeg`/`.jpg` artifacts are backed up first. The
    /// output is written with mode 0644 on unix.
    pub fn compose(&self, original: &Path, style: &OverlayStyle, badges: &[Badge]) -> Result<PathBuf> {
        let output = poster_output_path(original)?;

        let poster = image::open(original)?;
        let loaded = badges
            .iter()
            .map(|b| -> Result<LoadedBadge> {
                Ok(LoadedBadge {
                    logo: image::open(&b.logo_path)?.to_rgba8(),
                    text: b.text.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let canvas = self.render(&poster, style, &loaded);

        backup_previous(&output)?;
        canvas.save_with_format(&output, ImageFormat::Png)?;
        set_mode(&output)?;

        tracing::debug!(
            "Composed {} with {} badge(s)",
            output.display(),
            loaded.len()
        );
        Ok(output)
    }

    /// Render the composited poster in memory.
    pub fn render(&self, poster: &DynamicImage, style: &OverlayStyle, badges: &[LoadedBadge]) -> RgbaImage {
        let (width, height) = (poster.width(), poster.height());
        let band_height = ((height as f32 * style.height).round() as u32).clamp(1, height.max(1));
        let band = Rect::new(0, height.saturating_sub(band_height), width, band_height);

        let mut canvas = match style.kind {
            OverlayKind::Frame => {
                let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
                let scale = 1.0 - style.height;
                let w = ((width as f32 * scale).round() as u32).max(1);
                let h = ((height as f32 * scale).round() as u32).max(1);
                let shrunk = imageops::resize(&poster.to_rgba8(), w, h, FilterType::Lanczos3);
                let x = (width.saturating_sub(w) / 2) as i64;
                imageops::overlay(&mut canvas, &shrunk, x, 0);
                canvas
            }
            OverlayKind::Bar => {
                let mut canvas = poster.to_rgba8();
                let alpha = (style.transparency.clamp(0.0, 1.0) * 255.0).round() as u8;
                let shade = RgbaImage::from_pixel(band.width, band.height, Rgba([0, 0, 0, alpha]));
                imageops::overlay(&mut canvas, &shade, band.x as i64, band.y as i64);
                canvas
            }
        };

        self.draw_badges(&mut canvas, band, badges);
        canvas
    }

    fn draw_badges(&self, canvas: &mut RgbaImage, band: Rect, badges: &[LoadedBadge]) {
        let inputs: Vec<BadgeInput<'_>> = badges
            .iter()
            .map(|b| BadgeInput {
                logo_width: b.logo.width(),
                logo_height: b.logo.height(),
                text: if self.font.is_some() { b.text.as_str() } else { "" },
            })
            .collect();

        let layout = layout_band(band, &inputs, |text, px| self.measure(text, px));

        for (badge, place) in badges.iter().zip(&layout.badges) {
            let logo = imageops::resize(&badge.logo, place.logo.width, place.logo.height, FilterType::Lanczos3);
            imageops::overlay(canvas, &logo, place.logo.x as i64, place.logo.y as i64);

            if let Some(font) = &self.font {
                if layout.font_size >= 1.0 && !badge.text.is_empty() {
                    draw_text(canvas, font, &badge.text, layout.font_size, place.text_x, place.text_center_y);
                }
            }
        }
    }

    fn measure(&self, text: &str, px: f32) -> f32 {
        match &self.font {
            Some(font) => text.chars().map(|c| font.metrics(c, px).advance_width).sum(),
            None => 0.0,
        }
    }
}

/// Draw `text` with its left edge at `x`, vertically centred on `center_y`.
fn draw_text(canvas: &mut RgbaImage, font: &fontdue::Font, text: &str, px: f32, x: f32, center_y: f32) {
    let (ascent, descent) = font
        .horizontal_line_metrics(px)
        .map(|m| (m.ascent, m.descent))
        .unwrap_or((px * 0.8, -px * 0.2));
    let baseline = center_y + (ascent + descent) / 2.0;

    let mut pen = x;
    for ch in text.chars() {
        let (metrics, bitmap) = font.rasterize(ch, px);
        let left = pen.round() as i64 + metrics.xmin as i64;
        let top = baseline.round() as i64 - metrics.height as i64 - metrics.ymin as i64;

        for row in 0..metrics.height {
            for col in 0..metrics.width {
                let coverage = bitmap[row * metrics.width + col];
                if coverage == 0 {
                    continue;
                }
                let (px_x, px_y) = (left + col as i64, top + row as i64);
                if px_x < 0 || px_y < 0 || px_x >= canvas.width() as i64 || px_y >= canvas.height() as i64 {
                    continue;
                }
                blend(canvas.get_pixel_mut(px_x as u32, px_y as u32), coverage);
            }
        }
        pen += metrics.advance_width;
    }
}

fn blend(pixel: &mut Rgba<u8>, coverage: u8) {
    let a = coverage as u32;
    for (channel, fg) in pixel.0.iter_mut().take(3).zip(TEXT_COLOR) {
        *channel = ((fg as u32 * a + *channel as u32 * (255 - a)) / 255) as u8;
    }
    pixel.0[3] = pixel.0[3].max(coverage);
}

#[cfg(unix)]
fn set_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path) -> Result<()> {
    Ok(())
}
