//! Photo strips: up to four frames stacked in a bordered vertical composite.

use bf_core::config::CompositorConfig;
use bf_core::{BrandingSpec, Error, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::compositor::{today, ComposedPhoto, Compositor};
use crate::encode_jpeg;
use crate::intake::Frame;
use crate::overlay::{color_or, Band, TextRenderer};

pub const STRIP_WIDTH: u32 = 600;
pub const PHOTO_HEIGHT: u32 = 400;
pub const PADDING: u32 = 20;
pub const HEADER_HEIGHT: u32 = 80;
pub const FOOTER_HEIGHT: u32 = 70;
/// Frames beyond this count are ignored.
pub const MAX_STRIP_FRAMES: usize = 4;

const DEFAULT_BACKGROUND: [u8; 3] = [255, 255, 255];
const DEFAULT_TEXT: [u8; 3] = [34, 34, 34];

/// Total strip height for `n` frames.
pub fn strip_height(n: u32) -> u32 {
    HEADER_HEIGHT + FOOTER_HEIGHT + PADDING * (n + 1) + PHOTO_HEIGHT * n
}

/// Width available to each photo inside the side padding.
pub fn inner_width() -> u32 {
    STRIP_WIDTH - 2 * PADDING
}

#[derive(Debug, Clone)]
pub struct StripComposer {
    text: TextRenderer,
    thumbnails: Compositor,
}

impl StripComposer {
    pub fn new(config: CompositorConfig, text: TextRenderer) -> Self {
        Self {
            thumbnails: Compositor::new(config, text.clone()),
            text,
        }
    }

    /// Compose a strip dated today.
    pub fn compose(
        &self,
        frames: &[Frame],
        branding: &BrandingSpec,
        event_name: &str,
    ) -> Result<ComposedPhoto> {
        self.compose_dated(frames, branding, event_name, &today())
    }

    /// Compose a strip with an explicit footer date.
    ///
    /// Zero frames is a validation error; extra frames are dropped. Text
    /// rendering failures fall back to the plain bordered composite.
    pub fn compose_dated(
        &self,
        frames: &[Frame],
        branding: &BrandingSpec,
        event_name: &str,
        date: &str,
    ) -> Result<ComposedPhoto> {
        if frames.is_empty() {
            return Err(Error::Validation("a strip needs at least one frame".into()));
        }
        if frames.len() > MAX_STRIP_FRAMES {
            tracing::debug!(
                received = frames.len(),
                "Ignoring frames beyond the strip limit"
            );
        }
        let frames = &frames[..frames.len().min(MAX_STRIP_FRAMES)];
        let n = frames.len() as u32;

        let background = color_or(branding.primary_color.as_deref(), DEFAULT_BACKGROUND);
        let text_color = color_or(branding.secondary_color.as_deref(), DEFAULT_TEXT);
        let height = strip_height(n);
        let mut canvas = RgbImage::from_pixel(STRIP_WIDTH, height, Rgb(background));

        for (i, frame) in frames.iter().enumerate() {
            let photo = frame
                .decode()?
                .resize_to_fill(inner_width(), PHOTO_HEIGHT, FilterType::Lanczos3)
                .to_rgb8();
            let y = HEADER_HEIGHT + PADDING + i as u32 * (PHOTO_HEIGHT + PADDING);
            imageops::replace(&mut canvas, &photo, PADDING as i64, y as i64);
        }

        let bands = strip_bands(height, branding, event_name, date, text_color);
        let finished = match self.text.draw(&canvas, &bands) {
            Ok(drawn) => drawn,
            Err(e) => {
                tracing::warn!(error = %e, "Strip text rendering failed; using plain strip");
                canvas
            }
        };

        let quality = self.thumbnails.config().jpeg_quality;
        let image = encode_jpeg(&finished, quality)?;
        let thumbnail = match self.thumbnails.thumbnail(&finished) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(error = %e, "Strip thumbnail generation failed");
                None
            }
        };

        Ok(ComposedPhoto {
            image,
            thumbnail,
            width: finished.width(),
            height: finished.height(),
            branded: true,
        })
    }
}

fn strip_bands(
    height: u32,
    branding: &BrandingSpec,
    event_name: &str,
    date: &str,
    text_color: [u8; 3],
) -> Vec<Band> {
    let mut bands = Vec::with_capacity(2);
    if !event_name.trim().is_empty() {
        bands.push(Band {
            text: event_name.to_string(),
            y: 0,
            height: HEADER_HEIGHT,
            fill: None,
            fill_opacity: 0.0,
            text_color,
            font_size: 32.0,
        });
    }
    let footer = match branding.footer_text.trim() {
        "" => date.to_string(),
        text => text.to_string(),
    };
    bands.push(Band {
        text: footer,
        y: height - FOOTER_HEIGHT,
        height: FOOTER_HEIGHT,
        fill: None,
        fill_opacity: 0.0,
        text_color,
        font_size: 24.0,
    });
    bands
}
