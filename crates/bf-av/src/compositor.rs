//! Single-photo compositing: resize, optional filter, opt-in branding bands
//! and logo, and a thumbnail derived from the finished image.

use bf_core::config::CompositorConfig;
use bf_core::{BrandingSpec, Error, Result};
use bytes::Bytes;
use chrono::NaiveDate;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

use crate::encode_jpeg;
use crate::filters::PhotoFilter;
use crate::intake::Frame;
use crate::overlay::{color_or, Band, TextRenderer};

const BAND_FILL: [u8; 3] = [0, 0, 0];
const BAND_TEXT: [u8; 3] = [255, 255, 255];
const BAND_OPACITY: f32 = 0.45;
const MIN_BAND_HEIGHT: u32 = 40;
const LOGO_MARGIN: u32 = 4;

/// Output of [`Compositor::compose`].
#[derive(Debug, Clone)]
pub struct ComposedPhoto {
    /// Primary JPEG.
    pub image: Bytes,
    /// JPEG thumbnail, absent if deriving it failed.
    pub thumbnail: Option<Bytes>,
    pub width: u32,
    pub height: u32,
    /// Whether any branding (bands or logo) was actually drawn.
    pub branded: bool,
}

/// Format a date the way it appears in footers.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Height of a branding band for a photo of `height` pixels.
fn band_height(height: u32) -> u32 {
    (height / 10).max(MIN_BAND_HEIGHT).min(height)
}

/// Stamp an encoded logo into the top-right corner, scaled to the band.
fn stamp_logo(photo: &RgbImage, logo: &[u8]) -> Result<RgbImage> {
    let logo = image::load_from_memory(logo)
        .map_err(|e| Error::encoding("logo", format!("not a decodable image: {e}")))?;

    let box_h = band_height(photo.height()).saturating_sub(2 * LOGO_MARGIN).max(1);
    let box_w = (photo.width() / 3).max(1);
    let logo = logo.resize(box_w, box_h, FilterType::Triangle).to_rgba8();

    let mut canvas = DynamicImage::ImageRgb8(photo.clone()).to_rgba8();
    let x = photo.width().saturating_sub(logo.width() + LOGO_MARGIN);
    image::imageops::overlay(&mut canvas, &logo, i64::from(x), i64::from(LOGO_MARGIN));
    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Today's date in the local timezone, formatted for footers.
pub fn today() -> String {
    display_date(chrono::Local::now().date_naive())
}

#[derive(Debug, Clone)]
pub struct Compositor {
    config: CompositorConfig,
    text: TextRenderer,
}

impl Compositor {
    pub fn new(config: CompositorConfig, text: TextRenderer) -> Self {
        Self { config, text }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Fit within the configured bounds, preserving aspect. Never upscales.
    pub fn resize(&self, img: &DynamicImage) -> RgbImage {
        let (w, h) = (img.width(), img.height());
        if w <= self.config.max_width && h <= self.config.max_height {
            return img.to_rgb8();
        }
        img.resize(self.config.max_width, self.config.max_height, FilterType::Lanczos3)
            .to_rgb8()
    }

    /// Resize and encode without any branding or filter.
    pub fn resize_only(&self, frame: &Frame) -> Result<Bytes> {
        let resized = self.resize(&frame.decode()?);
        encode_jpeg(&resized, self.config.jpeg_quality)
    }

    /// Compose a finished photo dated today.
    ///
    /// `logo` is the already-fetched logo image, if the event has one.
    pub fn compose(
        &self,
        frame: &Frame,
        branding: &BrandingSpec,
        filter: Option<PhotoFilter>,
        logo: Option<&[u8]>,
    ) -> Result<ComposedPhoto> {
        self.compose_dated(frame, branding, filter, logo, &today())
    }

    /// Compose a finished photo with an explicit footer date string.
    ///
    /// Decoding and the primary JPEG encode are fatal. Text and logo
    /// failures each leave that piece of branding out; thumbnail failures
    /// leave `thumbnail` empty.
    pub fn compose_dated(
        &self,
        frame: &Frame,
        branding: &BrandingSpec,
        filter: Option<PhotoFilter>,
        logo: Option<&[u8]>,
        date: &str,
    ) -> Result<ComposedPhoto> {
        let mut finished = self.resize(&frame.decode()?);
        if let Some(filter) = filter {
            filter.apply(&mut finished);
        }
        let mut branded = false;

        let bands = self.branding_bands(finished.height(), branding, date);
        if !bands.is_empty() {
            match self.text.draw(&finished, &bands) {
                Ok(drawn) => {
                    finished = drawn;
                    branded = true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Branding overlay failed; using unbranded photo");
                }
            }
        }

        if let Some(logo) = logo {
            match stamp_logo(&finished, logo) {
                Ok(stamped) => {
                    finished = stamped;
                    branded = true;
                }
                Err(e) => tracing::warn!(error = %e, "Logo overlay failed; leaving it out"),
            }
        }

        let image = encode_jpeg(&finished, self.config.jpeg_quality)?;
        let thumbnail = match self.thumbnail(&finished) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(error = %e, "Thumbnail generation failed");
                None
            }
        };

        Ok(ComposedPhoto {
            image,
            thumbnail,
            width: finished.width(),
            height: finished.height(),
            branded,
        })
    }

    /// Bands the branding asks for: top overlay and/or footer.
    pub fn branding_bands(&self, height: u32, branding: &BrandingSpec, date: &str) -> Vec<Band> {
        let visible = branding.visible_branding();
        if visible.is_empty() {
            return Vec::new();
        }

        let band_height = band_height(height);
        let font_size = band_height as f32 * 0.5;
        let fill = color_or(branding.primary_color.as_deref(), BAND_FILL);
        let text_color = color_or(branding.secondary_color.as_deref(), BAND_TEXT);

        let mut bands = Vec::with_capacity(2);
        if visible.overlay {
            bands.push(Band {
                text: branding.overlay_text.clone(),
                y: 0,
                height: band_height,
                fill: Some(fill),
                fill_opacity: BAND_OPACITY,
                text_color,
                font_size,
            });
        }
        if let Some(line) = branding.footer_line(date) {
            bands.push(Band {
                text: line,
                y: height.saturating_sub(band_height),
                height: band_height,
                fill: Some(fill),
                fill_opacity: BAND_OPACITY,
                text_color,
                font_size: font_size * 0.8,
            });
        }
        bands
    }

    /// Aspect-preserving thumbnail at the configured width. Never upscales.
    pub fn thumbnail(&self, img: &RgbImage) -> Result<Bytes> {
        let target_w = self.config.thumbnail_width.max(1);
        let thumb = if img.width() <= target_w {
            img.clone()
        } else {
            let target_h =
                ((img.height() as u64 * target_w as u64) / img.width() as u64).max(1) as u32;
            image::imageops::resize(img, target_w, target_h, FilterType::Triangle)
        };
        encode_jpeg(&thumb, self.config.jpeg_quality)
    }
}
