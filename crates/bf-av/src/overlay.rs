//! Text bands rendered through an SVG layer.
//!
//! Branding text is placed into SVG markup, rasterized with `resvg`, and
//! alpha-blended over the photo. All text passes through
//! [`escape_markup`] first; colors are formatted from parsed RGB values and
//! never copied verbatim from input.

use std::sync::Arc;

use bf_core::branding::escape_markup;
use bf_core::{Error, Result};
use image::{imageops, DynamicImage, RgbImage, Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};

const FONT_FAMILY: &str = "DejaVu Sans, Liberation Sans, Arial, Helvetica, sans-serif";

/// A horizontal band with centered text.
#[derive(Debug, Clone)]
pub struct Band {
    pub text: String,
    pub y: u32,
    pub height: u32,
    pub fill: Option<[u8; 3]>,
    pub fill_opacity: f32,
    pub text_color: [u8; 3],
    pub font_size: f32,
}

/// Rasterizes text bands. Holds the font database so system fonts are only
/// scanned once per process.
#[derive(Clone)]
pub struct TextRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl TextRenderer {
    /// Load the system fonts.
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "Loaded fonts for text overlays");
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Build the SVG document for a set of bands.
    pub fn svg_for(&self, width: u32, height: u32, bands: &[Band]) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        for band in bands {
            if let Some(fill) = band.fill {
                svg.push_str(&format!(
                    r#"<rect x="0" y="{}" width="{width}" height="{}" fill="{}" fill-opacity="{:.2}"/>"#,
                    band.y,
                    band.height,
                    svg_color(fill),
                    band.fill_opacity.clamp(0.0, 1.0),
                ));
            }
            // Approximate vertical centering; usvg baseline support varies.
            let baseline = band.y as f32 + band.height as f32 / 2.0 + band.font_size * 0.35;
            svg.push_str(&format!(
                r#"<text x="{:.1}" y="{baseline:.1}" font-family="{FONT_FAMILY}" font-size="{:.1}" font-weight="bold" fill="{}" text-anchor="middle">{}</text>"#,
                width as f32 / 2.0,
                band.font_size,
                svg_color(band.text_color),
                escape_markup(band.text.trim()),
            ));
        }
        svg.push_str("</svg>");
        svg
    }

    /// Rasterize bands into a transparent RGBA layer of the given size.
    pub fn render_layer(&self, width: u32, height: u32, bands: &[Band]) -> Result<RgbaImage> {
        let svg = self.svg_for(width, height, bands);
        let options = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Default::default()
        };
        let tree =
            usvg::Tree::from_str(&svg, &options).map_err(|e| Error::encoding("overlay", e))?;

        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| Error::encoding("overlay", format!("invalid layer size {width}x{height}")))?;
        resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        let mut layer = RgbaImage::new(width, height);
        for (dst, src) in layer.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(layer)
    }

    /// Draw bands onto an RGB image.
    pub fn draw(&self, base: &RgbImage, bands: &[Band]) -> Result<RgbImage> {
        let layer = self.render_layer(base.width(), base.height(), bands)?;
        let mut canvas = DynamicImage::ImageRgb8(base.clone()).to_rgba8();
        imageops::overlay(&mut canvas, &layer, 0, 0);
        Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
    }
}

/// Parse `#rrggbb` (or `rrggbb`) into RGB.
pub fn parse_hex_color(input: &str) -> Option<[u8; 3]> {
    let digits = input.trim().trim_start_matches('#');
    if digits.len() != 6 {
        return None;
    }
    let bytes = hex::decode(digits).ok()?;
    Some([bytes[0], bytes[1], bytes[2]])
}

/// Parse an optional branding color, warning on garbage.
pub fn color_or(input: Option<&str>, default: [u8; 3]) -> [u8; 3] {
    match input {
        None => default,
        Some(s) if s.trim().is_empty() => default,
        Some(s) => parse_hex_color(s).unwrap_or_else(|| {
            tracing::warn!(color = s, "Ignoring unparseable branding color");
            default
        }),
    }
}

fn svg_color(rgb: [u8; 3]) -> String {
    format!("#{}", hex::encode(rgb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn band(text: &str) -> Band {
        Band {
            text: text.into(),
            y: 0,
            height: 40,
            fill: Some([0, 0, 0]),
            fill_opacity: 0.5,
            text_color: [255, 255, 255],
            font_size: 20.0,
        }
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex_color("00FF00"), Some([0, 255, 0]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
        assert_eq!(color_or(Some("nope"), [1, 2, 3]), [1, 2, 3]);
        assert_eq!(color_or(None, [1, 2, 3]), [1, 2, 3]);
    }

    #[test]
    fn svg_escapes_untrusted_text() {
        let renderer = TextRenderer {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        };
        let svg = renderer.svg_for(100, 100, &[band("</text><script>x</script>")]);
        assert!(!svg.contains("<script>"));
        assert!(svg.contains("&lt;/text&gt;&lt;script&gt;"));
    }

    #[test]
    fn band_rect_is_drawn() {
        let renderer = TextRenderer {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        };
        let base = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let out = renderer.draw(&base, &[band("hi")]).unwrap();

        // Inside the band the white background is darkened; below it is not.
        assert!(out.get_pixel(2, 38)[0] < 200);
        assert_eq!(out.get_pixel(2, 80), &Rgb([255, 255, 255]));
    }
}
