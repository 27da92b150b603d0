//! Named photo filters for `filtered` artifacts.

use std::fmt;
use std::str::FromStr;

use bf_core::Error;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// A color treatment applied to the resized photo before branding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoFilter {
    Mono,
    Sepia,
    Vivid,
    Cool,
    Warm,
}

impl PhotoFilter {
    pub const ALL: [PhotoFilter; 5] = [
        PhotoFilter::Mono,
        PhotoFilter::Sepia,
        PhotoFilter::Vivid,
        PhotoFilter::Cool,
        PhotoFilter::Warm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mono => "mono",
            Self::Sepia => "sepia",
            Self::Vivid => "vivid",
            Self::Cool => "cool",
            Self::Warm => "warm",
        }
    }

    /// Apply the filter in place.
    pub fn apply(&self, img: &mut RgbImage) {
        for px in img.pixels_mut() {
            *px = self.map_pixel(*px);
        }
    }

    fn map_pixel(&self, Rgb([r, g, b]): Rgb<u8>) -> Rgb<u8> {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        let (nr, ng, nb) = match self {
            Self::Mono => (luma, luma, luma),
            Self::Sepia => (
                0.393 * r + 0.769 * g + 0.189 * b,
                0.349 * r + 0.686 * g + 0.168 * b,
                0.272 * r + 0.534 * g + 0.131 * b,
            ),
            Self::Vivid => {
                // Push channels away from gray, then add mild contrast.
                let sat = 1.4;
                let contrast = |v: f32| (v - 128.0) * 1.1 + 128.0;
                (
                    contrast(luma + (r - luma) * sat),
                    contrast(luma + (g - luma) * sat),
                    contrast(luma + (b - luma) * sat),
                )
            }
            Self::Cool => (r * 0.9, g * 1.0, b * 1.12 + 8.0),
            Self::Warm => (r * 1.1 + 8.0, g * 1.02, b * 0.88),
        };
        Rgb([clamp(nr), clamp(ng), clamp(nb)])
    }
}

fn clamp(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

impl fmt::Display for PhotoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| Error::Validation(format!("unknown filter '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_and_unknown() {
        assert_eq!("Sepia".parse::<PhotoFilter>().unwrap(), PhotoFilter::Sepia);
        assert!(matches!(
            "glitter".parse::<PhotoFilter>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn mono_produces_gray() {
        let mut img = RgbImage::from_pixel(2, 2, Rgb([200, 40, 90]));
        PhotoFilter::Mono.apply(&mut img);
        let Rgb([r, g, b]) = *img.get_pixel(0, 0);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn warm_and_cool_shift_balance() {
        let gray = Rgb([128, 128, 128]);
        let Rgb([wr, _, wb]) = PhotoFilter::Warm.map_pixel(gray);
        let Rgb([cr, _, cb]) = PhotoFilter::Cool.map_pixel(gray);
        assert!(wr > wb);
        assert!(cb > cr);
    }

    #[test]
    fn sepia_saturates_white() {
        assert_eq!(
            PhotoFilter::Sepia.map_pixel(Rgb([255, 255, 255])),
            Rgb([255, 255, 239])
        );
    }
}
