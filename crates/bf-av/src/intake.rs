//! Frame intake: raw captured stills arriving as base64 or `data:` URLs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bf_core::{Error, Result};
use bytes::Bytes;
use image::DynamicImage;

/// Upper bound on a single decoded frame.
pub const MAX_FRAME_BYTES: usize = 15 * 1024 * 1024;

/// One captured still, as encoded image bytes, with its index in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: usize,
    pub bytes: Bytes,
}

impl Frame {
    pub fn new(index: usize, bytes: impl Into<Bytes>) -> Self {
        Self {
            index,
            bytes: bytes.into(),
        }
    }

    /// Parse a base64 payload, with or without a `data:<mime>;base64,` prefix.
    pub fn from_payload(index: usize, payload: &str) -> Result<Self> {
        let payload = payload.trim();
        let encoded = match payload.strip_prefix("data:") {
            Some(rest) => {
                let (meta, data) = rest.split_once(',').ok_or_else(|| {
                    Error::Validation(format!("frame {index}: malformed data URL"))
                })?;
                if !meta.ends_with(";base64") {
                    return Err(Error::Validation(format!(
                        "frame {index}: data URL must be base64-encoded"
                    )));
                }
                data
            }
            None => payload,
        };

        if encoded.is_empty() {
            return Err(Error::Validation(format!("frame {index} is empty")));
        }

        // Some clients wrap long base64 lines.
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| Error::Validation(format!("frame {index}: invalid base64: {e}")))?;

        if bytes.len() > MAX_FRAME_BYTES {
            return Err(Error::Validation(format!(
                "frame {index} is {} bytes; the limit is {MAX_FRAME_BYTES}",
                bytes.len()
            )));
        }

        Ok(Self::new(index, bytes))
    }

    /// Decode the frame into pixels, applying no orientation changes.
    pub fn decode(&self) -> Result<DynamicImage> {
        image::load_from_memory(&self.bytes).map_err(|e| {
            Error::Validation(format!("frame {} is not a decodable image: {e}", self.index))
        })
    }
}

/// Parse every payload of a request. At least one frame is required.
pub fn frames_from_payloads<S: AsRef<str>>(payloads: &[S]) -> Result<Vec<Frame>> {
    if payloads.is_empty() {
        return Err(Error::Validation("at least one frame is required".into()));
    }
    payloads
        .iter()
        .enumerate()
        .map(|(i, p)| Frame::from_payload(i, p.as_ref()))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// PNG of a solid-color image.
    pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// PNG with a horizontal gradient, so resizes are not trivially uniform.
    pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::solid_png;
    use super::*;

    #[test]
    fn accepts_data_url_and_raw_base64() {
        let png = solid_png(4, 4, [255, 0, 0]);
        let raw = STANDARD.encode(&png);
        let url = format!("data:image/png;base64,{raw}");

        let a = Frame::from_payload(0, &raw).unwrap();
        let b = Frame::from_payload(1, &url).unwrap();
        assert_eq!(a.bytes, b.bytes);
        assert_eq!(b.index, 1);
        assert_eq!(b.decode().unwrap().width(), 4);
    }

    #[test]
    fn wrapped_base64_is_accepted() {
        let png = solid_png(2, 2, [0, 0, 0]);
        let raw = STANDARD.encode(&png);
        let (head, tail) = raw.split_at(raw.len() / 2);
        let wrapped = format!("{head}\n{tail}");
        assert_eq!(Frame::from_payload(0, &wrapped).unwrap().bytes, png);
    }

    #[test]
    fn rejects_bad_payloads() {
        for bad in ["", "   ", "data:image/png,abcd", "data:image/png;base64", "!!!"] {
            let err = Frame::from_payload(0, bad).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "payload {bad:?}");
        }
    }

    #[test]
    fn undecodable_image_is_validation_error() {
        let frame = Frame::new(3, Bytes::from_static(b"not an image"));
        let err = frame.decode().unwrap_err();
        assert!(err.to_string().contains("frame 3"));
    }

    #[test]
    fn empty_payload_list_rejected() {
        let err = frames_from_payloads::<String>(&[]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
