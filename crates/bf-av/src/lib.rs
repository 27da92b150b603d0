//! bf-av: media generation for captured frames.
//!
//! This crate turns raw captured frames into finished media:
//!
//! - [`intake`]: decode base64 / `data:` URL payloads into [`Frame`]s.
//! - [`compositor`]: resize a single photo, apply an optional [`PhotoFilter`],
//!   and draw opt-in branding bands.
//! - [`strip`]: lay out up to four frames into a bordered photo strip.
//! - [`sequence`]: encode frame lists into looping palette GIFs via ffmpeg,
//!   including the boomerang transform.
//!
//! External tools are located by [`ToolRegistry`] and run through
//! [`ToolCommand`]; intermediate files live in a [`ScratchDir`].

pub mod command;
pub mod compositor;
pub mod filters;
pub mod intake;
pub mod overlay;
pub mod sequence;
pub mod strip;
pub mod tools;
pub mod workspace;

pub use command::{ToolCommand, ToolOutput};
pub use compositor::{ComposedPhoto, Compositor};
pub use filters::PhotoFilter;
pub use intake::Frame;
pub use overlay::TextRenderer;
pub use sequence::{boomerang, LoopCount, SequenceEncoder};
pub use strip::StripComposer;
pub use tools::{ToolInfo, ToolRegistry};
pub use workspace::ScratchDir;

/// Encode an RGB image as JPEG at the given quality.
pub fn encode_jpeg(image: &image::RgbImage, quality: u8) -> bf_core::Result<bytes::Bytes> {
    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    image
        .write_with_encoder(encoder)
        .map_err(|e| bf_core::Error::encoding("jpeg", e))?;
    Ok(bytes::Bytes::from(out))
}
