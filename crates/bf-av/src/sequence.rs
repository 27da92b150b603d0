//! Animated sequence encoding: frame lists to looping palette GIFs.
//!
//! Every frame is resized to a common width and written as
//! `frame_%03d.png` into a request-scoped [`ScratchDir`]. ffmpeg then builds
//! one palette over all frames and maps each frame onto it with dithering,
//! so colors stay stable across the loop.

use std::path::{Path, PathBuf};

use bf_core::config::SequenceConfig;
use bf_core::{Error, Result};
use bytes::Bytes;
use image::imageops::FilterType;

use crate::command::ToolCommand;
use crate::intake::Frame;
use crate::tools::ToolRegistry;
use crate::workspace::ScratchDir;

/// Shared-palette filter graph.
const PALETTE_FILTER: &str =
    "split[a][b];[a]palettegen=stats_mode=full[p];[b][p]paletteuse=dither=sierra2_4a";

/// How often the animation repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopCount {
    #[default]
    Infinite,
    /// Play this many extra times after the first pass.
    Times(u16),
}

impl LoopCount {
    /// Value for ffmpeg's GIF muxer `-loop` option (0 means forever).
    pub fn ffmpeg_value(&self) -> String {
        match self {
            LoopCount::Infinite => "0".into(),
            LoopCount::Times(0) => "-1".into(),
            LoopCount::Times(n) => n.to_string(),
        }
    }
}

/// Append the reverse of the sequence to itself.
///
/// For `N` input frames the result has `2N` frames and
/// `result[N + i] == frames[N - 1 - i]`.
pub fn boomerang<T: Clone>(frames: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(frames.len() * 2);
    out.extend_from_slice(frames);
    out.extend(frames.iter().rev().cloned());
    out
}

/// Output dimensions for a frame scaled to `width`, with an even height.
pub fn scaled_size(src_w: u32, src_h: u32, width: u32) -> (u32, u32) {
    let h = (src_h as u64 * width as u64 / src_w.max(1) as u64) as u32;
    (width, (h & !1).max(2))
}

#[derive(Debug, Clone)]
pub struct SequenceEncoder {
    ffmpeg: PathBuf,
    config: SequenceConfig,
    scratch_root: Option<PathBuf>,
}

impl SequenceEncoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, config: SequenceConfig) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            config,
            scratch_root: None,
        }
    }

    /// Build from a discovered ffmpeg.
    pub fn from_registry(registry: &ToolRegistry, config: SequenceConfig) -> Result<Self> {
        Ok(Self::new(registry.require("ffmpeg")?, config))
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Looping GIF at the configured GIF frame rate.
    pub async fn encode_gif(&self, frames: &[Frame]) -> Result<Bytes> {
        self.encode(frames, self.config.gif_fps, LoopCount::Infinite)
            .await
    }

    /// Forward-then-reverse loop at the faster boomerang frame rate.
    pub async fn encode_boomerang(&self, frames: &[Frame]) -> Result<Bytes> {
        self.encode(&boomerang(frames), self.config.boomerang_fps, LoopCount::Infinite)
            .await
    }

    /// Encode an ordered frame list into a palette GIF.
    pub async fn encode(&self, frames: &[Frame], fps: u32, looping: LoopCount) -> Result<Bytes> {
        if frames.is_empty() {
            return Err(Error::Validation(
                "an animation needs at least one frame".into(),
            ));
        }
        if fps == 0 {
            return Err(Error::Validation("frame rate must be positive".into()));
        }

        let scratch = match &self.scratch_root {
            Some(root) => ScratchDir::new_in(root, "gif")?,
            None => ScratchDir::new("gif")?,
        };

        let width = self.config.width.max(2);
        let owned = frames.to_vec();
        let dir = scratch.path().to_path_buf();
        tokio::task::spawn_blocking(move || write_frames(&dir, &owned, width))
            .await
            .map_err(|e| Error::Internal(format!("frame resize task failed: {e}")))??;

        let output = scratch.file("out.gif");
        ToolCommand::new(self.ffmpeg.clone())
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .arg("-framerate")
            .arg(fps.to_string())
            .arg("-i")
            .arg(scratch.frame_pattern().to_string_lossy())
            .arg("-filter_complex")
            .arg(PALETTE_FILTER)
            .arg("-loop")
            .arg(looping.ffmpeg_value())
            .arg(output.to_string_lossy())
            .timeout(self.config.timeout())
            .execute()
            .await?;

        let gif = tokio::fs::read(&output)
            .await
            .map_err(|e| Error::encoding("gif", format!("missing encoder output: {e}")))?;

        tracing::debug!(
            frames = frames.len(),
            fps,
            size = gif.len(),
            "Encoded animated sequence"
        );
        Ok(Bytes::from(gif))
    }
}

/// Decode, resize, and write every frame as a numbered PNG.
fn write_frames(dir: &Path, frames: &[Frame], width: u32) -> Result<()> {
    for (i, frame) in frames.iter().enumerate() {
        let img = frame.decode()?;
        let (w, h) = scaled_size(img.width(), img.height(), width);
        let resized = img.resize_exact(w, h, FilterType::Triangle).to_rgb8();
        let path = dir.join(format!("frame_{:03}.png", i + 1));
        resized
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| Error::encoding("gif", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::test_support::{gradient_png, solid_png};

    fn colored_frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(i, solid_png(64, 48, [(i * 40) as u8, 100, 200])))
            .collect()
    }

    #[test]
    fn boomerang_appends_reverse() {
        for n in 1..6 {
            let frames: Vec<usize> = (0..n).collect();
            let out = boomerang(&frames);
            assert_eq!(out.len(), 2 * n);
            let reversed: Vec<usize> = frames.iter().rev().copied().collect();
            for i in 0..n {
                assert_eq!(out[i], frames[i]);
                assert_eq!(out[n + i], reversed[i]);
            }
        }
    }

    #[test]
    fn scaled_height_is_even() {
        assert_eq!(scaled_size(640, 480, 480), (480, 360));
        assert_eq!(scaled_size(100, 75, 480), (480, 360));
        assert_eq!(scaled_size(99, 100, 480).1 % 2, 0);
        assert_eq!(scaled_size(1000, 1, 480), (480, 2));
    }

    #[test]
    fn loop_values() {
        assert_eq!(LoopCount::Infinite.ffmpeg_value(), "0");
        assert_eq!(LoopCount::Times(3).ffmpeg_value(), "3");
        assert_eq!(LoopCount::Times(0).ffmpeg_value(), "-1");
    }

    #[tokio::test]
    async fn empty_frame_list_rejected() {
        let enc = SequenceEncoder::new("ffmpeg", SequenceConfig::default());
        assert!(matches!(
            enc.encode_gif(&[]).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn missing_encoder_cleans_scratch() {
        let root = tempfile::tempdir().unwrap();
        let enc = SequenceEncoder::new("/nonexistent/ffmpeg_xyz", SequenceConfig::default())
            .with_scratch_root(root.path());

        let err = enc.encode_gif(&colored_frames(2)).await.unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failing_encoder_cleans_scratch() {
        let Ok(false_bin) = which::which("false") else {
            return;
        };
        let root = tempfile::tempdir().unwrap();
        let enc = SequenceEncoder::new(false_bin, SequenceConfig::default())
            .with_scratch_root(root.path());

        let err = enc.encode_gif(&colored_frames(3)).await.unwrap_err();
        assert!(matches!(err, Error::Encoding { .. }));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn undecodable_frame_cleans_scratch() {
        let root = tempfile::tempdir().unwrap();
        let enc = SequenceEncoder::new("ffmpeg", SequenceConfig::default())
            .with_scratch_root(root.path());
        let frames = vec![Frame::new(0, bytes::Bytes::from_static(b"nope"))];

        let err = enc.encode_gif(&frames).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn encodes_gif_with_ffmpeg() {
        let Ok(ffmpeg) = which::which("ffmpeg") else {
            return;
        };
        let enc = SequenceEncoder::new(
            ffmpeg,
            SequenceConfig {
                width: 64,
                ..Default::default()
            },
        );
        let frames = vec![
            Frame::new(0, gradient_png(128, 96)),
            Frame::new(1, solid_png(128, 96, [250, 10, 10])),
        ];

        let gif = enc.encode_boomerang(&frames).await.unwrap();
        assert!(gif.starts_with(b"GIF8"));
        let decoded = image::load_from_memory(&gif).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }
}
