//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, external tools, the encoders, the AI gateway,
//! the remote fetcher, and bulk export. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::styles::StyleSpec;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub tools: ToolsConfig,
    pub compositor: CompositorConfig,
    pub sequence: SequenceConfig,
    pub restyle: RestyleConfig,
    pub fetch: FetchConfig,
    pub export: ExportConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }
        if !self.server.public_base_url.starts_with("http://")
            && !self.server.public_base_url.starts_with("https://")
        {
            warnings.push(format!(
                "server.public_base_url '{}' is not an http(s) URL; exports will not be able to fetch artifacts",
                self.server.public_base_url
            ));
        }
        if self.server.max_body_bytes < 2 * 1024 * 1024 {
            warnings.push(format!(
                "server.max_body_bytes {} is below 2 MiB; most photo captures will be rejected",
                self.server.max_body_bytes
            ));
        }
        if !(1..=100).contains(&self.compositor.jpeg_quality) {
            warnings.push(format!(
                "compositor.jpeg_quality {} is outside 1..=100",
                self.compositor.jpeg_quality
            ));
        }
        if self.sequence.gif_fps == 0 || self.sequence.boomerang_fps == 0 {
            warnings.push("sequence frame rates must be positive".into());
        }
        if self.restyle.api_token.is_none() {
            warnings.push("restyle.api_token is not set; AI restyle requests will be rejected upstream".into());
        }
        if self.restyle.max_attempts == 0 {
            warnings.push("restyle.max_attempts is 0; every restyle will be unavailable".into());
        }
        if self.fetch.connect_timeout_secs >= self.fetch.response_timeout_secs {
            warnings.push(
                "fetch.connect_timeout_secs should be shorter than fetch.response_timeout_secs".into(),
            );
        }
        if self.export.concurrency == 0 {
            warnings.push("export.concurrency is 0; using 1".into());
        }
        if !(0..=9).contains(&self.export.compression_level) {
            warnings.push(format!(
                "export.compression_level {} is outside 0..=9",
                self.export.compression_level
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Root directory of the local object storage.
    pub media_dir: PathBuf,
    /// Base URL under which `media_dir` is publicly reachable.
    pub public_base_url: String,
    pub static_dir: Option<PathBuf>,
    /// Largest accepted capture request body. Frames arrive base64-encoded,
    /// so a strip of phone photos needs several times the raw frame size.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            db_path: PathBuf::from("/data/boothforge.db"),
            media_dir: PathBuf::from("/data/media"),
            public_base_url: "http://localhost:8080/media".into(),
            static_dir: None,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}

/// Single-photo compositing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
    pub thumbnail_width: u32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            max_width: 1600,
            max_height: 1600,
            jpeg_quality: 90,
            thumbnail_width: 400,
        }
    }
}

/// Animated sequence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub gif_fps: u32,
    pub boomerang_fps: u32,
    pub width: u32,
    pub timeout_secs: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            gif_fps: 4,
            boomerang_fps: 12,
            width: 480,
            timeout_secs: 120,
        }
    }
}

impl SequenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Generative-model gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestyleConfig {
    /// Base URL; the model identifier is appended as a path segment.
    pub endpoint: String,
    pub api_token: Option<String>,
    /// Total attempts before a loading model is reported unavailable.
    pub max_attempts: u32,
    /// Longest side of the image submitted to the model.
    pub model_input_size: u32,
    /// Longest side of the restyled image returned to the booth.
    pub output_size: u32,
    pub request_timeout_secs: u64,
    /// Extra or replacement style presets.
    pub styles: Vec<StyleSpec>,
}

impl Default for RestyleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models".into(),
            api_token: None,
            max_attempts: 3,
            model_input_size: 512,
            output_size: 1024,
            request_timeout_secs: 120,
            styles: Vec::new(),
        }
    }
}

/// Remote artifact fetch settings used by bulk export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    /// Wall-clock deadline for the whole request including the body.
    pub response_timeout_secs: u64,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            response_timeout_secs: 30,
            max_redirects: 3,
        }
    }
}

/// Bulk export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Number of artifact fetches in flight at once.
    pub concurrency: usize,
    /// Deflate level 1..=9; low values favour turnaround over ratio. 0 stores
    /// entries uncompressed.
    pub compression_level: i32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            compression_level: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.fetch.max_redirects, 3);
        assert_eq!(config.restyle.max_attempts, 3);
        assert_eq!(config.export.compression_level, 1);
        assert_eq!(config.server.max_body_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = Config::from_json(r#"{"fetch": {"max_redirects": 1}}"#).unwrap();
        assert_eq!(config.fetch.max_redirects, 1);
        assert_eq!(config.fetch.connect_timeout_secs, 5);
    }

    #[test]
    fn invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(Some(&dir.path().join("absent.json")));
        assert_eq!(config.sequence.gif_fps, 4);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server": {"port": 9000}}"#).unwrap();
        let config = Config::load_or_default(Some(&path));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut config = Config::default();
        assert!(config
            .validate()
            .iter()
            .any(|w| w.contains("api_token")));

        config.restyle.api_token = Some("t".into());
        assert!(config.validate().is_empty());

        config.fetch.connect_timeout_secs = 60;
        config.export.compression_level = 12;
        config.server.max_body_bytes = 1024;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
    }
}
