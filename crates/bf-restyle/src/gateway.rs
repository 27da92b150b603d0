//! Restyle state machine.
//!
//! ```text
//! ATTEMPT(n) --image------------------------> DONE
//! ATTEMPT(n) --loading, n < max-------------> WAIT(n, secs) --sleep--> ATTEMPT(n+1)
//! ATTEMPT(n) --loading, n == max------------> UNAVAILABLE
//! ATTEMPT(n) --anything else----------------> FAILED
//! ```
//!
//! A progress update is published before every wait. Cancellation abandons
//! the current request or wait and no further attempts are made.

use std::sync::Arc;
use std::time::Duration;

use bf_av::{encode_jpeg, Frame};
use bf_core::config::RestyleConfig;
use bf_core::events::LiveUpdate;
use bf_core::ports::LiveChannel;
use bf_core::{Error, EventId, Result, StyleCatalog, StyleChoice, StyleSpec};
use bytes::Bytes;
use image::imageops::FilterType;
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;

use crate::client::{ImageModel, ModelReply};
use crate::clock::Clock;

pub const MIN_WAIT_SECS: u64 = 1;
pub const MAX_WAIT_SECS: u64 = 60;
const JPEG_QUALITY: u8 = 90;

/// Where the gateway is in handling one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RestyleState {
    Attempt(u32),
    Wait { attempt: u32, secs: u64 },
    Done(Bytes),
    Failed(String),
    Unavailable { attempts: u32 },
}

/// Successful restyle.
#[derive(Debug, Clone)]
pub struct RestyleResult {
    /// JPEG at presentation resolution.
    pub image: Bytes,
    pub style: StyleSpec,
    pub attempts: u32,
}

/// Clamp a model's wait estimate into `[MIN_WAIT_SECS, MAX_WAIT_SECS]`.
pub fn clamp_wait(estimated_secs: f64) -> u64 {
    if !estimated_secs.is_finite() {
        return MIN_WAIT_SECS;
    }
    (estimated_secs.ceil().max(0.0) as u64).clamp(MIN_WAIT_SECS, MAX_WAIT_SECS)
}

pub struct RestyleGateway {
    model: Arc<dyn ImageModel>,
    clock: Arc<dyn Clock>,
    live: Arc<dyn LiveChannel>,
    catalog: Arc<StyleCatalog>,
    max_attempts: u32,
    input_size: u32,
    output_size: u32,
}

impl RestyleGateway {
    pub fn new(
        config: &RestyleConfig,
        catalog: Arc<StyleCatalog>,
        model: Arc<dyn ImageModel>,
        clock: Arc<dyn Clock>,
        live: Arc<dyn LiveChannel>,
    ) -> Self {
        Self {
            model,
            clock,
            live,
            catalog,
            max_attempts: config.max_attempts,
            input_size: config.model_input_size.max(1),
            output_size: config.output_size.max(1),
        }
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    /// Look up a named style or pick one uniformly at random.
    pub fn resolve_style(&self, choice: &StyleChoice) -> Result<StyleSpec> {
        match choice {
            StyleChoice::Named(key) => self
                .catalog
                .get(key)
                .cloned()
                .ok_or_else(|| Error::Validation(format!("unknown style '{key}'"))),
            StyleChoice::Random => self
                .catalog
                .all()
                .choose(&mut rand::thread_rng())
                .map(|s| (**s).clone())
                .ok_or_else(|| Error::Validation("no styles are configured".into())),
        }
    }

    /// Restyle one frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an unknown style or undecodable frame.
    /// - [`Error::UpstreamUnavailable`] when the model was still loading on
    ///   the last permitted attempt.
    /// - [`Error::Upstream`] for any other endpoint failure.
    /// - [`Error::Cancelled`] when `cancel` fires first.
    pub async fn restyle(
        &self,
        frame: &Frame,
        choice: &StyleChoice,
        event_id: EventId,
        cancel: &CancellationToken,
    ) -> Result<RestyleResult> {
        let style = self.resolve_style(choice)?;
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let input_size = self.input_size;
        let owned = frame.clone();
        let input = tokio::task::spawn_blocking(move || fit_jpeg(&owned, input_size))
            .await
            .map_err(|e| Error::Internal(format!("restyle resize task failed: {e}")))??;

        tracing::info!(style = %style.key, %event_id, "Starting restyle");

        let mut state = RestyleState::Attempt(1);
        let mut attempts = 0;
        let output = loop {
            state = match state {
                RestyleState::Attempt(_) if self.max_attempts == 0 => {
                    RestyleState::Unavailable { attempts: 0 }
                }
                RestyleState::Attempt(n) => {
                    if cancel.is_cancelled() {
                        return Err(cancelled());
                    }
                    attempts = n;
                    // Cancellation wins over a reply that is ready at the same time.
                    let reply = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(cancelled()),
                        reply = self.model.generate(
                            &style.model,
                            &style.prompt,
                            &style.negative_prompt,
                            input.clone(),
                        ) => reply,
                    };
                    self.next_state(n, reply)
                }
                RestyleState::Wait { attempt, secs } => {
                    tracing::info!(style = %style.key, attempt, secs, "Model loading; waiting");
                    self.live.publish(
                        event_id,
                        LiveUpdate::RestyleWaiting {
                            style: style.name.clone(),
                            estimated_wait_secs: secs,
                            attempt,
                        },
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(cancelled()),
                        _ = self.clock.sleep(Duration::from_secs(secs)) => {}
                    }
                    RestyleState::Attempt(attempt + 1)
                }
                RestyleState::Done(bytes) => break bytes,
                RestyleState::Failed(message) => {
                    tracing::warn!(style = %style.key, attempts, %message, "Restyle failed");
                    return Err(Error::Upstream(message));
                }
                RestyleState::Unavailable { attempts } => {
                    tracing::warn!(style = %style.key, attempts, "Model still loading; giving up");
                    return Err(Error::UpstreamUnavailable(format!(
                        "model for style '{}' is still loading after {attempts} attempts",
                        style.key
                    )));
                }
            };
        };

        let output_size = self.output_size;
        let image = tokio::task::spawn_blocking(move || upscale_result(&output, output_size))
            .await
            .map_err(|e| Error::Internal(format!("restyle resize task failed: {e}")))??;

        Ok(RestyleResult {
            image,
            style,
            attempts,
        })
    }

    fn next_state(&self, attempt: u32, reply: ModelReply) -> RestyleState {
        match reply {
            ModelReply::Image(bytes) => RestyleState::Done(bytes),
            ModelReply::Loading { estimated_secs } if attempt < self.max_attempts => {
                RestyleState::Wait {
                    attempt,
                    secs: clamp_wait(estimated_secs),
                }
            }
            ModelReply::Loading { .. } => RestyleState::Unavailable { attempts: attempt },
            ModelReply::Failed { message, .. } => RestyleState::Failed(message),
        }
    }
}

fn cancelled() -> Error {
    Error::Cancelled("restyle abandoned by client".into())
}

/// Fit a frame within `size`x`size` (never upscaling) and encode as JPEG.
fn fit_jpeg(frame: &Frame, size: u32) -> Result<Bytes> {
    let img = frame.decode()?;
    let fitted = if img.width() <= size && img.height() <= size {
        img
    } else {
        img.resize(size, size, FilterType::Lanczos3)
    };
    encode_jpeg(&fitted.to_rgb8(), JPEG_QUALITY)
}

/// Scale the model output so its longest side equals `size`.
fn upscale_result(bytes: &Bytes, size: u32) -> Result<Bytes> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::Upstream(format!("model returned an undecodable image: {e}")))?;
    let scaled = img.resize(size, size, FilterType::Lanczos3);
    encode_jpeg(&scaled.to_rgb8(), JPEG_QUALITY)
}
