//! Per-event Server-Sent Events.
//!
//! Replays the event's recent updates for late-joining screens, then
//! forwards live ones and sends heartbeats.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use bf_core::events::Envelope;

use super::parse_event_id;
use crate::context::AppContext;
use crate::error::AppError;

/// Number of recent updates replayed on connect.
const REPLAY_LIMIT: usize = 50;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

fn sse_event(envelope: &Envelope) -> Option<Event> {
    let data = serde_json::to_string(envelope).ok()?;
    Some(Event::default().id(envelope.id.to_string()).data(data))
}

/// GET /api/events/{id}/live
pub async fn live_updates(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let event_id = parse_event_id(&id)?;
    ctx.service.event(event_id).await?;

    // Subscribe before reading the backlog so nothing falls in between.
    let mut rx = ctx.event_bus.subscribe();
    let recent = ctx.event_bus.recent_for(event_id, REPLAY_LIMIT);

    let stream = async_stream::stream! {
        let mut last_replayed = None;
        for envelope in recent.into_iter().rev() {
            last_replayed = Some(envelope.timestamp);
            if let Some(event) = sse_event(&envelope) {
                yield Ok(event);
            }
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);

        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(envelope) => {
                            if envelope.event_id != event_id {
                                continue;
                            }
                            if last_replayed.is_some_and(|t| envelope.timestamp <= t) {
                                continue;
                            }
                            if let Some(event) = sse_event(&envelope) {
                                yield Ok(event);
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            tracing::debug!(%event_id, "SSE client lagged by {n} updates");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    yield Ok(Event::default()
                        .event("heartbeat")
                        .data(r#"{"type":"heartbeat"}"#));
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("ping"),
    ))
}
