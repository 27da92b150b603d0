//! Route handler modules.

pub mod artifacts;
pub mod captures;
pub mod event_profiles;
pub mod export;
pub mod health;
pub mod live;
pub mod styles;

use bf_core::{Error, EventId};

/// Parse an event id path segment.
pub(crate) fn parse_event_id(raw: &str) -> Result<EventId, Error> {
    raw.parse()
        .map_err(|_| Error::Validation(format!("invalid event id '{raw}'")))
}
