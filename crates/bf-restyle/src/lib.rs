//! bf-restyle: forwards frames to a generative image model.
//!
//! The [`RestyleGateway`] drives an explicit [`RestyleState`] machine: a
//! model that reports it is still loading is waited for (through an
//! injectable [`Clock`]) and retried up to a fixed attempt ceiling, with a
//! live progress update published before every wait.

pub mod client;
pub mod clock;
pub mod gateway;

pub use client::{ImageModel, InferenceClient, ModelReply};
pub use clock::{Clock, ManualClock, TokioClock};
pub use gateway::{RestyleGateway, RestyleResult, RestyleState};
