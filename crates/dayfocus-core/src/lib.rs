//! Core types: canonical events, providers, time windows, agenda, tracing

pub mod agenda;
pub mod event;
pub mod provider;
pub mod time;
pub mod tracing;

pub use agenda::Agenda;
pub use event::{CalendarEvent, UNTITLED};
pub use provider::{Provider, UnknownProvider};
pub use time::{TimeWindow, parse_event_time};
pub use crate::tracing::{LogFormat, LogOutput, TracingConfig, TracingError, init_tracing};
