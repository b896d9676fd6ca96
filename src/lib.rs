//! Client for the CTA Bus Tracker API.
//!
//! [`Client`] sends one request per operation through a [`fetch::Transport`]
//! and maps the XML response into [`model`] records via [`parser`].
//! [`estimate`] recomputes arrival minutes for a parsed prediction against a
//! caller-supplied time.

pub mod client;
pub mod config;
pub mod error;
pub mod estimate;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod time;

pub use client::{Client, Clock, PredictionQuery};
pub use config::Config;
pub use error::{Error, Result, TransportError};
pub use estimate::estimate_minutes_remaining;
pub use model::{
    AffectedService, Pattern, Point, PointKind, Prediction, PredictionKind, Route,
    RouteDirection, ServiceBulletin, Stop, Vehicle,
};
pub use time::{Timestamp, format_timestamp, minutes_between, parse_timestamp};
