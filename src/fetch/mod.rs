//! Transport for bus tracker requests.
//!
//! [`HttpClient`] executes raw HTTP requests; [`Transport`] is the seam the
//! client facade talks to, taking an operation name and query parameters and
//! returning the response body.

mod basic;
mod client;
mod transport;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use transport::{API_KEY_PARAM, HttpTransport, Transport};
