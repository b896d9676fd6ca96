//! Client facade: one method per bus tracker API operation.
//!
//! Each method validates its own parameters, sends exactly one request
//! through the [`Transport`], and hands the body to the matching
//! [`parser`](crate::parser) function. Nothing is cached or retried.

use std::fmt::Display;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result, TransportError};
use crate::fetch::{API_KEY_PARAM, BasicClient, HttpTransport, Transport};
use crate::model::{Pattern, Prediction, Route, ServiceBulletin, Stop, Vehicle};
use crate::parser;
use crate::time::Timestamp;

/// Most identifiers the API accepts in one list parameter.
pub const MAX_ITEMS: usize = 10;

/// Clock drift, in seconds, above which `system_time` warns.
const MAX_CLOCK_DRIFT_SECS: i64 = 5;

/// Where "now" comes from when computing a live arrival estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Ask the API (`gettime`); costs one request.
    Api,
    /// The local clock, read in the configured time zone.
    Local,
}

/// Parameters for `getpredictions`.
///
/// Exactly one of `stop_ids` or `vehicle_ids` must be given. `routes` narrows
/// stop predictions to some routes; `top` caps the number of results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionQuery {
    pub stop_ids: Vec<u32>,
    pub vehicle_ids: Vec<u32>,
    pub routes: Vec<String>,
    pub top: Option<u32>,
}

impl PredictionQuery {
    #[must_use]
    pub fn stops(ids: &[u32]) -> Self {
        Self { stop_ids: ids.to_vec(), ..Self::default() }
    }

    #[must_use]
    pub fn vehicles(ids: &[u32]) -> Self {
        Self { vehicle_ids: ids.to_vec(), ..Self::default() }
    }

    #[must_use]
    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.routes.push(route.into());
        self
    }

    #[must_use]
    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    fn params(&self) -> Result<Vec<(&'static str, String)>> {
        let mut params = match (self.stop_ids.is_empty(), self.vehicle_ids.is_empty()) {
            (true, true) => {
                return Err(Error::InvalidParameters(
                    "at least one stop id or vehicle id is required".into(),
                ));
            }
            (false, false) => {
                return Err(Error::InvalidParameters(
                    "stop ids and vehicle ids cannot be combined".into(),
                ));
            }
            (false, true) => vec![("stpid", join(&self.stop_ids)?)],
            (true, false) => vec![("vid", join(&self.vehicle_ids)?)],
        };

        if !self.routes.is_empty() {
            if self.stop_ids.is_empty() {
                return Err(Error::InvalidParameters(
                    "routes can only narrow stop predictions".into(),
                ));
            }
            params.push(("rt", join(&self.routes)?));
        }
        match self.top {
            Some(0) => return Err(Error::InvalidParameters("top must be at least 1".into())),
            Some(top) => params.push(("top", top.to_string())),
            None => {}
        }
        Ok(params)
    }
}

/// Comma-joins an identifier list after checking its length.
fn join<I: Display>(items: &[I]) -> Result<String> {
    if items.is_empty() || items.len() > MAX_ITEMS {
        return Err(Error::ImproperItemCount { count: items.len() });
    }
    Ok(items.iter().map(ToString::to_string).collect::<Vec<_>>().join(","))
}

fn required(name: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(Error::InvalidParameters(format!("{name} is required")));
    }
    Ok(value.to_string())
}

/// Bus tracker API client.
///
/// Holds no mutable state; it is as safe to share as its transport.
pub struct Client<T> {
    config: Config,
    transport: T,
}

impl Client<HttpTransport<BasicClient>> {
    /// Creates a client that talks HTTP to `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self> {
        let http = BasicClient::new().map_err(TransportError::from)?;
        let transport = HttpTransport::new(http, config.base_url.clone());
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> Client<T> {
    pub const fn new(config: Config, transport: T) -> Self {
        Self { config, transport }
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `operation` with the API key prepended to `params` and parses
    /// the body with `parse`.
    async fn call<R>(
        &self,
        operation: &str,
        params: Vec<(&'static str, String)>,
        parse: fn(&str) -> Result<R>,
    ) -> Result<R> {
        let mut query = Vec::with_capacity(params.len() + 1);
        query.push((API_KEY_PARAM, self.config.api_key.clone()));
        query.extend(params);

        let body = self.transport.fetch(operation, &query).await?;

        let started = Instant::now();
        let parsed = parse(&body);
        info!(
            operation,
            bytes = body.len(),
            elapsed_us = started.elapsed().as_micros(),
            ok = parsed.is_ok(),
            "Response processed"
        );
        parsed
    }

    /// The API's current time, in the agency's zone.
    ///
    /// Logs a warning if it differs from the local clock by more than five
    /// seconds.
    #[tracing::instrument(skip(self))]
    pub async fn system_time(&self) -> Result<Timestamp> {
        let api_time = self.call("gettime", vec![], parser::parse_time).await?;
        let local_time = self.local_now();
        let drift = (local_time - api_time).num_seconds().abs();

        debug!(%api_time, %local_time, drift_secs = drift, "Clock comparison");
        if drift > MAX_CLOCK_DRIFT_SECS {
            warn!(drift_secs = drift, "API clock and local clock differ by more than 5 seconds");
        }
        Ok(api_time)
    }

    /// All routes the API serves.
    #[tracing::instrument(skip(self))]
    pub async fn routes(&self) -> Result<Vec<Route>> {
        self.call("getroutes", vec![], parser::parse_routes).await
    }

    /// Directions `route` runs in, spelled as the API expects them back.
    #[tracing::instrument(skip(self))]
    pub async fn route_directions(&self, route: &str) -> Result<Vec<String>> {
        let params = vec![("rt", required("route", route)?)];
        self.call("getdirections", params, parser::parse_directions).await
    }

    /// Stops served by `route` in `direction`.
    ///
    /// `direction` is sent as given and must match the API's spelling
    /// exactly (e.g. `North Bound`). A mismatch comes back as an empty list
    /// or an API error.
    #[tracing::instrument(skip(self))]
    pub async fn route_stops(&self, route: &str, direction: &str) -> Result<Vec<Stop>> {
        let params = vec![
            ("rt", required("route", route)?),
            ("dir", required("direction", direction)?),
        ];
        self.call("getstops", params, parser::parse_stops).await
    }

    /// Patterns by pattern id.
    #[tracing::instrument(skip(self))]
    pub async fn patterns_by_id(&self, pattern_ids: &[u32]) -> Result<Vec<Pattern>> {
        let params = vec![("pid", join(pattern_ids)?)];
        self.call("getpatterns", params, parser::parse_patterns).await
    }

    /// Patterns for `route` in `direction`. `direction` is not normalised.
    #[tracing::instrument(skip(self))]
    pub async fn route_patterns(&self, route: &str, direction: &str) -> Result<Vec<Pattern>> {
        let params = vec![
            ("rt", required("route", route)?),
            ("dir", required("direction", direction)?),
        ];
        self.call("getpatterns", params, parser::parse_patterns).await
    }

    /// Current positions of the given vehicles.
    #[tracing::instrument(skip(self))]
    pub async fn vehicles_by_id(&self, vehicle_ids: &[u32]) -> Result<Vec<Vehicle>> {
        let params = vec![("vid", join(vehicle_ids)?)];
        self.call("getvehicles", params, parser::parse_vehicles).await
    }

    /// Current positions of all vehicles on the given routes.
    #[tracing::instrument(skip(self))]
    pub async fn vehicles_by_route(&self, routes: &[&str]) -> Result<Vec<Vehicle>> {
        let params = vec![("rt", join(routes)?)];
        self.call("getvehicles", params, parser::parse_vehicles).await
    }

    /// Arrival and departure predictions.
    #[tracing::instrument(skip(self))]
    pub async fn predictions(&self, query: &PredictionQuery) -> Result<Vec<Prediction>> {
        let params = query.params()?;
        self.call("getpredictions", params, parser::parse_predictions).await
    }

    pub async fn predictions_for_stops(&self, stop_ids: &[u32]) -> Result<Vec<Prediction>> {
        self.predictions(&PredictionQuery::stops(stop_ids)).await
    }

    pub async fn predictions_for_vehicles(&self, vehicle_ids: &[u32]) -> Result<Vec<Prediction>> {
        self.predictions(&PredictionQuery::vehicles(vehicle_ids)).await
    }

    /// Service bulletins for the given routes.
    #[tracing::instrument(skip(self))]
    pub async fn bulletins_for_routes(&self, routes: &[&str]) -> Result<Vec<ServiceBulletin>> {
        let params = vec![("rt", join(routes)?)];
        self.call("getservicebulletins", params, parser::parse_bulletins).await
    }

    /// Service bulletins for the given stops.
    #[tracing::instrument(skip(self))]
    pub async fn bulletins_for_stops(&self, stop_ids: &[u32]) -> Result<Vec<ServiceBulletin>> {
        let params = vec![("stpid", join(stop_ids)?)];
        self.call("getservicebulletins", params, parser::parse_bulletins).await
    }

    /// Minutes until `prediction`'s estimated arrival, measured from `clock`.
    ///
    /// The prediction itself is left untouched; see
    /// [`estimate_minutes_remaining`](crate::estimate::estimate_minutes_remaining).
    #[tracing::instrument(
        skip(self, prediction),
        fields(vehicle_id = prediction.vehicle_id, stop_id = prediction.stop_id)
    )]
    pub async fn minutes_until_arrival(
        &self,
        prediction: &Prediction,
        clock: Clock,
    ) -> Result<i64> {
        let now = match clock {
            Clock::Api => self.system_time().await?,
            Clock::Local => self.local_now(),
        };
        Ok(prediction.minutes_remaining(now))
    }

    /// Local wall-clock time in the configured zone.
    fn local_now(&self) -> Timestamp {
        Utc::now().with_timezone(&self.config.timezone).naive_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_bounds() {
        assert_eq!(join(&[1u32, 2, 3]).unwrap(), "1,2,3");
        assert!(matches!(join::<u32>(&[]), Err(Error::ImproperItemCount { count: 0 })));
        let eleven: Vec<u32> = (1..=11).collect();
        assert!(matches!(join(&eleven), Err(Error::ImproperItemCount { count: 11 })));
        let ten: Vec<u32> = (1..=10).collect();
        assert!(join(&ten).is_ok());
    }

    #[test]
    fn test_prediction_query_needs_stop_or_vehicle() {
        let err = PredictionQuery::default().params().unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
    }

    #[test]
    fn test_prediction_query_rejects_both_targets() {
        let query = PredictionQuery { stop_ids: vec![1], vehicle_ids: vec![2], ..Default::default() };
        assert!(matches!(query.params(), Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn test_prediction_query_params() {
        let query = PredictionQuery::stops(&[15935, 15936]).route("54B").top(5);
        assert_eq!(
            query.params().unwrap(),
            [
                ("stpid", "15935,15936".to_string()),
                ("rt", "54B".to_string()),
                ("top", "5".to_string())
            ]
        );
    }

    #[test]
    fn test_prediction_query_route_needs_stops() {
        let query = PredictionQuery::vehicles(&[1784]).route("54B");
        assert!(matches!(query.params(), Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn test_prediction_query_zero_top() {
        let query = PredictionQuery::vehicles(&[1784]).top(0);
        assert!(matches!(query.params(), Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn test_required_rejects_empty() {
        assert!(required("route", "").is_err());
        assert_eq!(required("direction", "North Bound").unwrap(), "North Bound");
    }
}
