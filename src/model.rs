//! Records built from bus tracker responses.
//!
//! Every record is constructed once by the parser and never refers back to
//! the request or client that produced it. `Display` lists each field by
//! label in declaration order; it is meant for inspection, not as a wire
//! format.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::time::{Timestamp, format_timestamp};

/// Direction strings as the API spells them. Lookups must use these exact
/// strings; nothing is normalised.
pub const NORTH_BOUND: &str = "North Bound";
pub const SOUTH_BOUND: &str = "South Bound";
pub const EAST_BOUND: &str = "East Bound";
pub const WEST_BOUND: &str = "West Bound";

/// Renders an optional field, keeping "no value" apart from an empty string.
struct Opt<'a, T>(&'a Option<T>);

impl<T: Display> Display for Opt<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("(none)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub id: u32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for Stop {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stop number: {}", self.id)?;
        writeln!(f, "Stop name: {}", self.name)?;
        writeln!(f, "Latitude: {}", self.latitude)?;
        write!(f, "Longitude: {}", self.longitude)
    }
}

/// A route as listed by `getroutes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub id: String,
    pub name: String,
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Route: {}", self.id)?;
        write!(f, "Route name: {}", self.name)
    }
}

/// A route paired with one of its directions, e.g. `54B` / `North Bound`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteDirection {
    pub route: String,
    pub direction: String,
}

impl RouteDirection {
    pub fn new(route: impl Into<String>, direction: impl Into<String>) -> Self {
        Self { route: route.into(), direction: direction.into() }
    }
}

impl Display for RouteDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Route: {}", self.route)?;
        write!(f, "Direction: {}", self.direction)
    }
}

/// A point-in-time observation of a bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: u32,
    pub route: String,
    /// Only reported by some API versions.
    pub direction: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Feet travelled along the current pattern.
    pub pattern_distance: u32,
    /// When the position was recorded.
    pub timestamp: Timestamp,
    /// Degrees, 0 is north.
    pub heading: u16,
    pub pattern_id: u32,
    pub destination: String,
    pub delayed: bool,
}

impl Display for Vehicle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bus number: {}", self.id)?;
        writeln!(f, "Route: {}", self.route)?;
        writeln!(f, "Direction: {}", Opt(&self.direction))?;
        writeln!(f, "Latitude: {}", self.latitude)?;
        writeln!(f, "Longitude: {}", self.longitude)?;
        writeln!(f, "Distance traveled: {}", self.pattern_distance)?;
        writeln!(f, "Time of update: {}", format_timestamp(&self.timestamp))?;
        writeln!(f, "Heading: {}", self.heading)?;
        writeln!(f, "Pattern ID: {}", self.pattern_id)?;
        writeln!(f, "Destination: {}", self.destination)?;
        write!(f, "Delayed: {}", self.delayed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PredictionKind {
    Arrival,
    Departure,
}

impl PredictionKind {
    /// Maps the API's `typ` code (`A` or `D`).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(Self::Arrival),
            "D" => Some(Self::Departure),
            _ => None,
        }
    }
}

impl Display for PredictionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arrival => f.write_str("Arrival"),
            Self::Departure => f.write_str("Departure"),
        }
    }
}

/// An estimated arrival or departure of one vehicle at one stop.
///
/// `minutes_at_creation` is fixed when the record is parsed: it is the
/// estimate as of `generated_at` and goes stale as time passes. Use
/// [`estimate_minutes_remaining`](crate::estimate::estimate_minutes_remaining)
/// for a value relative to another instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub generated_at: Timestamp,
    pub kind: PredictionKind,
    pub route: String,
    pub direction: String,
    pub destination: String,
    pub stop_id: u32,
    pub stop_name: String,
    pub vehicle_id: u32,
    /// Feet left to travel before reaching the stop.
    pub distance_to_stop: u32,
    pub estimated_arrival: Timestamp,
    pub(crate) minutes_at_creation: i64,
    pub delayed: bool,
}

impl Prediction {
    /// Minutes to arrival as of `generated_at`.
    #[must_use]
    pub const fn minutes_at_creation(&self) -> i64 {
        self.minutes_at_creation
    }

    #[must_use]
    pub fn route_direction(&self) -> RouteDirection {
        RouteDirection::new(self.route.clone(), self.direction.clone())
    }
}

impl Display for Prediction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Prediction generated at: {}", format_timestamp(&self.generated_at))?;
        writeln!(f, "Type: {}", self.kind)?;
        writeln!(f, "Route: {}", self.route)?;
        writeln!(f, "Direction: {}", self.direction)?;
        writeln!(f, "Route destination: {}", self.destination)?;
        writeln!(f, "Stop number: {}", self.stop_id)?;
        writeln!(f, "Stop name: {}", self.stop_name)?;
        writeln!(f, "Vehicle number: {}", self.vehicle_id)?;
        writeln!(f, "Distance away: {}", self.distance_to_stop)?;
        writeln!(f, "Estimated time of arrival: {}", format_timestamp(&self.estimated_arrival))?;
        writeln!(f, "Minutes to arrival (at creation): {}", self.minutes_at_creation)?;
        write!(f, "Delayed: {}", self.delayed)
    }
}

/// A published notice about a disruption or change in service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceBulletin {
    pub name: String,
    pub subject: String,
    /// Free text; frequently contains HTML, which is kept as received.
    pub detail: String,
    pub brief: Option<String>,
    pub priority: String,
    /// Empty when the bulletin applies to the whole system.
    pub affected_services: Vec<AffectedService>,
}

impl Display for ServiceBulletin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Subject: {}", self.subject)?;
        writeln!(f, "Detail: {}", self.detail)?;
        writeln!(f, "Brief: {}", Opt(&self.brief))?;
        write!(f, "Priority: {}", self.priority)?;
        for service in &self.affected_services {
            write!(f, "\n{service}")?;
        }
        Ok(())
    }
}

/// Scope of a bulletin. Any field may be absent, e.g. a bulletin covering a
/// whole route carries no stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffectedService {
    pub route: Option<String>,
    pub direction: Option<String>,
    pub stop_number: Option<String>,
    pub stop_name: Option<String>,
}

impl Display for AffectedService {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Affected route: {}", Opt(&self.route))?;
        writeln!(f, "Affected direction: {}", Opt(&self.direction))?;
        writeln!(f, "Affected stop number: {}", Opt(&self.stop_number))?;
        write!(f, "Affected stop name: {}", Opt(&self.stop_name))
    }
}

/// The ordered geometry of one trip variant along a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    pub id: u32,
    /// Feet.
    pub length: f64,
    pub direction: String,
    pub points: Vec<Point>,
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pattern ID: {}", self.id)?;
        writeln!(f, "Length: {}", self.length)?;
        write!(f, "Direction: {}", self.direction)?;
        for point in &self.points {
            write!(f, "\n{point}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointKind {
    Stop,
    Waypoint,
}

impl PointKind {
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(Self::Stop),
            "W" => Some(Self::Waypoint),
            _ => None,
        }
    }
}

impl Display for PointKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => f.write_str("Stop"),
            Self::Waypoint => f.write_str("Waypoint"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub sequence: u32,
    pub kind: PointKind,
    pub latitude: f64,
    pub longitude: f64,
    pub stop_id: Option<u32>,
    pub stop_name: Option<String>,
    pub pattern_distance: Option<f64>,
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sequence: {}", self.sequence)?;
        writeln!(f, "Point type: {}", self.kind)?;
        writeln!(f, "Latitude: {}", self.latitude)?;
        writeln!(f, "Longitude: {}", self.longitude)?;
        writeln!(f, "Stop number: {}", Opt(&self.stop_id))?;
        writeln!(f, "Stop name: {}", Opt(&self.stop_name))?;
        write!(f, "Pattern distance: {}", Opt(&self.pattern_distance))
    }
}
