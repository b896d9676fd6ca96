//! XML response parser for the bus tracker API.
//!
//! Every response is a `<bustime-response>` document whose children are
//! result elements of one shape, possibly mixed with `<error>` elements. The document
//! is first deserialized into loosely typed wire structs in which every leaf
//! is optional, then converted into [`model`](crate::model) records so that
//! each bad value can be reported against the element it came from.

use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{
    AffectedService, Pattern, Point, PointKind, Prediction, PredictionKind, Route,
    ServiceBulletin, Stop, Vehicle,
};
use crate::time::{Timestamp, minutes_between, parse_timestamp_field};

/// Text content of a leaf element. An element that is present but empty
/// yields an empty string, while an absent element leaves the surrounding
/// `Option` as `None`.
#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Document {
    error: Vec<ErrorXml>,
    tm: Option<Text>,
    route: Vec<RouteXml>,
    dir: Vec<Text>,
    stop: Vec<StopXml>,
    ptr: Vec<PatternXml>,
    vehicle: Vec<VehicleXml>,
    prd: Vec<PredictionXml>,
    sb: Vec<BulletinXml>,
}

/// Parameter elements the API echoes back inside `<error>`, in the order
/// they are checked when no explicit `<code>` is given.
const ERROR_PARAMS: [&str; 6] = ["rt", "rtdir", "dir", "stpid", "vid", "pid"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorXml {
    code: Option<Text>,
    msg: Option<Text>,
    rt: Option<Text>,
    rtdir: Option<Text>,
    dir: Option<Text>,
    stpid: Option<Text>,
    vid: Option<Text>,
    pid: Option<Text>,
}

impl ErrorXml {
    fn param(&self, name: &str) -> Option<&Text> {
        match name {
            "rt" => self.rt.as_ref(),
            "rtdir" => self.rtdir.as_ref(),
            "dir" => self.dir.as_ref(),
            "stpid" => self.stpid.as_ref(),
            "vid" => self.vid.as_ref(),
            "pid" => self.pid.as_ref(),
            _ => None,
        }
    }

    fn to_error(&self) -> Error {
        let code = match &self.code {
            Some(code) => code.value.clone(),
            None => ERROR_PARAMS
                .into_iter()
                .find(|name| self.param(name).is_some())
                .unwrap_or_default()
                .to_string(),
        };
        let message = self.msg.as_ref().map(|m| m.value.clone()).unwrap_or_default();
        Error::Api { code, message }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RouteXml {
    rt: Option<Text>,
    rtnm: Option<Text>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StopXml {
    stpid: Option<Text>,
    stpnm: Option<Text>,
    lat: Option<Text>,
    lon: Option<Text>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VehicleXml {
    vid: Option<Text>,
    tmstmp: Option<Text>,
    lat: Option<Text>,
    lon: Option<Text>,
    hdg: Option<Text>,
    pid: Option<Text>,
    pdist: Option<Text>,
    rt: Option<Text>,
    rtdir: Option<Text>,
    des: Option<Text>,
    dly: Option<Text>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PredictionXml {
    tmstmp: Option<Text>,
    typ: Option<Text>,
    stpid: Option<Text>,
    stpnm: Option<Text>,
    vid: Option<Text>,
    dstp: Option<Text>,
    rt: Option<Text>,
    rtdir: Option<Text>,
    des: Option<Text>,
    prdtm: Option<Text>,
    dly: Option<Text>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BulletinXml {
    nm: Option<Text>,
    sbj: Option<Text>,
    dtl: Option<Text>,
    brf: Option<Text>,
    prty: Option<Text>,
    srvc: Vec<ServiceXml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceXml {
    rt: Option<Text>,
    rtdir: Option<Text>,
    stpid: Option<Text>,
    stpnm: Option<Text>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PatternXml {
    pid: Option<Text>,
    ln: Option<Text>,
    rtdir: Option<Text>,
    pt: Vec<PointXml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PointXml {
    seq: Option<Text>,
    typ: Option<Text>,
    stpid: Option<Text>,
    stpnm: Option<Text>,
    pdist: Option<Text>,
    lat: Option<Text>,
    lon: Option<Text>,
}

// Field conversions. None of these substitute a default for bad input.

fn text(field: &str, value: Option<Text>) -> Result<String> {
    value.map(|t| t.value).ok_or_else(|| Error::missing(field))
}

fn optional(value: Option<Text>) -> Option<String> {
    value.map(|t| t.value)
}

fn number<T: FromStr>(field: &str, value: Option<Text>) -> Result<T> {
    let raw = text(field, value)?;
    raw.trim().parse().map_err(|_| Error::malformed(field, &raw))
}

fn optional_number<T: FromStr>(field: &str, value: Option<Text>) -> Result<Option<T>> {
    value.map(|t| number(field, Some(t))).transpose()
}

fn timestamp(field: &str, value: Option<Text>) -> Result<Timestamp> {
    parse_timestamp_field(field, &text(field, value)?)
}

/// The API marks delays by including `dly`; its presence alone sets the flag.
fn flag(value: Option<Text>) -> bool {
    value.is_some()
}

const ROOT: &str = "bustime-response";

/// Fails unless the first element of `xml` is `<bustime-response>`.
///
/// The deserializer ignores the root name, so an HTML error page would
/// otherwise read as a document with no results.
fn check_root(xml: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let name = e.name();
                if name.as_ref() == ROOT.as_bytes() {
                    return Ok(());
                }
                return Err(Error::MalformedResponse(format!(
                    "expected <{ROOT}>, found <{}>",
                    String::from_utf8_lossy(name.as_ref())
                )));
            }
            Ok(Event::Eof) => {
                return Err(Error::MalformedResponse(format!("no <{ROOT}> element")));
            }
            Ok(_) => {}
            Err(err) => {
                return Err(Error::MalformedResponse(format!("failed to read response: {err}")));
            }
        }
    }
}

/// Deserializes a response body and surfaces any API `<error>` element.
///
/// A blank body is the API's no-results case and yields an empty document.
fn read_document(xml: &str) -> Result<Document> {
    if xml.trim().is_empty() {
        return Ok(Document::default());
    }
    check_root(xml)?;
    let doc: Document = quick_xml::de::from_str(xml)?;
    if let Some(err) = doc.error.first() {
        return Err(err.to_error());
    }
    Ok(doc)
}

/// Parses a `gettime` response.
///
/// # Errors
///
/// Returns an error if the body is malformed, reports an API error, or has
/// no `tm` element.
pub fn parse_time(xml: &str) -> Result<Timestamp> {
    let doc = read_document(xml)?;
    timestamp("tm", doc.tm)
}

/// Parses a `getroutes` response.
///
/// # Errors
///
/// Returns an error if the body is malformed or reports an API error.
pub fn parse_routes(xml: &str) -> Result<Vec<Route>> {
    read_document(xml)?
        .route
        .into_iter()
        .map(|r| Ok(Route { id: text("rt", r.rt)?, name: text("rtnm", r.rtnm)? }))
        .collect()
}

/// Parses a `getdirections` response into direction strings, verbatim.
///
/// # Errors
///
/// Returns an error if the body is malformed or reports an API error.
pub fn parse_directions(xml: &str) -> Result<Vec<String>> {
    Ok(read_document(xml)?.dir.into_iter().map(|d| d.value).collect())
}

/// Parses a `getstops` response.
///
/// # Errors
///
/// Returns an error if the body is malformed, reports an API error, or a stop
/// has a missing or non-numeric id or coordinate.
pub fn parse_stops(xml: &str) -> Result<Vec<Stop>> {
    read_document(xml)?
        .stop
        .into_iter()
        .map(|s| {
            Ok(Stop {
                id: number("stpid", s.stpid)?,
                name: text("stpnm", s.stpnm)?,
                latitude: number("lat", s.lat)?,
                longitude: number("lon", s.lon)?,
            })
        })
        .collect()
}

/// Parses a `getvehicles` response.
///
/// # Errors
///
/// Returns an error if the body is malformed, reports an API error, or a
/// vehicle field cannot be converted.
pub fn parse_vehicles(xml: &str) -> Result<Vec<Vehicle>> {
    read_document(xml)?
        .vehicle
        .into_iter()
        .map(|v| {
            Ok(Vehicle {
                id: number("vid", v.vid)?,
                route: text("rt", v.rt)?,
                direction: optional(v.rtdir),
                latitude: number("lat", v.lat)?,
                longitude: number("lon", v.lon)?,
                pattern_distance: number("pdist", v.pdist)?,
                timestamp: timestamp("tmstmp", v.tmstmp)?,
                heading: number("hdg", v.hdg)?,
                pattern_id: number("pid", v.pid)?,
                destination: text("des", v.des)?,
                delayed: flag(v.dly),
            })
        })
        .collect()
}

/// Parses a `getpredictions` response.
///
/// Each prediction's minutes-to-arrival is computed here, once, from its
/// generation time and estimated arrival.
///
/// # Errors
///
/// Returns an error if the body is malformed, reports an API error, or a
/// prediction field cannot be converted.
pub fn parse_predictions(xml: &str) -> Result<Vec<Prediction>> {
    read_document(xml)?
        .prd
        .into_iter()
        .map(|p| {
            let kind_code = text("typ", p.typ)?;
            let kind = PredictionKind::from_code(kind_code.trim())
                .ok_or_else(|| Error::malformed("typ", &kind_code))?;
            let generated_at = timestamp("tmstmp", p.tmstmp)?;
            let estimated_arrival = timestamp("prdtm", p.prdtm)?;

            Ok(Prediction {
                generated_at,
                kind,
                route: text("rt", p.rt)?,
                direction: text("rtdir", p.rtdir)?,
                destination: text("des", p.des)?,
                stop_id: number("stpid", p.stpid)?,
                stop_name: text("stpnm", p.stpnm)?,
                vehicle_id: number("vid", p.vid)?,
                distance_to_stop: number("dstp", p.dstp)?,
                estimated_arrival,
                minutes_at_creation: minutes_between(generated_at, estimated_arrival),
                delayed: flag(p.dly),
            })
        })
        .collect()
}

/// Parses a `getservicebulletins` response.
///
/// `dtl` is kept exactly as delivered, markup included. Absent `brf` and
/// absent affected-service fields are `None`; present but empty ones are
/// `Some("")`.
///
/// # Errors
///
/// Returns an error if the body is malformed, reports an API error, or a
/// required bulletin field is missing.
pub fn parse_bulletins(xml: &str) -> Result<Vec<ServiceBulletin>> {
    read_document(xml)?
        .sb
        .into_iter()
        .map(|b| {
            Ok(ServiceBulletin {
                name: text("nm", b.nm)?,
                subject: text("sbj", b.sbj)?,
                detail: text("dtl", b.dtl)?,
                brief: optional(b.brf),
                priority: text("prty", b.prty)?,
                affected_services: b
                    .srvc
                    .into_iter()
                    .map(|s| AffectedService {
                        route: optional(s.rt),
                        direction: optional(s.rtdir),
                        stop_number: optional(s.stpid),
                        stop_name: optional(s.stpnm),
                    })
                    .collect(),
            })
        })
        .collect()
}

/// Parses a `getpatterns` response.
///
/// # Errors
///
/// Returns an error if the body is malformed, reports an API error, or a
/// pattern or point field cannot be converted.
pub fn parse_patterns(xml: &str) -> Result<Vec<Pattern>> {
    read_document(xml)?
        .ptr
        .into_iter()
        .map(|p| {
            Ok(Pattern {
                id: number("pid", p.pid)?,
                length: number("ln", p.ln)?,
                direction: text("rtdir", p.rtdir)?,
                points: p.pt.into_iter().map(point).collect::<Result<_>>()?,
            })
        })
        .collect()
}

fn point(p: PointXml) -> Result<Point> {
    let kind_code = text("typ", p.typ)?;
    Ok(Point {
        sequence: number("seq", p.seq)?,
        kind: PointKind::from_code(kind_code.trim())
            .ok_or_else(|| Error::malformed("typ", &kind_code))?,
        latitude: number("lat", p.lat)?,
        longitude: number("lon", p.lon)?,
        stop_id: optional_number("stpid", p.stpid)?,
        stop_name: optional(p.stpnm),
        pattern_distance: optional_number("pdist", p.pdist)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOPS: &str = r#"<?xml version="1.0"?>
<bustime-response>
    <stop>
        <stpid>15935</stpid>
        <stpnm>76th Street &amp; Ford City Movie Theatre</stpnm>
        <lat>41.754</lat>
        <lon>-87.741</lon>
    </stop>
    <stop>
        <stpid>15936</stpid>
        <stpnm>76th Street &amp; Cicero</stpnm>
        <lat>41.7545</lat>
        <lon>-87.7415</lon>
    </stop>
</bustime-response>"#;

    #[test]
    fn test_parse_stops_in_document_order() {
        let stops = parse_stops(STOPS).unwrap();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].id, 15935);
        assert_eq!(stops[0].name, "76th Street & Ford City Movie Theatre");
        assert_eq!(stops[0].latitude, 41.754);
        assert_eq!(stops[0].longitude, -87.741);
        assert_eq!(stops[1].id, 15936);
    }

    #[test]
    fn test_empty_result_is_empty_vec() {
        assert!(parse_stops("<bustime-response></bustime-response>").unwrap().is_empty());
        assert!(parse_predictions("<bustime-response/>").unwrap().is_empty());
        assert!(parse_bulletins("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_error_element_is_api_error() {
        let xml = "<bustime-response><error><stpid>456</stpid><msg>No data found for parameter</msg></error></bustime-response>";
        match parse_predictions(xml) {
            Err(Error::Api { code, message }) => {
                assert_eq!(code, "stpid");
                assert_eq!(message, "No data found for parameter");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_code_element_wins() {
        let xml = "<bustime-response><error><code>E101</code><rt>99</rt><msg>Invalid API access key supplied</msg></error></bustime-response>";
        match parse_routes(xml) {
            Err(Error::Api { code, message }) => {
                assert_eq!(code, "E101");
                assert_eq!(message, "Invalid API access key supplied");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_element_suppresses_records() {
        let xml = "<bustime-response><stop><stpid>1</stpid><stpnm>A</stpnm><lat>1</lat><lon>2</lon></stop><error><msg>boom</msg></error></bustime-response>";
        assert!(matches!(parse_stops(xml), Err(Error::Api { .. })));
    }

    #[test]
    fn test_error_between_results_is_api_error() {
        let xml = "<bustime-response>\
            <prd><rt>54B</rt></prd>\
            <error><stpid>2</stpid><msg>No data found for parameter</msg></error>\
            <prd><rt>54B</rt></prd>\
            </bustime-response>";
        match parse_predictions(xml) {
            Err(Error::Api { code, message }) => {
                assert_eq!(code, "stpid");
                assert_eq!(message, "No data found for parameter");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn test_results_split_by_other_elements_keep_order() {
        let xml = "<bustime-response>\
            <stop><stpid>1</stpid><stpnm>A</stpnm><lat>1</lat><lon>2</lon></stop>\
            <notice>ignored</notice>\
            <stop><stpid>2</stpid><stpnm>B</stpnm><lat>3</lat><lon>4</lon></stop>\
            </bustime-response>";
        let ids: Vec<u32> = parse_stops(xml).unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, [1, 2]);
    }

    #[test]
    fn test_foreign_document_is_malformed_response() {
        let html = "<html><body><h1>Service Unavailable</h1></body></html>";
        assert!(matches!(parse_stops(html), Err(Error::MalformedResponse(_))));

        let plain = "Service Unavailable";
        assert!(matches!(parse_routes(plain), Err(Error::MalformedResponse(_))));

        let with_decl = "<?xml version=\"1.0\"?>\n<!-- maintenance -->\n<bustime-response/>";
        assert!(parse_stops(with_decl).unwrap().is_empty());
    }

    #[test]
    fn test_unbalanced_markup_is_malformed_response() {
        let xml = "<bustime-response><stop><stpid>1</stpid></bustime-response>";
        assert!(matches!(parse_stops(xml), Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn test_non_numeric_field_names_the_field() {
        let xml = "<bustime-response><stop><stpid>15935</stpid><stpnm>A</stpnm><lat>north</lat><lon>-87.7</lon></stop></bustime-response>";
        match parse_stops(xml) {
            Err(Error::MalformedField { field, value }) => {
                assert_eq!(field, "lat");
                assert_eq!(value, "north");
            }
            other => panic!("expected malformed field, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_field_is_not_defaulted() {
        let xml = "<bustime-response><stop><stpnm>A</stpnm><lat>1</lat><lon>2</lon></stop></bustime-response>";
        assert!(matches!(parse_stops(xml), Err(Error::MissingField { field }) if field == "stpid"));
    }

    #[test]
    fn test_bad_timestamp_is_malformed_timestamp() {
        let xml = "<bustime-response><tm>yesterday</tm></bustime-response>";
        match parse_time(xml) {
            Err(Error::MalformedTimestamp { field, value }) => {
                assert_eq!(field, "tm");
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected malformed timestamp, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_prediction_time_names_its_field() {
        let xml = "<bustime-response><prd>\
            <tmstmp>20101219 19:25</tmstmp><typ>A</typ><stpid>1</stpid><stpnm>A</stpnm>\
            <vid>1</vid><dstp>1</dstp><rt>1</rt><rtdir>North Bound</rtdir><des>B</des>\
            <prdtm>20101219 19:3</prdtm></prd></bustime-response>";
        assert!(matches!(
            parse_predictions(xml),
            Err(Error::MalformedTimestamp { field, .. }) if field == "prdtm"
        ));
    }

    #[test]
    fn test_parse_time() {
        let xml = "<bustime-response><tm>20100713 14:17:04</tm></bustime-response>";
        let tm = parse_time(xml).unwrap();
        assert_eq!(crate::time::format_timestamp(&tm), "20100713 14:17:04");
    }

    #[test]
    fn test_parse_directions_verbatim() {
        let xml = "<bustime-response><dir>North Bound</dir><dir>South Bound</dir></bustime-response>";
        assert_eq!(parse_directions(xml).unwrap(), ["North Bound", "South Bound"]);
    }

    #[test]
    fn test_parse_routes() {
        let xml = "<bustime-response><route><rt>54B</rt><rtnm>South Cicero</rtnm></route></bustime-response>";
        let routes = parse_routes(xml).unwrap();
        assert_eq!(routes, [Route { id: "54B".into(), name: "South Cicero".into() }]);
    }

    #[test]
    fn test_prediction_frozen_minutes() {
        let xml = "<bustime-response><prd>\
            <tmstmp>20101219 19:25</tmstmp><typ>A</typ><stpid>15935</stpid>\
            <stpnm>76th Street &amp; Ford City Movie Theatre</stpnm><vid>1784</vid>\
            <dstp>3220</dstp><rt>54B</rt><rtdir>North Bound</rtdir>\
            <des>Cicero/Archer Orange Line</des><prdtm>20101219 19:32</prdtm>\
            </prd></bustime-response>";
        let predictions = parse_predictions(xml).unwrap();
        assert_eq!(predictions.len(), 1);
        let p = &predictions[0];
        assert_eq!(p.kind, PredictionKind::Arrival);
        assert_eq!(p.minutes_at_creation(), 7);
        assert!(!p.delayed);
    }

    #[test]
    fn test_any_dly_element_marks_delay() {
        let vehicle = |dly: &str| {
            format!(
                "<bustime-response><vehicle><vid>1784</vid><tmstmp>20101219 19:24:37</tmstmp>\
                 <lat>41.75</lat><lon>-87.74</lon><hdg>358</hdg><pid>954</pid><pdist>2140</pdist>\
                 <rt>54B</rt><des>Cicero</des>{dly}</vehicle></bustime-response>"
            )
        };
        let delayed = |dly: &str| parse_vehicles(&vehicle(dly)).unwrap()[0].delayed;

        assert!(!delayed(""));
        assert!(delayed("<dly>true</dly>"));
        assert!(delayed("<dly/>"));
        assert!(delayed("<dly>false</dly>"));
    }

    #[test]
    fn test_prediction_unknown_type_code() {
        let xml = "<bustime-response><prd>\
            <tmstmp>20101219 19:25</tmstmp><typ>X</typ><stpid>1</stpid><stpnm>A</stpnm>\
            <vid>1</vid><dstp>1</dstp><rt>1</rt><rtdir>North Bound</rtdir><des>B</des>\
            <prdtm>20101219 19:32</prdtm></prd></bustime-response>";
        assert!(matches!(parse_predictions(xml), Err(Error::MalformedField { field, .. }) if field == "typ"));
    }

    #[test]
    fn test_bulletin_brief_absent_versus_empty() {
        let absent = "<bustime-response><sb><nm>a</nm><sbj>s</sbj><dtl>d</dtl><prty>Low</prty></sb></bustime-response>";
        let empty = "<bustime-response><sb><nm>a</nm><sbj>s</sbj><dtl>d</dtl><brf/><prty>Low</prty></sb></bustime-response>";
        assert_eq!(parse_bulletins(absent).unwrap()[0].brief, None);
        assert_eq!(parse_bulletins(empty).unwrap()[0].brief, Some(String::new()));
    }

    #[test]
    fn test_pattern_points() {
        let xml = "<bustime-response><ptr><pid>954</pid><ln>35919.0</ln><rtdir>North Bound</rtdir>\
            <pt><seq>1</seq><typ>S</typ><stpid>15935</stpid><stpnm>76th</stpnm><pdist>0.0</pdist><lat>41.75</lat><lon>-87.74</lon></pt>\
            <pt><seq>2</seq><typ>W</typ><lat>41.76</lat><lon>-87.74</lon></pt>\
            </ptr></bustime-response>";
        let patterns = parse_patterns(xml).unwrap();
        assert_eq!(patterns.len(), 1);
        let pattern = &patterns[0];
        assert_eq!(pattern.id, 954);
        assert_eq!(pattern.length, 35919.0);
        assert_eq!(pattern.points.len(), 2);
        assert_eq!(pattern.points[0].stop_id, Some(15935));
        assert_eq!(pattern.points[1].kind, PointKind::Waypoint);
        assert_eq!(pattern.points[1].stop_id, None);
        assert_eq!(pattern.points[1].pattern_distance, None);
    }
}
