use crate::models::{LatLng, Waypoint};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("document is not well formed: {0}")]
    Syntax(#[from] roxmltree::Error),
    /// `ordinal` is 1-based, matching the point labels shown to operators.
    #[error("track point {ordinal} has an unreadable coordinate")]
    BadCoordinate { ordinal: usize },
    #[error("document contains no track points")]
    Empty,
}

/// Serializes a resolved path as a track document.
///
/// Coordinates are written with the shortest exact representation, so a
/// decode of the produced document yields the same points back.
pub fn encode(name: &str, points: &[LatLng]) -> String {
    let mut doc = String::with_capacity(128 + points.len() * 48);
    doc.push_str("<?xml version=\"1.0\"?>\n");
    doc.push_str("<gpx version=\"1.1\" creator=\"routeloom\">\n");
    doc.push_str("<trk><name>");
    doc.push_str(&escape_text(name));
    doc.push_str("</name><trkseg>\n");
    for point in points {
        doc.push_str(&format!(
            "<trkpt lat=\"{}\" lon=\"{}\"></trkpt>\n",
            point.lat, point.lng
        ));
    }
    doc.push_str("</trkseg></trk>\n");
    doc.push_str("</gpx>\n");
    doc
}

/// Extracts every track point of the document, in document order and at
/// any nesting depth, as waypoints labeled "Stop 1", "Stop 2", ...
pub fn decode(text: &str) -> Result<Vec<Waypoint>, TrackError> {
    let doc = roxmltree::Document::parse(text)?;
    let mut waypoints = Vec::new();
    for node in doc
        .descendants()
        // match on the local name, uploads may carry the topografix namespace
        .filter(|n| n.is_element() && n.tag_name().name() == "trkpt")
    {
        let ordinal = waypoints.len() + 1;
        let lat = read_coord(node.attribute("lat"));
        let lng = read_coord(node.attribute("lon"));
        match (lat, lng) {
            (Some(lat), Some(lng)) => waypoints.push(Waypoint {
                stop_id: None,
                name: format!("Stop {}", ordinal),
                at: LatLng::new(lat, lng),
            }),
            _ => return Err(TrackError::BadCoordinate { ordinal }),
        }
    }
    if waypoints.is_empty() {
        return Err(TrackError::Empty);
    }
    Ok(waypoints)
}

fn read_coord(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
