use geo_types::Coord;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub i64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectionId(pub i64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId(pub i64);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DirectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one drawable direction, the key for colors and overlays.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectionRef {
    pub route: RouteId,
    pub direction: DirectionId,
}

impl DirectionRef {
    pub fn new(route: RouteId, direction: DirectionId) -> Self {
        DirectionRef { route, direction }
    }
}

impl fmt::Display for DirectionRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.route, self.direction)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectionKind {
    #[default]
    Go,
    Return,
}

impl fmt::Display for DirectionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DirectionKind::Go => write!(f, "Go"),
            DirectionKind::Return => write!(f, "Return"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }

    pub fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.lng,
            y: self.lat,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Stop {
    pub fn at(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// A stop created on the map but not persisted yet.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingStop {
    pub name: String,
    pub at: LatLng,
}

/// One entry of the ordered sequence a direction is routed through.
/// Carries the originating stop id when the point came from the catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct Waypoint {
    pub stop_id: Option<StopId>,
    pub name: String,
    pub at: LatLng,
}

impl Waypoint {
    pub fn from_stop(stop: &Stop) -> Self {
        Waypoint {
            stop_id: Some(stop.id),
            name: stop.name.clone(),
            at: stop.at(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub id: DirectionId,
    #[serde(rename = "direction")]
    pub kind: DirectionKind,
    #[serde(default)]
    pub sub_name: String,
    #[serde(rename = "tik_price", default)]
    pub ticket_price: f64,
    #[serde(default)]
    pub distance: f64,
    #[serde(rename = "gpx", default)]
    pub track: Option<String>,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

impl Direction {
    pub fn waypoints(&self) -> Vec<Waypoint> {
        self.stops.iter().map(Waypoint::from_stop).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    #[serde(default)]
    pub bus_type: String,
    #[serde(default)]
    pub directions: Vec<Direction>,
}

impl Route {
    pub fn direction(&self, id: DirectionId) -> Option<&Direction> {
        self.directions.iter().find(|d| d.id == id)
    }
}
