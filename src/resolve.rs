use crate::models::{LatLng, Waypoint};
use geo::{Distance, Haversine};
use geo_types::Point;
use itertools::Itertools;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no route between the given points")]
    NoPath,
    #[error("routing request failed: {0}")]
    Transport(String),
}

/// A candidate line through the waypoint sequence, ordered start to end.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPath {
    pub points: Vec<LatLng>,
    pub distance_meters: f64,
}

/// Turns an ordered waypoint sequence into drawable path candidates.
/// Callers take the first candidate; the rest are alternates.
pub trait RoutingBackend {
    async fn resolve(&self, waypoints: &[Waypoint]) -> Result<Vec<ResolvedPath>, ResolveError>;
}

/// Routing over the OSRM v1 HTTP API.
pub struct OsrmRouting {
    base: String,
    client: reqwest::Client,
}

impl OsrmRouting {
    pub fn new(base: impl Into<String>) -> Self {
        OsrmRouting {
            base: base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn request_url(&self, waypoints: &[Waypoint]) -> String {
        // OSRM takes lng,lat pairs
        let coords = waypoints
            .iter()
            .map(|w| format!("{},{}", w.at.lng, w.at.lat))
            .join(";");
        format!(
            "{}/route/v1/driving/{}?alternatives=false&overview=full&geometries=geojson",
            self.base, coords
        )
    }
}

impl RoutingBackend for OsrmRouting {
    async fn resolve(&self, waypoints: &[Waypoint]) -> Result<Vec<ResolvedPath>, ResolveError> {
        if waypoints.len() < 2 {
            return Err(ResolveError::NoPath);
        }
        let url = self.request_url(waypoints);
        debug!("resolving {} waypoints via {}", waypoints.len(), url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Transport(e.to_string()))?;
        let body = response
            .json::<OsrmResponse>()
            .await
            .map_err(|e| ResolveError::Transport(e.to_string()))?;
        paths_from_wire(body)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    #[serde(default)]
    distance: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order, lng before lat.
    coordinates: Vec<[f64; 2]>,
}

fn paths_from_wire(body: OsrmResponse) -> Result<Vec<ResolvedPath>, ResolveError> {
    if body.code != "Ok" {
        return Err(ResolveError::NoPath);
    }
    let paths: Vec<ResolvedPath> = body
        .routes
        .into_iter()
        .map(|route| {
            let points: Vec<LatLng> = route
                .geometry
                .coordinates
                .into_iter()
                .map(|[lng, lat]| LatLng::new(lat, lng))
                .collect();
            // Engines that omit the summary get the polyline length instead.
            let distance_meters = if route.distance > 0.0 {
                route.distance
            } else {
                polyline_meters(&points)
            };
            ResolvedPath {
                points,
                distance_meters,
            }
        })
        .collect();
    if paths.is_empty() {
        return Err(ResolveError::NoPath);
    }
    Ok(paths)
}

/// Haversine length of a polyline, in meters.
fn polyline_meters(points: &[LatLng]) -> f64 {
    points
        .iter()
        .tuple_windows()
        .map(|(a, b)| Haversine.distance(Point::new(a.lng, a.lat), Point::new(b.lng, b.lat)))
        .sum()
}

/// Generation ticket for one resolution request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResolutionTicket {
    generation: u64,
}

impl ResolutionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Keeps late routing responses from clobbering newer editor state.
///
/// Every request takes a ticket; only the ticket with the newest
/// generation is acknowledged. Anything the guard refuses must be
/// discarded without rendering.
#[derive(Debug, Default)]
pub struct ResolutionGuard {
    issued: u64,
}

impl ResolutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> ResolutionTicket {
        self.issued += 1;
        ResolutionTicket {
            generation: self.issued,
        }
    }

    pub fn acknowledge(&self, ticket: ResolutionTicket) -> bool {
        ticket.generation == self.issued
    }

    /// Supersedes every outstanding ticket without issuing a new one.
    /// Run after any mutation that changes what a pending response would
    /// be rendered against.
    pub fn invalidate(&mut self) {
        self.issued += 1;
    }
}
