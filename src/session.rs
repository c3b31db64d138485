use crate::errors::EditorError;
use crate::models::{
    DirectionId, DirectionKind, DirectionRef, LatLng, PendingStop, Route, RouteId, Stop, StopId,
    Waypoint,
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EditorMode {
    /// Compose or edit a direction's waypoint sequence.
    #[default]
    BuildRoute,
    /// Create, move, rename, and delete stops.
    ManageStops,
}

/// Form fields for the direction being composed. Projected from the
/// catalog on selection, typed in by the operator otherwise.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirectionDraft {
    pub route_name: String,
    pub bus_type: String,
    pub kind: DirectionKind,
    pub sub_name: String,
    pub ticket_price: f64,
    pub distance_km: f64,
}

/// Which map facets an event touched. The reconciler redraws exactly
/// these and nothing else.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Dirty {
    pub catalog: bool,
    pub pending: bool,
    pub waypoints: bool,
}

impl Dirty {
    pub const NONE: Dirty = Dirty {
        catalog: false,
        pending: false,
        waypoints: false,
    };

    pub const ALL: Dirty = Dirty {
        catalog: true,
        pending: true,
        waypoints: true,
    };

    pub fn any(self) -> bool {
        self.catalog || self.pending || self.waypoints
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DraftField {
    RouteName(String),
    BusType(String),
    Kind(DirectionKind),
    SubName(String),
    TicketPrice(f64),
    Distance(f64),
}

/// Normalized input alphabet of the editor. Selector changes, map
/// interaction callbacks, and background completions all arrive here.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    CatalogLoaded { routes: Vec<Route>, stops: Vec<Stop> },
    StopsRefreshed(Vec<Stop>),
    ModeChanged(EditorMode),
    RouteChosen(Option<RouteId>),
    DirectionChosen(Option<DirectionId>),
    DraftEdited(DraftField),
    MapClicked(LatLng),
    StopPicked(StopId),
    StopDragged { id: StopId, to: LatLng },
    PendingDragged { index: usize, to: LatLng },
    PendingRenamed { index: usize, name: String },
    PendingRemoved(usize),
    WaypointRemoved(usize),
    TrackLoaded { waypoints: Vec<Waypoint>, document: String },
}

/// The single mutable owner of everything the editor is working on.
///
/// The catalog is replaced wholesale on load and never edited in place;
/// selection only projects out of it. All mutation goes through
/// [`EditorSession::apply`] or the narrow setters the orchestrator uses
/// to stage resolution results.
#[derive(Debug, Default)]
pub struct EditorSession {
    routes: Vec<Route>,
    stops: Vec<Stop>,
    mode: EditorMode,
    selected_route: Option<RouteId>,
    selected_direction: Option<DirectionId>,
    draft: DirectionDraft,
    waypoints: Vec<Waypoint>,
    pending_stops: Vec<PendingStop>,
    edit_stop: Option<Stop>,
    staged_track: Option<String>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: SessionEvent) -> Dirty {
        match event {
            SessionEvent::CatalogLoaded { routes, stops } => {
                self.routes = routes;
                self.stops = stops;
                self.project_selection();
                Dirty {
                    catalog: true,
                    pending: false,
                    waypoints: true,
                }
            }
            SessionEvent::StopsRefreshed(stops) => {
                self.stops = stops;
                self.pending_stops.clear();
                self.edit_stop = None;
                Dirty {
                    catalog: true,
                    pending: true,
                    waypoints: false,
                }
            }
            SessionEvent::ModeChanged(mode) => {
                self.mode = mode;
                match mode {
                    EditorMode::ManageStops => {
                        self.selected_route = None;
                        self.selected_direction = None;
                        self.clear_working_state();
                    }
                    EditorMode::BuildRoute => {
                        self.pending_stops.clear();
                        self.edit_stop = None;
                    }
                }
                Dirty::ALL
            }
            SessionEvent::RouteChosen(route_id) => {
                self.mode = EditorMode::BuildRoute;
                self.pending_stops.clear();
                self.edit_stop = None;
                self.selected_route = route_id;
                self.selected_direction = route_id
                    .and_then(|id| self.route(id))
                    .and_then(|r| r.directions.first())
                    .map(|d| d.id);
                self.project_selection();
                Dirty::ALL
            }
            SessionEvent::DirectionChosen(direction_id) => {
                if self.selected_route.is_none() {
                    return Dirty::NONE;
                }
                if let Some(id) = direction_id {
                    let known = self
                        .selected_route
                        .and_then(|rid| self.route(rid))
                        .is_some_and(|r| r.direction(id).is_some());
                    // a stale selector can name a direction that is gone
                    if !known {
                        return Dirty::NONE;
                    }
                }
                self.selected_direction = direction_id;
                self.project_selection();
                Dirty {
                    catalog: false,
                    pending: false,
                    waypoints: true,
                }
            }
            SessionEvent::DraftEdited(field) => {
                match field {
                    DraftField::RouteName(v) => self.draft.route_name = v,
                    DraftField::BusType(v) => self.draft.bus_type = v,
                    DraftField::Kind(v) => self.draft.kind = v,
                    DraftField::SubName(v) => self.draft.sub_name = v,
                    DraftField::TicketPrice(v) => self.draft.ticket_price = v,
                    DraftField::Distance(v) => self.draft.distance_km = v,
                }
                Dirty::NONE
            }
            SessionEvent::MapClicked(at) => match self.mode {
                EditorMode::ManageStops => {
                    let name = format!("New Stop {}", self.pending_stops.len() + 1);
                    self.pending_stops.push(PendingStop { name, at });
                    Dirty {
                        catalog: false,
                        pending: true,
                        waypoints: false,
                    }
                }
                EditorMode::BuildRoute => {
                    // free-placed points only while composing a brand new route
                    if self.selected_route.is_some() {
                        return Dirty::NONE;
                    }
                    let name = format!("Stop {}", self.waypoints.len() + 1);
                    self.waypoints.push(Waypoint {
                        stop_id: None,
                        name,
                        at,
                    });
                    self.staged_track = None;
                    Dirty {
                        catalog: false,
                        pending: false,
                        waypoints: true,
                    }
                }
            },
            SessionEvent::StopPicked(stop_id) => match self.mode {
                EditorMode::BuildRoute => {
                    let Some(stop) = self.stop(stop_id) else {
                        return Dirty::NONE;
                    };
                    let waypoint = Waypoint::from_stop(stop);
                    self.waypoints.push(waypoint);
                    self.staged_track = None;
                    Dirty {
                        catalog: false,
                        pending: false,
                        waypoints: true,
                    }
                }
                EditorMode::ManageStops => {
                    self.edit_stop = self.stop(stop_id).cloned();
                    Dirty::NONE
                }
            },
            SessionEvent::StopDragged { id, to } => {
                let Some(stop) = self.stop(id) else {
                    return Dirty::NONE;
                };
                let mut candidate = stop.clone();
                candidate.lat = to.lat;
                candidate.lng = to.lng;
                self.edit_stop = Some(candidate);
                // the marker already sits at the drop point, nothing to redraw
                Dirty::NONE
            }
            SessionEvent::PendingDragged { index, to } => {
                if let Some(pending) = self.pending_stops.get_mut(index) {
                    pending.at = to;
                }
                Dirty::NONE
            }
            SessionEvent::PendingRenamed { index, name } => {
                if let Some(pending) = self.pending_stops.get_mut(index) {
                    pending.name = name;
                    Dirty {
                        catalog: false,
                        pending: true,
                        waypoints: false,
                    }
                } else {
                    Dirty::NONE
                }
            }
            SessionEvent::PendingRemoved(index) => {
                if index >= self.pending_stops.len() {
                    return Dirty::NONE;
                }
                self.pending_stops.remove(index);
                Dirty {
                    catalog: false,
                    pending: true,
                    waypoints: false,
                }
            }
            SessionEvent::WaypointRemoved(index) => {
                if index >= self.waypoints.len() {
                    return Dirty::NONE;
                }
                self.waypoints.remove(index);
                self.staged_track = None;
                Dirty {
                    catalog: false,
                    pending: false,
                    waypoints: true,
                }
            }
            SessionEvent::TrackLoaded {
                waypoints,
                document,
            } => {
                self.waypoints = waypoints;
                self.staged_track = Some(document);
                Dirty {
                    catalog: false,
                    pending: false,
                    waypoints: true,
                }
            }
        }
    }

    /// Re-derives draft, waypoints, and the staged track from the catalog
    /// for the current selection. Pure projection, the catalog itself is
    /// never touched. A selection the catalog no longer contains is
    /// dropped entirely.
    fn project_selection(&mut self) {
        let Some(route_id) = self.selected_route else {
            self.selected_direction = None;
            self.clear_working_state();
            return;
        };
        let Some(route) = self.route(route_id).cloned() else {
            self.selected_route = None;
            self.selected_direction = None;
            self.clear_working_state();
            return;
        };
        match self.selected_direction.and_then(|id| route.direction(id)) {
            Some(direction) => {
                self.draft = DirectionDraft {
                    route_name: route.name.clone(),
                    bus_type: route.bus_type.clone(),
                    kind: direction.kind,
                    sub_name: direction.sub_name.clone(),
                    ticket_price: direction.ticket_price,
                    distance_km: direction.distance,
                };
                self.waypoints = direction.waypoints();
                self.staged_track = direction.track.clone();
            }
            None => {
                self.selected_direction = None;
                self.draft = DirectionDraft {
                    route_name: route.name.clone(),
                    bus_type: route.bus_type.clone(),
                    ..DirectionDraft::default()
                };
                self.waypoints.clear();
                self.staged_track = None;
            }
        }
    }

    fn clear_working_state(&mut self) {
        self.draft = DirectionDraft::default();
        self.waypoints.clear();
        self.staged_track = None;
        self.edit_stop = None;
    }

    /// Gate run before any save of the draft. Failing here means no
    /// backend call is made at all.
    pub fn validate_direction_draft(&self) -> Result<(), EditorError> {
        if self.draft.route_name.trim().is_empty() {
            return Err(EditorError::Validation(
                "route name must not be blank".to_string(),
            ));
        }
        if self.waypoints.len() < 2 {
            return Err(EditorError::Validation(
                "a direction needs at least two stops".to_string(),
            ));
        }
        Ok(())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn route(&self, id: RouteId) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }

    pub fn stop(&self, id: StopId) -> Option<&Stop> {
        self.stops.iter().find(|s| s.id == id)
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn selection(&self) -> (Option<RouteId>, Option<DirectionId>) {
        (self.selected_route, self.selected_direction)
    }

    /// Both halves of the selection, when present.
    pub fn selected(&self) -> Option<DirectionRef> {
        match (self.selected_route, self.selected_direction) {
            (Some(route), Some(direction)) => Some(DirectionRef::new(route, direction)),
            _ => None,
        }
    }

    pub fn draft(&self) -> &DirectionDraft {
        &self.draft
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn pending_stops(&self) -> &[PendingStop] {
        &self.pending_stops
    }

    pub fn edit_stop(&self) -> Option<&Stop> {
        self.edit_stop.as_ref()
    }

    pub fn staged_track(&self) -> Option<&str> {
        self.staged_track.as_deref()
    }

    pub(crate) fn set_staged_track(&mut self, track: Option<String>) {
        self.staged_track = track;
    }

    pub(crate) fn set_distance_km(&mut self, km: f64) {
        self.draft.distance_km = km;
    }
}
