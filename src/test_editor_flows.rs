use crate::backend::{DirectionPayload, RoutePayload, StopPayload, TransitBackend};
use crate::curator::{BROWSE_ZOOM, Confirm, Curator, EDIT_ZOOM, MAP_CENTER, Resolution};
use crate::errors::EditorError;
use crate::geocode::PlaceHit;
use crate::models::{
    Direction, DirectionId, DirectionKind, DirectionRef, LatLng, Route, RouteId, Stop, StopId,
    Waypoint,
};
use crate::palette::LINE_PALETTE;
use crate::resolve::{ResolveError, ResolvedPath, RoutingBackend};
use crate::session::{DraftField, EditorMode, SessionEvent};
use crate::surface::MapLayer;
use crate::surface::testing::RecordingSurface;
use crate::track::{self, TrackError};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// In-memory stand-in for the catalog service. Counts every call so
/// tests can prove an operation never reached the backend.
#[derive(Default)]
struct MemoryBackend {
    routes: RefCell<Vec<Route>>,
    stops: RefCell<Vec<Stop>>,
    calls: Cell<usize>,
    next_id: Cell<i64>,
    failure: RefCell<Option<EditorError>>,
}

impl MemoryBackend {
    fn with_catalog(routes: Vec<Route>, stops: Vec<Stop>) -> Self {
        let backend = MemoryBackend::default();
        backend.next_id.set(100);
        *backend.routes.borrow_mut() = routes;
        *backend.stops.borrow_mut() = stops;
        backend
    }

    fn fail_next(&self, err: EditorError) {
        *self.failure.borrow_mut() = Some(err);
    }

    fn tick(&self) -> Result<(), EditorError> {
        self.calls.set(self.calls.get() + 1);
        match self.failure.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn alloc(&self) -> i64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn materialize(&self, payload: DirectionPayload) -> Direction {
        Direction {
            id: DirectionId(self.alloc()),
            kind: payload.kind,
            sub_name: payload.sub_name,
            ticket_price: payload.ticket_price,
            distance: payload.distance,
            track: payload.track,
            stops: payload
                .stops
                .into_iter()
                .map(|s| Stop {
                    id: StopId(self.alloc()),
                    name: s.name,
                    lat: s.lat,
                    lng: s.lng,
                })
                .collect(),
        }
    }

    fn not_found(what: &str) -> EditorError {
        EditorError::Persistence {
            status: Some(404),
            detail: format!("{} not found", what),
        }
    }
}

impl TransitBackend for MemoryBackend {
    async fn list_routes(&self) -> Result<Vec<Route>, EditorError> {
        self.tick()?;
        Ok(self.routes.borrow().clone())
    }

    async fn create_route(&self, route: RoutePayload) -> Result<Route, EditorError> {
        self.tick()?;
        let created = Route {
            id: RouteId(self.alloc()),
            name: route.name,
            bus_type: route.bus_type,
            directions: route
                .directions
                .into_iter()
                .map(|d| self.materialize(d))
                .collect(),
        };
        self.routes.borrow_mut().push(created.clone());
        Ok(created)
    }

    async fn update_direction(
        &self,
        route: RouteId,
        direction: DirectionId,
        payload: DirectionPayload,
    ) -> Result<(), EditorError> {
        self.tick()?;
        let mut materialized = self.materialize(payload);
        materialized.id = direction;
        let mut routes = self.routes.borrow_mut();
        let slot = routes
            .iter_mut()
            .find(|r| r.id == route)
            .and_then(|r| r.directions.iter_mut().find(|d| d.id == direction))
            .ok_or_else(|| Self::not_found("direction"))?;
        *slot = materialized;
        Ok(())
    }

    async fn delete_direction(
        &self,
        route: RouteId,
        direction: DirectionId,
    ) -> Result<(), EditorError> {
        self.tick()?;
        let mut routes = self.routes.borrow_mut();
        let entry = routes
            .iter_mut()
            .find(|r| r.id == route)
            .ok_or_else(|| Self::not_found("route"))?;
        let before = entry.directions.len();
        entry.directions.retain(|d| d.id != direction);
        if entry.directions.len() == before {
            return Err(Self::not_found("direction"));
        }
        routes.retain(|r| !r.directions.is_empty());
        Ok(())
    }

    async fn list_stops(&self) -> Result<Vec<Stop>, EditorError> {
        self.tick()?;
        Ok(self.stops.borrow().clone())
    }

    async fn create_stops(&self, stops: Vec<StopPayload>) -> Result<(), EditorError> {
        self.tick()?;
        let mut stored = self.stops.borrow_mut();
        for stop in stops {
            stored.push(Stop {
                id: StopId(self.alloc()),
                name: stop.name,
                lat: stop.lat,
                lng: stop.lng,
            });
        }
        Ok(())
    }

    async fn update_stop(&self, id: StopId, stop: StopPayload) -> Result<(), EditorError> {
        self.tick()?;
        let mut stops = self.stops.borrow_mut();
        let slot = stops
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Self::not_found("stop"))?;
        slot.name = stop.name;
        slot.lat = stop.lat;
        slot.lng = stop.lng;
        Ok(())
    }

    async fn delete_stop(&self, id: StopId) -> Result<(), EditorError> {
        self.tick()?;
        let routes = self.routes.borrow();
        if let Some(user) = routes
            .iter()
            .find(|r| r.directions.iter().any(|d| d.stops.iter().any(|s| s.id == id)))
        {
            return Err(EditorError::Persistence {
                status: Some(409),
                detail: format!("stop is used by route {}", user.name),
            });
        }
        drop(routes);
        self.stops.borrow_mut().retain(|s| s.id != id);
        Ok(())
    }
}

/// Routing double fed from a script. Responses come back in push order;
/// an exhausted script answers "no path".
#[derive(Default)]
struct ScriptedRouter {
    script: RefCell<VecDeque<Result<Vec<ResolvedPath>, ResolveError>>>,
    asked: RefCell<Vec<Vec<Waypoint>>>,
}

impl ScriptedRouter {
    fn push_path(&self, points: Vec<LatLng>, distance_meters: f64) {
        self.script.borrow_mut().push_back(Ok(vec![ResolvedPath {
            points,
            distance_meters,
        }]));
    }

    fn push_no_path(&self) {
        self.script
            .borrow_mut()
            .push_back(Err(ResolveError::NoPath));
    }
}

impl RoutingBackend for ScriptedRouter {
    async fn resolve(&self, waypoints: &[Waypoint]) -> Result<Vec<ResolvedPath>, ResolveError> {
        self.asked.borrow_mut().push(waypoints.to_vec());
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ResolveError::NoPath))
    }
}

type TestCurator = Curator<MemoryBackend, ScriptedRouter, RecordingSurface>;

fn curator_over(routes: Vec<Route>, stops: Vec<Stop>) -> TestCurator {
    Curator::new(
        MemoryBackend::with_catalog(routes, stops),
        ScriptedRouter::default(),
        RecordingSurface::new(),
    )
}

fn stop(id: i64, name: &str, lat: f64, lng: f64) -> Stop {
    Stop {
        id: StopId(id),
        name: name.to_string(),
        lat,
        lng,
    }
}

/// Route "12" with a saved Go direction riding through two stops.
fn seeded_catalog() -> (Vec<Route>, Vec<Stop>) {
    let stops = vec![
        stop(1, "Gate", 33.5138, 36.2765),
        stop(2, "Square", 33.52, 36.28),
    ];
    let go_track = track::encode(
        "12",
        &[LatLng::new(33.5138, 36.2765), LatLng::new(33.52, 36.28)],
    );
    let routes = vec![Route {
        id: RouteId(4),
        name: "12".to_string(),
        bus_type: "minibus".to_string(),
        directions: vec![
            Direction {
                id: DirectionId(9),
                kind: DirectionKind::Go,
                sub_name: "via old town".to_string(),
                ticket_price: 500.0,
                distance: 7.25,
                track: Some(go_track),
                stops: stops.clone(),
            },
            // saved stops-only, the resolver never found a line for it
            Direction {
                id: DirectionId(10),
                kind: DirectionKind::Return,
                sub_name: String::new(),
                ticket_price: 500.0,
                distance: 0.0,
                track: None,
                stops: vec![stops[1].clone(), stops[0].clone()],
            },
        ],
    }];
    (routes, stops)
}

#[tokio::test]
async fn test_create_route_then_reselect() {
    let mut curator = curator_over(Vec::new(), Vec::new());
    curator.start(EDIT_ZOOM).await.unwrap();

    curator.handle(SessionEvent::DraftEdited(DraftField::RouteName(
        "12".to_string(),
    )));
    curator.handle(SessionEvent::DraftEdited(DraftField::BusType(
        "minibus".to_string(),
    )));
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.51, 36.27)));
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.52, 36.28)));

    curator.routing().push_path(
        vec![
            LatLng::new(33.51, 36.27),
            LatLng::new(33.515, 36.275),
            LatLng::new(33.52, 36.28),
        ],
        1500.0,
    );
    let outcome = curator.resolve_now().await.unwrap();
    assert_eq!(outcome, Resolution::Applied { distance_km: 1.5 });
    assert_eq!(curator.session().draft().distance_km, 1.5);
    assert!(curator.session().staged_track().is_some());
    assert_eq!(curator.surface().path_count(), 1);

    curator.save_direction().await.unwrap();

    // a successful create refetches the catalog and opens a fresh slate
    assert_eq!(curator.session().selection(), (None, None));
    assert!(curator.session().waypoints().is_empty());
    assert!(curator.session().draft().route_name.is_empty());
    let saved = &curator.session().routes()[0];
    assert_eq!(saved.name, "12");
    assert_eq!(saved.directions.len(), 1);
    assert_eq!(saved.directions[0].distance, 1.5);
    assert_eq!(saved.directions[0].stops.len(), 2);

    // selecting it again projects the same data back out of the catalog
    let route_id = saved.id;
    curator.handle(SessionEvent::RouteChosen(Some(route_id)));
    assert_eq!(curator.session().draft().route_name, "12");
    assert_eq!(curator.session().draft().kind, DirectionKind::Go);
    assert_eq!(curator.session().waypoints().len(), 2);
    assert_eq!(curator.session().waypoints()[0].name, "Stop 1");
    assert!(curator.session().staged_track().is_some());
    assert_eq!(curator.surface().marker_count(MapLayer::Active), 2);
}

#[tokio::test]
async fn test_short_draft_never_reaches_backend() {
    let mut curator = curator_over(Vec::new(), Vec::new());
    curator.start(EDIT_ZOOM).await.unwrap();
    let baseline = curator.backend().calls.get();

    curator.handle(SessionEvent::DraftEdited(DraftField::RouteName(
        "7".to_string(),
    )));
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.51, 36.27)));

    let err = curator.save_direction().await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(curator.backend().calls.get(), baseline);

    // a blank name is refused the same way
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.52, 36.28)));
    curator.handle(SessionEvent::DraftEdited(DraftField::RouteName(
        "  ".to_string(),
    )));
    let err = curator.save_direction().await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(curator.backend().calls.get(), baseline);
}

#[tokio::test]
async fn test_empty_track_upload_changes_nothing() {
    let (routes, stops) = seeded_catalog();
    let mut curator = curator_over(routes, stops);
    curator.start(EDIT_ZOOM).await.unwrap();
    curator.handle(SessionEvent::RouteChosen(Some(RouteId(4))));
    let before: Vec<Waypoint> = curator.session().waypoints().to_vec();
    let staged_before = curator.session().staged_track().map(str::to_string);

    let err = curator
        .upload_track("<gpx><trk><trkseg></trkseg></trk></gpx>")
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::MalformedTrack(TrackError::Empty)
    ));
    assert_eq!(curator.session().waypoints(), &before[..]);
    assert_eq!(
        curator.session().staged_track(),
        staged_before.as_deref()
    );
}

#[tokio::test]
async fn test_track_upload_replaces_sequence_and_reresolves() {
    let mut curator = curator_over(Vec::new(), Vec::new());
    curator.start(EDIT_ZOOM).await.unwrap();

    let doc = track::encode(
        "field survey",
        &[LatLng::new(33.50, 36.25), LatLng::new(33.55, 36.30)],
    );
    curator.upload_track(&doc).unwrap();
    assert_eq!(curator.session().waypoints().len(), 2);
    assert_eq!(curator.session().waypoints()[1].name, "Stop 2");
    assert_eq!(curator.session().staged_track(), Some(doc.as_str()));

    // the fresh sequence goes straight back through the resolver
    curator.routing().push_path(
        vec![LatLng::new(33.50, 36.25), LatLng::new(33.55, 36.30)],
        5200.0,
    );
    let outcome = curator.resolve_now().await.unwrap();
    assert_eq!(outcome, Resolution::Applied { distance_km: 5.2 });
    assert_eq!(curator.routing().asked.borrow().len(), 1);
    assert_ne!(curator.session().staged_track(), Some(doc.as_str()));
}

#[tokio::test]
async fn test_in_use_stop_delete_is_refused() {
    let (routes, stops) = seeded_catalog();
    let mut curator = curator_over(routes, stops);
    curator.start(EDIT_ZOOM).await.unwrap();
    curator.handle(SessionEvent::ModeChanged(EditorMode::ManageStops));
    curator.handle(SessionEvent::StopPicked(StopId(1)));

    let err = curator.delete_stop(Confirm::Yes).await.unwrap_err();
    match err {
        EditorError::Persistence { status, detail } => {
            assert_eq!(status, Some(409));
            assert!(detail.contains("used by route 12"), "got: {}", detail);
        }
        other => panic!("expected persistence refusal, got {:?}", other),
    }
    // the stop survives, on the map and in the catalog
    assert_eq!(curator.session().stops().len(), 2);
    assert_eq!(curator.surface().marker_count(MapLayer::Catalog), 2);
}

#[tokio::test]
async fn test_stale_resolution_is_discarded() {
    let mut curator = curator_over(Vec::new(), Vec::new());
    curator.start(EDIT_ZOOM).await.unwrap();

    curator.handle(SessionEvent::MapClicked(LatLng::new(33.51, 36.27)));
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.52, 36.28)));
    let first = curator.take_resolution_request().unwrap();

    // the operator keeps editing while the first request is in flight
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.53, 36.29)));
    let second = curator.take_resolution_request().unwrap();
    assert_eq!(second.waypoints.len(), 3);

    let late = vec![ResolvedPath {
        points: vec![LatLng::new(33.51, 36.27), LatLng::new(33.52, 36.28)],
        distance_meters: 900.0,
    }];
    let outcome = curator.complete_resolution(first.ticket, Ok(late)).unwrap();
    assert_eq!(outcome, Resolution::Superseded);
    assert_eq!(curator.surface().path_count(), 0);
    assert!(curator.session().staged_track().is_none());

    let fresh = vec![ResolvedPath {
        points: vec![
            LatLng::new(33.51, 36.27),
            LatLng::new(33.52, 36.28),
            LatLng::new(33.53, 36.29),
        ],
        distance_meters: 2100.0,
    }];
    let outcome = curator
        .complete_resolution(second.ticket, Ok(fresh.clone()))
        .unwrap();
    assert_eq!(outcome, Resolution::Applied { distance_km: 2.1 });
    assert_eq!(curator.surface().path_count(), 1);
    assert_eq!(curator.surface().paths[0].1.points, fresh[0].points);
}

#[tokio::test]
async fn test_no_path_keeps_markers_and_clears_track() {
    let mut curator = curator_over(Vec::new(), Vec::new());
    curator.start(EDIT_ZOOM).await.unwrap();
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.51, 36.27)));
    curator.handle(SessionEvent::MapClicked(LatLng::new(-12.04, -77.04)));

    curator.routing().push_no_path();
    let err = curator.resolve_now().await.unwrap_err();
    assert!(matches!(err, EditorError::NoPathFound));
    assert_eq!(curator.surface().marker_count(MapLayer::Active), 2);
    assert_eq!(curator.surface().path_count(), 0);
    assert!(curator.session().staged_track().is_none());
}

#[tokio::test]
async fn test_overlay_toggle_keeps_its_color() {
    let (routes, stops) = seeded_catalog();
    let mut curator = curator_over(routes, stops);
    curator.start(BROWSE_ZOOM).await.unwrap();
    let key = DirectionRef::new(RouteId(4), DirectionId(9));

    curator.show_direction_overlay(key).unwrap();
    assert_eq!(curator.reconciler().overlay_color(key), Some(LINE_PALETTE[0]));
    assert_eq!(curator.surface().path_count(), 1);
    assert_eq!(curator.surface().marker_count(MapLayer::Overlay), 2);
    let colored = curator.surface().specs(MapLayer::Overlay);
    assert!(colored.iter().all(|s| s.color == Some(LINE_PALETTE[0])));

    // each direction can be shown once
    let dup = curator.show_direction_overlay(key);
    assert!(matches!(dup, Err(EditorError::Validation(_))));

    assert!(curator.hide_direction_overlay(key));
    assert_eq!(curator.surface().path_count(), 0);
    assert_eq!(curator.surface().marker_count(MapLayer::Overlay), 0);

    // showing it again reuses the allocated color
    assert!(curator.toggle_direction_overlay(key).unwrap());
    assert_eq!(curator.reconciler().overlay_color(key), Some(LINE_PALETTE[0]));
}

#[tokio::test]
async fn test_overlay_without_track_shows_markers_only() {
    let (routes, stops) = seeded_catalog();
    let mut curator = curator_over(routes, stops);
    curator.start(BROWSE_ZOOM).await.unwrap();
    let bare = DirectionRef::new(RouteId(4), DirectionId(10));
    curator.show_direction_overlay(bare).unwrap();
    assert!(curator.reconciler().has_overlay(bare));
    assert_eq!(curator.surface().path_count(), 0);
    assert_eq!(curator.surface().marker_count(MapLayer::Overlay), 2);

    assert!(curator.hide_direction_overlay(bare));
    assert_eq!(curator.surface().marker_count(MapLayer::Overlay), 0);
}

#[tokio::test]
async fn test_locating_a_place_jumps_the_view() {
    let mut curator = curator_over(Vec::new(), Vec::new());
    curator.start(BROWSE_ZOOM).await.unwrap();
    assert_eq!(curator.surface().view, Some((MAP_CENTER, BROWSE_ZOOM)));

    let hit = PlaceHit {
        name: "Bab Touma, Damascus".to_string(),
        at: LatLng::new(33.5155, 36.3172),
    };
    curator.focus_place(&hit);
    assert_eq!(
        curator.surface().view,
        Some((LatLng::new(33.5155, 36.3172), EDIT_ZOOM))
    );
}

#[tokio::test]
async fn test_failed_save_leaves_session_untouched() {
    let (routes, stops) = seeded_catalog();
    let mut curator = curator_over(routes, stops);
    curator.start(EDIT_ZOOM).await.unwrap();
    curator.handle(SessionEvent::RouteChosen(Some(RouteId(4))));
    curator.handle(SessionEvent::DraftEdited(DraftField::TicketPrice(750.0)));

    curator.backend().fail_next(EditorError::Persistence {
        status: Some(500),
        detail: "database unavailable".to_string(),
    });
    let err = curator.save_direction().await.unwrap_err();
    assert!(matches!(err, EditorError::Persistence { status: Some(500), .. }));

    // nothing moved: selection, edited draft, waypoints, stored catalog
    assert_eq!(
        curator.session().selection(),
        (Some(RouteId(4)), Some(DirectionId(9)))
    );
    assert_eq!(curator.session().draft().ticket_price, 750.0);
    assert_eq!(curator.session().waypoints().len(), 2);
    assert_eq!(
        curator.backend().routes.borrow()[0].directions[0].ticket_price,
        500.0
    );
}

#[tokio::test]
async fn test_update_direction_roundtrip() {
    let (routes, stops) = seeded_catalog();
    let mut curator = curator_over(routes, stops);
    curator.start(EDIT_ZOOM).await.unwrap();
    curator.handle(SessionEvent::RouteChosen(Some(RouteId(4))));
    curator.handle(SessionEvent::DraftEdited(DraftField::SubName(
        "via highway".to_string(),
    )));

    curator.save_direction().await.unwrap();

    // the selection survives the refetch and shows the new value
    assert_eq!(
        curator.session().selection(),
        (Some(RouteId(4)), Some(DirectionId(9)))
    );
    assert_eq!(curator.session().draft().sub_name, "via highway");
    assert_eq!(
        curator.backend().routes.borrow()[0].directions[0].sub_name,
        "via highway"
    );
}

#[tokio::test]
async fn test_delete_direction_drops_selection_and_overlay() {
    let (routes, stops) = seeded_catalog();
    let mut curator = curator_over(routes, stops);
    curator.start(EDIT_ZOOM).await.unwrap();
    let key = DirectionRef::new(RouteId(4), DirectionId(9));
    curator.show_direction_overlay(key).unwrap();
    curator.handle(SessionEvent::RouteChosen(Some(RouteId(4))));

    curator.delete_direction(Confirm::Yes).await.unwrap();

    assert!(!curator.reconciler().has_overlay(key));
    let remaining = &curator.session().routes()[0];
    assert_eq!(remaining.directions.len(), 1);
    assert_eq!(remaining.directions[0].id, DirectionId(10));
    // the route stays selected, the vanished direction does not
    assert_eq!(curator.session().selection().0, Some(RouteId(4)));
    assert_ne!(curator.session().selection().1, Some(DirectionId(9)));
}

#[tokio::test]
async fn test_new_stops_save_roundtrip() {
    let mut curator = curator_over(Vec::new(), Vec::new());
    curator.start(EDIT_ZOOM).await.unwrap();
    curator.handle(SessionEvent::ModeChanged(EditorMode::ManageStops));
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.50, 36.25)));
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.51, 36.26)));
    curator.handle(SessionEvent::PendingRenamed {
        index: 0,
        name: "Market".to_string(),
    });
    assert_eq!(curator.surface().marker_count(MapLayer::Pending), 2);

    curator.save_stops().await.unwrap();

    assert!(curator.session().pending_stops().is_empty());
    let names: Vec<String> = curator.session().stops().iter().map(|s| s.name.clone()).collect();
    assert_eq!(names, vec!["Market".to_string(), "New Stop 2".to_string()]);
    assert_eq!(curator.surface().marker_count(MapLayer::Pending), 0);
    assert_eq!(curator.surface().marker_count(MapLayer::Catalog), 2);
}

#[tokio::test]
async fn test_dragged_stop_save_updates_coordinates() {
    let (routes, stops) = seeded_catalog();
    let mut curator = curator_over(routes, stops);
    curator.start(EDIT_ZOOM).await.unwrap();
    curator.handle(SessionEvent::ModeChanged(EditorMode::ManageStops));
    curator.handle(SessionEvent::StopDragged {
        id: StopId(2),
        to: LatLng::new(33.9, 36.9),
    });

    curator.save_stops().await.unwrap();

    assert!(curator.session().edit_stop().is_none());
    let moved = curator.session().stop(StopId(2)).unwrap();
    assert_eq!(moved.lat, 33.9);
    assert_eq!(moved.lng, 36.9);
}

#[tokio::test]
async fn test_session_end_releases_map_and_inflight_work() {
    let (routes, stops) = seeded_catalog();
    let mut curator = curator_over(routes, stops);
    curator.start(EDIT_ZOOM).await.unwrap();
    let key = DirectionRef::new(RouteId(4), DirectionId(9));
    curator.show_direction_overlay(key).unwrap();
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.51, 36.27)));
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.52, 36.28)));
    let in_flight = curator.take_resolution_request().unwrap();
    // a third click queues a newer request that nobody takes
    curator.handle(SessionEvent::MapClicked(LatLng::new(33.53, 36.29)));

    curator.end();

    assert!(curator.take_resolution_request().is_none());
    let late = vec![ResolvedPath {
        points: vec![LatLng::new(33.51, 36.27), LatLng::new(33.52, 36.28)],
        distance_meters: 900.0,
    }];
    let outcome = curator
        .complete_resolution(in_flight.ticket, Ok(late))
        .unwrap();
    assert_eq!(outcome, Resolution::Superseded);

    assert_eq!(curator.surface().path_count(), 0);
    assert_eq!(curator.surface().marker_count(MapLayer::Catalog), 0);
    assert_eq!(curator.surface().marker_count(MapLayer::Active), 0);
    assert_eq!(curator.surface().marker_count(MapLayer::Overlay), 0);
    assert!(!curator.reconciler().has_overlay(key));
    // the last session state stays readable after the map is gone
    assert_eq!(curator.session().waypoints().len(), 3);
}
