use crate::errors::EditorError;
use crate::models::{DirectionRef, LatLng, PendingStop, Stop, Waypoint};
use crate::resolve::ResolvedPath;
use crate::session::EditorMode;
use crate::surface::{
    ClickRole, MapLayer, MapSurface, MarkerHandle, MarkerSpec, PathHandle, PathSpec,
};
use ahash::AHashMap;
use geo::BoundingRect;
use geo_types::{LineString, Rect};
use rgb::RGB8;

/// Color of the line drawn for the direction being edited.
const ACTIVE_PATH_COLOR: RGB8 = RGB8::new(0xff, 0x00, 0x00);
const ACTIVE_PATH_WEIGHT: u32 = 4;
const OVERLAY_PATH_WEIGHT: u32 = 4;

/// Everything drawn for one browse overlay, released as a unit. The
/// path is absent for directions saved without a resolved line.
#[derive(Debug)]
pub struct OverlayEntry {
    pub color: RGB8,
    path: Option<PathHandle>,
    markers: Vec<MarkerHandle>,
}

/// Redraws map layers from session state.
///
/// The reconciler owns every handle it creates and always releases the
/// previous drawing of a facet before producing the next one. It holds no
/// domain state of its own; callers pass in the slices to render.
#[derive(Debug, Default)]
pub struct MapReconciler {
    catalog: Vec<MarkerHandle>,
    pending: Vec<MarkerHandle>,
    active: Vec<MarkerHandle>,
    active_path: Option<PathHandle>,
    overlays: AHashMap<DirectionRef, OverlayEntry>,
}

impl MapReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redraws the persisted stops. In route-building mode the markers
    /// append waypoints on click; in stop-managing mode they select for
    /// editing and can be dragged.
    pub fn sync_catalog<S: MapSurface>(
        &mut self,
        surface: &mut S,
        stops: &[Stop],
        mode: EditorMode,
    ) {
        surface.clear_layer(MapLayer::Catalog);
        self.catalog.clear();
        let (on_click, draggable) = match mode {
            EditorMode::BuildRoute => (ClickRole::AppendWaypoint, false),
            EditorMode::ManageStops => (ClickRole::SelectStop, true),
        };
        for stop in stops {
            let handle = surface.add_marker(
                MapLayer::Catalog,
                MarkerSpec {
                    at: stop.at(),
                    label: stop.name.clone(),
                    color: None,
                    draggable,
                    on_click,
                },
            );
            self.catalog.push(handle);
        }
    }

    pub fn sync_pending<S: MapSurface>(&mut self, surface: &mut S, pending: &[PendingStop]) {
        surface.clear_layer(MapLayer::Pending);
        self.pending.clear();
        for stop in pending {
            let handle = surface.add_marker(
                MapLayer::Pending,
                MarkerSpec {
                    at: stop.at,
                    label: stop.name.clone(),
                    color: None,
                    draggable: true,
                    on_click: ClickRole::Inert,
                },
            );
            self.pending.push(handle);
        }
    }

    /// Redraws the active waypoint markers and drops any resolved line,
    /// which is stale the moment the sequence changes. Returns whether
    /// the sequence is long enough to ask the routing engine for a path.
    pub fn sync_active<S: MapSurface>(&mut self, surface: &mut S, waypoints: &[Waypoint]) -> bool {
        surface.clear_layer(MapLayer::Active);
        self.active.clear();
        if let Some(handle) = self.active_path.take() {
            surface.remove_path(handle);
        }
        for waypoint in waypoints {
            let handle = surface.add_marker(
                MapLayer::Active,
                MarkerSpec {
                    at: waypoint.at,
                    label: waypoint.name.clone(),
                    color: None,
                    draggable: false,
                    on_click: ClickRole::Inert,
                },
            );
            self.active.push(handle);
        }
        waypoints.len() >= 2
    }

    /// Draws the resolved line for the active direction and brings it
    /// fully into view.
    pub fn apply_resolution<S: MapSurface>(&mut self, surface: &mut S, path: &ResolvedPath) {
        if let Some(handle) = self.active_path.take() {
            surface.remove_path(handle);
        }
        let handle = surface.draw_path(PathSpec {
            points: path.points.clone(),
            color: ACTIVE_PATH_COLOR,
            weight: ACTIVE_PATH_WEIGHT,
        });
        self.active_path = Some(handle);
        if let Some(bounds) = bounds_of(&path.points) {
            surface.fit_bounds(bounds);
        }
    }

    /// Puts one saved direction on the browse map, its stop markers
    /// labeled in visit order. Fewer than two line points draw the stop
    /// markers alone. Each direction can be shown at most once; a second
    /// add is refused.
    pub fn add_overlay<S: MapSurface>(
        &mut self,
        surface: &mut S,
        key: DirectionRef,
        color: RGB8,
        points: &[LatLng],
        stops: &[Stop],
    ) -> Result<(), EditorError> {
        if self.overlays.contains_key(&key) {
            return Err(EditorError::Validation(format!(
                "direction {} is already on the map",
                key
            )));
        }
        let path = if points.len() >= 2 {
            Some(surface.draw_path(PathSpec {
                points: points.to_vec(),
                color,
                weight: OVERLAY_PATH_WEIGHT,
            }))
        } else {
            None
        };
        let markers: Vec<MarkerHandle> = stops
            .iter()
            .enumerate()
            .map(|(i, stop)| {
                surface.add_marker(
                    MapLayer::Overlay,
                    MarkerSpec {
                        at: stop.at(),
                        label: format!("{}. {}", i + 1, stop.name),
                        color: Some(color),
                        draggable: false,
                        on_click: ClickRole::Inert,
                    },
                )
            })
            .collect();
        let focus: Vec<LatLng> = if points.is_empty() {
            stops.iter().map(Stop::at).collect()
        } else {
            points.to_vec()
        };
        if let Some(bounds) = bounds_of(&focus) {
            surface.fit_bounds(bounds);
        }
        self.overlays.insert(key, OverlayEntry { color, path, markers });
        Ok(())
    }

    /// Removes one overlay and releases its handles. Returns false when
    /// the direction was not being shown.
    pub fn remove_overlay<S: MapSurface>(&mut self, surface: &mut S, key: DirectionRef) -> bool {
        let Some(entry) = self.overlays.remove(&key) else {
            return false;
        };
        if let Some(path) = entry.path {
            surface.remove_path(path);
        }
        for marker in entry.markers {
            surface.remove_marker(MapLayer::Overlay, marker);
        }
        true
    }

    pub fn has_overlay(&self, key: DirectionRef) -> bool {
        self.overlays.contains_key(&key)
    }

    pub fn overlay_color(&self, key: DirectionRef) -> Option<RGB8> {
        self.overlays.get(&key).map(|e| e.color)
    }

    /// Releases everything this reconciler ever drew. Run when the
    /// editing session ends.
    pub fn teardown<S: MapSurface>(&mut self, surface: &mut S) {
        surface.clear_layer(MapLayer::Catalog);
        surface.clear_layer(MapLayer::Pending);
        surface.clear_layer(MapLayer::Active);
        self.catalog.clear();
        self.pending.clear();
        self.active.clear();
        if let Some(handle) = self.active_path.take() {
            surface.remove_path(handle);
        }
        let keys: Vec<DirectionRef> = self.overlays.keys().copied().collect();
        for key in keys {
            self.remove_overlay(surface, key);
        }
    }
}

fn bounds_of(points: &[LatLng]) -> Option<Rect<f64>> {
    if points.is_empty() {
        return None;
    }
    let line: LineString<f64> = points.iter().map(|p| p.to_coord()).collect::<Vec<_>>().into();
    line.bounding_rect()
}
