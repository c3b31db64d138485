use crate::models::LatLng;
use geo::Rect;
use rgb::RGB8;

/// Opaque marker identity issued by the substrate. Only valid for the
/// surface that produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathHandle(pub u64);

/// The editor draws into three disjoint working layers plus one shared
/// overlay plane for the browse screen. Clearing one never disturbs the
/// others.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapLayer {
    /// Persisted stops.
    Catalog,
    /// Stops created this session, not saved yet.
    Pending,
    /// The waypoint sequence currently being edited.
    Active,
    /// Per-direction browse overlays, removed individually.
    Overlay,
}

/// What a click on the marker should mean to the session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClickRole {
    /// Pick the stop as the edit candidate.
    SelectStop,
    /// Append the stop to the active waypoint sequence.
    AppendWaypoint,
    Inert,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MarkerSpec {
    pub at: LatLng,
    pub label: String,
    /// None draws the substrate's default pin.
    pub color: Option<RGB8>,
    pub draggable: bool,
    pub on_click: ClickRole,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathSpec {
    pub points: Vec<LatLng>,
    pub color: RGB8,
    pub weight: u32,
}

/// Abstract rendering substrate the reconciler draws through.
///
/// Everything here is declarative. The substrate owns the visuals; the
/// caller owns the handles and must release them (or clear the layer)
/// before drawing a replacement. `clear_layer` invalidates every marker
/// handle previously issued for that layer.
pub trait MapSurface {
    fn add_marker(&mut self, layer: MapLayer, spec: MarkerSpec) -> MarkerHandle;
    fn remove_marker(&mut self, layer: MapLayer, handle: MarkerHandle);
    fn draw_path(&mut self, spec: PathSpec) -> PathHandle;
    fn remove_path(&mut self, handle: PathHandle);
    fn clear_layer(&mut self, layer: MapLayer);
    fn fit_bounds(&mut self, bounds: Rect<f64>);
    fn set_view(&mut self, center: LatLng, zoom: u8);
}
