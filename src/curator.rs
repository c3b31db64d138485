use crate::backend::{DirectionPayload, RoutePayload, StopPayload, TransitBackend};
use crate::errors::EditorError;
use crate::geocode::PlaceHit;
use crate::models::{DirectionRef, LatLng, Waypoint};
use crate::palette::ColorAllocator;
use crate::reconcile::MapReconciler;
use crate::resolve::{
    ResolutionGuard, ResolutionTicket, ResolveError, ResolvedPath, RoutingBackend,
};
use crate::session::{Dirty, EditorSession, SessionEvent};
use crate::surface::MapSurface;
use crate::track;
use futures::join;
use log::{debug, info, warn};

/// Default viewport, central Damascus.
pub const MAP_CENTER: LatLng = LatLng::new(33.5138, 36.2765);
pub const EDIT_ZOOM: u8 = 15;
pub const BROWSE_ZOOM: u8 = 12;

/// Destructive operations take this token. Producing it is the caller's
/// confirmation step; there is no way to call a delete without it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Confirm {
    Yes,
}

/// Outcome of completing one resolution request.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// The newest request came back and was drawn.
    Applied { distance_km: f64 },
    /// The response belonged to an older generation and was dropped.
    Superseded,
    /// Nothing was waiting to be resolved.
    Idle,
}

/// A resolution the routing backend still owes us. Taken by the caller,
/// performed, and handed back through
/// [`Curator::complete_resolution`].
#[derive(Clone, Debug)]
pub struct ResolutionRequest {
    pub ticket: ResolutionTicket,
    pub waypoints: Vec<Waypoint>,
}

/// Ties the session, the map, the routing engine, and the persistence
/// backend together. Every interaction funnels through [`Curator::handle`],
/// which mutates the session and then redraws exactly the touched facets.
pub struct Curator<B, R, S> {
    session: EditorSession,
    reconciler: MapReconciler,
    colors: ColorAllocator,
    guard: ResolutionGuard,
    pending_resolution: Option<ResolutionRequest>,
    backend: B,
    routing: R,
    surface: S,
}

impl<B, R, S> Curator<B, R, S>
where
    B: TransitBackend,
    R: RoutingBackend,
    S: MapSurface,
{
    pub fn new(backend: B, routing: R, surface: S) -> Self {
        Curator {
            session: EditorSession::new(),
            reconciler: MapReconciler::new(),
            colors: ColorAllocator::new(),
            guard: ResolutionGuard::new(),
            pending_resolution: None,
            backend,
            routing,
            surface,
        }
    }

    /// Centers the viewport and loads the catalog. `zoom` is
    /// [`EDIT_ZOOM`] for the editor screen, [`BROWSE_ZOOM`] for browsing.
    pub async fn start(&mut self, zoom: u8) -> Result<(), EditorError> {
        self.surface.set_view(MAP_CENTER, zoom);
        self.refresh_catalog().await
    }

    pub fn handle(&mut self, event: SessionEvent) -> Dirty {
        let dirty = self.session.apply(event);
        self.reconcile(dirty);
        dirty
    }

    fn reconcile(&mut self, dirty: Dirty) {
        if dirty.catalog {
            self.reconciler
                .sync_catalog(&mut self.surface, self.session.stops(), self.session.mode());
        }
        if dirty.pending {
            self.reconciler
                .sync_pending(&mut self.surface, self.session.pending_stops());
        }
        if dirty.waypoints {
            let resolvable = self
                .reconciler
                .sync_active(&mut self.surface, self.session.waypoints());
            if resolvable {
                let ticket = self.guard.begin();
                debug!("resolution generation {} issued", ticket.generation());
                self.pending_resolution = Some(ResolutionRequest {
                    ticket,
                    waypoints: self.session.waypoints().to_vec(),
                });
            } else {
                // too short to route; anything in flight is stale now
                self.guard.invalidate();
                self.pending_resolution = None;
                self.session.set_staged_track(None);
            }
        }
    }

    /// Hands out the resolution the last interaction asked for, if any.
    /// The caller runs it against the routing backend and reports back
    /// with the ticket.
    pub fn take_resolution_request(&mut self) -> Option<ResolutionRequest> {
        self.pending_resolution.take()
    }

    pub fn complete_resolution(
        &mut self,
        ticket: ResolutionTicket,
        outcome: Result<Vec<ResolvedPath>, ResolveError>,
    ) -> Result<Resolution, EditorError> {
        if !self.guard.acknowledge(ticket) {
            debug!(
                "dropping superseded resolution (generation {})",
                ticket.generation()
            );
            return Ok(Resolution::Superseded);
        }
        match outcome {
            Ok(paths) => {
                let Some(path) = paths.into_iter().next() else {
                    self.session.set_staged_track(None);
                    return Err(EditorError::NoPathFound);
                };
                self.reconciler.apply_resolution(&mut self.surface, &path);
                let distance_km = (path.distance_meters / 1000.0 * 100.0).round() / 100.0;
                let document = track::encode(&self.session.draft().route_name, &path.points);
                self.session.set_staged_track(Some(document));
                self.session.set_distance_km(distance_km);
                info!(
                    "path resolved: {:.2} km over {} points",
                    distance_km,
                    self.session.waypoints().len()
                );
                Ok(Resolution::Applied { distance_km })
            }
            Err(err) => {
                // waypoints stay on the map as plain markers
                warn!("route resolution failed: {}", err);
                self.session.set_staged_track(None);
                Err(EditorError::NoPathFound)
            }
        }
    }

    /// Take-resolve-complete in one step, for linear flows that have no
    /// competing interaction.
    pub async fn resolve_now(&mut self) -> Result<Resolution, EditorError> {
        let Some(request) = self.take_resolution_request() else {
            return Ok(Resolution::Idle);
        };
        let outcome = self.routing.resolve(&request.waypoints).await;
        self.complete_resolution(request.ticket, outcome)
    }

    /// Decodes an uploaded track document into the active waypoint
    /// sequence. A rejected document changes nothing.
    pub fn upload_track(&mut self, document: &str) -> Result<Dirty, EditorError> {
        let waypoints = track::decode(document)?;
        Ok(self.handle(SessionEvent::TrackLoaded {
            waypoints,
            document: document.to_string(),
        }))
    }

    /// Persists the draft. With a full selection this updates that
    /// direction; with no selection it creates a new route carrying the
    /// draft as its first direction. Validation failures return before
    /// any backend call.
    pub async fn save_direction(&mut self) -> Result<(), EditorError> {
        self.session.validate_direction_draft()?;
        let draft = self.session.draft().clone();
        let stops: Vec<StopPayload> = self
            .session
            .waypoints()
            .iter()
            .map(|w| StopPayload {
                name: w.name.clone(),
                lat: w.at.lat,
                lng: w.at.lng,
            })
            .collect();
        let payload = DirectionPayload {
            kind: draft.kind,
            sub_name: draft.sub_name.clone(),
            ticket_price: draft.ticket_price,
            distance: draft.distance_km,
            track: self.session.staged_track().map(str::to_string),
            stops,
        };
        match self.session.selection() {
            (Some(route), Some(direction)) => {
                self.backend
                    .update_direction(route, direction, payload)
                    .await?;
                info!("direction {}-{} updated", route, direction);
            }
            (Some(_), None) => {
                return Err(EditorError::Validation(
                    "select a direction to update".to_string(),
                ));
            }
            (None, _) => {
                let created = self
                    .backend
                    .create_route(RoutePayload {
                        name: draft.route_name.trim().to_string(),
                        bus_type: draft.bus_type.clone(),
                        directions: vec![payload],
                    })
                    .await?;
                info!("route {:?} created as {}", created.name, created.id);
            }
        }
        self.after_mutation().await
    }

    pub async fn delete_direction(&mut self, _confirm: Confirm) -> Result<(), EditorError> {
        let Some(key) = self.session.selected() else {
            return Err(EditorError::Validation(
                "select a direction to delete".to_string(),
            ));
        };
        self.backend
            .delete_direction(key.route, key.direction)
            .await?;
        info!("direction {} deleted", key);
        self.reconciler.remove_overlay(&mut self.surface, key);
        self.after_mutation().await
    }

    /// Persists stop work: the dragged/renamed edit candidate when one is
    /// selected, otherwise every pending stop in one call.
    pub async fn save_stops(&mut self) -> Result<(), EditorError> {
        if let Some(stop) = self.session.edit_stop().cloned() {
            if stop.name.trim().is_empty() {
                return Err(EditorError::Validation(
                    "stop name must not be blank".to_string(),
                ));
            }
            self.backend
                .update_stop(
                    stop.id,
                    StopPayload {
                        name: stop.name.clone(),
                        lat: stop.lat,
                        lng: stop.lng,
                    },
                )
                .await?;
            info!("stop {} updated", stop.id);
        } else {
            let pending = self.session.pending_stops();
            if pending.is_empty() {
                return Err(EditorError::Validation("nothing to save".to_string()));
            }
            if pending.iter().any(|p| p.name.trim().is_empty()) {
                return Err(EditorError::Validation(
                    "every new stop needs a name".to_string(),
                ));
            }
            let payload: Vec<StopPayload> = pending
                .iter()
                .map(|p| StopPayload {
                    name: p.name.clone(),
                    lat: p.at.lat,
                    lng: p.at.lng,
                })
                .collect();
            let count = payload.len();
            self.backend.create_stops(payload).await?;
            info!("{} stops created", count);
        }
        self.refresh_stops().await
    }

    /// The backend refuses to delete a stop that a direction still rides
    /// through; that refusal surfaces here with the catalog untouched.
    pub async fn delete_stop(&mut self, _confirm: Confirm) -> Result<(), EditorError> {
        let Some(stop) = self.session.edit_stop().cloned() else {
            return Err(EditorError::Validation(
                "select a stop to delete".to_string(),
            ));
        };
        self.backend.delete_stop(stop.id).await?;
        info!("stop {} deleted", stop.id);
        self.refresh_stops().await
    }

    /// Draws one saved direction on the browse map in its allocated
    /// color. A direction stored without a track shows its stop markers
    /// alone. Refused when already shown.
    pub fn show_direction_overlay(&mut self, key: DirectionRef) -> Result<(), EditorError> {
        let Some(route) = self.session.route(key.route) else {
            return Err(EditorError::Validation(format!(
                "unknown route {}",
                key.route
            )));
        };
        let Some(direction) = route.direction(key.direction) else {
            return Err(EditorError::Validation(format!("unknown direction {}", key)));
        };
        let points: Vec<LatLng> = match direction.track.as_deref() {
            Some(document) => track::decode(document)?.into_iter().map(|w| w.at).collect(),
            None => Vec::new(),
        };
        let stops = direction.stops.clone();
        let color = self.colors.color_for(key);
        self.reconciler
            .add_overlay(&mut self.surface, key, color, &points, &stops)
    }

    pub fn hide_direction_overlay(&mut self, key: DirectionRef) -> bool {
        self.reconciler.remove_overlay(&mut self.surface, key)
    }

    /// Returns whether the overlay is shown after the toggle.
    pub fn toggle_direction_overlay(&mut self, key: DirectionRef) -> Result<bool, EditorError> {
        if self.hide_direction_overlay(key) {
            Ok(false)
        } else {
            self.show_direction_overlay(key)?;
            Ok(true)
        }
    }

    pub fn focus_place(&mut self, hit: &PlaceHit) {
        self.surface.set_view(hit.at, EDIT_ZOOM);
    }

    /// Releases everything drawn on the surface and supersedes any
    /// in-flight resolution. The session's last state stays readable.
    pub fn end(&mut self) {
        self.guard.invalidate();
        self.pending_resolution = None;
        self.reconciler.teardown(&mut self.surface);
    }

    async fn refresh_catalog(&mut self) -> Result<(), EditorError> {
        let (routes, stops) = join!(self.backend.list_routes(), self.backend.list_stops());
        let dirty = self.session.apply(SessionEvent::CatalogLoaded {
            routes: routes?,
            stops: stops?,
        });
        self.reconcile(dirty);
        Ok(())
    }

    async fn refresh_stops(&mut self) -> Result<(), EditorError> {
        self.guard.invalidate();
        self.pending_resolution = None;
        let stops = self.backend.list_stops().await?;
        let dirty = self.session.apply(SessionEvent::StopsRefreshed(stops));
        self.reconcile(dirty);
        Ok(())
    }

    async fn after_mutation(&mut self) -> Result<(), EditorError> {
        self.guard.invalidate();
        self.pending_resolution = None;
        self.refresh_catalog().await
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn routing(&self) -> &R {
        &self.routing
    }

    pub fn reconciler(&self) -> &MapReconciler {
        &self.reconciler
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
