use crate::errors::EditorError;
use crate::models::{DirectionId, DirectionKind, Route, RouteId, Stop, StopId};
use log::debug;
use serde::{Deserialize, Serialize};

/// Create/update body for one direction. Stops are sent inline with
/// coordinates; the backend owns id assignment and linking.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DirectionPayload {
    #[serde(rename = "direction")]
    pub kind: DirectionKind,
    pub sub_name: String,
    #[serde(rename = "tik_price")]
    pub ticket_price: f64,
    pub distance: f64,
    #[serde(rename = "gpx")]
    pub track: Option<String>,
    pub stops: Vec<StopPayload>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoutePayload {
    pub name: String,
    pub bus_type: String,
    pub directions: Vec<DirectionPayload>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StopPayload {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// Persistence surface of the editor. Implementations must be
/// all-or-nothing per call; a returned error means nothing was stored.
pub trait TransitBackend {
    async fn list_routes(&self) -> Result<Vec<Route>, EditorError>;
    async fn create_route(&self, route: RoutePayload) -> Result<Route, EditorError>;
    async fn update_direction(
        &self,
        route: RouteId,
        direction: DirectionId,
        payload: DirectionPayload,
    ) -> Result<(), EditorError>;
    async fn delete_direction(&self, route: RouteId, direction: DirectionId)
    -> Result<(), EditorError>;
    async fn list_stops(&self) -> Result<Vec<Stop>, EditorError>;
    async fn create_stops(&self, stops: Vec<StopPayload>) -> Result<(), EditorError>;
    async fn update_stop(&self, id: StopId, stop: StopPayload) -> Result<(), EditorError>;
    async fn delete_stop(&self, id: StopId) -> Result<(), EditorError>;
}

/// REST client for the route catalog service.
pub struct HttpTransitBackend {
    base: String,
    client: reqwest::Client,
}

impl HttpTransitBackend {
    pub fn new(base: impl Into<String>) -> Self {
        HttpTransitBackend {
            base: base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, EditorError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!("backend refused with status {}: {}", status, body);
        Err(EditorError::Persistence {
            status: Some(status),
            detail: detail_of(status, &body),
        })
    }
}

/// Pulls the human-readable reason out of an error response. The backend
/// sends `{"detail": "..."}`; anything else falls back to the raw body or
/// the status code.
fn detail_of(status: u16, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: String,
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.detail;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("backend returned status {}", status)
    } else {
        trimmed.to_string()
    }
}

impl TransitBackend for HttpTransitBackend {
    async fn list_routes(&self) -> Result<Vec<Route>, EditorError> {
        let response = self
            .client
            .get(format!("{}/routes", self.base))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_route(&self, route: RoutePayload) -> Result<Route, EditorError> {
        let response = self
            .client
            .post(format!("{}/routes", self.base))
            .json(&route)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_direction(
        &self,
        route: RouteId,
        direction: DirectionId,
        payload: DirectionPayload,
    ) -> Result<(), EditorError> {
        let response = self
            .client
            .put(format!(
                "{}/routes/{}/directions/{}",
                self.base, route, direction
            ))
            .json(&payload)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_direction(
        &self,
        route: RouteId,
        direction: DirectionId,
    ) -> Result<(), EditorError> {
        let response = self
            .client
            .delete(format!(
                "{}/routes/{}/directions/{}",
                self.base, route, direction
            ))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_stops(&self) -> Result<Vec<Stop>, EditorError> {
        let response = self
            .client
            .get(format!("{}/stops", self.base))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_stops(&self, stops: Vec<StopPayload>) -> Result<(), EditorError> {
        let response = self
            .client
            .post(format!("{}/stops", self.base))
            .json(&stops)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_stop(&self, id: StopId, stop: StopPayload) -> Result<(), EditorError> {
        let response = self
            .client
            .put(format!("{}/stops/{}", self.base, id))
            .json(&stop)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_stop(&self, id: StopId) -> Result<(), EditorError> {
        let response = self
            .client
            .delete(format!("{}/stops/{}", self.base, id))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
