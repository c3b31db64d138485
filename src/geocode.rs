use crate::errors::EditorError;
use crate::models::LatLng;
use log::debug;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_GEOCODER_BASE: &str = "https://nominatim.openstreetmap.org";

#[derive(Clone, Debug, PartialEq)]
pub struct PlaceHit {
    pub name: String,
    pub at: LatLng,
}

/// Free-text place search used to jump the viewport.
pub trait Geocoder {
    async fn search(&self, query: &str) -> Result<Vec<PlaceHit>, EditorError>;
}

pub struct NominatimGeocoder {
    base: String,
    client: reqwest::Client,
}

impl NominatimGeocoder {
    pub fn new(base: impl Into<String>) -> Self {
        NominatimGeocoder {
            base: base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn openstreetmap() -> Self {
        Self::new(DEFAULT_GEOCODER_BASE)
    }

    fn request_url(&self, query: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            &format!("{}/search", self.base),
            &[("q", query), ("format", "jsonv2"), ("limit", "5")],
        )
    }
}

/// Nominatim sends coordinates as strings. Rows that do not parse are
/// dropped instead of failing the whole search.
#[derive(Debug, Deserialize)]
struct NominatimHit {
    display_name: String,
    lat: String,
    lon: String,
}

fn hits_from_wire(rows: Vec<NominatimHit>) -> Vec<PlaceHit> {
    rows.into_iter()
        .filter_map(|row| {
            let lat = row.lat.parse().ok()?;
            let lng = row.lon.parse().ok()?;
            Some(PlaceHit {
                name: row.display_name,
                at: LatLng::new(lat, lng),
            })
        })
        .collect()
}

impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<PlaceHit>, EditorError> {
        let url = self.request_url(query).map_err(|e| EditorError::Persistence {
            status: None,
            detail: format!("bad geocoder url: {}", e),
        })?;
        debug!("geocoding {:?}", query);
        let rows = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, "routeloom")
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<NominatimHit>>()
            .await?;
        Ok(hits_from_wire(rows))
    }
}
