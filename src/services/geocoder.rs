use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::GeocoderConfig;
use crate::database::models::GeoLocation;

const MAPQUEST_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geocoding provider rejected the request: {0}")]
    Provider(String),
}

/// Resolves free-form addresses and zipcodes to points.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the provider has no match or geocoding is disabled.
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError>;
}

pub fn from_config(config: &GeocoderConfig) -> Arc<dyn Geocoder> {
    match (config.provider.as_deref(), config.api_key.as_deref()) {
        (Some("mapquest"), Some(key)) if !key.is_empty() => {
            info!("Geocoding through MapQuest");
            Arc::new(MapQuestGeocoder::new(key))
        }
        (Some(provider), _) => {
            warn!("Geocoder provider '{}' unavailable, geocoding disabled", provider);
            Arc::new(DisabledGeocoder)
        }
        (None, _) => Arc::new(DisabledGeocoder),
    }
}

pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, _address: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        Ok(None)
    }
}

/// Fixed address book, for tests and offline seeding.
#[derive(Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeoLocation>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: impl Into<String>, location: GeoLocation) -> Self {
        self.entries.insert(address.into(), location);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        Ok(self.entries.get(address).cloned())
    }
}

pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    info: MapQuestInfo,
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestInfo {
    statuscode: i64,
    #[serde(default)]
    messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: MapQuestLatLng,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    admin_area5: Option<String>,
    #[serde(default)]
    admin_area3: Option<String>,
    #[serde(default)]
    admin_area1: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

impl MapQuestLocation {
    fn into_location(self) -> GeoLocation {
        let non_empty = |s: Option<String>| s.filter(|v| !v.is_empty());
        let street = non_empty(self.street);
        let city = non_empty(self.admin_area5);
        let state = non_empty(self.admin_area3);
        let zipcode = non_empty(self.postal_code);
        let country = non_empty(self.admin_area1);

        let formatted_address = {
            let parts: Vec<&str> = [&street, &city, &state, &zipcode, &country]
                .into_iter()
                .filter_map(|part| part.as_deref())
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        };

        GeoLocation {
            formatted_address,
            street,
            city,
            state,
            zipcode,
            country,
            ..GeoLocation::point(self.lat_lng.lng, self.lat_lng.lat)
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        let response: MapQuestResponse = self
            .client
            .get(MAPQUEST_URL)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.info.statuscode != 0 {
            return Err(GeocodeError::Provider(response.info.messages.join("; ")));
        }

        Ok(response
            .results
            .into_iter()
            .flat_map(|r| r.locations)
            .next()
            .map(MapQuestLocation::into_location))
    }
}

/// Mean earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3963.2;

/// Great-circle distance in miles between two `[lng, lat]` points.
pub fn distance_miles(from: &GeoLocation, to: &GeoLocation) -> f64 {
    let (lat1, lat2) = (from.latitude().to_radians(), to.latitude().to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (to.longitude() - from.longitude()).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().asin()
}
