//! Best-effort location providers and reverse geocoding.
//!
//! Every failure here is non-fatal: the workflow simply submits without a
//! location.

use async_trait::async_trait;
use phytoscan_core::LocationData;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("location lookup timed out")]
    TimedOut,
    #[error("reverse geocoding failed: {0}")]
    Geocoding(String),
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locate(&self) -> Result<LocationData, LocationError>;
}

/// Provider returning a known fix, e.g. one read from EXIF or entered by hand.
#[derive(Debug, Clone)]
pub struct FixedLocation(pub LocationData);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn locate(&self) -> Result<LocationData, LocationError> {
        Ok(self.0.clone())
    }
}

/// Address components tried in order; the first three present are joined.
const ADDRESS_PARTS: &[&str] = &[
    "house_number",
    "road",
    "village",
    "town",
    "city",
    "municipality",
    "province",
    "state",
    "country",
];

/// Reverse geocoder backed by an OpenStreetMap Nominatim instance.
pub struct ReverseGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl Default for ReverseGeocoder {
    fn default() -> Self {
        Self::new("https://nominatim.openstreetmap.org".into())
    }
}

impl ReverseGeocoder {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn address_for(&self, latitude: f64, longitude: f64) -> Result<String, LocationError> {
        let url = format!(
            "{}/reverse?format=json&lat={latitude}&lon={longitude}&zoom=18&addressdetails=1",
            self.base_url
        );
        debug!(url = %url, "reverse geocoding");
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, "phytoscan/0.1")
            .send()
            .await
            .map_err(|e| LocationError::Geocoding(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(LocationError::Geocoding(format!("status {}", resp.status())));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| LocationError::Geocoding(e.to_string()))?;
        format_address(&body).ok_or_else(|| LocationError::Geocoding("no address found".into()))
    }

    /// Address when geocoding succeeds, otherwise six-decimal coordinates.
    pub async fn label_for(&self, latitude: f64, longitude: f64) -> String {
        match self.address_for(latitude, longitude).await {
            Ok(address) => address,
            Err(e) => {
                warn!(error = %e, "falling back to coordinates");
                format!("{latitude:.6}, {longitude:.6}")
            }
        }
    }
}

/// Readable address from a Nominatim reverse response.
pub fn format_address(body: &Value) -> Option<String> {
    let display_name = body.get("display_name").and_then(Value::as_str)?;
    if let Some(address) = body.get("address") {
        let parts: Vec<&str> = ADDRESS_PARTS
            .iter()
            .filter_map(|key| address.get(*key).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .take(3)
            .collect();
        if !parts.is_empty() {
            return Some(parts.join(", "));
        }
    }
    Some(display_name.to_string())
}

/// Wraps a provider and fills in the address by reverse geocoding.
pub struct GeocodedProvider<P> {
    inner: P,
    geocoder: ReverseGeocoder,
}

impl<P: LocationProvider> GeocodedProvider<P> {
    pub fn new(inner: P, geocoder: ReverseGeocoder) -> Self {
        Self { inner, geocoder }
    }
}

#[async_trait]
impl<P: LocationProvider> LocationProvider for GeocodedProvider<P> {
    async fn locate(&self) -> Result<LocationData, LocationError> {
        let mut fix = self.inner.locate().await?;
        if fix.address.is_none() {
            fix.address = Some(self.geocoder.label_for(fix.latitude, fix.longitude).await);
        }
        Ok(fix)
    }
}
