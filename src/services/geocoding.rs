use std::fmt;

use super::{fetch_text, Destination};

use crate::config::Config;
use crate::error::ScoutError;

use async_trait::async_trait;
use google_maps::GoogleMapsClient;
use log::*;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;

#[async_trait]
pub trait GeocodingService: Send + Sync {
    fn new(config: &Config, http: reqwest::Client) -> Result<Self, ScoutError>
    where
        Self: Sized;
    /// Resolves free text to its best match, `None` when nothing matched.
    async fn geocode(&self, query: &str) -> Result<Option<Destination>, ScoutError>;
}

pub struct NominatimService {
    http: reqwest::Client,
    endpoint: String,
}

const NOMINATIM: &str = "nominatim";

#[async_trait]
impl GeocodingService for NominatimService {
    fn new(config: &Config, http: reqwest::Client) -> Result<Self, ScoutError> {
        Ok(NominatimService {
            http,
            endpoint: format!("{}/search", config.nominatim_endpoint.trim_end_matches('/')),
        })
    }

    async fn geocode(&self, query: &str) -> Result<Option<Destination>, ScoutError> {
        let request = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", "1")]);
        let body = fetch_text(NOMINATIM, request).await?;
        trace!("Received {} bytes from Nominatim.", body.len());
        parse_nominatim(&body)
    }
}

#[derive(Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

fn parse_nominatim(body: &str) -> Result<Option<Destination>, ScoutError> {
    let results: Vec<NominatimResult> =
        serde_json::from_str(body).map_err(|e| ScoutError::malformed(NOMINATIM, e))?;
    let Some(first) = results.into_iter().next() else {
        return Ok(None);
    };
    let lat = first
        .lat
        .trim()
        .parse::<f64>()
        .map_err(|e| ScoutError::malformed(NOMINATIM, format!("invalid lat: {e}")))?;
    let lng = first
        .lon
        .trim()
        .parse::<f64>()
        .map_err(|e| ScoutError::malformed(NOMINATIM, format!("invalid lon: {e}")))?;
    Ok(Some(Destination {
        display_name: first.display_name,
        coords: super::Coordinates { lat, lng },
    }))
}

pub struct GoogleMapsService {
    client: GoogleMapsClient,
}

const GOOGLE_GEOCODING: &str = "google geocoding";

#[async_trait]
impl GeocodingService for GoogleMapsService {
    fn new(config: &Config, _http: reqwest::Client) -> Result<Self, ScoutError> {
        let token = config
            .google_maps_token
            .as_deref()
            .ok_or(ScoutError::MissingConfig("GOOGLE_MAPS_TOKEN"))?;
        Ok(GoogleMapsService {
            client: GoogleMapsClient::new(token),
        })
    }

    async fn geocode(&self, query: &str) -> Result<Option<Destination>, ScoutError> {
        let response = match self.client.geocoding().with_address(query).execute().await {
            Ok(response) => response,
            Err(e) => return classify_google_failure(e),
        };
        let Some(result) = response.results.first() else {
            return Ok(None);
        };
        trace!("Received coordinates from Google Maps geocoding API.");
        let location = &result.geometry.location;
        let lat = location
            .lat
            .to_f64()
            .ok_or_else(|| ScoutError::malformed(GOOGLE_GEOCODING, "latitude out of range"))?;
        let lng = location
            .lng
            .to_f64()
            .ok_or_else(|| ScoutError::malformed(GOOGLE_GEOCODING, "longitude out of range"))?;
        Ok(Some(Destination {
            display_name: result.formatted_address.clone(),
            coords: super::Coordinates { lat, lng },
        }))
    }
}

/// google_maps reports `ZERO_RESULTS` as a service error instead of an empty
/// result list. That status means "not found"; anything else is a failure.
fn classify_google_failure<E>(error: E) -> Result<Option<Destination>, ScoutError>
where
    E: fmt::Debug + fmt::Display,
{
    let detail = format!("{error:?}");
    if detail.contains("ZeroResults") || detail.contains("ZERO_RESULTS") {
        debug!("Google Maps geocoding found nothing: {error}");
        return Ok(None);
    }
    Err(ScoutError::transport(GOOGLE_GEOCODING, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Same shape as the google_maps geocoding error.
    #[derive(Debug)]
    enum Status {
        ZeroResults,
        OverQueryLimit,
    }

    #[derive(Debug)]
    enum GeocodingError {
        GoogleMapsService(Status, Option<String>),
    }

    impl fmt::Display for GeocodingError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let GeocodingError::GoogleMapsService(status, _) = self;
            write!(f, "Google Maps Geocoding API service: {status:?}")
        }
    }

    #[test]
    fn first_nominatim_match_is_authoritative() {
        let body = r#"[
            {"place_id": 1, "lat": "37.8199109", "lon": "-122.4785598",
             "display_name": "Golden Gate Bridge, San Francisco, California, United States"},
            {"place_id": 2, "lat": "0", "lon": "0", "display_name": "Elsewhere"}
        ]"#;
        let destination = parse_nominatim(body).unwrap().unwrap();
        assert_eq!(destination.coords.lat, 37.8199109);
        assert_eq!(destination.coords.lng, -122.4785598);
        assert!(destination.display_name.starts_with("Golden Gate Bridge"));
    }

    #[test]
    fn empty_nominatim_result_is_not_an_error() {
        assert_eq!(parse_nominatim("[]").unwrap(), None);
    }

    #[test]
    fn bad_nominatim_payloads_are_malformed() {
        assert!(matches!(
            parse_nominatim("{\"error\": \"nope\"}"),
            Err(ScoutError::Malformed { .. })
        ));
        assert!(matches!(
            parse_nominatim(r#"[{"lat": "x", "lon": "1", "display_name": "bad"}]"#),
            Err(ScoutError::Malformed { .. })
        ));
    }

    #[test]
    fn nominatim_endpoint_is_normalised() {
        let config = Config {
            nominatim_endpoint: "http://localhost:8080/".to_string(),
            ..Config::default()
        };
        let service = NominatimService::new(&config, reqwest::Client::new()).unwrap();
        assert_eq!(service.endpoint, "http://localhost:8080/search");
    }

    #[test]
    fn google_zero_results_means_not_found() {
        let error = GeocodingError::GoogleMapsService(Status::ZeroResults, None);
        assert_eq!(classify_google_failure(error).unwrap(), None);
    }

    #[test]
    fn other_google_failures_are_transport_errors() {
        let error = GeocodingError::GoogleMapsService(
            Status::OverQueryLimit,
            Some("You have exceeded your daily request quota.".to_string()),
        );
        assert!(matches!(
            classify_google_failure(error),
            Err(ScoutError::Transport { service: GOOGLE_GEOCODING, .. })
        ));
    }
}
