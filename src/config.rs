use std::str::FromStr;
use std::time::Duration;

use crate::error::ScoutError;
use crate::services::Coordinates;

pub const DEFAULT_NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_OSRM_ENDPOINT: &str = "https://router.project-osrm.org";
pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_GOOGLE_PLACES_ENDPOINT: &str =
    "https://maps.googleapis.com/maps/api/place/textsearch/json";

/// Los Angeles city hall.
pub const FALLBACK_POSITION: Coordinates = Coordinates {
    lat: 34.0522,
    lng: -118.2437,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocoderKind {
    Nominatim,
    Google,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacesKind {
    Overpass,
    Google,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub geocoder: GeocoderKind,
    pub nominatim_endpoint: String,
    pub osrm_endpoint: String,
    pub places: PlacesKind,
    pub overpass_endpoint: String,
    pub google_places_endpoint: String,
    pub google_maps_token: Option<String>,
    pub fallback: Coordinates,
    pub location_timeout: Duration,
    pub http_timeout: Duration,
    pub places_limit: usize,
    /// Map sessions untouched for longer are forgotten.
    pub session_idle: Duration,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            geocoder: GeocoderKind::Nominatim,
            nominatim_endpoint: DEFAULT_NOMINATIM_ENDPOINT.to_string(),
            osrm_endpoint: DEFAULT_OSRM_ENDPOINT.to_string(),
            places: PlacesKind::Overpass,
            overpass_endpoint: DEFAULT_OVERPASS_ENDPOINT.to_string(),
            google_places_endpoint: DEFAULT_GOOGLE_PLACES_ENDPOINT.to_string(),
            google_maps_token: None,
            fallback: FALLBACK_POSITION,
            location_timeout: Duration::from_millis(20_000),
            http_timeout: Duration::from_secs(15),
            places_limit: 50,
            session_idle: Duration::from_secs(2 * 60 * 60),
            user_agent: concat!("route-scout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment, after loading `.env`.
    pub fn from_env() -> Result<Self, ScoutError> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScoutError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let geocoder = match get("SCOUT_GEOCODER").as_deref().map(str::trim) {
            None | Some("nominatim") => GeocoderKind::Nominatim,
            Some("google") => GeocoderKind::Google,
            Some(other) => {
                return Err(ScoutError::Config {
                    key: "SCOUT_GEOCODER",
                    reason: format!("unknown geocoder {other:?}"),
                })
            }
        };
        let places = match get("SCOUT_PLACES").as_deref().map(str::trim) {
            None | Some("overpass") => PlacesKind::Overpass,
            Some("google") => PlacesKind::Google,
            Some(other) => {
                return Err(ScoutError::Config {
                    key: "SCOUT_PLACES",
                    reason: format!("unknown place search backend {other:?}"),
                })
            }
        };

        let google_maps_token = get("GOOGLE_MAPS_TOKEN");
        if google_maps_token.is_none()
            && (geocoder == GeocoderKind::Google || places == PlacesKind::Google)
        {
            return Err(ScoutError::MissingConfig("GOOGLE_MAPS_TOKEN"));
        }

        let fallback = Coordinates {
            lat: degrees(&get, "SCOUT_FALLBACK_LAT", 90.0)?.unwrap_or(defaults.fallback.lat),
            lng: degrees(&get, "SCOUT_FALLBACK_LNG", 180.0)?.unwrap_or(defaults.fallback.lng),
        };

        Ok(Config {
            geocoder,
            nominatim_endpoint: get("NOMINATIM_ENDPOINT").unwrap_or(defaults.nominatim_endpoint),
            osrm_endpoint: get("OSRM_ENDPOINT").unwrap_or(defaults.osrm_endpoint),
            places,
            overpass_endpoint: get("OVERPASS_ENDPOINT").unwrap_or(defaults.overpass_endpoint),
            google_places_endpoint: get("GOOGLE_PLACES_ENDPOINT")
                .unwrap_or(defaults.google_places_endpoint),
            google_maps_token,
            fallback,
            location_timeout: parse(&get, "SCOUT_LOCATION_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.location_timeout),
            http_timeout: parse(&get, "SCOUT_HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            places_limit: parse(&get, "SCOUT_PLACES_LIMIT")?.unwrap_or(defaults.places_limit),
            session_idle: parse(&get, "SCOUT_SESSION_IDLE_MINS")?
                .map(|mins: u64| Duration::from_secs(mins * 60))
                .unwrap_or(defaults.session_idle),
            user_agent: get("SCOUT_USER_AGENT").unwrap_or(defaults.user_agent),
        })
    }
}

/// An angle in `[-limit, limit]` degrees.
fn degrees<G>(get: &G, key: &'static str, limit: f64) -> Result<Option<f64>, ScoutError>
where
    G: Fn(&str) -> Option<String>,
{
    match parse::<f64, G>(get, key)? {
        Some(value) if !(-limit..=limit).contains(&value) => Err(ScoutError::Config {
            key,
            reason: format!("{value} is outside ±{limit}°"),
        }),
        value => Ok(value),
    }
}

fn parse<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ScoutError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ScoutError::Config {
                key,
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.geocoder, GeocoderKind::Nominatim);
        assert_eq!(config.places, PlacesKind::Overpass);
        assert_eq!(config.fallback, FALLBACK_POSITION);
        assert_eq!(config.location_timeout, Duration::from_secs(20));
        assert_eq!(config.session_idle, Duration::from_secs(7200));
        assert!(config.google_maps_token.is_none());
    }

    #[test]
    fn google_backends_require_a_token() {
        let err = Config::from_lookup(lookup(&[("SCOUT_PLACES", "google")])).unwrap_err();
        assert!(matches!(err, ScoutError::MissingConfig("GOOGLE_MAPS_TOKEN")));

        let config = Config::from_lookup(lookup(&[
            ("SCOUT_PLACES", "google"),
            ("SCOUT_GEOCODER", "google"),
            ("GOOGLE_MAPS_TOKEN", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.places, PlacesKind::Google);
        assert_eq!(config.geocoder, GeocoderKind::Google);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("SCOUT_FALLBACK_LAT", "51.5"),
            ("SCOUT_FALLBACK_LNG", "-0.12"),
            ("SCOUT_LOCATION_TIMEOUT_MS", "500"),
            ("SCOUT_PLACES_LIMIT", "10"),
            ("SCOUT_SESSION_IDLE_MINS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.fallback, Coordinates { lat: 51.5, lng: -0.12 });
        assert_eq!(config.location_timeout, Duration::from_millis(500));
        assert_eq!(config.places_limit, 10);
        assert_eq!(config.session_idle, Duration::from_secs(300));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Config::from_lookup(lookup(&[("SCOUT_GEOCODER", "bing")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SCOUT_FALLBACK_LAT", "north")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SCOUT_FALLBACK_LAT", "95")])).is_err());
    }

    #[test]
    fn fallback_errors_name_the_offending_key() {
        let lng = Config::from_lookup(lookup(&[("SCOUT_FALLBACK_LNG", "200")]));
        assert!(matches!(
            lng,
            Err(ScoutError::Config { key: "SCOUT_FALLBACK_LNG", .. })
        ));
        let lat = Config::from_lookup(lookup(&[
            ("SCOUT_FALLBACK_LAT", "-91"),
            ("SCOUT_FALLBACK_LNG", "10"),
        ]));
        assert!(matches!(
            lat,
            Err(ScoutError::Config { key: "SCOUT_FALLBACK_LAT", .. })
        ));
        assert!(Config::from_lookup(lookup(&[("SCOUT_FALLBACK_LNG", "NaN")])).is_err());
    }
}
