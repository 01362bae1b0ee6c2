use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::*;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::{Config, GeocoderKind, PlacesKind};
use crate::error::ScoutError;
use crate::map::{MapState, RouteOptions, SearchId};
use crate::services::{
    geocoding::{GeocodingService, GoogleMapsService, NominatimService},
    http_client,
    location::PositionOptions,
    places::{GooglePlacesService, OverpassService, PlaceSearchService},
    routing::{OsrmService, RoutingService},
    BoundingBox, Coordinates, Destination,
};

mod locate;
mod search;


/// One user's map. The lock is never held across a network call.
pub type Session = Arc<Mutex<MapState>>;

/// Drives the location, geocoding, routing and place-search steps against a session.
pub struct Scout {
    geocoder: Box<dyn GeocodingService>,
    router: Box<dyn RoutingService>,
    places: Box<dyn PlaceSearchService>,
    position_options: PositionOptions,
    fallback: Coordinates,
    route_options: RouteOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub search: SearchId,
    pub destination: Destination,
    pub bounds: BoundingBox,
    /// Number of places shown, `None` when no category was given.
    pub places: Option<usize>,
}

impl Scout {
    pub fn new(config: &Config) -> Result<Self, ScoutError> {
        let http = http_client(config)?;
        let geocoder: Box<dyn GeocodingService> = match config.geocoder {
            GeocoderKind::Nominatim => Box::new(NominatimService::new(config, http.clone())?),
            GeocoderKind::Google => Box::new(GoogleMapsService::new(config, http.clone())?),
        };
        let places: Box<dyn PlaceSearchService> = match config.places {
            PlacesKind::Overpass => Box::new(OverpassService::new(config, http.clone())?),
            PlacesKind::Google => Box::new(GooglePlacesService::new(config, http.clone())?),
        };
        let router = Box::new(OsrmService::new(config, http)?);
        info!(
            "Scout ready with {:?} geocoding and {:?} place search.",
            config.geocoder, config.places
        );
        Ok(Self::with_services(config, geocoder, router, places))
    }

    pub fn with_services(
        config: &Config,
        geocoder: Box<dyn GeocodingService>,
        router: Box<dyn RoutingService>,
        places: Box<dyn PlaceSearchService>,
    ) -> Self {
        Scout {
            geocoder,
            router,
            places,
            position_options: PositionOptions::from_config(config),
            fallback: config.fallback,
            route_options: RouteOptions::default(),
        }
    }
}

/// Locks the session on behalf of `search`, refusing if a newer search has started.
async fn latest(session: &Session, search: SearchId) -> Result<MutexGuard<'_, MapState>, ScoutError> {
    let state = session.lock().await;
    if !state.is_latest(search) {
        debug!("Discarding result of superseded search {search}.");
        return Err(ScoutError::Superseded);
    }
    Ok(state)
}

/// Map sessions keyed by user id. Sessions idle for longer than `idle` are
/// dropped the next time any session is opened.
pub struct Sessions {
    idle: Duration,
    sessions: Mutex<HashMap<u64, (Session, Instant)>>,
}

impl Sessions {
    pub fn new(config: &Config) -> Self {
        Sessions {
            idle: config.session_idle,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn open(&self, user: u64) -> Session {
        self.open_at(user, Instant::now()).await
    }

    async fn open_at(&self, user: u64, now: Instant) -> Session {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, (_, used)| now.saturating_duration_since(*used) <= self.idle);
        if sessions.len() < before {
            debug!("Evicted {} idle map sessions.", before - sessions.len());
        }
        let (session, used) = sessions.entry(user).or_insert_with(|| {
            trace!("Opened map session for user {user}.");
            (Arc::new(Mutex::new(MapState::default())), now)
        });
        *used = now;
        session.clone()
    }

    pub async fn close(&self, user: u64) -> bool {
        self.sessions.lock().await.remove(&user).is_some()
    }
}
