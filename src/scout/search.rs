use log::*;

use super::{latest, Scout, SearchReport, Session};
use crate::error::ScoutError;
use crate::map::{SearchId, Severity};
use crate::services::routing::RouteOutcome;
use crate::services::{BoundingBox, Coordinates, Destination};

const NO_ROUTE: &str = "Sorry, we could not find a route to that destination.";

impl Scout {
    /// Geocodes `destination`, routes to it from the current position and, when
    /// `category` is not blank, lists matching places around the route.
    pub async fn search(
        &self,
        session: &Session,
        destination: &str,
        category: &str,
    ) -> Result<SearchReport, ScoutError> {
        let destination = destination.trim();
        let category = category.trim();

        let (search, origin) = {
            let mut state = session.lock().await;
            if destination.is_empty() {
                state.notify(Severity::Error, "Please enter a destination!");
                return Err(ScoutError::EmptyDestination);
            }
            let Some(current) = state.position else {
                state.notify(
                    Severity::Error,
                    "Your current location is not available. Please allow location access.",
                );
                return Err(ScoutError::MissingPosition);
            };
            (state.begin_search(), current.position.coords)
        };
        info!("Search {search}: {destination:?} from {origin}, places {category:?}.");

        let target = self.geocode(session, search, destination).await?;
        let bounds = self.draw_route(session, search, origin, &target).await?;
        let places = if category.is_empty() {
            None
        } else {
            Some(self.find_places(session, search, category, &bounds).await?)
        };

        Ok(SearchReport {
            search,
            destination: target,
            bounds,
            places,
        })
    }

    async fn geocode(
        &self,
        session: &Session,
        search: SearchId,
        query: &str,
    ) -> Result<Destination, ScoutError> {
        trace!("Starting geocoding for destination {query:?}.");
        let result = self.geocoder.geocode(query).await;
        let mut state = latest(session, search).await?;
        match result {
            Ok(Some(destination)) => {
                debug!(
                    "Destination found: {} at {}.",
                    destination.display_name, destination.coords
                );
                Ok(destination)
            }
            Ok(None) => {
                warn!("Geocoding found nothing for {query:?}.");
                state.notify(
                    Severity::Error,
                    "Destination not found. Please try a more specific address or place name.",
                );
                Err(ScoutError::DestinationNotFound(query.to_string()))
            }
            Err(e) => {
                error!("Error during geocoding: {e}");
                state.notify(
                    Severity::Error,
                    "An error occurred while geocoding the destination.",
                );
                Err(e)
            }
        }
    }

    async fn draw_route(
        &self,
        session: &Session,
        search: SearchId,
        origin: Coordinates,
        target: &Destination,
    ) -> Result<BoundingBox, ScoutError> {
        latest(session, search).await?.place_destination(target);

        let outcome = self.router.route(origin, target.coords).await;
        let mut state = latest(session, search).await?;
        match outcome {
            RouteOutcome::Found(route) => {
                let points = route.coordinates.len();
                match state.show_route(route, self.route_options.clone()) {
                    Some(bounds) => {
                        debug!("Route found with {points} points, bounds {bounds}.");
                        Ok(bounds)
                    }
                    None => {
                        error!("No route coordinates available for place search.");
                        state.notify(Severity::Error, NO_ROUTE);
                        Err(ScoutError::Routing(NO_ROUTE.to_string()))
                    }
                }
            }
            RouteOutcome::Error(message) => {
                error!("Routing error: {message}");
                state.notify(Severity::Error, format!("Routing error: {message}"));
                Err(ScoutError::Routing(message))
            }
        }
    }

    async fn find_places(
        &self,
        session: &Session,
        search: SearchId,
        category: &str,
        bounds: &BoundingBox,
    ) -> Result<usize, ScoutError> {
        latest(session, search).await?.clear_places();
        trace!("Searching for {category:?} within {bounds}.");

        let result = self.places.search(category, bounds).await;
        let mut state = latest(session, search).await?;
        match result {
            Ok(candidates) => {
                debug!("Place search returned {} candidates.", candidates.len());
                state.show_places(category, candidates);
                Ok(state.poi_layer.len())
            }
            Err(e) => {
                error!("Error during place search: {e}");
                state.notify(
                    Severity::Error,
                    "An error occurred while searching for points of interest.",
                );
                Err(e)
            }
        }
    }
}
