//! In-memory model of what the map shows.
//!
//! Every change the search pipeline makes is one of the transition methods on
//! [`MapState`]; nothing else mutates markers, the route or the results list.

use derive_more::{Display, From};
use log::*;

use crate::services::routing::Route;
use crate::services::{BoundingBox, Coordinates, Destination, PlaceCandidate, Position};

pub const CITY_ZOOM: u8 = 13;
pub const FALLBACK_ZOOM: u8 = 10;
const MAX_ZOOM: u8 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From)]
pub struct MarkerId(u64);

/// Identifier of one search. Only the latest issued one may touch the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From)]
#[display(fmt = "#{}", _0)]
pub struct SearchId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    pub coords: Coordinates,
    pub popup: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub center: Coordinates,
    pub zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    Device,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentPosition {
    pub position: Position,
    pub source: PositionSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: &'static str,
    pub opacity: f32,
    pub weight: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOptions {
    pub route_while_dragging: bool,
    pub show_alternatives: bool,
    pub add_waypoints: bool,
    pub draggable_waypoints: bool,
    pub fit_selected_routes: bool,
    pub line: LineStyle,
}

impl Default for RouteOptions {
    fn default() -> Self {
        RouteOptions {
            route_while_dragging: false,
            show_alternatives: false,
            add_waypoints: false,
            draggable_waypoints: false,
            fit_selected_routes: true,
            line: LineStyle {
                color: "blue",
                opacity: 0.7,
                weight: 7,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOverlay {
    pub route: Route,
    pub bounds: BoundingBox,
    pub options: RouteOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub text: String,
    pub marker: Option<MarkerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapState {
    pub view: View,
    pub position: Option<CurrentPosition>,
    pub user_marker: Option<Marker>,
    pub destination_marker: Option<Marker>,
    pub route: Option<RouteOverlay>,
    pub poi_layer: Vec<Marker>,
    pub results: Vec<ListEntry>,
    notices: Vec<Notice>,
    next_marker: u64,
    latest_search: u64,
}

impl Default for MapState {
    fn default() -> Self {
        MapState {
            view: View {
                center: Coordinates { lat: 0.0, lng: 0.0 },
                zoom: 2,
            },
            position: None,
            user_marker: None,
            destination_marker: None,
            route: None,
            poi_layer: Vec::new(),
            results: Vec::new(),
            notices: Vec::new(),
            next_marker: 0,
            latest_search: 0,
        }
    }
}

impl MapState {
    fn marker(&mut self, coords: Coordinates, popup: String) -> Marker {
        self.next_marker += 1;
        Marker {
            id: MarkerId(self.next_marker),
            coords,
            popup,
        }
    }

    /// Places the user marker, or moves it if it already exists.
    fn place_user_marker(&mut self, coords: Coordinates, popup: String) {
        if let Some(marker) = self.user_marker.as_mut() {
            marker.coords = coords;
            marker.popup = popup;
            return;
        }
        self.user_marker = Some(self.marker(coords, popup));
    }

    pub fn notify(&mut self, severity: Severity, text: impl Into<String>) {
        let text = text.into();
        debug!("Notice ({severity:?}): {text}");
        self.notices.push(Notice { severity, text });
    }

    #[cfg(test)]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn located(&mut self, position: Position) -> CurrentPosition {
        let popup = match position.accuracy {
            Some(accuracy) => format!("You are here (approx. {}m accuracy)", accuracy.round()),
            None => "You are here".to_string(),
        };
        let current = CurrentPosition {
            position,
            source: PositionSource::Device,
        };
        self.position = Some(current);
        self.view = View {
            center: position.coords,
            zoom: CITY_ZOOM,
        };
        self.place_user_marker(position.coords, popup);
        current
    }

    pub fn fell_back(&mut self, coords: Coordinates, reason: &str) -> CurrentPosition {
        let current = CurrentPosition {
            position: Position {
                coords,
                accuracy: None,
            },
            source: PositionSource::Fallback,
        };
        self.position = Some(current);
        self.view = View {
            center: coords,
            zoom: FALLBACK_ZOOM,
        };
        self.place_user_marker(coords, format!("Default Location - {reason}"));
        current
    }

    /// Starts a search: issues a new ticket and removes everything the previous
    /// search put on the map.
    pub fn begin_search(&mut self) -> SearchId {
        self.latest_search += 1;
        if self.route.take().is_some() {
            trace!("Removed previous route.");
        }
        self.destination_marker = None;
        self.clear_places();
        SearchId(self.latest_search)
    }

    pub fn is_latest(&self, search: SearchId) -> bool {
        search.0 == self.latest_search
    }

    pub fn place_destination(&mut self, destination: &Destination) {
        let popup = format!("Destination: {}", destination.display_name);
        self.destination_marker = Some(self.marker(destination.coords, popup));
    }

    /// Shows `route` as the only active route and returns its bounding box.
    pub fn show_route(&mut self, route: Route, options: RouteOptions) -> Option<BoundingBox> {
        let bounds = route.bounds()?;
        if options.fit_selected_routes {
            self.view = View {
                center: bounds.center(),
                zoom: zoom_to_fit(&bounds),
            };
        }
        self.route = Some(RouteOverlay {
            route,
            bounds,
            options,
        });
        Some(bounds)
    }

    pub fn clear_places(&mut self) {
        self.poi_layer.clear();
        self.results.clear();
    }

    /// Fills the POI layer and results list. Candidates without any usable
    /// coordinate are dropped.
    pub fn show_places(&mut self, query: &str, candidates: Vec<PlaceCandidate>) {
        if candidates.is_empty() {
            self.results.push(ListEntry {
                text: "No results found.".to_string(),
                marker: None,
            });
            return;
        }
        for candidate in candidates {
            let Some(coords) = candidate.coordinates() else {
                trace!("Skipping place without coordinates: {:?}", candidate.name);
                continue;
            };
            let name = candidate
                .name
                .or_else(|| candidate.category.clone())
                .unwrap_or_else(|| query.to_string());
            let label = candidate
                .label
                .or(candidate.category)
                .unwrap_or_else(|| "Address not available".to_string());
            let marker = self.marker(coords, format!("{name}\n{label}"));
            self.results.push(ListEntry {
                text: name,
                marker: Some(marker.id),
            });
            self.poi_layer.push(marker);
        }
    }
}

/// Web-mercator zoom level at which `bounds` fits a 256px tile.
fn zoom_to_fit(bounds: &BoundingBox) -> u8 {
    let lat_span = (bounds.north - bounds.south).abs();
    let lng_span = (bounds.east - bounds.west).abs();
    let span = lat_span.max(lng_span);
    if span <= f64::EPSILON {
        return MAX_ZOOM;
    }
    (360.0 / span).log2().floor().clamp(1.0, MAX_ZOOM as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: Option<&str>, coords: Option<(f64, f64)>) -> PlaceCandidate {
        PlaceCandidate {
            name: name.map(str::to_string),
            location: coords.map(|(lat, lng)| Coordinates { lat, lng }),
            ..Default::default()
        }
    }

    #[test]
    fn user_marker_is_created_once_and_moved() {
        let mut state = MapState::default();
        state.located(Position {
            coords: Coordinates { lat: 1.0, lng: 2.0 },
            accuracy: Some(12.4),
        });
        let first = state.user_marker.clone().unwrap();
        assert_eq!(first.popup, "You are here (approx. 12m accuracy)");
        assert_eq!(state.view.zoom, CITY_ZOOM);

        state.fell_back(Coordinates { lat: 3.0, lng: 4.0 }, "geolocation not supported");
        let moved = state.user_marker.clone().unwrap();
        assert_eq!(moved.id, first.id);
        assert_eq!(moved.coords, Coordinates { lat: 3.0, lng: 4.0 });
        assert!(moved.popup.starts_with("Default Location"));
        assert_eq!(state.view.zoom, FALLBACK_ZOOM);
    }

    #[test]
    fn begin_search_clears_previous_overlays() {
        let mut state = MapState::default();
        state.show_places("coffee", vec![candidate(Some("A"), Some((1.0, 1.0)))]);
        state.place_destination(&Destination {
            display_name: "Somewhere".to_string(),
            coords: Coordinates { lat: 1.0, lng: 1.0 },
        });
        let first = state.begin_search();
        assert!(state.poi_layer.is_empty());
        assert!(state.results.is_empty());
        assert!(state.destination_marker.is_none());
        assert!(state.route.is_none());

        let second = state.begin_search();
        assert!(second > first);
        assert!(state.is_latest(second));
        assert!(!state.is_latest(first));
    }

    #[test]
    fn places_without_coordinates_are_skipped() {
        let mut state = MapState::default();
        state.show_places(
            "coffee",
            vec![
                candidate(Some("Good"), Some((1.0, 1.0))),
                candidate(Some("Lost"), None),
                candidate(None, Some((2.0, 2.0))),
            ],
        );
        assert_eq!(state.poi_layer.len(), 2);
        let names: Vec<&str> = state.results.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(names, ["Good", "coffee"]);
        assert_eq!(state.poi_layer[0].popup, "Good\nAddress not available");
        assert_eq!(state.results[1].marker, Some(state.poi_layer[1].id));
    }

    #[test]
    fn empty_result_renders_single_entry() {
        let mut state = MapState::default();
        state.show_places("coffee", Vec::new());
        assert!(state.poi_layer.is_empty());
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].text, "No results found.");
    }

    #[test]
    fn route_fits_the_view() {
        let mut state = MapState::default();
        let route = Route {
            coordinates: vec![
                Coordinates { lat: 34.0, lng: -118.3 },
                Coordinates { lat: 34.1, lng: -118.2 },
            ],
            distance: 1.0,
            duration: 1.0,
        };
        let bounds = state.show_route(route, RouteOptions::default()).unwrap();
        assert_eq!(state.view.center, bounds.center());
        assert_eq!(state.view.zoom, 11);
        assert_eq!(state.route.as_ref().unwrap().options.line.color, "blue");
    }

    #[test]
    fn zoom_is_clamped() {
        let point = BoundingBox {
            south: 1.0,
            west: 1.0,
            north: 1.0,
            east: 1.0,
        };
        assert_eq!(zoom_to_fit(&point), MAX_ZOOM);
        let world = BoundingBox {
            south: -80.0,
            west: -180.0,
            north: 80.0,
            east: 180.0,
        };
        assert_eq!(zoom_to_fit(&world), 1);
    }

    #[test]
    fn notices_drain() {
        let mut state = MapState::default();
        state.notify(Severity::Warning, "careful");
        assert_eq!(state.notices().len(), 1);
        assert_eq!(state.take_notices()[0].text, "careful");
        assert!(state.notices().is_empty());
    }
}
