use std::fmt::Write as _;

use crate::map::{MapState, Notice, PositionSource, Severity};
use crate::services::Coordinates;

const MAX_LISTED: usize = 15;

pub fn osm_link(center: &Coordinates, zoom: u8) -> String {
    format!(
        "https://www.openstreetmap.org/?mlat={lat:.5}&mlon={lng:.5}#map={zoom}/{lat:.5}/{lng:.5}",
        lat = center.lat,
        lng = center.lng,
    )
}

pub fn notices(notices: &[Notice]) -> String {
    let mut out = String::new();
    for notice in notices {
        let prefix = match notice.severity {
            Severity::Warning => "⚠️",
            Severity::Error => "❌",
        };
        let _ = writeln!(out, "{prefix} {}", notice.text);
    }
    out
}

/// Plain-text picture of the map. Contains nothing that differs between two
/// renderings of the same visible state.
pub fn summary(state: &MapState) -> String {
    let mut out = String::new();

    match (&state.position, &state.user_marker) {
        (Some(current), Some(marker)) => {
            let source = match current.source {
                PositionSource::Device => "device",
                PositionSource::Fallback => "fallback",
            };
            let _ = writeln!(out, "📍 {} ({source}): {}", marker.coords, marker.popup);
        }
        _ => {
            let _ = writeln!(out, "📍 Location unknown.");
        }
    }

    if let Some(marker) = &state.destination_marker {
        let _ = writeln!(out, "🏁 {} at {}", marker.popup, marker.coords);
    }

    if let Some(overlay) = &state.route {
        let _ = writeln!(
            out,
            "🛣️ Route: {:.1} km, {} min, {} points, bounds {}",
            overlay.route.distance / 1000.0,
            (overlay.route.duration / 60.0).round(),
            overlay.route.coordinates.len(),
            overlay.bounds,
        );
    }

    if !state.results.is_empty() {
        let _ = writeln!(out, "Results:");
        for (index, entry) in state.results.iter().take(MAX_LISTED).enumerate() {
            let marker = entry
                .marker
                .and_then(|id| state.poi_layer.iter().find(|m| m.id == id));
            match marker {
                Some(marker) => {
                    let detail = marker.popup.lines().nth(1).unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "{}. **{}** ({}) {}",
                        index + 1,
                        entry.text,
                        detail,
                        marker.coords
                    );
                }
                None => {
                    let _ = writeln!(out, "- {}", entry.text);
                }
            }
        }
        if state.results.len() > MAX_LISTED {
            let _ = writeln!(out, "…and {} more.", state.results.len() - MAX_LISTED);
        }
    }

    let _ = write!(out, "🗺️ {}", osm_link(&state.view.center, state.view.zoom));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Destination, PlaceCandidate, Position};

    #[test]
    fn link_points_at_the_view() {
        let link = osm_link(&Coordinates { lat: 34.0522, lng: -118.2437 }, 10);
        assert_eq!(
            link,
            "https://www.openstreetmap.org/?mlat=34.05220&mlon=-118.24370#map=10/34.05220/-118.24370"
        );
    }

    #[test]
    fn summary_lists_places_with_their_address() {
        let mut state = MapState::default();
        state.located(Position {
            coords: Coordinates { lat: 37.76, lng: -122.41 },
            accuracy: None,
        });
        state.place_destination(&Destination {
            display_name: "Golden Gate Bridge".to_string(),
            coords: Coordinates { lat: 37.82, lng: -122.48 },
        });
        state.show_places(
            "coffee",
            vec![PlaceCandidate {
                name: Some("Warming Hut".to_string()),
                label: Some("983 Marine Dr".to_string()),
                location: Some(Coordinates { lat: 37.8085, lng: -122.4735 }),
                ..Default::default()
            }],
        );

        let text = summary(&state);
        assert!(text.contains("(device): You are here"));
        assert!(text.contains("Destination: Golden Gate Bridge"));
        assert!(text.contains("1. **Warming Hut** (983 Marine Dr) 37.80850, -122.47350"));
        assert!(text.ends_with("#map=13/37.76000/-122.41000"));
    }

    #[test]
    fn notices_are_prefixed_by_severity() {
        let mut state = MapState::default();
        state.notify(Severity::Warning, "Using the default location.");
        state.notify(Severity::Error, "Destination not found.");
        assert_eq!(
            notices(state.notices()),
            "⚠️ Using the default location.\n❌ Destination not found.\n"
        );
    }
}
