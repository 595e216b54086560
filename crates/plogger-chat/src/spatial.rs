//! Nearest-neighbour route building over the candidate set.
//!
//! Distances are planar Euclidean in `(mapx, mapy)` space, which is close
//! enough at city-district scale.

use tracing::debug;

use plogger_core::types::{Place, RouteStop, RouteSummary};

use crate::error::SpatialError;

/// Waypoints that follow the start when none is configured.
pub const DEFAULT_MAX_WAYPOINTS: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct SpatialSelector {
    max_waypoints: usize,
}

impl Default for SpatialSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WAYPOINTS)
    }
}

impl SpatialSelector {
    pub fn new(max_waypoints: usize) -> Self {
        Self { max_waypoints }
    }

    /// Route starting at the candidate titled `start_title`, followed by the
    /// nearest other candidates in ascending distance.
    ///
    /// Candidates sharing the start's title are not waypoints. Unparsable
    /// coordinates count as infinitely far; ties keep candidate order.
    pub fn build_route(
        &self,
        candidates: &[Place],
        start_title: &str,
    ) -> Result<RouteSummary, SpatialError> {
        let start = candidates
            .iter()
            .find(|place| place.title == start_title)
            .ok_or_else(|| SpatialError::StartNotFound(start_title.to_string()))?;
        let origin = start.coordinates();

        let mut others: Vec<(f64, &Place)> = candidates
            .iter()
            .filter(|place| place.title != start_title)
            .map(|place| (distance(origin, place.coordinates()), place))
            .collect();
        // `sort_by` is stable.
        others.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut route = Vec::with_capacity(self.max_waypoints + 1);
        route.push(RouteStop::from(start));
        route.extend(
            others
                .into_iter()
                .take(self.max_waypoints)
                .map(|(_, place)| RouteStop::from(place)),
        );

        debug!(start = start_title, stops = route.len(), "Route built");
        Ok(route)
    }
}

fn distance(origin: Option<(f64, f64)>, target: Option<(f64, f64)>) -> f64 {
    match (origin, target) {
        (Some((x0, y0)), Some((x1, y1))) => (x1 - x0).hypot(y1 - y0),
        _ => f64::INFINITY,
    }
}

/// Numbered lines `"<n>.<title>: <address>"`, marking the first stop
/// ` (출발지)` and the last ` (도착지)`.
pub fn render_route_text(route: &[RouteStop]) -> String {
    let last = route.len().saturating_sub(1);
    route
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            let marker = if i == 0 {
                " (출발지)"
            } else if i == last {
                " (도착지)"
            } else {
                ""
            };
            format!("{}.{}: {}{}", i + 1, stop.title, stop.address, marker)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(title: &str, x: &str, y: &str) -> Place {
        Place {
            title: title.to_string(),
            address: format!("{} road", title),
            map_x: x.to_string(),
            map_y: y.to_string(),
            ..Place::default()
        }
    }

    fn titles(route: &RouteSummary) -> Vec<&str> {
        route.iter().map(|s| s.title.as_str()).collect()
    }

    fn line() -> Vec<Place> {
        vec![
            place("A", "0", "0"),
            place("B", "1", "0"),
            place("C", "2", "0"),
            place("D", "3", "0"),
            place("E", "10", "10"),
        ]
    }

    // ---- build_route ----

    #[test]
    fn test_four_nearest_waypoints() {
        let route = SpatialSelector::default().build_route(&line(), "A").unwrap();
        assert_eq!(titles(&route), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_start_in_middle() {
        let route = SpatialSelector::default().build_route(&line(), "C").unwrap();
        // B and D tie at distance 1; candidate order breaks the tie.
        assert_eq!(titles(&route), vec!["C", "B", "D", "A", "E"]);
    }

    #[test]
    fn test_unknown_start() {
        let err = SpatialSelector::default()
            .build_route(&line(), "Z")
            .unwrap_err();
        assert_eq!(err, SpatialError::StartNotFound("Z".to_string()));
    }

    #[test]
    fn test_empty_candidates() {
        assert!(SpatialSelector::default().build_route(&[], "A").is_err());
    }

    #[test]
    fn test_invalid_coordinates_sort_last() {
        let candidates = vec![
            place("A", "0", "0"),
            place("Broken", "n/a", "0"),
            place("Far", "50", "50"),
            place("Near", "1", "1"),
        ];
        let route = SpatialSelector::default().build_route(&candidates, "A").unwrap();
        assert_eq!(titles(&route), vec!["A", "Near", "Far", "Broken"]);
    }

    #[test]
    fn test_invalid_start_keeps_candidate_order() {
        let candidates = vec![
            place("A", "", ""),
            place("B", "9", "9"),
            place("C", "1", "1"),
        ];
        let route = SpatialSelector::default().build_route(&candidates, "A").unwrap();
        assert_eq!(titles(&route), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_start_duplicates_excluded() {
        let candidates = vec![
            place("A", "0", "0"),
            place("A", "0.1", "0"),
            place("B", "1", "0"),
        ];
        let route = SpatialSelector::default().build_route(&candidates, "A").unwrap();
        assert_eq!(titles(&route), vec!["A", "B"]);
    }

    #[test]
    fn test_custom_waypoint_cap() {
        let route = SpatialSelector::new(2).build_route(&line(), "A").unwrap();
        assert_eq!(titles(&route), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_route_stops_keep_raw_coordinates() {
        let route = SpatialSelector::default()
            .build_route(&[place("A", "126.97", "37.57")], "A")
            .unwrap();
        assert_eq!(route[0].mapx, "126.97");
        assert_eq!(route[0].mapy, "37.57");
        assert_eq!(route[0].address, "A road");
    }

    // ---- render_route_text ----

    #[test]
    fn test_render_route_text() {
        let route = SpatialSelector::default().build_route(&line(), "A").unwrap();
        assert_eq!(
            render_route_text(&route),
            "1.A: A road (출발지)\n2.B: B road\n3.C: C road\n4.D: D road (도착지)"
        );
    }

    #[test]
    fn test_render_single_stop() {
        let route = vec![RouteStop::from(&place("A", "0", "0"))];
        assert_eq!(render_route_text(&route), "1.A: A road (출발지)");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_route_text(&[]), "");
    }
}
