use tracing::debug;

use crate::problem::{location::Location, route_stop::RouteStop};

/// Orders a loaded vehicle's remaining stops by repeatedly driving to the
/// nearest unvisited one, starting from the vehicle position.
///
/// Deterministic: equal distances go to the stop listed first. Returned stops
/// carry their new 1-based `sequence`.
pub fn resequence_routes(stops: &[RouteStop], start_lat: f64, start_lon: f64) -> Vec<RouteStop> {
    debug!(
        stops = stops.len(),
        start_lat, start_lon, "Resequencing stops"
    );

    let locations: Vec<Location> = stops.iter().map(RouteStop::location).collect();
    let mut visited = vec![false; stops.len()];
    let mut current = Location::from_lat_lon(start_lat, start_lon);
    let mut ordered = Vec::with_capacity(stops.len());

    for sequence in 1..=stops.len() {
        let mut nearest: Option<(usize, f64)> = None;
        for (index, location) in locations.iter().enumerate() {
            if visited[index] {
                continue;
            }

            let distance = current.haversine_distance(location).value();
            if nearest.is_none_or(|(_, best)| distance.total_cmp(&best).is_lt()) {
                nearest = Some((index, distance));
            }
        }

        let Some((index, _)) = nearest else {
            break;
        };

        visited[index] = true;
        current = locations[index];
        ordered.push(RouteStop {
            sequence: u32::try_from(sequence).ok(),
            ..stops[index].clone()
        });
    }

    ordered
}
