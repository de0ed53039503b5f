use jiff::SignedDuration;
use rayon::prelude::*;

use crate::problem::{kmh::Kmh, location::LocationIdx, meters::Meters};

use super::location::Location;

/// Distances and travel times between every pair of problem locations.
///
/// Stored flat: the entry for a pair is at `from * num_locations + to`.
pub struct TravelMatrix {
    distances: Vec<f64>,
    times: Vec<SignedDuration>,
    num_locations: usize,
}

impl TravelMatrix {
    /// Great-circle distances, travelled at a constant average speed.
    pub fn from_haversine(locations: &[Location], speed: Kmh) -> Self {
        let num_locations = locations.len();
        let mut distances = vec![0.0; num_locations * num_locations];

        if num_locations > 0 {
            distances
                .par_chunks_mut(num_locations)
                .enumerate()
                .for_each(|(i, row)| {
                    let from = &locations[i];
                    for (j, to) in locations.iter().enumerate() {
                        row[j] = from.haversine_distance(to).value();
                    }
                });
        }

        let times = distances
            .iter()
            .map(|&distance| Meters::new(distance) / speed)
            .collect();

        TravelMatrix {
            distances,
            times,
            num_locations,
        }
    }

    #[inline(always)]
    fn index(&self, from: LocationIdx, to: LocationIdx) -> usize {
        from.get() * self.num_locations + to.get()
    }

    #[inline(always)]
    pub fn travel_distance(&self, from: LocationIdx, to: LocationIdx) -> Meters {
        if from == to {
            return Meters::ZERO;
        }

        Meters::new(self.distances[self.index(from, to)])
    }

    #[inline(always)]
    pub fn travel_time(&self, from: LocationIdx, to: LocationIdx) -> SignedDuration {
        if from == to {
            return SignedDuration::ZERO;
        }

        self.times[self.index(from, to)]
    }

    pub fn num_locations(&self) -> usize {
        self.num_locations
    }
}
