use smallvec::SmallVec;

use crate::{
    problem::{activity_id::ActivityId, vehicle::VehicleIdx},
    solver::{score::Score, working_solution::WorkingSolution},
};

pub type RoutePair = (VehicleIdx, VehicleIdx);

/// Rewritten routes of a candidate move, borrowed for the duration of a
/// consumer call.
pub type RouteChanges<'a> = [(VehicleIdx, &'a [ActivityId])];

pub trait LocalSearchOperator {
    const NAME: &'static str;

    /// Calls `consumer` with the score change and the rewritten routes of
    /// every valid move on the pair.
    fn generate_moves<C>(solution: &WorkingSolution, pair: RoutePair, consumer: C)
    where
        C: FnMut(Score, &RouteChanges);
}

#[derive(Debug, Clone)]
pub struct LocalSearchMove {
    pub operator: &'static str,
    pub delta: Score,
    pub changes: SmallVec<[(VehicleIdx, Vec<ActivityId>); 2]>,
}

impl LocalSearchMove {
    pub fn new(operator: &'static str, delta: Score, changes: &RouteChanges) -> Self {
        LocalSearchMove {
            operator,
            delta,
            changes: changes
                .iter()
                .map(|&(vehicle_id, activities)| (vehicle_id, activities.to_vec()))
                .collect(),
        }
    }

    pub fn touches(&self, vehicle_id: VehicleIdx) -> bool {
        self.changes.iter().any(|(id, _)| *id == vehicle_id)
    }

    pub fn apply(self, solution: &mut WorkingSolution) {
        for (vehicle_id, activities) in self.changes {
            solution.replace_route(vehicle_id, activities);
        }
    }
}
