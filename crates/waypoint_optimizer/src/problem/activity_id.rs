use super::order::OrderIdx;

/// A visit the solver schedules on a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityId {
    Pickup(OrderIdx),
    Delivery(OrderIdx),
}

impl ActivityId {
    pub fn order_id(&self) -> OrderIdx {
        match self {
            ActivityId::Pickup(order_id) | ActivityId::Delivery(order_id) => *order_id,
        }
    }

    pub fn is_pickup(&self) -> bool {
        matches!(self, ActivityId::Pickup(_))
    }
}
