use uuid::Uuid;

use crate::{
    define_index_newtype,
    error::{PlanningError, ensure_non_negative},
};

use super::{location::Location, time_window::TimeWindow};

define_index_newtype!(OrderIdx, Order);

/// Routing view of a delivery order. Read-only for the planner.
///
/// An order with a pickup location is modelled as a pickup followed by a
/// delivery on the same route; without one, goods are loaded at the depot and
/// only the delivery is visited.
#[derive(Debug, Clone)]
pub struct Order {
    id: Uuid,
    pickup_location: Option<Location>,
    delivery_location: Location,
    weight: f64,
    volume: f64,
    time_window: Option<TimeWindow>,
    required_services: Vec<String>,
}

impl Order {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pickup_location(&self) -> Option<&Location> {
        self.pickup_location.as_ref()
    }

    pub fn delivery_location(&self) -> &Location {
        &self.delivery_location
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn time_window(&self) -> Option<&TimeWindow> {
        self.time_window.as_ref()
    }

    pub fn required_services(&self) -> &[String] {
        &self.required_services
    }

    pub fn has_pickup(&self) -> bool {
        self.pickup_location.is_some()
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Order {}

#[derive(Default)]
pub struct OrderBuilder {
    id: Option<Uuid>,
    pickup_location: Option<Location>,
    delivery_location: Option<Location>,
    weight: Option<f64>,
    volume: Option<f64>,
    time_window: Option<TimeWindow>,
    required_services: Vec<String>,
}

impl OrderBuilder {
    pub fn set_id(&mut self, id: Uuid) -> &mut OrderBuilder {
        self.id = Some(id);
        self
    }

    pub fn set_pickup_location(&mut self, location: Location) -> &mut OrderBuilder {
        self.pickup_location = Some(location);
        self
    }

    pub fn set_delivery_location(&mut self, location: Location) -> &mut OrderBuilder {
        self.delivery_location = Some(location);
        self
    }

    pub fn set_weight(&mut self, weight: f64) -> &mut OrderBuilder {
        self.weight = Some(weight);
        self
    }

    pub fn set_volume(&mut self, volume: f64) -> &mut OrderBuilder {
        self.volume = Some(volume);
        self
    }

    pub fn set_time_window(&mut self, time_window: TimeWindow) -> &mut OrderBuilder {
        self.time_window = Some(time_window);
        self
    }

    pub fn set_required_services(&mut self, services: Vec<String>) -> &mut OrderBuilder {
        self.required_services = services;
        self
    }

    pub fn build(self) -> Result<Order, PlanningError> {
        let id = self
            .id
            .ok_or_else(|| PlanningError::invalid("order.id", "missing"))?;
        let delivery_location = self
            .delivery_location
            .ok_or_else(|| PlanningError::invalid("order.delivery", format!("missing for {id}")))?;

        let weight = self.weight.unwrap_or(0.0);
        let volume = self.volume.unwrap_or(0.0);
        ensure_non_negative("order.weight", weight)?;
        ensure_non_negative("order.volume", volume)?;

        if let Some((Some(start), Some(end))) = self
            .time_window
            .map(|window| (window.start(), window.end()))
        {
            if start > end {
                return Err(PlanningError::invalid(
                    "order.time_window",
                    format!("window of {id} ends before it starts"),
                ));
            }
        }

        Ok(Order {
            id,
            pickup_location: self.pickup_location,
            delivery_location,
            weight,
            volume,
            time_window: self.time_window.filter(|window| !window.is_empty()),
            required_services: self.required_services,
        })
    }
}
