pub mod activity_id;
pub mod kmh;
pub mod location;
pub mod meters;
pub mod optimization_profile;
pub mod order;
pub mod route_stop;
pub mod time_window;
pub mod travel_matrix;
pub mod vehicle;
pub mod vehicle_routing_problem;
