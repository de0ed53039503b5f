pub mod construction;
pub mod engine;
pub mod insertion;
pub mod ls;
pub mod resequence;
pub mod route_cost;
pub mod score;
pub mod solver_manager;
pub mod solver_params;
pub mod stop_signal;
pub mod working_solution;
