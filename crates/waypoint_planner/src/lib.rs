pub mod aggregator;
pub mod config;
pub mod error;
pub mod events;
pub mod fleet_filter;
pub mod intake;
pub mod scheduler;
pub mod sources;
pub mod tracking;

#[cfg(test)]
pub(crate) mod test_utils;
