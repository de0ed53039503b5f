pub mod error;
pub mod json;
pub mod problem;
pub mod solution;
pub mod solver;
mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
