pub mod coarse_clock;
pub mod l0;

pub use l0::{L0Cache, L0Stats};
