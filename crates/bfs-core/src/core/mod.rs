//! Stateless math and the data contracts shared with the simulation driver.

pub mod basis;
pub mod coeff;
pub mod cv;
pub mod grid;
pub mod snapshot;
