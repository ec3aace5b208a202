//! Domain models for the nutrition clinic.

mod appointment;
mod assessment;
mod patient;

pub use appointment::*;
pub use assessment::*;
pub use patient::*;
