//! Soil water balance and soil temperature.

mod balance;
pub mod processes;
mod temperature;

pub use balance::{SoilWaterBalance, WaterBalanceInputs, WaterBalanceOutputs};
pub use temperature::soil_temperature;
