//! Borehole heat exchanger: geometry, fluid circulation and the coupling
//! between the circulating fluid and the ground model.

pub mod circulation;
pub mod error;
pub mod exchanger;
pub mod geometry;
pub mod query;

pub use circulation::FluidCirculationState;
pub use error::{BoreholeError, BoreholeResult};
pub use exchanger::{BoreholeExchanger, CirculationInputs, FluidSolution};
pub use geometry::{BoreholeGeometry, ExchangerType, FlowConfiguration, ThermalResistances};
pub use query::{Region, classify, point_temperature};
