//! Skyledger Tools - weather oracles, the chat tool, and the manual form path
//!
//! Both entry paths resolve a location through an [`ObservationSource`] and
//! append through the same [`IngestionCoordinator`].

pub mod form;
pub mod invocation;
pub mod oracle;
pub mod registry;
pub mod tools;

pub use form::{FormInput, ManualEntry};
pub use invocation::{ToolInvocation, GET_WEATHER_FOR_LOCATION};
pub use oracle::{
    GeminiWeatherOracle, ObservationSource, ScriptedOracle, SimulatedOracle, WeatherOracle,
};
pub use registry::{Tool, ToolOutput, ToolRegistry};
pub use tools::weather::{weather_summary, WeatherTool};

use skyledger_chain::IngestionCoordinator;

/// Create the registry the chat assistant is offered.
pub fn create_default_registry(
    source: ObservationSource,
    coordinator: IngestionCoordinator,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(WeatherTool::new(source, coordinator));
    registry
}
