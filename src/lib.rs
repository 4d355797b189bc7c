//! Terminal dashboard for epidemic counters.
//!
//! The data pipeline (gateway, ranking, catalog, coordinator) is independent
//! of the terminal layer (`app`, `ui`, `map`) and can be driven on its own.

pub mod app;
pub mod basemap;
pub mod braille;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod coordinator;
pub mod format;
pub mod gateway;
pub mod map;
pub mod model;
pub mod rank;
pub mod ui;

pub use coordinator::{Coordinator, RegionRequest, SelectionOutcome, ViewState};
pub use gateway::{Gateway, GatewayError, HttpGateway};
pub use model::{CounterSnapshot, MapFocus, Metric, RegionOption, RegionRecord, RegionSelection};
