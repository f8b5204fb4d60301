//! QEats Search - Restaurant Discovery Engine
//!
//! Answers two questions for a diner at a location and time of day:
//! which restaurants are open and close enough to deliver
//! ([`RestaurantService::find_nearby`]), and which of those match a search
//! query by name, cuisine or menu item ([`RestaurantService::search`]).

pub mod aggregator;
pub mod criteria;
pub mod service;
pub mod telemetry;

pub use aggregator::{merge_dedup, Aggregator, ExecutionMode};
pub use criteria::{
    exact_pattern, partial_pattern, CriteriaSearcher, Criterion, ItemMatchTarget,
    RestaurantMatchTarget,
};
pub use service::RestaurantService;
pub use telemetry::{init_tracing, LogFormat};
