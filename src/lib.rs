pub mod aggregation;
pub mod authentication;
pub mod configuration;
pub mod domain;
pub mod lifecycle;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod utils;
