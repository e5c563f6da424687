pub mod command;
pub mod config;
pub mod control;
pub mod error;
pub mod filter;
pub mod sensor;
pub mod station;
pub mod telemetry;
