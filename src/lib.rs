pub mod clock;
pub mod config;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod read_model;
pub mod simulation;
pub mod utils;
