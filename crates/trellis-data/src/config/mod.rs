//! Configuration for trellis loading and layout

pub mod null_handling;
pub mod trellis_config;

pub use null_handling::NullConfig;
pub use trellis_config::TrellisConfig;
