//! Configuration loading and management for the billing engine.
//!
//! This module loads the rate schedule (daily-rate divisors, management-fee
//! rates, bonus tiers) from a YAML file.
//!
//! # Example
//!
//! ```no_run
//! use placement_billing::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Loaded schedule: {}", config.config().schedule.name);
//! ```

mod loader;
mod types;

pub use loader::{CONFIG_FILE_NAME, ConfigLoader};
pub use types::{EngineConfig, MaternityNurseRates, NannyRates, ScheduleMetadata, SubstituteRates};
