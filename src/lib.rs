//! Courier Library
//!
//! Background job queue with retries, dead-lettering and cron scheduling.

use shadow_rs::shadow;
shadow!(build);

pub mod cli;
pub mod config;
pub mod error;
pub mod external;
pub mod jobs;
pub mod logger;
pub mod worker;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
