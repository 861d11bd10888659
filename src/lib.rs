//! idle-shutdownd - powers the machine off after a long period of inactivity.
//!
//! Samples time since the last keyboard/pointer input, warns the user once the
//! idle threshold is reached and commits a shutdown unless input resumes
//! within the grace period.

pub mod config;
pub mod domain;
pub mod event_log;
pub mod idle;
pub mod monitor;
pub mod notify;
pub mod shutdown;

#[cfg(test)]
pub(crate) mod testing;
