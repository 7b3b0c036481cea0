//! Timegrain - granular wall-clock time accounting for sequential test suites
//!
//! This library measures the time spent inside categorized operations
//! (device set/get commands, sleeps, subprocess runs) while a suite of test
//! cases executes, attributes every sample to the currently running test,
//! and emits an aggregated JSON/HTML report with optional collector upload.

pub mod aggregate;
pub mod category;
pub mod config;
pub mod context;
pub mod driver;
pub mod html_output;
pub mod intercept;
pub mod json_output;
pub mod ledger;
pub mod sample;
pub mod upload;
