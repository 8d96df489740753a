//! Timekeeper - work-time tracking service
//!
//! Users log in for a signed bearer token, stamp their start and end times
//! from an external time authority, and an administrator reviews and
//! corrects the recorded times.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
