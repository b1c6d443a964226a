//! HTTP front end for the daycast forecaster

pub mod api;
pub mod config;
