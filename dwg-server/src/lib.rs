//! DWG SMS server: configuration and event reporting for the
//! `dwg-server` binary.

pub mod config;
pub mod report;
