//! CLI Commands

pub mod ab_test;
pub mod analyze;
pub mod config;
pub mod email;
pub mod export;
pub mod validate;
