// ABOUTME: Library module for delivery-db-tools
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod export;
pub mod sqlite;
pub mod utils;
