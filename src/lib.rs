// Breakdown model and ranking
pub mod worth;

// Island data source
pub mod provider;

// Breakdown cache
pub mod cache;

// Observer presence and display tracking
pub mod presence;
pub mod display;
pub mod tracker;

// Inbound worth events
pub mod event;

// Refresh pipeline and lifecycle
pub mod service;

// Value command
pub mod command;

// Counters and availability reporting
pub mod telemetry;

// HTTP and WebSocket APIs
pub mod api;

pub mod config;
