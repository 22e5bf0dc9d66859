// File: src/lib.rs
pub mod client;
pub mod config;
pub mod directions;
pub mod error;
pub mod gateway;
pub mod model;
pub mod paths;
pub mod screen;
pub mod session;
pub mod storage;
pub mod store;

// --- ANDROID SUPPORT ---
pub mod mobile;

uniffi::setup_scaffolding!();
