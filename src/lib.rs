// src/lib.rs

pub mod browse;
pub mod config;
pub mod normalize;
pub mod scrape;
pub mod store;
