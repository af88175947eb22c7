pub mod analysis;
pub mod config;
pub mod fetch;
pub mod series;
pub mod store;
