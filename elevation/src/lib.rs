pub mod api;
pub mod batch;
pub mod cache;
pub mod config;
pub mod metrics_defs;
pub mod normalize;
pub mod proxy;
pub mod upstream;
