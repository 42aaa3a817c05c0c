pub mod config;
pub mod metrics;
pub mod repository;
pub mod rest;
pub mod shutdown;
pub mod store;
pub mod sync;
