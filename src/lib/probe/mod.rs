pub mod device;
pub mod metrics;
pub mod service;
