pub mod metrics;
pub mod person;
pub mod store;
