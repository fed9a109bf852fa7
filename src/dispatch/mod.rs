pub mod events;
pub mod service;
pub mod store;
