pub mod delivery;
pub mod errors;
pub mod models;
pub mod ports;
pub mod service;
pub mod token;
pub mod validation;
