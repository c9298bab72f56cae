pub mod instance;
pub mod routes;
pub mod service;
