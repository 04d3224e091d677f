pub mod context;
pub mod service;
