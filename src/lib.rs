pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod repository;
pub mod service;
pub mod store;
pub mod version;
