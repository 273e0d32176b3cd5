//! Controller configuration loading

pub mod loader;

pub use loader::ConfigPersistence;
