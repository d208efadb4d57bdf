// Library for tests to access modules

pub mod clock;
pub mod collaborators;
pub mod config;
pub mod config_store;
pub mod cooldown;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod hysteresis;
pub mod locks;
pub mod models;
pub mod reconciler;
pub mod routes;
