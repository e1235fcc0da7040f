//! Scene setup

pub mod config;

pub use config::SceneConfig;
