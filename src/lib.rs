//! Read-mostly tag cache: loaders that refresh three published tag
//! collections from a tag store, and the readers that serve them.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
