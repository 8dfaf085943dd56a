//! Application services and the ports they depend on.

pub mod error;
pub mod render;
pub mod repos;
