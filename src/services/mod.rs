//! Business logic services

pub mod geo;
pub mod navigation;
pub mod proximity;
pub mod routing;
pub mod sessions;
