//! Type definitions

pub mod geo;
pub mod messages;
pub mod navigation;
pub mod route;

pub use geo::*;
pub use messages::*;
pub use navigation::*;
pub use route::*;
