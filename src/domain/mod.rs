pub mod price;
pub mod snapshot;
pub mod strategy;

pub use price::*;
pub use snapshot::*;
pub use strategy::*;
