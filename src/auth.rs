//! Access credential model shared by the store, the decorator, and the refresh coordinator.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
