//! Asset snapshots, the type hierarchy, and the inventory they come from.

pub mod inventory;
pub mod model;
pub mod types;
