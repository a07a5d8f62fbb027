//! Send-completion tracking.

pub mod tracker;

pub use tracker::SendOperation;
