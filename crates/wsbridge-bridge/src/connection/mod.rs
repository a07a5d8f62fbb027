//! Connection identity and per-connection user data.

pub mod identity;
pub mod user_data;

pub use identity::ConnectionRef;
pub use user_data::UserDataSlot;
