//! Model of the host runtime's values as seen by the bridge.

pub mod function;
pub mod persistent;
pub mod value;

pub use function::{HostException, HostFunction};
pub use persistent::Persistent;
pub use value::{ByteView, External, HostValue};
