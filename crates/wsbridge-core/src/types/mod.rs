//! Core type definitions used across the WsBridge workspace.

pub mod address;
pub mod id;
pub mod opcode;
pub mod role;

pub use address::Address;
pub use id::*;
pub use opcode::OpCode;
pub use role::{Client, Role, RoleKind, Server};
