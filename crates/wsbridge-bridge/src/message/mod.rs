//! Message payload conversion between host values and engine byte spans.

pub mod codec;

pub use codec::{decode_input, decode_text, encode_output};
