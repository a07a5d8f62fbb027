//! Payload codec.
//!
//! Inbound: any host value the host passes as a payload becomes a byte span.
//! Strings, buffers and views are read without copying where the storage is
//! already contiguous; anything unrecognised decodes to an empty payload
//! rather than failing.
//!
//! Outbound: binary frames reach the host as an array buffer, every other
//! opcode as text.

use bytes::Bytes;

use wsbridge_core::types::OpCode;

use crate::host::HostValue;

/// Extract the payload bytes from a host value.
pub fn decode_input(value: &HostValue) -> Bytes {
    match value {
        HostValue::Text(s) => Bytes::copy_from_slice(s.as_bytes()),
        HostValue::Buffer(b) | HostValue::ArrayBuffer(b) => b.clone(),
        HostValue::TypedArray(view) => view.bytes(),
        _ => Bytes::new(),
    }
}

/// Decode a payload as text, replacing invalid UTF-8 sequences.
pub fn decode_text(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

/// Build the host value for a payload delivered with `opcode`.
pub fn encode_output(payload: &[u8], opcode: OpCode) -> HostValue {
    if opcode.is_binary() {
        HostValue::ArrayBuffer(Bytes::copy_from_slice(payload))
    } else {
        HostValue::Text(decode_text(payload))
    }
}
