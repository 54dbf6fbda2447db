//! Protocol module containing the wire cipher and the envelope format.

pub mod cipher;
pub mod envelope;
pub mod error;

pub use cipher::{decrypt, decrypt_framed, encrypt, encrypt_framed, frame_len, FRAME_HEADER_SIZE};
pub use envelope::{namespace_of, to_wire_json, unwrap, wrap, Request};
pub use error::ProtocolError;
