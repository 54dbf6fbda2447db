//! Autokey XOR cipher used on every local transport.
//!
//! Wire format:
//! ```text
//! UDP:  [ciphertext:N]
//! TCP:  [plaintext_len:4 (big-endian)][ciphertext:N]
//! ```
//!
//! # How the cipher works (for beginners)
//!
//! The cipher keeps a single byte of state, the *key*.  It starts at
//! [`SEED_KEY`] for every message.  Each plaintext character is XORed with the
//! key to produce one ciphertext byte, and that ciphertext byte becomes the
//! key for the next character:
//!
//! ```text
//! key = 0xAB
//! 'A' (0x41) ^ 0xAB = 0xEA   -> key = 0xEA
//! 'B' (0x42) ^ 0xEA = 0x88   -> key = 0x88
//! 'C' (0x43) ^ 0x88 = 0xCB
//! ```
//!
//! Decryption runs the same XOR, but the key is updated with the *incoming*
//! ciphertext byte, so both directions stay in lock-step.  No state survives
//! between calls: every message is enciphered independently.
//!
//! # Character semantics
//!
//! Devices treat the plaintext as a sequence of characters, not UTF-8 bytes.
//! [`encrypt`] therefore walks decoded `char`s and keeps only the low byte of
//! each code point.  ASCII text (everything the devices actually send) round
//! trips exactly; code points above `0x7F` do not.

use crate::protocol::error::ProtocolError;

/// Initial key byte for every encrypt/decrypt call.
pub const SEED_KEY: u8 = 0xAB;

/// Size of the big-endian length prefix on framed (TCP) messages.
pub const FRAME_HEADER_SIZE: usize = 4;

// ── Public API ────────────────────────────────────────────────────────────────

/// Enciphers `plaintext`, producing one byte per character.
///
/// # Examples
///
/// ```rust
/// use smartlight_core::protocol::cipher::encrypt;
///
/// assert_eq!(encrypt("ABC"), vec![0xEA, 0x88, 0xCB]);
/// ```
pub fn encrypt(plaintext: &str) -> Vec<u8> {
    let mut key = SEED_KEY;
    plaintext
        .chars()
        .map(|ch| {
            // Low byte of the code point; see module docs.
            let c = key ^ (ch as u32 as u8);
            key = c;
            c
        })
        .collect()
}

/// Deciphers `ciphertext` back into text.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] if the deciphered bytes are not valid UTF-8.
///
/// # Examples
///
/// ```rust
/// use smartlight_core::protocol::cipher::decrypt;
///
/// assert_eq!(decrypt(&[0xEA, 0x88, 0xCB]).unwrap(), "ABC");
/// ```
pub fn decrypt(ciphertext: &[u8]) -> Result<String, ProtocolError> {
    let mut key = SEED_KEY;
    let plain: Vec<u8> = ciphertext
        .iter()
        .map(|&c| {
            let p = key ^ c;
            key = c;
            p
        })
        .collect();
    Ok(String::from_utf8(plain)?)
}

/// Enciphers `plaintext` and prepends its 4-byte big-endian length.
///
/// The length counts characters, which equals the ciphertext byte count.
pub fn encrypt_framed(plaintext: &str) -> Vec<u8> {
    let body = encrypt(plaintext);
    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + body.len());
    buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
    buf.extend_from_slice(&body);
    buf
}

/// Skips the 4-byte length header and deciphers the remainder.
///
/// The declared length is not checked against the body; stream readers use
/// [`frame_len`] to decide how many bytes to read before calling this.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if `bytes` is shorter than the header,
/// or [`ProtocolError::Decode`] if the body is not valid UTF-8 once deciphered.
pub fn decrypt_framed(bytes: &[u8]) -> Result<String, ProtocolError> {
    if bytes.len() < FRAME_HEADER_SIZE {
        return Err(ProtocolError::Truncated {
            needed: FRAME_HEADER_SIZE,
            available: bytes.len(),
        });
    }
    decrypt(&bytes[FRAME_HEADER_SIZE..])
}

/// Decodes the body length declared by a frame header.
pub fn frame_len(header: [u8; FRAME_HEADER_SIZE]) -> usize {
    u32::from_be_bytes(header) as usize
}

// ── Tests ─────────────────────────────────────────────────────────────────────
