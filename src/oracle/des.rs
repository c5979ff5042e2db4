//! DES/ECB known-plaintext oracle and the encrypt companion.
//!
//! Candidate keys are 56-bit integers expanded to 8 key bytes carrying 7
//! payload bits and one odd-parity bit (the LSB) each, matching the
//! OpenSSL-based tooling this crate replaces. A candidate verifies when the
//! ciphertext, decrypted under it, contains the configured pattern.

use des::Des;
use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use memchr::memmem;
use thiserror::Error;

use crate::oracle::Oracle;

/// DES block size in bytes.
pub const BLOCK_SIZE: usize = 8;

/// Pattern searched for in the decrypted plaintext by default.
pub const DEFAULT_PATTERN: &[u8] = b" the ";

/// Ciphertext used when no file is supplied; two DES blocks.
pub const EMBEDDED_CIPHERTEXT: [u8; 16] = [
    108, 245, 65, 63, 125, 200, 150, 66, 17, 170, 207, 170, 34, 31, 70, 215,
];

/// Bytes of plaintext recovered for the report line.
const PREVIEW_LIMIT: usize = 64;

/// Invalid oracle inputs, rejected before any worker starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("ciphertext is empty")]
    EmptyCiphertext,
    #[error("ciphertext length {0} is not a multiple of {BLOCK_SIZE}")]
    UnalignedCiphertext(usize),
    #[error("verification pattern is empty")]
    EmptyPattern,
}

/// Expand a 56-bit key into the 8-byte DES key block.
///
/// Byte `i` carries key bits `[7i, 7i+6]` in its upper seven bits; the low
/// bit is set so that every byte has odd parity.
pub fn expand_key(key56: u64) -> [u8; BLOCK_SIZE] {
    let mut packed = 0u64;
    let mut key = key56;
    for i in 0..8 {
        key <<= 1; // keep each byte's low bit free for parity
        packed |= key & (0xFE << (i * 8));
    }
    let mut block = packed.to_le_bytes();
    for byte in &mut block {
        let payload = *byte & 0xFE;
        *byte = payload | ((payload.count_ones() as u8 + 1) & 1);
    }
    block
}

fn cipher_for_key(key56: u64) -> Des {
    let key = expand_key(key56);
    Des::new(GenericArray::from_slice(&key))
}

fn decrypt_blocks(cipher: &Des, buf: &mut [u8]) {
    for block in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
}

fn encrypt_blocks(cipher: &Des, buf: &mut [u8]) {
    for block in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
}

/// Known-plaintext DES oracle: decrypts the ciphertext under the candidate
/// key and reports whether the pattern appears in the result.
#[derive(Debug, Clone)]
pub struct DesOracle {
    ciphertext: Vec<u8>,
    finder: memmem::Finder<'static>,
    scratch: Vec<u8>,
}

impl DesOracle {
    /// Build an oracle over `ciphertext`, validating the block-size and
    /// pattern invariants.
    pub fn new(ciphertext: Vec<u8>, pattern: &[u8]) -> Result<Self, OracleError> {
        if ciphertext.is_empty() {
            return Err(OracleError::EmptyCiphertext);
        }
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(OracleError::UnalignedCiphertext(ciphertext.len()));
        }
        if pattern.is_empty() {
            return Err(OracleError::EmptyPattern);
        }
        let scratch = vec![0u8; ciphertext.len()];
        Ok(Self {
            ciphertext,
            finder: memmem::Finder::new(pattern).into_owned(),
            scratch,
        })
    }

    /// Oracle over the embedded sample ciphertext.
    pub fn with_embedded(pattern: &[u8]) -> Result<Self, OracleError> {
        Self::new(EMBEDDED_CIPHERTEXT.to_vec(), pattern)
    }

    /// Decrypt the leading ciphertext blocks under `key`, for the report line.
    pub fn preview(&self, key: u64) -> Vec<u8> {
        let take = self.ciphertext.len().min(PREVIEW_LIMIT);
        let mut out = self.ciphertext[..take].to_vec();
        decrypt_blocks(&cipher_for_key(key), &mut out);
        out
    }
}

impl Oracle for DesOracle {
    fn verify(&mut self, candidate: u64) -> bool {
        self.scratch.copy_from_slice(&self.ciphertext);
        decrypt_blocks(&cipher_for_key(candidate), &mut self.scratch);
        self.finder.find(&self.scratch).is_some()
    }
}

/// PKCS#7-pad `data` to a whole number of DES blocks; always adds 1..=8 bytes.
pub fn pad_pkcs7(data: &[u8]) -> Vec<u8> {
    let pad = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(pad as u8).take(pad));
    out
}

/// Encrypt `plaintext` under `key56`, padding it first.
pub fn encrypt(key56: u64, plaintext: &[u8]) -> Vec<u8> {
    let mut buf = pad_pkcs7(plaintext);
    encrypt_blocks(&cipher_for_key(key56), &mut buf);
    buf
}
