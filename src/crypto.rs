//! SHA3-256 digests for public commitments

use sha3::{Digest, Sha3_256};

pub type Hash = [u8; 32];

pub fn sha3(data: &[u8]) -> Hash {
    Sha3_256::digest(data).into()
}

/// SHA3-256 as 64 lowercase hex chars.
pub fn sha3_hex(data: &[u8]) -> String {
    hex::encode(sha3(data))
}
