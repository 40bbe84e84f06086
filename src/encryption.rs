//! AES-256 sealing of the embedded payload.
//!
//! Plaintext layout: u32 big-endian length, data, zero padding up to the
//! next 16-byte boundary. Blocks are encrypted independently.

use std::fmt;

use aes::Aes256;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use crate::constants::{AES_BLOCK_SIZE, ENCRYPTION_KEY_SIZE};
use crate::error::{DrmError, Result};

const LENGTH_PREFIX_SIZE: usize = 4;

#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; ENCRYPTION_KEY_SIZE]);

impl EncryptionKey {
    pub fn new(bytes: [u8; ENCRYPTION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = hex::decode(text.trim()).map_err(|_| DrmError::InvalidKeyLength)?;
        Self::try_from(bytes.as_slice())
    }

    pub fn as_bytes(&self) -> &[u8; ENCRYPTION_KEY_SIZE] {
        &self.0
    }

    fn cipher(&self) -> Aes256 {
        Aes256::new(GenericArray::from_slice(&self.0))
    }
}

impl TryFrom<&[u8]> for EncryptionKey {
    type Error = DrmError;

    fn try_from(value: &[u8]) -> Result<Self> {
        let bytes: [u8; ENCRYPTION_KEY_SIZE] =
            value.try_into().map_err(|_| DrmError::InvalidKeyLength)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

pub fn encrypt(data: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    let length = u32::try_from(data.len()).map_err(|_| DrmError::PayloadTooLarge)?;
    let padded_len = (LENGTH_PREFIX_SIZE + data.len()).div_ceil(AES_BLOCK_SIZE) * AES_BLOCK_SIZE;

    let mut buffer = Vec::with_capacity(padded_len);
    buffer.extend_from_slice(&length.to_be_bytes());
    buffer.extend_from_slice(data);
    buffer.resize(padded_len, 0);

    let cipher = key.cipher();
    for block in buffer.chunks_exact_mut(AES_BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }

    Ok(buffer)
}

pub fn decrypt(data: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() % AES_BLOCK_SIZE != 0 {
        return Err(DrmError::CorruptedEmbeddedBlock);
    }

    let mut buffer = data.to_vec();
    let cipher = key.cipher();
    for block in buffer.chunks_exact_mut(AES_BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }

    let length = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    let end = length
        .checked_add(LENGTH_PREFIX_SIZE)
        .ok_or(DrmError::CorruptedEmbeddedBlock)?;
    // The length must fit and must not leave a whole spare block behind.
    if end > buffer.len() || buffer.len() - end >= AES_BLOCK_SIZE {
        return Err(DrmError::CorruptedEmbeddedBlock);
    }

    buffer.truncate(end);
    buffer.drain(..LENGTH_PREFIX_SIZE);
    Ok(buffer)
}
