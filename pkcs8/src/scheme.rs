//! PBES2 encryption schemes.
//!
//! Only AES-256-CBC is implemented. CBC without a MAC does not
//! authenticate the ciphertext, so a wrong password is detected only
//! heuristically through padding and structure checks.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use asn1::ObjectIdentifier;

use crate::error::{Error, Result};

pub const OID_AES_256_CBC: &str = "2.16.840.1.101.3.4.1.42";

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Symmetric cipher used inside a PBES2 envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionScheme {
    Aes256Cbc,
}

impl EncryptionScheme {
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        if *oid == OID_AES_256_CBC {
            Ok(EncryptionScheme::Aes256Cbc)
        } else {
            Err(Error::UnsupportedCipher(oid.to_string()))
        }
    }

    pub fn oid(&self) -> Result<ObjectIdentifier> {
        match self {
            EncryptionScheme::Aes256Cbc => Ok(OID_AES_256_CBC.parse()?),
        }
    }

    /// Key size in bytes
    pub fn key_len(&self) -> usize {
        match self {
            EncryptionScheme::Aes256Cbc => 32,
        }
    }

    /// Cipher block size in bytes
    pub fn block_size(&self) -> usize {
        match self {
            EncryptionScheme::Aes256Cbc => 16,
        }
    }

    /// Encrypts `plain` under `key` and `iv`, applying PKCS#7 padding.
    pub fn encrypt(&self, key: &[u8], iv: &[u8], plain: &[u8]) -> Result<Vec<u8>> {
        match self {
            EncryptionScheme::Aes256Cbc => {
                let padded = pad(plain, self.block_size());
                let cipher = Aes256CbcEnc::new_from_slices(key, iv)
                    .map_err(|e| Error::InvalidStructure(e.to_string()))?;
                Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(&padded))
            }
        }
    }

    /// Decrypts `data` under `key` and `iv` and strips PKCS#7 padding.
    ///
    /// Malformed padding maps to [`Error::DecryptionFailed`]; with an
    /// unauthenticated cipher that is indistinguishable from a wrong
    /// password.
    pub fn decrypt(&self, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        match self {
            EncryptionScheme::Aes256Cbc => {
                let block_size = self.block_size();
                if iv.len() != block_size {
                    return Err(Error::InvalidStructure(format!(
                        "IV must be {} bytes, got {}",
                        block_size,
                        iv.len()
                    )));
                }
                if data.is_empty() || data.len() % block_size != 0 {
                    return Err(Error::InvalidStructure(
                        "ciphertext length must be a positive multiple of the block size".into(),
                    ));
                }
                let cipher = Aes256CbcDec::new_from_slices(key, iv)
                    .map_err(|e| Error::InvalidStructure(e.to_string()))?;
                let mut plain = cipher
                    .decrypt_padded_vec_mut::<NoPadding>(data)
                    .map_err(|_| Error::DecryptionFailed)?;
                unpad(&mut plain, block_size)?;
                Ok(plain)
            }
        }
    }
}

// PKCS#7: always appends 1..=block_size bytes, each holding the pad length.
fn pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - data.len() % block_size;
    let mut padded = data.to_vec();
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

fn unpad(data: &mut Vec<u8>, block_size: usize) -> Result<()> {
    let pad_len = match data.last() {
        Some(&last) => last as usize,
        None => return Err(Error::DecryptionFailed),
    };
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(Error::DecryptionFailed);
    }
    if data[data.len() - pad_len..].iter().any(|&b| b as usize != pad_len) {
        return Err(Error::DecryptionFailed);
    }
    data.truncate(data.len() - pad_len);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const KEY: [u8; 32] = [0x42; 32];
    const IV: [u8; 16] = [0x24; 16];

    #[rstest(plain_len, case(0), case(1), case(15), case(16), case(17), case(100))]
    fn test_encrypt_decrypt_roundtrip(plain_len: usize) {
        let plain: Vec<u8> = (0..plain_len).map(|i| i as u8).collect();
        let scheme = EncryptionScheme::Aes256Cbc;

        let encrypted = scheme.encrypt(&KEY, &IV, &plain).unwrap();

        // padding always adds a full or partial block
        assert_eq!(0, encrypted.len() % 16);
        assert!(encrypted.len() > plain.len());

        let decrypted = scheme.decrypt(&KEY, &IV, &encrypted).unwrap();
        assert_eq!(plain, decrypted);
    }

    #[rstest]
    fn test_decrypt_wrong_key() {
        let scheme = EncryptionScheme::Aes256Cbc;
        let encrypted = scheme.encrypt(&KEY, &IV, b"attack at dawn").unwrap();

        let wrong_key = [0x43u8; 32];
        let result = scheme.decrypt(&wrong_key, &IV, &encrypted);

        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[rstest]
    fn test_decrypt_bad_iv_length() {
        let scheme = EncryptionScheme::Aes256Cbc;

        let result = scheme.decrypt(&KEY, &[0u8; 8], &[0u8; 16]);

        assert!(matches!(result, Err(Error::InvalidStructure(_))));
    }

    #[rstest(data, case(vec![]), case(vec![0u8; 15]), case(vec![0u8; 17]))]
    fn test_decrypt_bad_ciphertext_length(data: Vec<u8>) {
        let scheme = EncryptionScheme::Aes256Cbc;

        let result = scheme.decrypt(&KEY, &IV, &data);

        assert!(matches!(result, Err(Error::InvalidStructure(_))));
    }

    #[rstest(len, expected_pad, case(0, 16), case(1, 15), case(15, 1), case(16, 16))]
    fn test_pad(len: usize, expected_pad: usize) {
        let padded = pad(&vec![0xaa; len], 16);

        assert_eq!(len + expected_pad, padded.len());
        assert!(padded[len..].iter().all(|&b| b as usize == expected_pad));
    }

    #[rstest(
        tail,
        case(vec![0x00]),
        case(vec![0x11]),
        case(vec![0x01, 0x02]),
    )]
    fn test_unpad_rejects(tail: Vec<u8>) {
        let mut data = vec![0xaa; 16 - tail.len()];
        data.extend(tail);

        assert!(matches!(unpad(&mut data, 16), Err(Error::DecryptionFailed)));
    }

    #[rstest]
    fn test_from_oid() {
        let oid: ObjectIdentifier = OID_AES_256_CBC.parse().unwrap();
        assert_eq!(
            EncryptionScheme::Aes256Cbc,
            EncryptionScheme::from_oid(&oid).unwrap()
        );

        let des3: ObjectIdentifier = "1.2.840.113549.3.7".parse().unwrap();
        assert!(matches!(
            EncryptionScheme::from_oid(&des3),
            Err(Error::UnsupportedCipher(_))
        ));
    }
}
