//! PKCS#8 private key containers (RFC 5208, RFC 5958).
//!
//! Parses and builds DER-encoded `PrivateKeyInfo` and
//! `EncryptedPrivateKeyInfo` structures, with PBES2 password-based
//! encryption (RFC 8018) on the encrypted path: PBKDF2 key derivation
//! through a pluggable registry and AES-256-CBC as the cipher. The
//! key payload is dispatched on the algorithm OID into PKCS#1 RSA and
//! SEC1 elliptic curve key structures.
//!
//! PBES2 with CBC carries no MAC, so decryption failures are detected
//! only through padding and structural plausibility checks and all
//! surface as a single [`error::Error::DecryptionFailed`].
//!
//! ```no_run
//! use pkcs8::private_key::PrivateKey;
//!
//! # fn main() -> pkcs8::error::Result<()> {
//! # let der: Vec<u8> = vec![];
//! let key = PrivateKey::from_encrypted_der(&der, b"password")?;
//! if let Some(rsa) = key.as_rsa() {
//!     println!("modulus: {}", rsa.modulus.as_bigint());
//! }
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

pub mod algorithm;
pub mod encrypted;
pub mod error;
pub mod kdf;
pub mod pbes2;
pub mod pkcs1;
pub mod private_key;
pub mod scheme;
pub mod sec1;
pub mod types;

pub use encrypted::EncryptedPrivateKeyInfo;
pub use private_key::PrivateKey;
pub use types::{OneAsymmetricKey, PrivateKeyInfo};

use asn1::{ASN1Object, Element};
use der::Der;
use origata::decoder::Decoder;
use origata::encoder::Encoder;

use crate::error::{Error, Result};

/// Decodes a DER byte string expected to hold exactly one element.
pub(crate) fn element_from_der(bytes: &[u8]) -> Result<Element> {
    let der: Der = bytes.to_vec().decode()?;
    let object: ASN1Object = der.decode()?;
    match object.elements() {
        [element] => Ok(element.clone()),
        [] => Err(Error::InvalidStructure("no ASN.1 element found".into())),
        _ => Err(Error::InvalidStructure(
            "trailing data after ASN.1 element".into(),
        )),
    }
}

/// Encodes a single element as a DER byte string.
pub(crate) fn element_to_der(element: &Element) -> Result<Vec<u8>> {
    let der: Der = ASN1Object::new(vec![element.clone()]).encode()?;
    let bytes: Vec<u8> = der.encode()?;
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use rstest::rstest;

    use super::*;

    /// Strips PEM armor and decodes the base64 body.
    pub(crate) fn decode_pem_body(pem: &str) -> Vec<u8> {
        let body: String = pem
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect();
        STANDARD.decode(body).unwrap()
    }

    #[rstest]
    fn test_element_from_der_empty_input() {
        let result = element_from_der(&[]);

        assert!(matches!(result, Err(Error::InvalidStructure(_))));
    }

    // Bytes after the first top-level element are not silently ignored.
    #[rstest]
    fn test_element_from_der_trailing_data() {
        let result = element_from_der(&[0x05, 0x00, 0x05, 0x00]);

        assert!(matches!(result, Err(Error::InvalidStructure(_))));
    }
}
