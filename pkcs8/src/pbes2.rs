//! PBES2 (RFC 8018 section 6.2) password-based encryption.

use asn1::{Element, OctetString};
use origata::decoder::{DecodableFrom, Decoder};
use origata::encoder::{EncodableTo, Encoder};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::algorithm::{AlgorithmIdentifier, AlgorithmParameters};
use crate::encrypted::EncryptedPrivateKeyInfo;
use crate::error::{Error, Result};
use crate::kdf::KdfRegistry;
use crate::kdf::pbkdf2::Pbkdf2Options;
use crate::scheme::EncryptionScheme;
use crate::types::PrivateKeyInfo;

/*
RFC 8018 - PKCS #5: Password-Based Cryptography Specification

PBES2-params ::= SEQUENCE {
    keyDerivationFunc AlgorithmIdentifier {{PBES2-KDFs}},
    encryptionScheme AlgorithmIdentifier {{PBES2-Encs}}
}
*/

/// PBES2 parameter block pairing a KDF with an encryption scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbes2Params {
    pub key_derivation_func: AlgorithmIdentifier,
    pub encryption_scheme: AlgorithmIdentifier,
}

impl DecodableFrom<Element> for Pbes2Params {}

impl Decoder<Element, Pbes2Params> for Element {
    type Error = Error;

    fn decode(&self) -> Result<Pbes2Params> {
        let elements = match self {
            Element::Sequence(elements) => elements,
            _ => {
                return Err(Error::InvalidStructure(
                    "PBES2 parameters must be a SEQUENCE".into(),
                ));
            }
        };
        if elements.len() != 2 {
            return Err(Error::InvalidStructure(
                "PBES2 parameters must have exactly 2 elements".into(),
            ));
        }
        Ok(Pbes2Params {
            key_derivation_func: elements[0].decode()?,
            encryption_scheme: elements[1].decode()?,
        })
    }
}

impl EncodableTo<Pbes2Params> for Element {}

impl Encoder<Pbes2Params, Element> for Pbes2Params {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        Ok(Element::Sequence(vec![
            self.key_derivation_func.encode()?,
            self.encryption_scheme.encode()?,
        ]))
    }
}

impl EncryptedPrivateKeyInfo {
    /// Decrypts the envelope with `password`, resolving the KDF through
    /// `registry`.
    ///
    /// Padding failures and implausible plaintext both surface as
    /// [`Error::DecryptionFailed`] so a caller cannot tell a wrong
    /// password from corrupted data.
    pub fn decrypt(&self, password: &[u8], registry: &KdfRegistry) -> Result<PrivateKeyInfo> {
        let outer = &self.encryption_algorithm;
        if *outer.algorithm() != AlgorithmIdentifier::OID_PBES2 {
            return Err(Error::UnsupportedAlgorithm(outer.algorithm().to_string()));
        }
        let params_element = outer.parameters_element().ok_or_else(|| {
            Error::InvalidStructure("PBES2 requires a parameter SEQUENCE".into())
        })?;
        let params: Pbes2Params = params_element.decode()?;

        let kdf = registry.resolve(&params.key_derivation_func)?;
        let scheme = EncryptionScheme::from_oid(params.encryption_scheme.algorithm())?;
        let iv = match params.encryption_scheme.parameters_element() {
            Some(Element::OctetString(iv)) => iv.as_bytes(),
            _ => {
                return Err(Error::InvalidStructure(
                    "encryption scheme parameters must be an OCTET STRING IV".into(),
                ));
            }
        };

        let key = kdf.derive_key(password, scheme.key_len())?;
        let plain = scheme.decrypt(&key, iv, self.encrypted_data.as_bytes())?;

        // Plausibility check: the plaintext must parse as a single
        // PrivateKeyInfo. With an unauthenticated cipher anything else
        // means a wrong password or tampering.
        let element = crate::element_from_der(&plain).map_err(|_| Error::DecryptionFailed)?;
        let info: PrivateKeyInfo = element.decode().map_err(|_| Error::DecryptionFailed)?;
        Ok(info)
    }

    /// Encrypts a DER-encoded PrivateKeyInfo under `password` with
    /// PBKDF2 and AES-256-CBC.
    pub fn encrypt(
        plain_der: &[u8],
        password: &[u8],
        options: &Pbkdf2Options,
    ) -> Result<EncryptedPrivateKeyInfo> {
        let scheme = EncryptionScheme::Aes256Cbc;
        let (key, kdf_params) = options.derive_for_encryption(password, scheme.key_len())?;

        let mut iv = vec![0u8; scheme.block_size()];
        OsRng.fill_bytes(&mut iv);

        let encrypted = scheme.encrypt(&key, &iv, plain_der)?;

        let params = Pbes2Params {
            key_derivation_func: AlgorithmIdentifier::new_with_params(
                AlgorithmIdentifier::OID_PBKDF2.parse()?,
                AlgorithmParameters::Other(kdf_params.encode()?),
            ),
            encryption_scheme: AlgorithmIdentifier::new_with_params(
                scheme.oid()?,
                AlgorithmParameters::Other(Element::OctetString(OctetString::new(iv))),
            ),
        };

        Ok(EncryptedPrivateKeyInfo {
            encryption_algorithm: AlgorithmIdentifier::new_with_params(
                AlgorithmIdentifier::OID_PBES2.parse()?,
                AlgorithmParameters::Other(params.encode()?),
            ),
            encrypted_data: OctetString::new(encrypted),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypted::tests::{ENCRYPTED_EC_PKCS8_PEM, ENCRYPTED_RSA_PKCS8_PEM};
    use crate::tests::decode_pem_body;
    use rstest::rstest;

    fn decode_envelope(pem: &str) -> EncryptedPrivateKeyInfo {
        let element = crate::element_from_der(&decode_pem_body(pem)).unwrap();
        element.decode().unwrap()
    }

    #[rstest(pem, case(ENCRYPTED_RSA_PKCS8_PEM), case(ENCRYPTED_EC_PKCS8_PEM))]
    fn test_decrypt(pem: &str) {
        let envelope = decode_envelope(pem);

        let info = envelope
            .decrypt(b"test", &KdfRegistry::default())
            .unwrap();

        assert_eq!(crate::types::Version::V1, info.version);
    }

    #[rstest]
    fn test_decrypt_wrong_password() {
        let envelope = decode_envelope(ENCRYPTED_RSA_PKCS8_PEM);

        let result = envelope.decrypt(b"wrong", &KdfRegistry::default());

        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[rstest]
    fn test_decrypt_not_pbes2() {
        let mut envelope = decode_envelope(ENCRYPTED_RSA_PKCS8_PEM);
        envelope.encryption_algorithm =
            AlgorithmIdentifier::new("1.2.840.113549.1.5.3".parse().unwrap());

        let result = envelope.decrypt(b"test", &KdfRegistry::default());

        assert!(matches!(result, Err(Error::UnsupportedAlgorithm(_))));
    }

    #[rstest]
    fn test_decrypt_empty_registry() {
        let envelope = decode_envelope(ENCRYPTED_RSA_PKCS8_PEM);

        let result = envelope.decrypt(b"test", &KdfRegistry::empty());

        assert!(matches!(result, Err(Error::UnsupportedKdf(_))));
    }

    #[rstest]
    fn test_encrypt_decrypt_roundtrip() {
        let plain = decode_envelope(ENCRYPTED_RSA_PKCS8_PEM)
            .decrypt(b"test", &KdfRegistry::default())
            .unwrap();
        let plain_der = crate::element_to_der(&plain.encode().unwrap()).unwrap();

        let envelope = EncryptedPrivateKeyInfo::encrypt(
            &plain_der,
            b"new password",
            &Pbkdf2Options::default(),
        )
        .unwrap();

        let recovered = envelope
            .decrypt(b"new password", &KdfRegistry::default())
            .unwrap();
        assert_eq!(plain, recovered);
    }
}
