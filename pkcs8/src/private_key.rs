//! Typed private keys and the DER entry points.

use asn1::{Element, OctetString};
use origata::decoder::Decoder;
use origata::encoder::Encoder;

use crate::algorithm::{AlgorithmIdentifier, AlgorithmParameters};
use crate::encrypted::EncryptedPrivateKeyInfo;
use crate::error::{Error, Result};
use crate::kdf::KdfRegistry;
use crate::kdf::pbkdf2::Pbkdf2Options;
use crate::pkcs1::RSAPrivateKey;
use crate::sec1::{ECPrivateKey, NamedCurve};
use crate::types::{PrivateKeyInfo, Version};

/// A private key recovered from a PKCS#8 container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateKey {
    Rsa(RSAPrivateKey),
    Ec(ECPrivateKey),
}

impl From<RSAPrivateKey> for PrivateKey {
    fn from(key: RSAPrivateKey) -> Self {
        PrivateKey::Rsa(key)
    }
}

impl From<ECPrivateKey> for PrivateKey {
    fn from(key: ECPrivateKey) -> Self {
        PrivateKey::Ec(key)
    }
}

impl PrivateKey {
    /// Parses an unencrypted DER-encoded PrivateKeyInfo.
    ///
    /// Feeding an EncryptedPrivateKeyInfo here fails with
    /// [`Error::MissingPassword`] so a caller knows to retry with
    /// [`PrivateKey::from_encrypted_der`].
    pub fn from_der(bytes: &[u8]) -> Result<PrivateKey> {
        let element = crate::element_from_der(bytes)?;
        let info: Result<PrivateKeyInfo> = element.decode();
        match info {
            Ok(info) => Self::from_private_key_info(&info),
            Err(err) => {
                let encrypted: Result<EncryptedPrivateKeyInfo> = element.decode();
                if encrypted.is_ok() {
                    Err(Error::MissingPassword)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Decrypts and parses a DER-encoded EncryptedPrivateKeyInfo using
    /// the default KDF registry.
    pub fn from_encrypted_der(bytes: &[u8], password: &[u8]) -> Result<PrivateKey> {
        Self::from_encrypted_der_with(bytes, password, &KdfRegistry::default())
    }

    /// Decrypts and parses a DER-encoded EncryptedPrivateKeyInfo,
    /// resolving the KDF through `registry`.
    pub fn from_encrypted_der_with(
        bytes: &[u8],
        password: &[u8],
        registry: &KdfRegistry,
    ) -> Result<PrivateKey> {
        let element = crate::element_from_der(bytes)?;
        let encrypted: EncryptedPrivateKeyInfo = element.decode()?;
        let info = encrypted.decrypt(password, registry)?;
        Self::from_private_key_info(&info)
    }

    /// Serializes as an unencrypted DER-encoded PrivateKeyInfo.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let info = self.to_private_key_info()?;
        crate::element_to_der(&info.encode()?)
    }

    /// Serializes as a DER-encoded EncryptedPrivateKeyInfo under
    /// `password` with PBKDF2 and AES-256-CBC.
    pub fn to_encrypted_der(&self, password: &[u8], options: &Pbkdf2Options) -> Result<Vec<u8>> {
        let plain = self.to_der()?;
        let encrypted = EncryptedPrivateKeyInfo::encrypt(&plain, password, options)?;
        crate::element_to_der(&encrypted.encode()?)
    }

    /// Dispatches on the private key algorithm OID and parses the inner
    /// key structure.
    pub fn from_private_key_info(info: &PrivateKeyInfo) -> Result<PrivateKey> {
        let algorithm = &info.private_key_algorithm;
        let oid = algorithm.algorithm().to_string();
        match oid.as_str() {
            AlgorithmIdentifier::OID_RSA_ENCRYPTION => {
                let element = crate::element_from_der(info.private_key.as_bytes())?;
                let key: RSAPrivateKey = element.decode()?;
                Ok(PrivateKey::Rsa(key))
            }
            AlgorithmIdentifier::OID_EC_PUBLIC_KEY => {
                // RFC 5915: the curve in the outer AlgorithmIdentifier is
                // authoritative, the inner [0] slot is redundant.
                let curve = match algorithm.parameters_element() {
                    Some(Element::ObjectIdentifier(oid)) => NamedCurve::try_from(oid)?,
                    _ => {
                        return Err(Error::InvalidStructure(
                            "EC key algorithm parameters must be a named curve OID".into(),
                        ));
                    }
                };
                let element = crate::element_from_der(info.private_key.as_bytes())?;
                let mut key: ECPrivateKey = element.decode()?;
                match key.parameters {
                    Some(inner) if inner != curve => {
                        return Err(Error::InvalidStructure(format!(
                            "curve mismatch: {} in PrivateKeyInfo, {} in ECPrivateKey",
                            curve.name(),
                            inner.name()
                        )));
                    }
                    Some(_) => {}
                    None => key.parameters = Some(curve),
                }
                Ok(PrivateKey::Ec(key))
            }
            other => Err(Error::UnsupportedKeyType(other.to_string())),
        }
    }

    /// Wraps the key in a PrivateKeyInfo.
    ///
    /// The inner ECPrivateKey is written without its redundant [0]
    /// curve slot; the curve lives in the outer AlgorithmIdentifier.
    pub fn to_private_key_info(&self) -> Result<PrivateKeyInfo> {
        match self {
            PrivateKey::Rsa(key) => {
                let payload = crate::element_to_der(&key.encode()?)?;
                Ok(PrivateKeyInfo {
                    version: Version::V1,
                    private_key_algorithm: AlgorithmIdentifier::new_with_params(
                        AlgorithmIdentifier::OID_RSA_ENCRYPTION.parse()?,
                        AlgorithmParameters::Null,
                    ),
                    private_key: OctetString::new(payload),
                    attributes: None,
                    public_key: None,
                })
            }
            PrivateKey::Ec(key) => {
                let curve = key.parameters.ok_or_else(|| {
                    Error::UnsupportedKeyType("EC key without a named curve".into())
                })?;
                let inner = ECPrivateKey {
                    parameters: None,
                    ..key.clone()
                };
                let payload = crate::element_to_der(&inner.encode()?)?;
                Ok(PrivateKeyInfo {
                    version: Version::V1,
                    private_key_algorithm: AlgorithmIdentifier::new_with_params(
                        AlgorithmIdentifier::OID_EC_PUBLIC_KEY.parse()?,
                        AlgorithmParameters::Other(Element::ObjectIdentifier(curve.oid()?)),
                    ),
                    private_key: OctetString::new(payload),
                    attributes: None,
                    public_key: None,
                })
            }
        }
    }

    pub fn is_rsa(&self) -> bool {
        matches!(self, PrivateKey::Rsa(_))
    }

    pub fn is_ec(&self) -> bool {
        matches!(self, PrivateKey::Ec(_))
    }

    pub fn as_rsa(&self) -> Option<&RSAPrivateKey> {
        match self {
            PrivateKey::Rsa(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_ec(&self) -> Option<&ECPrivateKey> {
        match self {
            PrivateKey::Ec(key) => Some(key),
            _ => None,
        }
    }

    pub fn into_rsa(self) -> Option<RSAPrivateKey> {
        match self {
            PrivateKey::Rsa(key) => Some(key),
            _ => None,
        }
    }

    pub fn into_ec(self) -> Option<ECPrivateKey> {
        match self {
            PrivateKey::Ec(key) => Some(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asn1::{Integer, ObjectIdentifier};
    use rstest::rstest;

    fn sample_rsa() -> RSAPrivateKey {
        RSAPrivateKey {
            version: crate::pkcs1::Version::TwoPrime,
            modulus: Integer::from(3233),
            public_exponent: Integer::from(17),
            private_exponent: Integer::from(413),
            prime1: Integer::from(61),
            prime2: Integer::from(53),
            exponent1: Integer::from(53),
            exponent2: Integer::from(49),
            coefficient: Integer::from(38),
        }
    }

    fn sample_ec(curve: Option<NamedCurve>) -> ECPrivateKey {
        ECPrivateKey {
            version: crate::sec1::Version::V1,
            private_key: OctetString::from(&[0x42u8; 32][..]),
            parameters: curve,
            public_key: None,
        }
    }

    #[rstest]
    fn test_rsa_der_roundtrip() {
        let key = PrivateKey::Rsa(sample_rsa());

        let der = key.to_der().unwrap();
        let recovered = PrivateKey::from_der(&der).unwrap();

        assert_eq!(key, recovered);
    }

    #[rstest]
    fn test_ec_der_roundtrip() {
        let key = PrivateKey::Ec(sample_ec(Some(NamedCurve::Secp256r1)));

        let der = key.to_der().unwrap();
        let recovered = PrivateKey::from_der(&der).unwrap();

        assert_eq!(key, recovered);
    }

    #[rstest]
    fn test_ec_without_curve_rejected() {
        let key = PrivateKey::Ec(sample_ec(None));

        let result = key.to_der();

        assert!(matches!(result, Err(Error::UnsupportedKeyType(_))));
    }

    #[rstest]
    fn test_inner_curve_omitted() {
        let key = PrivateKey::Ec(sample_ec(Some(NamedCurve::Secp256r1)));

        let info = key.to_private_key_info().unwrap();
        let element = crate::element_from_der(info.private_key.as_bytes()).unwrap();
        let inner: ECPrivateKey = element.decode().unwrap();

        assert!(inner.parameters.is_none());
    }

    #[rstest]
    fn test_curve_mismatch_rejected() {
        let key = PrivateKey::Ec(sample_ec(Some(NamedCurve::Secp256r1)));
        let mut info = key.to_private_key_info().unwrap();

        // rewrite the inner key with a contradicting curve
        let inner = sample_ec(Some(NamedCurve::Secp384r1));
        info.private_key =
            OctetString::new(crate::element_to_der(&inner.encode().unwrap()).unwrap());

        let result = PrivateKey::from_private_key_info(&info);

        assert!(matches!(result, Err(Error::InvalidStructure(_))));
    }

    #[rstest]
    fn test_unknown_algorithm_rejected() {
        let key = PrivateKey::Rsa(sample_rsa());
        let mut info = key.to_private_key_info().unwrap();
        info.private_key_algorithm = AlgorithmIdentifier::new(
            ObjectIdentifier::new(vec![1, 3, 101, 112]), // Ed25519
        );

        let result = PrivateKey::from_private_key_info(&info);

        assert!(matches!(result, Err(Error::UnsupportedKeyType(_))));
    }

    #[rstest]
    fn test_encrypted_der_roundtrip() {
        let key = PrivateKey::Rsa(sample_rsa());

        let der = key
            .to_encrypted_der(b"hunter2", &Pbkdf2Options::default())
            .unwrap();
        let recovered = PrivateKey::from_encrypted_der(&der, b"hunter2").unwrap();

        assert_eq!(key, recovered);
    }

    #[rstest]
    fn test_from_der_on_encrypted_input() {
        let key = PrivateKey::Rsa(sample_rsa());
        let der = key
            .to_encrypted_der(b"hunter2", &Pbkdf2Options::default())
            .unwrap();

        let result = PrivateKey::from_der(&der);

        assert!(matches!(result, Err(Error::MissingPassword)));
    }

    #[rstest]
    fn test_accessors() {
        let rsa = PrivateKey::Rsa(sample_rsa());
        let ec = PrivateKey::Ec(sample_ec(Some(NamedCurve::Secp256r1)));

        assert!(rsa.is_rsa() && !rsa.is_ec());
        assert!(ec.is_ec() && !ec.is_rsa());
        assert!(rsa.as_rsa().is_some() && rsa.as_ec().is_none());
        assert!(ec.as_ec().is_some() && ec.into_rsa().is_none());
    }
}
