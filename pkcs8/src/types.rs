use asn1::{ASN1Object, BitString, Element, Integer, OctetString};
use num_bigint::BigInt;
use origata::decoder::{DecodableFrom, Decoder};
use origata::encoder::{EncodableTo, Encoder};

use crate::algorithm::AlgorithmIdentifier;
use crate::error::{Error, Result};

/*
RFC 5958 - Asymmetric Key Packages

OneAsymmetricKey ::= SEQUENCE {
    version                   Version,
    privateKeyAlgorithm       PrivateKeyAlgorithmIdentifier,
    privateKey                PrivateKey,
    attributes            [0] Attributes OPTIONAL,
    ...,
    [[2: publicKey        [1] PublicKey OPTIONAL ]],
    ...
}

PrivateKeyInfo ::= OneAsymmetricKey

Version ::= INTEGER { v1(0), v2(1) } (v1, ..., v2)

PrivateKeyAlgorithmIdentifier ::= AlgorithmIdentifier

PrivateKey ::= OCTET STRING

PublicKey ::= BIT STRING

Attributes ::= SET OF Attribute
*/

/// PKCS#8 OneAsymmetricKey version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// Version 1 (no public key)
    V1 = 0,
    /// Version 2 (with public key)
    V2 = 1,
}

impl From<Version> for i64 {
    fn from(v: Version) -> Self {
        v as i64
    }
}

impl TryFrom<i64> for Version {
    type Error = Error;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Version::V1),
            1 => Ok(Version::V2),
            _ => Err(Error::InvalidVersion(value)),
        }
    }
}

impl From<Version> for Integer {
    fn from(v: Version) -> Self {
        Integer::from(BigInt::from(v as i64))
    }
}

/// OneAsymmetricKey (PKCS#8 v2)
///
/// This structure can contain both private and public keys.
/// When publicKey is present, version MUST be v2.
/// When publicKey is absent, version SHOULD be v1.
///
/// Attributes are kept as the raw decoded SET so that unknown attribute
/// types survive a decode/encode cycle untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneAsymmetricKey {
    /// Version (v1 or v2)
    pub version: Version,
    /// Private key algorithm identifier
    pub private_key_algorithm: AlgorithmIdentifier,
    /// Private key bytes (algorithm-specific format)
    pub private_key: OctetString,
    /// Optional attributes [0], carried opaquely as the decoded SET
    pub attributes: Option<Element>,
    /// Optional public key [1] (only in v2)
    pub public_key: Option<BitString>,
}

/// PrivateKeyInfo (PKCS#8 v1 compatibility)
///
/// This is an alias for OneAsymmetricKey for backward compatibility.
/// PrivateKeyInfo is the same as OneAsymmetricKey when version is v1.
pub type PrivateKeyInfo = OneAsymmetricKey;

impl DecodableFrom<Element> for OneAsymmetricKey {}

// Decoder implementation for OneAsymmetricKey
impl Decoder<Element, OneAsymmetricKey> for Element {
    type Error = Error;

    fn decode(&self) -> Result<OneAsymmetricKey> {
        // OneAsymmetricKey is a SEQUENCE
        match self {
            Element::Sequence(elements) => {
                if elements.len() < 3 {
                    return Err(Error::InvalidStructure(
                        "OneAsymmetricKey must have at least 3 elements".into(),
                    ));
                }

                // 1. version (INTEGER)
                let Element::Integer(int) = &elements[0] else {
                    return Err(Error::InvalidStructure("version must be INTEGER".into()));
                };
                let version_int = int
                    .to_i64()
                    .ok_or_else(|| Error::InvalidStructure("version out of range".into()))?;
                let version = Version::try_from(version_int)?;

                // 2. privateKeyAlgorithm (AlgorithmIdentifier)
                let private_key_algorithm = elements[1].decode()?;

                // 3. privateKey (OCTET STRING)
                let Element::OctetString(private_key) = &elements[2] else {
                    return Err(Error::InvalidStructure(
                        "privateKey must be OCTET STRING".into(),
                    ));
                };

                // Optional: attributes [0] and publicKey [1]
                let (attributes, public_key) =
                    elements[3..]
                        .iter()
                        .fold((None, None), |(attrs, pubkey), elem| match elem {
                            Element::ContextSpecific {
                                slot: 0, element, ..
                            } if matches!(element.as_ref(), Element::Set(_)) => {
                                (Some(element.as_ref().clone()), pubkey)
                            }
                            Element::ContextSpecific {
                                slot: 1, element, ..
                            } => {
                                // RFC 5958 tags implicitly, so [1] arrives as a
                                // primitive whose content is the BIT STRING body:
                                // one unused-bits byte followed by the data.
                                let new_pubkey = match element.as_ref() {
                                    Element::OctetString(body) if !body.is_empty() => {
                                        let bytes = body.as_bytes();
                                        Some(BitString::new(bytes[0], bytes[1..].to_vec()))
                                    }
                                    Element::BitString(bits) => Some(bits.clone()),
                                    _ => pubkey,
                                };
                                (attrs, new_pubkey)
                            }
                            _ => (attrs, pubkey),
                        });

                Ok(OneAsymmetricKey {
                    version,
                    private_key_algorithm,
                    private_key: private_key.clone(),
                    attributes,
                    public_key,
                })
            }
            _ => Err(Error::InvalidStructure(
                "OneAsymmetricKey must be a SEQUENCE".into(),
            )),
        }
    }
}

impl EncodableTo<OneAsymmetricKey> for Element {}

// Encoder implementation for OneAsymmetricKey
impl Encoder<OneAsymmetricKey, Element> for OneAsymmetricKey {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        let base_elements = vec![
            Element::Integer(Integer::from(self.version)),
            self.private_key_algorithm.encode()?,
            Element::OctetString(self.private_key.clone()),
        ];

        let optional_elements = [
            self.attributes
                .as_ref()
                .map(|attrs| Element::ContextSpecific {
                    slot: 0,
                    constructed: true,
                    element: Box::new(attrs.clone()),
                }),
            self.public_key.as_ref().map(|pubkey| {
                let mut body = vec![pubkey.unused_bits()];
                body.extend_from_slice(pubkey.as_bytes());
                Element::ContextSpecific {
                    slot: 1,
                    constructed: false,
                    element: Box::new(Element::OctetString(OctetString::new(body))),
                }
            }),
        ];

        let elements = base_elements
            .into_iter()
            .chain(optional_elements.into_iter().flatten())
            .collect();

        Ok(Element::Sequence(elements))
    }
}

impl DecodableFrom<ASN1Object> for OneAsymmetricKey {}

// Decoder implementation for OneAsymmetricKey from ASN1Object
impl Decoder<ASN1Object, OneAsymmetricKey> for ASN1Object {
    type Error = Error;

    fn decode(&self) -> Result<OneAsymmetricKey> {
        if self.elements().is_empty() {
            return Err(Error::InvalidStructure("ASN1Object has no elements".into()));
        }
        // Decode from the first element
        self.elements()[0].decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::AlgorithmParameters;
    use rstest::rstest;

    fn sample_key(version: Version, public_key: Option<BitString>) -> OneAsymmetricKey {
        let oid = AlgorithmIdentifier::OID_RSA_ENCRYPTION.parse().unwrap();
        OneAsymmetricKey {
            version,
            private_key_algorithm: AlgorithmIdentifier::new_with_params(
                oid,
                AlgorithmParameters::Null,
            ),
            private_key: OctetString::new(vec![0x30, 0x00]),
            attributes: None,
            public_key,
        }
    }

    #[rstest]
    #[case(Version::V1, None)]
    #[case(Version::V2, Some(BitString::new(0, vec![0x04, 0x01, 0x02])))]
    fn test_one_asymmetric_key_roundtrip(
        #[case] version: Version,
        #[case] public_key: Option<BitString>,
    ) {
        let key = sample_key(version, public_key);

        let encoded = key.encode().unwrap();
        let decoded: OneAsymmetricKey = encoded.decode().unwrap();

        assert_eq!(key, decoded);
    }

    #[rstest]
    fn test_one_asymmetric_key_attributes_roundtrip() {
        let mut key = sample_key(Version::V1, None);
        key.attributes = Some(Element::Set(vec![Element::Sequence(vec![
            Element::ObjectIdentifier("1.2.840.113549.1.9.20".parse().unwrap()),
            Element::Set(vec![Element::OctetString(OctetString::new(vec![0x01]))]),
        ])]));

        let encoded = key.encode().unwrap();
        let decoded: OneAsymmetricKey = encoded.decode().unwrap();

        assert_eq!(key, decoded);
    }

    #[rstest]
    #[case(2)]
    #[case(-1)]
    fn test_version_out_of_range(#[case] value: i64) {
        assert!(matches!(
            Version::try_from(value),
            Err(Error::InvalidVersion(_))
        ));
    }

    #[rstest]
    fn test_one_asymmetric_key_too_few_elements() {
        let element = Element::Sequence(vec![Element::Integer(Integer::from(0))]);

        let result: Result<OneAsymmetricKey> = element.decode();

        assert!(matches!(result, Err(Error::InvalidStructure(_))));
    }
}
