//! SEC1 (RFC 5915) elliptic curve private key structure.

use asn1::{BitString, Element, Integer, ObjectIdentifier, OctetString};
use origata::decoder::{DecodableFrom, Decoder};
use origata::encoder::{EncodableTo, Encoder};

use crate::error::{Error, Result};

/*
RFC 5915 - Elliptic Curve Private Key Structure

ECPrivateKey ::= SEQUENCE {
    version INTEGER { ecPrivkeyVer1(1) } (ecPrivkeyVer1),
    privateKey OCTET STRING,
    parameters [0] ECParameters {{ NamedCurve }} OPTIONAL,
    publicKey [1] BIT STRING OPTIONAL
}
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1 = 1,
}

impl TryFrom<i64> for Version {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Version::V1),
            _ => Err(Error::InvalidVersion(value)),
        }
    }
}

/// Named curves accepted in the ECParameters CHOICE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedCurve {
    Secp224r1,
    Secp256r1,
    Secp384r1,
    Secp521r1,
}

impl NamedCurve {
    pub const OID_SECP224R1: &'static str = "1.3.132.0.33";
    pub const OID_SECP256R1: &'static str = "1.2.840.10045.3.1.7";
    pub const OID_SECP384R1: &'static str = "1.3.132.0.34";
    pub const OID_SECP521R1: &'static str = "1.3.132.0.35";

    pub fn oid(&self) -> Result<ObjectIdentifier> {
        let oid = match self {
            NamedCurve::Secp224r1 => Self::OID_SECP224R1,
            NamedCurve::Secp256r1 => Self::OID_SECP256R1,
            NamedCurve::Secp384r1 => Self::OID_SECP384R1,
            NamedCurve::Secp521r1 => Self::OID_SECP521R1,
        };
        Ok(oid.parse()?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            NamedCurve::Secp224r1 => "P-224",
            NamedCurve::Secp256r1 => "P-256",
            NamedCurve::Secp384r1 => "P-384",
            NamedCurve::Secp521r1 => "P-521",
        }
    }
}

impl TryFrom<&ObjectIdentifier> for NamedCurve {
    type Error = Error;

    fn try_from(oid: &ObjectIdentifier) -> Result<Self> {
        if *oid == Self::OID_SECP224R1 {
            Ok(NamedCurve::Secp224r1)
        } else if *oid == Self::OID_SECP256R1 {
            Ok(NamedCurve::Secp256r1)
        } else if *oid == Self::OID_SECP384R1 {
            Ok(NamedCurve::Secp384r1)
        } else if *oid == Self::OID_SECP521R1 {
            Ok(NamedCurve::Secp521r1)
        } else {
            Err(Error::UnsupportedKeyType(oid.to_string()))
        }
    }
}

/// SEC1 elliptic curve private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ECPrivateKey {
    pub version: Version,
    /// Private scalar as a curve-order-sized octet string
    pub private_key: OctetString,
    /// Named curve from the [0] slot
    pub parameters: Option<NamedCurve>,
    /// Uncompressed public point from the [1] slot
    pub public_key: Option<BitString>,
}

impl DecodableFrom<Element> for ECPrivateKey {}

impl Decoder<Element, ECPrivateKey> for Element {
    type Error = Error;

    fn decode(&self) -> Result<ECPrivateKey> {
        let elements = match self {
            Element::Sequence(elements) => elements,
            _ => {
                return Err(Error::InvalidStructure(
                    "ECPrivateKey must be a SEQUENCE".into(),
                ));
            }
        };
        if elements.len() < 2 {
            return Err(Error::InvalidStructure(
                "ECPrivateKey must have at least 2 elements".into(),
            ));
        }

        let version = match &elements[0] {
            Element::Integer(int) => Version::try_from(
                int.to_i64()
                    .ok_or_else(|| Error::InvalidStructure("version out of range".into()))?,
            )?,
            _ => {
                return Err(Error::InvalidStructure(
                    "ECPrivateKey version must be INTEGER".into(),
                ));
            }
        };
        let private_key = match &elements[1] {
            Element::OctetString(octets) => octets.clone(),
            _ => {
                return Err(Error::InvalidStructure(
                    "ECPrivateKey privateKey must be OCTET STRING".into(),
                ));
            }
        };

        let parameters = elements[2..]
            .iter()
            .find_map(|element| match element {
                Element::ContextSpecific {
                    slot: 0, element, ..
                } => Some(match element.as_ref() {
                    Element::ObjectIdentifier(oid) => NamedCurve::try_from(oid),
                    _ => Err(Error::InvalidStructure(
                        "ECPrivateKey parameters must be a named curve OID".into(),
                    )),
                }),
                _ => None,
            })
            .transpose()?;

        let public_key = elements[2..]
            .iter()
            .find_map(|element| match element {
                Element::ContextSpecific {
                    slot: 1, element, ..
                } => Some(match element.as_ref() {
                    Element::BitString(bits) => Ok(bits.clone()),
                    _ => Err(Error::InvalidStructure(
                        "ECPrivateKey publicKey must be BIT STRING".into(),
                    )),
                }),
                _ => None,
            })
            .transpose()?;

        Ok(ECPrivateKey {
            version,
            private_key,
            parameters,
            public_key,
        })
    }
}

impl EncodableTo<ECPrivateKey> for Element {}

impl Encoder<ECPrivateKey, Element> for ECPrivateKey {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        let mut elements = vec![
            Element::Integer(Integer::from(self.version as i64)),
            Element::OctetString(self.private_key.clone()),
        ];
        if let Some(curve) = &self.parameters {
            elements.push(Element::ContextSpecific {
                slot: 0,
                constructed: true,
                element: Box::new(Element::ObjectIdentifier(curve.oid()?)),
            });
        }
        if let Some(public_key) = &self.public_key {
            elements.push(Element::ContextSpecific {
                slot: 1,
                constructed: true,
                element: Box::new(Element::BitString(public_key.clone())),
            });
        }
        Ok(Element::Sequence(elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_key(curve: Option<NamedCurve>, with_public: bool) -> ECPrivateKey {
        ECPrivateKey {
            version: Version::V1,
            private_key: OctetString::from(&[0x42u8; 32][..]),
            parameters: curve,
            public_key: with_public.then(|| BitString::new(0, vec![0x04; 65])),
        }
    }

    #[rstest(curve, with_public,
        case(None, false),
        case(Some(NamedCurve::Secp256r1), false),
        case(Some(NamedCurve::Secp384r1), true),
    )]
    fn test_roundtrip(curve: Option<NamedCurve>, with_public: bool) {
        let key = sample_key(curve, with_public);

        let encoded = key.encode().unwrap();
        let decoded: ECPrivateKey = encoded.decode().unwrap();

        assert_eq!(key, decoded);
    }

    #[rstest]
    fn test_decode_bad_version() {
        let mut elements = match sample_key(None, false).encode().unwrap() {
            Element::Sequence(elements) => elements,
            _ => unreachable!(),
        };
        elements[0] = Element::Integer(Integer::from(2));

        let result: Result<ECPrivateKey> = Element::Sequence(elements).decode();

        assert!(matches!(result, Err(Error::InvalidVersion(2))));
    }

    #[rstest]
    fn test_unknown_curve() {
        let oid: ObjectIdentifier = "1.2.3.4".parse().unwrap();

        let result = NamedCurve::try_from(&oid);

        assert!(matches!(result, Err(Error::UnsupportedKeyType(_))));
    }

    #[rstest(curve, name,
        case(NamedCurve::Secp224r1, "P-224"),
        case(NamedCurve::Secp256r1, "P-256"),
        case(NamedCurve::Secp384r1, "P-384"),
        case(NamedCurve::Secp521r1, "P-521"),
    )]
    fn test_curve_oid_roundtrip(curve: NamedCurve, name: &str) {
        assert_eq!(name, curve.name());
        assert_eq!(curve, NamedCurve::try_from(&curve.oid().unwrap()).unwrap());
    }
}
