//! PKCS#1 (RFC 8017) RSA private key structure.

use asn1::{Element, Integer};
use origata::decoder::{DecodableFrom, Decoder};
use origata::encoder::{EncodableTo, Encoder};

use crate::error::{Error, Result};

/*
RFC 8017 - PKCS #1: RSA Cryptography Specifications

RSAPrivateKey ::= SEQUENCE {
    version Version,
    modulus INTEGER, -- n
    publicExponent INTEGER, -- e
    privateExponent INTEGER, -- d
    prime1 INTEGER, -- p
    prime2 INTEGER, -- q
    exponent1 INTEGER, -- d mod (p-1)
    exponent2 INTEGER, -- d mod (q-1)
    coefficient INTEGER, -- (inverse of q) mod p
    otherPrimeInfos OtherPrimeInfos OPTIONAL
}
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// Two-prime RSA
    TwoPrime = 0,
}

impl TryFrom<i64> for Version {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Version::TwoPrime),
            // Multi-prime (version 1, otherPrimeInfos) is not modeled.
            _ => Err(Error::InvalidVersion(value)),
        }
    }
}

/// Two-prime RSA private key with CRT parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RSAPrivateKey {
    pub version: Version,
    pub modulus: Integer,
    pub public_exponent: Integer,
    pub private_exponent: Integer,
    pub prime1: Integer,
    pub prime2: Integer,
    pub exponent1: Integer,
    pub exponent2: Integer,
    pub coefficient: Integer,
}

impl DecodableFrom<Element> for RSAPrivateKey {}

impl Decoder<Element, RSAPrivateKey> for Element {
    type Error = Error;

    fn decode(&self) -> Result<RSAPrivateKey> {
        let elements = match self {
            Element::Sequence(elements) => elements,
            _ => {
                return Err(Error::InvalidStructure(
                    "RSAPrivateKey must be a SEQUENCE".into(),
                ));
            }
        };
        if elements.len() != 9 {
            return Err(Error::InvalidStructure(
                "RSAPrivateKey must have exactly 9 elements".into(),
            ));
        }

        let get_integer = |index: usize| -> Result<Integer> {
            match &elements[index] {
                Element::Integer(int) => Ok(int.clone()),
                _ => Err(Error::InvalidStructure(format!(
                    "RSAPrivateKey element {} must be INTEGER",
                    index
                ))),
            }
        };

        let version = Version::try_from(
            get_integer(0)?
                .to_i64()
                .ok_or_else(|| Error::InvalidStructure("version out of range".into()))?,
        )?;

        Ok(RSAPrivateKey {
            version,
            modulus: get_integer(1)?,
            public_exponent: get_integer(2)?,
            private_exponent: get_integer(3)?,
            prime1: get_integer(4)?,
            prime2: get_integer(5)?,
            exponent1: get_integer(6)?,
            exponent2: get_integer(7)?,
            coefficient: get_integer(8)?,
        })
    }
}

impl EncodableTo<RSAPrivateKey> for Element {}

impl Encoder<RSAPrivateKey, Element> for RSAPrivateKey {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        Ok(Element::Sequence(vec![
            Element::Integer(Integer::from(self.version as i64)),
            Element::Integer(self.modulus.clone()),
            Element::Integer(self.public_exponent.clone()),
            Element::Integer(self.private_exponent.clone()),
            Element::Integer(self.prime1.clone()),
            Element::Integer(self.prime2.clone()),
            Element::Integer(self.exponent1.clone()),
            Element::Integer(self.exponent2.clone()),
            Element::Integer(self.coefficient.clone()),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_key() -> RSAPrivateKey {
        RSAPrivateKey {
            version: Version::TwoPrime,
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

    #[rstest]
    fn test_roundtrip() {
        let key = sample_key();

        let encoded = key.encode().unwrap();
        let decoded: RSAPrivateKey = encoded.decode().unwrap();

        assert_eq!(key, decoded);
    }

    #[rstest]
    fn test_decode_too_few_elements() {
        let element = Element::Sequence(vec![Element::Integer(Integer::from(0))]);

        let result: Result<RSAPrivateKey> = element.decode();

        assert!(matches!(result, Err(Error::InvalidStructure(_))));
    }

    // A tenth element would be otherPrimeInfos, which a two-prime key
    // must not carry.
    #[rstest]
    fn test_decode_too_many_elements() {
        let mut elements = match sample_key().encode().unwrap() {
            Element::Sequence(elements) => elements,
            _ => unreachable!(),
        };
        elements.push(Element::Sequence(vec![]));

        let result: Result<RSAPrivateKey> = Element::Sequence(elements).decode();

        assert!(matches!(result, Err(Error::InvalidStructure(_))));
    }

    #[rstest(version, case(1), case(7))]
    fn test_decode_bad_version(version: i64) {
        let mut elements = match sample_key().encode().unwrap() {
            Element::Sequence(elements) => elements,
            _ => unreachable!(),
        };
        elements[0] = Element::Integer(Integer::from(version));

        let result: Result<RSAPrivateKey> = Element::Sequence(elements).decode();

        assert!(matches!(result, Err(Error::InvalidVersion(v)) if v == version));
    }
}
