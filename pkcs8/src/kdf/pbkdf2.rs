//! PBKDF2 (RFC 8018 section 5.2) key derivation.

use asn1::{Element, Integer, OctetString};
use md5::Md5;
use origata::decoder::{DecodableFrom, Decoder};
use origata::encoder::{EncodableTo, Encoder};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};

use crate::algorithm::{AlgorithmIdentifier, AlgorithmParameters};
use crate::error::{Error, Result};
use crate::kdf::KdfParameters;

/// Iteration count used when the caller leaves it unspecified.
pub const DEFAULT_ITERATION_COUNT: u32 = 2048;
/// Salt length in bytes used when the caller leaves it unspecified.
pub const DEFAULT_SALT_LEN: usize = 8;

/*
RFC 8018 - PKCS #5: Password-Based Cryptography Specification

PBKDF2-params ::= SEQUENCE {
    salt CHOICE {
        specified OCTET STRING,
        otherSource AlgorithmIdentifier {{PBKDF2-SaltSources}}
    },
    iterationCount INTEGER (1..MAX),
    keyLength INTEGER (1..MAX) OPTIONAL,
    prf AlgorithmIdentifier {{PBKDF2-PRFs}} DEFAULT algid-hmacWithSHA1
}
*/

/// PBKDF2 parameter block.
///
/// Optional fields stay exactly as decoded: an absent `prf` is kept as
/// `None` and only resolved to the HMAC-SHA1 default when a key is
/// actually derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Params {
    /// Salt (the `specified` CHOICE arm; salt sources are not supported)
    pub salt: OctetString,
    /// Iteration count
    pub iteration_count: u32,
    /// Optional declared key length in bytes
    pub key_length: Option<u32>,
    /// Optional PRF; absent means HMAC-SHA1
    pub prf: Option<AlgorithmIdentifier>,
}

impl DecodableFrom<Element> for Pbkdf2Params {}

impl Decoder<Element, Pbkdf2Params> for Element {
    type Error = Error;

    fn decode(&self) -> Result<Pbkdf2Params> {
        let elements = match self {
            Element::Sequence(elements) => elements,
            _ => {
                return Err(Error::InvalidStructure(
                    "PBKDF2 parameters must be a SEQUENCE".into(),
                ));
            }
        };

        if elements.len() < 2 || elements.len() > 4 {
            return Err(Error::InvalidStructure(
                "PBKDF2 parameters must have 2 to 4 elements".into(),
            ));
        }

        let salt = match &elements[0] {
            Element::OctetString(salt) => salt.clone(),
            _ => {
                return Err(Error::InvalidStructure(
                    "PBKDF2 salt must be a specified OCTET STRING".into(),
                ));
            }
        };

        let iteration_count = match &elements[1] {
            Element::Integer(int) => int.to_u32().ok_or_else(|| {
                Error::InvalidStructure("PBKDF2 iterationCount out of range".into())
            })?,
            _ => {
                return Err(Error::InvalidStructure(
                    "PBKDF2 iterationCount must be INTEGER".into(),
                ));
            }
        };

        let mut key_length = None;
        let mut prf = None;
        for element in &elements[2..] {
            match element {
                Element::Integer(int) if key_length.is_none() && prf.is_none() => {
                    let length = int.to_u32().ok_or_else(|| {
                        Error::InvalidStructure("PBKDF2 keyLength out of range".into())
                    })?;
                    key_length = Some(length);
                }
                Element::Sequence(_) if prf.is_none() => {
                    prf = Some(element.decode()?);
                }
                _ => {
                    return Err(Error::InvalidStructure(
                        "unexpected element in PBKDF2 parameters".into(),
                    ));
                }
            }
        }

        Ok(Pbkdf2Params {
            salt,
            iteration_count,
            key_length,
            prf,
        })
    }
}

impl EncodableTo<Pbkdf2Params> for Element {}

impl Encoder<Pbkdf2Params, Element> for Pbkdf2Params {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        let mut elements = vec![
            Element::OctetString(self.salt.clone()),
            Element::Integer(Integer::from(self.iteration_count as i64)),
        ];
        if let Some(length) = self.key_length {
            elements.push(Element::Integer(Integer::from(length as i64)));
        }
        if let Some(prf) = &self.prf {
            elements.push(prf.encode()?);
        }
        Ok(Element::Sequence(elements))
    }
}

impl KdfParameters for Pbkdf2Params {
    fn derive_key(&self, password: &[u8], size: usize) -> Result<Vec<u8>> {
        // An absent PRF means HMAC-SHA1 (RFC 8018); the default is applied
        // here, never written back into the parsed structure.
        let prf = match &self.prf {
            Some(algorithm) => Prf::from_algorithm(algorithm)?,
            None => Prf::HmacSha1,
        };

        if let Some(declared) = self.key_length {
            if declared != 0 && declared as usize != size {
                return Err(Error::KeyLengthMismatch {
                    declared,
                    required: size,
                });
            }
        }

        let mut key = vec![0u8; size];
        prf.fill(password, self.salt.as_bytes(), self.iteration_count, &mut key);
        Ok(key)
    }
}

/// Factory registered for the PBKDF2 OID in the default registry.
pub fn factory(params: Option<&Element>) -> Result<Box<dyn KdfParameters>> {
    let element = params.ok_or_else(|| {
        Error::InvalidStructure("PBKDF2 requires a parameter SEQUENCE".into())
    })?;
    let params: Pbkdf2Params = element.decode()?;
    Ok(Box::new(params))
}

/// Supported PBKDF2 pseudo-random functions (RFC 8018 appendix B.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prf {
    HmacMd5,
    #[default]
    HmacSha1,
    HmacSha224,
    HmacSha256,
    HmacSha384,
    HmacSha512,
    HmacSha512_224,
    HmacSha512_256,
}

impl Prf {
    pub const OID_HMAC_MD5: &'static str = "1.2.840.113549.2.5";
    pub const OID_HMAC_SHA1: &'static str = "1.2.840.113549.2.7";
    pub const OID_HMAC_SHA224: &'static str = "1.2.840.113549.2.8";
    pub const OID_HMAC_SHA256: &'static str = "1.2.840.113549.2.9";
    pub const OID_HMAC_SHA384: &'static str = "1.2.840.113549.2.10";
    pub const OID_HMAC_SHA512: &'static str = "1.2.840.113549.2.11";
    pub const OID_HMAC_SHA512_224: &'static str = "1.2.840.113549.2.12";
    pub const OID_HMAC_SHA512_256: &'static str = "1.2.840.113549.2.13";

    pub fn from_algorithm(algorithm: &AlgorithmIdentifier) -> Result<Self> {
        match algorithm.algorithm.to_string().as_str() {
            Self::OID_HMAC_MD5 => Ok(Prf::HmacMd5),
            Self::OID_HMAC_SHA1 => Ok(Prf::HmacSha1),
            Self::OID_HMAC_SHA224 => Ok(Prf::HmacSha224),
            Self::OID_HMAC_SHA256 => Ok(Prf::HmacSha256),
            Self::OID_HMAC_SHA384 => Ok(Prf::HmacSha384),
            Self::OID_HMAC_SHA512 => Ok(Prf::HmacSha512),
            Self::OID_HMAC_SHA512_224 => Ok(Prf::HmacSha512_224),
            Self::OID_HMAC_SHA512_256 => Ok(Prf::HmacSha512_256),
            other => Err(Error::UnsupportedPrf(other.to_string())),
        }
    }

    pub fn oid(&self) -> &'static str {
        match self {
            Prf::HmacMd5 => Self::OID_HMAC_MD5,
            Prf::HmacSha1 => Self::OID_HMAC_SHA1,
            Prf::HmacSha224 => Self::OID_HMAC_SHA224,
            Prf::HmacSha256 => Self::OID_HMAC_SHA256,
            Prf::HmacSha384 => Self::OID_HMAC_SHA384,
            Prf::HmacSha512 => Self::OID_HMAC_SHA512,
            Prf::HmacSha512_224 => Self::OID_HMAC_SHA512_224,
            Prf::HmacSha512_256 => Self::OID_HMAC_SHA512_256,
        }
    }

    pub fn algorithm_identifier(&self) -> Result<AlgorithmIdentifier> {
        Ok(AlgorithmIdentifier::new_with_params(
            self.oid().parse()?,
            AlgorithmParameters::Null,
        ))
    }

    fn fill(&self, password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) {
        match self {
            Prf::HmacMd5 => pbkdf2_hmac::<Md5>(password, salt, rounds, out),
            Prf::HmacSha1 => pbkdf2_hmac::<Sha1>(password, salt, rounds, out),
            Prf::HmacSha224 => pbkdf2_hmac::<Sha224>(password, salt, rounds, out),
            Prf::HmacSha256 => pbkdf2_hmac::<Sha256>(password, salt, rounds, out),
            Prf::HmacSha384 => pbkdf2_hmac::<Sha384>(password, salt, rounds, out),
            Prf::HmacSha512 => pbkdf2_hmac::<Sha512>(password, salt, rounds, out),
            Prf::HmacSha512_224 => pbkdf2_hmac::<Sha512_224>(password, salt, rounds, out),
            Prf::HmacSha512_256 => pbkdf2_hmac::<Sha512_256>(password, salt, rounds, out),
        }
    }
}

/// Options for the writing side of PBKDF2.
///
/// Zero values fall back to the defaults, so
/// `Pbkdf2Options::default()` always derives with HMAC-SHA1, an 8-byte
/// random salt and 2048 iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pbkdf2Options {
    pub iteration_count: u32,
    pub salt_len: usize,
    pub prf: Prf,
}

impl Default for Pbkdf2Options {
    fn default() -> Self {
        Pbkdf2Options {
            iteration_count: DEFAULT_ITERATION_COUNT,
            salt_len: DEFAULT_SALT_LEN,
            prf: Prf::HmacSha1,
        }
    }
}

impl Pbkdf2Options {
    /// Draws a fresh random salt, derives `size` bytes of key material and
    /// returns it together with the parameter block to embed in the
    /// PBES2 envelope.
    ///
    /// The PRF field is emitted only when it differs from the HMAC-SHA1
    /// default.
    pub fn derive_for_encryption(
        &self,
        password: &[u8],
        size: usize,
    ) -> Result<(Vec<u8>, Pbkdf2Params)> {
        let iteration_count = if self.iteration_count == 0 {
            DEFAULT_ITERATION_COUNT
        } else {
            self.iteration_count
        };
        let salt_len = if self.salt_len == 0 {
            DEFAULT_SALT_LEN
        } else {
            self.salt_len
        };

        let mut salt = vec![0u8; salt_len];
        OsRng.fill_bytes(&mut salt);

        let mut key = vec![0u8; size];
        self.prf.fill(password, &salt, iteration_count, &mut key);

        let prf = match self.prf {
            Prf::HmacSha1 => None,
            other => Some(other.algorithm_identifier()?),
        };

        let params = Pbkdf2Params {
            salt: OctetString::new(salt),
            iteration_count,
            key_length: None,
            prf,
        };

        Ok((key, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params(salt: &[u8], iteration_count: u32, prf: Option<Prf>) -> Pbkdf2Params {
        Pbkdf2Params {
            salt: OctetString::from(salt),
            iteration_count,
            key_length: None,
            prf: prf.map(|p| p.algorithm_identifier().unwrap()),
        }
    }

    // RFC 6070 PBKDF2-HMAC-SHA1 test vectors
    #[rstest(iterations, expected,
        case(1, "0c60c80f961f0e71f3a9b524af6012062fe037a6"),
        case(2, "ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957"),
        case(4096, "4b007901b765489abead49d926f721d065a429c1"),
    )]
    fn test_derive_key_hmac_sha1(iterations: u32, expected: &str) {
        let params = params(b"salt", iterations, None);

        let key = params.derive_key(b"password", 20).unwrap();

        assert_eq!(expected, hex(&key));
    }

    // RFC 7914 section 11 PBKDF2-HMAC-SHA256 test vector
    #[rstest]
    fn test_derive_key_hmac_sha256() {
        let params = params(b"salt", 1, Some(Prf::HmacSha256));

        let key = params.derive_key(b"password", 32).unwrap();

        assert_eq!(
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b",
            hex(&key)
        );
    }

    #[rstest]
    fn test_derive_key_length_mismatch() {
        let mut p = params(b"salt", 1, None);
        p.key_length = Some(16);

        let result = p.derive_key(b"password", 32);

        assert!(matches!(
            result,
            Err(Error::KeyLengthMismatch {
                declared: 16,
                required: 32
            })
        ));
    }

    #[rstest]
    fn test_derive_key_zero_length_ignored() {
        let mut p = params(b"salt", 1, None);
        p.key_length = Some(0);

        assert!(p.derive_key(b"password", 32).is_ok());
    }

    #[rstest]
    fn test_unsupported_prf() {
        let mut p = params(b"salt", 1, None);
        p.prf = Some(AlgorithmIdentifier::new("1.2.3.4".parse().unwrap()));

        let result = p.derive_key(b"password", 32);

        assert!(matches!(result, Err(Error::UnsupportedPrf(_))));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(Prf::HmacSha256))]
    fn test_params_roundtrip(#[case] prf: Option<Prf>) {
        let p = params(b"\x01\x02\x03\x04\x05\x06\x07\x08", 2048, prf);

        let encoded = p.encode().unwrap();
        let decoded: Pbkdf2Params = encoded.decode().unwrap();

        assert_eq!(p, decoded);
    }

    #[rstest]
    fn test_derive_for_encryption_defaults() {
        let options = Pbkdf2Options::default();

        let (key, params) = options.derive_for_encryption(b"password", 32).unwrap();

        assert_eq!(32, key.len());
        assert_eq!(DEFAULT_SALT_LEN, params.salt.len());
        assert_eq!(DEFAULT_ITERATION_COUNT, params.iteration_count);
        // HMAC-SHA1 is the default, so the PRF field is omitted
        assert!(params.prf.is_none());
        assert!(params.key_length.is_none());

        // The same params must re-derive the same key
        let again = params.derive_key(b"password", 32).unwrap();
        assert_eq!(key, again);
    }

    #[rstest]
    fn test_derive_for_encryption_non_default_prf() {
        let options = Pbkdf2Options {
            prf: Prf::HmacSha256,
            ..Default::default()
        };

        let (_, params) = options.derive_for_encryption(b"password", 32).unwrap();

        let prf = params.prf.expect("non-default PRF must be emitted");
        assert_eq!(prf.algorithm, Prf::OID_HMAC_SHA256);
    }

    #[rstest]
    fn test_fresh_salt_per_call() {
        let options = Pbkdf2Options::default();

        let (_, first) = options.derive_for_encryption(b"password", 32).unwrap();
        let (_, second) = options.derive_for_encryption(b"password", 32).unwrap();

        assert_ne!(first.salt, second.salt);
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
