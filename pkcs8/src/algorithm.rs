//! AlgorithmIdentifier type
//!
//! Defined in [RFC 5280 Section 4.1.1.2](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.1.2)

use asn1::{Element, ObjectIdentifier};
use origata::decoder::{DecodableFrom, Decoder};
use origata::encoder::{EncodableTo, Encoder};

use crate::error::{Error, Result};

/// Parameters field in AlgorithmIdentifier
///
/// Wrapped in Option:
/// - None: Field not present (OPTIONAL field omitted, 0 bytes)
/// - Some(AlgorithmParameters::Null): Explicit NULL value (common for RSA)
/// - Some(AlgorithmParameters::Other(Element)): Any other ASN.1 element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmParameters {
    /// Explicit NULL (05 00)
    Null,
    /// Any other ASN.1 element
    Other(Element),
}

/// Algorithm Identifier
///
/// ```asn1
/// AlgorithmIdentifier ::= SEQUENCE {
///     algorithm   OBJECT IDENTIFIER,
///     parameters  ANY DEFINED BY algorithm OPTIONAL
/// }
/// ```
///
/// Used here for the outer encryption algorithm (PBES2), the key
/// derivation function, the encryption scheme, the PBKDF2 PRF, and the
/// private key algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    /// Algorithm OID
    pub algorithm: ObjectIdentifier,
    /// Optional parameters
    pub parameters: Option<AlgorithmParameters>,
}

impl AlgorithmIdentifier {
    // Common algorithm OID constants
    pub const OID_RSA_ENCRYPTION: &'static str = "1.2.840.113549.1.1.1";
    pub const OID_EC_PUBLIC_KEY: &'static str = "1.2.840.10045.2.1";

    // PKCS#5 (RFC 8018) password-based encryption OIDs
    pub const OID_PBES2: &'static str = "1.2.840.113549.1.5.13"; // id-PBES2
    pub const OID_PBKDF2: &'static str = "1.2.840.113549.1.5.12"; // id-PBKDF2

    /// Create a new AlgorithmIdentifier with algorithm OID only
    pub fn new(algorithm: ObjectIdentifier) -> Self {
        Self {
            algorithm,
            parameters: None,
        }
    }

    /// Create a new AlgorithmIdentifier with parameters
    pub fn new_with_params(algorithm: ObjectIdentifier, parameters: AlgorithmParameters) -> Self {
        Self {
            algorithm,
            parameters: Some(parameters),
        }
    }

    /// Get the algorithm OID
    pub fn algorithm(&self) -> &ObjectIdentifier {
        &self.algorithm
    }

    /// Get the parameters
    pub fn parameters(&self) -> &Option<AlgorithmParameters> {
        &self.parameters
    }

    /// Parameters as a raw element, when they are neither absent nor NULL
    pub fn parameters_element(&self) -> Option<&Element> {
        match &self.parameters {
            Some(AlgorithmParameters::Other(element)) => Some(element),
            _ => None,
        }
    }

    /// Human-readable name for well-known OIDs
    pub fn oid_name(&self) -> Option<&'static str> {
        match self.algorithm.to_string().as_str() {
            AlgorithmIdentifier::OID_RSA_ENCRYPTION => Some("rsaEncryption"),
            AlgorithmIdentifier::OID_EC_PUBLIC_KEY => Some("ecPublicKey"),
            AlgorithmIdentifier::OID_PBES2 => Some("id-PBES2"),
            AlgorithmIdentifier::OID_PBKDF2 => Some("id-PBKDF2"),
            _ => None,
        }
    }
}

impl DecodableFrom<Element> for AlgorithmIdentifier {}

impl Decoder<Element, AlgorithmIdentifier> for Element {
    type Error = Error;

    fn decode(&self) -> Result<AlgorithmIdentifier> {
        match self {
            Element::Sequence(elements) => {
                let algorithm = match elements.first() {
                    Some(Element::ObjectIdentifier(oid)) => oid.clone(),
                    Some(_) => {
                        return Err(Error::InvalidStructure(
                            "algorithm must be an OBJECT IDENTIFIER".into(),
                        ));
                    }
                    None => {
                        return Err(Error::InvalidStructure(
                            "AlgorithmIdentifier must not be empty".into(),
                        ));
                    }
                };

                let parameters = match elements.get(1) {
                    Some(Element::Null) => Some(AlgorithmParameters::Null),
                    Some(other) => Some(AlgorithmParameters::Other(other.clone())),
                    None => None,
                };

                if elements.len() > 2 {
                    return Err(Error::InvalidStructure(
                        "AlgorithmIdentifier must have at most 2 elements".into(),
                    ));
                }

                Ok(AlgorithmIdentifier {
                    algorithm,
                    parameters,
                })
            }
            _ => Err(Error::InvalidStructure(
                "AlgorithmIdentifier must be a SEQUENCE".into(),
            )),
        }
    }
}

impl EncodableTo<AlgorithmIdentifier> for Element {}

impl Encoder<AlgorithmIdentifier, Element> for AlgorithmIdentifier {
    type Error = Error;

    fn encode(&self) -> Result<Element> {
        let params_elem = self.parameters.as_ref().map(|params| match params {
            AlgorithmParameters::Null => Element::Null,
            AlgorithmParameters::Other(element) => element.clone(),
        });

        let elements: Vec<_> = std::iter::once(Element::ObjectIdentifier(self.algorithm.clone()))
            .chain(params_elem)
            .collect();

        Ok(Element::Sequence(elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case::rsa_with_null(AlgorithmIdentifier::OID_RSA_ENCRYPTION)]
    fn test_algorithm_identifier_null_params_roundtrip(#[case] oid_str: &str) {
        let oid = ObjectIdentifier::from_str(oid_str).unwrap();
        let alg_id = AlgorithmIdentifier::new_with_params(oid.clone(), AlgorithmParameters::Null);

        let encoded = alg_id.encode().unwrap();
        if let Element::Sequence(elements) = &encoded {
            assert_eq!(elements.len(), 2);
            assert!(matches!(elements[0], Element::ObjectIdentifier(_)));
            assert!(matches!(elements[1], Element::Null));
        } else {
            panic!("Expected SEQUENCE");
        }

        let decoded: AlgorithmIdentifier = encoded.decode().unwrap();
        assert_eq!(decoded.algorithm, alg_id.algorithm);
        assert!(matches!(
            decoded.parameters,
            Some(AlgorithmParameters::Null)
        ));
    }

    #[rstest]
    fn test_algorithm_identifier_without_params() {
        let oid = ObjectIdentifier::from_str(AlgorithmIdentifier::OID_EC_PUBLIC_KEY).unwrap();
        let alg_id = AlgorithmIdentifier::new(oid);

        let encoded = alg_id.encode().unwrap();
        let decoded: AlgorithmIdentifier = encoded.decode().unwrap();

        assert_eq!(decoded.algorithm, alg_id.algorithm);
        assert!(decoded.parameters.is_none());
    }

    #[rstest]
    fn test_algorithm_identifier_too_many_elements() {
        let oid = ObjectIdentifier::from_str(AlgorithmIdentifier::OID_PBES2).unwrap();
        let element = Element::Sequence(vec![
            Element::ObjectIdentifier(oid),
            Element::Null,
            Element::Null,
        ]);

        let result: Result<AlgorithmIdentifier> = element.decode();

        assert!(matches!(result, Err(Error::InvalidStructure(_))));
    }
}
