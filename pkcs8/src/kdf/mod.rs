//! Key derivation functions for PBES2.
//!
//! The key derivation function named in a PBES2 parameter block is looked
//! up in a [`KdfRegistry`], an explicit value the caller can extend and
//! inject. Lookups borrow the registry, so a registry in use cannot be
//! mutated concurrently.

use std::collections::HashMap;

use asn1::{Element, ObjectIdentifier};

use crate::algorithm::AlgorithmIdentifier;
use crate::error::{Error, Result};

pub mod pbkdf2;

/// A parsed key derivation parameter block, able to derive a key of a
/// requested size from a password.
pub trait KdfParameters {
    /// Derives exactly `size` bytes of key material.
    fn derive_key(&self, password: &[u8], size: usize) -> Result<Vec<u8>>;
}

/// Builds a [`KdfParameters`] from the raw algorithm parameters element.
///
/// The factory receives the parameters of the KDF's AlgorithmIdentifier
/// (`None` when the field is absent or NULL) and decodes them itself.
pub type KdfFactory = fn(Option<&Element>) -> Result<Box<dyn KdfParameters>>;

/// Registry mapping KDF OIDs to parameter factories.
pub struct KdfRegistry {
    factories: HashMap<ObjectIdentifier, KdfFactory>,
}

impl KdfRegistry {
    /// A registry with no KDFs registered.
    pub fn empty() -> Self {
        KdfRegistry {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory for `oid`. Registering the same OID again
    /// replaces the previous factory.
    pub fn register(&mut self, oid: ObjectIdentifier, factory: KdfFactory) {
        self.factories.insert(oid, factory);
    }

    pub fn lookup(&self, oid: &ObjectIdentifier) -> Option<KdfFactory> {
        self.factories.get(oid).copied()
    }

    /// Resolves the KDF named by `algorithm` and decodes its parameters.
    pub fn resolve(&self, algorithm: &AlgorithmIdentifier) -> Result<Box<dyn KdfParameters>> {
        let factory = self
            .lookup(&algorithm.algorithm)
            .ok_or_else(|| Error::UnsupportedKdf(algorithm.algorithm.to_string()))?;
        factory(algorithm.parameters_element())
    }
}

impl Default for KdfRegistry {
    /// The default registry knows PBKDF2.
    fn default() -> Self {
        let mut registry = KdfRegistry::empty();
        registry.register(
            ObjectIdentifier::new(vec![1, 2, 840, 113549, 1, 5, 12]),
            pbkdf2::factory,
        );
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn fixed_factory(_params: Option<&Element>) -> Result<Box<dyn KdfParameters>> {
        struct Fixed;
        impl KdfParameters for Fixed {
            fn derive_key(&self, _password: &[u8], size: usize) -> Result<Vec<u8>> {
                Ok(vec![0xaa; size])
            }
        }
        Ok(Box::new(Fixed))
    }

    #[rstest]
    fn test_default_registry_resolves_pbkdf2() {
        let registry = KdfRegistry::default();
        let oid: ObjectIdentifier = AlgorithmIdentifier::OID_PBKDF2.parse().unwrap();

        assert!(registry.lookup(&oid).is_some());
    }

    #[rstest]
    fn test_resolve_unknown_kdf() {
        let registry = KdfRegistry::default();
        let oid: ObjectIdentifier = "1.2.3.4".parse().unwrap();
        let algorithm = AlgorithmIdentifier::new(oid);

        let result = registry.resolve(&algorithm);

        assert!(matches!(result, Err(Error::UnsupportedKdf(_))));
    }

    #[rstest]
    fn test_register_custom_kdf() {
        let mut registry = KdfRegistry::empty();
        let oid: ObjectIdentifier = "1.2.3.4".parse().unwrap();
        registry.register(oid.clone(), fixed_factory);

        let algorithm = AlgorithmIdentifier::new(oid);
        let kdf = registry.resolve(&algorithm).unwrap();

        assert_eq!(vec![0xaa; 4], kdf.derive_key(b"password", 4).unwrap());
    }

    #[rstest]
    fn test_register_later_wins() {
        fn first(_params: Option<&Element>) -> Result<Box<dyn KdfParameters>> {
            struct First;
            impl KdfParameters for First {
                fn derive_key(&self, _password: &[u8], size: usize) -> Result<Vec<u8>> {
                    Ok(vec![0x01; size])
                }
            }
            Ok(Box::new(First))
        }

        let mut registry = KdfRegistry::empty();
        let oid: ObjectIdentifier = "1.2.3.4".parse().unwrap();
        registry.register(oid.clone(), first);
        registry.register(oid.clone(), fixed_factory);

        let kdf = registry.resolve(&AlgorithmIdentifier::new(oid)).unwrap();

        assert_eq!(vec![0xaa; 2], kdf.derive_key(b"password", 2).unwrap());
    }
}
