use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    #[error("invalid version: {0}")]
    InvalidVersion(i64),

    #[error("unsupported encryption algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported key derivation function: {0}")]
    UnsupportedKdf(String),

    #[error("unsupported encryption scheme: {0}")]
    UnsupportedCipher(String),

    #[error("unsupported pseudo-random function: {0}")]
    UnsupportedPrf(String),

    #[error("declared key length {declared} does not match the {required} bytes the cipher requires")]
    KeyLengthMismatch { declared: u32, required: usize },

    #[error("decryption failed: wrong password or corrupted data")]
    DecryptionFailed,

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("encrypted input requires a password")]
    MissingPassword,

    #[error("ASN.1 error: {0}")]
    Asn1(#[from] asn1::error::Error),

    #[error("DER error: {0}")]
    Der(#[from] der::error::Error),
}
