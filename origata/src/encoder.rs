//! Encoder trait for type-safe conversions.
//!
//! The `Encoder` trait is the mirror of [`crate::decoder::Decoder`]: it
//! converts a typed representation back toward raw bytes. The same
//! two-trait pattern applies, with `EncodableTo<T>` marking the valid
//! target types.

/// Encoder trait for converting from type `T` to type `E`.
///
/// Implemented by the source type `T` to enable conversion to the
/// target type `E`. The target type must implement `EncodableTo<T>`.
pub trait Encoder<T, E: EncodableTo<T>> {
    /// The error type returned when encoding fails.
    type Error;

    /// Encodes `self` into type `E`.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversion fails.
    fn encode(&self) -> Result<E, Self::Error>;
}

/// Marker trait indicating that type `E` can be encoded from type `T`.
pub trait EncodableTo<T> {}
