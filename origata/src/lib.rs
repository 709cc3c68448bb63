//! # origata
//!
//! Core traits for encoding and decoding in the origata key toolkit.
//!
//! This crate defines the fundamental `Decoder` and `Encoder` traits that
//! establish a type-safe conversion pattern used throughout origata.
//!
//! ## Overview
//!
//! The conversion pattern flows like this:
//! ```text
//! Vec<u8> → Der → ASN1Object → PrivateKeyInfo
//! ```
//!
//! Each step uses the `Decoder` trait to convert from one type to the next,
//! and the `Encoder` trait to convert in the reverse direction.
//!
//! ## Type Safety
//!
//! The traits use marker traits (`DecodableFrom` and `EncodableTo`) to ensure
//! that only valid conversions between adjacent representations exist at
//! compile time.
//!
//! ## Example
//!
//! The following example demonstrates the decoding pattern. Note that specific
//! implementations are provided by the `der`, `asn1`, and `pkcs8` crates:
//!
//! ```ignore
//! use origata::decoder::Decoder;
//! use der::Der;
//! use asn1::ASN1Object;
//!
//! // Decode raw bytes to DER
//! let bytes = vec![0x30, 0x00];
//! let der: Der = bytes.decode().unwrap();
//!
//! // Decode DER to ASN.1
//! let asn1: ASN1Object = der.decode().unwrap();
//! ```
//!
//! Encoding works in the reverse direction:
//!
//! ```ignore
//! use origata::encoder::Encoder;
//! use der::Der;
//! use asn1::ASN1Object;
//!
//! // Encode ASN.1 to DER
//! let asn1 = ASN1Object::new(vec![]);
//! let der: Der = asn1.encode().unwrap();
//!
//! // Encode DER to bytes
//! let bytes: Vec<u8> = der.encode().unwrap();
//! ```

#![forbid(unsafe_code)]

pub mod decoder;
pub mod encoder;
