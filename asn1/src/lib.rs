//! Typed ASN.1 value layer.
//!
//! Interprets the DER TLV tree as a tree of [`Element`]s and converts back.
//! Only the universal types the PKCS#8 structures use are modeled; anything
//! else is carried through as [`Element::Unimplemented`] so that opaque
//! substructures (such as attribute sets) survive a decode/encode cycle.

use std::{fmt::Display, str::FromStr};

use der::{Der, PrimitiveTag, TAG_CONSTRUCTED, Tag, Tlv};
use error::Error;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use origata::decoder::{DecodableFrom, Decoder};
use origata::encoder::{EncodableTo, Encoder};

pub mod error;

#[derive(Debug, Clone)]
pub struct ASN1Object {
    elements: Vec<Element>,
}

impl ASN1Object {
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn new(elements: Vec<Element>) -> Self {
        ASN1Object { elements }
    }
}

impl DecodableFrom<Der> for ASN1Object {}

impl Decoder<Der, ASN1Object> for Der {
    type Error = Error;
    fn decode(&self) -> Result<ASN1Object, Error> {
        let mut elements = Vec::new();
        for tlv in self.elements() {
            let element = Element::try_from(tlv)?;
            elements.push(element);
        }
        Ok(ASN1Object { elements })
    }
}

impl EncodableTo<ASN1Object> for Der {}

impl Encoder<ASN1Object, Der> for ASN1Object {
    type Error = Error;

    fn encode(&self) -> Result<Der, Self::Error> {
        let mut tlvs = Vec::new();
        for element in &self.elements {
            tlvs.push(element.encode()?);
        }
        Ok(Der::new(tlvs))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Integer(Integer),
    BitString(BitString),
    OctetString(OctetString),
    Null,
    ObjectIdentifier(ObjectIdentifier),
    Sequence(Vec<Element>),
    Set(Vec<Element>),
    ContextSpecific {
        slot: u8,
        constructed: bool,
        element: Box<Element>,
    },
    Unimplemented(Tlv),
}

impl TryFrom<&Tlv> for Element {
    type Error = Error;

    fn try_from(tlv: &Tlv) -> Result<Self, Self::Error> {
        match tlv.tag() {
            der::Tag::Primitive(primitive_tag, _value) => match primitive_tag {
                PrimitiveTag::Integer => {
                    if let Some(data) = tlv.data() {
                        let integer = Integer::from(data);
                        Ok(Element::Integer(integer))
                    } else {
                        Err(Error::IntegerNoData)
                    }
                }
                PrimitiveTag::BitString => {
                    if let Some(data) = tlv.data() {
                        let bs = BitString::try_from(data)?;
                        Ok(Element::BitString(bs))
                    } else {
                        Err(Error::BitStringNoData)
                    }
                }
                PrimitiveTag::OctetString => {
                    if let Some(data) = tlv.data() {
                        Ok(Element::OctetString(OctetString::from(data.to_vec())))
                    } else {
                        Err(Error::OctetStringNoData)
                    }
                }
                PrimitiveTag::Null => Ok(Element::Null),
                PrimitiveTag::ObjectIdentifier => {
                    if let Some(data) = tlv.data() {
                        let oid = ObjectIdentifier::try_from(data)?;
                        Ok(Element::ObjectIdentifier(oid))
                    } else {
                        Err(Error::ObjectIdentifierNoData)
                    }
                }
                PrimitiveTag::Sequence => {
                    if let Some(tlvs) = tlv.tlvs() {
                        let elements = tlvs
                            .iter()
                            .map(Element::try_from)
                            .collect::<Result<Vec<Element>, Error>>()?;
                        Ok(Element::Sequence(elements))
                    } else {
                        // An empty sequence parses with no nested TLVs.
                        Ok(Element::Sequence(Vec::new()))
                    }
                }
                PrimitiveTag::Set => {
                    if let Some(tlvs) = tlv.tlvs() {
                        let elements = tlvs
                            .iter()
                            .map(Element::try_from)
                            .collect::<Result<Vec<Element>, Error>>()?;
                        Ok(Element::Set(elements))
                    } else {
                        Ok(Element::Set(Vec::new()))
                    }
                }
                PrimitiveTag::Boolean | PrimitiveTag::Unimplemented(_) => {
                    // Carried through untyped so opaque substructures round-trip.
                    Ok(Element::Unimplemented(tlv.clone()))
                }
            },
            der::Tag::ContextSpecific { slot, constructed } => {
                if *constructed {
                    // Constructed: contains nested TLV(s)
                    if let Some(tlvs) = tlv.tlvs() {
                        if tlvs.len() != 1 {
                            return Err(Error::InvalidContextSpecific {
                                slot: *slot,
                                msg: "context-specific constructed must have exactly one sub-tlv"
                                    .to_string(),
                            });
                        }
                        if let Some(tlv) = tlvs.first() {
                            let element = Element::try_from(tlv)?;
                            Ok(Element::ContextSpecific {
                                slot: *slot,
                                constructed: true,
                                element: Box::new(element),
                            })
                        } else {
                            Err(Error::InvalidContextSpecific {
                                slot: *slot,
                                msg: "context-specific constructed has no data".to_string(),
                            })
                        }
                    } else {
                        Err(Error::InvalidContextSpecific {
                            slot: *slot,
                            msg: "context-specific constructed has no tlvs".to_string(),
                        })
                    }
                } else {
                    // Primitive: IMPLICIT tagging
                    // Store raw data as OctetString - the upper layer decoder interprets based on schema
                    if let Some(data) = tlv.data() {
                        Ok(Element::ContextSpecific {
                            slot: *slot,
                            constructed: false,
                            element: Box::new(Element::OctetString(OctetString::from(
                                data.to_vec(),
                            ))),
                        })
                    } else {
                        Err(Error::InvalidContextSpecific {
                            slot: *slot,
                            msg: "context-specific primitive has no data".to_string(),
                        })
                    }
                }
            }
        }
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Integer(i) => write!(f, "Integer({})", i),
            Element::BitString(bs) => write!(f, "BitString({} bits)", bs.bit_len()),
            Element::OctetString(os) => write!(f, "OctetString({} bytes)", os.len()),
            Element::Null => write!(f, "Null"),
            Element::ObjectIdentifier(oid) => write!(f, "ObjectIdentifier({})", oid),
            Element::Sequence(seq) => write!(f, "Sequence({:?})", seq),
            Element::Set(set) => write!(f, "Set({:?})", set),
            Element::ContextSpecific {
                slot,
                constructed,
                element,
            } => {
                write!(
                    f,
                    "ContextSpecific(slot: {}, constructed: {}, element: {})",
                    slot, constructed, element
                )
            }
            Element::Unimplemented(tlv) => write!(f, "Unimplemented({:?})", tlv),
        }
    }
}

impl TryFrom<&Element> for Tlv {
    type Error = Error;

    fn try_from(element: &Element) -> Result<Self, Self::Error> {
        match element {
            Element::Integer(i) => {
                let tag = Tag::Primitive(PrimitiveTag::Integer, u8::from(&PrimitiveTag::Integer));
                let data = i.as_bigint().to_signed_bytes_be();
                Ok(Tlv::new_primitive(tag, data))
            }
            Element::BitString(bs) => {
                let tag =
                    Tag::Primitive(PrimitiveTag::BitString, u8::from(&PrimitiveTag::BitString));
                let data: Vec<u8> = bs.clone().into();
                Ok(Tlv::new_primitive(tag, data))
            }
            Element::OctetString(os) => {
                let tag = Tag::Primitive(
                    PrimitiveTag::OctetString,
                    u8::from(&PrimitiveTag::OctetString),
                );
                Ok(Tlv::new_primitive(tag, os.as_bytes().to_vec()))
            }
            Element::Null => {
                let tag = Tag::Primitive(PrimitiveTag::Null, u8::from(&PrimitiveTag::Null));
                Ok(Tlv::new_primitive(tag, vec![]))
            }
            Element::ObjectIdentifier(oid) => {
                let tag = Tag::Primitive(
                    PrimitiveTag::ObjectIdentifier,
                    u8::from(&PrimitiveTag::ObjectIdentifier),
                );
                let data = Vec::<u8>::try_from(oid.clone())?;
                Ok(Tlv::new_primitive(tag, data))
            }
            Element::Sequence(elements) => {
                let tag = Tag::Primitive(
                    PrimitiveTag::Sequence,
                    u8::from(&PrimitiveTag::Sequence) | TAG_CONSTRUCTED,
                );
                let tlvs = elements
                    .iter()
                    .map(Tlv::try_from)
                    .collect::<Result<Vec<Tlv>, Error>>()?;
                Ok(Tlv::new_constructed(tag, tlvs))
            }
            Element::Set(elements) => {
                let tag = Tag::Primitive(
                    PrimitiveTag::Set,
                    u8::from(&PrimitiveTag::Set) | TAG_CONSTRUCTED,
                );
                let tlvs = elements
                    .iter()
                    .map(Tlv::try_from)
                    .collect::<Result<Vec<Tlv>, Error>>()?;
                Ok(Tlv::new_constructed(tag, tlvs))
            }
            Element::ContextSpecific {
                slot,
                constructed,
                element,
            } => {
                let tag = Tag::ContextSpecific {
                    slot: *slot,
                    constructed: *constructed,
                };
                if *constructed {
                    let inner_tlv = Tlv::try_from(element.as_ref())?;
                    Ok(Tlv::new_constructed(tag, vec![inner_tlv]))
                } else {
                    match element.as_ref() {
                        Element::OctetString(os) => {
                            Ok(Tlv::new_primitive(tag, os.as_bytes().to_vec()))
                        }
                        _ => Err(Error::InvalidElement(
                            "IMPLICIT tagging requires primitive inner element".to_string(),
                        )),
                    }
                }
            }
            // Untyped passthrough re-encodes the TLV it decoded from.
            Element::Unimplemented(tlv) => Ok(tlv.clone()),
        }
    }
}

impl EncodableTo<Element> for Tlv {}

impl Encoder<Element, Tlv> for Element {
    type Error = Error;

    fn encode(&self) -> Result<Tlv, Self::Error> {
        Tlv::try_from(self)
    }
}

// ASN1 integer is possible to be a positive and negative value.
// This can be arbitrary sized values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Integer {
    inner: BigInt,
}

impl Integer {
    /// Returns a reference to the inner BigInt
    pub fn as_bigint(&self) -> &BigInt {
        &self.inner
    }

    /// Converts the Integer to u32 if it fits in the range
    pub fn to_u32(&self) -> Option<u32> {
        self.inner.to_u32()
    }

    /// Converts the Integer to i64 if it fits in the range
    pub fn to_i64(&self) -> Option<i64> {
        self.inner.to_i64()
    }

    /// Converts the Integer to u64 if it fits in the range
    pub fn to_u64(&self) -> Option<u64> {
        self.inner.to_u64()
    }
}

impl From<BigInt> for Integer {
    fn from(value: BigInt) -> Self {
        Integer { inner: value }
    }
}

impl From<i64> for Integer {
    fn from(value: i64) -> Self {
        Integer {
            inner: BigInt::from(value),
        }
    }
}

impl From<&[u8]> for Integer {
    fn from(value: &[u8]) -> Self {
        Integer {
            inner: BigInt::from_signed_bytes_be(value),
        }
    }
}

impl From<Vec<u8>> for Integer {
    fn from(value: Vec<u8>) -> Self {
        Integer {
            inner: BigInt::from_signed_bytes_be(&value),
        }
    }
}

impl TryFrom<&Integer> for i64 {
    type Error = Error;

    fn try_from(value: &Integer) -> Result<Self, Self::Error> {
        value
            .inner
            .to_i64()
            .ok_or(Error::IntegerOutOfRange("i64"))
    }
}

impl TryFrom<&Integer> for u64 {
    type Error = Error;

    fn try_from(value: &Integer) -> Result<Self, Self::Error> {
        value
            .inner
            .to_u64()
            .ok_or(Error::IntegerOutOfRange("u64"))
    }
}

impl Display for Integer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    inner: Vec<u64>,
}

impl ObjectIdentifier {
    pub fn new(components: Vec<u64>) -> Self {
        ObjectIdentifier { inner: components }
    }
}

impl TryFrom<Vec<u8>> for ObjectIdentifier {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(value.as_slice())
    }
}

impl TryFrom<&[u8]> for ObjectIdentifier {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Error::ObjectIdentifierNoData);
        }

        let mut values = Vec::new();
        let first = value[0] as u64;
        values.push(first / 40);
        values.push(first % 40);

        let mut val = 0u64;
        let mut in_arc = false;
        for v in value[1..].iter() {
            val = (val << 7) | (*v as u64 & 0x7F);
            if *v & 0x80 == 0 {
                // If the continuation bit is not set, we have reached the end of this value
                values.push(val);
                val = 0; // Reset for the next value
                in_arc = false;
            } else {
                in_arc = true;
            }
        }
        // A pending arc at the end means the last continuation byte dangles.
        if in_arc {
            return Err(Error::ObjectIdentifierIncompleteEncoding);
        }

        Ok(ObjectIdentifier { inner: values })
    }
}

impl TryFrom<ObjectIdentifier> for Vec<u8> {
    type Error = Error;

    fn try_from(oid: ObjectIdentifier) -> Result<Self, Self::Error> {
        if oid.inner.len() < 2 {
            return Err(Error::ObjectIdentifierTooFewComponents);
        }

        let mut result = Vec::new();
        // Encode the first two elements of the OID
        let first = (oid.inner[0] * 40 + oid.inner[1]) as u8;
        result.push(first);

        // Encode the remaining elements of the OID
        for v in oid.inner[2..].iter() {
            let mut encoded = Vec::new();
            let mut value = *v;
            while value > 0 {
                encoded.push(value as u8 & 0x7F);
                value >>= 7;
            }
            if encoded.is_empty() {
                encoded.push(0);
            }

            while let Some(b) = encoded.pop() {
                // If this is not the last byte, set the continuation bit
                if !encoded.is_empty() {
                    result.push(b | 0x80);
                } else {
                    result.push(b);
                }
            }
        }

        Ok(result)
    }
}

impl Display for ObjectIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self.inner.first() {
            Some(n) => self.inner[1..]
                .iter()
                .fold(n.to_string(), |s, n| s + "." + &n.to_string()),
            None => String::new(),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ObjectIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s.split(".");
        let values = split
            .map(|s| s.parse::<u64>().map_err(Error::ParseInt))
            .collect::<Result<Vec<u64>, Error>>()?;
        Ok(ObjectIdentifier { inner: values })
    }
}

impl PartialEq<&str> for ObjectIdentifier {
    fn eq(&self, other: &&str) -> bool {
        self.inner
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".")
            == *other
    }
}

impl PartialEq<ObjectIdentifier> for &str {
    fn eq(&self, other: &ObjectIdentifier) -> bool {
        *self
            == other
                .inner
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(".")
    }
}

/// Trait for types that can be converted to an ObjectIdentifier
pub trait AsOid {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error>;
}

impl AsOid for ObjectIdentifier {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        Ok(self.clone())
    }
}

impl AsOid for &str {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        ObjectIdentifier::from_str(self)
    }
}

impl AsOid for String {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        self.as_str().as_oid()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString {
    unused: u8,
    data: Vec<u8>,
}

impl BitString {
    /// Creates a new BitString with the specified number of unused bits and data
    pub fn new(unused: u8, data: Vec<u8>) -> Self {
        BitString { unused, data }
    }

    /// Returns the number of unused bits in the last byte
    pub fn unused_bits(&self) -> u8 {
        self.unused
    }

    /// Returns a reference to the underlying byte data
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the BitString and returns the underlying byte data
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Returns the total number of bits (excluding unused bits)
    pub fn bit_len(&self) -> usize {
        if self.data.is_empty() {
            0
        } else {
            self.data.len() * 8 - self.unused as usize
        }
    }
}

impl AsRef<[u8]> for BitString {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl TryFrom<&[u8]> for BitString {
    type Error = Error;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value.first() {
            Some(&b) => {
                if b > 7 {
                    return Err(Error::BitStringUnusedBitsOutOfRange(b));
                }
                Ok(BitString {
                    unused: b,
                    data: value[1..].to_vec(),
                })
            }
            None => Err(Error::BitStringNoData),
        }
    }
}

impl TryFrom<Vec<u8>> for BitString {
    type Error = Error;
    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(value.as_slice())
    }
}

impl From<BitString> for Vec<u8> {
    fn from(value: BitString) -> Self {
        let mut result = Vec::with_capacity(value.data.len() + 1);
        result.push(value.unused);
        result.extend(value.data);
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctetString {
    inner: Vec<u8>,
}

impl OctetString {
    pub fn new(data: Vec<u8>) -> Self {
        OctetString { inner: data }
    }

    /// Returns a reference to the underlying byte data
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Consumes the OctetString and returns the underlying byte data
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<Vec<u8>> for OctetString {
    fn from(value: Vec<u8>) -> Self {
        OctetString { inner: value }
    }
}

impl From<&[u8]> for OctetString {
    fn from(value: &[u8]) -> Self {
        OctetString {
            inner: value.to_vec(),
        }
    }
}

impl AsRef<[u8]> for OctetString {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}
