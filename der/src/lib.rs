//! DER (Distinguished Encoding Rules) TLV layer.
//!
//! This crate parses raw bytes into a tree of tag-length-value triples and
//! serializes the tree back with canonical (minimal) length octets. It knows
//! nothing about ASN.1 semantics; the `asn1` crate interprets the tree.

use nom::{IResult, Parser};
use origata::decoder::{DecodableFrom, Decoder};
use origata::encoder::{EncodableTo, Encoder};

pub mod error;

use error::Error;

/// Bit 6 of the identifier octet marks a constructed encoding.
pub const TAG_CONSTRUCTED: u8 = 0x20;

const CLASS_MASK: u8 = 0xc0;
const CLASS_CONTEXT_SPECIFIC: u8 = 0x80;
const TAG_NUMBER_MASK: u8 = 0x1f;

#[derive(Debug, Clone)]
pub struct Der {
    tlvs: Vec<Tlv>,
}

impl Der {
    pub fn new(tlvs: Vec<Tlv>) -> Self {
        Der { tlvs }
    }

    pub fn elements(&self) -> &[Tlv] {
        &self.tlvs
    }
}

impl DecodableFrom<Vec<u8>> for Der {}

impl Decoder<Vec<u8>, Der> for Vec<u8> {
    type Error = Error;

    fn decode(&self) -> Result<Der, Self::Error> {
        let mut tlvs = Vec::new();
        let mut input = self.as_slice();
        while !input.is_empty() {
            let (rest, tlv) = Tlv::parse(input).map_err(Error::from)?;
            input = rest;
            tlvs.push(tlv);
        }
        Ok(Der::new(tlvs))
    }
}

impl EncodableTo<Der> for Vec<u8> {}

impl Encoder<Der, Vec<u8>> for Der {
    type Error = Error;

    fn encode(&self) -> Result<Vec<u8>, Self::Error> {
        let mut out = Vec::new();
        for tlv in &self.tlvs {
            out.extend(tlv.to_bytes());
        }
        Ok(out)
    }
}

/// Universal tag numbers, with the constructed bit stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrimitiveTag {
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    Sequence,
    Set,
    Unimplemented(u8),
}

impl From<u8> for PrimitiveTag {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::Boolean,
            0x02 => Self::Integer,
            0x03 => Self::BitString,
            0x04 => Self::OctetString,
            0x05 => Self::Null,
            0x06 => Self::ObjectIdentifier,
            0x10 => Self::Sequence,
            0x11 => Self::Set,
            _ => Self::Unimplemented(value),
        }
    }
}

impl From<&PrimitiveTag> for u8 {
    fn from(value: &PrimitiveTag) -> Self {
        match value {
            PrimitiveTag::Boolean => 0x01,
            PrimitiveTag::Integer => 0x02,
            PrimitiveTag::BitString => 0x03,
            PrimitiveTag::OctetString => 0x04,
            PrimitiveTag::Null => 0x05,
            PrimitiveTag::ObjectIdentifier => 0x06,
            PrimitiveTag::Sequence => 0x10,
            PrimitiveTag::Set => 0x11,
            PrimitiveTag::Unimplemented(n) => *n,
        }
    }
}

/// An identifier octet, split by tag class.
///
/// `Primitive` keeps the raw identifier byte alongside the decoded tag
/// number so serialization reproduces the input byte exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Primitive(PrimitiveTag, u8),
    ContextSpecific { slot: u8, constructed: bool },
}

impl From<u8> for Tag {
    fn from(value: u8) -> Self {
        if value & CLASS_MASK == CLASS_CONTEXT_SPECIFIC {
            Tag::ContextSpecific {
                slot: value & TAG_NUMBER_MASK,
                constructed: value & TAG_CONSTRUCTED != 0,
            }
        } else {
            Tag::Primitive(PrimitiveTag::from(value & !TAG_CONSTRUCTED), value)
        }
    }
}

impl Tag {
    fn to_byte(self) -> u8 {
        match self {
            Tag::Primitive(_, raw) => raw,
            Tag::ContextSpecific { slot, constructed } => {
                let c = if constructed { TAG_CONSTRUCTED } else { 0 };
                CLASS_CONTEXT_SPECIFIC | c | slot
            }
        }
    }

    fn is_constructed(&self) -> bool {
        match self {
            Tag::Primitive(tag, _) => {
                matches!(tag, PrimitiveTag::Sequence | PrimitiveTag::Set)
            }
            Tag::ContextSpecific { constructed, .. } => *constructed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: Tag,
    value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Tlv(Vec<Tlv>),
    Data(Vec<u8>),
}

impl Tlv {
    pub fn new_primitive(tag: Tag, data: Vec<u8>) -> Self {
        Tlv {
            tag,
            value: Value::Data(data),
        }
    }

    pub fn new_constructed(tag: Tag, tlvs: Vec<Tlv>) -> Self {
        Tlv {
            tag,
            value: Value::Tlv(tlvs),
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Content octets of a primitive encoding.
    pub fn data(&self) -> Option<&[u8]> {
        match &self.value {
            Value::Data(data) => Some(data),
            Value::Tlv(_) => None,
        }
    }

    /// Nested TLVs of a constructed encoding.
    pub fn tlvs(&self) -> Option<&[Tlv]> {
        match &self.value {
            Value::Tlv(tlvs) => Some(tlvs),
            Value::Data(_) => None,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Tlv> {
        let (input, tag) = parse_tag(input)?;
        let (input, length) = parse_length(input)?;
        let (input, data) = nom::bytes::complete::take(length).parse(input)?;

        if tag.is_constructed() {
            // parse TLV recursively.
            let mut tlvs = Vec::new();
            let mut data = data;
            while !data.is_empty() {
                let (new_input, v) = Self::parse(data)?;
                data = new_input;
                tlvs.push(v);
            }

            return Ok((
                input,
                Tlv {
                    tag,
                    value: Value::Tlv(tlvs),
                },
            ));
        }

        Ok((
            input,
            Tlv {
                tag,
                value: Value::Data(data.to_vec()),
            },
        ))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let content: Vec<u8> = match &self.value {
            Value::Data(data) => data.clone(),
            Value::Tlv(tlvs) => tlvs.iter().flat_map(|tlv| tlv.to_bytes()).collect(),
        };
        let mut out = vec![self.tag.to_byte()];
        out.extend(encode_length(content.len()));
        out.extend(content);
        out
    }
}

fn parse_tag(input: &[u8]) -> IResult<&[u8], Tag> {
    let (input, n) = nom::number::be_u8().parse(input)?;
    Ok((input, Tag::from(n)))
}

fn parse_length(input: &[u8]) -> IResult<&[u8], u64> {
    let (input, n) = nom::number::be_u8().parse(input)?;
    if n & 0x80 == 0x80 {
        // long form
        // First 1 bit is a marker for long form.
        // Other bits represent bytes length of the length field.
        let length = n & 0x7f;
        // More than 8 length octets cannot fit in u64; reject instead of
        // overflowing in the fold below.
        if length > 8 {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::TooLarge,
            )));
        }
        let (input, bs) = nom::bytes::complete::take(length).parse(input)?;
        let n = bs.iter().enumerate().fold(0u64, |n, (i, &b)| {
            n + 256_u64.pow((bs.len() - i - 1) as u32) * b as u64
        });
        return Ok((input, n));
    }
    // short form: 0-127
    Ok((input, n as u64))
}

fn encode_length(length: usize) -> Vec<u8> {
    if length < 0x80 {
        return vec![length as u8];
    }
    let mut bytes = Vec::new();
    let mut n = length;
    while n > 0 {
        bytes.push((n & 0xff) as u8);
        n >>= 8;
    }
    bytes.reverse();
    let mut out = vec![0x80 | bytes.len() as u8];
    out.extend(bytes);
    out
}
