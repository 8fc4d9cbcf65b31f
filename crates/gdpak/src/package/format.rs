// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Package file format (.gdpk)
//!
//! # Layout
//!
//! ```text
//! +---------------------------------------------------------+
//! | tag (4) "GDPK" | version (4) | name (4 + n)             |
//! | dependency_count (4) | internal_count (4) | external (4)|
//! +---------------------------------------------------------+
//! | dependency names               [string; dependency_count]|
//! +---------------------------------------------------------+
//! | internal table                                          |
//! |  object_name | parent_name | class_name | byte_size (4) |
//! +---------------------------------------------------------+
//! | external table                                          |
//! |  object_name | package_name                             |
//! +---------------------------------------------------------+
//! | payload: one slice of byte_size per internal entry      |
//! +---------------------------------------------------------+
//! ```
//!
//! All integers are little-endian; strings are a `u32` byte length followed
//! by exactly that many UTF-8 bytes.

use crate::object::ObjectId;
use crate::stream::StreamError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

/// Tag: 'G','D','P','K' packed little-endian.
pub const PACKAGE_TAG: u32 = u32::from_le_bytes(*b"GDPK");

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Upper bound on table capacity reserved ahead of decoding.
const MAX_PREALLOC: usize = 1024;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bad package tag {0:#010x}")]
    BadTag(u32),

    #[error("unsupported format version {found} (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("file ends inside {0}")]
    Truncated(&'static str),

    #[error("invalid UTF-8 in {0}")]
    InvalidString(&'static str),

    #[error("payload holds {actual} bytes, tables declare {declared}")]
    PayloadLength { declared: u64, actual: u64 },

    #[error("{0}")]
    Inconsistent(String),

    #[error("payload: {0}")]
    Payload(StreamError),
}

fn read_error(e: io::Error, what: &'static str) -> FormatError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        FormatError::Truncated(what)
    } else {
        FormatError::Io(e)
    }
}

fn read_u32<R: Read>(r: &mut R, what: &'static str) -> Result<u32, FormatError> {
    r.read_u32::<LittleEndian>().map_err(|e| read_error(e, what))
}

pub(crate) fn write_string<W: Write>(w: &mut W, value: &str) -> io::Result<()> {
    let length = u32::try_from(value.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "string too long"))?;
    w.write_u32::<LittleEndian>(length)?;
    w.write_all(value.as_bytes())
}

pub(crate) fn read_string<R: Read>(r: &mut R, what: &'static str) -> Result<String, FormatError> {
    let length = read_u32(r, what)? as usize;
    let mut bytes = Vec::new();
    r.by_ref()
        .take(length as u64)
        .read_to_end(&mut bytes)
        .map_err(|e| read_error(e, what))?;
    if bytes.len() != length {
        return Err(FormatError::Truncated(what));
    }
    String::from_utf8(bytes).map_err(|_| FormatError::InvalidString(what))
}

/// Fixed preamble of a package file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageHeader {
    pub tag: u32,
    pub version: u32,
    pub name: String,
    pub dependency_count: u32,
    pub internal_count: u32,
    pub external_count: u32,
}

impl PackageHeader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            tag: PACKAGE_TAG,
            version: FORMAT_VERSION,
            name: name.into(),
            dependency_count: 0,
            internal_count: 0,
            external_count: 0,
        }
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.tag)?;
        w.write_u32::<LittleEndian>(self.version)?;
        write_string(w, &self.name)?;
        w.write_u32::<LittleEndian>(self.dependency_count)?;
        w.write_u32::<LittleEndian>(self.internal_count)?;
        w.write_u32::<LittleEndian>(self.external_count)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        let tag = read_u32(r, "header")?;
        if tag != PACKAGE_TAG {
            return Err(FormatError::BadTag(tag));
        }
        let version = read_u32(r, "header")?;
        if version != FORMAT_VERSION {
            return Err(FormatError::VersionMismatch {
                expected: FORMAT_VERSION,
                found: version,
            });
        }

        Ok(Self {
            tag,
            version,
            name: read_string(r, "package name")?,
            dependency_count: read_u32(r, "header")?,
            internal_count: read_u32(r, "header")?,
            external_count: read_u32(r, "header")?,
        })
    }
}

/// Row of the internal table: an object stored in this package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InternalEntry {
    pub object_name: String,
    pub parent_name: String,
    pub class_name: String,
    pub byte_size: u32,
    /// Object bound to this row during a save or load.
    #[serde(skip)]
    pub object: Option<ObjectId>,
}

impl InternalEntry {
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_string(w, &self.object_name)?;
        write_string(w, &self.parent_name)?;
        write_string(w, &self.class_name)?;
        w.write_u32::<LittleEndian>(self.byte_size)
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        Ok(Self {
            object_name: read_string(r, "internal table")?,
            parent_name: read_string(r, "internal table")?,
            class_name: read_string(r, "internal table")?,
            byte_size: read_u32(r, "internal table")?,
            object: None,
        })
    }
}

/// Row of the external table: an object owned by another package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalEntry {
    pub object_name: String,
    pub package_name: String,
    #[serde(skip)]
    pub object: Option<ObjectId>,
}

impl ExternalEntry {
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_string(w, &self.object_name)?;
        write_string(w, &self.package_name)
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        Ok(Self {
            object_name: read_string(r, "external table")?,
            package_name: read_string(r, "external table")?,
            object: None,
        })
    }
}

/// Header and tables of a package file, without the payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    pub header: PackageHeader,
    pub dependencies: Vec<String>,
    pub internal: Vec<InternalEntry>,
    pub external: Vec<ExternalEntry>,
    pub payload_offset: u64,
    pub payload_size: u64,
}

impl PackageSummary {
    /// Write header and tables; counts are taken from the tables.
    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let count = |len: usize| {
            u32::try_from(len)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "table too large"))
        };
        let header = PackageHeader {
            dependency_count: count(self.dependencies.len())?,
            internal_count: count(self.internal.len())?,
            external_count: count(self.external.len())?,
            ..self.header.clone()
        };

        header.write(w)?;
        for dependency in &self.dependencies {
            write_string(w, dependency)?;
        }
        for entry in &self.internal {
            entry.write(w)?;
        }
        for entry in &self.external {
            entry.write(w)?;
        }
        Ok(())
    }

    /// Decode header and tables and check the payload length against them.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut cursor = Cursor::new(bytes);
        let header = PackageHeader::read(&mut cursor)?;

        let mut dependencies = Vec::with_capacity((header.dependency_count as usize).min(MAX_PREALLOC));
        for _ in 0..header.dependency_count {
            dependencies.push(read_string(&mut cursor, "dependency list")?);
        }

        let mut internal = Vec::with_capacity((header.internal_count as usize).min(MAX_PREALLOC));
        for _ in 0..header.internal_count {
            internal.push(InternalEntry::read(&mut cursor)?);
        }

        let mut external = Vec::with_capacity((header.external_count as usize).min(MAX_PREALLOC));
        for _ in 0..header.external_count {
            external.push(ExternalEntry::read(&mut cursor)?);
        }

        let payload_offset = cursor.position();
        let payload_size = bytes.len() as u64 - payload_offset;
        let declared: u64 = internal.iter().map(|e| u64::from(e.byte_size)).sum();
        if declared != payload_size {
            return Err(FormatError::PayloadLength {
                declared,
                actual: payload_size,
            });
        }

        Ok(Self {
            header,
            dependencies,
            internal,
            external,
            payload_offset,
            payload_size,
        })
    }

    /// Payload slice of every internal entry, in table order.
    pub fn payload_slices<'a>(&'a self, bytes: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
        let mut offset = self.payload_offset as usize;
        self.internal.iter().map(move |entry| {
            let start = offset.min(bytes.len());
            offset += entry.byte_size as usize;
            &bytes[start..offset.min(bytes.len())]
        })
    }
}

/// Decode the header and tables of a package image.
pub fn inspect(bytes: &[u8]) -> Result<PackageSummary, FormatError> {
    PackageSummary::decode(bytes)
}
