// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bidirectional byte streams
//!
//! An object serializes itself with a single routine that works for both
//! directions: on an output stream each helper writes the current value, on
//! an input stream it overwrites the value with what was read. Numbers are
//! little-endian; strings are a `u32` byte length followed by exactly that
//! many UTF-8 bytes.

mod io;

pub use io::{CountingStream, ReadStream, WriteStream};

use crate::object::ObjectId;
use thiserror::Error;

/// Data direction of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 string: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("this stream does not carry object references")]
    ReferencesUnsupported,

    #[error("reference index {0} is out of range")]
    InvalidReference(i32),

    #[error("reference to destroyed object {0}")]
    StaleReference(ObjectId),

    #[error("cannot reference '{object}': {reason}")]
    UnresolvableReference { object: String, reason: String },

    #[error("{length} bytes requested, {remaining} left in stream")]
    Exhausted { length: u64, remaining: u64 },

    #[error("length {0} does not fit a u32 prefix")]
    TooLong(usize),
}

macro_rules! scalar_methods {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, value: &mut $ty) -> Result<(), StreamError> {
                let mut bytes = value.to_le_bytes();
                self.serialize(&mut bytes)?;
                if self.is_input() {
                    *value = <$ty>::from_le_bytes(bytes);
                }
                Ok(())
            }
        )*
    };
}

/// A byte sink or source with a direction.
pub trait Stream {
    fn direction(&self) -> Direction;

    /// Write `data` (output) or fill it (input).
    fn serialize(&mut self, data: &mut [u8]) -> Result<(), StreamError>;

    /// Bytes transferred so far.
    fn position(&self) -> u64;

    /// Bytes left to read, when the stream knows.
    fn remaining(&self) -> Option<u64> {
        None
    }

    /// Transfer an object reference.
    fn object(&mut self, reference: &mut Option<ObjectId>) -> Result<(), StreamError> {
        let _ = reference;
        Err(StreamError::ReferencesUnsupported)
    }

    fn is_input(&self) -> bool {
        self.direction() == Direction::Input
    }

    fn is_output(&self) -> bool {
        self.direction() == Direction::Output
    }

    scalar_methods! {
        u8 => u8,
        u16 => u16,
        u32 => u32,
        u64 => u64,
        i8 => i8,
        i16 => i16,
        i32 => i32,
        i64 => i64,
        f32 => f32,
        f64 => f64,
    }

    /// One byte, `0` or `1`; any non-zero byte reads as `true`.
    fn bool(&mut self, value: &mut bool) -> Result<(), StreamError> {
        let mut byte = [u8::from(*value)];
        self.serialize(&mut byte)?;
        if self.is_input() {
            *value = byte[0] != 0;
        }
        Ok(())
    }

    fn string(&mut self, value: &mut String) -> Result<(), StreamError> {
        if self.is_output() {
            let mut length =
                u32::try_from(value.len()).map_err(|_| StreamError::TooLong(value.len()))?;
            self.u32(&mut length)?;
            let mut bytes = value.as_bytes().to_vec();
            return self.serialize(&mut bytes);
        }

        let mut length = 0u32;
        self.u32(&mut length)?;
        if let Some(remaining) = self.remaining() {
            if u64::from(length) > remaining {
                return Err(StreamError::Exhausted {
                    length: u64::from(length),
                    remaining,
                });
            }
        }
        let mut bytes = vec![0u8; length as usize];
        self.serialize(&mut bytes)?;
        *value = String::from_utf8(bytes)?;
        Ok(())
    }

    /// Fixed-size float group (vectors, colors, quaternions).
    fn f32_array(&mut self, values: &mut [f32]) -> Result<(), StreamError> {
        for value in values.iter_mut() {
            self.f32(value)?;
        }
        Ok(())
    }

    /// `u32` count followed by each reference.
    fn objects(&mut self, references: &mut Vec<Option<ObjectId>>) -> Result<(), StreamError> {
        sequence(self, references, |stream, reference| stream.object(reference))
    }
}

/// `u32` count followed by each element, encoded by `each`.
///
/// On input the vector is replaced by `count` default elements before
/// decoding.
pub fn sequence<S, T, F>(stream: &mut S, items: &mut Vec<T>, mut each: F) -> Result<(), StreamError>
where
    S: Stream + ?Sized,
    T: Default,
    F: FnMut(&mut S, &mut T) -> Result<(), StreamError>,
{
    let mut count = u32::try_from(items.len()).map_err(|_| StreamError::TooLong(items.len()))?;
    stream.u32(&mut count)?;

    if stream.is_input() {
        if let Some(remaining) = stream.remaining() {
            if u64::from(count) > remaining {
                return Err(StreamError::Exhausted {
                    length: u64::from(count),
                    remaining,
                });
            }
        }
        items.clear();
        items.resize_with(count as usize, T::default);
    }

    for item in items.iter_mut() {
        each(stream, item)?;
    }
    Ok(())
}
