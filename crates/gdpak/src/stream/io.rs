// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader, writer and counting streams

use super::{Direction, Stream, StreamError};
use std::io::{Read, Write};

/// Input stream over any reader.
pub struct ReadStream<R: Read> {
    inner: R,
    position: u64,
    limit: Option<u64>,
}

impl<R: Read> ReadStream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
            limit: None,
        }
    }

    /// Input stream that refuses to read more than `limit` bytes.
    pub fn with_limit(inner: R, limit: u64) -> Self {
        Self {
            inner,
            position: 0,
            limit: Some(limit),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Stream for ReadStream<R> {
    fn direction(&self) -> Direction {
        Direction::Input
    }

    fn serialize(&mut self, data: &mut [u8]) -> Result<(), StreamError> {
        let length = data.len() as u64;
        if let Some(remaining) = self.remaining() {
            if length > remaining {
                return Err(StreamError::Exhausted { length, remaining });
            }
        }
        self.inner.read_exact(data)?;
        self.position += length;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn remaining(&self) -> Option<u64> {
        self.limit.map(|limit| limit.saturating_sub(self.position))
    }
}

/// Output stream over any writer.
pub struct WriteStream<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> WriteStream<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Stream for WriteStream<W> {
    fn direction(&self) -> Direction {
        Direction::Output
    }

    fn serialize(&mut self, data: &mut [u8]) -> Result<(), StreamError> {
        self.inner.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }
}

/// Output stream that only counts bytes.
#[derive(Debug, Default)]
pub struct CountingStream {
    position: u64,
}

impl CountingStream {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stream for CountingStream {
    fn direction(&self) -> Direction {
        Direction::Output
    }

    fn serialize(&mut self, data: &mut [u8]) -> Result<(), StreamError> {
        self.position += data.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }
}
