// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::mem;
use std::path::Path;

use crate::Error;

/// An abstraction over the token sources used by the matching kernel.
///
/// An input produces tokens two ways: a forward stream read that the token
/// buffer windows over, and a random-access read by absolute token index
/// that backreference replay uses to reconstruct captured intervals. The
/// two cursors are independent; an indexed read must not disturb the
/// position of the stream.
pub trait Input {
    /// The element type of this input's token stream.
    type Token: Clone + fmt::Debug;

    /// Append up to `len` tokens from the stream position onto `buf`,
    /// advancing the stream. Returns the number of tokens appended; zero
    /// means the source is exhausted.
    fn stream_read(
        &mut self,
        buf: &mut Vec<Self::Token>,
        len: usize,
    ) -> io::Result<usize>;

    /// Append up to `len` tokens starting at absolute token index `start`
    /// onto `buf`, without moving the stream position. Returns the number
    /// of tokens appended; fewer than `len` means the source is shorter.
    fn indexed_read(
        &mut self,
        buf: &mut Vec<Self::Token>,
        start: usize,
        len: usize,
    ) -> io::Result<usize>;

    /// The width of one token in bytes, as stored in the source.
    fn token_size(&self) -> usize;

    /// The window size, in tokens, this input would like the token buffer
    /// to use.
    fn buffer_size(&self) -> usize {
        64
    }
}

/// An in-memory input over an array of tokens of any clonable type.
#[derive(Clone, Debug)]
pub struct ArrayInput<T> {
    tokens: Vec<T>,
    pos: usize,
}

impl<T> ArrayInput<T> {
    /// Create an input over the given tokens.
    pub fn new(tokens: Vec<T>) -> ArrayInput<T> {
        ArrayInput { tokens, pos: 0 }
    }

    /// The total number of tokens in this input.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true iff this input holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<T: Clone + fmt::Debug> Input for ArrayInput<T> {
    type Token = T;

    fn stream_read(&mut self, buf: &mut Vec<T>, len: usize) -> io::Result<usize> {
        let avail = self.tokens.len() - self.pos;
        let n = if len < avail { len } else { avail };
        buf.extend_from_slice(&self.tokens[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn indexed_read(
        &mut self,
        buf: &mut Vec<T>,
        start: usize,
        len: usize,
    ) -> io::Result<usize> {
        if start >= self.tokens.len() {
            return Ok(0);
        }
        let avail = self.tokens.len() - start;
        let n = if len < avail { len } else { avail };
        buf.extend_from_slice(&self.tokens[start..start + n]);
        Ok(n)
    }

    fn token_size(&self) -> usize {
        mem::size_of::<T>()
    }
}

/// A seekable file input yielding one byte per token.
///
/// Indexed reads seek to the requested offset and restore the stream
/// position afterwards, so backreference reconstruction mid-run does not
/// corrupt the forward stream.
#[derive(Debug)]
pub struct FileInput {
    file: File,
}

impl FileInput {
    /// Open the file at `path` as a byte-token input.
    ///
    /// Open failure is fatal for the enclosing run, so it is reported
    /// before any kernel is involved.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<FileInput, Error> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Ok(FileInput { file }),
            Err(source) => Err(Error::Open { path: path.to_path_buf(), source }),
        }
    }
}

impl Input for FileInput {
    type Token = u8;

    fn stream_read(&mut self, buf: &mut Vec<u8>, len: usize) -> io::Result<usize> {
        let n = (&mut self.file).take(len as u64).read_to_end(buf)?;
        Ok(n)
    }

    fn indexed_read(
        &mut self,
        buf: &mut Vec<u8>,
        start: usize,
        len: usize,
    ) -> io::Result<usize> {
        let saved = self.file.stream_position()?;
        self.file.seek(SeekFrom::Start(start as u64))?;
        let n = (&mut self.file).take(len as u64).read_to_end(buf)?;
        self.file.seek(SeekFrom::Start(saved))?;
        Ok(n)
    }

    fn token_size(&self) -> usize {
        1
    }

    fn buffer_size(&self) -> usize {
        1024
    }
}
