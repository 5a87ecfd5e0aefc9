// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use log::warn;

use crate::input::Input;

/// A bounded window of tokens over an input source.
///
/// The buffer owns the forward progress of a run: `read_next` yields one
/// token at a time, refilling the window from the source whenever it runs
/// dry. `None` is the end-of-input sentinel; the kernel never looks past
/// it. Random access for backreference reconstruction goes straight to the
/// source's indexed read and does not disturb the window.
///
/// A mid-stream read error is not distinguishable from exhaustion by
/// design: the run simply winds down as if the input had ended there.
#[derive(Debug)]
pub struct TokenBuffer<I: Input> {
    input: I,
    window: Vec<I::Token>,
    pos: usize,
}

impl<I: Input> TokenBuffer<I> {
    /// Wrap an input source in a fresh buffer.
    pub fn new(input: I) -> TokenBuffer<I> {
        TokenBuffer { input, window: Vec::new(), pos: 0 }
    }

    /// Yield the next token, or `None` once the source is exhausted.
    pub fn read_next(&mut self) -> Option<I::Token> {
        if self.pos >= self.window.len() {
            self.refill();
            if self.window.is_empty() {
                return None;
            }
        }
        let token = self.window[self.pos].clone();
        self.pos += 1;
        Some(token)
    }

    /// Append up to `len` tokens starting at absolute index `start` onto
    /// `out`. Returns the number of tokens copied, which is fewer than
    /// `len` when the source is shorter.
    pub fn read_indexed(
        &mut self,
        start: usize,
        len: usize,
        out: &mut Vec<I::Token>,
    ) -> usize {
        match self.input.indexed_read(out, start, len) {
            Ok(n) => n,
            Err(err) => {
                warn!("indexed read at {} failed: {}", start, err);
                0
            }
        }
    }

    /// Advance the stream to absolute token index `offset` without
    /// yielding the skipped tokens.
    pub fn fast_forward(&mut self, offset: usize) {
        let mut skip = offset;
        loop {
            self.refill();
            if self.window.is_empty() {
                // Source shorter than the offset; reads will report end.
                self.pos = 0;
                return;
            }
            if skip < self.window.len() {
                self.pos = skip;
                return;
            }
            skip -= self.window.len();
        }
    }

    fn refill(&mut self) {
        let len = self.input.buffer_size();
        self.window.clear();
        self.pos = 0;
        if let Err(err) = self.input.stream_read(&mut self.window, len) {
            warn!("stream read failed, treating as end of input: {}", err);
            self.window.clear();
        }
    }
}
