// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A regular expression virtual machine over token streams.
//!
//! This crate simulates a Thompson/Pike-style NFA, with three departures
//! from the textbook machine:
//!
//! * **Backreferences.** A `Backtrack` instruction replays a previously
//!   captured interval against the input, reconstructed through the
//!   input's random-access read.
//! * **Lookahead without backtracking.** `(?=e)` and `(?!e)` run the
//!   lookahead body as ordinary simulation threads, intersected with the
//!   main pattern through a dependency graph of branch nodes rather than
//!   by rewinding the input.
//! * **A pluggable alphabet.** The kernel is generic over the token type;
//!   the same standard instruction band drives byte matching, Unicode
//!   codepoint matching, or any caller-supplied token stream.
//!
//! The pieces compose in one direction: parse a pattern into an
//! [`Expr`](syntax::Expr), lower it onto a [`Pattern`], and drive a
//! [`Kernel`] over an [`Input`].
//!
//! ```
//! use tokre::{ascii, compile, syntax, Kernel, MapPattern, Options};
//!
//! let expr = syntax::parse("(a)(b)").unwrap();
//! let mut prog = MapPattern::new();
//! compile::compile::<ascii::ByteTest, _>(&expr, &mut prog).unwrap();
//!
//! let mut kernel = Kernel::new(&prog, None);
//! assert_eq!(kernel.execute(ascii::input("ab"), 0, Options::empty()), 1);
//!
//! let caps = &kernel.matches()[0];
//! assert_eq!(caps.get(0)[0].start, Some(0));
//! assert_eq!(caps.get(1)[0].start, Some(1));
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod ascii;
pub mod branch;
pub mod buffer;
pub mod capture;
pub mod compile;
pub mod debugger;
pub mod input;
pub mod inst;
pub mod kernel;
pub mod program;
pub mod syntax;
pub mod thread;
pub mod unicode;

pub use crate::capture::{Capture, CaptureSet};
pub use crate::debugger::{Debugger, ProfileDebugger, TraceDebugger};
pub use crate::input::{ArrayInput, FileInput, Input};
pub use crate::inst::{CaptureId, Inst, InstIdx, Options, TokenTest, Verdict};
pub use crate::kernel::Kernel;
pub use crate::program::{MapPattern, Pattern};

/// An error produced outside the simulation itself: bad surface syntax, a
/// lowering that the chosen alphabet cannot express, or an input that
/// cannot be opened. Runtime conditions (read errors, unimplemented
/// opcodes, exceeded match bounds) never surface here; they end or trim
/// the run instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The pattern string is not valid surface syntax.
    #[error("syntax error at position {pos}: {msg}")]
    Syntax { pos: usize, msg: String },

    /// A pattern character cannot be expressed in the byte alphabet.
    #[error("'{0}' cannot be matched by the byte alphabet")]
    NonAscii(char),

    /// An input source could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
}
