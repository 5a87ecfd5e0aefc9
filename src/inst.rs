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

use bitflags::bitflags;

/// InstIdx represents the index of an instruction in a compiled pattern.
pub type InstIdx = usize;

/// CaptureId identifies one capture group in a pattern.
///
/// Ids are arbitrary, but the compiler in this crate assigns them densely in
/// the order the groups' opening parentheses appear.
pub type CaptureId = usize;

/// An instruction in a pattern program.
///
/// Instructions come in two bands. The standard band is alphabet-agnostic
/// and is interpreted entirely by the kernel. The alphabet band is the
/// single `Test` variant, whose payload decides whether the current token
/// matches; the payload type is chosen by the alphabet in use (see the
/// `ascii` and `unicode` modules for the two stock alphabets).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inst<S> {
    /// The program has reached a match state.
    Match,
    /// Unconditionally continue execution at another instruction.
    Jmp(InstIdx),
    /// Diverge to one of two paths, preferring the first.
    Split(InstIdx, InstIdx),
    /// Consume any one token.
    Any,
    /// Record the current input index as the start of a capture interval.
    SaveStart(CaptureId),
    /// Record the current input index as the end of a capture interval.
    SaveEnd(CaptureId),
    /// Replay a previously captured interval against the input
    /// (a backreference).
    Backtrack(CaptureId),
    /// Succeed only at the beginning of the input.
    Start,
    /// Succeed only at the end of the input.
    End,
    /// Begin a positive lookahead intersection. The body program starts at
    /// the first index; the main program continues at the second.
    Branch(InstIdx, InstIdx),
    /// Begin a negative lookahead intersection.
    NegBranch(InstIdx, InstIdx),
    /// Subpattern recursion. Unimplemented; executing it halts the run.
    Recurse(CaptureId),
    /// Consume one token iff it satisfies the alphabet-specific test.
    Test(S),
}

/// The per-token capability record of an alphabet.
///
/// An implementation is the payload of `Inst::Test` and supplies the two
/// things the kernel cannot know on its own: whether a token satisfies a
/// test, and whether two tokens are equal for backreference replay.
pub trait TokenTest: Clone + fmt::Debug {
    /// The element type of the input stream this alphabet matches over.
    type Token: Clone + fmt::Debug;

    /// Returns true iff the given token satisfies this test.
    fn matches(&self, token: &Self::Token) -> bool;

    /// Backreference equality between the current input token and a token
    /// reconstructed from a captured interval.
    fn test_backref(current: &Self::Token, referenced: &Self::Token) -> bool;
}

bitflags! {
    /// The verdict bitmask an instruction execution reports back to the
    /// kernel driver.
    ///
    /// An empty verdict means the instruction already requeued the thread
    /// itself (`Jmp`, `Split`, the lookahead branches and mid-buffer
    /// backreference replay do this).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Verdict: u8 {
        /// Abort the entire token loop.
        const HALT = 1;
        /// Release the thread.
        const DROP = 2;
        /// Advance the PC and continue within the current token step.
        const STEP = 4;
        /// Advance the PC and wait for the next token.
        const CONSUME = 8;
        /// Record the thread's capture set as a completed match.
        const MATCH = 16;
        /// Admit the thread unconditionally, bypassing dedup.
        const BACKTRACK = 32;
    }
}

bitflags! {
    /// Option flags accepted by `Kernel::execute`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Options: u8 {
        /// Match only at the starting offset instead of re-seeding the
        /// pattern at every input position.
        const ANCHORED = 1;
        /// Enumerate all distinct capture combinations by loosening thread
        /// dedup.
        const BACKTRACK_MATCHING = 2;
        /// Treat end-of-input as matching for any remaining main-thread
        /// consumers.
        const PARTIAL = 4;
    }
}

impl<S: fmt::Display> fmt::Display for Inst<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Inst::Match => write!(f, "match"),
            Inst::Jmp(t) => write!(f, "jmp {}", t),
            Inst::Split(a, b) => write!(f, "split {}, {}", a, b),
            Inst::Any => write!(f, "any"),
            Inst::SaveStart(id) => write!(f, "save-start {}", id),
            Inst::SaveEnd(id) => write!(f, "save-end {}", id),
            Inst::Backtrack(id) => write!(f, "backtrack {}", id),
            Inst::Start => write!(f, "start"),
            Inst::End => write!(f, "end"),
            Inst::Branch(body, join) => write!(f, "branch {}, {}", body, join),
            Inst::NegBranch(body, join) => {
                write!(f, "neg-branch {}, {}", body, join)
            }
            Inst::Recurse(id) => write!(f, "recurse {}", id),
            Inst::Test(ref test) => test.fmt(f),
        }
    }
}
