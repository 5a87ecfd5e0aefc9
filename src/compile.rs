// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lowering of expression trees onto patterns.
//!
//! Each node compiles to the classic Thompson shapes:
//!
//! ```text
//! e1|e2:        split L1, L2        e*:     L1: split L2, L3
//!           L1: codes for e1                L2: codes for e
//!               jmp L3                          jmp L1
//!           L2: codes for e2            L3:
//!           L3:
//!
//! e?:           split L1, L2        e+:     L1: codes for e
//!           L1: codes for e                    split L1, L2
//!           L2:                            L2:
//!
//! (?=e):        branch L1, L2       (e):        save-start k
//!           L1: codes for e                     codes for e
//!               match                           save-end k
//!           L2:
//! ```
//!
//! Lazy repetitions swap the split targets. `e{m,n}` expands to `m` copies
//! followed by `n-m` optional copies (or a star when `n` is unbounded).
//!
//! The compiler is generic over the target alphabet through `TestFactory`,
//! which builds the alphabet's token tests out of syntax leaves; lowering
//! the same tree with the byte factory or the codepoint factory yields the
//! byte or Unicode rendition of the pattern.

use crate::inst::{CaptureId, Inst, InstIdx, TokenTest};
use crate::program::Pattern;
use crate::syntax::{ClassKind, Expr};
use crate::Error;

/// Builds an alphabet's token tests from syntax leaves.
pub trait TestFactory: TokenTest + Sized {
    /// A test for one literal character.
    fn literal(c: char) -> Result<Self, Error>;

    /// A test for an inclusive character range.
    fn range(lo: char, hi: char) -> Result<Self, Error>;

    /// A test for a class shortcut or its negation.
    fn class(kind: ClassKind, negated: bool) -> Self;
}

/// Compile `expr` into `pattern`, appending the final `Match`. Returns the
/// number of instructions emitted.
pub fn compile<S, P>(expr: &Expr, pattern: &mut P) -> Result<usize, Error>
where
    S: TestFactory,
    P: Pattern<S>,
{
    let end = compile_node(pattern, 0, expr)?;
    pattern.set_inst(end, Inst::Match);
    Ok(end + 1)
}

/// Compile `expr` wrapped in an implicit group covering the whole pattern,
/// so the extent of each match is observable. The implicit group is
/// numbered after every user group; its id is returned.
pub fn compile_wrapped<S, P>(
    expr: &Expr,
    pattern: &mut P,
) -> Result<CaptureId, Error>
where
    S: TestFactory,
    P: Pattern<S>,
{
    let whole = max_group(expr).map_or(0, |id| id + 1);
    pattern.set_inst(0, Inst::SaveStart(whole));
    let end = compile_node(pattern, 1, expr)?;
    pattern.set_inst(end, Inst::SaveEnd(whole));
    pattern.set_inst(end + 1, Inst::Match);
    Ok(whole)
}

fn compile_node<S, P>(
    pattern: &mut P,
    index: InstIdx,
    node: &Expr,
) -> Result<InstIdx, Error>
where
    S: TestFactory,
    P: Pattern<S>,
{
    match *node {
        Expr::Alt(ref left, ref right) => {
            let first = index + 1;
            let left_end = compile_node(pattern, first, left)?;
            let second = left_end + 1;
            pattern.set_inst(index, Inst::Split(first, second));
            let right_end = compile_node(pattern, second, right)?;
            pattern.set_inst(left_end, Inst::Jmp(right_end));
            Ok(right_end)
        }
        Expr::Cat(ref left, ref right) => {
            let mid = compile_node(pattern, index, left)?;
            compile_node(pattern, mid, right)
        }
        Expr::Dot => {
            pattern.set_inst(index, Inst::Any);
            Ok(index + 1)
        }
        Expr::Group(id, ref inner) => {
            pattern.set_inst(index, Inst::SaveStart(id));
            let end = compile_node(pattern, index + 1, inner)?;
            pattern.set_inst(end, Inst::SaveEnd(id));
            Ok(end + 1)
        }
        Expr::Quest(ref inner, greedy) => {
            compile_quest(pattern, index, inner, greedy)
        }
        Expr::Star(ref inner, greedy) => {
            compile_star(pattern, index, inner, greedy)
        }
        Expr::Plus(ref inner, greedy) => {
            let end = compile_node(pattern, index, inner)?;
            let split = if greedy {
                Inst::Split(index, end + 1)
            } else {
                Inst::Split(end + 1, index)
            };
            pattern.set_inst(end, split);
            Ok(end + 1)
        }
        Expr::Rep(ref inner, min, max, greedy) => {
            let mut next = index;
            for _ in 0..min {
                next = compile_node(pattern, next, inner)?;
            }
            match max {
                None => compile_star(pattern, next, inner, greedy),
                Some(max) => {
                    for _ in min..max {
                        next = compile_quest(pattern, next, inner, greedy)?;
                    }
                    Ok(next)
                }
            }
        }
        Expr::Backref(id) => {
            pattern.set_inst(index, Inst::Backtrack(id));
            Ok(index + 1)
        }
        Expr::Start => {
            pattern.set_inst(index, Inst::Start);
            Ok(index + 1)
        }
        Expr::End => {
            pattern.set_inst(index, Inst::End);
            Ok(index + 1)
        }
        Expr::PosAhead(ref inner) => {
            let body_end = compile_node(pattern, index + 1, inner)?;
            pattern.set_inst(body_end, Inst::Match);
            pattern.set_inst(index, Inst::Branch(index + 1, body_end + 1));
            Ok(body_end + 1)
        }
        Expr::NegAhead(ref inner) => {
            let body_end = compile_node(pattern, index + 1, inner)?;
            pattern.set_inst(body_end, Inst::Match);
            pattern.set_inst(index, Inst::NegBranch(index + 1, body_end + 1));
            Ok(body_end + 1)
        }
        Expr::Lit(c) => {
            pattern.set_inst(index, Inst::Test(S::literal(c)?));
            Ok(index + 1)
        }
        Expr::Range(lo, hi) => {
            pattern.set_inst(index, Inst::Test(S::range(lo, hi)?));
            Ok(index + 1)
        }
        Expr::Class(kind, negated) => {
            pattern.set_inst(index, Inst::Test(S::class(kind, negated)));
            Ok(index + 1)
        }
    }
}

fn compile_quest<S, P>(
    pattern: &mut P,
    index: InstIdx,
    inner: &Expr,
    greedy: bool,
) -> Result<InstIdx, Error>
where
    S: TestFactory,
    P: Pattern<S>,
{
    let end = compile_node(pattern, index + 1, inner)?;
    let split = if greedy {
        Inst::Split(index + 1, end)
    } else {
        Inst::Split(end, index + 1)
    };
    pattern.set_inst(index, split);
    Ok(end)
}

fn compile_star<S, P>(
    pattern: &mut P,
    index: InstIdx,
    inner: &Expr,
    greedy: bool,
) -> Result<InstIdx, Error>
where
    S: TestFactory,
    P: Pattern<S>,
{
    let end = compile_node(pattern, index + 1, inner)?;
    pattern.set_inst(end, Inst::Jmp(index));
    let split = if greedy {
        Inst::Split(index + 1, end + 1)
    } else {
        Inst::Split(end + 1, index + 1)
    };
    pattern.set_inst(index, split);
    Ok(end + 1)
}

fn max_group(expr: &Expr) -> Option<CaptureId> {
    match *expr {
        Expr::Alt(ref a, ref b) | Expr::Cat(ref a, ref b) => {
            match (max_group(a), max_group(b)) {
                (Some(x), Some(y)) => Some(x.max(y)),
                (x, y) => x.or(y),
            }
        }
        Expr::Group(id, ref inner) => {
            Some(max_group(inner).map_or(id, |x| x.max(id)))
        }
        Expr::Quest(ref inner, _)
        | Expr::Star(ref inner, _)
        | Expr::Plus(ref inner, _)
        | Expr::Rep(ref inner, _, _, _)
        | Expr::PosAhead(ref inner)
        | Expr::NegAhead(ref inner) => max_group(inner),
        _ => None,
    }
}

impl TestFactory for crate::ascii::ByteTest {
    fn literal(c: char) -> Result<Self, Error> {
        if c.is_ascii() {
            Ok(crate::ascii::ByteTest::Char(c as u8))
        } else {
            Err(Error::NonAscii(c))
        }
    }

    fn range(lo: char, hi: char) -> Result<Self, Error> {
        if !lo.is_ascii() {
            return Err(Error::NonAscii(lo));
        }
        if !hi.is_ascii() {
            return Err(Error::NonAscii(hi));
        }
        Ok(crate::ascii::ByteTest::Range(lo as u8, hi as u8))
    }

    fn class(kind: ClassKind, negated: bool) -> Self {
        if negated {
            crate::ascii::ByteTest::NegClass(kind)
        } else {
            crate::ascii::ByteTest::Class(kind)
        }
    }
}

impl TestFactory for crate::unicode::CharTest {
    fn literal(c: char) -> Result<Self, Error> {
        Ok(crate::unicode::CharTest::Char(c))
    }

    fn range(lo: char, hi: char) -> Result<Self, Error> {
        Ok(crate::unicode::CharTest::Range(lo, hi))
    }

    fn class(kind: ClassKind, negated: bool) -> Self {
        if negated {
            crate::unicode::CharTest::NegClass(kind)
        } else {
            crate::unicode::CharTest::Class(kind)
        }
    }
}
