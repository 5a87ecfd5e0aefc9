// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The execution kernel: a token-driven NFA simulation.
//!
//! The driver keeps two thread lists and alternates between them, one swap
//! per input token. Within a token step, threads executing zero-width
//! instructions are pushed back on the *head* of the current list, so a
//! pattern's leftmost alternative is always explored first; threads that
//! consume the token are pushed on the *tail* of the next list, preserving
//! breadth-first order across steps and with it the polynomial bound of
//! Thompson's construction.
//!
//! Everything beyond the textbook simulation — backreference replay, the
//! lookahead branch graph, capture-enumerating dedup — hangs off the
//! verdict bitmask each instruction reports back to the driver.

use std::mem;
use std::rc::Rc;

use log::{debug, error, trace};

use crate::branch::{Branch, BranchRef};
use crate::buffer::TokenBuffer;
use crate::capture::{BackrefBuffer, Capture, CaptureSet};
use crate::debugger::Debugger;
use crate::input::Input;
use crate::inst::{CaptureId, Inst, InstIdx, Options, TokenTest, Verdict};
use crate::program::Pattern;
use crate::thread::{Thread, ThreadList, ThreadPool};

/// The matching kernel.
///
/// A kernel is built over a compiled pattern and can be executed any number
/// of times against different inputs; thread allocations are recycled
/// across runs.
pub struct Kernel<'p, I, S>
where
    I: Input,
    S: TokenTest<Token = I::Token>,
{
    pattern: &'p dyn Pattern<S>,
    buffer: Option<TokenBuffer<I>>,
    sp: usize,
    current_token: Option<I::Token>,
    current: ThreadList<I::Token>,
    next: ThreadList<I::Token>,
    pool: ThreadPool<I::Token>,
    matches: Vec<Rc<CaptureSet>>,
    max_capturesets: Option<usize>,
    debuggers: Vec<Box<dyn Debugger<I, S>>>,
}

impl<'p, I, S> Kernel<'p, I, S>
where
    I: Input,
    S: TokenTest<Token = I::Token>,
{
    /// Create a kernel over `pattern`. `max_capturesets` bounds the number
    /// of matches accumulated per run; `None` means unbounded.
    pub fn new(
        pattern: &'p dyn Pattern<S>,
        max_capturesets: Option<usize>,
    ) -> Kernel<'p, I, S> {
        Kernel {
            pattern,
            buffer: None,
            sp: 0,
            current_token: None,
            current: ThreadList::new(),
            next: ThreadList::new(),
            pool: ThreadPool::new(),
            matches: Vec::new(),
            max_capturesets,
            debuggers: Vec::new(),
        }
    }

    /// Attach an observer. Debuggers only watch; they cannot change the
    /// outcome of a run.
    pub fn attach_debugger(&mut self, debugger: Box<dyn Debugger<I, S>>) {
        self.debuggers.push(debugger);
    }

    /// The input index of the token currently being stepped.
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// The token currently being stepped, or `None` at end of input.
    pub fn current_token(&self) -> Option<&I::Token> {
        self.current_token.as_ref()
    }

    /// The capture sets recorded so far, in discovery order.
    pub fn matches(&self) -> &[Rc<CaptureSet>] {
        &self.matches
    }

    /// Remove and return the recorded capture sets.
    pub fn take_matches(&mut self) -> Vec<Rc<CaptureSet>> {
        mem::take(&mut self.matches)
    }

    /// Threads queued on the scheduled lists right now.
    pub fn queued_threads(&self) -> usize {
        self.current.len() + self.next.len()
    }

    /// Re-read the tokens a completed capture matched over.
    pub fn reconstruct(&mut self, cap: &Capture) -> Vec<I::Token> {
        let mut out = Vec::new();
        if let (Some(s), Some(e)) = (cap.start, cap.end) {
            if let Some(buf) = self.buffer.as_mut() {
                if e > s {
                    buf.read_indexed(s, e - s, &mut out);
                }
            }
        }
        out
    }

    /// Run the pattern over `input`, starting at token index `offset`.
    /// Returns the number of matches recorded; the capture sets themselves
    /// are available through `matches`.
    pub fn execute(&mut self, input: I, offset: usize, opts: Options) -> usize {
        let mut buffer = TokenBuffer::new(input);
        buffer.fast_forward(offset);
        self.buffer = Some(buffer);
        self.sp = offset;
        self.current_token = None;
        self.matches.clear();
        self.current = ThreadList::new();
        self.next = ThreadList::new();
        let enumerate = opts.contains(Options::BACKTRACK_MATCHING);
        self.current.set_backtrack_captures(enumerate);
        self.next.set_backtrack_captures(enumerate);

        self.bootstrap(0);
        debug!("run start at offset {} ({:?})", offset, opts);
        self.notify(|d, k| d.start(k));

        while !self.next.is_empty() {
            let verdict = self.step_token(opts);
            if verdict.contains(Verdict::HALT) {
                break;
            }
            if self.current_token.is_some() && !opts.contains(Options::ANCHORED)
            {
                self.bootstrap(0);
            }
        }

        if self.matches.is_empty() {
            self.notify(|d, k| d.failure(k));
        }
        self.notify(|d, k| d.end(k));
        debug!("run end: {} matches", self.matches.len());
        self.matches.len()
    }

    // Seed a fresh thread at `pc` on the next list, so it joins the
    // simulation at the following token step.
    fn bootstrap(&mut self, pc: InstIdx) {
        let t = self.pool.alloc(pc);
        self.push_next_tail(t, false);
    }

    fn step_token(&mut self, opts: Options) -> Verdict {
        mem::swap(&mut self.current, &mut self.next);
        self.next.bump_gen();
        self.notify(|d, k| d.before_token(k));
        self.current_token = match self.buffer.as_mut() {
            Some(buf) => buf.read_next(),
            None => None,
        };

        let mut verdict = Verdict::DROP;
        while let Some(t) = self.current.pop_head(&mut self.pool) {
            self.notify(|d, k| d.before_inst(k));
            verdict = self.step_instruction(t, opts);
            self.notify(|d, k| d.after_inst(k));
            if verdict.contains(Verdict::HALT) {
                break;
            }
        }

        self.notify(|d, k| d.after_token(k));
        self.sp += 1;
        verdict
    }

    fn step_instruction(
        &mut self,
        t: Box<Thread<I::Token>>,
        opts: Options,
    ) -> Verdict {
        let pattern = self.pattern;
        let inst = match pattern.get_inst(t.pc) {
            Some(inst) => inst,
            None => {
                error!("no instruction at pc {}; halting", t.pc);
                self.pool.recycle(t);
                return Verdict::HALT;
            }
        };
        let is_main = t.is_main();
        let (mut verdict, thread) = self.execute_inst(t, inst, opts);

        if verdict.contains(Verdict::MATCH) {
            if let Some(ref t) = thread {
                self.save_captureset(t.captures.clone());
            }
        } else if verdict.contains(Verdict::DROP)
            && opts.contains(Options::PARTIAL)
            && self.current_token.is_none()
            && is_main
        {
            // The input ran out under a main thread: a partial match.
            verdict |= Verdict::MATCH;
            if let Some(ref t) = thread {
                self.save_captureset(t.captures.clone());
            }
        }

        if let Some(mut t) = thread {
            let backtrack = verdict.contains(Verdict::BACKTRACK);
            if verdict.contains(Verdict::CONSUME) {
                t.pc += 1;
                self.push_next_tail(t, backtrack);
            } else if verdict.contains(Verdict::STEP) {
                t.pc += 1;
                self.push_current_head(t, backtrack);
            } else {
                self.pool.recycle(t);
            }
        }
        verdict
    }

    // Execute one instruction for one thread. Returns the verdict and the
    // thread itself, unless the instruction already requeued it.
    fn execute_inst(
        &mut self,
        mut t: Box<Thread<I::Token>>,
        inst: &Inst<S>,
        _opts: Options,
    ) -> (Verdict, Option<Box<Thread<I::Token>>>) {
        match *inst {
            Inst::Any => match self.current_token {
                Some(_) => (Verdict::CONSUME, Some(t)),
                None => (Verdict::DROP, Some(t)),
            },
            Inst::Test(ref test) => match self.current_token {
                Some(ref token) if test.matches(token) => {
                    (Verdict::CONSUME, Some(t))
                }
                _ => (Verdict::DROP, Some(t)),
            },
            Inst::Start => {
                if self.sp == 0 {
                    (Verdict::STEP, Some(t))
                } else {
                    (Verdict::DROP, Some(t))
                }
            }
            Inst::End => {
                if self.current_token.is_none() {
                    (Verdict::STEP, Some(t))
                } else {
                    (Verdict::DROP, Some(t))
                }
            }
            Inst::Jmp(target) => {
                t.pc = target;
                self.push_current_head(t, false);
                (Verdict::empty(), None)
            }
            Inst::Split(a, b) => {
                t.pc = a;
                let mut clone = self.pool.clone_thread(&t);
                clone.pc = b;
                // LIFO: the preferred path lands on top.
                self.push_current_head(clone, false);
                self.push_current_head(t, false);
                (Verdict::empty(), None)
            }
            Inst::SaveStart(id) => {
                CaptureSet::save_start(&mut t.captures, id, self.sp);
                (Verdict::STEP, Some(t))
            }
            Inst::SaveEnd(id) => {
                CaptureSet::save_end(&mut t.captures, id, self.sp);
                (Verdict::STEP, Some(t))
            }
            Inst::Backtrack(id) => self.execute_backtrack(t, id),
            Inst::Branch(body, join) => self.execute_branch(t, body, join, false),
            Inst::NegBranch(body, join) => {
                self.execute_branch(t, body, join, true)
            }
            Inst::Match => self.execute_match(t),
            Inst::Recurse(_) => {
                error!("recurse is not implemented; halting");
                (Verdict::HALT, Some(t))
            }
        }
    }

    fn execute_match(
        &mut self,
        t: Box<Thread<I::Token>>,
    ) -> (Verdict, Option<Box<Thread<I::Token>>>) {
        let ref_branch = match t.ref_branch {
            None => return (Verdict::MATCH | Verdict::DROP, Some(t)),
            Some(ref b) => b.clone(),
        };
        // Flag the branch and leave a witness, then see whether any
        // witness currently holds up.
        Branch::record_match(&ref_branch, t.deps.as_ref());
        let viable = Branch::any_snapshot_satisfiable(&ref_branch);
        if viable && ref_branch.borrow().root {
            (Verdict::MATCH | Verdict::DROP, Some(t))
        } else {
            // Lookahead-body matches only feed the branch graph.
            (Verdict::DROP, Some(t))
        }
    }

    fn execute_backtrack(
        &mut self,
        mut t: Box<Thread<I::Token>>,
        id: CaptureId,
    ) -> (Verdict, Option<Box<Thread<I::Token>>>) {
        if t.backref.is_none() {
            let cap = match t.captures.last(id).copied() {
                Some(cap) => cap,
                None => return (Verdict::DROP, Some(t)),
            };
            let (start, end) = match (cap.start, cap.end) {
                (Some(s), Some(e)) => (s, e),
                // A half-saved capture cannot be replayed.
                _ => return (Verdict::DROP, Some(t)),
            };
            let mut tokens = Vec::with_capacity(end.saturating_sub(start));
            if let Some(buf) = self.buffer.as_mut() {
                buf.read_indexed(start, end - start, &mut tokens);
            }
            t.backref = Some(BackrefBuffer::new(tokens));
        }

        // Zero-length captures succeed without consuming anything.
        if t.backref.as_ref().map_or(false, BackrefBuffer::is_empty) {
            t.backref = None;
            return (Verdict::STEP, Some(t));
        }

        let current = match self.current_token.clone() {
            Some(token) => token,
            None => return (Verdict::DROP, Some(t)),
        };
        let matched = match t.backref.as_mut().and_then(BackrefBuffer::advance) {
            Some(referenced) => S::test_backref(&current, referenced),
            None => false,
        };
        if !matched {
            return (Verdict::DROP, Some(t));
        }
        if t.backref.as_ref().map_or(true, BackrefBuffer::exhausted) {
            t.backref = None;
            (Verdict::CONSUME, Some(t))
        } else {
            // More replay tokens remain: consume this token but hold the
            // PC, and bypass dedup so the repeated PC is not rejected.
            self.push_next_tail(t, true);
            (Verdict::empty(), None)
        }
    }

    fn execute_branch(
        &mut self,
        mut t: Box<Thread<I::Token>>,
        body: InstIdx,
        join: InstIdx,
        negated: bool,
    ) -> (Verdict, Option<Box<Thread<I::Token>>>) {
        let parent: BranchRef = match t.ref_branch {
            Some(ref b) => b.clone(),
            None => {
                let root = Branch::new_root();
                t.ref_branch = Some(root.clone());
                root
            }
        };
        let child = Branch::new(negated);

        // The join thread continues the main program. It keeps `parent` as
        // its ref and additionally depends on both `parent` and the new
        // branch; the original thread dives into the lookahead body with
        // the new branch as its ref.
        let mut join_t = self.pool.clone_thread(&t);
        join_t.pc = join;
        join_t.push_dep(parent);
        join_t.push_dep(child.clone());

        t.pc = body;
        t.ref_branch = Some(child);

        // Body on top: when body and join finish in the same token step,
        // the body's match must be witnessed first.
        self.push_current_head(join_t, false);
        self.push_current_head(t, false);
        (Verdict::empty(), None)
    }

    fn save_captureset(&mut self, set: Rc<CaptureSet>) {
        let under = self
            .max_capturesets
            .map_or(true, |max| self.matches.len() < max);
        if under {
            trace!("match recorded at sp {}", self.sp);
            self.matches.push(set);
            self.notify(|d, k| d.matched(k));
        }
    }

    fn push_current_head(&mut self, t: Box<Thread<I::Token>>, backtrack: bool) {
        if self.pattern.get_inst(t.pc).is_none() {
            self.pool.recycle(t);
            return;
        }
        if let Some(rejected) = self.current.push_head(t, backtrack) {
            self.pool.recycle(rejected);
        }
    }

    fn push_next_tail(&mut self, t: Box<Thread<I::Token>>, backtrack: bool) {
        if self.pattern.get_inst(t.pc).is_none() {
            self.pool.recycle(t);
            return;
        }
        if let Some(rejected) = self.next.push_tail(t, backtrack) {
            self.pool.recycle(rejected);
        }
    }

    fn notify<F>(&mut self, f: F)
    where
        F: Fn(&mut dyn Debugger<I, S>, &Self),
    {
        if self.debuggers.is_empty() {
            return;
        }
        let mut debuggers = mem::take(&mut self.debuggers);
        for d in debuggers.iter_mut() {
            f(d.as_mut(), self);
        }
        self.debuggers = debuggers;
    }
}

#[cfg(test)]
mod tests {
    use super::Kernel;
    use crate::ascii::{self, ByteTest};
    use crate::inst::{Inst, Options};
    use crate::program::{MapPattern, Pattern};

    // Hand-assembled program: 'a' 'b' match.
    fn ab_pattern() -> MapPattern<ByteTest> {
        let mut p = MapPattern::new();
        p.set_inst(0, Inst::Test(ByteTest::Char(b'a')));
        p.set_inst(1, Inst::Test(ByteTest::Char(b'b')));
        p.set_inst(2, Inst::Match);
        p
    }

    #[test]
    fn literal_program_matches_unanchored() {
        let p = ab_pattern();
        let mut kernel = Kernel::new(&p, None);
        let n = kernel.execute(ascii::input("xxabyy"), 0, Options::empty());
        assert_eq!(n, 1);
    }

    #[test]
    fn anchored_program_requires_offset_match() {
        let p = ab_pattern();
        let mut kernel = Kernel::new(&p, None);
        assert_eq!(kernel.execute(ascii::input("xab"), 0, Options::ANCHORED), 0);
        assert_eq!(kernel.execute(ascii::input("xab"), 1, Options::ANCHORED), 1);
    }

    #[test]
    fn recurse_halts_the_run() {
        let mut p = MapPattern::new();
        p.set_inst(0, Inst::Split(1, 3));
        p.set_inst(1, Inst::Recurse(0));
        p.set_inst(2, Inst::Match);
        p.set_inst(3, Inst::Test(ByteTest::Char(b'a')));
        p.set_inst(4, Inst::Match);
        let mut kernel = Kernel::new(&p, None);
        // The halt aborts before the 'a' path can ever match.
        assert_eq!(kernel.execute(ascii::input("a"), 0, Options::empty()), 0);
    }

    #[test]
    fn jump_to_missing_address_kills_the_thread() {
        let mut p = MapPattern::new();
        p.set_inst(0, Inst::Split(1, 3));
        p.set_inst(1, Inst::Jmp(9));
        p.set_inst(3, Inst::Test(ByteTest::Char(b'a')));
        p.set_inst(4, Inst::Match);
        let mut kernel = Kernel::new(&p, None);
        assert_eq!(kernel.execute(ascii::input("a"), 0, Options::empty()), 1);
    }

    #[test]
    fn max_capturesets_suppresses_without_halting() {
        let mut p = MapPattern::new();
        p.set_inst(0, Inst::Test(ByteTest::Char(b'a')));
        p.set_inst(1, Inst::Match);
        let mut kernel = Kernel::new(&p, Some(2));
        assert_eq!(kernel.execute(ascii::input("aaaa"), 0, Options::empty()), 2);
    }

    #[test]
    fn sp_reflects_offset() {
        let p = ab_pattern();
        let mut kernel = Kernel::new(&p, None);
        kernel.execute(ascii::input("ab"), 0, Options::empty());
        // One step per token plus the end-of-input step.
        assert_eq!(kernel.sp(), 3);
    }
}
