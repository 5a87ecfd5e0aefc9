// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Observer hooks into a running kernel.
//!
//! Debuggers watch; they cannot steer. Every callback has a no-op default,
//! so an implementation only overrides the events it cares about, and core
//! behavior is identical whether zero or many debuggers are attached.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::trace;

use crate::input::Input;
use crate::inst::TokenTest;
use crate::kernel::Kernel;

/// A set of callbacks invoked at fixed points of a kernel run.
pub trait Debugger<I, S>
where
    I: Input,
    S: TokenTest<Token = I::Token>,
{
    /// The run is about to process its first token step.
    fn start(&mut self, _kernel: &Kernel<'_, I, S>) {}

    /// A token step is about to begin; the lists were just swapped.
    fn before_token(&mut self, _kernel: &Kernel<'_, I, S>) {}

    /// An instruction is about to execute.
    fn before_inst(&mut self, _kernel: &Kernel<'_, I, S>) {}

    /// An instruction just executed.
    fn after_inst(&mut self, _kernel: &Kernel<'_, I, S>) {}

    /// The current token step just drained.
    fn after_token(&mut self, _kernel: &Kernel<'_, I, S>) {}

    /// A capture set was just recorded as a match.
    fn matched(&mut self, _kernel: &Kernel<'_, I, S>) {}

    /// The run finished without recording any match.
    fn failure(&mut self, _kernel: &Kernel<'_, I, S>) {}

    /// The run is over.
    fn end(&mut self, _kernel: &Kernel<'_, I, S>) {}
}

/// Forwarding impl so callers can keep a handle to a debugger they attach.
impl<I, S, D> Debugger<I, S> for Rc<RefCell<D>>
where
    I: Input,
    S: TokenTest<Token = I::Token>,
    D: Debugger<I, S>,
{
    fn start(&mut self, kernel: &Kernel<'_, I, S>) {
        self.borrow_mut().start(kernel)
    }

    fn before_token(&mut self, kernel: &Kernel<'_, I, S>) {
        self.borrow_mut().before_token(kernel)
    }

    fn before_inst(&mut self, kernel: &Kernel<'_, I, S>) {
        self.borrow_mut().before_inst(kernel)
    }

    fn after_inst(&mut self, kernel: &Kernel<'_, I, S>) {
        self.borrow_mut().after_inst(kernel)
    }

    fn after_token(&mut self, kernel: &Kernel<'_, I, S>) {
        self.borrow_mut().after_token(kernel)
    }

    fn matched(&mut self, kernel: &Kernel<'_, I, S>) {
        self.borrow_mut().matched(kernel)
    }

    fn failure(&mut self, kernel: &Kernel<'_, I, S>) {
        self.borrow_mut().failure(kernel)
    }

    fn end(&mut self, kernel: &Kernel<'_, I, S>) {
        self.borrow_mut().end(kernel)
    }
}

/// Logs the shape of a run through the `log` facade at trace level.
#[derive(Debug, Default)]
pub struct TraceDebugger;

impl<I, S> Debugger<I, S> for TraceDebugger
where
    I: Input,
    S: TokenTest<Token = I::Token>,
{
    fn before_token(&mut self, kernel: &Kernel<'_, I, S>) {
        trace!(
            "token step sp={} token={:?} queued={}",
            kernel.sp(),
            kernel.current_token(),
            kernel.queued_threads(),
        );
    }

    fn matched(&mut self, kernel: &Kernel<'_, I, S>) {
        trace!("match #{} at sp={}", kernel.matches().len(), kernel.sp());
    }

    fn failure(&mut self, kernel: &Kernel<'_, I, S>) {
        trace!("run failed after sp={}", kernel.sp());
    }
}

/// Collects cheap performance counters over one or more runs.
#[derive(Debug, Default)]
pub struct ProfileDebugger {
    instructions: u64,
    tokens: u64,
    max_threads: usize,
    started: Option<Instant>,
    elapsed: Duration,
}

impl ProfileDebugger {
    /// Create a profiler wrapped for attachment; keep a clone of the
    /// handle to read the counters after the run.
    pub fn shared() -> Rc<RefCell<ProfileDebugger>> {
        Rc::new(RefCell::new(ProfileDebugger::default()))
    }

    /// Instructions executed.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Token steps driven, including the end-of-input step.
    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    /// The largest number of simultaneously queued threads observed.
    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Total wall-clock time across completed runs.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl<I, S> Debugger<I, S> for ProfileDebugger
where
    I: Input,
    S: TokenTest<Token = I::Token>,
{
    fn start(&mut self, _kernel: &Kernel<'_, I, S>) {
        self.started = Some(Instant::now());
    }

    fn before_token(&mut self, _kernel: &Kernel<'_, I, S>) {
        self.tokens += 1;
    }

    fn before_inst(&mut self, kernel: &Kernel<'_, I, S>) {
        self.instructions += 1;
        let queued = kernel.queued_threads();
        if queued > self.max_threads {
            self.max_threads = queued;
        }
    }

    fn end(&mut self, _kernel: &Kernel<'_, I, S>) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
    }
}
