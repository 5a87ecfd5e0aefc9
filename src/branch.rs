// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The lookahead dependency graph.
//!
//! A lookahead is matched as an *intersection*: the lookahead body runs as
//! ordinary simulation threads alongside the main pattern, and a `Branch`
//! node records whether that sub-computation has produced a witness. A
//! thread carries one *ref* branch (the node its own `Match` will flag) and
//! a list of *dependency* branches (nodes that must all succeed for the
//! thread's match to count).
//!
//! Threads own their ref and dependency branches strongly (`Rc`); witness
//! snapshots taken at match time own branches weakly (`Weak`). Snapshots
//! can form cycles — a branch is reachable from its own witnesses — and the
//! strong/weak split is what keeps those cycles collectable: when the last
//! thread lets go of a branch, the branch and the weak edges it holds are
//! freed together, and later upgrades of snapshot entries pointing at it
//! simply fail.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A shared handle to a branch node.
pub type BranchRef = Rc<RefCell<Branch>>;

/// A weak handle, used inside witness snapshots.
pub type WeakBranch = Weak<RefCell<Branch>>;

/// A shared, clone-on-write dependency list.
pub type DepList = Rc<Vec<BranchRef>>;

/// One witness: the dependency list of a thread at the moment it matched.
pub type Snapshot = Rc<Vec<WeakBranch>>;

/// A node in the lookahead dependency graph.
#[derive(Debug, Default)]
pub struct Branch {
    /// True for a negative lookahead: a match of the body *kills* the
    /// branch instead of satisfying it.
    pub negated: bool,
    /// True for the implicit branch installed as a main thread's ref the
    /// first time it executes a lookahead instruction.
    pub root: bool,
    /// Whether any thread with this branch as its ref has reached `Match`.
    pub matched: bool,
    /// Queued threads whose ref branch is this node. Maintained by the
    /// thread-list push and pop paths only.
    pub num_threads: usize,
    /// Dependency snapshots taken at each witnessing match, oldest first.
    pub matches: Vec<Snapshot>,
    // Cycle guard for the satisfiability walk.
    marked: bool,
}

impl Branch {
    /// Create a lookahead branch.
    pub fn new(negated: bool) -> BranchRef {
        Rc::new(RefCell::new(Branch { negated, ..Branch::default() }))
    }

    /// Create the implicit positive root installed under a main thread.
    pub fn new_root() -> BranchRef {
        Rc::new(RefCell::new(Branch { root: true, ..Branch::default() }))
    }

    /// A branch is alive while it can still influence an outcome: a
    /// positive branch needs running threads or a recorded match, a
    /// negated branch dies the moment its body matches.
    pub fn alive(&self) -> bool {
        if self.negated {
            !self.matched
        } else {
            self.num_threads > 0 || self.matched
        }
    }

    /// A branch has succeeded when its obligation is discharged: a match
    /// for a positive branch, exhaustion without a match for a negated one.
    pub fn succeeded(&self) -> bool {
        if self.negated {
            self.num_threads == 0 && !self.matched
        } else {
            self.matched
        }
    }

    /// Record a witnessing match: flag the branch and snapshot the matching
    /// thread's dependency list with weak references.
    pub fn record_match(this: &BranchRef, deps: Option<&DepList>) {
        let snapshot: Snapshot = Rc::new(match deps {
            Some(list) => list.iter().map(Rc::downgrade).collect(),
            None => Vec::new(),
        });
        let mut branch = this.borrow_mut();
        branch.matched = true;
        branch.matches.push(snapshot);
    }

    /// Whether any witness snapshot of `this`, newest first, currently
    /// passes the satisfiability check.
    pub fn any_snapshot_satisfiable(this: &BranchRef) -> bool {
        let snapshots: Vec<Snapshot> =
            this.borrow().matches.iter().rev().cloned().collect();
        snapshots.iter().any(|snap| check_snapshot(snap))
    }
}

/// Verify that every branch in a dependency list is satisfiable: a negated
/// branch must be unmatched with no threads left, a positive branch must
/// have matched with at least one witness snapshot that itself passes this
/// check. A re-entered branch (cycle) counts as satisfied.
pub fn check_match_list(deps: &[BranchRef]) -> bool {
    deps.iter().all(check_branch)
}

fn check_branch(branch: &BranchRef) -> bool {
    {
        let mut inner = branch.borrow_mut();
        if inner.marked {
            return true;
        }
        if inner.negated {
            return inner.succeeded();
        }
        if !inner.matched {
            return false;
        }
        inner.marked = true;
    }
    let ok = Branch::any_snapshot_satisfiable(branch);
    branch.borrow_mut().marked = false;
    ok
}

fn check_snapshot(snapshot: &Snapshot) -> bool {
    snapshot.iter().all(|weak| match weak.upgrade() {
        Some(branch) => check_branch(&branch),
        // The witnessed branch is gone; nothing can vouch for it now.
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{check_match_list, Branch};

    #[test]
    fn positive_branch_liveness() {
        let b = Branch::new(false);
        assert!(!b.borrow().alive());
        b.borrow_mut().num_threads = 1;
        assert!(b.borrow().alive());
        assert!(!b.borrow().succeeded());

        b.borrow_mut().num_threads = 0;
        b.borrow_mut().matched = true;
        assert!(b.borrow().alive());
        assert!(b.borrow().succeeded());
    }

    #[test]
    fn negated_branch_liveness() {
        let b = Branch::new(true);
        b.borrow_mut().num_threads = 1;
        assert!(b.borrow().alive());
        // Still threatened by a running body thread.
        assert!(!b.borrow().succeeded());

        b.borrow_mut().num_threads = 0;
        assert!(b.borrow().succeeded());

        b.borrow_mut().matched = true;
        assert!(!b.borrow().alive());
        assert!(!b.borrow().succeeded());
    }

    #[test]
    fn unwitnessed_positive_branch_fails_the_check() {
        let b = Branch::new(false);
        b.borrow_mut().matched = true;
        // Matched but holds no snapshot that passes.
        assert!(!check_match_list(&[b]));
    }

    #[test]
    fn empty_witness_satisfies() {
        let b = Branch::new(false);
        Branch::record_match(&b, None);
        assert!(check_match_list(&[b]));
    }

    #[test]
    fn witness_chains_through_dependencies() {
        // child must succeed for parent's witness to hold.
        let child = Branch::new(false);
        let parent = Branch::new(false);
        let deps = Rc::new(vec![child.clone()]);
        Branch::record_match(&parent, Some(&deps));

        assert!(!check_match_list(&[parent.clone()]));

        Branch::record_match(&child, None);
        assert!(check_match_list(&[parent]));
    }

    #[test]
    fn self_referential_witness_terminates() {
        let b = Branch::new(false);
        let deps = Rc::new(vec![b.clone()]);
        Branch::record_match(&b, Some(&deps));
        // The cycle guard treats the re-entered branch as satisfied.
        assert!(check_match_list(&[b]));
    }

    #[test]
    fn dead_witness_fails_conservatively() {
        let parent = Branch::new(false);
        {
            let child = Branch::new(false);
            child.borrow_mut().matched = true;
            let deps = Rc::new(vec![child]);
            Branch::record_match(&parent, Some(&deps));
            // child's last strong ref drops here.
        }
        assert!(!check_match_list(&[parent]));
    }
}
