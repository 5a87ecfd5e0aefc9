// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end matching over the byte and codepoint alphabets.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io::Write;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tokre::compile::{compile, compile_wrapped};
use tokre::{
    ascii, syntax, unicode, ArrayInput, CaptureId, Debugger, FileInput,
    Kernel, MapPattern, Options,
};

/// One match rendered as `(group id, [(start, end)])` pairs in id order.
type Shape = Vec<(CaptureId, Vec<(Option<usize>, Option<usize>)>)>;

fn shape(set: &tokre::CaptureSet) -> Shape {
    set.groups()
        .map(|(id, caps)| {
            (id, caps.iter().map(|c| (c.start, c.end)).collect())
        })
        .collect()
}

fn run(pattern: &str, input: &str, opts: Options) -> Vec<Shape> {
    let expr = syntax::parse(pattern).unwrap();
    let mut prog = MapPattern::new();
    compile::<ascii::ByteTest, _>(&expr, &mut prog).unwrap();
    let mut kernel = Kernel::new(&prog, None);
    kernel.execute(ascii::input(input), 0, opts);
    kernel.matches().iter().map(|set| shape(set)).collect()
}

// Like `run`, but with the whole pattern wrapped in an implicit group so
// match extents are visible. Returns the implicit group's id.
fn run_wrapped(
    pattern: &str,
    input: &str,
    offset: usize,
    opts: Options,
) -> (CaptureId, Vec<Shape>) {
    let expr = syntax::parse(pattern).unwrap();
    let mut prog = MapPattern::new();
    let whole = compile_wrapped::<ascii::ByteTest, _>(&expr, &mut prog).unwrap();
    let mut kernel = Kernel::new(&prog, None);
    kernel.execute(ascii::input(input), offset, opts);
    (whole, kernel.matches().iter().map(|set| shape(set)).collect())
}

fn extents(whole: CaptureId, shapes: &[Shape]) -> Vec<(usize, usize)> {
    shapes
        .iter()
        .filter_map(|shape| {
            shape.iter().find(|&&(id, _)| id == whole).and_then(|(_, caps)| {
                match caps.as_slice() {
                    [(Some(s), Some(e))] => Some((*s, *e)),
                    _ => None,
                }
            })
        })
        .collect()
}

#[test]
fn literal_finds_its_position() {
    let (whole, shapes) = run_wrapped("a", "bab", 0, Options::empty());
    assert_eq!(extents(whole, &shapes), vec![(1, 2)]);
}

#[test]
fn adjacent_groups_capture_their_slices() {
    let (whole, shapes) = run_wrapped("(a)(b)", "ab", 0, Options::empty());
    assert_eq!(whole, 2);
    assert_eq!(shapes.len(), 1);
    assert_eq!(
        shapes[0],
        vec![
            (0, vec![(Some(0), Some(1))]),
            (1, vec![(Some(1), Some(2))]),
            (2, vec![(Some(0), Some(2))]),
        ]
    );
}

#[test]
fn backtrack_matching_enumerates_capture_shapes() {
    let shapes = run("(a)*", "aa", Options::BACKTRACK_MATCHING);
    let distinct: BTreeSet<Shape> = shapes.into_iter().collect();
    let expected: BTreeSet<Shape> = vec![
        vec![],
        vec![(0, vec![(Some(0), Some(1))])],
        vec![(0, vec![(Some(0), Some(1)), (Some(1), Some(2))])],
        vec![(0, vec![(Some(1), Some(2))])],
    ]
    .into_iter()
    .collect();
    assert_eq!(distinct, expected);
}

#[test]
fn standard_dedup_collapses_capture_variants() {
    // One admitted thread per PC per step: the looping paths that would
    // carry captures are rejected at the split they jump back to, so only
    // the zero-iteration shape survives at each position.
    let shapes = run("(a)*", "aa", Options::empty());
    assert_eq!(shapes.len(), 3);
    assert!(shapes.iter().all(|shape| shape.is_empty()));

    // Wrapping shifts the loop target off the seed PC; the greedy
    // accumulation then wins each step.
    let (whole, shapes) = run_wrapped("(a)*", "aa", 0, Options::empty());
    assert_eq!(extents(whole, &shapes), vec![(0, 0), (0, 1), (0, 2)]);
}

#[test]
fn positive_lookahead_is_transparent() {
    let (whole, with) = run_wrapped("(?=a.)a.", "ab", 0, Options::empty());
    let (whole2, without) = run_wrapped("a.", "ab", 0, Options::empty());
    assert_eq!(extents(whole, &with), vec![(0, 2)]);
    assert_eq!(extents(whole, &with), extents(whole2, &without));
}

#[test]
fn positive_lookahead_rejects() {
    let (_, shapes) = run_wrapped("(?=ab)ac", "ac", 0, Options::empty());
    assert!(shapes.is_empty());
}

#[test]
fn negative_lookahead_blocks_and_admits() {
    let (_, shapes) = run_wrapped("(?!ab)a.", "ab", 0, Options::empty());
    assert!(shapes.is_empty());
    let (whole, shapes) = run_wrapped("(?!ab)a.", "ac", 0, Options::empty());
    assert_eq!(extents(whole, &shapes), vec![(0, 2)]);
}

#[test]
fn backreference_replays_a_capture() {
    let (whole, shapes) = run_wrapped(r"(a+)\1", "aaaa", 0, Options::empty());
    let spans = extents(whole, &shapes);
    assert!(spans.contains(&(0, 4)));
    // The (0,4) match replayed "aa" against positions 2..4.
    let full = shapes
        .iter()
        .find(|shape| {
            shape.iter().any(|&(id, ref caps)| {
                id == whole && caps == &vec![(Some(0), Some(4))]
            })
        })
        .unwrap();
    assert_eq!(full[0], (0, vec![(Some(0), Some(2))]));
}

#[test]
fn backreference_to_unset_group_drops() {
    assert!(run(r"(a)?\1", "b", Options::empty()).is_empty());
    // With the group set, the zero-or-one path that captured wins.
    let (whole, shapes) = run_wrapped(r"(a)?\1", "aa", 0, Options::empty());
    assert!(extents(whole, &shapes).contains(&(0, 2)));
}

#[test]
fn zero_length_backreference_steps_through() {
    let (whole, shapes) = run_wrapped(r"(a*)b\1c", "bc", 0, Options::empty());
    assert_eq!(extents(whole, &shapes), vec![(0, 2)]);
}

#[test]
fn empty_input_empty_match() {
    let (whole, shapes) = run_wrapped("(a)*", "", 0, Options::empty());
    assert_eq!(shapes.len(), 1);
    assert_eq!(extents(whole, &shapes), vec![(0, 0)]);
}

#[test]
fn never_matching_pattern_terminates_empty() {
    assert!(run("ab", "aa", Options::empty()).is_empty());
    assert!(run("(?!a)a", "a", Options::empty()).is_empty());
}

#[test]
fn negative_lookahead_over_dead_body_is_satisfied() {
    let (whole, shapes) = run_wrapped("(?!x)a", "a", 0, Options::empty());
    assert_eq!(extents(whole, &shapes), vec![(0, 1)]);
}

#[test]
fn anchored_matches_only_at_offset() {
    let (_, shapes) = run_wrapped("a", "aba", 1, Options::ANCHORED);
    assert!(shapes.is_empty());
    let (whole, shapes) = run_wrapped("a", "aba", 2, Options::ANCHORED);
    assert_eq!(extents(whole, &shapes), vec![(2, 3)]);
}

#[test]
fn unanchored_is_the_union_of_anchored_starts() {
    let haystack = "xaxab";
    let (whole, shapes) = run_wrapped("a.", haystack, 0, Options::empty());
    let unanchored = extents(whole, &shapes);

    let mut anchored = Vec::new();
    for offset in 0..=haystack.len() {
        let (whole, shapes) =
            run_wrapped("a.", haystack, offset, Options::ANCHORED);
        anchored.extend(
            extents(whole, &shapes).into_iter().filter(|&(s, _)| s == offset),
        );
    }
    assert_eq!(unanchored, anchored);
    assert_eq!(unanchored, vec![(1, 3), (3, 5)]);
}

#[test]
fn partial_match_at_end_of_input() {
    let (whole, shapes) =
        run_wrapped("abc", "ab", 0, Options::ANCHORED | Options::PARTIAL);
    assert_eq!(shapes.len(), 1);
    // The implicit group never saved its end.
    let caps = &shapes[0].iter().find(|&&(id, _)| id == whole).unwrap().1;
    assert_eq!(caps[0], (Some(0), None));

    // Without the flag the same run fails outright.
    let (_, shapes) = run_wrapped("abc", "ab", 0, Options::ANCHORED);
    assert!(shapes.is_empty());
}

#[test]
fn anchors_constrain_positions() {
    let (whole, shapes) = run_wrapped("^a", "aba", 0, Options::empty());
    assert_eq!(extents(whole, &shapes), vec![(0, 1)]);
    let (whole, shapes) = run_wrapped("a$", "aba", 0, Options::empty());
    assert_eq!(extents(whole, &shapes), vec![(2, 3)]);
}

#[test]
fn classes_and_sets_match_bytes() {
    let (whole, shapes) = run_wrapped(r"\d+", "ab123cd", 0, Options::empty());
    assert!(extents(whole, &shapes).contains(&(2, 5)));

    let (whole, shapes) = run_wrapped("[b-d]+", "abce", 0, Options::empty());
    assert!(extents(whole, &shapes).contains(&(1, 3)));

    let (_, shapes) = run_wrapped(r"\S", "  ", 0, Options::empty());
    assert!(shapes.is_empty());
}

#[test]
fn counted_repetition_bounds() {
    let (whole, shapes) =
        run_wrapped("^a{2,3}$", "aaa", 0, Options::empty());
    assert_eq!(extents(whole, &shapes), vec![(0, 3)]);
    let (_, shapes) = run_wrapped("^a{2,3}$", "a", 0, Options::empty());
    assert!(shapes.is_empty());
    let (_, shapes) = run_wrapped("^a{2,3}$", "aaaa", 0, Options::empty());
    assert!(shapes.is_empty());
}

#[test]
fn repeated_group_accumulates_intervals() {
    let (_, shapes) = run_wrapped("(ab)+", "abab", 0, Options::empty());
    let full = shapes
        .iter()
        .find(|shape| {
            shape.iter().any(|&(_, ref caps)| {
                caps.contains(&(Some(0), Some(4)))
            })
        })
        .unwrap();
    assert_eq!(
        full[0],
        (0, vec![(Some(0), Some(2)), (Some(2), Some(4))])
    );
}

#[test]
fn unicode_alphabet_counts_codepoints() {
    let expr = syntax::parse("f(é+)$").unwrap();
    let mut prog = MapPattern::new();
    compile::<unicode::CharTest, _>(&expr, &mut prog).unwrap();
    let mut kernel = Kernel::new(&prog, None);
    assert_eq!(kernel.execute(unicode::input("caféé"), 0, Options::empty()), 1);
    let set = &kernel.matches()[0];
    assert_eq!(
        (set.get(0)[0].start, set.get(0)[0].end),
        (Some(3), Some(5))
    );
}

#[test]
fn file_input_matches_and_reconstructs() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"xxabxx").unwrap();

    let expr = syntax::parse("ab").unwrap();
    let mut prog = MapPattern::new();
    let whole = compile_wrapped::<ascii::ByteTest, _>(&expr, &mut prog).unwrap();
    let mut kernel = Kernel::new(&prog, None);
    let input = FileInput::open(tmp.path()).unwrap();
    assert_eq!(kernel.execute(input, 0, Options::empty()), 1);

    let cap = kernel.matches()[0].get(whole)[0];
    assert_eq!((cap.start, cap.end), (Some(2), Some(4)));
    assert_eq!(kernel.reconstruct(&cap), b"ab");
}

#[test]
fn reconstruction_round_trips_every_capture() {
    let text = "foo12bar34";
    let expr = syntax::parse(r"(\d+)").unwrap();
    let mut prog = MapPattern::new();
    compile::<ascii::ByteTest, _>(&expr, &mut prog).unwrap();
    let mut kernel = Kernel::new(&prog, None);
    kernel.execute(ascii::input(text), 0, Options::empty());

    let matches = kernel.take_matches();
    assert!(!matches.is_empty());
    for set in &matches {
        for (_, caps) in set.groups() {
            for cap in caps {
                let (s, e) = (cap.start.unwrap(), cap.end.unwrap());
                assert!(s <= e && e <= text.len());
                assert_eq!(
                    kernel.reconstruct(cap),
                    text.as_bytes()[s..e].to_vec()
                );
            }
        }
    }
}

#[test]
fn kernel_is_reusable_across_runs() {
    let expr = syntax::parse("(a)(b)").unwrap();
    let mut prog = MapPattern::new();
    compile::<ascii::ByteTest, _>(&expr, &mut prog).unwrap();
    let mut kernel = Kernel::new(&prog, None);

    assert_eq!(kernel.execute(ascii::input("ab"), 0, Options::empty()), 1);
    assert_eq!(kernel.execute(ascii::input("xx"), 0, Options::empty()), 0);
    assert_eq!(kernel.execute(ascii::input("abab"), 0, Options::empty()), 2);
}

struct SpWatch {
    sps: Vec<usize>,
}

impl Debugger<ArrayInput<u8>, ascii::ByteTest> for SpWatch {
    fn before_token(
        &mut self,
        kernel: &Kernel<'_, ArrayInput<u8>, ascii::ByteTest>,
    ) {
        self.sps.push(kernel.sp());
    }
}

#[test]
fn stream_position_never_decreases() {
    let expr = syntax::parse(r"(a+)\1|b*").unwrap();
    let mut prog = MapPattern::new();
    compile::<ascii::ByteTest, _>(&expr, &mut prog).unwrap();

    let watch = Rc::new(RefCell::new(SpWatch { sps: Vec::new() }));
    let mut kernel = Kernel::new(&prog, None);
    kernel.attach_debugger(Box::new(watch.clone()));
    kernel.execute(ascii::input("aabab"), 0, Options::empty());

    let sps = &watch.borrow().sps;
    assert!(!sps.is_empty());
    assert!(sps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn agrees_with_naive_search_on_random_inputs() {
    let expr = syntax::parse("ab").unwrap();
    let mut prog = MapPattern::new();
    let whole = compile_wrapped::<ascii::ByteTest, _>(&expr, &mut prog).unwrap();

    let mut rng = StdRng::seed_from_u64(0x746f6b7265);
    for _ in 0..200 {
        let len = rng.gen_range(0..16);
        let haystack: String =
            (0..len).map(|_| if rng.gen() { 'a' } else { 'b' }).collect();

        let mut kernel = Kernel::new(&prog, None);
        kernel.execute(ascii::input(&haystack), 0, Options::empty());
        let got: Vec<(usize, usize)> = kernel
            .matches()
            .iter()
            .map(|set| {
                let cap = set.get(whole)[0];
                (cap.start.unwrap(), cap.end.unwrap())
            })
            .collect();

        let want: Vec<(usize, usize)> = haystack
            .as_bytes()
            .windows(2)
            .enumerate()
            .filter(|&(_, w)| w == b"ab")
            .map(|(i, _)| (i, i + 2))
            .collect();
        assert_eq!(got, want, "haystack {:?}", haystack);
    }
}
