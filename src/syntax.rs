// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Surface syntax and its parse tree.
//!
//! The grammar is deliberately small: alternation, concatenation, the
//! usual postfix repetitions with lazy variants, numbered groups,
//! lookaheads `(?=…)`/`(?!…)`, backreferences `\1`–`\9` (naming groups 0–8),
//! anchors, the `\w \d \s` class shortcuts with their negations, and
//! positive bracket sets. Groups are numbered by opening parenthesis,
//! starting at 0.

use std::fmt;

use crate::inst::CaptureId;
use crate::Error;

/// A character-class shortcut.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    /// `\w`: alphanumerics and underscore.
    Word,
    /// `\d`: digits.
    Digit,
    /// `\s`: whitespace.
    Space,
}

/// A parsed expression tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// `a|b`, preferring the left side.
    Alt(Box<Expr>, Box<Expr>),
    /// `ab`.
    Cat(Box<Expr>, Box<Expr>),
    /// `.`
    Dot,
    /// A numbered capture group.
    Group(CaptureId, Box<Expr>),
    /// `e?`; the flag is true when greedy.
    Quest(Box<Expr>, bool),
    /// `e*`; the flag is true when greedy.
    Star(Box<Expr>, bool),
    /// `e+`; the flag is true when greedy.
    Plus(Box<Expr>, bool),
    /// `e{m}`, `e{m,}` or `e{m,n}`; the flag is true when greedy.
    Rep(Box<Expr>, usize, Option<usize>, bool),
    /// `\1`–`\9`, referring to a capture group by id.
    Backref(CaptureId),
    /// `^`
    Start,
    /// `$`
    End,
    /// `(?=e)`
    PosAhead(Box<Expr>),
    /// `(?!e)`
    NegAhead(Box<Expr>),
    /// A literal character.
    Lit(char),
    /// An inclusive character range out of a bracket set.
    Range(char, char),
    /// A class shortcut; the flag is true when negated.
    Class(ClassKind, bool),
}

/// Parse a pattern string into an expression tree.
pub fn parse(pattern: &str) -> Result<Expr, Error> {
    let mut parser = Parser {
        chars: pattern.chars().collect(),
        pos: 0,
        next_group: 0,
    };
    let expr = parser.parse_alternation()?;
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unmatched ')'"));
    }
    Ok(expr)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    next_group: CaptureId,
}

impl Parser {
    fn parse_alternation(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_concat()?;
        while self.eat('|') {
            let rhs = self.parse_concat()?;
            expr = Expr::Alt(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_concat(&mut self) -> Result<Expr, Error> {
        let mut expr: Option<Expr> = None;
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let part = self.parse_repeat()?;
            expr = Some(match expr {
                None => part,
                Some(prev) => Expr::Cat(Box::new(prev), Box::new(part)),
            });
        }
        expr.ok_or_else(|| self.error("empty subexpression"))
    }

    fn parse_repeat(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek() {
                Some('?') => {
                    self.pos += 1;
                    let greedy = !self.eat('?');
                    expr = Expr::Quest(Box::new(expr), greedy);
                }
                Some('*') => {
                    self.pos += 1;
                    let greedy = !self.eat('?');
                    expr = Expr::Star(Box::new(expr), greedy);
                }
                Some('+') => {
                    self.pos += 1;
                    let greedy = !self.eat('?');
                    expr = Expr::Plus(Box::new(expr), greedy);
                }
                Some('{')
                    if self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) =>
                {
                    self.pos += 1;
                    expr = self.parse_counted(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_counted(&mut self, expr: Expr) -> Result<Expr, Error> {
        let min = self.parse_number()?;
        let max = if self.eat(',') {
            if self.peek() == Some('}') {
                None
            } else {
                Some(self.parse_number()?)
            }
        } else {
            Some(min)
        };
        self.expect('}')?;
        if let Some(max) = max {
            if max < min {
                return Err(self.error("repetition range is inverted"));
            }
        }
        let greedy = !self.eat('?');
        Ok(Expr::Rep(Box::new(expr), min, max, greedy))
    }

    fn parse_atom(&mut self) -> Result<Expr, Error> {
        let c = match self.bump() {
            Some(c) => c,
            None => return Err(self.error("expected an expression")),
        };
        match c {
            '(' => self.parse_group(),
            '.' => Ok(Expr::Dot),
            '^' => Ok(Expr::Start),
            '$' => Ok(Expr::End),
            '[' => self.parse_set(),
            '\\' => self.parse_escape(),
            '*' | '+' | '?' => {
                Err(self.error("repetition with nothing to repeat"))
            }
            c => Ok(Expr::Lit(c)),
        }
    }

    fn parse_group(&mut self) -> Result<Expr, Error> {
        if self.eat('?') {
            let kind = match self.bump() {
                Some('=') => Expr::PosAhead as fn(Box<Expr>) -> Expr,
                Some('!') => Expr::NegAhead as fn(Box<Expr>) -> Expr,
                _ => return Err(self.error("unsupported group modifier")),
            };
            let inner = self.parse_alternation()?;
            self.expect(')')?;
            Ok(kind(Box::new(inner)))
        } else {
            let id = self.next_group;
            self.next_group += 1;
            let inner = self.parse_alternation()?;
            self.expect(')')?;
            Ok(Expr::Group(id, Box::new(inner)))
        }
    }

    fn parse_escape(&mut self) -> Result<Expr, Error> {
        let c = match self.bump() {
            Some(c) => c,
            None => return Err(self.error("trailing backslash")),
        };
        match c {
            'w' => Ok(Expr::Class(ClassKind::Word, false)),
            'W' => Ok(Expr::Class(ClassKind::Word, true)),
            'd' => Ok(Expr::Class(ClassKind::Digit, false)),
            'D' => Ok(Expr::Class(ClassKind::Digit, true)),
            's' => Ok(Expr::Class(ClassKind::Space, false)),
            'S' => Ok(Expr::Class(ClassKind::Space, true)),
            'n' => Ok(Expr::Lit('\n')),
            't' => Ok(Expr::Lit('\t')),
            'r' => Ok(Expr::Lit('\r')),
            // \1 names group 0, matching the 0-based group numbering.
            c @ '1'..='9' => {
                Ok(Expr::Backref(c as CaptureId - '1' as CaptureId))
            }
            c if c.is_ascii_alphanumeric() => Err(self.error("unknown escape")),
            c => Ok(Expr::Lit(c)),
        }
    }

    fn parse_set(&mut self) -> Result<Expr, Error> {
        if self.peek() == Some('^') {
            return Err(self.error("negated character sets are not supported"));
        }
        let mut items: Vec<Expr> = Vec::new();
        loop {
            let c = match self.bump() {
                None => return Err(self.error("unclosed character set")),
                Some(']') => break,
                Some(c) => c,
            };
            let item = if c == '\\' {
                match self.parse_escape()? {
                    item @ (Expr::Class(..) | Expr::Lit(_)) => item,
                    _ => {
                        return Err(
                            self.error("escape not allowed in character set")
                        )
                    }
                }
            } else if self.peek() == Some('-')
                && self.peek_at(1).map_or(false, |c| c != ']')
            {
                self.pos += 1;
                let hi = match self.bump() {
                    Some(hi) => hi,
                    None => return Err(self.error("unclosed character set")),
                };
                if hi < c {
                    return Err(self.error("character range is inverted"));
                }
                Expr::Range(c, hi)
            } else {
                Expr::Lit(c)
            };
            items.push(item);
        }
        let mut items = items.into_iter();
        let first = match items.next() {
            Some(first) => first,
            None => return Err(self.error("empty character set")),
        };
        Ok(items.fold(first, |acc, item| {
            Expr::Alt(Box::new(acc), Box::new(item))
        }))
    }

    fn parse_number(&mut self) -> Result<usize, Error> {
        let mut n: usize = 0;
        let mut any = false;
        while let Some(c) = self.peek() {
            let d = match c.to_digit(10) {
                Some(d) => d as usize,
                None => break,
            };
            self.pos += 1;
            any = true;
            n = n
                .checked_mul(10)
                .and_then(|n| n.checked_add(d))
                .ok_or_else(|| self.error("repetition count too large"))?;
        }
        if !any {
            return Err(self.error("expected a number"));
        }
        Ok(n)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eat(&mut self, want: char) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: char) -> Result<(), Error> {
        if self.eat(want) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", want)))
        }
    }

    fn error<M: Into<String>>(&self, msg: M) -> Error {
        Error::Syntax { pos: self.pos, msg: msg.into() }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Expr::Alt(ref a, ref b) => write!(f, "Alt({}, {})", a, b),
            Expr::Cat(ref a, ref b) => write!(f, "Cat({}, {})", a, b),
            Expr::Dot => write!(f, "Dot"),
            Expr::Group(id, ref e) => write!(f, "Paren({}, {})", id, e),
            Expr::Quest(ref e, greedy) => {
                write!(f, "{}Quest({})", if greedy { "" } else { "Ng" }, e)
            }
            Expr::Star(ref e, greedy) => {
                write!(f, "{}Star({})", if greedy { "" } else { "Ng" }, e)
            }
            Expr::Plus(ref e, greedy) => {
                write!(f, "{}Plus({})", if greedy { "" } else { "Ng" }, e)
            }
            Expr::Rep(ref e, min, max, _) => match max {
                Some(max) => write!(f, "Rep{{{},{}}}({})", min, max, e),
                None => write!(f, "Rep{{{},}}({})", min, e),
            },
            Expr::Backref(id) => write!(f, "Backtrack({})", id),
            Expr::Start => write!(f, "Start"),
            Expr::End => write!(f, "End"),
            Expr::PosAhead(ref e) => write!(f, "PosAhead({})", e),
            Expr::NegAhead(ref e) => write!(f, "NegAhead({})", e),
            Expr::Lit(c) => write!(f, "Char({:?})", c),
            Expr::Range(lo, hi) => write!(f, "Range({:?}-{:?})", lo, hi),
            Expr::Class(kind, negated) => {
                write!(f, "{}Class({:?})", if negated { "Not" } else { "" }, kind)
            }
        }
    }
}
