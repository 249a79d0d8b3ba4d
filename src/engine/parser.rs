//! Rule text parser.
//!
//! This module turns one line of a rule file into the subrules it stands for.
//! It is the first stage of every pipeline in the crate: the inverter, the
//! dependency extractor and the forward mangler all consume `Subrule`s.
//!
//! Parsing happens in two layers:
//!
//! ```text
//! rule text ── lex (style-specific) ──> [Slot]        literals + bracket ranges
//!                                          │
//!                 choose expanded ranges ──┤           (restart when a range
//!                                          │            sits in a scalar slot)
//!                                          v
//!                   for each index j: substitute members, run the grammar
//!                                          │
//!                                          v
//!                                     Vec<Subrule>
//! ```
//!
//! ## Ranges (JtR preprocessor)
//!
//! - `[...]` lists members, `a-z` spans, `\x` escapes `x`, `\xHH` is a byte.
//! - `\p[...]` and `\pN[...]` walk in lockstep with the previous range or
//!   range `N` (1-based, counted in text order); `\N` repeats range `N`
//!   in lockstep (`\0` is the previous range); `\r[...]` is a plain range.
//! - A range used as the character of `$ ^ i` or inside the string of `A`
//!   stays a set-valued parameter: one subrule that stands for one candidate
//!   per member. Every other range multiplies the subrule count, the most
//!   recent range varying fastest. A lockstep pair is always expanded.
//!
//! ## Grammar
//!
//! Positions are one character: `0-9`, `A-Z` (10-35), `*`/`-`/`+` around
//! `min_cut_length`, `z`/`l` for "beyond the end", and `a-k`/`m`/`p` which are
//! only known while mangling. Hashcat accepts `0-9`, `A-Z` and `p`.
//!
//! JtR and hashcat share most commands; the differences (`p R L -`, `A v 4 6
//! *`, `?C` classes, reject flags and modes) are decided by `Style` here so
//! later stages only see `Primitive`s.
//!
//! ## Debugging
//!
//! Set `RULEGUESS_DEBUG=1` to print every line that fails to parse and the
//! ranges chosen for expansion.

use crate::config::{Config, Style};
use crate::engine::charset::{Charset, char_class};
use crate::error::{Error, Result};
use crate::{LenCmp, Pos, Primitive, RejectFlag, Subrule};
use std::collections::BTreeSet;

/// Upper bound on subrules produced by one line.
pub const MAX_SUBRULES: usize = 100_000;

/// A lexed rule character: a literal byte or a reference to a bracket range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Lit(u8),
    Range(usize),
}

#[derive(Debug, Clone)]
struct RangeSpec {
    /// Members in text order.
    members: Vec<u8>,
    /// Lockstep partner (an earlier range).
    coupled_to: Option<usize>,
}

/// A grammar input item after deciding which ranges expand.
#[derive(Debug, Clone, Copy)]
enum Item {
    Lit(u8),
    Set(usize, Charset),
}

enum Fail {
    /// Range `.0` sits where a single character is required.
    Expand(usize),
    Syntax(String),
}

/// Parses one rule line for one configuration.
///
/// ```text
/// RuleParser::new(raw, config)?   lex into slots + ranges
///        .subrules()?             expand + run the grammar per subrule
/// ```
pub struct RuleParser<'a> {
    raw: &'a str,
    config: &'a Config,
    slots: Vec<Slot>,
    ranges: Vec<RangeSpec>,
}

impl<'a> RuleParser<'a> {
    pub fn new(raw: &'a str, config: &'a Config) -> Result<Self> {
        let (slots, ranges) = match config.style {
            Style::Jtr => lex_jtr(raw.as_bytes()).map_err(|m| Error::parse(raw, m))?,
            Style::Hashcat => (raw.bytes().map(Slot::Lit).collect(), Vec::new()),
        };
        Ok(RuleParser { raw, config, slots, ranges })
    }

    /// Expand ranges and parse every resulting subrule.
    pub fn subrules(&self) -> Result<Vec<Subrule>> {
        let mut expand: BTreeSet<usize> = BTreeSet::new();
        for (idx, range) in self.ranges.iter().enumerate() {
            if range.coupled_to.is_some() {
                expand.insert(idx);
                expand.insert(self.root(idx));
            }
        }

        'restart: loop {
            let full: Vec<usize> = expand.iter().copied().filter(|r| self.ranges[*r].coupled_to.is_none()).collect();
            let mut total: usize = 1;
            for r in &full {
                total = total
                    .checked_mul(self.ranges[*r].members.len())
                    .filter(|t| *t <= MAX_SUBRULES)
                    .ok_or_else(|| Error::parse(self.raw, format!("expands to more than {} subrules", MAX_SUBRULES)))?;
            }
            debug_trace!(self.config, "[parse] rule={:?} expanded_ranges={:?} subrules={}", self.raw, expand, total);

            let mut out = Vec::with_capacity(total);
            for j in 0..total {
                let items = self.items_for(j, &expand, &full);
                match parse_items(&items, self.config) {
                    Ok(primitives) => out.push(Subrule::new(primitives)),
                    Err(Fail::Expand(r)) => {
                        expand.insert(r);
                        continue 'restart;
                    }
                    Err(Fail::Syntax(message)) => return Err(Error::parse(self.raw, message)),
                }
            }
            return Ok(out);
        }
    }

    fn root(&self, mut idx: usize) -> usize {
        while let Some(prev) = self.ranges[idx].coupled_to {
            idx = prev;
        }
        idx
    }

    /// Index of the member of full range `r` used by subrule `j`.
    fn digit(&self, r: usize, j: usize, full: &[usize]) -> usize {
        let stride: usize = full.iter().filter(|other| **other > r).map(|other| self.ranges[*other].members.len()).product();
        (j / stride) % self.ranges[r].members.len()
    }

    fn items_for(&self, j: usize, expand: &BTreeSet<usize>, full: &[usize]) -> Vec<Item> {
        self.slots
            .iter()
            .map(|slot| match *slot {
                Slot::Lit(b) => Item::Lit(b),
                Slot::Range(r) if expand.contains(&r) => {
                    let members = &self.ranges[r].members;
                    let digit = self.digit(self.root(r), j, full);
                    Item::Lit(members[digit % members.len()])
                }
                Slot::Range(r) => Item::Set(r, Charset::from_bytes(&self.ranges[r].members)),
            })
            .collect()
    }
}

/// Parse `raw` into subrules.
pub fn parse_line(raw: &str, config: &Config) -> Result<Vec<Subrule>> {
    RuleParser::new(raw, config)?.subrules()
}

// --- JtR preprocessor lexing ---------------------------------------------------

fn lex_jtr(raw: &[u8]) -> std::result::Result<(Vec<Slot>, Vec<RangeSpec>), String> {
    let mut slots = Vec::new();
    let mut ranges: Vec<RangeSpec> = Vec::new();
    let mut i = 0;

    while i < raw.len() {
        let b = raw[i];
        if b == b'[' {
            let (members, next) = lex_range_body(raw, i + 1)?;
            ranges.push(RangeSpec { members, coupled_to: None });
            slots.push(Slot::Range(ranges.len() - 1));
            i = next;
            continue;
        }
        if b != b'\\' || i + 1 >= raw.len() {
            slots.push(Slot::Lit(b));
            i += 1;
            continue;
        }

        let c = raw[i + 1];
        match c {
            b'0'..=b'9' => {
                // `\N`: lockstep copy of an earlier range.
                let target = backref_target(&ranges, (c - b'0') as usize)?;
                let members = ranges[target].members.clone();
                ranges.push(RangeSpec { members, coupled_to: Some(target) });
                slots.push(Slot::Range(ranges.len() - 1));
                i += 2;
            }
            b'p' | b'r' => {
                // Prefixes `\p`, `\pN` and `\r` in front of a range; the last
                // `\p` decides the lockstep partner.
                let mut j = i;
                let mut partner: Option<Option<usize>> = None;
                while j + 1 < raw.len() && raw[j] == b'\\' && matches!(raw[j + 1], b'p' | b'r') {
                    if raw[j + 1] == b'r' {
                        j += 2;
                    } else if j + 2 < raw.len() && raw[j + 2].is_ascii_digit() {
                        partner = Some(Some((raw[j + 2] - b'0') as usize));
                        j += 3;
                    } else {
                        partner = Some(None);
                        j += 2;
                    }
                }
                if raw.get(j) != Some(&b'[') {
                    slots.push(Slot::Lit(c));
                    i += 2;
                    continue;
                }
                let coupled_to = match partner {
                    Some(n) => Some(backref_target(&ranges, n.unwrap_or(0))?),
                    None => None,
                };
                let (members, next) = lex_range_body(raw, j + 1)?;
                ranges.push(RangeSpec { members, coupled_to });
                slots.push(Slot::Range(ranges.len() - 1));
                i = next;
            }
            b'x' if i + 3 < raw.len() => match hex_byte(raw[i + 2], raw[i + 3]) {
                Some(byte) => {
                    slots.push(Slot::Lit(byte));
                    i += 4;
                }
                None => {
                    slots.push(Slot::Lit(b'x'));
                    i += 2;
                }
            },
            _ => {
                slots.push(Slot::Lit(c));
                i += 2;
            }
        }
    }
    Ok((slots, ranges))
}

/// `0` names the previous range, `N` the N-th range of the line.
fn backref_target(ranges: &[RangeSpec], n: usize) -> std::result::Result<usize, String> {
    if ranges.is_empty() {
        return Err("range reference without a previous range".to_string());
    }
    match n {
        0 => Ok(ranges.len() - 1),
        n if n <= ranges.len() => Ok(n - 1),
        n => Err(format!("reference to range {} but only {} precede it", n, ranges.len())),
    }
}

/// Lex the body of a bracket range starting after `[`; returns the members and
/// the index after the closing `]`.
fn lex_range_body(raw: &[u8], start: usize) -> std::result::Result<(Vec<u8>, usize), String> {
    // (byte, escaped)
    let mut items: Vec<(u8, bool)> = Vec::new();
    let mut i = start;
    loop {
        let Some(&b) = raw.get(i) else {
            return Err("unterminated range".to_string());
        };
        match b {
            b']' => break,
            b'\\' if i + 1 < raw.len() => {
                if raw[i + 1] == b'x' && i + 3 < raw.len() {
                    if let Some(byte) = hex_byte(raw[i + 2], raw[i + 3]) {
                        items.push((byte, true));
                        i += 4;
                        continue;
                    }
                }
                items.push((raw[i + 1], true));
                i += 2;
            }
            _ => {
                items.push((b, false));
                i += 1;
            }
        }
    }

    let mut members = Vec::new();
    let mut k = 0;
    while k < items.len() {
        let spans = k + 2 < items.len() && items[k + 1] == (b'-', false);
        if spans {
            let (a, z) = (items[k].0, items[k + 2].0);
            let (lo, hi) = if a <= z { (a, z) } else { (z, a) };
            members.extend(lo..=hi);
            k += 3;
        } else {
            members.push(items[k].0);
            k += 1;
        }
    }
    if members.is_empty() {
        return Err("empty range".to_string());
    }
    Ok((members, i + 1))
}

fn hex_byte(hi: u8, lo: u8) -> Option<u8> {
    let digit = |c: u8| (c as char).to_digit(16).map(|d| d as u8);
    Some(digit(hi)? * 16 + digit(lo)?)
}

// --- Grammar -------------------------------------------------------------------------

struct Cursor<'i> {
    items: &'i [Item],
    at: usize,
    config: &'i Config,
}

impl<'i> Cursor<'i> {
    fn done(&self) -> bool {
        self.at >= self.items.len()
    }

    fn peek_lit(&self) -> Option<u8> {
        match self.items.get(self.at) {
            Some(Item::Lit(b)) => Some(*b),
            _ => None,
        }
    }

    /// A single literal character.
    fn lit(&mut self, what: &str) -> std::result::Result<u8, Fail> {
        match self.items.get(self.at) {
            Some(Item::Lit(b)) => {
                self.at += 1;
                Ok(*b)
            }
            Some(Item::Set(r, _)) => Err(Fail::Expand(*r)),
            None => Err(Fail::Syntax(format!("missing {}", what))),
        }
    }

    /// A character parameter that may stay set-valued (`$ ^ i A`).
    fn char_set(&mut self) -> std::result::Result<Charset, Fail> {
        match self.items.get(self.at) {
            Some(Item::Lit(b)) => {
                self.at += 1;
                Ok(Charset::single(*b))
            }
            Some(Item::Set(_, set)) => {
                self.at += 1;
                Ok(*set)
            }
            None => Err(Fail::Syntax("missing character".to_string())),
        }
    }

    /// `X` or, in JtR, `?C`.
    fn class_or_char(&mut self) -> std::result::Result<Charset, Fail> {
        let b = self.lit("character")?;
        if b == b'?' && self.config.style == Style::Jtr {
            let code = self.lit("class after `?`")?;
            return char_class(code, self.config.style)
                .ok_or_else(|| Fail::Syntax(format!("unknown character class ?{}", code as char)));
        }
        Ok(Charset::single(b))
    }

    fn pos(&mut self) -> std::result::Result<Pos, Fail> {
        let b = self.lit("position")?;
        position_code(b, self.config).ok_or_else(|| Fail::Syntax(format!("invalid position '{}'", b as char)))
    }

    fn next_is_position(&self) -> bool {
        match self.items.get(self.at) {
            Some(Item::Lit(b)) => position_code(*b, self.config).is_some(),
            Some(Item::Set(..)) => true,
            None => false,
        }
    }
}

/// Decode a one-character position or length.
pub fn position_code(b: u8, config: &Config) -> Option<Pos> {
    match b {
        b'0'..=b'9' => Some(Pos::Num((b - b'0') as usize)),
        b'A'..=b'Z' => Some(Pos::Num((b - b'A') as usize + 10)),
        b'p' => Some(Pos::Runtime(b'p')),
        _ if config.style == Style::Hashcat => None,
        b'*' => Some(Pos::Num(config.min_cut_length)),
        b'-' => Some(Pos::Num(config.min_cut_length - 1)),
        b'+' => Some(Pos::Num(config.min_cut_length + 1)),
        b'z' | b'l' => Some(Pos::Infinite),
        b'a'..=b'k' | b'm' => Some(Pos::Runtime(b)),
        _ => None,
    }
}

fn parse_items(items: &[Item], config: &Config) -> std::result::Result<Vec<Primitive>, Fail> {
    let mut cur = Cursor { items, at: 0, config };
    let mut out = Vec::new();
    let jtr = config.style == Style::Jtr;

    while !cur.done() {
        let op = cur.lit("command")?;
        let prim = match op {
            b' ' | b'\t' => continue,
            b':' => Primitive::Noop,
            b'l' => Primitive::Lower,
            b'u' => Primitive::Upper,
            b'c' => Primitive::Capitalize,
            b'C' => Primitive::InvCapitalize,
            b't' => Primitive::ToggleAll,
            b'r' => Primitive::Reverse,
            b'd' => Primitive::Duplicate,
            b'f' => Primitive::Reflect,
            b'{' => Primitive::RotateLeft,
            b'}' => Primitive::RotateRight,
            b'[' => Primitive::DeleteFirst,
            b']' => Primitive::DeleteLast,
            b'q' => Primitive::DupEach,
            b'k' => Primitive::SwapFront,
            b'K' => Primitive::SwapBack,
            b'E' => Primitive::TitleSpace,
            b'P' => Primitive::PastTense,
            b'I' => Primitive::Gerund,
            b'S' => Primitive::ShiftCase,
            b'V' => Primitive::VowelsLower,
            b'M' => Primitive::Memorize,
            b'Q' => Primitive::RejectUnchanged,
            b'p' if jtr => Primitive::Pluralize,
            b'p' => Primitive::DupWord(cur.pos()?),
            b'R' if jtr => Primitive::KeyRight,
            b'R' => Primitive::BitRight(cur.pos()?),
            b'L' if jtr => Primitive::KeyLeft,
            b'L' => Primitive::BitLeft(cur.pos()?),
            b'4' if !jtr => Primitive::AppendMemory,
            b'6' if !jtr => Primitive::PrependMemory,

            b'$' => Primitive::Append(cur.char_set()?),
            b'^' => Primitive::Prepend(cur.char_set()?),
            b'T' => Primitive::ToggleAt(cur.pos()?),
            b'\'' => Primitive::Truncate(cur.pos()?),
            b'D' => Primitive::DeleteAt(cur.pos()?),
            b'z' => Primitive::DupFirst(cur.pos()?),
            b'Z' => Primitive::DupLast(cur.pos()?),
            b'+' if jtr && !cur.next_is_position() => Primitive::Mode(b'+'),
            b'+' => Primitive::Increment(cur.pos()?),
            b'-' if jtr => Primitive::Flag(reject_flag(&mut cur)?),
            b'-' => Primitive::Decrement(cur.pos()?),
            b'.' => Primitive::ReplaceNext(cur.pos()?),
            b',' => Primitive::ReplacePrev(cur.pos()?),
            b'y' => Primitive::DupBlockFront(cur.pos()?),
            b'Y' => Primitive::DupBlockBack(cur.pos()?),

            b'i' => {
                let n = cur.pos()?;
                Primitive::Insert(n, cur.char_set()?)
            }
            b'o' => {
                let n = cur.pos()?;
                Primitive::Overwrite(n, cur.lit("character")?)
            }
            b'O' => {
                let n = cur.pos()?;
                Primitive::DeleteRange(n, cur.pos()?)
            }
            b'x' => {
                let n = cur.pos()?;
                Primitive::Extract(n, cur.pos()?)
            }
            b'*' if !jtr => {
                let n = cur.pos()?;
                Primitive::Swap(n, cur.pos()?)
            }
            b'A' if jtr => {
                let n = cur.pos()?;
                let delim = cur.lit("string delimiter")?;
                let mut chars = Vec::new();
                loop {
                    if cur.peek_lit() == Some(delim) {
                        cur.at += 1;
                        break;
                    }
                    if cur.done() {
                        return Err(Fail::Syntax("unterminated string".to_string()));
                    }
                    chars.push(cur.char_set()?);
                }
                Primitive::InsertString(n, chars)
            }
            b'X' => {
                let n = cur.pos()?;
                let m = cur.pos()?;
                Primitive::ExtractMemory(n, m, cur.pos()?)
            }
            b'v' if jtr => {
                let var = cur.lit("variable")?;
                if !(b'a'..=b'k').contains(&var) {
                    return Err(Fail::Syntax(format!("invalid variable '{}'", var as char)));
                }
                let n = cur.pos()?;
                Primitive::SetVar(var, n, cur.pos()?)
            }
            b'1' | b'2' if jtr => Primitive::Mode(op),

            b'<' => Primitive::RejectLen(if jtr { LenCmp::Less } else { LenCmp::LessEq }, cur.pos()?),
            b'>' => Primitive::RejectLen(if jtr { LenCmp::Greater } else { LenCmp::GreaterEq }, cur.pos()?),
            b'_' => Primitive::RejectLen(LenCmp::Equal, cur.pos()?),
            b'!' => Primitive::RejectIfContains(cur.class_or_char()?),
            b'/' => Primitive::RejectUnlessContains(cur.class_or_char()?),
            b'(' => Primitive::RejectUnlessFirst(cur.class_or_char()?),
            b')' => Primitive::RejectUnlessLast(cur.class_or_char()?),
            b'@' => Primitive::Purge(cur.class_or_char()?),
            b'e' => Primitive::TitleSep(cur.class_or_char()?),
            b'=' => {
                let n = cur.pos()?;
                Primitive::RejectUnlessAt(n, cur.class_or_char()?)
            }
            b'%' => {
                let n = cur.pos()?;
                Primitive::RejectUnlessCount(n, cur.class_or_char()?)
            }
            b's' => {
                let from = cur.class_or_char()?;
                Primitive::Replace(from, cur.lit("replacement character")?)
            }
            other => return Err(Fail::Syntax(format!("unknown command '{}'", other as char))),
        };
        out.push(prim);
    }
    Ok(out)
}

fn reject_flag(cur: &mut Cursor<'_>) -> std::result::Result<RejectFlag, Fail> {
    let kind = cur.lit("reject flag")?;
    Ok(match kind {
        b':' => RejectFlag::Noop,
        b'c' => RejectFlag::CaseSensitive,
        b'8' => RejectFlag::EightBit,
        b's' => RejectFlag::Split,
        b'p' => RejectFlag::WordPairs,
        b'<' => RejectFlag::LengthAtMost(cur.pos()?),
        b'>' => RejectFlag::LengthAtLeast(cur.pos()?),
        other => return Err(Fail::Syntax(format!("unknown reject flag '-{}'", other as char))),
    })
}

#[cfg(test)]
#[path = "parser/tests.rs"]
mod tests;
