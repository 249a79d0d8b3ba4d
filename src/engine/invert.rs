//! Rule inversion.
//!
//! Given a password and a rule, find every word `w` with `rule(w) = password`
//! without running the rule forward. The password becomes a one-word
//! [`TokenString`]; each primitive of a subrule is inverted from right to left,
//! mapping every token string to the token strings of its preimages. Subrules
//! are inverted independently and their preimages are unioned.
//!
//! ```text
//! "Pass1"  ──$1⁻¹──> "Pass"  ──c⁻¹──> "{pP}{aA}{sS}{sS}"
//! ```
//!
//! Not every primitive has a finite, cheap preimage. Those return
//! [`Inversion::OutOfScope`] and the scan falls back to the rule's enumeration
//! file. Memory primitives and runtime positions are always out of scope.
//!
//! Submodules:
//!
//! - `chars.rs`: primitives that keep the length (case maps, toggles, swaps,
//!   rotations, `s`, `e`).
//! - `length.rs`: primitives that add or remove characters.
//! - `classes.rs`: rejections and character-class primitives.

#[path = "invert/chars.rs"]
mod chars;
#[path = "invert/classes.rs"]
mod classes;
#[path = "invert/length.rs"]
mod length;

use crate::config::Config;
use crate::engine::charset::{self, Charset};
use crate::engine::english::Morph;
use crate::engine::token::TokenString;
use crate::error::{Error, Result};
use crate::{Feasibility, Pos, Primitive, Rule, Subrule};
use itertools::Itertools;

/// Outcome of inverting a rule (or a subrule) on a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inversion {
    /// Every preimage is in `strings`; an empty list means the rule cannot
    /// produce the password. `memorized` holds the token strings reached at a
    /// skipped `Q`; matches must then be checked by mangling forward.
    Normal { strings: Vec<TokenString>, memorized: Option<Vec<TokenString>> },
    /// Some primitive has no symbolic inverse here.
    OutOfScope,
    Error(String),
}

impl Inversion {
    pub fn rejected() -> Self {
        Inversion::Normal { strings: Vec::new(), memorized: None }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, Inversion::Normal { .. })
    }

    pub fn is_out_of_scope(&self) -> bool {
        matches!(self, Inversion::OutOfScope)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Inversion::Error(_))
    }

    /// A normal result without preimages.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Inversion::Normal { strings, .. } if strings.is_empty())
    }

    pub fn strings(&self) -> &[TokenString] {
        match self {
            Inversion::Normal { strings, .. } => strings,
            _ => &[],
        }
    }

    pub fn has_memory(&self) -> bool {
        matches!(self, Inversion::Normal { memorized: Some(_), .. })
    }

    /// Number of preimage words, `None` when some token string repeats.
    pub fn number_of_strings(&self) -> Option<u128> {
        self.strings().iter().try_fold(0u128, |acc, ts| ts.number_of_strings().map(|n| acc.saturating_add(n)))
    }

    /// Every preimage word, deduplicated and sorted; `None` for repetition
    /// tokens.
    pub fn to_strings(&self) -> Option<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        for ts in self.strings() {
            out.extend(ts.to_strings()?);
        }
        out.sort();
        out.dedup();
        Some(out)
    }

    pub fn contains(&self, word: &[u8]) -> bool {
        self.strings().iter().any(|ts| ts.contains(word))
    }

    fn rank(&self) -> u8 {
        match self {
            Inversion::Normal { .. } => 0,
            Inversion::OutOfScope => 1,
            Inversion::Error(_) => 2,
        }
    }
}

/// Result of inverting one primitive on one token string.
#[derive(Debug)]
pub(crate) enum Step {
    Strings(Vec<TokenString>),
    OutOfScope,
}

impl From<Vec<TokenString>> for Step {
    fn from(strings: Vec<TokenString>) -> Self {
        Step::Strings(strings)
    }
}

/// Inverts primitives, subrules and rules under one configuration.
#[derive(Debug, Clone)]
pub struct Inverter<'c> {
    config: &'c Config,
    sigma: Charset,
    enable_regex: bool,
}

impl<'c> Inverter<'c> {
    pub fn new(config: &'c Config) -> Self {
        Inverter { config, sigma: config.sigma(), enable_regex: config.enable_regex }
    }

    fn max_len(&self) -> usize {
        self.config.max_password_length
    }

    /// Invert `rule` on `password`.
    pub fn invert_rule(&self, password: &[u8], rule: &Rule) -> Inversion {
        let skip_q = matches!(rule.feasibility, Feasibility::SpecialMemory(_));
        let start = TokenString::from_word(password);
        let mut strings: Vec<TokenString> = Vec::new();
        let mut memorized: Option<Vec<TokenString>> = None;
        let mut worst = Inversion::rejected();

        for subrule in &rule.subrules {
            match self.invert_subrule(start.clone(), subrule, skip_q) {
                Inversion::Normal { strings: found, memorized: mem } => {
                    strings.extend(found);
                    if let Some(mem) = mem {
                        memorized.get_or_insert_with(Vec::new).extend(mem);
                    }
                }
                other => {
                    if other.rank() > worst.rank() {
                        worst = other;
                    }
                }
            }
        }
        if !worst.is_normal() {
            debug_trace!(self.config, "[invert] rule={:?} status={:?}", rule.raw, worst);
            return worst;
        }
        let strings: Vec<TokenString> = strings.into_iter().unique().collect();
        debug_trace!(self.config, "[invert] rule={:?} preimages={}", rule.raw, strings.len());
        Inversion::Normal { strings, memorized }
    }

    /// Invert one subrule, right to left. With `skip_q` the first `Q` reached
    /// is skipped and the token strings at that point are memorized.
    pub fn invert_subrule(&self, start: TokenString, subrule: &Subrule, skip_q: bool) -> Inversion {
        let mut current = vec![start];
        let mut memorized: Option<Vec<TokenString>> = None;
        let mut skipped = false;

        for prim in subrule.primitives.iter().rev() {
            if skip_q && !skipped && *prim == Primitive::RejectUnchanged {
                memorized = Some(current.clone());
                skipped = true;
                continue;
            }
            let mut next = Vec::new();
            for ts in current {
                match self.invert_primitive(prim, ts) {
                    Ok(Step::Strings(found)) => next.extend(found),
                    Ok(Step::OutOfScope) => return Inversion::OutOfScope,
                    Err(err) => return Inversion::Error(err.to_string()),
                }
            }
            current = next.into_iter().unique().collect();
            if current.is_empty() {
                break;
            }
        }
        if skip_q && !skipped {
            return Inversion::Error("special-memory subrule has no `Q`".to_string());
        }
        Inversion::Normal { strings: current, memorized }
    }

    /// Preimages of `ts` under one primitive.
    pub(crate) fn invert_primitive(&self, prim: &Primitive, ts: TokenString) -> Result<Step> {
        use Primitive::*;

        if prim.uses_memory() || prim.has_runtime_position() {
            return Ok(Step::OutOfScope);
        }
        if ts.is_regex() && !accepts_regex(prim) {
            return Ok(Step::OutOfScope);
        }
        if !ts.is_valid() {
            return Ok(Step::Strings(Vec::new()));
        }

        let step: Step = match prim {
            Noop => vec![ts].into(),
            Lower => chars::map_all(self, ts, &charset::LOWER).into(),
            Upper => chars::map_all(self, ts, &charset::UPPER).into(),
            ToggleAll => chars::map_all(self, ts, &charset::TOGGLE).into(),
            ShiftCase => chars::map_all(self, ts, &charset::SHIFT).into(),
            VowelsLower => chars::map_all(self, ts, &charset::VOWELS).into(),
            KeyRight => chars::map_all(self, ts, &charset::KEY_RIGHT).into(),
            KeyLeft => chars::map_all(self, ts, &charset::KEY_LEFT).into(),
            Replace(from, to) => chars::map_all(self, ts, &charset::CharMap::replace(*from, *to)).into(),
            Capitalize => chars::capitalize(self, ts, &charset::UPPER, &charset::LOWER).into(),
            InvCapitalize => chars::capitalize(self, ts, &charset::LOWER, &charset::UPPER).into(),
            ToggleAt(p) => chars::map_at(self, ts, at(p), &charset::TOGGLE).into(),
            BitLeft(p) => chars::map_at(self, ts, at(p), &charset::BIT_LEFT).into(),
            BitRight(p) => chars::map_at(self, ts, at(p), &charset::BIT_RIGHT).into(),
            Increment(p) => chars::map_at(self, ts, at(p), &charset::INCREMENT).into(),
            Decrement(p) => chars::map_at(self, ts, at(p), &charset::DECREMENT).into(),
            Reverse => vec![ts.reversed()].into(),
            RotateLeft => chars::rotate_left(self, ts).into(),
            RotateRight => chars::rotate_right(self, ts).into(),
            SwapFront => chars::swap_front(self, ts).into(),
            SwapBack => chars::swap_back(self, ts).into(),
            Swap(p, q) => chars::swap(ts, at(p), at(q)).into(),
            ReplaceNext(p) => chars::replace_next(self, ts, at(p)).into(),
            ReplacePrev(p) => chars::replace_prev(self, ts, at(p)).into(),
            Overwrite(p, x) => chars::overwrite(self, ts, at(p), *x).into(),
            TitleSpace => chars::title(self, ts, Charset::single(b' ')).into(),
            TitleSep(seps) => chars::title(self, ts, *seps).into(),

            Duplicate => length::duplicate(self, ts).into(),
            Reflect => length::reflect(self, ts).into(),
            DupEach => length::dup_each(self, ts).into(),
            DupWord(p) => length::dup_word(self, ts, at(p)).into(),
            DupFirst(p) => length::dup_first(self, ts, at(p)).into(),
            DupLast(p) => length::dup_last(self, ts, at(p)).into(),
            DupBlockFront(p) => length::dup_block_front(self, ts, at(p)).into(),
            DupBlockBack(p) => length::dup_block_back(self, ts, at(p)).into(),
            DeleteFirst => length::delete_at(self, ts, 0).into(),
            DeleteLast => length::delete_last(self, ts).into(),
            DeleteAt(p) => length::delete_at(self, ts, at(p)).into(),
            Append(x) => length::append(self, ts, *x).into(),
            Prepend(x) => length::prepend(self, ts, *x).into(),
            Insert(p, x) => length::insert(self, ts, at(p), *x).into(),
            InsertString(p, chars) => length::insert_string(self, ts, at(p), chars).into(),
            Truncate(p) => length::truncate(self, ts, at(p)),
            Extract(p, q) => length::extract(self, ts, at(p), at(q)),
            DeleteRange(p, q) => length::delete_range(self, ts, at(p), at(q)),
            Pluralize => length::english(self, ts, Morph::Plural),
            PastTense => length::english(self, ts, Morph::Past),
            Gerund => length::english(self, ts, Morph::Gerund),

            RejectLen(cmp, p) => classes::length(ts, *cmp, *p).into(),
            RejectIfContains(x) => classes::exclude(ts, *x).into(),
            RejectUnlessContains(x) => classes::contains(ts, *x).into(),
            RejectUnlessAt(p, x) => classes::at_position(self, ts, at(p), *x).into(),
            RejectUnlessFirst(x) => classes::first(self, ts, *x).into(),
            RejectUnlessLast(x) => classes::last(self, ts, *x).into(),
            RejectUnlessCount(p, x) => classes::count(ts, at(p), *x),
            Purge(x) => classes::purge(self, ts, *x),
            Flag(flag) => Step::Strings(if flag.rejects() { Vec::new() } else { vec![ts] }),
            Mode(_) => Vec::new().into(),

            Memorize | RejectUnchanged | AppendMemory | PrependMemory | ExtractMemory(..) | SetVar(..) => {
                return Err(Error::Inversion(format!("memory primitive '{}' reached the inverter", prim.opcode())));
            }
        };
        Ok(step)
    }

    /// Words of `ts` shorter than `k`, and the words with at least `k`
    /// characters rewritten so their first `k` positions are plain tokens.
    fn front(&self, ts: &TokenString, k: usize) -> (Option<TokenString>, Vec<TokenString>) {
        if k > self.max_len() {
            return (Some(ts.clone()), Vec::new());
        }
        if !ts.is_regex() {
            return if ts.len() < k { (Some(ts.clone()), Vec::new()) } else { (None, vec![ts.clone()]) };
        }
        let shorter = Some(ts.shorter_than(k)).filter(TokenString::is_valid);
        (shorter, ts.fix_first_n(k))
    }

    /// Like [`Inverter::front`] for the last `k` positions.
    fn back(&self, ts: &TokenString, k: usize) -> (Option<TokenString>, Vec<TokenString>) {
        if k > self.max_len() {
            return (Some(ts.clone()), Vec::new());
        }
        if !ts.is_regex() {
            return if ts.len() < k { (Some(ts.clone()), Vec::new()) } else { (None, vec![ts.clone()]) };
        }
        let shorter = Some(ts.shorter_than(k)).filter(TokenString::is_valid);
        (shorter, ts.fix_last_n(k))
    }
}

/// Invert `rule` on `password` under `config`.
pub fn invert_rule(password: &[u8], rule: &Rule, config: &Config) -> Inversion {
    Inverter::new(config).invert_rule(password, rule)
}

/// Primitives whose inverse handles repetition tokens.
fn accepts_regex(prim: &Primitive) -> bool {
    use Primitive::*;
    matches!(
        prim,
        Noop | Lower
            | Upper
            | ToggleAll
            | ShiftCase
            | VowelsLower
            | KeyRight
            | KeyLeft
            | Replace(..)
            | Capitalize
            | InvCapitalize
            | ToggleAt(_)
            | BitLeft(_)
            | BitRight(_)
            | Increment(_)
            | Decrement(_)
            | Reverse
            | RotateLeft
            | RotateRight
            | SwapFront
            | SwapBack
            | DeleteFirst
            | DeleteLast
            | DeleteAt(_)
            | Append(_)
            | Prepend(_)
            | RejectLen(..)
            | RejectIfContains(_)
            | RejectUnlessAt(..)
            | RejectUnlessFirst(_)
            | RejectUnlessLast(_)
            | Flag(_)
            | Mode(_)
    )
}

/// A numeric position; `z`/`l` lie beyond every word.
fn at(pos: &Pos) -> usize {
    match pos {
        Pos::Num(n) => *n,
        Pos::Infinite | Pos::Runtime(_) => usize::MAX,
    }
}

/// Keep `ts` only if it still describes a word.
fn keep(ts: TokenString) -> Vec<TokenString> {
    if ts.is_valid() { vec![ts] } else { Vec::new() }
}

#[cfg(test)]
#[path = "invert/tests.rs"]
mod tests;
