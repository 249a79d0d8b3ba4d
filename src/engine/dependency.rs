//! Dependency predicates: what a word must look like for a subrule to emit a
//! candidate.
//!
//! A subrule rejects some words and accepts the rest. The extractor describes
//! the accepted words as a disjoint union of conjunctions; each conjunction is
//! a [`DependencyList`] and the union is a [`SubruleDependency`]. Every
//! predicate is stated over the *input* word, so counting is a histogram
//! lookup over the wordlist and never runs the rule.
//!
//! [`DependencyList::clean_list`] brings a list into a normal form:
//!
//! - at most one `LengthGreater` and one `LengthLess`, with the minimum
//!   lengths implied by positional predicates folded in;
//! - positions counted from the back rewritten from the front when the
//!   length is fixed;
//! - predicates implied by another predicate of the same kind merged away;
//! - trivially true predicates dropped, trivially false ones rejecting the
//!   whole list.
//!
//! The normal form is a fixpoint, so cleaning twice changes nothing.

use crate::engine::charset::Charset;
use std::fmt;

/// Rounds of merging before a list is taken as clean.
const MAX_ROUNDS: usize = 64;

/// A position in the input word: `Front(i)` is index `i`, `Back(k)` is index
/// `len - k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Idx {
    Front(usize),
    Back(usize),
}

impl Idx {
    pub fn resolve(self, len: usize) -> Option<usize> {
        match self {
            Idx::Front(i) => (i <= len).then_some(i),
            Idx::Back(k) => len.checked_sub(k),
        }
    }

    fn needs(self) -> usize {
        match self {
            Idx::Front(i) | Idx::Back(i) => i,
        }
    }

    fn fixed(self, len: usize) -> Idx {
        match self {
            Idx::Back(k) if k <= len => Idx::Front(len - k),
            other => other,
        }
    }
}

impl fmt::Display for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Idx::Front(i) => write!(f, "{}", i),
            Idx::Back(0) => write!(f, "end"),
            Idx::Back(k) => write!(f, "end-{}", k),
        }
    }
}

/// One predicate over the input word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// Fewer than `count` characters in `chars` (`!X` is a count of one).
    ContainsFewerThan { count: usize, chars: Charset },
    ContainsAtLeast { count: usize, chars: Charset },
    /// The character at `pos` is in `chars`; negative positions count from
    /// the end (`-1` is the last character).
    CharAtPositionIn { pos: isize, chars: Charset },
    /// `word[from..to]` holds exactly `count` characters in `chars`.
    RangeContainsExactly { from: Idx, to: Idx, count: usize, chars: Charset },
    RangeContainsAtLeast { from: Idx, to: Idx, count: usize, chars: Charset },
    LengthLess(usize),
    LengthGreater(usize),
}

impl Dependency {
    /// Whether `word` satisfies the predicate.
    pub fn holds(&self, word: &[u8]) -> bool {
        let occurrences = |bytes: &[u8], chars: &Charset| bytes.iter().filter(|b| chars.contains(**b)).count();
        match self {
            Dependency::ContainsFewerThan { count, chars } => occurrences(word, chars) < *count,
            Dependency::ContainsAtLeast { count, chars } => occurrences(word, chars) >= *count,
            Dependency::CharAtPositionIn { pos, chars } => {
                char_at(word, *pos).is_some_and(|b| chars.contains(b))
            }
            Dependency::RangeContainsExactly { from, to, count, chars } => {
                range(word, *from, *to).is_some_and(|r| occurrences(r, chars) == *count)
            }
            Dependency::RangeContainsAtLeast { from, to, count, chars } => {
                range(word, *from, *to).is_some_and(|r| occurrences(r, chars) >= *count)
            }
            Dependency::LengthLess(n) => word.len() < *n,
            Dependency::LengthGreater(n) => word.len() > *n,
        }
    }

    /// Shortest word the predicate can hold on.
    pub fn min_len(&self) -> usize {
        match self {
            Dependency::CharAtPositionIn { pos, .. } if *pos >= 0 => *pos as usize + 1,
            Dependency::CharAtPositionIn { pos, .. } => pos.unsigned_abs(),
            Dependency::RangeContainsExactly { from, to, .. } | Dependency::RangeContainsAtLeast { from, to, .. } => {
                range_min_len(*from, *to)
            }
            Dependency::LengthGreater(n) => n + 1,
            _ => 0,
        }
    }

    /// The outcome when it does not depend on the word beyond its minimum
    /// length.
    fn verdict(&self) -> Option<bool> {
        match self {
            Dependency::ContainsFewerThan { count, chars } => {
                if *count == 0 {
                    Some(false)
                } else if chars.is_empty() {
                    Some(true)
                } else {
                    None
                }
            }
            Dependency::ContainsAtLeast { count, chars } => {
                if *count == 0 {
                    Some(true)
                } else if chars.is_empty() {
                    Some(false)
                } else {
                    None
                }
            }
            Dependency::CharAtPositionIn { chars, .. } => {
                if chars.is_empty() {
                    Some(false)
                } else if *chars == Charset::ALL {
                    Some(true)
                } else {
                    None
                }
            }
            Dependency::RangeContainsExactly { from, to, count, chars } => {
                let width = range_width(*from, *to);
                if chars.is_empty() || width == Some(0) {
                    Some(*count == 0)
                } else if width.is_some_and(|w| *count > w) {
                    Some(false)
                } else {
                    None
                }
            }
            Dependency::RangeContainsAtLeast { from, to, count, chars } => {
                if *count == 0 {
                    Some(true)
                } else if chars.is_empty() || range_width(*from, *to).is_some_and(|w| *count > w) {
                    Some(false)
                } else {
                    None
                }
            }
            Dependency::LengthLess(0) => Some(false),
            Dependency::LengthLess(_) | Dependency::LengthGreater(_) => None,
        }
    }

    /// The same predicate on words of exactly `len` characters, with every
    /// position counted from the front.
    fn with_fixed_len(&self, len: usize) -> Dependency {
        match self {
            Dependency::CharAtPositionIn { pos, chars } if *pos < 0 => {
                Dependency::CharAtPositionIn { pos: len as isize + pos, chars: *chars }
            }
            Dependency::RangeContainsExactly { from, to, count, chars } => Dependency::RangeContainsExactly {
                from: from.fixed(len),
                to: to.fixed(len),
                count: *count,
                chars: *chars,
            },
            Dependency::RangeContainsAtLeast { from, to, count, chars } => Dependency::RangeContainsAtLeast {
                from: from.fixed(len),
                to: to.fixed(len),
                count: *count,
                chars: *chars,
            },
            other => other.clone(),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::ContainsFewerThan { count, chars } => write!(f, "contains < {} of {:?}", count, chars),
            Dependency::ContainsAtLeast { count, chars } => write!(f, "contains >= {} of {:?}", count, chars),
            Dependency::CharAtPositionIn { pos, chars } => write!(f, "word[{}] in {:?}", pos, chars),
            Dependency::RangeContainsExactly { from, to, count, chars } => {
                write!(f, "word[{}..{}] contains == {} of {:?}", from, to, count, chars)
            }
            Dependency::RangeContainsAtLeast { from, to, count, chars } => {
                write!(f, "word[{}..{}] contains >= {} of {:?}", from, to, count, chars)
            }
            Dependency::LengthLess(n) => write!(f, "len < {}", n),
            Dependency::LengthGreater(n) => write!(f, "len > {}", n),
        }
    }
}

fn char_at(word: &[u8], pos: isize) -> Option<u8> {
    let i = if pos >= 0 { pos as usize } else { word.len().checked_sub(pos.unsigned_abs())? };
    word.get(i).copied()
}

fn range(word: &[u8], from: Idx, to: Idx) -> Option<&[u8]> {
    let (lo, hi) = (from.resolve(word.len())?, to.resolve(word.len())?);
    word.get(lo..hi)
}

fn range_min_len(from: Idx, to: Idx) -> usize {
    match (from, to) {
        (Idx::Front(i), Idx::Back(k)) => i + k,
        _ => from.needs().max(to.needs()),
    }
}

fn range_width(from: Idx, to: Idx) -> Option<usize> {
    match (from, to) {
        (Idx::Front(i), Idx::Front(j)) => j.checked_sub(i),
        (Idx::Back(k), Idx::Back(j)) => k.checked_sub(j),
        _ => None,
    }
}

// --- Lists ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Active,
    Satisfied,
    Rejected,
}

/// A conjunction of dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyList {
    deps: Vec<Dependency>,
    status: Status,
    coef: u64,
}

impl DependencyList {
    /// A cleaned list of `deps`.
    pub fn new(deps: Vec<Dependency>) -> Self {
        let mut list = DependencyList { deps, status: Status::Active, coef: 1 };
        list.clean_list();
        list
    }

    pub fn satisfied() -> Self {
        DependencyList { deps: Vec::new(), status: Status::Satisfied, coef: 1 }
    }

    pub fn rejected() -> Self {
        DependencyList { deps: Vec::new(), status: Status::Rejected, coef: 1 }
    }

    pub fn deps(&self) -> &[Dependency] {
        &self.deps
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn coef(&self) -> u64 {
        self.coef
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn is_satisfied(&self) -> bool {
        self.status == Status::Satisfied
    }

    pub fn is_rejected(&self) -> bool {
        self.status == Status::Rejected
    }

    /// Add a predicate; the list is re-cleaned.
    pub fn push(&mut self, dep: Dependency) {
        if self.is_rejected() {
            return;
        }
        self.deps.push(dep);
        self.status = Status::Active;
        self.clean_list();
    }

    pub fn holds(&self, word: &[u8]) -> bool {
        match self.status {
            Status::Satisfied => true,
            Status::Rejected => false,
            Status::Active => self.deps.iter().all(|d| d.holds(word)),
        }
    }

    /// `(greater, less)`: the length window `greater < len < less` of the list.
    pub fn length_bounds(&self) -> (Option<usize>, Option<usize>) {
        let mut bounds = (None, None);
        for dep in &self.deps {
            match dep {
                Dependency::LengthGreater(n) => bounds.0 = Some(*n),
                Dependency::LengthLess(n) => bounds.1 = Some(*n),
                _ => {}
            }
        }
        bounds
    }

    pub fn clean_list(&mut self) {
        if self.is_rejected() {
            self.deps.clear();
            return;
        }
        let mut deps = std::mem::take(&mut self.deps);
        for _ in 0..MAX_ROUNDS {
            match normalize(&deps) {
                None => {
                    self.status = Status::Rejected;
                    return;
                }
                Some(next) if next == deps => break,
                Some(next) => deps = next,
            }
        }
        self.status = if deps.is_empty() { Status::Satisfied } else { Status::Active };
        self.deps = deps;
    }
}

impl fmt::Display for DependencyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Status::Satisfied => write!(f, "satisfied"),
            Status::Rejected => write!(f, "rejected"),
            Status::Active => {
                let parts: Vec<String> = self.deps.iter().map(|d| d.to_string()).collect();
                write!(f, "{}", parts.join(" & "))
            }
        }
    }
}

/// One round of the normal form; `None` when the list cannot hold.
fn normalize(deps: &[Dependency]) -> Option<Vec<Dependency>> {
    let mut greater: Option<usize> = None;
    let mut less: Option<usize> = None;
    let mut others = Vec::new();
    for dep in deps {
        match dep {
            Dependency::LengthGreater(n) => greater = Some(greater.map_or(*n, |g| g.max(*n))),
            Dependency::LengthLess(n) => less = Some(less.map_or(*n, |l| l.min(*n))),
            other => {
                let min = other.min_len();
                if min > 0 {
                    greater = Some(greater.map_or(min - 1, |g| g.max(min - 1)));
                }
                others.push(other.clone());
            }
        }
    }

    if less == Some(0) {
        return None;
    }
    if let (Some(g), Some(l)) = (greater, less) {
        if g + 1 >= l {
            return None;
        }
        if g + 2 == l {
            others = others.iter().map(|d| d.with_fixed_len(g + 1)).collect();
        }
    }

    let mut out: Vec<Dependency> = Vec::new();
    for dep in others {
        match dep.verdict() {
            Some(false) => return None,
            Some(true) => continue,
            None => {}
        }
        let mut placed = false;
        for kept in out.iter_mut() {
            match merge(kept, &dep) {
                Merge::Distinct => continue,
                Merge::Keep => {}
                Merge::Replace(next) => *kept = next,
                Merge::Reject => return None,
            }
            placed = true;
            break;
        }
        if !placed {
            out.push(dep);
        }
    }

    out.extend(greater.map(Dependency::LengthGreater));
    out.extend(less.map(Dependency::LengthLess));
    Some(out)
}

enum Merge {
    Distinct,
    /// The kept predicate implies the new one.
    Keep,
    Replace(Dependency),
    Reject,
}

fn merge(kept: &Dependency, new: &Dependency) -> Merge {
    use Dependency::*;
    if kept == new {
        return Merge::Keep;
    }
    match (kept, new) {
        (ContainsFewerThan { count: n, chars: x }, ContainsFewerThan { count: m, chars: y }) => {
            if n == m && y.is_subset(x) {
                Merge::Keep
            } else if n == m && x.is_subset(y) {
                Merge::Replace(new.clone())
            } else if x == y {
                Merge::Replace(ContainsFewerThan { count: *n.min(m), chars: *x })
            } else {
                Merge::Distinct
            }
        }
        (ContainsAtLeast { count: n, chars: x }, ContainsAtLeast { count: m, chars: y }) => {
            if n == m && x.is_subset(y) {
                Merge::Keep
            } else if n == m && y.is_subset(x) {
                Merge::Replace(new.clone())
            } else if x == y {
                Merge::Replace(ContainsAtLeast { count: *n.max(m), chars: *x })
            } else {
                Merge::Distinct
            }
        }
        (ContainsFewerThan { count: n, chars: x }, ContainsAtLeast { count: m, chars: y })
        | (ContainsAtLeast { count: m, chars: y }, ContainsFewerThan { count: n, chars: x }) => {
            if m >= n && y.is_subset(x) { Merge::Reject } else { Merge::Distinct }
        }
        (CharAtPositionIn { pos: p, chars: x }, CharAtPositionIn { pos: q, chars: y }) if p == q => {
            Merge::Replace(CharAtPositionIn { pos: *p, chars: *x & *y })
        }
        (
            RangeContainsExactly { from: f1, to: t1, count: n, chars: x },
            RangeContainsExactly { from: f2, to: t2, count: m, chars: y },
        ) if f1 == f2 && t1 == t2 && x == y && n != m => Merge::Reject,
        (
            RangeContainsAtLeast { from: f1, to: t1, count: n, chars: x },
            RangeContainsAtLeast { from: f2, to: t2, count: m, chars: y },
        ) if f1 == f2 && t1 == t2 => {
            if n == m && x.is_subset(y) {
                Merge::Keep
            } else if n == m && y.is_subset(x) {
                Merge::Replace(new.clone())
            } else if x == y {
                Merge::Replace(RangeContainsAtLeast { from: *f1, to: *t1, count: *n.max(m), chars: *x })
            } else {
                Merge::Distinct
            }
        }
        _ => Merge::Distinct,
    }
}

// --- Subrules ---------------------------------------------------------------

/// A disjoint union of dependency lists, one subrule's worth, scaled by the
/// number of candidates the subrule emits per accepted word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubruleDependency {
    lists: Vec<DependencyList>,
    status: Status,
    coef: u64,
}

impl SubruleDependency {
    pub fn new(lists: Vec<DependencyList>, coef: u64) -> Self {
        let mut dep = SubruleDependency { lists, status: Status::Active, coef };
        dep.clean_list();
        dep
    }

    /// Every word is accepted.
    pub fn satisfied(coef: u64) -> Self {
        SubruleDependency::new(vec![DependencyList::satisfied()], coef)
    }

    pub fn lists(&self) -> &[DependencyList] {
        &self.lists
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn coef(&self) -> u64 {
        self.coef
    }

    pub fn is_satisfied(&self) -> bool {
        self.status == Status::Satisfied
    }

    pub fn is_rejected(&self) -> bool {
        self.status == Status::Rejected
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Candidates emitted for `word`.
    pub fn count_word(&self, word: &[u8]) -> u64 {
        let accepted = self.lists.iter().filter(|l| l.holds(word)).map(DependencyList::coef).sum::<u64>();
        accepted * self.coef
    }

    /// Clean every list, keep one rejected list as a witness and derive the
    /// status: satisfied when all lists are, rejected when all are. No lists
    /// accept no word.
    pub fn clean_list(&mut self) {
        let mut witness = None;
        let mut kept = Vec::new();
        for mut list in std::mem::take(&mut self.lists) {
            list.clean_list();
            if list.is_rejected() {
                witness.get_or_insert(list);
            } else {
                kept.push(list);
            }
        }
        self.status = if kept.is_empty() {
            Status::Rejected
        } else if witness.is_none() && kept.iter().all(DependencyList::is_satisfied) {
            Status::Satisfied
        } else {
            Status::Active
        };
        kept.extend(witness);
        self.lists = kept;
    }
}

impl fmt::Display for SubruleDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lists: Vec<String> = self.lists.iter().map(|l| format!("({})", l)).collect();
        write!(f, "{} x [{}]", self.coef, lists.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Dependency::*;

    fn set(bytes: &[u8]) -> Charset {
        Charset::from_bytes(bytes)
    }

    #[test]
    fn predicates_hold_on_words() {
        let cases: Vec<(Dependency, &str, bool)> = vec![
            (ContainsFewerThan { count: 1, chars: set(b"a") }, "bcd", true),
            (ContainsFewerThan { count: 1, chars: set(b"a") }, "bad", false),
            (ContainsAtLeast { count: 2, chars: set(b"0123456789") }, "ab12", true),
            (ContainsAtLeast { count: 2, chars: set(b"0123456789") }, "ab1", false),
            (CharAtPositionIn { pos: 0, chars: set(b"A") }, "Abc", true),
            (CharAtPositionIn { pos: -1, chars: set(b"c") }, "Abc", true),
            (CharAtPositionIn { pos: -4, chars: set(b"A") }, "Abc", false),
            (CharAtPositionIn { pos: 3, chars: Charset::ALL }, "Abc", false),
            (RangeContainsExactly { from: Idx::Front(1), to: Idx::Back(1), count: 0, chars: set(b"x") }, "xabx", true),
            (RangeContainsExactly { from: Idx::Front(1), to: Idx::Back(1), count: 0, chars: set(b"x") }, "x", false),
            (RangeContainsAtLeast { from: Idx::Back(2), to: Idx::Back(0), count: 1, chars: set(b"9") }, "ab9c", true),
            (LengthLess(4), "abc", true),
            (LengthGreater(3), "abc", false),
        ];
        for (dep, word, expected) in cases {
            assert_eq!(dep.holds(word.as_bytes()), expected, "{} on {:?}", dep, word);
        }
    }

    #[test]
    fn lists_reach_normal_form() {
        let cases: Vec<(Vec<Dependency>, Status, Vec<Dependency>)> = vec![
            (vec![], Status::Satisfied, vec![]),
            (
                vec![LengthGreater(2), LengthGreater(4), LengthLess(9), LengthLess(7)],
                Status::Active,
                vec![LengthGreater(4), LengthLess(7)],
            ),
            (vec![LengthGreater(4), LengthLess(6)], Status::Active, vec![LengthGreater(4), LengthLess(6)]),
            (vec![LengthGreater(4), LengthLess(5)], Status::Rejected, vec![]),
            (vec![LengthLess(0)], Status::Rejected, vec![]),
            (
                vec![CharAtPositionIn { pos: 3, chars: set(b"a") }],
                Status::Active,
                vec![CharAtPositionIn { pos: 3, chars: set(b"a") }, LengthGreater(3)],
            ),
            (
                vec![LengthGreater(2), LengthLess(4), CharAtPositionIn { pos: -1, chars: set(b"1") }],
                Status::Active,
                vec![CharAtPositionIn { pos: 2, chars: set(b"1") }, LengthGreater(2), LengthLess(4)],
            ),
            (
                vec![CharAtPositionIn { pos: 0, chars: set(b"ab") }, CharAtPositionIn { pos: 0, chars: set(b"bc") }],
                Status::Active,
                vec![CharAtPositionIn { pos: 0, chars: set(b"b") }, LengthGreater(0)],
            ),
            (
                vec![CharAtPositionIn { pos: 0, chars: set(b"a") }, CharAtPositionIn { pos: 0, chars: set(b"b") }],
                Status::Rejected,
                vec![],
            ),
            (
                vec![
                    ContainsFewerThan { count: 1, chars: set(b"ab") },
                    ContainsFewerThan { count: 1, chars: set(b"a") },
                ],
                Status::Active,
                vec![ContainsFewerThan { count: 1, chars: set(b"ab") }],
            ),
            (
                vec![
                    ContainsAtLeast { count: 1, chars: set(b"ab") },
                    ContainsAtLeast { count: 1, chars: set(b"a") },
                ],
                Status::Active,
                vec![ContainsAtLeast { count: 1, chars: set(b"a") }],
            ),
            (
                vec![ContainsAtLeast { count: 1, chars: set(b"a") }, ContainsAtLeast { count: 3, chars: set(b"a") }],
                Status::Active,
                vec![ContainsAtLeast { count: 3, chars: set(b"a") }],
            ),
            (
                vec![ContainsAtLeast { count: 2, chars: set(b"a") }, ContainsFewerThan { count: 2, chars: set(b"ab") }],
                Status::Rejected,
                vec![],
            ),
            (vec![ContainsAtLeast { count: 0, chars: set(b"a") }], Status::Satisfied, vec![]),
            (vec![ContainsFewerThan { count: 1, chars: Charset::EMPTY }], Status::Satisfied, vec![]),
            (
                vec![RangeContainsExactly { from: Idx::Front(0), to: Idx::Front(2), count: 3, chars: set(b"a") }],
                Status::Rejected,
                vec![],
            ),
            (
                vec![
                    RangeContainsExactly { from: Idx::Front(0), to: Idx::Back(0), count: 1, chars: set(b"a") },
                    RangeContainsExactly { from: Idx::Front(0), to: Idx::Back(0), count: 2, chars: set(b"a") },
                ],
                Status::Rejected,
                vec![],
            ),
            (
                vec![RangeContainsExactly { from: Idx::Front(1), to: Idx::Back(1), count: 0, chars: Charset::EMPTY }],
                Status::Active,
                vec![LengthGreater(1)],
            ),
        ];
        for (deps, status, expected) in cases {
            let list = DependencyList::new(deps.clone());
            assert_eq!(list.status(), status, "{:?}", deps);
            assert_eq!(list.deps(), expected.as_slice(), "{:?}", deps);
        }
    }

    #[test]
    fn clean_list_is_idempotent() {
        let lists: Vec<Vec<Dependency>> = vec![
            vec![
                CharAtPositionIn { pos: -2, chars: set(b"ab") },
                LengthLess(8),
                LengthGreater(6),
                RangeContainsAtLeast { from: Idx::Back(3), to: Idx::Back(0), count: 1, chars: set(b"1") },
            ],
            vec![
                ContainsFewerThan { count: 2, chars: set(b"xyz") },
                ContainsFewerThan { count: 4, chars: set(b"xyz") },
                ContainsAtLeast { count: 1, chars: set(b"x") },
            ],
            vec![LengthGreater(3), LengthLess(4)],
        ];
        for deps in lists {
            let once = DependencyList::new(deps);
            let mut twice = once.clone();
            twice.clean_list();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn subrule_status_follows_lists() {
        let active = DependencyList::new(vec![LengthLess(5)]);
        let cases: Vec<(Vec<DependencyList>, Status, usize)> = vec![
            (vec![DependencyList::satisfied()], Status::Satisfied, 1),
            (vec![DependencyList::rejected(), DependencyList::rejected()], Status::Rejected, 1),
            (vec![active.clone(), DependencyList::rejected(), DependencyList::rejected()], Status::Active, 2),
            (vec![DependencyList::satisfied(), DependencyList::rejected()], Status::Active, 2),
            (vec![], Status::Rejected, 0),
        ];
        for (lists, status, len) in cases {
            let mut dep = SubruleDependency::new(lists, 1);
            assert_eq!(dep.status(), status);
            assert_eq!(dep.lists().len(), len);
            dep.clean_list();
            assert_eq!(dep.status(), status);
            assert_eq!(dep.lists().len(), len);
        }
    }

    #[test]
    fn subrule_counts_accepted_words() {
        let dep = SubruleDependency::new(
            vec![
                DependencyList::new(vec![LengthLess(4)]),
                DependencyList::new(vec![LengthGreater(3), ContainsAtLeast { count: 1, chars: set(b"1") }]),
            ],
            10,
        );
        assert_eq!(dep.count_word(b"abc"), 10);
        assert_eq!(dep.count_word(b"abcd"), 0);
        assert_eq!(dep.count_word(b"abc1"), 10);

        let empty = SubruleDependency::new(Vec::new(), 10);
        assert_eq!(empty.status(), Status::Rejected);
        assert_eq!(empty.count_word(b"abc"), 0);
    }
}
