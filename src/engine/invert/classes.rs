//! Inverses of the rejection and character-class primitives.
//!
//! Rejections never change a word, so their preimage is the subset of words
//! that pass. `/X` and `%NX` split that subset into disjoint token strings by
//! the position of the first (or N-th) hit.

use super::{Inverter, Step, keep};
use crate::engine::charset::Charset;
use crate::engine::token::TokenString;
use crate::{LenCmp, Pos};
use itertools::Itertools;

/// More first-N-hit layouts than this are not split.
const SPLIT_CAP: usize = 1 << 16;

/// `<N >N _N`
pub(super) fn length(mut ts: TokenString, cmp: LenCmp, p: Pos) -> Vec<TokenString> {
    let Pos::Num(n) = p else {
        return if cmp.holds_infinite() { vec![ts] } else { Vec::new() };
    };
    let (lo, hi) = cmp.interval(n);
    ts.set_min_len(lo);
    if hi != usize::MAX {
        ts.set_max_len(hi);
    }
    keep(ts)
}

/// `!X`
pub(super) fn exclude(mut ts: TokenString, x: Charset) -> Vec<TokenString> {
    for token in ts.tokens_mut() {
        let rest = token.chars() - x;
        token.set_chars(rest);
    }
    keep(ts)
}

/// `/X`: split by the position of the first character in `X`.
pub(super) fn contains(ts: TokenString, x: Charset) -> Vec<TokenString> {
    let sets = ts.sets();
    let mut out = Vec::new();
    for (j, set) in sets.iter().enumerate() {
        let hit = *set & x;
        if !hit.is_empty() {
            let mut split: Vec<Charset> = sets[..j].iter().map(|s| *s - x).collect();
            split.push(hit);
            split.extend_from_slice(&sets[j + 1..]);
            out.push(TokenString::from_sets(split));
        }
        if (*set - x).is_empty() {
            break;
        }
    }
    out
}

/// `=NX`
pub(super) fn at_position(inv: &Inverter, ts: TokenString, i: usize, x: Charset) -> Vec<TokenString> {
    let (_, fixed) = inv.front(&ts, i.saturating_add(1));
    fixed
        .into_iter()
        .flat_map(|mut ts| {
            let hit = ts.set(i) & x;
            ts.set_at(i, hit);
            keep(ts)
        })
        .collect()
}

/// `(X`
pub(super) fn first(inv: &Inverter, ts: TokenString, x: Charset) -> Vec<TokenString> {
    at_position(inv, ts, 0, x)
}

/// `)X`
pub(super) fn last(inv: &Inverter, ts: TokenString, x: Charset) -> Vec<TokenString> {
    let (_, fixed) = inv.back(&ts, 1);
    fixed
        .into_iter()
        .flat_map(|mut ts| {
            let last = ts.len() - 1;
            let hit = ts.set(last) & x;
            ts.set_at(last, hit);
            keep(ts)
        })
        .collect()
}

/// `%NX`: split by the positions of the first `k` characters in `X`.
pub(super) fn count(ts: TokenString, k: usize, x: Charset) -> Step {
    if k == 0 {
        return vec![ts].into();
    }
    let sets = ts.sets();
    let eligible: Vec<usize> = sets.iter().positions(|s| !(*s & x).is_empty()).collect();
    if k > eligible.len() {
        return Vec::new().into();
    }
    if binomial(eligible.len(), k) > SPLIT_CAP {
        return Step::OutOfScope;
    }

    let mut out = Vec::new();
    for hits in eligible.iter().copied().combinations(k) {
        let last = hits[k - 1];
        let mut split = sets.clone();
        let mut ok = true;
        for (i, set) in split.iter_mut().enumerate().take(last + 1) {
            *set = if hits.contains(&i) { *set & x } else { *set - x };
            ok &= !set.is_empty();
        }
        if ok {
            out.push(TokenString::from_sets(split));
        }
    }
    out.into()
}

/// `@X`: purged characters could have been anywhere, so only a contradiction
/// is decided here.
pub(super) fn purge(inv: &Inverter, ts: TokenString, x: Charset) -> Step {
    let x = x & inv.sigma;
    if x.is_empty() {
        return vec![ts].into();
    }
    if ts.tokens().iter().any(|t| t.min() > 0 && (t.chars() - x).is_empty()) {
        return Vec::new().into();
    }
    Step::OutOfScope
}

fn binomial(n: usize, k: usize) -> usize {
    let k = k.min(n - k);
    let mut acc: usize = 1;
    for i in 0..k {
        acc = acc.saturating_mul(n - i) / (i + 1);
        if acc > SPLIT_CAP {
            return acc;
        }
    }
    acc
}
