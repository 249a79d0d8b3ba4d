//! Inverses of the primitives that add or remove characters.
//!
//! Most growing primitives leave a word unchanged when the result would pass
//! `max_password_length`, so their preimage is the rewritten branch plus an
//! identity branch for words too long to grow.

use super::{Inverter, Step, keep};
use crate::engine::charset::Charset;
use crate::engine::english::Morph;
use crate::engine::token::{Token, TokenString};

/// Identity preimages larger than this are not enumerated.
const ENUMERATION_CAP: u128 = 4096;

/// Pointwise intersection of equally long runs of position sets.
fn meet_runs(runs: &[&[Charset]]) -> Option<Vec<Charset>> {
    let (first, rest) = runs.split_first()?;
    let mut out = first.to_vec();
    for run in rest {
        for (acc, set) in out.iter_mut().zip(run.iter()) {
            *acc = *acc & *set;
        }
    }
    if out.iter().any(Charset::is_empty) { None } else { Some(out) }
}

/// `d`
pub(super) fn duplicate(inv: &Inverter, ts: TokenString) -> Vec<TokenString> {
    let l = ts.len();
    let sets = ts.sets();
    let mut out = Vec::new();
    if l > 0 && l % 2 == 0 {
        let (a, b) = sets.split_at(l / 2);
        out.extend(meet_runs(&[a, b]).map(TokenString::from_sets));
    }
    if l == 0 || 2 * l > inv.max_len() {
        out.push(ts);
    }
    out
}

/// `f`
pub(super) fn reflect(inv: &Inverter, ts: TokenString) -> Vec<TokenString> {
    let l = ts.len();
    let sets = ts.sets();
    let mut out = Vec::new();
    if l > 0 && l % 2 == 0 {
        let (a, b) = sets.split_at(l / 2);
        let b: Vec<Charset> = b.iter().rev().copied().collect();
        out.extend(meet_runs(&[a, &b]).map(TokenString::from_sets));
    }
    if l == 0 || 2 * l > inv.max_len() {
        out.push(ts);
    }
    out
}

/// `q`
pub(super) fn dup_each(inv: &Inverter, ts: TokenString) -> Vec<TokenString> {
    let l = ts.len();
    let sets = ts.sets();
    let mut out = Vec::new();
    if l > 0 && l % 2 == 0 {
        let pairs: Option<Vec<Charset>> = sets
            .chunks(2)
            .map(|pair| Some(pair[0] & pair[1]).filter(|s| !s.is_empty()))
            .collect();
        out.extend(pairs.map(TokenString::from_sets));
    }
    if l == 0 || 2 * l > inv.max_len() {
        out.push(ts);
    }
    out
}

/// `pN`: the word followed by `k` more copies.
pub(super) fn dup_word(inv: &Inverter, ts: TokenString, k: usize) -> Vec<TokenString> {
    let l = ts.len();
    if k == 0 || l == 0 {
        return vec![ts];
    }
    let parts = k.saturating_add(1);
    let sets = ts.sets();
    let mut out = Vec::new();
    if l % parts == 0 {
        let runs: Vec<&[Charset]> = sets.chunks(l / parts).collect();
        out.extend(meet_runs(&runs).map(TokenString::from_sets));
    }
    if parts.saturating_mul(l) > inv.max_len() {
        out.push(ts);
    }
    out
}

/// `zN`
pub(super) fn dup_first(inv: &Inverter, ts: TokenString, k: usize) -> Vec<TokenString> {
    let l = ts.len();
    if k == 0 || l == 0 {
        return vec![ts];
    }
    let sets = ts.sets();
    let mut out = Vec::new();
    if l > k {
        let runs: Vec<&[Charset]> = sets[..=k].chunks(1).collect();
        if let Some(first) = meet_runs(&runs) {
            out.push(TokenString::from_sets(first.into_iter().chain(sets[k + 1..].iter().copied())));
        }
    }
    if l.saturating_add(k) > inv.max_len() {
        out.push(ts);
    }
    out
}

/// `ZN`
pub(super) fn dup_last(inv: &Inverter, ts: TokenString, k: usize) -> Vec<TokenString> {
    let l = ts.len();
    if k == 0 || l == 0 {
        return vec![ts];
    }
    let sets = ts.sets();
    let mut out = Vec::new();
    if l > k {
        let runs: Vec<&[Charset]> = sets[l - 1 - k..].chunks(1).collect();
        if let Some(last) = meet_runs(&runs) {
            out.push(TokenString::from_sets(sets[..l - 1 - k].iter().copied().chain(last)));
        }
    }
    if l.saturating_add(k) > inv.max_len() {
        out.push(ts);
    }
    out
}

/// `yN`
pub(super) fn dup_block_front(inv: &Inverter, ts: TokenString, k: usize) -> Vec<TokenString> {
    let l = ts.len();
    if k == 0 {
        return vec![ts];
    }
    let sets = ts.sets();
    let mut out = Vec::new();
    if l >= k.saturating_mul(2) {
        if let Some(block) = meet_runs(&[&sets[..k], &sets[k..2 * k]]) {
            out.push(TokenString::from_sets(block.into_iter().chain(sets[2 * k..].iter().copied())));
        }
    }
    if k > l || l.saturating_add(k) > inv.max_len() {
        out.push(ts);
    }
    out
}

/// `YN`
pub(super) fn dup_block_back(inv: &Inverter, ts: TokenString, k: usize) -> Vec<TokenString> {
    let l = ts.len();
    if k == 0 {
        return vec![ts];
    }
    let sets = ts.sets();
    let mut out = Vec::new();
    if l >= k.saturating_mul(2) {
        if let Some(block) = meet_runs(&[&sets[l - 2 * k..l - k], &sets[l - k..]]) {
            out.push(TokenString::from_sets(sets[..l - 2 * k].iter().copied().chain(block)));
        }
    }
    if k > l || l.saturating_add(k) > inv.max_len() {
        out.push(ts);
    }
    out
}

/// `DN` and `[`: a character at `i` was removed from words longer than `i`.
pub(super) fn delete_at(inv: &Inverter, ts: TokenString, i: usize) -> Vec<TokenString> {
    if i >= inv.max_len() {
        return vec![ts];
    }
    let mut out = Vec::new();
    if ts.is_regex() {
        out.extend(keep(ts.shorter_than(i + 1)));
    } else if ts.len() <= i {
        out.push(ts.clone());
    }
    let (_, fixed) = inv.front(&ts, i);
    for mut ts in fixed {
        ts.insert(i, Token::new(inv.sigma));
        ts.grow_window(1);
        ts.set_max_len(inv.max_len() + 1);
        out.extend(keep(ts));
    }
    out
}

/// `]`
pub(super) fn delete_last(inv: &Inverter, ts: TokenString) -> Vec<TokenString> {
    let mut out = Vec::new();
    if ts.contains(b"") {
        out.push(TokenString::empty_word());
    }
    let mut longer = ts;
    longer.push(Token::new(inv.sigma));
    longer.grow_window(1);
    longer.set_max_len(inv.max_len() + 1);
    out.extend(keep(longer));
    out
}

/// Words already at the length limit, which growing primitives leave alone.
fn at_limit(inv: &Inverter, ts: &TokenString) -> Vec<TokenString> {
    let mut full = ts.clone();
    full.set_min_len(inv.max_len());
    keep(full)
}

/// `$X`
pub(super) fn append(inv: &Inverter, ts: TokenString, x: Charset) -> Vec<TokenString> {
    let mut out = at_limit(inv, &ts);
    let (_, fixed) = inv.back(&ts, 1);
    for mut ts in fixed {
        let last = ts.len() - 1;
        if (ts.set(last) & x).is_empty() {
            continue;
        }
        ts.remove(last);
        ts.shrink_window(1);
        out.extend(keep(ts));
    }
    out
}

/// `^X`
pub(super) fn prepend(inv: &Inverter, ts: TokenString, x: Charset) -> Vec<TokenString> {
    let mut out = at_limit(inv, &ts);
    let (_, fixed) = inv.front(&ts, 1);
    for mut ts in fixed {
        if (ts.set(0) & x).is_empty() {
            continue;
        }
        ts.remove(0);
        ts.shrink_window(1);
        out.extend(keep(ts));
    }
    out
}

/// `iNX`. JtR inserts at `min(N, n)`; hashcat only when `N <= n`.
pub(super) fn insert(inv: &Inverter, ts: TokenString, i: usize, x: Charset) -> Vec<TokenString> {
    let l = ts.len();
    let mut out = Vec::new();
    let at = if l == 0 {
        None
    } else if inv.config.is_jtr() {
        Some(i.min(l - 1))
    } else {
        (i < l).then_some(i)
    };
    if let Some(at) = at {
        if !(ts.set(at) & x).is_empty() {
            let mut shorter = ts.clone();
            shorter.remove(at);
            out.push(shorter);
        }
    }
    let too_far = !inv.config.is_jtr() && i > l;
    if too_far || l >= inv.max_len() {
        out.push(ts);
    }
    out
}

/// `AN"str"`: the string was inserted at `min(N, n)`.
pub(super) fn insert_string(inv: &Inverter, ts: TokenString, i: usize, chars: &[Charset]) -> Vec<TokenString> {
    let l = ts.len();
    let k = chars.len();
    if k == 0 {
        return vec![ts];
    }
    let mut out = Vec::new();
    if l >= k {
        let at = i.min(l - k);
        let fits = chars.iter().enumerate().all(|(j, c)| !(ts.set(at + j) & *c).is_empty());
        if fits {
            let sets = ts.sets();
            out.push(TokenString::from_sets(sets[..at].iter().chain(&sets[at + k..]).copied()));
        }
    }
    if l.saturating_add(k) > inv.max_len() {
        out.push(ts);
    }
    out
}

/// `'N`
pub(super) fn truncate(inv: &Inverter, ts: TokenString, i: usize) -> Step {
    let l = ts.len();
    if i >= inv.max_len() || l < i {
        return vec![ts].into();
    }
    if l > i {
        return Vec::new().into();
    }
    if !inv.enable_regex {
        return Step::OutOfScope;
    }
    let mut longer = ts;
    longer.push(Token::repeated(inv.sigma, 0, Some(inv.max_len() - i)));
    vec![longer].into()
}

/// `xNM` (hashcat): extraction only happens when `N + M <= n`.
pub(super) fn extract(inv: &Inverter, ts: TokenString, i: usize, m: usize) -> Step {
    if inv.config.is_jtr() {
        return Step::OutOfScope;
    }
    let l = ts.len();
    if l == m && m < inv.max_len() {
        return Step::OutOfScope;
    }
    if l == m || i.saturating_add(m) > l {
        return vec![ts].into();
    }
    Vec::new().into()
}

/// `ONM`: `M` characters at `N` were removed from words with `N + M <= n`.
pub(super) fn delete_range(inv: &Inverter, ts: TokenString, i: usize, m: usize) -> Step {
    if m > inv.config.m_threshold {
        return Step::OutOfScope;
    }
    let l = ts.len();
    if m == 0 {
        return vec![ts].into();
    }
    let mut out = Vec::new();
    if i <= l && l + m <= inv.max_len() {
        let sets = ts.sets();
        let gap = std::iter::repeat_n(inv.sigma, m);
        out.push(TokenString::from_sets(sets[..i].iter().copied().chain(gap).chain(sets[i..].iter().copied())));
    }
    if i.saturating_add(m) > l {
        out.push(ts);
    }
    out.into()
}

/// `p`, `P` and `I`. Words whose rewrite would pass the length limit are
/// left alone, so near the limit the identity branch is checked word by word.
pub(super) fn english(inv: &Inverter, ts: TokenString, morph: Morph) -> Step {
    let sets = ts.sets();
    let mut out: Vec<TokenString> =
        morph.invert(&sets, inv.sigma).into_iter().map(TokenString::from_sets).flat_map(keep).collect();

    // A rewrite adds at most four characters ("bag" -> "bagging").
    if ts.len() + 4 > inv.max_len() {
        if ts.number_of_strings().is_none_or(|n| n > ENUMERATION_CAP) {
            return Step::OutOfScope;
        }
        let words = ts.to_strings().unwrap_or_default();
        out.extend(
            words
                .into_iter()
                .filter(|w| morph.apply(w).len() > inv.max_len())
                .map(|w| TokenString::from_word(&w)),
        );
    }
    out.into()
}
