//! Inverses of the primitives that keep the word length.

use super::{Inverter, keep};
use crate::engine::charset::{self, CharMap, Charset};
use crate::engine::token::TokenString;

/// Preimage of a map applied to every character.
pub(super) fn map_all(inv: &Inverter, mut ts: TokenString, map: &CharMap) -> Vec<TokenString> {
    for token in ts.tokens_mut() {
        let pre = map.preimage(token.chars()) & inv.sigma;
        token.set_chars(pre);
    }
    keep(ts)
}

/// Preimage of a map applied at position `i` of words longer than `i`.
pub(super) fn map_at(inv: &Inverter, ts: TokenString, i: usize, map: &CharMap) -> Vec<TokenString> {
    let (shorter, fixed) = inv.front(&ts, i.saturating_add(1));
    let mut out: Vec<TokenString> = shorter.into_iter().collect();
    for mut ts in fixed {
        let pre = map.preimage(ts.set(i)) & inv.sigma;
        ts.set_at(i, pre);
        out.extend(keep(ts));
    }
    out
}

/// `c` and `C`: one map on the first character, another on the rest.
pub(super) fn capitalize(inv: &Inverter, ts: TokenString, first: &CharMap, rest: &CharMap) -> Vec<TokenString> {
    let (shorter, fixed) = inv.front(&ts, 1);
    let mut out: Vec<TokenString> = shorter.into_iter().collect();
    for mut ts in fixed {
        for (k, token) in ts.tokens_mut().iter_mut().enumerate() {
            let map = if k == 0 { first } else { rest };
            let pre = map.preimage(token.chars()) & inv.sigma;
            token.set_chars(pre);
        }
        out.extend(keep(ts));
    }
    out
}

/// `{` moved the first character to the end.
pub(super) fn rotate_left(inv: &Inverter, ts: TokenString) -> Vec<TokenString> {
    let (shorter, fixed) = inv.back(&ts, 1);
    let mut out: Vec<TokenString> = shorter.into_iter().collect();
    for mut ts in fixed {
        let last = ts.remove(ts.len() - 1);
        ts.insert(0, last);
        out.push(ts);
    }
    out
}

/// `}` moved the last character to the front.
pub(super) fn rotate_right(inv: &Inverter, ts: TokenString) -> Vec<TokenString> {
    let (shorter, fixed) = inv.front(&ts, 1);
    let mut out: Vec<TokenString> = shorter.into_iter().collect();
    for mut ts in fixed {
        let first = ts.remove(0);
        ts.push(first);
        out.push(ts);
    }
    out
}

pub(super) fn swap_front(inv: &Inverter, ts: TokenString) -> Vec<TokenString> {
    let (shorter, fixed) = inv.front(&ts, 2);
    let mut out: Vec<TokenString> = shorter.into_iter().collect();
    for mut ts in fixed {
        ts.tokens_mut().swap(0, 1);
        out.push(ts);
    }
    out
}

pub(super) fn swap_back(inv: &Inverter, ts: TokenString) -> Vec<TokenString> {
    let (shorter, fixed) = inv.back(&ts, 2);
    let mut out: Vec<TokenString> = shorter.into_iter().collect();
    for mut ts in fixed {
        let n = ts.len();
        ts.tokens_mut().swap(n - 2, n - 1);
        out.push(ts);
    }
    out
}

/// `*NM`
pub(super) fn swap(mut ts: TokenString, i: usize, j: usize) -> Vec<TokenString> {
    if i < ts.len() && j < ts.len() {
        ts.tokens_mut().swap(i, j);
    }
    vec![ts]
}

/// `.N`: position `i` was overwritten with its right neighbour.
pub(super) fn replace_next(inv: &Inverter, mut ts: TokenString, i: usize) -> Vec<TokenString> {
    if i.saturating_add(1) >= ts.len() {
        return vec![ts];
    }
    let shared = ts.set(i) & ts.set(i + 1);
    ts.set_at(i, inv.sigma);
    ts.set_at(i + 1, shared);
    keep(ts)
}

/// `,N`: position `i` was overwritten with its left neighbour.
pub(super) fn replace_prev(inv: &Inverter, mut ts: TokenString, i: usize) -> Vec<TokenString> {
    if i == 0 || i >= ts.len() {
        return vec![ts];
    }
    let shared = ts.set(i) & ts.set(i - 1);
    ts.set_at(i, inv.sigma);
    ts.set_at(i - 1, shared);
    keep(ts)
}

/// `oNX`
pub(super) fn overwrite(inv: &Inverter, mut ts: TokenString, i: usize, x: u8) -> Vec<TokenString> {
    if i >= ts.len() {
        return vec![ts];
    }
    if !ts.set(i).contains(x) {
        return Vec::new();
    }
    ts.set_at(i, inv.sigma);
    vec![ts]
}

/// `E` and `eX`. Whether a position was uppercased depends on the output
/// character before it, so positions whose left neighbour may or may not be a
/// separator are split in two.
pub(super) fn title(inv: &Inverter, ts: TokenString, seps: Charset) -> Vec<TokenString> {
    let target = ts.sets();
    // Refined output sets, and whether each position was uppercased.
    let mut partial: Vec<(Vec<Charset>, Vec<bool>)> = vec![(Vec::new(), Vec::new())];

    for (i, set) in target.iter().enumerate() {
        let mut next = Vec::new();
        for (outs, upper) in partial {
            let cases: Vec<(Option<Charset>, bool)> = match outs.last() {
                None => vec![(None, true)],
                Some(prev) => vec![(Some(*prev & seps), true), (Some(*prev - seps), false)],
            };
            for (prev, up) in cases {
                if prev.is_some_and(|p| p.is_empty()) {
                    continue;
                }
                let mut outs = outs.clone();
                let mut upper = upper.clone();
                if let Some(prev) = prev {
                    outs[i - 1] = prev;
                }
                outs.push(*set);
                upper.push(up);
                if pre_image(inv, outs[i], up).is_empty() {
                    continue;
                }
                if i > 0 && pre_image(inv, outs[i - 1], upper[i - 1]).is_empty() {
                    continue;
                }
                next.push((outs, upper));
            }
        }
        partial = next;
    }

    partial
        .into_iter()
        .map(|(outs, upper)| {
            TokenString::from_sets(outs.iter().zip(&upper).map(|(set, up)| pre_image(inv, *set, *up)))
        })
        .flat_map(keep)
        .collect()
}

fn pre_image(inv: &Inverter, set: Charset, upper: bool) -> Charset {
    let map = if upper { &charset::UPPER } else { &charset::LOWER };
    map.preimage(set) & inv.sigma
}
