//! English suffix rules for `p` (plural), `P` (past tense) and `I` (gerund).
//!
//! Each rule is a guard table: the first case whose conditions hold decides
//! what happens to the word. The forward engine walks the table directly; the
//! inverter uses the same table backwards (rebuild the word as it was before
//! the rewrite, then keep only the variants for which that case is the first
//! match), so the two can never disagree.

use crate::engine::charset::Charset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Morph {
    Plural,
    Past,
    Gerund,
}

/// A condition on the word before the rewrite.
#[derive(Debug, Clone, Copy)]
enum Cond {
    MinLen(usize),
    LenBelow(usize),
    /// The `k`-th character from the end (1 = last) is one of the bytes.
    EndIn(usize, &'static [u8]),
    EndNotIn(usize, &'static [u8]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Keep,
    /// Drop `strip` trailing characters, optionally double the last remaining
    /// one, then append `append`.
    Rewrite { strip: usize, double_last: bool, append: &'static [u8] },
}

struct Case {
    conds: &'static [Cond],
    action: Action,
}

const fn rewrite(strip: usize, double_last: bool, append: &'static [u8]) -> Action {
    Action::Rewrite { strip, double_last, append }
}

const PLURAL: &[Case] = &[
    Case { conds: &[Cond::LenBelow(2)], action: Action::Keep },
    Case { conds: &[Cond::EndIn(1, b"sxz")], action: rewrite(0, false, b"es") },
    Case { conds: &[Cond::MinLen(3), Cond::EndIn(1, b"h"), Cond::EndIn(2, b"cs")], action: rewrite(0, false, b"es") },
    Case { conds: &[Cond::EndIn(1, b"f"), Cond::EndNotIn(2, b"f")], action: rewrite(1, false, b"ves") },
    Case { conds: &[Cond::MinLen(3), Cond::EndIn(1, b"e"), Cond::EndIn(2, b"f")], action: rewrite(2, false, b"ves") },
    Case { conds: &[Cond::MinLen(3), Cond::EndIn(1, b"y"), Cond::EndIn(2, b"aeiou")], action: rewrite(0, false, b"s") },
    Case { conds: &[Cond::MinLen(3), Cond::EndIn(1, b"y")], action: rewrite(1, false, b"ies") },
    Case { conds: &[], action: rewrite(0, false, b"s") },
];

const PAST: &[Case] = &[
    Case { conds: &[Cond::LenBelow(3)], action: Action::Keep },
    Case { conds: &[Cond::EndIn(1, b"d"), Cond::EndIn(2, b"e")], action: Action::Keep },
    Case { conds: &[Cond::EndIn(1, b"y")], action: rewrite(1, false, b"ied") },
    Case { conds: &[Cond::EndIn(1, b"bgp"), Cond::EndNotIn(2, b"bgp")], action: rewrite(0, true, b"ed") },
    Case { conds: &[Cond::EndIn(1, b"e")], action: rewrite(0, false, b"d") },
    Case { conds: &[], action: rewrite(0, false, b"ed") },
];

const GERUND: &[Case] = &[
    Case { conds: &[Cond::LenBelow(3)], action: Action::Keep },
    Case { conds: &[Cond::EndIn(1, b"g"), Cond::EndIn(2, b"n"), Cond::EndIn(3, b"i")], action: Action::Keep },
    Case { conds: &[Cond::EndIn(1, b"aeiou")], action: rewrite(1, false, b"ing") },
    Case { conds: &[Cond::EndIn(1, b"bgp"), Cond::EndNotIn(2, b"bgp")], action: rewrite(0, true, b"ing") },
    Case { conds: &[], action: rewrite(0, false, b"ing") },
];

/// Conditions look at most this far from the end.
const TAIL: usize = 3;

/// Every byte a condition names; all other bytes behave alike.
const NAMED: &[u8] = b"abcdefghinopsuxyz";

impl Morph {
    fn table(self) -> &'static [Case] {
        match self {
            Morph::Plural => PLURAL,
            Morph::Past => PAST,
            Morph::Gerund => GERUND,
        }
    }

    /// Index of the first case matching `word`.
    fn first_match(self, word: &[u8]) -> usize {
        let table = self.table();
        table.iter().position(|case| case.conds.iter().all(|c| holds(*c, word))).unwrap_or(table.len() - 1)
    }

    /// The rewritten word.
    pub fn apply(self, word: &[u8]) -> Vec<u8> {
        match self.table()[self.first_match(word)].action {
            Action::Keep => word.to_vec(),
            Action::Rewrite { strip, double_last, append } => {
                let mut out = word[..word.len() - strip].to_vec();
                if double_last {
                    if let Some(&last) = out.last() {
                        out.push(last);
                    }
                }
                out.extend_from_slice(append);
                out
            }
        }
    }

    /// Every preimage of the position sets `target` (a plain token string),
    /// as disjoint lists of position sets over the alphabet `sigma`.
    pub fn invert(self, target: &[Charset], sigma: Charset) -> Vec<Vec<Charset>> {
        let mut out = Vec::new();
        for (idx, case) in self.table().iter().enumerate() {
            let Some(word) = rebuild(case.action, target, sigma) else {
                continue;
            };
            refine(self, idx, word, &mut out);
        }
        out
    }
}

fn holds(cond: Cond, word: &[u8]) -> bool {
    let n = word.len();
    match cond {
        Cond::MinLen(k) => n >= k,
        Cond::LenBelow(k) => n < k,
        Cond::EndIn(k, set) => n >= k && set.contains(&word[n - k]),
        Cond::EndNotIn(k, set) => n >= k && !set.contains(&word[n - k]),
    }
}

/// The word sets that `action` maps onto `target`, before refinement.
fn rebuild(action: Action, target: &[Charset], sigma: Charset) -> Option<Vec<Charset>> {
    let l = target.len();
    let (strip, double_last, append) = match action {
        Action::Keep => return Some(target.to_vec()),
        Action::Rewrite { strip, double_last, append } => (strip, double_last, append),
    };
    let kept = l.checked_sub(append.len() + usize::from(double_last))?;
    let tail = &target[l - append.len()..];
    if !tail.iter().zip(append).all(|(set, b)| set.contains(*b)) {
        return None;
    }
    let mut word: Vec<Charset> = target[..kept].to_vec();
    if double_last {
        let last = word.last_mut()?;
        *last = *last & target[kept];
    }
    word.extend(std::iter::repeat_n(sigma, strip));
    if word.iter().any(Charset::is_empty) { None } else { Some(word) }
}

/// Split the tail of `word` into classes that behave alike under the table and
/// keep the ones whose first matching case is `case`.
fn refine(morph: Morph, case: usize, word: Vec<Charset>, out: &mut Vec<Vec<Charset>>) {
    let n = word.len();
    let start = n.saturating_sub(TAIL);
    let named = Charset::from_bytes(NAMED);

    let atoms: Vec<Vec<Charset>> = word[start..]
        .iter()
        .map(|set| {
            let mut parts: Vec<Charset> =
                NAMED.iter().filter(|b| set.contains(**b)).map(|b| Charset::single(*b)).collect();
            let rest = *set - named;
            if !rest.is_empty() {
                parts.push(rest);
            }
            parts
        })
        .collect();

    let mut choice = vec![0usize; atoms.len()];
    if atoms.iter().any(Vec::is_empty) {
        return;
    }
    loop {
        let mut sample: Vec<u8> = vec![0; n];
        for (k, atom) in choice.iter().enumerate() {
            sample[start + k] = atoms[k][*atom].first().unwrap_or(0);
        }
        if morph.first_match(&sample) == case {
            let mut refined = word.clone();
            for (k, atom) in choice.iter().enumerate() {
                refined[start + k] = atoms[k][*atom];
            }
            out.push(refined);
        }

        // Odometer over the atom choices.
        let mut k = choice.len();
        loop {
            if k == 0 {
                return;
            }
            k -= 1;
            choice[k] += 1;
            if choice[k] < atoms[k].len() {
                break;
            }
            choice[k] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(sets: &[Vec<Charset>]) -> Vec<Vec<u8>> {
        use itertools::Itertools;
        let mut out: Vec<Vec<u8>> = sets
            .iter()
            .flat_map(|w| {
                if w.is_empty() {
                    return vec![Vec::new()];
                }
                w.iter().map(|s| s.to_vec()).multi_cartesian_product().collect::<Vec<_>>()
            })
            .collect();
        out.sort();
        out
    }

    fn sets_of(word: &[u8]) -> Vec<Charset> {
        word.iter().map(|b| Charset::single(*b)).collect()
    }

    #[test]
    fn forward_tables() {
        let cases: Vec<(Morph, &str, &str)> = vec![
            (Morph::Plural, "a", "a"),
            (Morph::Plural, "box", "boxes"),
            (Morph::Plural, "church", "churches"),
            (Morph::Plural, "wolf", "wolves"),
            (Morph::Plural, "cliff", "cliffs"),
            (Morph::Plural, "knife", "knives"),
            (Morph::Plural, "day", "days"),
            (Morph::Plural, "city", "cities"),
            (Morph::Plural, "cat", "cats"),
            (Morph::Past, "go", "go"),
            (Morph::Past, "used", "used"),
            (Morph::Past, "cry", "cried"),
            (Morph::Past, "bag", "bagged"),
            (Morph::Past, "ebb", "ebbed"),
            (Morph::Past, "bake", "baked"),
            (Morph::Past, "crack", "cracked"),
            (Morph::Gerund, "go", "go"),
            (Morph::Gerund, "sing", "sing"),
            (Morph::Gerund, "bake", "baking"),
            (Morph::Gerund, "bag", "bagging"),
            (Morph::Gerund, "crack", "cracking"),
        ];
        for (morph, word, expected) in cases {
            assert_eq!(morph.apply(word.as_bytes()), expected.as_bytes(), "{:?} {}", morph, word);
        }
    }

    #[test]
    fn inverse_matches_forward_on_small_alphabet() {
        // Every word over a small alphabet that maps onto the target must be
        // found by the inverse, and nothing else.
        let alphabet = b"abefgisy";
        let sigma = Charset::from_bytes(alphabet);
        let mut domain: Vec<Vec<u8>> = vec![Vec::new()];
        let mut all = Vec::new();
        for _ in 0..5 {
            domain = domain
                .iter()
                .flat_map(|w| alphabet.iter().map(move |b| [w.clone(), vec![*b]].concat()))
                .collect();
            all.extend(domain.iter().cloned());
        }

        for morph in [Morph::Plural, Morph::Past, Morph::Gerund] {
            for target in ["abies", "fives", "bagged", "agged", "baking", "bing", "ab", "bees"] {
                let target = target.as_bytes();
                let mut expected: Vec<Vec<u8>> =
                    all.iter().filter(|w| morph.apply(w) == target).cloned().collect();
                expected.sort();
                let got: Vec<Vec<u8>> = words(&morph.invert(&sets_of(target), sigma))
                    .into_iter()
                    .filter(|w| w.iter().all(|b| sigma.contains(*b)) && w.len() <= 5)
                    .collect();
                assert_eq!(got, expected, "{:?} {:?}", morph, String::from_utf8_lossy(target));
            }
        }
    }

    #[test]
    fn preimages_are_disjoint() {
        let sigma = Charset::range(b'a', b'z');
        let target = vec![sigma, sigma, sigma, Charset::single(b'e'), Charset::single(b's')];
        let pre = Morph::Plural.invert(&target, sigma);
        for (i, a) in pre.iter().enumerate() {
            for b in &pre[i + 1..] {
                let overlap = a.len() == b.len() && a.iter().zip(b).all(|(x, y)| !x.intersect(y).is_empty());
                assert!(!overlap, "{:?} and {:?} overlap", a, b);
            }
        }
    }
}
