//! Static classification of rules.
//!
//! A rule is as feasible as its least feasible primitive. Two adjustments
//! follow: rules whose only obstacle is a single `Q` per subrule are promoted
//! to [`Feasibility::SpecialMemory`], and deletion-heavy subrules (whose
//! preimages are mostly `Σ` insertions) are downgraded to
//! [`Feasibility::Optimizable`] so the scan may use their enumeration file.

use crate::config::{Config, Style};
use crate::{Feasibility, Pos, Primitive, Subrule};
use itertools::Itertools;

/// Primitives allowed after the `Q` of a special-memory subrule.
const AFTER_Q: &[char] = &['>', '<', 'd', 'f', 'r', 'A', '^', '$', '/'];

/// Deletions at or before this position count as early.
const EARLY: usize = 6;

pub fn classify_primitive(prim: &Primitive, config: &Config) -> Feasibility {
    use Primitive::*;
    if prim.uses_memory() || prim.has_runtime_position() {
        return Feasibility::Uninvertible;
    }
    match prim {
        Truncate(_) | Purge(_) => Feasibility::Optimizable,
        Extract(..) => match config.style {
            Style::Jtr => Feasibility::Uninvertible,
            Style::Hashcat => Feasibility::Optimizable,
        },
        DeleteRange(_, Pos::Num(m)) if *m > config.m_threshold => Feasibility::Uninvertible,
        DeleteRange(_, Pos::Infinite) => Feasibility::Uninvertible,
        _ => Feasibility::Invertible,
    }
}

pub fn classify_subrule(subrule: &Subrule, config: &Config) -> Feasibility {
    let base = subrule
        .primitives
        .iter()
        .fold(Feasibility::Invertible, |acc, p| acc.meet(classify_primitive(p, config)));
    if base == Feasibility::Invertible && deletion_heavy(subrule) {
        return Feasibility::Optimizable;
    }
    base
}

/// Classify a parsed rule line.
pub fn classify(raw: &str, subrules: &[Subrule], config: &Config) -> Feasibility {
    let mut feasibility =
        subrules.iter().fold(Feasibility::Invertible, |acc, s| acc.meet(classify_subrule(s, config)));
    if feasibility == Feasibility::Uninvertible {
        if let Some(q) = special_memory(subrules, config) {
            feasibility = Feasibility::SpecialMemory(q);
        }
    }
    debug_trace!(config, "[feasibility] rule={:?} -> {:?}", raw, feasibility);
    feasibility
}

/// Index of the `Q` in the first subrule when every subrule is a special
/// memory subrule.
fn special_memory(subrules: &[Subrule], config: &Config) -> Option<usize> {
    let mut first = None;
    for subrule in subrules {
        let prims = &subrule.primitives;
        let mut qs = prims.iter().positions(|p| *p == Primitive::RejectUnchanged);
        let q = qs.next()?;
        if qs.next().is_some() {
            return None;
        }
        let forbidden = prims.iter().any(|p| {
            matches!(p, Primitive::Memorize | Primitive::ExtractMemory(..) | Primitive::SetVar(..))
        });
        if forbidden {
            return None;
        }
        if !prims[q + 1..].iter().all(|p| AFTER_Q.contains(&p.opcode()) && !p.has_runtime_position()) {
            return None;
        }
        if !prims[..q].iter().all(|p| classify_primitive(p, config) == Feasibility::Invertible) {
            return None;
        }
        first.get_or_insert(q);
    }
    first
}

fn deletion_heavy(subrule: &Subrule) -> bool {
    let mut early = 0usize;
    let mut total = 0usize;
    let mut overwrites = 0usize;
    let mut dot_comma = 0usize;
    let mut shift_cases = false;
    let small = |p: &Pos, k: usize| matches!(p, Pos::Num(n) if *n <= k);

    for prim in &subrule.primitives {
        match prim {
            Primitive::DeleteFirst => {
                early += 1;
                total += 1;
            }
            Primitive::DeleteLast => total += 1,
            Primitive::DeleteAt(p) => {
                total += 1;
                if small(p, EARLY) {
                    early += 1;
                }
            }
            Primitive::DeleteRange(p, Pos::Num(m)) => {
                total += m;
                if small(p, EARLY) {
                    early += m;
                }
            }
            Primitive::Overwrite(p, _) if small(p, 2) => overwrites += 1,
            Primitive::ReplaceNext(p) | Primitive::ReplacePrev(p) if small(p, 2) => dot_comma += 1,
            Primitive::Lower
            | Primitive::Upper
            | Primitive::Capitalize
            | Primitive::InvCapitalize
            | Primitive::TitleSpace
            | Primitive::TitleSep(_) => shift_cases = true,
            _ => {}
        }
    }
    (early >= 2 && (shift_cases || total >= 3)) || early + overwrites >= 3 || early + dot_comma >= 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser::parse_line;

    #[test]
    fn rules_are_classified() {
        let jtr = Config::jtr();
        let hc = Config::hashcat();
        let cases: Vec<(&str, &Config, Feasibility)> = vec![
            ("c $1", &jtr, Feasibility::Invertible),
            ("[lu] $[0-9]", &jtr, Feasibility::Invertible),
            ("'5", &jtr, Feasibility::Optimizable),
            ("@a", &jtr, Feasibility::Optimizable),
            ("x12", &hc, Feasibility::Optimizable),
            ("x12", &jtr, Feasibility::Uninvertible),
            ("O12", &jtr, Feasibility::Invertible),
            ("O13", &jtr, Feasibility::Uninvertible),
            ("Tm", &jtr, Feasibility::Uninvertible),
            ("M $1 Q", &jtr, Feasibility::Uninvertible),
            ("l Q $1", &jtr, Feasibility::SpecialMemory(1)),
            ("Q", &jtr, Feasibility::SpecialMemory(0)),
            ("[lu] Q r", &jtr, Feasibility::SpecialMemory(1)),
            ("l Q c", &jtr, Feasibility::Uninvertible),
            ("'5 Q", &jtr, Feasibility::Uninvertible),
            ("l Q Q", &jtr, Feasibility::Uninvertible),
            ("4", &hc, Feasibility::Uninvertible),
        ];
        for (raw, config, expected) in cases {
            let subrules = parse_line(raw, config).unwrap();
            assert_eq!(classify(raw, &subrules, config), expected, "rule {:?}", raw);
        }
    }

    #[test]
    fn deletion_heavy_rules_are_downgraded() {
        let config = Config::jtr();
        let cases: Vec<(&str, Feasibility)> = vec![
            ("D1 D2", Feasibility::Invertible),
            ("D1 D2 l", Feasibility::Optimizable),
            ("D1 D2 D8", Feasibility::Optimizable),
            ("D1 D8 D9", Feasibility::Invertible),
            ("\\[ o1x o2y", Feasibility::Optimizable),
            ("D0 .1 ,2", Feasibility::Optimizable),
            ("O02 ]", Feasibility::Optimizable),
            ("] ] ] u", Feasibility::Invertible),
        ];
        for (raw, expected) in cases {
            let subrules = parse_line(raw, &config).unwrap();
            assert_eq!(classify(raw, &subrules, &config), expected, "rule {:?}", raw);
        }
    }
}
