//! Dependency extraction: a symbolic run of a subrule over every input length
//! at once.
//!
//! The current word is described as a list of segments, each either a
//! literal character set (from `$X`, `^X`, `oNX` ...) or a run of the input
//! word (`word[start..end]`, maybe reversed, through a character map). Input
//! lengths are tracked as branches `[lo, hi)`; a primitive whose effect
//! depends on the length splits a branch into the maximal sub-ranges on which
//! it behaves the same way. Rejections then become predicates on the input
//! word and the branches become disjoint [`DependencyList`]s.
//!
//! A rejection that cannot be phrased as a conjunction of predicates (a
//! count spread over unrelated parts of the word, a test on a multi-member
//! literal, a runtime position) makes the subrule uncountable; the counter
//! then runs it forward instead.

use crate::config::Config;
use crate::engine::charset::{self, CharMap, Charset};
use crate::engine::dependency::{Dependency, DependencyList, Idx, SubruleDependency};
use crate::{Pos, Primitive, Subrule};

/// The subrule cannot be described with dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uncountable;

type Extracted<T> = std::result::Result<T, Uncountable>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seg {
    Lit(Charset),
    Run { start: Idx, end: Idx, rev: bool, map: CharMap },
}

/// Input words with `lo <= len < hi`, and what the subrule has made of them.
#[derive(Debug, Clone)]
struct Branch {
    lo: usize,
    hi: usize,
    /// `None` once a primitive scrambles positions beyond tracking.
    view: Option<Vec<Seg>>,
    deps: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Outcome {
    view: Vec<Seg>,
    deps: Vec<Dependency>,
}

impl Outcome {
    fn view(view: Vec<Seg>) -> Option<Outcome> {
        Some(Outcome { view, deps: Vec::new() })
    }
}

/// Dependencies of every subrule of a rule, with `extra` (the password
/// policy) appended to each; `None` when one of them is uncountable.
pub fn extract_rule(raw: &str, subrules: &[Subrule], extra: &[Primitive], config: &Config) -> Option<Vec<SubruleDependency>> {
    let mut out = Vec::with_capacity(subrules.len());
    for subrule in subrules {
        match extract(subrule, extra, config) {
            Some(dep) => {
                debug_trace!(config, "[extract] rule={:?} -> {}", raw, dep);
                out.push(dep);
            }
            None => {
                debug_trace!(config, "[extract] rule={:?} -> uncountable", raw);
                return None;
            }
        }
    }
    Some(out)
}

pub fn extract(subrule: &Subrule, extra: &[Primitive], config: &Config) -> Option<SubruleDependency> {
    let branches = interpret(subrule.primitives.iter().chain(extra), config).ok()?;
    let max = config.max_password_length;

    let mut lists = Vec::new();
    for (lo, hi, deps) in coalesce(branches) {
        let mut deps = deps;
        if lo > 0 {
            deps.push(Dependency::LengthGreater(lo - 1));
        }
        if hi <= max {
            deps.push(Dependency::LengthLess(hi));
        }
        lists.push(DependencyList::new(deps));
    }
    if lists.is_empty() {
        lists.push(DependencyList::rejected());
    }
    Some(SubruleDependency::new(lists, subrule.multiplicity()))
}

/// Merge neighbouring branches that ended with the same predicates.
fn coalesce(branches: Vec<Branch>) -> Vec<(usize, usize, Vec<Dependency>)> {
    let mut out: Vec<(usize, usize, Vec<Dependency>)> = Vec::new();
    for branch in branches {
        match out.last_mut() {
            Some((_, hi, deps)) if *hi == branch.lo && *deps == branch.deps => *hi = branch.hi,
            _ => out.push((branch.lo, branch.hi, branch.deps)),
        }
    }
    out
}

fn interpret<'p>(prims: impl Iterator<Item = &'p Primitive>, config: &Config) -> Extracted<Vec<Branch>> {
    let whole = Seg::Run { start: Idx::Front(0), end: Idx::Back(0), rev: false, map: CharMap::identity() };
    let mut branches =
        vec![Branch { lo: 0, hi: config.max_password_length + 1, view: Some(vec![whole]), deps: Vec::new() }];
    for prim in prims {
        if prim.has_runtime_position() {
            return Err(Uncountable);
        }
        let mut next = Vec::with_capacity(branches.len());
        for branch in branches {
            next.extend(step(prim, branch, config)?);
        }
        branches = next;
        if branches.is_empty() {
            break;
        }
    }
    Ok(branches)
}

fn step(prim: &Primitive, branch: Branch, config: &Config) -> Extracted<Vec<Branch>> {
    use Primitive::*;
    match prim {
        Noop | Memorize => return Ok(vec![branch]),
        Mode(_) => return Ok(Vec::new()),
        Flag(flag) => return Ok(if flag.rejects() { Vec::new() } else { vec![branch] }),
        RejectUnchanged => return Err(Uncountable),
        SetVar(_, Pos::Num(a), Pos::Num(b)) => return Ok(if a < b { Vec::new() } else { vec![branch] }),
        SetVar(..) => return Err(Uncountable),
        _ => {}
    }

    if let Some(map) = uniform_map(prim) {
        let view = branch.view.as_ref().map(|v| map_all(v, &map));
        return Ok(vec![Branch { view, ..branch }]);
    }
    if *prim == Reverse {
        let view = branch.view.as_ref().map(|v| reversed(v));
        return Ok(vec![Branch { view, ..branch }]);
    }

    let Some(view) = &branch.view else {
        return if is_rejection(prim) { Err(Uncountable) } else { Ok(vec![branch]) };
    };
    if scrambles(prim) {
        return Ok(vec![Branch { view: None, ..branch }]);
    }

    let mut groups: Vec<(usize, usize, Outcome)> = Vec::new();
    for l in branch.lo..branch.hi {
        let Some(outcome) = step_at(prim, view, l, config)? else {
            continue;
        };
        match groups.last_mut() {
            Some((_, hi, last)) if *hi == l && *last == outcome => *hi = l + 1,
            _ => groups.push((l, l + 1, outcome)),
        }
    }
    Ok(groups
        .into_iter()
        .map(|(lo, hi, outcome)| {
            let mut deps = branch.deps.clone();
            deps.extend(outcome.deps);
            Branch { lo, hi, view: Some(outcome.view), deps }
        })
        .collect())
}

fn uniform_map(prim: &Primitive) -> Option<CharMap> {
    match prim {
        Primitive::Lower => Some(*charset::LOWER),
        Primitive::Upper => Some(*charset::UPPER),
        Primitive::ToggleAll => Some(*charset::TOGGLE),
        Primitive::ShiftCase => Some(*charset::SHIFT),
        Primitive::VowelsLower => Some(*charset::VOWELS),
        Primitive::KeyRight => Some(*charset::KEY_RIGHT),
        Primitive::KeyLeft => Some(*charset::KEY_LEFT),
        Primitive::Replace(x, y) => Some(CharMap::replace(*x, *y)),
        _ => None,
    }
}

fn is_rejection(prim: &Primitive) -> bool {
    matches!(
        prim,
        Primitive::RejectLen(..)
            | Primitive::RejectIfContains(_)
            | Primitive::RejectUnlessContains(_)
            | Primitive::RejectUnlessAt(..)
            | Primitive::RejectUnlessFirst(_)
            | Primitive::RejectUnlessLast(_)
            | Primitive::RejectUnlessCount(..)
    )
}

/// Primitives after which positions and lengths are no longer tracked.
fn scrambles(prim: &Primitive) -> bool {
    matches!(
        prim,
        Primitive::DupEach
            | Primitive::TitleSpace
            | Primitive::TitleSep(_)
            | Primitive::Pluralize
            | Primitive::PastTense
            | Primitive::Gerund
            | Primitive::Purge(_)
            | Primitive::AppendMemory
            | Primitive::PrependMemory
            | Primitive::ExtractMemory(..)
    )
}

fn at(p: Pos) -> usize {
    match p {
        Pos::Num(n) => n,
        Pos::Infinite | Pos::Runtime(_) => usize::MAX,
    }
}

/// One primitive on the words of length `l`; `None` rejects them.
fn step_at(prim: &Primitive, view: &[Seg], l: usize, config: &Config) -> Extracted<Option<Outcome>> {
    use Primitive::*;
    let n = cur_len(view, l);
    let max = config.max_password_length;
    let unchanged = || Outcome::view(view.to_vec());
    let grown = |next: Vec<Seg>| if cur_len(&next, l) <= max { Outcome::view(next) } else { unchanged() };

    let outcome = match prim {
        Capitalize | InvCapitalize => {
            let (all, first) = if *prim == Capitalize {
                (&charset::LOWER, &charset::UPPER)
            } else {
                (&charset::UPPER, &charset::LOWER)
            };
            let mapped = map_all(view, all);
            match cells(&mapped, &[Target::Front(0)], l) {
                Some((mut v, idx)) => {
                    v[idx[0]] = map_seg(&v[idx[0]], first);
                    Outcome::view(v)
                }
                None => Outcome::view(mapped),
            }
        }
        ToggleAt(p) => point_map(view, at(*p), &charset::TOGGLE, l),
        Increment(p) => point_map(view, at(*p), &charset::INCREMENT, l),
        Decrement(p) => point_map(view, at(*p), &charset::DECREMENT, l),
        BitLeft(p) => point_map(view, at(*p), &charset::BIT_LEFT, l),
        BitRight(p) => point_map(view, at(*p), &charset::BIT_RIGHT, l),

        RotateLeft => match cells(view, &[Target::Front(0)], l) {
            Some((mut v, idx)) => {
                let first = v.remove(idx[0]);
                v.push(first);
                Outcome::view(v)
            }
            None => unchanged(),
        },
        RotateRight => match cells(view, &[Target::Back(0)], l) {
            Some((mut v, idx)) => {
                let last = v.remove(idx[0]);
                v.insert(0, last);
                Outcome::view(v)
            }
            None => unchanged(),
        },
        DeleteFirst => remove_cell(view, Target::Front(0), l),
        DeleteLast => remove_cell(view, Target::Back(0), l),
        DeleteAt(p) => remove_cell(view, Target::Front(at(*p)), l),
        SwapFront => swap_cells(view, Target::Front(0), Target::Front(1), l),
        SwapBack => swap_cells(view, Target::Back(1), Target::Back(0), l),
        Swap(p, q) if at(*p) != at(*q) => swap_cells(view, Target::Front(at(*p)), Target::Front(at(*q)), l),
        Swap(..) => unchanged(),
        ReplaceNext(p) => {
            let i = at(*p);
            if i.saturating_add(1) < n { copy_cell(view, i, i + 1, l) } else { unchanged() }
        }
        ReplacePrev(p) => {
            let i = at(*p);
            if i >= 1 && i < n { copy_cell(view, i, i - 1, l) } else { unchanged() }
        }
        Overwrite(p, x) => match cells(view, &[Target::Front(at(*p))], l) {
            Some((mut v, idx)) => {
                v[idx[0]] = Seg::Lit(Charset::single(*x));
                Outcome::view(v)
            }
            None => unchanged(),
        },

        Append(x) => grown([view, &[Seg::Lit(*x)]].concat()),
        Prepend(x) => grown([&[Seg::Lit(*x)], view].concat()),
        Insert(p, x) => {
            let i = at(*p);
            let pos = if config.is_jtr() { Some(i.min(n)) } else { (i <= n).then_some(i) };
            match pos.and_then(|pos| boundary(view, pos, l)) {
                Some((mut v, b)) => {
                    v.insert(b, Seg::Lit(*x));
                    grown(v)
                }
                None => unchanged(),
            }
        }
        InsertString(p, chars) => match boundary(view, at(*p).min(n), l) {
            Some((v, b)) => {
                let lits = chars.iter().map(|c| Seg::Lit(*c));
                grown(v[..b].iter().cloned().chain(lits).chain(v[b..].iter().cloned()).collect())
            }
            None => unchanged(),
        },
        Duplicate => grown([view, view].concat()),
        Reflect => grown([view.to_vec(), reversed(view)].concat()),
        DupWord(p) => {
            let k = at(*p);
            if n == 0 || k.saturating_add(1).saturating_mul(n) > max {
                unchanged()
            } else {
                Outcome::view(view.repeat(k + 1))
            }
        }
        DupFirst(p) | DupLast(p) => {
            let k = at(*p);
            let target = if matches!(prim, DupFirst(_)) { Target::Front(0) } else { Target::Back(0) };
            match cells(view, &[target], l) {
                Some((mut v, idx)) if n.saturating_add(k) <= max => {
                    let copies = std::iter::repeat_n(v[idx[0]].clone(), k);
                    let _ = v.splice(idx[0]..idx[0], copies);
                    Outcome::view(v)
                }
                _ => unchanged(),
            }
        }
        DupBlockFront(p) => {
            let k = at(*p);
            if k == 0 || k > n {
                unchanged()
            } else {
                let prefix = slice(view, 0, k, l);
                grown([prefix, view.to_vec()].concat())
            }
        }
        DupBlockBack(p) => {
            let k = at(*p);
            if k == 0 || k > n {
                unchanged()
            } else {
                match cells(view, &[Target::Back(k - 1)], l) {
                    Some((v, idx)) => {
                        let suffix = v[idx[0]..].to_vec();
                        grown([v, suffix].concat())
                    }
                    None => unchanged(),
                }
            }
        }
        Truncate(p) => {
            let i = at(*p);
            if n > i { Outcome::view(slice(view, 0, i, l)) } else { unchanged() }
        }
        Extract(p, q) => {
            let (i, m) = (at(*p), at(*q));
            if config.is_jtr() {
                if i < n { Outcome::view(slice(view, i, i.saturating_add(m).min(n), l)) } else { Outcome::view(Vec::new()) }
            } else if i.saturating_add(m) <= n {
                Outcome::view(slice(view, i, i + m, l))
            } else {
                unchanged()
            }
        }
        DeleteRange(p, q) => {
            let (i, m) = (at(*p), at(*q));
            if i.saturating_add(m) <= n {
                Outcome::view([slice(view, 0, i, l), slice(view, i + m, n, l)].concat())
            } else {
                unchanged()
            }
        }

        RejectLen(cmp, p) => {
            let ok = match p {
                Pos::Num(k) => cmp.holds(n, *k),
                _ => cmp.holds_infinite(),
            };
            if ok { unchanged() } else { None }
        }
        RejectIfContains(x) => none_of(view, *x, l)?.map(|deps| Outcome { view: view.to_vec(), deps }),
        RejectUnlessContains(x) => at_least(view, 1, *x, l)?.map(|deps| Outcome { view: view.to_vec(), deps }),
        RejectUnlessCount(p, x) => match at(*p) {
            0 => unchanged(),
            usize::MAX => None,
            k => at_least(view, k, *x, l)?.map(|deps| Outcome { view: view.to_vec(), deps }),
        },
        RejectUnlessAt(p, x) => check_position(view, Target::Front(at(*p)), *x, l)?,
        RejectUnlessFirst(x) => check_position(view, Target::Front(0), *x, l)?,
        RejectUnlessLast(x) => check_position(view, Target::Back(0), *x, l)?,

        _ => return Err(Uncountable),
    };
    Ok(outcome)
}

// --- Segments ---------------------------------------------------------------

fn forward(idx: Idx, by: usize) -> Idx {
    match idx {
        Idx::Front(i) => Idx::Front(i + by),
        Idx::Back(k) => Idx::Back(k.saturating_sub(by)),
    }
}

fn backward(idx: Idx, by: usize) -> Idx {
    match idx {
        Idx::Front(i) => Idx::Front(i.saturating_sub(by)),
        Idx::Back(k) => Idx::Back(k + by),
    }
}

fn seg_len(seg: &Seg, l: usize) -> usize {
    match seg {
        Seg::Lit(_) => 1,
        Seg::Run { start, end, .. } => match (start.resolve(l), end.resolve(l)) {
            (Some(s), Some(e)) if s <= e => e - s,
            _ => 0,
        },
    }
}

fn cur_len(view: &[Seg], l: usize) -> usize {
    view.iter().map(|seg| seg_len(seg, l)).sum()
}

fn map_seg(seg: &Seg, map: &CharMap) -> Seg {
    match seg {
        Seg::Lit(set) => Seg::Lit(map.image(*set)),
        Seg::Run { start, end, rev, map: inner } => {
            Seg::Run { start: *start, end: *end, rev: *rev, map: inner.then(map) }
        }
    }
}

fn map_all(view: &[Seg], map: &CharMap) -> Vec<Seg> {
    view.iter().map(|seg| map_seg(seg, map)).collect()
}

fn reversed(view: &[Seg]) -> Vec<Seg> {
    view.iter()
        .rev()
        .map(|seg| match seg {
            Seg::Run { start, end, rev, map } => Seg::Run { start: *start, end: *end, rev: !rev, map: *map },
            lit => lit.clone(),
        })
        .collect()
}

/// A position of the current word, counted from the front or from the back
/// (`Back(0)` is the last character).
#[derive(Debug, Clone, Copy)]
enum Target {
    Front(usize),
    Back(usize),
}

/// Split a run so that the character at offset `j` from its start (or, with
/// `from_end`, from its end) is a segment of its own.
fn split_run(seg: &Seg, j: usize, from_end: bool, l: usize) -> Vec<Seg> {
    let Seg::Run { start, end, rev, map } = *seg else {
        return vec![seg.clone()];
    };
    let cell_at = match (rev, from_end) {
        (false, false) | (true, true) => forward(start, j),
        (false, true) | (true, false) => backward(end, j + 1),
    };
    let after_cell = forward(cell_at, 1);
    let left = Seg::Run { start, end: cell_at, rev, map };
    let cell = Seg::Run { start: cell_at, end: after_cell, rev: false, map };
    let right = Seg::Run { start: after_cell, end, rev, map };
    let pieces = if rev { [right, cell, left] } else { [left, cell, right] };
    pieces.into_iter().filter(|s| seg_len(s, l) > 0).collect()
}

fn isolate(view: Vec<Seg>, target: Target, l: usize) -> Vec<Seg> {
    let lens: Vec<usize> = view.iter().map(|s| seg_len(s, l)).collect();
    let found = match target {
        Target::Front(pos) => {
            let mut acc = 0;
            (0..view.len()).find_map(|i| {
                let hit = (pos < acc + lens[i]).then(|| (i, pos - acc, false));
                acc += lens[i];
                hit
            })
        }
        Target::Back(pos) => {
            let mut acc = 0;
            (0..view.len()).rev().find_map(|i| {
                let hit = (pos < acc + lens[i]).then(|| (i, pos - acc, true));
                acc += lens[i];
                hit
            })
        }
    };
    match found {
        Some((i, j, from_end)) if lens[i] > 1 => {
            let mut out = view[..i].to_vec();
            out.extend(split_run(&view[i], j, from_end, l));
            out.extend_from_slice(&view[i + 1..]);
            out
        }
        _ => view,
    }
}

/// Make each target a one-character segment; returns the view and the
/// segment index of each target, or `None` when one is past the end.
fn cells(view: &[Seg], targets: &[Target], l: usize) -> Option<(Vec<Seg>, Vec<usize>)> {
    let n = cur_len(view, l);
    let positions: Vec<usize> = targets
        .iter()
        .map(|t| match t {
            Target::Front(i) => (*i < n).then_some(*i),
            Target::Back(k) => n.checked_sub(k.checked_add(1)?),
        })
        .collect::<Option<_>>()?;

    let mut v: Vec<Seg> = view.iter().filter(|s| seg_len(s, l) > 0).cloned().collect();
    for target in targets {
        v = isolate(v, *target, l);
    }
    let starts: Vec<usize> = v
        .iter()
        .scan(0, |acc, s| {
            let start = *acc;
            *acc += seg_len(s, l);
            Some(start)
        })
        .collect();
    let idx = positions.iter().map(|p| starts.iter().position(|s| s == p)).collect::<Option<Vec<_>>>()?;
    Some((v, idx))
}

/// The view with a segment boundary at `pos`, and the index of the first
/// segment after it.
fn boundary(view: &[Seg], pos: usize, l: usize) -> Option<(Vec<Seg>, usize)> {
    let n = cur_len(view, l);
    if pos == n {
        let v: Vec<Seg> = view.iter().filter(|s| seg_len(s, l) > 0).cloned().collect();
        let len = v.len();
        return Some((v, len));
    }
    cells(view, &[Target::Front(pos)], l).map(|(v, idx)| (v, idx[0]))
}

/// Current characters `from..to`.
fn slice(view: &[Seg], from: usize, to: usize, l: usize) -> Vec<Seg> {
    let Some((v, b)) = boundary(view, to, l) else {
        return view.to_vec();
    };
    let head = &v[..b];
    match boundary(head, from, l) {
        Some((h, a)) => h[a..].to_vec(),
        None => head.to_vec(),
    }
}

fn point_map(view: &[Seg], i: usize, map: &CharMap, l: usize) -> Option<Outcome> {
    match cells(view, &[Target::Front(i)], l) {
        Some((mut v, idx)) => {
            v[idx[0]] = map_seg(&v[idx[0]], map);
            Outcome::view(v)
        }
        None => Outcome::view(view.to_vec()),
    }
}

fn remove_cell(view: &[Seg], target: Target, l: usize) -> Option<Outcome> {
    match cells(view, &[target], l) {
        Some((mut v, idx)) => {
            v.remove(idx[0]);
            Outcome::view(v)
        }
        None => Outcome::view(view.to_vec()),
    }
}

fn swap_cells(view: &[Seg], a: Target, b: Target, l: usize) -> Option<Outcome> {
    match cells(view, &[a, b], l) {
        Some((mut v, idx)) => {
            v.swap(idx[0], idx[1]);
            Outcome::view(v)
        }
        None => Outcome::view(view.to_vec()),
    }
}

/// Overwrite position `dst` with the character at `src`.
fn copy_cell(view: &[Seg], dst: usize, src: usize, l: usize) -> Option<Outcome> {
    match cells(view, &[Target::Front(dst), Target::Front(src)], l) {
        Some((mut v, idx)) => {
            v[idx[0]] = v[idx[1]].clone();
            Outcome::view(v)
        }
        None => Outcome::view(view.to_vec()),
    }
}

// --- Rejections ---------------------------------------------------------------

fn is_whole(start: Idx, end: Idx) -> bool {
    start == Idx::Front(0) && end == Idx::Back(0)
}

fn position(idx: Idx) -> isize {
    match idx {
        Idx::Front(i) => i as isize,
        Idx::Back(k) => -(k as isize),
    }
}

/// How a literal set relates to `x`: every candidate hits, none does, or it
/// depends on the candidate.
fn literal_hit(set: Charset, x: Charset) -> Extracted<bool> {
    if set.is_subset(&x) {
        Ok(true)
    } else if set.is_disjoint(&x) {
        Ok(false)
    } else {
        Err(Uncountable)
    }
}

/// `!X`
fn none_of(view: &[Seg], x: Charset, l: usize) -> Extracted<Option<Vec<Dependency>>> {
    let mut deps = Vec::new();
    for seg in view.iter().filter(|s| seg_len(s, l) > 0) {
        match seg {
            Seg::Lit(set) => {
                if literal_hit(*set, x)? {
                    return Ok(None);
                }
            }
            Seg::Run { start, end, map, .. } => {
                let chars = map.preimage(x);
                if chars.is_empty() {
                    continue;
                }
                deps.push(if is_whole(*start, *end) {
                    Dependency::ContainsFewerThan { count: 1, chars }
                } else {
                    Dependency::RangeContainsExactly { from: *start, to: *end, count: 0, chars }
                });
            }
        }
    }
    Ok(Some(deps))
}

/// `/X` and `%NX`: at least `need` characters in `x`. Expressible when the
/// runs that can hit cover one input range, possibly several times.
fn at_least(view: &[Seg], need: usize, x: Charset, l: usize) -> Extracted<Option<Vec<Dependency>>> {
    let mut need = need;
    let mut pieces: Vec<(Idx, Idx, Charset)> = Vec::new();
    for seg in view.iter().filter(|s| seg_len(s, l) > 0) {
        match seg {
            Seg::Lit(set) => {
                if literal_hit(*set, x)? {
                    need = need.saturating_sub(1);
                }
            }
            Seg::Run { start, end, map, .. } => {
                let chars = map.preimage(x);
                if !chars.is_empty() {
                    pieces.push((*start, *end, chars));
                }
            }
        }
    }
    if need == 0 {
        return Ok(Some(Vec::new()));
    }

    // Join runs that are adjacent in the input word.
    'join: loop {
        for i in 0..pieces.len() {
            for j in 0..pieces.len() {
                if i != j && pieces[i].1 == pieces[j].0 && pieces[i].2 == pieces[j].2 {
                    pieces[i].1 = pieces[j].1;
                    pieces.remove(j);
                    continue 'join;
                }
            }
        }
        break;
    }

    let Some(&(start, end, chars)) = pieces.first() else {
        return Ok(None);
    };
    if pieces.iter().any(|p| *p != (start, end, chars)) {
        return Err(Uncountable);
    }
    let count = need.div_ceil(pieces.len());
    Ok(Some(vec![if is_whole(start, end) {
        Dependency::ContainsAtLeast { count, chars }
    } else {
        Dependency::RangeContainsAtLeast { from: start, to: end, count, chars }
    }]))
}

/// `=NX`, `(X`, `)X`
fn check_position(view: &[Seg], target: Target, x: Charset, l: usize) -> Extracted<Option<Outcome>> {
    let Some((v, idx)) = cells(view, &[target], l) else {
        return Ok(None);
    };
    let deps = match &v[idx[0]] {
        Seg::Lit(set) => {
            if !literal_hit(*set, x)? {
                return Ok(None);
            }
            Vec::new()
        }
        Seg::Run { start, map, rev, end } => {
            let at = if *rev { backward(*end, 1) } else { *start };
            let chars = map.preimage(x);
            if chars.is_empty() {
                return Ok(None);
            }
            vec![Dependency::CharAtPositionIn { pos: position(at), chars }]
        }
    };
    Ok(Some(Outcome { view: view.to_vec(), deps }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Style;
    use crate::engine::dependency::Status;
    use crate::engine::mangle::Mangler;
    use crate::engine::parser::parse_line;

    fn small(style: Style) -> Config {
        Config { max_password_length: 8, min_cut_length: 9, ..Config::for_style(style) }
    }

    fn words() -> Vec<&'static str> {
        vec![
            "", "a", "1", "ab", "a1", "1a", "abc", "aB1", "pass", "Pass1", "p4ss", "1234", "abcde", "hello1", "a1b2c3",
            "Zz9 zZ", "password", "12345678", "aaaa1111",
        ]
    }

    /// The dependencies must count exactly what the forward engine emits.
    fn check_conservation(rules: &[&str], config: &Config) {
        for raw in rules {
            for subrule in parse_line(raw, config).unwrap() {
                let dep = extract(&subrule, &[], config).unwrap_or_else(|| panic!("{:?} uncountable", raw));
                let mangler = Mangler::new(&subrule, config);
                for word in words() {
                    assert_eq!(
                        dep.count_word(word.as_bytes()),
                        mangler.count(word.as_bytes()),
                        "rule {:?} on {:?}: {}",
                        raw,
                        word,
                        dep
                    );
                }
            }
        }
    }

    #[test]
    fn jtr_counts_match_forward_engine() {
        let rules = vec![
            ":", "l", "c $1", "$[0-9]", "<5", ">3", "_4", "!1", "/1", "%21", "=1a", "(p", ")1", "c /1", "d /1",
            "r (1", "r )p", "$1 )1", "^1 (1", "\\[ (a", "] )c", "D1 =1c", "'3 )c", "x13 (b", "O12 <3", "T0 (P",
            "u !A", "sa4 /4", "o0x (x", "{ )a", "} (1", "k (b", "K )1", "z2 <6", "Z1 )1", "y2 (a", "Y2 )1",
            "i1x =1x", "A1\"zz\" %2z", "f )a", ".1 =1b", ",1 =1a", "<5 >2 /?d", "-8 :", "q $1", "E $1",
            "d <9", "$1 $2 $3 <4",
        ];
        check_conservation(&rules, &small(Style::Jtr));
    }

    #[test]
    fn hashcat_counts_match_forward_engine() {
        let rules = vec![
            ":", "c", "p2 <7", "x12 (b", "*01 (b", "+0 (b", "-1 =1`", "L0 <3", "i9x /x", "O02 >1", "y9 <5",
            "$e )e", "%2a", "p1 )a",
        ];
        check_conservation(&rules, &small(Style::Hashcat));
    }

    #[test]
    fn unconstrained_subrules_are_satisfied() {
        let config = Config::jtr();
        let cases: Vec<(&str, Status, u64)> = vec![
            ("c $1", Status::Satisfied, 1),
            ("$[0-9]", Status::Satisfied, 10),
            ("A0\"[a-z][A-Z]\"", Status::Satisfied, 676),
            ("/?d", Status::Active, 1),
            ("-8", Status::Rejected, 1),
        ];
        for (raw, status, coef) in cases {
            let subrule = &parse_line(raw, &config).unwrap()[0];
            let dep = extract(subrule, &[], &config).unwrap();
            assert_eq!(dep.status(), status, "rule {:?}: {}", raw, dep);
            assert_eq!(dep.coef(), coef, "rule {:?}", raw);
        }
    }

    #[test]
    fn some_subrules_are_uncountable() {
        let config = Config::jtr();
        let cases: Vec<&str> = vec!["M l Q", "$[0-9] /1", "D1 /a", "q /a", "@a <3", "Tm"];
        for raw in cases {
            let subrule = &parse_line(raw, &config).unwrap()[0];
            assert!(extract(subrule, &[], &config).is_none(), "rule {:?}", raw);
        }
    }

    #[test]
    fn policy_primitives_are_appended() {
        let config = Config::jtr();
        let subrule = &parse_line(":", &config).unwrap()[0];
        let dep = extract(subrule, &[Primitive::RejectLen(crate::LenCmp::Greater, Pos::Num(3))], &config).unwrap();
        assert_eq!(dep.count_word(b"abc"), 0);
        assert_eq!(dep.count_word(b"abcd"), 1);
    }
}
