//! Forward mangling: apply a subrule to a concrete word.
//!
//! This is the reference semantics for every primitive. The inverter and the
//! dependency extractor are symbolic versions of what happens here, and the
//! scan falls back to this module whenever they give up (enumeration files,
//! counting uncountable rules, checking special-memory matches).
//!
//! A subrule with set-valued parameters (`$[0-9]`) stands for one candidate per
//! member; [`Mangler::new`] expands those once into concrete programs so that
//! applying a rule to a whole wordlist does not redo the expansion per word.

use crate::config::{Config, Style};
use crate::engine::charset::{self, Charset};
use crate::engine::english::Morph;
use crate::{Pos, Primitive, Subrule};
use itertools::Itertools;

/// A subrule prepared for repeated application.
#[derive(Debug, Clone)]
pub struct Mangler<'c> {
    config: &'c Config,
    programs: Vec<Vec<Primitive>>,
}

/// Mutable state of one application.
struct State {
    word: Vec<u8>,
    memory: Vec<u8>,
    vars: [usize; 11],
    /// Position of the character last found by `/` or `%`.
    found: usize,
}

impl<'c> Mangler<'c> {
    pub fn new(subrule: &Subrule, config: &'c Config) -> Self {
        Mangler::from_primitives(&subrule.primitives, config)
    }

    pub fn from_primitives(primitives: &[Primitive], config: &'c Config) -> Self {
        let mut programs: Vec<Vec<Primitive>> = vec![Vec::new()];
        for prim in primitives {
            let variants = concrete_variants(prim);
            programs = programs
                .iter()
                .cartesian_product(variants.iter())
                .map(|(program, variant)| {
                    let mut next = program.clone();
                    next.push(variant.clone());
                    next
                })
                .collect();
        }
        Mangler { config, programs }
    }

    /// Every candidate `word` yields, in program order; rejected programs are
    /// skipped.
    pub fn apply(&self, word: &[u8]) -> Vec<Vec<u8>> {
        self.programs.iter().filter_map(|program| self.run(program, word)).collect()
    }

    /// Number of candidates `word` yields.
    pub fn count(&self, word: &[u8]) -> u64 {
        self.programs.iter().filter(|program| self.run(program, word).is_some()).count() as u64
    }

    /// Whether some candidate of `word` equals `target`.
    pub fn produces(&self, word: &[u8], target: &[u8]) -> bool {
        self.programs.iter().any(|program| self.run(program, word).is_some_and(|out| out == target))
    }

    fn run(&self, program: &[Primitive], word: &[u8]) -> Option<Vec<u8>> {
        let mut state = State {
            word: word.to_vec(),
            memory: match self.config.style {
                Style::Jtr => word.to_vec(),
                Style::Hashcat => Vec::new(),
            },
            vars: [0; 11],
            found: 0,
        };
        for prim in program {
            step(prim, &mut state, self.config)?;
        }
        Some(state.word)
    }
}

/// One primitive per member of its set-valued parameters.
fn concrete_variants(prim: &Primitive) -> Vec<Primitive> {
    let single = |set: &Charset| set.iter().map(Charset::single).collect::<Vec<_>>();
    match prim {
        Primitive::Append(set) if set.len() > 1 => single(set).into_iter().map(Primitive::Append).collect(),
        Primitive::Prepend(set) if set.len() > 1 => single(set).into_iter().map(Primitive::Prepend).collect(),
        Primitive::Insert(n, set) if set.len() > 1 => {
            single(set).into_iter().map(|s| Primitive::Insert(*n, s)).collect()
        }
        Primitive::InsertString(n, chars) if chars.iter().any(|c| c.len() > 1) => chars
            .iter()
            .map(single)
            .multi_cartesian_product()
            .map(|picked| Primitive::InsertString(*n, picked))
            .collect(),
        other => vec![other.clone()],
    }
}

fn resolve(pos: Pos, state: &State) -> usize {
    match pos {
        Pos::Num(n) => n,
        Pos::Infinite => usize::MAX,
        Pos::Runtime(b'm') => state.memory.len().saturating_sub(1),
        Pos::Runtime(b'p') => state.found,
        Pos::Runtime(v @ b'a'..=b'k') => state.vars[(v - b'a') as usize],
        Pos::Runtime(_) => usize::MAX,
    }
}

fn byte_of(set: &Charset) -> u8 {
    set.first().unwrap_or(b' ')
}

fn map_all(word: &mut [u8], map: &charset::CharMap) {
    map.apply_all(word);
}

fn title_case(word: &mut [u8], separators: Charset) {
    charset::LOWER.apply_all(word);
    for i in 0..word.len() {
        if i == 0 || separators.contains(word[i - 1]) {
            word[i] = word[i].to_ascii_uppercase();
        }
    }
}

/// Apply one concrete primitive; `None` rejects the candidate.
fn step(prim: &Primitive, state: &mut State, config: &Config) -> Option<()> {
    let n = state.word.len();
    let jtr = config.style == Style::Jtr;
    let mut grown: Option<Vec<u8>> = None;
    let w = &mut state.word;

    match prim {
        Primitive::Noop => {}
        Primitive::Lower => map_all(w, &charset::LOWER),
        Primitive::Upper => map_all(w, &charset::UPPER),
        Primitive::Capitalize => {
            map_all(w, &charset::LOWER);
            if let Some(first) = w.first_mut() {
                *first = first.to_ascii_uppercase();
            }
        }
        Primitive::InvCapitalize => {
            map_all(w, &charset::UPPER);
            if let Some(first) = w.first_mut() {
                *first = first.to_ascii_lowercase();
            }
        }
        Primitive::ToggleAll => map_all(w, &charset::TOGGLE),
        Primitive::Reverse => w.reverse(),
        Primitive::Duplicate => grown = Some(w.repeat(2)),
        Primitive::Reflect => grown = Some(w.iter().chain(w.iter().rev()).copied().collect()),
        Primitive::RotateLeft if n > 0 => w.rotate_left(1),
        Primitive::RotateRight if n > 0 => w.rotate_right(1),
        Primitive::DeleteFirst if n > 0 => {
            w.remove(0);
        }
        Primitive::DeleteLast => {
            w.pop();
        }
        Primitive::DupEach => grown = Some(w.iter().flat_map(|b| [*b, *b]).collect()),
        Primitive::SwapFront if n >= 2 => w.swap(0, 1),
        Primitive::SwapBack if n >= 2 => w.swap(n - 2, n - 1),
        Primitive::TitleSpace => title_case(w, Charset::single(b' ')),
        Primitive::TitleSep(seps) => title_case(w, *seps),
        Primitive::Pluralize => grown = Some(Morph::Plural.apply(w)),
        Primitive::PastTense => grown = Some(Morph::Past.apply(w)),
        Primitive::Gerund => grown = Some(Morph::Gerund.apply(w)),
        Primitive::ShiftCase => map_all(w, &charset::SHIFT),
        Primitive::VowelsLower => map_all(w, &charset::VOWELS),
        Primitive::KeyRight => map_all(w, &charset::KEY_RIGHT),
        Primitive::KeyLeft => map_all(w, &charset::KEY_LEFT),
        Primitive::Memorize => state.memory = w.clone(),
        Primitive::RejectUnchanged => {
            if *w == state.memory {
                return None;
            }
        }
        Primitive::AppendMemory => grown = Some([w.as_slice(), state.memory.as_slice()].concat()),
        Primitive::PrependMemory => grown = Some([state.memory.as_slice(), w.as_slice()].concat()),

        Primitive::Append(x) => grown = Some([w.as_slice(), &[byte_of(x)]].concat()),
        Primitive::Prepend(x) => grown = Some([&[byte_of(x)], w.as_slice()].concat()),
        Primitive::ToggleAt(p) => {
            let i = resolve(*p, state);
            if i < n {
                state.word[i] = charset::TOGGLE.apply(state.word[i]);
            }
        }
        Primitive::Truncate(p) => {
            let i = resolve(*p, state);
            if n > i {
                state.word.truncate(i);
            }
        }
        Primitive::DeleteAt(p) => {
            let i = resolve(*p, state);
            if i < n {
                state.word.remove(i);
            }
        }
        Primitive::DupWord(p) => {
            let k = resolve(*p, state);
            if k.saturating_add(1).saturating_mul(n) <= config.max_password_length {
                grown = Some(state.word.repeat(k.saturating_add(1)));
            }
        }
        Primitive::DupFirst(p) => {
            let k = resolve(*p, state);
            if let Some(&first) = state.word.first() {
                if n.saturating_add(k) <= config.max_password_length {
                    let mut out = vec![first; k];
                    out.extend_from_slice(&state.word);
                    grown = Some(out);
                }
            }
        }
        Primitive::DupLast(p) => {
            let k = resolve(*p, state);
            if let Some(&last) = state.word.last() {
                if n.saturating_add(k) <= config.max_password_length {
                    let mut out = state.word.clone();
                    out.extend(std::iter::repeat_n(last, k));
                    grown = Some(out);
                }
            }
        }
        Primitive::BitLeft(p) => point_map(state, *p, &charset::BIT_LEFT),
        Primitive::BitRight(p) => point_map(state, *p, &charset::BIT_RIGHT),
        Primitive::Increment(p) => point_map(state, *p, &charset::INCREMENT),
        Primitive::Decrement(p) => point_map(state, *p, &charset::DECREMENT),
        Primitive::ReplaceNext(p) => {
            let i = resolve(*p, state);
            if i.saturating_add(1) < n {
                state.word[i] = state.word[i + 1];
            }
        }
        Primitive::ReplacePrev(p) => {
            let i = resolve(*p, state);
            if i >= 1 && i < n {
                state.word[i] = state.word[i - 1];
            }
        }
        Primitive::DupBlockFront(p) => {
            let k = resolve(*p, state);
            if k <= n {
                grown = Some([&state.word[..k], state.word.as_slice()].concat());
            }
        }
        Primitive::DupBlockBack(p) => {
            let k = resolve(*p, state);
            if k <= n {
                grown = Some([state.word.as_slice(), &state.word[n - k..]].concat());
            }
        }

        Primitive::Insert(p, x) => {
            let i = resolve(*p, state);
            let at = if jtr { Some(i.min(n)) } else { (i <= n).then_some(i) };
            if let Some(at) = at {
                let mut out = state.word.clone();
                out.insert(at, byte_of(x));
                grown = Some(out);
            }
        }
        Primitive::Overwrite(p, x) => {
            let i = resolve(*p, state);
            if i < n {
                state.word[i] = *x;
            }
        }
        Primitive::DeleteRange(p, q) => {
            let (i, m) = (resolve(*p, state), resolve(*q, state));
            if i.saturating_add(m) <= n {
                state.word.drain(i..i + m);
            }
        }
        Primitive::Extract(p, q) => {
            let (i, m) = (resolve(*p, state), resolve(*q, state));
            if jtr {
                state.word = if i < n { state.word[i..i.saturating_add(m).min(n)].to_vec() } else { Vec::new() };
            } else if i.saturating_add(m) <= n {
                state.word = state.word[i..i + m].to_vec();
            }
        }
        Primitive::InsertString(p, chars) => {
            let at = resolve(*p, state).min(n);
            let mut out = state.word[..at].to_vec();
            out.extend(chars.iter().map(byte_of));
            out.extend_from_slice(&state.word[at..]);
            grown = Some(out);
        }
        Primitive::Swap(p, q) => {
            let (i, j) = (resolve(*p, state), resolve(*q, state));
            if i < n && j < n {
                state.word.swap(i, j);
            }
        }
        Primitive::ExtractMemory(p, q, r) => {
            let (i, m, at) = (resolve(*p, state), resolve(*q, state), resolve(*r, state));
            if i.saturating_add(m) <= state.memory.len() && at <= n {
                let mut out = state.word[..at].to_vec();
                out.extend_from_slice(&state.memory[i..i + m]);
                out.extend_from_slice(&state.word[at..]);
                grown = Some(out);
            }
        }
        Primitive::SetVar(v, p, q) => {
            let value = resolve(*p, state).checked_sub(resolve(*q, state))?;
            state.vars[(*v - b'a') as usize] = value;
        }
        Primitive::Mode(_) => return None,
        // `-<N` and `->N` compare against the attack's length limit, which a
        // plain wordlist run always meets.
        Primitive::Flag(flag) => {
            if flag.rejects() {
                return None;
            }
        }

        Primitive::RejectLen(cmp, p) => {
            let ok = match p {
                Pos::Infinite => cmp.holds_infinite(),
                other => cmp.holds(n, resolve(*other, state)),
            };
            if !ok {
                return None;
            }
        }
        Primitive::RejectIfContains(x) => {
            if state.word.iter().any(|b| x.contains(*b)) {
                return None;
            }
        }
        Primitive::RejectUnlessContains(x) => {
            state.found = state.word.iter().position(|b| x.contains(*b))?;
        }
        Primitive::RejectUnlessAt(p, x) => {
            let i = resolve(*p, state);
            if !state.word.get(i).is_some_and(|b| x.contains(*b)) {
                return None;
            }
        }
        Primitive::RejectUnlessFirst(x) => {
            if !state.word.first().is_some_and(|b| x.contains(*b)) {
                return None;
            }
        }
        Primitive::RejectUnlessLast(x) => {
            if !state.word.last().is_some_and(|b| x.contains(*b)) {
                return None;
            }
        }
        Primitive::RejectUnlessCount(p, x) => {
            let k = resolve(*p, state);
            let hits: Vec<usize> = state.word.iter().positions(|b| x.contains(*b)).collect();
            if hits.len() < k {
                return None;
            }
            if k > 0 {
                state.found = hits[k - 1];
            }
        }
        Primitive::Replace(x, y) => charset::CharMap::replace(*x, *y).apply_all(&mut state.word),
        Primitive::Purge(x) => state.word.retain(|b| !x.contains(*b)),

        // Guarded no-ops on words too short for the primitive.
        Primitive::RotateLeft | Primitive::RotateRight | Primitive::DeleteFirst | Primitive::SwapFront
        | Primitive::SwapBack => {}
    }

    if let Some(next) = grown {
        if next.len() <= config.max_password_length {
            state.word = next;
        }
    }
    Some(())
}

fn point_map(state: &mut State, p: Pos, map: &charset::CharMap) {
    let i = resolve(p, state);
    if i < state.word.len() {
        state.word[i] = map.apply(state.word[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser::parse_line;

    fn run(rule: &str, word: &str, config: &Config) -> Vec<String> {
        let subrules = parse_line(rule, config).unwrap();
        subrules
            .iter()
            .flat_map(|s| Mangler::new(s, config).apply(word.as_bytes()))
            .map(|w| String::from_utf8_lossy(&w).into_owned())
            .collect()
    }

    #[test]
    fn jtr_primitives() {
        let config = Config::jtr();
        let cases: Vec<(&str, &str, Vec<&str>)> = vec![
            (":", "pass", vec!["pass"]),
            ("c", "pASS", vec!["Pass"]),
            ("C", "pass", vec!["pASS"]),
            ("t T0", "PaSs", vec!["PAsS"]),
            ("d", "pass", vec!["passpass"]),
            ("f", "abc", vec!["abccba"]),
            ("{ }", "abc", vec!["abc"]),
            ("{", "abc", vec!["bca"]),
            ("\\[ ]", "abcd", vec!["bc"]),
            ("[ ]", "abcd", vec!["abcd"]),
            ("q", "ab", vec!["aabb"]),
            ("k K", "abcd", vec!["badc"]),
            ("$1 ^!", "pw", vec!["!pw1"]),
            ("$[12]", "pw", vec!["pw1", "pw2"]),
            ("'3", "password", vec!["pas"]),
            ("'9", "password", vec!["password"]),
            ("D1 D9", "abc", vec!["ac"]),
            ("i9!", "abc", vec!["abc!"]),
            ("o1X o9Y", "abc", vec!["aXc"]),
            ("O12", "abcd", vec!["ad"]),
            ("O35", "abcd", vec!["abcd"]),
            ("x12", "abcd", vec!["bc"]),
            ("x13", "abcd", vec!["bcd"]),
            ("x72", "abcd", vec![""]),
            ("Az\"12\"", "pw", vec!["pw12"]),
            ("A1\"[xy]\"", "pw", vec!["pxw", "pyw"]),
            ("sa4 se3", "abcde", vec!["4bcd3"]),
            ("s?d#", "a1b2", vec!["a#b#"]),
            ("@?d", "a1b2", vec!["ab"]),
            ("E", "hello WORLD", vec!["Hello World"]),
            ("e-", "jean-PAUL", vec!["Jean-Paul"]),
            ("p", "city", vec!["cities"]),
            ("P", "bag", vec!["bagged"]),
            ("I", "bake", vec!["baking"]),
            ("S", "Crack96", vec!["cRACK(^"]),
            ("V", "crack", vec!["CRaCK"]),
            ("z2 Z1", "ab", vec!["aaabb"]),
            (".1 ,3", "abcd", vec!["accc"]),
            ("<5", "pass", vec!["pass"]),
            ("<4", "pass", Vec::new()),
            (">3 _4", "pass", vec!["pass"]),
            ("/?d", "pass", Vec::new()),
            ("!?d", "pass", vec!["pass"]),
            ("=1a (p )s", "pass", vec!["pass"]),
            ("%2s", "pass", vec!["pass"]),
            ("%3s", "pass", Vec::new()),
            ("-8 :", "pass", Vec::new()),
            ("-c :", "pass", vec!["pass"]),
            ("1", "pass", Vec::new()),
        ];
        for (rule, word, expected) in cases {
            assert_eq!(run(rule, word, &config), expected, "rule {:?} on {:?}", rule, word);
        }
    }

    #[test]
    fn hashcat_primitives() {
        let config = Config::hashcat();
        let cases: Vec<(&str, &str, Vec<&str>)> = vec![
            ("p2", "ab", vec!["ababab"]),
            ("i5!", "abc", vec!["abc"]),
            ("i3!", "abc", vec!["abc!"]),
            ("x12", "abcd", vec!["bc"]),
            ("x14", "abcd", vec!["abcd"]),
            ("*03", "abcd", vec!["dbca"]),
            ("*09", "abcd", vec!["abcd"]),
            ("+0 -1", "bb", vec!["ca"]),
            ("L0", "!", vec!["B"]),
            ("R0", "B", vec!["!"]),
            ("y2", "abc", vec!["ababc"]),
            ("Y2", "abc", vec!["abcbc"]),
            ("y4", "abc", vec!["abc"]),
            ("<4", "pass", vec!["pass"]),
            (">5", "pass", Vec::new()),
            ("M $1 4", "ab", vec!["ab1ab"]),
            ("M $1 Q", "ab", vec!["ab1"]),
            ("M Q", "ab", Vec::new()),
            ("$e", "Someon", vec!["Someone"]),
        ];
        for (rule, word, expected) in cases {
            assert_eq!(run(rule, word, &config), expected, "rule {:?} on {:?}", rule, word);
        }
    }

    #[test]
    fn growth_past_limit_is_ignored() {
        let config = Config { max_password_length: 6, min_cut_length: 7, ..Config::jtr() };
        assert_eq!(run("d", "abcd", &config), vec!["abcd"]);
        assert_eq!(run("$1 $2 $3", "abcd", &config), vec!["abcd12"]);
        assert_eq!(run("d", "abc", &config), vec!["abcabc"]);
    }

    #[test]
    fn runtime_positions_use_state() {
        let config = Config::jtr();
        // `p` is the position found by `/`.
        assert_eq!(run("/b Dp", "abc", &config), vec!["ac"]);
        // `va` sets a = 3 - 1.
        assert_eq!(run("va31 Ta", "abcd", &config), vec!["abCd"]);
        // `m` is the last position of the memorized word.
        assert_eq!(run("M $x Dm", "ab", &config), vec!["ax"]);
    }

    #[test]
    fn mangler_counts_candidates() {
        let config = Config::jtr();
        let subrule = parse_line("$[0-9] /?l", &config).unwrap().remove(0);
        let mangler = Mangler::new(&subrule, &config);
        assert_eq!(mangler.apply(b"pw").len(), 10);
        assert_eq!(mangler.count(b"pw"), 10);
        assert_eq!(mangler.count(b"12"), 0);
        assert!(mangler.produces(b"pw", b"pw7"));
        assert!(!mangler.produces(b"pw", b"pw"));
    }
}
