//! Guess counting: how many candidates each rule emits over a wordlist.
//!
//! Countable rules never run. Their dependency lists are grouped into a few
//! dense histograms over word attributes (length, occurrences of a character
//! set, a set at a position, occurrences inside a range); one pass over the
//! wordlist fills the histograms and each list is then a box sum. Hashcat
//! counts are kept per (word batch, rule batch) cell, the granularity its
//! guess numbers are known at; there every distinct predicate is evaluated
//! once per word instead.
//!
//! Rules without dependencies are counted by running them forward.

use std::collections::HashMap;
use std::ops::Range;

use crate::config::{Config, Style};
use crate::engine::dependency::{Dependency, DependencyList, Idx, Status, SubruleDependency};
use crate::engine::mangle::Mangler;
use crate::engine::charset::Charset;
use crate::error::{Error, Result};
use crate::{Primitive, Rule};
use itertools::Itertools;

/// Cells per histogram before a new one is started.
pub const MATRIX_CELL_CAP: usize = 8 * 1024 * 1024;

const ACCEL: u32 = 512;
const MAX_RULE_BATCH: usize = 1024;

/// Rule batch size picked the way hashcat's autotuner picks kernel loops for
/// `rules` rules and a kernel accel of 512, clamped to `[1, 1024]`.
pub fn autotune_rule_batch(rules: usize) -> usize {
    let loops_orig = u32::try_from(rules).unwrap_or(u32::MAX);
    let diff = loops_orig.wrapping_sub(ACCEL);
    let mut loops = loops_orig;
    for f in 1..1024u32 {
        let accel_try = ACCEL * f;
        if accel_try > 1024 {
            break;
        }
        let loops_try = loops_orig / f;
        if loops_try.wrapping_sub(accel_try) > diff {
            break;
        }
        loops = loops_try;
    }
    (loops as usize).clamp(1, MAX_RULE_BATCH)
}

// --- Results ----------------------------------------------------------------

/// Position of a guess between the guesses before and after its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuessEstimate {
    pub estimate: u64,
    pub lower: u64,
    pub upper: u64,
}

/// Per-rule (JtR) or per-batch (hashcat) guess counts with their running
/// totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessCounts {
    style: Style,
    counts: Vec<u64>,
    /// Running totals of `counts` followed by a 0, so that the cell before the
    /// first one reads as 0.
    cumsum: Vec<u64>,
    word_count: usize,
    batch_size_of_words: usize,
    batch_size_of_rules: usize,
    words_per_batch: Vec<usize>,
    rules_per_batch: Vec<usize>,
}

impl GuessCounts {
    /// JtR counts: one per rule.
    pub fn per_rule(counts: Vec<u64>, word_count: usize) -> Self {
        let rules = counts.len();
        GuessCounts {
            style: Style::Jtr,
            cumsum: running_totals(&counts),
            counts,
            word_count,
            batch_size_of_words: word_count.max(1),
            batch_size_of_rules: 1,
            words_per_batch: vec![word_count],
            rules_per_batch: vec![1; rules],
        }
    }

    /// Hashcat counts, row-major over `[word batch][rule batch]`.
    pub fn batched(
        counts: Vec<u64>,
        word_count: usize,
        rule_count: usize,
        batch_size_of_words: usize,
        batch_size_of_rules: usize,
    ) -> Result<Self> {
        if batch_size_of_words == 0 || batch_size_of_rules == 0 {
            return Err(Error::Config("batch sizes must be positive".to_string()));
        }
        let words_per_batch = chunk_sizes(word_count, batch_size_of_words);
        let rules_per_batch = chunk_sizes(rule_count, batch_size_of_rules);
        if counts.len() != words_per_batch.len() * rules_per_batch.len() {
            return Err(Error::Cache(format!(
                "{} counts for {} word batches and {} rule batches",
                counts.len(),
                words_per_batch.len(),
                rules_per_batch.len()
            )));
        }
        Ok(GuessCounts {
            style: Style::Hashcat,
            cumsum: running_totals(&counts),
            counts,
            word_count,
            batch_size_of_words,
            batch_size_of_rules,
            words_per_batch,
            rules_per_batch,
        })
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn cumsum(&self) -> &[u64] {
        &self.cumsum
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn rule_count(&self) -> usize {
        self.rules_per_batch.iter().sum()
    }

    pub fn batch_size_of_words(&self) -> usize {
        self.batch_size_of_words
    }

    pub fn batch_size_of_rules(&self) -> usize {
        self.batch_size_of_rules
    }

    /// Total guesses made by the configuration.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Estimated guess number of the word at `word_idx` under rule `rule_idx`.
    pub fn estimate(&self, word_idx: usize, rule_idx: usize) -> Option<GuessEstimate> {
        if word_idx >= self.word_count {
            return None;
        }
        match self.style {
            Style::Jtr => {
                let count = *self.counts.get(rule_idx)?;
                let (lower, upper) = self.bounds(rule_idx);
                let part = scale(count, word_idx as u128 + 1, self.word_count as u128);
                Some(GuessEstimate { estimate: lower + part, lower, upper })
            }
            Style::Hashcat => {
                let wb = word_idx / self.batch_size_of_words;
                let rb = rule_idx / self.batch_size_of_rules;
                let rules_in_rb = *self.rules_per_batch.get(rb)?;
                let words_in_wb = *self.words_per_batch.get(wb)?;
                let cell = wb * self.rules_per_batch.len() + rb;
                let count = *self.counts.get(cell)?;
                let (lower, upper) = self.bounds(cell);
                let within_words = (word_idx % self.batch_size_of_words) as u128;
                let within_rules = (rule_idx % self.batch_size_of_rules) as u128 + 1;
                let part_words = scale(count, within_words, words_in_wb as u128);
                let part_rules = scale(count, within_rules, words_in_wb as u128 * rules_in_rb as u128);
                Some(GuessEstimate { estimate: lower + part_words + part_rules, lower, upper })
            }
        }
    }

    fn bounds(&self, cell: usize) -> (u64, u64) {
        let lower = match cell {
            0 => self.cumsum.last().copied().unwrap_or(0),
            _ => self.cumsum[cell - 1],
        };
        (lower, self.cumsum[cell])
    }

    /// Text form stored in the work directory (`saved_counts`).
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("style {}\n", self.style.name()));
        out.push_str(&format!("words {}\n", self.word_count));
        out.push_str(&format!("rules {}\n", self.rule_count()));
        out.push_str(&format!("batch_size_of_words {}\n", self.batch_size_of_words));
        out.push_str(&format!("batch_size_of_rules {}\n", self.batch_size_of_rules));
        out.push_str(&format!("counts {}\n", self.counts.iter().join(" ")));
        out
    }

    pub fn decode(text: &str) -> Result<Self> {
        let mut fields: HashMap<&str, &str> = HashMap::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            fields.insert(key, value);
        }
        let field = |key: &str| fields.get(key).copied().ok_or_else(|| Error::Cache(format!("saved counts lack {}", key)));
        let number = |key: &str| -> Result<usize> {
            field(key)?.trim().parse().map_err(|_| Error::Cache(format!("saved counts: bad {}", key)))
        };
        let counts = field("counts")?
            .split_whitespace()
            .map(|c| c.parse::<u64>().map_err(|_| Error::Cache(format!("saved counts: bad count {:?}", c))))
            .collect::<Result<Vec<u64>>>()?;
        let style = Style::from_nickname(field("style")?.trim())
            .ok_or_else(|| Error::Cache("saved counts: unknown style".to_string()))?;
        let word_count = number("words")?;
        match style {
            Style::Jtr => Ok(GuessCounts::per_rule(counts, word_count)),
            Style::Hashcat => GuessCounts::batched(
                counts,
                word_count,
                number("rules")?,
                number("batch_size_of_words")?,
                number("batch_size_of_rules")?,
            ),
        }
    }

    /// Text form of the running totals (`saved_cumsum`).
    pub fn encode_cumsum(&self) -> String {
        format!("{}\n", self.cumsum.iter().join(" "))
    }
}

/// `count · num / den`, rounded down.
fn scale(count: u64, num: u128, den: u128) -> u64 {
    if den == 0 {
        return 0;
    }
    u64::try_from(count as u128 * num / den).unwrap_or(u64::MAX)
}

fn running_totals(counts: &[u64]) -> Vec<u64> {
    let mut cumsum: Vec<u64> = counts
        .iter()
        .scan(0u64, |acc, c| {
            *acc = acc.saturating_add(*c);
            Some(*acc)
        })
        .collect();
    cumsum.push(0);
    cumsum
}

fn chunk_sizes(total: usize, size: usize) -> Vec<usize> {
    let mut out = vec![size; total / size];
    if total % size != 0 || total == 0 {
        out.push(total % size);
    }
    out
}

// --- Entry point ------------------------------------------------------------

/// Count every rule over `words`. `extra` (the password policy) is appended
/// to rules counted forward; extracted dependencies already include it.
pub fn count_rules(words: &[Vec<u8>], rules: &[Rule], extra: &[Primitive], config: &Config) -> Result<GuessCounts> {
    count_rules_with(words, rules, extra, config, &[])
}

/// [`count_rules`] with per-rule counts already known from enumeration
/// (`known[i]`, JtR only); those rules are not counted again.
pub(crate) fn count_rules_with(
    words: &[Vec<u8>],
    rules: &[Rule],
    extra: &[Primitive],
    config: &Config,
    known: &[Option<u64>],
) -> Result<GuessCounts> {
    let counts = match config.style {
        Style::Jtr => GuessCounts::per_rule(count_jtr(words, rules, extra, config, known), words.len()),
        Style::Hashcat => count_hashcat(words, rules, extra, config)?,
    };
    debug_trace!(config, "[count] {} rules over {} words, total {}", rules.len(), words.len(), counts.total());
    Ok(counts)
}

fn forward_manglers<'c>(rule: &Rule, extra: &[Primitive], config: &'c Config) -> Vec<Mangler<'c>> {
    rule.subrules
        .iter()
        .map(|s| {
            let program: Vec<Primitive> = s.primitives.iter().chain(extra).cloned().collect();
            Mangler::from_primitives(&program, config)
        })
        .collect()
}

fn count_forward(manglers: &[Mangler<'_>], words: &[Vec<u8>]) -> u64 {
    words.iter().map(|w| manglers.iter().map(|m| m.count(w)).sum::<u64>()).sum()
}

// --- JtR histograms -----------------------------------------------------------

/// What a histogram dimension measures on a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Attribute {
    Length,
    Chars(Charset),
    CharAt(isize, Charset),
    Range(Idx, Idx, Charset),
}

impl Attribute {
    fn of(dep: &Dependency) -> Attribute {
        match dep {
            Dependency::LengthLess(_) | Dependency::LengthGreater(_) => Attribute::Length,
            Dependency::ContainsFewerThan { chars, .. } | Dependency::ContainsAtLeast { chars, .. } => {
                Attribute::Chars(*chars)
            }
            Dependency::CharAtPositionIn { pos, chars } => Attribute::CharAt(*pos, *chars),
            Dependency::RangeContainsExactly { from, to, chars, .. }
            | Dependency::RangeContainsAtLeast { from, to, chars, .. } => Attribute::Range(*from, *to, *chars),
        }
    }

    /// Buckets needed to decide `dep`; the last bucket holds every larger
    /// value.
    fn dim_for(dep: &Dependency, max_len: usize) -> usize {
        match dep {
            Dependency::LengthLess(_) | Dependency::LengthGreater(_) => max_len + 1,
            Dependency::ContainsFewerThan { count, .. } | Dependency::ContainsAtLeast { count, .. } => count + 1,
            Dependency::CharAtPositionIn { .. } => 2,
            Dependency::RangeContainsExactly { count, .. } | Dependency::RangeContainsAtLeast { count, .. } => {
                count + 2
            }
        }
    }

    fn value(&self, word: &[u8], dim: usize) -> usize {
        let occurrences = |bytes: &[u8], chars: &Charset| bytes.iter().filter(|b| chars.contains(**b)).count();
        let value = match self {
            Attribute::Length => word.len(),
            Attribute::Chars(chars) => occurrences(word, chars),
            Attribute::CharAt(pos, chars) => {
                usize::from(Dependency::CharAtPositionIn { pos: *pos, chars: *chars }.holds(word))
            }
            Attribute::Range(from, to, chars) => match (from.resolve(word.len()), to.resolve(word.len())) {
                (Some(lo), Some(hi)) if lo <= hi => occurrences(&word[lo..hi], chars),
                _ => 0,
            },
        };
        value.min(dim - 1)
    }
}

/// A dense histogram of the wordlist over a few attributes.
#[derive(Debug)]
struct CountMatrix {
    dims: Vec<(Attribute, usize)>,
    strides: Vec<usize>,
    cells: Vec<u64>,
}

impl CountMatrix {
    fn new(dims: Vec<(Attribute, usize)>) -> Self {
        let mut strides = vec![1usize; dims.len()];
        for d in (0..dims.len().saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * dims[d + 1].1;
        }
        let size = cell_count(&dims);
        CountMatrix { dims, strides, cells: vec![0; size] }
    }

    fn covers(&self, list: &DependencyList, max_len: usize) -> bool {
        covered(&self.dims, list, max_len)
    }

    fn add(&mut self, word: &[u8]) {
        let index: usize =
            self.dims.iter().zip(&self.strides).map(|((attr, dim), stride)| attr.value(word, *dim) * stride).sum();
        self.cells[index] += 1;
    }

    /// The box of cells where every dependency of `list` holds.
    fn slice(&self, list: &DependencyList) -> Vec<Range<usize>> {
        let mut ranges: Vec<Range<usize>> = self.dims.iter().map(|(_, dim)| 0..*dim).collect();
        for dep in list.deps() {
            let Some(d) = self.dims.iter().position(|(attr, _)| *attr == Attribute::of(dep)) else {
                continue;
            };
            let r = &mut ranges[d];
            match dep {
                Dependency::LengthLess(n) | Dependency::ContainsFewerThan { count: n, .. } => r.end = r.end.min(*n),
                Dependency::LengthGreater(n) => r.start = r.start.max(n + 1),
                Dependency::ContainsAtLeast { count, .. } | Dependency::RangeContainsAtLeast { count, .. } => {
                    r.start = r.start.max(*count)
                }
                Dependency::RangeContainsExactly { count, .. } => {
                    r.start = r.start.max(*count);
                    r.end = r.end.min(count + 1);
                }
                Dependency::CharAtPositionIn { .. } => r.start = r.start.max(1),
            }
        }
        ranges
    }

    fn box_sum(&self, ranges: &[Range<usize>]) -> u64 {
        if ranges.iter().any(|r| r.start >= r.end) {
            return 0;
        }
        self.sum_from(0, 0, ranges)
    }

    fn sum_from(&self, d: usize, base: usize, ranges: &[Range<usize>]) -> u64 {
        if d == ranges.len() {
            return self.cells[base];
        }
        ranges[d].clone().map(|i| self.sum_from(d + 1, base + i * self.strides[d], ranges)).sum()
    }
}

fn cell_count(dims: &[(Attribute, usize)]) -> usize {
    dims.iter().fold(1usize, |acc, (_, dim)| acc.saturating_mul(*dim))
}

fn covered(dims: &[(Attribute, usize)], list: &DependencyList, max_len: usize) -> bool {
    list.deps().iter().all(|dep| {
        let attr = Attribute::of(dep);
        dims.iter().any(|(a, dim)| *a == attr && *dim >= Attribute::dim_for(dep, max_len))
    })
}

/// `dims` widened to decide every dependency of `list`.
fn widened(dims: &[(Attribute, usize)], list: &DependencyList, max_len: usize) -> Vec<(Attribute, usize)> {
    let mut out = dims.to_vec();
    for dep in list.deps() {
        let attr = Attribute::of(dep);
        let need = Attribute::dim_for(dep, max_len);
        match out.iter_mut().find(|(a, _)| *a == attr) {
            Some((_, dim)) => *dim = (*dim).max(need),
            None => out.push((attr, need)),
        }
    }
    out
}

/// Group the active lists into histograms, busiest attributes first. Returns
/// the histograms and, per list, the histogram it is read from.
fn build_matrices(lists: &[&DependencyList], config: &Config) -> (Vec<CountMatrix>, Vec<usize>) {
    let max_len = config.max_password_length;
    let mut occurrence: HashMap<Attribute, usize> = HashMap::new();
    for dep in lists.iter().flat_map(|l| l.deps()) {
        *occurrence.entry(Attribute::of(dep)).or_default() += 1;
    }
    let priority = |list: &DependencyList| -> (usize, usize) {
        (list.deps().iter().map(|d| occurrence[&Attribute::of(d)]).sum(), list.deps().len())
    };
    let order: Vec<usize> =
        (0..lists.len()).sorted_by_key(|i| priority(lists[*i])).rev().collect();

    let mut matrices: Vec<CountMatrix> = Vec::new();
    let mut current: Vec<(Attribute, usize)> = Vec::new();
    let mut assignment = vec![0usize; lists.len()];
    for i in order {
        let list = lists[i];
        if let Some(m) = matrices.iter().position(|m| m.covers(list, max_len)) {
            assignment[i] = m;
            continue;
        }
        let next = widened(&current, list, max_len);
        if !current.is_empty() && cell_count(&next) > MATRIX_CELL_CAP {
            matrices.push(CountMatrix::new(std::mem::take(&mut current)));
            current = widened(&current, list, max_len);
        } else {
            current = next;
        }
        assignment[i] = matrices.len();
    }
    if !current.is_empty() {
        matrices.push(CountMatrix::new(current));
    }
    debug_trace!(
        config,
        "[count] {} lists in {} histograms ({} cells)",
        lists.len(),
        matrices.len(),
        matrices.iter().map(|m| m.cells.len()).sum::<usize>()
    );
    (matrices, assignment)
}

/// Candidates of a subrule given how many words pass each active list.
fn subrule_count(dep: &SubruleDependency, words: u64, mut active: impl FnMut(&DependencyList) -> u64) -> u64 {
    let lists_total: u64 = match dep.status() {
        Status::Rejected => return 0,
        _ => dep
            .lists()
            .iter()
            .map(|list| match list.status() {
                Status::Satisfied => list.coef() * words,
                Status::Rejected => 0,
                Status::Active => list.coef() * active(list),
            })
            .sum(),
    };
    lists_total.saturating_mul(dep.coef())
}

fn count_jtr(words: &[Vec<u8>], rules: &[Rule], extra: &[Primitive], config: &Config, known: &[Option<u64>]) -> Vec<u64> {
    let active: Vec<&DependencyList> = rules
        .iter()
        .filter_map(|r| r.dependencies.as_ref())
        .flatten()
        .flat_map(|s| s.lists())
        .filter(|l| l.is_active())
        .collect();
    let (mut matrices, assignment) = build_matrices(&active, config);
    for word in words {
        for matrix in matrices.iter_mut() {
            matrix.add(word);
        }
    }
    // Box sums in the order the lists were collected; `subrule_count` asks
    // for active lists in that same order.
    let mut sums = active
        .iter()
        .zip(&assignment)
        .map(|(list, m)| matrices[*m].box_sum(&matrices[*m].slice(list)))
        .collect::<Vec<u64>>()
        .into_iter();

    let total_words = words.len() as u64;
    rules
        .iter()
        .enumerate()
        .map(|(i, rule)| match (&rule.dependencies, known.get(i).copied().flatten()) {
            (Some(deps), _) => {
                deps.iter().map(|dep| subrule_count(dep, total_words, |_| sums.next().unwrap_or(0))).sum()
            }
            (None, Some(count)) => count,
            (None, None) => count_forward(&forward_manglers(rule, extra, config), words),
        })
        .collect()
}

// --- Hashcat batches ------------------------------------------------------------

/// An active list, as indexes into the distinct predicates.
struct IndexedList {
    deps: Vec<usize>,
    weight: u64,
    rule_batch: usize,
}

fn count_hashcat(words: &[Vec<u8>], rules: &[Rule], extra: &[Primitive], config: &Config) -> Result<GuessCounts> {
    let bw = config.batch_size_of_words;
    let br = config.batch_size_of_rules.unwrap_or_else(|| autotune_rule_batch(rules.len()));
    debug_trace!(config, "[count] hashcat batches: {} words, {} rules", bw, br);
    let rule_batches = chunk_sizes(rules.len(), br).len();

    let mut distinct: Vec<&Dependency> = Vec::new();
    let mut index: HashMap<&Dependency, usize> = HashMap::new();
    let mut lists: Vec<IndexedList> = Vec::new();
    let mut satisfied = vec![0u64; rule_batches];
    let mut forward: Vec<(usize, Vec<Mangler<'_>>)> = Vec::new();

    for (r, rule) in rules.iter().enumerate() {
        let rb = r / br;
        let Some(deps) = &rule.dependencies else {
            forward.push((rb, forward_manglers(rule, extra, config)));
            continue;
        };
        for dep in deps {
            satisfied[rb] += subrule_count(dep, 1, |_| 0);
            if !dep.is_active() {
                continue;
            }
            for list in dep.lists().iter().filter(|l| l.is_active()) {
                let ids = list
                    .deps()
                    .iter()
                    .map(|d| {
                        *index.entry(d).or_insert_with(|| {
                            distinct.push(d);
                            distinct.len() - 1
                        })
                    })
                    .collect();
                lists.push(IndexedList { deps: ids, weight: list.coef() * dep.coef(), rule_batch: rb });
            }
        }
    }

    let word_batches = chunk_sizes(words.len(), bw).len();
    let mut counts = vec![0u64; word_batches * rule_batches];
    let mut holds = vec![false; distinct.len()];
    for (w, word) in words.iter().enumerate() {
        let row = (w / bw) * rule_batches;
        for (slot, dep) in holds.iter_mut().zip(&distinct) {
            *slot = dep.holds(word);
        }
        for (rb, n) in satisfied.iter().enumerate() {
            counts[row + rb] += n;
        }
        for list in &lists {
            if list.deps.iter().all(|d| holds[*d]) {
                counts[row + list.rule_batch] += list.weight;
            }
        }
        for (rb, manglers) in &forward {
            counts[row + rb] += manglers.iter().map(|m| m.count(word)).sum::<u64>();
        }
    }
    GuessCounts::batched(counts, words.len(), rules.len(), bw, br)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::extract::extract_rule;
    use crate::engine::feasibility::classify;
    use crate::engine::parser::parse_line;

    fn rules(raws: &[&str], config: &Config) -> Vec<Rule> {
        raws.iter()
            .map(|raw| {
                let subrules = parse_line(raw, config).unwrap();
                let feasibility = classify(raw, &subrules, config);
                let dependencies = extract_rule(raw, &subrules, &[], config);
                Rule { raw: raw.to_string(), subrules, feasibility, dependencies }
            })
            .collect()
    }

    fn words(list: &[&str]) -> Vec<Vec<u8>> {
        list.iter().map(|w| w.as_bytes().to_vec()).collect()
    }

    fn forward_counts(words: &[Vec<u8>], rules: &[Rule], config: &Config) -> Vec<u64> {
        rules.iter().map(|r| count_forward(&forward_manglers(r, &[], config), words)).collect()
    }

    #[test]
    fn five_words_two_rules() {
        let config = Config::jtr();
        let words = words(&["pass", "word", "abcd", "1234", "qwer"]);
        let counts = count_rules(&words, &rules(&[":", "$1"], &config), &[], &config).unwrap();
        assert_eq!(counts.counts(), &[5, 5]);
        assert_eq!(counts.cumsum(), &[5, 10, 0]);
        assert_eq!(counts.total(), 10);
        let estimate = counts.estimate(2, 1).unwrap();
        assert_eq!(estimate, GuessEstimate { estimate: 8, lower: 5, upper: 10 });
        assert!(estimate.lower < estimate.estimate && estimate.estimate < estimate.upper);
        assert_eq!(counts.estimate(0, 0).unwrap(), GuessEstimate { estimate: 1, lower: 0, upper: 5 });
        assert_eq!(counts.estimate(5, 0), None);
    }

    #[test]
    fn histogram_counts_match_forward_counts() {
        let config = Config::jtr();
        let words = words(&[
            "", "a", "ab", "abc", "pass", "Pass1", "p4ss", "1234", "hello1", "password", "Password1", "a1b2c3", "zzz",
            "letmein", "dragon", "12345678", "abc123",
        ]);
        let raws = vec![
            ":", "c", "$[0-9]", "<5", ">4", "_4", "!1", "/1", "%21", "(p", ")1", "c /1", "d /1", "r (1", "D1 =1a",
            "'3 )c", "x13 (b", "sa4 /4", "\\[ ] )s", "/?d /?l", "<6 !?d", "=0?l )?d", "$1 %21", "q $1", "Tm",
            "/a /b", "-8 :",
        ];
        let rules = rules(&raws, &config);
        let counts = count_rules(&words, &rules, &[], &config).unwrap();
        assert_eq!(counts.counts(), forward_counts(&words, &rules, &config).as_slice());
    }

    #[test]
    fn hashcat_batches_sum_their_rules() {
        let config = Config { batch_size_of_words: 3, batch_size_of_rules: Some(2), ..Config::hashcat() };
        let words = words(&["pass", "word1", "abc", "1234", "hello", "a"]);
        let rules = rules(&[":", "$1", "/1", "]", "p2", "D1 /a"], &config);
        let counts = count_rules(&words, &rules, &[], &config).unwrap();
        assert_eq!(counts.counts().len(), 2 * 3);

        let mut expected = vec![0u64; 6];
        for (w, word) in words.iter().enumerate() {
            for (r, rule) in rules.iter().enumerate() {
                expected[(w / 3) * 3 + r / 2] += count_forward(&forward_manglers(rule, &[], &config), &[word.clone()]);
            }
        }
        assert_eq!(counts.counts(), expected.as_slice());
        assert_eq!(*counts.cumsum().last().unwrap(), 0);

        // Word 4 sits in the second word batch, rule 3 in the second rule batch.
        let cell = 3 + 1;
        let count = counts.counts()[cell];
        let estimate = counts.estimate(4, 3).unwrap();
        assert_eq!(estimate.lower, counts.cumsum()[cell - 1]);
        assert_eq!(estimate.upper, counts.cumsum()[cell]);
        assert_eq!(estimate.estimate, estimate.lower + count / 3 + count * 2 / 3 / 2);
    }

    #[test]
    fn policy_primitives_are_counted() {
        let config = Config::jtr();
        let extra = vec![Primitive::RejectUnlessContains(Charset::range(b'0', b'9'))];
        let words = words(&["pass", "pass1", "12"]);
        let raw = ":";
        let subrules = parse_line(raw, &config).unwrap();
        let countable = Rule {
            raw: raw.to_string(),
            subrules: subrules.clone(),
            feasibility: classify(raw, &subrules, &config),
            dependencies: extract_rule(raw, &subrules, &extra, &config),
        };
        let forward = Rule { dependencies: None, ..countable.clone() };
        let counts = count_rules(&words, &[countable, forward], &extra, &config).unwrap();
        assert_eq!(counts.counts(), &[2, 2]);
    }

    #[test]
    fn rule_batches_follow_hashcat_autotune() {
        let cases: Vec<(usize, usize)> = vec![(1, 1), (10, 5), (600, 600), (1500, 1024), (2000, 1024), (0, 1)];
        for (rules, expected) in cases {
            assert_eq!(autotune_rule_batch(rules), expected, "{} rules", rules);
        }
    }

    #[test]
    fn saved_counts_round_trip() {
        let jtr = GuessCounts::per_rule(vec![5, 5], 5);
        assert_eq!(GuessCounts::decode(&jtr.encode()).unwrap(), jtr);
        let hc = GuessCounts::batched(vec![1, 2, 3, 4], 5, 3, 3, 2).unwrap();
        assert_eq!(GuessCounts::decode(&hc.encode()).unwrap(), hc);
        assert_eq!(hc.encode_cumsum(), "1 3 6 10 0\n");
        assert!(GuessCounts::decode("style jtr\nwords 3\n").is_err());
        assert!(GuessCounts::batched(vec![1, 2, 3], 5, 3, 3, 2).is_err());
    }
}
