use crate::config::{Config, PasswordPolicy};
use crate::engine::count::{self, autotune_rule_batch, count_rules_with};
use crate::engine::dependency::SubruleDependency;
use crate::engine::extract::extract_rule;
use crate::engine::feasibility::classify;
use crate::engine::invert::Inverter;
use crate::engine::lookup::{SortedLookup, open_sorted_lookup};
use crate::engine::mangle::Mangler;
use crate::engine::metrics::{PhaseMetrics, ScanMetrics, Timer};
use crate::engine::parser::parse_line;
use crate::error::{Error, Result};
use crate::io::{self, CacheKey, InputFile, WorkDir, Wordlist};
use crate::{Feasibility, Primitive, Rule, Style};
use itertools::Itertools;
use std::path::{Path, PathBuf};

pub use crate::engine::count::{GuessCounts, GuessEstimate};
pub use crate::engine::invert::invert_rule;

/// Parse and analyze one rule line: subrules, feasibility and dependencies.
///
/// # Example
/// ```
/// use ruleguess::{Config, Feasibility, parse_rule};
///
/// let rule = parse_rule("c $[0-9]", &Config::jtr()).unwrap();
/// assert_eq!(rule.multiplicity(), 10);
/// assert_eq!(rule.feasibility, Feasibility::Invertible);
/// ```
pub fn parse_rule(text: &str, config: &Config) -> Result<Rule> {
    let subrules = parse_line(text, config)?;
    let feasibility = classify(text, &subrules, config);
    let dependencies = extract_rule(text, &subrules, &[], config);
    Ok(Rule { raw: text.to_string(), subrules, feasibility, dependencies })
}

/// Every candidate `rule` makes from `word`, subrule by subrule.
pub fn apply_rule(word: &[u8], rule: &Rule, config: &Config) -> Vec<Vec<u8>> {
    rule.subrules.iter().flat_map(|s| Mangler::new(s, config).apply(word)).collect()
}

/// Dependencies of `rule` with `policy` applied to its output, `None` when
/// some subrule has to be counted by running it.
pub fn rule_dependencies(rule: &Rule, policy: &PasswordPolicy, config: &Config) -> Option<Vec<SubruleDependency>> {
    extract_rule(&rule.raw, &rule.subrules, &policy.primitives(config.style), config)
}

/// Guesses each rule makes over `words` when only guesses meeting `policy`
/// are counted.
pub fn count_rules(words: &[Vec<u8>], rules: &[Rule], policy: &PasswordPolicy, config: &Config) -> Result<GuessCounts> {
    let extra = policy.primitives(config.style);
    if policy.is_empty() {
        return count::count_rules(words, rules, &extra, config);
    }
    let rules: Vec<Rule> =
        rules.iter().map(|r| Rule { dependencies: rule_dependencies(r, policy, config), ..r.clone() }).collect();
    count::count_rules(words, &rules, &extra, config)
}

/// Removes the cache headers, saved counts and per-rule files under
/// `config.work_dir`, so the next [`Session::prepare`] rebuilds them.
pub fn clear_work_dir(config: &Config) -> Result<()> {
    let work = WorkDir::open(&config.work_dir)?;
    debug_trace!(config, "[cache] clearing {}", work.root().display());
    work.clean()
}

/// Guess number of the candidate rule `rule_idx` makes from word `word_idx`.
pub fn estimate_guess_number(counts: &GuessCounts, word_idx: usize, rule_idx: usize) -> Option<GuessEstimate> {
    counts.estimate(word_idx, rule_idx)
}

// --- Session -----------------------------------------------------------------

/// Files a session reads its attack from.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub wordlist: PathBuf,
    pub rules: PathBuf,
}

/// What the scan found for a password under one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `rule` turns `word` into the password.
    Guessed { rule_idx: usize, rule: String, word: Vec<u8>, word_idx: usize, guess: GuessEstimate },
    /// The inverter failed on this rule; the scan moved on.
    InversionError { rule_idx: usize, rule: String, message: String },
    /// No rule produces the password (or it fails the policy).
    NotGuessable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessRecord {
    pub password_idx: usize,
    pub password: Vec<u8>,
    pub outcome: Outcome,
}

impl GuessRecord {
    pub fn is_guess(&self) -> bool {
        matches!(self.outcome, Outcome::Guessed { .. })
    }
}

/// Result of [`Session::scan`]. Records are grouped by password in test-set
/// order; within a password they follow the rule order.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub records: Vec<GuessRecord>,
    /// Guesses the whole attack makes.
    pub total_guesses: u64,
    pub metrics: ScanMetrics,
}

impl ScanReport {
    /// The reported guess of a password: its first match in rule order.
    pub fn first_guess(&self, password_idx: usize) -> Option<&GuessRecord> {
        self.records.iter().find(|r| r.password_idx == password_idx && r.is_guess())
    }

    pub fn guesses(&self) -> impl Iterator<Item = &GuessRecord> {
        self.records.iter().filter(|r| r.is_guess())
    }

    pub fn guessed_passwords(&self) -> usize {
        self.records.iter().filter(|r| r.is_guess()).map(|r| r.password_idx).unique().count()
    }
}

/// A prepared attack: parsed rules, the wordlist and its guess counts.
pub struct Session {
    config: Config,
    policy: PasswordPolicy,
    wordlist: Wordlist,
    rules: Vec<Rule>,
    discarded: Vec<String>,
    counts: GuessCounts,
    work: WorkDir,
    lookup: Option<Box<dyn SortedLookup>>,
    prepare: PhaseMetrics,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("style", &self.config.style)
            .field("policy", &self.policy)
            .field("words", &self.wordlist.len())
            .field("rules", &self.rules.len())
            .field("discarded", &self.discarded)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Reads the wordlist and rules, analyzes every rule, then restores or
    /// computes the guess counts and enumeration files in `config.work_dir`.
    pub fn prepare(config: Config, policy: PasswordPolicy, paths: &InputPaths) -> Result<Session> {
        config.validate()?;
        let mut prepare = PhaseMetrics::default();
        let extra: Vec<Primitive> = policy.primitives(config.style);

        let timer = Timer::start();
        let word_file = InputFile::read(&paths.wordlist)?;
        let rule_file = InputFile::read(&paths.rules)?;
        let wordlist = Wordlist::parse(&word_file.bytes, &config);
        let lines = io::parse_rules(&rule_file.bytes);
        prepare.read = timer.stop();

        let timer = Timer::start();
        let mut rules = Vec::with_capacity(lines.len());
        let mut discarded = Vec::new();
        for raw in lines {
            match parse_line(&raw, &config) {
                Ok(subrules) => {
                    let feasibility = classify(&raw, &subrules, &config);
                    let dependencies = extract_rule(&raw, &subrules, &extra, &config);
                    rules.push(Rule { raw, subrules, feasibility, dependencies });
                }
                Err(err) if config.safe_mode => {
                    debug_trace!(config, "[parse] {}", err);
                    eprintln!("Parsing rule: {} failed, discarded", raw);
                    discarded.push(raw);
                }
                Err(err) => return Err(err),
            }
        }
        prepare.analyze = timer.stop();

        let work = WorkDir::open(&config.work_dir)?;
        let key = CacheKey::new(&word_file, &rule_file, &policy, config.style);

        let timer = Timer::start();
        let known = enumerate(&work, &key, &rules, wordlist.words(), &extra, &config, &mut prepare)?;
        prepare.enumerate = timer.stop();

        let timer = Timer::start();
        let counts = match restore_counts(&work, &key, &rules, &wordlist, &config) {
            Some(counts) => {
                prepare.counts_restored = true;
                counts
            }
            None => {
                let counts = count_rules_with(wordlist.words(), &rules, &extra, &config, &known)?;
                work.store_counts(&counts)?;
                work.store_count_data_key(&key)?;
                counts
            }
        };
        prepare.count = timer.stop();

        Ok(Session { config, policy, wordlist, rules, discarded, counts, work, lookup: None, prepare })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    pub fn wordlist(&self) -> &Wordlist {
        &self.wordlist
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rule lines skipped because they did not parse.
    pub fn discarded_rules(&self) -> &[String] {
        &self.discarded
    }

    pub fn counts(&self) -> &GuessCounts {
        &self.counts
    }

    pub fn work_dir(&self) -> &Path {
        self.work.root()
    }

    /// Reads a test set and scans it.
    pub fn scan_file(&mut self, path: &Path) -> Result<ScanReport> {
        let timer = Timer::start();
        let passwords = io::read_passwords(path)?;
        let read = timer.stop();
        let mut report = self.scan(&passwords)?;
        report.metrics.prepare.read += read;
        Ok(report)
    }

    /// Finds, for every password, each rule and word that guess it.
    pub fn scan(&mut self, passwords: &[Vec<u8>]) -> Result<ScanReport> {
        let timer = Timer::start();
        let mut metrics = ScanMetrics { prepare: self.prepare.clone(), passwords: passwords.len(), ..Default::default() };
        let mut records = Vec::new();

        for (password_idx, password) in passwords.iter().enumerate() {
            let before = records.len();
            if self.policy.accepts(password) {
                for rule_idx in 0..self.rules.len() {
                    self.scan_rule(password_idx, password, rule_idx, &mut records, &mut metrics)?;
                }
            } else {
                metrics.passwords_skipped += 1;
            }
            if records[before..].iter().any(GuessRecord::is_guess) {
                metrics.guessed += 1;
            } else {
                records.push(GuessRecord { password_idx, password: password.clone(), outcome: Outcome::NotGuessable });
            }
        }

        metrics.scan = timer.stop();
        Ok(ScanReport { records, total_guesses: self.counts.total(), metrics })
    }

    fn scan_rule(
        &mut self,
        password_idx: usize,
        password: &[u8],
        rule_idx: usize,
        records: &mut Vec<GuessRecord>,
        metrics: &mut ScanMetrics,
    ) -> Result<()> {
        let rule = &self.rules[rule_idx];
        let words = match rule.feasibility {
            Feasibility::Uninvertible => self.file_lookup(password, rule_idx, metrics)?,
            feasibility => {
                metrics.inversions += 1;
                let inversion = Inverter::new(&self.config).invert_rule(password, rule);
                match inversion {
                    crate::Inversion::Normal { .. } => {
                        let size = inversion.number_of_strings().unwrap_or(u128::MAX);
                        if size <= u128::from(self.config.lookup_threshold) {
                            metrics.direct_lookups += 1;
                            self.direct_matches(&inversion)
                        } else if feasibility == Feasibility::Optimizable {
                            self.file_lookup(password, rule_idx, metrics)?
                        } else {
                            metrics.trie_lookups += 1;
                            self.trie_matches(&inversion)
                        }
                    }
                    crate::Inversion::OutOfScope => {
                        metrics.out_of_scope += 1;
                        debug_trace!(self.config, "[invert] {:?} out of scope, falling back", rule.raw);
                        if feasibility == Feasibility::Optimizable {
                            self.file_lookup(password, rule_idx, metrics)?
                        } else {
                            self.forward_matches(password, rule_idx)
                        }
                    }
                    crate::Inversion::Error(message) => {
                        metrics.inversion_errors += 1;
                        eprintln!(
                            "Inversion error for {}(RL) {}(pw), error msg: {}",
                            rule.raw,
                            String::from_utf8_lossy(password),
                            message
                        );
                        records.push(GuessRecord {
                            password_idx,
                            password: password.to_vec(),
                            outcome: Outcome::InversionError { rule_idx, rule: rule.raw.clone(), message },
                        });
                        return Ok(());
                    }
                }
            }
        };

        let rule = &self.rules[rule_idx];
        let special = matches!(rule.feasibility, Feasibility::SpecialMemory(_));
        for (word, word_idx) in words {
            // A skipped `Q` is only settled by running the rule.
            if special && !self.produces(rule, &word, password) {
                continue;
            }
            let Some(guess) = self.counts.estimate(word_idx, rule_idx) else {
                continue;
            };
            records.push(GuessRecord {
                password_idx,
                password: password.to_vec(),
                outcome: Outcome::Guessed { rule_idx, rule: rule.raw.clone(), word, word_idx, guess },
            });
        }
        Ok(())
    }

    fn produces(&self, rule: &Rule, word: &[u8], password: &[u8]) -> bool {
        rule.subrules.iter().any(|s| Mangler::new(s, &self.config).produces(word, password))
    }

    /// Materialized preimages that are in the wordlist.
    fn direct_matches(&self, inversion: &crate::Inversion) -> Vec<(Vec<u8>, usize)> {
        let Some(strings) = inversion.to_strings() else {
            return self.trie_matches(inversion);
        };
        strings
            .into_iter()
            .unique()
            .filter_map(|w| self.wordlist.index_of(&w).map(|idx| (w, idx)))
            .sorted_by_key(|(_, idx)| *idx)
            .collect()
    }

    fn trie_matches(&self, inversion: &crate::Inversion) -> Vec<(Vec<u8>, usize)> {
        inversion
            .strings()
            .iter()
            .flat_map(|ts| self.wordlist.trie().find(ts))
            .unique_by(|(_, idx)| *idx)
            .sorted_by_key(|(_, idx)| *idx)
            .collect()
    }

    /// Every word the rule turns into `password`, found by running it.
    fn forward_matches(&self, password: &[u8], rule_idx: usize) -> Vec<(Vec<u8>, usize)> {
        let rule = &self.rules[rule_idx];
        let manglers: Vec<Mangler<'_>> = rule.subrules.iter().map(|s| Mangler::new(s, &self.config)).collect();
        self.wordlist
            .words()
            .iter()
            .enumerate()
            .filter(|(_, w)| manglers.iter().any(|m| m.produces(w, password)))
            .map(|(idx, w)| (w.clone(), idx))
            .collect()
    }

    fn file_lookup(
        &mut self,
        password: &[u8],
        rule_idx: usize,
        metrics: &mut ScanMetrics,
    ) -> Result<Vec<(Vec<u8>, usize)>> {
        metrics.file_lookups += 1;
        let file = self.work.enumeration_path(rule_idx);
        if self.lookup.is_none() {
            self.lookup = Some(open_sorted_lookup(&self.config)?);
        }
        let Some(lookup) = self.lookup.as_mut() else {
            return Err(Error::Lookup("no sorted-file lookup".to_string()));
        };
        let originals = lookup.lookup(&file, password)?;
        debug_trace!(self.config, "[lookup] rule {}: {} lines", rule_idx, originals.len());
        Ok(originals
            .into_iter()
            .unique()
            .filter_map(|w| self.wordlist.index_of(&w).map(|idx| (w, idx)))
            .sorted_by_key(|(_, idx)| *idx)
            .collect())
    }
}

/// Writes (or reuses) the enumeration and count files. Returns the per-rule
/// counts those files provide for rules without dependencies (JtR only).
fn enumerate(
    work: &WorkDir,
    key: &CacheKey,
    rules: &[Rule],
    words: &[Vec<u8>],
    extra: &[Primitive],
    config: &Config,
    metrics: &mut PhaseMetrics,
) -> Result<Vec<Option<u64>>> {
    let reuse = work.has_generated_data(key);
    debug_trace!(config, "[cache] enumeration files {}", if reuse { "match the inputs" } else { "are stale" });
    let mut known = vec![None; rules.len()];
    for (i, rule) in rules.iter().enumerate() {
        let wants_count = config.is_jtr() && rule.dependencies.is_none();
        if rule.feasibility.needs_enumeration() {
            let cached = reuse && work.enumeration_path(i).is_file();
            let count = match (cached, work.read_count(i)?) {
                (true, Some(count)) => {
                    metrics.enumerations_reused += 1;
                    count
                }
                _ => work.write_enumeration(i, rule, words, extra, config)?,
            };
            if wants_count {
                known[i] = Some(count);
            }
        } else if wants_count {
            known[i] = match (reuse, work.read_count(i)?) {
                (true, Some(count)) => Some(count),
                _ => Some(work.write_forward_count(i, rule, words, extra, config)?),
            };
        }
    }
    work.store_generated_data_key(key)?;
    Ok(known)
}

/// Saved counts, when they were computed for these inputs and this layout.
fn restore_counts(
    work: &WorkDir,
    key: &CacheKey,
    rules: &[Rule],
    wordlist: &Wordlist,
    config: &Config,
) -> Option<GuessCounts> {
    if !work.has_count_data(key) {
        return None;
    }
    let counts = match work.restore_counts() {
        Ok(counts) => counts,
        Err(err) => {
            debug_trace!(config, "[cache] {}", err);
            return None;
        }
    };
    let layout = counts.style() == config.style
        && counts.word_count() == wordlist.len()
        && counts.rule_count() == rules.len()
        && (config.style == Style::Jtr
            || (counts.batch_size_of_words() == config.batch_size_of_words
                && counts.batch_size_of_rules()
                    == config.batch_size_of_rules.unwrap_or_else(|| autotune_rule_batch(rules.len()))));
    debug_trace!(config, "[cache] saved counts {}", if layout { "restored" } else { "do not fit" });
    layout.then_some(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyFlags;

    #[test]
    fn parse_rule_analyzes() {
        let config = Config::jtr();
        let cases: Vec<(&str, Feasibility, bool)> = vec![
            (":", Feasibility::Invertible, true),
            ("$[0-9]", Feasibility::Invertible, true),
            ("l Q", Feasibility::SpecialMemory(1), false),
            ("M l Q", Feasibility::Uninvertible, false),
        ];
        for (raw, feasibility, countable) in cases {
            let rule = parse_rule(raw, &config).unwrap();
            assert_eq!(rule.feasibility, feasibility, "{}", raw);
            assert_eq!(rule.dependencies.is_some(), countable, "{}", raw);
        }
        assert!(matches!(parse_rule("$", &config), Err(Error::Parse { .. })));
    }

    #[test]
    fn apply_rule_runs_every_subrule() {
        let config = Config::jtr();
        let rule = parse_rule("[cu] $1", &config).unwrap();
        assert_eq!(apply_rule(b"pass", &rule, &config), vec![b"Pass1".to_vec(), b"PASS1".to_vec()]);
        let rejecting = parse_rule("/x", &config).unwrap();
        assert!(apply_rule(b"pass", &rejecting, &config).is_empty());
    }

    #[test]
    fn counting_under_a_policy() {
        let config = Config::jtr();
        let words: Vec<Vec<u8>> = ["pass", "word", "pass12"].iter().map(|w| w.as_bytes().to_vec()).collect();
        let rules = vec![parse_rule(":", &config).unwrap(), parse_rule("$1", &config).unwrap()];
        let policy = PasswordPolicy::new(Some(5), PolicyFlags::DIGIT).unwrap();

        let plain = count_rules(&words, &rules, &PasswordPolicy::none(), &config).unwrap();
        assert_eq!(plain.counts(), &[3, 3]);
        let filtered = count_rules(&words, &rules, &policy, &config).unwrap();
        assert_eq!(filtered.counts(), &[1, 3]);

        let estimate = estimate_guess_number(&filtered, 1, 1).unwrap();
        assert_eq!(estimate.lower, 1);
        assert_eq!(estimate.upper, 4);
        assert_eq!(estimate.estimate, 1 + 3 * 2 / 3);
    }
}
