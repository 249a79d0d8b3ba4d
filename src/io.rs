//! Inputs and the work directory.
//!
//! Readers for the wordlist, the rule list and the test set, and the files a
//! session keeps between runs: cache headers (`hashes.txt`,
//! `count_hashes.txt`), saved counts, and the per-rule enumeration and count
//! files under `enumerated/` and `count/`.

use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::Digest;

use crate::config::{Config, PasswordPolicy, Style};
use crate::engine::charset::escape_bytes;
use crate::engine::count::GuessCounts;
use crate::engine::lookup::WordTrie;
use crate::engine::mangle::Mangler;
use crate::error::{Error, Result};
use crate::{Primitive, Rule};

// --- Wordlist -----------------------------------------------------------------

/// Words in attack order, each with the index of its first occurrence.
#[derive(Debug, Clone, Default)]
pub struct Wordlist {
    words: Vec<Vec<u8>>,
    index: HashMap<Vec<u8>, usize>,
    trie: WordTrie,
}

impl Wordlist {
    /// Builds a wordlist from already cleaned words; repeated words are
    /// dropped.
    pub fn from_words(words: impl IntoIterator<Item = Vec<u8>>) -> Self {
        let mut list = Wordlist::default();
        for word in words {
            list.push(word);
        }
        list
    }

    fn push(&mut self, word: Vec<u8>) {
        if self.index.contains_key(&word) {
            return;
        }
        let idx = self.words.len();
        self.trie.insert(&word, idx);
        self.index.insert(word.clone(), idx);
        self.words.push(word);
    }

    pub fn words(&self) -> &[Vec<u8>] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn index_of(&self, word: &[u8]) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn contains(&self, word: &[u8]) -> bool {
        self.index.contains_key(word)
    }

    pub fn trie(&self) -> &WordTrie {
        &self.trie
    }

    /// Parses wordlist file contents.
    ///
    /// Control bytes are stripped from every line. Words longer than
    /// `max_password_length` are dropped, and so are words with bytes outside
    /// the JtR alphabet in JtR style. JtR also skips empty lines.
    pub fn parse(bytes: &[u8], config: &Config) -> Self {
        let sigma = config.sigma();
        let mut list = Wordlist::default();
        for line in lines(bytes) {
            let word = clean_word(line);
            if word.len() > config.max_password_length {
                eprintln!("Oversize word: {} in wordlist file, ignored", escape_bytes(&word));
                continue;
            }
            if word.starts_with(b"#!comment:") {
                eprintln!("Comment: {} found in wordlist file, ignored", escape_bytes(&word));
                continue;
            }
            if config.is_jtr() {
                if word.is_empty() {
                    continue;
                }
                if !word.iter().all(|b| sigma.contains(*b)) {
                    debug_trace!(config, "[wordlist] non-printable word {} ignored", escape_bytes(&word));
                    continue;
                }
            }
            if list.contains(&word) {
                if !word.is_empty() {
                    debug_trace!(config, "[wordlist] duplicate word {} ignored", escape_bytes(&word));
                }
                continue;
            }
            list.push(word);
        }
        list
    }
}

/// Lines of `bytes` without their `\n` / `\r\n` terminators.
fn lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    body.split(|b| *b == b'\n').filter(move |_| !bytes.is_empty())
}

fn clean_word(line: &[u8]) -> Vec<u8> {
    line.iter().copied().filter(|b| *b >= 32).collect()
}

// --- Readers --------------------------------------------------------------------

/// A file read whole, with the digest used by the cache headers.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub bytes: Vec<u8>,
    pub digest: String,
}

impl InputFile {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Config(format!("{} does not exist", path.display())));
        }
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        let digest = sha256_hex(&bytes);
        Ok(InputFile { bytes, digest })
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Rule lines, skipping comments, `[List.` section headers and empty lines.
pub fn parse_rules(bytes: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    text.lines()
        .map(|line| line.trim_end_matches(['\r', '\n']))
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !regex!(r"^\[List\.").is_match(line))
        .map(str::to_string)
        .collect()
}

/// Test-set passwords: control bytes stripped, empty lines dropped.
pub fn parse_passwords(bytes: &[u8]) -> Vec<Vec<u8>> {
    lines(bytes).map(clean_word).filter(|pw| !pw.is_empty()).collect()
}

pub fn read_passwords(path: &Path) -> Result<Vec<Vec<u8>>> {
    Ok(parse_passwords(&InputFile::read(path)?.bytes))
}

// --- Cache headers ----------------------------------------------------------------

/// What a cached result depends on: both input files, the policy and the
/// style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    wordlist: String,
    rulelist: String,
    policy: String,
    style: Style,
}

impl CacheKey {
    pub fn new(wordlist: &InputFile, rulelist: &InputFile, policy: &PasswordPolicy, style: Style) -> Self {
        CacheKey {
            wordlist: wordlist.digest.clone(),
            rulelist: rulelist.digest.clone(),
            policy: policy.to_debug_string(),
            style,
        }
    }

    fn render(&self) -> String {
        let mode = if self.style.is_jtr() { "1" } else { "0" };
        format!("{}\n{}\n{}\n{}\n", self.wordlist, self.rulelist, self.policy, mode)
    }

    /// Whether a stored header describes this key.
    fn matches(&self, text: &str) -> bool {
        let lines: Vec<&str> = text.lines().map(|l| l.trim_end_matches('\r')).collect();
        if lines.len() < 4 {
            return false;
        }
        let digest = regex!(r"^[0-9a-f]{64}$");
        if !digest.is_match(lines[0].trim()) || !digest.is_match(lines[1].trim()) {
            return false;
        }
        if !regex!(r"^[01]$").is_match(lines[3]) {
            return false;
        }
        let expected = self.render();
        let expected: Vec<&str> = expected.lines().collect();
        lines[0].trim() == expected[0] && lines[1].trim() == expected[1] && lines[2] == expected[2] && lines[3] == expected[3]
    }
}

// --- Work directory -----------------------------------------------------------------

const GENERATED_HASHES: &str = "hashes.txt";
const COUNT_HASHES: &str = "count_hashes.txt";
const SAVED_COUNTS: &str = "saved_counts.txt";
const SAVED_CUMSUM: &str = "saved_cumsum.txt";

/// The directory holding caches and enumeration files.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Opens `root`, creating it and its `enumerated/` and `count/`
    /// subdirectories.
    pub fn open(root: &Path) -> Result<Self> {
        for dir in [root.to_path_buf(), root.join("enumerated"), root.join("count")] {
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(WorkDir { root: root.to_path_buf() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn enumeration_path(&self, rule_idx: usize) -> PathBuf {
        self.root.join("enumerated").join(format!("rule{}.txt", rule_idx))
    }

    pub fn count_path(&self, rule_idx: usize) -> PathBuf {
        self.root.join("count").join(format!("rule{}.txt", rule_idx))
    }

    /// Whether the enumeration files were generated for `key`.
    pub fn has_generated_data(&self, key: &CacheKey) -> bool {
        self.header_matches(GENERATED_HASHES, key)
    }

    pub fn store_generated_data_key(&self, key: &CacheKey) -> Result<()> {
        self.write(GENERATED_HASHES, key.render().as_bytes())
    }

    /// Whether the saved counts were computed for `key`.
    pub fn has_count_data(&self, key: &CacheKey) -> bool {
        self.header_matches(COUNT_HASHES, key)
    }

    pub fn store_count_data_key(&self, key: &CacheKey) -> Result<()> {
        self.write(COUNT_HASHES, key.render().as_bytes())
    }

    fn header_matches(&self, name: &str, key: &CacheKey) -> bool {
        fs::read_to_string(self.root.join(name)).map(|text| key.matches(&text)).unwrap_or(false)
    }

    pub fn store_counts(&self, counts: &GuessCounts) -> Result<()> {
        self.write(SAVED_COUNTS, counts.encode().as_bytes())?;
        self.write(SAVED_CUMSUM, counts.encode_cumsum().as_bytes())
    }

    /// Saved counts, checked against the saved running totals.
    pub fn restore_counts(&self) -> Result<GuessCounts> {
        let counts = GuessCounts::decode(&self.read_to_string(SAVED_COUNTS)?)?;
        let cumsum = self.read_to_string(SAVED_CUMSUM)?;
        if cumsum.trim() != counts.encode_cumsum().trim() {
            return Err(Error::Cache(format!("{} does not match {}", SAVED_CUMSUM, SAVED_COUNTS)));
        }
        Ok(counts)
    }

    /// Runs `rule` (plus `extra`) over every word and writes the sorted
    /// `TRANSFORMED\tORIGINAL` lines to `enumerated/rule{i}.txt` and the
    /// number of candidates to `count/rule{i}.txt`. Returns that number.
    pub fn write_enumeration(
        &self,
        rule_idx: usize,
        rule: &Rule,
        words: &[Vec<u8>],
        extra: &[Primitive],
        config: &Config,
    ) -> Result<u64> {
        let manglers = manglers(rule, extra, config);
        let mut count = 0u64;
        let mut lines: Vec<Vec<u8>> = Vec::new();
        for word in words {
            for mangler in &manglers {
                for candidate in mangler.apply(word) {
                    count += 1;
                    // Such lines could never be looked up.
                    if candidate.contains(&b'\n') || candidate.contains(&b'\t') {
                        continue;
                    }
                    let mut line = candidate;
                    line.push(b'\t');
                    line.extend_from_slice(word);
                    lines.push(line);
                }
            }
        }
        lines.sort_unstable();

        let path = self.enumeration_path(rule_idx);
        let file = fs::File::create(&path).map_err(|e| Error::io(&path, e))?;
        let mut out = BufWriter::new(file);
        for line in &lines {
            out.write_all(line).and_then(|_| out.write_all(b"\n")).map_err(|e| Error::io(&path, e))?;
        }
        out.flush().map_err(|e| Error::io(&path, e))?;

        self.write_count(rule_idx, count)?;
        debug_trace!(config, "[cache] enumerated rule {} ({:?}): {} candidates", rule_idx, rule.raw, count);
        Ok(count)
    }

    /// Counts `rule` forward and stores the result in `count/rule{i}.txt`.
    pub fn write_forward_count(
        &self,
        rule_idx: usize,
        rule: &Rule,
        words: &[Vec<u8>],
        extra: &[Primitive],
        config: &Config,
    ) -> Result<u64> {
        let manglers = manglers(rule, extra, config);
        let count = words.iter().map(|w| manglers.iter().map(|m| m.count(w)).sum::<u64>()).sum();
        self.write_count(rule_idx, count)?;
        Ok(count)
    }

    pub fn write_count(&self, rule_idx: usize, count: u64) -> Result<()> {
        let path = self.count_path(rule_idx);
        fs::write(&path, format!("{}\n", count)).map_err(|e| Error::io(&path, e))
    }

    /// The stored count of a rule, `None` when there is no count file.
    pub fn read_count(&self, rule_idx: usize) -> Result<Option<u64>> {
        let path = self.count_path(rule_idx);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let first = text.lines().next().unwrap_or("").trim();
        first
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::Cache(format!("{}: bad count {:?}", path.display(), first)))
    }

    /// Removes every cache header, saved count and per-rule file.
    pub fn clean(&self) -> Result<()> {
        for name in [GENERATED_HASHES, COUNT_HASHES, SAVED_COUNTS, SAVED_CUMSUM] {
            let path = self.root.join(name);
            if path.exists() {
                fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
            }
        }
        for dir in [self.root.join("enumerated"), self.root.join("count")] {
            let entries = fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))?;
            for entry in entries {
                let path = entry.map_err(|e| Error::io(&dir, e))?.path();
                if path.extension().is_some_and(|ext| ext == "txt") {
                    fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
                }
            }
        }
        Ok(())
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.root.join(name);
        fs::write(&path, bytes).map_err(|e| Error::io(&path, e))
    }

    fn read_to_string(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        fs::read_to_string(&path).map_err(|e| Error::io(&path, e))
    }
}

fn manglers<'c>(rule: &Rule, extra: &[Primitive], config: &'c Config) -> Vec<Mangler<'c>> {
    rule.subrules
        .iter()
        .map(|s| {
            let program: Vec<Primitive> = s.primitives.iter().chain(extra).cloned().collect();
            Mangler::from_primitives(&program, config)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::parse_rule;
    use crate::config::PolicyFlags;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ruleguess-io-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn input(dir: &Path, name: &str, bytes: &[u8]) -> InputFile {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        InputFile::read(&path).unwrap()
    }

    #[test]
    fn wordlist_cleaning() {
        let config = Config { max_password_length: 8, ..Config::jtr() };
        let bytes = b"pass\r\nword\n\npass\nwo\x01rd2\n#!comment: hi\ntoolongword\ncaf\xc3\xa9\nlast";
        let list = Wordlist::parse(bytes, &config);
        let words: Vec<&[u8]> = list.words().iter().map(Vec::as_slice).collect();
        assert_eq!(words, vec![&b"pass"[..], b"word", b"word2", b"last"]);
        assert_eq!(list.index_of(b"word2"), Some(2));
        assert_eq!(list.trie().get(b"last"), Some(3));
        assert!(!list.contains(b"toolongword"));

        let hc = Wordlist::parse(b"a\n\nb\n\ncaf\xc3\xa9\n", &Config::hashcat());
        let words: Vec<&[u8]> = hc.words().iter().map(Vec::as_slice).collect();
        assert_eq!(words, vec![&b"a"[..], b"", b"b", "café".as_bytes()]);
    }

    #[test]
    fn rule_and_password_files() {
        let rules = parse_rules(b"# comment\n[List.Rules:Wordlist]\n:\n\n$1 $2\r\nc\n");
        assert_eq!(rules, vec![":".to_string(), "$1 $2".to_string(), "c".to_string()]);

        let passwords = parse_passwords(b"pass1\n\nPass\x7f\x02word\r\n");
        assert_eq!(passwords, vec![b"pass1".to_vec(), b"Pass\x7fword".to_vec()]);
        assert!(parse_passwords(b"").is_empty());
    }

    #[test]
    fn cache_headers_track_inputs() {
        let dir = scratch("headers");
        let work = WorkDir::open(&dir.join("work")).unwrap();
        let words = input(&dir, "words.txt", b"pass\nword\n");
        let rules = input(&dir, "rules.txt", b":\n$1\n");
        let policy = PasswordPolicy::new(Some(6), PolicyFlags::DIGIT).unwrap();
        let key = CacheKey::new(&words, &rules, &policy, Style::Jtr);

        assert!(!work.has_generated_data(&key));
        work.store_generated_data_key(&key).unwrap();
        assert!(work.has_generated_data(&key));
        assert!(!work.has_count_data(&key));

        let other_policy = CacheKey::new(&words, &rules, &PasswordPolicy::none(), Style::Jtr);
        assert!(!work.has_generated_data(&other_policy));
        let other_style = CacheKey::new(&words, &rules, &policy, Style::Hashcat);
        assert!(!work.has_generated_data(&other_style));
        let changed = input(&dir, "words.txt", b"pass\nword\nmore\n");
        assert!(!work.has_generated_data(&CacheKey::new(&changed, &rules, &policy, Style::Jtr)));

        let header = fs::read_to_string(work.root().join("hashes.txt")).unwrap();
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(lines[0], sha256_hex(b"pass\nword\n"));
        assert_eq!(lines[2], " --length=6 --digit ");
        assert_eq!(lines[3], "1");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn saved_counts_and_enumerations() {
        let dir = scratch("enumerate");
        let work = WorkDir::open(&dir).unwrap();
        let config = Config::jtr();

        let counts = GuessCounts::per_rule(vec![3, 6], 3);
        work.store_counts(&counts).unwrap();
        assert_eq!(work.restore_counts().unwrap(), counts);
        fs::write(dir.join("saved_cumsum.txt"), "1 2 0\n").unwrap();
        assert!(matches!(work.restore_counts(), Err(Error::Cache(_))));

        let words: Vec<Vec<u8>> = vec![b"ab".to_vec(), b"b".to_vec(), b"abc".to_vec()];
        let rule = parse_rule("$[12]", &config).unwrap();
        assert_eq!(work.write_enumeration(0, &rule, &words, &[], &config).unwrap(), 6);
        let text = fs::read_to_string(work.enumeration_path(0)).unwrap();
        assert_eq!(text, "ab1\tab\nab2\tab\nabc1\tabc\nabc2\tabc\nb1\tb\nb2\tb\n");
        assert_eq!(work.read_count(0).unwrap(), Some(6));
        assert_eq!(work.read_count(1).unwrap(), None);

        let rule = parse_rule("/c", &config).unwrap();
        assert_eq!(work.write_forward_count(1, &rule, &words, &[], &config).unwrap(), 1);
        assert_eq!(work.read_count(1).unwrap(), Some(1));

        work.clean().unwrap();
        assert!(!work.enumeration_path(0).exists());
        assert!(!dir.join("saved_counts.txt").exists());
        assert_eq!(work.read_count(1).unwrap(), None);
        fs::remove_dir_all(&dir).unwrap();
    }
}
