//! Finding preimages in the wordlist and in enumeration files.
//!
//! Small preimage sets are materialized and checked against the wordlist
//! map directly. Large ones (a `c` on a long password, a `[` with `Σ` in
//! front) are matched by walking a byte trie of the wordlist with the token
//! string, so only branches that exist in the wordlist are visited.
//!
//! Enumeration files (`TRANSFORMED\tORIGINAL`, sorted byte-wise) are searched
//! through a [`SortedLookup`]: either a long-lived shell running `look`, or a
//! binary search over the file loaded in memory.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use crate::config::{Config, LookupBackend};
use crate::engine::token::TokenString;
use crate::error::{Error, Result};

// --- Word trie ----------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct Node {
    /// Sorted by byte.
    children: Vec<(u8, usize)>,
    /// Wordlist index of the word ending here.
    word: Option<usize>,
}

/// Byte trie over the wordlist.
#[derive(Debug, Clone)]
pub struct WordTrie {
    nodes: Vec<Node>,
    len: usize,
}

impl Default for WordTrie {
    fn default() -> Self {
        WordTrie { nodes: vec![Node::default()], len: 0 }
    }
}

impl WordTrie {
    pub fn new() -> Self {
        WordTrie::default()
    }

    /// A trie of `words`, each tagged with its position.
    pub fn from_words<'a>(words: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut trie = WordTrie::new();
        for (idx, word) in words.into_iter().enumerate() {
            trie.insert(word, idx);
        }
        trie
    }

    /// Insert `word`; an already present word keeps its first index.
    pub fn insert(&mut self, word: &[u8], idx: usize) {
        let mut node = 0;
        for b in word {
            node = match self.nodes[node].children.binary_search_by_key(b, |(c, _)| *c) {
                Ok(i) => self.nodes[node].children[i].1,
                Err(i) => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[node].children.insert(i, (*b, child));
                    child
                }
            };
        }
        if self.nodes[node].word.is_none() {
            self.nodes[node].word = Some(idx);
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, word: &[u8]) -> Option<usize> {
        let mut node = 0;
        for b in word {
            let i = self.nodes[node].children.binary_search_by_key(b, |(c, _)| *c).ok()?;
            node = self.nodes[node].children[i].1;
        }
        self.nodes[node].word
    }

    /// Every wordlist word described by `ts`, with its index, in trie order.
    pub fn find(&self, ts: &TokenString) -> Vec<(Vec<u8>, usize)> {
        let mut out = Vec::new();
        let mut seen: HashSet<(usize, usize, usize)> = HashSet::new();
        let mut found: HashSet<usize> = HashSet::new();
        let (_, max_len) = ts.length_bounds();
        let mut prefix = Vec::new();
        self.walk(ts, 0, 0, 0, &mut prefix, max_len, &mut seen, &mut found, &mut out);
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        ts: &TokenString,
        node: usize,
        ti: usize,
        reps: usize,
        prefix: &mut Vec<u8>,
        max_len: Option<usize>,
        seen: &mut HashSet<(usize, usize, usize)>,
        found: &mut HashSet<usize>,
        out: &mut Vec<(Vec<u8>, usize)>,
    ) {
        let tokens = ts.tokens();
        if !seen.insert((node, ti, reps)) {
            return;
        }
        let Some(token) = tokens.get(ti) else {
            if let Some(idx) = self.nodes[node].word {
                if ts.contains(prefix) && found.insert(idx) {
                    out.push((prefix.clone(), idx));
                }
            }
            return;
        };
        if reps >= token.min() {
            self.walk(ts, node, ti + 1, 0, prefix, max_len, seen, found, out);
        }
        if token.max().is_some_and(|m| reps >= m) || max_len.is_some_and(|m| prefix.len() >= m) {
            return;
        }
        // Unbounded repetition only needs to count up to `min`.
        let next_reps = match token.max() {
            Some(_) => reps + 1,
            None => (reps + 1).min(token.min()),
        };
        for (b, child) in &self.nodes[node].children {
            if token.chars().contains(*b) {
                prefix.push(*b);
                self.walk(ts, *child, ti, next_reps, prefix, max_len, seen, found, out);
                prefix.pop();
            }
        }
    }
}

// --- Sorted enumeration files ---------------------------------------------------

/// Search of a sorted `TRANSFORMED\tORIGINAL` file.
pub trait SortedLookup {
    /// Original words of the lines whose transformed part is `password`.
    fn lookup(&mut self, file: &Path, password: &[u8]) -> Result<Vec<Vec<u8>>>;
}

/// Marker echoed after each `look` so the reader knows where output ends.
const END_MARKER: &str = "__ruleguess_look_done__";

/// A bash child process fed one `look` command per query.
pub struct LookProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    executable: PathBuf,
}

impl LookProcess {
    pub fn spawn(executable: &Path) -> Result<Self> {
        let mut child = Command::new("bash")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::io("bash", e))?;
        let stdin = child.stdin.take().ok_or_else(|| Error::Lookup("no stdin for lookup shell".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| Error::Lookup("no stdout for lookup shell".to_string()))?;
        Ok(LookProcess { child, stdin, stdout: BufReader::new(stdout), executable: executable.to_path_buf() })
    }

    fn command(&self, file: &Path, password: &[u8]) -> Vec<u8> {
        let binary = if cfg!(target_os = "macos") { "" } else { "-b " };
        let mut cmd = format!(
            "LC_ALL=C {} {}-- $'{}\\t' {}",
            shell_quote(self.executable.as_os_str().as_encoded_bytes()),
            binary,
            escape_look_key(password),
            shell_quote(file.as_os_str().as_encoded_bytes()),
        )
        .into_bytes();
        cmd.extend_from_slice(format!("; echo {}\n", END_MARKER).as_bytes());
        cmd
    }
}

impl SortedLookup for LookProcess {
    fn lookup(&mut self, file: &Path, password: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cmd = self.command(file, password);
        self.stdin.write_all(&cmd).and_then(|_| self.stdin.flush()).map_err(|e| Error::io(file, e))?;

        let mut out = Vec::new();
        loop {
            let mut line = Vec::new();
            let n = self.stdout.read_until(b'\n', &mut line).map_err(|e| Error::io(file, e))?;
            if n == 0 {
                return Err(Error::Lookup(format!("lookup shell exited while searching {}", file.display())));
            }
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line == END_MARKER.as_bytes() {
                break;
            }
            out.push(original_of(&line, password).ok_or_else(|| {
                Error::Lookup(format!("unexpected `look` output {:?}", String::from_utf8_lossy(&line)))
            })?);
        }
        Ok(out)
    }
}

impl Drop for LookProcess {
    fn drop(&mut self) {
        let _ = self.stdin.write_all(b"exit\n");
        let _ = self.child.wait();
    }
}

/// Binary search over enumeration files held in memory.
#[derive(Debug, Default)]
pub struct SortedFile {
    loaded: HashMap<PathBuf, Vec<Vec<u8>>>,
}

impl SortedFile {
    pub fn new() -> Self {
        SortedFile::default()
    }

    fn lines(&mut self, file: &Path) -> Result<&[Vec<u8>]> {
        if !self.loaded.contains_key(file) {
            let bytes = std::fs::read(file).map_err(|e| Error::io(file, e))?;
            let lines: Vec<Vec<u8>> =
                bytes.split(|b| *b == b'\n').filter(|l| !l.is_empty()).map(<[u8]>::to_vec).collect();
            self.loaded.insert(file.to_path_buf(), lines);
        }
        Ok(self.loaded.get(file).map(Vec::as_slice).unwrap_or(&[]))
    }
}

impl SortedLookup for SortedFile {
    fn lookup(&mut self, file: &Path, password: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut key = password.to_vec();
        key.push(b'\t');
        let lines = self.lines(file)?;
        let start = lines.partition_point(|l| l.as_slice() < key.as_slice());
        Ok(lines[start..]
            .iter()
            .take_while(|l| l.starts_with(&key))
            .filter_map(|l| original_of(l, password))
            .collect())
    }
}

/// The sorted-file lookup `config` asks for.
pub fn open_sorted_lookup(config: &Config) -> Result<Box<dyn SortedLookup>> {
    let external = match config.lookup_backend {
        LookupBackend::External => true,
        LookupBackend::InProcess => false,
        LookupBackend::Auto => on_path(&config.look_executable),
    };
    debug_trace!(config, "[lookup] sorted files via {}", if external { "look" } else { "binary search" });
    if external {
        Ok(Box::new(LookProcess::spawn(&config.look_executable)?))
    } else {
        Ok(Box::new(SortedFile::new()))
    }
}

fn on_path(executable: &Path) -> bool {
    if executable.components().count() > 1 {
        return executable.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(executable).is_file()))
        .unwrap_or(false)
}

fn original_of(line: &[u8], password: &[u8]) -> Option<Vec<u8>> {
    let rest = line.strip_prefix(password)?;
    rest.strip_prefix(b"\t").map(<[u8]>::to_vec)
}

/// Body of a bash `$'...'` string matching `key` literally.
pub fn escape_look_key(key: &[u8]) -> String {
    let mut out = String::new();
    for &b in key {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out
}

fn shell_quote(raw: &[u8]) -> String {
    format!("$'{}'", escape_look_key(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::charset::Charset;
    use crate::engine::token::Token;

    fn trie() -> WordTrie {
        let words = ["pass", "Pass", "password", "pa", "abc", "pass"];
        WordTrie::from_words(words.iter().map(|w| w.as_bytes()))
    }

    #[test]
    fn trie_keeps_first_index() {
        let trie = trie();
        assert_eq!(trie.len(), 5);
        assert_eq!(trie.get(b"pass"), Some(0));
        assert_eq!(trie.get(b"password"), Some(2));
        assert_eq!(trie.get(b"p"), None);
        assert_eq!(trie.get(b"passwords"), None);
    }

    #[test]
    fn trie_find_follows_token_sets() {
        let trie = trie();
        let case = |b: u8| Charset::from_bytes(&[b.to_ascii_lowercase(), b.to_ascii_uppercase()]);
        let cases: Vec<(TokenString, Vec<usize>)> = vec![
            (TokenString::from_sets(b"pass".iter().map(|b| case(*b))), vec![1, 0]),
            (TokenString::from_word(b"abc"), vec![4]),
            (TokenString::from_word(b"abd"), vec![]),
            (
                TokenString::from_tokens(vec![Token::byte(b'p'), Token::byte(b'a'), Token::repeated(Charset::ALL, 0, None)]),
                vec![3, 0, 2],
            ),
            (
                TokenString::from_tokens(vec![Token::byte(b'p'), Token::repeated(Charset::ALL, 1, Some(3))]),
                vec![3, 0],
            ),
        ];
        for (ts, expected) in cases {
            let found: Vec<usize> = trie.find(&ts).into_iter().map(|(_, idx)| idx).collect();
            assert_eq!(found, expected, "{:?}", ts);
        }
    }

    #[test]
    fn look_keys_are_escaped() {
        let cases: Vec<(&str, &str)> = vec![
            ("abc", "abc"),
            ("a\\b", "a\\\\b"),
            ("it's", "it\\'s"),
            ("say \"hi\"", "say \\\"hi\\\""),
            ("\x01z", "\\x01z"),
        ];
        for (key, expected) in cases {
            assert_eq!(escape_look_key(key.as_bytes()), expected);
        }
    }

    #[test]
    fn sorted_file_finds_originals() {
        let dir = std::env::temp_dir().join(format!("ruleguess-lookup-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("rule0.txt");
        std::fs::write(&file, b"ab\tb\nabc\tab\nabc\tbc\nabcd\tx\n").unwrap();

        let mut lookup = SortedFile::new();
        assert_eq!(lookup.lookup(&file, b"abc").unwrap(), vec![b"ab".to_vec(), b"bc".to_vec()]);
        assert_eq!(lookup.lookup(&file, b"ab").unwrap(), vec![b"b".to_vec()]);
        assert!(lookup.lookup(&file, b"zz").unwrap().is_empty());
        assert!(lookup.lookup(&dir.join("missing.txt"), b"ab").is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
