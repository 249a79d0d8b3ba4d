//! Run configuration and password policy.
//!
//! `Config` is built once at startup and then only borrowed. Both attack styles
//! share the same fields; the style decides the defaults, the alphabet and a
//! few primitive semantics (see `Style`).

use crate::error::{Error, Result};
use crate::{Pos, Primitive};
use crate::engine::charset::{Charset, char_class};
use bitflags::bitflags;
use std::fmt;
use std::path::PathBuf;

// --- Style -------------------------------------------------------------------

/// Which cracker's rule dialect and candidate ordering to model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    /// John the Ripper: printable alphabet, rule-major candidate order.
    Jtr,
    /// Hashcat: byte alphabet, batched (word-batch, rule-batch) order.
    Hashcat,
}

const JTR_NICKNAMES: &[&str] = &["j", "jtr", "JTR", "JtR", "John", "john", "J", "John The Ripper", "Jtr"];
const HC_NICKNAMES: &[&str] = &["h", "hc", "HC", "hashcat", "H", "Hashcat", "Hc"];

impl Style {
    pub fn from_nickname(name: &str) -> Option<Style> {
        if JTR_NICKNAMES.contains(&name) {
            Some(Style::Jtr)
        } else if HC_NICKNAMES.contains(&name) {
            Some(Style::Hashcat)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Style::Jtr => "JTR",
            Style::Hashcat => "HC",
        }
    }

    pub fn is_jtr(&self) -> bool {
        matches!(self, Style::Jtr)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How sorted enumeration files are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupBackend {
    /// A persistent shell running the `look` utility.
    External,
    /// Binary search over the file loaded in memory.
    InProcess,
    /// `External` when the `look` executable is on `PATH`, otherwise `InProcess`.
    Auto,
}

// --- Config ------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub style: Style,
    /// Words and passwords longer than this are ignored; growth past it leaves
    /// a word unchanged.
    pub max_password_length: usize,
    /// Value of the `*` position; `-` and `+` are one below and above it.
    pub min_cut_length: usize,
    /// `ONM` with `M` above this is not inverted symbolically.
    pub m_threshold: usize,
    /// Let the inverter produce repetition tokens (e.g. for `'N` at equal
    /// length) instead of giving up on them.
    pub enable_regex: bool,
    /// Preimage sets larger than this are searched in the word trie instead of
    /// being materialized.
    pub lookup_threshold: u64,
    pub batch_size_of_words: usize,
    /// `None` autotunes the rule batch like hashcat's kernel loops.
    pub batch_size_of_rules: Option<usize>,
    pub look_executable: PathBuf,
    pub lookup_backend: LookupBackend,
    /// Skip rules that fail to parse instead of aborting.
    pub safe_mode: bool,
    pub debug: bool,
    /// Directory for caches and enumeration files.
    pub work_dir: PathBuf,
}

impl Config {
    pub fn jtr() -> Self {
        Config {
            style: Style::Jtr,
            max_password_length: 127,
            min_cut_length: 128,
            m_threshold: 2,
            enable_regex: false,
            lookup_threshold: 131_073,
            batch_size_of_words: 1024 * 1024,
            batch_size_of_rules: None,
            look_executable: PathBuf::from("look"),
            lookup_backend: LookupBackend::Auto,
            safe_mode: true,
            debug: false,
            work_dir: PathBuf::from("data/preprocess"),
        }
    }

    pub fn hashcat() -> Self {
        Config { style: Style::Hashcat, max_password_length: 255, min_cut_length: 256, ..Config::jtr() }
    }

    pub fn for_style(style: Style) -> Self {
        match style {
            Style::Jtr => Config::jtr(),
            Style::Hashcat => Config::hashcat(),
        }
    }

    /// The alphabet of words and passwords.
    pub fn sigma(&self) -> Charset {
        Charset::sigma(self.style)
    }

    pub fn is_jtr(&self) -> bool {
        self.style.is_jtr()
    }

    /// Debug tracing is on when requested here or through `RULEGUESS_DEBUG`.
    pub fn tracing(&self) -> bool {
        self.debug || crate::macros::debug_env()
    }

    /// Reject values that would make the engine misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.max_password_length == 0 {
            return Err(Error::Config("max_password_length must be positive".to_string()));
        }
        if self.min_cut_length <= self.max_password_length {
            return Err(Error::Config(format!(
                "min_cut_length ({}) must exceed max_password_length ({})",
                self.min_cut_length, self.max_password_length
            )));
        }
        if self.max_password_length > 255 {
            return Err(Error::Config("max_password_length must fit in a byte".to_string()));
        }
        if matches!(self.batch_size_of_rules, Some(0)) || self.batch_size_of_words == 0 {
            return Err(Error::Config("batch sizes must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::jtr()
    }
}

// --- Password policy -----------------------------------------------------------

bitflags! {
    /// Character-class requirements of a password policy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PolicyFlags: u8 {
        const DIGIT = 1 << 0;
        const LETTER = 1 << 1;
        const LOWER = 1 << 2;
        const UPPER = 1 << 3;
    }
}

/// Requirements every counted guess and every scanned password must meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PasswordPolicy {
    /// Minimum length, `None` for no requirement.
    length: Option<usize>,
    flags: PolicyFlags,
}

impl PasswordPolicy {
    pub fn none() -> Self {
        PasswordPolicy::default()
    }

    pub fn new(length: Option<usize>, flags: PolicyFlags) -> Result<Self> {
        if length == Some(0) {
            return Err(Error::Config("password policy length must be at least 1".to_string()));
        }
        Ok(PasswordPolicy { length, flags })
    }

    pub fn length(&self) -> Option<usize> {
        self.length
    }

    pub fn flags(&self) -> PolicyFlags {
        self.flags
    }

    pub fn is_empty(&self) -> bool {
        self.length.is_none() && self.flags.is_empty()
    }

    /// Command-line form, e.g. ` --length=6 --digit --lower `; empty policies
    /// render as an empty string.
    pub fn to_arg_string(&self) -> String {
        let mut out = String::from(" ");
        if let Some(n) = self.length {
            out.push_str(&format!("--length={} ", n));
        }
        for (flag, name) in Self::ORDERED {
            if self.flags.contains(flag) {
                out.push_str(&format!("--{} ", name));
            }
        }
        if out == " " { String::new() } else { out }
    }

    /// The form stored in cache headers: the arg string, or `None`.
    pub fn to_debug_string(&self) -> String {
        if self.is_empty() { "None".to_string() } else { self.to_arg_string() }
    }

    /// Short form usable in file names, e.g. `-length=6-digit`.
    pub fn to_compact_string(&self) -> String {
        let mut out = String::new();
        if let Some(n) = self.length {
            out.push_str(&format!("-length={}", n));
        }
        for (flag, name) in Self::ORDERED {
            if self.flags.contains(flag) {
                out.push_str(&format!("-{}", name));
            }
        }
        out
    }

    /// The policy written as rule text for `style`, e.g. ` >5 /?d `.
    pub fn to_rule_string(&self, style: Style) -> String {
        let mut out = String::from(" ");
        if let Some(n) = self.length {
            let code = match style {
                Style::Jtr if n <= 10 => (b'0' + (n - 1) as u8) as char,
                Style::Jtr => (b'A' + (n - 11) as u8) as char,
                Style::Hashcat if n <= 9 => (b'0' + n as u8) as char,
                Style::Hashcat => (b'A' + (n - 10) as u8) as char,
            };
            out.push('>');
            out.push(code);
            out.push(' ');
        }
        for (flag, class) in [
            (PolicyFlags::DIGIT, 'd'),
            (PolicyFlags::LETTER, 'a'),
            (PolicyFlags::UPPER, 'u'),
            (PolicyFlags::LOWER, 'l'),
        ] {
            if self.flags.contains(flag) {
                out.push_str(&format!("/?{} ", class));
            }
        }
        out
    }

    /// Primitives that reject candidates violating the policy; appended to
    /// every subrule when counting and enumerating.
    pub fn primitives(&self, style: Style) -> Vec<Primitive> {
        let mut out = Vec::new();
        if let Some(n) = self.length {
            out.push(Primitive::RejectLen(crate::LenCmp::Greater, Pos::Num(n - 1)));
        }
        for (flag, class) in [
            (PolicyFlags::DIGIT, b'd'),
            (PolicyFlags::LETTER, b'a'),
            (PolicyFlags::UPPER, b'u'),
            (PolicyFlags::LOWER, b'l'),
        ] {
            if self.flags.contains(flag) {
                if let Some(set) = char_class(class, style) {
                    out.push(Primitive::RejectUnlessContains(set));
                }
            }
        }
        out
    }

    /// Parse the output of [`PasswordPolicy::to_arg_string`] (or `None`).
    pub fn from_arg_string(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "None" {
            return Ok(PasswordPolicy::none());
        }
        let mut length = None;
        let mut flags = PolicyFlags::empty();
        for part in trimmed.split_whitespace() {
            if let Some(caps) = regex!(r"^--length=(\d+)$").captures(part) {
                let n: usize =
                    caps[1].parse().map_err(|_| Error::Config(format!("invalid policy length '{}'", &caps[1])))?;
                length = Some(n);
                continue;
            }
            match part {
                "--digit" => flags |= PolicyFlags::DIGIT,
                "--letter" => flags |= PolicyFlags::LETTER,
                "--lower" => flags |= PolicyFlags::LOWER,
                "--upper" => flags |= PolicyFlags::UPPER,
                other => return Err(Error::Config(format!("unknown policy item '{}'", other))),
            }
        }
        PasswordPolicy::new(length, flags)
    }

    /// Whether `password` meets every requirement.
    pub fn accepts(&self, password: &[u8]) -> bool {
        if let Some(n) = self.length {
            if password.len() < n {
                return false;
            }
        }
        let checks: [(PolicyFlags, fn(&u8) -> bool); 4] = [
            (PolicyFlags::DIGIT, u8::is_ascii_digit),
            (PolicyFlags::LETTER, u8::is_ascii_alphabetic),
            (PolicyFlags::LOWER, u8::is_ascii_lowercase),
            (PolicyFlags::UPPER, u8::is_ascii_uppercase),
        ];
        checks.iter().all(|(flag, check)| !self.flags.contains(*flag) || password.iter().any(check))
    }

    const ORDERED: [(PolicyFlags, &'static str); 4] = [
        (PolicyFlags::DIGIT, "digit"),
        (PolicyFlags::LETTER, "letter"),
        (PolicyFlags::UPPER, "upper"),
        (PolicyFlags::LOWER, "lower"),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nicknames() {
        let cases: Vec<(&str, Option<Style>)> = vec![
            ("jtr", Some(Style::Jtr)),
            ("John The Ripper", Some(Style::Jtr)),
            ("J", Some(Style::Jtr)),
            ("hashcat", Some(Style::Hashcat)),
            ("Hc", Some(Style::Hashcat)),
            ("hcat", None),
            ("", None),
        ];
        for (name, expected) in cases {
            assert_eq!(Style::from_nickname(name), expected, "nickname {:?}", name);
        }
    }

    #[test]
    fn defaults_per_style() {
        let jtr = Config::jtr();
        assert_eq!(jtr.max_password_length, 127);
        assert_eq!(jtr.min_cut_length, 128);
        assert_eq!(jtr.sigma().len(), 95);
        assert!(jtr.validate().is_ok());

        let hc = Config::hashcat();
        assert_eq!(hc.max_password_length, 255);
        assert_eq!(hc.min_cut_length, 256);
        assert_eq!(hc.sigma().len(), 256);
        assert!(hc.validate().is_ok());

        let broken = Config { min_cut_length: 10, max_password_length: 20, ..Config::jtr() };
        assert!(broken.validate().is_err());
    }

    #[test]
    fn policy_strings() {
        let policy = PasswordPolicy::new(Some(6), PolicyFlags::DIGIT | PolicyFlags::LOWER).unwrap();
        assert_eq!(policy.to_arg_string(), " --length=6 --digit --lower ");
        assert_eq!(policy.to_debug_string(), " --length=6 --digit --lower ");
        assert_eq!(policy.to_compact_string(), "-length=6-digit-lower");
        assert_eq!(policy.to_rule_string(Style::Jtr), " >5 /?d /?l ");
        assert_eq!(policy.to_rule_string(Style::Hashcat), " >6 /?d /?l ");

        let long = PasswordPolicy::new(Some(12), PolicyFlags::empty()).unwrap();
        assert_eq!(long.to_rule_string(Style::Jtr), " >B ");
        assert_eq!(long.to_rule_string(Style::Hashcat), " >C ");

        assert_eq!(PasswordPolicy::none().to_arg_string(), "");
        assert_eq!(PasswordPolicy::none().to_debug_string(), "None");
        assert!(PasswordPolicy::new(Some(0), PolicyFlags::empty()).is_err());
    }

    #[test]
    fn policy_arg_string_round_trip() {
        let cases: Vec<PasswordPolicy> = vec![
            PasswordPolicy::none(),
            PasswordPolicy::new(Some(1), PolicyFlags::empty()).unwrap(),
            PasswordPolicy::new(None, PolicyFlags::all()).unwrap(),
            PasswordPolicy::new(Some(35), PolicyFlags::LETTER | PolicyFlags::UPPER).unwrap(),
        ];
        for policy in cases {
            assert_eq!(PasswordPolicy::from_arg_string(&policy.to_arg_string()).unwrap(), policy);
            assert_eq!(PasswordPolicy::from_arg_string(&policy.to_debug_string()).unwrap(), policy);
        }
        assert!(PasswordPolicy::from_arg_string("--symbol").is_err());
    }

    #[test]
    fn policy_filter() {
        let policy = PasswordPolicy::new(Some(4), PolicyFlags::DIGIT | PolicyFlags::UPPER).unwrap();
        let cases: Vec<(&[u8], bool)> =
            vec![(b"Pass1", true), (b"P1", false), (b"pass1", false), (b"Passw", false), (b"1234A", true)];
        for (pw, expected) in cases {
            assert_eq!(policy.accepts(pw), expected, "{:?}", String::from_utf8_lossy(pw));
        }
        assert!(PasswordPolicy::none().accepts(b""));
    }
}
