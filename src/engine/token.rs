//! Set-valued strings.
//!
//! A `TokenString` stands for a set of concrete words: position `i` may hold
//! any byte of token `i`. The inverter only ever manipulates token strings,
//! so a preimage like "any of 36 case variants of `abc`" stays three tokens
//! instead of 36 words.
//!
//! A token may also repeat (`min..=max` times, `max = None` for unbounded).
//! Such token strings describe words of varying length and only appear when
//! the inverter runs with `enable_regex`. A length window `[min_len, max_len)`
//! narrows the lengths a token string accepts.

use crate::engine::charset::{Charset, escape_byte};
use itertools::Itertools;
use std::fmt;

/// A set of bytes, repeated between `min` and `max` times.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token {
    chars: Charset,
    min: usize,
    max: Option<usize>,
}

impl Token {
    /// A single position.
    pub fn new(chars: Charset) -> Self {
        Token { chars, min: 1, max: Some(1) }
    }

    pub fn byte(b: u8) -> Self {
        Token::new(Charset::single(b))
    }

    pub fn repeated(chars: Charset, min: usize, max: Option<usize>) -> Self {
        Token { chars, min, max }
    }

    pub fn chars(&self) -> Charset {
        self.chars
    }

    pub fn set_chars(&mut self, chars: Charset) {
        self.chars = chars;
    }

    pub fn with_chars(&self, chars: Charset) -> Token {
        Token { chars, ..self.clone() }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn is_regex(&self) -> bool {
        !(self.min == 1 && self.max == Some(1))
    }

    /// Whether the token can stand for the empty string.
    pub fn is_optional(&self) -> bool {
        self.min == 0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.chars)?;
        if self.is_regex() {
            match self.max {
                Some(max) => write!(f, "{{{},{}}}", self.min, max)?,
                None => write!(f, "{{{},}}", self.min)?,
            }
        }
        Ok(())
    }
}

/// An ordered list of tokens with a length window.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct TokenString {
    tokens: Vec<Token>,
    min_len: usize,
    /// Exclusive; `None` leaves lengths unbounded.
    max_len: Option<usize>,
}

impl TokenString {
    pub fn from_word(word: &[u8]) -> Self {
        TokenString::from_tokens(word.iter().map(|b| Token::byte(*b)).collect())
    }

    pub fn from_sets(sets: impl IntoIterator<Item = Charset>) -> Self {
        TokenString::from_tokens(sets.into_iter().map(Token::new).collect())
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        TokenString { tokens, min_len: 0, max_len: None }
    }

    /// Token string matching only the empty word.
    pub fn empty_word() -> Self {
        TokenString { tokens: Vec::new(), min_len: 0, max_len: Some(1) }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut Vec<Token> {
        &mut self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Number of tokens; the word length for plain token strings.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn is_regex(&self) -> bool {
        self.tokens.iter().any(Token::is_regex)
    }

    /// The charset at each position of a plain token string.
    pub fn sets(&self) -> Vec<Charset> {
        self.tokens.iter().map(Token::chars).collect()
    }

    pub fn set(&self, idx: usize) -> Charset {
        self.tokens[idx].chars
    }

    pub fn set_at(&mut self, idx: usize, chars: Charset) {
        self.tokens[idx].chars = chars;
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn insert(&mut self, idx: usize, token: Token) {
        self.tokens.insert(idx, token);
    }

    pub fn remove(&mut self, idx: usize) -> Token {
        self.tokens.remove(idx)
    }

    /// Tokens `range` as a new token string with an open window.
    pub fn slice(&self, range: std::ops::Range<usize>) -> TokenString {
        TokenString::from_tokens(self.tokens[range].to_vec())
    }

    pub fn concat(&self, other: &TokenString) -> TokenString {
        let mut tokens = self.tokens.clone();
        tokens.extend(other.tokens.iter().cloned());
        TokenString::from_tokens(tokens)
    }

    pub fn reversed(&self) -> TokenString {
        let mut out = self.clone();
        out.tokens.reverse();
        out
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    /// Only accept lengths below `l`. Never widens the window.
    pub fn set_max_len(&mut self, l: usize) {
        self.max_len = Some(self.max_len.map_or(l, |cur| cur.min(l)));
    }

    /// Only accept lengths of at least `l`. Never widens the window.
    pub fn set_min_len(&mut self, l: usize) {
        self.min_len = self.min_len.max(l);
    }

    pub fn reset_max_len(&mut self) {
        self.max_len = None;
    }

    pub fn reset_min_len(&mut self) {
        self.min_len = 0;
    }

    /// Shift the window after removing `k` characters from every word.
    pub fn shrink_window(&mut self, k: usize) {
        self.min_len = self.min_len.saturating_sub(k);
        self.max_len = self.max_len.map(|m| m.saturating_sub(k));
    }

    /// Shift the window after adding `k` characters to every word.
    pub fn grow_window(&mut self, k: usize) {
        self.min_len += k;
        self.max_len = self.max_len.map(|m| m.saturating_add(k));
    }

    /// Inclusive bounds on the length of the words described.
    pub fn length_bounds(&self) -> (usize, Option<usize>) {
        let lo = self.tokens.iter().map(|t| t.min).sum::<usize>().max(self.min_len);
        let token_hi = self.tokens.iter().try_fold(0usize, |acc, t| t.max.map(|m| acc + m));
        let window_hi = self.max_len.map(|m| m.saturating_sub(1));
        let hi = match (token_hi, window_hi) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        (lo, hi)
    }

    /// Whether the token string describes at least one word.
    pub fn is_valid(&self) -> bool {
        if self.max_len.is_some_and(|m| m <= self.min_len) {
            return false;
        }
        if self.tokens.iter().any(|t| t.min > 0 && t.chars.is_empty()) {
            return false;
        }
        if self.tokens.iter().any(|t| t.max.is_some_and(|m| m < t.min)) {
            return false;
        }
        let (lo, hi) = self.length_bounds();
        hi.is_none_or(|hi| lo <= hi)
    }

    /// Whether `word` is one of the words described.
    pub fn contains(&self, word: &[u8]) -> bool {
        if word.len() < self.min_len || self.max_len.is_some_and(|m| word.len() >= m) {
            return false;
        }
        if !self.is_regex() {
            return self.tokens.len() == word.len() && self.tokens.iter().zip(word).all(|(t, b)| t.chars.contains(*b));
        }
        let mut reach = vec![false; word.len() + 1];
        reach[0] = true;
        for token in &self.tokens {
            let mut next = vec![false; word.len() + 1];
            for start in 0..=word.len() {
                if !reach[start] {
                    continue;
                }
                let mut end = start;
                let mut reps = 0;
                loop {
                    if reps >= token.min {
                        next[end] = true;
                    }
                    if token.max.is_some_and(|m| reps >= m) || end >= word.len() || !token.chars.contains(word[end]) {
                        break;
                    }
                    end += 1;
                    reps += 1;
                }
            }
            reach = next;
        }
        reach[word.len()]
    }

    /// Number of words of a plain token string, saturating; `None` for
    /// repetition tokens.
    pub fn number_of_strings(&self) -> Option<u128> {
        if self.is_regex() {
            return None;
        }
        if !self.is_valid() {
            return Some(0);
        }
        Some(self.tokens.iter().fold(1u128, |acc, t| acc.saturating_mul(t.chars.len() as u128)))
    }

    /// Every word of a plain token string, in lexicographic byte order.
    ///
    /// Callers check [`TokenString::number_of_strings`] first: the result is
    /// the full Cartesian product. Returns `None` for repetition tokens.
    pub fn to_strings(&self) -> Option<Vec<Vec<u8>>> {
        if self.is_regex() {
            return None;
        }
        if !self.is_valid() {
            return Some(Vec::new());
        }
        if self.tokens.is_empty() {
            return Some(vec![Vec::new()]);
        }
        Some(self.tokens.iter().map(|t| t.chars.to_vec()).multi_cartesian_product().collect())
    }

    /// All plain token strings of exactly `n` characters contained in `self`,
    /// one per way of distributing repetitions.
    pub fn enumerate_n(&self, n: usize) -> Vec<TokenString> {
        if n < self.min_len || self.max_len.is_some_and(|m| n >= m) {
            return Vec::new();
        }
        let mut out = Vec::new();
        enumerate_rec(&self.tokens, n, Vec::new(), &mut out);
        out.into_iter().map(TokenString::from_tokens).filter(TokenString::is_valid).collect()
    }

    /// The words of `self` with at least `n` characters, rewritten so the
    /// first `n` positions are plain tokens. Repetition tokens after them
    /// survive.
    pub fn fix_first_n(&self, n: usize) -> Vec<TokenString> {
        let mut out = Vec::new();
        fix_first_rec(&self.tokens, n, Vec::new(), &mut out);
        out.into_iter()
            .map(|tokens| {
                let mut ts = TokenString::from_tokens(tokens);
                ts.min_len = self.min_len.max(n);
                ts.max_len = self.max_len;
                ts
            })
            .filter(TokenString::is_valid)
            .collect()
    }

    /// Like [`TokenString::fix_first_n`] for the last `n` positions.
    pub fn fix_last_n(&self, n: usize) -> Vec<TokenString> {
        self.reversed().fix_first_n(n).into_iter().map(|ts| ts.reversed()).collect()
    }

    /// The words of `self` shorter than `n`.
    pub fn shorter_than(&self, n: usize) -> TokenString {
        let mut out = self.clone();
        out.set_max_len(n);
        out
    }
}

fn enumerate_rec(tokens: &[Token], budget: usize, prefix: Vec<Token>, out: &mut Vec<Vec<Token>>) {
    let Some((token, rest)) = tokens.split_first() else {
        if budget == 0 {
            out.push(prefix);
        }
        return;
    };
    let rest_min: usize = rest.iter().map(|t| t.min).sum();
    let hi = token.max.map_or(budget, |m| m.min(budget));
    for reps in token.min..=hi {
        if reps > 0 && token.chars.is_empty() {
            break;
        }
        if reps + rest_min > budget {
            break;
        }
        let mut next = prefix.clone();
        next.extend(std::iter::repeat_n(Token::new(token.chars), reps));
        enumerate_rec(rest, budget - reps, next, out);
    }
}

fn fix_first_rec(tokens: &[Token], k: usize, prefix: Vec<Token>, out: &mut Vec<Vec<Token>>) {
    if k == 0 {
        let mut done = prefix;
        done.extend(tokens.iter().cloned());
        out.push(done);
        return;
    }
    let Some((token, rest)) = tokens.split_first() else {
        return;
    };
    if !token.is_regex() {
        let mut next = prefix;
        next.push(token.clone());
        fix_first_rec(rest, k - 1, next, out);
        return;
    }
    let hi = token.max.map_or(k, |m| m.min(k));
    for reps in 0..=hi {
        if reps > 0 && token.chars.is_empty() {
            break;
        }
        let mut next = prefix.clone();
        next.extend(std::iter::repeat_n(Token::new(token.chars), reps));
        if reps == k {
            // The prefix is complete inside this token; keep what is left of it.
            let residual_max = token.max.map(|m| m - reps);
            if residual_max != Some(0) {
                next.push(Token::repeated(token.chars, token.min.saturating_sub(reps), residual_max));
            }
            next.extend(rest.iter().cloned());
            out.push(next);
        } else if reps >= token.min {
            fix_first_rec(rest, k - reps, next, out);
        }
    }
}

impl fmt::Debug for TokenString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for token in &self.tokens {
            if token.chars.len() == 1 && !token.is_regex() {
                if let Some(b) = token.chars.first() {
                    write!(f, "{}", escape_byte(b))?;
                    continue;
                }
            }
            write!(f, "{{{:?}}}", token)?;
        }
        write!(f, "\"")?;
        if self.min_len > 0 || self.max_len.is_some() {
            match self.max_len {
                Some(m) => write!(f, "[{},{})", self.min_len, m)?,
                None => write!(f, "[{},)", self.min_len)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_lower() -> Charset {
        Charset::range(b'a', b'z')
    }

    #[test]
    fn plain_strings() {
        let ts = TokenString::from_sets([Charset::from_bytes(b"ab"), Charset::single(b'x'), Charset::from_bytes(b"12")]);
        assert_eq!(ts.number_of_strings(), Some(4));
        let words = ts.to_strings().unwrap();
        assert_eq!(words, vec![b"ax1".to_vec(), b"ax2".to_vec(), b"bx1".to_vec(), b"bx2".to_vec()]);
        assert!(ts.contains(b"bx2"));
        assert!(!ts.contains(b"cx2"));
        assert!(!ts.contains(b"bx"));

        let empty = TokenString::from_word(b"");
        assert_eq!(empty.to_strings().unwrap(), vec![Vec::<u8>::new()]);
        assert!(TokenString::empty_word().contains(b""));
        assert!(!TokenString::empty_word().contains(b"a"));
    }

    #[test]
    fn regex_contains() {
        let mut tokens = TokenString::from_word(b"ab").into_tokens();
        tokens.push(Token::repeated(any_lower(), 0, None));
        let ts = TokenString::from_tokens(tokens);
        assert!(ts.is_regex());
        assert_eq!(ts.number_of_strings(), None);
        assert!(ts.to_strings().is_none());

        let cases: Vec<(&[u8], bool)> = vec![(b"ab", true), (b"abc", true), (b"abzzz", true), (b"a", false), (b"abC", false)];
        for (word, expected) in cases {
            assert_eq!(ts.contains(word), expected, "{:?}", String::from_utf8_lossy(word));
        }

        let mut short = ts.clone();
        short.set_max_len(4);
        assert!(short.contains(b"abc"));
        assert!(!short.contains(b"abcd"));
        short.set_max_len(10);
        assert_eq!(short.max_len(), Some(4));
    }

    #[test]
    fn windows_and_validity() {
        let mut ts = TokenString::from_tokens(vec![Token::repeated(any_lower(), 2, Some(5))]);
        assert_eq!(ts.length_bounds(), (2, Some(5)));
        ts.set_min_len(3);
        ts.set_max_len(4);
        assert_eq!(ts.length_bounds(), (3, Some(3)));
        assert!(ts.is_valid());
        ts.set_max_len(3);
        assert!(!ts.is_valid());

        let empty_set = TokenString::from_sets([Charset::EMPTY]);
        assert!(!empty_set.is_valid());
        assert_eq!(empty_set.number_of_strings(), Some(0));
    }

    #[test]
    fn enumerate_exact_lengths() {
        let ts = TokenString::from_tokens(vec![
            Token::repeated(Charset::single(b'a'), 0, None),
            Token::byte(b'b'),
            Token::repeated(Charset::single(b'c'), 1, Some(2)),
        ]);
        let words: Vec<Vec<u8>> = ts.enumerate_n(4).iter().flat_map(|t| t.to_strings().unwrap()).sorted().collect();
        assert_eq!(words, vec![b"aabc".to_vec(), b"abcc".to_vec()]);
        assert!(ts.enumerate_n(1).is_empty());
    }

    #[test]
    fn fix_prefix_and_suffix() {
        let ts = TokenString::from_tokens(vec![Token::repeated(any_lower(), 0, None), Token::byte(b'!')]);
        let fixed = ts.fix_first_n(2);
        assert!(!fixed.is_empty());
        for part in &fixed {
            assert!(!part.tokens()[0].is_regex());
            assert!(!part.tokens()[1].is_regex());
        }
        let covers = |w: &[u8]| fixed.iter().any(|t| t.contains(w));
        assert!(covers(b"a!"));
        assert!(covers(b"ab!"));
        assert!(covers(b"abcd!"));
        assert!(!covers(b"!"));

        let tail = ts.fix_last_n(2);
        assert!(tail.iter().any(|t| t.contains(b"xy!")));
        assert!(tail.iter().all(|t| !t.contains(b"!")));
        assert!(tail.iter().all(|t| !t.tokens()[t.len() - 1].is_regex()));

        assert!(ts.shorter_than(2).contains(b"!"));
        assert!(!ts.shorter_than(2).contains(b"a!"));
    }
}
