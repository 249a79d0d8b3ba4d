//! Character sets, character classes and per-byte conversion maps.
//!
//! Every symbolic computation in the engine works over sets of bytes. A set is
//! a 256-bit bitmap (`Charset`), so union/intersection/difference are four
//! word operations and sets are `Copy`.
//!
//! Case and keyboard conversions are total byte maps (`CharMap`). Inverting a
//! conversion is taking the preimage of a set under the map, which is what the
//! inverter does for every char-wise primitive.

use crate::config::Style;
use once_cell::sync::Lazy;
use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

pub const WHITESPACE: &[u8] = b" ";
pub const CHARS_VOWELS: &[u8] = b"aeiouAEIOU";
pub const CHARS_CONSONANTS: &[u8] = b"bcdfghjklmnpqrstvwxyzBCDFGHJKLMNPQRSTVWXYZ";
pub const CHARS_LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
pub const CHARS_UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const CHARS_PUNCTUATION: &[u8] = b".,:;'\"?!`";
pub const CHARS_SPECIALS: &[u8] = b"$%^&*()-_+=|\\<>[]{}#@/~";
pub const CHARS_DIGITS: &[u8] = b"0123456789";

// Keyboard rows used by the shift-case, vowel and keyboard-shift primitives.
// Each string is aligned with `CONV_SOURCE` position by position.
const CONV_SOURCE: &[u8] = b"`1234567890-=\\qwertyuiop[]asdfghjkl;'zxcvbnm,./~!@#$%^&*()_+|QWERTYUIOP{}ASDFGHJKL:\"ZXCVBNM<>?";
const CONV_SHIFT: &[u8] = b"~!@#$%^&*()_+|QWERTYUIOP{}ASDFGHJKL:\"ZXCVBNM<>?`1234567890-=\\qwertyuiop[]asdfghjkl;'zxcvbnm,./";
const CONV_VOWELS: &[u8] = b"`1234567890-=\\QWeRTYuioP[]aSDFGHJKL;'ZXCVBNM,./~!@#$%^&*()_+|QWeRTYuioP{}aSDFGHJKL:\"ZXCVBNM<>?";
const CONV_RIGHT: &[u8] = b"1234567890-=\\\\wertyuiop[]]sdfghjkl;''xcvbnm,./\\!@#$%^&*()_+||WERTYUIOP{}}SDFGHJKL:\"\"XCVBNM<>?|";
const CONV_LEFT: &[u8] = b"``1234567890-=qqwertyuiop[aasdfghjkl;zzxcvbnm,.~~!@#$%^&*()_+QQWERTYUIOP{AASDFGHJKL:ZZXCVBNM<>";

// --- Charset -----------------------------------------------------------------

/// A set of bytes, stored as a 256-bit bitmap.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Charset([u64; 4]);

impl Charset {
    pub const EMPTY: Charset = Charset([0; 4]);
    pub const ALL: Charset = Charset([u64::MAX; 4]);

    pub const fn single(b: u8) -> Self {
        let mut words = [0u64; 4];
        words[(b >> 6) as usize] = 1u64 << (b & 63);
        Charset(words)
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut set = Charset::EMPTY;
        for &b in bytes {
            set.insert(b);
        }
        set
    }

    /// Inclusive byte range `lo..=hi`.
    pub fn range(lo: u8, hi: u8) -> Self {
        let mut set = Charset::EMPTY;
        for b in lo..=hi {
            set.insert(b);
        }
        set
    }

    /// Printable ASCII, `0x20..=0x7e`.
    pub fn printable() -> Self {
        Charset::range(32, 126)
    }

    /// The alphabet words and passwords are drawn from in `style`.
    pub fn sigma(style: Style) -> Self {
        match style {
            Style::Jtr => Charset::printable(),
            Style::Hashcat => Charset::ALL,
        }
    }

    #[inline]
    pub fn contains(&self, b: u8) -> bool {
        self.0[(b >> 6) as usize] & (1u64 << (b & 63)) != 0
    }

    #[inline]
    pub fn insert(&mut self, b: u8) {
        self.0[(b >> 6) as usize] |= 1u64 << (b & 63);
    }

    #[inline]
    pub fn remove(&mut self, b: u8) {
        self.0[(b >> 6) as usize] &= !(1u64 << (b & 63));
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    pub fn union(&self, other: &Charset) -> Charset {
        let mut out = *self;
        for (a, b) in out.0.iter_mut().zip(other.0.iter()) {
            *a |= *b;
        }
        out
    }

    pub fn intersect(&self, other: &Charset) -> Charset {
        let mut out = *self;
        for (a, b) in out.0.iter_mut().zip(other.0.iter()) {
            *a &= *b;
        }
        out
    }

    pub fn difference(&self, other: &Charset) -> Charset {
        let mut out = *self;
        for (a, b) in out.0.iter_mut().zip(other.0.iter()) {
            *a &= !*b;
        }
        out
    }

    pub fn is_subset(&self, other: &Charset) -> bool {
        self.difference(other).is_empty()
    }

    pub fn is_disjoint(&self, other: &Charset) -> bool {
        self.intersect(other).is_empty()
    }

    /// Members in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + use<> {
        let set = *self;
        (0u16..256).map(|b| b as u8).filter(move |b| set.contains(*b))
    }

    pub fn first(&self) -> Option<u8> {
        self.iter().next()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.iter().collect()
    }
}

impl BitOr for Charset {
    type Output = Charset;
    fn bitor(self, rhs: Charset) -> Charset {
        self.union(&rhs)
    }
}

impl BitAnd for Charset {
    type Output = Charset;
    fn bitand(self, rhs: Charset) -> Charset {
        self.intersect(&rhs)
    }
}

impl Sub for Charset {
    type Output = Charset;
    fn sub(self, rhs: Charset) -> Charset {
        self.difference(&rhs)
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = class_name(self) {
            return write!(f, "?{}", name as char);
        }
        if self.len() == 1 {
            if let Some(b) = self.first() {
                return write!(f, "{}", escape_byte(b));
            }
        }
        write!(f, "[")?;
        for b in self.iter() {
            write!(f, "{}", escape_byte(b))?;
        }
        write!(f, "]")
    }
}

/// Render a byte for traces and log records; non-printables use `\xNN`.
pub fn escape_byte(b: u8) -> String {
    if (32..127).contains(&b) { (b as char).to_string() } else { format!("\\x{:02x}", b) }
}

pub fn escape_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| escape_byte(*b)).collect()
}

// --- Character classes -------------------------------------------------------

/// Resolve a `?C` class code.
///
/// Lowercase codes name a class; the uppercase code is the complement of the
/// lowercase class within the printable characters. `??` is a literal `?`.
pub fn char_class(code: u8, style: Style) -> Option<Charset> {
    let lower = match code.to_ascii_lowercase() {
        b'?' => return Some(Charset::single(b'?')),
        b'v' => Charset::from_bytes(CHARS_VOWELS),
        b'c' => Charset::from_bytes(CHARS_CONSONANTS),
        b'w' => Charset::from_bytes(WHITESPACE),
        b'p' => Charset::from_bytes(CHARS_PUNCTUATION),
        b's' => Charset::from_bytes(CHARS_SPECIALS),
        b'l' => Charset::from_bytes(CHARS_LOWER),
        b'u' => Charset::from_bytes(CHARS_UPPER),
        b'd' => Charset::from_bytes(CHARS_DIGITS),
        b'a' => Charset::from_bytes(CHARS_LOWER) | Charset::from_bytes(CHARS_UPPER),
        b'x' => Charset::from_bytes(CHARS_LOWER) | Charset::from_bytes(CHARS_UPPER) | Charset::from_bytes(CHARS_DIGITS),
        b'z' => Charset::sigma(style),
        _ => return None,
    };
    if code.is_ascii_uppercase() { Some(Charset::printable() - lower) } else { Some(lower) }
}

fn class_name(set: &Charset) -> Option<u8> {
    static NAMED: Lazy<Vec<(Charset, u8)>> = Lazy::new(|| {
        b"ludaxsp"
            .iter()
            .filter_map(|code| char_class(*code, Style::Jtr).map(|set| (set, *code)))
            .chain([(Charset::ALL, b'z'), (Charset::printable(), b'z')])
            .collect()
    });
    NAMED.iter().find(|(named, _)| named == set).map(|(_, code)| *code)
}

// --- CharMap -----------------------------------------------------------------

/// A total map from bytes to bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharMap([u8; 256]);

impl CharMap {
    pub fn identity() -> Self {
        let mut table = [0u8; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8;
        }
        CharMap(table)
    }

    pub fn from_fn(f: impl Fn(u8) -> u8) -> Self {
        let mut table = [0u8; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = f(i as u8);
        }
        CharMap(table)
    }

    /// Map each byte of `from` to the byte at the same position of `to`; all
    /// other bytes map to themselves.
    fn from_rows(from: &[u8], to: &[u8]) -> Self {
        let mut map = CharMap::identity();
        for (src, dst) in from.iter().zip(to.iter()) {
            map.0[*src as usize] = *dst;
        }
        map
    }

    /// `sXY`: every member of `from` becomes `to`.
    pub fn replace(from: Charset, to: u8) -> Self {
        CharMap::from_fn(|b| if from.contains(b) { to } else { b })
    }

    #[inline]
    pub fn apply(&self, b: u8) -> u8 {
        self.0[b as usize]
    }

    pub fn apply_all(&self, bytes: &mut [u8]) {
        for b in bytes.iter_mut() {
            *b = self.apply(*b);
        }
    }

    /// `next ∘ self`: apply `self` first, then `next`.
    pub fn then(&self, next: &CharMap) -> CharMap {
        CharMap::from_fn(|b| next.apply(self.apply(b)))
    }

    pub fn image(&self, set: Charset) -> Charset {
        let mut out = Charset::EMPTY;
        for b in set.iter() {
            out.insert(self.apply(b));
        }
        out
    }

    pub fn preimage(&self, set: Charset) -> Charset {
        let mut out = Charset::EMPTY;
        for b in 0..=255u8 {
            if set.contains(self.apply(b)) {
                out.insert(b);
            }
        }
        out
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, b)| *b == i as u8)
    }

    /// Bytes the map changes.
    pub fn moved(&self) -> Charset {
        let mut out = Charset::EMPTY;
        for b in 0..=255u8 {
            if self.apply(b) != b {
                out.insert(b);
            }
        }
        out
    }
}

impl fmt::Debug for CharMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            return write!(f, "CharMap(id)");
        }
        write!(f, "CharMap(moves {:?})", self.moved())
    }
}

pub static LOWER: Lazy<CharMap> = Lazy::new(|| CharMap::from_fn(|b| b.to_ascii_lowercase()));
pub static UPPER: Lazy<CharMap> = Lazy::new(|| CharMap::from_fn(|b| b.to_ascii_uppercase()));
pub static TOGGLE: Lazy<CharMap> = Lazy::new(|| {
    CharMap::from_fn(|b| {
        if b.is_ascii_lowercase() {
            b.to_ascii_uppercase()
        } else if b.is_ascii_uppercase() {
            b.to_ascii_lowercase()
        } else {
            b
        }
    })
});
pub static SHIFT: Lazy<CharMap> = Lazy::new(|| CharMap::from_rows(CONV_SOURCE, CONV_SHIFT));
pub static VOWELS: Lazy<CharMap> = Lazy::new(|| CharMap::from_rows(CONV_SOURCE, CONV_VOWELS));
pub static KEY_RIGHT: Lazy<CharMap> = Lazy::new(|| CharMap::from_rows(CONV_SOURCE, CONV_RIGHT));
pub static KEY_LEFT: Lazy<CharMap> = Lazy::new(|| CharMap::from_rows(CONV_SOURCE, CONV_LEFT));
pub static BIT_LEFT: Lazy<CharMap> = Lazy::new(|| CharMap::from_fn(|b| b.wrapping_shl(1)));
pub static BIT_RIGHT: Lazy<CharMap> = Lazy::new(|| CharMap::from_fn(|b| b >> 1));
pub static INCREMENT: Lazy<CharMap> = Lazy::new(|| CharMap::from_fn(|b| b.wrapping_add(1)));
pub static DECREMENT: Lazy<CharMap> = Lazy::new(|| CharMap::from_fn(|b| b.wrapping_sub(1)));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_operations() {
        let abc = Charset::from_bytes(b"abc");
        let bcd = Charset::from_bytes(b"bcd");
        assert_eq!(abc.len(), 3);
        assert_eq!((abc & bcd).to_vec(), b"bc".to_vec());
        assert_eq!((abc | bcd).to_vec(), b"abcd".to_vec());
        assert_eq!((abc - bcd).to_vec(), b"a".to_vec());
        assert!(Charset::single(b'b').is_subset(&abc));
        assert!(!abc.is_subset(&bcd));
        assert!(Charset::EMPTY.is_empty());
        assert_eq!(Charset::ALL.len(), 256);
        assert!(Charset::single(255).contains(255));
    }

    #[test]
    fn class_table() {
        let cases: Vec<(u8, usize)> = vec![
            (b'v', 10),
            (b'c', 42),
            (b'w', 1),
            (b'p', 9),
            (b's', 23),
            (b'l', 26),
            (b'u', 26),
            (b'd', 10),
            (b'a', 52),
            (b'x', 62),
            (b'?', 1),
            (b'D', 85),
            (b'A', 43),
        ];
        for (code, size) in cases {
            let set = char_class(code, Style::Jtr).unwrap();
            assert_eq!(set.len(), size, "class ?{}", code as char);
        }
        assert_eq!(char_class(b'z', Style::Jtr).unwrap().len(), 95);
        assert_eq!(char_class(b'z', Style::Hashcat).unwrap().len(), 256);
        assert!(char_class(b'q', Style::Jtr).is_none());
    }

    #[test]
    fn conversion_rows_are_aligned() {
        assert_eq!(CONV_SOURCE.len(), CONV_SHIFT.len());
        assert_eq!(CONV_SOURCE.len(), CONV_VOWELS.len());
        assert_eq!(CONV_SOURCE.len(), CONV_RIGHT.len());
        assert_eq!(CONV_SOURCE.len(), CONV_LEFT.len());
    }

    #[test]
    fn maps_and_preimages() {
        assert_eq!(SHIFT.apply(b'1'), b'!');
        assert_eq!(SHIFT.apply(b'a'), b'A');
        assert_eq!(VOWELS.apply(b'E'), b'e');
        assert_eq!(VOWELS.apply(b'q'), b'Q');
        assert_eq!(KEY_RIGHT.apply(b'q'), b'w');
        assert_eq!(KEY_LEFT.apply(b'w'), b'q');
        assert_eq!(TOGGLE.apply(b'x'), b'X');
        assert_eq!(BIT_LEFT.apply(0x81), 0x02);

        let pre = LOWER.preimage(Charset::from_bytes(b"a-"));
        assert_eq!(pre.to_vec(), b"-Aa".to_vec());
        assert!(LOWER.preimage(Charset::single(b'A')).is_empty());
        assert_eq!(KEY_RIGHT.preimage(Charset::single(b'\\')).len(), 3);

        let replace = CharMap::replace(Charset::from_bytes(b"ae"), b'4');
        assert_eq!(replace.preimage(Charset::single(b'4')).to_vec(), b"4ae".to_vec());
        assert_eq!(replace.moved().to_vec(), b"ae".to_vec());
        assert!(CharMap::identity().is_identity());
        assert_eq!(LOWER.then(&UPPER).apply(b'q'), b'Q');
    }
}
