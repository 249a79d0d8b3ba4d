extern crate self as ruleguess;

#[macro_use]
mod macros;
mod api;
mod config;
mod engine;
mod error;
mod io;
mod runlog;

pub use api::{
    GuessCounts, GuessEstimate, GuessRecord, InputPaths, Outcome, ScanReport, Session, apply_rule, clear_work_dir,
    count_rules, estimate_guess_number, invert_rule, parse_rule, rule_dependencies,
};
pub use config::{Config, LookupBackend, PasswordPolicy, PolicyFlags, Style};
pub use engine::charset::Charset;
pub use engine::dependency::{Dependency, DependencyList, Idx, Status, SubruleDependency};
pub use engine::invert::Inversion;
pub use engine::lookup::WordTrie;
pub use engine::metrics::{PhaseMetrics, ScanMetrics};
pub use engine::token::{Token, TokenString};
pub use error::{Error, Result};
pub use io::Wordlist;
pub use runlog::{RunLog, describe, format_record};

// --- Positions and comparisons ------------------------------------------------

/// A position or length parameter of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pos {
    Num(usize),
    /// `z` and `l`: beyond the end of any word.
    Infinite,
    /// Only known while a word is mangled: the `a`-`k` variables, `m` (last
    /// position of the memorized word) and `p` (last position found by `/` or
    /// `%`). Keeps the source character.
    Runtime(u8),
}

impl Pos {
    pub fn num(&self) -> Option<usize> {
        match self {
            Pos::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, Pos::Runtime(_))
    }
}

/// Comparison used by the length rejections `<N >N _N`.
///
/// JtR reads `<` and `>` strictly; hashcat reads them inclusively. The parser
/// picks the variant so later stages never look at the style again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LenCmp {
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Equal,
}

impl LenCmp {
    pub fn holds(self, len: usize, n: usize) -> bool {
        match self {
            LenCmp::Less => len < n,
            LenCmp::LessEq => len <= n,
            LenCmp::Greater => len > n,
            LenCmp::GreaterEq => len >= n,
            LenCmp::Equal => len == n,
        }
    }

    /// The comparison against an infinite bound.
    pub fn holds_infinite(self) -> bool {
        matches!(self, LenCmp::Less | LenCmp::LessEq)
    }

    /// Lengths `l` with `cmp(l, n)` as the half-open interval `[lo, hi)`.
    pub fn interval(self, n: usize) -> (usize, usize) {
        match self {
            LenCmp::Less => (0, n),
            LenCmp::LessEq => (0, n + 1),
            LenCmp::Greater => (n + 1, usize::MAX),
            LenCmp::GreaterEq => (n, usize::MAX),
            LenCmp::Equal => (n, n + 1),
        }
    }
}

/// JtR rejection flags `-c -8 -s -p -: -<N ->N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectFlag {
    Noop,
    CaseSensitive,
    EightBit,
    Split,
    WordPairs,
    LengthAtMost(Pos),
    LengthAtLeast(Pos),
}

impl RejectFlag {
    /// Whether the flag drops the whole rule in a plain wordlist run.
    pub fn rejects(&self) -> bool {
        matches!(self, RejectFlag::EightBit | RejectFlag::Split | RejectFlag::WordPairs)
    }
}

// --- Primitives ---------------------------------------------------------------

/// One mangling operation.
///
/// Character parameters are `Charset`s: a single byte for plain rule text, a
/// class for `?C`, or a bracket range left unexpanded by the parser. Only
/// `$ ^ i` and the string of `A` accept a multi-member set as a plain
/// parameter; for those the subrule stands for one candidate per member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `:`
    Noop,
    /// `l`
    Lower,
    /// `u`
    Upper,
    /// `c`
    Capitalize,
    /// `C`
    InvCapitalize,
    /// `t`
    ToggleAll,
    /// `r`
    Reverse,
    /// `d`
    Duplicate,
    /// `f`
    Reflect,
    /// `{`
    RotateLeft,
    /// `}`
    RotateRight,
    /// `[`
    DeleteFirst,
    /// `]`
    DeleteLast,
    /// `q`
    DupEach,
    /// `k`
    SwapFront,
    /// `K`
    SwapBack,
    /// `E`
    TitleSpace,
    /// `p` (JtR)
    Pluralize,
    /// `P`
    PastTense,
    /// `I`
    Gerund,
    /// `S`
    ShiftCase,
    /// `V`
    VowelsLower,
    /// `R` (JtR)
    KeyRight,
    /// `L` (JtR)
    KeyLeft,
    /// `M`
    Memorize,
    /// `Q`
    RejectUnchanged,
    /// `4` (hashcat)
    AppendMemory,
    /// `6` (hashcat)
    PrependMemory,

    /// `$X`
    Append(Charset),
    /// `^X`
    Prepend(Charset),
    /// `TN`
    ToggleAt(Pos),
    /// `'N`
    Truncate(Pos),
    /// `DN`
    DeleteAt(Pos),
    /// `pN` (hashcat): append the word N more times.
    DupWord(Pos),
    /// `zN`
    DupFirst(Pos),
    /// `ZN`
    DupLast(Pos),
    /// `LN` (hashcat)
    BitLeft(Pos),
    /// `RN` (hashcat)
    BitRight(Pos),
    /// `+N`
    Increment(Pos),
    /// `-N` (hashcat)
    Decrement(Pos),
    /// `.N`: replace with the next character.
    ReplaceNext(Pos),
    /// `,N`: replace with the previous character.
    ReplacePrev(Pos),
    /// `yN`
    DupBlockFront(Pos),
    /// `YN`
    DupBlockBack(Pos),

    /// `iNX`
    Insert(Pos, Charset),
    /// `oNX`
    Overwrite(Pos, u8),
    /// `ONM`: delete M characters starting at N.
    DeleteRange(Pos, Pos),
    /// `xNM`: keep M characters starting at N.
    Extract(Pos, Pos),
    /// `AN"str"` (JtR)
    InsertString(Pos, Vec<Charset>),
    /// `*NM` (hashcat)
    Swap(Pos, Pos),

    /// `XNMI`
    ExtractMemory(Pos, Pos, Pos),
    /// `vVNM` (JtR): variable, N, M.
    SetVar(u8, Pos, Pos),
    /// `1 2 +` (JtR single-crack modes)
    Mode(u8),
    /// `-c -8 -s -p -: -<N ->N` (JtR)
    Flag(RejectFlag),

    /// `<N >N _N`
    RejectLen(LenCmp, Pos),
    /// `!X`
    RejectIfContains(Charset),
    /// `/X`
    RejectUnlessContains(Charset),
    /// `=NX`
    RejectUnlessAt(Pos, Charset),
    /// `(X`
    RejectUnlessFirst(Charset),
    /// `)X`
    RejectUnlessLast(Charset),
    /// `%NX`
    RejectUnlessCount(Pos, Charset),
    /// `sXY`
    Replace(Charset, u8),
    /// `@X`
    Purge(Charset),
    /// `eX`
    TitleSep(Charset),
}

impl Primitive {
    /// The command character as written in rule text.
    pub fn opcode(&self) -> char {
        use Primitive::*;
        match self {
            Noop => ':',
            Lower => 'l',
            Upper => 'u',
            Capitalize => 'c',
            InvCapitalize => 'C',
            ToggleAll => 't',
            Reverse => 'r',
            Duplicate => 'd',
            Reflect => 'f',
            RotateLeft => '{',
            RotateRight => '}',
            DeleteFirst => '[',
            DeleteLast => ']',
            DupEach => 'q',
            SwapFront => 'k',
            SwapBack => 'K',
            TitleSpace => 'E',
            Pluralize => 'p',
            PastTense => 'P',
            Gerund => 'I',
            ShiftCase => 'S',
            VowelsLower => 'V',
            KeyRight => 'R',
            KeyLeft => 'L',
            Memorize => 'M',
            RejectUnchanged => 'Q',
            AppendMemory => '4',
            PrependMemory => '6',
            Append(_) => '$',
            Prepend(_) => '^',
            ToggleAt(_) => 'T',
            Truncate(_) => '\'',
            DeleteAt(_) => 'D',
            DupWord(_) => 'p',
            DupFirst(_) => 'z',
            DupLast(_) => 'Z',
            BitLeft(_) => 'L',
            BitRight(_) => 'R',
            Increment(_) => '+',
            Decrement(_) => '-',
            ReplaceNext(_) => '.',
            ReplacePrev(_) => ',',
            DupBlockFront(_) => 'y',
            DupBlockBack(_) => 'Y',
            Insert(..) => 'i',
            Overwrite(..) => 'o',
            DeleteRange(..) => 'O',
            Extract(..) => 'x',
            InsertString(..) => 'A',
            Swap(..) => '*',
            ExtractMemory(..) => 'X',
            SetVar(..) => 'v',
            Mode(m) => *m as char,
            Flag(_) => '-',
            RejectLen(LenCmp::Less | LenCmp::LessEq, _) => '<',
            RejectLen(LenCmp::Greater | LenCmp::GreaterEq, _) => '>',
            RejectLen(LenCmp::Equal, _) => '_',
            RejectIfContains(_) => '!',
            RejectUnlessContains(_) => '/',
            RejectUnlessAt(..) => '=',
            RejectUnlessFirst(_) => '(',
            RejectUnlessLast(_) => ')',
            RejectUnlessCount(..) => '%',
            Replace(..) => 's',
            Purge(_) => '@',
            TitleSep(_) => 'e',
        }
    }

    /// Position parameters, in rule-text order.
    pub fn positions(&self) -> Vec<Pos> {
        use Primitive::*;
        match self {
            ToggleAt(n) | Truncate(n) | DeleteAt(n) | DupWord(n) | DupFirst(n) | DupLast(n) | BitLeft(n)
            | BitRight(n) | Increment(n) | Decrement(n) | ReplaceNext(n) | ReplacePrev(n) | DupBlockFront(n)
            | DupBlockBack(n) | Insert(n, _) | Overwrite(n, _) | InsertString(n, _) | RejectLen(_, n)
            | RejectUnlessAt(n, _) | RejectUnlessCount(n, _) => vec![*n],
            DeleteRange(n, m) | Extract(n, m) | Swap(n, m) | SetVar(_, n, m) => vec![*n, *m],
            ExtractMemory(n, m, i) => vec![*n, *m, *i],
            Flag(RejectFlag::LengthAtLeast(n) | RejectFlag::LengthAtMost(n)) => vec![*n],
            _ => Vec::new(),
        }
    }

    pub fn has_runtime_position(&self) -> bool {
        self.positions().iter().any(Pos::is_runtime)
    }

    /// Primitives that read or write the memorized word or the variables.
    pub fn uses_memory(&self) -> bool {
        matches!(
            self,
            Primitive::Memorize
                | Primitive::RejectUnchanged
                | Primitive::AppendMemory
                | Primitive::PrependMemory
                | Primitive::ExtractMemory(..)
                | Primitive::SetVar(..)
        )
    }

    /// Number of candidates the primitive stands for (product of the sizes of
    /// its set-valued parameters).
    pub fn multiplicity(&self) -> u64 {
        match self {
            Primitive::Append(set) | Primitive::Prepend(set) | Primitive::Insert(_, set) => set.len() as u64,
            Primitive::InsertString(_, chars) => chars.iter().map(|c| c.len() as u64).product(),
            _ => 1,
        }
    }
}

// --- Rules ------------------------------------------------------------------------

/// A line of rule text after bracket expansion: primitives applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Subrule {
    pub primitives: Vec<Primitive>,
}

impl Subrule {
    pub fn new(primitives: Vec<Primitive>) -> Self {
        Subrule { primitives }
    }

    pub fn multiplicity(&self) -> u64 {
        self.primitives.iter().map(Primitive::multiplicity).product()
    }
}

/// How a rule can be matched against a password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feasibility {
    /// Symbolic inversion is sound and cheap.
    Invertible,
    /// Inversion is tried first; out-of-scope or oversized results fall back
    /// to the enumeration file.
    Optimizable,
    /// Only the enumeration file is searched.
    Uninvertible,
    /// Inversion skips the `Q` at this index and checks matches forward.
    SpecialMemory(usize),
}

impl Feasibility {
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Feasibility::Uninvertible => 0,
            Feasibility::SpecialMemory(_) => 1,
            Feasibility::Optimizable => 2,
            Feasibility::Invertible => 3,
        }
    }

    /// The less feasible of two classifications.
    pub fn meet(self, other: Feasibility) -> Feasibility {
        if other.rank() < self.rank() { other } else { self }
    }

    /// Whether the scan needs an enumeration file for this rule.
    pub fn needs_enumeration(&self) -> bool {
        !matches!(self, Feasibility::Invertible | Feasibility::SpecialMemory(_))
    }
}

/// A parsed rule line.
#[derive(Debug, Clone)]
pub struct Rule {
    pub raw: String,
    pub subrules: Vec<Subrule>,
    pub feasibility: Feasibility,
    /// One entry per subrule, `None` when some subrule cannot be expressed
    /// with dependencies and must be counted by mangling.
    pub dependencies: Option<Vec<SubruleDependency>>,
}

impl Rule {
    /// Total candidates per word when every subrule applies.
    pub fn multiplicity(&self) -> u64 {
        self.subrules.iter().map(Subrule::multiplicity).sum()
    }
}
