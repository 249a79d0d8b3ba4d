//! Rule inversion and guess counting engine.
//!
//! The engine answers two questions about a wordlist + rule-list attack without
//! running it: *which words produce this password under this rule* (inversion)
//! and *how many candidates does each rule emit* (counting). Everything else in
//! the crate (sessions, caches, the CLI) is plumbing around these two.
//!
//! ## How the parts work together
//!
//! ```text
//! rule text ── parse_line (parser.rs) ──> Vec<Subrule>
//!                                              │
//!              classify (feasibility.rs) <─────┤
//!                                              │
//!         ┌────────────────────────────────────┼───────────────────────────┐
//!         v                                    v                           v
//!  invert_rule (invert.rs)          extract (extract.rs)          apply (mangle.rs)
//!   password -> TokenStrings         subrule -> SubruleDependency   word -> candidates
//!         │                                    │                           │
//!         v                                    v                           │
//!  WordTrie / SortedLookup          count_rules (count.rs) <──────────────┘
//!   (lookup.rs)                      dependency histograms         (uncountable rules)
//! ```
//!
//! The carrier of all symbolic work is the [`TokenString`]: a string whose
//! positions are byte sets (`charset.rs`, `token.rs`). Inverting a primitive
//! maps one token string to a small list of token strings; a rule is inverted
//! right to left, subrule by subrule.
//!
//! ## Responsibilities by module
//!
//! - `charset.rs`: 256-bit byte sets, `?C` classes, case/keyboard maps.
//! - `token.rs`: `Token` and `TokenString`, with length windows and repetition.
//! - `parser.rs`: rule text to subrules (JtR preprocessor ranges included).
//! - `english.rs`: plural/past/gerund tables shared by `mangle` and `invert`.
//! - `mangle.rs`: the forward engine; ground truth for every other module.
//! - `invert.rs`: per-primitive inverses and their composition.
//! - `feasibility.rs`: static rule classification.
//! - `dependency.rs`: dependency predicates and the `clean_list` normal form.
//! - `extract.rs`: symbolic forward interpretation producing dependencies.
//! - `count.rs`: guess counting and guess-number estimates for both styles.
//! - `lookup.rs`: word trie and sorted enumeration-file lookups.
//! - `metrics.rs`: timings and counters for a scan.
//!
//! ## Debugging
//!
//! Set `RULEGUESS_DEBUG=1` (or pass `--debug`) to print tagged traces from the
//! parser, classifier, extractor, counter, inverter and lookups.
//!
//! [`TokenString`]: token::TokenString

#[path = "engine/charset.rs"]
pub mod charset;
#[path = "engine/count.rs"]
pub mod count;
#[path = "engine/dependency.rs"]
pub mod dependency;
#[path = "engine/english.rs"]
pub mod english;
#[path = "engine/extract.rs"]
pub mod extract;
#[path = "engine/feasibility.rs"]
pub mod feasibility;
#[path = "engine/invert.rs"]
pub mod invert;
#[path = "engine/lookup.rs"]
pub mod lookup;
#[path = "engine/mangle.rs"]
pub mod mangle;
#[path = "engine/metrics.rs"]
pub mod metrics;
#[path = "engine/parser.rs"]
pub mod parser;
#[path = "engine/token.rs"]
pub mod token;
