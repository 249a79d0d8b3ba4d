use super::*;
use crate::engine::mangle::Mangler;
use crate::engine::parser::parse_line;

const ALPHABET: &[u8] = b"abcsyB1 ";

fn small(config: Config) -> Config {
    Config { max_password_length: 6, min_cut_length: 7, ..config }
}

fn rule(raw: &str, config: &Config, feasibility: Feasibility) -> Rule {
    Rule { raw: raw.to_string(), subrules: parse_line(raw, config).unwrap(), feasibility, dependencies: None }
}

/// Every word over `ALPHABET` with at most four characters.
fn domain() -> Vec<Vec<u8>> {
    let mut layer: Vec<Vec<u8>> = vec![Vec::new()];
    let mut all = layer.clone();
    for _ in 0..4 {
        layer = layer
            .iter()
            .flat_map(|w| ALPHABET.iter().map(move |b| [w.as_slice(), &[*b]].concat()))
            .collect();
        all.extend(layer.iter().cloned());
    }
    all
}

/// The inversion must contain exactly the domain words the forward engine maps
/// onto the password.
fn check_against_mangler(cases: &[(&str, &str)], config: &Config) {
    let words = domain();
    for (raw, password) in cases {
        let rule = rule(raw, config, Feasibility::Invertible);
        let manglers: Vec<Mangler> = rule.subrules.iter().map(|s| Mangler::new(s, config)).collect();
        let inversion = invert_rule(password.as_bytes(), &rule, config);
        assert!(inversion.is_normal(), "rule {:?} on {:?}: {:?}", raw, password, inversion);
        for word in &words {
            let expected = manglers.iter().any(|m| m.produces(word, password.as_bytes()));
            assert_eq!(
                inversion.contains(word),
                expected,
                "rule {:?}, password {:?}, word {:?}, preimages {:?}",
                raw,
                password,
                String::from_utf8_lossy(word),
                inversion.strings()
            );
        }
    }
}

#[test]
fn jtr_inverses_agree_with_mangler() {
    let config = small(Config::jtr());
    let cases: Vec<(&str, &str)> = vec![
        (":", "aB1"),
        ("l", "ab1"),
        ("u", "AB1"),
        ("c", "Abc"),
        ("C", "aBC"),
        ("t", "AbC"),
        ("T1 T9", "aBc"),
        ("r", "cba"),
        ("d", "abab"),
        ("d", "abc"),
        ("d", "abcd"),
        ("d", ""),
        ("f", "abba"),
        ("{", "bca"),
        ("}", "cab"),
        ("\\[", "bc"),
        ("\\[", ""),
        ("]", "ab"),
        ("q", "aabb"),
        ("k", "bac"),
        ("K", "acb"),
        ("E", "A Bc"),
        ("e1", "A1Bc"),
        ("$1", "ab1"),
        ("^1", "1ab"),
        ("$[1a]", "ba"),
        ("'3", "ab"),
        ("'3", "abcd"),
        ("D1", "ac"),
        ("D9", "abc"),
        ("i11", "a1b"),
        ("i91", "ab1"),
        ("A1\"sy\"", "asyb"),
        ("o1a", "aac"),
        ("O12", "ad"),
        ("z2", "aaab"),
        ("Z1", "abb"),
        (".1", "acc"),
        (",2", "abb"),
        ("y2", "ababc"),
        ("Y1", "abcc"),
        ("sa1", "1b1"),
        ("s[ab]y", "yyc"),
        ("/1", "a1b1"),
        ("!a", "bc"),
        ("<3", "ab"),
        (">2", "ab"),
        ("_2", "ab"),
        ("=1B", "aB"),
        ("(a", "ab"),
        (")b", "ab"),
        ("%21", "1a1"),
        ("p", "abs"),
        ("p", "abcies"),
        ("P", "abced"),
        ("I", "abcing"),
        ("S", "AB!"),
        ("-c :", "ab"),
        ("-8 :", "ab"),
        ("1", "ab"),
        ("c $1 $2", "Abc12"),
        ("lr $[0-9]", "cba5"),
        ("[lu] $1", "AB1"),
    ];
    check_against_mangler(&cases, &config);
}

#[test]
fn hashcat_inverses_agree_with_mangler() {
    let config = small(Config::hashcat());
    let cases: Vec<(&str, &str)> = vec![
        ("p1", "abab"),
        ("p1", "aba"),
        ("i31", "abc1"),
        ("i91", "abc"),
        ("x13", "bc"),
        ("*02", "cba"),
        ("*09", "cba"),
        ("+0", "bc"),
        ("-1", "aa"),
        ("y2", "ababc"),
        ("Y2", "abcbc"),
        ("y4", "abc"),
        ("<3", "abc"),
        (">3", "abc"),
        ("O12", "ad"),
        ("c $1", "Ab1"),
    ];
    check_against_mangler(&cases, &config);
}

#[test]
fn repetition_tokens_flow_through_supported_primitives() {
    let config = Config { enable_regex: true, ..small(Config::jtr()) };
    let cases: Vec<(&str, &str)> = vec![
        ("'3", "ab1"),
        ("$1 '3", "ab1"),
        ("l '3", "ab1"),
        ("c '3", "Ab1"),
        ("r '3", "ab1"),
        ("T0 '3", "Ab1"),
        ("D1 '3", "ab1"),
        ("(a '3", "ab1"),
        (")1 '3", "ab1"),
        ("<5 '3", "ab1"),
        ("sa1 '3", "1b1"),
        ("^1 '3", "1ab"),
        ("\\[ '3", "ab1"),
        ("] '3", "ab1"),
        ("{ '3", "ab1"),
        ("} '3", "ab1"),
        ("k '3", "ab1"),
        ("K '3", "ab1"),
        ("=1b '3", "ab1"),
        ("!s '3", "ab1"),
    ];
    check_against_mangler(&cases, &config);

    let truncated = invert_rule(b"ab", &rule("'2", &config, Feasibility::Optimizable), &config);
    assert!(truncated.strings().iter().any(TokenString::is_regex));
    assert!(truncated.contains(b"abcsy1"));
    assert!(!truncated.contains(b"abcsy1B"));
    assert_eq!(truncated.number_of_strings(), None);
}

#[test]
fn out_of_scope_and_errors() {
    let jtr = small(Config::jtr());
    let hc = small(Config::hashcat());
    let cases: Vec<(&str, &str, &Config)> = vec![
        ("'2", "ab", &jtr),
        ("x12", "ab", &jtr),
        ("x12", "bc", &hc),
        ("@1", "ab", &jtr),
        ("M $1 Q", "ab1", &jtr),
        ("Tm", "ab", &jtr),
        ("/a Dp", "b", &jtr),
        ("O13", "ab", &jtr),
        ("$1 '3", "ab1", &jtr),
    ];
    for (raw, password, config) in cases {
        let inversion = invert_rule(password.as_bytes(), &rule(raw, config, Feasibility::Optimizable), config);
        assert!(inversion.is_out_of_scope(), "rule {:?} on {:?}: {:?}", raw, password, inversion);
    }

    let purged = invert_rule(b"11", &rule("@1", &jtr, Feasibility::Optimizable), &jtr);
    assert!(purged.is_rejected());

    // One subrule out of scope makes the whole rule out of scope.
    let mixed = invert_rule(b"ab", &rule("'[23]", &jtr, Feasibility::Optimizable), &jtr);
    assert!(mixed.is_out_of_scope());

    let broken = invert_rule(b"ab", &rule("l", &jtr, Feasibility::SpecialMemory(0)), &jtr);
    assert!(broken.is_error());
}

#[test]
fn special_memory_skips_q() {
    let config = Config::jtr();
    let rule = rule("l Q $1", &config, Feasibility::SpecialMemory(1));
    let inversion = invert_rule(b"ab1", &rule, &config);
    assert!(inversion.has_memory());
    let mut preimages = inversion.to_strings().unwrap();
    preimages.sort();
    assert_eq!(preimages, vec![b"AB".to_vec(), b"Ab".to_vec(), b"aB".to_vec(), b"ab".to_vec()]);

    // The skipped rejection is applied by mangling the matches forward.
    let mangler = Mangler::new(&rule.subrules[0], &config);
    let kept: Vec<Vec<u8>> = preimages.into_iter().filter(|w| mangler.produces(w, b"ab1")).collect();
    assert_eq!(kept, vec![b"AB".to_vec(), b"Ab".to_vec(), b"aB".to_vec()]);
}

#[test]
fn preimage_counts() {
    let config = Config::jtr();
    let cases: Vec<(&str, &str, u128)> = vec![
        ("l", "pass", 16),
        ("u", "pass", 0),
        ("$[0-9]", "pass1", 1),
        ("]", "ab", 95),
        ("c $1", "Pass1", 16),
        ("/1", "11", 1),
    ];
    for (raw, password, expected) in cases {
        let inversion = invert_rule(password.as_bytes(), &rule(raw, &config, Feasibility::Invertible), &config);
        assert_eq!(inversion.number_of_strings(), Some(expected), "rule {:?} on {:?}", raw, password);
    }
}
