use super::*;

fn jtr() -> Config {
    Config::jtr()
}

fn hc() -> Config {
    Config::hashcat()
}

fn single(raw: &str, config: &Config) -> Vec<Primitive> {
    let subrules = parse_line(raw, config).unwrap();
    assert_eq!(subrules.len(), 1, "rule {:?} expanded to {} subrules", raw, subrules.len());
    subrules.into_iter().next().unwrap().primitives
}

fn set(bytes: &[u8]) -> Charset {
    Charset::from_bytes(bytes)
}

#[test]
fn simple_commands() {
    let cases: Vec<(&str, Vec<Primitive>)> = vec![
        (":", vec![Primitive::Noop]),
        ("c $1", vec![Primitive::Capitalize, Primitive::Append(set(b"1"))]),
        ("lr", vec![Primitive::Lower, Primitive::Reverse]),
        ("T0 'A D*", vec![
            Primitive::ToggleAt(Pos::Num(0)),
            Primitive::Truncate(Pos::Num(10)),
            Primitive::DeleteAt(Pos::Num(128)),
        ]),
        ("i5! o3x", vec![Primitive::Insert(Pos::Num(5), set(b"!")), Primitive::Overwrite(Pos::Num(3), b'x')]),
        ("x12 O03", vec![
            Primitive::Extract(Pos::Num(1), Pos::Num(2)),
            Primitive::DeleteRange(Pos::Num(0), Pos::Num(3)),
        ]),
        ("sa4 se3", vec![Primitive::Replace(set(b"a"), b'4'), Primitive::Replace(set(b"e"), b'3')]),
        ("p R L", vec![Primitive::Pluralize, Primitive::KeyRight, Primitive::KeyLeft]),
        ("Az\"12\"", vec![Primitive::InsertString(Pos::Infinite, vec![set(b"1"), set(b"2")])]),
        ("A0/x/", vec![Primitive::InsertString(Pos::Num(0), vec![set(b"x")])]),
        ("va01 X012", vec![
            Primitive::SetVar(b'a', Pos::Num(0), Pos::Num(1)),
            Primitive::ExtractMemory(Pos::Num(0), Pos::Num(1), Pos::Num(2)),
        ]),
        ("Tm Dp", vec![Primitive::ToggleAt(Pos::Runtime(b'm')), Primitive::DeleteAt(Pos::Runtime(b'p'))]),
        ("\\[ \\]", vec![Primitive::DeleteFirst, Primitive::DeleteLast]),
        ("$\\[", vec![Primitive::Append(set(b"["))]),
        ("+1 1 2 +", vec![
            Primitive::Increment(Pos::Num(1)),
            Primitive::Mode(b'1'),
            Primitive::Mode(b'2'),
            Primitive::Mode(b'+'),
        ]),
    ];
    let config = jtr();
    for (raw, expected) in cases {
        assert_eq!(single(raw, &config), expected, "rule {:?}", raw);
    }
}

#[test]
fn length_rejections_follow_style() {
    assert_eq!(single("<5 >3 _4", &jtr()), vec![
        Primitive::RejectLen(LenCmp::Less, Pos::Num(5)),
        Primitive::RejectLen(LenCmp::Greater, Pos::Num(3)),
        Primitive::RejectLen(LenCmp::Equal, Pos::Num(4)),
    ]);
    assert_eq!(single("<5 >3", &hc()), vec![
        Primitive::RejectLen(LenCmp::LessEq, Pos::Num(5)),
        Primitive::RejectLen(LenCmp::GreaterEq, Pos::Num(3)),
    ]);
}

#[test]
fn hashcat_dialect() {
    let cases: Vec<(&str, Vec<Primitive>)> = vec![
        ("p2", vec![Primitive::DupWord(Pos::Num(2))]),
        ("L1 R2", vec![Primitive::BitLeft(Pos::Num(1)), Primitive::BitRight(Pos::Num(2))]),
        ("-3 +4", vec![Primitive::Decrement(Pos::Num(3)), Primitive::Increment(Pos::Num(4))]),
        ("*12", vec![Primitive::Swap(Pos::Num(1), Pos::Num(2))]),
        ("4 6 M", vec![Primitive::AppendMemory, Primitive::PrependMemory, Primitive::Memorize]),
        ("/?", vec![Primitive::RejectUnlessContains(set(b"?"))]),
        ("$[", vec![Primitive::Append(set(b"["))]),
        ("i2 ", vec![Primitive::Insert(Pos::Num(2), set(b" "))]),
    ];
    let config = hc();
    for (raw, expected) in cases {
        assert_eq!(single(raw, &config), expected, "rule {:?}", raw);
    }
    assert!(parse_line("A0\"x\"", &config).is_err());
    assert!(parse_line("Dz", &config).is_err());
}

#[test]
fn flags_and_classes() {
    let digits = char_class(b'd', Style::Jtr).unwrap();
    let letters = char_class(b'a', Style::Jtr).unwrap();
    let cases: Vec<(&str, Vec<Primitive>)> = vec![
        ("-c -8 :", vec![
            Primitive::Flag(RejectFlag::CaseSensitive),
            Primitive::Flag(RejectFlag::EightBit),
            Primitive::Noop,
        ]),
        ("->8 -<A", vec![
            Primitive::Flag(RejectFlag::LengthAtLeast(Pos::Num(8))),
            Primitive::Flag(RejectFlag::LengthAtMost(Pos::Num(10))),
        ]),
        ("/?d !?a", vec![Primitive::RejectUnlessContains(digits), Primitive::RejectIfContains(letters)]),
        ("/??", vec![Primitive::RejectUnlessContains(set(b"?"))]),
        ("=1?d %2x", vec![Primitive::RejectUnlessAt(Pos::Num(1), digits), Primitive::RejectUnlessCount(Pos::Num(2), set(b"x"))]),
        ("s?d! @?a e-", vec![
            Primitive::Replace(digits, b'!'),
            Primitive::Purge(letters),
            Primitive::TitleSep(set(b"-")),
        ]),
    ];
    let config = jtr();
    for (raw, expected) in cases {
        assert_eq!(single(raw, &config), expected, "rule {:?}", raw);
    }
}

#[test]
fn set_valued_parameters_stay_single() {
    let config = jtr();
    assert_eq!(single("$[0-9]", &config), vec![Primitive::Append(set(b"0123456789"))]);
    assert_eq!(single("^[a\\-z]", &config), vec![Primitive::Prepend(set(b"a-z"))]);

    let prims = single("A0\"[a-z][A-Z]\"", &config);
    assert_eq!(prims.len(), 1);
    assert_eq!(prims[0].multiplicity(), 676);

    let subrules = parse_line("[lu]$[12]", &config).unwrap();
    assert_eq!(subrules.len(), 2);
    assert_eq!(subrules[0].primitives, vec![Primitive::Lower, Primitive::Append(set(b"12"))]);
    assert_eq!(subrules[1].primitives, vec![Primitive::Upper, Primitive::Append(set(b"12"))]);
}

#[test]
fn ranges_expand_newest_fastest() {
    let config = jtr();
    let subrules = parse_line("s[ab][xy]", &config).unwrap();
    let pairs: Vec<Vec<Primitive>> = subrules.into_iter().map(|s| s.primitives).collect();
    assert_eq!(pairs, vec![
        vec![Primitive::Replace(set(b"a"), b'x')],
        vec![Primitive::Replace(set(b"a"), b'y')],
        vec![Primitive::Replace(set(b"b"), b'x')],
        vec![Primitive::Replace(set(b"b"), b'y')],
    ]);

    let positions = parse_line("T[0-2]", &config).unwrap();
    assert_eq!(positions.len(), 3);
    assert_eq!(positions[2].primitives, vec![Primitive::ToggleAt(Pos::Num(2))]);
}

#[test]
fn lockstep_ranges() {
    let config = jtr();
    let cases: Vec<(&str, Vec<(u8, u8)>)> = vec![
        ("s[ab]\\p[xy]", vec![(b'a', b'x'), (b'b', b'y')]),
        ("s[ab]\\0", vec![(b'a', b'a'), (b'b', b'b')]),
        ("s[ab]\\p1[xy]", vec![(b'a', b'x'), (b'b', b'y')]),
        ("s[abc]\\r[xy]", vec![(b'a', b'x'), (b'a', b'y'), (b'b', b'x'), (b'b', b'y'), (b'c', b'x'), (b'c', b'y')]),
    ];
    for (raw, expected) in cases {
        let got: Vec<(u8, u8)> = parse_line(raw, &config)
            .unwrap()
            .into_iter()
            .map(|s| match &s.primitives[..] {
                [Primitive::Replace(from, to)] => (from.first().unwrap(), *to),
                other => panic!("unexpected primitives {:?}", other),
            })
            .collect();
        assert_eq!(got, expected, "rule {:?}", raw);
    }

    // A coupled pair where the second range varies inside another range.
    let subrules = parse_line("$[12] T[0-1] $\\p1[ab]", &config).unwrap();
    assert_eq!(subrules.len(), 4);
    let tails: Vec<&Primitive> = subrules.iter().map(|s| &s.primitives[2]).collect();
    assert_eq!(tails, vec![
        &Primitive::Append(set(b"a")),
        &Primitive::Append(set(b"a")),
        &Primitive::Append(set(b"b")),
        &Primitive::Append(set(b"b")),
    ]);
}

#[test]
fn malformed_rules_fail() {
    let config = jtr();
    let cases: Vec<&str> = vec!["$", "T", "Q9", "s?q1", "[ab", "\\p3[ab]", "$[]", "vz12", "A0\"abc", "-q"];
    for raw in cases {
        assert!(parse_line(raw, &config).is_err(), "rule {:?} should fail", raw);
    }
    match parse_line("\\p2[ab]", &config) {
        Err(Error::Parse { rule, .. }) => assert_eq!(rule, "\\p2[ab]"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn expansion_is_capped() {
    let config = jtr();
    assert!(parse_line("T[0-9] D[0-9] z[0-9] Z[0-9] y[0-9] Y[0-9]", &config).is_err());
}
