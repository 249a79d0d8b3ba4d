use ruleguess::{Feasibility, Outcome, ScanReport, Session};
use std::time::Duration;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// Prints what the run found and where the time went.
pub fn print_summary(session: &Session, report: &ScanReport, log: &str, color: bool) {
    let palette = ansi::Palette::new(color);
    println!(
        "\n{}",
        palette.bold(palette.paint(format!("⚙  {} attack: {}", session.config().style, log), ansi::CYAN))
    );

    println!("\n{}", palette.paint("━━━ Rules ━━━", ansi::GRAY));
    print_rules(session, &palette);

    println!("\n{}", palette.paint("━━━ Results ━━━", ansi::GRAY));
    print_results(report, &palette);

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    print_timing(report, &palette);
    println!();
}

fn print_rules(session: &Session, palette: &ansi::Palette) {
    let rules = session.rules();
    let mut by_class = [0usize; 4];
    for rule in rules {
        let slot = match rule.feasibility {
            Feasibility::Invertible => 0,
            Feasibility::SpecialMemory(_) => 1,
            Feasibility::Optimizable => 2,
            Feasibility::Uninvertible => 3,
        };
        by_class[slot] += 1;
    }
    let countable = rules.iter().filter(|r| r.dependencies.is_some()).count();

    println!(
        "  {} rules over {} words  {} {} countable",
        palette.bold(rules.len().to_string()),
        palette.bold(session.wordlist().len().to_string()),
        palette.dim("│"),
        palette.paint(countable.to_string(), ansi::GREEN),
    );
    println!(
        "  {} {}  {} {}  {} {}  {} {}",
        palette.dim("invertible:"),
        palette.paint(by_class[0].to_string(), ansi::GREEN),
        palette.dim("special memory:"),
        palette.paint(by_class[1].to_string(), ansi::BLUE),
        palette.dim("optimizable:"),
        palette.paint(by_class[2].to_string(), ansi::YELLOW),
        palette.dim("uninvertible:"),
        palette.paint(by_class[3].to_string(), ansi::YELLOW),
    );
    let discarded = session.discarded_rules();
    if !discarded.is_empty() {
        println!("  {}", palette.paint(format!("✗ {} rules discarded", discarded.len()), ansi::YELLOW));
        for raw in discarded.iter().take(5) {
            println!("    {}", palette.dim(raw));
        }
        if discarded.len() > 5 {
            println!("    {}", palette.dim(format!("... +{} more", discarded.len() - 5)));
        }
    }
}

fn print_results(report: &ScanReport, palette: &ansi::Palette) {
    let metrics = &report.metrics;
    let guessed = report.guessed_passwords();
    println!(
        "  {} {} / {}  {} {}",
        palette.dim("guessed:"),
        if guessed > 0 {
            palette.paint(format!("✓ {}", guessed), ansi::GREEN)
        } else {
            palette.dim(format!("✗ {}", guessed))
        },
        metrics.passwords,
        palette.dim("│ total guesses:"),
        palette.paint(report.total_guesses.to_string(), ansi::CYAN),
    );
    if metrics.passwords_skipped > 0 {
        println!("  {}", palette.dim(format!("{} passwords fail the policy", metrics.passwords_skipped)));
    }
    println!(
        "  {} {}  {} {}  {} {}  {} {}",
        palette.dim("inversions:"),
        palette.paint(metrics.inversions.to_string(), ansi::BLUE),
        palette.dim("out of scope:"),
        palette.paint(metrics.out_of_scope.to_string(), ansi::YELLOW),
        palette.dim("trie:"),
        palette.paint(metrics.trie_lookups.to_string(), ansi::BLUE),
        palette.dim("file lookups:"),
        palette.paint(metrics.file_lookups.to_string(), ansi::BLUE),
    );
    let errors = report.records.iter().filter(|r| matches!(r.outcome, Outcome::InversionError { .. })).count();
    if errors > 0 {
        println!("  {}", palette.paint(format!("✗ {} inversion errors (see the log)", errors), ansi::YELLOW));
    }

    for record in report.guesses().take(5) {
        if let Outcome::Guessed { rule, word, guess, .. } = &record.outcome {
            println!(
                "  {} {} {} {} {}",
                palette.paint(format!("[{}]", record.password_idx), ansi::GRAY),
                palette.bold(palette.paint(String::from_utf8_lossy(&record.password), ansi::GREEN)),
                palette.dim("│"),
                palette.paint(format!("{} ← {}", rule, String::from_utf8_lossy(word)), ansi::BLUE),
                palette.paint(format!("#{} ({}..{})", guess.estimate, guess.lower, guess.upper), ansi::YELLOW),
            );
        }
    }
}

fn print_timing(report: &ScanReport, palette: &ansi::Palette) {
    let prepare = &report.metrics.prepare;
    println!(
        "  Total: {}  │  Read: {}  │  Analyze: {}  │  Enumerate: {}  │  Count: {}  │  Scan: {}",
        palette.paint(fmt_duration(report.metrics.total()), ansi::GREEN),
        palette.dim(fmt_duration(prepare.read)),
        palette.dim(fmt_duration(prepare.analyze)),
        palette.dim(fmt_duration(prepare.enumerate)),
        palette.paint(fmt_duration(prepare.count), ansi::CYAN),
        palette.paint(fmt_duration(report.metrics.scan), ansi::CYAN),
    );
    if prepare.counts_restored || prepare.enumerations_reused > 0 {
        println!(
            "  {}",
            palette.dim(format!(
                "cache: counts {}, {} enumeration files reused",
                if prepare.counts_restored { "restored" } else { "recomputed" },
                prepare.enumerations_reused
            ))
        );
    }
}

fn fmt_duration(d: Duration) -> String {
    format!("{:?}", d)
}
