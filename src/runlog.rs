//! The run log: one text record per guess, per unguessable password and per
//! inversion error, between timestamped phase lines.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Local;

use crate::api::{GuessRecord, Outcome, ScanReport};
use crate::config::{Config, PasswordPolicy};
use crate::error::{Error, Result};

const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

pub struct RunLog<W: Write> {
    out: W,
    name: String,
}

impl RunLog<BufWriter<File>> {
    /// Creates (or truncates) the log file, with its parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        Ok(RunLog { out: BufWriter::new(file), name: path.display().to_string() })
    }
}

impl<W: Write> RunLog<W> {
    pub fn new(out: W) -> Self {
        RunLog { out, name: "run log".to_string() }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn header(&mut self, config: &Config, policy: &PasswordPolicy) -> Result<()> {
        let started = Local::now().format(TIMESTAMP);
        self.write(&format!("Starting Time: {}\n\nConfigurations: {}\n", started, describe(config)))?;
        self.write(&format!("PasswordPolicy: {}\n", policy.to_debug_string()))
    }

    /// A timestamped line marking the start of a phase.
    pub fn phase(&mut self, name: &str) -> Result<()> {
        self.write(&format!("[{}] {}\n", Local::now().format(TIMESTAMP), name))
    }

    pub fn record(&mut self, record: &GuessRecord) -> Result<()> {
        self.write(&format_record(record))
    }

    pub fn total(&mut self, total: u64) -> Result<()> {
        self.write(&format!("Total guesses made by this configuration: {}\n", total))
    }

    /// Every record of `report`, then the total.
    pub fn write_report(&mut self, report: &ScanReport) -> Result<()> {
        for record in &report.records {
            self.record(record)?;
        }
        self.total(report.total_guesses)?;
        self.out.flush().map_err(|e| Error::io(&self.name, e))
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).map_err(|e| Error::io(&self.name, e))
    }
}

/// One record as written to the log.
pub fn format_record(record: &GuessRecord) -> String {
    let password = String::from_utf8_lossy(&record.password);
    match &record.outcome {
        Outcome::Guessed { rule, word, guess, .. } => format!(
            "\nPasswordIdx:{}\nPassword:{}\nRule:{}\nWord:{}\nGuess:{} ( {} - {} )\n",
            record.password_idx,
            password,
            rule,
            String::from_utf8_lossy(word),
            guess.estimate,
            guess.lower,
            guess.upper
        ),
        Outcome::InversionError { rule, message, .. } => {
            format!("Inversion error for {}(RL) {}(pw), error msg: {}\n", rule, password, message)
        }
        Outcome::NotGuessable => format!("\nPasswordIdx:{}\nPassword:{}\nNot Guessable\n", record.password_idx, password),
    }
}

/// Single-line summary of the settings that change results.
pub fn describe(config: &Config) -> String {
    let rule_batch = config.batch_size_of_rules.map_or_else(|| "auto".to_string(), |n| n.to_string());
    let mut out = format!(
        "style={} max_password_length={} lookup_threshold={} work_dir={}",
        config.style,
        config.max_password_length,
        config.lookup_threshold,
        config.work_dir.display()
    );
    if !config.is_jtr() {
        out.push_str(&format!(" batch_size_of_words={} batch_size_of_rules={}", config.batch_size_of_words, rule_batch));
    }
    if config.enable_regex {
        out.push_str(" regex");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GuessEstimate;
    use crate::config::PolicyFlags;

    fn record(outcome: Outcome) -> GuessRecord {
        GuessRecord { password_idx: 3, password: b"pass1".to_vec(), outcome }
    }

    #[test]
    fn record_formats() {
        let cases: Vec<(GuessRecord, &str)> = vec![
            (
                record(Outcome::Guessed {
                    rule_idx: 1,
                    rule: "$1".to_string(),
                    word: b"pass".to_vec(),
                    word_idx: 2,
                    guess: GuessEstimate { estimate: 8, lower: 5, upper: 10 },
                }),
                "\nPasswordIdx:3\nPassword:pass1\nRule:$1\nWord:pass\nGuess:8 ( 5 - 10 )\n",
            ),
            (record(Outcome::NotGuessable), "\nPasswordIdx:3\nPassword:pass1\nNot Guessable\n"),
            (
                record(Outcome::InversionError { rule_idx: 0, rule: "c".to_string(), message: "bad".to_string() }),
                "Inversion error for c(RL) pass1(pw), error msg: bad\n",
            ),
        ];
        for (record, expected) in cases {
            assert_eq!(format_record(&record), expected);
        }
    }

    #[test]
    fn header_and_total() {
        let mut log = RunLog::new(Vec::new());
        let policy = PasswordPolicy::new(Some(8), PolicyFlags::UPPER).unwrap();
        log.header(&Config::hashcat(), &policy).unwrap();
        log.phase("Scanning").unwrap();
        log.total(42).unwrap();
        let text = String::from_utf8(log.into_inner()).unwrap();

        assert!(text.starts_with("Starting Time: "));
        assert!(text.contains("Configurations: style=HC max_password_length=255"));
        assert!(text.contains("batch_size_of_rules=auto"));
        assert!(text.contains("PasswordPolicy:  --length=8 --upper \n"));
        assert!(regex::Regex::new(r"\n\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\] Scanning\n").unwrap().is_match(&text));
        assert!(text.ends_with("Total guesses made by this configuration: 42\n"));
    }
}
