mod report;

use ruleguess::{Config, Error, InputPaths, LookupBackend, PasswordPolicy, PolicyFlags, RunLog, Session, Style};
use std::io::{self, IsTerminal};
use std::path::PathBuf;

const DEFAULT_LOG: &str = "results/ruleguess.log";
const MAX_POLICY_LENGTH: usize = 35;

fn main() {
    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&cli) {
        eprintln!("error: {err}");
        let code = if matches!(err, Error::Config(_)) { 2 } else { 1 };
        std::process::exit(code);
    }
}

struct CliConfig {
    config: Config,
    policy: PasswordPolicy,
    paths: InputPaths,
    passwords: PathBuf,
    log: PathBuf,
    color: bool,
    fresh: bool,
}

fn run(cli: &CliConfig) -> ruleguess::Result<()> {
    println!("Your Running Configuration: {}", ruleguess::describe(&cli.config));
    println!("PasswordPolicy: {}\n", cli.policy.to_debug_string());

    let mut log = RunLog::create(&cli.log)?;
    log.header(&cli.config, &cli.policy)?;

    if cli.fresh {
        println!("Clearing cached counts and enumerations in {}\n", cli.config.work_dir.display());
        ruleguess::clear_work_dir(&cli.config)?;
    }

    log.phase("Preparing")?;
    println!("Reading inputs and counting guesses\n");
    let mut session = Session::prepare(cli.config.clone(), cli.policy, &cli.paths)?;

    log.phase("Inverting")?;
    println!("Start Inverting Rules\n");
    let report = session.scan_file(&cli.passwords)?;

    log.write_report(&report)?;
    log.phase("Finished")?;
    println!("Total guesses made by this configuration: {}", report.total_guesses);
    report::print_summary(&session, &report, &cli.log.display().to_string(), cli.color);
    Ok(())
}

#[derive(Default)]
struct Args {
    word: Option<PathBuf>,
    rule: Option<PathBuf>,
    pw: Option<PathBuf>,
    style: Option<Style>,
    length: Option<usize>,
    flags: PolicyFlags,
    out: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    look: Option<PathBuf>,
    in_process: bool,
    fresh: bool,
    strict: bool,
    debug: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut parsed = Args::default();
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (name, inline) = match arg.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |flag: &str| -> Result<String, String> {
            match inline.clone() {
                Some(v) => Ok(v),
                None => args.next().ok_or_else(|| format!("error: {flag} expects a value")),
            }
        };
        match name.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("ruleguess {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--debug" => parsed.debug = true,
            "--strict" => parsed.strict = true,
            "--in-process" => parsed.in_process = true,
            "--fresh" => parsed.fresh = true,
            "--digit" => parsed.flags |= PolicyFlags::DIGIT,
            "--letter" => parsed.flags |= PolicyFlags::LETTER,
            "--lower" => parsed.flags |= PolicyFlags::LOWER,
            "--upper" => parsed.flags |= PolicyFlags::UPPER,
            "--word" => parsed.word = Some(PathBuf::from(value("--word")?)),
            "--rule" => parsed.rule = Some(PathBuf::from(value("--rule")?)),
            "--pw" => parsed.pw = Some(PathBuf::from(value("--pw")?)),
            "--out" => parsed.out = Some(PathBuf::from(value("--out")?)),
            "--work-dir" => parsed.work_dir = Some(PathBuf::from(value("--work-dir")?)),
            "--look" => parsed.look = Some(PathBuf::from(value("--look")?)),
            "--style" => {
                let v = value("--style")?;
                parsed.style =
                    Some(Style::from_nickname(&v).ok_or_else(|| format!("error: unknown style '{v}' (use jtr or hc)"))?);
            }
            "--length" => {
                let v = value("--length")?;
                let n: usize = v.parse().map_err(|_| format!("error: invalid --length '{v}'"))?;
                if !(1..=MAX_POLICY_LENGTH).contains(&n) {
                    return Err(format!("error: --length must be between 1 and {MAX_POLICY_LENGTH}, got {n}"));
                }
                parsed.length = Some(n);
            }
            _ => return Err(format!("error: unknown option '{arg}'\n\n{}", help_text())),
        }
    }

    let required = |path: Option<PathBuf>, flag: &str| -> Result<PathBuf, String> {
        let path = path.ok_or_else(|| format!("error: {flag} is required\n\n{}", help_text()))?;
        if !path.is_file() {
            return Err(format!("error: {flag} {} does not exist", path.display()));
        }
        Ok(path)
    };
    let wordlist = required(parsed.word, "--word")?;
    let rules = required(parsed.rule, "--rule")?;
    let passwords = required(parsed.pw, "--pw")?;

    let style = parsed.style.ok_or_else(|| format!("error: --style is required\n\n{}", help_text()))?;
    let mut config = Config::for_style(style);
    config.debug = parsed.debug;
    config.safe_mode = !parsed.strict;
    if let Some(dir) = parsed.work_dir {
        config.work_dir = dir;
    }
    if let Some(look) = parsed.look {
        config.look_executable = look;
        config.lookup_backend = LookupBackend::External;
    }
    if parsed.in_process {
        config.lookup_backend = LookupBackend::InProcess;
    }
    config.validate().map_err(|err| format!("error: {err}"))?;

    let policy = PasswordPolicy::new(parsed.length, parsed.flags).map_err(|err| format!("error: {err}"))?;

    Ok(CliConfig {
        config,
        policy,
        paths: InputPaths { wordlist, rules },
        passwords,
        log: parsed.out.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG)),
        color,
        fresh: parsed.fresh,
    })
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "ruleguess {version}

Estimates which passwords a wordlist + mangling-rule attack guesses, and when.

Usage:
  ruleguess --word <path> --rule <path> --pw <path> --style <jtr|hc> [OPTIONS]

Inputs:
  --word <path>          Wordlist, one word per line.
  --rule <path>          Rule list in JtR or hashcat syntax.
  --pw <path>            Passwords to look for, one per line.
  --style <name>         jtr (John the Ripper) or hc (hashcat).

Password policy (guesses and passwords must satisfy it):
  --length <n>           Minimum length, 1 to {max_length}.
  --digit                At least one digit.
  --letter               At least one letter.
  --lower                At least one lowercase letter.
  --upper                At least one uppercase letter.

Options:
  --out <path>           Run log. Default: {default_log}
  --work-dir <path>      Cache and enumeration directory. Default: data/preprocess
  --look <path>          `look` executable used to search enumeration files.
  --in-process           Search enumeration files in memory instead of with `look`.
  --fresh                Clear the work directory before preparing.
  --strict               Abort on rules that fail to parse instead of skipping them.
  --debug                Print traces (same as RULEGUESS_DEBUG=1).
  --color                Force ANSI color output.
  --no-color             Disable ANSI color output.
  -h, --help             Show this help message.
  -V, --version          Print version information.

Every option taking a value also accepts --option=value.

Exit codes:
  0  Success.
  1  Runtime error (unreadable file, lookup failure, bad rule in --strict).
  2  Invalid arguments, missing input files or an invalid policy.
",
        version = env!("CARGO_PKG_VERSION"),
        max_length = MAX_POLICY_LENGTH,
        default_log = DEFAULT_LOG
    )
}
