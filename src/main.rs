// main.rs - authbench - Adaptive Authentication Defense Benchmark
// Purpose: Drive bruteforce and password-spray experiments against an
//          authentication endpoint enforcing rate limiting, lockout, CAPTCHA
//          and TOTP defenses, and record attempt-level metrics

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;

mod attempt;
mod bruteforce;
mod budget;
mod challenge;
mod client;
mod errors;
mod generator;
mod metrics;
mod signal;
mod spray;

use bruteforce::{BruteforceEngine, BruteforceOutcome};
use budget::{Budget, BudgetMode};
use client::AuthClient;
use generator::CandidateGenerator;
use metrics::AttackMetrics;
use spray::{SprayEngine, SprayStop};

/// authbench - credential attack benchmark for adaptive auth defenses
#[derive(Parser, Debug)]
#[command(
    name = "authbench",
    version,
    about = "Benchmarks credential attacks against adaptive authentication defenses",
    long_about = "authbench exercises an authentication endpoint with credential-guessing \
                  strategies while the endpoint enforces rate limiting, account lockout, \
                  CAPTCHA challenges and a TOTP second-factor gate. Every run produces a \
                  JSON metrics report, whatever way it ends."
)]
struct Cli {
    /// Base URL of the authentication server under test
    #[arg(long, global = true, default_value = "http://127.0.0.1:5000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exhaustive (or capped) candidate enumeration against one account
    Bruteforce {
        /// Target username
        #[arg(short, long)]
        username: String,

        /// Difficulty profile fixing charset and length range
        #[arg(short, long, default_value = "easy")]
        difficulty: String,

        /// Override the profile charset (requires --min-length and --max-length)
        #[arg(long)]
        charset: Option<String>,

        #[arg(long, requires = "charset")]
        min_length: Option<usize>,

        #[arg(long, requires = "charset")]
        max_length: Option<usize>,

        /// Stop generating after this many candidates
        #[arg(long)]
        cap: Option<u64>,

        #[command(flatten)]
        attack: AttackArgs,
    },

    /// Test each password from a curated list across many accounts
    Spray {
        /// Comma-separated usernames, or a file with one username per line
        #[arg(short, long)]
        users: String,

        /// Password list file, one password per line
        #[arg(short, long)]
        passlist: PathBuf,

        #[command(flatten)]
        attack: AttackArgs,
    },

    /// Register a test account on the server under test
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        /// Enroll the account with a TOTP second factor
        #[arg(long)]
        totp: bool,
    },
}

#[derive(Args, Debug)]
struct AttackArgs {
    /// Stop after this many attempts
    #[arg(long)]
    max_attempts: Option<u64>,

    /// Stop after this much wall-clock time
    #[arg(long)]
    max_time_secs: Option<u64>,

    /// How the two limits combine: stop at the first one hit, or run until
    /// the worse of the two
    #[arg(long, value_enum, default_value_t = BudgetModeArg::First)]
    budget_mode: BudgetModeArg,

    /// Delay between attempts, in milliseconds
    #[arg(long, default_value_t = 10)]
    delay_ms: u64,

    /// Shared secret for the captcha token endpoint
    #[arg(long)]
    group_seed: Option<String>,

    /// Experiment name used in console output and the report filename
    #[arg(long)]
    experiment: Option<String>,

    /// Directory for JSON reports
    #[arg(long, default_value = "results")]
    output: PathBuf,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BudgetModeArg {
    First,
    Worst,
}

impl AttackArgs {
    fn budget(&self) -> Budget {
        Budget {
            max_attempts: self.max_attempts,
            max_time: self.max_time_secs.map(Duration::from_secs),
            mode: match self.budget_mode {
                BudgetModeArg::First => BudgetMode::FirstLimit,
                BudgetModeArg::Worst => BudgetMode::WorstOf,
            },
        }
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupt);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .context("failed to install interrupt handler")?;
    }

    match cli.command {
        Command::Bruteforce {
            username,
            difficulty,
            charset,
            min_length,
            max_length,
            cap,
            attack,
        } => run_bruteforce(
            &cli.base_url,
            &username,
            &difficulty,
            charset.as_deref(),
            min_length,
            max_length,
            cap,
            attack,
            interrupt,
        ),
        Command::Spray { users, passlist, attack } => {
            run_spray(&cli.base_url, &users, &passlist, attack, interrupt)
        }
        Command::Register { username, password, totp } => {
            let client = AuthClient::new(&cli.base_url, Duration::from_secs(10))?;
            if client.register(&username, &password, totp)? {
                println!("{}", format!("[+] User '{username}' created").green());
            } else {
                println!("{}", format!("[!] User '{username}' already exists").yellow());
            }
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_bruteforce(
    base_url: &str,
    username: &str,
    difficulty: &str,
    charset: Option<&str>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    cap: Option<u64>,
    attack: AttackArgs,
    interrupt: Arc<AtomicBool>,
) -> Result<()> {
    // Fail on a bad profile before anything touches the network.
    let candidates = match charset {
        Some(charset) => {
            let (Some(min), Some(max)) = (min_length, max_length) else {
                bail!("--charset requires --min-length and --max-length");
            };
            CandidateGenerator::new(charset, min, max, cap)
        }
        None => CandidateGenerator::from_profile(difficulty, cap)?,
    };

    let experiment = attack
        .experiment
        .clone()
        .unwrap_or_else(|| format!("bruteforce_{difficulty}"));
    let mut metrics = AttackMetrics::new(&experiment);
    let mut client = AuthClient::new(base_url, attack.timeout())?;
    let mut engine = BruteforceEngine::new(
        attack.budget(),
        attack.delay(),
        attack.group_seed.clone(),
        interrupt,
    );

    let run_result = engine.run(&mut client, username, candidates, &mut metrics);

    // Every run ends with a summary, fatal errors included.
    finish_run(&metrics, &attack.output);

    match run_result? {
        BruteforceOutcome::Found { password, attempt } => {
            println!(
                "{}",
                format!("[+] Breach: '{username}' uses '{password}' (attempt #{attempt})")
                    .green()
                    .bold()
            );
        }
        BruteforceOutcome::NotFound => {
            println!("{}", "[-] Password not found: candidate space exhausted".white());
        }
        BruteforceOutcome::Locked => {
            println!("{}", "[!] Run ended by account lockout".red());
        }
        BruteforceOutcome::BlockedByMfa => {
            println!(
                "{}",
                "[!] Password was correct but the second factor blocked compromise".red()
            );
        }
        BruteforceOutcome::BudgetExhausted => {
            println!("{}", "[!] Run ended by budget exhaustion".yellow());
        }
        BruteforceOutcome::Interrupted => {
            println!("{}", "[!] Run interrupted; partial report saved".yellow());
        }
    }
    Ok(())
}

fn run_spray(
    base_url: &str,
    users: &str,
    passlist: &Path,
    attack: AttackArgs,
    interrupt: Arc<AtomicBool>,
) -> Result<()> {
    let usernames = load_users(users)?;
    if usernames.is_empty() {
        bail!("no usernames given");
    }
    let passwords = read_wordlist(passlist)?;
    if passwords.is_empty() {
        bail!("password list {} is empty", passlist.display());
    }

    let experiment = attack.experiment.clone().unwrap_or_else(|| "spray".to_string());
    let mut metrics = AttackMetrics::new(&experiment);
    let mut client = AuthClient::new(base_url, attack.timeout())?;
    let mut engine = SprayEngine::new(
        attack.budget(),
        attack.delay(),
        attack.group_seed.clone(),
        interrupt,
    );

    let run_result = engine.run(&mut client, &usernames, &passwords, &mut metrics);

    finish_run(&metrics, &attack.output);

    let outcome = run_result?;
    match outcome.stop {
        SprayStop::PasswordListExhausted => {
            println!("{}", "[-] Password list exhausted".white());
        }
        SprayStop::AllAccountsResolved => {
            println!("{}", "[*] Every account resolved (compromised, locked or MFA-gated)".cyan());
        }
        SprayStop::BudgetExhausted => {
            println!("{}", "[!] Run ended by budget exhaustion".yellow());
        }
        SprayStop::Interrupted => {
            println!("{}", "[!] Run interrupted; partial report saved".yellow());
        }
    }
    println!(
        "{}",
        format!(
            "[*] {} of {} accounts compromised",
            outcome.credentials.len(),
            usernames.len()
        )
        .cyan()
    );
    for credential in &outcome.credentials {
        println!("    {} {}:{}", "✓".green(), credential.username, credential.password);
    }
    Ok(())
}

/// Prints the run summary and persists the JSON report. Called on every exit
/// path so no run disappears without a report.
fn finish_run(metrics: &AttackMetrics, output_dir: &Path) {
    let report = metrics.report();
    println!();
    println!("{}", "[*] Run summary".cyan().bold());
    println!("    Attempts:  {}", report.total_attempts);
    println!("    Time:      {}s", report.total_time_seconds);
    println!("    Speed:     {} att/s", report.attempts_per_second);
    println!("    Breached:  {}", if report.breached { "yes".green() } else { "no".red() });
    if let Some(seconds) = report.time_to_breach_seconds {
        println!("    Breach at: {seconds}s");
    }

    match metrics.save_report(output_dir) {
        Ok(path) => println!("{}", format!("[+] Report saved: {}", path.display()).green()),
        Err(e) => eprintln!("{}", format!("[!] Failed to save report: {e}").red()),
    }
}

/// Usernames come either from a file (one per line) or inline as a
/// comma-separated list.
fn load_users(users: &str) -> Result<Vec<String>> {
    let path = Path::new(users);
    if path.is_file() {
        return read_wordlist(path);
    }
    Ok(users
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect())
}

fn read_wordlist(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("failed to open wordlist: {}", path.display()))?;
    let reader = BufReader::new(file);

    Ok(reader
        .lines()
        .map_while(|line| line.ok())
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_users_inline_list() {
        let users = load_users("alice, bob,,carol").unwrap();
        assert_eq!(users, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_read_wordlist_skips_comments_and_blanks() {
        let dir = std::env::temp_dir().join("authbench_wordlist_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("passwords.txt");
        std::fs::write(&path, "one\n\n# comment\n  two  \n").unwrap();

        let words = read_wordlist(&path).unwrap();
        assert_eq!(words, vec!["one", "two"]);
    }

    #[test]
    fn test_budget_args_mapping() {
        let attack = AttackArgs {
            max_attempts: Some(5),
            max_time_secs: Some(60),
            budget_mode: BudgetModeArg::Worst,
            delay_ms: 0,
            group_seed: None,
            experiment: None,
            output: PathBuf::from("results"),
            timeout_secs: 10,
        };
        let budget = attack.budget();
        assert_eq!(budget.max_attempts, Some(5));
        assert_eq!(budget.max_time, Some(Duration::from_secs(60)));
        assert_eq!(budget.mode, BudgetMode::WorstOf);
    }
}
