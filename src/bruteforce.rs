// bruteforce.rs - Single-Target Bruteforce Engine
// Purpose: Drive the lazy candidate stream against one username, reacting to
//          defense signals until a terminal outcome or budget stop

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use colored::*;

use crate::attempt::{CycleOutcome, attempt_candidate};
use crate::budget::{Budget, BudgetTracker};
use crate::challenge::ChallengeHandler;
use crate::client::LoginTransport;
use crate::errors::AttackError;
use crate::metrics::AttackMetrics;

/// Sleep per polled candidate while a WorstOf budget skips real attempts, so
/// the poll loop does not spin a core.
const SKIP_POLL_INTERVAL: Duration = Duration::from_millis(10);

const PROGRESS_EVERY: u64 = 100;

/// Terminal outcome of a bruteforce run. `BlockedByMfa` means the password
/// was correct but a second factor blocked full compromise; it is reported
/// separately from `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BruteforceOutcome {
    Found { password: String, attempt: u64 },
    NotFound,
    Locked,
    BlockedByMfa,
    BudgetExhausted,
    Interrupted,
}

pub struct BruteforceEngine {
    budget: BudgetTracker,
    challenge: ChallengeHandler,
    delay: Duration,
    interrupt: Arc<AtomicBool>,
}

impl BruteforceEngine {
    pub fn new(
        budget: Budget,
        delay: Duration,
        group_seed: Option<String>,
        interrupt: Arc<AtomicBool>,
    ) -> Self {
        Self {
            budget: BudgetTracker::new(budget),
            challenge: ChallengeHandler::new(group_seed),
            delay,
            interrupt,
        }
    }

    /// Runs the attack to a terminal outcome. `metrics` is started here and
    /// finalized on every exit path, fatal protocol errors included, so the
    /// caller always gets a valid summary.
    pub fn run<T: LoginTransport>(
        &mut self,
        transport: &mut T,
        username: &str,
        candidates: impl Iterator<Item = String>,
        metrics: &mut AttackMetrics,
    ) -> Result<BruteforceOutcome, AttackError> {
        metrics.start();
        let result = self.run_inner(transport, username, candidates, metrics);
        metrics.stop();
        result
    }

    fn run_inner<T: LoginTransport>(
        &mut self,
        transport: &mut T,
        username: &str,
        mut candidates: impl Iterator<Item = String>,
        metrics: &mut AttackMetrics,
    ) -> Result<BruteforceOutcome, AttackError> {
        println!("{}", format!("[*] Starting bruteforce on '{username}'").cyan());
        let started = Instant::now();

        loop {
            if self.interrupt.load(Ordering::Relaxed) {
                println!("{}", "[!] Interrupted, flushing partial results".yellow());
                return Ok(BruteforceOutcome::Interrupted);
            }
            if self.budget.should_stop(metrics.attempts(), started.elapsed()) {
                println!(
                    "{}",
                    format!("[!] Stopping: {} exhausted", self.budget.exhausted_limits()).yellow()
                );
                return Ok(BruteforceOutcome::BudgetExhausted);
            }

            let Some(password) = candidates.next() else {
                return Ok(BruteforceOutcome::NotFound);
            };

            // WorstOf with one limit exhausted: advance candidates without
            // spending requests, re-polling until the other limit catches up.
            if self.budget.skip_attempt(metrics.attempts(), started.elapsed()) {
                std::thread::sleep(SKIP_POLL_INTERVAL);
                continue;
            }

            let outcome = attempt_candidate(
                transport,
                &self.challenge,
                &mut self.budget,
                metrics,
                &self.interrupt,
                started,
                username,
                &password,
            )?;

            match outcome {
                CycleOutcome::Success => {
                    let attempt = metrics.attempts();
                    println!(
                        "{}",
                        format!("[+] PASSWORD FOUND: {password} (attempt #{attempt})")
                            .green()
                            .bold()
                    );
                    return Ok(BruteforceOutcome::Found { password, attempt });
                }
                CycleOutcome::Failure => {
                    if metrics.attempts() % PROGRESS_EVERY == 0 {
                        println!("   ... {} attempts", metrics.attempts());
                    }
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
                CycleOutcome::Locked => {
                    println!("{}", format!("[!] Account '{username}' locked by defender").red());
                    return Ok(BruteforceOutcome::Locked);
                }
                CycleOutcome::MfaBlocked => {
                    println!(
                        "{}",
                        format!("[!] Correct password for '{username}' blocked by second factor")
                            .red()
                    );
                    return Ok(BruteforceOutcome::BlockedByMfa);
                }
                // The candidate was abandoned mid-retry; the loop top takes
                // over polling the remaining limit.
                CycleOutcome::BudgetSkip => {}
                CycleOutcome::BudgetStop => return Ok(BruteforceOutcome::BudgetExhausted),
                CycleOutcome::Interrupted => return Ok(BruteforceOutcome::Interrupted),
            }
        }
    }
}
