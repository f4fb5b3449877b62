// attempt.rs - Shared Attempt-and-Classify Cycle
// Purpose: Resolve one password candidate against one username, handling the
//          rate-limit backoff and captcha fetch-and-retry sub-protocols that
//          retry the same candidate. Both engines build on this routine; the
//          caller decides what advancing past a resolved candidate means.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use colored::*;

use crate::budget::BudgetTracker;
use crate::challenge::ChallengeHandler;
use crate::client::LoginTransport;
use crate::errors::AttackError;
use crate::metrics::AttackMetrics;
use crate::signal::{DefenseSignal, classify};

/// How one candidate's attempt cycle ended. Transport errors resolve to
/// `Failure` after being recorded with zero latency; they are noise, not a
/// reason to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Success,
    Failure,
    Locked,
    MfaBlocked,
    /// A WorstOf limit ran out mid-retry; the candidate is abandoned without
    /// further wire calls and the caller's poll loop takes over.
    BudgetSkip,
    BudgetStop,
    Interrupted,
}

/// Runs login attempts for a single (username, password) pair until the
/// candidate resolves. RateLimited sleeps the server-mandated backoff and
/// retries the same password; CaptchaRequired/CaptchaInvalid fetch a fresh
/// single-use token and retry the same password. Every wire attempt is
/// recorded in `metrics`; budget and interrupt are re-checked before each
/// retry so a retry storm cannot outlive the run's limits, and a WorstOf
/// limit going out mid-retry abandons the candidate before any further
/// wire call.
#[allow(clippy::too_many_arguments)]
pub fn attempt_candidate<T: LoginTransport>(
    transport: &mut T,
    challenge: &ChallengeHandler,
    budget: &mut BudgetTracker,
    metrics: &mut AttackMetrics,
    interrupt: &AtomicBool,
    run_started: Instant,
    username: &str,
    password: &str,
) -> Result<CycleOutcome, AttackError> {
    // Challenge state lives for this candidate only; the token is consumed by
    // the next attempt and never reused.
    let mut captcha_token: Option<String> = None;

    loop {
        let attempt_started = Instant::now();
        let raw = transport.login(username, password, captcha_token.take().as_deref());
        let latency_ms = attempt_started.elapsed().as_millis() as u64;

        // Set by the non-terminal arms; acted on only after the budget and
        // interrupt checks below, so an exhausted limit is never followed by
        // another wire call (the token fetch included) or a pointless sleep.
        let mut backoff: Option<std::time::Duration> = None;
        let mut needs_token = false;

        match classify(raw)? {
            DefenseSignal::Success => {
                metrics.record_attempt(true, latency_ms);
                return Ok(CycleOutcome::Success);
            }
            DefenseSignal::Failure => {
                metrics.record_attempt(false, latency_ms);
                return Ok(CycleOutcome::Failure);
            }
            DefenseSignal::Locked => {
                metrics.record_attempt(false, latency_ms);
                return Ok(CycleOutcome::Locked);
            }
            DefenseSignal::SecondFactorRequired => {
                metrics.record_attempt(false, latency_ms);
                return Ok(CycleOutcome::MfaBlocked);
            }
            DefenseSignal::TransportError { cause } => {
                println!("{}", format!("[!] Transport error on '{username}': {cause}").yellow());
                metrics.record_attempt(false, 0);
                return Ok(CycleOutcome::Failure);
            }
            DefenseSignal::RateLimited { retry_after } => {
                metrics.record_attempt(false, latency_ms);
                println!(
                    "{}",
                    format!(
                        "[!] Rate limited, backing off {:.0}s before retrying the same candidate",
                        retry_after.as_secs_f64()
                    )
                    .yellow()
                );
                backoff = Some(retry_after);
            }
            DefenseSignal::CaptchaRequired | DefenseSignal::CaptchaInvalid => {
                metrics.record_attempt(false, latency_ms);
                needs_token = true;
            }
        }

        // Retrying the same candidate: stay cancellable and within budget.
        if interrupt.load(Ordering::Relaxed) {
            return Ok(CycleOutcome::Interrupted);
        }
        if budget.should_stop(metrics.attempts(), run_started.elapsed()) {
            return Ok(CycleOutcome::BudgetStop);
        }
        if budget.skip_attempt(metrics.attempts(), run_started.elapsed()) {
            return Ok(CycleOutcome::BudgetSkip);
        }

        if needs_token {
            captcha_token = challenge.acquire(transport)?;
        }
        if let Some(wait) = backoff {
            std::thread::sleep(wait);
        }
    }
}
