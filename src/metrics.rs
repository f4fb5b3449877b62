// metrics.rs - Attempt-Level Attack Metrics
// Purpose: Record per-attempt success/failure/latency and periodic process
//          resource samples, and derive the run's summary report

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use sysinfo::{Pid, System};

/// A resource sample is taken on every Nth completed attempt, regardless of
/// which state-machine branch recorded it.
const RESOURCE_SAMPLE_EVERY: u64 = 10;

/// Summary report consumed by the metrics sink. Spray runs additionally carry
/// the account totals; those fields are omitted for bruteforce.
#[derive(Debug, Clone, Serialize)]
pub struct AttackReport {
    pub experiment: String,
    pub timestamp: String,
    pub total_attempts: u64,
    pub successful_attempts: u64,
    pub failed_attempts: u64,
    pub total_time_seconds: f64,
    pub attempts_per_second: f64,
    pub time_to_breach_seconds: Option<f64>,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub avg_cpu_percent: f64,
    pub avg_memory_mb: f64,
    pub breached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts_compromised: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_accounts: Option<usize>,
}

/// Owned by the caller for the duration of one run; the engine mutates it
/// exclusively from the attempt loop. Started at run begin and stopped at run
/// end regardless of outcome, so even aborted runs yield a valid report.
pub struct AttackMetrics {
    experiment_name: String,
    started: Option<Instant>,
    total_time: Option<Duration>,
    attempts: u64,
    successful_attempts: u64,
    failed_attempts: u64,
    latencies_ms: Vec<u64>,
    breach_time: Option<Duration>,
    cpu_samples: Vec<f32>,
    memory_samples: Vec<f64>,
    account_stats: Option<(usize, usize)>,
    system: System,
    pid: Pid,
}

impl AttackMetrics {
    pub fn new(experiment_name: &str) -> Self {
        Self {
            experiment_name: experiment_name.to_string(),
            started: None,
            total_time: None,
            attempts: 0,
            successful_attempts: 0,
            failed_attempts: 0,
            latencies_ms: Vec::new(),
            breach_time: None,
            cpu_samples: Vec::new(),
            memory_samples: Vec::new(),
            account_stats: None,
            system: System::new(),
            pid: Pid::from_u32(std::process::id()),
        }
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.total_time = None;
        self.attempts = 0;
        self.successful_attempts = 0;
        self.failed_attempts = 0;
        self.latencies_ms.clear();
        self.breach_time = None;
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn record_attempt(&mut self, success: bool, latency_ms: u64) {
        self.attempts += 1;
        self.latencies_ms.push(latency_ms);

        if success {
            self.successful_attempts += 1;
            if self.breach_time.is_none() {
                self.breach_time = self.started.map(|s| s.elapsed());
            }
        } else {
            self.failed_attempts += 1;
        }

        if self.attempts % RESOURCE_SAMPLE_EVERY == 0 {
            self.sample_resources();
        }
    }

    pub fn sample_resources(&mut self) {
        if self.system.refresh_process(self.pid) {
            if let Some(process) = self.system.process(self.pid) {
                self.cpu_samples.push(process.cpu_usage());
                self.memory_samples.push(process.memory() as f64 / 1024.0 / 1024.0);
            }
        }
    }

    /// Spray-only account totals, set by the engine before finalization.
    pub fn set_account_stats(&mut self, compromised: usize, total: usize) {
        self.account_stats = Some((compromised, total));
    }

    /// Idempotent; the first call fixes the run's total time.
    pub fn stop(&mut self) {
        if self.total_time.is_none() {
            self.total_time = self.started.map(|s| s.elapsed());
        }
    }

    pub fn report(&self) -> AttackReport {
        let total_time = self.total_time.unwrap_or_default().as_secs_f64();
        let latency_sum: u64 = self.latencies_ms.iter().sum();

        AttackReport {
            experiment: self.experiment_name.clone(),
            timestamp: Utc::now().to_rfc3339(),
            total_attempts: self.attempts,
            successful_attempts: self.successful_attempts,
            failed_attempts: self.failed_attempts,
            total_time_seconds: round2(total_time),
            attempts_per_second: if total_time > 0.0 {
                round2(self.attempts as f64 / total_time)
            } else {
                0.0
            },
            time_to_breach_seconds: self.breach_time.map(|d| round2(d.as_secs_f64())),
            success_rate: if self.attempts > 0 {
                round2(self.successful_attempts as f64 / self.attempts as f64 * 100.0)
            } else {
                0.0
            },
            avg_latency_ms: if self.latencies_ms.is_empty() {
                0.0
            } else {
                round2(latency_sum as f64 / self.latencies_ms.len() as f64)
            },
            min_latency_ms: self.latencies_ms.iter().copied().min().unwrap_or(0),
            max_latency_ms: self.latencies_ms.iter().copied().max().unwrap_or(0),
            avg_cpu_percent: average(&self.cpu_samples.iter().map(|&c| c as f64).collect::<Vec<_>>()),
            avg_memory_mb: average(&self.memory_samples),
            breached: self.breach_time.is_some(),
            accounts_compromised: self.account_stats.map(|(compromised, _)| compromised),
            total_accounts: self.account_stats.map(|(_, total)| total),
        }
    }

    /// Writes the report as `<dir>/<experiment>_<timestamp>.json`, creating
    /// the directory if needed.
    pub fn save_report(&self, output_dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let filename = format!(
            "{}_{}.json",
            self.experiment_name,
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = output_dir.join(filename);
        let json = serde_json::to_string_pretty(&self.report())?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        round2(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_rates() {
        let mut metrics = AttackMetrics::new("unit");
        metrics.start();
        metrics.record_attempt(false, 10);
        metrics.record_attempt(false, 30);
        metrics.record_attempt(true, 20);
        metrics.stop();

        let report = metrics.report();
        assert_eq!(report.total_attempts, 3);
        assert_eq!(report.successful_attempts, 1);
        assert_eq!(report.failed_attempts, 2);
        assert_eq!(report.avg_latency_ms, 20.0);
        assert_eq!(report.min_latency_ms, 10);
        assert_eq!(report.max_latency_ms, 30);
        assert_eq!(report.success_rate, 33.33);
        assert!(report.breached);
        assert!(report.time_to_breach_seconds.is_some());
    }

    #[test]
    fn test_breach_time_fixed_on_first_success() {
        let mut metrics = AttackMetrics::new("unit");
        metrics.start();
        metrics.record_attempt(true, 1);
        let first = metrics.report().time_to_breach_seconds;
        metrics.record_attempt(true, 1);
        metrics.stop();
        assert_eq!(metrics.report().time_to_breach_seconds, first);
    }

    #[test]
    fn test_empty_run_still_reports() {
        let mut metrics = AttackMetrics::new("unit");
        metrics.start();
        metrics.stop();
        let report = metrics.report();
        assert_eq!(report.total_attempts, 0);
        assert_eq!(report.success_rate, 0.0);
        assert_eq!(report.avg_latency_ms, 0.0);
        assert!(!report.breached);
        assert!(report.time_to_breach_seconds.is_none());
    }

    #[test]
    fn test_account_stats_only_present_for_spray() {
        let mut metrics = AttackMetrics::new("unit");
        metrics.start();
        metrics.stop();
        assert!(metrics.report().accounts_compromised.is_none());

        metrics.set_account_stats(2, 5);
        let report = metrics.report();
        assert_eq!(report.accounts_compromised, Some(2));
        assert_eq!(report.total_accounts, Some(5));
    }
}
