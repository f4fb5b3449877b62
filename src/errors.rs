// errors.rs - Attack Engine Error Taxonomy
// Purpose: Separate configuration errors (fail fast, nothing attempted) from
//          protocol violations (fatal mid-run) and transport noise (recoverable,
//          handled inside the attempt loop and never surfaced here)

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttackError {
    /// Unknown difficulty profile name. Raised before any candidate is yielded.
    #[error("unknown difficulty profile: '{0}' (expected easy, medium or hard)")]
    UnknownDifficulty(String),

    /// A CAPTCHA challenge arrived but no group seed was configured, so the
    /// token endpoint cannot be called. Aborts the run rather than silently
    /// hammering the challenge.
    #[error("captcha challenge received but no group seed is configured (use --group-seed)")]
    MissingGroupSeed,

    /// 429 without a usable Retry-After header. Waiting zero seconds would
    /// corrupt the experiment, so this is fatal instead.
    #[error("rate limited response is missing a usable Retry-After header")]
    MissingRetryAfter,

    /// The auth endpoint broke the wire contract (missing field, bad JSON).
    #[error("malformed response from auth endpoint: {0}")]
    Protocol(String),

    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}
