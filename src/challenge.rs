// challenge.rs - CAPTCHA Challenge Handling
// Purpose: Acquire single-use captcha tokens from the issuance endpoint when
//          the defender raises a challenge

use colored::*;

use crate::client::LoginTransport;
use crate::errors::AttackError;

/// Fetches captcha tokens keyed by the out-of-band group seed shared between
/// attacker and defender in this research setup.
pub struct ChallengeHandler {
    group_seed: Option<String>,
}

impl ChallengeHandler {
    pub fn new(group_seed: Option<String>) -> Self {
        Self { group_seed }
    }

    /// Acquires a fresh token for the retry of the current candidate.
    ///
    /// A missing group seed is a hard configuration error: the challenge can
    /// never be answered, so the run aborts instead of silently looping. A
    /// failed issuance call (non-200 or transport failure) degrades to a
    /// token-less retry; the warning stays visible so defense
    /// misconfiguration shows up in experiment logs.
    pub fn acquire<T: LoginTransport>(&self, transport: &mut T) -> Result<Option<String>, AttackError> {
        let seed = self.group_seed.as_deref().ok_or(AttackError::MissingGroupSeed)?;

        match transport.captcha_token(seed) {
            Ok(token) => Ok(Some(token)),
            Err(failure) => {
                println!(
                    "{}",
                    format!("[!] Captcha token issuance failed ({failure}), retrying without a token")
                    .yellow()
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RawResponse, TransportFailure};

    struct TokenFake {
        response: Result<String, TransportFailure>,
        calls: usize,
    }

    impl LoginTransport for TokenFake {
        fn login(
            &mut self,
            _username: &str,
            _password: &str,
            _captcha_token: Option<&str>,
        ) -> Result<RawResponse, TransportFailure> {
            unreachable!("challenge handler never logs in");
        }

        fn captcha_token(&mut self, group_seed: &str) -> Result<String, TransportFailure> {
            assert_eq!(group_seed, "seed-42");
            self.calls += 1;
            self.response.clone()
        }
    }

    #[test]
    fn test_missing_seed_is_configuration_error() {
        let handler = ChallengeHandler::new(None);
        let mut fake = TokenFake { response: Ok("tok".to_string()), calls: 0 };
        assert!(matches!(handler.acquire(&mut fake), Err(AttackError::MissingGroupSeed)));
        assert_eq!(fake.calls, 0);
    }

    #[test]
    fn test_acquires_token_with_seed() {
        let handler = ChallengeHandler::new(Some("seed-42".to_string()));
        let mut fake = TokenFake { response: Ok("tok-1".to_string()), calls: 0 };
        assert_eq!(handler.acquire(&mut fake).unwrap().as_deref(), Some("tok-1"));
        assert_eq!(fake.calls, 1);
    }

    #[test]
    fn test_issuance_failure_degrades_to_no_token() {
        let handler = ChallengeHandler::new(Some("seed-42".to_string()));
        let mut fake = TokenFake {
            response: Err(TransportFailure { cause: "status 400".to_string() }),
            calls: 0,
        };
        assert_eq!(handler.acquire(&mut fake).unwrap(), None);
    }
}
