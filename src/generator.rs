// generator.rs - Lazy Password Candidate Enumeration
// Purpose: Enumerate the candidate space of a difficulty profile in a fixed,
//          deterministic order without ever materializing the full list

use crate::errors::AttackError;

const EASY_CHARSET: &str = "abcd0123";
const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A named difficulty profile fixing charset and length range. Profiles do not
/// overlap, so a profile name fully determines the candidate space.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyProfile {
    pub name: &'static str,
    pub charset: &'static str,
    pub min_length: usize,
    pub max_length: usize,
}

pub const PROFILES: &[DifficultyProfile] = &[
    DifficultyProfile { name: "easy", charset: EASY_CHARSET, min_length: 4, max_length: 6 },
    DifficultyProfile { name: "medium", charset: ALPHANUMERIC, min_length: 7, max_length: 8 },
    DifficultyProfile { name: "hard", charset: ALPHANUMERIC, min_length: 8, max_length: 10 },
];

pub fn profile(name: &str) -> Result<DifficultyProfile, AttackError> {
    PROFILES
        .iter()
        .find(|p| p.name == name)
        .copied()
        .ok_or_else(|| AttackError::UnknownDifficulty(name.to_string()))
}

/// Lazy candidate generator. For each length from `min_length` to `max_length`
/// (ascending), yields every string of that length over the charset in
/// cartesian-product order: the rightmost position varies fastest, ordered by
/// charset index. Non-restartable; an optional cap stops generation after
/// exactly that many candidates, even mid-length.
pub struct CandidateGenerator {
    charset: Vec<char>,
    max_length: usize,
    cap: Option<u64>,
    yielded: u64,
    // Odometer of charset indices for the current candidate; its length is
    // the current candidate length.
    indices: Vec<usize>,
    exhausted: bool,
}

impl CandidateGenerator {
    pub fn new(charset: &str, min_length: usize, max_length: usize, cap: Option<u64>) -> Self {
        let chars: Vec<char> = charset.chars().collect();
        let degenerate = chars.is_empty() || min_length == 0 || min_length > max_length;
        Self {
            charset: chars,
            max_length,
            cap,
            yielded: 0,
            indices: vec![0; min_length],
            exhausted: degenerate,
        }
    }

    pub fn from_profile(name: &str, cap: Option<u64>) -> Result<Self, AttackError> {
        let p = profile(name)?;
        Ok(Self::new(p.charset, p.min_length, p.max_length, cap))
    }

    fn current(&self) -> String {
        self.indices.iter().map(|&i| self.charset[i]).collect()
    }

    fn advance(&mut self) {
        for pos in (0..self.indices.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < self.charset.len() {
                return;
            }
            self.indices[pos] = 0;
        }
        // Every position wrapped: the current length is done, grow by one.
        if self.indices.len() >= self.max_length {
            self.exhausted = true;
        } else {
            self.indices = vec![0; self.indices.len() + 1];
        }
    }
}

impl Iterator for CandidateGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        if let Some(cap) = self.cap {
            if self.yielded >= cap {
                self.exhausted = true;
                return None;
            }
        }
        let candidate = self.current();
        self.yielded += 1;
        self.advance();
        Some(candidate)
    }
}
