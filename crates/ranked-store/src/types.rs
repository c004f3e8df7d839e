use crate::{RankedStoreError, Result};
use serde::{Deserialize, Serialize};

/// A member of a ranked set together with its accumulated score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

impl ScoredMember {
    pub fn new(member: impl Into<String>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// Scores are non-negative popularity counts; anything else is rejected
/// before it reaches a backend.
pub fn validate_score(key: &str, member: &str, score: f64) -> Result<()> {
    if score.is_finite() && score >= 0.0 {
        return Ok(());
    }
    Err(RankedStoreError::InvalidScore {
        key: key.to_string(),
        member: member.to_string(),
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_zero_and_positive_scores() {
        assert!(validate_score("ca", "cat", 0.0).is_ok());
        assert!(validate_score("ca", "cat", 12.5).is_ok());
    }

    #[test]
    fn rejects_negative_and_non_finite_scores() {
        assert!(validate_score("ca", "cat", -1.0).is_err());
        assert!(validate_score("ca", "cat", f64::NAN).is_err());
        assert!(validate_score("ca", "cat", f64::INFINITY).is_err());
    }
}
