//! Review stages and the rounds they are grouped into

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single named review checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReviewStage {
    #[serde(rename = "Review1.a")]
    Review1A,
    #[serde(rename = "Review1.b")]
    Review1B,
    #[serde(rename = "Review2")]
    Review2,
    #[serde(rename = "Review3")]
    Review3,
}

/// Raised when a stage name is not one of the known review stages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown review stage '{0}'")]
pub struct UnknownStage(pub String);

impl ReviewStage {
    pub const ALL: [ReviewStage; 4] = [
        ReviewStage::Review1A,
        ReviewStage::Review1B,
        ReviewStage::Review2,
        ReviewStage::Review3,
    ];

    /// Wire name, e.g. `Review1.a`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review1A => "Review1.a",
            Self::Review1B => "Review1.b",
            Self::Review2 => "Review2",
            Self::Review3 => "Review3",
        }
    }

    /// Round this stage belongs to
    pub fn round(&self) -> Round {
        match self {
            Self::Review1A | Self::Review1B => Round::One,
            Self::Review2 => Round::Two,
            Self::Review3 => Round::Three,
        }
    }

    /// Only the second-level reviewer may declare the follow-up review unnecessary
    pub fn accepts_follow_up_waiver(&self) -> bool {
        matches!(self, Self::Review2)
    }

    /// Instructions sent along with a review assignment
    pub fn instructions(&self) -> &'static str {
        match self {
            Self::Review1A => "Perform the first parallel review (A)",
            Self::Review1B => "Perform the first parallel review (B)",
            Self::Review2 => "Perform the senior schema review",
            Self::Review3 => "Perform the compliance review",
        }
    }
}

impl fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Stages executed together and joined before the workflow proceeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Round {
    One,
    Two,
    Three,
}

impl Round {
    /// Static table of round membership
    pub fn stages(&self) -> &'static [ReviewStage] {
        match self {
            Self::One => &[ReviewStage::Review1A, ReviewStage::Review1B],
            Self::Two => &[ReviewStage::Review2],
            Self::Three => &[ReviewStage::Review3],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::One => "Round1",
            Self::Two => "Round2",
            Self::Three => "Round3",
        }
    }

    /// Name of the checkpoint that requests a revision when this round rejects
    pub fn check_name(&self) -> &'static str {
        match self {
            Self::One => "Review1Check",
            Self::Two => "Review2Check",
            Self::Three => "Review3Check",
        }
    }

    pub fn rejection_reason(&self) -> &'static str {
        match self {
            Self::One => "Round one reviewers requested changes",
            Self::Two => "Round two reviewer rejected the submission",
            Self::Three => "Round three reviewer rejected the submission",
        }
    }

    /// Round name scoped to a submission version, e.g. `Round2:v3`
    pub fn name_for_version(&self, version: u32) -> String {
        format!("{}:v{}", self.label(), version)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_wire_names() {
        let json = serde_json::to_string(&ReviewStage::Review1A).unwrap();
        assert_eq!(json, "\"Review1.a\"");

        let parsed: ReviewStage = serde_json::from_str("\"Review1.b\"").unwrap();
        assert_eq!(parsed, ReviewStage::Review1B);

        assert_eq!("Review3".parse::<ReviewStage>().unwrap(), ReviewStage::Review3);
        assert_eq!(
            "Review9".parse::<ReviewStage>().unwrap_err(),
            UnknownStage("Review9".to_string())
        );
    }

    #[test]
    fn test_round_table_covers_every_stage_once() {
        let mut seen = Vec::new();
        for round in [Round::One, Round::Two, Round::Three] {
            for stage in round.stages() {
                assert_eq!(stage.round(), round);
                seen.push(*stage);
            }
        }
        assert_eq!(seen, ReviewStage::ALL.to_vec());
    }

    #[test]
    fn test_only_review2_accepts_waiver() {
        let accepting: Vec<_> = ReviewStage::ALL
            .iter()
            .filter(|s| s.accepts_follow_up_waiver())
            .collect();
        assert_eq!(accepting, vec![&ReviewStage::Review2]);
    }

    #[test]
    fn test_round_name_for_version() {
        assert_eq!(Round::Two.name_for_version(3), "Round2:v3");
    }
}
