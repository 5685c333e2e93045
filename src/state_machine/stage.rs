use std::fmt;

use serde::{Deserialize, Serialize};

/// Status value the backend uses for a finished pipeline.
pub const COMPLETE_SENTINEL: &str = "complete";
/// Status value the backend uses for a rejected pipeline.
pub const FAILED_SENTINEL: &str = "failed";

/// Rank of the successful terminal state, one past the last pipeline stage.
pub const COMPLETE_RANK: u8 = 6;

/// A non-terminal pipeline stage as reported by the backend.
///
/// Known stages flow: SUBMITTED → INGESTING → EXTRACTING → ELIGIBILITY_CHECK
/// → MARKET_INTELLIGENCE → STRATEGY_SYNTHESIS. Anything else the backend
/// reports is kept as [`Stage::Unknown`] so newer stages still display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    Submitted,
    Ingesting,
    Extracting,
    EligibilityCheck,
    MarketIntelligence,
    StrategySynthesis,
    Unknown(String),
}

impl Stage {
    /// Parses a backend status string. `queued` is the backend's name for a
    /// job that has not started yet.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "submitted" | "queued" => Stage::Submitted,
            "ingesting" => Stage::Ingesting,
            "extracting" => Stage::Extracting,
            "eligibility_check" => Stage::EligibilityCheck,
            "market_intelligence" => Stage::MarketIntelligence,
            "strategy_synthesis" => Stage::StrategySynthesis,
            _ => Stage::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Stage::Submitted => "submitted",
            Stage::Ingesting => "ingesting",
            Stage::Extracting => "extracting",
            Stage::EligibilityCheck => "eligibility_check",
            Stage::MarketIntelligence => "market_intelligence",
            Stage::StrategySynthesis => "strategy_synthesis",
            Stage::Unknown(raw) => raw,
        }
    }

    /// Position in the pipeline. Unknown stages have none.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Stage::Submitted => Some(0),
            Stage::Ingesting => Some(1),
            Stage::Extracting => Some(2),
            Stage::EligibilityCheck => Some(3),
            Stage::MarketIntelligence => Some(4),
            Stage::StrategySynthesis => Some(5),
            Stage::Unknown(_) => None,
        }
    }

    /// Human label shown while the stage runs.
    pub fn label(&self) -> &str {
        match self {
            Stage::Submitted => "Queued",
            Stage::Ingesting => "Reading PDF",
            Stage::Extracting => "Extracting Requirements",
            Stage::EligibilityCheck => "Checking Eligibility",
            Stage::MarketIntelligence => "Market Intelligence",
            Stage::StrategySynthesis => "Strategy Synthesis",
            Stage::Unknown(raw) => raw,
        }
    }
}

impl From<String> for Stage {
    fn from(raw: String) -> Self {
        Stage::parse(&raw)
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.as_str().to_string()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}
