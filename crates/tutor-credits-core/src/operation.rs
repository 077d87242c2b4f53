//! The static cost table for AI operations.
//!
//! Costs are fixed constants known at deploy time. They are resolved here,
//! never supplied by callers, so a route handler cannot understate the price
//! of the operation it is about to run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// A costed AI operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Premium chat turn against the vision-capable model.
    Chat,

    /// Handwriting / worksheet OCR.
    Ocr,

    /// Step-by-step math solving.
    SolveMath,

    /// Full worked-solution generation.
    GenerateSolution,

    /// Spoken-answer analysis.
    VoiceAnalyze,

    /// AI-drafted teacher feedback on a submission.
    TeacherFeedback,
}

impl OperationKind {
    /// Credit cost of this operation.
    #[must_use]
    pub const fn credit_cost(&self) -> i64 {
        match self {
            Self::Chat | Self::Ocr => 1,
            Self::SolveMath | Self::GenerateSolution | Self::VoiceAnalyze => 2,
            Self::TeacherFeedback => 3,
        }
    }

    /// Wire name of this operation (kebab-case).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Ocr => "ocr",
            Self::SolveMath => "solve-math",
            Self::GenerateSolution => "generate-solution",
            Self::VoiceAnalyze => "voice-analyze",
            Self::TeacherFeedback => "teacher-feedback",
        }
    }

    /// All known operation kinds.
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::Chat,
            Self::Ocr,
            Self::SolveMath,
            Self::GenerateSolution,
            Self::VoiceAnalyze,
            Self::TeacherFeedback,
        ]
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = LedgerError;

    /// Parse a wire name. Unknown kinds are a caller programming error and
    /// are rejected outright; there is no default cost to fall back to.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "ocr" => Ok(Self::Ocr),
            "solve-math" => Ok(Self::SolveMath),
            "generate-solution" => Ok(Self::GenerateSolution),
            "voice-analyze" => Ok(Self::VoiceAnalyze),
            "teacher-feedback" => Ok(Self::TeacherFeedback),
            other => Err(LedgerError::UnknownOperation(other.to_string())),
        }
    }
}
