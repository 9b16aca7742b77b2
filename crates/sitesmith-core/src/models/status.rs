//! Status enumeration for build steps.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Type-safe enumeration of step statuses.
///
/// Transitions are one-way: `Pending` moves to either `Completed` or `Error`
/// and never back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Step has been parsed but not yet folded into the tree
    #[default]
    Pending,

    /// Step has been folded into the tree (or forwarded to the sandbox)
    Completed,

    /// Step was rejected, e.g. because its path is malformed
    Error,
}

impl FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(StepStatus::Pending),
            "completed" | "done" => Ok(StepStatus::Completed),
            "error" => Ok(StepStatus::Error),
            _ => Err(format!("Invalid step status: {s}")),
        }
    }
}

impl StepStatus {
    /// Convert to its serialized string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Completed => "completed",
            StepStatus::Error => "error",
        }
    }

    /// Whether a step in this status may move to `next`.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Completed) | (StepStatus::Pending, StepStatus::Error)
        )
    }

    /// Whether the status is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Pending)
    }

    /// Get status with consistent icon formatting for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sitesmith_core::models::StepStatus;
    ///
    /// assert_eq!(StepStatus::Completed.with_icon(), "✓ Completed");
    /// assert_eq!(StepStatus::Pending.with_icon(), "○ Pending");
    /// assert_eq!(StepStatus::Error.with_icon(), "✗ Error");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            StepStatus::Completed => "✓ Completed",
            StepStatus::Pending => "○ Pending",
            StepStatus::Error => "✗ Error",
        }
    }
}
