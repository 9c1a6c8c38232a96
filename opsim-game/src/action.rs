//! Control actions an operator can press.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Every control on the panel, plus the explicit "do nothing" acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    GeneratorOn,
    GeneratorStabilize,
    StabilizerRecentre,
    StabilizerReset,
    TempHigh,
    #[serde(rename = "TEMP_3RD_HIGH")]
    Temp3rdHigh,
    GasReset,
    GasAlarm,
    SystemReset,
    None,
}

impl ActionType {
    /// Every pressable control, excluding [`ActionType::None`].
    pub const CONTROLS: [Self; 9] = [
        Self::GeneratorOn,
        Self::GeneratorStabilize,
        Self::StabilizerRecentre,
        Self::StabilizerReset,
        Self::TempHigh,
        Self::Temp3rdHigh,
        Self::GasReset,
        Self::GasAlarm,
        Self::SystemReset,
    ];

    /// Wire name, matching the serde representation.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::GeneratorOn => "GENERATOR_ON",
            Self::GeneratorStabilize => "GENERATOR_STABILIZE",
            Self::StabilizerRecentre => "STABILIZER_RECENTRE",
            Self::StabilizerReset => "STABILIZER_RESET",
            Self::TempHigh => "TEMP_HIGH",
            Self::Temp3rdHigh => "TEMP_3RD_HIGH",
            Self::GasReset => "GAS_RESET",
            Self::GasAlarm => "GAS_ALARM",
            Self::SystemReset => "SYSTEM_RESET",
            Self::None => "NONE",
        }
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raised when an action name does not match any control.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown action: {0}")]
pub struct ParseActionError(pub String);

impl FromStr for ActionType {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::CONTROLS
            .into_iter()
            .chain(std::iter::once(Self::None))
            .find(|action| action.code() == wanted)
            .ok_or_else(|| ParseActionError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_names_match_codes() {
        for action in ActionType::CONTROLS {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.code()));
        }
        let none: ActionType = serde_json::from_str("\"NONE\"").unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn parses_loose_spellings() {
        assert_eq!("temp-3rd-high".parse(), Ok(ActionType::Temp3rdHigh));
        assert_eq!(" gas reset ".parse(), Ok(ActionType::GasReset));
        assert_eq!(
            "panic".parse::<ActionType>(),
            Err(ParseActionError("panic".to_string()))
        );
    }
}
