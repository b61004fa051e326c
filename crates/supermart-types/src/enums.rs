//! Enumeration types for the store simulation.
//!
//! Every enum that is persisted has a stable lowercase/canonical string form
//! (`as_str`) and a matching [`FromStr`] so the data layer can store it as
//! text and read it back unchanged.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an enum from its stored string form fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    /// Name of the enum that was being parsed.
    pub kind: &'static str,
    /// The input that did not match any variant.
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

// ---------------------------------------------------------------------------
// Game over
// ---------------------------------------------------------------------------

/// Why a game ended.
///
/// Evaluated in declaration order: when several meters hit zero in the same
/// update, the earliest variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GameOverReason {
    /// Stock meter reached zero.
    Stockout,
    /// Customer satisfaction reached zero.
    Boycott,
    /// Profit reached zero.
    Bankruptcy,
    /// Staff morale reached zero.
    Strike,
}

impl GameOverReason {
    /// The reason string shown to the player and stored with the session.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stockout => "Stockout",
            Self::Boycott => "Boycott",
            Self::Bankruptcy => "Bankruptcy",
            Self::Strike => "Strike",
        }
    }
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameOverReason {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Stockout" => Ok(Self::Stockout),
            "Boycott" => Ok(Self::Boycott),
            "Bankruptcy" => Ok(Self::Bankruptcy),
            "Strike" => Ok(Self::Strike),
            other => Err(ParseEnumError {
                kind: "GameOverReason",
                value: other.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// One side of a binary decision card.
///
/// The right side is the deny/default branch and is what a timeout resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceSide {
    /// The accept/act branch.
    Left,
    /// The deny/default branch.
    Right,
}

impl ChoiceSide {
    /// Canonical stored form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for ChoiceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChoiceSide {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(ParseEnumError {
                kind: "ChoiceSide",
                value: other.to_owned(),
            }),
        }
    }
}

/// How a presented decision reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "side", rename_all = "snake_case")]
pub enum Resolution {
    /// The player picked a side.
    Chosen(ChoiceSide),
    /// Nobody answered before the deadline; the right branch was applied.
    TimedOut,
}

impl Resolution {
    /// The side whose deltas were applied.
    pub const fn side(self) -> ChoiceSide {
        match self {
            Self::Chosen(side) => side,
            Self::TimedOut => ChoiceSide::Right,
        }
    }

    /// Whether the decision resolved by timeout.
    pub const fn timed_out(self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

// ---------------------------------------------------------------------------
// Supplier orders
// ---------------------------------------------------------------------------

/// Lifecycle status of a supplier order.
///
/// Orders are placed and applied to the shelf in the same step, so only the
/// placement status is currently tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed with the supplier.
    Pending,
}

impl OrderStatus {
    /// Canonical stored form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            other => Err(ParseEnumError {
                kind: "OrderStatus",
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_over_reason_strings_round_trip() {
        for reason in [
            GameOverReason::Stockout,
            GameOverReason::Boycott,
            GameOverReason::Bankruptcy,
            GameOverReason::Strike,
        ] {
            assert_eq!(reason.as_str().parse::<GameOverReason>(), Ok(reason));
        }
        assert!("Flood".parse::<GameOverReason>().is_err());
    }

    #[test]
    fn timeout_resolves_to_right() {
        assert_eq!(Resolution::TimedOut.side(), ChoiceSide::Right);
        assert!(Resolution::TimedOut.timed_out());
        assert_eq!(Resolution::Chosen(ChoiceSide::Left).side(), ChoiceSide::Left);
        assert!(!Resolution::Chosen(ChoiceSide::Right).timed_out());
    }

    #[test]
    fn parse_error_names_the_enum() {
        let err = "up".parse::<ChoiceSide>().err();
        assert_eq!(
            err.map(|e| e.to_string()),
            Some("unknown ChoiceSide value: \"up\"".to_owned())
        );
    }
}
