//! Attack pattern descriptors and their roster token grammar.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directions fired per burst by a `multi` pattern with a multiplier of one.
pub const BASE_DIRECTIONS: u32 = 8;

/// Largest direction multiplier accepted for `multi` patterns (256 directions).
pub const MAX_DIRECTION_MULTIPLIER: u32 = 6;

/// Attack behaviour assigned to a hostile when it spawns.
///
/// Roster tokens use the parameterised forms `aim{columns}_{bullets}` and
/// `multi{multiplier}_{bursts}`. The bare names `aim` and `multi` are aliases
/// for `aim1_1` and `multi1_1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PatternKind {
    /// Descends while firing straight down on a fixed cadence.
    Normal,
    /// Halts at the trigger line and fires aimed columns at the player.
    Aim {
        /// Number of parallel columns fanned around the aim angle.
        columns: u32,
        /// Shots fired by every column.
        bullets_per_column: u32,
    },
    /// Halts at the trigger line and fires rotating radial bursts.
    Multi {
        /// Each step doubles the base eight-way spread.
        direction_multiplier: u32,
        /// Number of bursts fired before retreating.
        bursts_per_direction: u32,
    },
}

impl PatternKind {
    /// Creates an aimed pattern descriptor.
    #[must_use]
    pub const fn aim(columns: u32, bullets_per_column: u32) -> Self {
        Self::Aim {
            columns,
            bullets_per_column,
        }
    }

    /// Creates a radial burst pattern descriptor.
    #[must_use]
    pub const fn multi(direction_multiplier: u32, bursts_per_direction: u32) -> Self {
        Self::Multi {
            direction_multiplier,
            bursts_per_direction,
        }
    }

    /// Number of projectiles in one radial burst, `None` for other families.
    ///
    /// The multiplier is clamped into `1..=MAX_DIRECTION_MULTIPLIER` so a
    /// descriptor built without going through the parser cannot overflow.
    #[must_use]
    pub fn direction_count(self) -> Option<u32> {
        match self {
            Self::Multi {
                direction_multiplier,
                ..
            } => {
                let steps = direction_multiplier.clamp(1, MAX_DIRECTION_MULTIPLIER) - 1;
                Some(BASE_DIRECTIONS << steps)
            }
            Self::Normal | Self::Aim { .. } => None,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Aim {
                columns,
                bullets_per_column,
            } => write!(f, "aim{columns}_{bullets_per_column}"),
            Self::Multi {
                direction_multiplier,
                bursts_per_direction,
            } => write!(f, "multi{direction_multiplier}_{bursts_per_direction}"),
        }
    }
}

/// Reasons a roster token cannot be turned into a [`PatternKind`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PatternParseError {
    /// The token does not start with a known pattern family.
    #[error("unknown attack pattern `{0}`")]
    UnknownFamily(String),
    /// The parameter suffix is not of the form `{n}_{m}`.
    #[error("malformed parameters in attack pattern `{0}`, expected `<family><n>_<m>`")]
    MalformedParameters(String),
    /// A parameter was zero.
    #[error("attack pattern `{0}` has a zero parameter")]
    ZeroParameter(String),
    /// The `multi` direction multiplier exceeds the supported range.
    #[error(
        "attack pattern `{token}` uses multiplier {multiplier}, maximum is {max}",
        max = MAX_DIRECTION_MULTIPLIER
    )]
    MultiplierTooLarge {
        /// Token that failed to parse.
        token: String,
        /// Multiplier found in the token.
        multiplier: u32,
    },
}

impl FromStr for PatternKind {
    type Err = PatternParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        if token == "normal" {
            return Ok(Self::Normal);
        }

        if let Some(rest) = token.strip_prefix("multi") {
            let (multiplier, bursts) = parse_parameters(token, rest)?;
            if multiplier > MAX_DIRECTION_MULTIPLIER {
                return Err(PatternParseError::MultiplierTooLarge {
                    token: token.to_owned(),
                    multiplier,
                });
            }
            return Ok(Self::multi(multiplier, bursts));
        }

        if let Some(rest) = token.strip_prefix("aim") {
            let (columns, bullets) = parse_parameters(token, rest)?;
            return Ok(Self::aim(columns, bullets));
        }

        Err(PatternParseError::UnknownFamily(token.to_owned()))
    }
}

impl TryFrom<String> for PatternKind {
    type Error = PatternParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PatternKind> for String {
    fn from(pattern: PatternKind) -> Self {
        pattern.to_string()
    }
}

fn parse_parameters(token: &str, rest: &str) -> Result<(u32, u32), PatternParseError> {
    if rest.is_empty() {
        return Ok((1, 1));
    }

    let (first, second) = rest
        .split_once('_')
        .ok_or_else(|| PatternParseError::MalformedParameters(token.to_owned()))?;
    Ok((parse_positive(token, first)?, parse_positive(token, second)?))
}

fn parse_positive(token: &str, digits: &str) -> Result<u32, PatternParseError> {
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(PatternParseError::MalformedParameters(token.to_owned()));
    }

    let value: u32 = digits
        .parse()
        .map_err(|_| PatternParseError::MalformedParameters(token.to_owned()))?;
    if value == 0 {
        return Err(PatternParseError::ZeroParameter(token.to_owned()));
    }
    Ok(value)
}
