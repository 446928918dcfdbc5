use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// Monetary amount in whole cents.
///
/// Balances and the jackpot are compared against thresholds and summed
/// over a long-running process, so everything stays in integer cents and
/// only formats as a 2-decimal string at the display edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    pub const fn to_cents(self) -> i64 {
        self.0
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        Amount(iter.map(|a| a.0).sum())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = String;

    /// Parses "12.34", "12.3", "12" or "-0.30" into cents.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(format!("invalid amount: '{}'", s));
        }
        if frac.len() > 2 {
            return Err(format!("amount '{}' has more than 2 decimal places", s));
        }
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| format!("invalid amount: '{}'", s))?
        };
        let frac_cents: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<2}", frac);
            padded.parse().map_err(|_| format!("invalid amount: '{}'", s))?
        };
        Ok(Amount(sign * (whole * 100 + frac_cents)))
    }
}

/// A registered player. Never deleted; insertion order drives the
/// turn/leaderboard listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub key: String,
    pub display_name: String,
    pub balance: Amount,
    pub messages_count: u64,
    pub created_at: DateTime<Utc>,
}

/// The singleton shared game state (conceptually row id = 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolState {
    pub jackpot: Amount,
    pub current_turn_key: Option<String>,
    pub total_rounds: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One append-only row of the interaction history. The stored reply is
/// the display text, control tokens already stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: i64,
    pub player_key: String,
    pub message: String,
    pub reply: String,
    pub is_win: bool,
    pub created_at: DateTime<Utc>,
}

/// The interpreter's verdict for a single reply. Ephemeral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub display_text: String,
    pub sentiment: u8,
    pub is_win: bool,
}

/// What a settled round looks like to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    pub display_text: String,
    pub sentiment: u8,
    pub is_win: bool,
    pub amount_won: Amount,
    pub new_balance: Amount,
    pub new_jackpot: Amount,
    pub speech: Option<crate::speech::SpeechClip>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub player_key: String,
    pub display_name: String,
    pub balance: Amount,
}

/// Read-only snapshot for polling clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStatus {
    pub recent_messages: Vec<InteractionRecord>,
    pub current_turn_key: Option<String>,
    pub current_turn_name: Option<String>,
    pub caller_balance: Option<Amount>,
    pub jackpot: Amount,
    pub players: Vec<Player>,
}

/// Events published for fan-out by whatever transport sits above the
/// engine. The engine only produces these; it never delivers them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    PlayerJoined {
        player_key: String,
        display_name: String,
    },
    RoundSettled {
        player_key: String,
        display_text: String,
        sentiment: u8,
        is_win: bool,
        jackpot: Amount,
    },
    JackpotWon {
        player_key: String,
        display_name: String,
        amount: Amount,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_formats_two_decimals() {
        assert_eq!(Amount::from_cents(30).to_string(), "0.30");
        assert_eq!(Amount::from_cents(134250).to_string(), "1342.50");
        assert_eq!(Amount::from_cents(-27).to_string(), "-0.27");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn amount_parses_decimal_strings() {
        assert_eq!("0.30".parse::<Amount>().unwrap(), Amount::from_cents(30));
        assert_eq!("1000".parse::<Amount>().unwrap(), Amount::from_cents(100_000));
        assert_eq!("12.3".parse::<Amount>().unwrap(), Amount::from_cents(1230));
        assert_eq!("-0.03".parse::<Amount>().unwrap(), Amount::from_cents(-3));
        assert!("12.345".parse::<Amount>().is_err());
        assert!("abc".parse::<Amount>().is_err());
    }

    #[test]
    fn amount_arithmetic_is_exact() {
        // 0.10 + 0.20 == 0.30, which is not a given under binary floats
        let sum = Amount::from_cents(10) + Amount::from_cents(20);
        assert_eq!(sum, Amount::from_cents(30));

        let total: Amount = (0..1000).map(|_| Amount::from_cents(27)).sum();
        assert_eq!(total, Amount::from_cents(27_000));
    }
}
