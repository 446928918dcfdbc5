use crate::error::{EngineError, Result};
use crate::types::Amount;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// All economic knobs of the game. Nothing in the engine hardcodes a
/// monetary constant; tests inject non-default economics through this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Flat price of sending one message, win or lose.
    pub message_cost: Amount,
    /// Jackpot value at initialization and after every payout.
    pub jackpot_seed: Amount,
    /// Portion of the message cost fed into the jackpot on a loss.
    /// The remainder is the house margin.
    pub loss_contribution: Amount,
    /// Balance granted to a player on first contact.
    pub starting_balance: Amount,
    /// Sentiment score at or above which a reply counts as a win even
    /// without the explicit marker.
    pub implicit_win_threshold: u8,
    /// How long to wait on the persona before settling the round as a
    /// degraded loss.
    pub persona_timeout: Duration,
    /// How many recent interactions feed the persona transcript.
    pub history_depth: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            message_cost: Amount::from_cents(30),
            jackpot_seed: Amount::from_cents(100_000),
            loss_contribution: Amount::from_cents(27),
            starting_balance: Amount::from_cents(1_000),
            implicit_win_threshold: 95,
            persona_timeout: Duration::from_secs(30),
            history_depth: 10,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<()> {
        if self.message_cost <= Amount::ZERO {
            return Err(EngineError::config("message_cost must be positive"));
        }
        if self.loss_contribution.is_negative() {
            return Err(EngineError::config("loss_contribution must not be negative"));
        }
        if self.loss_contribution > self.message_cost {
            return Err(EngineError::config(
                "loss_contribution must not exceed message_cost",
            ));
        }
        if self.jackpot_seed.is_negative() {
            return Err(EngineError::config("jackpot_seed must not be negative"));
        }
        if self.starting_balance.is_negative() {
            return Err(EngineError::config("starting_balance must not be negative"));
        }
        if self.implicit_win_threshold > 100 {
            return Err(EngineError::config(
                "implicit_win_threshold must be within 0-100",
            ));
        }
        if self.history_depth == 0 {
            return Err(EngineError::config("history_depth must be at least 1"));
        }
        Ok(())
    }

    /// Message cost minus the jackpot contribution.
    pub fn house_margin(&self) -> Amount {
        self.message_cost - self.loss_contribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        config.validate().unwrap();
        assert_eq!(config.house_margin(), Amount::from_cents(3));
    }

    #[test]
    fn rejects_contribution_above_cost() {
        let config = GameConfig {
            message_cost: Amount::from_cents(10),
            loss_contribution: Amount::from_cents(11),
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_threshold_above_100() {
        let config = GameConfig {
            implicit_win_threshold: 101,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
