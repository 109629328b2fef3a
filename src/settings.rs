use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::models::prizes::Prize;

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub listen: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Admin {
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Telegram {
    pub bot_token: String,
    pub webapp_url: String,
}

/// Reward tuning. All of it is configuration data so tests and promotions
/// can swap tables without code changes.
#[derive(Debug, Clone, Deserialize)]
pub struct Rewards {
    pub prizes: Vec<Prize>,
    /// Starting spin balance for a new user.
    pub initial_spin_count: i64,
    /// Time to unlock one spin credit, in milliseconds.
    pub spin_unlock_ms: i64,
    /// How far ahead of the server clock a caller-supplied timestamp may
    /// run before it is rejected.
    pub max_future_skew_ms: i64,
    pub referral_bonus_spins: i64,
    pub referral_bonus_points: i64,
    pub join_channel_points: i64,
    pub follow_social_points: i64,
    pub post_social_points: i64,
    pub daily_check_in_points: i64,
    /// Direct-claim award for the refer-friend slot; the referral bonus
    /// itself is paid on the registration path.
    pub refer_friend_points: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub postgres: Postgres,
    pub server: Server,
    pub admin: Admin,
    pub telegram: Telegram,
    pub rewards: Rewards,
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.rewards.validate()
    }
}

impl Rewards {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prizes.is_empty() {
            return Err(ConfigError::Message("prize table is empty".to_string()));
        }
        for prize in &self.prizes {
            if prize.amount <= 0 || prize.weight <= 0.0 {
                return Err(ConfigError::Message(format!(
                    "prize table entry (amount {}, weight {}) must be positive",
                    prize.amount, prize.weight
                )));
            }
        }
        if self.spin_unlock_ms <= 0 {
            return Err(ConfigError::Message(
                "spin_unlock_ms must be positive".to_string(),
            ));
        }
        if self.max_future_skew_ms < 0 {
            return Err(ConfigError::Message(
                "max_future_skew_ms must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewards() -> Rewards {
        Rewards {
            prizes: vec![Prize {
                amount: 500,
                weight: 65.0,
            }],
            initial_spin_count: 1,
            spin_unlock_ms: 2 * 3600 * 1000,
            max_future_skew_ms: 26 * 3600 * 1000,
            referral_bonus_spins: 3,
            referral_bonus_points: 20000,
            join_channel_points: 10000,
            follow_social_points: 10000,
            post_social_points: 10000,
            daily_check_in_points: 5000,
            refer_friend_points: 0,
        }
    }

    #[test]
    fn valid_rewards_pass() {
        assert!(rewards().validate().is_ok());
    }

    #[test]
    fn empty_prize_table_is_rejected() {
        let mut r = rewards();
        r.prizes.clear();
        assert!(r.validate().is_err());
    }

    #[test]
    fn non_positive_weight_is_rejected() {
        let mut r = rewards();
        r.prizes[0].weight = 0.0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn non_positive_unlock_is_rejected() {
        let mut r = rewards();
        r.spin_unlock_ms = 0;
        assert!(r.validate().is_err());
    }
}
