// Cooldown window records and derived status

use serde::{Deserialize, Serialize};

use super::Direction;

/// Written only after a successful actuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownWindow {
    pub service_name: String,
    pub direction: Direction,
    /// Epoch seconds.
    pub last_action_time: i64,
    pub cooldown_period_seconds: u64,
}

impl CooldownWindow {
    pub fn remaining(&self, now: i64) -> u64 {
        let elapsed = now.saturating_sub(self.last_action_time);
        let remaining = (self.cooldown_period_seconds as i64).saturating_sub(elapsed);
        remaining.max(0) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownStatus {
    pub in_cooldown: bool,
    pub remaining_seconds: u64,
    pub last_action_time: Option<i64>,
    pub cooldown_period_seconds: Option<u64>,
}

impl CooldownStatus {
    pub fn idle() -> Self {
        Self {
            in_cooldown: false,
            remaining_seconds: 0,
            last_action_time: None,
            cooldown_period_seconds: None,
        }
    }

    pub fn from_window(window: &CooldownWindow, now: i64) -> Self {
        let remaining = window.remaining(now);
        Self {
            in_cooldown: remaining > 0,
            remaining_seconds: remaining,
            last_action_time: Some(window.last_action_time),
            cooldown_period_seconds: Some(window.cooldown_period_seconds),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownStarted {
    pub start_time: i64,
    pub end_time: i64,
    pub cooldown_period_seconds: u64,
}
