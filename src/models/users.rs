use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{accrual, questlog};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    pub username: String,
    pub chat_id: String,
    pub referred_by: Option<String>,
    pub points: i64,
    pub redemption_token: Option<String>,
    pub spin: SpinState,
    pub quests: QuestSlots,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Leaderboard entry.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserSnapshot {
    pub username: String,
    pub points: i64,
}

impl From<&User> for UserSnapshot {
    fn from(user: &User) -> Self {
        UserSnapshot {
            username: user.username.clone(),
            points: user.points,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct SpinState {
    pub count: i64,
    pub unlock_ms: i64,
    pub last_update: DateTime<Utc>,
}

impl SpinState {
    /// Lazily settle accrued credits up to `now`. Returns whether the state
    /// changed and needs persisting.
    pub fn settle(&mut self, now: DateTime<Utc>) -> bool {
        let settled = accrual::settle(self.last_update, self.unlock_ms, now);
        if settled.credits == 0 {
            return false;
        }

        self.count += settled.credits;
        self.last_update = settled.last_update;
        true
    }

    /// Spend one spin. Returns false, leaving the count untouched, when
    /// nothing is available.
    pub fn consume(&mut self) -> bool {
        if self.count <= 0 {
            return false;
        }
        self.count -= 1;
        true
    }
}

/// The five fixed quest slots every user carries.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct QuestSlots {
    pub join_channel: QuestSlot,
    pub follow_social: QuestSlot,
    pub post_social: QuestSlot,
    pub daily_check_in: QuestSlot,
    pub refer_friend: QuestSlot,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct QuestSlot {
    pub completed: bool,
    pub completed_day: DateTime<Utc>,
}

/// Identifies one fixed slot. Daily-ness is a property of the slot type,
/// not of the stored record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotKind {
    JoinChannel,
    FollowSocial,
    PostSocial,
    DailyCheckIn,
    ReferFriend,
}

impl SlotKind {
    pub const ALL: [SlotKind; 5] = [
        SlotKind::JoinChannel,
        SlotKind::FollowSocial,
        SlotKind::PostSocial,
        SlotKind::DailyCheckIn,
        SlotKind::ReferFriend,
    ];

    pub fn is_daily(self) -> bool {
        matches!(self, SlotKind::PostSocial | SlotKind::DailyCheckIn)
    }

    pub fn parse(raw: &str) -> Option<SlotKind> {
        match raw {
            "join-channel" => Some(SlotKind::JoinChannel),
            "follow-social" => Some(SlotKind::FollowSocial),
            "post-social" => Some(SlotKind::PostSocial),
            "daily-check-in" => Some(SlotKind::DailyCheckIn),
            "refer-friend" => Some(SlotKind::ReferFriend),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotClaim {
    Claimed,
    AlreadyClaimed,
}

impl QuestSlots {
    pub fn slot(&self, kind: SlotKind) -> &QuestSlot {
        match kind {
            SlotKind::JoinChannel => &self.join_channel,
            SlotKind::FollowSocial => &self.follow_social,
            SlotKind::PostSocial => &self.post_social,
            SlotKind::DailyCheckIn => &self.daily_check_in,
            SlotKind::ReferFriend => &self.refer_friend,
        }
    }

    pub fn slot_mut(&mut self, kind: SlotKind) -> &mut QuestSlot {
        match kind {
            SlotKind::JoinChannel => &mut self.join_channel,
            SlotKind::FollowSocial => &mut self.follow_social,
            SlotKind::PostSocial => &mut self.post_social,
            SlotKind::DailyCheckIn => &mut self.daily_check_in,
            SlotKind::ReferFriend => &mut self.refer_friend,
        }
    }

    /// Reset transition of the state machine: daily slots completed on a
    /// different calendar day than `caller_time` fall back to unclaimed.
    /// Runs before every status read and claim; a reset must be persisted.
    pub fn reset_expired(&mut self, caller_time: DateTime<Utc>) -> bool {
        let mut changed = false;
        for kind in SlotKind::ALL {
            if !kind.is_daily() {
                continue;
            }
            let slot = self.slot_mut(kind);
            if slot.completed && !questlog::same_utc_day(slot.completed_day, caller_time) {
                slot.completed = false;
                changed = true;
            }
        }
        changed
    }

    /// Claim transition, evaluated after [`QuestSlots::reset_expired`].
    /// One-time slots stay completed forever; daily slots stay completed
    /// for the rest of the caller's calendar day.
    pub fn claim(&mut self, kind: SlotKind, caller_time: DateTime<Utc>) -> SlotClaim {
        let slot = self.slot_mut(kind);
        if slot.completed {
            return SlotClaim::AlreadyClaimed;
        }

        slot.completed = true;
        slot.completed_day = caller_time;
        SlotClaim::Claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
    }

    fn fresh_slots(at: DateTime<Utc>) -> QuestSlots {
        let slot = QuestSlot {
            completed: false,
            completed_day: at,
        };
        QuestSlots {
            join_channel: slot,
            follow_social: slot,
            post_social: slot,
            daily_check_in: slot,
            refer_friend: slot,
        }
    }

    #[test]
    fn spin_settle_credits_and_carries() {
        let mut spin = SpinState {
            count: 1,
            unlock_ms: 2 * 3600 * 1000,
            last_update: day(1, 0),
        };

        // 5h later: 2 credits, 1h of progress kept
        assert!(spin.settle(day(1, 5)));
        assert_eq!(spin.count, 3);
        assert_eq!(spin.last_update, day(1, 4));

        // settling again immediately changes nothing
        assert!(!spin.settle(day(1, 5)));
        assert_eq!(spin.count, 3);
    }

    #[test]
    fn consume_never_goes_negative() {
        let mut spin = SpinState {
            count: 1,
            unlock_ms: 2 * 3600 * 1000,
            last_update: day(1, 0),
        };

        assert!(spin.consume());
        assert_eq!(spin.count, 0);
        assert!(!spin.consume());
        assert_eq!(spin.count, 0);
    }

    #[test]
    fn daily_slot_resets_on_next_day_check() {
        let mut quests = fresh_slots(day(1, 0));

        assert_eq!(
            quests.claim(SlotKind::PostSocial, day(1, 9)),
            SlotClaim::Claimed
        );

        // same day: reset leaves it completed, second claim rejected
        assert!(!quests.reset_expired(day(1, 23)));
        assert_eq!(
            quests.claim(SlotKind::PostSocial, day(1, 23)),
            SlotClaim::AlreadyClaimed
        );

        // next day: the status check itself flips it back to unclaimed
        assert!(quests.reset_expired(day(2, 0)));
        assert!(!quests.post_social.completed);
        assert_eq!(
            quests.claim(SlotKind::PostSocial, day(2, 0)),
            SlotClaim::Claimed
        );
    }

    #[test]
    fn one_time_slot_never_resets() {
        let mut quests = fresh_slots(day(1, 0));
        assert_eq!(
            quests.claim(SlotKind::JoinChannel, day(1, 9)),
            SlotClaim::Claimed
        );

        assert!(!quests.reset_expired(day(1, 9) + Duration::days(300)));
        assert_eq!(
            quests.claim(SlotKind::JoinChannel, day(1, 9) + Duration::days(300)),
            SlotClaim::AlreadyClaimed
        );
    }

    #[test]
    fn reset_only_touches_daily_slots() {
        let mut quests = fresh_slots(day(1, 0));
        quests.claim(SlotKind::JoinChannel, day(1, 1));
        quests.claim(SlotKind::DailyCheckIn, day(1, 1));

        assert!(quests.reset_expired(day(2, 1)));
        assert!(quests.join_channel.completed);
        assert!(!quests.daily_check_in.completed);
    }

    #[test]
    fn slot_kind_parses_route_names() {
        assert_eq!(SlotKind::parse("join-channel"), Some(SlotKind::JoinChannel));
        assert_eq!(SlotKind::parse("post-social"), Some(SlotKind::PostSocial));
        assert_eq!(SlotKind::parse("bogus"), None);
        assert!(SlotKind::PostSocial.is_daily());
        assert!(!SlotKind::ReferFriend.is_daily());
    }
}
