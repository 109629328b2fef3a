use chrono::{DateTime, Duration, Utc};

/// Outcome of settling elapsed time into spin credits.
///
/// `last_update` only ever advances by whole multiples of the unlock
/// duration, so partial progress toward the next credit is preserved no
/// matter how rarely settlement runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub credits: i64,
    pub last_update: DateTime<Utc>,
}

/// Convert the time elapsed since `last_update` into whole spin credits.
///
/// Less than one `unlock_ms` elapsed (including a stored boundary that sits
/// ahead of `now`) settles nothing and leaves the boundary untouched, so
/// re-applying with no time passed is a no-op.
pub fn settle(last_update: DateTime<Utc>, unlock_ms: i64, now: DateTime<Utc>) -> Settlement {
    if unlock_ms <= 0 {
        return Settlement {
            credits: 0,
            last_update,
        };
    }

    let elapsed = (now - last_update).num_milliseconds();
    if elapsed < unlock_ms {
        return Settlement {
            credits: 0,
            last_update,
        };
    }

    let credits = elapsed / unlock_ms;
    let remainder = elapsed % unlock_ms;

    Settlement {
        credits,
        last_update: now - Duration::milliseconds(remainder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HOUR_MS: i64 = 3600 * 1000;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn nothing_due_before_one_period() {
        let now = t0() + Duration::milliseconds(2 * HOUR_MS - 1);
        let s = settle(t0(), 2 * HOUR_MS, now);
        assert_eq!(s.credits, 0);
        assert_eq!(s.last_update, t0());
    }

    #[test]
    fn whole_periods_credit_and_remainder_carries() {
        // 5h30m at a 2h unlock: 2 credits, boundary left 1h30m behind now.
        let now = t0() + Duration::minutes(330);
        let s = settle(t0(), 2 * HOUR_MS, now);
        assert_eq!(s.credits, 2);
        assert_eq!(s.last_update, now - Duration::minutes(90));
    }

    #[test]
    fn exact_boundary_leaves_no_remainder() {
        let now = t0() + Duration::milliseconds(6 * HOUR_MS);
        let s = settle(t0(), 2 * HOUR_MS, now);
        assert_eq!(s.credits, 3);
        assert_eq!(s.last_update, now);
    }

    #[test]
    fn zero_elapsed_is_a_noop() {
        let s = settle(t0(), 2 * HOUR_MS, t0());
        assert_eq!(s.credits, 0);
        assert_eq!(s.last_update, t0());

        let again = settle(s.last_update, 2 * HOUR_MS, t0());
        assert_eq!(again, s);
    }

    #[test]
    fn boundary_ahead_of_now_settles_nothing() {
        let s = settle(t0() + Duration::minutes(10), 2 * HOUR_MS, t0());
        assert_eq!(s.credits, 0);
        assert_eq!(s.last_update, t0() + Duration::minutes(10));
    }

    #[test]
    fn split_settlement_conserves_credits() {
        // Settling elapsed time in one go must equal settling it in two
        // arbitrary chunks, for a sweep of split points.
        let unlock = 2 * HOUR_MS;
        let total = Duration::minutes(777);
        let end = t0() + total;

        let once = settle(t0(), unlock, end);

        for split_min in [0, 1, 59, 120, 240, 333, 500, 777] {
            let mid = t0() + Duration::minutes(split_min);
            let first = settle(t0(), unlock, mid);
            let second = settle(first.last_update, unlock, end);

            assert_eq!(
                first.credits + second.credits,
                once.credits,
                "split at {split_min}m lost or gained credits"
            );
            assert_eq!(second.last_update, once.last_update);
        }
    }

    #[test]
    fn non_positive_unlock_settles_nothing() {
        let now = t0() + Duration::hours(10);
        assert_eq!(settle(t0(), 0, now).credits, 0);
        assert_eq!(settle(t0(), -5, now).credits, 0);
    }
}
