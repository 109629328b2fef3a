use chrono::{DateTime, Duration, Utc};

/// Calendar-day equality in the reference time zone (UTC).
pub fn same_utc_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

/// A caller-supplied timestamp may run ahead of the server clock by at most
/// `max_skew_ms`. Past-dated timestamps are accepted as-is.
pub fn exceeds_future_skew(
    caller_time: DateTime<Utc>,
    server_now: DateTime<Utc>,
    max_skew_ms: i64,
) -> bool {
    caller_time > server_now + Duration::milliseconds(max_skew_ms)
}

/// Claim rule for a catalog quest, evaluated over the user's prior claim
/// timestamps: a daily quest admits one claim per UTC calendar day, a
/// one-time quest one claim ever.
pub fn can_claim_catalog(daily: bool, prior_claims: &[DateTime<Utc>], at: DateTime<Utc>) -> bool {
    if daily {
        !prior_claims.iter().any(|claim| same_utc_day(*claim, at))
    } else {
        prior_claims.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn day_comparison_ignores_time_of_day() {
        assert!(same_utc_day(at(0, 0), at(23, 59)));
        assert!(!same_utc_day(at(23, 59), at(23, 59) + Duration::minutes(1)));
    }

    #[test]
    fn skew_bound_is_exclusive() {
        let now = at(12, 0);
        let skew = 26 * 3600 * 1000;

        assert!(!exceeds_future_skew(
            now + Duration::milliseconds(skew - 1),
            now,
            skew
        ));
        assert!(!exceeds_future_skew(
            now + Duration::milliseconds(skew),
            now,
            skew
        ));
        assert!(exceeds_future_skew(
            now + Duration::milliseconds(skew + 1),
            now,
            skew
        ));
    }

    #[test]
    fn past_times_are_never_rejected() {
        let now = at(12, 0);
        assert!(!exceeds_future_skew(now - Duration::days(400), now, 1000));
    }

    #[test]
    fn daily_catalog_admits_one_claim_per_day() {
        let today = at(9, 0);
        assert!(can_claim_catalog(true, &[], today));
        assert!(!can_claim_catalog(true, &[at(8, 0)], today));
        // yesterday's claim does not block today
        assert!(can_claim_catalog(true, &[today - Duration::days(1)], today));
    }

    #[test]
    fn one_time_catalog_admits_one_claim_ever() {
        let today = at(9, 0);
        assert!(can_claim_catalog(false, &[], today));
        assert!(!can_claim_catalog(
            false,
            &[today - Duration::days(30)],
            today
        ));
    }
}
