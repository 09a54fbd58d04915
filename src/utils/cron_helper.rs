//! Cron utility functions for calculating next scheduled times

use chrono::{DateTime, TimeZone, Utc};
use cron::Schedule;

/// Next occurrence of `schedule` strictly after `after`, evaluated in `tz`
pub fn next_run_after<Tz: TimeZone>(
    schedule: &Schedule,
    tz: &Tz,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    schedule
        .after(&after.with_timezone(tz))
        .next()
        .map(|next| next.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use std::str::FromStr;

    #[test]
    fn test_daily_schedule_in_timezone() {
        let schedule = Schedule::from_str("0 0 4 * * *").unwrap();
        let tz = chrono_tz::Asia::Shanghai;
        // 2026-10-17 12:00 UTC is 20:00 in Shanghai; next 04:00 Shanghai is 20:00 UTC
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();

        let next = next_run_after(&schedule, &tz, now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 10, 17, 20, 0, 0).unwrap());
        assert_eq!(next.with_timezone(&tz).hour(), 4);
    }

    #[test]
    fn test_next_run_is_strictly_after() {
        let schedule = Schedule::from_str("0 0 4 * * *").unwrap();
        let at_run = Utc.with_ymd_and_hms(2026, 10, 17, 4, 0, 0).unwrap();
        let next = next_run_after(&schedule, &Utc, at_run).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 10, 18, 4, 0, 0).unwrap());
    }
}
