use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Validates a configured timezone name against the OS/IANA TZ database
/// (via `chrono-tz`'s compiled-in copy). Falls back to UTC with a warning,
/// per spec §4.A.
pub fn resolve_timezone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            log::warn!("invalid timezone '{name}', falling back to UTC");
            Tz::UTC
        }
    }
}

/// Age in whole days between `since` and now.
pub fn age_in_days(since: DateTime<Utc>) -> i64 {
    (Utc::now() - since).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_timezone_valid() {
        assert_eq!(resolve_timezone("America/New_York"), Tz::America__New_York);
    }

    #[test]
    fn test_resolve_timezone_invalid_falls_back_to_utc() {
        assert_eq!(resolve_timezone("Not/AZone"), Tz::UTC);
    }

    #[test]
    fn test_age_in_days() {
        let ten_days_ago = Utc::now() - chrono::Duration::days(10);
        assert_eq!(age_in_days(ten_days_ago), 10);
    }
}
