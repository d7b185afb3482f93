//! Time-of-day TTL policy for the shared tier.
//!
//! Data goes stale quickly while the exchange is trading and barely changes
//! outside the session, so shared entries live longer off-hours. There is no
//! holiday calendar: a weekday holiday is treated as a trading day.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use market_core::error::MarketError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shared-tier TTL while the market is open.
pub const DEFAULT_ACTIVE_TTL_SECS: u64 = 300;

/// Shared-tier TTL outside trading hours.
pub const DEFAULT_INACTIVE_TTL_SECS: u64 = 3600;

/// Market-hours calendar and the TTLs it selects between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketHoursConfig {
    /// IANA time zone of the exchange
    pub timezone: String,
    /// Session open, `HH:MM` local time
    pub open: String,
    /// Session close, `HH:MM` local time (exclusive)
    pub close: String,
    pub trading_days: Vec<Weekday>,
    pub active_ttl_secs: u64,
    pub inactive_ttl_secs: u64,
}

impl Default for MarketHoursConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            open: "09:30".to_string(),
            close: "16:00".to_string(),
            trading_days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            active_ttl_secs: DEFAULT_ACTIVE_TTL_SECS,
            inactive_ttl_secs: DEFAULT_INACTIVE_TTL_SECS,
        }
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, MarketError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| MarketError::Config(format!("invalid market {field} time '{value}': {e}")))
}

/// TTL as a pure function of wall-clock time.
#[derive(Debug, Clone)]
pub struct MarketHoursTtl {
    tz: Tz,
    open: NaiveTime,
    close: NaiveTime,
    trading_days: Vec<Weekday>,
    active_ttl: Duration,
    inactive_ttl: Duration,
}

impl MarketHoursTtl {
    /// Build the policy, rejecting unknown zones and inverted sessions.
    pub fn from_config(config: &MarketHoursConfig) -> Result<Self, MarketError> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|e| MarketError::Config(format!("unknown time zone '{}': {e}", config.timezone)))?;
        let open = parse_time("open", &config.open)?;
        let close = parse_time("close", &config.close)?;
        if open >= close {
            return Err(MarketError::Config(format!(
                "market open {} must be before close {}",
                config.open, config.close
            )));
        }

        Ok(Self {
            tz,
            open,
            close,
            trading_days: config.trading_days.clone(),
            active_ttl: Duration::from_secs(config.active_ttl_secs),
            inactive_ttl: Duration::from_secs(config.inactive_ttl_secs),
        })
    }

    /// Whether `now` falls inside a trading session.
    pub fn is_market_active(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.tz);
        if !self.trading_days.contains(&local.weekday()) {
            return false;
        }
        let time = local.time();
        time >= self.open && time < self.close
    }

    /// Shared-tier TTL for an entry written at `now`.
    pub fn l2_ttl(&self, now: DateTime<Utc>) -> Duration {
        if self.is_market_active(now) {
            self.active_ttl
        } else {
            self.inactive_ttl
        }
    }
}

impl Default for MarketHoursTtl {
    fn default() -> Self {
        Self {
            tz: chrono_tz::America::New_York,
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
            trading_days: MarketHoursConfig::default().trading_days,
            active_ttl: Duration::from_secs(DEFAULT_ACTIVE_TTL_SECS),
            inactive_ttl: Duration::from_secs(DEFAULT_INACTIVE_TTL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_active_during_session() {
        let policy = MarketHoursTtl::default();
        // Wednesday 2024-03-13, 10:00 EDT
        assert_eq!(policy.l2_ttl(utc(2024, 3, 13, 14, 0)), Duration::from_secs(300));
    }

    #[test]
    fn test_session_boundaries() {
        let policy = MarketHoursTtl::default();
        // 09:30 EST opens, 16:00 EST is closed (January, UTC-5)
        assert!(policy.is_market_active(utc(2024, 1, 10, 14, 30)));
        assert!(!policy.is_market_active(utc(2024, 1, 10, 14, 29)));
        assert!(policy.is_market_active(utc(2024, 1, 10, 20, 59)));
        assert!(!policy.is_market_active(utc(2024, 1, 10, 21, 0)));
    }

    #[test]
    fn test_weekend_inactive() {
        let policy = MarketHoursTtl::default();
        // Saturday 2024-03-16, 11:00 EDT
        assert_eq!(policy.l2_ttl(utc(2024, 3, 16, 15, 0)), Duration::from_secs(3600));
    }

    #[test]
    fn test_from_config_matches_default() {
        let policy = MarketHoursTtl::from_config(&MarketHoursConfig::default()).unwrap();
        let now = utc(2024, 7, 2, 15, 0);
        assert_eq!(policy.l2_ttl(now), MarketHoursTtl::default().l2_ttl(now));
    }

    #[test]
    fn test_rejects_bad_config() {
        let bad_zone = MarketHoursConfig {
            timezone: "Mars/Olympus".into(),
            ..Default::default()
        };
        assert!(MarketHoursTtl::from_config(&bad_zone).is_err());

        let inverted = MarketHoursConfig {
            open: "16:00".into(),
            close: "09:30".into(),
            ..Default::default()
        };
        assert!(MarketHoursTtl::from_config(&inverted).is_err());
    }
}
