use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value stored in an [`EntityCache`](super::EntityCache), stamped with the
/// key it was stored under and when it landed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    pub stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
            stored_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.stored_at).num_minutes()
    }

    /// Age as shown next to "last updated" labels.
    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Negative ages come from clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn aged(minutes: i64) -> CacheEntry<u32> {
        let mut entry = CacheEntry::new("k", 1);
        entry.stored_at = Utc::now() - Duration::minutes(minutes);
        entry
    }

    #[test]
    fn test_age_display_just_now() {
        assert_eq!(CacheEntry::new("k", vec![1, 2, 3]).age_display(), "just now");
    }

    #[test]
    fn test_age_display_future_timestamp() {
        let mut entry = CacheEntry::new("k", 1);
        entry.stored_at = Utc::now() + Duration::minutes(10);
        assert_eq!(entry.age_display(), "just now");
    }

    #[test]
    fn test_age_display_minutes_hours_days() {
        assert_eq!(aged(5).age_display(), "5m ago");
        assert_eq!(aged(65).age_display(), "1h ago");
        assert_eq!(aged(95).age_display(), "2h ago");
        assert_eq!(aged(1440 + 60).age_display(), "1d ago");
        assert_eq!(aged(1440 + 13 * 60).age_display(), "2d ago");
    }

    #[test]
    fn test_age_minutes() {
        assert!(CacheEntry::new("k", 1).age_minutes() <= 1);
        assert_eq!(aged(42).age_minutes(), 42);
    }
}
