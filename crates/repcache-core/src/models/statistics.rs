use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Window the statistics bundle is aggregated over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum StatsRange {
    #[default]
    Week,
    Month,
    Year,
    #[serde(rename = "all")]
    AllTime,
}

impl StatsRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsRange::Week => "week",
            StatsRange::Month => "month",
            StatsRange::Year => "year",
            StatsRange::AllTime => "all",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            StatsRange::Week => "This week",
            StatsRange::Month => "This month",
            StatsRange::Year => "This year",
            StatsRange::AllTime => "All time",
        }
    }
}

impl fmt::Display for StatsRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" => Ok(StatsRange::Week),
            "month" => Ok(StatsRange::Month),
            "year" => Ok(StatsRange::Year),
            "all" | "alltime" | "all-time" => Ok(StatsRange::AllTime),
            other => Err(format!("unknown statistics range: {}", other)),
        }
    }
}

/// Aggregated statistics for one range, computed server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct StatisticsBundle {
    pub range: StatsRange,
    pub total_workouts: u32,
    pub total_volume_kg: f64,
    pub total_duration_minutes: u32,
    pub current_streak_days: u32,
    #[serde(default)]
    pub personal_records: Vec<PersonalRecord>,
    #[serde(default)]
    pub weekly: Vec<WeeklySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PersonalRecord {
    pub exercise_name: String,
    pub weight_kg: f64,
    pub reps: u32,
    /// ISO date (YYYY-MM-DD) the record was set
    pub achieved_on: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    /// ISO date (YYYY-MM-DD) of the Monday starting the week
    pub week_start: String,
    pub workouts: u32,
    pub volume_kg: f64,
}

impl StatisticsBundle {
    /// Volume rounded for display, switching to tonnes past 10,000 kg.
    pub fn volume_display(&self) -> String {
        format_volume(self.total_volume_kg)
    }

    pub fn duration_display(&self) -> String {
        let hours = self.total_duration_minutes / 60;
        let minutes = self.total_duration_minutes % 60;
        if hours == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}

fn format_volume(kg: f64) -> String {
    if kg >= 10_000.0 {
        format!("{:.1} t", kg / 1000.0)
    } else {
        format!("{:.0} kg", kg)
    }
}
