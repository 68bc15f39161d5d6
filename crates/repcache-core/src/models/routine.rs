use serde::{Deserialize, Serialize};

/// A training routine: an ordered cycle of workout days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub days: Vec<RoutineDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct RoutineDay {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    pub weight_kg: Option<f64>,
}

/// Body of a "complete workout day" request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLog {
    pub duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Envelope for `GET /routines/active`; `routine` is null when none is active.
#[derive(Debug, Deserialize)]
pub struct ActiveRoutineResponse {
    pub routine: Option<Routine>,
}

impl Routine {
    /// First day not yet completed in the current cycle.
    pub fn next_day(&self) -> Option<&RoutineDay> {
        self.days.iter().find(|day| !day.completed)
    }

    pub fn completed_days(&self) -> usize {
        self.days.iter().filter(|day| day.completed).count()
    }

    pub fn progress_display(&self) -> String {
        if self.days.is_empty() {
            return "No days".to_string();
        }
        format!("{}/{} days", self.completed_days(), self.days.len())
    }
}

impl Exercise {
    pub fn prescription(&self) -> String {
        match self.weight_kg {
            Some(kg) => format!("{}x{} @ {}kg", self.sets, self.reps, kg),
            None => format!("{}x{}", self.sets, self.reps),
        }
    }
}
