//! Post-raid summary payload embedded in a closed team's `summary` column.

use serde::{Deserialize, Serialize};

/// Summary written by the client when a team is closed.
///
/// Stored as JSONB with camelCase keys. Unknown keys are ignored and
/// missing keys fall back to their zero values, since the payload evolves
/// independently of the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaidSummary {
    /// Total gold pot for the run.
    pub salary: i64,
    /// Per-participant share of the pot.
    pub per_person_salary: i64,
    /// Noteworthy drops, by name.
    pub special_drops: Vec<String>,
    /// Free-form blacklist note.
    pub blacklist: String,
}

impl RaidSummary {
    /// Parse a summary from the raw JSONB column value.
    pub fn parse(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// True when at least one salary figure is a usable data point.
    pub fn has_salary_data(&self) -> bool {
        self.salary > 0 || self.per_person_salary > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_payload() {
        let value = json!({
            "salary": 3000,
            "perPersonSalary": 600,
            "specialDrops": ["Mystic Orb"],
            "blacklist": "latecomer"
        });
        let summary = RaidSummary::parse(&value).unwrap();
        assert_eq!(summary.salary, 3000);
        assert_eq!(summary.per_person_salary, 600);
        assert_eq!(summary.special_drops, vec!["Mystic Orb".to_string()]);
        assert_eq!(summary.blacklist, "latecomer");
    }

    #[test]
    fn missing_keys_default_to_zero_values() {
        let summary = RaidSummary::parse(&json!({ "salary": 1000 })).unwrap();
        assert_eq!(summary.salary, 1000);
        assert_eq!(summary.per_person_salary, 0);
        assert!(summary.special_drops.is_empty());
    }

    #[test]
    fn non_object_payload_is_an_error() {
        assert!(RaidSummary::parse(&json!("not an object")).is_err());
    }

    #[test]
    fn salary_data_requires_a_positive_figure() {
        assert!(!RaidSummary::default().has_salary_data());
        let negative = RaidSummary {
            salary: -5,
            per_person_salary: 0,
            ..Default::default()
        };
        assert!(!negative.has_salary_data());
        let per_person_only = RaidSummary {
            per_person_salary: 200,
            ..Default::default()
        };
        assert!(per_person_only.has_salary_data());
    }
}
