//! Streaming accumulator for per-dungeon salary statistics.

use crate::summary::RaidSummary;
use crate::types::DbId;

/// Final aggregate values for one (guild, dungeon) group.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsTotals {
    pub total_count: i64,
    pub min_salary: i64,
    pub max_salary: i64,
    pub avg_salary: f64,
    pub min_per_person_salary: i64,
    pub max_per_person_salary: i64,
    pub avg_per_person_salary: f64,
    /// Team achieving the lowest total salary.
    pub min_salary_team_id: Option<DbId>,
    /// Team achieving the highest total salary.
    pub max_salary_team_id: Option<DbId>,
}

/// Accumulates qualifying raid summaries into min/max/avg figures.
///
/// A summary where both salary figures are non-positive is not a data
/// point and is skipped. Each figure contributes to its own extremes and
/// sum only when positive. The teams achieving the total-salary extremes
/// are tracked by id; per-person extremes are not attributed.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    count: i64,
    salary_sum: i64,
    min_salary: Option<(i64, DbId)>,
    max_salary: Option<(i64, DbId)>,
    per_person_sum: i64,
    min_per_person: Option<i64>,
    max_per_person: Option<i64>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one closed team's summary into the running totals.
    pub fn observe(&mut self, team_id: DbId, summary: &RaidSummary) {
        if !summary.has_salary_data() {
            return;
        }
        self.count += 1;

        if summary.salary > 0 {
            self.salary_sum += summary.salary;
            if self.min_salary.map_or(true, |(v, _)| summary.salary < v) {
                self.min_salary = Some((summary.salary, team_id));
            }
            if self.max_salary.map_or(true, |(v, _)| summary.salary > v) {
                self.max_salary = Some((summary.salary, team_id));
            }
        }

        if summary.per_person_salary > 0 {
            self.per_person_sum += summary.per_person_salary;
            if self.min_per_person.map_or(true, |v| summary.per_person_salary < v) {
                self.min_per_person = Some(summary.per_person_salary);
            }
            if self.max_per_person.map_or(true, |v| summary.per_person_salary > v) {
                self.max_per_person = Some(summary.per_person_salary);
            }
        }
    }

    /// Close the accumulator.
    ///
    /// `None` when no qualifying record was seen; an aggregate row is
    /// never produced with a zero count. Averages are sum/count over the
    /// qualifying records.
    pub fn finish(self) -> Option<StatsTotals> {
        if self.count == 0 {
            return None;
        }
        let count = self.count as f64;
        Some(StatsTotals {
            total_count: self.count,
            min_salary: self.min_salary.map_or(0, |(v, _)| v),
            max_salary: self.max_salary.map_or(0, |(v, _)| v),
            avg_salary: self.salary_sum as f64 / count,
            min_per_person_salary: self.min_per_person.unwrap_or(0),
            max_per_person_salary: self.max_per_person.unwrap_or(0),
            avg_per_person_salary: self.per_person_sum as f64 / count,
            min_salary_team_id: self.min_salary.map(|(_, id)| id),
            max_salary_team_id: self.max_salary.map(|(_, id)| id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(salary: i64, per_person_salary: i64) -> RaidSummary {
        RaidSummary {
            salary,
            per_person_salary,
            ..Default::default()
        }
    }

    #[test]
    fn aggregates_min_max_avg_and_excludes_empty_summaries() {
        let mut acc = StatsAccumulator::new();
        acc.observe(11, &summary(1000, 200));
        acc.observe(12, &summary(3000, 600));
        acc.observe(13, &summary(0, 0));

        let totals = acc.finish().unwrap();
        assert_eq!(totals.total_count, 2);
        assert_eq!(totals.min_salary, 1000);
        assert_eq!(totals.max_salary, 3000);
        assert_eq!(totals.avg_salary, 2000.0);
        assert_eq!(totals.min_per_person_salary, 200);
        assert_eq!(totals.max_per_person_salary, 600);
        assert_eq!(totals.avg_per_person_salary, 400.0);
        assert_eq!(totals.min_salary_team_id, Some(11));
        assert_eq!(totals.max_salary_team_id, Some(12));
    }

    #[test]
    fn no_qualifying_records_produces_no_totals() {
        let mut acc = StatsAccumulator::new();
        acc.observe(1, &summary(0, 0));
        acc.observe(2, &summary(-100, -10));
        assert_eq!(acc.finish(), None);
    }

    #[test]
    fn per_person_only_record_still_counts() {
        let mut acc = StatsAccumulator::new();
        acc.observe(7, &summary(0, 150));

        let totals = acc.finish().unwrap();
        assert_eq!(totals.total_count, 1);
        // No positive total salary was seen, so its extremes stay zero
        // and point at no team.
        assert_eq!(totals.min_salary, 0);
        assert_eq!(totals.max_salary, 0);
        assert_eq!(totals.min_salary_team_id, None);
        assert_eq!(totals.min_per_person_salary, 150);
        assert_eq!(totals.avg_per_person_salary, 150.0);
    }

    #[test]
    fn ties_keep_the_first_team_seen() {
        let mut acc = StatsAccumulator::new();
        acc.observe(1, &summary(500, 100));
        acc.observe(2, &summary(500, 100));

        let totals = acc.finish().unwrap();
        assert_eq!(totals.min_salary_team_id, Some(1));
        assert_eq!(totals.max_salary_team_id, Some(1));
    }

    #[test]
    fn averages_divide_by_qualifying_count() {
        let mut acc = StatsAccumulator::new();
        // Salary-only record plus a full record: the per-person average
        // still divides by the total qualifying count, not by how many
        // records carried a per-person figure.
        acc.observe(1, &summary(1000, 0));
        acc.observe(2, &summary(2000, 300));

        let totals = acc.finish().unwrap();
        assert_eq!(totals.total_count, 2);
        assert_eq!(totals.avg_salary, 1500.0);
        assert_eq!(totals.avg_per_person_salary, 150.0);
    }
}
