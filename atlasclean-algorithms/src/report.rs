//! Run reports

use crate::statistics::RegionStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Island counters for one label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IslandCounts {
    pub islands_found: usize,
    pub islands_cleaned: usize,
}

/// Per-label island counts of a cleanup run, ordered by label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    labels: BTreeMap<i16, IslandCounts>,
    total: IslandCounts,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `label` has a row, even if nothing is ever found for it
    pub fn touch(&mut self, label: i16) {
        self.labels.entry(label).or_default();
    }

    pub fn record_found(&mut self, label: i16, count: usize) {
        self.labels.entry(label).or_default().islands_found += count;
        self.total.islands_found += count;
    }

    pub fn record_cleaned(&mut self, label: i16) {
        self.labels.entry(label).or_default().islands_cleaned += 1;
        self.total.islands_cleaned += 1;
    }

    pub fn get(&self, label: i16) -> Option<&IslandCounts> {
        self.labels.get(&label)
    }

    pub fn islands_found(&self, label: i16) -> usize {
        self.get(label).map_or(0, |c| c.islands_found)
    }

    pub fn islands_cleaned(&self, label: i16) -> usize {
        self.get(label).map_or(0, |c| c.islands_cleaned)
    }

    pub fn total(&self) -> IslandCounts {
        self.total
    }

    /// Rows in ascending label order
    pub fn iter(&self) -> impl Iterator<Item = (i16, &IslandCounts)> {
        self.labels.iter().map(|(&label, counts)| (label, counts))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "label,islands_cleaned,islands_found")?;
        for (label, counts) in self.iter() {
            writeln!(f, "{},{},{}", label, counts.islands_cleaned, counts.islands_found)?;
        }
        write!(
            f,
            "Total,{},{}",
            self.total.islands_cleaned, self.total.islands_found
        )
    }
}

/// Per-label intensity statistics, printable as a table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelStatisticsTable {
    pub rows: BTreeMap<i16, RegionStats>,
}

impl fmt::Display for LabelStatisticsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label,count,mean,std_dev,min,max")?;
        for (label, s) in &self.rows {
            write!(
                f,
                "\n{},{},{:.4},{:.4},{:.4},{:.4}",
                label, s.count, s.mean, s.std_dev, s.min, s.max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_total() {
        let mut stats = RunStatistics::new();
        stats.record_found(3, 4);
        stats.record_cleaned(3);
        stats.record_cleaned(3);
        stats.record_found(1, 1);
        stats.touch(7);

        assert_eq!(stats.islands_found(3), 4);
        assert_eq!(stats.islands_cleaned(3), 2);
        assert_eq!(stats.islands_found(7), 0);
        assert!(stats.get(8).is_none());
        assert_eq!(
            stats.total(),
            IslandCounts {
                islands_found: 5,
                islands_cleaned: 2
            }
        );
        assert_eq!(stats.iter().map(|(l, _)| l).collect::<Vec<_>>(), vec![1, 3, 7]);
    }

    #[test]
    fn test_table_format() {
        let mut stats = RunStatistics::new();
        stats.record_found(99, 1);
        stats.record_cleaned(99);
        stats.record_found(1, 1);

        let table = stats.to_string();
        assert_eq!(
            table,
            "label,islands_cleaned,islands_found\n1,0,1\n99,1,1\nTotal,1,2"
        );
    }

    #[test]
    fn test_json_report() {
        let mut stats = RunStatistics::new();
        stats.record_found(2, 3);
        let json = stats.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["labels"]["2"]["islands_found"], 3);
        assert_eq!(value["total"]["islands_cleaned"], 0);
    }
}
