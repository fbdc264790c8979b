use common::models::MetricRecord;
use serde::Serialize;

/// A metric column of the ranked table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    LastPrice,
    PctChange,
    Breakout,
    VolZ,
    VolBreakout,
    RelativeStrength,
    Score,
}

impl MetricField {
    pub const ALL: [MetricField; 7] = [
        Self::LastPrice,
        Self::PctChange,
        Self::Breakout,
        Self::VolZ,
        Self::VolBreakout,
        Self::RelativeStrength,
        Self::Score,
    ];

    pub fn value(&self, record: &MetricRecord) -> f64 {
        match self {
            Self::LastPrice => record.last_price,
            Self::PctChange => record.pct_change,
            Self::Breakout => record.breakout,
            Self::VolZ => record.vol_z,
            Self::VolBreakout => record.vol_breakout,
            Self::RelativeStrength => record.relative_strength,
            Self::Score => record.score,
        }
    }

    /// Column heading used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LastPrice => "Last Price",
            Self::PctChange => "Change (%)",
            Self::Breakout => "Breakout (%)",
            Self::VolZ => "Volatility Z-Score",
            Self::VolBreakout => "Volatility Breakout",
            Self::RelativeStrength => "Relative Strength",
            Self::Score => "Composite Score",
        }
    }
}

/// Records ordered by composite score, highest first. Ties keep input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RankedTable {
    records: Vec<MetricRecord>,
}

impl RankedTable {
    pub fn from_records(mut records: Vec<MetricRecord>) -> Self {
        // sort_by is stable
        records.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self { records }
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MetricRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricRecord> {
        self.records.iter()
    }

    pub fn filter(&self, filter: &TableFilter) -> RankedTable {
        let records = self
            .records
            .iter()
            .filter(|r| filter.accepts(r))
            .take(filter.top_n.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Self { records }
    }

    /// The `n` records with the highest `field`, stable on ties.
    pub fn top_by(&self, field: MetricField, n: usize) -> Vec<&MetricRecord> {
        let mut ordered: Vec<&MetricRecord> = self.records.iter().collect();
        ordered.sort_by(|a, b| field.value(b).total_cmp(&field.value(a)));
        ordered.truncate(n);
        ordered
    }
}

/// Row selection applied on top of the ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableFilter {
    pub min_score: Option<f64>,
    pub min_breakout: Option<f64>,
    pub top_n: Option<usize>,
}

impl TableFilter {
    fn accepts(&self, record: &MetricRecord) -> bool {
        self.min_score.is_none_or(|min| record.score >= min)
            && self.min_breakout.is_none_or(|min| record.breakout >= min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Symbol;

    fn record(base: &str, score: f64, breakout: f64) -> MetricRecord {
        MetricRecord {
            symbol: Symbol::new(base, "USDT"),
            last_price: 1.0,
            pct_change: 0.0,
            breakout,
            vol_z: 0.0,
            vol_breakout: -score,
            relative_strength: 0.0,
            score,
        }
    }

    fn bases(records: &[MetricRecord]) -> Vec<String> {
        records.iter().map(|r| r.symbol.base().to_string()).collect()
    }

    #[test]
    fn test_sorted_descending_by_score() {
        let table = RankedTable::from_records(vec![
            record("AAA", 3.0, 0.0),
            record("BBB", 7.0, 0.0),
            record("CCC", -2.0, 0.0),
        ]);
        assert_eq!(bases(table.records()), vec!["BBB", "AAA", "CCC"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let table = RankedTable::from_records(vec![
            record("AAA", 1.0, 0.0),
            record("BBB", 5.0, 0.0),
            record("CCC", 1.0, 0.0),
            record("DDD", 1.0, 0.0),
        ]);
        assert_eq!(bases(table.records()), vec!["BBB", "AAA", "CCC", "DDD"]);
    }

    #[test]
    fn test_empty_table() {
        let table = RankedTable::from_records(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_filter_thresholds_and_top_n() {
        let table = RankedTable::from_records(vec![
            record("AAA", 10.0, 5.0),
            record("BBB", 8.0, -1.0),
            record("CCC", 6.0, 2.0),
            record("DDD", 4.0, 3.0),
            record("EEE", 1.0, 9.0),
        ]);

        let filter = TableFilter {
            min_score: Some(5.0),
            min_breakout: Some(0.0),
            top_n: None,
        };
        assert_eq!(bases(table.filter(&filter).records()), vec!["AAA", "CCC"]);

        let top_two = TableFilter {
            top_n: Some(2),
            ..TableFilter::default()
        };
        assert_eq!(bases(table.filter(&top_two).records()), vec!["AAA", "BBB"]);
    }

    #[test]
    fn test_top_by_other_metric() {
        let table = RankedTable::from_records(vec![
            record("AAA", 3.0, 0.0),
            record("BBB", 7.0, 0.0),
            record("CCC", -2.0, 0.0),
        ]);

        let top: Vec<&str> = table
            .top_by(MetricField::VolBreakout, 2)
            .iter()
            .map(|r| r.symbol.base())
            .collect();
        assert_eq!(top, vec!["CCC", "AAA"]);
        assert_eq!(MetricField::Score.label(), "Composite Score");
    }
}
