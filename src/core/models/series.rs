use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named, bucket-ordered sequence of (bucket, amount) pairs for bar charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub key: String,
    pub values: Vec<(String, f64)>,
}

impl Series {
    pub fn total(&self) -> f64 {
        self.values.iter().map(|(_, v)| v).sum()
    }
}

/// One category's total, for pie charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub key: String,
    pub value: f64,
}

/// One point of an entity's period-over-period history, as sent by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationEntry {
    pub date: String,
    pub cost: f64,
    #[serde(rename = "variation", alias = "percentVariation", default)]
    pub percent_variation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHistory {
    pub id: String,
    pub entries: Vec<VariationEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariationCell {
    pub cost: f64,
    pub variation: f64,
}

/// Serializes as `{ "key": ..., "<date>": { "cost": ..., "variation": ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentiatorRow {
    pub key: String,
    #[serde(flatten)]
    pub cells: BTreeMap<String, VariationCell>,
}

impl DifferentiatorRow {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn cell(&self, date: &str) -> Option<&VariationCell> {
        self.cells.get(date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentiatorTable {
    /// Distinct dates in first-seen order.
    pub dates: Vec<String>,
    pub rows: Vec<DifferentiatorRow>,
    pub total: DifferentiatorRow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_total_sums_values() {
        let s = Series {
            key: "A".into(),
            values: vec![("d1".into(), 1.5), ("d2".into(), 2.5)],
        };
        assert!((s.total() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn row_serializes_dates_inline() {
        let mut row = DifferentiatorRow::new("Total");
        row.cells.insert(
            "2024-01".into(),
            VariationCell {
                cost: 12.0,
                variation: 0.0,
            },
        );
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["key"], "Total");
        assert_eq!(json["2024-01"]["cost"], 12.0);
    }

    #[test]
    fn variation_entry_accepts_both_field_names() {
        let a: VariationEntry =
            serde_json::from_str(r#"{ "date": "d1", "cost": 1.0, "variation": 5.0 }"#).unwrap();
        let b: VariationEntry =
            serde_json::from_str(r#"{ "date": "d1", "cost": 1.0, "percentVariation": 5.0 }"#)
                .unwrap();
        assert_eq!(a, b);
        let c: VariationEntry = serde_json::from_str(r#"{ "date": "d1", "cost": 1.0 }"#).unwrap();
        assert_eq!(c.percent_variation, 0.0);
    }
}
