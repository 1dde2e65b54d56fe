use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

impl Account {
    /// Friendly name when the backend knows one, else the raw id.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }
}

/// S3 analytics for a single bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStat {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub objects: u64,
    #[serde(default)]
    pub cost: f64,
}

/// Utilization report line for one compute instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceReport {
    pub id: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub cpu_average: Option<f64>,
    #[serde(default)]
    pub cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_display_name_falls_back_to_id() {
        let named = Account {
            id: "123".into(),
            name: Some("prod".into()),
            provider: None,
        };
        assert_eq!(named.display_name(), "prod");

        let empty: Account = serde_json::from_str(r#"{ "id": "456", "name": "" }"#).unwrap();
        assert_eq!(empty.display_name(), "456");
    }

    #[test]
    fn deserialize_bucket_partial() {
        let b: BucketStat = serde_json::from_str(r#"{ "name": "logs" }"#).unwrap();
        assert_eq!(b.size_bytes, 0);
        assert!(b.region.is_none());
    }
}
