use anyhow::{Context as _, Result};
use serde_json::{json, Map, Value};

use crate::core::backend::Backend;
use crate::core::formatter::Granularity;
use crate::core::models::series::{EntityHistory, VariationEntry};
use crate::core::sequences::{emit, invoke, scoped, DataNeed, Period};
use crate::core::state::{Context, Emission, Interval, Patch, Payload};
use crate::core::transform::to_differentiator_table;

pub const ROUTE: &str = "/aws/costs/variations";

#[derive(Debug, Clone, PartialEq)]
pub struct VariationQuery {
    pub period: Period,
    pub granularity: Granularity,
    /// Dimension whose categories become the table's rows.
    pub by: String,
}

impl DataNeed for VariationQuery {
    type Output = Vec<EntityHistory>;

    fn route(&self) -> &'static str {
        ROUTE
    }

    fn body(&self, ctx: &Context) -> Option<Value> {
        let mut body = Map::new();
        self.period.insert_into(&mut body);
        body.insert("granularity".into(), json!(self.granularity.key()));
        body.insert("by".into(), json!(self.by));
        Some(scoped(ctx, body))
    }

    /// `{ "<entity>": [ { date, cost, variation }, ... ], ... }`, in response order.
    fn decode(&self, data: Value) -> Result<Self::Output> {
        let Value::Object(entities) = data else {
            anyhow::bail!("expected an object of entity histories");
        };
        entities
            .into_iter()
            .map(|(id, entries)| -> Result<EntityHistory> {
                let entries: Vec<VariationEntry> = serde_json::from_value(entries)
                    .with_context(|| format!("Invalid history for '{}'", id))?;
                Ok(EntityHistory { id, entries })
            })
            .collect()
    }
}

pub async fn run<B: Backend>(backend: &B, ctx: Context, query: VariationQuery) -> Emission {
    let result = invoke(backend, &ctx, &query).await;
    let key = ctx.ticket.key.clone();
    let interval = Interval {
        begin: query.period.begin,
        end: query.period.end,
        granularity: query.granularity,
    };
    emit(ctx.ticket, result, |histories| {
        vec![
            Patch::Data {
                key: key.clone(),
                payload: Payload::Differentiator(to_differentiator_table(&histories)),
            },
            Patch::Interval { key, interval },
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sequences::testing::*;
    use chrono::NaiveDate;

    fn query() -> VariationQuery {
        VariationQuery {
            period: Period {
                begin: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            },
            granularity: Granularity::Month,
            by: "product".into(),
        }
    }

    #[test]
    fn decode_preserves_entity_order() {
        let data: Value = serde_json::from_str(
            r#"{
                "zeta": [ { "date": "2024-01", "cost": 1 } ],
                "alpha": [ { "date": "2024-01", "cost": 2 } ]
            }"#,
        )
        .unwrap();
        let histories = query().decode(data).unwrap();
        let ids: Vec<&str> = histories.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
    }

    #[test]
    fn decode_rejects_non_object() {
        assert!(query().decode(json!([1, 2])).is_err());
        assert!(query().decode(json!({ "x": 3 })).is_err());
    }

    #[tokio::test]
    async fn builds_table_from_response() {
        let backend = MockBackend::new(vec![envelope(
            r#"{ "success": true, "data": {
                "EC2": [
                    { "date": "2024-01", "cost": 100, "variation": 12 },
                    { "date": "2024-02", "cost": 150, "variation": 50 }
                ],
                "S3": [
                    { "date": "2024-02", "cost": 0.001, "variation": 0 },
                    { "date": "2024-03", "cost": 0.002, "variation": 100 }
                ]
            } }"#,
        )]);
        let emission = run(&backend, ctx("diff"), query()).await;
        assert_eq!(backend.calls()[0].body.as_ref().unwrap()["by"], "product");

        let Emission::Success { patches, .. } = emission else {
            panic!("expected success");
        };
        let Patch::Data {
            payload: Payload::Differentiator(table),
            ..
        } = &patches[0]
        else {
            panic!("expected a table");
        };
        assert_eq!(table.dates, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(table.rows[0].cell("2024-01").unwrap().variation, 0.0);
        assert_eq!(table.rows[0].cell("2024-02").unwrap().variation, 50.0);
        assert_eq!(table.rows[1].cell("2024-03").unwrap().variation, 0.0);
        assert!((table.total.cell("2024-02").unwrap().cost - 150.001).abs() < 1e-9);
    }
}
