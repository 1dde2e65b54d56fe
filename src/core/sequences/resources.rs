use anyhow::Result;
use serde_json::{Map, Value};

use crate::core::backend::Backend;
use crate::core::models::resources::InstanceReport;
use crate::core::sequences::{emit, invoke, scoped, DataNeed, Period};
use crate::core::state::{Context, Emission, Patch, Payload};

pub const ROUTE: &str = "/aws/resources/instances";

pub struct ResourceReport {
    pub period: Period,
}

impl DataNeed for ResourceReport {
    type Output = Vec<InstanceReport>;

    fn route(&self) -> &'static str {
        ROUTE
    }

    fn body(&self, ctx: &Context) -> Option<Value> {
        let mut body = Map::new();
        self.period.insert_into(&mut body);
        Some(scoped(ctx, body))
    }

    fn decode(&self, data: Value) -> Result<Self::Output> {
        Ok(serde_json::from_value(data)?)
    }
}

pub async fn run<B: Backend>(backend: &B, ctx: Context, report: ResourceReport) -> Emission {
    let result = invoke(backend, &ctx, &report).await;
    let key = ctx.ticket.key.clone();
    emit(ctx.ticket, result, |instances| {
        vec![Patch::Data {
            key,
            payload: Payload::Instances(instances),
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sequences::testing::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn reports_instances() {
        let backend = MockBackend::new(vec![envelope(
            r#"{ "success": true, "data": [
                { "id": "i-1", "kind": "t3.micro", "region": "eu-west-1", "cpu_average": 3.2, "cost": 8.5 }
            ] }"#,
        )]);
        let report = ResourceReport {
            period: Period {
                begin: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            },
        };
        let emission = run(&backend, ctx("resources"), report).await;
        let Emission::Success { patches, .. } = emission else {
            panic!("expected success");
        };
        assert_eq!(
            patches,
            vec![Patch::Data {
                key: "resources".into(),
                payload: Payload::Instances(vec![InstanceReport {
                    id: "i-1".into(),
                    kind: Some("t3.micro".into()),
                    region: Some("eu-west-1".into()),
                    cpu_average: Some(3.2),
                    cost: 8.5,
                }]),
            }]
        );
        assert_eq!(backend.calls()[0].body.as_ref().unwrap()["begin"], "2024-05-01");
    }
}
