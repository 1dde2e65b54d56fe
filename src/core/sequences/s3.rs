use anyhow::Result;
use serde_json::{Map, Value};

use crate::core::backend::Backend;
use crate::core::models::resources::BucketStat;
use crate::core::sequences::{emit, invoke, scoped, DataNeed};
use crate::core::state::{Context, Emission, Patch, Payload};

pub const ROUTE: &str = "/aws/s3/buckets";

pub struct BucketAnalytics;

impl DataNeed for BucketAnalytics {
    type Output = Vec<BucketStat>;

    fn route(&self) -> &'static str {
        ROUTE
    }

    fn body(&self, ctx: &Context) -> Option<Value> {
        Some(scoped(ctx, Map::new()))
    }

    fn decode(&self, data: Value) -> Result<Self::Output> {
        let mut buckets: Vec<BucketStat> = serde_json::from_value(data)?;
        buckets.sort_by(|a, b| b.cost.total_cmp(&a.cost));
        Ok(buckets)
    }
}

pub async fn run<B: Backend>(backend: &B, ctx: Context) -> Emission {
    let result = invoke(backend, &ctx, &BucketAnalytics).await;
    let key = ctx.ticket.key.clone();
    emit(ctx.ticket, result, |buckets| {
        vec![Patch::Data {
            key,
            payload: Payload::Buckets(buckets),
        }]
    })
}
