use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::core::backend::Backend;
use crate::core::models::cost_tree::CostTree;
use crate::core::sequences::{emit, invoke, scoped, DataNeed, Period};
use crate::core::state::{Context, Emission, Patch, Payload};

pub const ROUTE: &str = "/aws/tags/costs";

/// Costs grouped by the values of one tag key. The response is a cost tree
/// whose only dimension is the tag key, with per-value totals.
pub struct TagCosts {
    pub period: Period,
    pub key: String,
}

impl DataNeed for TagCosts {
    type Output = CostTree;

    fn route(&self) -> &'static str {
        ROUTE
    }

    fn body(&self, ctx: &Context) -> Option<Value> {
        let mut body = Map::new();
        self.period.insert_into(&mut body);
        body.insert("key".into(), json!(self.key));
        Some(scoped(ctx, body))
    }

    fn decode(&self, data: Value) -> Result<Self::Output> {
        Ok(serde_json::from_value(data)?)
    }
}

pub async fn run<B: Backend>(backend: &B, ctx: Context, tags: TagCosts) -> Emission {
    let result = invoke(backend, &ctx, &tags).await;
    let key = ctx.ticket.key.clone();
    emit(ctx.ticket, result, |tree| {
        vec![Patch::Data {
            key,
            payload: Payload::Costs(tree),
        }]
    })
}
