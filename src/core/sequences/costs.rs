use anyhow::Result;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::core::backend::Backend;
use crate::core::formatter::Granularity;
use crate::core::models::cost_tree::CostTree;
use crate::core::sequences::accounts::AccountList;
use crate::core::sequences::{emit, invoke, scoped, DataNeed, FetchError, Period};
use crate::core::state::{Context, Emission, Interval, Patch, Payload};

pub const ROUTE: &str = "/aws/costs";

/// Dimension whose category keys are account ids.
const ACCOUNT_DIMENSION: &str = "account";

#[derive(Debug, Clone, PartialEq)]
pub struct CostQuery {
    pub period: Period,
    pub granularity: Granularity,
    /// Grouping dimensions to request ("product", "region", ...).
    pub dimensions: Vec<String>,
}

impl DataNeed for CostQuery {
    type Output = CostTree;

    fn route(&self) -> &'static str {
        ROUTE
    }

    fn body(&self, ctx: &Context) -> Option<Value> {
        let mut body = Map::new();
        self.period.insert_into(&mut body);
        body.insert("granularity".into(), json!(self.granularity.key()));
        body.insert("filters".into(), json!(self.dimensions));
        Some(scoped(ctx, body))
    }

    fn decode(&self, data: Value) -> Result<Self::Output> {
        Ok(serde_json::from_value(data)?)
    }
}

/// Fetch a cost breakdown. When it is grouped by account, account ids are
/// replaced by their friendly names from a second lookup; if that lookup fails
/// the ids are kept.
pub async fn run<B: Backend>(backend: &B, ctx: Context, query: CostQuery) -> Emission {
    let result = match invoke(backend, &ctx, &query).await {
        Ok(mut tree) => {
            if tree.dimension(ACCOUNT_DIMENSION).is_some() {
                match invoke(backend, &ctx, &AccountList).await {
                    Ok(accounts) => {
                        let names: HashMap<String, String> = accounts
                            .iter()
                            .map(|a| (a.id.clone(), a.display_name().to_string()))
                            .collect();
                        tree.rekey_dimension(ACCOUNT_DIMENSION, |id| names.get(id).cloned());
                        Ok(tree)
                    }
                    Err(FetchError::SessionExpired) => Err(FetchError::SessionExpired),
                    Err(e) => {
                        tracing::warn!(error = %e, "account name lookup failed, keeping ids");
                        Ok(tree)
                    }
                }
            } else {
                Ok(tree)
            }
        }
        Err(e) => Err(e),
    };

    let key = ctx.ticket.key.clone();
    let interval = Interval {
        begin: query.period.begin,
        end: query.period.end,
        granularity: query.granularity,
    };
    emit(ctx.ticket, result, |tree| {
        vec![
            Patch::Data {
                key: key.clone(),
                payload: Payload::Costs(tree),
            },
            Patch::Interval { key, interval },
        ]
    })
}
