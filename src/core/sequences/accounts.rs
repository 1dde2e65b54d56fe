use anyhow::Result;
use serde_json::Value;

use crate::core::backend::{Backend, Method};
use crate::core::models::resources::Account;
use crate::core::sequences::{emit, invoke, DataNeed};
use crate::core::state::{Context, Emission, Patch, Payload};

pub const ROUTE: &str = "/aws/accounts";

pub struct AccountList;

impl DataNeed for AccountList {
    type Output = Vec<Account>;

    fn route(&self) -> &'static str {
        ROUTE
    }

    fn method(&self) -> Method {
        Method::Get
    }

    fn body(&self, _ctx: &Context) -> Option<Value> {
        None
    }

    fn decode(&self, data: Value) -> Result<Self::Output> {
        Ok(serde_json::from_value(data)?)
    }
}

pub async fn run<B: Backend>(backend: &B, ctx: Context) -> Emission {
    let result = invoke(backend, &ctx, &AccountList).await;
    let key = ctx.ticket.key.clone();
    emit(ctx.ticket, result, |accounts| {
        vec![Patch::Data {
            key,
            payload: Payload::Accounts(accounts),
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sequences::testing::*;

    #[tokio::test]
    async fn lists_accounts() {
        let backend = MockBackend::new(vec![envelope(
            r#"{ "success": true, "data": [
                { "id": "111", "name": "prod", "provider": "aws" },
                { "id": "222" }
            ] }"#,
        )]);
        let emission = run(&backend, ctx("accounts")).await;

        let calls = backend.calls();
        assert_eq!(calls[0].route, ROUTE);
        assert_eq!(calls[0].method, Method::Get);
        assert_eq!(calls[0].token.as_deref(), Some("tok"));

        match emission {
            Emission::Success { patches, .. } => match &patches[0] {
                Patch::Data {
                    payload: Payload::Accounts(accounts),
                    ..
                } => {
                    assert_eq!(accounts.len(), 2);
                    assert_eq!(accounts[0].display_name(), "prod");
                    assert_eq!(accounts[1].display_name(), "222");
                }
                other => panic!("unexpected patch: {:?}", other),
            },
            other => panic!("unexpected emission: {:?}", other),
        }
    }

    #[tokio::test]
    async fn domain_error_is_surfaced() {
        let backend = MockBackend::new(vec![envelope(
            r#"{ "success": true, "data": { "error": "No account linked" } }"#,
        )]);
        let emission = run(&backend, ctx("accounts")).await;
        assert!(
            matches!(emission, Emission::Failed { ref message, .. } if message == "No account linked")
        );
    }
}
