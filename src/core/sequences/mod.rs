//! Fetch orchestration: acquire context, call the backend once, classify the
//! outcome and produce exactly one [`Emission`].

pub mod accounts;
pub mod costs;
pub mod differentiator;
pub mod login;
pub mod resources;
pub mod s3;
pub mod tags;

use anyhow::Result;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::core::backend::{Backend, Envelope, Method};
use crate::core::state::{Context, Emission, Patch, Ticket};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Session expired")]
    SessionExpired,
    #[error("{0}")]
    Domain(String),
    #[error("Error with request")]
    Transport,
}

/// What a backend call came back with, before any decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Value),
    DomainError(String),
    TransportError,
    SessionExpired,
}

pub fn classify(result: Result<Envelope>) -> FetchOutcome {
    let envelope = match result {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "backend call failed");
            return FetchOutcome::TransportError;
        }
    };

    match envelope.success {
        None => {
            tracing::warn!("backend reply has no success flag");
            FetchOutcome::TransportError
        }
        Some(None) => FetchOutcome::SessionExpired,
        Some(Some(false)) => {
            if let Some(error) = &envelope.error {
                tracing::warn!(%error, "backend reported failure");
            }
            FetchOutcome::TransportError
        }
        Some(Some(true)) => {
            let data = envelope.data.unwrap_or(Value::Null);
            match data.get("error") {
                Some(Value::Null) | None => FetchOutcome::Success(data),
                Some(Value::String(message)) => FetchOutcome::DomainError(message.clone()),
                Some(other) => FetchOutcome::DomainError(other.to_string()),
            }
        }
    }
}

/// One UI data need: which route to call and how to decode its payload.
pub trait DataNeed {
    type Output;

    fn route(&self) -> &'static str;

    fn method(&self) -> Method {
        Method::Post
    }

    fn body(&self, ctx: &Context) -> Option<Value>;

    fn decode(&self, data: Value) -> Result<Self::Output>;
}

/// Run the invoke and classify steps for `need`.
pub async fn invoke<B, N>(backend: &B, ctx: &Context, need: &N) -> Result<N::Output, FetchError>
where
    B: Backend,
    N: DataNeed + Sync,
{
    tracing::debug!(route = need.route(), key = %ctx.ticket.key, "invoking");
    let result = backend
        .call(need.route(), need.method(), need.body(ctx), ctx.token.as_deref())
        .await;

    match classify(result) {
        FetchOutcome::Success(data) => need.decode(data).map_err(|e| {
            tracing::warn!(route = need.route(), error = %format!("{:#}", e), "unrecognized payload");
            FetchError::Transport
        }),
        FetchOutcome::DomainError(message) => Err(FetchError::Domain(message)),
        FetchOutcome::TransportError => Err(FetchError::Transport),
        FetchOutcome::SessionExpired => Err(FetchError::SessionExpired),
    }
}

/// Turn a classified result into the invocation's terminal emission.
pub fn emit<T, F>(ticket: Ticket, result: Result<T, FetchError>, patches: F) -> Emission
where
    F: FnOnce(T) -> Vec<Patch>,
{
    match result {
        Ok(output) => Emission::Success {
            ticket,
            patches: patches(output),
        },
        Err(FetchError::SessionExpired) => Emission::Logout,
        Err(e) => Emission::Failed {
            ticket,
            message: e.to_string(),
        },
    }
}

/// Inclusive date range shared by most requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Period {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    fn insert_into(&self, body: &mut Map<String, Value>) {
        body.insert("begin".into(), json!(self.begin.format("%Y-%m-%d").to_string()));
        body.insert("end".into(), json!(self.end.format("%Y-%m-%d").to_string()));
    }
}

/// Add the selected account scope to a request body, when there is one.
fn scoped(ctx: &Context, mut body: Map<String, Value>) -> Value {
    if !ctx.account_scope.is_empty() {
        body.insert("accounts".into(), json!(ctx.account_scope));
    }
    Value::Object(body)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    struct Echo;

    impl DataNeed for Echo {
        type Output = Vec<u32>;

        fn route(&self) -> &'static str {
            "/echo"
        }

        fn body(&self, ctx: &Context) -> Option<Value> {
            Some(scoped(ctx, Map::new()))
        }

        fn decode(&self, data: Value) -> Result<Self::Output> {
            Ok(serde_json::from_value(data)?)
        }
    }

    async fn run(response: Result<Envelope>) -> Emission {
        let backend = MockBackend::new(vec![response]);
        let ctx = ctx("echo");
        let result = invoke(&backend, &ctx, &Echo).await;
        assert_eq!(backend.calls().len(), 1);
        emit(ctx.ticket, result, |v| {
            vec![Patch::Login {
                token: format!("{:?}", v),
                mail: String::new(),
            }]
        })
    }

    #[test]
    fn classify_outcomes() {
        assert_eq!(
            classify(envelope(r#"{ "success": true, "data": [1] }"#)),
            FetchOutcome::Success(json!([1]))
        );
        assert_eq!(
            classify(envelope(r#"{ "success": true, "data": { "error": "X" } }"#)),
            FetchOutcome::DomainError("X".into())
        );
        assert_eq!(
            classify(envelope(r#"{ "success": true, "data": { "error": null, "a": 1 } }"#)),
            FetchOutcome::Success(json!({ "error": null, "a": 1 }))
        );
        assert_eq!(
            classify(envelope(r#"{ "success": false, "error": "boom" }"#)),
            FetchOutcome::TransportError
        );
        assert_eq!(
            classify(envelope(r#"{ "success": null }"#)),
            FetchOutcome::SessionExpired
        );
        assert_eq!(
            classify(envelope(r#"{ "data": { "product": {} } }"#)),
            FetchOutcome::TransportError
        );
        assert_eq!(
            classify(Err(anyhow::anyhow!("connection refused"))),
            FetchOutcome::TransportError
        );
    }

    #[tokio::test]
    async fn success_emits_patches() {
        let emission = run(envelope(r#"{ "success": true, "data": [1, 2] }"#)).await;
        match emission {
            Emission::Success { ticket, patches } => {
                assert_eq!(ticket.key, "echo");
                assert_eq!(patches.len(), 1);
            }
            other => panic!("unexpected emission: {:?}", other),
        }
    }

    #[tokio::test]
    async fn domain_error_carries_message() {
        let emission = run(envelope(r#"{ "success": true, "data": { "error": "X" } }"#)).await;
        assert!(matches!(emission, Emission::Failed { ref message, .. } if message == "X"));
    }

    #[tokio::test]
    async fn failure_uses_generic_message() {
        let emission = run(envelope(r#"{ "success": false }"#)).await;
        assert!(
            matches!(emission, Emission::Failed { ref message, .. } if message == "Error with request")
        );
    }

    #[tokio::test]
    async fn transport_error_uses_generic_message() {
        let emission = run(Err(anyhow::anyhow!("timeout"))).await;
        assert!(
            matches!(emission, Emission::Failed { ref message, .. } if message == "Error with request")
        );
    }

    #[tokio::test]
    async fn undecodable_payload_is_transport_error() {
        let emission = run(envelope(r#"{ "success": true, "data": { "unexpected": true } }"#)).await;
        assert!(
            matches!(emission, Emission::Failed { ref message, .. } if message == "Error with request")
        );
    }

    #[tokio::test]
    async fn missing_success_flag_does_not_log_out() {
        let emission = run(envelope(r#"{ "data": [1] }"#)).await;
        assert!(
            matches!(emission, Emission::Failed { ref message, .. } if message == "Error with request")
        );
    }

    #[tokio::test]
    async fn session_expired_logs_out() {
        let emission = run(envelope(r#"{ "success": null }"#)).await;
        assert_eq!(emission, Emission::Logout);
    }

    #[test]
    fn scoped_adds_accounts_only_when_selected() {
        let mut ctx = ctx("x");
        assert_eq!(scoped(&ctx, Map::new()), json!({}));
        ctx.account_scope = vec!["111".into()];
        assert_eq!(scoped(&ctx, Map::new()), json!({ "accounts": ["111"] }));
    }

    #[test]
    fn period_formats_dates() {
        let period = Period {
            begin: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        };
        let mut body = Map::new();
        period.insert_into(&mut body);
        assert_eq!(Value::Object(body), json!({ "begin": "2024-01-01", "end": "2024-01-31" }));
    }
}
