use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::backend::Backend;
use crate::core::sequences::{emit, invoke, DataNeed};
use crate::core::state::{Context, Emission, Patch};

pub const ROUTE: &str = "/user/login";

pub struct Credentials {
    pub mail: String,
    pub password: String,
}

#[derive(Deserialize)]
struct LoginData {
    token: String,
}

impl DataNeed for Credentials {
    type Output = String;

    fn route(&self) -> &'static str {
        ROUTE
    }

    fn body(&self, _ctx: &Context) -> Option<Value> {
        Some(json!({ "email": self.mail, "password": self.password }))
    }

    fn decode(&self, data: Value) -> Result<Self::Output> {
        let data: LoginData = serde_json::from_value(data)?;
        if data.token.is_empty() {
            anyhow::bail!("Empty token in login response");
        }
        Ok(data.token)
    }
}

/// Exchange credentials for a token. The success patch carries token and mail,
/// which the caller persists.
pub async fn run<B: Backend>(backend: &B, ctx: Context, credentials: Credentials) -> Emission {
    let result = invoke(backend, &ctx, &credentials).await;
    let mail = credentials.mail;
    emit(ctx.ticket, result, |token| vec![Patch::Login { token, mail }])
}
