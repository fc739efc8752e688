use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::tick::Tick;

/// Error codes that mean the credential was missing or rejected.
pub const AUTH_ERROR_CODES: &[&str] = &["InvalidToken", "AuthorizationRequired"];

/// Outbound request frames. Serialized as bare single-purpose objects, e.g.
/// `{"ticks":"R_100","subscribe":1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Request {
    Authorize { authorize: String },
    Ticks { ticks: String, subscribe: u8 },
    ForgetAll { forget_all: String },
}

impl Request {
    pub fn authorize(token: &str) -> Self {
        Self::Authorize {
            authorize: token.to_string(),
        }
    }

    pub fn subscribe_ticks(symbol: &str) -> Self {
        Self::Ticks {
            ticks: symbol.to_string(),
            subscribe: 1,
        }
    }

    pub fn forget_all_ticks() -> Self {
        Self::ForgetAll {
            forget_all: "ticks".to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Short form for the event log; never includes the credential.
    pub fn describe(&self) -> String {
        match self {
            Self::Authorize { .. } => "authorize".to_string(),
            Self::Ticks { ticks, .. } => format!("subscribe ticks {}", ticks),
            Self::ForgetAll { forget_all } => format!("forget_all {}", forget_all),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    pub fn is_authorization_failure(&self, msg_type: Option<&str>) -> bool {
        AUTH_ERROR_CODES.contains(&self.code.as_str()) || msg_type == Some("authorize")
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    msg_type: Option<String>,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    authorize: Option<Value>,
    #[serde(default)]
    tick: Option<RawTick>,
}

#[derive(Debug, Deserialize)]
struct RawTick {
    #[serde(default)]
    symbol: Option<String>,
    epoch: u64,
    quote: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Error {
        error: ApiError,
        msg_type: Option<String>,
    },
    Authorized {
        loginid: Option<String>,
    },
    /// `tick` is `None` when the quote could not be turned into a finite price.
    Tick {
        symbol: Option<String>,
        epoch: u64,
        tick: Option<Tick>,
    },
    Other {
        msg_type: Option<String>,
    },
}

/// Classify an inbound frame. First match wins: error, authorize, tick, other.
pub fn parse_inbound(text: &str) -> serde_json::Result<Inbound> {
    let raw: RawResponse = serde_json::from_str(text)?;

    if let Some(error) = raw.error {
        return Ok(Inbound::Error {
            error,
            msg_type: raw.msg_type,
        });
    }
    if let Some(auth) = raw.authorize {
        let loginid = auth
            .get("loginid")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Ok(Inbound::Authorized { loginid });
    }
    if let Some(t) = raw.tick {
        let tick = quote_to_f64(&t.quote).and_then(|price| Tick::new(t.epoch, price));
        return Ok(Inbound::Tick {
            symbol: t.symbol,
            epoch: t.epoch,
            tick,
        });
    }
    Ok(Inbound::Other {
        msg_type: raw.msg_type,
    })
}

/// Quotes arrive either as JSON numbers or decimal strings.
pub fn quote_to_f64(v: &Value) -> Option<f64> {
    let price = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    price.filter(|p| p.is_finite())
}
