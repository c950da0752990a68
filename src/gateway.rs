//! USSD gateway protocol: inbound webhook fields and response framing

use serde::{Deserialize, Serialize};

/// Prefix telling the gateway to keep the session open
pub const CONTINUE_MARKER: &str = "CON";
/// Prefix telling the gateway to close the session
pub const TERMINATE_MARKER: &str = "END";

/// Shown for any unrecoverable failure; never includes internal detail
pub const APOLOGY: &str = "Samahani, kumekuwa na hitilafu. Tafadhali jaribu tena.";

/// Webhook delivery as posted by the gateway
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    pub session_id: String,
    #[serde(default)]
    pub service_code: String,
    pub phone_number: String,
    /// Cumulative input, `*`-separated
    #[serde(default)]
    pub text: String,
}

/// Screen text plus the continue/terminate directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub terminal: bool,
}

impl Reply {
    pub fn proceed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminal: false,
        }
    }

    pub fn end(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminal: true,
        }
    }

    pub fn apology() -> Self {
        Self::end(APOLOGY)
    }

    /// Body in the gateway's wire format
    pub fn framed(&self) -> String {
        let marker = if self.terminal {
            TERMINATE_MARKER
        } else {
            CONTINUE_MARKER
        };
        format!("{marker} {}", self.text)
    }
}
