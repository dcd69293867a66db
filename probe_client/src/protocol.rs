//! Protocol Module
//!
//! JSON message construction and parsing for the market-data front.
//! Every frame is a JSON object tagged by its `type` field.

use serde::{Deserialize, Serialize};

// ============================================================================
// Outgoing Message Types
// ============================================================================

/// Login request sent once the front is connected
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReqUserLogin {
    pub broker_id: String,
    pub user_id: String,
    pub password: String,
}

/// Requests the session task writes to the front
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    ReqUserLogin {
        #[serde(flatten)]
        login: ReqUserLogin,
        request_id: i32,
    },
    SubscribeMarketData {
        instrument_ids: Vec<String>,
    },
    UnsubscribeMarketData {
        instrument_ids: Vec<String>,
    },
}

// ============================================================================
// Incoming Message Types
// ============================================================================

/// Login response body
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RspUserLogin {
    pub trading_day: String,
    pub login_time: String,
    pub broker_id: String,
    pub user_id: String,
    pub front_id: i32,
    pub session_id: i32,
}

/// Error information attached to responses. `error_id == 0` means success.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RspInfo {
    pub error_id: i32,
    pub error_msg: String,
}

impl RspInfo {
    pub fn is_error(&self) -> bool {
        self.error_id != 0
    }
}

/// A single market-data update
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Quote {
    pub instrument_id: String,
    pub last_price: f64,
    pub volume: i64,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub bid_price1: Option<f64>,
    #[serde(default)]
    pub ask_price1: Option<f64>,
}

impl Quote {
    pub fn new(instrument_id: impl Into<String>, last_price: f64, volume: i64) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            last_price,
            volume,
            update_time: None,
            bid_price1: None,
            ask_price1: None,
        }
    }
}

/// Messages received from the front
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Incoming {
    RspUserLogin {
        #[serde(flatten)]
        rsp: RspUserLogin,
        #[serde(flatten)]
        info: RspInfo,
        #[serde(default)]
        request_id: i32,
        #[serde(default = "default_is_last")]
        is_last: bool,
    },
    RspSubMarketData {
        instrument_id: String,
        #[serde(flatten)]
        info: RspInfo,
        #[serde(default)]
        request_id: i32,
        #[serde(default = "default_is_last")]
        is_last: bool,
    },
    RspUnsubMarketData {
        instrument_id: String,
        #[serde(flatten)]
        info: RspInfo,
        #[serde(default)]
        request_id: i32,
        #[serde(default = "default_is_last")]
        is_last: bool,
    },
    RtnDepthMarketData(Quote),
    RspError {
        #[serde(flatten)]
        info: RspInfo,
        #[serde(default)]
        request_id: i32,
    },
}

fn default_is_last() -> bool {
    true
}

// ============================================================================
// Protocol Functions
// ============================================================================

/// Serialize a request into a text frame
pub fn encode_request(request: &Request) -> Result<String, serde_json::Error> {
    serde_json::to_string(request)
}

/// Parse an incoming JSON message
pub fn parse_message(json: &str) -> Result<Incoming, serde_json::Error> {
    serde_json::from_str(json)
}
