use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    // r#type: String, // Not used
    #[serde(default)]
    pub broker_id: String,
    #[serde(default)]
    pub user_id: String,
    // password is never checked
    #[serde(default)]
    pub request_id: i32,
}

/// Body of both SUBSCRIBE_MARKET_DATA and UNSUBSCRIBE_MARKET_DATA
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    // r#type: String,
    pub instrument_ids: Vec<String>,
}
