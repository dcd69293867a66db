use actix::prelude::*;
use actix_web_actors::ws;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::message_types::*;
use crate::quotes::QuoteWalk;
use crate::FrontSettings;

/// Error id sent when a subscription arrives before login and the front requires one.
const ERROR_NOT_LOGGED_IN: i32 = 3;
/// Error id for requests the front does not understand.
const ERROR_BAD_REQUEST: i32 = 90;
const ERROR_NOT_SUBSCRIBED: i32 = 4;

/// What the actor has to do with an incoming text frame
#[derive(Debug)]
enum Command {
    /// Answer after the configured login delay
    Login(LoginRequest),
    Reply(Vec<Value>),
    Ignore,
}

pub struct FrontSession {
    settings: FrontSettings,
    session_id: i32,
    logged_in: bool,
    /// Subscribed instruments in subscription order
    instruments: Vec<String>,
    walks: HashMap<String, QuoteWalk>,
    ticker: Option<SpawnHandle>,
}

impl Actor for FrontSession {
    type Context = ws::WebsocketContext<Self>;
}

impl FrontSession {
    pub fn new(settings: FrontSettings) -> Self {
        Self {
            settings,
            session_id: rand::random::<u16>() as i32,
            logged_in: false,
            instruments: Vec::new(),
            walks: HashMap::new(),
            ticker: None,
        }
    }

    fn route(&mut self, text: &str) -> Command {
        let Ok(payload) = serde_json::from_str::<Value>(text) else {
            error!("Payload is invalid JSON: {}", text);
            return Command::Ignore;
        };
        let Some(payload_type) = payload["type"].as_str() else {
            error!("Payload does not have a 'type' field: {}", payload);
            return Command::Ignore;
        };

        match payload_type {
            "REQ_USER_LOGIN" => match serde_json::from_value::<LoginRequest>(payload.clone()) {
                Ok(request) => Command::Login(request),
                Err(e) => Command::Reply(vec![error_response(&e.to_string(), &payload)]),
            },
            "SUBSCRIBE_MARKET_DATA" => {
                match serde_json::from_value::<SubscribeRequest>(payload.clone()) {
                    Ok(request) => {
                        Command::Reply(self.subscribe(request.instrument_ids, &mut rand::thread_rng()))
                    }
                    Err(e) => Command::Reply(vec![error_response(&e.to_string(), &payload)]),
                }
            }
            "UNSUBSCRIBE_MARKET_DATA" => {
                match serde_json::from_value::<SubscribeRequest>(payload.clone()) {
                    Ok(request) => Command::Reply(self.unsubscribe(request.instrument_ids)),
                    Err(e) => Command::Reply(vec![error_response(&e.to_string(), &payload)]),
                }
            }
            _ => {
                error!("Ignoring unknown message type: {}", payload);
                Command::Reply(vec![error_response("unknown request type", &payload)])
            }
        }
    }

    /// Login answer stamped with `now`. The session counts as logged in from here on.
    fn login_response(&mut self, request: &LoginRequest, now: DateTime<Utc>) -> Value {
        self.logged_in = true;
        let trading_day = match &self.settings.trading_day {
            Some(day) => day.clone(),
            None => now.format("%Y%m%d").to_string(),
        };
        json!({
            "type": "RSP_USER_LOGIN",
            "trading_day": trading_day,
            "login_time": now.format("%H:%M:%S").to_string(),
            "broker_id": request.broker_id,
            "user_id": request.user_id,
            "front_id": 1,
            "session_id": self.session_id,
            "error_id": 0,
            "error_msg": "",
            "request_id": request.request_id,
            "is_last": true,
        })
    }

    fn subscribe<R: Rng>(&mut self, instrument_ids: Vec<String>, rng: &mut R) -> Vec<Value> {
        let count = instrument_ids.len();
        let mut responses = Vec::with_capacity(count);
        for (i, instrument_id) in instrument_ids.into_iter().enumerate() {
            let is_last = i + 1 == count;
            if self.settings.require_login_for_subscribe && !self.logged_in {
                warn!("Rejecting subscription to {} before login", instrument_id);
                responses.push(instrument_response(
                    "RSP_SUB_MARKET_DATA",
                    &instrument_id,
                    (ERROR_NOT_LOGGED_IN, "not logged in"),
                    is_last,
                ));
                continue;
            }

            if !self.walks.contains_key(&instrument_id) {
                self.walks.insert(instrument_id.clone(), QuoteWalk::new(rng));
                self.instruments.push(instrument_id.clone());
            }
            debug!("Subscribed {}", instrument_id);
            responses.push(instrument_response(
                "RSP_SUB_MARKET_DATA",
                &instrument_id,
                (0, ""),
                is_last,
            ));
        }
        responses
    }

    fn unsubscribe(&mut self, instrument_ids: Vec<String>) -> Vec<Value> {
        let count = instrument_ids.len();
        let mut responses = Vec::with_capacity(count);
        for (i, instrument_id) in instrument_ids.into_iter().enumerate() {
            let error = if self.walks.remove(&instrument_id).is_some() {
                self.instruments.retain(|id| id != &instrument_id);
                debug!("Unsubscribed {}", instrument_id);
                (0, "")
            } else {
                (ERROR_NOT_SUBSCRIBED, "not subscribed")
            };
            responses.push(instrument_response(
                "RSP_UNSUB_MARKET_DATA",
                &instrument_id,
                error,
                i + 1 == count,
            ));
        }
        responses
    }

    /// One quote per subscribed instrument
    fn quotes<R: Rng>(&mut self, rng: &mut R, now: DateTime<Utc>) -> Vec<Value> {
        let update_time = now.format("%H:%M:%S").to_string();
        let mut quotes = Vec::with_capacity(self.instruments.len());
        for instrument_id in &self.instruments {
            let Some(walk) = self.walks.get_mut(instrument_id) else {
                continue;
            };
            let tick = walk.step(rng);
            quotes.push(json!({
                "type": "RTN_DEPTH_MARKET_DATA",
                "instrument_id": instrument_id,
                "last_price": tick.last_price,
                "volume": tick.volume,
                "update_time": update_time,
                "bid_price1": tick.bid_price1,
                "ask_price1": tick.ask_price1,
            }));
        }
        quotes
    }

    /// Stream while anything is subscribed, stop once nothing is
    fn sync_ticker(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        match (self.ticker, self.instruments.is_empty()) {
            (None, false) => {
                let interval = Duration::from_millis(self.settings.tick_interval_ms.max(1));
                self.ticker = Some(ctx.run_interval(interval, |act, ctx| {
                    for quote in act.quotes(&mut rand::thread_rng(), Utc::now()) {
                        ctx.text(quote.to_string());
                    }
                }));
            }
            (Some(handle), true) => {
                ctx.cancel_future(handle);
                self.ticker = None;
            }
            _ => {}
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for FrontSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                debug!("Received message: {}", text);
                match self.route(&text) {
                    Command::Login(request) => {
                        info!(
                            "Login from broker {:?} user {:?}, session {}",
                            request.broker_id, request.user_id, self.session_id
                        );
                        let delay = Duration::from_millis(self.settings.login_delay_ms);
                        ctx.run_later(delay, move |act, ctx| {
                            let response = act.login_response(&request, Utc::now());
                            ctx.text(response.to_string());
                        });
                    }
                    Command::Reply(responses) => {
                        for response in responses {
                            ctx.text(response.to_string());
                        }
                        self.sync_ticker(ctx);
                    }
                    Command::Ignore => {}
                }
            }
            Ok(ws::Message::Ping(data)) => ctx.pong(&data),
            Ok(ws::Message::Close(reason)) => {
                info!("Closing connection for session {}", self.session_id);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {}
        }
    }
}

fn instrument_response(
    kind: &str,
    instrument_id: &str,
    (error_id, error_msg): (i32, &str),
    is_last: bool,
) -> Value {
    json!({
        "type": kind,
        "instrument_id": instrument_id,
        "error_id": error_id,
        "error_msg": error_msg,
        "is_last": is_last,
    })
}

fn error_response(reason: &str, payload: &Value) -> Value {
    warn!("Rejecting request {}: {}", payload, reason);
    json!({
        "type": "RSP_ERROR",
        "error_id": ERROR_BAD_REQUEST,
        "error_msg": reason,
        "request_id": payload["request_id"].as_i64().unwrap_or(0),
    })
}
