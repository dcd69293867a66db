//! Market-data session boundary.
//!
//! `MdApi` is the session object the probe drives; `MdSpi` is the observer the
//! session calls back into. Callbacks are delivered one at a time from a single
//! dispatch thread. Requests travel through a `RequestHandle`, which only queues
//! them; the session task writes them once the front is connected.

use crate::endpoint::Endpoint;
use crate::protocol::{Quote, ReqUserLogin, Request, RspInfo, RspUserLogin};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Disconnect reason: network read failed or the front closed the connection.
pub const REASON_READ_FAILED: i32 = 0x1001;
/// Disconnect reason: network write failed.
pub const REASON_WRITE_FAILED: i32 = 0x1002;

/// Request accepted and queued.
pub const STATUS_OK: i32 = 0;
/// Session not initialized, or already gone.
pub const STATUS_NOT_READY: i32 = -1;
/// Too many requests waiting to be written.
pub const STATUS_QUEUE_FULL: i32 = -2;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no front address registered")]
    NoFront,

    #[error("no observer registered")]
    NoSpi,

    #[error("session already initialized")]
    AlreadyInitialized,

    #[error("failed to start dispatch thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Observer for session notifications. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait MdSpi: Send {
    fn on_front_connected(&mut self) {}

    fn on_front_disconnected(&mut self, reason: i32) {}

    fn on_rsp_user_login(
        &mut self,
        rsp: &RspUserLogin,
        info: &RspInfo,
        request_id: i32,
        is_last: bool,
    ) {
    }

    fn on_rtn_depth_market_data(&mut self, quote: &Quote) {}

    fn on_rsp_sub_market_data(
        &mut self,
        instrument_id: &str,
        info: &RspInfo,
        request_id: i32,
        is_last: bool,
    ) {
    }

    fn on_rsp_unsub_market_data(
        &mut self,
        instrument_id: &str,
        info: &RspInfo,
        request_id: i32,
        is_last: bool,
    ) {
    }

    fn on_rsp_error(&mut self, info: &RspInfo, request_id: i32) {}
}

/// Cloneable request side of a session.
///
/// Submission never blocks, so it is safe to call from inside a callback.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    tx: Option<mpsc::Sender<Request>>,
}

impl RequestHandle {
    /// Create a handle and the queue the session task drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Request>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A handle with no session behind it. Every request returns `STATUS_NOT_READY`.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn req_user_login(&self, login: &ReqUserLogin, request_id: i32) -> i32 {
        self.submit(Request::ReqUserLogin {
            login: login.clone(),
            request_id,
        })
    }

    pub fn subscribe_market_data(&self, instrument_ids: &[String]) -> i32 {
        self.submit(Request::SubscribeMarketData {
            instrument_ids: instrument_ids.to_vec(),
        })
    }

    pub fn unsubscribe_market_data(&self, instrument_ids: &[String]) -> i32 {
        self.submit(Request::UnsubscribeMarketData {
            instrument_ids: instrument_ids.to_vec(),
        })
    }

    fn submit(&self, request: Request) -> i32 {
        let Some(tx) = &self.tx else {
            return STATUS_NOT_READY;
        };
        match tx.try_send(request) {
            Ok(()) => STATUS_OK,
            Err(TrySendError::Full(_)) => STATUS_QUEUE_FULL,
            Err(TrySendError::Closed(_)) => STATUS_NOT_READY,
        }
    }
}

/// A market-data session.
pub trait MdApi {
    /// Version string of the session implementation.
    fn version(&self) -> &str;

    fn register_front(&mut self, endpoint: Endpoint);

    fn register_spi(&mut self, spi: Box<dyn MdSpi>);

    /// Handle for issuing requests from callbacks.
    fn requests(&self) -> RequestHandle;

    /// Start connecting. Returns once the dispatch thread is running.
    fn init(&mut self) -> Result<(), ApiError>;

    fn subscribe_market_data(&self, instrument_ids: &[String]) -> i32 {
        self.requests().subscribe_market_data(instrument_ids)
    }

    fn unsubscribe_market_data(&self, instrument_ids: &[String]) -> i32 {
        self.requests().unsubscribe_market_data(instrument_ids)
    }

    /// Tear the session down. Callbacks stop once this returns.
    fn release(&mut self) {}
}
