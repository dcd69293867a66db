//! WebSocket Session Module
//!
//! `MdApi` over a WebSocket connection to the front.
//! Supports both TLS and non-TLS connections using tokio-tungstenite.
//! The connection runs on its own dispatch thread, so callbacks never overlap.

use crate::api::{
    ApiError, MdApi, MdSpi, RequestHandle, REASON_READ_FAILED, REASON_WRITE_FAILED,
    STATUS_NOT_READY,
};
use crate::endpoint::Endpoint;
use crate::protocol::{self, Incoming, Request};

use futures_util::{SinkExt, StreamExt};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

/// Reported by `MdApi::version`.
pub const API_VERSION: &str = concat!("mdping-ws ", env!("CARGO_PKG_VERSION"));

/// Connection error types
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Market-data session over WebSocket
pub struct WsMdApi {
    front: Option<Endpoint>,
    spi: Option<Box<dyn MdSpi>>,
    requests: RequestHandle,
    queue: Option<mpsc::Receiver<Request>>,
    connect_timeout: Duration,
    stop: Option<oneshot::Sender<()>>,
    dispatch: Option<thread::JoinHandle<()>>,
}

impl WsMdApi {
    pub fn new(request_queue_size: usize, connect_timeout: Duration) -> Self {
        let (requests, queue) = RequestHandle::channel(request_queue_size);
        Self {
            front: None,
            spi: None,
            requests,
            queue: Some(queue),
            connect_timeout,
            stop: None,
            dispatch: None,
        }
    }

    fn is_initialized(&self) -> bool {
        self.dispatch.is_some()
    }
}

impl MdApi for WsMdApi {
    fn version(&self) -> &str {
        API_VERSION
    }

    fn register_front(&mut self, endpoint: Endpoint) {
        log::info!("Front address: {}", endpoint);
        self.front = Some(endpoint);
    }

    fn register_spi(&mut self, spi: Box<dyn MdSpi>) {
        if self.spi.replace(spi).is_some() {
            log::debug!("Replaced previously registered observer");
        }
    }

    fn requests(&self) -> RequestHandle {
        self.requests.clone()
    }

    fn init(&mut self) -> Result<(), ApiError> {
        if self.is_initialized() {
            return Err(ApiError::AlreadyInitialized);
        }
        let front = self.front.clone().ok_or(ApiError::NoFront)?;
        let queue = self.queue.take().ok_or(ApiError::AlreadyInitialized)?;
        let spi = match self.spi.take() {
            Some(spi) => spi,
            None => {
                self.queue = Some(queue);
                return Err(ApiError::NoSpi);
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let session = Session {
            front,
            spi,
            queue,
            connect_timeout: self.connect_timeout,
        };

        let dispatch = thread::Builder::new()
            .name("md-dispatch".into())
            .spawn(move || session.run_blocking(stop_rx))?;

        self.stop = Some(stop_tx);
        self.dispatch = Some(dispatch);
        Ok(())
    }

    fn subscribe_market_data(&self, instrument_ids: &[String]) -> i32 {
        if !self.is_initialized() {
            return STATUS_NOT_READY;
        }
        self.requests.subscribe_market_data(instrument_ids)
    }

    fn unsubscribe_market_data(&self, instrument_ids: &[String]) -> i32 {
        if !self.is_initialized() {
            return STATUS_NOT_READY;
        }
        self.requests.unsubscribe_market_data(instrument_ids)
    }

    fn release(&mut self) {
        // dropping the sender wakes the session task
        self.stop.take();
        if let Some(dispatch) = self.dispatch.take() {
            if dispatch.join().is_err() {
                log::error!("Dispatch thread panicked");
            }
        }
    }
}

impl Drop for WsMdApi {
    fn drop(&mut self) {
        self.release();
    }
}

/// State owned by the dispatch thread
struct Session {
    front: Endpoint,
    spi: Box<dyn MdSpi>,
    queue: mpsc::Receiver<Request>,
    connect_timeout: Duration,
}

impl Session {
    fn run_blocking(mut self, stop: oneshot::Receiver<()>) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("Failed to start session runtime: {}", e);
                self.spi.on_front_disconnected(REASON_READ_FAILED);
                return;
            }
        };
        runtime.block_on(self.run(stop));
    }

    async fn run(self, mut stop: oneshot::Receiver<()>) {
        let Session {
            front,
            mut spi,
            mut queue,
            connect_timeout,
        } = self;

        let url = front.websocket_url();
        log::info!("Connecting to {}", url);

        let connected = tokio::select! {
            _ = &mut stop => return,
            res = connect(&url, front.use_tls(), connect_timeout) => res,
        };
        let ws_stream = match connected {
            Ok(ws) => ws,
            Err(e) => {
                log::error!("Failed to connect to {}: {}", url, e);
                spi.on_front_disconnected(REASON_READ_FAILED);
                return;
            }
        };
        log::info!(
            "WebSocket connection established ({})",
            if front.use_tls() { "TLS" } else { "non-TLS" }
        );

        // Split the bidirectional WebSocket into separate read/write halves
        let (mut write, mut read) = ws_stream.split();

        spi.on_front_connected();

        loop {
            tokio::select! {
                _ = &mut stop => {
                    log::debug!("Session released, closing connection");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        log::debug!("Failed to send close frame: {}", e);
                    }
                    break;
                }
                request = queue.recv() => {
                    let Some(request) = request else {
                        break;
                    };
                    let text = match protocol::encode_request(&request) {
                        Ok(text) => text,
                        Err(e) => {
                            log::error!("Failed to encode request {:?}: {}", request, e);
                            continue;
                        }
                    };
                    log::debug!("Sending: {}", text);
                    if let Err(e) = write.send(Message::Text(text)).await {
                        log::error!("WebSocket write error: {}", e);
                        spi.on_front_disconnected(REASON_WRITE_FAILED);
                        break;
                    }
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        log::debug!("Received: {}", text);
                        dispatch(&mut *spi, &text);
                    }
                    // WebSocket keepalive - respond with Pong
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            log::error!("WebSocket write error: {}", e);
                            spi.on_front_disconnected(REASON_WRITE_FAILED);
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        log::info!("Connection closed: {:?}", frame);
                        spi.on_front_disconnected(REASON_READ_FAILED);
                        break;
                    }
                    // Binary, Pong and raw frames carry nothing for us
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::error!("WebSocket error: {}", e);
                        spi.on_front_disconnected(REASON_READ_FAILED);
                        break;
                    }
                    None => {
                        log::info!("Connection ended");
                        spi.on_front_disconnected(REASON_READ_FAILED);
                        break;
                    }
                }
            }
        }
    }
}

async fn connect(url: &str, use_tls: bool, timeout: Duration) -> Result<WsStream, ClientError> {
    let handshake = async {
        if use_tls {
            let connector = native_tls::TlsConnector::builder()
                .build()
                .map_err(|e| ClientError::Tls(e.to_string()))?;
            let (ws_stream, _) = tokio_tungstenite::connect_async_tls_with_config(
                url,
                None,
                false,
                Some(tokio_tungstenite::Connector::NativeTls(connector)),
            )
            .await?;
            Ok::<WsStream, ClientError>(ws_stream)
        } else {
            let (ws_stream, _) = connect_async(url).await?;
            Ok::<WsStream, ClientError>(ws_stream)
        }
    };

    tokio::time::timeout(timeout, handshake)
        .await
        .map_err(|_| ClientError::Timeout(timeout))?
}

/// Route one text frame to the matching callback
fn dispatch(spi: &mut dyn MdSpi, text: &str) {
    match protocol::parse_message(text) {
        Ok(Incoming::RspUserLogin {
            rsp,
            info,
            request_id,
            is_last,
        }) => spi.on_rsp_user_login(&rsp, &info, request_id, is_last),
        Ok(Incoming::RspSubMarketData {
            instrument_id,
            info,
            request_id,
            is_last,
        }) => spi.on_rsp_sub_market_data(&instrument_id, &info, request_id, is_last),
        Ok(Incoming::RspUnsubMarketData {
            instrument_id,
            info,
            request_id,
            is_last,
        }) => spi.on_rsp_unsub_market_data(&instrument_id, &info, request_id, is_last),
        Ok(Incoming::RtnDepthMarketData(quote)) => spi.on_rtn_depth_market_data(&quote),
        Ok(Incoming::RspError { info, request_id }) => spi.on_rsp_error(&info, request_id),
        Err(e) => log::warn!("Failed to parse message: {} - {}", e, text),
    }
}
