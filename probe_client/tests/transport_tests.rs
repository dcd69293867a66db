//! WebSocket session tests against an in-process front.

use futures_util::{SinkExt, StreamExt};
use md_ping::api::{MdApi, MdSpi, REASON_READ_FAILED, STATUS_OK};
use md_ping::probe::LOGIN_REQUEST_ID;
use md_ping::protocol::{Quote, RspInfo, RspUserLogin};
use md_ping::{Endpoint, WsMdApi};

use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, PartialEq)]
enum Event {
    Connected,
    Disconnected(i32),
    Login(i32, String),
    Quote(String, f64, i64),
}

/// Forwards every callback to the test thread and logs in on connect.
struct Recorder {
    events: mpsc::Sender<Event>,
    requests: md_ping::RequestHandle,
}

impl MdSpi for Recorder {
    fn on_front_connected(&mut self) {
        let _ = self.events.send(Event::Connected);
        self.requests
            .req_user_login(&Default::default(), LOGIN_REQUEST_ID);
    }

    fn on_front_disconnected(&mut self, reason: i32) {
        let _ = self.events.send(Event::Disconnected(reason));
    }

    fn on_rsp_user_login(&mut self, rsp: &RspUserLogin, info: &RspInfo, _: i32, _: bool) {
        let _ = self
            .events
            .send(Event::Login(info.error_id, rsp.trading_day.clone()));
    }

    fn on_rtn_depth_market_data(&mut self, quote: &Quote) {
        let _ = self.events.send(Event::Quote(
            quote.instrument_id.clone(),
            quote.last_price,
            quote.volume,
        ));
    }
}

/// Accepts one connection, waits for login and subscribe, answers, streams two
/// quotes and closes. Returns every text frame it received.
fn spawn_front() -> (u16, thread::JoinHandle<Vec<String>>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    listener.set_nonblocking(true).unwrap();

    let handle = thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let mut received = Vec::new();
            let (mut saw_login, mut saw_subscribe) = (false, false);
            while !(saw_login && saw_subscribe) {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        saw_login |= text.contains("REQ_USER_LOGIN");
                        saw_subscribe |= text.contains("SUBSCRIBE_MARKET_DATA");
                        received.push(text);
                    }
                    Some(Ok(_)) => {}
                    _ => return received,
                }
            }

            let frames = [
                r#"{"type":"RSP_USER_LOGIN","trading_day":"20231016","error_id":0,"error_msg":"","request_id":0,"is_last":true}"#,
                r#"{"type":"RSP_SUB_MARKET_DATA","instrument_id":"AG2312","error_id":0,"error_msg":""}"#,
                r#"{"type":"RTN_DEPTH_MARKET_DATA","instrument_id":"AG2312","last_price":5812.5,"volume":7}"#,
                r#"{"type":"HEARTBEAT"}"#,
                r#"{"type":"RTN_DEPTH_MARKET_DATA","instrument_id":"AG2312","last_price":5813.0,"volume":9}"#,
            ];
            for frame in frames {
                ws.send(Message::Text(frame.to_string())).await.unwrap();
            }
            let _ = ws.close(None).await;
            while let Some(Ok(_)) = ws.next().await {}
            received
        })
    });

    (port, handle)
}

fn next_event(rx: &mpsc::Receiver<Event>) -> Event {
    rx.recv_timeout(Duration::from_secs(10))
        .expect("no session event within 10s")
}

#[test]
fn test_session_round_trip() {
    let (port, front) = spawn_front();
    let (tx, rx) = mpsc::channel();

    let mut api = WsMdApi::new(16, Duration::from_secs(5));
    let recorder = Recorder {
        events: tx,
        requests: api.requests(),
    };
    api.register_front(Endpoint::parse(&format!("tcp://127.0.0.1:{}", port)).unwrap());
    api.register_spi(Box::new(recorder));
    api.init().unwrap();
    assert_eq!(
        api.subscribe_market_data(&["AG2312".to_string()]),
        STATUS_OK
    );

    assert_eq!(next_event(&rx), Event::Connected);
    assert_eq!(next_event(&rx), Event::Login(0, "20231016".into()));
    assert_eq!(next_event(&rx), Event::Quote("AG2312".into(), 5812.5, 7));
    assert_eq!(next_event(&rx), Event::Quote("AG2312".into(), 5813.0, 9));
    assert_eq!(next_event(&rx), Event::Disconnected(REASON_READ_FAILED));

    api.release();
    // nothing after the disconnect
    assert!(rx.try_recv().is_err());

    let received = front.join().unwrap();
    assert_eq!(received.len(), 2);
    let login: serde_json::Value = received
        .iter()
        .map(|t| serde_json::from_str::<serde_json::Value>(t).unwrap())
        .find(|v| v["type"] == "REQ_USER_LOGIN")
        .unwrap();
    assert_eq!(login["request_id"], LOGIN_REQUEST_ID);
    let subscribe: serde_json::Value = received
        .iter()
        .map(|t| serde_json::from_str::<serde_json::Value>(t).unwrap())
        .find(|v| v["type"] == "SUBSCRIBE_MARKET_DATA")
        .unwrap();
    assert_eq!(subscribe["instrument_ids"], serde_json::json!(["AG2312"]));
}

#[test]
fn test_unreachable_front_reports_disconnect() {
    // grab a free port, then close it so the connect is refused
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let (tx, rx) = mpsc::channel();

    let mut api = WsMdApi::new(16, Duration::from_secs(2));
    let recorder = Recorder {
        events: tx,
        requests: api.requests(),
    };
    api.register_front(Endpoint::parse(&format!("tcp://127.0.0.1:{}", port)).unwrap());
    api.register_spi(Box::new(recorder));
    api.init().unwrap();

    assert_eq!(next_event(&rx), Event::Disconnected(REASON_READ_FAILED));
    api.release();
}

#[test]
fn test_second_init_rejected() {
    let (tx, _rx) = mpsc::channel();
    let mut api = WsMdApi::new(16, Duration::from_millis(200));
    let recorder = Recorder {
        events: tx,
        requests: api.requests(),
    };
    api.register_front(Endpoint::parse("tcp://127.0.0.1:9").unwrap());
    api.register_spi(Box::new(recorder));
    api.init().unwrap();

    assert!(matches!(
        api.init(),
        Err(md_ping::api::ApiError::AlreadyInitialized)
    ));
    api.release();
}

#[test]
fn test_release_sends_close_frame() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    listener.set_nonblocking(true).unwrap();

    // reports whether the client closed the socket with a close frame
    let front = thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Close(_) = msg {
                    return true;
                }
            }
            false
        })
    });

    let (tx, rx) = mpsc::channel();
    let mut api = WsMdApi::new(16, Duration::from_secs(5));
    let recorder = Recorder {
        events: tx,
        requests: api.requests(),
    };
    api.register_front(Endpoint::parse(&format!("tcp://127.0.0.1:{}", port)).unwrap());
    api.register_spi(Box::new(recorder));
    api.init().unwrap();

    assert_eq!(next_event(&rx), Event::Connected);
    api.release();

    assert!(front.join().unwrap());
    // a released session reports no disconnect
    assert!(rx.try_recv().is_err());
}
