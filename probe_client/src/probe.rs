//! The latency probe observer.
//!
//! Prints connection status, the login round trip in milliseconds and every
//! quote it receives. A disconnect ends the process.

use crate::api::{MdSpi, RequestHandle};
use crate::console::{format_price, Console};
use crate::protocol::{Quote, ReqUserLogin, RspInfo, RspUserLogin};
use crate::tracker::{Clock, LoginTimer, SystemClock, TickStats};

use std::sync::{Arc, Mutex};

/// Request id used for the single login request.
pub const LOGIN_REQUEST_ID: i32 = 0;

/// Called with the exit code when the probe decides the process is done.
pub type ExitHook = Box<dyn FnMut(i32) + Send>;

pub struct LatencyProbe {
    requests: RequestHandle,
    login: ReqUserLogin,
    console: Console,
    clock: Box<dyn Clock>,
    timer: LoginTimer,
    ticks: Arc<Mutex<TickStats>>,
    exit: ExitHook,
    terminated: bool,
}

impl LatencyProbe {
    pub fn new(requests: RequestHandle, console: Console) -> Self {
        Self {
            requests,
            login: ReqUserLogin::default(),
            console,
            clock: Box::new(SystemClock),
            timer: LoginTimer::new(),
            ticks: Arc::new(Mutex::new(TickStats::new())),
            exit: Box::new(|code| std::process::exit(code)),
            terminated: false,
        }
    }

    pub fn with_login(mut self, login: ReqUserLogin) -> Self {
        self.login = login;
        self
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace `std::process::exit` as the disconnect action.
    pub fn with_exit_hook<F: FnMut(i32) + Send + 'static>(mut self, hook: F) -> Self {
        self.exit = Box::new(hook);
        self
    }

    /// Shared quote statistics, readable after the probe has been handed to the session.
    pub fn tick_stats(&self) -> Arc<Mutex<TickStats>> {
        Arc::clone(&self.ticks)
    }
}

impl MdSpi for LatencyProbe {
    fn on_front_connected(&mut self) {
        if self.terminated {
            return;
        }
        self.console.line(format_args!("connected."));
        self.timer.record_request(self.clock.now());
        let ret = self.requests.req_user_login(&self.login, LOGIN_REQUEST_ID);
        log::debug!("Login request return: {}", ret);
    }

    fn on_front_disconnected(&mut self, reason: i32) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.console.line(format_args!("disconnected."));
        log::warn!("Front disconnected, reason: {:#06x}", reason);
        (self.exit)(0);
    }

    fn on_rsp_user_login(
        &mut self,
        rsp: &RspUserLogin,
        info: &RspInfo,
        request_id: i32,
        is_last: bool,
    ) {
        if self.terminated {
            return;
        }
        let now = self.clock.now();
        log::debug!(
            "Login response: request_id={}, is_last={}, trading_day={:?}, session_id={}",
            request_id, is_last, rsp.trading_day, rsp.session_id
        );
        if info.is_error() {
            log::warn!("Login rejected: [{}] {}", info.error_id, info.error_msg);
        }
        match self.timer.record_response(now) {
            Some(elapsed) => self.console.line(format_args!(
                "login. response time: {} milliseconds",
                elapsed.as_millis()
            )),
            None => log::warn!("Login response without a pending login request"),
        }
    }

    fn on_rtn_depth_market_data(&mut self, quote: &Quote) {
        if self.terminated {
            return;
        }
        match self.ticks.lock() {
            Ok(mut ticks) => ticks.record(&quote.instrument_id, self.clock.now()),
            Err(poisoned) => poisoned
                .into_inner()
                .record(&quote.instrument_id, self.clock.now()),
        }
        self.console.line(format_args!(
            "{} - {} - {}",
            quote.instrument_id,
            format_price(quote.last_price),
            quote.volume
        ));
    }

    fn on_rsp_sub_market_data(
        &mut self,
        instrument_id: &str,
        info: &RspInfo,
        _request_id: i32,
        _is_last: bool,
    ) {
        if info.is_error() {
            log::warn!(
                "Subscription to {} rejected: [{}] {}",
                instrument_id, info.error_id, info.error_msg
            );
        } else {
            log::debug!("Subscribed to {}", instrument_id);
        }
    }

    fn on_rsp_unsub_market_data(
        &mut self,
        instrument_id: &str,
        info: &RspInfo,
        _request_id: i32,
        _is_last: bool,
    ) {
        if info.is_error() {
            log::warn!(
                "Unsubscribe from {} rejected: [{}] {}",
                instrument_id, info.error_id, info.error_msg
            );
        } else {
            log::debug!("Unsubscribed from {}", instrument_id);
        }
    }

    fn on_rsp_error(&mut self, info: &RspInfo, request_id: i32) {
        log::warn!(
            "Error response for request {}: [{}] {}",
            request_id, info.error_id, info.error_msg
        );
    }
}
