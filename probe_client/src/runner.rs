//! Probe orchestration: connect, subscribe, dwell, wait for the exit trigger.

use crate::api::{ApiError, MdApi, STATUS_OK};
use crate::config::Config;
use crate::console::Console;
use crate::endpoint::{Endpoint, EndpointError};
use crate::probe::{ExitHook, LatencyProbe};
use crate::protocol::ReqUserLogin;
use crate::tracker::TickSummary;

use std::io::Read;
use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("failed to start session: {0}")]
    Api(#[from] ApiError),
}

/// Blocks the main thread until the user wants out.
pub trait ShutdownSignal {
    fn wait(&mut self);
}

/// Waits for one byte on stdin.
pub struct Keypress;

impl ShutdownSignal for Keypress {
    fn wait(&mut self) {
        let mut buf = [0u8; 1];
        if let Err(e) = std::io::stdin().read(&mut buf) {
            log::warn!("Failed to read from stdin: {}", e);
        }
    }
}

/// Owns the session for the lifetime of one probe run.
pub struct LatencyProbeClient<A: MdApi> {
    api: A,
    config: Config,
    console: Console,
    exit_hook: Option<ExitHook>,
}

impl<A: MdApi> LatencyProbeClient<A> {
    pub fn new(api: A, config: Config, console: Console) -> Self {
        Self {
            api,
            config,
            console,
            exit_hook: None,
        }
    }

    /// Replace `std::process::exit` as the reaction to a disconnect.
    pub fn with_exit_hook<F: FnMut(i32) + Send + 'static>(mut self, hook: F) -> Self {
        self.exit_hook = Some(Box::new(hook));
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Run the probe against `address` until `shutdown` fires.
    ///
    /// The subscription goes out right after the session starts, without waiting
    /// for the login response. The session queues it until the front is connected,
    /// so it reaches the front ahead of the login request.
    pub fn start(
        &mut self,
        address: &str,
        shutdown: &mut dyn ShutdownSignal,
    ) -> Result<TickSummary, ProbeError> {
        let endpoint = Endpoint::parse(address)?;

        self.console
            .line(format_args!("version:{}", self.api.version()));

        let login = ReqUserLogin {
            broker_id: self.config.broker_id.clone(),
            user_id: self.config.user_id.clone(),
            password: self.config.password.clone(),
        };
        let mut probe =
            LatencyProbe::new(self.api.requests(), self.console.clone()).with_login(login);
        if let Some(hook) = self.exit_hook.take() {
            probe = probe.with_exit_hook(hook);
        }
        let ticks = probe.tick_stats();

        self.api.register_front(endpoint);
        self.api.register_spi(Box::new(probe));
        self.api.init()?;

        let ret = self.api.subscribe_market_data(&self.config.symbols);
        self.console.line(format_args!("subscribe return: {}", ret));
        if ret != STATUS_OK {
            log::warn!("Subscription for {:?} not accepted: {}", self.config.symbols, ret);
        }

        thread::sleep(self.config.dwell());
        self.console.line(format_args!("press ANY key to exit ..."));
        shutdown.wait();

        self.api.release();

        let stats = match ticks.lock() {
            Ok(stats) => stats,
            Err(poisoned) => poisoned.into_inner(),
        };
        stats.log_summary();
        Ok(stats.summary())
    }
}
