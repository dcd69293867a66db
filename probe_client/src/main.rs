//! mdping entry point
//!
//! Usage: `mdping {address}`, e.g. `mdping tcp://121.37.80.177:20004`.

use md_ping::cli::{self, Invocation};
use md_ping::{Config, Console, Keypress, LatencyProbeClient, WsMdApi};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let console = Console::stdout();
    let address = match cli::parse(std::env::args_os()) {
        Invocation::Probe { address } => address,
        Invocation::Usage => {
            cli::print_usage(&console);
            return;
        }
    };

    // Load configuration
    let config = Config::load_or_default();
    config.log_config();

    let api = WsMdApi::new(config.request_queue_size, config.connect_timeout());
    let mut client = LatencyProbeClient::new(api, config, console);

    match client.start(&address, &mut Keypress) {
        Ok(summary) => {
            log::info!("Probe finished after {} quotes", summary.count);
        }
        Err(e) => {
            log::error!("Probe error: {}", e);
            std::process::exit(1);
        }
    }
}
