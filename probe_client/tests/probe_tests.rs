//! Latency Probe Tests
//!
//! Drives the observer directly with simulated session events.

use md_ping::api::{MdSpi, RequestHandle, REASON_READ_FAILED};
use md_ping::probe::LatencyProbe;
use md_ping::protocol::{Quote, RspInfo, RspUserLogin};
use md_ping::tracker::ManualClock;
use md_ping::Console;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn probe_with_exit_log() -> (LatencyProbe, md_ping::console::Captured, Arc<Mutex<Vec<i32>>>) {
    let (console, out) = Console::buffer();
    let exits = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&exits);
    let probe = LatencyProbe::new(RequestHandle::detached(), console)
        .with_exit_hook(move |code| recorded.lock().unwrap().push(code));
    (probe, out, exits)
}

#[test]
fn test_login_time_reported_in_milliseconds() {
    let clock = ManualClock::new();
    let (console, out) = Console::buffer();
    let mut probe = LatencyProbe::new(RequestHandle::detached(), console).with_clock(clock.clone());

    probe.on_front_connected();
    clock.advance(Duration::from_micros(37_900));
    probe.on_rsp_user_login(&RspUserLogin::default(), &RspInfo::default(), 0, true);

    assert_eq!(
        out.lines(),
        vec!["connected.", "login. response time: 37 milliseconds"]
    );
}

#[test]
fn test_second_login_response_prints_nothing() {
    let (console, out) = Console::buffer();
    let mut probe = LatencyProbe::new(RequestHandle::detached(), console);

    probe.on_front_connected();
    probe.on_rsp_user_login(&RspUserLogin::default(), &RspInfo::default(), 0, true);
    probe.on_rsp_user_login(&RspUserLogin::default(), &RspInfo::default(), 0, true);

    let logins = out
        .lines()
        .iter()
        .filter(|l| l.starts_with("login."))
        .count();
    assert_eq!(logins, 1);
}

#[test]
fn test_disconnect_before_login_exits() {
    let (mut probe, out, exits) = probe_with_exit_log();

    probe.on_front_connected();
    probe.on_front_disconnected(REASON_READ_FAILED);
    probe.on_rsp_user_login(&RspUserLogin::default(), &RspInfo::default(), 0, true);
    probe.on_rtn_depth_market_data(&Quote::new("AG2312", 5812.0, 1));

    assert_eq!(out.lines(), vec!["connected.", "disconnected."]);
    assert_eq!(*exits.lock().unwrap(), vec![0]);
}

#[test]
fn test_disconnect_after_quotes_stops_output() {
    let (mut probe, out, exits) = probe_with_exit_log();

    probe.on_front_connected();
    probe.on_rsp_user_login(&RspUserLogin::default(), &RspInfo::default(), 0, true);
    probe.on_rtn_depth_market_data(&Quote::new("600000", 7.25, 10));
    probe.on_front_disconnected(REASON_READ_FAILED);
    probe.on_front_disconnected(REASON_READ_FAILED);
    probe.on_rtn_depth_market_data(&Quote::new("600000", 7.5, 11));

    let lines = out.lines();
    assert_eq!(lines.last().map(String::as_str), Some("disconnected."));
    assert_eq!(lines.iter().filter(|l| l.starts_with("600000")).count(), 1);
    assert_eq!(exits.lock().unwrap().len(), 1);
}

#[test]
fn test_quote_prices_use_six_significant_digits() {
    let (console, out) = Console::buffer();
    let mut probe = LatencyProbe::new(RequestHandle::detached(), console);

    probe.on_rtn_depth_market_data(&Quote::new("AG2312", f64::MAX, 1));
    probe.on_rtn_depth_market_data(&Quote::new("IF2312", 3568.2, 4));
    probe.on_rtn_depth_market_data(&Quote::new("AU2312", 68123.46, 2));

    assert_eq!(
        out.lines(),
        vec![
            "AG2312 - 1.79769e+308 - 1",
            "IF2312 - 3568.2 - 4",
            "AU2312 - 68123.5 - 2"
        ]
    );
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn quote_strategy() -> impl Strategy<Value = (String, u32, i64)> {
    ("[A-Z]{0,2}[0-9]{4,6}", 0u32..100_000, 0i64..1_000_000)
}

proptest! {
    /// N quotes produce N lines, in arrival order, with matching fields.
    /// Half ticks below 50000 never exceed six significant digits, so plain
    /// `Display` gives the expected text.
    #[test]
    fn prop_one_line_per_quote(quotes in prop::collection::vec(quote_strategy(), 0..50)) {
        let (console, out) = Console::buffer();
        let mut probe = LatencyProbe::new(RequestHandle::detached(), console);

        for (id, ticks, volume) in &quotes {
            let price = f64::from(*ticks) * 0.5;
            probe.on_rtn_depth_market_data(&Quote::new(id.clone(), price, *volume));
        }

        let expected: Vec<String> = quotes
            .iter()
            .map(|(id, ticks, volume)| format!("{} - {} - {}", id, f64::from(*ticks) * 0.5, volume))
            .collect();
        prop_assert_eq!(out.lines(), expected);
        prop_assert_eq!(probe.tick_stats().lock().unwrap().count(), quotes.len() as u64);
    }

    /// The printed login time equals the simulated delay, truncated to whole milliseconds.
    #[test]
    fn prop_login_time_matches_delay(delay_us in 0u64..10_000_000) {
        let clock = ManualClock::new();
        let (console, out) = Console::buffer();
        let mut probe = LatencyProbe::new(RequestHandle::detached(), console).with_clock(clock.clone());

        probe.on_front_connected();
        clock.advance(Duration::from_micros(delay_us));
        probe.on_rsp_user_login(&RspUserLogin::default(), &RspInfo::default(), 0, true);

        let lines = out.lines();
        prop_assert_eq!(lines.len(), 2);
        prop_assert_eq!(
            lines[1].clone(),
            format!("login. response time: {} milliseconds", delay_us / 1000)
        );
    }
}
