//! Console output shared by the main thread and the dispatch thread.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Line-oriented output sink. Clones write to the same destination.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<dyn Write + Send>>,
}

impl Console {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(writer)),
        }
    }

    /// A console writing into memory, and a handle to read back what was written.
    pub fn buffer() -> (Self, Captured) {
        let buf = Captured::default();
        (Self::new(buf.clone()), buf)
    }

    /// Write one line and flush. Output errors are logged, never propagated.
    pub fn line(&self, args: fmt::Arguments<'_>) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{}", args).and_then(|_| out.flush()) {
            log::warn!("Failed to write console output: {}", e);
        }
    }
}

/// Significant digits printed for prices.
const PRICE_PRECISION: i32 = 6;

/// Format a price like C's `%g`: six significant digits, trailing zeros
/// dropped, exponent notation outside `1e-4 ..= 1e6`.
///
/// Fronts fill unset prices with `f64::MAX`, which prints as `1.79769e+308`.
pub fn format_price(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // the exponent after rounding to six digits decides the notation
    let scientific = format!("{:.*e}", (PRICE_PRECISION - 1) as usize, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..PRICE_PRECISION).contains(&exponent) {
        let decimals = (PRICE_PRECISION - 1 - exponent) as usize;
        trim_fraction(format!("{:.*}", decimals, value))
    } else {
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa.to_string()),
            if exponent < 0 { '-' } else { '+' },
            exponent.abs()
        )
    }
}

fn trim_fraction(digits: String) -> String {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        digits
    }
}

/// In-memory writer backing `Console::buffer`.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn contents(&self) -> String {
        let buf = match self.0.lock() {
            Ok(buf) => buf,
            Err(poisoned) => poisoned.into_inner(),
        };
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for Captured {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = match self.0.lock() {
            Ok(buf) => buf,
            Err(poisoned) => poisoned.into_inner(),
        };
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
