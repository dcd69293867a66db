//! Command line handling. The probe takes exactly one argument: the front address.

use crate::console::Console;
use clap::Parser;
use std::ffi::OsString;

/// Printed for any invocation that is not exactly one address.
pub const USAGE: [&str; 2] = [
    "usage: mdping {address}",
    "example: mdping tcp://121.37.80.177:20004",
];

#[derive(Parser, Debug)]
#[command(name = "mdping", disable_help_flag = true, disable_version_flag = true)]
struct Args {
    /// Front address, e.g. tcp://121.37.80.177:20004
    address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Probe { address: String },
    Usage,
}

/// Interpret the process arguments, program name included.
pub fn parse<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Args::try_parse_from(args) {
        Ok(args) => Invocation::Probe {
            address: args.address,
        },
        Err(e) => {
            log::debug!("Invalid arguments: {:?}", e.kind());
            Invocation::Usage
        }
    }
}

pub fn print_usage(console: &Console) {
    for line in USAGE {
        console.line(format_args!("{}", line));
    }
}
