//! catalogql CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. The response
//! envelope is written to stdout; a failure also goes to stderr and the
//! process exits non-zero.

use catalogql::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
