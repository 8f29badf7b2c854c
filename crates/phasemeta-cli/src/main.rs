//! Phasemeta.
//!
//! Fetches the phase metadata through the memoizing [`LazyFetchCell`](phasemeta::LazyFetchCell)
//! and prints either the raw records or the distinct phases derived from them.

#![warn(missing_debug_implementations, unused_crate_dependencies, clippy::all)]

mod cli;
mod logging;
mod output;

fn main() {
    match cli::execute() {
        Ok(()) => std::process::exit(0),
        Err(error) => {
            logging::ensure_log_error(&error);
            std::process::exit(1);
        }
    }
}
