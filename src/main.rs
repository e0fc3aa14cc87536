use crate::cli::run;

pub mod cli;
mod config;
pub mod domain;
pub mod http;
pub mod ingest;
pub mod library;
pub mod notify;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
