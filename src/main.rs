use std::process::ExitCode;

use clap::Parser;
use contact_book::app::{self, Options};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let opts = Options::parse();
    match app::run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("contact-book: {e}");
            ExitCode::FAILURE
        }
    }
}
