use clap::Parser;
use extrema_trader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
