use anyhow::Result;

mod cli;
mod runtime;

use cli::Command;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match cli::parse()? {
        Command::Simulate(args) => runtime::simulate(args),
        Command::Inspect(args) => runtime::inspect(args),
    }
}
