use clap::Parser;
use color_eyre::eyre::Result;
use evmbench::cmd::MainCmd;
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    color_eyre::install()?;

    // Timings go to stdout, logs to stderr.
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    MainCmd::parse().run()?;

    Ok(())
}
