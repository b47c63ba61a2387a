//! Command line interface.

pub mod contract;
pub mod fixture;

use clap::Parser;

/// Benchmark runner over revm
#[derive(Parser, Debug)]
#[command(infer_subcommands = true, version, about)]
#[allow(clippy::large_enum_variant)]
pub enum MainCmd {
    /// Benchmark the built-in sample contract
    Contract(contract::Cmd),
    /// Benchmark transactions from state test fixtures
    Fixture(fixture::Cmd),
}

/// Error of any subcommand.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `contract` failed.
    #[error(transparent)]
    Contract(#[from] contract::Error),
    /// `fixture` failed.
    #[error(transparent)]
    Fixture(#[from] fixture::Error),
}

impl MainCmd {
    /// Runs the selected subcommand.
    pub fn run(&self) -> Result<(), Error> {
        match self {
            Self::Contract(cmd) => cmd.run().map_err(Into::into),
            Self::Fixture(cmd) => cmd.run().map_err(Into::into),
        }
    }
}
