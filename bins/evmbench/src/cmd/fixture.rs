//! Benchmarks transactions taken from state test fixtures.
//!
//! Every test unit found in the given files runs against a fresh in-memory
//! state built from its `pre` section.

use crate::runner::{self, BenchError, Expectation};
use clap::{Parser, ValueEnum};
use fixtures::{FixtureError, TestSuite, TestUnit, TxPartIndices};
use revm::{
    context_interface::result::ExecutionResult, primitives::hardfork::SpecId, Context,
    ExecuteCommitEvm, ExecuteEvm, MainBuilder, MainContext,
};
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Errors of the `fixture` subcommand.
#[derive(Debug, Error)]
pub enum Error {
    /// Path given on the command line does not exist.
    #[error("path does not exist: {0}")]
    InvalidPath(PathBuf),
    /// Directory holds no `.json` file.
    #[error("no JSON fixture files found in {0}")]
    NoJsonFiles(PathBuf),
    /// `--test` names a test that is in none of the files.
    #[error("test `{0}` not found")]
    UnknownTest(String),
    /// Fixture could not be loaded or converted.
    #[error("{path}: {source}")]
    Fixture {
        /// Fixture file.
        path: PathBuf,
        /// Underlying error.
        source: FixtureError,
    },
    /// Benchmark failed.
    #[error(transparent)]
    Bench(#[from] BenchError),
}

/// Hardfork rules the transaction executes under.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Hardfork {
    /// Frontier, the genesis rules.
    Frontier,
    /// Homestead.
    Homestead,
    /// Tangerine Whistle (EIP-150).
    Tangerine,
    /// Spurious Dragon (EIP-158).
    SpuriousDragon,
    /// Byzantium.
    Byzantium,
    /// Petersburg, Constantinople without EIP-1283.
    Petersburg,
    /// Istanbul.
    Istanbul,
    /// Berlin, access lists.
    Berlin,
    /// London, EIP-1559 fees.
    London,
    /// Paris, proof of stake.
    Merge,
    /// Shanghai.
    Shanghai,
    /// Cancun, blob transactions.
    Cancun,
    /// Prague, set-code transactions.
    #[default]
    Prague,
    /// Osaka.
    Osaka,
}

impl Hardfork {
    /// Corresponding revm spec id.
    pub fn spec_id(self) -> SpecId {
        match self {
            Hardfork::Frontier => SpecId::FRONTIER,
            Hardfork::Homestead => SpecId::HOMESTEAD,
            Hardfork::Tangerine => SpecId::TANGERINE,
            Hardfork::SpuriousDragon => SpecId::SPURIOUS_DRAGON,
            Hardfork::Byzantium => SpecId::BYZANTIUM,
            Hardfork::Petersburg => SpecId::PETERSBURG,
            Hardfork::Istanbul => SpecId::ISTANBUL,
            Hardfork::Berlin => SpecId::BERLIN,
            Hardfork::London => SpecId::LONDON,
            Hardfork::Merge => SpecId::MERGE,
            Hardfork::Shanghai => SpecId::SHANGHAI,
            Hardfork::Cancun => SpecId::CANCUN,
            Hardfork::Prague => SpecId::PRAGUE,
            Hardfork::Osaka => SpecId::OSAKA,
        }
    }
}

/// `fixture` subcommand
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Path to folder or file containing the fixtures
    ///
    /// Folders will be searched recursively for files with the extension `.json`.
    #[arg(required = true, num_args = 1..)]
    paths: Vec<PathBuf>,
    /// Number of executions per test
    #[arg(short = 'n', long, default_value_t = 10_000, value_parser = clap::value_parser!(u64).range(1..))]
    iterations: u64,
    /// Run a time-bounded statistical benchmark of this many milliseconds instead
    #[arg(short = 'd', long)]
    duration_ms: Option<u64>,
    /// Hardfork to execute under
    #[arg(long, value_enum, default_value_t)]
    spec: Hardfork,
    /// Only run the test with this name
    #[arg(short = 't', long)]
    test: Option<String>,
    /// Index into the transaction `data` list
    #[arg(long, default_value_t = 0)]
    data_index: usize,
    /// Index into the transaction `gasLimit` list
    #[arg(long, default_value_t = 0)]
    gas_index: usize,
    /// Index into the transaction `value` list
    #[arg(long, default_value_t = 0)]
    value_index: usize,
    /// Commit state changes between iterations instead of discarding them
    ///
    /// Nonce checks are disabled so the same transaction can be replayed.
    #[arg(long)]
    commit: bool,
    /// Outcome every execution must have
    #[arg(long, value_enum, default_value_t)]
    expect: Expectation,
    /// Compare the output of the first execution with the fixture `out` field
    #[arg(long)]
    check_output: bool,
}

impl Cmd {
    /// Runs `fixture` command.
    pub fn run(&self) -> Result<(), Error> {
        let mut ran = 0usize;
        for path in &self.paths {
            if !path.exists() {
                return Err(Error::InvalidPath(path.clone()));
            }

            let files = find_all_json_tests(path);
            if files.is_empty() {
                return Err(Error::NoJsonFiles(path.clone()));
            }

            for file in files {
                ran += self.bench_file(&file)?;
            }
        }

        if let Some(test) = &self.test {
            if ran == 0 {
                return Err(Error::UnknownTest(test.clone()));
            }
        }
        Ok(())
    }

    fn indexes(&self) -> TxPartIndices {
        TxPartIndices {
            data: self.data_index,
            gas: self.gas_index,
            value: self.value_index,
        }
    }

    /// Benchmarks every selected test of a file, returns how many ran.
    fn bench_file(&self, path: &Path) -> Result<usize, Error> {
        let suite = TestSuite::from_file(path).map_err(|source| Error::Fixture {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(?suite, "parsed content");

        let mut ran = 0;
        for (name, unit) in &suite.0 {
            if self.test.as_ref().is_some_and(|test| test != name) {
                continue;
            }
            self.bench_unit(path, name, unit)?;
            ran += 1;
        }
        Ok(ran)
    }

    fn bench_unit(&self, path: &Path, name: &str, unit: &TestUnit) -> Result<(), Error> {
        let fixture_error = |source: FixtureError| Error::Fixture {
            path: path.to_path_buf(),
            source,
        };

        let spec = self.spec.spec_id();
        let mut cfg = unit.cfg_env(spec);
        cfg.disable_nonce_check = self.commit;
        let block = unit.block_env(spec);
        let tx = unit
            .transaction
            .tx_env(self.indexes(), unit.chain_id())
            .map_err(fixture_error)?;
        let db = unit.state().map_err(fixture_error)?;

        let mut evm = Context::mainnet()
            .with_db(db)
            .with_block(block)
            .with_cfg(cfg)
            .build_mainnet();

        let bench_name = format!("{}::{name}", path.display());
        tracing::info!(bench = %bench_name, spec = ?spec, commit = self.commit, "benchmarking");

        if self.check_output {
            verify_output(&bench_name, unit, || evm.transact(tx.clone()).map(|r| r.result))?;
        }

        if self.commit {
            self.measure(&bench_name, || evm.transact_commit(tx.clone()))
        } else {
            self.measure(&bench_name, || evm.transact(tx.clone()).map(|r| r.result))
        }
    }

    fn measure<F, E>(&self, bench_name: &str, exec: F) -> Result<(), Error>
    where
        F: FnMut() -> Result<ExecutionResult, E>,
        E: fmt::Display,
    {
        match self.duration_ms {
            Some(millis) => runner::run_for_duration(
                bench_name,
                Duration::from_millis(millis),
                self.expect,
                exec,
            )?,
            None => {
                let report = runner::run_iterations(bench_name, self.iterations, self.expect, exec)?;
                println!("{report}");
            }
        }
        Ok(())
    }
}

/// Runs the transaction once and compares its output with the fixture `out`.
fn verify_output<F, E>(bench_name: &str, unit: &TestUnit, mut exec: F) -> Result<(), Error>
where
    F: FnMut() -> Result<ExecutionResult, E>,
    E: fmt::Display,
{
    let Some(expected) = &unit.out else {
        tracing::warn!(bench = %bench_name, "fixture has no `out`, skipping output check");
        return Ok(());
    };

    let result = exec().map_err(|e| BenchError::Evm {
        name: bench_name.to_string(),
        iteration: 0,
        message: e.to_string(),
    })?;
    let got = result.output().cloned().unwrap_or_default();
    if &got != expected {
        return Err(BenchError::OutputMismatch {
            name: bench_name.to_string(),
            got,
            expected: expected.clone(),
        }
        .into());
    }
    tracing::debug!(bench = %bench_name, "output matches fixture");
    Ok(())
}

/// Find all JSON test files in the given path
/// If path is a file, returns it in a vector
/// If path is a directory, recursively finds all .json files, sorted
pub fn find_all_json_tests(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension() == Some("json".as_ref()))
            .map(DirEntry::into_path)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Hardfork::Istanbul, SpecId::ISTANBUL)]
    #[case(Hardfork::Merge, SpecId::MERGE)]
    #[case(Hardfork::Prague, SpecId::PRAGUE)]
    fn hardfork_maps_to_spec(#[case] hardfork: Hardfork, #[case] spec: SpecId) {
        assert_eq!(hardfork.spec_id(), spec);
    }

    #[test]
    fn default_hardfork_is_prague() {
        assert_eq!(Hardfork::default(), Hardfork::Prague);
    }

    #[test]
    fn finds_json_files_recursively() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let files = find_all_json_tests(&dir);
        assert!(!files.is_empty());
        assert!(files
            .iter()
            .all(|file| file.extension() == Some("json".as_ref())));

        let file = dir.join("sample.json");
        assert_eq!(find_all_json_tests(&file), vec![file]);
    }

    #[test]
    fn parses_defaults() {
        let cmd = Cmd::try_parse_from(["fixture", "a.json"]).unwrap();
        assert_eq!(cmd.iterations, 10_000);
        assert_eq!(cmd.spec, Hardfork::Prague);
        assert_eq!(cmd.expect, Expectation::Success);
        assert_eq!(cmd.indexes(), TxPartIndices::default());
        assert!(!cmd.commit);
        assert_eq!(cmd.duration_ms, None);

        let cmd = Cmd::try_parse_from(["fixture", "a.json", "-d", "10"]).unwrap();
        assert_eq!(cmd.duration_ms, Some(10));
    }

    #[test]
    fn rejects_zero_iterations() {
        assert!(Cmd::try_parse_from(["fixture", "a.json", "-n", "0"]).is_err());
    }
}
