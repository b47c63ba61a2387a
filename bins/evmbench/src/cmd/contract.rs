//! Built-in benchmark of `sample.sol`.
//!
//! The contract exposes `add(uint8)`, which returns `stored + n` and reverts
//! with `"n is too large"` when `n >= 0x80`. Calls run under Istanbul rules on
//! either revm or SputnikVM.

mod sputnik;

use crate::runner::{self, BenchError, BenchReport, Expectation};
use clap::{Parser, ValueEnum};
use criterion::Criterion;
use revm::{
    bytecode::{Bytecode, BytecodeDecodeError},
    context::{BlockEnv, CfgEnv, TxEnv},
    database::InMemoryDB,
    primitives::{address, bytes, hardfork::SpecId, hex, Address, Bytes, TxKind, U256},
    state::AccountInfo,
    Context, ExecuteEvm, MainBuilder, MainContext,
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Account that sends every call.
pub const OWNER: Address = address!("f000000000000000000000000000000000000000");
/// Address the sample contract is deployed at.
pub const CONTRACT: Address = Address::ZERO;

/// `sample.sol` runtime bytecode, compiled with solc 0.8.0.
const CONTRACT_BIN: &str = include_str!("contract/sample.hex");

/// `add(1)`
const METHOD_SUCCESS: Bytes =
    bytes!("02067e6a0000000000000000000000000000000000000000000000000000000000000001");
/// `add(0xc7)`
const METHOD_REVERT: Bytes =
    bytes!("02067e6a00000000000000000000000000000000000000000000000000000000000000c7");

/// ABI encoded `Error("n is too large")` returned by `add(0xc7)`.
pub const REVERT_DATA: Bytes = bytes!(
    "08c379a00000000000000000000000000000000000000000000000000000000000000020000000000000000000000000000000000000000000000000000000000000000e6e20697320746f6f206c61726765000000000000000000000000000000000000"
);

/// One ether.
const OWNER_WEI: u64 = 1_000_000_000_000_000_000;
const OWNER_BALANCE: U256 = U256::from_limbs([OWNER_WEI, 0, 0, 0]);
const GAS_LIMIT: u64 = 1_000_000;
const GAS_PRICE: u128 = 20_000_000_000;
/// First Istanbul block on mainnet is 9069000, the rules are [`SPEC`].
const BLOCK_NUMBER: u64 = 9_069_001;
const SPEC: SpecId = SpecId::ISTANBUL;
const BLOCK_GAS_LIMIT: u64 = 10_000_000;
const BASE_FEE: u64 = 10;

/// Errors of the `contract` subcommand.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Embedded bytecode is not hex.
    #[error("invalid sample contract hex")]
    InvalidHex(#[from] hex::FromHexError),
    /// Embedded bytecode can't be decoded.
    #[error(transparent)]
    BytecodeDecodeError(#[from] BytecodeDecodeError),
    /// Benchmark failed.
    #[error(transparent)]
    Bench(#[from] BenchError),
}

/// Method of the sample contract to benchmark.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Variant {
    /// `add(1)`, returns normally.
    Success,
    /// `add(0xc7)`, reverts.
    Revert,
}

impl Variant {
    /// Every variant, in run order.
    pub const ALL: &[Variant] = &[Variant::Success, Variant::Revert];

    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Success => "success",
            Variant::Revert => "revert",
        }
    }

    /// Call data of the variant.
    pub fn calldata(self) -> Bytes {
        match self {
            Variant::Success => METHOD_SUCCESS,
            Variant::Revert => METHOD_REVERT,
        }
    }

    /// Outcome every call of the variant must have.
    pub fn expectation(self) -> Expectation {
        match self {
            Variant::Success => Expectation::Success,
            Variant::Revert => Expectation::Revert,
        }
    }
}

/// EVM implementation the sample calls run on.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    /// revm.
    #[default]
    Revm,
    /// SputnikVM, the `evm` crate.
    Sputnik,
}

impl Engine {
    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Revm => "revm",
            Engine::Sputnik => "sputnikvm",
        }
    }

    /// Name of the benchmark as printed in reports.
    pub fn bench_name(self, variant: Variant) -> String {
        match self {
            Engine::Revm => format!("{} test", variant.as_str()),
            Engine::Sputnik => format!("{} test on {}", variant.as_str(), self.as_str()),
        }
    }

    /// Name of the time-bounded benchmark.
    fn measurement_name(self, variant: Variant) -> String {
        format!(
            "execute_contract_method_{}_from_{}",
            variant.as_str(),
            self.as_str()
        )
    }
}

/// `contract` subcommand
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Variant to run, both when omitted
    #[arg(value_enum)]
    variant: Option<Variant>,
    /// EVM to run the calls on
    #[arg(short, long, value_enum, default_value_t)]
    engine: Engine,
    /// Number of executions per variant
    #[arg(short = 'n', long, default_value_t = 10_000, value_parser = clap::value_parser!(u64).range(1..))]
    iterations: u64,
    /// Run a time-bounded statistical benchmark of this many milliseconds instead
    #[arg(short = 'd', long)]
    duration_ms: Option<u64>,
}

impl Cmd {
    /// Runs `contract` command.
    pub fn run(&self) -> Result<(), Error> {
        let variants = match self.variant {
            Some(variant) => vec![variant],
            None => Variant::ALL.to_vec(),
        };

        match self.duration_ms {
            Some(millis) => {
                for variant in variants {
                    bench_for_duration(self.engine, variant, Duration::from_millis(millis))?;
                }
            }
            None => {
                println!(
                    "Starting EVM benchmark with {} iterations...",
                    self.iterations
                );
                for variant in variants {
                    let report = bench(self.engine, variant, self.iterations)?;
                    println!("{report}");
                }
            }
        }
        Ok(())
    }
}

/// State with the funded owner and the deployed sample contract.
pub fn sample_db() -> Result<InMemoryDB, Error> {
    let code = hex::decode(CONTRACT_BIN.trim())?;
    let bytecode = Bytecode::new_raw_checked(code.into())?;

    let mut db = InMemoryDB::default();
    db.insert_account_info(OWNER, AccountInfo::from_balance(OWNER_BALANCE));
    db.insert_account_info(CONTRACT, AccountInfo::from_bytecode(bytecode));
    Ok(db)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since_epoch| since_epoch.as_secs())
}

/// Istanbul rules on mainnet.
pub fn sample_cfg() -> CfgEnv {
    CfgEnv::new_with_spec(SPEC)
}

/// Block the sample calls execute in.
pub fn sample_block() -> BlockEnv {
    BlockEnv {
        number: U256::from(BLOCK_NUMBER),
        timestamp: U256::from(unix_now()),
        difficulty: U256::from(1),
        gas_limit: BLOCK_GAS_LIMIT,
        basefee: BASE_FEE,
        ..BlockEnv::default()
    }
}

/// Call of `variant` from the owner.
pub fn sample_tx(variant: Variant) -> TxEnv {
    TxEnv {
        caller: OWNER,
        kind: TxKind::Call(CONTRACT),
        data: variant.calldata(),
        gas_limit: GAS_LIMIT,
        gas_price: GAS_PRICE,
        ..TxEnv::default()
    }
}

/// Runs `variant` `iterations` times on `engine` against the untouched sample state.
pub fn bench(engine: Engine, variant: Variant, iterations: u64) -> Result<BenchReport, Error> {
    let name = engine.bench_name(variant);
    let expectation = variant.expectation();
    match engine {
        Engine::Revm => {
            let mut evm = Context::mainnet()
                .with_db(sample_db()?)
                .with_block(sample_block())
                .with_cfg(sample_cfg())
                .build_mainnet();
            let tx = sample_tx(variant);
            let report = runner::run_iterations(&name, iterations, expectation, || {
                evm.transact(tx.clone()).map(|r| r.result)
            })?;
            Ok(report)
        }
        Engine::Sputnik => sputnik::with_sample_call(variant, |call| {
            runner::run_iterations(&name, iterations, expectation, call)
        }),
    }
}

fn bench_for_duration(engine: Engine, variant: Variant, duration: Duration) -> Result<(), Error> {
    let name = engine.measurement_name(variant);
    let expectation = variant.expectation();
    match engine {
        Engine::Revm => {
            let mut evm = Context::mainnet()
                .with_db(sample_db()?)
                .with_block(sample_block())
                .with_cfg(sample_cfg())
                .build_mainnet();
            let tx = sample_tx(variant);
            runner::run_for_duration(&name, duration, expectation, || {
                evm.transact(tx.clone()).map(|r| r.result)
            })?;
            Ok(())
        }
        Engine::Sputnik => sputnik::with_sample_call(variant, |call| {
            runner::run_for_duration(&name, duration, expectation, call)
        }),
    }
}

/// Registers the sample contract benchmarks with criterion.
pub fn run(criterion: &mut Criterion) {
    for &variant in Variant::ALL {
        let tx = sample_tx(variant);
        let mut evm = Context::mainnet()
            .with_db(sample_db().expect("sample contract is valid"))
            .with_block(sample_block())
            .with_cfg(sample_cfg())
            .build_mainnet();

        let id = match variant {
            Variant::Success => "sample_success",
            Variant::Revert => "sample_revert",
        };
        criterion.bench_function(id, |b| {
            b.iter(|| evm.transact(tx.clone()).unwrap())
        });
    }
}
