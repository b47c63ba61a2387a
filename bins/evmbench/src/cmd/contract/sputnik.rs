//! Sample contract on SputnikVM.

use super::{
    unix_now, Error, Variant, BLOCK_GAS_LIMIT, BLOCK_NUMBER, CONTRACT, CONTRACT_BIN, GAS_LIMIT,
    GAS_PRICE, OWNER, OWNER_WEI,
};
use crate::runner::{BenchError, ExecutionFailure, Outcome};
use evm::{
    backend::{MemoryAccount, MemoryBackend, MemoryVicinity},
    executor::stack::{MemoryStackState, StackExecutor, StackSubstateMetadata},
    Config, ExitReason,
};
use primitive_types::{H160, U256};
use revm::primitives::{hex, Address};
use std::{collections::BTreeMap, convert::Infallible};

/// Exit reason and return data of one call.
#[derive(Clone, Debug)]
pub(super) struct CallOutcome {
    reason: ExitReason,
    output: Vec<u8>,
}

impl Outcome for CallOutcome {
    fn failure(&self) -> Option<ExecutionFailure> {
        match &self.reason {
            ExitReason::Succeed(_) => None,
            ExitReason::Revert(_) => Some(ExecutionFailure::Reverted {
                output: self.output.clone().into(),
            }),
            ExitReason::Error(error) => Some(ExecutionFailure::Halted {
                reason: format!("{error:?}"),
            }),
            ExitReason::Fatal(fatal) => Some(ExecutionFailure::Halted {
                reason: format!("{fatal:?}"),
            }),
        }
    }
}

fn h160(address: Address) -> H160 {
    H160::from_slice(address.as_slice())
}

fn sample_state() -> Result<BTreeMap<H160, MemoryAccount>, Error> {
    let code = hex::decode(CONTRACT_BIN.trim())?;
    Ok(BTreeMap::from([
        (
            h160(OWNER),
            MemoryAccount {
                nonce: U256::zero(),
                balance: U256::from(OWNER_WEI),
                storage: BTreeMap::new(),
                code: Vec::new(),
            },
        ),
        (
            h160(CONTRACT),
            MemoryAccount {
                nonce: U256::one(),
                balance: U256::zero(),
                storage: BTreeMap::new(),
                code,
            },
        ),
    ]))
}

fn sample_vicinity() -> MemoryVicinity {
    MemoryVicinity {
        gas_price: U256::from(GAS_PRICE),
        origin: h160(OWNER),
        chain_id: U256::one(),
        block_hashes: Vec::new(),
        block_number: U256::from(BLOCK_NUMBER),
        block_coinbase: H160::zero(),
        block_timestamp: U256::from(unix_now()),
        block_difficulty: U256::one(),
        block_randomness: None,
        block_gas_limit: U256::from(BLOCK_GAS_LIMIT),
        block_base_fee_per_gas: U256::zero(),
    }
}

/// Builds an Istanbul executor over the sample state and hands `measure` a
/// closure that calls `variant` once per invocation.
///
/// The executor's own gas meter spans every call, so it gets no limit. Each
/// call is still capped at the transaction gas limit.
pub(super) fn with_sample_call<T>(
    variant: Variant,
    measure: impl FnOnce(&mut dyn FnMut() -> Result<CallOutcome, Infallible>) -> Result<T, BenchError>,
) -> Result<T, Error> {
    let config = Config::istanbul();
    let vicinity = sample_vicinity();
    let mut backend = MemoryBackend::new(&vicinity, sample_state()?);
    let metadata = StackSubstateMetadata::new(u64::MAX, &config);
    let state = MemoryStackState::new(metadata, &mut backend);
    let mut executor = StackExecutor::new_with_precompiles(state, &config, &());

    let (owner, contract) = (h160(OWNER), h160(CONTRACT));
    let data = variant.calldata().to_vec();
    let mut call = || {
        let (reason, output) = executor.transact_call(
            owner,
            contract,
            U256::zero(),
            data.clone(),
            GAS_LIMIT,
            Vec::new(),
        );
        Ok(CallOutcome { reason, output })
    };

    Ok(measure(&mut call)?)
}
