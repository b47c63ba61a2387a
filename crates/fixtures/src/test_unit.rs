use revm::{
    context::{BlockEnv, CfgEnv},
    database::InMemoryDB,
    primitives::{
        eip4844::{BLOB_BASE_FEE_UPDATE_FRACTION_CANCUN, BLOB_BASE_FEE_UPDATE_FRACTION_PRAGUE},
        hardfork::SpecId,
        Address, Bytes, B256, U256,
    },
};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::{Env, FixtureError, PreAccount, TransactionParts};

/// Single test unit struct
///
/// Fields other than the ones below (`_info`, `post`, `config`, ...) are
/// accepted and ignored.
#[derive(Debug, PartialEq, Eq, Deserialize)]
pub struct TestUnit {
    /// Block environment.
    pub env: Env,
    /// Accounts present before the transaction runs.
    pub pre: BTreeMap<Address, PreAccount>,
    /// Transaction parts.
    pub transaction: TransactionParts,
    /// Expected call output, if the fixture records one.
    #[serde(default)]
    pub out: Option<Bytes>,
}

impl TestUnit {
    /// Chain id of the fixture, mainnet if not given.
    pub fn chain_id(&self) -> u64 {
        self.env
            .current_chain_id
            .map_or(1, |chain_id| chain_id.saturating_to())
    }

    /// Chain configuration for the given hardfork.
    pub fn cfg_env(&self, spec: SpecId) -> CfgEnv {
        let mut cfg = CfgEnv::new_with_spec(spec);
        cfg.chain_id = self.chain_id();
        cfg
    }

    /// Block environment for the given hardfork.
    ///
    /// `prevrandao` falls back to the difficulty for fixtures written before
    /// the merge.
    pub fn block_env(&self, spec: SpecId) -> BlockEnv {
        let env = &self.env;
        let number: u64 = env.current_number.saturating_to();
        let timestamp: u64 = env.current_timestamp.saturating_to();
        let random = env.current_random.unwrap_or(env.current_difficulty);

        let mut block = BlockEnv {
            number: U256::from(number),
            beneficiary: env.current_coinbase,
            timestamp: U256::from(timestamp),
            gas_limit: env.current_gas_limit.saturating_to(),
            basefee: env.current_base_fee.unwrap_or_default().saturating_to(),
            difficulty: env.current_difficulty,
            prevrandao: Some(B256::from(random.to_be_bytes::<32>())),
            ..BlockEnv::default()
        };

        if let Some(excess_blob_gas) = env.current_excess_blob_gas {
            let update_fraction = if spec.is_enabled_in(SpecId::PRAGUE) {
                BLOB_BASE_FEE_UPDATE_FRACTION_PRAGUE
            } else {
                BLOB_BASE_FEE_UPDATE_FRACTION_CANCUN
            };
            block.set_blob_excess_gas_and_price(excess_blob_gas.saturating_to(), update_fraction);
        }

        block
    }

    /// Fresh in-memory state seeded with the pre-state accounts.
    pub fn state(&self) -> Result<InMemoryDB, FixtureError> {
        let mut db = InMemoryDB::default();

        for (&address, account) in &self.pre {
            db.insert_account_info(address, account.to_state(address)?);

            for (&slot, &value) in &account.storage {
                let Ok(()) = db.insert_account_storage(address, slot, value);
            }
            tracing::trace!(%address, slots = account.storage.len(), "seeded account");
        }

        Ok(db)
    }
}
