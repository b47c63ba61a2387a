use revm::{
    bytecode::Bytecode,
    primitives::{Address, Bytes, U256},
    state,
};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::{deserializer::deserialize_str_as_u64, FixtureError};

/// Account as listed under `pre`.
///
/// Missing `code` and `storage` mean an externally owned account with an
/// empty storage.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PreAccount {
    /// Balance in wei.
    pub balance: U256,
    /// Runtime code, empty for externally owned accounts.
    #[serde(default)]
    pub code: Bytes,
    /// Hex or decimal string.
    #[serde(deserialize_with = "deserialize_str_as_u64")]
    pub nonce: u64,
    /// Slot to value.
    #[serde(default)]
    pub storage: BTreeMap<U256, U256>,
}

impl PreAccount {
    /// Converts the account into the form the state store keeps, hashing its code.
    pub fn to_state(&self, address: Address) -> Result<state::AccountInfo, FixtureError> {
        let code = Bytecode::new_raw_checked(self.code.clone())
            .map_err(|source| FixtureError::InvalidCode { address, source })?;
        Ok(state::AccountInfo::new(
            self.balance,
            self.nonce,
            code.hash_slow(),
            code,
        ))
    }
}
