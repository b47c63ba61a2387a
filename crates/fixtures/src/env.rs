use revm::primitives::{Address, U256};
use serde::Deserialize;

/// Block environment of a state test.
///
/// Scalars are kept as [`U256`] the way fixtures encode them and are narrowed
/// when the block environment is built.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Env {
    /// Block beneficiary.
    pub current_coinbase: Address,
    /// Block difficulty, zero after the merge.
    #[serde(default)]
    pub current_difficulty: U256,
    /// Randomness beacon (`prevrandao`), present in post-merge fixtures.
    #[serde(default)]
    pub current_random: Option<U256>,
    /// Block gas limit.
    pub current_gas_limit: U256,
    /// Block number.
    pub current_number: U256,
    /// Block timestamp.
    pub current_timestamp: U256,
    /// Base fee per gas, present from London on.
    #[serde(default)]
    pub current_base_fee: Option<U256>,
    /// Excess blob gas, present from Cancun on.
    #[serde(default)]
    pub current_excess_blob_gas: Option<U256>,
    /// Chain id, defaults to mainnet.
    #[serde(default)]
    pub current_chain_id: Option<U256>,
}
