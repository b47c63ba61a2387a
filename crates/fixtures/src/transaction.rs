use alloy_eip2930::AccessList;
use either::Either;
use k256::ecdsa::SigningKey;
use revm::{
    context::TxEnv,
    context_interface::TransactionType,
    primitives::{Address, Bytes, TxKind, B256, U256},
};
use serde::{Deserialize, Serialize};

use crate::{deserializer::deserialize_maybe_empty, FixtureError, TestAuthorization};

/// Transaction parts.
///
/// `data`, `gasLimit` and `value` are lists; a concrete transaction picks one
/// entry of each through [`TxPartIndices`].
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParts {
    /// Call data variants.
    pub data: Vec<Bytes>,
    /// Gas limit variants.
    pub gas_limit: Vec<U256>,
    /// Legacy gas price.
    pub gas_price: Option<U256>,
    /// Sender nonce.
    pub nonce: U256,
    /// Sender private key.
    #[serde(default)]
    pub secret_key: Option<B256>,
    /// if sender is not present we need to derive it from secret key.
    #[serde(default)]
    pub sender: Option<Address>,
    /// Call target, `None` for contract creation.
    #[serde(default, deserialize_with = "deserialize_maybe_empty")]
    pub to: Option<Address>,
    /// Value variants.
    pub value: Vec<U256>,
    /// EIP-1559 fee cap.
    pub max_fee_per_gas: Option<U256>,
    /// EIP-1559 tip cap.
    pub max_priority_fee_per_gas: Option<U256>,

    /// Access lists, one per data entry.
    #[serde(default)]
    pub access_lists: Vec<Option<AccessList>>,
    /// EIP-7702 authorizations.
    pub authorization_list: Option<Vec<TestAuthorization>>,
    /// EIP-4844 blob hashes.
    #[serde(default)]
    pub blob_versioned_hashes: Vec<B256>,
    /// EIP-4844 blob fee cap.
    pub max_fee_per_blob_gas: Option<U256>,
}

/// Transaction part indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxPartIndices {
    /// Index into `data` (and `accessLists`).
    pub data: usize,
    /// Index into `gasLimit`.
    pub gas: usize,
    /// Index into `value`.
    pub value: usize,
}

impl TransactionParts {
    /// Sender of the transaction, recovered from the secret key if not given.
    pub fn caller(&self) -> Result<Address, FixtureError> {
        if let Some(sender) = self.sender {
            return Ok(sender);
        }
        self.secret_key
            .as_ref()
            .and_then(sender_of)
            .ok_or(FixtureError::UnknownSender)
    }

    /// Transaction type implied by the fields present.
    ///
    /// Returns `None` for blob and set-code transactions without a target,
    /// those can't be contract creations.
    pub fn tx_type(&self, access_list_index: usize) -> Option<TransactionType> {
        let mut tx_type = TransactionType::Legacy;

        if self.max_fee_per_gas.is_some() {
            tx_type = TransactionType::Eip1559;
        } else if matches!(self.access_lists.get(access_list_index), Some(Some(_))) {
            tx_type = TransactionType::Eip2930;
        }

        if !self.blob_versioned_hashes.is_empty() || self.max_fee_per_blob_gas.is_some() {
            if self.to.is_none() {
                return None;
            }
            tx_type = TransactionType::Eip4844;
        }

        if self.authorization_list.is_some() {
            if self.to.is_none() {
                return None;
            }
            tx_type = TransactionType::Eip7702;
        }

        Some(tx_type)
    }

    /// Builds the transaction environment for the selected parts.
    pub fn tx_env(&self, indexes: TxPartIndices, chain_id: u64) -> Result<TxEnv, FixtureError> {
        let caller = self.caller()?;
        let data = pick(&self.data, indexes.data, "data")?.clone();
        let gas_limit = *pick(&self.gas_limit, indexes.gas, "gasLimit")?;
        let value = *pick(&self.value, indexes.value, "value")?;

        let tx_type = self
            .tx_type(indexes.data)
            .ok_or(FixtureError::MissingTarget)?;

        let authorization_list = self
            .authorization_list
            .iter()
            .flatten()
            .map(|auth| auth.into_signed().map(Either::Left))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TxEnv {
            tx_type: tx_type as u8,
            caller,
            gas_limit: gas_limit.saturating_to(),
            gas_price: self
                .gas_price
                .or(self.max_fee_per_gas)
                .unwrap_or_default()
                .try_into()
                .unwrap_or(u128::MAX),
            kind: match self.to {
                Some(address) => TxKind::Call(address),
                None => TxKind::Create,
            },
            value,
            data,
            nonce: u64::try_from(self.nonce).map_err(|_| FixtureError::FieldOverflow("nonce"))?,
            chain_id: Some(chain_id),
            access_list: self
                .access_lists
                .get(indexes.data)
                .cloned()
                .flatten()
                .unwrap_or_default(),
            gas_priority_fee: self
                .max_priority_fee_per_gas
                .map(u128::try_from)
                .transpose()
                .map_err(|_| FixtureError::FieldOverflow("maxPriorityFeePerGas"))?,
            blob_hashes: self.blob_versioned_hashes.clone(),
            max_fee_per_blob_gas: self
                .max_fee_per_blob_gas
                .map(u128::try_from)
                .transpose()
                .map_err(|_| FixtureError::FieldOverflow("maxFeePerBlobGas"))?
                .unwrap_or_default(),
            authorization_list,
            ..TxEnv::default()
        })
    }
}

fn pick<'a, T>(parts: &'a [T], index: usize, part: &'static str) -> Result<&'a T, FixtureError> {
    parts.get(index).ok_or(FixtureError::IndexOutOfRange {
        part,
        index,
        len: parts.len(),
    })
}

/// Address owning `secret_key`, `None` if the key is not a valid scalar.
pub fn sender_of(secret_key: &B256) -> Option<Address> {
    let signing_key = SigningKey::from_slice(secret_key.as_slice()).ok()?;
    let point = signing_key.verifying_key().to_encoded_point(false);
    // Uncompressed SEC1 point, skip the 0x04 tag.
    Some(Address::from_raw_public_key(&point.as_bytes()[1..]))
}
