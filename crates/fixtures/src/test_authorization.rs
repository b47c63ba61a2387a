use alloy_eip7702::{Authorization, SignedAuthorization};
use revm::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::FixtureError;

/// EIP-7702 authorization list entry as written in fixtures.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct TestAuthorization {
    /// Chain the authorization is valid on, zero for any chain.
    pub chain_id: U256,
    /// Address the authority delegates to.
    pub address: Address,
    /// Authority nonce.
    pub nonce: U256,
    /// Signature parity, either `0`/`1` or legacy `27`/`28`.
    pub v: U256,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
    /// Signer as precomputed by the fixture generator, informational only.
    #[serde(default)]
    pub signer: Option<Address>,
}

impl TestAuthorization {
    /// Signature parity normalized to `0` or `1`.
    pub fn y_parity(&self) -> Result<u8, FixtureError> {
        match u8::try_from(self.v) {
            Ok(v @ (0 | 1)) => Ok(v),
            Ok(v @ (27 | 28)) => Ok(v - 27),
            _ => Err(self.invalid("signature parity must be 0, 1, 27 or 28")),
        }
    }

    /// Converts into a signed authorization.
    ///
    /// The signature is not checked here, recovery happens inside the EVM.
    pub fn into_signed(self) -> Result<SignedAuthorization, FixtureError> {
        let nonce = u64::try_from(self.nonce).map_err(|_| self.invalid("nonce overflows u64"))?;
        let authorization = Authorization {
            chain_id: self.chain_id,
            address: self.address,
            nonce,
        };
        Ok(SignedAuthorization::new_unchecked(
            authorization,
            self.y_parity()?,
            self.r,
            self.s,
        ))
    }

    fn invalid(&self, reason: &'static str) -> FixtureError {
        FixtureError::InvalidAuthorization {
            address: self.address,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn authorization(v: u64) -> TestAuthorization {
        serde_json::from_value(serde_json::json!({
            "chainId": "0x01",
            "address": "0x000000000000000000000000000000000000aaaa",
            "nonce": "0x00",
            "v": format!("{v:#x}"),
            "r": "0x01",
            "s": "0x02",
        }))
        .unwrap()
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(27, 0)]
    #[case(28, 1)]
    fn parity_is_normalized(#[case] v: u64, #[case] expected: u8) {
        assert_eq!(authorization(v).y_parity().unwrap(), expected);
    }

    #[test]
    fn bad_parity_is_rejected() {
        assert!(matches!(
            authorization(2).into_signed(),
            Err(FixtureError::InvalidAuthorization { .. })
        ));
    }

    #[test]
    fn signed_keeps_fields() {
        let signed = authorization(1).into_signed().unwrap();
        assert_eq!(signed.chain_id, U256::from(1));
        assert_eq!(signed.nonce, 0);
        assert_eq!(signed.y_parity(), 1);
        assert_eq!(signed.r(), U256::from(1));
        assert_eq!(signed.s(), U256::from(2));
    }
}
