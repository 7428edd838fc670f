//! Reserve allocation and unit conversion.
//!
//! Both steps floor and both run on integers only. Allocating less than the
//! ratio allows is acceptable; allocating more never is.

use balance_oracle::BalanceReading;
use serde::Serialize;
use shared_config::{ReserveConfig, ReserveRatio};

/// Satoshis per bitcoin.
pub const BASE_UNIT_SCALE: u64 = 100_000_000;

/// What a single mint cycle is entitled to mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MintIntent {
    pub base_units_allocated: u64,
    /// Smallest token units, `token_decimals` fractional digits per whole token.
    pub token_units: u128,
    pub policy_ratio: ReserveRatio,
}

pub fn compute_mint_intent(reading: &BalanceReading, config: &ReserveConfig) -> MintIntent {
    let ratio = config.ratio();
    let base_units_allocated = ratio.apply_floor(reading.confirmed_balance_sats);
    MintIntent {
        base_units_allocated,
        token_units: base_units_to_token_units(base_units_allocated, config.token_decimals()),
        policy_ratio: ratio,
    }
}

/// `floor(base_units * 10^decimals / BASE_UNIT_SCALE)`.
///
/// `ReserveConfig` caps decimals at 18, which keeps the product of any `u64`
/// amount and `10^decimals` inside `u128`.
pub fn base_units_to_token_units(base_units: u64, token_decimals: u8) -> u128 {
    let token_scale = 10u128.pow(u32::from(token_decimals));
    u128::from(base_units) * token_scale / u128::from(BASE_UNIT_SCALE)
}
