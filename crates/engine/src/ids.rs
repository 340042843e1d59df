//! Human-facing identifier generation.
//!
//! Account numbers and transaction ids are random, so the engine checks
//! each candidate against the store and asks for a new one on collision (see
//! `EngineBuilder::max_id_attempts`). Implement [`IdGenerator`] to make ids
//! deterministic.

use chrono::{DateTime, Utc};
use rand::Rng;

pub const ACCOUNT_NUMBER_LEN: usize = 10;

pub trait IdGenerator: Send + Sync {
    /// A candidate account number: 10 decimal digits.
    fn account_number(&self) -> String;

    /// A candidate transaction id: `TX`, the last 6 digits of `now` in epoch
    /// milliseconds, then 4 zero-padded random digits.
    fn transaction_id(&self, now: DateTime<Utc>) -> String;
}

/// Default generator backed by the thread-local RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn account_number(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..ACCOUNT_NUMBER_LEN)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    fn transaction_id(&self, now: DateTime<Utc>) -> String {
        let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
        format_transaction_id(now, suffix)
    }
}

/// Builds `TX` + 6 timestamp digits + 4 suffix digits.
pub fn format_transaction_id(now: DateTime<Utc>, suffix: u16) -> String {
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    format!("TX{millis:06}{:04}", suffix % 10_000)
}

pub fn is_account_number(value: &str) -> bool {
    value.len() == ACCOUNT_NUMBER_LEN && value.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_transaction_id(value: &str) -> bool {
    value
        .strip_prefix("TX")
        .is_some_and(|digits| digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn random_account_numbers_are_ten_digits() {
        for _ in 0..100 {
            assert!(is_account_number(&RandomIds.account_number()));
        }
    }

    #[test]
    fn random_transaction_ids_match_format() {
        for _ in 0..100 {
            assert!(is_transaction_id(&RandomIds.transaction_id(Utc::now())));
        }
    }

    #[test]
    fn transaction_id_uses_last_six_millis_digits() {
        let at = Utc.timestamp_millis_opt(1_705_312_345_678).unwrap();
        assert_eq!(format_transaction_id(at, 42), "TX3456780042");
        let early = Utc.timestamp_millis_opt(1_000_007).unwrap();
        assert_eq!(format_transaction_id(early, 9999), "TX0000079999");
    }

    #[test]
    fn validators_reject_malformed_values() {
        assert!(!is_account_number("12345"));
        assert!(!is_account_number("12345abcde"));
        assert!(!is_transaction_id("TX12345"));
        assert!(!is_transaction_id("XX1234567890"));
    }
}
