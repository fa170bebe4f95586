//! Denominated amounts and coin sets.
//!
//! A [Coins] set is always sorted by denom, holds at most one entry per denom and never holds a
//! zero amount. Every constructor and arithmetic operation preserves that shape, so equality and
//! encoding are canonical.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, Write};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};
use thiserror::Error;

use crate::codec::{read_len, read_string, read_u128, string_encode_size, write_string, write_u128};

pub const MIN_DENOM_LENGTH: usize = 3;
pub const MAX_DENOM_LENGTH: usize = 128;
/// Maximum number of distinct denoms in an encoded [Coins] set.
pub const MAX_COINS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinError {
    #[error("invalid denom: {0:?}")]
    InvalidDenom(String),
    #[error("invalid coin: {0:?}")]
    InvalidCoin(String),
    #[error("duplicate denom: {0}")]
    DuplicateDenom(String),
    #[error("coin amount overflow for denom {0}")]
    Overflow(String),
    #[error("insufficient {denom}: have {have}, need {need}")]
    Negative { denom: String, have: u128, need: u128 },
}

/// Check a denom against the chain's denom rules: a leading ASCII letter followed by letters,
/// digits or one of `/:._-`, between 3 and 128 bytes.
pub fn validate_denom(denom: &str) -> Result<(), CoinError> {
    let len = denom.len();
    let mut chars = denom.chars();
    let valid = (MIN_DENOM_LENGTH..=MAX_DENOM_LENGTH).contains(&len)
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
    if !valid {
        return Err(CoinError::InvalidDenom(denom.to_string()));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Result<Self, CoinError> {
        let denom = denom.into();
        validate_denom(&denom)?;
        Ok(Self { denom, amount })
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn checked_add(&self, other: &Coin) -> Result<Coin, CoinError> {
        if self.denom != other.denom {
            return Err(CoinError::InvalidCoin(format!("{self} + {other}")));
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| CoinError::Overflow(self.denom.clone()))?;
        Ok(Coin {
            denom: self.denom.clone(),
            amount,
        })
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Parses `<amount><denom>`, e.g. `1905nhash`.
impl FromStr for Coin {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoinError::InvalidCoin(s.to_string()))?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty() {
            return Err(CoinError::InvalidCoin(s.to_string()));
        }
        let amount = amount
            .parse::<u128>()
            .map_err(|_| CoinError::InvalidCoin(s.to_string()))?;
        Coin::new(denom, amount)
    }
}

impl TryFrom<String> for Coin {
    type Error = CoinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Coin> for String {
    fn from(coin: Coin) -> Self {
        coin.to_string()
    }
}

impl Write for Coin {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.denom, writer);
        write_u128(self.amount, writer);
    }
}

impl Read for Coin {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let denom = read_string(reader, MAX_DENOM_LENGTH)?;
        validate_denom(&denom).map_err(|_| Error::Invalid("Coin", "invalid denom"))?;
        let amount = read_u128(reader)?;
        Ok(Self { denom, amount })
    }
}

impl EncodeSize for Coin {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.denom) + 16
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coin>", into = "Vec<Coin>")]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a set from arbitrary coins. Zero amounts are dropped; a denom appearing twice is
    /// rejected rather than merged.
    pub fn new(coins: Vec<Coin>) -> Result<Self, CoinError> {
        let mut coins: Vec<Coin> = coins.into_iter().filter(|c| !c.is_zero()).collect();
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        for pair in coins.windows(2) {
            if pair[0].denom == pair[1].denom {
                return Err(CoinError::DuplicateDenom(pair[0].denom.clone()));
            }
        }
        for coin in &coins {
            validate_denom(&coin.denom)?;
        }
        Ok(Self(coins))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .binary_search_by(|c| c.denom.as_str().cmp(denom))
            .map(|idx| self.0[idx].amount)
            .unwrap_or(0)
    }

    /// Add a single coin, keeping the set canonical.
    pub fn checked_add_coin(&self, coin: &Coin) -> Result<Coins, CoinError> {
        let mut out = self.clone();
        if coin.is_zero() {
            return Ok(out);
        }
        match out.0.binary_search_by(|c| c.denom.cmp(&coin.denom)) {
            Ok(idx) => out.0[idx] = out.0[idx].checked_add(coin)?,
            Err(idx) => out.0.insert(idx, coin.clone()),
        }
        Ok(out)
    }

    pub fn checked_add(&self, other: &Coins) -> Result<Coins, CoinError> {
        other
            .iter()
            .try_fold(self.clone(), |acc, coin| acc.checked_add_coin(coin))
    }

    /// Subtract `other`, failing if any denom would go negative.
    pub fn checked_sub(&self, other: &Coins) -> Result<Coins, CoinError> {
        let mut out = Vec::with_capacity(self.0.len());
        for coin in other.iter() {
            let have = self.amount_of(&coin.denom);
            if have < coin.amount {
                return Err(CoinError::Negative {
                    denom: coin.denom.clone(),
                    have,
                    need: coin.amount,
                });
            }
        }
        for coin in self.iter() {
            let amount = coin.amount - other.amount_of(&coin.denom);
            if amount > 0 {
                out.push(Coin {
                    denom: coin.denom.clone(),
                    amount,
                });
            }
        }
        Ok(Coins(out))
    }

    /// True when every denom of `other` is covered by at least the same amount here.
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.iter().all(|c| self.amount_of(&c.denom) >= c.amount)
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        if coin.is_zero() {
            Coins::empty()
        } else {
            Coins(vec![coin])
        }
    }
}

impl TryFrom<Vec<Coin>> for Coins {
    type Error = CoinError;

    fn try_from(coins: Vec<Coin>) -> Result<Self, Self::Error> {
        Coins::new(coins)
    }
}

impl From<Coins> for Vec<Coin> {
    fn from(coins: Coins) -> Self {
        coins.0
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coin) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{coin}")?;
        }
        Ok(())
    }
}

/// Parses a comma separated list such as `100stake,5usd`. The empty string is the empty set.
impl FromStr for Coins {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Coins::empty());
        }
        let coins = s
            .split(',')
            .map(Coin::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Coins::new(coins)
    }
}

impl Write for Coins {
    fn write(&self, writer: &mut impl BufMut) {
        (self.0.len() as u32).write(writer);
        for coin in &self.0 {
            coin.write(writer);
        }
    }
}

impl Read for Coins {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let len = read_len(reader, MAX_COINS, "Coins")?;
        let mut coins = Vec::with_capacity(len);
        for _ in 0..len {
            coins.push(Coin::read_cfg(reader, &())?);
        }
        // Only the canonical form is accepted so that encodings are unique.
        let sorted = coins
            .windows(2)
            .all(|pair| pair[0].denom.cmp(&pair[1].denom) == Ordering::Less);
        if !sorted || coins.iter().any(Coin::is_zero) {
            return Err(Error::Invalid("Coins", "not canonical"));
        }
        Ok(Coins(coins))
    }
}

impl EncodeSize for Coins {
    fn encode_size(&self) -> usize {
        4 + self.0.iter().map(EncodeSize::encode_size).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    fn coins(s: &str) -> Coins {
        s.parse().expect("valid coins")
    }

    #[test]
    fn parse_coin() {
        let coin: Coin = "1905nhash".parse().unwrap();
        assert_eq!(coin.denom, "nhash");
        assert_eq!(coin.amount, 1905);
        assert_eq!(coin.to_string(), "1905nhash");

        assert!("nhash".parse::<Coin>().is_err());
        assert!("100".parse::<Coin>().is_err());
        assert!("10x".parse::<Coin>().is_err());
        assert!("10 stake".parse::<Coin>().is_err());
    }

    #[test]
    fn denom_rules() {
        assert!(validate_denom("stake").is_ok());
        assert!(validate_denom("ibc/27394FB092D2ECCD").is_ok());
        assert!(validate_denom("ab").is_err());
        assert!(validate_denom("1abc").is_err());
        assert!(validate_denom("ab$c").is_err());
    }

    #[test]
    fn coins_are_canonical() {
        let set = coins("5usd,0atom,100stake");
        assert_eq!(set.to_string(), "100stake,5usd");
        assert_eq!(set.len(), 2);
        assert!(matches!(
            "1stake,2stake".parse::<Coins>(),
            Err(CoinError::DuplicateDenom(_))
        ));
    }

    #[test]
    fn add_and_sub() {
        let a = coins("100stake");
        let b = coins("10stake,3usd");
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum, coins("110stake,3usd"));
        assert_eq!(sum.checked_sub(&b).unwrap(), a);

        let err = a.checked_sub(&b).unwrap_err();
        assert!(matches!(err, CoinError::Negative { ref denom, .. } if denom == "usd"));
    }

    #[test]
    fn add_overflow_is_reported() {
        let max = Coins::from(Coin::new("stake", u128::MAX).unwrap());
        let one = Coin::new("stake", 1).unwrap();
        assert_eq!(
            max.checked_add_coin(&one).unwrap_err(),
            CoinError::Overflow("stake".to_string())
        );
    }

    #[test]
    fn is_all_gte() {
        let have = coins("100stake,5usd");
        assert!(have.is_all_gte(&coins("100stake")));
        assert!(have.is_all_gte(&Coins::empty()));
        assert!(!have.is_all_gte(&coins("101stake")));
        assert!(!have.is_all_gte(&coins("1atom")));
    }

    #[test]
    fn decode_rejects_unsorted_sets() {
        let mut encoded = Vec::new();
        2u32.write(&mut encoded);
        Coin::new("usd", 1).unwrap().write(&mut encoded);
        Coin::new("stake", 1).unwrap().write(&mut encoded);
        assert!(Coins::decode(encoded.as_slice()).is_err());

        let canonical = coins("1stake,1usd");
        let decoded = Coins::decode(canonical.encode()).unwrap();
        assert_eq!(decoded, canonical);
    }

    #[test]
    fn serde_uses_coin_strings() {
        let set = coins("100stake,5usd");
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["100stake","5usd"]"#);
        let back: Coins = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
