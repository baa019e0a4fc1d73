use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The block context an `eth_call` is evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlockNumber {
    #[default]
    Latest,
    Earliest,
    Pending,
    Safe,
    Finalized,
    Number(u64),
}

impl FromStr for BlockNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<BlockNumber, String> {
        Ok(match s.to_lowercase().as_str() {
            "latest" => Self::Latest,
            "earliest" => Self::Earliest,
            "pending" => Self::Pending,
            "safe" => Self::Safe,
            "finalized" => Self::Finalized,
            n => {
                let digits = n
                    .strip_prefix("0x")
                    .ok_or_else(|| format!("block number must be 0x-prefixed: {s}"))?;
                let number = u64::from_str_radix(digits, 16)
                    .map_err(|e| format!("invalid block number {s}: {e}"))?;
                BlockNumber::Number(number)
            }
        })
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockNumber::Latest => f.write_str("latest"),
            BlockNumber::Earliest => f.write_str("earliest"),
            BlockNumber::Pending => f.write_str("pending"),
            BlockNumber::Safe => f.write_str("safe"),
            BlockNumber::Finalized => f.write_str("finalized"),
            BlockNumber::Number(n) => write!(f, "0x{n:x}"),
        }
    }
}

impl Serialize for BlockNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}
