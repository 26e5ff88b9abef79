use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

pub const TOKEN_STANDARD_SIZE: usize = 10;
pub const TOKEN_STANDARD_PREFIX: &str = "zts1";

// Native coins of the network
pub const ZNN_TOKEN_STANDARD: TokenStandard = TokenStandard::native(1);
pub const QSR_TOKEN_STANDARD: TokenStandard = TokenStandard::native(2);

#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Hash, Default)]
pub struct TokenStandard([u8; TOKEN_STANDARD_SIZE]);

impl TokenStandard {
    pub const fn new(bytes: [u8; TOKEN_STANDARD_SIZE]) -> Self {
        TokenStandard(bytes)
    }

    const fn native(tag: u8) -> Self {
        let mut bytes = [0u8; TOKEN_STANDARD_SIZE];
        bytes[TOKEN_STANDARD_SIZE - 1] = tag;
        TokenStandard(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; TOKEN_STANDARD_SIZE]
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_STANDARD_SIZE] {
        &self.0
    }
}

impl Display for TokenStandard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", TOKEN_STANDARD_PREFIX, hex::encode(self.0))
    }
}

impl Debug for TokenStandard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenStandard({})", self)
    }
}

impl FromStr for TokenStandard {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix(TOKEN_STANDARD_PREFIX)
            .ok_or("Missing token standard prefix")?;
        let bytes = hex::decode(raw).map_err(|_| "Invalid hex string")?;
        let bytes: [u8; TOKEN_STANDARD_SIZE] =
            bytes.try_into().map_err(|_| "Invalid token standard length")?;
        Ok(TokenStandard(bytes))
    }
}

impl Serialize for TokenStandard {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'a> Deserialize<'a> for TokenStandard {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let s = String::deserialize(deserializer)?;
        TokenStandard::from_str(&s).map_err(SerdeError::custom)
    }
}
