use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

use super::hash;

pub const ADDRESS_SIZE: usize = 20;
pub const ADDRESS_PREFIX: &str = "z1";

// First byte of the address tells who owns the chain
pub const USER_ADDRESS_BYTE: u8 = 0;
pub const EMBEDDED_ADDRESS_BYTE: u8 = 2;

#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Hash, Default)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Address(bytes)
    }

    pub const fn zero() -> Self {
        Address([0; ADDRESS_SIZE])
    }

    // User addresses are the blake3 digest of the public key, truncated
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest = hash(public_key);
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes[0] = USER_ADDRESS_BYTE;
        bytes[1..].copy_from_slice(&digest.as_bytes()[..ADDRESS_SIZE - 1]);
        Address(bytes)
    }

    // Embedded contracts live at fixed, human-assigned addresses
    pub const fn embedded(tag: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes[0] = EMBEDDED_ADDRESS_BYTE;
        bytes[ADDRESS_SIZE - 1] = tag;
        Address(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; ADDRESS_SIZE]
    }

    pub fn is_embedded(&self) -> bool {
        self.0[0] == EMBEDDED_ADDRESS_BYTE
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", ADDRESS_PREFIX, self.to_hex())
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(ADDRESS_PREFIX).ok_or("Missing address prefix")?;
        let bytes = hex::decode(raw).map_err(|_| "Invalid hex string")?;
        let bytes: [u8; ADDRESS_SIZE] = bytes.try_into().map_err(|_| "Invalid address length")?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'a> Deserialize<'a> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(SerdeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_and_embedded_addresses() {
        let user = Address::from_public_key(&[7u8; 32]);
        assert!(!user.is_embedded());
        assert!(!user.is_zero());

        let contract = Address::embedded(1);
        assert!(contract.is_embedded());
        assert_ne!(user, contract);
    }

    #[test]
    fn test_address_display_roundtrip() {
        let user = Address::from_public_key(&[9u8; 32]);
        let text = user.to_string();
        assert!(text.starts_with(ADDRESS_PREFIX));
        assert_eq!(text.parse::<Address>().unwrap(), user);
        assert!("0011".parse::<Address>().is_err());
    }
}
