//! Named accounts
//!
//! A plain name maps to the address of the ed25519 key seeded with it, so a
//! name always acts as the same account. Contract names resolve to the
//! deployed contract and `0x` input is taken as a literal address.

use anyhow::{bail, Result};
use dao_core::Address;
use dao_crypto::KeyPair;
use dao_runtime::World;

pub const DEPLOYER: &str = "deployer";

pub fn keypair(name: &str) -> KeyPair {
    KeyPair::from_seed(name)
}

pub fn deployer() -> Address {
    keypair(DEPLOYER).address()
}

pub fn resolve(world: &World, name: &str) -> Result<Address> {
    let name = name.trim();
    if name.is_empty() {
        bail!("empty account name");
    }
    if name.starts_with("0x") {
        return Ok(name.parse()?);
    }
    let contract = name.replace('-', "_");
    if let Some((_, address)) = world.contracts().into_iter().find(|(n, _)| *n == contract) {
        return Ok(address);
    }
    Ok(keypair(name).address())
}

/// Reverse lookup for display; contracts by name, everything else as hex
pub fn label(world: &World, address: Address) -> String {
    if address == deployer() {
        return DEPLOYER.to_string();
    }
    world
        .contracts()
        .into_iter()
        .find(|(_, a)| *a == address)
        .map(|(n, _)| n.to_string())
        .unwrap_or_else(|| address.to_string())
}
