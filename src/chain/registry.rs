use ethers::types::{Address, H256};
use ethers::utils::to_checksum;
use serde::Serialize;
use std::str::FromStr;
use url::Url;

use crate::math::units::shorten_hex;

pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Deployed contract set on one chain.
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    pub chain_id: u64,
    pub kala_money: Address,
    pub kala_hook: Address,
    pub pool_manager: Address,
    pub state_view: Address,
    pub pool_modify_liquidity_test: Address,
    pub deployment_block: u64,
}

/// Address and chain of one deployed contract. Contract handles on both the
/// read and write side are built from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContractConfig {
    pub address: Address,
    pub chain_id: u64,
}

impl Deployment {
    /// Built-in addresses for a known chain id.
    pub fn for_chain(chain_id: u64) -> Option<Self> {
        match chain_id {
            SEPOLIA_CHAIN_ID => Some(Deployment {
                chain_id,
                kala_money: addr("0xAF53484b277e9b7e9Fb224D2e534ee9beB68B7BA"),
                kala_hook: addr("0x3485cE0473ABcefAFF025aa7aCed6438d3d84080"),
                pool_manager: addr("0xE03A1074c86CFeDd5C142C4F04F1a1536e203543"),
                state_view: addr("0xE1Dd9c3fA50EDB962E442f60DfBc432e24537E4C"),
                pool_modify_liquidity_test: addr("0x0C478023803a644c94c4CE1C1e7b9A087e411B0A"),
                deployment_block: 10_181_655,
            }),
            _ => None,
        }
    }

    pub fn kala_money_config(&self) -> ContractConfig {
        ContractConfig { address: self.kala_money, chain_id: self.chain_id }
    }

    pub fn kala_hook_config(&self) -> ContractConfig {
        ContractConfig { address: self.kala_hook, chain_id: self.chain_id }
    }

    pub fn state_view_config(&self) -> ContractConfig {
        ContractConfig { address: self.state_view, chain_id: self.chain_id }
    }

    pub fn modify_liquidity_config(&self) -> ContractConfig {
        ContractConfig { address: self.pool_modify_liquidity_test, chain_id: self.chain_id }
    }

    /// Apply per-contract overrides; `None` keeps the built-in address.
    pub fn with_overrides(mut self, overrides: &AddressOverrides) -> Self {
        if let Some(a) = overrides.kala_money {
            self.kala_money = a;
        }
        if let Some(a) = overrides.kala_hook {
            self.kala_hook = a;
        }
        if let Some(a) = overrides.pool_manager {
            self.pool_manager = a;
        }
        if let Some(a) = overrides.state_view {
            self.state_view = a;
        }
        if let Some(a) = overrides.pool_modify_liquidity_test {
            self.pool_modify_liquidity_test = a;
        }
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddressOverrides {
    pub kala_money: Option<Address>,
    pub kala_hook: Option<Address>,
    pub pool_manager: Option<Address>,
    pub state_view: Option<Address>,
    pub pool_modify_liquidity_test: Option<Address>,
}

/// Block explorer links for transactions and addresses.
#[derive(Debug, Clone)]
pub struct Explorer {
    base: Url,
}

impl Explorer {
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Explorer { base })
    }

    pub fn tx_url(&self, hash: H256) -> String {
        self.link(&format!("tx/{:?}", hash))
    }

    pub fn address_url(&self, address: Address) -> String {
        self.link(&format!("address/{}", to_checksum(&address, None)))
    }

    fn link(&self, path: &str) -> String {
        self.base
            .join(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base, path))
    }
}

/// `0x123456...abcdef`
pub fn short_tx_hash(hash: H256) -> String {
    shorten_hex(&format!("{:?}", hash), 8, 6)
}

/// `0x1234...abcd`
pub fn short_address(address: Address) -> String {
    shorten_hex(&to_checksum(&address, None), 6, 4)
}

fn addr(s: &str) -> Address {
    Address::from_str(s).expect("Failed to parse built-in address")
}
