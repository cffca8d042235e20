//! Chain identifiers and the permitted condition-chain table.
//!
//! On-chain conditions (`time`, `rpc`, `contract`) name the EVM chain they
//! read from by its numeric EIP-155 chain id. Schema validation only accepts
//! chains present in the permitted table; the production defaults are the
//! chains the surrounding network supports, and test harnesses extend the
//! table with their local chain ids.
//!
//! The table is read-only during evaluation. Writers (tests, reconfiguration)
//! extend it atomically behind a lock; readers never observe a partially
//! updated table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{LazyLock, RwLock};

/// A numeric EIP-155 chain identifier.
///
/// # Serialization
///
/// Serializes to a bare JSON integer. String forms are rejected, so
/// `{"chain": "137"}` fails schema validation while `{"chain": 137}` passes.
///
/// ```
/// use lingo_types::chain::ChainId;
///
/// let chain: ChainId = serde_json::from_str("137").unwrap();
/// assert_eq!(chain, ChainId::new(137));
/// assert!(serde_json::from_str::<ChainId>("\"137\"").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    /// Creates a chain id from its numeric value.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Chains permitted for condition evaluation, keyed by chain id with a
/// human-readable label for diagnostics.
static CONDITION_CHAINS: LazyLock<RwLock<BTreeMap<ChainId, String>>> = LazyLock::new(|| {
    RwLock::new(
        [
            (ChainId::new(1), "ethereum/mainnet".to_string()),
            (ChainId::new(11155111), "ethereum/sepolia".to_string()),
            (ChainId::new(137), "polygon/mainnet".to_string()),
            (ChainId::new(80002), "polygon/amoy".to_string()),
        ]
        .into_iter()
        .collect(),
    )
});

/// Returns true when `chain` is in the permitted table.
pub fn is_permitted_chain(chain: ChainId) -> bool {
    CONDITION_CHAINS
        .read()
        .expect("condition chain table lock")
        .contains_key(&chain)
}

/// Adds entries to the permitted table. Intended for test harnesses running
/// against local chains; existing entries are preserved.
pub fn permit_chains<I>(chains: I)
where
    I: IntoIterator<Item = (ChainId, String)>,
{
    CONDITION_CHAINS
        .write()
        .expect("condition chain table lock")
        .extend(chains);
}
