//! Process configuration: the secrets file, transaction options, and the
//! address books read and written by the scripts

use std::{
    collections::HashMap,
    fs,
    path::Path,
    str::FromStr,
};

use alloy::primitives::Address;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    constants::{DEFAULT_GAS_PRICE_GWEI, DEPLOYMENTS_KEY, WEI_PER_GWEI},
    errors::ScriptError,
};

/// Read a file to a string, mapping errors to [`ScriptError::ReadFile`]
fn read_file(path: &Path) -> Result<String, ScriptError> {
    fs::read_to_string(path)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", path.display())))
}

// -----------
// | Secrets |
// -----------

/// The contents of the local secrets file
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secrets {
    /// The private key transactions are signed with
    pub sender_key: String,
    /// The block explorer API key
    pub etherscan_key: String,
    /// The default gas price, in gwei
    #[serde(default)]
    pub gas_price: Option<f64>,
    /// The default gas limit
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Governor addresses by name
    #[serde(default)]
    pub governors: HashMap<String, Address>,
}

impl Secrets {
    /// Load the secrets file at `path`
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let contents = read_file(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| ScriptError::Config(format!("malformed secrets file: {e}")))
    }
}

// Secrets must never end up in logs
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("gas_price", &self.gas_price)
            .field("gas_limit", &self.gas_limit)
            .field("governors", &self.governors)
            .finish_non_exhaustive()
    }
}

// --------------
// | Tx Options |
// --------------

/// Options applied to every transaction the scripts send
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxOptions {
    /// The gas price, in wei
    pub gas_price: u128,
    /// The gas limit, if fixed; estimated otherwise
    pub gas_limit: Option<u64>,
}

impl TxOptions {
    /// Resolve transaction options, preferring explicit overrides over the
    /// secrets file and falling back to 1 gwei
    pub fn resolve(
        gas_price_gwei: Option<f64>,
        gas_limit: Option<u64>,
        secrets: &Secrets,
    ) -> Result<Self, ScriptError> {
        let gwei = gas_price_gwei
            .or(secrets.gas_price)
            .unwrap_or(DEFAULT_GAS_PRICE_GWEI);
        if !gwei.is_finite() || gwei < 0.0 {
            return Err(ScriptError::Config(format!("invalid gas price: {gwei} gwei")));
        }

        Ok(TxOptions {
            gas_price: (gwei * WEI_PER_GWEI).round() as u128,
            gas_limit: gas_limit.or(secrets.gas_limit),
        })
    }
}

// -------------------
// | Chain Addresses |
// -------------------

/// Known contract addresses keyed by chain ID, then by name
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct ChainAddresses(HashMap<String, HashMap<String, Address>>);

impl ChainAddresses {
    /// Load the addresses file at `path`, or an empty book if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ScriptError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = read_file(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| ScriptError::Config(format!("malformed addresses file: {e}")))
    }

    /// Look up the address registered under `key` for `chain_id`
    pub fn address(&self, chain_id: u64, key: &str) -> Result<Address, ScriptError> {
        self.0
            .get(&chain_id.to_string())
            .and_then(|addrs| addrs.get(key))
            .copied()
            .ok_or_else(|| {
                ScriptError::Config(format!("no address for `{key}` on chain {chain_id}"))
            })
    }

    /// Interpret `value` as a literal address, or else as a key into the book
    pub fn resolve(&self, chain_id: u64, value: &str) -> Result<Address, ScriptError> {
        match Address::from_str(value) {
            Ok(addr) => Ok(addr),
            Err(_) => self.address(chain_id, value),
        }
    }
}

// ---------------
// | Deployments |
// ---------------

/// Record a deployed address under `key` in the deployments file at `path`,
/// creating the file if needed
pub fn write_deployed_address(
    path: &Path,
    key: &str,
    address: Address,
) -> Result<(), ScriptError> {
    let mut parsed: Value = if path.exists() {
        serde_json::from_str(&read_file(path)?).map_err(|e| ScriptError::Serde(e.to_string()))?
    } else {
        Value::Object(Default::default())
    };

    let Some(root) = parsed.as_object_mut() else {
        return Err(ScriptError::WriteFile(format!(
            "{} does not contain a JSON object",
            path.display()
        )));
    };
    let deployments = root
        .entry(DEPLOYMENTS_KEY)
        .or_insert_with(|| Value::Object(Default::default()));
    let Some(deployments) = deployments.as_object_mut() else {
        return Err(ScriptError::WriteFile(format!(
            "`{DEPLOYMENTS_KEY}` in {} is not an object",
            path.display()
        )));
    };
    deployments.insert(key.to_string(), Value::String(format!("{address:#x}")));

    let out = serde_json::to_string_pretty(&parsed).map_err(|e| ScriptError::Serde(e.to_string()))?;
    fs::write(path, out).map_err(|e| ScriptError::WriteFile(e.to_string()))
}
