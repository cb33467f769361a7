//! RPC client setup and dynamic contract handles

use std::str::FromStr;

use alloy::{
    contract::{ContractInstance, Interface},
    dyn_abi::DynSolValue,
    network::Ethereum,
    primitives::{Address, Bytes},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use tracing::info;

use crate::{artifacts::ContractArtifact, config::TxOptions, errors::ScriptError};

/// The provider type used by the scripts
pub type Wallet = DynProvider<Ethereum>;

/// A signing RPC client along with the identity it signs for
#[derive(Clone)]
pub struct Client {
    /// The signing provider
    pub provider: Wallet,
    /// The address transactions are sent from
    pub sender: Address,
    /// The chain ID reported by the node
    pub chain_id: u64,
}

/// Sets up a signing client from the private key and RPC URL, fetching the
/// chain ID from the node
pub async fn setup_client(priv_key: &str, rpc_url: &str) -> Result<Client, ScriptError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let sender = signer.address();

    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let provider = DynProvider::new(ProviderBuilder::new().wallet(signer).connect_http(url));

    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    info!("Sending from {sender} on chain {chain_id}");

    Ok(Client {
        provider,
        sender,
        chain_id,
    })
}

/// A provider with no signer attached, sending transactions from accounts
/// the node has unlocked
pub fn unlocked_provider(rpc_url: &str) -> Result<Wallet, ScriptError> {
    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    Ok(DynProvider::new(ProviderBuilder::new().connect_http(url)))
}

/// Fail unless the receipt reports a successful execution
pub fn ensure_success(receipt: &TransactionReceipt, what: &str) -> Result<(), ScriptError> {
    if receipt.status() {
        Ok(())
    } else {
        Err(ScriptError::ContractInteraction(format!(
            "{what} reverted in tx {:#x}",
            receipt.transaction_hash
        )))
    }
}

/// A callable contract bound to an address, its compiled artifact and a
/// provider
#[derive(Clone, Debug)]
pub struct ContractHandle {
    /// The compiled artifact the contract was built from
    artifact: ContractArtifact,
    /// The on-chain address of the contract
    address: Address,
    /// The provider calls are made through
    provider: Wallet,
}

impl ContractHandle {
    /// Bind an artifact to an address
    pub fn new(artifact: ContractArtifact, address: Address, provider: Wallet) -> Self {
        Self {
            artifact,
            address,
            provider,
        }
    }

    /// The contract address
    pub fn address(&self) -> Address {
        self.address
    }

    /// A dynamic contract instance over the artifact's ABI
    fn instance(&self) -> ContractInstance<Wallet> {
        ContractInstance::new(
            self.address,
            self.provider.clone(),
            Interface::new(self.artifact.abi.clone()),
        )
    }

    /// ABI-encode a call to `method`
    pub fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes, ScriptError> {
        let calldata = Interface::new(self.artifact.abi.clone())
            .encode_input(method, args)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
        Ok(calldata.into())
    }

    /// Perform a read-only call to `method`
    pub async fn call(
        &self,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ScriptError> {
        let instance = self.instance();
        instance
            .function(method, args)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?
            .call()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    /// Send a transaction calling `method` and wait for a successful receipt
    pub async fn transact(
        &self,
        method: &str,
        args: &[DynSolValue],
        opts: &TxOptions,
    ) -> Result<TransactionReceipt, ScriptError> {
        let instance = self.instance();
        let mut call = instance
            .function(method, args)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?
            .gas_price(opts.gas_price);
        if let Some(gas_limit) = opts.gas_limit {
            call = call.gas(gas_limit);
        }

        let receipt = call
            .send()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        ensure_success(&receipt, method)?;
        Ok(receipt)
    }
}
