//! Encoding and simulated execution of multisig governor call batches

use std::{fs, path::Path};

use alloy::{
    primitives::{Address, Bytes, U256},
    providers::ext::AnvilApi,
    rpc::types::TransactionReceipt,
    sol_types::SolValue,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    client::{ensure_success, Wallet},
    config::TxOptions,
    errors::ScriptError,
    solidity::IMultisigGovernor,
};

/// A single call in a governor batch
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GovernorCall {
    /// The call target
    pub to: Address,
    /// The ether value sent with the call
    #[serde(default)]
    pub value: U256,
    /// The calldata
    pub data: Bytes,
}

/// Load a call batch from a JSON array of `{to, value, data}` objects
pub fn read_governor_calls(path: &Path) -> Result<Vec<GovernorCall>, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&contents).map_err(|e| ScriptError::Serde(e.to_string()))
}

/// ABI-encode a call batch as `(bytes[] data, address[] to, uint256[] value)`,
/// the layout the governor executes
pub fn encode_governor_calls(calls: &[GovernorCall]) -> Bytes {
    let data: Vec<Bytes> = calls.iter().map(|c| c.data.clone()).collect();
    let to: Vec<Address> = calls.iter().map(|c| c.to).collect();
    let value: Vec<U256> = calls.iter().map(|c| c.value).collect();

    (data, to, value).abi_encode_params().into()
}

/// Submit, confirm and execute `calldata` on the governor through its owners'
/// unlocked accounts, returning the execution receipt
///
/// Only meaningful against a simulated node that has the owners unlocked.
pub async fn execute_with_unlocked_authorities(
    provider: &Wallet,
    governor: Address,
    calldata: Bytes,
    opts: &TxOptions,
) -> Result<TransactionReceipt, ScriptError> {
    let governor_contract = IMultisigGovernor::new(governor, provider);

    let owners = governor_contract
        .getOwners()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    let [submitter, confirmer, ..] = owners.as_slice() else {
        return Err(ScriptError::ContractInteraction(format!(
            "governor {governor} has {} owners, need at least 2",
            owners.len()
        )));
    };

    // Simulate the submission first to learn the transaction ID
    let submit = governor_contract
        .submitTransaction(governor, U256::ZERO, calldata)
        .from(*submitter)
        .gas_price(opts.gas_price);
    let tx_id = submit
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    let receipt = submit
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .get_receipt()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    ensure_success(&receipt, "submitTransaction")?;
    info!("Submitted governor txId: {tx_id}");

    let receipt = governor_contract
        .confirmTransaction(tx_id)
        .from(*confirmer)
        .gas_price(opts.gas_price)
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .get_receipt()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    ensure_success(&receipt, "confirmTransaction")?;

    advance_past_timelock(provider, governor).await?;

    let receipt = governor_contract
        .executeTransaction(tx_id)
        .from(*submitter)
        .gas_price(opts.gas_price)
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .get_receipt()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    ensure_success(&receipt, "executeTransaction")?;
    info!("Executed governor txId: {tx_id}");

    Ok(receipt)
}

/// Advance the simulated node's clock past the governor's timelock and mine a
/// block at the new time, returning the timelock in seconds
pub async fn advance_past_timelock(
    provider: &Wallet,
    governor: Address,
) -> Result<u64, ScriptError> {
    let timelock = IMultisigGovernor::new(governor, provider)
        .secondsTimeLocked()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    let seconds = u64::try_from(timelock).map_err(|_| {
        ScriptError::ContractInteraction(format!("governor timelock out of range: {timelock}"))
    })?;
    if seconds == 0 {
        return Ok(0);
    }

    provider
        .anvil_increase_time(seconds)
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    provider
        .evm_mine(None)
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    info!("Advanced time {seconds}s past the governor timelock");

    Ok(seconds)
}
