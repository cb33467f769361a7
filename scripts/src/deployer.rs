//! Contract deployment, tracking every deployment for later verification

use std::time::Duration;

use alloy::{
    dyn_abi::DynSolValue,
    network::TransactionBuilder,
    primitives::Address,
    providers::Provider,
    rpc::types::{Log, TransactionReceipt, TransactionRequest},
};
use itertools::Itertools;
use tracing::info;

use crate::{
    artifacts::{ArtifactId, ArtifactLoader, ContractArtifact},
    client::{Client, ContractHandle},
    config::TxOptions,
    constants::{TRANSFORMER_DEPLOY_METHOD, TRANSFORMER_NAMESPACE},
    errors::ScriptError,
    queue::{SourceVerifier, VerificationQueue, VerificationRecord},
    solidity::ITransformerDeployer,
};

/// The result of deploying a contract
#[derive(Clone, Debug)]
pub struct Deployment {
    /// The deployed address
    pub address: Address,
    /// A handle on the deployed contract
    pub contract: ContractHandle,
    /// The arguments the contract was constructed with
    pub constructor_args: Vec<DynSolValue>,
}

/// Deploys contracts and owns the queue of deployments awaiting verification
pub struct Deployer {
    /// The signing client
    client: Client,
    /// Resolves artifacts by identifier
    loader: ArtifactLoader,
    /// Options applied to every transaction
    tx_opts: TxOptions,
    /// Deployments awaiting verification
    queue: VerificationQueue,
}

impl Deployer {
    /// Create a deployer that records its deployments onto `queue`
    pub fn new(
        client: Client,
        loader: ArtifactLoader,
        tx_opts: TxOptions,
        queue: VerificationQueue,
    ) -> Self {
        Self {
            client,
            loader,
            tx_opts,
            queue,
        }
    }

    /// The signing client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The artifact loader
    pub fn loader(&self) -> &ArtifactLoader {
        &self.loader
    }

    /// The transaction options
    pub fn tx_opts(&self) -> &TxOptions {
        &self.tx_opts
    }

    /// Deployments awaiting verification
    pub fn queue(&self) -> &VerificationQueue {
        &self.queue
    }

    /// A handle on an already-deployed contract
    pub fn contract(
        &self,
        id: &ArtifactId,
        address: Address,
    ) -> Result<ContractHandle, ScriptError> {
        let artifact = self.loader.artifact(id)?;
        Ok(ContractHandle::new(
            artifact,
            address,
            self.client.provider.clone(),
        ))
    }

    /// Deploy the contract built from `id` and queue it for verification
    pub async fn deploy(
        &mut self,
        id: &ArtifactId,
        constructor_args: Vec<DynSolValue>,
    ) -> Result<Deployment, ScriptError> {
        let artifact = self.loader.artifact(id)?;
        let deploy_data = artifact.encode_deploy_data(&constructor_args)?;

        let mut tx = TransactionRequest::default()
            .with_deploy_code(deploy_data)
            .with_gas_price(self.tx_opts.gas_price);
        if let Some(gas_limit) = self.tx_opts.gas_limit {
            tx = tx.with_gas_limit(gas_limit);
        }

        let receipt = self
            .client
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

        self.record_creation(id, artifact, &receipt, constructor_args)
    }

    /// Check a creation receipt and queue the created contract for
    /// verification
    fn record_creation(
        &mut self,
        id: &ArtifactId,
        artifact: ContractArtifact,
        receipt: &TransactionReceipt,
        constructor_args: Vec<DynSolValue>,
    ) -> Result<Deployment, ScriptError> {
        if !receipt.status() {
            return Err(ScriptError::ContractDeployment(format!(
                "creation of {id} reverted in tx {:#x}",
                receipt.transaction_hash
            )));
        }
        let address = receipt.contract_address.ok_or_else(|| {
            ScriptError::ContractDeployment(format!("no contract address in receipt for {id}"))
        })?;
        info!(
            "Deployed {id} at {address} ({})",
            constructor_args.iter().map(|a| format!("{a:?}")).join(", ")
        );

        self.queue.enqueue(VerificationRecord {
            artifact: id.clone(),
            address,
            constructor_args: constructor_args.clone(),
        });

        Ok(Deployment {
            address,
            contract: ContractHandle::new(artifact, address, self.client.provider.clone()),
            constructor_args,
        })
    }

    /// Deploy a transformer through an already-deployed transformer deployer,
    /// and queue it for verification
    ///
    /// The address is read from the deployer's `Deployed` event.
    pub async fn deploy_transformer(
        &mut self,
        deployer: &ContractHandle,
        transformer_name: &str,
        constructor_args: Vec<DynSolValue>,
    ) -> Result<Address, ScriptError> {
        let id = ArtifactId::new(TRANSFORMER_NAMESPACE, transformer_name);
        let deploy_data = self
            .loader
            .artifact(&id)?
            .encode_deploy_data(&constructor_args)?;

        let receipt = deployer
            .transact(
                TRANSFORMER_DEPLOY_METHOD,
                &[DynSolValue::Bytes(deploy_data.to_vec())],
                &self.tx_opts,
            )
            .await?;

        self.record_transformer(id, receipt.inner.logs(), deployer.address(), constructor_args)
    }

    /// Read a transformer's address from its deployer's logs and queue it for
    /// verification
    fn record_transformer(
        &mut self,
        id: ArtifactId,
        logs: &[Log],
        deployer: Address,
        constructor_args: Vec<DynSolValue>,
    ) -> Result<Address, ScriptError> {
        let address = find_deployed_address(logs, deployer)?;
        info!("Deployed transformer {}: {address}", id.name);

        self.queue.enqueue(VerificationRecord {
            artifact: id,
            address,
            constructor_args,
        });
        Ok(address)
    }

    /// Verify every queued deployment, see [`VerificationQueue::drain_all`]
    pub async fn verify_queued_sources<V: SourceVerifier>(
        &mut self,
        verifier: &V,
        delay: Duration,
    ) -> Result<usize, ScriptError> {
        self.queue.drain_all(verifier, delay).await
    }
}

/// Extract the deployed address from the `Deployed` event emitted by
/// `deployer` among `logs`
pub fn find_deployed_address(logs: &[Log], deployer: Address) -> Result<Address, ScriptError> {
    logs.iter()
        .filter(|log| log.address() == deployer)
        .find_map(|log| log.log_decode::<ITransformerDeployer::Deployed>().ok())
        .map(|log| log.inner.data.deployedAddress)
        .ok_or_else(|| {
            ScriptError::MissingEvent(format!("no `Deployed` event from deployer {deployer}"))
        })
}
