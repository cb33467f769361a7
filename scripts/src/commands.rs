//! Implementations of the migration script commands

use std::{collections::HashMap, path::PathBuf, time::Duration};

use alloy::primitives::{Address, U256};
use tracing::{info, warn};

use crate::{
    artifacts::{ArtifactId, ArtifactLoader},
    cli::{
        DeployArgs, DeployTransformerArgs, GlobalArgs, GovernorCallsArgs, VerifyArgs,
        VerifyOptions,
    },
    client::{setup_client, unlocked_provider},
    config::{write_deployed_address, ChainAddresses, Secrets, TxOptions},
    constants::{DEFAULT_GOVERNOR_KEY, TRANSFORMER_DEPLOYER_NAME, TRANSFORMER_NAMESPACE},
    deployer::Deployer,
    errors::ScriptError,
    governance::{encode_governor_calls, execute_with_unlocked_authorities, read_governor_calls},
    queue::VerificationQueue,
    verifier::EtherscanVerifier,
};

/// Everything a command needs, built once at startup
pub struct ScriptContext {
    /// Deploys contracts and owns the verification queue
    deployer: Deployer,
    /// Submits sources to the explorer
    verifier: EtherscanVerifier,
    /// Known addresses by chain
    addresses: ChainAddresses,
    /// Governor addresses from the secrets file
    governors: HashMap<String, Address>,
    /// Where to record deployed addresses, if anywhere
    deployments_path: Option<PathBuf>,
    /// The RPC URL, for providers other than the signing one
    rpc_url: String,
    /// Whether this is a simulated run
    simulated: bool,
}

impl ScriptContext {
    /// Load configuration and set up the client, deployer and verifier
    pub async fn new(args: &GlobalArgs) -> Result<Self, ScriptError> {
        let secrets = Secrets::load(&args.secrets)?;
        let tx_opts = TxOptions::resolve(args.gas_price, args.gas_limit, &secrets)?;
        let client = setup_client(&secrets.sender_key, &args.rpc_url).await?;

        let loader = ArtifactLoader::new(&args.artifacts_dir);
        let verifier = EtherscanVerifier::new(
            secrets.etherscan_key.clone(),
            args.network.clone(),
            loader.clone(),
        );
        let queue = VerificationQueue::new(args.simulated);
        if args.simulated {
            warn!("Simulated run, sources will not be verified");
        }

        Ok(Self {
            deployer: Deployer::new(client, loader, tx_opts, queue),
            verifier,
            addresses: ChainAddresses::load_or_default(&args.addresses)?,
            governors: secrets.governors,
            deployments_path: args.deployments.clone(),
            rpc_url: args.rpc_url.clone(),
            simulated: args.simulated,
        })
    }

    /// The chain the client is connected to
    fn chain_id(&self) -> u64 {
        self.deployer.client().chain_id
    }

    /// Resolve a governor given as an address, a secrets key, or an
    /// addresses-file key
    fn resolve_governor(&self, value: &str) -> Result<Address, ScriptError> {
        match self.governors.get(value) {
            Some(addr) => Ok(*addr),
            None => self.addresses.resolve(self.chain_id(), value),
        }
    }

    /// Record a deployed address in the deployments file, if one is configured
    fn record_deployment(&self, key: &str, address: Address) -> Result<(), ScriptError> {
        match &self.deployments_path {
            Some(path) => write_deployed_address(path, key, address),
            None => Ok(()),
        }
    }

    /// Verify everything deployed so far, unless disabled
    async fn verify_queued(&mut self, opts: &VerifyOptions) -> Result<(), ScriptError> {
        if opts.no_verify {
            info!(
                "Skipping verification of {} contracts",
                self.deployer.queue().len()
            );
            return Ok(());
        }

        let delay = Duration::from_millis(opts.verify_delay_ms);
        self.deployer
            .verify_queued_sources(&self.verifier, delay)
            .await
            .map(|_| ())
    }
}

/// Deploy a contract and verify its source
pub async fn deploy(args: DeployArgs, ctx: &mut ScriptContext) -> Result<(), ScriptError> {
    let artifact = ctx.deployer.loader().artifact(&args.artifact)?;
    let constructor_args = artifact.parse_constructor_args(&args.args)?;

    let deployment = ctx.deployer.deploy(&args.artifact, constructor_args).await?;
    ctx.record_deployment(&args.artifact.to_string(), deployment.address)?;

    ctx.verify_queued(&args.verify).await
}

/// Deploy a transformer through the transformer deployer and verify its source
pub async fn deploy_transformer(
    args: DeployTransformerArgs,
    ctx: &mut ScriptContext,
) -> Result<(), ScriptError> {
    let deployer_address = ctx.addresses.resolve(ctx.chain_id(), &args.deployer)?;
    let deployer = ctx.deployer.contract(
        &ArtifactId::new(TRANSFORMER_NAMESPACE, TRANSFORMER_DEPLOYER_NAME),
        deployer_address,
    )?;

    let transformer = ArtifactId::new(TRANSFORMER_NAMESPACE, &args.name);
    let constructor_args = ctx
        .deployer
        .loader()
        .artifact(&transformer)?
        .parse_constructor_args(&args.args)?;

    let address = ctx
        .deployer
        .deploy_transformer(&deployer, &args.name, constructor_args)
        .await?;
    ctx.record_deployment(&transformer.to_string(), address)?;

    ctx.verify_queued(&args.verify).await
}

/// Verify the source of an already-deployed contract
pub async fn verify(args: VerifyArgs, ctx: &ScriptContext) -> Result<(), ScriptError> {
    let constructor_args = ctx
        .deployer
        .loader()
        .artifact(&args.artifact)?
        .parse_constructor_args(&args.args)?;

    ctx.verifier
        .verify_source(&args.artifact, args.address, &constructor_args)
        .await
        .map(|_| ())
}

/// Encode a governor call batch, executing it through unlocked owners when asked
pub async fn governor_calls(
    args: GovernorCallsArgs,
    ctx: &ScriptContext,
) -> Result<(), ScriptError> {
    let calls = read_governor_calls(&args.calls)?;
    let calldata = encode_governor_calls(&calls);
    info!("Governor calldata for {} calls: {calldata}", calls.len());

    if !args.execute {
        return Ok(());
    }
    if !ctx.simulated {
        return Err(ScriptError::Config(
            "executing governor calls requires a simulated run".to_string(),
        ));
    }

    let governor =
        ctx.resolve_governor(args.governor.as_deref().unwrap_or(DEFAULT_GOVERNOR_KEY))?;
    let provider = unlocked_provider(&ctx.rpc_url)?;
    let receipt =
        execute_with_unlocked_authorities(&provider, governor, calldata, ctx.deployer.tx_opts())
            .await?;

    let value = calls.iter().fold(U256::ZERO, |acc, c| acc.saturating_add(c.value));
    info!(
        "Executed governor batch in tx {:#x} ({} calls, {value} wei)",
        receipt.transaction_hash,
        calls.len()
    );
    Ok(())
}
