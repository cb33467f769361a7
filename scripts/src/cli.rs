//! Definitions of CLI arguments and commands for the migration scripts

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{builder::FalseyValueParser, Args, Parser, Subcommand};
use eyre::{Result, WrapErr};

use crate::{
    artifacts::ArtifactId,
    commands::{deploy, deploy_transformer, governor_calls, verify, ScriptContext},
    constants::DEFAULT_VERIFY_DELAY_MS,
    errors::ScriptError,
};

/// Deploy, configure and verify contracts
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Set up the script context and run the command
    pub async fn run(self) -> Result<()> {
        let ctx = ScriptContext::new(&self.global)
            .await
            .wrap_err("failed to set up the script context")?;
        self.command.run(ctx).await.wrap_err("migration script failed")
    }
}

/// Options shared by every command
#[derive(Args)]
pub struct GlobalArgs {
    /// Network RPC URL
    #[arg(short, long, env = "NODE_RPC")]
    pub rpc_url: String,

    /// Network name, selecting the explorer API host; mainnet if unset
    #[arg(short, long, env = "NETWORK")]
    pub network: Option<String>,

    /// Gas price in gwei, overriding the secrets file
    #[arg(long, env = "GAS_PRICE")]
    pub gas_price: Option<f64>,

    /// Gas limit, overriding the secrets file
    #[arg(long, env = "GAS_LIMIT")]
    pub gas_limit: Option<u64>,

    /// Run against a simulated node: skip verification and allow executing
    /// governor batches through unlocked accounts
    #[arg(long, env = "SIMULATED", value_parser = FalseyValueParser::new())]
    pub simulated: bool,

    /// Path to the secrets file
    #[arg(long, env = "SECRETS_PATH", default_value = "secrets.json")]
    pub secrets: PathBuf,

    /// Root directory of the compiled artifacts
    #[arg(long, env = "ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// Path to the addresses-by-chain file
    #[arg(long, env = "ADDRESSES_PATH", default_value = "addresses.json")]
    pub addresses: PathBuf,

    /// Path of a deployments file to record deployed addresses in
    #[arg(long, env = "DEPLOYMENTS_PATH")]
    pub deployments: Option<PathBuf>,
}

/// The migration script commands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy a contract and verify its source
    Deploy(DeployArgs),
    /// Deploy a transformer through the transformer deployer and verify its source
    DeployTransformer(DeployTransformerArgs),
    /// Verify the source of an already-deployed contract
    Verify(VerifyArgs),
    /// Encode a governor call batch, optionally executing it on a simulated node
    GovernorCalls(GovernorCallsArgs),
}

impl Command {
    /// Run the command
    pub async fn run(self, mut ctx: ScriptContext) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args, &mut ctx).await,
            Command::DeployTransformer(args) => deploy_transformer(args, &mut ctx).await,
            Command::Verify(args) => verify(args, &ctx).await,
            Command::GovernorCalls(args) => governor_calls(args, &ctx).await,
        }
    }
}

/// Options controlling post-deployment verification
#[derive(Args)]
pub struct VerifyOptions {
    /// Do not verify the deployed sources
    #[arg(long)]
    pub no_verify: bool,

    /// Milliseconds to wait before submitting sources for verification
    #[arg(long, default_value_t = DEFAULT_VERIFY_DELAY_MS)]
    pub verify_delay_ms: u64,
}

/// Deploy a contract from its compiled artifact
#[derive(Args)]
pub struct DeployArgs {
    /// The artifact to deploy, as `namespace/name`
    pub artifact: ArtifactId,

    /// Constructor arguments, in order
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Verification options
    #[command(flatten)]
    pub verify: VerifyOptions,
}

/// Deploy a transformer through an already-deployed transformer deployer
#[derive(Args)]
pub struct DeployTransformerArgs {
    /// The transformer's contract name
    pub name: String,

    /// Constructor arguments, in order
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// The transformer deployer, as an address or a key in the addresses file
    #[arg(short, long, default_value = "transformerDeployer")]
    pub deployer: String,

    /// Verification options
    #[command(flatten)]
    pub verify: VerifyOptions,
}

/// Verify the source of a deployed contract
#[derive(Args)]
pub struct VerifyArgs {
    /// The artifact the contract was deployed from, as `namespace/name`
    pub artifact: ArtifactId,

    /// The deployed address
    pub address: Address,

    /// The constructor arguments the contract was deployed with
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Encode a batch of governor calls
#[derive(Args)]
pub struct GovernorCallsArgs {
    /// A JSON file holding an array of `{to, value, data}` calls
    #[arg(short, long)]
    pub calls: PathBuf,

    /// The governor, as an address or a key in the secrets or addresses file
    #[arg(short, long)]
    pub governor: Option<String>,

    /// Submit, confirm and execute the batch through the governor's unlocked
    /// owners; requires a simulated run
    #[arg(long)]
    pub execute: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parse a `verify` invocation with the given global flags
    fn parse(extra: &[&str]) -> Cli {
        let mut args = vec!["migration-scripts", "--rpc-url", "http://localhost:8545"];
        args.extend_from_slice(extra);
        args.extend_from_slice(&[
            "verify",
            "zero-ex/ZeroEx",
            "0x0000000000000000000000000000000000000001",
        ]);
        Cli::try_parse_from(args).unwrap()
    }

    // Both cases share one test since they mutate the same variable
    #[test]
    fn test_simulated_from_env() {
        std::env::set_var("SIMULATED", "1");
        assert!(parse(&[]).global.simulated);

        std::env::set_var("SIMULATED", "yes");
        assert!(parse(&[]).global.simulated);

        std::env::set_var("SIMULATED", "0");
        assert!(!parse(&[]).global.simulated);

        std::env::set_var("SIMULATED", "false");
        assert!(!parse(&[]).global.simulated);

        std::env::remove_var("SIMULATED");
        assert!(!parse(&[]).global.simulated);
        assert!(parse(&["--simulated"]).global.simulated);
    }

    #[test]
    fn test_verify_args() {
        let cli = parse(&[]);
        let Command::Verify(args) = cli.command else {
            panic!("expected a verify command");
        };
        assert_eq!(args.artifact.to_string(), "zero-ex/ZeroEx");
        assert_eq!(args.address, Address::with_last_byte(1));
        assert!(args.args.is_empty());
    }
}
