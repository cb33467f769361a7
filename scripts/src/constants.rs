//! Constants used in the migration scripts

use std::time::Duration;

/// The delay, in milliseconds, before draining the verification queue,
/// giving the explorer time to index freshly deployed contracts
pub const DEFAULT_VERIFY_DELAY_MS: u64 = 60_000;

/// The delay between consecutive verification submissions
pub const VERIFY_INTER_ITEM_DELAY: Duration = Duration::from_secs(10);

/// The number of wei in one gwei
pub const WEI_PER_GWEI: f64 = 1e9;

/// The gas price, in gwei, used when neither the environment nor the
/// secrets file set one
pub const DEFAULT_GAS_PRICE_GWEI: f64 = 1.0;

/// The network name denoting Ethereum mainnet
pub const MAINNET_NETWORK: &str = "main";

/// The display name used in logs when no network is configured
pub const MAINNET_DISPLAY_NAME: &str = "mainnet";

/// The status value the explorer returns for a successful request
pub const VERIFY_SUCCESS_STATUS: &str = "1";

/// The explorer API module for contract operations
pub const VERIFY_MODULE: &str = "contract";

/// The explorer API action for submitting source code
pub const VERIFY_ACTION: &str = "verifysourcecode";

/// The code format identifier for standard-JSON compiler input
pub const VERIFY_CODE_FORMAT: &str = "solidity-standard-json-input";

/// The license type code sent with every submission (Apache-2.0)
pub const VERIFY_LICENSE_TYPE: &str = "12";

/// The compiler settings key holding the compiler version
pub const COMPILER_VERSION_KEY: &str = "version";

/// The file extension of Solidity sources
pub const SOLIDITY_EXTENSION: &str = "sol";

/// The extension of compiled-output artifacts
pub const ARTIFACT_EXTENSION: &str = "json";

/// The extension of compiler-input artifacts
pub const INPUT_ARTIFACT_EXTENSION: &str = "input.json";

/// The artifact namespace in which transformers are defined
pub const TRANSFORMER_NAMESPACE: &str = "zero-ex";

/// The artifact name of the transformer deployer contract
pub const TRANSFORMER_DEPLOYER_NAME: &str = "TransformerDeployer";

/// The name of the transformer deployer's deploy method
pub const TRANSFORMER_DEPLOY_METHOD: &str = "deploy";

/// The key governors are looked up under when none is given
pub const DEFAULT_GOVERNOR_KEY: &str = "governor";

/// The deployments key in the deployments file
pub const DEPLOYMENTS_KEY: &str = "deployments";
