//! Submission of deployed contract sources to an Etherscan-style explorer

use alloy::{dyn_abi::DynSolValue, primitives::Address};
use serde::Deserialize;
use tracing::info;

use crate::{
    artifacts::{ArtifactId, ArtifactLoader, CompilerInput, ContractArtifact},
    constants::{
        MAINNET_DISPLAY_NAME, MAINNET_NETWORK, VERIFY_ACTION, VERIFY_CODE_FORMAT,
        VERIFY_LICENSE_TYPE, VERIFY_MODULE, VERIFY_SUCCESS_STATUS,
    },
    errors::ScriptError,
    queue::{SourceVerifier, VerificationRecord},
};

/// The explorer API endpoint for the given network
///
/// Mainnet (no network, or `main`) uses `api`, other networks `api-<network>`
pub fn explorer_api_url(network: Option<&str>) -> String {
    match network {
        None | Some("") | Some(MAINNET_NETWORK) => "https://api.etherscan.io/api".to_string(),
        Some(network) => format!("https://api-{network}.etherscan.io/api"),
    }
}

// ------------
// | Requests |
// ------------

/// The form fields of a single source verification submission
#[derive(Clone, Debug)]
pub struct VerificationRequest {
    /// The form fields, in submission order
    fields: Vec<(&'static str, String)>,
}

impl VerificationRequest {
    /// Build the submission for a contract deployed from `artifact` at `address`
    pub fn new(
        api_key: &str,
        address: Address,
        artifact: &ContractArtifact,
        input: &CompilerInput,
        constructor_args: &[DynSolValue],
    ) -> Result<Self, ScriptError> {
        let contract_name = input
            .contract_path_spec(&artifact.contract_name)
            .ok_or_else(|| {
                ScriptError::ArtifactParsing(format!(
                    "no source file for {} in compiler input",
                    artifact.contract_name
                ))
            })?;
        let compiler_version = format!("v{}", input.compiler_version()?);
        let cargs = artifact.constructor_args_tail(constructor_args)?;

        let mut fields = vec![
            ("apikey", api_key.to_string()),
            ("module", VERIFY_MODULE.to_string()),
            ("action", VERIFY_ACTION.to_string()),
            ("contractaddress", address.to_string()),
            ("sourceCode", input.to_source_code_json()?),
            ("codeformat", VERIFY_CODE_FORMAT.to_string()),
            ("contractname", contract_name),
        ];
        // The misspelling is the explorer's
        if !cargs.is_empty() {
            fields.push(("constructorArguements", hex::encode(cargs)));
        }
        fields.push(("compilerversion", compiler_version));
        fields.push(("licenseType", VERIFY_LICENSE_TYPE.to_string()));

        Ok(Self { fields })
    }

    /// The form fields, in submission order
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    /// The value of the field named `key`, if present
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The explorer's response to a submission
#[derive(Clone, Debug, Deserialize)]
pub struct VerificationResponse {
    /// `"1"` on success
    pub status: String,
    /// A short status message
    #[serde(default)]
    pub message: String,
    /// The submission GUID on success, the error detail otherwise
    #[serde(default)]
    pub result: String,
}

impl VerificationResponse {
    /// The submission reference on success, an error carrying the service's
    /// message and result otherwise
    pub fn into_result(self) -> Result<String, ScriptError> {
        if self.status == VERIFY_SUCCESS_STATUS {
            Ok(self.result)
        } else {
            Err(ScriptError::VerificationRejected {
                message: self.message,
                result: self.result,
            })
        }
    }
}

// ------------
// | Verifier |
// ------------

/// Submits sources to the explorer's verification API
#[derive(Clone, Debug)]
pub struct EtherscanVerifier {
    /// The HTTP client
    http: reqwest::Client,
    /// The explorer API endpoint
    api_url: String,
    /// The explorer API key
    api_key: String,
    /// The configured network name, if any
    network: Option<String>,
    /// Resolves artifacts and compiler inputs for submission
    loader: ArtifactLoader,
}

impl EtherscanVerifier {
    /// Create a verifier for the given network
    pub fn new(api_key: String, network: Option<String>, loader: ArtifactLoader) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: explorer_api_url(network.as_deref()),
            api_key,
            network,
            loader,
        }
    }

    /// Submit to `api_url` instead of the network's explorer
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// The network name used in logs
    fn network_name(&self) -> &str {
        match self.network.as_deref() {
            None | Some("") => MAINNET_DISPLAY_NAME,
            Some(network) => network,
        }
    }

    /// Submit the source of the contract deployed from `artifact_id` at
    /// `address`, returning the explorer's reference for the submission
    pub async fn verify_source(
        &self,
        artifact_id: &ArtifactId,
        address: Address,
        constructor_args: &[DynSolValue],
    ) -> Result<String, ScriptError> {
        let artifact = self.loader.artifact(artifact_id)?;
        let input = self.loader.input_artifact(artifact_id)?;
        let request =
            VerificationRequest::new(&self.api_key, address, &artifact, &input, constructor_args)?;

        info!(
            "Verifying source code for {artifact_id} on {} at {address}...",
            self.network_name()
        );
        let response: VerificationResponse = self
            .http
            .post(&self.api_url)
            .form(request.fields())
            .send()
            .await
            .map_err(|e| ScriptError::VerificationRequest(e.to_string()))?
            .json()
            .await
            .map_err(|e| ScriptError::VerificationRequest(e.to_string()))?;

        let reference = response.into_result()?;
        info!(
            "Successfully verified source code for {artifact_id} on {} at {address} \
             (ref: {reference})",
            self.network_name()
        );
        Ok(reference)
    }
}

impl SourceVerifier for EtherscanVerifier {
    async fn verify_record(&self, record: &VerificationRecord) -> Result<(), ScriptError> {
        self.verify_source(&record.artifact, record.address, &record.constructor_args)
            .await
            .map(|_| ())
    }
}
