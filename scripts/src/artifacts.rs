//! Loading of compiled contract artifacts and the compiler inputs needed to
//! reproduce them for source verification
//!
//! Artifacts are laid out under a root directory as
//! `<root>/<namespace>/<name>.json` (compiled output) next to
//! `<root>/<namespace>/<name>.input.json` (standard-JSON compiler input).

use std::{
    fmt::{self, Display},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    constants::{
        ARTIFACT_EXTENSION, COMPILER_VERSION_KEY, INPUT_ARTIFACT_EXTENSION, SOLIDITY_EXTENSION,
    },
    errors::ScriptError,
};

// ---------------
// | Identifiers |
// ---------------

/// A structured artifact identifier, e.g. `zero-ex/FillQuoteTransformer`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactId {
    /// The package namespace the artifact belongs to
    pub namespace: String,
    /// The contract name within the namespace
    pub name: String,
}

impl ArtifactId {
    /// Create a new artifact identifier
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ArtifactId {
    type Err = ScriptError;

    /// Parses `namespace/name`, splitting on the first slash
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(ArtifactId::new(namespace, name))
            }
            _ => Err(ScriptError::Config(format!(
                "artifact name `{s}` is not of the form `namespace/name`"
            ))),
        }
    }
}

// -------------
// | Artifacts |
// -------------

/// The compiled output of a contract
#[derive(Clone, Debug)]
pub struct ContractArtifact {
    /// The name of the compiled contract
    pub contract_name: String,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The creation bytecode
    pub bytecode: Bytes,
}

/// The on-disk shape of a compiled-output artifact
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompiledArtifactFile {
    /// The name of the compiled contract
    contract_name: String,
    /// The compiler output for the contract
    compiler_output: CompilerOutput,
}

/// The subset of the compiler output we use
#[derive(Deserialize)]
struct CompilerOutput {
    /// The contract ABI
    abi: JsonAbi,
    /// The EVM section of the output
    evm: EvmOutput,
}

/// The EVM section of the compiler output
#[derive(Deserialize)]
struct EvmOutput {
    /// The creation bytecode
    bytecode: BytecodeOutput,
}

/// A hex-encoded bytecode object
#[derive(Deserialize)]
struct BytecodeOutput {
    /// The hex-encoded bytecode, with or without a `0x` prefix
    object: String,
}

impl TryFrom<CompiledArtifactFile> for ContractArtifact {
    type Error = ScriptError;

    fn try_from(file: CompiledArtifactFile) -> Result<Self, Self::Error> {
        let object = file.compiler_output.evm.bytecode.object;
        let bytecode = hex::decode(object.trim_start_matches("0x"))
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        Ok(ContractArtifact {
            contract_name: file.contract_name,
            abi: file.compiler_output.abi,
            bytecode: bytecode.into(),
        })
    }
}

impl ContractArtifact {
    /// Coerce string-form constructor arguments into ABI values matching the
    /// constructor's parameter types
    pub fn parse_constructor_args(&self, raw: &[String]) -> Result<Vec<DynSolValue>, ScriptError> {
        let inputs = self
            .abi
            .constructor()
            .map(|ctor| ctor.inputs.as_slice())
            .unwrap_or_default();

        if inputs.len() != raw.len() {
            return Err(ScriptError::CalldataConstruction(format!(
                "{} expects {} constructor arguments, got {}",
                self.contract_name,
                inputs.len(),
                raw.len()
            )));
        }

        inputs
            .iter()
            .zip(raw)
            .map(|(param, arg)| {
                let ty = param
                    .resolve()
                    .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
                ty.coerce_str(arg).map_err(|e| {
                    ScriptError::CalldataConstruction(format!("argument `{}`: {e}", param.name))
                })
            })
            .collect()
    }

    /// Build contract-creation data: the bytecode followed by the ABI-encoded
    /// constructor arguments
    pub fn encode_deploy_data(&self, args: &[DynSolValue]) -> Result<Bytes, ScriptError> {
        let mut data = self.bytecode.to_vec();
        match self.abi.constructor() {
            Some(ctor) => {
                let encoded = ctor
                    .abi_encode_input(args)
                    .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
                data.extend(encoded);
            }
            None if args.is_empty() => {}
            None => {
                return Err(ScriptError::CalldataConstruction(format!(
                    "{} has no constructor but {} arguments were given",
                    self.contract_name,
                    args.len()
                )))
            }
        }

        Ok(data.into())
    }

    /// The ABI-encoded constructor arguments alone, as submitted for
    /// verification
    ///
    /// Computed by building the creation data and trimming the bytecode prefix
    pub fn constructor_args_tail(&self, args: &[DynSolValue]) -> Result<Vec<u8>, ScriptError> {
        let data = self.encode_deploy_data(args)?;
        Ok(data[self.bytecode.len()..].to_vec())
    }
}

/// A standard-JSON compiler input
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CompilerInput {
    /// The source language, e.g. `Solidity`
    pub language: String,
    /// Source files keyed by path, in file order
    pub sources: Map<String, Value>,
    /// The compiler settings, including the compiler `version`
    pub settings: Map<String, Value>,
    /// Any other top-level fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompilerInput {
    /// The compiler version recorded in the settings
    pub fn compiler_version(&self) -> Result<&str, ScriptError> {
        self.settings
            .get(COMPILER_VERSION_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ScriptError::ArtifactParsing("compiler input has no `settings.version`".to_string())
            })
    }

    /// The `<source path>:<contract name>` spec of the first source whose path
    /// ends in `/<contract name>.sol`
    pub fn contract_path_spec(&self, contract_name: &str) -> Option<String> {
        let suffix = format!("/{contract_name}.{SOLIDITY_EXTENSION}");
        self.sources
            .keys()
            .find(|path| path.ends_with(&suffix))
            .map(|path| format!("{path}:{contract_name}"))
    }

    /// Serialize the input as submitted to the explorer, with the compiler
    /// version removed from the settings
    pub fn to_source_code_json(&self) -> Result<String, ScriptError> {
        let mut input = self.clone();
        input.settings.shift_remove(COMPILER_VERSION_KEY);
        serde_json::to_string(&input).map_err(|e| ScriptError::Serde(e.to_string()))
    }
}

// ----------
// | Loader |
// ----------

/// Resolves artifact identifiers to files under an artifacts root
#[derive(Clone, Debug)]
pub struct ArtifactLoader {
    /// The artifacts root directory
    root: PathBuf,
}

impl ArtifactLoader {
    /// Create a loader over the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The path of the compiled-output artifact for `id`
    pub fn artifact_path(&self, id: &ArtifactId) -> PathBuf {
        self.root
            .join(&id.namespace)
            .join(format!("{}.{ARTIFACT_EXTENSION}", id.name))
    }

    /// The path of the compiler-input artifact for `id`
    pub fn input_artifact_path(&self, id: &ArtifactId) -> PathBuf {
        self.root
            .join(&id.namespace)
            .join(format!("{}.{INPUT_ARTIFACT_EXTENSION}", id.name))
    }

    /// Load the compiled output (ABI and bytecode) for `id`
    pub fn artifact(&self, id: &ArtifactId) -> Result<ContractArtifact, ScriptError> {
        let file: CompiledArtifactFile = read_artifact_json(&self.artifact_path(id))?;
        file.try_into()
    }

    /// Load the compiler input for `id`
    pub fn input_artifact(&self, id: &ArtifactId) -> Result<CompilerInput, ScriptError> {
        read_artifact_json(&self.input_artifact_path(id))
    }
}

/// Read and deserialize an artifact JSON file
fn read_artifact_json<T: DeserializeOwned>(path: &Path) -> Result<T, ScriptError> {
    let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ScriptError::ArtifactNotFound(path.display().to_string()),
        _ => ScriptError::ReadFile(format!("{}: {e}", path.display())),
    })?;

    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use alloy::{dyn_abi::DynSolValue, primitives::U256};
    use serde_json::json;

    use super::*;

    /// Write a two-argument artifact pair under `root`
    fn write_pair_artifact(root: &Path) -> ArtifactId {
        let id = ArtifactId::new("pkg", "Pair");
        let loader = ArtifactLoader::new(root);
        fs::create_dir_all(root.join("pkg")).unwrap();

        let artifact = json!({
            "contractName": "Pair",
            "compilerOutput": {
                "abi": [{
                    "type": "constructor",
                    "stateMutability": "nonpayable",
                    "inputs": [
                        { "name": "a", "type": "uint256", "internalType": "uint256" },
                        { "name": "b", "type": "address", "internalType": "address" }
                    ]
                }],
                "evm": { "bytecode": { "object": "0x60806040" } }
            }
        });
        let input = json!({
            "language": "Solidity",
            "sources": {
                "src/lib/Other.sol": { "content": "" },
                "src/Pair.sol": { "content": "contract Pair {}" }
            },
            "settings": { "version": "0.6.12+commit.27d51765", "optimizer": { "enabled": true } }
        });

        fs::write(loader.artifact_path(&id), artifact.to_string()).unwrap();
        fs::write(loader.input_artifact_path(&id), input.to_string()).unwrap();
        id
    }

    #[test]
    fn test_parse_artifact_id() {
        let id: ArtifactId = "zero-ex/FillQuoteTransformer".parse().unwrap();
        assert_eq!(id, ArtifactId::new("zero-ex", "FillQuoteTransformer"));
        assert_eq!(id.to_string(), "zero-ex/FillQuoteTransformer");

        // Only the first slash separates the namespace
        let nested: ArtifactId = "a/b/c".parse().unwrap();
        assert_eq!(nested, ArtifactId::new("a", "b/c"));

        assert!("NoNamespace".parse::<ArtifactId>().is_err());
        assert!("/Name".parse::<ArtifactId>().is_err());
        assert!("ns/".parse::<ArtifactId>().is_err());
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ArtifactLoader::new(dir.path());
        let err = loader.artifact(&ArtifactId::new("pkg", "Missing")).unwrap_err();
        assert!(matches!(err, ScriptError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_artifact_and_input_agree_on_contract() {
        let dir = tempfile::tempdir().unwrap();
        let id = write_pair_artifact(dir.path());
        let loader = ArtifactLoader::new(dir.path());

        let artifact = loader.artifact(&id).unwrap();
        let input = loader.input_artifact(&id).unwrap();

        assert_eq!(artifact.contract_name, "Pair");
        assert_eq!(artifact.bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40]);
        assert_eq!(
            input.contract_path_spec(&artifact.contract_name).as_deref(),
            Some("src/Pair.sol:Pair")
        );
        assert_eq!(input.compiler_version().unwrap(), "0.6.12+commit.27d51765");
    }

    #[test]
    fn test_source_code_json_drops_version() {
        let dir = tempfile::tempdir().unwrap();
        let id = write_pair_artifact(dir.path());
        let input = ArtifactLoader::new(dir.path()).input_artifact(&id).unwrap();

        let source: Value = serde_json::from_str(&input.to_source_code_json().unwrap()).unwrap();
        assert!(source["settings"].get("version").is_none());
        assert_eq!(source["settings"]["optimizer"]["enabled"], json!(true));
        assert_eq!(source["language"], json!("Solidity"));
        // The loaded input keeps its version for the `compilerversion` field
        assert!(input.compiler_version().is_ok());
    }

    #[test]
    fn test_source_code_json_keeps_settings_order() {
        let input: CompilerInput = serde_json::from_value(json!({
            "language": "Solidity",
            "sources": {},
            "settings": {
                "version": "0.6.12+commit.27d51765",
                "optimizer": { "enabled": true },
                "evmVersion": "istanbul",
                "outputSelection": {}
            }
        }))
        .unwrap();

        let source: Value = serde_json::from_str(&input.to_source_code_json().unwrap()).unwrap();
        let keys: Vec<&str> = source["settings"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["optimizer", "evmVersion", "outputSelection"]);
    }

    #[test]
    fn test_constructor_args_tail_matches_direct_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let id = write_pair_artifact(dir.path());
        let artifact = ArtifactLoader::new(dir.path()).artifact(&id).unwrap();

        let args = artifact
            .parse_constructor_args(&[
                "7".to_string(),
                "0x00000000000000000000000000000000000000aa".to_string(),
            ])
            .unwrap();
        assert_eq!(args[0], DynSolValue::Uint(U256::from(7), 256));

        let deploy_data = artifact.encode_deploy_data(&args).unwrap();
        let tail = artifact.constructor_args_tail(&args).unwrap();
        let direct = DynSolValue::Tuple(args).abi_encode_params();

        assert!(deploy_data.starts_with(&artifact.bytecode));
        assert_eq!(tail, direct);
        assert_eq!(tail.len(), 64);
    }

    #[test]
    fn test_constructor_arg_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let id = write_pair_artifact(dir.path());
        let artifact = ArtifactLoader::new(dir.path()).artifact(&id).unwrap();

        let err = artifact.parse_constructor_args(&["1".to_string()]).unwrap_err();
        assert!(matches!(err, ScriptError::CalldataConstruction(_)));
    }
}
