//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::{fs, path::Path};

use alloy::primitives::Address;
use migration_scripts::{artifacts::ArtifactId, queue::VerificationRecord};
use serde_json::{json, Value};

/// The compiler version recorded in every fixture input
pub const COMPILER_VERSION: &str = "0.6.12+commit.27d51765";

/// Write a compiled artifact and compiler input for `namespace/name` under
/// `root`, with one `uint256` constructor input per entry of `ctor_inputs`
pub fn write_artifact(
    root: &Path,
    namespace: &str,
    name: &str,
    ctor_inputs: &[&str],
) -> ArtifactId {
    let dir = root.join(namespace);
    fs::create_dir_all(&dir).unwrap();

    let inputs: Vec<Value> = ctor_inputs
        .iter()
        .map(|input| json!({ "name": input, "type": "uint256", "internalType": "uint256" }))
        .collect();
    let artifact = json!({
        "contractName": name,
        "compilerOutput": {
            "abi": [{ "type": "constructor", "stateMutability": "nonpayable", "inputs": inputs }],
            "evm": { "bytecode": { "object": "0x6080604052348015600f57600080fd5b50" } }
        }
    });
    let source_path = format!("contracts/src/{name}.sol");
    let input = json!({
        "language": "Solidity",
        "sources": { source_path: { "content": format!("contract {name} {{}}") } },
        "settings": {
            "version": COMPILER_VERSION,
            "optimizer": { "enabled": true, "runs": 1000000 }
        }
    });

    let artifact_path = dir.join(format!("{name}.json"));
    let input_path = dir.join(format!("{name}.input.json"));
    fs::write(artifact_path, artifact.to_string()).unwrap();
    fs::write(input_path, input.to_string()).unwrap();
    ArtifactId::new(namespace, name)
}

/// A record for `namespace/name` deployed at an address ending in `last_byte`
pub fn record(namespace: &str, name: &str, last_byte: u8) -> VerificationRecord {
    VerificationRecord {
        artifact: ArtifactId::new(namespace, name),
        address: Address::with_last_byte(last_byte),
        constructor_args: vec![],
    }
}
