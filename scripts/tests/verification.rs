//! Tests of source submission against a mock explorer

mod common;

use std::time::Duration;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256},
};
use common::{write_artifact, COMPILER_VERSION};
use migration_scripts::{
    artifacts::ArtifactLoader,
    errors::ScriptError,
    queue::{VerificationQueue, VerificationRecord},
    verifier::EtherscanVerifier,
};
use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// A verifier for `network` pointed at the mock server
fn mock_verifier(server: &MockServer, loader: ArtifactLoader) -> EtherscanVerifier {
    EtherscanVerifier::new("test-key".to_string(), Some("goerli".to_string()), loader)
        .with_api_url(format!("{}/api", server.uri()))
}

/// The body of each request received by `server`, in arrival order
async fn received_bodies(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|req| String::from_utf8(req.body.clone()).unwrap())
        .collect()
}

#[tokio::test]
async fn test_drain_submits_each_record_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_artifact(dir.path(), "pkg", "A", &[]);
    let b = write_artifact(dir.path(), "pkg", "B", &["x", "y"]);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "1",
            "message": "OK",
            "result": "guid"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut queue = VerificationQueue::new(false).with_inter_item_delay(Duration::ZERO);
    queue.enqueue(VerificationRecord {
        artifact: a,
        address: Address::with_last_byte(0xa),
        constructor_args: vec![],
    });
    queue.enqueue(VerificationRecord {
        artifact: b,
        address: Address::with_last_byte(0xb),
        constructor_args: vec![
            DynSolValue::Uint(U256::from(1), 256),
            DynSolValue::Uint(U256::from(2), 256),
        ],
    });

    let verifier = mock_verifier(&server, ArtifactLoader::new(dir.path()));
    let verified = queue.drain_all(&verifier, Duration::ZERO).await.unwrap();
    assert_eq!(verified, 2);
    assert!(queue.is_empty());

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), 2);

    // Form encoding escapes `/` as %2F and `:` as %3A
    assert!(bodies[0].contains("contractname=contracts%2Fsrc%2FA.sol%3AA"));
    assert!(!bodies[0].contains("constructorArguements"));
    assert!(bodies[1].contains("contractname=contracts%2Fsrc%2FB.sol%3AB"));
    let expected_args = format!("constructorArguements={:064x}{:064x}", 1, 2);
    assert!(bodies[1].contains(&expected_args));

    for body in &bodies {
        assert!(body.contains("apikey=test-key"));
        assert!(body.contains("action=verifysourcecode"));
        assert!(body.contains("codeformat=solidity-standard-json-input"));
        let version = COMPILER_VERSION.replace('+', "%2B");
        assert!(body.contains(&format!("compilerversion=v{version}")));
        assert!(body.contains("licenseType=12"));
    }
}

#[tokio::test]
async fn test_rejected_submission_reports_service_message() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_artifact(dir.path(), "pkg", "A", &[]);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Unable to locate ContractCode"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut queue = VerificationQueue::new(false);
    queue.enqueue(VerificationRecord {
        artifact: a,
        address: Address::with_last_byte(0xa),
        constructor_args: vec![],
    });

    let verifier = mock_verifier(&server, ArtifactLoader::new(dir.path()));
    let err = queue.drain_all(&verifier, Duration::ZERO).await.unwrap_err();

    assert!(matches!(err, ScriptError::VerificationRejected { .. }));
    let msg = err.to_string();
    assert!(msg.contains("NOTOK"));
    assert!(msg.contains("Unable to locate ContractCode"));
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_malformed_response_is_request_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_artifact(dir.path(), "pkg", "A", &[]);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let verifier = mock_verifier(&server, ArtifactLoader::new(dir.path()));
    let err = verifier
        .verify_source(&a, Address::with_last_byte(0xa), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::VerificationRequest(_)));
}

#[tokio::test]
async fn test_missing_input_artifact_fails_before_submitting() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_artifact(dir.path(), "pkg", "A", &[]);
    std::fs::remove_file(dir.path().join("pkg").join("A.input.json")).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let verifier = mock_verifier(&server, ArtifactLoader::new(dir.path()));
    let err = verifier
        .verify_source(&a, Address::with_last_byte(0xa), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::ArtifactNotFound(_)));
}
