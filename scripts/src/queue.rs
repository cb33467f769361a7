//! The queue of deployed contracts awaiting source verification

use std::{collections::VecDeque, future::Future, time::Duration};

use alloy::{dyn_abi::DynSolValue, primitives::Address};
use tracing::info;

use crate::{artifacts::ArtifactId, constants::VERIFY_INTER_ITEM_DELAY, errors::ScriptError};

/// A deployed contract awaiting verification
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationRecord {
    /// The artifact the contract was deployed from
    pub artifact: ArtifactId,
    /// The deployed address
    pub address: Address,
    /// The arguments the contract was constructed with
    pub constructor_args: Vec<DynSolValue>,
}

/// A service that verifies a single deployed contract's source
pub trait SourceVerifier {
    /// Submit the record's source for verification, in a single attempt
    fn verify_record(
        &self,
        record: &VerificationRecord,
    ) -> impl Future<Output = Result<(), ScriptError>>;
}

/// An in-memory FIFO of pending verifications
#[derive(Debug)]
pub struct VerificationQueue {
    /// Pending records, oldest first
    records: VecDeque<VerificationRecord>,
    /// Whether this is a simulated run, in which draining is a no-op
    simulated: bool,
    /// The delay between consecutive submissions
    inter_item_delay: Duration,
}

impl VerificationQueue {
    /// Create an empty queue
    pub fn new(simulated: bool) -> Self {
        Self {
            records: VecDeque::new(),
            simulated,
            inter_item_delay: VERIFY_INTER_ITEM_DELAY,
        }
    }

    /// Override the delay between consecutive submissions
    pub fn with_inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    /// Append a record
    pub fn enqueue(&mut self, record: VerificationRecord) {
        self.records.push_back(record);
    }

    /// The number of pending records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no pending records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the pending records, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &VerificationRecord> {
        self.records.iter()
    }

    /// Verify every pending record in insertion order, returning the number
    /// verified
    ///
    /// Waits `initial_delay` once before the first submission and the
    /// inter-item delay between submissions. A record leaves the queue only
    /// once it is verified; on failure the failed record and all records
    /// after it stay queued and the error is returned.
    pub async fn drain_all<V: SourceVerifier>(
        &mut self,
        verifier: &V,
        initial_delay: Duration,
    ) -> Result<usize, ScriptError> {
        if self.simulated {
            info!(
                "Simulated run, skipping verification of {} contracts",
                self.records.len()
            );
            return Ok(0);
        }
        if self.records.is_empty() {
            return Ok(0);
        }

        if !initial_delay.is_zero() {
            info!(
                "Waiting {}s before verifying {} contracts",
                initial_delay.as_secs(),
                self.len()
            );
            tokio::time::sleep(initial_delay).await;
        }

        let mut verified = 0;
        while let Some(record) = self.records.front() {
            if verified > 0 {
                tokio::time::sleep(self.inter_item_delay).await;
            }

            verifier.verify_record(record).await?;
            self.records.pop_front();
            verified += 1;
        }

        Ok(verified)
    }
}
