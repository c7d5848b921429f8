// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The certification saga itself.

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::steps::{FlowKind, FlowStep, FlowSteps};
use super::{CertificationDraft, FlowError, VersionDraft};
use crate::blockchain::{CertificateWriter, SbtReader, WriteReceipt};
use crate::ipfs::{
    ipfs_uri, FileUpload, GatewayClient, MetadataCache, MetadataFetcher, MetadataPinner,
};
use crate::metadata::{CertificationMetadata, FileMetadata, MetadataBuilder};
use crate::organization::{is_org_nft_name, org_nft_name};

/// Result of a completed saga.
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub run_id: Uuid,
    /// Minted or versioned token. `None` only when a mint receipt carried no
    /// `Transfer` event and the supply could not be read beforehand.
    pub token_id: Option<u64>,
    pub cid: String,
    pub token_uri: String,
    pub metadata: CertificationMetadata,
    pub receipt: WriteReceipt,
}

/// One run of the saga, with its step list.
///
/// Progress is published on a watch channel after every transition; see
/// [`CertificationFlow::subscribe`].
pub struct CertificationFlow<'a, R, P, W, F = GatewayClient> {
    reader: &'a R,
    pinner: &'a P,
    writer: &'a W,
    metadata: &'a MetadataCache<F>,
    gateway: &'a str,
    run_id: Uuid,
    steps: FlowSteps,
    progress: watch::Sender<Vec<FlowStep>>,
}

impl<'a, R, P, W, F> CertificationFlow<'a, R, P, W, F>
where
    R: SbtReader,
    P: MetadataPinner,
    W: CertificateWriter,
    F: MetadataFetcher,
{
    pub fn new(
        kind: FlowKind,
        reader: &'a R,
        pinner: &'a P,
        writer: &'a W,
        metadata: &'a MetadataCache<F>,
        gateway: &'a str,
    ) -> Self {
        let steps = FlowSteps::new(kind);
        let (progress, _) = watch::channel(steps.steps().to_vec());
        Self {
            reader,
            pinner,
            writer,
            metadata,
            gateway,
            run_id: Uuid::new_v4(),
            steps,
            progress,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn steps(&self) -> &[FlowStep] {
        self.steps.steps()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<FlowStep>> {
        self.progress.subscribe()
    }

    /// Put every step back to `pending` under a new run id. The caller then
    /// runs the whole saga again.
    pub fn retry(&mut self) {
        self.steps.reset();
        self.run_id = Uuid::new_v4();
        tracing::info!(run_id = %self.run_id, "Flow reset for retry");
        self.publish();
    }

    fn publish(&self) {
        self.progress.send_replace(self.steps.steps().to_vec());
    }

    fn begin(&mut self, kind: FlowKind) {
        if self.steps.kind() != kind {
            self.steps = FlowSteps::new(kind);
        }
        self.steps.start();
        self.publish();
    }

    fn pinned(&mut self) {
        self.steps.pin_succeeded();
        self.publish();
    }

    fn failed(&mut self, error: FlowError) -> FlowError {
        self.steps.fail(error.to_string());
        self.publish();
        let step = self.steps.failed().map(|s| s.id.clone()).unwrap_or_default();
        tracing::warn!(run_id = %self.run_id, step = %step, error = %error, "Flow failed");
        error
    }

    fn completed(
        &mut self,
        token_id: Option<u64>,
        cid: String,
        metadata: CertificationMetadata,
        receipt: WriteReceipt,
    ) -> FlowOutcome {
        self.steps.chain_succeeded();
        self.publish();
        self.reader.invalidate_cache();

        tracing::info!(
            run_id = %self.run_id,
            token_id = ?token_id,
            cid = %cid,
            tx_hash = %receipt.tx_hash,
            "Flow completed"
        );

        FlowOutcome {
            run_id: self.run_id,
            token_id,
            token_uri: ipfs_uri(&cid),
            cid,
            metadata,
            receipt,
        }
    }

    /// Pin the optional file, then the document. Returns the document CID.
    async fn pin_document(
        &self,
        builder: MetadataBuilder,
        file: Option<&FileUpload>,
        cancel: &CancellationToken,
    ) -> Result<(String, CertificationMetadata), FlowError> {
        let builder = match file {
            Some(file) => {
                let pin = self.pinner.pin_file(file, cancel).await?;
                builder.file(FileMetadata::from_pin(file, &pin, self.gateway))
            }
            None => builder,
        };

        let metadata = builder.build(Utc::now());
        let pin = self
            .pinner
            .pin_json(&metadata.pin_name(), &metadata.to_json())
            .await?;
        Ok((pin.ipfs_hash, metadata))
    }

    /// Pin a new certification and mint it to `draft.recipient`.
    pub async fn mint(
        &mut self,
        draft: CertificationDraft,
        cancel: &CancellationToken,
    ) -> Result<FlowOutcome, FlowError> {
        self.begin(FlowKind::Mint);
        tracing::info!(
            run_id = %self.run_id,
            recipient = %draft.recipient,
            has_file = draft.file.is_some(),
            "Certification flow started"
        );

        let builder = MetadataBuilder::new(draft.name, draft.description, self.gateway)
            .form_data(draft.form_data);
        let (cid, metadata) = match self.pin_document(builder, draft.file.as_ref(), cancel).await {
            Ok(pinned) => pinned,
            Err(e) => return Err(self.failed(e)),
        };
        self.pinned();

        let expected_id = match self.reader.next_token_id().await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(run_id = %self.run_id, error = %e, "Could not read next token id");
                None
            }
        };

        let receipt = match self.writer.mint(draft.recipient, &ipfs_uri(&cid)).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.failed(e.into())),
        };

        let token_id = receipt.minted_token_id.or(expected_id);
        Ok(self.completed(token_id, cid, metadata, receipt))
    }

    /// Pin the next version of `draft.token_id` and point the token at it.
    pub async fn version(
        &mut self,
        draft: VersionDraft,
        cancel: &CancellationToken,
    ) -> Result<FlowOutcome, FlowError> {
        self.begin(FlowKind::Version);
        let token_id = draft.token_id;
        tracing::info!(run_id = %self.run_id, token_id, "Versioning flow started");

        let (cid, metadata) = match self.pin_version(draft, cancel).await {
            Ok(pinned) => pinned,
            Err(e) => return Err(self.failed(e)),
        };
        self.pinned();

        let receipt = match self.writer.set_token_uri(token_id, &ipfs_uri(&cid)).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.failed(e.into())),
        };

        Ok(self.completed(Some(token_id), cid, metadata, receipt))
    }

    async fn pin_version(
        &self,
        draft: VersionDraft,
        cancel: &CancellationToken,
    ) -> Result<(String, CertificationMetadata), FlowError> {
        let current_uri = self.reader.token_uri(draft.token_id).await?;
        let document = self
            .metadata
            .get(&current_uri)
            .await
            .map_err(FlowError::PreviousDocument)?;
        let previous: CertificationMetadata = serde_json::from_value((*document).clone())
            .map_err(|e| FlowError::PreviousMetadata {
                token_id: draft.token_id,
                reason: e.to_string(),
            })?;

        let name = if is_org_nft_name(&previous.name) {
            org_nft_name(&draft.name)
        } else {
            draft.name
        };
        let builder = MetadataBuilder::new(name, draft.description, self.gateway)
            .form_data(draft.form_data)
            .next_version_of(&previous, &current_uri);

        self.pin_document(builder, draft.file.as_ref(), cancel).await
    }
}
