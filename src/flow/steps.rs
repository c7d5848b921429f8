// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Step tracking for the two-step certification saga.
//!
//! Each step moves `pending → active → success` or `pending → active → error`.
//! A failure only touches the step it happened in. Retry puts every step
//! back to `pending`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const IPFS_UPLOAD_STEP: &str = "ipfs-upload";
pub const MINT_STEP: &str = "mint-sbt";
pub const UPDATE_URI_STEP: &str = "update-token-uri";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Pending,
    Active,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FlowStep {
    pub id: String,
    pub title: String,
    pub state: StepState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FlowStep {
    fn pending(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            state: StepState::Pending,
            error: None,
        }
    }
}

/// Which chain call the second step makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Mint,
    Version,
}

/// Ordered step list: the IPFS upload, then the chain write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSteps {
    kind: FlowKind,
    steps: [FlowStep; 2],
}

impl FlowSteps {
    pub fn new(kind: FlowKind) -> Self {
        let chain_step = match kind {
            FlowKind::Mint => FlowStep::pending(MINT_STEP, "Mint certificate"),
            FlowKind::Version => FlowStep::pending(UPDATE_URI_STEP, "Update token URI"),
        };
        Self {
            kind,
            steps: [
                FlowStep::pending(IPFS_UPLOAD_STEP, "Upload metadata to IPFS"),
                chain_step,
            ],
        }
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn steps(&self) -> &[FlowStep] {
        &self.steps
    }

    pub fn get(&self, id: &str) -> Option<&FlowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Flow started: the upload is in progress.
    pub fn start(&mut self) {
        self.steps[0].state = StepState::Active;
        self.steps[0].error = None;
    }

    /// Upload done: the chain write is in progress.
    pub fn pin_succeeded(&mut self) {
        self.steps[0].state = StepState::Success;
        self.steps[1].state = StepState::Active;
        self.steps[1].error = None;
    }

    pub fn chain_succeeded(&mut self) {
        self.steps[1].state = StepState::Success;
    }

    /// Mark the active step as failed. With no active step the first
    /// unfinished one takes the error.
    pub fn fail(&mut self, message: impl Into<String>) {
        let index = self
            .steps
            .iter()
            .position(|s| s.state == StepState::Active)
            .or_else(|| self.steps.iter().position(|s| s.state != StepState::Success));

        if let Some(index) = index {
            self.steps[index].state = StepState::Error;
            self.steps[index].error = Some(message.into());
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.kind);
    }

    /// The step that failed, if any.
    pub fn failed(&self) -> Option<&FlowStep> {
        self.steps.iter().find(|s| s.state == StepState::Error)
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state == StepState::Success)
    }
}
