/// Workflow Orchestrator module
///
/// One workflow cycle: generate text, then publish it if anything was
/// generated. The scheduler and the manual trigger endpoint both call
/// [`Workflow::run`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::publisher::PublishOutcome;

/// Something that can produce post text
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn generate(&self) -> Option<String>;
}

/// Something that can publish post text
#[async_trait]
pub trait PostSink: Send + Sync {
    async fn publish(&self, text: Option<&str>) -> PublishOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Published { post_id: Option<String> },
    /// Generation produced nothing, publish was not attempted
    NoContent,
    /// Publisher declined the text
    Skipped,
    PublishFailed(String),
}

impl WorkflowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowOutcome::Published { .. })
    }
}

pub struct Workflow {
    source: Arc<dyn ContentSource>,
    sink: Arc<dyn PostSink>,
}

impl Workflow {
    pub fn new(source: Arc<dyn ContentSource>, sink: Arc<dyn PostSink>) -> Self {
        Self { source, sink }
    }

    /// Run one generate-then-publish cycle
    pub async fn run(&self) -> WorkflowOutcome {
        log::info!("Starting content workflow");

        let Some(text) = self.source.generate().await else {
            log::warn!("Workflow finished without content; nothing published");
            return WorkflowOutcome::NoContent;
        };

        let outcome = match self.sink.publish(Some(&text)).await {
            PublishOutcome::Published { post_id } => WorkflowOutcome::Published { post_id },
            PublishOutcome::Skipped => WorkflowOutcome::Skipped,
            PublishOutcome::Failed(reason) => WorkflowOutcome::PublishFailed(reason),
        };

        if outcome.is_success() {
            log::info!("Content workflow completed: post published");
        } else {
            log::warn!("Content workflow completed without publishing: {:?}", outcome);
        }

        outcome
    }
}
