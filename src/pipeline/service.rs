//! Service coordinating extraction, aggregation, generation and the in-memory stores.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    aggregation::{combine, qualifying_count},
    extraction::{DocumentRecord, SourceFile, extract_all},
    generation::{GenerationHealth, SummaryGenerator},
    metrics::{MetricsSnapshot, ServiceMetrics},
    pipeline::types::{ChatReply, ChatRequest, ConversationView, ServiceError},
    store::{
        AnalysisRecord, AnalysisStore, ConversationStore, NotFound, RecordKind, Turn, generate_id,
    },
};

/// Runs the analysis pipeline and the follow-up chat.
///
/// Stores, generator and metrics are long-lived handles built once at startup. Construct the
/// service once and share it through an `Arc`.
pub struct MedbriefService {
    generator: Arc<SummaryGenerator>,
    analyses: Arc<AnalysisStore>,
    conversations: Arc<ConversationStore>,
    metrics: Arc<ServiceMetrics>,
    max_documents: usize,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait MedbriefApi: Send + Sync {
    /// Extract, aggregate and summarize `files`, then store the analysis.
    async fn analyze(&self, files: Vec<SourceFile>) -> Result<Arc<AnalysisRecord>, ServiceError>;

    /// Fetch a stored analysis.
    fn get_analysis(&self, id: &str) -> Result<Arc<AnalysisRecord>, ServiceError>;

    /// Delete a stored analysis.
    fn delete_analysis(&self, id: &str) -> Result<(), ServiceError>;

    /// Answer a message and append the turn to its conversation.
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ServiceError>;

    /// Fetch a conversation's turns.
    async fn get_conversation(&self, id: &str) -> Result<ConversationView, ServiceError>;

    /// Delete one conversation.
    fn delete_conversation(&self, id: &str) -> Result<(), ServiceError>;

    /// Delete every conversation, returning how many were removed.
    fn clear_conversations(&self) -> usize;

    /// Probe the generation provider.
    async fn generation_health(&self) -> GenerationHealth;

    /// Current counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl MedbriefService {
    /// Assemble the service from its long-lived parts.
    pub fn new(
        generator: Arc<SummaryGenerator>,
        analyses: Arc<AnalysisStore>,
        conversations: Arc<ConversationStore>,
        max_documents: usize,
    ) -> Self {
        Self {
            generator,
            analyses,
            conversations,
            metrics: Arc::new(ServiceMetrics::new()),
            max_documents,
        }
    }

    /// Service with fresh, empty stores.
    pub fn with_empty_stores(generator: Arc<SummaryGenerator>, max_documents: usize) -> Self {
        Self::new(
            generator,
            Arc::new(AnalysisStore::new()),
            Arc::new(ConversationStore::new()),
            max_documents,
        )
    }

    fn validate_files(&self, files: &[SourceFile]) -> Result<(), ServiceError> {
        if files.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Please upload at least one document".into(),
            ));
        }
        if files.len() > self.max_documents {
            return Err(ServiceError::InvalidInput(format!(
                "Too many documents: {} provided, at most {} allowed",
                files.len(),
                self.max_documents
            )));
        }
        if let Some(index) = files
            .iter()
            .position(|file| file.path.to_string_lossy().trim().is_empty())
        {
            return Err(ServiceError::InvalidInput(format!(
                "File {index} is missing its stored path"
            )));
        }
        if let Some(index) = files
            .iter()
            .position(|file| file.original_name.trim().is_empty())
        {
            return Err(ServiceError::InvalidInput(format!(
                "File {index} is missing its original name"
            )));
        }
        Ok(())
    }

    fn resolve_context(&self, request: &ChatRequest) -> Result<String, ServiceError> {
        if let Some(id) = non_blank(request.analysis_id.as_deref()) {
            return Ok(self.analyses.get(id)?.context.clone());
        }
        non_blank(request.medical_context.as_deref())
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::InvalidInput(
                    "Please provide medical context from the analysis".into(),
                )
            })
    }

    fn record_extractions(&self, records: &[DocumentRecord]) {
        for record in records {
            self.metrics.record_extraction(&record.outcome);
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

#[async_trait]
impl MedbriefApi for MedbriefService {
    async fn analyze(&self, files: Vec<SourceFile>) -> Result<Arc<AnalysisRecord>, ServiceError> {
        self.validate_files(&files)?;
        let started = Instant::now();
        tracing::info!(files = files.len(), "Analyzing documents");

        let records = extract_all(&files).await;
        self.record_extractions(&records);

        let qualifying = qualifying_count(&records);
        if qualifying == 0 {
            self.metrics.record_empty_aggregate();
            tracing::warn!(
                files = records.len(),
                "No document yielded text; skipping generation"
            );
            return Err(ServiceError::AggregateEmpty {
                documents: records.iter().map(DocumentRecord::to_outcome).collect(),
            });
        }

        let context = combine(&records);
        let context_tokens = self.generator.estimate_tokens(&context);
        tracing::info!(
            qualifying,
            files = records.len(),
            context_chars = context.len(),
            context_tokens,
            "Aggregated document context"
        );

        let summary = self.generator.generate(&context).await.map_err(|error| {
            self.metrics.record_generation_failure();
            ServiceError::from(error)
        })?;

        let record = AnalysisRecord::new(generate_id(), &records, summary, context, context_tokens)
            .ok_or_else(|| ServiceError::AggregateEmpty {
                documents: records.iter().map(DocumentRecord::to_outcome).collect(),
            })?;
        let record = self.analyses.put(record);
        self.metrics.record_analysis();
        tracing::info!(
            analysis_id = %record.id,
            requested = record.requested_count,
            succeeded = record.succeeded_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis completed"
        );
        Ok(record)
    }

    fn get_analysis(&self, id: &str) -> Result<Arc<AnalysisRecord>, ServiceError> {
        Ok(self.analyses.get(id)?)
    }

    fn delete_analysis(&self, id: &str) -> Result<(), ServiceError> {
        if !self.analyses.delete(id) {
            return Err(NotFound {
                kind: RecordKind::Analysis,
                id: id.to_string(),
            }
            .into());
        }
        tracing::info!(analysis_id = id, "Analysis deleted");
        Ok(())
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ServiceError> {
        if request.message.trim().is_empty() {
            return Err(ServiceError::InvalidInput("Please provide a message".into()));
        }
        let context = self.resolve_context(&request)?;

        let session = self
            .conversations
            .begin(request.conversation_id.as_deref())
            .await;
        let conversation_id = session.id().to_string();
        let requested = non_blank(request.conversation_id.as_deref());
        if session.is_new() && requested.is_some() {
            tracing::debug!(
                requested = ?requested,
                conversation_id = %conversation_id,
                "Unknown conversation id; starting a new conversation"
            );
        }

        let response = self
            .generator
            .chat(&context, session.turns(), &request.message)
            .await
            .map_err(|error| {
                self.metrics.record_generation_failure();
                ServiceError::from(error)
            })?;

        let turn = Turn::new(request.message, response.clone());
        let timestamp = turn.timestamp.clone();
        let message_count = session.commit(turn);
        self.metrics.record_chat_turn();
        tracing::info!(
            conversation_id = %conversation_id,
            message_count,
            "Chat turn recorded"
        );

        Ok(ChatReply {
            conversation_id,
            response,
            timestamp,
            message_count,
        })
    }

    async fn get_conversation(&self, id: &str) -> Result<ConversationView, ServiceError> {
        let history = self.conversations.get(id)?;
        Ok(ConversationView::new(id.to_string(), history))
    }

    fn delete_conversation(&self, id: &str) -> Result<(), ServiceError> {
        if !self.conversations.delete_one(id) {
            return Err(NotFound {
                kind: RecordKind::Conversation,
                id: id.to_string(),
            }
            .into());
        }
        tracing::info!(conversation_id = id, "Conversation deleted");
        Ok(())
    }

    fn clear_conversations(&self) -> usize {
        let count = self.conversations.delete_all();
        tracing::info!(count, "Conversations cleared");
        count
    }

    async fn generation_health(&self) -> GenerationHealth {
        self.generator.probe().await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
