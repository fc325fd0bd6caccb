//! Pipeline Runtime (C9, §4.1): drives the state machine, routes the GRADE
//! decision, enforces the retry bound, and emits lifecycle events in the
//! strict order required by §4.11.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use docqa_core::category::ErrorCategory;
use docqa_core::pipeline::PipelineNode;
use docqa_core::query::QueryRequest;
use docqa_core::runtime_context::LanguagePreference;
use docqa_core::session::{Message, SessionState};
use docqa_core::traits::{LanguageModel, RetrieveOptions, Retriever};
use docqa_core::{ContextMetadata, Document, Event};
use docqa_retrieval::{cascaded_fallback, RerankerClient};

use crate::cancellation::CancellationToken;
use crate::language::detect_language;
use crate::retry::retry_with_backoff;
use crate::telemetry::{NodeTimer, RequestTimer};
use crate::{generator, grader, guardrails, rewriter};
use crate::session_store::SessionStore;

/// Tuning pulled from `docqa_config::Settings` at startup (§6 Configuration).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub model: String,
    pub max_query_length: usize,
    pub strict_output_guardrails: bool,
    pub top_k: usize,
    pub prefetch_limit: usize,
    pub rerank_top_k: usize,
}

/// The final, caller-facing shape of a successful invocation: the
/// non-streaming `/query` response body (§6).
#[derive(Debug, Clone)]
pub struct AskResult {
    pub answer: String,
    pub sources: Vec<Document>,
    pub query: String,
    pub retries: u32,
    pub context_metadata: ContextMetadata,
    pub thread_id: String,
}

pub enum AskOutcome {
    Generated(AskResult),
    Failed { category: ErrorCategory, message: String },
}

pub struct PipelineRuntime {
    retriever: Arc<dyn Retriever>,
    reranker: Arc<RerankerClient>,
    llm: Arc<dyn LanguageModel>,
    sessions: Arc<SessionStore>,
    config: PipelineConfig,
}

impl PipelineRuntime {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        reranker: Arc<RerankerClient>,
        llm: Arc<dyn LanguageModel>,
        sessions: Arc<SessionStore>,
        config: PipelineConfig,
    ) -> Self {
        Self { retriever, reranker, llm, sessions, config }
    }

    /// Backend connectivity snapshot for `GET /health` (§6).
    pub async fn retriever_health(&self) -> docqa_core::traits::RetrieverHealth {
        self.retriever.health().await
    }

    /// Streaming entrypoint (C13): spawns the run as a background task and
    /// returns a pull-based stream of events, terminating on the single
    /// `generation` or `error` event (§4.11).
    pub fn stream(
        self: &Arc<Self>,
        request: QueryRequest,
        cancellation: CancellationToken,
    ) -> ReceiverStream<Event> {
        let (tx, rx) = mpsc::channel(32);
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            runtime.run(request, cancellation, tx).await;
        });
        ReceiverStream::new(rx)
    }

    /// Non-streaming entrypoint (C13): buffers events and returns only the
    /// terminal payload.
    pub async fn ask(self: &Arc<Self>, request: QueryRequest, cancellation: CancellationToken) -> AskOutcome {
        let (tx, mut rx) = mpsc::channel(32);
        let runtime = Arc::clone(self);
        let request_clone = request.clone();
        tokio::spawn(async move {
            runtime.run(request_clone, cancellation, tx).await;
        });

        while let Some(event) = rx.recv().await {
            match event {
                Event::Generation { answer, sources, context_metadata, thread_id, .. } => {
                    // `run` persists the session (including `retry_count`)
                    // before sending this event, so the load below observes
                    // the final count for this invocation.
                    let retries = self
                        .sessions
                        .load(&thread_id)
                        .await
                        .ok()
                        .flatten()
                        .map(|state| state.retry_count)
                        .unwrap_or(0);
                    return AskOutcome::Generated(AskResult {
                        answer,
                        sources,
                        query: request.query_text,
                        retries,
                        context_metadata,
                        thread_id,
                    });
                },
                Event::Error { category, message, .. } => {
                    return AskOutcome::Failed { category, message };
                },
                _ => continue,
            }
        }

        AskOutcome::Failed {
            category: ErrorCategory::Internal,
            message: "pipeline ended without a terminal event".to_string(),
        }
    }

    async fn run(&self, request: QueryRequest, cancellation: CancellationToken, tx: mpsc::Sender<Event>) {
        let request_timer = RequestTimer::start();
        let max_length = self.config.max_query_length;

        let _ = tx.send(Event::node_start(PipelineNode::ValidateInput)).await;
        let validate_input_timer = NodeTimer::start(PipelineNode::ValidateInput);
        let guarded = match guardrails::validate_input(&request.query_text, max_length) {
            Ok(g) => g,
            Err(reason) => {
                validate_input_timer.finish_error(ErrorCategory::GuardrailInput);
                request_timer.finish_failed(ErrorCategory::GuardrailInput);
                let _ = tx
                    .send(Event::error(ErrorCategory::GuardrailInput, reason))
                    .await;
                return;
            },
        };
        validate_input_timer.finish(&format!("warning_count={}", guarded.warnings.len()));
        let _ = tx
            .send(Event::node_end(
                PipelineNode::ValidateInput,
                serde_json::json!({"warning_count": guarded.warnings.len()}),
            ))
            .await;

        let (thread_id, is_new) = match self.sessions.create(request.thread_id.clone()).await {
            Ok(pair) => pair,
            Err(e) => {
                request_timer.finish_failed(ErrorCategory::Internal);
                let _ = tx.send(Event::error(ErrorCategory::Internal, e.to_string())).await;
                return;
            },
        };

        if is_new {
            let _ = tx.send(Event::thread_created(thread_id.clone())).await;
        }

        for warning in &guarded.warnings {
            let _ = tx.send(Event::warning(warning.clone(), None)).await;
        }

        let history = match self.sessions.load(&thread_id).await {
            Ok(Some(state)) => state.messages,
            Ok(None) => Vec::new(),
            Err(e) => {
                request_timer.finish_failed(ErrorCategory::Internal);
                let _ = tx.send(Event::error(ErrorCategory::Internal, e.to_string())).await;
                return;
            },
        };

        let detected_language = match request.runtime_context.language_preference {
            LanguagePreference::Auto => detect_language(&guarded.sanitized_query).as_effective_str(),
            LanguagePreference::En => "en",
            LanguagePreference::Ru => "ru",
            LanguagePreference::Uz => "uz",
        };

        if cancellation.is_cancelled() {
            request_timer.finish_failed(ErrorCategory::Cancelled);
            let _ = tx.send(Event::error(ErrorCategory::Cancelled, "cancelled")).await;
            return;
        }

        let outcome = self
            .run_retrieval_loop(&guarded.sanitized_query, &request, detected_language, &cancellation, &tx)
            .await;

        let (final_documents, documents_retrieved, retry_count, low_relevance_fallback) = match outcome {
            Ok(loop_outcome) => loop_outcome,
            Err(category) => {
                request_timer.finish_failed(category);
                return;
            },
        };

        if cancellation.is_cancelled() {
            request_timer.finish_failed(ErrorCategory::Cancelled);
            let _ = tx.send(Event::error(ErrorCategory::Cancelled, "cancelled")).await;
            return;
        }

        let _ = tx.send(Event::node_start(PipelineNode::Generate)).await;
        let generate_timer = NodeTimer::start(PipelineNode::Generate);
        let generation = match generator::generate(
            &self.llm,
            &self.config.model,
            &guarded.sanitized_query,
            detected_language,
            &request.runtime_context,
            &history,
            final_documents.clone(),
            documents_retrieved,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                generate_timer.finish_error(ErrorCategory::LlmUnavailable);
                request_timer.finish_failed(ErrorCategory::LlmUnavailable);
                let _ = tx.send(Event::error(ErrorCategory::LlmUnavailable, e.to_string())).await;
                return;
            },
        };
        generate_timer.finish(&format!("answer_length={}", generation.answer.len()));
        let _ = tx
            .send(Event::node_end(PipelineNode::Generate, serde_json::json!({"answer_length": generation.answer.len()})))
            .await;

        let _ = tx.send(Event::node_start(PipelineNode::ValidateOutput)).await;
        let validate_output_timer = NodeTimer::start(PipelineNode::ValidateOutput);
        let output_check = guardrails::validate_output(
            &generation.answer,
            &final_documents,
            request.runtime_context.enable_citations,
            self.config.strict_output_guardrails,
        );

        let mut context_metadata = generation.context_metadata;
        context_metadata.confidence_score = output_check.confidence_score;
        context_metadata.is_generic = output_check.is_generic;
        context_metadata.has_citations = output_check.has_citations;
        context_metadata.validation_passed = output_check.validation_passed;
        context_metadata.warnings.extend(output_check.warnings.clone());
        if low_relevance_fallback {
            context_metadata.add_warning("low_relevance_fallback");
        }

        for warning in &output_check.warnings {
            let _ = tx.send(Event::warning(warning.clone(), Some(PipelineNode::ValidateOutput))).await;
        }
        validate_output_timer.finish(&format!("validation_passed={}", context_metadata.validation_passed));
        let _ = tx
            .send(Event::node_end(
                PipelineNode::ValidateOutput,
                serde_json::json!({"validation_passed": context_metadata.validation_passed}),
            ))
            .await;

        let answer = output_check.sanitized_answer;

        let persist_result = self
            .sessions
            .with_session(&thread_id, |state: &mut SessionState| {
                state.append(Message::user(request.query_text.clone()));
                state.append(Message::assistant(answer.clone()));
                state.retry_count = retry_count;
                state.last_query_language = Some(detected_language.to_string());
                state.last_context_metadata = Some(context_metadata.clone());
                state.bump_revision();
            })
            .await;

        if let Err(e) = persist_result {
            request_timer.finish_failed(ErrorCategory::Internal);
            let _ = tx.send(Event::error(ErrorCategory::Internal, e.to_string())).await;
            return;
        }

        request_timer.finish_generated();
        let _ = tx
            .send(Event::Generation {
                answer,
                sources: final_documents,
                context_metadata,
                thread_id,
                timestamp: Self::now(),
            })
            .await;
    }

    /// Drives `RETRIEVE → RERANK → GRADE → {GENERATE | REWRITE_QUERY}` until
    /// the routing decision at GRADE selects `GENERATE` (§4.1).
    async fn run_retrieval_loop(
        &self,
        original_query: &str,
        request: &QueryRequest,
        detected_language: &str,
        cancellation: &CancellationToken,
        tx: &mpsc::Sender<Event>,
    ) -> Result<(Vec<Document>, usize, u32, bool), ErrorCategory> {
        let top_k = request.top_k.unwrap_or(self.config.top_k);
        let mut current_query = original_query.to_string();
        let mut retry_count = 0u32;

        loop {
            if cancellation.is_cancelled() {
                let _ = tx.send(Event::error(ErrorCategory::Cancelled, "cancelled")).await;
                return Err(ErrorCategory::Cancelled);
            }

            let _ = tx.send(Event::node_start(PipelineNode::Retrieve)).await;
            let retrieve_timer = NodeTimer::start(PipelineNode::Retrieve);
            let options = RetrieveOptions {
                top_k,
                prefetch_limit: self.config.prefetch_limit,
                filters: request.filters.clone(),
                detected_language: Some(detected_language.to_string()),
            };
            let outcome = match retry_with_backoff(|| self.retriever.retrieve(&current_query, &options)).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    retrieve_timer.finish_error(ErrorCategory::RetrievalUnavailable);
                    let _ = tx.send(Event::error(ErrorCategory::RetrievalUnavailable, e.to_string())).await;
                    return Err(ErrorCategory::RetrievalUnavailable);
                },
            };
            if let Some(warning) = &outcome.warning {
                let _ = tx.send(Event::warning(warning.clone(), Some(PipelineNode::Retrieve))).await;
            }
            let documents = outcome.documents;
            let documents_retrieved = documents.len();
            retrieve_timer.finish(&format!("count={documents_retrieved}"));
            let _ = tx
                .send(Event::node_end(PipelineNode::Retrieve, serde_json::json!({"count": documents_retrieved})))
                .await;

            if cancellation.is_cancelled() {
                let _ = tx.send(Event::error(ErrorCategory::Cancelled, "cancelled")).await;
                return Err(ErrorCategory::Cancelled);
            }

            let _ = tx.send(Event::node_start(PipelineNode::Rerank)).await;
            let rerank_timer = NodeTimer::start(PipelineNode::Rerank);
            let retrieved_for_fallback = documents.clone();
            let reranked = match retry_with_backoff(|| self.reranker.rerank(&current_query, documents.clone())).await
            {
                Ok(docs) => docs,
                Err(e) => {
                    let _ = tx
                        .send(Event::warning(format!("reranker_unavailable: {e}"), Some(PipelineNode::Rerank)))
                        .await;
                    cascaded_fallback(retrieved_for_fallback, &current_query, self.config.rerank_top_k)
                },
            };
            rerank_timer.finish(&format!("count={}", reranked.len()));
            let _ = tx
                .send(Event::node_end(PipelineNode::Rerank, serde_json::json!({"count": reranked.len()})))
                .await;

            if cancellation.is_cancelled() {
                let _ = tx.send(Event::error(ErrorCategory::Cancelled, "cancelled")).await;
                return Err(ErrorCategory::Cancelled);
            }

            let _ = tx.send(Event::node_start(PipelineNode::Grade)).await;
            let grade_timer = NodeTimer::start(PipelineNode::Grade);
            let grade_outcome = match grader::grade(&self.llm, &self.config.model, &current_query, reranked).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    grade_timer.finish_error(ErrorCategory::LlmUnavailable);
                    let _ = tx.send(Event::error(ErrorCategory::LlmUnavailable, e.to_string())).await;
                    return Err(ErrorCategory::LlmUnavailable);
                },
            };
            if let Some(warning) = &grade_outcome.warning {
                let _ = tx.send(Event::warning(warning.clone(), Some(PipelineNode::Grade))).await;
            }
            grade_timer.finish(&format!(
                "kept={} heuristic_sufficiency={:.2}",
                grade_outcome.kept_count, grade_outcome.heuristic_sufficiency
            ));
            let _ = tx
                .send(Event::node_end(
                    PipelineNode::Grade,
                    serde_json::json!({
                        "kept": grade_outcome.kept_count,
                        "heuristic_sufficiency": grade_outcome.heuristic_sufficiency,
                    }),
                ))
                .await;

            let min_confidence = docqa_config::constants::pipeline::GRADE_CONFIDENCE_THRESHOLD;
            let relevant: Vec<Document> = grade_outcome
                .documents
                .iter()
                .filter(|d| d.is_graded_relevant(min_confidence))
                .cloned()
                .collect();

            if !relevant.is_empty() {
                return Ok((relevant, documents_retrieved, retry_count, false));
            }

            if retry_count < docqa_core::session::MAX_RETRIES {
                retry_count += 1;

                let _ = tx.send(Event::node_start(PipelineNode::RewriteQuery)).await;
                let rewrite_timer = NodeTimer::start(PipelineNode::RewriteQuery);
                let rewritten = match rewriter::rewrite_query(
                    &self.llm,
                    &self.config.model,
                    &current_query,
                    &grade_outcome.documents,
                )
                .await
                {
                    Ok(q) => q,
                    Err(e) => {
                        rewrite_timer.finish_error(ErrorCategory::LlmUnavailable);
                        let _ = tx.send(Event::error(ErrorCategory::LlmUnavailable, e.to_string())).await;
                        return Err(ErrorCategory::LlmUnavailable);
                    },
                };
                let changed = rewritten != current_query;
                rewrite_timer.finish(&format!("changed={changed}"));
                let _ = tx
                    .send(Event::node_end(PipelineNode::RewriteQuery, serde_json::json!({"changed": changed})))
                    .await;
                current_query = rewritten;
                continue;
            }

            return Ok((grade_outcome.documents, documents_retrieved, retry_count, true));
        }
    }

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }
}
