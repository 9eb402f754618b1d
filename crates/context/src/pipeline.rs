//! Context pipeline: rerank retrieved documents, then assemble.
//!
//! # Flow
//!
//! 1. Rerank the request's documents against the query, keeping `top_k`
//! 2. Hand the reranked documents to the assembler, whose tier 4 pruning
//!    now sees the reranked scores
//! 3. Return the assembled context together with the ranking used

use std::sync::Arc;

use strata_core::Document;
use strata_retrieval::Reranker;
use tracing::debug;

use crate::assembler::{AssembledContext, AssemblyRequest, SmartContextAssembler};

/// Output of [`ContextPipeline::prepare`].
#[derive(Debug, Clone)]
pub struct PreparedContext {
    pub assembled: AssembledContext,
    /// Documents in reranked order, annotated with their scores.
    pub documents: Vec<Document>,
}

impl PreparedContext {
    pub fn context(&self) -> &str {
        &self.assembled.context
    }
}

pub struct ContextPipeline {
    reranker: Arc<dyn Reranker>,
    assembler: Arc<SmartContextAssembler>,
    top_k: usize,
}

impl ContextPipeline {
    pub fn new(reranker: Arc<dyn Reranker>, assembler: Arc<SmartContextAssembler>, top_k: usize) -> Self {
        Self {
            reranker,
            assembler,
            top_k,
        }
    }

    pub fn assembler(&self) -> &SmartContextAssembler {
        &self.assembler
    }

    /// Rerank `request.documents` for `query` and assemble the result.
    /// A blank query skips reranking.
    pub async fn prepare(&self, query: &str, mut request: AssemblyRequest) -> PreparedContext {
        let documents = std::mem::take(&mut request.documents);
        let candidates = documents.len();

        let ranked = if query.trim().is_empty() {
            documents
        } else {
            self.reranker.rerank(query, documents, self.top_k)
        };
        debug!(
            reranker = self.reranker.name(),
            candidates,
            kept = ranked.len(),
            "Documents reranked for assembly"
        );

        request.documents = ranked.clone();
        let assembled = self.assembler.assemble(request).await;

        PreparedContext {
            assembled,
            documents: ranked,
        }
    }
}
