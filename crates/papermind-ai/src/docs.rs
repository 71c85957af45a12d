//! A searchable collection of PDFs that answers questions with citations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use papermind_core::DocumentOrigin;
use papermind_core::config::QaConfig;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunker::chunk_text;
use crate::error::{AiError, Result};
use crate::llm::ChatModel;
use crate::pdf::extract_pdf_text;
use crate::retrieval::EvidenceRanker;

/// Answer given when no loaded text is relevant to the question.
pub const NO_ANSWER: &str = "I cannot answer this question based on the loaded documents.";

const NOT_APPLICABLE: &str = "Not applicable";

const SUMMARY_SYSTEM_PROMPT: &str = "You extract evidence from scientific papers. \
Summarize the excerpt below in at most three sentences, keeping only what helps \
answer the question. Keep numbers and named methods. If the excerpt is irrelevant, \
reply exactly \"Not applicable\".";

const ANSWER_SYSTEM_PROMPT: &str = "You are a research assistant. Answer the question \
using ONLY the numbered context. Cite sources inline as [1], [2]. If the context does \
not contain the answer, say you cannot answer. Do not make up information.";

/// Attributes used to restrict which documents a question searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTags {
    pub origin: DocumentOrigin,
    /// Zotero collection keys.
    pub collections: Vec<String>,
    pub tags: Vec<String>,
}

impl DocTags {
    pub fn local() -> Self {
        Self {
            origin: DocumentOrigin::Local,
            collections: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn zotero(collections: Vec<String>, tags: Vec<String>) -> Self {
        Self {
            origin: DocumentOrigin::Zotero,
            collections,
            tags,
        }
    }
}

/// Restriction applied to a query. Every field left `None` matches all documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocFilter {
    pub origin: Option<DocumentOrigin>,
    pub collection: Option<String>,
    pub tag: Option<String>,
}

impl DocFilter {
    pub fn is_empty(&self) -> bool {
        self.origin.is_none() && self.collection.is_none() && self.tag.is_none()
    }

    pub fn matches(&self, tags: &DocTags) -> bool {
        if self.origin.is_some_and(|o| o != tags.origin) {
            return false;
        }
        if let Some(key) = &self.collection
            && !tags.collections.iter().any(|c| c == key)
        {
            return false;
        }
        if let Some(tag) = &self.tag
            && !tags.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added { chunks: usize },
    AlreadyPresent,
}

/// One piece of evidence that went into an answer.
#[derive(Debug, Clone)]
pub struct Context {
    pub doc_path: PathBuf,
    pub citation: String,
    pub origin: DocumentOrigin,
    pub text: String,
    /// Condensed evidence produced by the summary model.
    pub summary: String,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub contexts: Vec<Context>,
}

impl Answer {
    fn unanswerable(question: &str) -> Self {
        Self {
            question: question.to_string(),
            answer: NO_ANSWER.to_string(),
            contexts: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct DocEntry {
    path: PathBuf,
    citation: String,
    tags: DocTags,
}

#[derive(Debug)]
struct ChunkEntry {
    doc: Uuid,
    text: String,
}

pub struct Docs {
    llm: Arc<dyn ChatModel>,
    summary_llm: Arc<dyn ChatModel>,
    settings: QaConfig,
    docs: HashMap<Uuid, DocEntry>,
    by_path: HashMap<PathBuf, Uuid>,
    chunks: Vec<ChunkEntry>,
    ranker: EvidenceRanker,
}

impl Docs {
    pub fn new(
        llm: Arc<dyn ChatModel>,
        summary_llm: Arc<dyn ChatModel>,
        settings: QaConfig,
    ) -> Result<Self> {
        Ok(Self {
            llm,
            summary_llm,
            settings,
            docs: HashMap::new(),
            by_path: HashMap::new(),
            chunks: Vec::new(),
            ranker: EvidenceRanker::new()?,
        })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn count_by_origin(&self, origin: DocumentOrigin) -> usize {
        self.docs.values().filter(|d| d.tags.origin == origin).count()
    }

    /// Read, chunk and index the PDF at `path`. The citation defaults to the file stem.
    ///
    /// A path that is already indexed is not read again, but its citation and
    /// tags are replaced so later filters see the current metadata.
    pub async fn add(
        &mut self,
        path: &Path,
        citation: Option<String>,
        tags: DocTags,
    ) -> Result<AddOutcome> {
        let citation = citation
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| default_citation(path));

        if let Some(entry) = self.by_path.get(path).and_then(|id| self.docs.get_mut(id)) {
            debug!(path = %path.display(), "document already loaded, refreshing metadata");
            entry.citation = citation;
            entry.tags = tags;
            return Ok(AddOutcome::AlreadyPresent);
        }

        let text = extract_pdf_text(path).await?;
        let chunks = chunk_text(&text, self.settings.chunk_chars, self.settings.chunk_overlap);
        if chunks.is_empty() {
            return Err(AiError::EmptyDocument(path.display().to_string()));
        }

        let id = Uuid::new_v4();
        let count = chunks.len();
        for chunk in chunks {
            self.ranker.add(&chunk.content)?;
            self.chunks.push(ChunkEntry {
                doc: id,
                text: chunk.content,
            });
        }
        self.ranker.commit()?;
        self.docs.insert(
            id,
            DocEntry {
                path: path.to_path_buf(),
                citation,
                tags,
            },
        );
        self.by_path.insert(path.to_path_buf(), id);

        info!(%id, path = %path.display(), chunks = count, "document indexed");
        Ok(AddOutcome::Added { chunks: count })
    }

    /// Answer `question` from the documents accepted by `filter`.
    pub async fn query(&self, question: &str, filter: &DocFilter) -> Result<Answer> {
        if self.is_empty() {
            return Err(AiError::NoDocuments);
        }

        let hits = self.ranker.rank(
            question,
            |chunk_id| {
                self.docs
                    .get(&self.chunks[chunk_id].doc)
                    .is_some_and(|d| filter.matches(&d.tags))
            },
            self.settings.evidence_k,
        )?;
        if hits.is_empty() {
            debug!(question, "no relevant evidence");
            return Ok(Answer::unanswerable(question));
        }

        let candidates: Vec<Context> = hits
            .into_iter()
            .filter_map(|(chunk_id, score)| {
                let chunk = &self.chunks[chunk_id];
                let doc = self.docs.get(&chunk.doc)?;
                Some(Context {
                    doc_path: doc.path.clone(),
                    citation: doc.citation.clone(),
                    origin: doc.tags.origin,
                    text: chunk.text.clone(),
                    summary: String::new(),
                    score,
                })
            })
            .collect();

        let contexts = self.summarize_evidence(question, candidates).await;
        if contexts.is_empty() {
            return Ok(Answer::unanswerable(question));
        }

        let prompt = build_answer_prompt(question, &contexts);
        info!(
            model = self.llm.model_name(),
            evidence = contexts.len(),
            "answering from evidence"
        );
        let answer = self.llm.complete(ANSWER_SYSTEM_PROMPT, &prompt).await?;

        Ok(Answer {
            question: question.to_string(),
            answer,
            contexts: contexts.into_iter().take(self.settings.max_sources).collect(),
        })
    }

    /// Condense each piece of evidence concurrently, dropping irrelevant ones.
    /// Evidence whose summary call fails keeps its raw text.
    async fn summarize_evidence(&self, question: &str, candidates: Vec<Context>) -> Vec<Context> {
        let summaries = join_all(candidates.iter().map(|ctx| {
            let prompt = format!(
                "Question: {question}\n\nExcerpt from {}:\n{}\n\nRelevant information summary:",
                ctx.citation, ctx.text
            );
            async move { self.summary_llm.complete(SUMMARY_SYSTEM_PROMPT, &prompt).await }
        }))
        .await;

        candidates
            .into_iter()
            .zip(summaries)
            .filter_map(|(mut ctx, summary)| match summary {
                Ok(s) if s.trim_start().starts_with(NOT_APPLICABLE) => None,
                Ok(s) => {
                    ctx.summary = s;
                    Some(ctx)
                }
                Err(err) => {
                    warn!(citation = %ctx.citation, error = %err, "evidence summary failed");
                    ctx.summary = ctx.text.clone();
                    Some(ctx)
                }
            })
            .collect()
    }
}

fn default_citation(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_answer_prompt(question: &str, contexts: &[Context]) -> String {
    let mut prompt = format!("Question: {question}\n\nContext:\n");
    for (i, ctx) in contexts.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[{}] {} (relevance: {:.2})\n{}\n",
            i + 1,
            ctx.citation,
            ctx.score,
            ctx.summary
        ));
    }
    prompt.push_str("\nAnswer:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::write_test_pdf;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records prompts and answers with a fixed reply.
    struct StubModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl StubModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatModel for StubModel {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn settings() -> QaConfig {
        QaConfig {
            chunk_chars: 200,
            chunk_overlap: 20,
            evidence_k: 10,
            max_sources: 5,
        }
    }

    struct Fixture {
        _dir: TempDir,
        docs: Docs,
        llm: Arc<StubModel>,
        summary: Arc<StubModel>,
        zotero_pdf: PathBuf,
        local_pdf: PathBuf,
    }

    async fn fixture(summary_reply: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        let zotero_pdf = dir.path().join("transformers.pdf");
        let local_pdf = dir.path().join("notes.pdf");
        write_test_pdf(&zotero_pdf, &["Attention layers replace recurrence in the Transformer"]);
        write_test_pdf(&local_pdf, &["Gradient descent converges for convex losses"]);

        let llm = StubModel::new("Attention replaces recurrence [1].");
        let summary = StubModel::new(summary_reply);
        let mut docs = Docs::new(llm.clone(), summary.clone(), settings()).unwrap();
        docs.add(
            &zotero_pdf,
            Some("Vaswani, A. (2017). Attention Is All You Need".to_string()),
            DocTags::zotero(vec!["COL1".into()], vec!["nlp".into()]),
        )
        .await
        .unwrap();
        docs.add(&local_pdf, None, DocTags::local()).await.unwrap();

        Fixture {
            _dir: dir,
            docs,
            llm,
            summary,
            zotero_pdf,
            local_pdf,
        }
    }

    #[tokio::test]
    async fn add_is_idempotent_per_path() {
        let mut f = fixture("relevant").await;
        assert_eq!(f.docs.len(), 2);
        let again = f.docs.add(&f.local_pdf, None, DocTags::local()).await.unwrap();
        assert_eq!(again, AddOutcome::AlreadyPresent);
        assert_eq!(f.docs.len(), 2);
        assert_eq!(f.docs.count_by_origin(DocumentOrigin::Zotero), 1);
        assert!(f.docs.contains(&f.zotero_pdf));
    }

    #[tokio::test]
    async fn default_citation_is_file_stem() {
        let f = fixture("relevant").await;
        let answer = f
            .docs
            .query("gradient descent convex", &DocFilter::default())
            .await
            .unwrap();
        assert_eq!(answer.contexts.len(), 1);
        assert_eq!(answer.contexts[0].doc_path, f.local_pdf);
        assert_eq!(answer.contexts[0].citation, "notes");
    }

    #[tokio::test]
    async fn re_adding_refreshes_citation_and_tags() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("resnet.pdf");
        write_test_pdf(&pdf, &["Residual networks ease the training of deep models"]);
        let mut docs =
            Docs::new(StubModel::new("ok [1]."), StubModel::new("Residuals help."), settings())
                .unwrap();

        let first = docs
            .add(&pdf, None, DocTags::zotero(Vec::new(), Vec::new()))
            .await
            .unwrap();
        assert_eq!(first, AddOutcome::Added { chunks: 1 });

        let by_tag = DocFilter {
            tag: Some("vision".into()),
            ..Default::default()
        };
        let before = docs.query("residual networks", &by_tag).await.unwrap();
        assert_eq!(before.answer, NO_ANSWER);

        let again = docs
            .add(
                &pdf,
                Some("He, K. (2016). Deep Residual Learning".into()),
                DocTags::zotero(vec!["COL9".into()], vec!["vision".into()]),
            )
            .await
            .unwrap();
        assert_eq!(again, AddOutcome::AlreadyPresent);
        assert_eq!(docs.len(), 1);

        let after = docs.query("residual networks", &by_tag).await.unwrap();
        assert_eq!(after.contexts.len(), 1);
        assert_eq!(after.contexts[0].citation, "He, K. (2016). Deep Residual Learning");

        let by_collection = DocFilter {
            collection: Some("COL9".into()),
            ..Default::default()
        };
        let scoped = docs.query("residual networks", &by_collection).await.unwrap();
        assert_eq!(scoped.contexts.len(), 1);
    }

    #[tokio::test]
    async fn answers_with_cited_context() {
        let f = fixture("Attention replaces recurrence.").await;
        let answer = f
            .docs
            .query("Why does the Transformer use attention?", &DocFilter::default())
            .await
            .unwrap();

        assert_eq!(answer.answer, "Attention replaces recurrence [1].");
        assert_eq!(answer.contexts.len(), 1);
        assert_eq!(answer.contexts[0].doc_path, f.zotero_pdf);
        assert_eq!(answer.contexts[0].origin, DocumentOrigin::Zotero);
        assert_eq!(answer.contexts[0].summary, "Attention replaces recurrence.");

        let prompts = f.llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("[1] Vaswani, A. (2017). Attention Is All You Need"));
    }

    #[tokio::test]
    async fn irrelevant_question_skips_llm() {
        let f = fixture("relevant").await;
        let answer = f
            .docs
            .query("Which stocks rallied yesterday?", &DocFilter::default())
            .await
            .unwrap();
        assert_eq!(answer.answer, NO_ANSWER);
        assert!(answer.contexts.is_empty());
        assert_eq!(f.llm.calls(), 0);
        assert_eq!(f.summary.calls(), 0);
    }

    #[tokio::test]
    async fn not_applicable_evidence_is_dropped() {
        let f = fixture("Not applicable").await;
        let answer = f
            .docs
            .query("attention transformer", &DocFilter::default())
            .await
            .unwrap();
        assert_eq!(answer.answer, NO_ANSWER);
        assert_eq!(f.summary.calls(), 1);
        assert_eq!(f.llm.calls(), 0);
    }

    #[tokio::test]
    async fn filters_restrict_documents() {
        let f = fixture("relevant").await;

        let local_only = DocFilter {
            origin: Some(DocumentOrigin::Local),
            ..Default::default()
        };
        let answer = f.docs.query("attention transformer", &local_only).await.unwrap();
        assert_eq!(answer.answer, NO_ANSWER);

        let by_tag = DocFilter {
            tag: Some("NLP".into()),
            ..Default::default()
        };
        let answer = f.docs.query("attention transformer", &by_tag).await.unwrap();
        assert_eq!(answer.contexts.len(), 1);

        let other_collection = DocFilter {
            collection: Some("COL2".into()),
            ..Default::default()
        };
        let answer = f.docs.query("attention transformer", &other_collection).await.unwrap();
        assert!(answer.contexts.is_empty());
    }

    #[tokio::test]
    async fn empty_collection_is_error() {
        let docs = Docs::new(StubModel::new("x"), StubModel::new("x"), settings()).unwrap();
        assert!(matches!(
            docs.query("anything", &DocFilter::default()).await,
            Err(AiError::NoDocuments)
        ));
    }

    #[test]
    fn filter_matching() {
        let tags = DocTags::zotero(vec!["K1".into()], vec!["Vision".into()]);
        assert!(DocFilter::default().matches(&tags));
        assert!(DocFilter::default().is_empty());
        assert!(DocFilter { tag: Some("vision".into()), ..Default::default() }.matches(&tags));
        assert!(!DocFilter { collection: Some("K2".into()), ..Default::default() }.matches(&tags));
        assert!(!DocFilter { origin: Some(DocumentOrigin::Local), ..Default::default() }.matches(&tags));
    }
}
