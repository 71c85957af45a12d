//! BM25 ranking of text chunks over an in-memory tantivy index.

use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, IndexRecordOption, STORED, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::tokenizer::{
    LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, doc};
use tracing::debug;

use crate::error::Result;

const ANALYZER: &str = "evidence";
const WRITER_HEAP_BYTES: usize = 20_000_000;

const STOP_WORDS: &[&str] = &[
    "a", "an", "as", "at", "be", "by", "do", "in", "is", "it", "of", "on", "or", "s", "t", "to",
    "the", "and", "for", "are", "was", "were", "with", "that", "this", "from", "what", "which",
    "how", "why", "who", "does", "did", "has", "have", "had", "not", "but", "can", "its", "into",
    "than", "then", "there", "their", "these", "those", "about", "between", "they", "them",
];

/// Lowercased alphanumeric tokens with stop words removed.
pub fn evidence_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(STOP_WORDS.iter().map(|w| w.to_string())))
        .build()
}

/// Chunks added one at a time; chunk ids are insertion indices. Added chunks
/// become searchable after [`EvidenceRanker::commit`].
pub struct EvidenceRanker {
    index: Index,
    reader: IndexReader,
    writer: IndexWriter,
    chunk_field: Field,
    text_field: Field,
    len: usize,
}

impl std::fmt::Debug for EvidenceRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceRanker").field("chunks", &self.len).finish()
    }
}

impl EvidenceRanker {
    pub fn new() -> Result<Self> {
        let mut schema_builder = Schema::builder();
        let chunk_field = schema_builder.add_u64_field("chunk", STORED);
        let indexing = TextFieldIndexing::default()
            .set_tokenizer(ANALYZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_field = schema_builder.add_text_field(
            "text",
            TextOptions::default().set_indexing_options(indexing),
        );
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        index.tokenizers().register(ANALYZER, evidence_analyzer());

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;

        Ok(Self {
            index,
            reader,
            writer,
            chunk_field,
            text_field,
            len: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn add(&mut self, text: &str) -> Result<usize> {
        let id = self.len;
        self.writer.add_document(doc!(
            self.chunk_field => id as u64,
            self.text_field => text,
        ))?;
        self.len += 1;
        Ok(id)
    }

    /// Make every chunk added so far visible to [`EvidenceRanker::rank`].
    pub fn commit(&mut self) -> Result<()> {
        self.writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// Top `k` chunk ids accepted by `allowed`, best first. Chunks sharing no
    /// term with the query are never returned.
    pub fn rank<F>(&self, query: &str, allowed: F, k: usize) -> Result<Vec<(usize, f32)>>
    where
        F: Fn(usize) -> bool,
    {
        if self.len == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let parser = QueryParser::for_index(&self.index, vec![self.text_field]);
        let (parsed, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            debug!(query, ignored = errors.len(), "query syntax relaxed");
        }

        let searcher = self.reader.searcher();
        let hits = searcher.search(&parsed, &TopDocs::with_limit(self.len))?;

        let mut ranked = Vec::new();
        for (score, address) in hits {
            let stored: TantivyDocument = searcher.doc(address)?;
            let Some(id) = stored.get_first(self.chunk_field).and_then(|v| v.as_u64()) else {
                continue;
            };
            let id = id as usize;
            if score > 0.0 && allowed(id) {
                ranked.push((id, score));
            }
        }

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::tokenizer::TokenStream;

    fn ranker(texts: &[&str]) -> EvidenceRanker {
        let mut r = EvidenceRanker::new().unwrap();
        for t in texts {
            r.add(t).unwrap();
        }
        r.commit().unwrap();
        r
    }

    #[test]
    fn analyzer_drops_stop_words() {
        let mut analyzer = evidence_analyzer();
        let mut stream = analyzer.token_stream("What is the Transformer's attention-mechanism?");
        let mut tokens = Vec::new();
        while let Some(token) = stream.next() {
            tokens.push(token.text.clone());
        }
        assert_eq!(tokens, vec!["transformer", "attention", "mechanism"]);
    }

    #[test]
    fn best_match_ranks_first() {
        let r = ranker(&[
            "Convolutional networks for image recognition.",
            "Attention mechanisms let the transformer weigh tokens. Attention is central.",
            "Recurrent networks process sequences step by step.",
        ]);
        let hits = r.rank("how does attention work in a transformer?", |_| true, 10).unwrap();
        assert_eq!(hits[0].0, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn no_shared_terms_gives_nothing() {
        let r = ranker(&["protein folding dynamics", "galaxy rotation curves"]);
        assert!(r.rank("stock market volatility", |_| true, 5).unwrap().is_empty());
        assert!(r.rank("what is the", |_| true, 5).unwrap().is_empty());
    }

    #[test]
    fn filter_excludes_chunks() {
        let r = ranker(&["neural networks", "neural networks again"]);
        let hits = r.rank("neural", |id| id == 1, 5).unwrap();
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn top_k_is_respected() {
        let r = ranker(&["graph graph", "graph", "graph theory", "graph neural"]);
        assert_eq!(r.rank("graph", |_| true, 2).unwrap().len(), 2);
        assert!(r.rank("graph", |_| true, 0).unwrap().is_empty());
    }

    #[test]
    fn uncommitted_chunks_are_not_searchable() {
        let mut r = EvidenceRanker::new().unwrap();
        assert_eq!(r.add("sparse coding dictionaries").unwrap(), 0);
        assert!(r.rank("sparse", |_| true, 3).unwrap().is_empty());
        r.commit().unwrap();
        assert_eq!(r.rank("sparse", |_| true, 3).unwrap().len(), 1);
    }

    #[test]
    fn unbalanced_query_syntax_is_tolerated() {
        let r = ranker(&["dropout regularizes networks"]);
        let hits = r.rank("why does dropout (help", |_| true, 3).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn empty_ranker() {
        let r = EvidenceRanker::new().unwrap();
        assert!(r.is_empty());
        assert!(r.rank("anything", |_| true, 3).unwrap().is_empty());
    }
}
