//! State shared by every action of one PaperMind process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use papermind_ai::{AddOutcome, ChatModel, DocFilter, DocTags, Docs, OpenAiChat};
use papermind_core::{
    AppConfig, DocumentOrigin, LibraryInventory, MetadataStore, PapermindError, PaperFile,
    match_item_to_pdf, scan_pdfs,
};
use papermind_science::Doi;
use papermind_science::identifiers::{extract_dois_from_text, normalize_identifier};
use papermind_science::sources::crossref::CrossRefSource;
use papermind_science::sources::mirror::{DownloadOutcome, MirrorSource};
use papermind_science::sources::zotero::{NewItem, ZoteroSource};
use tracing::{info, warn};

use crate::render;

/// Sync report lines shown before the remainder is summarized.
const SYNC_REPORT_LINES: usize = 10;
const TITLE_DISPLAY_CHARS: usize = 50;

pub const NEED_USER: &str = "❌ Detect the Zotero user first";
pub const NO_DOCUMENTS: &str = "❌ No documents loaded. Run 'load' first.";

/// Where the session keeps state between processes.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub metadata: PathBuf,
    pub cache: PathBuf,
}

impl StatePaths {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            metadata: config.metadata_store_path(),
            cache: config.cache_dir(),
        }
    }
}

pub struct Session {
    config: AppConfig,
    paths: StatePaths,
    zotero: ZoteroSource,
    crossref: CrossRefSource,
    mirror: MirrorSource,
    user_id: Option<u64>,
    /// Collection name → key, in listing order of names.
    collections: BTreeMap<String, String>,
    store: MetadataStore,
    docs: Docs,
    processed: Vec<PathBuf>,
}

impl Session {
    /// Session talking to the configured OpenAI-compatible endpoint.
    pub fn new(config: AppConfig) -> Result<Self> {
        let llm = Arc::new(OpenAiChat::from_config(&config.llm, &config.llm.model)?);
        let summary_llm = Arc::new(OpenAiChat::from_config(&config.llm, &config.llm.summary_model)?);
        let paths = StatePaths::from_config(&config);
        Self::with_models(config, paths, llm, summary_llm)
    }

    pub fn with_models(
        config: AppConfig,
        paths: StatePaths,
        llm: Arc<dyn ChatModel>,
        summary_llm: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        let zotero_key = config
            .zotero
            .api_key
            .clone()
            .ok_or_else(|| PapermindError::MissingCredential("ZOTERO_API_KEY".to_string()))?;
        let zotero = ZoteroSource::new(
            &config.zotero.base_url,
            &zotero_key,
            &config.zotero.item_type,
            config.zotero.page_size,
        )?;
        let crossref = CrossRefSource::new(
            &config.crossref.base_url,
            config.crossref.polite_email.as_deref(),
            &paths.cache,
        )?;
        let mirror = MirrorSource::new(
            &config.download.mirror,
            Duration::from_secs(config.download.timeout_secs),
        )?;
        let store = MetadataStore::load(&paths.metadata)
            .with_context(|| format!("reading {}", paths.metadata.display()))?;
        let docs = Docs::new(llm, summary_llm, config.qa.clone())?;

        Ok(Self {
            config,
            paths,
            zotero,
            crossref,
            mirror,
            user_id: None,
            collections: BTreeMap::new(),
            store,
            docs,
            processed: Vec::new(),
        })
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user_id
    }

    /// Key of the collection named `name`, or `name` itself when it is a known key.
    ///
    /// Keys seen on synchronized items count as known. Until collections have
    /// been listed nothing can be ruled out, so `name` is taken as a raw key.
    pub fn collection_key<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if let Some(key) = self.collections.get(name) {
            return Some(key.as_str());
        }
        let known = self.collections.is_empty()
            || self.collections.values().any(|key| key == name)
            || self.store.collections().iter().any(|key| key == name);
        known.then_some(name)
    }

    pub async fn detect_user(&mut self) -> Result<String> {
        let user_id = self.zotero.detect_user_id().await?;
        self.user_id = Some(user_id);
        info!(user_id, "zotero user detected");
        Ok(format!("✅ Zotero user detected: {user_id}"))
    }

    pub async fn list_collections(&mut self) -> Result<String> {
        let Some(user_id) = self.user_id else {
            return Ok(NEED_USER.to_string());
        };
        let collections = self.zotero.list_collections(user_id).await?;
        self.collections = collections.into_iter().map(|c| (c.name, c.key)).collect();

        let mut out = format!("📚 Found {} collections:\n", self.collections.len());
        for (name, key) in &self.collections {
            out.push_str(&format!("• {name} ({key})\n"));
        }
        Ok(out)
    }

    /// Look the DOI up, create the Zotero item and try to fetch its PDF.
    pub async fn add_by_doi(&mut self, input: &str, collection: Option<&str>) -> Result<String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok("❌ Enter a valid DOI".to_string());
        }
        let Some(user_id) = self.user_id else {
            return Ok(NEED_USER.to_string());
        };

        let doi = match Doi::parse(input) {
            Ok(doi) => doi,
            Err(_) => match extract_dois_from_text(input).into_iter().next() {
                Some(doi) => doi,
                None => {
                    return Ok(format!(
                        "❌ Could not fetch metadata for DOI: {}",
                        normalize_identifier(input)
                    ));
                }
            },
        };

        let metadata = match self.crossref.fetch_metadata(&doi).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(doi = %doi, error = %err, "metadata lookup failed");
                return Ok(format!("❌ Could not fetch metadata for DOI: {doi}"));
            }
        };

        let collection_key = collection.and_then(|name| self.collection_key(name));
        let item = NewItem::from_metadata(&metadata, collection_key);
        let item_key = self.zotero.create_item(user_id, &item).await?;
        info!(item_key, doi = %doi, "zotero item created");

        let download = self.download_line(&doi, &metadata.title).await;
        let title = if metadata.title.trim().is_empty() {
            "Untitled"
        } else {
            metadata.title.as_str()
        };
        Ok(format!(
            "✅ Item added to Zotero\n📄 Title: {title}\n{download}"
        ))
    }

    async fn download_line(&self, doi: &Doi, title: &str) -> String {
        if !self.config.download.enabled {
            return format!("⚠️ PDF not automatically available for DOI: {doi}");
        }
        let title = Some(title).filter(|t| !t.trim().is_empty());
        match self
            .mirror
            .download_pdf(&doi.normalized, title, &self.config.papers_dir())
            .await
        {
            Ok(DownloadOutcome::Saved(path)) => {
                let file = path
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                format!("📥 PDF downloaded: {file}")
            }
            Ok(DownloadOutcome::Unavailable) => {
                format!("⚠️ PDF not automatically available for DOI: {doi}")
            }
            Err(err) => format!("⚠️ PDF download error: {err}"),
        }
    }

    /// Attach Zotero metadata to the PDFs already in the papers directory.
    pub async fn sync(&mut self, collection: Option<&str>) -> Result<String> {
        let Some(user_id) = self.user_id else {
            return Ok(NEED_USER.to_string());
        };

        let collection_key = collection
            .and_then(|name| self.collection_key(name))
            .map(str::to_string);
        let items = self
            .zotero
            .list_items(user_id, collection_key.as_deref())
            .await?;
        let pdfs = scan_pdfs(&self.config.papers_dir())?;

        let mut lines = Vec::with_capacity(items.len());
        let mut matched = 0;
        for item in &items {
            let title = item.title();
            match match_item_to_pdf(title, &item.data.doi, &pdfs) {
                Some(pdf) => {
                    self.store.insert(pdf, item.to_item_metadata());
                    lines.push(format!("✅ {} → {title}", file_name(pdf)));
                    matched += 1;
                }
                None => lines.push(format!("⚠️ No local PDF for: {title}")),
            }
        }
        self.store.save(&self.paths.metadata)?;
        info!(items = items.len(), matched, "sync finished");

        let mut out = format!("🔄 Sync complete:\n📄 {matched} PDFs with enriched metadata\n\n");
        out.push_str(
            &lines
                .iter()
                .take(SYNC_REPORT_LINES)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n"),
        );
        if lines.len() > SYNC_REPORT_LINES {
            out.push_str(&format!("\n... and {} more", lines.len() - SYNC_REPORT_LINES));
        }
        Ok(out)
    }

    /// Index every PDF of both directories for question answering.
    pub async fn load_documents(&mut self) -> Result<String> {
        let inventory =
            LibraryInventory::scan(&self.config.papers_dir(), &self.config.local_papers_dir())?;
        if inventory.is_empty() {
            return Ok("❌ No PDFs in either directory".to_string());
        }

        let mut lines = Vec::new();
        let mut loaded = 0;

        if !inventory.zotero.is_empty() {
            lines.push(format!("📚 ZOTERO PAPERS ({} files):", inventory.zotero.len()));
            for file in &inventory.zotero {
                info!(file = %file.file_name(), "processing zotero paper");
                let metadata = self.store.get(&file.path).cloned();
                let (citation, tags, display) = match metadata {
                    Some(meta) => (
                        Some(meta.citation()),
                        DocTags::zotero(meta.collections.clone(), meta.tags.clone()),
                        meta.title.clone(),
                    ),
                    None => (None, DocTags::zotero(Vec::new(), Vec::new()), file.file_name()),
                };
                match self.add_document(file, citation, tags).await {
                    Ok(()) => {
                        loaded += 1;
                        let short: String = display.chars().take(TITLE_DISPLAY_CHARS).collect();
                        lines.push(format!("  ✅ {} → {short}...", file.file_name()));
                    }
                    Err(err) => lines.push(format!("  ❌ {}: {err}", file.file_name())),
                }
            }
        }

        if !inventory.local.is_empty() {
            lines.push(format!("\n📁 LOCAL PAPERS ({} files):", inventory.local.len()));
            for file in &inventory.local {
                info!(file = %file.file_name(), "processing local paper");
                let citation = format!("Local document: {}", file.stem());
                match self.add_document(file, Some(citation), DocTags::local()).await {
                    Ok(()) => {
                        loaded += 1;
                        lines.push(format!("  ✅ {} [LOCAL PAPER]", file.file_name()));
                    }
                    Err(err) => lines.push(format!("  ❌ {}: {err}", file.file_name())),
                }
            }
        }

        let mut out = format!(
            "📚 LIBRARY LOADED: {loaded}/{} documents\n🔗 Zotero: {} papers with enriched metadata\n📁 Local: {} papers from the personal directory\n\n",
            inventory.total(),
            inventory.zotero.len(),
            inventory.local.len(),
        );
        out.push_str(&lines.join("\n"));
        if loaded > 0 {
            out.push_str("\n\n🚀 Unified library ready! Query papers from both sources at once.");
        }
        Ok(out)
    }

    async fn add_document(
        &mut self,
        file: &PaperFile,
        citation: Option<String>,
        tags: DocTags,
    ) -> papermind_ai::Result<()> {
        if let AddOutcome::Added { chunks } = self.docs.add(&file.path, citation, tags).await? {
            tracing::debug!(file = %file.file_name(), chunks, "paper indexed");
        }
        if !self.processed.contains(&file.path) {
            self.processed.push(file.path.clone());
        }
        Ok(())
    }

    /// Answer `question` from the loaded documents, optionally restricted.
    pub async fn ask(
        &self,
        question: &str,
        collection: Option<&str>,
        tag: Option<&str>,
    ) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Ok("❓ Enter a question".to_string());
        }
        if self.processed.is_empty() || self.docs.is_empty() {
            return Ok(NO_DOCUMENTS.to_string());
        }

        let collection = collection.map(str::trim).filter(|c| !c.is_empty());
        let tag = tag.map(str::trim).filter(|t| !t.is_empty());

        let collection_key = match collection {
            Some(name) => match self.collection_key(name) {
                Some(key) => Some(key.to_string()),
                None => return Ok(format!("❌ Unknown collection: {name}")),
            },
            None => None,
        };
        let filter = DocFilter {
            origin: None,
            collection: collection_key,
            tag: tag.map(str::to_string),
        };
        info!(question, ?filter, "asking");

        let answer = self.docs.query(question, &filter).await?;
        let counts = render::LibraryCounts {
            total: self.docs.len(),
            zotero: self.docs.count_by_origin(DocumentOrigin::Zotero),
            local: self.docs.count_by_origin(DocumentOrigin::Local),
        };
        Ok(render::answer_report(
            &answer,
            &counts,
            &render::ActiveFilters { collection, tag },
            &self.store,
        ))
    }

    /// Every tag known from the last synchronization.
    pub fn tags(&self) -> String {
        let tags = self.store.tags();
        if tags.is_empty() {
            return "⚠️ No tags known yet. Run 'sync' first.".to_string();
        }
        let mut out = format!("🏷️ {} tags:\n", tags.len());
        for tag in tags {
            out.push_str(&format!("• {tag}\n"));
        }
        out
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
