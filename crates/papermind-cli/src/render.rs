//! Markdown report for answered questions.

use papermind_ai::{Answer, Context};
use papermind_core::{DocumentOrigin, MetadataStore};

const MAX_SOURCES_SHOWN: usize = 3;
const PREVIEW_CHARS: usize = 400;

pub struct LibraryCounts {
    pub total: usize,
    pub zotero: usize,
    pub local: usize,
}

pub struct ActiveFilters<'a> {
    pub collection: Option<&'a str>,
    pub tag: Option<&'a str>,
}

/// First 400 characters, with `...` appended when the text was cut.
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

pub fn answer_report(
    answer: &Answer,
    counts: &LibraryCounts,
    filters: &ActiveFilters<'_>,
    store: &MetadataStore,
) -> String {
    let mut out = format!(
        "\n## 🎯 Question: {}\n\n### 📝 Answer (unified library):\n\n{}\n\n### 📚 Query information:\n",
        answer.question, answer.answer
    );
    out.push_str(&format!("- **📊 Total library**: {} documents\n", counts.total));
    out.push_str(&format!(
        "- **🔗 Zotero papers**: {} (with enriched metadata)\n",
        counts.zotero
    ));
    out.push_str(&format!(
        "- **📁 Local papers**: {} (personal documents)\n",
        counts.local
    ));
    out.push_str(&format!("- **🔍 Contexts used**: {}\n", answer.contexts.len()));
    if let Some(collection) = filters.collection {
        out.push_str(&format!("- **📁 Collection filter**: {collection}\n"));
    }
    if let Some(tag) = filters.tag {
        out.push_str(&format!("- **🏷️ Tag filter**: {tag}\n"));
    }

    out.push_str("\n### 🔍 Sources used:\n");
    for (i, context) in answer.contexts.iter().take(MAX_SOURCES_SHOWN).enumerate() {
        out.push_str(&source_block(i + 1, context, store));
    }

    out.push_str("\n*Answer generated by PaperMind*\n");
    out
}

fn source_block(n: usize, context: &Context, store: &MetadataStore) -> String {
    let text = preview(&context.text);
    let metadata = match context.origin {
        DocumentOrigin::Zotero => store.get(&context.doc_path),
        DocumentOrigin::Local => None,
    };

    match (context.origin, metadata) {
        (_, Some(meta)) => {
            let doi = if meta.doi.trim().is_empty() {
                "Not available"
            } else {
                meta.doi.as_str()
            };
            format!(
                "\n**🔗 Zotero paper - Source {n}:**\n*📖 {}*\n*👥 Authors: {}*\n*📅 Year: {}*\n*🔗 DOI: {doi}*\n\n{text}\n\n---\n",
                meta.title,
                meta.authors_short(),
                meta.year_or_nd(),
            )
        }
        (DocumentOrigin::Zotero, None) => format!(
            "\n**🔗 Zotero paper - Source {n}:**\n*📖 {}*\n\n{text}\n\n---\n",
            context.citation
        ),
        (DocumentOrigin::Local, None) => format!(
            "\n**📄 Local paper - Source {n}:**\n*📄 Document from your personal library*\n\n{text}\n\n---\n"
        ),
    }
}
