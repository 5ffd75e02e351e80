use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use folio_axum::middlewares::UploadedFile;
use folio_core::{FolioError, KeyValueStore};
use serde_json::json;

use super::posts_frontmatter::parse_markdown_file;
use super::posts_normalize::{merge_existing, normalize_one};
use super::posts_schema::{PostDefaults, PostDocument};
use crate::markdown::MarkdownRenderer;
use crate::services::adapters::document_adapter::DocumentCollection;
use crate::utils::validator::field_errors;

const POSTS_DOCUMENT: &str = "posts";

pub struct PostsService {
    posts: DocumentCollection<PostDocument>,
    renderer: Arc<dyn MarkdownRenderer>,
    defaults: PostDefaults,
}

impl PostsService {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        renderer: Arc<dyn MarkdownRenderer>,
        defaults: PostDefaults,
    ) -> Self {
        Self {
            posts: DocumentCollection::new(kv, POSTS_DOCUMENT),
            renderer,
            defaults,
        }
    }

    /// Validate every file, then save all of them or none.
    pub async fn ingest_batch(&self, files: Vec<UploadedFile>) -> Result<Vec<PostDocument>> {
        if files.is_empty() {
            return Err(FolioError::bad_request("No files uploaded").into_anyhow());
        }

        let mut errors = Vec::new();
        let mut docs = Vec::with_capacity(files.len());
        let mut seen_ids = HashSet::new();
        for file in &files {
            let parsed = match parse_markdown_file(file.file_name.as_deref(), &file.data) {
                Ok(parsed) => parsed,
                Err(message) => {
                    errors.push(message);
                    continue;
                }
            };

            let filename = parsed.filename.clone();
            let doc = normalize_one(parsed, &self.defaults, self.renderer.as_ref());
            let field_problems = field_errors(&doc);
            if !field_problems.is_empty() {
                errors.extend(field_problems.into_iter().map(|m| format!("{filename}: {m}")));
            } else if !seen_ids.insert(doc.id.clone()) {
                // two files in one batch would upsert the same record
                errors.push(format!("{filename}: Duplicate post id '{}'", doc.id));
            } else {
                docs.push(doc);
            }
        }

        if !errors.is_empty() {
            tracing::info!(files = files.len(), invalid = errors.len(), "post batch rejected");
            return Err(FolioError::unprocessable("Post upload failed validation")
                .with_errors(json!(errors))
                .into_anyhow());
        }

        let saved = self.posts.upsert_many(docs, merge_existing).await?;
        tracing::info!(saved = saved.len(), "post batch saved");
        Ok(saved)
    }

    /// Posts not marked hidden, newest first.
    pub async fn list_visible(&self) -> Result<Vec<PostDocument>> {
        let mut posts: Vec<_> = self
            .posts
            .find()
            .await?
            .into_iter()
            .filter(|p| !p.hidden)
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }
}
