use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::adapters::document_adapter::Identified;

/// A stored blog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostDocument {
    #[validate(length(min = 1, max = 128))]
    pub id: String,

    #[validate(length(min = 1, max = 300))]
    pub title: String,

    pub content: String,

    pub content_html: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub hidden: bool,

    pub created_at: String,

    pub updated_at: String,
}

impl Identified for PostDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Values used for fields an ingested post leaves out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDefaults {
    pub hidden: bool,
    pub tags: Vec<String>,
}
