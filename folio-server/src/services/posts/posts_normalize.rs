use chrono::Utc;

use super::posts_frontmatter::ParsedPost;
use super::posts_schema::{PostDefaults, PostDocument};
use crate::markdown::MarkdownRenderer;

fn now_ts() -> String {
    Utc::now().to_rfc3339()
}

/// Trimmed, lower-cased, non-empty, first occurrence kept.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Build the stored form of a parsed file. Fields the file set win;
/// the rest come from `defaults`.
pub fn normalize_one(
    parsed: ParsedPost,
    defaults: &PostDefaults,
    renderer: &dyn MarkdownRenderer,
) -> PostDocument {
    let id = parsed
        .id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let tags = match parsed.tags {
        Some(tags) => normalize_tags(tags),
        None => normalize_tags(&defaults.tags),
    };

    let ts = now_ts();
    PostDocument {
        id,
        title: parsed.title.trim().to_string(),
        content_html: renderer.render(&parsed.content),
        content: parsed.content,
        tags,
        hidden: parsed.hidden.unwrap_or(defaults.hidden),
        created_at: ts.clone(),
        updated_at: ts,
    }
}

/// Saving over an existing post keeps its creation time; the update time
/// only moves when something visible changed.
pub fn merge_existing(existing: Option<&PostDocument>, mut incoming: PostDocument) -> PostDocument {
    let Some(prev) = existing else {
        return incoming;
    };

    incoming.created_at = prev.created_at.clone();
    let unchanged = prev.title == incoming.title
        && prev.content == incoming.content
        && prev.tags == incoming.tags
        && prev.hidden == incoming.hidden;
    if unchanged {
        incoming.updated_at = prev.updated_at.clone();
    }
    incoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::SanitizingRenderer;

    fn parsed(tags: Option<Vec<&str>>, hidden: Option<bool>) -> ParsedPost {
        ParsedPost {
            filename: "p.md".into(),
            id: None,
            title: "Title".into(),
            content: "Some **bold** text".into(),
            tags: tags.map(|t| t.into_iter().map(str::to_string).collect()),
            hidden,
        }
    }

    #[test]
    fn tags_are_cleaned() {
        assert_eq!(
            normalize_tags([" Rust", "rust", "", "Web ", "  "]),
            vec!["rust".to_string(), "web".to_string()]
        );
    }

    #[test]
    fn defaults_fill_missing_fields_only() {
        let defaults = PostDefaults {
            hidden: true,
            tags: vec!["Notes".into()],
        };
        let r = SanitizingRenderer::new();

        let doc = normalize_one(parsed(None, None), &defaults, &r);
        assert!(doc.hidden);
        assert_eq!(doc.tags, vec!["notes".to_string()]);
        assert!(doc.content_html.contains("<strong>bold</strong>"));
        assert!(uuid::Uuid::parse_str(&doc.id).is_ok());

        let doc = normalize_one(parsed(Some(vec!["A"]), Some(false)), &defaults, &r);
        assert!(!doc.hidden);
        assert_eq!(doc.tags, vec!["a".to_string()]);
    }

    #[test]
    fn merge_keeps_created_at() {
        let r = SanitizingRenderer::new();
        let mut prev = normalize_one(parsed(None, None), &PostDefaults::default(), &r);
        prev.created_at = "2020-01-01T00:00:00+00:00".into();
        prev.updated_at = "2020-01-02T00:00:00+00:00".into();

        let mut same = prev.clone();
        same.created_at = "later".into();
        same.updated_at = "later".into();
        let merged = merge_existing(Some(&prev), same);
        assert_eq!(merged.created_at, prev.created_at);
        assert_eq!(merged.updated_at, prev.updated_at);

        let mut edited = prev.clone();
        edited.content = "changed".into();
        edited.updated_at = "later".into();
        let merged = merge_existing(Some(&prev), edited);
        assert_eq!(merged.created_at, prev.created_at);
        assert_eq!(merged.updated_at, "later");
    }
}
