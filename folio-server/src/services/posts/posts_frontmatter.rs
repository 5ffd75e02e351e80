//! Markdown post files: optional `---` frontmatter, then a document that
//! must open with a single `# Title` line.

use folio_blob::{extension_of, sanitize_filename};

const ACCEPTED_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

/// Recognised frontmatter keys. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    pub id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub hidden: Option<bool>,
}

/// A markdown file that passed the structural checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPost {
    pub filename: String,
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub hidden: Option<bool>,
}

fn unquote(v: &str) -> &str {
    let v = v.trim();
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner.trim();
        }
    }
    v
}

fn parse_tags(v: &str) -> Vec<String> {
    let v = v.trim();
    let v = v.strip_prefix('[').unwrap_or(v);
    let v = v.strip_suffix(']').unwrap_or(v);
    v.split(',')
        .map(unquote)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(v: &str) -> Option<bool> {
    match unquote(v).to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == "---"
}

/// Split a leading frontmatter block off `text`.
///
/// Without an opening fence on the first line, or without a closing fence,
/// the whole text is the body.
pub fn split_frontmatter(text: &str) -> (Frontmatter, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (Frontmatter::default(), text);
    };
    if !is_fence(first) {
        return (Frontmatter::default(), text);
    }

    let mut offset = first.len();
    let mut block = Vec::new();
    for line in lines {
        offset += line.len();
        if is_fence(line) {
            return (parse_block(&block), &text[offset..]);
        }
        block.push(line);
    }

    (Frontmatter::default(), text)
}

fn parse_block(lines: &[&str]) -> Frontmatter {
    let mut fm = Frontmatter::default();
    for line in lines {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "tags" => fm.tags = Some(parse_tags(value)),
            "hidden" => fm.hidden = parse_bool(value),
            "id" => {
                fm.id = Some(unquote(value).to_string()).filter(|v| !v.is_empty());
            }
            _ => {}
        }
    }
    fm
}

/// Title and remaining content, when the first non-blank line is a
/// top-level heading.
pub fn extract_title(body: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = body.lines().collect();
    let idx = lines.iter().position(|l| !l.trim().is_empty())?;

    let heading = lines[idx].trim_end().strip_prefix("# ")?;
    let title = heading.trim().trim_end_matches('#').trim_end();
    if title.is_empty() {
        return None;
    }

    let rest: Vec<&str> = lines[idx + 1..]
        .iter()
        .copied()
        .skip_while(|l| l.trim().is_empty())
        .collect();

    Some((title.to_string(), rest.join("\n")))
}

/// Structural checks for one uploaded file. Errors are client-facing
/// messages naming the file.
pub fn parse_markdown_file(raw_name: Option<&str>, bytes: &[u8]) -> Result<ParsedPost, String> {
    let filename = sanitize_filename(raw_name.unwrap_or_default());

    let accepted = extension_of(&filename)
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    if !accepted {
        return Err(format!(
            "{filename}: Unsupported file type, expected .md, .markdown or .txt"
        ));
    }

    let text = std::str::from_utf8(bytes)
        .map_err(|_| format!("{filename}: File is not valid UTF-8 text"))?;

    let (frontmatter, body) = split_frontmatter(text);
    let (title, content) =
        extract_title(body).ok_or_else(|| format!("{filename}: Missing top-level H1 title"))?;

    Ok(ParsedPost {
        filename,
        id: frontmatter.id,
        title,
        content,
        tags: frontmatter.tags,
        hidden: frontmatter.hidden,
    })
}
