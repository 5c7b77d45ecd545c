//! Content management for the course catalog and static pages.
//!
//! This module loads markdown files from the `content/` directory at startup,
//! parses frontmatter metadata, and renders markdown to HTML.
//!
//! # Layout
//!
//! - `content/courses/*.md` - one course per file; frontmatter lists the
//!   videos, the body is the course description
//! - `content/pages/*.md` - about and terms pages
//!
//! Course videos are identified as `{course-slug}-{index}` (0-based), which
//! is the id the progress endpoints receive.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use comrak::{Options, markdown_to_html};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Embed hosts accepted for course videos.
const ALLOWED_EMBED_PREFIXES: [&str; 2] = [
    "https://www.youtube.com/embed/",
    "https://www.youtube-nocookie.com/embed/",
];

/// Metadata for static pages (about, terms)
#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<NaiveDate>,
}

/// A rendered page with metadata and HTML content
#[derive(Debug, Clone)]
pub struct Page {
    pub slug: String,
    pub meta: PageMeta,
    pub content_html: String,
}

/// A downloadable handout attached to a video.
#[derive(Debug, Clone, Deserialize)]
pub struct Handout {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct VideoMeta {
    title: String,
    url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    pdfs: Vec<Handout>,
    #[serde(default)]
    markdown: Option<String>,
}

/// Course frontmatter.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseMeta {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Catalog position, ascending.
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    videos: Vec<VideoMeta>,
}

/// One lesson of a course.
#[derive(Debug, Clone)]
pub struct Video {
    /// Progress id, `{course-slug}-{index}`.
    pub id: String,
    pub index: usize,
    pub title: String,
    pub embed_url: String,
    pub description: Option<String>,
    pub handouts: Vec<Handout>,
    pub notes_html: Option<String>,
}

/// A course with its lessons.
#[derive(Debug, Clone)]
pub struct Course {
    pub slug: String,
    pub meta: CourseMeta,
    pub description_html: String,
    pub videos: Vec<Video>,
}

impl Course {
    #[must_use]
    pub fn video(&self, index: usize) -> Option<&Video> {
        self.videos.get(index)
    }
}

/// Content store that holds all loaded content in memory
#[derive(Debug, Clone)]
pub struct ContentStore {
    pages: Arc<HashMap<String, Page>>,
    courses: Arc<Vec<Course>>,
}

impl ContentStore {
    /// Load all content from the filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error if a content directory exists but cannot be read.
    pub fn load(content_dir: &Path) -> Result<Self, ContentError> {
        let pages = Self::load_pages(&content_dir.join("pages"))?;
        let courses = Self::load_courses(&content_dir.join("courses"))?;

        Ok(Self {
            pages: Arc::new(pages),
            courses: Arc::new(courses),
        })
    }

    /// Load all pages from the pages directory
    fn load_pages(dir: &Path) -> Result<HashMap<String, Page>, ContentError> {
        let mut pages = HashMap::new();

        for path in markdown_files(dir)? {
            match Self::load_page(&path) {
                Ok(page) => {
                    tracing::info!("Loaded page: {}", page.slug);
                    pages.insert(page.slug.clone(), page);
                }
                Err(e) => {
                    tracing::error!("Failed to load page {:?}: {}", path, e);
                }
            }
        }

        Ok(pages)
    }

    /// Load a single page from a markdown file
    fn load_page(path: &Path) -> Result<Page, ContentError> {
        let content = std::fs::read_to_string(path).map_err(|e| ContentError::Io(e.to_string()))?;
        let slug = file_slug(path)?;

        let matter = Matter::<YAML>::new();
        let parsed: ParsedEntity<PageMeta> = matter
            .parse(&content)
            .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
        let meta = parsed
            .data
            .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

        let content_html = render_markdown(&parsed.content, true);

        Ok(Page {
            slug,
            meta,
            content_html,
        })
    }

    /// Load all courses, ordered by their `order` key then name.
    fn load_courses(dir: &Path) -> Result<Vec<Course>, ContentError> {
        let mut courses = Vec::new();

        for path in markdown_files(dir)? {
            match Self::load_course(&path) {
                Ok(course) => {
                    tracing::info!(videos = course.videos.len(), "Loaded course: {}", course.slug);
                    courses.push(course);
                }
                Err(e) => {
                    tracing::error!("Failed to load course {:?}: {}", path, e);
                }
            }
        }

        courses.sort_by(|a, b| {
            a.meta
                .order
                .cmp(&b.meta.order)
                .then_with(|| a.meta.name.cmp(&b.meta.name))
        });
        Ok(courses)
    }

    /// Load a single course from a markdown file
    fn load_course(path: &Path) -> Result<Course, ContentError> {
        let content = std::fs::read_to_string(path).map_err(|e| ContentError::Io(e.to_string()))?;
        parse_course(&file_slug(path)?, &content)
    }

    /// Get a page by slug
    #[must_use]
    pub fn get_page(&self, slug: &str) -> Option<&Page> {
        self.pages.get(slug)
    }

    /// All courses in catalog order
    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Get a course by slug
    #[must_use]
    pub fn get_course(&self, slug: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.slug == slug)
    }
}

/// Parse a course file's contents.
fn parse_course(slug: &str, content: &str) -> Result<Course, ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<CourseMeta> = matter
        .parse(content)
        .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
    let mut meta = parsed
        .data
        .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

    let videos = std::mem::take(&mut meta.videos)
        .into_iter()
        .enumerate()
        .map(|(index, video)| {
            if !ALLOWED_EMBED_PREFIXES
                .iter()
                .any(|prefix| video.url.starts_with(prefix))
            {
                return Err(ContentError::Parse(format!(
                    "Video {index} of {slug} is not a YouTube embed URL"
                )));
            }
            Ok(Video {
                id: format!("{slug}-{index}"),
                index,
                title: video.title,
                embed_url: video.url,
                description: video.description,
                handouts: video.pdfs,
                notes_html: video
                    .markdown
                    .filter(|m| !m.trim().is_empty())
                    .map(|m| render_markdown(&m, false)),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Course {
        slug: slug.to_string(),
        meta,
        description_html: render_markdown(&parsed.content, true),
        videos,
    })
}

/// Markdown files directly inside `dir`. A missing directory is empty.
fn markdown_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, ContentError> {
    if !dir.exists() {
        tracing::warn!("Content directory does not exist: {:?}", dir);
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ContentError::Io(e.to_string()))?;
    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    paths.sort();
    Ok(paths)
}

fn file_slug(path: &Path) -> Result<String, ContentError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| ContentError::Parse("Invalid filename".to_string()))
}

/// Render markdown to HTML with GitHub Flavored Markdown support.
///
/// Raw HTML passes through only when `allow_html` is set; content from the
/// backend (blog posts) is rendered with it off.
#[must_use]
pub fn render_markdown(content: &str, allow_html: bool) -> String {
    let mut options = Options::default();

    // Enable GFM extensions
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.header_ids = Some(String::new());
    options.extension.footnotes = true;

    options.render.r#unsafe = allow_html;

    markdown_to_html(content, &options)
}

/// Content loading errors
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const COURSE: &str = r#"---
name: Diagnostic Tools
price: 49.99
order: 1
videos:
  - title: Intro to OBD Scanners
    url: https://www.youtube.com/embed/4dVDuy0JPpE
    pdfs:
      - name: Guide.pdf
        url: /static/pdfs/guide.pdf
    markdown: |
      ## Key Points

      - Reading codes
  - title: Walkthrough
    url: https://www.youtube.com/embed/3eD_1jYWfCw
---
Learn the **scanner**.
"#;

    #[test]
    fn test_parse_course() {
        let course = parse_course("diagnostic-tools", COURSE).unwrap();
        assert_eq!(course.meta.name, "Diagnostic Tools");
        assert_eq!(course.meta.price, Decimal::new(4999, 2));
        assert_eq!(course.videos.len(), 2);
        assert_eq!(course.videos[0].id, "diagnostic-tools-0");
        assert_eq!(course.videos[1].id, "diagnostic-tools-1");
        assert_eq!(course.videos[0].handouts.len(), 1);
        assert!(course.videos[0].notes_html.as_deref().unwrap().contains("<h2"));
        assert!(course.videos[1].notes_html.is_none());
        assert!(course.description_html.contains("<strong>scanner</strong>"));
    }

    #[test]
    fn test_rejects_non_embed_video() {
        let content = COURSE.replace(
            "https://www.youtube.com/embed/3eD_1jYWfCw",
            "https://evil.example.com/video",
        );
        let err = parse_course("diagnostic-tools", &content).unwrap_err();
        assert!(matches!(err, ContentError::Parse(msg) if msg.contains("Video 1")));
    }

    #[test]
    fn test_render_markdown_escapes_html_when_disallowed() {
        let html = render_markdown("hi <script>alert(1)</script>", false);
        assert!(!html.contains("<script>"));
        let html = render_markdown("<em>ok</em>", true);
        assert!(html.contains("<em>ok</em>"));
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let store = ContentStore::load(Path::new("/nonexistent/content")).unwrap();
        assert!(store.courses().is_empty());
        assert!(store.get_page("about").is_none());
    }

    #[test]
    fn test_load_repo_content() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("content");
        let store = ContentStore::load(&dir).unwrap();
        assert_eq!(store.courses().len(), 9);
        assert_eq!(store.courses()[0].slug, "diagnostic-tools");
        assert!(store.get_course("ev-chargers").is_some());
        assert!(store.get_page("about").is_some());
        assert!(store.get_page("terms-courses").is_some());
        assert!(store.get_page("terms-products").is_some());
    }
}
