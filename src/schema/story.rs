/// Story data model — pages of positioned paragraphs with optional voice cues.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("a story needs at least two pages, found {found}")]
    TooFewPages { found: usize },
    #[error("page {page} has no paragraphs")]
    EmptyPage { page: usize },
}

/// Newtype wrapper for audio cue names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CueId(pub String);

impl CueId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CueId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// A point in the page's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A single line of scripted dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub content: String,
    pub position: Position,
    /// Voice cue started alongside the fade-in. Input is held until it ends.
    #[serde(default)]
    pub cue: Option<CueId>,
}

impl Paragraph {
    pub fn new(content: impl Into<String>, position: Position) -> Self {
        Self {
            content: content.into(),
            position,
            cue: None,
        }
    }

    pub fn with_cue(mut self, cue: impl Into<CueId>) -> Self {
        self.cue = Some(cue.into());
        self
    }
}

/// An ordered, non-empty run of paragraphs shown on one surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub paragraphs: Vec<Paragraph>,
}

impl Page {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

/// A validated, immutable linear story.
///
/// The first page is always followed by the interlude, so a story carries
/// at least two pages and every page at least one paragraph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Story {
    pages: Vec<Page>,
}

impl Story {
    pub fn new(pages: Vec<Page>) -> Result<Story, StoryError> {
        if pages.len() < 2 {
            return Err(StoryError::TooFewPages { found: pages.len() });
        }
        if let Some(page) = pages.iter().position(Page::is_empty) {
            return Err(StoryError::EmptyPage { page });
        }
        Ok(Story { pages })
    }

    /// Load a story from a RON file containing a list of pages.
    pub fn load_from_ron(path: &Path) -> Result<Story, StoryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a story from a RON string.
    pub fn parse_ron(input: &str) -> Result<Story, StoryError> {
        let pages: Vec<Page> = ron::from_str(input)?;
        Self::new(pages)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of paragraphs on `page`, or zero past the end.
    pub fn paragraph_count(&self, page: usize) -> usize {
        self.pages.get(page).map_or(0, Page::len)
    }

    pub fn paragraph(&self, page: usize, paragraph: usize) -> Option<&Paragraph> {
        self.pages.get(page)?.paragraphs.get(paragraph)
    }

    pub fn total_paragraphs(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Every cue referenced by a paragraph.
    pub fn voice_cues(&self) -> FxHashSet<CueId> {
        self.pages
            .iter()
            .flat_map(|page| page.paragraphs.iter())
            .filter_map(|paragraph| paragraph.cue.clone())
            .collect()
    }
}
