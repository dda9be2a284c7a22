//! Parsed book structures consumed by the flattener.
//!
//! These mirror what a container/markup parser hands over: chapters in spine
//! order, each holding the element tree under its `<body>`. Nothing in this
//! crate mutates them.

use smallvec::SmallVec;

use crate::flatten::{flatten, FlatDocument};

/// CFI element steps from `<body>` down to an element.
pub type ElementPath = SmallVec<[u32; 8]>;

/// Semantic role of a paragraph-bearing element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockRole {
    /// Body text outside a dedicated block element.
    Body,
    /// Paragraph block.
    Paragraph,
    /// Heading block by level.
    Heading(u8),
    /// List item block.
    ListItem,
    /// Block quotation.
    Quote,
    /// Preformatted text.
    Preformatted,
    /// Figure caption block.
    FigureCaption,
}

impl BlockRole {
    /// Role for a markup tag, or `None` for containers and inline tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.rsplit(':').next().unwrap_or(tag);
        match tag.to_ascii_lowercase().as_str() {
            "p" => Some(Self::Paragraph),
            "h1" => Some(Self::Heading(1)),
            "h2" => Some(Self::Heading(2)),
            "h3" => Some(Self::Heading(3)),
            "h4" => Some(Self::Heading(4)),
            "h5" => Some(Self::Heading(5)),
            "h6" => Some(Self::Heading(6)),
            "li" | "dt" | "dd" => Some(Self::ListItem),
            "blockquote" => Some(Self::Quote),
            "pre" => Some(Self::Preformatted),
            "figcaption" => Some(Self::FigureCaption),
            _ => None,
        }
    }
}

/// A markup element owned by the book.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    /// Local tag name.
    pub tag: String,
    /// `id` attribute, if any.
    pub id: Option<String>,
    /// Flattened text content, including descendants.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// Serialized markup of the element itself.
    pub outer_markup: String,
    /// Paragraph role; `None` marks a container.
    pub role: Option<BlockRole>,
}

impl Element {
    /// Create an element whose role is derived from `tag`.
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let role = BlockRole::from_tag(&tag);
        Self {
            tag,
            role,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_children(mut self, children: Vec<Element>) -> Self {
        self.children = children;
        self
    }

    pub fn with_outer_markup(mut self, markup: impl Into<String>) -> Self {
        self.outer_markup = markup.into();
        self
    }

    /// Override the tag-derived role.
    pub fn with_role(mut self, role: Option<BlockRole>) -> Self {
        self.role = role;
        self
    }

    /// Whether this element contributes one paragraph to the flat stream.
    ///
    /// Role-bearing elements always do. A childless container with visible
    /// text also does, so loose text in a `<div>` is not dropped.
    pub fn is_paragraph_bearing(&self) -> bool {
        self.role.is_some() || (self.children.is_empty() && !self.text.trim().is_empty())
    }
}

/// A chapter in spine order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Chapter {
    /// Display title from the table of contents.
    pub title: Option<String>,
    /// Content document href, relative to the package document.
    pub content_file_name: String,
    /// Children of the chapter's `<body>`.
    pub body: Vec<Element>,
}

impl Chapter {
    pub fn new(content_file_name: impl Into<String>) -> Self {
        Self {
            content_file_name: content_file_name.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: Vec<Element>) -> Self {
        self.body = body;
        self
    }

    /// Locate `target` by identity and return its element steps from `<body>`.
    pub fn path_to(&self, target: &Element) -> Option<ElementPath> {
        fn visit(elements: &[Element], target: &Element, path: &mut ElementPath) -> bool {
            for (idx, element) in elements.iter().enumerate() {
                path.push(element_step(idx));
                if core::ptr::eq(element, target) || visit(&element.children, target, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = ElementPath::new();
        visit(&self.body, target, &mut path).then_some(path)
    }
}

/// One spine entry from the package document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpineItem {
    /// Spine `idref`.
    pub idref: String,
    /// Manifest href relative to the package document.
    pub href: String,
}

impl SpineItem {
    pub fn new(idref: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            idref: idref.into(),
            href: href.into(),
        }
    }
}

/// Chapters plus the linear reading order they came from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Book {
    /// Chapters in spine order.
    pub chapters: Vec<Chapter>,
    /// Full spine, which may include items that are not chapters (cover, nav).
    ///
    /// Empty means the chapter list itself is the spine.
    pub spine: Vec<SpineItem>,
}

impl Book {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self {
            chapters,
            spine: Vec::new(),
        }
    }

    pub fn with_spine(mut self, spine: Vec<SpineItem>) -> Self {
        self.spine = spine;
        self
    }

    /// Flatten this book's chapters.
    pub fn flatten(&self) -> FlatDocument<'_> {
        flatten(&self.chapters)
    }

    /// Spine position and idref of a chapter.
    ///
    /// Chapters missing from the spine fall back to their chapter index.
    pub fn spine_position(&self, chapter_index: usize) -> Option<(usize, Option<&str>)> {
        let chapter = self.chapters.get(chapter_index)?;
        if self.spine.is_empty() {
            return Some((chapter_index, None));
        }
        let base = strip_fragment(&chapter.content_file_name);
        match self
            .spine
            .iter()
            .position(|item| strip_fragment(&item.href) == base)
        {
            Some(pos) => Some((pos, Some(self.spine[pos].idref.as_str()))),
            None => {
                log::debug!(
                    "chapter {} ({}) not in spine; using chapter index",
                    chapter_index,
                    chapter.content_file_name
                );
                Some((chapter_index, None))
            }
        }
    }

    /// Chapter index addressed by a spine position.
    pub fn chapter_for_spine_position(&self, spine_index: usize) -> Option<usize> {
        if self.spine.is_empty() {
            return (spine_index < self.chapters.len()).then_some(spine_index);
        }
        let href = strip_fragment(&self.spine.get(spine_index)?.href);
        self.chapters
            .iter()
            .position(|chapter| strip_fragment(&chapter.content_file_name) == href)
    }
}

/// CFI step for the child at `index` (element children sit on even steps).
pub(crate) fn element_step(index: usize) -> u32 {
    u32::try_from(index)
        .unwrap_or(u32::MAX)
        .saturating_add(1)
        .saturating_mul(2)
}

fn strip_fragment(href: &str) -> &str {
    href.split_once('#').map(|(base, _)| base).unwrap_or(href)
}
