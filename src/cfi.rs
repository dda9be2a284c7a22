//! EPUB Canonical Fragment Identifier (CFI) parsing, generation and
//! resolution.
//!
//! Only the subset needed to address paragraphs is supported:
//!
//! ```text
//! epubcfi(/6/<spine-step>[<idref>]!/4/<step>[<id>]/.../<step>:<offset>)
//! epubcfi(<parent>,<start>,<end>)
//! ```
//!
//! `/6` is the package spine, `<spine-step>` is `(spine_index + 1) * 2` and
//! `/4` is the content document `<body>`. For a range, the position is the
//! parent path followed by the start path.
//!
//! CFIs are a best-effort enhancement: malformed input parses to `None` and an
//! unresolvable target resolves to `None`, so callers fall back to their
//! current position.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

use crate::book::{Book, Element};
use crate::error::ReflowError;
use crate::flatten::FlatDocument;

/// Step of the spine element in the package document.
pub const PACKAGE_SPINE_STEP: u32 = 6;
/// Step of `<body>` under `<html>` in a content document.
pub const BODY_STEP: u32 = 4;

/// Chapter reference by spine position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterRef {
    /// 0-based position in the spine.
    pub spine_index: usize,
    /// Spine `idref` assertion, if known.
    pub idref: Option<String>,
}

impl ChapterRef {
    pub fn new(spine_index: usize) -> Self {
        Self {
            spine_index,
            idref: None,
        }
    }

    /// CFI step for this spine position.
    pub fn spine_step(&self) -> u32 {
        u32::try_from(self.spine_index)
            .unwrap_or(u32::MAX)
            .saturating_add(1)
            .saturating_mul(2)
    }
}

/// One markup step with an optional id assertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathStep {
    /// Even values address elements, odd values text between them.
    pub index: u32,
    /// `[id]` assertion.
    pub id: Option<String>,
}

impl PathStep {
    pub fn new(index: u32) -> Self {
        Self { index, id: None }
    }

    pub fn with_id(index: u32, id: impl Into<String>) -> Self {
        Self {
            index,
            id: Some(id.into()),
        }
    }
}

/// A parsed CFI locator.
///
/// `path` starts at the content document root, so a well-formed locator's
/// first step is [`BODY_STEP`]. A `Cfi` with an empty path formats to text
/// that does not parse back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cfi {
    pub chapter_ref: ChapterRef,
    pub path: SmallVec<[PathStep; 4]>,
    pub text_offset: Option<usize>,
}

impl Cfi {
    /// Parse a CFI string. Malformed input yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        parse_cfi(input)
    }

    /// Steps below `<body>`, or `None` when the path does not start there.
    pub fn body_steps(&self) -> Option<&[PathStep]> {
        match self.path.split_first() {
            Some((first, rest)) if first.index == BODY_STEP => Some(rest),
            _ => None,
        }
    }

    /// Id of the deepest step that carries an assertion.
    pub fn terminal_id(&self) -> Option<&str> {
        self.path.iter().rev().find_map(|step| step.id.as_deref())
    }
}

/// Parse an optional CFI string; absent or malformed input yields `None`.
pub fn parse(input: Option<&str>) -> Option<Cfi> {
    input.and_then(Cfi::parse)
}

impl fmt::Display for Cfi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epubcfi(/{}/{}",
            PACKAGE_SPINE_STEP,
            self.chapter_ref.spine_step()
        )?;
        if let Some(idref) = self.chapter_ref.idref.as_deref() {
            write_assertion(f, idref)?;
        }
        f.write_str("!")?;
        for step in &self.path {
            write!(f, "/{}", step.index)?;
            if let Some(id) = step.id.as_deref() {
                write_assertion(f, id)?;
            }
        }
        if let Some(offset) = self.text_offset {
            write!(f, ":{}", offset)?;
        }
        f.write_str(")")
    }
}

impl FromStr for Cfi {
    type Err = ReflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cfi(s).ok_or_else(|| ReflowError::MalformedCfi(s.to_string()))
    }
}

impl Serialize for Cfi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cfi {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// What a generated CFI should point at.
#[derive(Clone, Copy, Debug)]
pub enum CfiTarget<'e> {
    /// A flat paragraph index.
    Paragraph(usize),
    /// An element inside the chapter markup, matched by identity.
    Element(&'e Element),
}

/// CFI generation and resolution against one loaded document.
#[derive(Clone, Copy, Debug)]
pub struct CfiCodec<'b, 'a> {
    book: &'b Book,
    doc: &'b FlatDocument<'a>,
}

impl<'b, 'a> CfiCodec<'b, 'a> {
    /// `doc` must be the flattening of `book.chapters`.
    pub fn new(book: &'b Book, doc: &'b FlatDocument<'a>) -> Self {
        Self { book, doc }
    }

    /// Structured locator for a paragraph or element of `chapter_index`.
    pub fn cfi_for(&self, chapter_index: usize, target: CfiTarget<'_>) -> Result<Cfi, ReflowError> {
        let chapter_ref = self.chapter_ref(chapter_index)?;
        let chapter = self
            .book
            .chapters
            .get(chapter_index)
            .ok_or(ReflowError::ChapterOutOfBounds {
                index: chapter_index,
                chapter_count: self.book.chapters.len(),
            })?;
        let element_path = match target {
            CfiTarget::Paragraph(index) => {
                let paragraph =
                    self.doc
                        .paragraph(index)
                        .ok_or(ReflowError::ParagraphOutOfBounds {
                            index,
                            paragraph_count: self.doc.len(),
                        })?;
                if paragraph.chapter_index != chapter_index {
                    return Err(ReflowError::ParagraphNotInChapter {
                        index,
                        chapter_index,
                    });
                }
                paragraph.path.clone()
            }
            CfiTarget::Element(element) => chapter
                .path_to(element)
                .ok_or(ReflowError::ElementNotInChapter { chapter_index })?,
        };

        let mut path = SmallVec::with_capacity(element_path.len() + 1);
        path.push(PathStep::new(BODY_STEP));
        let mut level: &[Element] = &chapter.body;
        for &step in &element_path {
            let element = level.get((step / 2).saturating_sub(1) as usize);
            path.push(PathStep {
                index: step,
                id: element.and_then(|el| el.id.clone()),
            });
            level = element.map(|el| el.children.as_slice()).unwrap_or(&[]);
        }

        Ok(Cfi {
            chapter_ref,
            path,
            text_offset: None,
        })
    }

    /// CFI string for a paragraph or element of `chapter_index`.
    pub fn generate(
        &self,
        chapter_index: usize,
        target: CfiTarget<'_>,
    ) -> Result<String, ReflowError> {
        self.cfi_for(chapter_index, target)
            .map(|cfi| cfi.to_string())
    }

    /// Chapter-level CFI with an explicit path below `<body>`.
    ///
    /// An empty `additional_path` addresses the chapter start.
    pub fn generate_for_chapter(
        &self,
        chapter_index: usize,
        additional_path: &[u32],
    ) -> Result<String, ReflowError> {
        let chapter_ref = self.chapter_ref(chapter_index)?;
        let mut path: SmallVec<[PathStep; 4]> = SmallVec::with_capacity(additional_path.len() + 1);
        path.push(PathStep::new(BODY_STEP));
        path.extend(additional_path.iter().copied().map(PathStep::new));
        Ok(Cfi {
            chapter_ref,
            path,
            text_offset: None,
        }
        .to_string())
    }

    /// Flat paragraph index addressed by `cfi`.
    ///
    /// Only the addressed chapter's paragraphs are scanned, so ids repeated
    /// across chapters resolve correctly. Resolution tries, in order: the
    /// deepest id assertion against paragraph ids (or their first child's
    /// id), the structural path, and finally the chapter start for a
    /// chapter-level locator.
    pub fn paragraph_index_for_cfi(&self, cfi: &Cfi) -> Option<usize> {
        let chapter_index = self.chapter_for_ref(&cfi.chapter_ref)?;
        let range = self.doc.chapter_range(chapter_index)?;
        if range.is_empty() {
            log::debug!("cfi {} addresses empty chapter {}", cfi, chapter_index);
            return None;
        }
        let paragraphs = self.doc.paragraphs().get(range.clone())?;

        if let Some(id) = cfi.terminal_id() {
            let hit = paragraphs.iter().position(|p| {
                p.element.id.as_deref() == Some(id)
                    || p
                        .element
                        .children
                        .first()
                        .and_then(|child| child.id.as_deref())
                        == Some(id)
            });
            if let Some(offset) = hit {
                return Some(range.start + offset);
            }
        }

        let steps = cfi.body_steps()?;
        if steps.is_empty() {
            return Some(range.start);
        }
        // A paragraph on the CFI path, or the first one inside the addressed container.
        let hit = paragraphs.iter().position(|p| {
            p.path
                .iter()
                .zip(steps)
                .all(|(&expected, step)| expected == step.index)
        });
        match hit {
            Some(offset) => Some(range.start + offset),
            None => {
                log::debug!("cfi {} did not match a paragraph", cfi);
                None
            }
        }
    }

    /// Parse and resolve in one call.
    pub fn paragraph_index_for_str(&self, input: Option<&str>) -> Option<usize> {
        parse(input).and_then(|cfi| self.paragraph_index_for_cfi(&cfi))
    }

    /// Chapter index addressed by a CFI's spine reference.
    ///
    /// The spine position wins; the idref is a fallback for books whose spine
    /// shifted since the CFI was generated.
    pub fn chapter_for_ref(&self, chapter_ref: &ChapterRef) -> Option<usize> {
        self.book
            .chapter_for_spine_position(chapter_ref.spine_index)
            .or_else(|| {
                let idref = chapter_ref.idref.as_deref()?;
                let spine_index = self.book.spine.iter().position(|item| item.idref == idref)?;
                self.book.chapter_for_spine_position(spine_index)
            })
    }

    fn chapter_ref(&self, chapter_index: usize) -> Result<ChapterRef, ReflowError> {
        let (spine_index, idref) =
            self.book
                .spine_position(chapter_index)
                .ok_or(ReflowError::ChapterOutOfBounds {
                    index: chapter_index,
                    chapter_count: self.book.chapters.len(),
                })?;
        Ok(ChapterRef {
            spine_index,
            idref: idref.map(str::to_string),
        })
    }
}

fn parse_cfi(input: &str) -> Option<Cfi> {
    let inner = input
        .trim()
        .strip_prefix("epubcfi(")?
        .strip_suffix(')')?;

    let parts = split_top_level(inner, ',');
    let (parent, start) = match parts.as_slice() {
        [parent] => (*parent, None),
        [parent, start, end] => {
            parse_path(end)?;
            (*parent, Some(*start))
        }
        _ => return None,
    };

    let (package, content) = split_indirection(parent)?;
    let (package_steps, package_offset) = parse_path(package)?;
    if package_offset.is_some() {
        return None;
    }
    let chapter_ref = match package_steps.as_slice() {
        [spine, item] if spine.index == PACKAGE_SPINE_STEP => {
            if item.index < 2 || item.index % 2 != 0 {
                return None;
            }
            ChapterRef {
                spine_index: (item.index / 2 - 1) as usize,
                idref: item.id.clone(),
            }
        }
        _ => return None,
    };

    let (mut path, mut text_offset) = parse_path(content)?;
    if let Some(start) = start {
        if text_offset.is_some() {
            return None;
        }
        let (start_steps, start_offset) = parse_path(start)?;
        path.extend(start_steps);
        text_offset = start_offset;
    }
    if path.is_empty() {
        return None;
    }

    Some(Cfi {
        chapter_ref,
        path,
        text_offset,
    })
}

/// Split on `delim` outside assertions, honoring `^` escapes.
fn split_top_level(input: &str, delim: char) -> SmallVec<[&str; 3]> {
    let mut parts = SmallVec::new();
    let mut start = 0;
    let mut in_assertion = false;
    let mut escaped = false;
    for (idx, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '^' => escaped = true,
            '[' => in_assertion = true,
            ']' => in_assertion = false,
            c if c == delim && !in_assertion => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn split_indirection(input: &str) -> Option<(&str, &str)> {
    let parts = split_top_level(input, '!');
    match parts.as_slice() {
        [package, content] => Some((*package, *content)),
        _ => None,
    }
}

type ParsedPath = (SmallVec<[PathStep; 4]>, Option<usize>);

fn parse_path(input: &str) -> Option<ParsedPath> {
    let mut steps = SmallVec::new();
    let mut offset = None;
    let mut rest = input;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('/') {
            let (index, remaining) = take_number(after)?;
            rest = remaining;
            let mut id = None;
            if rest.starts_with('[') {
                let (assertion, remaining) = take_assertion(rest)?;
                id = (!assertion.is_empty()).then_some(assertion);
                rest = remaining;
            }
            steps.push(PathStep {
                index: u32::try_from(index).ok()?,
                id,
            });
        } else if let Some(after) = rest.strip_prefix(':') {
            let (value, remaining) = take_number(after)?;
            rest = remaining;
            if rest.starts_with('[') {
                let (_, remaining) = take_assertion(rest)?;
                rest = remaining;
            }
            if !rest.is_empty() {
                return None;
            }
            offset = Some(value);
        } else {
            return None;
        }
    }
    Some((steps, offset))
}

fn take_number(input: &str) -> Option<(usize, &str)> {
    let digits = input.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let value = input[..digits].parse().ok()?;
    Some((value, &input[digits..]))
}

/// Read a `[...]` assertion, unescaping `^`. Returns the text and the rest.
fn take_assertion(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('[')?;
    let mut out = String::with_capacity(body.len().min(64));
    let mut escaped = false;
    for (idx, ch) in body.char_indices() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '^' => escaped = true,
            ']' => return Some((out, &body[idx + 1..])),
            _ => out.push(ch),
        }
    }
    None
}

fn write_assertion(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("[")?;
    for ch in value.chars() {
        if matches!(ch, '^' | '[' | ']' | '(' | ')' | ',' | ';' | '=') {
            f.write_str("^")?;
        }
        write!(f, "{}", ch)?;
    }
    f.write_str("]")
}
