//! Text measurement hook and direction detection.

/// Style handed to the measurer for every paragraph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels.
    pub font_size_px: f32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size_px: 18.0,
            line_height: 1.4,
        }
    }
}

/// Base direction of a paragraph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

impl TextDirection {
    /// `RightToLeft` when `text` contains any right-to-left script code point.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(is_rtl_char) {
            Self::RightToLeft
        } else {
            Self::LeftToRight
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, Self::RightToLeft)
    }
}

/// Hebrew, Arabic, Syriac, Thaana, NKo and the Hebrew/Arabic presentation forms.
fn is_rtl_char(ch: char) -> bool {
    matches!(
        ch as u32,
        0x0590..=0x05FF
            | 0x0600..=0x06FF
            | 0x0700..=0x074F
            | 0x0750..=0x077F
            | 0x0780..=0x07BF
            | 0x07C0..=0x07FF
            | 0x08A0..=0x08FF
            | 0xFB1D..=0xFB4F
            | 0xFB50..=0xFDFF
            | 0xFE70..=0xFEFF
    )
}

/// Measures the laid-out height of a paragraph.
///
/// Implementations typically shape text with the host's font stack. The
/// paginator calls this once per paragraph per pass and once per candidate
/// chunk when splitting an oversized paragraph; it does no caching itself.
pub trait TextMeasurer {
    /// Height in pixels of `text` wrapped to `max_width`.
    fn measure_height(
        &self,
        text: &str,
        style: &TextStyle,
        max_width: f64,
        direction: TextDirection,
    ) -> f64;
}

impl<F> TextMeasurer for F
where
    F: Fn(&str, &TextStyle, f64, TextDirection) -> f64,
{
    fn measure_height(
        &self,
        text: &str,
        style: &TextStyle,
        max_width: f64,
        direction: TextDirection,
    ) -> f64 {
        self(text, style, max_width, direction)
    }
}

/// Fixed-advance estimate: every char is `char_width_em` of the font size wide.
///
/// Good enough for tests, benches and a first pass before fonts are loaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonospaceMeasurer {
    pub char_width_em: f32,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self { char_width_em: 0.5 }
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure_height(
        &self,
        text: &str,
        style: &TextStyle,
        max_width: f64,
        _direction: TextDirection,
    ) -> f64 {
        let char_width = f64::from(style.font_size_px * self.char_width_em);
        let line_height = f64::from(style.font_size_px * style.line_height);
        let chars = text.chars().count();
        if chars == 0 {
            return 0.0;
        }
        let per_line = if char_width > 0.0 && max_width > 0.0 {
            ((max_width / char_width).floor() as usize).max(1)
        } else {
            1
        };
        let lines = chars.div_ceil(per_line);
        lines as f64 * line_height
    }
}
