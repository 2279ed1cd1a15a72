use crate::error::{ConvertError, Result};

/// Line height as a multiple of font size
const LINE_SPACING: f32 = 1.25;

/// US Letter in points
pub const LETTER_WIDTH: f32 = 612.0;
pub const LETTER_HEIGHT: f32 = 792.0;
/// 0.25in
pub const DEFAULT_MARGIN: f32 = 18.0;
pub const BASE_FONT_SIZE: f32 = 10.0;

/// The three standard PDF fonts we draw with. None of them need embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Font {
    Regular,
    Bold,
    Mono,
}

impl Font {
    pub const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Mono];

    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Mono => "F3",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Mono => "Courier",
        }
    }

    /// Approximate advance width of `c` in thousandths of an em.
    fn char_width(self, c: char) -> f32 {
        if self == Font::Mono {
            return 600.0;
        }
        let width = match c {
            ' ' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' | 'I' => 278.0,
            'i' | 'j' | 'l' => 222.0,
            'f' | 't' | '(' | ')' | '[' | ']' | '/' => 278.0,
            'r' | '-' => 333.0,
            'm' | 'M' => 833.0,
            'w' => 722.0,
            'W' => 944.0,
            'J' | 'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' => 500.0,
            'a'..='z' | '0'..='9' => 556.0,
            'A'..='Z' => 722.0,
            _ => 584.0,
        };
        if self == Font::Bold {
            width * 1.06
        } else {
            width
        }
    }

    pub fn text_width(self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c)).sum::<f32>() * size / 1000.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub font: Font,
    pub size: f32,
    /// PDF user space, origin bottom-left
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// One fixed-size output page. A blank page has no lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<TextLine>,
}

impl Page {
    pub fn blank() -> Self {
        Page::default()
    }

    pub fn is_blank(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub zoom: f32,
}

impl Default for PageSetup {
    fn default() -> Self {
        PageSetup {
            width: LETTER_WIDTH,
            height: LETTER_HEIGHT,
            margin: DEFAULT_MARGIN,
            zoom: 1.0,
        }
    }
}

impl PageSetup {
    pub fn validate(&self) -> Result<()> {
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(ConvertError::Render(format!(
                "zoom must be a positive number, got {}",
                self.zoom
            )));
        }
        if self.content_width() < self.font_size() * 4.0
            || self.content_height() < self.font_size() * LINE_SPACING * 4.0
        {
            return Err(ConvertError::Render(format!(
                "zoom {} leaves no room for text on a {}x{} page",
                self.zoom, self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn font_size(&self) -> f32 {
        BASE_FONT_SIZE * self.zoom
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

/// Greedy word wrap. Words wider than the line are broken by character.
pub fn wrap_words(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if font.text_width(&candidate, size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if font.text_width(word, size) <= max_width {
            current = word.to_string();
        } else {
            let mut pieces = wrap_chars(word, font, size, max_width);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Hard wrap by character, keeping whitespace. Used for code and outputs.
pub fn wrap_chars(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0.0;

    for c in text.chars() {
        let w = font.text_width(c.encode_utf8(&mut [0; 4]), size);
        if width + w > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            width = 0.0;
        }
        current.push(c);
        width += w;
    }
    lines.push(current);
    lines
}

/// Flows lines down pages, starting a new page when the current one is full.
pub struct PageWriter {
    setup: PageSetup,
    pages: Vec<Page>,
    /// Distance from the top of the content area
    cursor: f32,
    /// Whether the current page belongs to some block yet
    claimed: bool,
    /// Page the first line since `begin_span` landed on
    span_start: Option<usize>,
}

impl PageWriter {
    pub fn new(setup: PageSetup) -> Self {
        PageWriter {
            setup,
            pages: vec![Page::blank()],
            cursor: 0.0,
            claimed: false,
            span_start: None,
        }
    }

    /// Index of the page currently being written
    pub fn current(&self) -> usize {
        self.pages.len() - 1
    }

    /// Whether anything has been placed on (or reserved on) the current page
    pub fn is_dirty(&self) -> bool {
        self.claimed || self.cursor > 0.0
    }

    /// Start a fresh page unless the current one is still untouched.
    pub fn break_page(&mut self) {
        if self.is_dirty() {
            self.new_page();
        }
    }

    /// Mark the current page as taken even if nothing was drawn on it.
    pub fn claim(&mut self) {
        self.claimed = true;
    }

    /// Start tracking where the next line lands.
    pub fn begin_span(&mut self) {
        self.span_start = None;
    }

    /// Page of the first line written since `begin_span`, or the current page
    /// when nothing was written.
    pub fn span_start(&self) -> usize {
        self.span_start.unwrap_or_else(|| self.current())
    }

    pub fn write_line(&mut self, font: Font, size: f32, indent: f32, text: &str) {
        let line_height = size * LINE_SPACING;
        if self.cursor > 0.0 && self.cursor + line_height > self.setup.content_height() {
            self.new_page();
        }
        if self.span_start.is_none() {
            self.span_start = Some(self.current());
        }
        let y = self.setup.height - self.setup.margin - self.cursor - size;
        let x = self.setup.margin + indent;
        self.cursor += line_height;
        if text.trim().is_empty() {
            return;
        }
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(TextLine {
                font,
                size,
                x,
                y,
                text: text.to_string(),
            });
        }
    }

    /// Vertical gap of `lines` body lines. Never carries over to a new page.
    pub fn skip(&mut self, lines: f32) {
        if self.cursor == 0.0 {
            return;
        }
        let gap = self.setup.font_size() * LINE_SPACING * lines;
        self.cursor = (self.cursor + gap).min(self.setup.content_height());
    }

    pub fn finish(self) -> Vec<Page> {
        self.pages
    }

    fn new_page(&mut self) {
        self.pages.push(Page::blank());
        self.cursor = 0.0;
        self.claimed = false;
    }
}
