//! ANSI SGR renderer for captured command output
//!
//! Turns a raw byte stream with embedded SGR escape sequences into lines of
//! styled spans. The scanner is an explicit state machine over bytes
//! (text, escape, CSI parameters, OSC string), so a sequence split across
//! two reads is handled the same as one delivered whole.
//!
//! Only SGR (`ESC [ ... m`) changes style. Every other escape sequence is
//! consumed and dropped, as is any SGR sequence that does not parse.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Standard ANSI colors (codes 30-37 for fg, 40-47 for bg)
const STANDARD_COLORS: [Color; 8] = [
    Color::Black,   // 0
    Color::Red,     // 1
    Color::Green,   // 2
    Color::Yellow,  // 3
    Color::Blue,    // 4
    Color::Magenta, // 5
    Color::Cyan,    // 6
    Color::Gray,    // 7
];

/// Bright ANSI colors (codes 90-97 for fg, 100-107 for bg)
const BRIGHT_COLORS: [Color; 8] = [
    Color::DarkGray,     // 0
    Color::LightRed,     // 1
    Color::LightGreen,   // 2
    Color::LightYellow,  // 3
    Color::LightBlue,    // 4
    Color::LightMagenta, // 5
    Color::LightCyan,    // 6
    Color::White,        // 7
];

/// Longest CSI parameter run we keep; anything longer is abandoned
const MAX_CSI_PARAMS: usize = 64;

const TAB_WIDTH: usize = 8;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Style of a span: optional colors plus attribute flags
///
/// Attributes are limited to BOLD, DIM (faint), ITALIC, UNDERLINED and
/// REVERSED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub attrs: Modifier,
}

impl SpanStyle {
    pub fn fg(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    pub fn bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    /// Convert to a ratatui style for drawing
    pub fn to_style(&self) -> Style {
        let mut style = Style::default().add_modifier(self.attrs);
        if let Some(fg) = self.fg {
            style = style.fg(fg);
        }
        if let Some(bg) = self.bg {
            style = style.bg(bg);
        }
        style
    }
}

/// A run of text in one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub style: SpanStyle,
}

impl StyledSpan {
    pub fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, SpanStyle::default())
    }
}

/// One rendered line
pub type StyledLine = Vec<StyledSpan>;

/// Visible text of a rendered line
pub fn line_text(line: &[StyledSpan]) -> String {
    line.iter().map(|span| span.text.as_str()).collect()
}

/// Convert a rendered line into a ratatui line
pub fn to_ratatui_line(line: &[StyledSpan]) -> Line<'static> {
    Line::from(
        line.iter()
            .map(|span| Span::styled(span.text.clone(), span.style.to_style()))
            .collect::<Vec<_>>(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Text,
    /// Saw ESC, waiting for the byte that picks the sequence type
    Escape,
    /// Inside `ESC [`, collecting parameter and intermediate bytes
    Csi,
    /// Inside `ESC ]`, skipping until BEL or ESC
    Osc,
}

/// Incremental renderer for one command's output
///
/// Style state carries across lines and only resets on an explicit SGR
/// reset or a new renderer.
#[derive(Debug, Clone)]
pub struct AnsiRenderer {
    state: ScanState,
    style: SpanStyle,
    params: Vec<u8>,
    intermediates: bool,
    overflow: bool,
    /// Undecoded text bytes in the current style
    pending: Vec<u8>,
    /// Characters in `pending`, for tab stops
    pending_chars: usize,
    /// Finished spans of the line being built
    current: StyledLine,
    current_chars: usize,
}

impl Default for AnsiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnsiRenderer {
    pub fn new() -> Self {
        Self {
            state: ScanState::Text,
            style: SpanStyle::default(),
            params: Vec::new(),
            intermediates: false,
            overflow: false,
            pending: Vec::new(),
            pending_chars: 0,
            current: Vec::new(),
            current_chars: 0,
        }
    }

    /// True if a line has been started but not terminated
    pub fn has_partial_line(&self) -> bool {
        !self.current.is_empty() || !self.pending.is_empty()
    }

    /// Feed more bytes; returns the lines completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StyledLine> {
        let mut completed = Vec::new();
        for &byte in bytes {
            self.feed_byte(byte, &mut completed);
        }
        completed
    }

    /// Snapshot of the unterminated line
    pub fn partial_line(&self) -> StyledLine {
        let mut line = self.current.clone();
        if !self.pending.is_empty() {
            push_span(
                &mut line,
                String::from_utf8_lossy(&self.pending).into_owned(),
                self.style,
            );
        }
        line
    }

    /// Finish the stream, returning the unterminated line if there is one.
    pub fn finish(mut self) -> Option<StyledLine> {
        if self.has_partial_line() {
            self.flush_pending();
            Some(std::mem::take(&mut self.current))
        } else {
            None
        }
    }

    fn feed_byte(&mut self, byte: u8, completed: &mut Vec<StyledLine>) {
        match self.state {
            ScanState::Text => self.text_byte(byte, completed),
            ScanState::Escape => match byte {
                b'[' => {
                    self.params.clear();
                    self.intermediates = false;
                    self.overflow = false;
                    self.state = ScanState::Csi;
                }
                b']' => self.state = ScanState::Osc,
                // Two-byte sequence (ESC 7, ESC =, ESC \ ...): drop it
                0x20..=0x7e => self.state = ScanState::Text,
                _ => {
                    self.state = ScanState::Text;
                    self.text_byte(byte, completed);
                }
            },
            ScanState::Csi => match byte {
                0x30..=0x3f => {
                    if self.params.len() < MAX_CSI_PARAMS {
                        self.params.push(byte);
                    } else {
                        self.overflow = true;
                    }
                }
                0x20..=0x2f => self.intermediates = true,
                0x40..=0x7e => {
                    self.state = ScanState::Text;
                    if byte == b'm' && !self.intermediates && !self.overflow {
                        self.apply_sgr();
                    }
                }
                // A control byte aborts the sequence and is handled as text
                _ => {
                    self.state = ScanState::Text;
                    self.text_byte(byte, completed);
                }
            },
            ScanState::Osc => match byte {
                BEL => self.state = ScanState::Text,
                ESC => self.state = ScanState::Escape,
                _ => {}
            },
        }
    }

    fn text_byte(&mut self, byte: u8, completed: &mut Vec<StyledLine>) {
        match byte {
            ESC => self.state = ScanState::Escape,
            b'\n' => {
                self.flush_pending();
                completed.push(std::mem::take(&mut self.current));
                self.current_chars = 0;
            }
            b'\t' => {
                let column = self.current_chars + self.pending_chars;
                let spaces = TAB_WIDTH - column % TAB_WIDTH;
                self.pending.extend(std::iter::repeat(b' ').take(spaces));
                self.pending_chars += spaces;
            }
            // Carriage returns and other C0 controls have no place in a
            // scrollback view
            0x00..=0x1f | 0x7f => {}
            _ => {
                // Count characters by their leading byte
                if byte & 0xc0 != 0x80 {
                    self.pending_chars += 1;
                }
                self.pending.push(byte);
            }
        }
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        push_span(&mut self.current, text, self.style);
        self.current_chars += self.pending_chars;
        self.pending.clear();
        self.pending_chars = 0;
    }

    fn apply_sgr(&mut self) {
        let Some(params) = parse_params(&self.params) else {
            tracing::trace!("Dropping malformed SGR sequence");
            return;
        };
        let Some(style) = apply_sgr_params(self.style, &params) else {
            tracing::trace!("Dropping malformed SGR sequence");
            return;
        };
        if style != self.style {
            self.flush_pending();
            self.style = style;
        }
    }
}

fn push_span(line: &mut StyledLine, text: String, style: SpanStyle) {
    match line.last_mut() {
        Some(last) if last.style == style => last.text.push_str(&text),
        _ => line.push(StyledSpan { text, style }),
    }
}

/// Split `1;31` into numbers. Empty fields count as 0; anything that is not
/// a plain decimal number makes the whole sequence malformed.
fn parse_params(raw: &[u8]) -> Option<Vec<u32>> {
    if raw.is_empty() {
        return Some(vec![0]);
    }
    raw.split(|&b| b == b';')
        .map(|field| {
            if field.is_empty() {
                return Some(0);
            }
            if !field.iter().all(u8::is_ascii_digit) || field.len() > 9 {
                return None;
            }
            std::str::from_utf8(field).ok()?.parse().ok()
        })
        .collect()
}

/// Apply SGR parameters to `style`. `None` means the sequence was malformed
/// and must have no effect.
fn apply_sgr_params(mut style: SpanStyle, params: &[u32]) -> Option<SpanStyle> {
    let mut i = 0;
    while i < params.len() {
        let code = params[i];
        match code {
            // Reset
            0 => style = SpanStyle::default(),

            // Text attributes (add)
            1 => style.attrs |= Modifier::BOLD,
            2 => style.attrs |= Modifier::DIM,
            3 => style.attrs |= Modifier::ITALIC,
            4 => style.attrs |= Modifier::UNDERLINED,
            7 => style.attrs |= Modifier::REVERSED,

            // Text attributes (remove)
            22 => style.attrs.remove(Modifier::BOLD | Modifier::DIM),
            23 => style.attrs.remove(Modifier::ITALIC),
            24 => style.attrs.remove(Modifier::UNDERLINED),
            27 => style.attrs.remove(Modifier::REVERSED),

            // Standard foreground colors (30-37)
            30..=37 => style.fg = Some(STANDARD_COLORS[(code - 30) as usize]),

            // Extended foreground color (38;5;n or 38;2;r;g;b)
            38 => {
                let (color, consumed) = parse_extended_color(&params[i + 1..])?;
                style.fg = Some(color);
                i += consumed;
            }

            // Default foreground
            39 => style.fg = None,

            // Standard background colors (40-47)
            40..=47 => style.bg = Some(STANDARD_COLORS[(code - 40) as usize]),

            // Extended background color (48;5;n or 48;2;r;g;b)
            48 => {
                let (color, consumed) = parse_extended_color(&params[i + 1..])?;
                style.bg = Some(color);
                i += consumed;
            }

            // Default background
            49 => style.bg = None,

            // Bright foreground colors (90-97)
            90..=97 => style.fg = Some(BRIGHT_COLORS[(code - 90) as usize]),

            // Bright background colors (100-107)
            100..=107 => style.bg = Some(BRIGHT_COLORS[(code - 100) as usize]),

            _ => {} // Ignore unknown codes
        }
        i += 1;
    }
    Some(style)
}

/// Parse the tail of an extended color (after 38/48).
/// Returns the color and how many parameters it used.
fn parse_extended_color(params: &[u32]) -> Option<(Color, usize)> {
    let component = |idx: usize| params.get(idx).and_then(|&v| u8::try_from(v).ok());
    match params.first()? {
        // 256-color mode: 5;n
        5 => Some((Color::Indexed(component(1)?), 2)),
        // RGB mode: 2;r;g;b
        2 => Some((Color::Rgb(component(1)?, component(2)?, component(3)?), 4)),
        _ => None,
    }
}

/// Render a complete byte buffer from scratch.
///
/// Pure and deterministic: the same input always gives the same lines, and
/// the result matches any incremental feeding of the same bytes.
pub fn render(bytes: &[u8]) -> Vec<StyledLine> {
    let mut renderer = AnsiRenderer::new();
    let mut lines = renderer.feed(bytes);
    lines.extend(renderer.finish());
    lines
}

/// Strip all escape sequences, returning just the text
pub fn strip_ansi(bytes: &[u8]) -> String {
    render(bytes)
        .iter()
        .map(|line| line_text(line))
        .collect::<Vec<_>>()
        .join("\n")
}
