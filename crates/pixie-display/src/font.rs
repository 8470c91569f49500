//! Compact proportional bitmap font
//!
//! Glyph metrics follow the Picopixel layout used by the panel firmware:
//! capitals and digits are 5 rows tall, sit on the baseline (`y_offset = -4`)
//! and advance one column past their width. Lowercase letters use a 3-row
//! x-height with 1-row descenders where needed.
//!
//! Rows are stored right-aligned: bit `width - 1` is the leftmost column.

/// A single glyph bitmap with its metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// Bitmap width in columns
    pub width: u8,
    /// Bitmap height in rows
    pub height: u8,
    /// Cursor advance after the glyph
    pub x_advance: u8,
    /// Horizontal offset from the cursor to the bitmap's left edge
    pub x_offset: i8,
    /// Vertical offset from the baseline to the bitmap's top row
    pub y_offset: i8,
    rows: &'static [u8],
}

impl Glyph {
    /// Whether the bitmap bit at (`col`, `row`) is set
    // SAFETY: shift is below width, which is at most 5 for this font.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn is_set(&self, col: u8, row: u8) -> bool {
        if col >= self.width {
            return false;
        }
        let shift = self.width.saturating_sub(col).saturating_sub(1);
        self.rows
            .get(usize::from(row))
            .is_some_and(|bits| (bits >> shift) & 1 == 1)
    }
}

/// Width/height of a measured string at text size 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextMetrics {
    /// Sum of glyph advances
    pub width: i32,
    /// Font cap height
    pub height: i32,
}

/// Available fonts. Every name resolves to [`Font::Picopixel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Font {
    /// 5-row proportional pixel font
    #[default]
    Picopixel,
}

/// Advance used for characters the font has no glyph for
pub const MISSING_GLYPH_ADVANCE: u8 = 2;

const FIRST_CHAR: u32 = 0x20;
const CAP_HEIGHT: i32 = 5;

impl Font {
    /// Resolve a font by name. Unknown or absent names fall back to the default.
    pub fn from_name(_name: Option<&str>) -> Self {
        Font::Picopixel
    }

    /// Glyph for `ch`, if the font covers it
    pub fn glyph(self, ch: char) -> Option<&'static Glyph> {
        let index = u32::from(ch).checked_sub(FIRST_CHAR)?;
        PICOPIXEL.get(usize::try_from(index).ok()?)
    }

    /// Measure `text` at size 1
    pub fn measure(self, text: &str) -> TextMetrics {
        let width = text
            .chars()
            .map(|ch| {
                i32::from(
                    self.glyph(ch)
                        .map_or(MISSING_GLYPH_ADVANCE, |glyph| glyph.x_advance),
                )
            })
            .fold(0i32, i32::saturating_add);
        TextMetrics {
            width,
            height: CAP_HEIGHT,
        }
    }

    /// Smallest (highest) glyph `y_offset` in `text`, or 0 when nothing is drawn
    pub fn min_y_offset(self, text: &str) -> i32 {
        text.chars()
            .filter_map(|ch| self.glyph(ch))
            .filter(|glyph| glyph.height > 0)
            .map(|glyph| i32::from(glyph.y_offset))
            .min()
            .unwrap_or(0)
    }
}

macro_rules! glyph {
    ($w:expr, $h:expr, $adv:expr, $yo:expr, [$($row:expr),* $(,)?]) => {
        Glyph {
            width: $w,
            height: $h,
            x_advance: $adv,
            x_offset: 0,
            y_offset: $yo,
            rows: &[$($row),*],
        }
    };
}

static PICOPIXEL: [Glyph; 95] = [
    glyph!(0, 0, 2, 1, []),                                         // ' '
    glyph!(1, 5, 2, -4, [0b1, 0b1, 0b1, 0b0, 0b1]),                 // '!'
    glyph!(3, 2, 4, -4, [0b101, 0b101]),                            // '"'
    glyph!(5, 5, 6, -4, [0b01010, 0b11111, 0b01010, 0b11111, 0b01010]), // '#'
    glyph!(3, 5, 4, -4, [0b011, 0b110, 0b010, 0b011, 0b110]),       // '$'
    glyph!(3, 5, 4, -4, [0b101, 0b001, 0b010, 0b100, 0b101]),       // '%'
    glyph!(4, 5, 5, -4, [0b0100, 0b1010, 0b0100, 0b1010, 0b0101]),  // '&'
    glyph!(1, 2, 2, -4, [0b1, 0b1]),                                // '\''
    glyph!(2, 5, 3, -4, [0b01, 0b10, 0b10, 0b10, 0b01]),            // '('
    glyph!(2, 5, 3, -4, [0b10, 0b01, 0b01, 0b01, 0b10]),            // ')'
    glyph!(3, 3, 4, -3, [0b101, 0b010, 0b101]),                     // '*'
    glyph!(3, 3, 4, -3, [0b010, 0b111, 0b010]),                     // '+'
    glyph!(2, 2, 3, 0, [0b01, 0b10]),                               // ','
    glyph!(3, 1, 4, -2, [0b111]),                                   // '-'
    glyph!(1, 1, 2, 0, [0b1]),                                      // '.'
    glyph!(3, 5, 4, -4, [0b001, 0b001, 0b010, 0b100, 0b100]),       // '/'
    glyph!(3, 5, 4, -4, [0b111, 0b101, 0b101, 0b101, 0b111]),       // '0'
    glyph!(3, 5, 4, -4, [0b010, 0b110, 0b010, 0b010, 0b111]),       // '1'
    glyph!(3, 5, 4, -4, [0b110, 0b001, 0b010, 0b100, 0b111]),       // '2'
    glyph!(3, 5, 4, -4, [0b110, 0b001, 0b010, 0b001, 0b110]),       // '3'
    glyph!(3, 5, 4, -4, [0b101, 0b101, 0b111, 0b001, 0b001]),       // '4'
    glyph!(3, 5, 4, -4, [0b111, 0b100, 0b110, 0b001, 0b110]),       // '5'
    glyph!(3, 5, 4, -4, [0b011, 0b100, 0b111, 0b101, 0b111]),       // '6'
    glyph!(3, 5, 4, -4, [0b111, 0b001, 0b010, 0b010, 0b010]),       // '7'
    glyph!(3, 5, 4, -4, [0b111, 0b101, 0b111, 0b101, 0b111]),       // '8'
    glyph!(3, 5, 4, -4, [0b111, 0b101, 0b111, 0b001, 0b110]),       // '9'
    glyph!(1, 3, 2, -3, [0b1, 0b0, 0b1]),                           // ':'
    glyph!(1, 4, 2, -3, [0b1, 0b0, 0b1, 0b1]),                      // ';'
    glyph!(3, 5, 4, -4, [0b001, 0b010, 0b100, 0b010, 0b001]),       // '<'
    glyph!(3, 3, 4, -3, [0b111, 0b000, 0b111]),                     // '='
    glyph!(3, 5, 4, -4, [0b100, 0b010, 0b001, 0b010, 0b100]),       // '>'
    glyph!(3, 5, 4, -4, [0b110, 0b001, 0b010, 0b000, 0b010]),       // '?'
    glyph!(4, 5, 5, -4, [0b0110, 0b1001, 0b1011, 0b1000, 0b0111]),  // '@'
    glyph!(3, 5, 4, -4, [0b010, 0b101, 0b111, 0b101, 0b101]),       // 'A'
    glyph!(3, 5, 4, -4, [0b110, 0b101, 0b110, 0b101, 0b110]),       // 'B'
    glyph!(3, 5, 4, -4, [0b011, 0b100, 0b100, 0b100, 0b011]),       // 'C'
    glyph!(3, 5, 4, -4, [0b110, 0b101, 0b101, 0b101, 0b110]),       // 'D'
    glyph!(3, 5, 4, -4, [0b111, 0b100, 0b110, 0b100, 0b111]),       // 'E'
    glyph!(3, 5, 4, -4, [0b111, 0b100, 0b110, 0b100, 0b100]),       // 'F'
    glyph!(4, 5, 5, -4, [0b0111, 0b1000, 0b1011, 0b1001, 0b0111]),  // 'G'
    glyph!(3, 5, 4, -4, [0b101, 0b101, 0b111, 0b101, 0b101]),       // 'H'
    glyph!(3, 5, 4, -4, [0b111, 0b010, 0b010, 0b010, 0b111]),       // 'I'
    glyph!(3, 5, 4, -4, [0b001, 0b001, 0b001, 0b101, 0b010]),       // 'J'
    glyph!(3, 5, 4, -4, [0b101, 0b101, 0b110, 0b101, 0b101]),       // 'K'
    glyph!(3, 5, 4, -4, [0b100, 0b100, 0b100, 0b100, 0b111]),       // 'L'
    glyph!(5, 5, 6, -4, [0b10001, 0b11011, 0b10101, 0b10001, 0b10001]), // 'M'
    glyph!(4, 5, 5, -4, [0b1001, 0b1101, 0b1011, 0b1001, 0b1001]),  // 'N'
    glyph!(4, 5, 5, -4, [0b0110, 0b1001, 0b1001, 0b1001, 0b0110]),  // 'O'
    glyph!(3, 5, 4, -4, [0b110, 0b101, 0b110, 0b100, 0b100]),       // 'P'
    glyph!(4, 5, 5, -4, [0b0110, 0b1001, 0b1001, 0b1011, 0b0111]),  // 'Q'
    glyph!(3, 5, 4, -4, [0b110, 0b101, 0b110, 0b101, 0b101]),       // 'R'
    glyph!(3, 5, 4, -4, [0b011, 0b100, 0b010, 0b001, 0b110]),       // 'S'
    glyph!(3, 5, 4, -4, [0b111, 0b010, 0b010, 0b010, 0b010]),       // 'T'
    glyph!(3, 5, 4, -4, [0b101, 0b101, 0b101, 0b101, 0b111]),       // 'U'
    glyph!(3, 5, 4, -4, [0b101, 0b101, 0b101, 0b101, 0b010]),       // 'V'
    glyph!(5, 5, 6, -4, [0b10001, 0b10001, 0b10101, 0b11011, 0b10001]), // 'W'
    glyph!(3, 5, 4, -4, [0b101, 0b101, 0b010, 0b101, 0b101]),       // 'X'
    glyph!(3, 5, 4, -4, [0b101, 0b101, 0b010, 0b010, 0b010]),       // 'Y'
    glyph!(3, 5, 4, -4, [0b111, 0b001, 0b010, 0b100, 0b111]),       // 'Z'
    glyph!(2, 5, 3, -4, [0b11, 0b10, 0b10, 0b10, 0b11]),            // '['
    glyph!(3, 5, 4, -4, [0b100, 0b100, 0b010, 0b001, 0b001]),       // '\\'
    glyph!(2, 5, 3, -4, [0b11, 0b01, 0b01, 0b01, 0b11]),            // ']'
    glyph!(3, 2, 4, -4, [0b010, 0b101]),                            // '^'
    glyph!(3, 1, 4, 0, [0b111]),                                    // '_'
    glyph!(2, 2, 3, -4, [0b10, 0b01]),                              // '`'
    glyph!(3, 3, 4, -2, [0b011, 0b101, 0b011]),                     // 'a'
    glyph!(3, 5, 4, -4, [0b100, 0b100, 0b110, 0b101, 0b110]),       // 'b'
    glyph!(3, 3, 4, -2, [0b011, 0b100, 0b011]),                     // 'c'
    glyph!(3, 5, 4, -4, [0b001, 0b001, 0b011, 0b101, 0b011]),       // 'd'
    glyph!(3, 4, 4, -3, [0b010, 0b111, 0b100, 0b011]),              // 'e'
    glyph!(3, 5, 4, -4, [0b011, 0b010, 0b111, 0b010, 0b010]),       // 'f'
    glyph!(3, 4, 4, -2, [0b011, 0b101, 0b011, 0b110]),              // 'g'
    glyph!(3, 5, 4, -4, [0b100, 0b100, 0b110, 0b101, 0b101]),       // 'h'
    glyph!(1, 4, 2, -3, [0b1, 0b0, 0b1, 0b1]),                      // 'i'
    glyph!(2, 5, 3, -3, [0b01, 0b00, 0b01, 0b01, 0b10]),            // 'j'
    glyph!(3, 5, 4, -4, [0b100, 0b101, 0b110, 0b110, 0b101]),       // 'k'
    glyph!(1, 5, 2, -4, [0b1, 0b1, 0b1, 0b1, 0b1]),                 // 'l'
    glyph!(5, 3, 6, -2, [0b11010, 0b10101, 0b10101]),               // 'm'
    glyph!(3, 3, 4, -2, [0b110, 0b101, 0b101]),                     // 'n'
    glyph!(3, 3, 4, -2, [0b010, 0b101, 0b010]),                     // 'o'
    glyph!(3, 4, 4, -2, [0b110, 0b101, 0b110, 0b100]),              // 'p'
    glyph!(3, 4, 4, -2, [0b011, 0b101, 0b011, 0b001]),              // 'q'
    glyph!(3, 3, 4, -2, [0b011, 0b100, 0b100]),                     // 'r'
    glyph!(3, 3, 4, -2, [0b011, 0b010, 0b110]),                     // 's'
    glyph!(3, 4, 4, -3, [0b010, 0b111, 0b010, 0b011]),              // 't'
    glyph!(3, 3, 4, -2, [0b101, 0b101, 0b011]),                     // 'u'
    glyph!(3, 3, 4, -2, [0b101, 0b101, 0b010]),                     // 'v'
    glyph!(5, 3, 6, -2, [0b10101, 0b10101, 0b01010]),               // 'w'
    glyph!(3, 3, 4, -2, [0b101, 0b010, 0b101]),                     // 'x'
    glyph!(3, 4, 4, -2, [0b101, 0b101, 0b011, 0b110]),              // 'y'
    glyph!(3, 3, 4, -2, [0b110, 0b010, 0b011]),                     // 'z'
    glyph!(3, 5, 4, -4, [0b011, 0b010, 0b110, 0b010, 0b011]),       // '{'
    glyph!(1, 5, 2, -4, [0b1, 0b1, 0b1, 0b1, 0b1]),                 // '|'
    glyph!(3, 5, 4, -4, [0b110, 0b010, 0b011, 0b010, 0b110]),       // '}'
    glyph!(4, 2, 5, -3, [0b0101, 0b1010]),                          // '~'
];
