/// Letter avatar generator
///
/// Renders a single uppercase glyph in white on a background picked from a
/// fixed palette by the letter's code point. Output is a PNG and is
/// byte-identical for identical arguments.
use crate::error::{AppError, Result};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageBuffer, ImageEncoder, Rgb};

/// Background colors, indexed by `code_point % PALETTE.len()`
pub const PALETTE: [[u8; 3]; 6] = [
    [0xFF, 0x57, 0x33],
    [0x33, 0xFF, 0x57],
    [0x33, 0x57, 0xFF],
    [0xF3, 0xFF, 0x33],
    [0xFF, 0x33, 0xA6],
    [0x33, 0xFF, 0xF3],
];

const FOREGROUND: [u8; 3] = [0xFF, 0xFF, 0xFF];

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// Row bitmaps, most significant of the low 5 bits is the leftmost column
type Glyph = [u8; GLYPH_HEIGHT as usize];

const FALLBACK_GLYPH: Glyph = [
    0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100,
];

fn glyph_for(letter: char) -> Glyph {
    match letter {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        _ => FALLBACK_GLYPH,
    }
}

/// Background color for a letter
pub fn background_for(letter: char) -> [u8; 3] {
    PALETTE[(letter as u32 % PALETTE.len() as u32) as usize]
}

/// Generate a `width` x `height` PNG avatar for `letter`
///
/// The background uses the letter as given; the glyph is looked up uppercased.
pub fn generate(letter: char, width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(AppError::BadRequest(format!(
            "avatar dimensions must be positive, got {}x{}",
            width, height
        )));
    }

    let background = Rgb(background_for(letter));
    let foreground = Rgb(FOREGROUND);
    let glyph = glyph_for(letter.to_ascii_uppercase());

    // Glyph height is about half the image height, limited by the width
    let scale = (height / 2 / GLYPH_HEIGHT)
        .min(width / GLYPH_WIDTH)
        .max(1);
    let glyph_w = GLYPH_WIDTH * scale;
    let glyph_h = GLYPH_HEIGHT * scale;
    let origin_x = width.saturating_sub(glyph_w) / 2;
    let origin_y = height.saturating_sub(glyph_h) / 2;

    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
        if x < origin_x || y < origin_y {
            return background;
        }
        let (col, row) = ((x - origin_x) / scale, (y - origin_y) / scale);
        if col >= GLYPH_WIDTH || row >= GLYPH_HEIGHT {
            return background;
        }
        let bits = glyph[row as usize];
        if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
            foreground
        } else {
            background
        }
    });

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(img.as_raw(), width, height, ColorType::Rgb8)?;

    Ok(png)
}

/// First character of a username, uppercased; `?` for an empty name
pub fn initial_of(username: &str) -> char {
    username
        .chars()
        .next()
        .map(|c| c.to_uppercase().next().unwrap_or(c))
        .unwrap_or('?')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(png: &[u8]) -> image::RgbImage {
        image::load_from_memory_with_format(png, image::ImageFormat::Png)
            .unwrap()
            .to_rgb8()
    }

    #[test]
    fn generation_is_deterministic() {
        let first = generate('A', 100, 100).unwrap();
        let second = generate('A', 100, 100).unwrap();
        assert_eq!(first, second);
        assert_eq!(&first[1..4], b"PNG");
    }

    #[test]
    fn background_follows_palette() {
        // 'A' = 65 -> 65 % 6 = 5, 'B' = 66 -> 0
        assert_eq!(background_for('A'), [0x33, 0xFF, 0xF3]);
        assert_eq!(background_for('B'), [0xFF, 0x57, 0x33]);

        let a = decode(&generate('A', 100, 100).unwrap());
        let b = decode(&generate('B', 100, 100).unwrap());
        assert_eq!(a.get_pixel(0, 0).0, background_for('A'));
        assert_eq!(b.get_pixel(0, 0).0, background_for('B'));
        assert_ne!(a.get_pixel(0, 0), b.get_pixel(0, 0));
    }

    #[test]
    fn glyph_is_white_and_centered() {
        let img = decode(&generate('I', 100, 100).unwrap());
        assert_eq!(img.dimensions(), (100, 100));

        // 'I' has a vertical bar through the middle column
        assert_eq!(img.get_pixel(50, 50).0, FOREGROUND);
        assert_eq!(img.get_pixel(2, 50).0, background_for('I'));
    }

    #[test]
    fn tiny_and_unknown_letters_still_render() {
        let img = decode(&generate('#', 3, 3).unwrap());
        assert_eq!(img.dimensions(), (3, 3));
        assert!(generate('A', 0, 10).is_err());
    }

    #[test]
    fn initial_is_uppercased() {
        assert_eq!(initial_of("alice"), 'A');
        assert_eq!(initial_of(""), '?');
    }
}
