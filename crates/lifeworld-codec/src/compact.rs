//! Dense packed-text encoding of a full grid.
//!
//! The wire format is `"{width}:{height}:{data}"`. Cells stream row-major,
//! six per data character with the earliest cell in the most significant
//! bit, through a fixed 64-symbol alphabet. The final character pads any
//! missing trailing cells with zeros, so the data is always exactly
//! `ceil(width * height / 6)` characters with no padding symbol.

use crate::CodecError;
use lifeworld_core::CellGrid;

/// Cells packed into each data character.
const PACK_BITS: usize = 6;

/// Alphabet indexed by the packed 6-bit value.
const PACK_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Encode a grid into the compact single-line form.
#[must_use]
pub fn encode(grid: &CellGrid) -> String {
    let cells = grid.cells();
    let mut out = format!("{}:{}:", grid.width(), grid.height());
    out.reserve(cells.len().div_ceil(PACK_BITS));
    for chunk in cells.chunks(PACK_BITS) {
        let mut value = 0usize;
        for &cell in chunk {
            value = (value << 1) | cell as usize;
        }
        value <<= PACK_BITS - chunk.len();
        out.push(PACK_ALPHABET[value] as char);
    }
    out
}

/// Decode the compact form into a fresh grid.
pub fn decode(text: &str) -> Result<CellGrid, CodecError> {
    let mut parts = text.splitn(3, ':');
    let (Some(width), Some(height), Some(data)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(CodecError::InvalidHeader(
            "expected \"width:height:data\"".to_string(),
        ));
    };
    let width: u32 = width
        .parse()
        .map_err(|_| CodecError::InvalidHeader(format!("width {width:?}")))?;
    let height: u32 = height
        .parse()
        .map_err(|_| CodecError::InvalidHeader(format!("height {height:?}")))?;

    let mut grid = CellGrid::new(width, height)?;
    let needed = (width as usize) * (height as usize);
    let mut filled = 0usize;

    'chars: for ch in data.chars() {
        let index = PACK_ALPHABET
            .iter()
            .position(|&symbol| symbol as char == ch)
            .ok_or(CodecError::InvalidCharacter(ch))?;
        for bit in (0..PACK_BITS).rev() {
            if filled == needed {
                // Remaining bits are padding; discard them.
                break 'chars;
            }
            let alive = (index >> bit) & 1 == 1;
            let x = (filled % width as usize) as u32;
            let y = (filled / width as usize) as u32;
            grid.set(x, y, alive)?;
            filled += 1;
        }
    }

    if filled < needed {
        return Err(CodecError::TruncatedData {
            needed,
            got: filled,
        });
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifeworld_core::GridError;

    #[test]
    fn encodes_known_values() {
        let mut grid = CellGrid::new(2, 3).expect("grid");
        assert_eq!(encode(&grid), "2:3:A");
        grid.fill(true);
        assert_eq!(encode(&grid), "2:3:/");
    }

    #[test]
    fn short_final_group_pads_with_dead_cells() {
        let mut grid = CellGrid::new(1, 5).expect("grid");
        grid.fill(true);
        // Five live cells then one pad bit: 0b111110 = 62 = '+'.
        assert_eq!(encode(&grid), "1:5:+");
        assert_eq!(decode("1:5:+").expect("decode"), grid);
    }

    #[test]
    fn round_trips_arbitrary_grids() {
        let mut grid = CellGrid::new(7, 5).expect("grid");
        for (x, y) in [(0, 0), (6, 0), (3, 2), (1, 4), (6, 4), (2, 1)] {
            grid.set(x, y, true).expect("seed");
        }
        let decoded = decode(&encode(&grid)).expect("decode");
        assert_eq!(decoded, grid);
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(matches!(decode("2:3"), Err(CodecError::InvalidHeader(_))));
        assert!(matches!(decode("a:3:A"), Err(CodecError::InvalidHeader(_))));
        assert!(matches!(decode("2:-1:A"), Err(CodecError::InvalidHeader(_))));
        assert_eq!(
            decode("0:3:"),
            Err(CodecError::Grid(GridError::ZeroDimension))
        );
    }

    #[test]
    fn rejects_foreign_characters() {
        assert_eq!(decode("2:3:*"), Err(CodecError::InvalidCharacter('*')));
    }

    #[test]
    fn rejects_truncated_data() {
        assert_eq!(
            decode("3:3:A"),
            Err(CodecError::TruncatedData { needed: 9, got: 6 })
        );
        assert_eq!(
            decode("2:3:"),
            Err(CodecError::TruncatedData { needed: 6, got: 0 })
        );
    }
}
