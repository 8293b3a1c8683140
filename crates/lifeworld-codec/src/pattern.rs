//! Run-length pattern interchange format with world-size headers.
//!
//! Modeled on plaintext Life pattern notation: `#WW`/`#WH` lines carry the
//! full world dimensions, a metadata line carries the bounding rectangle
//! and rule string, and the body run-length-encodes the rectangle with `b`
//! (dead), `o` (alive), `$` (end of row) and `!` (end of pattern) tokens.
//!
//! Decoding is deliberately permissive: unknown body characters are
//! skipped, line breaks may fall anywhere, and missing headers fall back to
//! caller-supplied defaults. Pattern files in the wild rely on this
//! tolerance, so it is contract rather than accident.

use crate::CodecError;
use lifeworld_core::{CellGrid, CellRect, RuleSet};

/// Soft limit on emitted body line length.
const WRAP_COLUMNS: usize = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Dead,
    Alive,
    EndOfLine,
    EndOfPattern,
}

impl BlockKind {
    const fn token(self) -> char {
        match self {
            Self::Dead => 'b',
            Self::Alive => 'o',
            Self::EndOfLine => '$',
            Self::EndOfPattern => '!',
        }
    }
}

/// One run of identical tokens in the pattern body.
#[derive(Debug, Clone, Copy)]
struct PatternBlock {
    kind: BlockKind,
    run: u32,
}

/// Append one token, merging into the previous block when the kind repeats.
fn push_block(blocks: &mut Vec<PatternBlock>, kind: BlockKind) {
    match blocks.last_mut() {
        Some(last) if last.kind == kind => last.run += 1,
        _ => blocks.push(PatternBlock { kind, run: 1 }),
    }
}

/// Encode a grid (and its rules) into pattern notation.
///
/// With `trim` set, only the minimal rectangle containing live cells is
/// emitted; an all-dead grid collapses to a 1x1 rectangle at the origin.
/// Without it the rectangle covers the whole world.
#[must_use]
pub fn encode(grid: &CellGrid, rules: &RuleSet, trim: bool) -> String {
    let rect = if trim {
        grid.live_bounds().unwrap_or(CellRect {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        })
    } else {
        CellRect {
            x: 0,
            y: 0,
            width: grid.width(),
            height: grid.height(),
        }
    };

    let width = grid.width() as usize;
    let cells = grid.cells();
    let mut blocks: Vec<PatternBlock> = Vec::new();
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            let alive = cells[(y as usize) * width + x as usize] == 1;
            push_block(
                &mut blocks,
                if alive { BlockKind::Alive } else { BlockKind::Dead },
            );
        }
        // Dead cells up to the rectangle's right edge carry no information.
        if blocks.last().is_some_and(|block| block.kind == BlockKind::Dead) {
            blocks.pop();
        }
        if y + 1 == rect.y + rect.height {
            blocks.push(PatternBlock {
                kind: BlockKind::EndOfPattern,
                run: 1,
            });
        } else {
            push_block(&mut blocks, BlockKind::EndOfLine);
        }
    }

    let mut lines: Vec<String> = Vec::new();
    for block in &blocks {
        let mut token = String::new();
        if block.run > 1 {
            token.push_str(&block.run.to_string());
        }
        token.push(block.kind.token());
        match lines.last_mut() {
            Some(line) if line.len() + token.len() <= WRAP_COLUMNS => line.push_str(&token),
            _ => lines.push(token),
        }
    }

    let mut out = format!("#WW {}\n#WH {}\n", grid.width(), grid.height());
    out.push_str(&format!(
        "x = {}, y = {}, rule = {}\n",
        rect.width, rect.height, rules
    ));
    out.push_str(&lines.join("\n"));
    out
}

fn parse_dimension(rest: &str, header: &str) -> Result<u32, CodecError> {
    rest.trim()
        .parse()
        .map_err(|_| CodecError::InvalidHeader(format!("{header} value {:?}", rest.trim())))
}

fn parse_metadata(line: &str) -> Result<(u32, u32, RuleSet), CodecError> {
    let mut pattern_width = None;
    let mut pattern_height = None;
    let mut rules = None;
    for part in line.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "x" => {
                pattern_width = Some(value.parse::<u32>().map_err(|_| {
                    CodecError::InvalidHeader(format!("pattern width {value:?}"))
                })?);
            }
            "y" => {
                pattern_height = Some(value.parse::<u32>().map_err(|_| {
                    CodecError::InvalidHeader(format!("pattern height {value:?}"))
                })?);
            }
            "rule" => rules = Some(value.parse::<RuleSet>()?),
            _ => {}
        }
    }
    let pattern_width = pattern_width
        .ok_or_else(|| CodecError::InvalidHeader("metadata is missing x".to_string()))?;
    let pattern_height = pattern_height
        .ok_or_else(|| CodecError::InvalidHeader("metadata is missing y".to_string()))?;
    Ok((pattern_width, pattern_height, rules.unwrap_or_default()))
}

/// Decode pattern notation into a fresh grid and rule set.
///
/// `default_width`/`default_height` supply the world dimensions when the
/// text carries no `#WW`/`#WH` headers (the caller's current world size).
/// The pattern is centered in the world. The body is read as one flat token
/// stream regardless of where line breaks fall, and everything after `!` is
/// ignored.
pub fn decode(
    text: &str,
    default_width: u32,
    default_height: u32,
) -> Result<(CellGrid, RuleSet), CodecError> {
    let mut world_width = default_width;
    let mut world_height = default_height;
    let mut metadata = None;
    let mut body = String::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("#WW") {
            world_width = parse_dimension(rest, "#WW")?;
        } else if let Some(rest) = line.strip_prefix("#WH") {
            world_height = parse_dimension(rest, "#WH")?;
        } else if line.starts_with('#') {
            // Comment line.
        } else if metadata.is_none() {
            metadata = Some(line);
        } else {
            body.push_str(line);
        }
    }

    let metadata = metadata.ok_or_else(|| {
        CodecError::InvalidHeader("missing pattern metadata line".to_string())
    })?;
    let (pattern_width, pattern_height, rules) = parse_metadata(metadata)?;

    if pattern_width > world_width || pattern_height > world_height {
        return Err(CodecError::PatternTooLarge {
            pattern_width,
            pattern_height,
            world_width,
            world_height,
        });
    }

    let x_offset = (world_width - pattern_width) / 2;
    let y_offset = (world_height - pattern_height) / 2;

    let mut grid = CellGrid::new(world_width, world_height)?;
    let mut x = x_offset;
    let mut y = y_offset;
    let mut run: u32 = 0;
    for ch in body.chars() {
        if let Some(digit) = ch.to_digit(10) {
            run = run.saturating_mul(10).saturating_add(digit);
            continue;
        }
        match ch.to_ascii_lowercase() {
            token @ ('b' | 'o') => {
                let count = std::mem::take(&mut run).max(1);
                let alive = token == 'o';
                for _ in 0..count {
                    // Oversized bodies spill past the world edge; drop the
                    // writes but keep the cursor honest.
                    if x < grid.width() && y < grid.height() {
                        grid.set(x, y, alive)?;
                    }
                    x = x.saturating_add(1);
                }
            }
            '$' => {
                let count = std::mem::take(&mut run).max(1);
                y = y.saturating_add(count);
                x = x_offset;
            }
            '!' => break,
            // Permissive parse: anything else is skipped and an in-flight
            // run count survives it.
            _ => {}
        }
    }

    Ok((grid, rules))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cell_grid() -> CellGrid {
        let mut grid = CellGrid::new(4, 3).expect("grid");
        grid.set(1, 1, true).expect("seed");
        grid.set(2, 1, true).expect("seed");
        grid
    }

    #[test]
    fn encodes_full_world() {
        let text = encode(&two_cell_grid(), &RuleSet::default(), false);
        assert_eq!(text, "#WW 4\n#WH 3\nx = 4, y = 3, rule = B3/S23\n$b2o$!");
    }

    #[test]
    fn encodes_trimmed_bounding_rectangle() {
        let text = encode(&two_cell_grid(), &RuleSet::default(), true);
        assert_eq!(text, "#WW 4\n#WH 3\nx = 2, y = 1, rule = B3/S23\n2o!");
    }

    #[test]
    fn all_dead_grid_trims_to_unit_rectangle() {
        let grid = CellGrid::new(5, 4).expect("grid");
        let text = encode(&grid, &RuleSet::default(), true);
        assert_eq!(text, "#WW 5\n#WH 4\nx = 1, y = 1, rule = B3/S23\n!");
    }

    #[test]
    fn full_world_round_trip_preserves_grid_and_rules() {
        let grid = two_cell_grid();
        let rules: RuleSet = "B36/S23".parse().expect("rules");
        let (decoded, decoded_rules) =
            decode(&encode(&grid, &rules, false), 1, 1).expect("decode");
        assert_eq!(decoded, grid);
        assert_eq!(decoded_rules, rules);
    }

    #[test]
    fn trimmed_round_trip_recenters_to_the_same_cells() {
        let grid = two_cell_grid();
        let (decoded, _) =
            decode(&encode(&grid, &RuleSet::default(), true), 1, 1).expect("decode");
        assert_eq!(decoded, grid);
    }

    #[test]
    fn missing_headers_fall_back_to_caller_dimensions() {
        let (grid, rules) = decode("x = 1, y = 1\no!", 7, 5).expect("decode");
        assert_eq!(grid.width(), 7);
        assert_eq!(grid.height(), 5);
        // 1x1 pattern centered on a 7x5 world lands at (3, 2).
        assert_eq!(grid.get(3, 2), Ok(true));
        assert_eq!(grid.population(), 1);
        assert_eq!(rules, RuleSet::default());
    }

    #[test]
    fn oversized_pattern_is_rejected() {
        let text = "#WW 64\nx = 65, y = 1, rule = B3/S23\n!";
        assert_eq!(
            decode(text, 64, 64),
            Err(CodecError::PatternTooLarge {
                pattern_width: 65,
                pattern_height: 1,
                world_width: 64,
                world_height: 64,
            })
        );
    }

    #[test]
    fn unknown_characters_are_skipped_without_losing_run_counts() {
        let (grid, _) = decode("x = 4, y = 1\n2o?o!", 4, 1).expect("decode");
        assert_eq!(grid.population(), 3);
        // A digit split across junk still forms one run count.
        let (grid, _) = decode("x = 12, y = 1\n1x2o!", 12, 1).expect("decode");
        assert_eq!(grid.population(), 12);
    }

    #[test]
    fn body_tolerates_arbitrary_line_breaks() {
        let grid = two_cell_grid();
        let text = "#WW 4\n#WH 3\nx = 4, y = 3, rule = B3/S23\n$b\n2\no$!";
        let (decoded, _) = decode(text, 1, 1).expect("decode");
        assert_eq!(decoded, grid);
    }

    #[test]
    fn trailing_input_after_terminator_is_ignored() {
        let text = "#WW 4\n#WH 3\nx = 4, y = 3\n$b2o$!3o$5o";
        let (decoded, _) = decode(text, 1, 1).expect("decode");
        assert_eq!(decoded, two_cell_grid());
    }

    #[test]
    fn metadata_missing_x_is_a_typed_failure() {
        assert!(matches!(
            decode("y = 1\n!", 8, 8),
            Err(CodecError::InvalidHeader(_))
        ));
    }

    #[test]
    fn emitted_lines_never_exceed_wrap_width() {
        let mut grid = CellGrid::new(100, 1).expect("grid");
        for x in (0..100).step_by(2) {
            grid.set(x, 0, true).expect("seed");
        }
        let text = encode(&grid, &RuleSet::default(), false);
        for line in text.lines() {
            assert!(line.len() <= WRAP_COLUMNS, "line too long: {line:?}");
        }
        let (decoded, _) = decode(&text, 1, 1).expect("decode");
        assert_eq!(decoded, grid);
    }
}
