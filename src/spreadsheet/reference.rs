//! A1-style cell references.

/// Rows in the largest worksheet Excel can save.
pub(crate) const MAX_ROWS: usize = 1_048_576;
/// Columns `A` through `XFD`.
pub(crate) const MAX_COLUMNS: usize = 16_384;

/// Converts 0-based indexes to a reference such as `A1` or `AB12`.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut col = col + 1;
    while col > 0 {
        col -= 1;
        letters.push((b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    let column: String = letters.into_iter().rev().collect();
    format!("{}{}", column, row + 1)
}

/// Parses `A1`-style references to 0-based `(row, col)`.
/// `$` anchors are ignored; malformed input and anything past `XFD1048576`
/// yields `None`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let mut col = 0usize;
    let mut row = 0usize;
    let mut letters = 0;
    let mut digits = 0;
    for character in reference.chars().filter(|character| *character != '$') {
        match character {
            'A'..='Z' | 'a'..='z' if digits == 0 => {
                let value = character.to_ascii_uppercase() as usize - 'A' as usize + 1;
                col = col * 26 + value;
                if col > MAX_COLUMNS {
                    return None;
                }
                letters += 1;
            }
            '0'..='9' if letters > 0 => {
                row = row * 10 + (character as usize - '0' as usize);
                if row > MAX_ROWS {
                    return None;
                }
                digits += 1;
            }
            _ => return None,
        }
    }
    if digits == 0 || row == 0 {
        None
    } else {
        Some((row - 1, col - 1))
    }
}
