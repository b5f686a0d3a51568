//! Conversions between 1-based (row, column) positions and A1 style references.

/// Converts a 1-based column number to its letters (1 -> "A", 27 -> "AA").
pub(crate) fn column_name(col: usize) -> String {
    let mut col = col;
    let mut name = String::new();
    while col > 0 {
        col -= 1;
        name.insert(0, (b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    name
}

/// Converts column letters to a 1-based column number, case-insensitive.
pub(crate) fn column_number(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |number, letter| {
        letter
            .is_ascii_alphabetic()
            .then(|| number * 26 + (letter.to_ascii_uppercase() as usize - 'A' as usize + 1))
    })
}

/// Returns the A1 reference of a 1-based (row, column) position.
pub(crate) fn to_reference(row: usize, col: usize) -> String {
    format!("{}{}", column_name(col), row)
}

/// Parses an A1 reference ("D5", "$AB$12") into a 1-based (row, column) position.
pub(crate) fn parse_reference(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let col = column_number(&reference[..split])?;
    let row = reference[split..].parse::<usize>().ok().filter(|row| *row > 0)?;
    Some((row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names() {
        assert_eq!(column_name(1), "A");
        assert_eq!(column_name(4), "D");
        assert_eq!(column_name(26), "Z");
        assert_eq!(column_name(27), "AA");
        assert_eq!(column_name(52), "AZ");
        assert_eq!(column_name(703), "AAA");
    }

    #[test]
    fn column_numbers() {
        assert_eq!(column_number("A"), Some(1));
        assert_eq!(column_number("az"), Some(52));
        assert_eq!(column_number("AAA"), Some(703));
        assert_eq!(column_number(""), None);
        assert_eq!(column_number("A1"), None);
    }

    #[test]
    fn references() {
        assert_eq!(to_reference(5, 4), "D5");
        assert_eq!(to_reference(3852, 20), "T3852");
        assert_eq!(parse_reference("D5"), Some((5, 4)));
        assert_eq!(parse_reference("$AB$12"), Some((12, 28)));
        assert_eq!(parse_reference("D0"), None);
        assert_eq!(parse_reference("12"), None);
        assert_eq!(parse_reference("D"), None);
    }
}
