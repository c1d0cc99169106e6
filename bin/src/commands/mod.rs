pub mod layout;
pub mod replay;

use tome_text::Position;

/// Parse `line:column`, both zero based.
pub fn parse_position(value: &str) -> Result<Position, String> {
    let (line, column) = value
        .split_once(':')
        .ok_or_else(|| format!("expected line:column, got '{value}'"))?;
    let line = line
        .trim()
        .parse()
        .map_err(|e| format!("bad line in '{value}': {e}"))?;
    let column = column
        .trim()
        .parse()
        .map_err(|e| format!("bad column in '{value}': {e}"))?;
    Ok(Position::new(line, column))
}

/// Parse `line:column-line:column`.
pub fn parse_fold(value: &str) -> Result<(Position, Position), String> {
    let (begin, end) = value
        .split_once('-')
        .ok_or_else(|| format!("expected line:column-line:column, got '{value}'"))?;
    Ok((parse_position(begin)?, parse_position(end)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_parse() {
        assert_eq!(parse_position("3:14"), Ok(Position::new(3, 14)));
        assert!(parse_position("3").is_err());
        assert!(parse_position("a:1").is_err());
        assert_eq!(
            parse_fold("0:5-1:6"),
            Ok((Position::new(0, 5), Position::new(1, 6)))
        );
        assert!(parse_fold("0:5").is_err());
    }
}
