use std::sync::Arc;

use crate::models::RawRow;

/// Parses the semicolon-delimited survey export into rows.
///
/// The export is not RFC 4180: fields are `;`-separated, `"` toggles a quoted
/// stretch in which separators and newlines are literal content (free-text
/// answers span lines), and quote characters stay part of the value. The scan
/// is an explicit two-state loop over characters; no regex, so the tolerance
/// rules below hold exactly.
///
/// A bare newline ends a row only when the accumulated field count matches
/// the header count. Otherwise the accumulated fields are discarded as a
/// continuation artifact instead of being emitted as a short row. The final
/// row at end of input is the exception: it is emitted whatever its field
/// count, short rows reading their missing trailing columns as empty. That
/// asymmetry is part of the export's observed behavior and is kept as is.
pub fn parse_survey(text: &str) -> Vec<RawRow> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    // First line defines the schema: column order and expected field count.
    let (header_line, body) = normalized
        .split_once('\n')
        .unwrap_or((normalized.as_str(), ""));
    let headers: Arc<[String]> = header_line
        .split(';')
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into();
    let expected_fields = headers.len();

    let mut rows: Vec<RawRow> = Vec::new();
    let mut current_row: Vec<String> = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;

    for ch in body.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current_field.push(ch);
            }
            ';' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
            }
            '\n' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
                if current_row.len() == expected_fields {
                    rows.push(RawRow::new(headers.clone(), std::mem::take(&mut current_row)));
                } else {
                    // Stray line break outside quotes; drop the fragment.
                    current_row.clear();
                }
            }
            _ => current_field.push(ch),
        }
    }

    // Flush whatever remains at end of input.
    if !current_field.is_empty() {
        current_row.push(current_field);
    }
    if !current_row.is_empty() {
        rows.push(RawRow::new(headers, current_row));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_rows_in_order() {
        let rows = parse_survey("A;B\n1;2\n3;4\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("A"), "1");
        assert_eq!(rows[0].get("B"), "2");
        assert_eq!(rows[1].get("A"), "3");
        assert_eq!(rows[1].get("B"), "4");
    }

    #[test]
    fn header_only_input_yields_no_rows() {
        assert!(parse_survey("A;B;C\n").is_empty());
        assert!(parse_survey("A;B;C").is_empty());
    }

    #[test]
    fn normalizes_crlf_and_lone_cr() {
        let rows = parse_survey("A;B\r\n1;2\r3;4\r\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("A"), "3");
    }

    #[test]
    fn quoted_field_keeps_separator_and_newline() {
        let rows = parse_survey("A;B\n\"first line\nsecond; still one field\";x\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("A"), "\"first line\nsecond; still one field\"");
        assert_eq!(rows[0].get("B"), "x");
    }

    #[test]
    fn interior_short_row_is_dropped() {
        let rows = parse_survey("A;B;C\n1;2\nx;y;z\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("A"), "x");
    }

    #[test]
    fn interior_long_row_is_dropped() {
        let rows = parse_survey("A;B\n1;2;3\nx;y\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("A"), "x");
    }

    #[test]
    fn final_row_without_newline_is_emitted() {
        let rows = parse_survey("A;B\n1;2");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("B"), "2");
    }

    #[test]
    fn final_short_row_is_emitted_and_padded() {
        // Interior rows with the wrong field count are dropped, the last one
        // is not. Missing trailing columns read as empty.
        let rows = parse_survey("A;B;C\n1;2;3\n4;5");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("A"), "4");
        assert_eq!(rows[1].get("B"), "5");
        assert_eq!(rows[1].get("C"), "");
    }

    #[test]
    fn empty_fields_are_preserved() {
        let rows = parse_survey("A;B;C\n;;\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("A"), "");
        assert_eq!(rows[0].get("C"), "");
    }

    #[test]
    fn empty_lines_between_rows_are_ignored() {
        let rows = parse_survey("A;B\n1;2\n\n3;4\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("A"), "3");
    }
}
