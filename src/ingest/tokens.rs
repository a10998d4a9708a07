//! Token extraction from word-recognition records.
//!
//! A page's recognition output is tab separated, one record per line, with a
//! header line first. Columns 6 to 11 carry `left, top, width, height, conf,
//! text`. A record whose confidence is `-1` is a structural row (page, block,
//! paragraph or line) with no word; it closes the current line.

use crate::models::{BoundingBox, Token};

use super::error::ExtractError;

const LEFT: usize = 6;
const TOP: usize = 7;
const WIDTH: usize = 8;
const HEIGHT: usize = 9;
const CONF: usize = 10;
const TEXT: usize = 11;

/// Confidence value marking a record without a word.
const LINE_BOUNDARY: f64 = -1.0;

/// Document-wide text built up page by page.
///
/// Every word is followed by one space. Offsets and lengths are counted in
/// characters, so a token's span indexes `as_str().chars()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunningText {
    text: String,
    chars: usize,
}

/// Saved length of a [`RunningText`], used to undo a failed page.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    bytes: usize,
    chars: usize,
}

impl RunningText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length in characters; this is the start offset of the next word.
    pub fn len(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Append a word plus its separating space, returning the word's span.
    pub fn push_word(&mut self, word: &str) -> (usize, usize) {
        let start = self.chars;
        let end = start + word.chars().count();
        self.text.push_str(word);
        self.text.push(' ');
        self.chars = end + 1;
        (start, end)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            bytes: self.text.len(),
            chars: self.chars,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.text.truncate(checkpoint.bytes);
        self.chars = checkpoint.chars;
    }
}

/// Parse one page of recognition records into tokens, appending every word to
/// `text`.
///
/// Tokens come back in record order. Line numbers restart at 0 for each call.
/// On error nothing is appended to `text` and no tokens are returned.
pub fn extract_tokens(records: &str, text: &mut RunningText) -> Result<Vec<Token>, ExtractError> {
    let checkpoint = text.checkpoint();
    let result = extract_into(records, text);
    if result.is_err() {
        text.restore(checkpoint);
    }
    result
}

fn extract_into(records: &str, text: &mut RunningText) -> Result<Vec<Token>, ExtractError> {
    let mut tokens = Vec::new();
    let mut line = 0u32;
    let mut in_line = true;

    for (index, raw) in records.lines().enumerate().skip(1) {
        let record = index + 1;
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.trim().is_empty() {
            continue;
        }

        let columns: Vec<&str> = raw.split('\t').collect();
        if columns.len() <= CONF {
            return Err(ExtractError::MissingColumns {
                record,
                expected: CONF + 1,
                found: columns.len(),
            });
        }

        let left = parse_coordinate(record, "left", columns[LEFT])?;
        let top = parse_coordinate(record, "top", columns[TOP])?;
        let width = parse_coordinate(record, "width", columns[WIDTH])?;
        let height = parse_coordinate(record, "height", columns[HEIGHT])?;
        let conf = parse_confidence(record, columns[CONF])?;

        if conf == LINE_BOUNDARY {
            if in_line {
                line += 1;
                in_line = false;
            }
            continue;
        }

        let word = columns.get(TEXT).ok_or(ExtractError::MissingColumns {
            record,
            expected: TEXT + 1,
            found: columns.len(),
        })?;
        let bounding_box = BoundingBox::from_extent(left, top, width, height)
            .ok_or(ExtractError::BoxOverflow { record })?;

        let (start, end) = text.push_word(word);
        // The trailing space must stay addressable too.
        let (character_start, character_end) = match (
            u32::try_from(start),
            u32::try_from(end),
            u32::try_from(text.len()),
        ) {
            (Ok(s), Ok(e), Ok(_)) => (s, e),
            _ => return Err(ExtractError::OffsetOverflow { record }),
        };

        tokens.push(Token {
            character_start,
            character_end,
            line,
            bounding_box,
        });
        in_line = true;
    }

    Ok(tokens)
}

fn parse_coordinate(record: usize, column: &'static str, value: &str) -> Result<u32, ExtractError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ExtractError::InvalidNumber {
            record,
            column,
            value: value.to_string(),
        })
}

fn parse_confidence(record: usize, value: &str) -> Result<f64, ExtractError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|conf| conf.is_finite())
        .ok_or_else(|| ExtractError::InvalidNumber {
            record,
            column: "conf",
            value: value.to_string(),
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    pub(crate) fn word(text: &str, left: u32, top: u32) -> String {
        format!("5\t1\t1\t1\t1\t1\t{}\t{}\t30\t10\t90\t{}", left, top, text)
    }

    pub(crate) fn boundary() -> String {
        "4\t1\t1\t1\t1\t0\t0\t0\t100\t10\t-1\t".to_string()
    }

    pub(crate) fn page(records: &[String]) -> String {
        let mut out = String::from(HEADER);
        for r in records {
            out.push('\n');
            out.push_str(r);
        }
        out.push('\n');
        out
    }

    #[test]
    fn test_two_page_document() {
        let mut text = RunningText::new();
        let page1 = page(&[word("hello", 10, 20), boundary(), word("world", 50, 40)]);
        let page2 = page(&[word("foo", 5, 5)]);

        let first = extract_tokens(&page1, &mut text).unwrap();
        let second = extract_tokens(&page2, &mut text).unwrap();

        assert_eq!(text.as_str(), "hello world foo ");
        assert_eq!(first.len(), 2);
        assert_eq!((first[0].character_start, first[0].character_end), (0, 5));
        assert_eq!(first[0].line, 0);
        assert_eq!((first[1].character_start, first[1].character_end), (6, 11));
        assert_eq!(first[1].line, 1);

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].character_start as usize, "hello world ".len());
        assert_eq!(second[0].character_end, 15);
        assert_eq!(second[0].line, 0);
    }

    #[test]
    fn test_bounding_box_from_record() {
        let mut text = RunningText::new();
        let tokens = extract_tokens(&page(&[word("hello", 10, 20)]), &mut text).unwrap();
        assert_eq!(
            tokens[0].bounding_box,
            BoundingBox {
                top: 20,
                left: 10,
                right: 40,
                bottom: 30
            }
        );
    }

    #[test]
    fn test_consecutive_boundaries_count_once() {
        let mut text = RunningText::new();
        let records = page(&[
            word("a", 0, 0),
            boundary(),
            boundary(),
            boundary(),
            word("b", 0, 0),
        ]);
        let tokens = extract_tokens(&records, &mut text).unwrap();
        assert_eq!(tokens.iter().map(|t| t.line).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_leading_boundary_starts_new_line() {
        let mut text = RunningText::new();
        let records = page(&[boundary(), boundary(), word("a", 0, 0)]);
        let tokens = extract_tokens(&records, &mut text).unwrap();
        assert_eq!(tokens[0].line, 1);
    }

    #[test]
    fn test_empty_page() {
        let mut text = RunningText::new();
        text.push_word("before");
        let tokens = extract_tokens(HEADER, &mut text).unwrap();
        assert!(tokens.is_empty());
        assert_eq!(text.as_str(), "before ");
    }

    #[test]
    fn test_invalid_width_fails_page() {
        let mut text = RunningText::new();
        text.push_word("kept");
        let records = page(&[
            word("a", 0, 0),
            "5\t1\t1\t1\t1\t2\t0\t0\tabc\t10\t90\tb".to_string(),
        ]);

        let err = extract_tokens(&records, &mut text).unwrap_err();
        assert_eq!(
            err,
            ExtractError::InvalidNumber {
                record: 3,
                column: "width",
                value: "abc".to_string()
            }
        );
        assert_eq!(text.as_str(), "kept ");
        assert_eq!(text.len(), 5);
    }

    #[test]
    fn test_negative_coordinate_rejected() {
        let mut text = RunningText::new();
        let records = page(&["5\t1\t1\t1\t1\t1\t-4\t0\t3\t3\t90\tx".to_string()]);
        assert!(matches!(
            extract_tokens(&records, &mut text),
            Err(ExtractError::InvalidNumber { column: "left", .. })
        ));
    }

    #[test]
    fn test_missing_text_column() {
        let mut text = RunningText::new();
        let records = page(&["5\t1\t1\t1\t1\t1\t0\t0\t3\t3\t90".to_string()]);
        assert_eq!(
            extract_tokens(&records, &mut text).unwrap_err(),
            ExtractError::MissingColumns {
                record: 2,
                expected: 12,
                found: 11
            }
        );
    }

    #[test]
    fn test_fractional_confidence_and_crlf() {
        let mut text = RunningText::new();
        let records = format!(
            "{}\r\n5\t1\t1\t1\t1\t1\t0\t0\t3\t3\t95.123456\thi\r\n4\t1\t1\t1\t2\t0\t0\t0\t3\t3\t-1.0\t\r\n",
            HEADER
        );
        let tokens = extract_tokens(&records, &mut text).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(text.as_str(), "hi ");
    }

    #[test]
    fn test_offsets_count_characters() {
        let mut text = RunningText::new();
        let tokens =
            extract_tokens(&page(&[word("café", 0, 0), word("noir", 0, 0)]), &mut text).unwrap();
        assert_eq!((tokens[1].character_start, tokens[1].character_end), (5, 9));
    }

    fn records_strategy() -> impl Strategy<Value = Vec<Option<String>>> {
        prop::collection::vec(prop::option::weighted(0.8, "[a-zA-Z0-9éß]{1,8}"), 0..40)
    }

    proptest! {
        #[test]
        fn prop_offsets_are_ordered(pages in prop::collection::vec(records_strategy(), 1..4)) {
            let mut text = RunningText::new();
            let mut words = Vec::new();
            let mut previous_end = 0u32;

            for records in &pages {
                let rows: Vec<String> = records
                    .iter()
                    .map(|r| match r {
                        Some(w) => word(w, 1, 1),
                        None => boundary(),
                    })
                    .collect();
                let tokens = extract_tokens(&page(&rows), &mut text).unwrap();

                for token in &tokens {
                    prop_assert!(token.character_start < token.character_end);
                    prop_assert!(token.character_start >= previous_end);
                    previous_end = token.character_end;
                }
                words.extend(records.iter().flatten().cloned());
            }

            let expected: String = words.iter().map(|w| format!("{} ", w)).collect();
            prop_assert_eq!(text.as_str(), expected.as_str());
        }

        #[test]
        fn prop_lines_restart_each_page(records in records_strategy()) {
            let rows: Vec<String> = records
                .iter()
                .map(|r| match r {
                    Some(w) => word(w, 1, 1),
                    None => boundary(),
                })
                .collect();
            let mut text = RunningText::new();
            let first = extract_tokens(&page(&rows), &mut text).unwrap();
            let second = extract_tokens(&page(&rows), &mut text).unwrap();

            let lines = |tokens: &[Token]| tokens.iter().map(|t| t.line).collect::<Vec<_>>();
            prop_assert_eq!(lines(&first), lines(&second));
        }
    }
}
