//! Byte-level scanners over model text. JSON structural characters are ASCII, so
//! every index returned here is a valid `str` boundary.

/// Tracks whether the scanner is inside a string literal, honouring escapes.
#[derive(Default)]
struct StringState {
    in_string: bool,
    escaped: bool,
}

impl StringState {
    /// Returns true when `byte` is string content (or the quote that ends a string)
    /// and must not be treated as structure.
    fn consume(&mut self, byte: u8) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            return true;
        }
        if byte == b'"' {
            self.in_string = true;
            return true;
        }
        false
    }
}

fn closer_for(open: u8) -> u8 {
    if open == b'[' {
        b']'
    } else {
        b'}'
    }
}

/// Index of the bracket that balances the `[` or `{` at `open`, ignoring brackets
/// inside string literals. `None` when the text ends first or brackets are mismatched.
pub(crate) fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if !matches!(bytes.get(open), Some(b'[') | Some(b'{')) {
        return None;
    }

    let mut stack: Vec<u8> = Vec::new();
    let mut strings = StringState::default();
    for (idx, &byte) in bytes.iter().enumerate().skip(open) {
        if strings.consume(byte) {
            continue;
        }
        match byte {
            b'[' | b'{' => stack.push(byte),
            b']' | b'}' => {
                let open_byte = stack.pop()?;
                if closer_for(open_byte) != byte {
                    return None;
                }
                if stack.is_empty() {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Inner contents of fenced code blocks, in order. A fence left open at the end of
/// the text yields everything after it.
pub(crate) fn code_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let tag_len = after
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
            .count();
        let body = &after[tag_len..];
        match body.find("```") {
            Some(close) => {
                blocks.push(&body[..close]);
                rest = &body[close + 3..];
            }
            None => {
                blocks.push(body);
                break;
            }
        }
    }
    blocks
}

/// Every balanced `{...}` span in `text` as `(open, close)` byte offsets, sorted
/// by `open`. One pass with an explicit stack: braces that never close are left
/// on the stack and ignored, so spans nested inside them are still reported.
/// Quotes only count inside a brace, so prose apostrophes and stray quotes
/// between objects do not hide structure.
pub(crate) fn balanced_objects(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut opens: Vec<usize> = Vec::new();
    let mut strings = StringState::default();
    for (idx, &byte) in text.as_bytes().iter().enumerate() {
        if opens.is_empty() {
            if byte == b'{' {
                strings = StringState::default();
                opens.push(idx);
            }
            continue;
        }
        if strings.consume(byte) {
            continue;
        }
        match byte {
            b'{' => opens.push(idx),
            b'}' => {
                if let Some(open) = opens.pop() {
                    spans.push((open, idx));
                }
            }
            _ => {}
        }
    }
    spans.sort_unstable_by_key(|span| span.0);
    spans
}

struct Frame {
    open: u8,
    /// End (exclusive) of the last child that finished inside this container.
    last_complete: Option<usize>,
}

/// Repairs text that opens a JSON structure but is cut off before closing it.
///
/// Structures that close on their own (prose like `[v1]`, a finished example) are
/// skipped; only the structure still open at the end of the text is repaired. Its
/// outermost array is the element container. Everything after its last complete
/// element is dropped, then every container still open at that point is closed.
/// Partial strings, numbers and objects are never completed.
pub(crate) fn repair_truncated(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut frames: Vec<Frame> = Vec::new();
    let mut strings = StringState::default();

    for (idx, &byte) in bytes.iter().enumerate() {
        if frames.is_empty() {
            // Between structures: quotes and stray closers are prose.
            if matches!(byte, b'[' | b'{') {
                start = idx;
                strings = StringState::default();
                frames.push(Frame {
                    open: byte,
                    last_complete: None,
                });
            }
            continue;
        }
        if strings.consume(byte) {
            continue;
        }
        match byte {
            b'[' | b'{' => frames.push(Frame {
                open: byte,
                last_complete: None,
            }),
            b']' | b'}' => {
                let frame = frames.pop()?;
                if closer_for(frame.open) != byte {
                    return None;
                }
                if let Some(parent) = frames.last_mut() {
                    parent.last_complete = Some(idx + 1);
                }
            }
            b',' => {
                if let Some(frame) = frames.last_mut() {
                    frame.last_complete = Some(idx);
                }
            }
            _ => {}
        }
    }

    let container = frames.iter().position(|frame| frame.open == b'[')?;
    let cut = frames[container].last_complete?;

    let mut repaired = String::with_capacity(cut - start + container + 1);
    repaired.push_str(&text[start..cut]);
    for frame in frames[..=container].iter().rev() {
        repaired.push(closer_for(frame.open) as char);
    }
    Some(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_close_ignores_brackets_in_strings() {
        let text = r#"noise [{"title": "a ] tricky [ one"}, {"t": "\"]\""}] tail"#;
        let open = text.find('[').unwrap();
        let close = matching_close(text, open).unwrap();
        assert!(text[open..=close].ends_with("}]"));
        assert!(text[close + 1..].starts_with(" tail"));
    }

    #[test]
    fn test_matching_close_mismatch() {
        assert_eq!(matching_close("[1, 2}", 0), None);
        assert_eq!(matching_close("[1, 2", 0), None);
        assert_eq!(matching_close("abc", 0), None);
    }

    #[test]
    fn test_balanced_objects_reports_nested_and_skips_unclosed() {
        let text = r#"x {"a": {"b": 1}} {"c": "}"} {"open": {"d": 2}"#;
        let spans: Vec<&str> = balanced_objects(text)
            .into_iter()
            .map(|(open, close)| &text[open..=close])
            .collect();
        assert_eq!(
            spans,
            vec![r#"{"a": {"b": 1}}"#, r#"{"b": 1}"#, r#"{"c": "}"}"#, r#"{"d": 2}"#]
        );
    }

    #[test]
    fn test_code_blocks_with_and_without_tag() {
        let text = "Here:\n```json\n[1]\n```\nand\n```\n{\"a\": 2}\n```";
        let blocks = code_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].trim(), "[1]");
        assert_eq!(blocks[1].trim(), "{\"a\": 2}");
    }

    #[test]
    fn test_code_block_left_open() {
        let blocks = code_blocks("```json\n[{\"a\": 1}, {\"a\"");
        assert_eq!(blocks, vec!["\n[{\"a\": 1}, {\"a\""]);
    }

    #[test]
    fn test_repair_drops_incomplete_tail() {
        let repaired = repair_truncated(r#"[{"a":1},{"a":2},{"a""#).unwrap();
        assert_eq!(repaired, r#"[{"a":1},{"a":2}]"#);
    }

    #[test]
    fn test_repair_inside_wrapper_object() {
        let repaired =
            repair_truncated(r#"{"test_cases": [{"a": [1, 2]}, {"a": [3"#).unwrap();
        assert_eq!(repaired, r#"{"test_cases": [{"a": [1, 2]}]}"#);
    }

    #[test]
    fn test_repair_never_completes_dangling_string() {
        let repaired = repair_truncated(r#"[{"title": "one"}, {"title": "tw"#).unwrap();
        assert_eq!(repaired, r#"[{"title": "one"}]"#);
    }

    #[test]
    fn test_repair_requires_truncation() {
        assert_eq!(repair_truncated(r#"[{"a":1}]"#), None);
        assert_eq!(repair_truncated(r#"[{"a""#), None);
        assert_eq!(repair_truncated("no json here"), None);
        assert_eq!(repair_truncated(r#"see [1] and {"a": 2} done"#), None);
    }

    #[test]
    fn test_repair_skips_closed_prose_brackets() {
        let repaired =
            repair_truncated(r#"Cases [v1] "quoted: [{"title": "one"}, {"title": "tw"#).unwrap();
        assert_eq!(repaired, r#"[{"title": "one"}]"#);
    }
}
