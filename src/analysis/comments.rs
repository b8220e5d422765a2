use std::ops::Range;

use tree_sitter::{Node, Parser, Tree};

use crate::errors::{CocoaError, Result};

const COMMENT_KINDS: [&str; 2] = ["line_comment", "block_comment"];

fn parse_java(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    let language = tree_sitter_java::LANGUAGE;
    parser
        .set_language(&language.into())
        .map_err(|e| CocoaError::analysis(format!("failed to load Java grammar: {e}")))?;
    parser
        .parse(source, None)
        .ok_or_else(|| CocoaError::analysis("tree-sitter parse returned None"))
}

/// Byte ranges of every comment node, in source order.
fn comment_ranges(root: Node<'_>) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if COMMENT_KINDS.contains(&node.kind()) {
            ranges.push(node.byte_range());
            continue;
        }
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    ranges
}

/// Removes `//` and `/* */` comments from Java source.
///
/// Comments are found by parsing, so markers inside string literals and text
/// blocks survive. Line breaks inside removed comments are kept, so line
/// numbers of the remaining code do not shift.
pub fn strip_comments(source: &str) -> Result<String> {
    let tree = parse_java(source)?;
    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    for range in comment_ranges(tree.root_node()) {
        out.push_str(&source[copied..range.start]);
        out.extend(
            source[range.clone()]
                .chars()
                .filter(|c| matches!(c, '\n' | '\r')),
        );
        copied = range.end;
    }
    out.push_str(&source[copied..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_and_block_comments_removed() {
        let src = "class A { int a = 1; // one\n/* two\n three */int b = 2; }\n";
        assert_eq!(
            strip_comments(src).unwrap(),
            "class A { int a = 1; \n\nint b = 2; }\n"
        );
    }

    #[test]
    fn test_javadoc_removed_lines_kept() {
        let src = "/**\n * Doc.\n */\nclass A {}\n";
        assert_eq!(strip_comments(src).unwrap(), "\n\n\nclass A {}\n");
    }

    #[test]
    fn test_crlf_line_endings_kept() {
        let src = "class A {\r\n  int a; // c\r\n  int b;\r\n}\r\n";
        let out = strip_comments(src).unwrap();
        assert_eq!(out, "class A {\r\n  int a; \r\n  int b;\r\n}\r\n");
        assert_eq!(out.matches("\r\n").count(), src.matches("\r\n").count());
    }

    #[test]
    fn test_comment_markers_in_strings_kept() {
        let src = r#"class A { String url = "http://x/*y*/"; char c = '/'; }"#;
        assert_eq!(strip_comments(src).unwrap(), src);
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let src = "class A { String s = \"a\\\"//b\"; } // gone";
        assert_eq!(
            strip_comments(src).unwrap(),
            "class A { String s = \"a\\\"//b\"; } "
        );
    }

    #[test]
    fn test_text_block_kept() {
        let src =
            "class A { String q = \"\"\"\n  select * -- // not a comment\n  \"\"\"; // c\n}\n";
        assert_eq!(
            strip_comments(src).unwrap(),
            "class A { String q = \"\"\"\n  select * -- // not a comment\n  \"\"\"; \n}\n"
        );
    }
}
