//! 从模型输出中提取第一个完整的 JSON 对象
//!
//! 模型常在 JSON 前后附带说明文字或 ``` 代码块；这里只做括号配平（跟踪字符串与转义），
//! 不做任何语义判断。存在代码块时优先在代码块内查找。

/// 返回第一个括号配平的 `{...}` 片段
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(body) = fenced_body(text) {
        if let Some(block) = first_balanced_object(body) {
            return Some(block);
        }
    }
    first_balanced_object(text)
}

/// 第一个 ``` 代码块的正文（跳过语言标记）；未闭合时取到文本末尾
fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let tag_len = after
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(after.len());
    let body = &after[tag_len..];
    let end = body.find("```").unwrap_or(body.len());
    Some(&body[..end])
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find('{') {
        let start = search_from + rel;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        search_from = start + 1;
    }
    None
}

/// `text` 以 '{' 开头；返回配平处（含）之后的字节偏移
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        assert_eq!(extract_json_block(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_prose_around_object() {
        let text = "Sure! Here is the plan: {\"goal\": \"x\", \"actions\": []} Let me know.";
        assert_eq!(
            extract_json_block(text),
            Some("{\"goal\": \"x\", \"actions\": []}")
        );
    }

    #[test]
    fn test_fenced_block_wins_over_prose_braces() {
        let text = "Use {braces} carefully.\n```json\n{\"action\": \"help\"}\n```\nDone.";
        assert_eq!(extract_json_block(text), Some("{\"action\": \"help\"}"));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = r#"{"q": "what about } and {?", "n": {"x": "\"}"}}"#;
        assert_eq!(extract_json_block(text), Some(text));
    }

    #[test]
    fn test_unclosed_prefix_then_valid_object() {
        let text = "oops { not closed ... {\"ok\": true}";
        // 从第一个 '{' 开始无法配平，退到后续候选
        assert_eq!(extract_json_block(text), Some("{\"ok\": true}"));
    }

    #[test]
    fn test_no_object() {
        assert_eq!(extract_json_block("I cannot help with that."), None);
        assert_eq!(extract_json_block("{ never closes"), None);
    }

    #[test]
    fn test_unterminated_fence() {
        let text = "```json\n{\"action\": \"list_projects\"}";
        assert_eq!(extract_json_block(text), Some("{\"action\": \"list_projects\"}"));
    }
}
