//! Display-only re-indentation of response bodies.
//!
//! Nothing here validates JSON; the output is for people, never for deciding
//! whether an upload succeeded.

const INDENT: &str = "  ";

/// Re-indents a JSON object or array for display.
///
/// Input whose first non-whitespace character is neither `{` nor `[` is
/// returned unchanged. Otherwise a bracket-depth scanner that respects string
/// literals and escapes puts a newline after `{`, `[` and `,`, a newline
/// before `}` and `]`, writes `:` as `": "`, and drops whitespace between
/// tokens. Empty containers get the same treatment, so `{}` becomes an
/// opening line, an indented blank line and a closing line.
pub fn pretty_json(raw: &str) -> String {
    if !matches!(raw.trim_start().chars().next(), Some('{' | '[')) {
        return raw.to_owned();
    }

    let mut out = String::with_capacity(raw.len() * 2);
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for c in raw.trim().chars() {
        if in_string {
            out.push(c);
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
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                out.push(c);
                depth += 1;
                newline(&mut out, depth);
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                newline(&mut out, depth);
                out.push(c);
            }
            ',' => {
                out.push(c);
                newline(&mut out, depth);
            }
            ':' => out.push_str(": "),
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }

    out
}

fn newline(out: &mut String, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_json_is_unchanged() {
        for raw in ["", "   ", "plain text", "  <html>{}</html>", "null", "\"{quoted}\""] {
            assert_eq!(pretty_json(raw), raw);
        }
    }

    #[test]
    fn test_object() {
        let raw = r#"{"key":"abc.png","hash":"Fh8x","fsize":42}"#;
        let expected = "{\n  \"key\": \"abc.png\",\n  \"hash\": \"Fh8x\",\n  \"fsize\": 42\n}";
        assert_eq!(pretty_json(raw), expected);
    }

    #[test]
    fn test_nested_and_empty() {
        let raw = r#" { "a" : [1, {"b":{}}], "c": [ ] } "#;
        let expected = "{\n  \"a\": [\n    1,\n    {\n      \"b\": {\n        \n      }\n    }\n  ],\n  \"c\": [\n    \n  ]\n}";
        assert_eq!(pretty_json(raw), expected);
    }

    #[test]
    fn test_empty_object_is_expanded() {
        assert_eq!(pretty_json(r#"{"a":{}}"#), "{\n  \"a\": {\n    \n  }\n}");
        assert_eq!(pretty_json("[]"), "[\n  \n]");
    }

    #[test]
    fn test_strings_are_preserved() {
        let raw = r#"{"msg":"a, b: {c} [d] \"e\\\" f"}"#;
        let expected = "{\n  \"msg\": \"a, b: {c} [d] \\\"e\\\\\\\" f\"\n}";
        assert_eq!(pretty_json(raw), expected);
    }

    #[test]
    fn test_unbalanced_input_does_not_panic() {
        let out = pretty_json("]]}}{");
        assert!(out.contains('{'));
    }
}
