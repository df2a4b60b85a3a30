//! Type descriptor grammar.
//!
//! The one-level functions (`parse_array`, `parse_map`, `parse_struct`) return
//! the nested type *text*; callers recurse only when they meet a matching
//! container value. [`parse_type`] builds the whole tree eagerly.

use cursor_api::{ComplexKind, CursorError, Result, TypeNode};

const NOT_NULL: &str = " NOT NULL";

/// Trim and drop a trailing `NOT NULL` qualifier.
pub fn clean_type_name(text: &str) -> String {
    strip_not_null(text).to_string()
}

/// Container keyword leading the descriptor, if any.
///
/// `ARRAY<INT>` and a bare `ARRAY` both report [`ComplexKind::Array`];
/// `MAPPING` is a primitive name.
pub fn descriptor_kind(text: &str) -> Option<ComplexKind> {
    let text = text.trim_start();
    [ComplexKind::Array, ComplexKind::Struct, ComplexKind::Map]
        .into_iter()
        .find(|kind| {
            let keyword = kind.keyword();
            let head = text.get(..keyword.len());
            let next = text[head.map_or(0, str::len)..].chars().next();
            head.is_some_and(|h| h.eq_ignore_ascii_case(keyword))
                && next.is_none_or(|c| c == '<' || c.is_whitespace())
        })
}

/// Element type text of `ARRAY<...>`.
pub fn parse_array(text: &str) -> Result<String> {
    let content = container_body(text, ComplexKind::Array)?;
    match split_top_level(content, ',') {
        Some(parts) if parts.len() == 1 && !parts[0].trim().is_empty() => {
            Ok(clean_type_name(parts[0]))
        }
        _ => Err(grammar(ComplexKind::Array, text)),
    }
}

/// Key and value type text of `MAP<K,V>`.
pub fn parse_map(text: &str) -> Result<(String, String)> {
    let content = container_body(text, ComplexKind::Map)?;
    match split_top_level(content, ',').as_deref() {
        Some([key, value]) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((clean_type_name(key), clean_type_name(value)))
        }
        _ => Err(grammar(ComplexKind::Map, text)),
    }
}

/// Field names and type text of `STRUCT<a:T,...>`, in declared order.
pub fn parse_struct(text: &str) -> Result<Vec<(String, String)>> {
    let content = container_body(text, ComplexKind::Struct)?;
    if content.trim().is_empty() {
        return Err(grammar(ComplexKind::Struct, text));
    }
    let segments = split_top_level(content, ',').ok_or_else(|| grammar(ComplexKind::Struct, text))?;
    segments
        .into_iter()
        .map(|segment| match split_top_level(segment, ':').as_deref() {
            Some([name, ty]) => {
                let name = name.trim().trim_matches('`');
                let ty = clean_type_name(ty);
                if name.is_empty() || ty.is_empty() {
                    Err(grammar(ComplexKind::Struct, text))
                } else {
                    Ok((name.to_string(), ty))
                }
            }
            _ => Err(grammar(ComplexKind::Struct, text)),
        })
        .collect()
}

/// Parse a full descriptor into a [`TypeNode`] tree.
pub fn parse_type(text: &str) -> Result<TypeNode> {
    let cleaned = clean_type_name(text);
    match descriptor_kind(&cleaned) {
        Some(ComplexKind::Array) => {
            let element = parse_array(&cleaned)?;
            Ok(TypeNode::Array(Box::new(parse_type(&element)?)))
        }
        Some(ComplexKind::Map) => {
            let (key, value) = parse_map(&cleaned)?;
            Ok(TypeNode::Map(Box::new(parse_type(&key)?), Box::new(parse_type(&value)?)))
        }
        Some(ComplexKind::Struct) => parse_struct(&cleaned)?
            .into_iter()
            .map(|(name, ty)| parse_type(&ty).map(|node| (name, node)))
            .collect::<Result<Vec<_>>>()
            .map(TypeNode::Struct),
        None => Ok(TypeNode::Primitive(cleaned)),
    }
}

fn grammar(category: ComplexKind, metadata: &str) -> CursorError {
    CursorError::Grammar { category, metadata: metadata.to_string() }
}

/// Text between the keyword's `<` and its matching `>`.
///
/// Anything other than whitespace after the closing bracket is an error.
fn container_body(text: &str, kind: ComplexKind) -> Result<&str> {
    let trimmed = strip_not_null(text);
    let keyword = kind.keyword();
    let head = trimmed
        .get(..keyword.len())
        .filter(|h| h.eq_ignore_ascii_case(keyword))
        .ok_or_else(|| grammar(kind, text))?;
    let rest = trimmed[head.len()..].trim_start();
    let body = rest.strip_prefix('<').ok_or_else(|| grammar(kind, text))?;

    let mut stack: Vec<char> = vec!['>'];
    for (i, c) in body.char_indices() {
        match c {
            '<' => stack.push('>'),
            '(' => stack.push(')'),
            '>' | ')' => {
                if stack.pop() != Some(c) {
                    return Err(grammar(kind, text));
                }
                if stack.is_empty() {
                    return if body[i + 1..].trim().is_empty() {
                        Ok(&body[..i])
                    } else {
                        Err(grammar(kind, text))
                    };
                }
            }
            _ => {}
        }
    }
    Err(grammar(kind, text))
}

fn strip_not_null(text: &str) -> &str {
    let trimmed = text.trim();
    let cut = trimmed.len().saturating_sub(NOT_NULL.len());
    match trimmed.get(cut..) {
        Some(tail) if trimmed.len() > NOT_NULL.len() && tail.eq_ignore_ascii_case(NOT_NULL) => {
            trimmed[..cut].trim_end()
        }
        _ => trimmed,
    }
}

/// Split on `sep` where no `<...>` or `(...)` is open.
///
/// Returns `None` on unbalanced brackets.
fn split_top_level(content: &str, sep: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut start = 0;
    for (i, c) in content.char_indices() {
        match c {
            '<' => stack.push('>'),
            '(' => stack.push(')'),
            '>' | ')' => {
                if stack.pop() != Some(c) {
                    return None;
                }
            }
            c if c == sep && stack.is_empty() => {
                parts.push(&content[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if !stack.is_empty() {
        return None;
    }
    parts.push(&content[start..]);
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_fields_keep_declared_order() {
        let fields = parse_struct("STRUCT<a:INT,b:STRING>").expect("valid struct");
        assert_eq!(
            fields,
            vec![("a".to_string(), "INT".to_string()), ("b".to_string(), "STRING".to_string())]
        );
    }

    #[test]
    fn nested_commas_do_not_split() {
        let fields =
            parse_struct("STRUCT<id: BIGINT, tags: ARRAY<STRUCT<k:STRING,v:INT>>, amount: DECIMAL(10,2)>")
                .expect("valid struct");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].1, "ARRAY<STRUCT<k:STRING,v:INT>>");
        assert_eq!(fields[2].1, "DECIMAL(10,2)");

        let (key, value) = parse_map("MAP<STRING,MAP<INT,ARRAY<DATE>>>").expect("valid map");
        assert_eq!(key, "STRING");
        assert_eq!(value, "MAP<INT,ARRAY<DATE>>");
    }

    #[test]
    fn array_returns_element_text() {
        assert_eq!(parse_array("ARRAY<ARRAY<STRING>>").expect("valid array"), "ARRAY<STRING>");
        assert_eq!(parse_array("array < int NOT NULL >").expect("valid array"), "int");
    }

    #[test]
    fn map_splits_key_and_value() {
        assert_eq!(
            parse_map("MAP<STRING,INT>").expect("valid map"),
            ("STRING".to_string(), "INT".to_string())
        );
    }

    #[test]
    fn malformed_map_reports_map_category() {
        for text in ["MAP<STRING INT>", "MAP<>", "MAP<STRING,INT,INT>", "MAP<,INT>"] {
            let err = parse_map(text).expect_err(text);
            assert!(
                matches!(&err, CursorError::Grammar { category: ComplexKind::Map, metadata } if metadata == text),
                "{text}: {err}"
            );
            assert!(err.to_string().contains("MAP"));
        }
    }

    #[test]
    fn malformed_struct_and_array_are_rejected() {
        for text in ["STRUCT<>", "STRUCT<a INT>", "STRUCT<a:INT,b>", "STRUCT<:INT>", "STRUCT<a:INT"] {
            assert!(
                matches!(parse_struct(text), Err(CursorError::Grammar { category: ComplexKind::Struct, .. })),
                "{text}"
            );
        }
        for text in ["ARRAY<>", "ARRAY<INT", "ARRAY<INT>>", "ARRAY<INT> x", "ARRAY INT"] {
            assert!(
                matches!(parse_array(text), Err(CursorError::Grammar { category: ComplexKind::Array, .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn not_null_is_stripped() {
        assert_eq!(clean_type_name("  INT NOT NULL "), "INT");
        assert_eq!(clean_type_name("string not null"), "string");
        assert_eq!(clean_type_name("NOT NULL"), "NOT NULL");
        let fields = parse_struct("STRUCT<a:INT NOT NULL,b:ARRAY<STRING> NOT NULL>").expect("valid struct");
        assert_eq!(fields[0].1, "INT");
        assert_eq!(fields[1].1, "ARRAY<STRING>");
    }

    #[test]
    fn descriptor_kind_needs_keyword_boundary() {
        assert_eq!(descriptor_kind("array<int>"), Some(ComplexKind::Array));
        assert_eq!(descriptor_kind("STRUCT <a:int>"), Some(ComplexKind::Struct));
        assert_eq!(descriptor_kind("MAP"), Some(ComplexKind::Map));
        assert_eq!(descriptor_kind("MAPPING"), None);
        assert_eq!(descriptor_kind("INT"), None);
    }

    #[test]
    fn parse_type_builds_full_tree() {
        let node = parse_type("ARRAY<STRUCT<a: INT NOT NULL, b: MAP<STRING, ARRAY<DOUBLE>>>>")
            .expect("valid descriptor");
        assert_eq!(node.to_string(), "ARRAY<STRUCT<a:INT,b:MAP<STRING,ARRAY<DOUBLE>>>>");
        assert!(parse_type("ARRAY<STRUCT<a>>").is_err());
    }
}
