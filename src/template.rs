//! Prompt template rendering.
//!
//! Renders `$name` and `${name:-default}` placeholders against a variable
//! map. Rendering is total: unknown names, unterminated groups, and malformed
//! group contents are emitted verbatim rather than treated as errors, so a
//! template written for a future variable set still renders today.

use std::collections::HashMap;

/// Render a template against the given variables.
///
/// Recognized placeholder forms:
/// - `$name` — substitutes the variable's value; unknown names stay literal.
/// - `${name}` — same as the bare form.
/// - `${name:-default}` — substitutes the value, or the literal default when
///   the variable is absent or empty.
///
/// Placeholder names match `[A-Za-z_][A-Za-z0-9_]*`. A `${...}` group with no
/// closing brace, or whose name part is not a valid identifier, renders as
/// literal text.
pub fn render(template: &str, variables: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let s = &rest[pos..];

        let consumed = if s[1..].starts_with('{') {
            render_braced(s, variables, &mut out)
        } else {
            render_bare(s, variables, &mut out)
        };
        rest = &s[consumed..];
    }
    out.push_str(rest);
    out
}

/// Handle `$name` at the start of `s` (which begins with `$`). Returns the
/// number of bytes consumed.
fn render_bare(s: &str, variables: &HashMap<String, String>, out: &mut String) -> usize {
    let name_len = ident_len(&s[1..]);
    if name_len == 0 {
        // Lone `$` followed by a non-identifier character.
        out.push('$');
        return 1;
    }
    let name = &s[1..1 + name_len];
    match variables.get(name) {
        Some(value) => out.push_str(value),
        None => out.push_str(&s[..1 + name_len]),
    }
    1 + name_len
}

/// Handle `${...}` at the start of `s` (which begins with `${`). Returns the
/// number of bytes consumed.
fn render_braced(s: &str, variables: &HashMap<String, String>, out: &mut String) -> usize {
    let Some(close) = s[2..].find('}') else {
        // Unterminated group: the remainder is literal text.
        out.push_str(s);
        return s.len();
    };
    let content = &s[2..2 + close];
    let consumed = close + 3;

    let (name, default) = match content.find(":-") {
        Some(sep) => (&content[..sep], Some(&content[sep + 2..])),
        None => (content, None),
    };

    if !is_ident(name) {
        out.push_str(&s[..consumed]);
        return consumed;
    }

    match (variables.get(name), default) {
        (Some(value), _) if !value.is_empty() => out.push_str(value),
        (_, Some(default)) => out.push_str(default),
        (Some(value), None) => out.push_str(value),
        (None, None) => out.push_str(&s[..consumed]),
    }
    consumed
}

fn ident_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if bytes.is_empty() || !(bytes[0].is_ascii_alphabetic() || bytes[0] == b'_') {
        return 0;
    }
    bytes
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))
        .unwrap_or(bytes.len())
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && ident_len(s) == s.len()
}
