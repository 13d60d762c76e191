//! Rewrites `@name` placeholders into the driver's positional `$n` syntax.

use crate::error::{OrmError, OrmResult};
use crate::param::Params;
use tokio_postgres::types::ToSql;

/// SQL ready for tokio-postgres: positional placeholders plus the values in
/// placeholder order.
pub struct BoundSql<'a> {
    pub sql: String,
    pub params: Vec<&'a (dyn ToSql + Sync)>,
}

impl std::fmt::Debug for BoundSql<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundSql")
            .field("sql", &self.sql)
            .field("param_count", &self.params.len())
            .finish()
    }
}

/// Rewrite every `@name` in `sql` to `$n`, collecting the bound values.
///
/// A name used more than once reuses its first index. These are copied
/// verbatim:
///
/// - string literals: `'...'`, `E'...'` with backslash escapes, and
///   dollar-quoted `$$...$$` / `$tag$...$tag$`
/// - double-quoted identifiers
/// - `--` line comments and (possibly nested) `/* ... */` block comments
/// - `@@` sequences and `@` not followed by an identifier
pub fn bind_named<'a>(sql: &str, params: &'a Params) -> OrmResult<BoundSql<'a>> {
    let mut out = String::with_capacity(sql.len());
    let mut order: Vec<&str> = Vec::new();
    let mut values: Vec<&'a (dyn ToSql + Sync)> = Vec::new();

    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let word_start = i == 0 || !is_ident_char(bytes[i - 1]);
        match bytes[i] {
            b'E' | b'e' if word_start && bytes.get(i + 1) == Some(&b'\'') => {
                let end = skip_escape_string(bytes, i + 1);
                out.push_str(&sql[i..end]);
                i = end;
            }
            b'$' if word_start => {
                let end = dollar_tag(bytes, i).map_or(i + 1, |tag_end| {
                    let tag = &sql[i..tag_end];
                    sql[tag_end..]
                        .find(tag)
                        .map_or(bytes.len(), |n| tag_end + n + tag.len())
                });
                out.push_str(&sql[i..end]);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = skip_block_comment(bytes, i);
                out.push_str(&sql[i..end]);
                i = end;
            }
            quote @ (b'\'' | b'"') => {
                let end = skip_quoted(bytes, i, quote);
                out.push_str(&sql[i..end]);
                i = end;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = sql[i..].find('\n').map_or(bytes.len(), |n| i + n);
                out.push_str(&sql[i..end]);
                i = end;
            }
            b'@' if bytes.get(i + 1) == Some(&b'@') => {
                out.push_str("@@");
                i += 2;
            }
            b'@' if bytes.get(i + 1).is_some_and(|b| is_ident_start(*b)) => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                let name = &sql[start..end];
                let index = match order.iter().position(|n| *n == name) {
                    Some(pos) => pos + 1,
                    None => {
                        let param = params
                            .get(name)
                            .ok_or_else(|| OrmError::MissingParameter(name.to_string()))?;
                        order.push(name);
                        values.push(param.as_ref());
                        order.len()
                    }
                };
                out.push('$');
                out.push_str(&index.to_string());
                i = end;
            }
            _ => {
                // Copy one full UTF-8 character.
                let ch_len = sql[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&sql[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    Ok(BoundSql { sql: out, params: values })
}

/// Index one past the closing quote; a doubled quote is an escape.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// `E'...'`: backslash escapes the next byte, a doubled quote is also an escape.
fn skip_escape_string(bytes: &[u8], quote_at: usize) -> usize {
    let mut i = quote_at + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\'' if bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b'\'' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// End of an opening `$$` or `$tag$` at `start`. `$1` and a lone `$` are not tags.
fn dollar_tag(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if bytes.get(i).is_some_and(|b| is_ident_start(*b)) {
        while i < bytes.len() && is_ident_char(bytes[i]) {
            i += 1;
        }
    }
    (bytes.get(i) == Some(&b'$')).then_some(i + 1)
}

/// Index one past the `*/` closing the comment at `start`; comments nest.
fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
