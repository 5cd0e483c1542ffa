use serde_json::Value;

/// Walks `path` through `root`.
///
/// `Some(&Value::Null)` means the path exists and holds null; `None` means
/// it does not exist. Accepts an optional `$` / `$.` prefix, dotted keys,
/// `[n]` indices and numeric segments on arrays (`items.0.id`).
#[must_use]
pub fn lookup_path<'json>(root: &'json Value, path: &str) -> Option<&'json Value> {
    let trimmed = path.trim();
    let trimmed = trimmed
        .strip_prefix("$.")
        .or_else(|| trimmed.strip_prefix('$'))
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for segment in segments(trimmed)? {
        current = match (current, segment) {
            (Value::Object(fields), Segment::Key(key)) => fields.get(key)?,
            (Value::Array(items), Segment::Key(key)) => items.get(key.parse::<usize>().ok()?)?,
            (Value::Array(items), Segment::Index(index)) => items.get(index)?,
            (Value::Object(fields), Segment::Index(index)) => fields.get(&index.to_string())?,
            (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_), _) => {
                return None;
            }
        };
    }
    Some(current)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'path> {
    Key(&'path str),
    Index(usize),
}

fn segments(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut out = Vec::new();
    for part in path.split('.') {
        let (key, mut brackets) = match part.find('[') {
            Some(open) => part.split_at(open),
            None => (part, ""),
        };
        if !key.is_empty() {
            out.push(Segment::Key(key));
        } else if brackets.is_empty() {
            return None;
        }
        while !brackets.is_empty() {
            let inner = brackets.strip_prefix('[')?;
            let close = inner.find(']')?;
            let (index, rest) = inner.split_at(close);
            out.push(Segment::Index(index.trim().parse().ok()?));
            brackets = rest.strip_prefix(']')?;
        }
    }
    Some(out)
}
