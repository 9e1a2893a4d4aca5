/*
 * Splits slash-delimited item locations into folder segments and a leaf name.
 * Both forward and backward slashes are accepted as separators, and empty
 * components (from repeated, leading or trailing separators) are discarded,
 * so a location never yields an empty folder name.
 */

/*
 * The result of segmenting a location. `folders` keeps the order in which the
 * segments appear; `leaf` is the last non-empty component, or an empty string
 * when the location has no components at all.
 */
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SegmentedPath {
    pub folders: Vec<String>,
    pub leaf: String,
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

// (start, end) byte ranges of the non-empty components of `location`.
fn component_spans(location: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, c) in location.char_indices() {
        if is_separator(c) {
            if let Some(s) = start.take() {
                spans.push((s, idx));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(s) = start {
        spans.push((s, location.len()));
    }
    spans
}

pub fn segment(location: &str) -> SegmentedPath {
    let mut components: Vec<String> = component_spans(location)
        .into_iter()
        .map(|(s, e)| location[s..e].to_string())
        .collect();
    let leaf = components.pop().unwrap_or_default();
    SegmentedPath {
        folders: components,
        leaf,
    }
}

// The last non-empty component of `location`, borrowed from it.
pub fn leaf(location: &str) -> &str {
    match component_spans(location).last() {
        Some(&(s, e)) => &location[s..e],
        None => "",
    }
}

/*
 * Returns, for each folder segment of `location`, the verbatim prefix of the
 * location that ends with that segment. Separators inside the prefix are kept
 * exactly as written, so `"a\\b/c.png"` yields `["a", "a\\b"]`.
 */
pub fn folder_prefixes(location: &str) -> Vec<String> {
    let spans = component_spans(location);
    let folder_count = spans.len().saturating_sub(1);
    spans
        .iter()
        .take(folder_count)
        .map(|&(_, end)| location[..end].to_string())
        .collect()
}
