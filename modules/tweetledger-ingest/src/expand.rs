use twitter_client::UrlEntity;

/// Replace every entity's span in `text` with its expanded URL.
///
/// Spans index code points (that is how the feed computes them) and are
/// applied in ascending start order. A span that starts before the end of
/// the previously applied one is a duplicate or inconsistent entity and is
/// dropped; so is a span that reaches past the end of the text.
pub fn expand_entities(text: &str, entities: &[UrlEntity]) -> String {
    let chars: Vec<char> = text.chars().collect();

    let mut spans: Vec<(usize, usize, &str)> = entities
        .iter()
        .map(|u| (u.indices[0], u.indices[1], u.expanded_url.as_str()))
        .collect();
    spans.sort_by_key(|&(start, end, _)| (start, end));

    let mut out = String::new();
    let mut cursor = 0usize;
    for (start, end, replacement) in spans {
        if start < cursor || start > end || end > chars.len() {
            continue;
        }
        out.extend(&chars[cursor..start]);
        out.push_str(replacement);
        cursor = end;
    }
    out.extend(&chars[cursor..]);
    out
}
