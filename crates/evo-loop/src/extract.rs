//! Strip markdown code fences from a completion response.

/// Extracts fenced code from raw model output.
///
/// Policy:
/// - all accepted fenced blocks are concatenated in order of appearance,
///   prose outside fences is discarded;
/// - a bare ``` fence is always accepted; a language-tagged fence is
///   accepted if its tag is in the configured set, or if the set is empty
///   (accept-all, the default);
/// - if the input contains no fence markers at all, the trimmed input is
///   returned unchanged (the whole response is treated as code);
/// - an unterminated fence runs to the end of the input.
///
/// Pure and deterministic; idempotent on already-unfenced text.
#[derive(Debug, Clone, Default)]
pub struct CodeExtractor {
    /// Accepted language tags, lowercase. Empty = accept any tag.
    language_tags: Vec<String>,
}

impl CodeExtractor {
    /// Accept any language tag (and bare fences).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only bare fences and fences tagged with `language`.
    #[must_use]
    pub fn for_language(language: &str) -> Self {
        Self {
            language_tags: vec![language.to_lowercase()],
        }
    }

    fn tag_accepted(&self, tag: &str) -> bool {
        tag.is_empty()
            || self.language_tags.is_empty()
            || self
                .language_tags
                .iter()
                .any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Extract candidate source text from `raw`.
    pub fn extract(&self, raw: &str) -> String {
        let parts: Vec<&str> = raw.split("```").collect();
        if parts.len() == 1 {
            // No fence markers: the whole response is the code.
            return raw.trim().to_string();
        }

        // Segments between fence markers alternate prose / fenced.
        let mut blocks: Vec<String> = Vec::new();
        for (index, part) in parts.iter().enumerate() {
            if index % 2 == 0 {
                continue;
            }
            let (tag, body) = split_tag(part);
            if self.tag_accepted(tag) {
                let body = body.trim_matches('\n');
                if !body.is_empty() {
                    blocks.push(body.to_string());
                }
            }
        }

        blocks.join("\n").trim().to_string()
    }
}

/// Split a fenced segment into its language tag (the remainder of the
/// opening fence line, if it is a single word) and the block body.
fn split_tag(part: &str) -> (&str, &str) {
    match part.split_once('\n') {
        Some((first, rest)) => {
            let tag = first.trim();
            if tag.is_empty() || is_tag_word(tag) {
                (tag, rest)
            } else {
                // First line is code that happens to follow the fence.
                ("", part)
            }
        }
        None => {
            let tag = part.trim();
            if is_tag_word(tag) {
                (tag, "")
            } else {
                ("", part)
            }
        }
    }
}

fn is_tag_word(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace)
}
