use crate::record::Language;

/// Appended to source text cut at the length limit
pub const TRUNCATION_MARKER: &str = "\n...(content truncated)";

/// Cut `content` to at most `max_chars` characters, marking the cut
pub fn truncate_source(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &content[..byte_idx], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}

/// Build the metadata request for one item in one language
pub fn build_prompt(identifier: &str, content: &str, language: Language, max_chars: usize) -> String {
    let source = truncate_source(content, max_chars);
    let language_name = language.display_name();

    format!(
        "You are a professional YouTube SEO specialist writing {language_name} metadata.\n\
         \n\
         Video: {identifier}\n\
         \n\
         [Transcript]\n\
         {source}\n\
         \n\
         Based on the transcript, write in {language_name} ONLY:\n\
         1. title: 10 distinct title options of 50-80 characters, one per line, separated by \\n\n\
         2. description: a detailed description (300-500 words) with a numbered outline, \
         intended audience, takeaways and closing hashtags\n\
         3. keywords: 10-15 precise keywords as a JSON array of strings\n\
         4. summary: a 200-300 word summary, one key point per paragraph separated by \\n\n\
         \n\
         Return ONLY this JSON object, without markdown code fences:\n\
         {{\n\
         \x20 \"title\": \"Title 1\\nTitle 2\\n...\",\n\
         \x20 \"description\": \"...\",\n\
         \x20 \"keywords\": [\"keyword1\", \"keyword2\"],\n\
         \x20 \"summary\": \"...\"\n\
         }}\n\
         Escape all quotes inside strings so the JSON parses directly."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_source("短文本", 10), "短文本");
        assert_eq!(truncate_source("哲学智慧讲座", 2), format!("哲学{}", TRUNCATION_MARKER));
        assert_eq!(truncate_source("abc", 3), "abc");
    }

    #[test]
    fn test_prompt_mentions_language_and_source() {
        let prompt = build_prompt("lesson-01", "transcript body", Language::English, 100);
        assert!(prompt.contains("English"));
        assert!(prompt.contains("lesson-01"));
        assert!(prompt.contains("transcript body"));
        assert!(prompt.contains("\"keywords\""));
    }
}
