use ammonia;

/// Clean admin-authored rich text (exam and subject descriptions) with the
/// ammonia whitelist sanitizer.
///
/// Safe formatting tags such as <b> survive; <script>, <iframe> and event
/// handler attributes are stripped. Plain-text fields (titles, prompts,
/// options) are stored as given and never pass through here.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input.trim()).trim().to_string()
}

/// Sanitizes an optional description, dropping it when nothing is left.
pub fn clean_description(input: Option<&str>) -> Option<String> {
    input.map(clean_html).filter(|s| !s.is_empty())
}
