use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Longest account or challenge name placed into a message.
pub const MAX_NAME_CHARS: usize = 256;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(?<name>\w+)\}").unwrap());
static MARKDOWN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_*\[\]()~`>#+\-=|{}.!\\]").unwrap());

/// Substitutes `{name}` placeholders. Unknown placeholders are left as written.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let name = &caps["name"];
            match vars.iter().find(|(key, _)| *key == name) {
                Some((_, value)) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

pub fn truncate(name: &str, max_chars: usize) -> &str {
    match name.char_indices().nth(max_chars) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Escapes every character Telegram's MarkdownV2 treats as markup.
pub fn escape_markdown(text: &str) -> String {
    MARKDOWN_RE.replace_all(text, r"\$0").into_owned()
}
