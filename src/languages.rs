use std::collections::HashMap;

// Chat languages the game exposes on clan profiles
lazy_static::lazy_static! {
    static ref LANGUAGES: HashMap<&'static str, &'static str> = HashMap::from([
        ("EN", "English"),
        ("ES", "Español"),
        ("FR", "Français"),
        ("DE", "Deutsch"),
        ("NL", "Nederlands"),
        ("NO", "Norsk"),
        ("IT", "Italiano"),
        ("RU", "Русский"),
        ("TR", "Türkçe"),
        ("PT", "Português"),
        ("AR", "العربية"),
        ("FA", "فارسی"),
        ("ID", "Indonesia"),
        ("MS", "Melayu"),
        ("TL", "Filipino"),
        ("JA", "日本語"),
        ("KO", "한국어"),
        ("ZH", "简体中文"),
        ("TH", "ภาษาไทย"),
        ("VI", "Tiếng Việt"),
        ("PL", "Polski"),
        ("FI", "Suomi"),
        ("SV", "Svenska"),
        ("DA", "Dansk"),
        ("HI", "हिन्दी"),
        ("BN", "বাংলা"),
        ("UK", "Українська"),
    ]);
}

/// Full name for a chat-language code, if known.
pub fn display_name(code: &str) -> Option<&'static str> {
    LANGUAGES.get(code.to_uppercase().as_str()).copied()
}

/// "English (EN)" when the code is known, the bare code otherwise.
pub fn label(code: &str) -> String {
    match display_name(code) {
        Some(name) => format!("{} ({})", name, code.to_uppercase()),
        None => code.to_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("EN"), Some("English"));
        assert_eq!(display_name("en"), Some("English"));
        assert_eq!(display_name("XX"), None);
    }

    #[test]
    fn test_label() {
        assert_eq!(label("EN"), "English (EN)");
        assert_eq!(label("xx"), "XX");
    }
}
