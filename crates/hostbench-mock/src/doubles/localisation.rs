//! Translation double.

/// Localisation that returns source strings with placeholders filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeLocalisation {
    language: String,
}

impl Default for FakeLocalisation {
    fn default() -> Self {
        Self::new("en")
    }
}

impl FakeLocalisation {
    /// Localisation reporting `language`.
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Language code.
    #[must_use]
    pub fn language_code(&self) -> &str {
        &self.language
    }

    /// Replaces each `%s` in `text` with the next parameter.
    ///
    /// Surplus placeholders are kept verbatim.
    #[must_use]
    pub fn t(&self, text: &str, params: &[&str]) -> String {
        let mut params = params.iter();
        let mut pieces = text.split("%s");
        let mut translated = pieces.next().unwrap_or_default().to_owned();
        for piece in pieces {
            translated.push_str(params.next().copied().unwrap_or("%s"));
            translated.push_str(piece);
        }
        translated
    }

    /// Picks `singular` when `count` is one and `plural` otherwise, then
    /// replaces `%n` with `count` and `%s` with `params`.
    #[must_use]
    pub fn n(&self, singular: &str, plural: &str, count: u64, params: &[&str]) -> String {
        let text = if count == 1 { singular } else { plural };
        self.t(&text.replace("%n", &count.to_string()), params)
    }
}
