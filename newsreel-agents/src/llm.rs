//! Summarization and translation through an OpenAI-compatible chat API

use async_trait::async_trait;
use newsreel_core::domain::article::{Article, Category};
use newsreel_core::domain::health::ComponentHealth;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{AdapterError, Result};
use crate::http::check_response;
use crate::retry::RetryPolicy;

const ADAPTER: &str = "llm";

/// Narration speed used to size summaries (150 words per minute)
pub const WORDS_PER_SECOND: f64 = 2.5;

/// Share of letters that must be in the target script
const MIN_SCRIPT_RATIO: f64 = 0.7;

/// Summarizes articles and translates summaries
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Spoken-length summary of an article of roughly `target_words` words
    async fn summarize(&self, article: &Article, target_words: usize) -> Result<String>;

    /// Translation of `text` into the configured target language
    async fn translate(&self, text: &str, category: Category) -> Result<String>;

    async fn probe(&self) -> ComponentHealth;
}

/// Number of words that can be narrated in `seconds`
pub fn word_budget(seconds: f64) -> usize {
    ((seconds * WORDS_PER_SECOND).floor() as usize).max(1)
}

/// Truncates a summary on word boundaries when it runs over 120% of the
/// budget for `seconds`
pub fn fit_to_duration(summary: &str, seconds: f64) -> String {
    let words: Vec<&str> = summary.split_whitespace().collect();
    let budget = word_budget(seconds);

    if (words.len() as f64) <= budget as f64 * 1.2 {
        return words.join(" ");
    }

    let mut truncated = words[..budget].join(" ");
    let trimmed = truncated.trim_end_matches([',', ';', ':', '-']).len();
    truncated.truncate(trimmed);
    if !truncated.ends_with(['.', '!', '?']) {
        truncated.push('.');
    }
    truncated
}

/// Rewrites symbols that text-to-speech engines read poorly
pub fn optimize_for_speech(text: &str) -> String {
    let mut spoken = Vec::new();

    for word in text.replace('&', " and ").split_whitespace() {
        if let Some(amount) = word.strip_prefix('₹').filter(|a| starts_with_digit(a)) {
            spoken.push(format!("{} rupees", amount));
        } else if let Some(amount) = word.strip_prefix('$').filter(|a| starts_with_digit(a)) {
            spoken.push(format!("{} dollars", amount));
        } else if let Some(number) = word.strip_suffix('%').filter(|n| starts_with_digit(n)) {
            spoken.push(format!("{} percent", number));
        } else {
            spoken.push(word.to_string());
        }
    }

    spoken.join(" ")
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Fraction of alphabetic characters in the Kannada block (U+0C80..U+0CFF)
pub fn kannada_ratio(text: &str) -> f64 {
    let mut letters = 0usize;
    let mut kannada = 0usize;

    for c in text.chars() {
        if ('\u{0C80}'..='\u{0CFF}').contains(&c) {
            kannada += 1;
            letters += 1;
        } else if c.is_alphabetic() {
            letters += 1;
        }
    }

    if letters == 0 {
        0.0
    } else {
        kannada as f64 / letters as f64
    }
}

/// Checks a translation is non-empty and written in the target script
pub fn validate_translation(text: &str, language: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AdapterError::Validation("translation is empty".to_string()));
    }

    if language.eq_ignore_ascii_case("kannada") {
        let ratio = kannada_ratio(text);
        if ratio < MIN_SCRIPT_RATIO {
            return Err(AdapterError::Validation(format!(
                "translation is only {:.0}% Kannada script",
                ratio * 100.0
            )));
        }
    }

    Ok(())
}

/// Kannada renderings of names the speech engine mispronounces
const KANNADA_TERMS: [(&str, &str); 12] = [
    ("Andhra Pradesh", "ಆಂಧ್ರ ಪ್ರದೇಶ"),
    ("Tamil Nadu", "ತಮಿಳುನಾಡು"),
    ("Prime Minister", "ಪ್ರಧಾನಮಂತ್ರಿ"),
    ("Chief Minister", "ಮುಖ್ಯಮಂತ್ರಿ"),
    ("Karnataka", "ಕರ್ನಾಟಕ"),
    ("Bangalore", "ಬೆಂಗಳೂರು"),
    ("Bengaluru", "ಬೆಂಗಳೂರು"),
    ("Mysore", "ಮೈಸೂರು"),
    ("Kerala", "ಕೇರಳ"),
    ("India", "ಭಾರತ"),
    ("Government", "ಸರ್ಕಾರ"),
    ("Parliament", "ಸಂಸತ್ತು"),
];

/// Replaces English names left in a Kannada translation
pub fn localize_terms(text: &str) -> String {
    KANNADA_TERMS
        .iter()
        .fold(text.to_string(), |acc, (english, kannada)| {
            acc.replace(english, kannada)
        })
}

/// Spoken opener for a category's segment in Kannada
pub fn kannada_intro(category: Category) -> &'static str {
    match category {
        Category::International => "ಅಂತರರಾಷ್ಟ್ರೀಯ ಸುದ್ದಿಯಲ್ಲಿ,",
        Category::National => "ರಾಷ್ಟ್ರೀಯ ಸುದ್ದಿಯಲ್ಲಿ,",
        Category::Karnataka => "ಕರ್ನಾಟಕದಲ್ಲಿ,",
        Category::TamilNadu => "ತಮಿಳುನಾಡಿನಲ್ಲಿ,",
        Category::Andhra => "ಆಂಧ್ರ ಪ್ರದೇಶದಲ್ಲಿ,",
        Category::Kerala => "ಕೇರಳದಲ್ಲಿ,",
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI chat completions client
pub struct OpenAiClient {
    client: Client,
    policy: RetryPolicy,
    config: LlmConfig,
}

impl OpenAiClient {
    const SYSTEM_PROMPT: &'static str = "You write short, neutral news scripts for narration in \
        vertical news videos. Use simple sentences, put the most important facts first, \
        avoid abbreviations and answer with the script text only.";

    pub fn new(client: Client, policy: RetryPolicy, config: LlmConfig) -> Self {
        Self {
            client,
            policy,
            config,
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or(AdapterError::MissingCredential { adapter: ADAPTER })
    }

    async fn complete(&self, user_content: &str) -> Result<String> {
        let api_key = self.api_key()?;

        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": 0.3,
            "messages": [
                { "role": "system", "content": Self::SYSTEM_PROMPT },
                { "role": "user", "content": user_content }
            ]
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::request(ADAPTER, e, self.policy.timeout))?;
        let response = check_response(ADAPTER, response).await?;

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::parse(ADAPTER, e))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().trim_matches('"').trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AdapterError::parse(ADAPTER, "completion has no content"))
    }

    fn summary_prompt(article: &Article, target_words: usize) -> String {
        format!(
            "Summarize this {} story as a narration script of about {} words \
             ({:.0} seconds at 150 words per minute).\n\n{}",
            article.category.display_name().to_lowercase(),
            target_words,
            target_words as f64 / WORDS_PER_SECOND,
            article.content()
        )
    }

    fn translation_prompt(&self, text: &str, category: Category) -> String {
        format!(
            "Translate this news script into natural, fluent {language} suitable for a \
             news broadcast. Keep a professional tone and use standard {language} terms \
             for political and administrative words. Category: {category}.\n\n\
             \"{text}\"\n\nProvide only the {language} translation.",
            language = self.config.target_language,
            category = category.display_name(),
            text = text
        )
    }

    fn is_kannada(&self) -> bool {
        self.config.target_language.eq_ignore_ascii_case("kannada")
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn summarize(&self, article: &Article, target_words: usize) -> Result<String> {
        let prompt = Self::summary_prompt(article, target_words);
        let summary = self.policy.run(ADAPTER, || self.complete(&prompt)).await?;

        debug!(
            category = %article.category,
            words = summary.split_whitespace().count(),
            "Summary generated"
        );
        Ok(optimize_for_speech(&summary))
    }

    /// Falls back to a plain prompt once when the first translation is not
    /// in the target script
    async fn translate(&self, text: &str, category: Category) -> Result<String> {
        let prompt = self.translation_prompt(text, category);
        let mut translation = self.policy.run(ADAPTER, || self.complete(&prompt)).await?;

        if self.is_kannada() {
            translation = localize_terms(&translation);
        }

        if let Err(e) = validate_translation(&translation, &self.config.target_language) {
            warn!(%category, "Translation rejected ({}), retrying with a plain prompt", e);

            let fallback = format!("Translate to {}: {}", self.config.target_language, text);
            translation = self.policy.run(ADAPTER, || self.complete(&fallback)).await?;

            if self.is_kannada() {
                translation = localize_terms(&translation);
            }
        }

        Ok(translation.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    async fn probe(&self) -> ComponentHealth {
        let Ok(api_key) = self.api_key() else {
            return ComponentHealth::unreachable(ADAPTER, "credential not configured");
        };

        let probe = RetryPolicy::probe(self.policy.timeout);
        let result = probe
            .run(ADAPTER, || async move {
                let response = self
                    .client
                    .get(format!("{}/models", self.config.base_url))
                    .bearer_auth(api_key)
                    .send()
                    .await
                    .map_err(|e| AdapterError::request(ADAPTER, e, probe.timeout))?;
                check_response(ADAPTER, response).await
            })
            .await;

        match result {
            Ok(_) => ComponentHealth::healthy(ADAPTER),
            Err(e) => ComponentHealth::unreachable(ADAPTER, e.to_string()),
        }
    }
}
