use std::env;

const DEFAULT_MODEL_PROVIDER: &str = "openai";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:3b";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful financial advisor that helps users calculate compound interest. \
Ask users for their investment details one by one and then use the calculate_investment \
tool to show them the results. Be friendly and explain the results in simple terms.";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_TERM_YEARS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    OpenAi,
    Ollama,
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
            Self::Ollama => DEFAULT_OLLAMA_MODEL,
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_OPENAI_BASE_URL,
            Self::Ollama => DEFAULT_OLLAMA_BASE_URL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Raw provider name; unknown names are rejected when a chat request is made.
    pub model_provider: String,
    pub model: String,
    pub model_base_url: String,
    pub api_key: Option<String>,
    pub system_prompt: String,
    pub model_timeout_secs: u64,
    pub max_term_years: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    fn from_env_with(mut get_var: impl FnMut(&str) -> Option<String>) -> Self {
        let model_provider = get_var("MODEL_PROVIDER")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_PROVIDER.to_string());
        let known = parse_model_provider(&model_provider);
        let model = non_empty(get_var("MODEL"))
            .unwrap_or_else(|| known.unwrap_or(ModelProvider::OpenAi).default_model().to_string());
        let model_base_url = non_empty(get_var("MODEL_BASE_URL")).unwrap_or_else(|| {
            known
                .unwrap_or(ModelProvider::OpenAi)
                .default_base_url()
                .to_string()
        });

        Self {
            model_provider,
            model,
            model_base_url,
            api_key: non_empty(get_var("OPENAI_API_KEY")),
            system_prompt: get_var("SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            model_timeout_secs: parse_model_timeout_secs(
                get_var("MODEL_TIMEOUT_SECS").as_deref(),
            ),
            max_term_years: parse_max_term_years(get_var("CALC_MAX_TERM_YEARS").as_deref()),
        }
    }

    pub fn provider(&self) -> Option<ModelProvider> {
        parse_model_provider(&self.model_provider)
    }
}

pub fn parse_model_provider(raw: &str) -> Option<ModelProvider> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "openai" => Some(ModelProvider::OpenAi),
        "ollama" => Some(ModelProvider::Ollama),
        _ => None,
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_model_timeout_secs(raw: Option<&str>) -> u64 {
    parse_positive_u64(raw, DEFAULT_MODEL_TIMEOUT_SECS)
}

fn parse_max_term_years(raw: Option<&str>) -> u64 {
    parse_positive_u64(raw, DEFAULT_MAX_TERM_YEARS)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        model_provider: "ollama".to_string(),
        model: DEFAULT_OLLAMA_MODEL.to_string(),
        model_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
        api_key: None,
        system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        model_timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
        max_term_years: DEFAULT_MAX_TERM_YEARS,
    }
}
