//! Typed settings read from the environment.
//!
//! Call `config::load_and_apply("coach", None)` first so `.env` and XDG values are in the
//! environment. Unset keys take their defaults; set but unparsable keys are
//! [`ConfigError::InvalidValue`].

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::llm::{
    ModelGateway, OpenAiGateway, TextSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL,
};
use crate::notify::{LogNotifier, Notifier, OperatorAlert, ResendNotifier, DEFAULT_EMAIL_API_BASE};
use crate::retry::RetryOrchestrator;
use crate::validate::DEFAULT_PAYMENT_LINK;

pub const DEFAULT_ALERT_TO: &str = "operator@example.com";
pub const DEFAULT_ALERT_FROM: &str = "coach@example.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({message})")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

fn invalid(key: &str, value: &str, message: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoachConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub embedding_model: String,
    pub splitter: TextSplitter,
    pub payment_link: String,
    pub resend_api_key: Option<String>,
    pub alert_to: String,
    pub alert_from: String,
    pub email_api_base: String,
    pub prompts_dir: Option<PathBuf>,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            splitter: TextSplitter::default(),
            payment_link: DEFAULT_PAYMENT_LINK.to_string(),
            resend_api_key: None,
            alert_to: DEFAULT_ALERT_TO.to_string(),
            alert_from: DEFAULT_ALERT_FROM.to_string(),
            email_api_base: DEFAULT_EMAIL_API_BASE.to_string(),
            prompts_dir: None,
        }
    }
}

impl CoachConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let d = Self::default();

        let temperature = match get("COACH_TEMPERATURE") {
            Some(v) => {
                let t: f32 = v.trim().parse().map_err(|e| invalid("COACH_TEMPERATURE", &v, e))?;
                if !(0.0..=2.0).contains(&t) {
                    return Err(invalid("COACH_TEMPERATURE", &v, "must be between 0 and 2"));
                }
                Some(t)
            }
            None => None,
        };

        let parse_usize = |key: &str, default: usize| -> Result<usize, ConfigError> {
            match get(key) {
                Some(v) => v.trim().parse().map_err(|e| invalid(key, &v, e)),
                None => Ok(default),
            }
        };
        let size = parse_usize("COACH_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let overlap = parse_usize("COACH_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        let splitter = TextSplitter::new(size, overlap)
            .map_err(|e| invalid("COACH_CHUNK_OVERLAP", &overlap.to_string(), e))?;

        Ok(Self {
            model: get("COACH_MODEL").unwrap_or(d.model),
            temperature,
            embedding_model: get("COACH_EMBEDDING_MODEL").unwrap_or(d.embedding_model),
            splitter,
            payment_link: get("COACH_PAYMENT_LINK").unwrap_or(d.payment_link),
            resend_api_key: get("RESEND_API_KEY"),
            alert_to: get("COACH_ALERT_TO").unwrap_or(d.alert_to),
            alert_from: get("COACH_ALERT_FROM").unwrap_or(d.alert_from),
            email_api_base: get("EMAIL_API_BASE").unwrap_or(d.email_api_base),
            prompts_dir: get("PROMPTS_DIR").map(PathBuf::from),
        })
    }

    /// OpenAI gateway with the configured models, temperature and splitter.
    pub fn gateway(&self) -> OpenAiGateway {
        let gateway = OpenAiGateway::new(&self.model)
            .with_embedding_model(&self.embedding_model)
            .with_splitter(self.splitter.clone());
        match self.temperature {
            Some(t) => gateway.with_temperature(t),
            None => gateway,
        }
    }

    /// Email notifier when an API key is set, else a logging notifier.
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        match &self.resend_api_key {
            Some(key) => Arc::new(ResendNotifier::with_base_url(key, &self.email_api_base)),
            None => {
                tracing::warn!("RESEND_API_KEY not set; operator alerts will only be logged");
                Arc::new(LogNotifier)
            }
        }
    }

    pub fn alert(&self, component: &str) -> OperatorAlert {
        OperatorAlert::new(&self.alert_to, &self.alert_from, component)
    }

    /// Orchestrator for `component` with this config's notifier and alert settings.
    pub fn orchestrator(
        &self,
        gateway: Arc<dyn ModelGateway>,
        component: &str,
    ) -> RetryOrchestrator {
        RetryOrchestrator::new(gateway, self.notifier(), self.alert(component))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<CoachConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CoachConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg, CoachConfig::default());
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.splitter.chunk_size(), 256);
        assert_eq!(cfg.splitter.chunk_overlap(), 50);
        assert_eq!(cfg.payment_link, "https://pay.example/2");
        assert!(cfg.resend_api_key.is_none());
    }

    #[test]
    fn values_override_defaults() {
        let cfg = from_pairs(&[
            ("COACH_MODEL", "gpt-4o"),
            ("COACH_TEMPERATURE", "0.2"),
            ("COACH_CHUNK_SIZE", "512"),
            ("COACH_CHUNK_OVERLAP", "64"),
            ("COACH_PAYMENT_LINK", "https://pay.example/9"),
            ("RESEND_API_KEY", "re_1"),
            ("COACH_ALERT_TO", "ops@example.com"),
            ("PROMPTS_DIR", "/tmp/prompts"),
        ])
        .unwrap();
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.temperature, Some(0.2));
        assert_eq!(cfg.splitter, TextSplitter::new(512, 64).unwrap());
        assert_eq!(cfg.payment_link, "https://pay.example/9");
        assert_eq!(cfg.resend_api_key.as_deref(), Some("re_1"));
        assert_eq!(cfg.alert("email").to, "ops@example.com");
        assert_eq!(cfg.prompts_dir, Some(PathBuf::from("/tmp/prompts")));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = from_pairs(&[("COACH_MODEL", "  "), ("RESEND_API_KEY", "")]).unwrap();
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert!(cfg.resend_api_key.is_none());
    }

    #[test]
    fn unparsable_numbers_are_invalid_values() {
        let err = from_pairs(&[("COACH_CHUNK_SIZE", "big")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "COACH_CHUNK_SIZE"));

        let err = from_pairs(&[("COACH_TEMPERATURE", "hot")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "COACH_TEMPERATURE"));

        let err = from_pairs(&[("COACH_TEMPERATURE", "3.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "COACH_TEMPERATURE"));
    }

    #[test]
    fn overlap_not_below_size_is_invalid() {
        let err = from_pairs(&[("COACH_CHUNK_SIZE", "50"), ("COACH_CHUNK_OVERLAP", "50")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "COACH_CHUNK_OVERLAP"));
    }

    #[test]
    fn alert_uses_component_in_subject() {
        let cfg = CoachConfig::default();
        let alert = cfg.alert("plan");
        assert_eq!(alert.from, DEFAULT_ALERT_FROM);
        assert_eq!(alert.subject(), "[coach] plan failed");
    }
}
