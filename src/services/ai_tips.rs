//! Professional tips for nannys generated by an LLM through rig.
//!
//! Any failure (no key, request error, unparseable reply) yields the default tips.

use async_trait::async_trait;
use rig::providers::openai::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::AiConfig;
use crate::error::{Error, Result};

/// Number of tips served per request.
pub const TIP_COUNT: usize = 3;

const PREAMBLE: &str = "Eres un asistente experto en cuidado infantil y desarrollo profesional de niñeras. \
Respondes siempre en español y solo con JSON válido.";

const PROMPT: &str = r#"Proporciona 3 consejos profesionales, prácticos y útiles para niñeras que trabajan con familias y niños.
Enfócate en seguridad y bienestar, comunicación con los padres, desarrollo infantil, gestión del tiempo o primeros auxilios.

Formato de respuesta (JSON):
{
  "tips": [
    { "title": "Título corto", "description": "Descripción breve y práctica (máximo 100 palabras)", "icon": "emoji relevante" }
  ]
}

Responde SOLO con el JSON, sin texto adicional."#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    pub title: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipsResponse {
    pub tips: Vec<Tip>,
}

#[async_trait]
pub trait TipsGenerator: Send + Sync {
    /// Returns exactly [`TIP_COUNT`] tips.
    async fn nanny_tips(&self) -> TipsResponse;
}

pub fn default_tips() -> TipsResponse {
    TipsResponse {
        tips: vec![
            Tip {
                title: "Establece rutinas claras".to_string(),
                description: "Las rutinas diarias ayudan a los niños a sentirse seguros. Mantén horarios consistentes para comidas, siestas y actividades.".to_string(),
                icon: "⏰".to_string(),
            },
            Tip {
                title: "Comunicación con los padres".to_string(),
                description: "Mantén una comunicación abierta y regular con los padres. Informa sobre las actividades del día y cualquier situación importante.".to_string(),
                icon: "💬".to_string(),
            },
            Tip {
                title: "Actividades educativas".to_string(),
                description: "Incorpora juegos educativos que estimulen el desarrollo cognitivo y motor de los niños según su edad.".to_string(),
                icon: "🎨".to_string(),
            },
        ],
    }
}

/// Removes markdown code fences (```json ... ```) around a reply.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = match trimmed.strip_prefix("```") {
        Some(rest) => rest.strip_prefix("json").unwrap_or(rest),
        None => trimmed,
    };
    let without_close = without_open.trim_end().strip_suffix("```").unwrap_or(without_open);
    without_close.trim()
}

/// Parses a model reply into exactly [`TIP_COUNT`] tips.
pub fn parse_tips(reply: &str) -> Result<TipsResponse> {
    let mut parsed: TipsResponse = serde_json::from_str(strip_code_fences(reply))
        .map_err(|e| Error::ExternalService(format!("Unparseable tips reply: {}", e)))?;

    parsed
        .tips
        .retain(|tip| !tip.title.trim().is_empty() && !tip.description.trim().is_empty());
    if parsed.tips.len() < TIP_COUNT {
        return Err(Error::ExternalService(format!(
            "Expected {} tips, got {}",
            TIP_COUNT,
            parsed.tips.len()
        )));
    }
    parsed.tips.truncate(TIP_COUNT);

    Ok(parsed)
}

/// Tips generated through an OpenAI-compatible endpoint.
pub struct RigTipsGenerator {
    client: Client,
    model: String,
}

impl fmt::Debug for RigTipsGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigTipsGenerator")
            .field("model", &self.model)
            .field("client", &"<OpenAI Client>")
            .finish()
    }
}

impl RigTipsGenerator {
    pub fn new(api_key: &SecretString, base_url: Option<&str>, model: &str) -> Result<Self> {
        let client = if let Some(url) = base_url {
            tracing::info!(base_url = %url, "Creating OpenAI client with custom base URL");
            Client::builder()
                .api_key(api_key.expose_secret())
                .base_url(url)
                .build()
                .map_err(|e| Error::Internal(format!("Failed to create OpenAI client: {}", e)))?
        } else {
            Client::new(api_key.expose_secret())
                .map_err(|e| Error::Internal(format!("Failed to create OpenAI client: {}", e)))?
        };

        Ok(Self {
            client,
            model: model.to_string(),
        })
    }

    async fn generate(&self) -> Result<TipsResponse> {
        use rig::client::CompletionClient;
        use rig::completion::Prompt;

        let agent = self.client.agent(&self.model).preamble(PREAMBLE).build();
        let reply = agent
            .prompt(PROMPT)
            .await
            .map_err(|e| Error::ExternalService(format!("Tips request failed: {}", e)))?;

        parse_tips(&reply)
    }
}

#[async_trait]
impl TipsGenerator for RigTipsGenerator {
    async fn nanny_tips(&self) -> TipsResponse {
        match self.generate().await {
            Ok(tips) => tips,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to default nanny tips");
                default_tips()
            }
        }
    }
}

/// Used when no API key is configured.
#[derive(Debug, Default)]
pub struct StaticTips;

#[async_trait]
impl TipsGenerator for StaticTips {
    async fn nanny_tips(&self) -> TipsResponse {
        default_tips()
    }
}

pub fn build_generator(config: &AiConfig) -> Arc<dyn TipsGenerator> {
    if config.openai_api_key.expose_secret().is_empty() {
        return Arc::new(StaticTips);
    }

    match RigTipsGenerator::new(&config.openai_api_key, config.base_url.as_deref(), &config.model) {
        Ok(generator) => Arc::new(generator),
        Err(e) => {
            tracing::warn!(error = %e, "AI tips disabled");
            Arc::new(StaticTips)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{"tips": [
        {"title": "Uno", "description": "Primero", "icon": "1"},
        {"title": "Dos", "description": "Segundo", "icon": "2"},
        {"title": "Tres", "description": "Tercero", "icon": "3"}
    ]}"#;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_tips_from_fenced_reply() {
        let fenced = format!("```json\n{}\n```", REPLY);
        let tips = parse_tips(&fenced).unwrap();
        assert_eq!(tips.tips.len(), TIP_COUNT);
        assert_eq!(tips.tips[0].title, "Uno");
    }

    #[test]
    fn test_parse_tips_truncates_extra_tips() {
        let reply = r#"{"tips": [
            {"title": "a", "description": "a", "icon": ""},
            {"title": "b", "description": "b", "icon": ""},
            {"title": "c", "description": "c", "icon": ""},
            {"title": "d", "description": "d", "icon": ""}
        ]}"#;
        assert_eq!(parse_tips(reply).unwrap().tips.len(), TIP_COUNT);
    }

    #[test]
    fn test_parse_tips_rejects_garbage_and_short_lists() {
        assert!(parse_tips("Aquí tienes tres consejos...").is_err());
        assert!(parse_tips(r#"{"tips": [{"title": "a", "description": "b", "icon": "c"}]}"#).is_err());
    }

    #[test]
    fn test_default_tips_has_three_entries() {
        assert_eq!(default_tips().tips.len(), TIP_COUNT);
    }

    #[tokio::test]
    async fn test_missing_key_serves_default_tips() {
        let generator = build_generator(&AiConfig::default());
        assert_eq!(generator.nanny_tips().await, default_tips());
    }
}
