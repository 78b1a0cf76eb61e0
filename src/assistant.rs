//! 聊天助手：生成失败时回退到按主题选择的固定回复。
//!
//! # Assistant
//!
//! [`Assistant`] sits between a chat widget and the [`GenerationService`]. It
//! always produces something to show: a generated answer when the service
//! succeeds, otherwise a canned reply picked from keywords in the prompt.

use crate::error::GenerationError;
use crate::service::{GenerationService, TextGenerationOptions};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

const PLANS_REPLY: &str = "I'd be happy to help you with information about our internet plans! We offer various packages to suit different needs. Could you tell me what you're looking for in terms of speed, data limits, or budget?";
const SPEED_REPLY: &str = "I can help you with speed-related questions! Our internet speeds vary depending on the plan you choose. Are you experiencing slow speeds, or would you like to know more about our available speed tiers?";
const INSTALL_REPLY: &str = "I can help with installation and connection questions! Our professional technicians can assist with setup, or we can guide you through self-installation. What specific installation questions do you have?";
const BILLING_REPLY: &str = "I can help with billing and payment inquiries! We offer various payment methods and can provide information about your current charges. What specific billing questions do you have?";
const GREETING_REPLY: &str = "Hello! I'm your AI assistant. I'm here to help you with information about our internet plans, speed tests, and any questions you might have. How can I assist you today?";

/// Topic keywords, checked in order; the first topic with a hit wins.
const TOPICS: &[(&[&str], &str)] = &[
    (&["plan", "price", "package"], PLANS_REPLY),
    (&["speed", "fast", "slow"], SPEED_REPLY),
    (&["install", "setup", "connection"], INSTALL_REPLY),
    (&["bill", "payment", "cost"], BILLING_REPLY),
];

/// Canned reply for `prompt`, chosen by case-insensitive substring match.
pub fn fallback_reply(prompt: &str) -> &'static str {
    let lower = prompt.to_lowercase();
    TOPICS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, reply)| *reply)
        .unwrap_or(GREETING_REPLY)
}

/// Where an [`AssistantReply`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOrigin {
    Fresh,
    Cached,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantReply {
    pub text: String,
    pub origin: ReplyOrigin,
    /// The failure that caused a fallback reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GenerationError>,
}

impl AssistantReply {
    pub fn is_fallback(&self) -> bool {
        self.origin == ReplyOrigin::Fallback
    }
}

pub struct Assistant {
    service: Arc<GenerationService>,
    options: TextGenerationOptions,
}

impl Assistant {
    pub fn new(service: Arc<GenerationService>) -> Self {
        Self {
            service,
            options: TextGenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TextGenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn service(&self) -> &GenerationService {
        &self.service
    }

    pub async fn reply(&self, prompt: &str) -> AssistantReply {
        match self.service.generate_text(prompt, &self.options).await.into_result() {
            Ok((text, cached)) => AssistantReply {
                text: text.trim().to_string(),
                origin: if cached {
                    ReplyOrigin::Cached
                } else {
                    ReplyOrigin::Fresh
                },
                error: None,
            },
            Err(err) => {
                debug!(kind = err.kind.as_str(), "using fallback reply");
                AssistantReply {
                    text: fallback_reply(prompt).to_string(),
                    origin: ReplyOrigin::Fallback,
                    error: Some(err),
                }
            }
        }
    }
}
