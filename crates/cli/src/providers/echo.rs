// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `echo`, the reference inference provider: no model call, just a
//! deterministic reply built from the last user message. Stands in for a
//! real model SDK before a concrete one is wired.

use async_trait::async_trait;

use cohort_engine::inference::{
    InferenceClient, InferenceContext, InferenceError, InferenceProvider, ProviderConfig,
};
use cohort_engine::message::{ContentBlock, Message, Role};

pub struct EchoProvider;

struct EchoClient {
    model_id: String,
}

#[async_trait]
impl InferenceClient for EchoClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, context: &InferenceContext<'_>) -> Result<Message, InferenceError> {
        let last_user_text = context
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text())
            .unwrap_or_default();
        let text = if last_user_text.is_empty() {
            "...".to_owned()
        } else {
            format!("echo: {last_user_text}")
        };
        Ok(Message::assistant(vec![ContentBlock::Text { text }]))
    }
}

#[async_trait]
impl InferenceProvider for EchoProvider {
    fn id(&self) -> &str {
        "echo"
    }

    async fn create_client(&self, config: &ProviderConfig) -> Result<Box<dyn InferenceClient>, InferenceError> {
        Ok(Box::new(EchoClient { model_id: config.model.clone() }))
    }
}

#[cfg(test)]
#[path = "echo_tests.rs"]
mod tests;
