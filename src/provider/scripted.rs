//! Scripted provider for tests.
//!
//! Replays a fixed list of answers in call order and records every input.

use super::AnalysisProvider;
use crate::error::ProviderError;
use crate::models::ProviderName;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct ScriptedProvider {
    name: ProviderName,
    answers: Mutex<VecDeque<Result<String, ProviderError>>>,
    inputs: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(answers: Vec<Result<String, ProviderError>>) -> Self {
        Self::named(ProviderName::OpenAi, answers)
    }

    pub fn named(name: ProviderName, answers: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            name,
            answers: Mutex::new(answers.into()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Every input received so far.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }
}

#[async_trait]
impl AnalysisProvider for ScriptedProvider {
    async fn analyze(&self, input: &str) -> Result<String, ProviderError> {
        self.inputs.lock().unwrap().push(input.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::new("script", "No scripted answer left")))
    }

    fn name(&self) -> ProviderName {
        self.name
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
