use crate::settings::LlmSettings;

/// A formatted prompt waiting to be attached to the message it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPrompt {
    pub prompt: String,
    pub settings: Option<LlmSettings>,
}

/// Hands prompts over from model-call start to the message that reports
/// the result.
///
/// Prompts are stacked so a nested model call's prompt is consumed before
/// the outer one. The "last" slot holds the prompt that the next emitted
/// message will carry; reading it clears it.
#[derive(Debug, Clone, Default)]
pub struct PromptRegister {
    stack: Vec<PendingPrompt>,
    last: Option<PendingPrompt>,
}

impl PromptRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, prompt: impl Into<String>, settings: Option<LlmSettings>) {
        self.stack.push(PendingPrompt {
            prompt: prompt.into(),
            settings,
        });
    }

    /// Move the top of the stack into the last slot. Leaves the slot alone
    /// when nothing is stacked.
    pub fn pop_to_last(&mut self) {
        if let Some(top) = self.stack.pop() {
            self.last = Some(top);
        }
    }

    pub fn consume_last(&mut self) -> Option<PendingPrompt> {
        self.last.take()
    }

    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    pub fn has_last(&self) -> bool {
        self.last.is_some()
    }
}
