//! Optional free-text generation used to enrich course material.
//!
//! Nothing in the pipeline depends on a generator being present: every caller has a
//! deterministic fallback and a failed generation is logged and dropped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TextGenerationError {
    #[display("text generator is unavailable: {reason}")]
    Unavailable {
        #[error(not(source))]
        reason: String,
    },
    #[display("text generator returned an unusable reply: {reply:?}")]
    InvalidReply {
        #[error(not(source))]
        reply: String,
    },
}

/// Text generation capability.
pub trait TextGenerator {
    fn generate(
        &mut self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, TextGenerationError>;
}

impl<T> TextGenerator for &mut T
where
    T: TextGenerator + ?Sized,
{
    fn generate(
        &mut self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, TextGenerationError> {
        (**self).generate(messages, temperature)
    }
}

impl<T> TextGenerator for Box<T>
where
    T: TextGenerator + ?Sized,
{
    fn generate(
        &mut self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, TextGenerationError> {
        (**self).generate(messages, temperature)
    }
}

/// Runs `generator` if there is one, turning failures and blank replies into `None`.
pub(crate) fn try_generate(
    generator: Option<&mut dyn TextGenerator>,
    messages: &[ChatMessage],
    temperature: f32,
) -> Option<String> {
    let generator = generator?;
    match generator.generate(messages, temperature) {
        Ok(reply) if !reply.trim().is_empty() => Some(reply.trim().to_owned()),
        Ok(_) => {
            tracing::warn!("text generator returned an empty reply");
            None
        }
        Err(err) => {
            tracing::warn!(%err, "text generation failed, using fallback");
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{test_util::*, *};

    #[test]
    fn test_try_generate_absorbs_failures() {
        let messages = [ChatMessage::user("hi")];
        assert_eq!(try_generate(None, &messages, 0.3), None);
        assert_eq!(try_generate(Some(&mut OfflineGenerator), &messages, 0.3), None);

        let mut blank = CannedGenerator {
            reply: "   ".to_owned(),
            ..CannedGenerator::default()
        };
        assert_eq!(try_generate(Some(&mut blank), &messages, 0.3), None);

        let mut canned = CannedGenerator {
            reply: " notes \n".to_owned(),
            ..CannedGenerator::default()
        };
        assert_eq!(
            try_generate(Some(&mut canned), &messages, 0.3).as_deref(),
            Some("notes")
        );
        assert_eq!(canned.requests.len(), 1);
    }
}
