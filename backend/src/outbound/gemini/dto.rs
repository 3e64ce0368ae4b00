//! DTOs for the Gemini `generateContent` endpoint.
//!
//! Requests carry one user turn with one text part. Responses are decoded
//! into these transport DTOs first, then reduced to the reply text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct GenerateContentRequestDto<'a> {
    pub(super) contents: [ContentDto<'a>; 1],
}

#[derive(Debug, Serialize)]
pub(super) struct ContentDto<'a> {
    pub(super) role: &'static str,
    pub(super) parts: [RequestPartDto<'a>; 1],
}

#[derive(Debug, Serialize)]
pub(super) struct RequestPartDto<'a> {
    pub(super) text: &'a str,
}

impl<'a> GenerateContentRequestDto<'a> {
    pub(super) fn user_text(text: &'a str) -> Self {
        Self {
            contents: [ContentDto {
                role: "user",
                parts: [RequestPartDto { text }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateContentResponseDto {
    #[serde(default)]
    pub(super) candidates: Vec<CandidateDto>,
    pub(super) prompt_feedback: Option<PromptFeedbackDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CandidateDto {
    pub(super) content: Option<CandidateContentDto>,
    pub(super) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CandidateContentDto {
    #[serde(default)]
    pub(super) parts: Vec<ResponsePartDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResponsePartDto {
    pub(super) text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PromptFeedbackDto {
    pub(super) block_reason: Option<String>,
}

impl GenerateContentResponseDto {
    /// Concatenate the text parts of the first candidate.
    pub(super) fn into_text(self) -> Result<String, String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .unwrap_or_else(|| "no reason given".to_owned());
            return Err(format!("response carried no candidates ({reason})"));
        };

        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "unknown finish reason".to_owned());
            return Err(format!("first candidate carried no text ({reason})"));
        }
        Ok(text)
    }
}
