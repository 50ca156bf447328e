//! Assistant payloads

use serde::{Deserialize, Serialize};

pub const MAX_QUESTION_CHARS: usize = 4000;

/// Instruction sent ahead of an uploaded PDF
pub const SUMMARY_PROMPT: &str = "Summarize the following study material clearly:";

/// Request for `POST /ai/ask`
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

impl AskRequest {
    /// Trimmed question, or a message describing why it is rejected
    pub fn validated_question(&self) -> Result<String, String> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err("question must not be empty".to_string());
        }
        if question.chars().count() > MAX_QUESTION_CHARS {
            return Err(format!(
                "question must be at most {} characters",
                MAX_QUESTION_CHARS
            ));
        }
        Ok(question.to_string())
    }
}

/// Response for `POST /ai/ask`
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
}

/// Response for `POST /pdf/summarize`
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(question: &str) -> AskRequest {
        AskRequest {
            question: question.to_string(),
        }
    }

    #[test]
    fn test_question_validation() {
        assert_eq!(
            ask("  What is osmosis? ").validated_question(),
            Ok("What is osmosis?".to_string())
        );
        assert!(ask("").validated_question().is_err());
        assert!(ask(" \n\t").validated_question().is_err());
        assert!(ask(&"q".repeat(MAX_QUESTION_CHARS)).validated_question().is_ok());
        assert!(ask(&"q".repeat(MAX_QUESTION_CHARS + 1)).validated_question().is_err());
    }
}
