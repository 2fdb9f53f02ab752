use std::sync::LazyLock;
use std::time::Duration;

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionNamedToolChoice, ChatCompletionRequestMessage, ChatCompletionTool,
        ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequestArgs,
        FunctionName, FunctionObject,
    },
};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;

use crate::error::{Error, Result};

pub static AI_MODEL: LazyLock<String> = LazyLock::new(|| {
    let _ = dotenvy::dotenv();
    dotenvy::var("AI_MODEL").unwrap()
});

static AI_CLIENT: LazyLock<Client<OpenAIConfig>> = LazyLock::new(|| {
    let _ = dotenvy::dotenv();
    let api_key = dotenvy::var("OPENAI_API_KEY").unwrap();
    let base_url = dotenvy::var("OPENAI_BASE_URL").unwrap();
    let config = OpenAIConfig::default()
        .with_api_base(base_url)
        .with_api_key(api_key);
    Client::with_config(config)
});

const GENERATION_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Summarize a transcript in roughly 100 words.
pub async fn summarize(transcript: &str) -> Result<String> {
    with_retry("summary", || async {
        let prompt = format!("Summarize the following transcript in 100 words:\n{transcript}");
        let request = CreateChatCompletionRequestArgs::default()
            .model(AI_MODEL.as_str())
            .messages(vec![ChatCompletionRequestMessage::User(prompt.into())])
            .build()
            .map_err(|e| Error::Unavailable(format!("bad generation request: {e}")))?;
        let response = AI_CLIENT
            .chat()
            .create(request)
            .await
            .map_err(|e| Error::Unavailable(format!("generation call failed: {e}")))?;
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| Error::Unavailable("no response from the model".to_string()))
    })
    .await
}

/// One generated question with its answer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct QuizEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct Quiz(Vec<QuizEntry>);

/// Generate three questions and answers from a transcript, extracted as
/// structured output through a forced tool call.
pub async fn generate_quiz(transcript: &str) -> Result<Vec<QuizEntry>> {
    with_retry("quiz", || async {
        let tool = extract_tool::<Quiz>(None);
        let tool_choice = ChatCompletionToolChoiceOption::Named(ChatCompletionNamedToolChoice {
            r#type: ChatCompletionToolType::Function,
            function: FunctionName {
                name: tool.function.name.clone(),
            },
        });
        let prompt = format!(
            "Generate 3 questions and answers based on the following transcript:\n{transcript}"
        );
        let request = CreateChatCompletionRequestArgs::default()
            .model(AI_MODEL.as_str())
            .messages(vec![ChatCompletionRequestMessage::User(prompt.into())])
            .tools(vec![tool])
            .tool_choice(tool_choice)
            .build()
            .map_err(|e| Error::Unavailable(format!("bad generation request: {e}")))?;
        let arguments = AI_CLIENT
            .chat()
            .create(request)
            .await
            .map_err(|e| Error::Unavailable(format!("generation call failed: {e}")))?
            .choices
            .first()
            .ok_or_else(|| Error::Unavailable("no response from the model".to_string()))?
            .message
            .tool_calls
            .as_ref()
            .and_then(|tool_calls| tool_calls.first())
            .ok_or_else(|| Error::Unavailable("no tool call in response".to_string()))?
            .function
            .arguments
            .clone();
        let quiz: Quiz = serde_json::from_str(&arguments)
            .map_err(|e| Error::Unavailable(format!("malformed quiz response: {e}")))?;
        Ok(quiz.0)
    })
    .await
}

fn extract_tool<T: JsonSchema>(strict: Option<bool>) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: T::schema_name(),
            description: None,
            parameters: Some(json!(schema_for!(T))),
            strict,
        },
    }
}

/// Run a generation call up to `GENERATION_ATTEMPTS` times, sleeping with a
/// doubling delay between attempts, before surfacing the last failure.
async fn with_retry<T, F, Fut>(what: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = RETRY_BASE_DELAY;
    let mut last = None;
    for attempt in 1..=GENERATION_ATTEMPTS {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{what} generation attempt {attempt} failed: {e}");
                last = Some(e);
                if attempt < GENERATION_ATTEMPTS {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
    Err(last.unwrap_or_else(|| Error::Unavailable(format!("{what} generation failed"))))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::Unavailable("flaky".to_string()))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_gives_up_after_bounded_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Unavailable("down".to_string()))
        })
        .await;
        assert!(matches!(result, Err(Error::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), GENERATION_ATTEMPTS);
    }

    #[test]
    fn quiz_tool_carries_the_schema() {
        let tool = extract_tool::<Quiz>(None);
        assert_eq!(tool.function.name, "Quiz");
        assert!(tool.function.parameters.is_some());
    }
}
