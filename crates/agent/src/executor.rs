//! Tool-calling executor loop
//!
//! Call the model with the available tools, run whatever tools it asks
//! for, feed the results back, and repeat until it answers in plain text.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use loan_advisor_core::{GenerateRequest, LanguageModel, Message, ToolDefinition};
use loan_advisor_tools::ToolExecutor;

use crate::AgentError;

/// Returned when the model keeps calling tools past the cap
pub const ITERATION_LIMIT_MESSAGE: &str = "Agent stopped due to iteration limit.";

/// Record of one tool execution
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub result: Value,
    pub success: bool,
}

impl ToolInvocation {
    /// `success` field of a JSON result, if the tool reported one
    pub fn reported_success(&self) -> Option<bool> {
        self.result.get("success").and_then(Value::as_bool)
    }
}

/// Result of an executor run
#[derive(Debug, Clone)]
pub struct ExecutorOutcome {
    pub output: String,
    pub invocations: Vec<ToolInvocation>,
    pub iterations: u32,
}

/// Drives a model through tool calls
#[derive(Clone)]
pub struct AgentExecutor {
    llm: Arc<dyn LanguageModel>,
    max_iterations: u32,
}

impl AgentExecutor {
    pub fn new(llm: Arc<dyn LanguageModel>, max_iterations: u32) -> Self {
        Self {
            llm,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Run until the model stops calling tools or the cap is reached
    ///
    /// Tool failures are reported back to the model as `{"error": ...}`
    /// rather than aborting the run. Only model failures are returned as
    /// errors.
    pub async fn run(
        &self,
        system_prompt: &str,
        input: &str,
        tools: &dyn ToolExecutor,
    ) -> Result<ExecutorOutcome, AgentError> {
        let definitions: Vec<ToolDefinition> = tools
            .list_tools()
            .iter()
            .map(|schema| schema.to_definition())
            .collect();

        let mut request = GenerateRequest::new(system_prompt).with_user_message(input);
        let mut invocations = Vec::new();

        for iteration in 1..=self.max_iterations {
            let response = self
                .llm
                .generate_with_tools(request.clone(), &definitions)
                .await?;

            if !response.has_tool_calls() {
                return Ok(ExecutorOutcome {
                    output: response.text,
                    invocations,
                    iterations: iteration,
                });
            }

            request
                .messages
                .push(Message::assistant_tool_calls(response.text.clone(), response.tool_calls.clone()));

            for call in &response.tool_calls {
                let arguments = call.arguments_json();
                tracing::debug!(tool = %call.name, iteration, "Model requested tool");

                let (result, success) = match tools.execute(&call.name, arguments.clone()).await {
                    Ok(output) => (output.to_json(), !output.is_error),
                    Err(e) => {
                        tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                        (json!({ "error": e.to_string() }), false)
                    }
                };

                request
                    .messages
                    .push(Message::tool(render_result(&result), call.id.clone()));

                invocations.push(ToolInvocation {
                    name: call.name.clone(),
                    arguments,
                    result,
                    success,
                });
            }
        }

        tracing::warn!(
            max_iterations = self.max_iterations,
            tools_called = invocations.len(),
            "Executor hit iteration limit"
        );

        Ok(ExecutorOutcome {
            output: ITERATION_LIMIT_MESSAGE.to_string(),
            invocations,
            iterations: self.max_iterations,
        })
    }
}

/// Tool message content; plain strings are sent unquoted
fn render_result(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use loan_advisor_core::{
        GenerateResponse, InMemoryCustomerDirectory, Result as CoreResult, Role, ToolCall,
    };
    use loan_advisor_tools::create_loan_registry;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays canned responses and records every request
    struct ScriptedLlm {
        responses: Mutex<VecDeque<GenerateResponse>>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<GenerateResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        async fn generate(&self, request: GenerateRequest) -> CoreResult<GenerateResponse> {
            self.generate_with_tools(request, &[]).await
        }

        async fn generate_with_tools(
            &self,
            request: GenerateRequest,
            _tools: &[ToolDefinition],
        ) -> CoreResult<GenerateResponse> {
            self.requests.lock().push(request);
            self.responses
                .lock()
                .pop_front()
                .ok_or_else(|| loan_advisor_core::Error::Llm("script exhausted".into()))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn call(id: &str, name: &str, args: Value) -> GenerateResponse {
        GenerateResponse::tool_calls(vec![ToolCall::new(id, name, args)])
    }

    fn registry() -> loan_advisor_tools::ToolRegistry {
        create_loan_registry(Arc::new(InMemoryCustomerDirectory::with_samples()))
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let llm = ScriptedLlm::new(vec![GenerateResponse::text("Hello there")]);
        let executor = AgentExecutor::new(llm.clone(), 5);

        let outcome = executor.run("sys", "hi", &registry()).await.unwrap();
        assert_eq!(outcome.output, "Hello there");
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.invocations.is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let llm = ScriptedLlm::new(vec![
            call("c1", "get_emi_details", json!({"phone": "+1234567891"})),
            GenerateResponse::text("Your EMI of 425 is due on July 20."),
        ]);
        let executor = AgentExecutor::new(llm.clone(), 5);

        let outcome = executor.run("sys", "when is my emi", &registry()).await.unwrap();
        assert_eq!(outcome.output, "Your EMI of 425 is due on July 20.");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.invocations.len(), 1);
        assert!(outcome.invocations[0].success);
        assert_eq!(outcome.invocations[0].reported_success(), Some(true));

        let requests = llm.requests.lock();
        let second = &requests[1].messages;
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, Role::Assistant);
        assert_eq!(second[2].tool_calls[0].id, "c1");
        assert_eq!(second[3].role, Role::Tool);
        assert_eq!(second[3].tool_call_id.as_deref(), Some("c1"));
        assert!(second[3].content.contains("LN005678"));
    }

    #[tokio::test]
    async fn test_tool_error_fed_back() {
        let llm = ScriptedLlm::new(vec![
            call("c1", "create_payment_plan", json!({"phone": "+1234567891"})),
            GenerateResponse::text("What monthly amount works for you?"),
        ]);
        let executor = AgentExecutor::new(llm.clone(), 5);

        let outcome = executor.run("sys", "plan please", &registry()).await.unwrap();
        assert_eq!(outcome.output, "What monthly amount works for you?");
        assert!(!outcome.invocations[0].success);
        assert!(outcome.invocations[0].result["error"]
            .as_str()
            .unwrap()
            .contains("monthly_amount"));

        let requests = llm.requests.lock();
        assert!(requests[1].messages[3].content.contains("error"));
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let llm = ScriptedLlm::new(vec![
            call("c1", "get_emi_details", json!({"phone": "+1234567891"})),
            call("c2", "get_emi_details", json!({"phone": "+1234567891"})),
            GenerateResponse::text("never reached"),
        ]);
        let executor = AgentExecutor::new(llm, 2);

        let outcome = executor.run("sys", "loop", &registry()).await.unwrap();
        assert_eq!(outcome.output, ITERATION_LIMIT_MESSAGE);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.invocations.len(), 2);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let llm = ScriptedLlm::new(vec![]);
        let executor = AgentExecutor::new(llm, 3);
        let err = executor.run("sys", "hi", &registry()).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }
}
