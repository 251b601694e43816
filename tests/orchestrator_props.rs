//! Property tests for tool-call handling in the chat orchestrator

use airchat::agent::{ChatOrchestrator, Credentials, GatewayFactory, StaticGateways};
use airchat::llm::{LlmProvider, MessageContent, Role, ScriptedProvider, ToolCall};
use airchat::tools::{ScriptedToolProvider, ToolError, ToolProvider};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// Which of the requested calls hit a failing tool
fn arb_outcomes() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..6)
}

fn arb_final_reply() -> impl Strategy<Value = String> {
    prop::option::of("[a-zA-Z ]{1,40}").prop_map(|opt| opt.unwrap_or_default())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every requested call is invoked once, in order, and answered with
    /// exactly one tool message carrying its id.
    #[test]
    fn prop_every_call_answered_in_order(
        outcomes in arb_outcomes(),
        final_reply in arb_final_reply(),
    ) {
        let calls: Vec<ToolCall> = outcomes
            .iter()
            .enumerate()
            .map(|(i, fails)| {
                let name = if *fails { "broken_tool" } else { "list_bases" };
                ToolCall::from_raw_arguments(format!("call_{}", i), name, &format!("{{\"n\":{}}}", i))
            })
            .collect();

        let model = Arc::new(
            ScriptedProvider::new()
                .with_tool_calls(calls.clone())
                .with_text(final_reply.clone()),
        );
        let tools = Arc::new(
            ScriptedToolProvider::new()
                .with_tool("list_bases", "[]")
                .with_failing_tool(
                    "broken_tool",
                    ToolError::ExecutionFailed("boom".to_string()),
                ),
        );

        let gateways: Arc<dyn GatewayFactory> = Arc::new(StaticGateways {
            model: model.clone() as Arc<dyn LlmProvider>,
            tools: tools.clone() as Arc<dyn ToolProvider>,
        });
        let orchestrator = ChatOrchestrator::new(gateways, "system", "fallback");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = runtime
            .block_on(orchestrator.run(
                &Credentials::new("sk", "pat"),
                vec![airchat::llm::Message::user("go")],
            ))
            .unwrap();

        prop_assert_eq!(&outcome.invoked_tools, &calls);

        let invoked: Vec<_> = tools.invocations().into_iter().map(|i| i.arguments).collect();
        let expected: Vec<_> = (0..calls.len()).map(|i| json!({"n": i})).collect();
        prop_assert_eq!(invoked, expected);

        let requests = model.requests();
        prop_assert_eq!(requests.len(), 2);
        prop_assert!(requests[1].tools.is_none());

        let results: Vec<_> = requests[1]
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        prop_assert_eq!(results.len(), calls.len());

        for ((result, call), fails) in results.iter().zip(&calls).zip(&outcomes) {
            prop_assert_eq!(result.tool_call_id.as_deref(), Some(call.id.as_str()));
            let text = match &result.content {
                MessageContent::Text(text) => text.clone(),
                MessageContent::Parts(_) => String::new(),
            };
            prop_assert_eq!(text.starts_with("Error:"), *fails);
        }

        if final_reply.trim().is_empty() {
            prop_assert_eq!(outcome.reply, "fallback");
        } else {
            prop_assert_eq!(outcome.reply, final_reply);
        }
    }
}
