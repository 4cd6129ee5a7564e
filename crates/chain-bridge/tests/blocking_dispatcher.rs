mod common;

use std::sync::Arc;

use chain_bridge::{
    AsyncDispatcher, BlockingDispatcher, BridgeConfig, ChannelSink, LlmResult, PipelineEvent,
    PrefixHints, Serialized, StageError, StreamState,
};
use serde_json::{json, Value};

use common::{chain, chat_params, describe_all, drain, final_answer_config, outputs};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn agent_script() -> Vec<PipelineEvent> {
    vec![
        PipelineEvent::ChainStart {
            serialized: chain("AgentExecutor"),
            inputs: json!({"input": "what is 6*7?"}),
        },
        PipelineEvent::ChainStart {
            serialized: chain("LLMChain"),
            inputs: Value::Null,
        },
        PipelineEvent::ModelStart {
            serialized: Serialized::default(),
            prompts: vec!["Answer the question".to_string()],
            invocation_params: Some(chat_params()),
        },
        PipelineEvent::ModelToken {
            token: "Thought".to_string(),
        },
        PipelineEvent::ModelToken {
            token: " use calculator".to_string(),
        },
        PipelineEvent::ModelEnd {
            response: LlmResult::default(),
        },
        PipelineEvent::ChainEnd {
            outputs: outputs("text", "Thought use calculator"),
        },
        PipelineEvent::ToolStart {
            serialized: Serialized::named("Calculator"),
            input: "6*7".to_string(),
        },
        PipelineEvent::ToolEnd {
            output: "42".to_string(),
            hints: PrefixHints::default(),
        },
        PipelineEvent::ChainStart {
            serialized: chain("LLMChain"),
            inputs: Value::Null,
        },
        PipelineEvent::ModelStart {
            serialized: Serialized::default(),
            prompts: vec!["Observation: 42".to_string()],
            invocation_params: None,
        },
        PipelineEvent::ModelToken {
            token: "Final".to_string(),
        },
        PipelineEvent::ModelToken {
            token: " Answer".to_string(),
        },
        PipelineEvent::ModelToken {
            token: ":".to_string(),
        },
        PipelineEvent::ModelToken {
            token: " 42".to_string(),
        },
        PipelineEvent::ModelEnd {
            response: LlmResult {
                generations: Vec::new(),
                llm_output: Some(json!({"token_usage": {"total_tokens": 120}})),
            },
        },
        PipelineEvent::ChainEnd {
            outputs: outputs("text", "Final Answer: 42"),
        },
        PipelineEvent::ToolStart {
            serialized: Serialized::named("Search"),
            input: "unused".to_string(),
        },
        PipelineEvent::ToolError {
            error: StageError::failed("search offline"),
        },
        PipelineEvent::ChainEnd {
            outputs: outputs("output", "42"),
        },
    ]
}

#[test]
fn blocking_dispatcher_streams_final_answer() {
    let runtime = runtime();
    let (sink, mut rx) = ChannelSink::new();
    let mut dispatcher =
        BlockingDispatcher::new(final_answer_config(), Arc::new(sink), runtime.handle().clone());

    dispatcher.chain_start(&chain("X"), &Value::Null).unwrap();
    dispatcher
        .model_start(Some(&chat_params()), &["Q".to_string()])
        .unwrap();
    for token in ["Final", " Answer", ":", " 42"] {
        dispatcher.model_token(token).unwrap();
    }
    assert_eq!(dispatcher.state().stream_state(), StreamState::FinalStreaming);
    dispatcher.model_end(&LlmResult::default()).unwrap();
    dispatcher.chain_end(&outputs("out", "ignored")).unwrap();

    assert_eq!(dispatcher.state().depth(), 0);
    assert_eq!(
        describe_all(&drain(&mut rx)),
        vec![
            "send X@1 \"\" prompt=None",
            "open X@1 prompt=Some(\"Q\")",
            "token \"Final\"",
            "token \" Answer\"",
            "token \":\"",
            "open Chatbot@0 prompt=None",
            "token \" 42\"",
            "stream_sent",
            "stream_sent",
        ]
    );
}

#[test]
fn both_variants_emit_the_same_operations() {
    let runtime = runtime();
    let script = agent_script();

    let (blocking_sink, mut blocking_rx) = ChannelSink::new();
    let mut blocking = BlockingDispatcher::new(
        final_answer_config(),
        Arc::new(blocking_sink),
        runtime.handle().clone(),
    );
    for event in &script {
        blocking.handle(event).unwrap();
    }

    let (async_sink, mut async_rx) = ChannelSink::new();
    let mut suspending = AsyncDispatcher::new(final_answer_config(), Arc::new(async_sink));
    runtime.block_on(async {
        for event in &script {
            suspending.handle(event).await.unwrap();
        }
    });

    let blocking_ops = describe_all(&drain(&mut blocking_rx));
    let async_ops = describe_all(&drain(&mut async_rx));
    assert_eq!(blocking_ops, async_ops);
    assert_eq!(blocking.state().depth(), 0);
    assert_eq!(suspending.state().depth(), 0);

    assert_eq!(
        blocking_ops,
        vec![
            "send LLMChain@2 \"\" prompt=None",
            "open LLMChain@2 prompt=Some(\"Answer the question\")",
            "token \"Thought\"",
            "token \" use calculator\"",
            "stream_sent",
            "send Calculator@2 \"\" prompt=None",
            "send Calculator@2 \"42\" prompt=None",
            "send LLMChain@2 \"\" prompt=None",
            "open LLMChain@2 prompt=Some(\"Observation: 42\")",
            "token \"Final\"",
            "token \" Answer\"",
            "token \":\"",
            "open Chatbot@0 prompt=None",
            "token \" 42\"",
            "tokens 120",
            "stream_sent",
            "stream_sent",
            "send Search@2 \"\" prompt=None",
            "error Search \"search offline\"",
        ]
    );
}

#[test]
fn ignored_authors_emit_nothing() {
    let runtime = runtime();
    let (sink, mut rx) = ChannelSink::new();
    let config = BridgeConfig::default().with_ignore_list(["AgentExecutor", "Router"]);
    let mut dispatcher = BlockingDispatcher::new(config, Arc::new(sink), runtime.handle().clone());

    dispatcher.chain_start(&chain("Router"), &Value::Null).unwrap();
    dispatcher.model_token("routing").unwrap();
    dispatcher
        .chain_error(&StageError::failed("no route"))
        .unwrap();

    assert!(drain(&mut rx).is_empty());
    assert_eq!(dispatcher.state().depth(), 0);
}
