use rstest::rstest;
use runloop::{DispatchConfig, PollPolicy, RunError, RunOrchestrator, RunRequest, RunStatus};
use runloop_core::{CallId, RunHandle, ToolOutput, TransportError};
use runloop_testing::fixtures::{
    assistant_id, assistant_message, requires_action, run, run_id, thread_id, tool_call,
    tool_call_json, user_message,
};
use runloop_testing::{RecordingTool, ScriptedTransport, TransportCall};
use runloop_tools::{DispatchExecutor, ToolProvider, ToolRegistry};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, PartialEq, Deserialize)]
struct Verdict {
    score: i64,
}

fn orchestrator(
    transport: &ScriptedTransport,
    tools: &[&dyn ToolProvider],
    attempts: u32,
) -> RunOrchestrator<ScriptedTransport> {
    let registry = ToolRegistry::discover(tools.iter().copied()).unwrap();
    let executor = DispatchExecutor::new(registry, DispatchConfig::new());
    let policy = PollPolicy::new()
        .interval(Duration::from_millis(100))
        .max_attempts(attempts);
    RunOrchestrator::new(transport.clone(), executor, policy)
}

fn request() -> RunRequest {
    RunRequest::new("Score this position", thread_id(), assistant_id())
}

fn reply(text: &str) -> Vec<runloop_core::ThreadMessage> {
    vec![
        assistant_message("msg_2", 20, text),
        user_message("msg_1", 10, "Score this position"),
    ]
}

#[tokio::test(start_paused = true)]
async fn completes_without_dispatch() {
    let echo = RecordingTool::echo("echo", "text");
    let transport = ScriptedTransport::new()
        .then_run(run(RunStatus::Queued))
        .then_run(run(RunStatus::InProgress))
        .then_run(run(RunStatus::Completed))
        .with_messages(reply(r#"{"score": 7}"#));

    let verdict: Verdict = orchestrator(&transport, &[&echo], 10)
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(verdict, Verdict { score: 7 });
    assert_eq!(transport.poll_count(), 3);
    assert!(transport.submissions().is_empty());
    assert_eq!(echo.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn requires_action_dispatches_once_and_submits() {
    let echo = RecordingTool::echo("echo", "text");
    let transport = ScriptedTransport::new()
        .then_run(run(RunStatus::InProgress))
        .then_run(requires_action(
            tool_call_json("call_1", "echo", json!({"text": "ping"})),
            vec![],
        ))
        .then_run(run(RunStatus::InProgress))
        .then_run(run(RunStatus::Completed))
        .with_messages(reply(r#"{"score": 1}"#));

    let verdict: Verdict = orchestrator(&transport, &[&echo], 10)
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(verdict.score, 1);
    assert_eq!(echo.calls(), vec![json!("ping")]);
    assert_eq!(
        transport.submissions(),
        vec![vec![ToolOutput::new(CallId::parse("call_1").unwrap(), "ping")]]
    );
}

#[tokio::test(start_paused = true)]
async fn every_request_uses_the_right_ids() {
    let echo = RecordingTool::echo("echo", "text");
    let transport = ScriptedTransport::new()
        .then_run(requires_action(
            tool_call_json("call_1", "echo", json!({"text": "x"})),
            vec![],
        ))
        .then_run(run(RunStatus::Completed))
        .with_messages(reply("{\"score\": 0}"));

    orchestrator(&transport, &[&echo], 10)
        .run_text(&request(), &CancellationToken::new())
        .await
        .unwrap();

    let calls = transport.calls();
    assert_eq!(
        calls[0],
        TransportCall::CreateMessage {
            thread_id: thread_id(),
            content: "Score this position".to_string(),
        }
    );
    assert_eq!(
        calls[1],
        TransportCall::CreateRun {
            thread_id: thread_id(),
            assistant_id: assistant_id(),
        }
    );
    for call in &calls[2..] {
        match call {
            TransportCall::GetRun { thread_id: t, run_id: r } => {
                assert_eq!(t, &thread_id());
                assert_eq!(r, &run_id());
            }
            TransportCall::SubmitToolOutputs {
                thread_id: t,
                run_id: r,
                ..
            } => {
                assert_eq!(t, &thread_id());
                assert_ne!(t.as_str(), assistant_id().as_str());
                assert_eq!(r, &run_id());
            }
            TransportCall::ListMessages { thread_id: t } => assert_eq!(t, &thread_id()),
            other => panic!("unexpected request: {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn batch_is_submitted_together_with_failures_answered() {
    let echo = RecordingTool::echo("echo", "text");
    let broken = RecordingTool::echo("lookup", "key").failing("backend down");
    let transport = ScriptedTransport::new()
        .then_run(requires_action(
            tool_call_json("call_a", "echo", json!({"text": "a"})),
            vec![
                tool_call_json("call_b", "lookup", json!({"key": "k"})),
                tool_call_json("call_c", "missing_tool", json!({})),
                tool_call("call_d", "echo", "{not json"),
                tool_call_json("call_e", "echo", json!({})),
            ],
        ))
        .then_run(run(RunStatus::Completed))
        .with_messages(reply("{\"score\": 2}"));

    orchestrator(&transport, &[&echo, &broken], 10)
        .run_text(&request(), &CancellationToken::new())
        .await
        .unwrap();

    let submissions = transport.submissions();
    assert_eq!(submissions.len(), 1);
    let batch = &submissions[0];
    let ids: Vec<&str> = batch.iter().map(|o| o.call_id.as_str()).collect();
    assert_eq!(ids, vec!["call_a", "call_b", "call_c", "call_d", "call_e"]);

    assert_eq!(batch[0].output, "a");
    let kinds: Vec<String> = batch[1..]
        .iter()
        .map(|o| {
            let payload: Value = serde_json::from_str(&o.output).unwrap();
            payload["error"]["kind"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "handler_error",
            "tool_not_found",
            "malformed_arguments",
            "invalid_argument"
        ]
    );
    assert_eq!(broken.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn never_leaving_in_progress_times_out() {
    let transport = ScriptedTransport::new().then_run(run(RunStatus::InProgress));

    let err = orchestrator(&transport, &[], 4)
        .run::<Verdict>(&request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        RunError::Timeout {
            context,
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(last_status, Some(RunStatus::InProgress));
            assert_eq!(context.run_id, Some(run_id()));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(transport.poll_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn poll_interval_spaces_attempts() {
    let transport = ScriptedTransport::new().then_run(run(RunStatus::Queued));
    let started = tokio::time::Instant::now();

    let _ = orchestrator(&transport, &[], 5)
        .run_text(&request(), &CancellationToken::new())
        .await;

    assert_eq!(started.elapsed(), Duration::from_millis(400));
}

#[rstest]
#[case::failed(RunStatus::Failed)]
#[case::cancelled(RunStatus::Cancelled)]
#[case::expired(RunStatus::Expired)]
#[case::incomplete(RunStatus::Incomplete)]
#[tokio::test(start_paused = true)]
async fn terminal_failure_carries_status(#[case] status: RunStatus) {
    let transport = ScriptedTransport::new()
        .then_run(run(RunStatus::InProgress))
        .then_run(run(status).with_last_error("rate_limit_exceeded: quota"));

    let err = orchestrator(&transport, &[], 10)
        .run::<Verdict>(&request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        RunError::RunFailed {
            status: reported,
            last_error,
            context,
        } => {
            assert_eq!(reported, status);
            assert_eq!(last_error.as_deref(), Some("rate_limit_exceeded: quota"));
            assert_eq!(context.thread_id, thread_id());
        }
        other => panic!("expected run failure, got {other:?}"),
    }
    assert!(
        !transport
            .calls()
            .iter()
            .any(|c| matches!(c, TransportCall::ListMessages { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn cancelling_keeps_polling() {
    let transport = ScriptedTransport::new()
        .then_run(run(RunStatus::Cancelling))
        .then_run(run(RunStatus::Cancelled));

    let err = orchestrator(&transport, &[], 10)
        .run_text(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RunError::RunFailed {
            status: RunStatus::Cancelled,
            ..
        }
    ));
    assert_eq!(transport.poll_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn undecodable_reply_is_decode_error() {
    let transport = ScriptedTransport::new()
        .then_run(run(RunStatus::Completed))
        .with_messages(reply("I think the score is seven"));

    let err = orchestrator(&transport, &[], 10)
        .run::<Verdict>(&request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        RunError::Decode { payload, context, .. } => {
            assert_eq!(payload, "I think the score is seven");
            assert_eq!(context.run_id, Some(run_id()));
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn run_text_returns_newest_assistant_reply() {
    let transport = ScriptedTransport::new()
        .then_run(run(RunStatus::Completed))
        .with_messages(vec![
            assistant_message("msg_1", 5, "older"),
            user_message("msg_3", 40, "question"),
            assistant_message("msg_2", 30, "newest"),
        ]);

    let text = orchestrator(&transport, &[], 10)
        .run_text(&request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(text, "newest");
}

#[tokio::test(start_paused = true)]
async fn completed_without_assistant_reply() {
    let transport = ScriptedTransport::new()
        .then_run(run(RunStatus::Completed))
        .with_messages(vec![user_message("msg_1", 1, "hello")]);

    let err = orchestrator(&transport, &[], 10)
        .run_text(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::NoAssistantMessage { .. }));
}

#[tokio::test(start_paused = true)]
async fn poll_failures_spend_attempts() {
    let transport = ScriptedTransport::new()
        .then_run_error(TransportError::connection("reset by peer"))
        .then_run_error(TransportError::http(503, "unavailable"))
        .then_run(run(RunStatus::Completed))
        .with_messages(reply("{\"score\": 3}"));

    let verdict: Verdict = orchestrator(&transport, &[], 3)
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(verdict.score, 3);
}

#[tokio::test(start_paused = true)]
async fn poll_failures_exhausting_budget_time_out() {
    let transport = ScriptedTransport::new()
        .then_run_error(TransportError::connection("reset by peer"))
        .then_run_error(TransportError::connection("reset by peer"));

    let err = orchestrator(&transport, &[], 2)
        .run_text(&request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        RunError::Timeout {
            last_status,
            last_error,
            ..
        } => {
            assert_eq!(last_status, None);
            assert!(last_error.unwrap().contains("reset by peer"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn failed_submission_redispatches_batch() {
    let echo = RecordingTool::echo("echo", "text");
    let pending = requires_action(
        tool_call_json("call_1", "echo", json!({"text": "again"})),
        vec![],
    );
    let transport = ScriptedTransport::new()
        .then_run(pending.clone())
        .then_submit_error(TransportError::http(500, "oops"))
        .then_run(pending)
        .then_run(run(RunStatus::Completed))
        .with_messages(reply("{\"score\": 4}"));

    let verdict: Verdict = orchestrator(&transport, &[&echo], 10)
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(verdict.score, 4);
    assert_eq!(echo.call_count(), 2);
    assert_eq!(transport.submissions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn requires_action_without_calls_is_a_plain_tick() {
    let transport = ScriptedTransport::new()
        .then_run(RunHandle::new(run_id(), thread_id(), RunStatus::RequiresAction))
        .then_run(run(RunStatus::Completed))
        .with_messages(reply("{\"score\": 5}"));

    let verdict: Verdict = orchestrator(&transport, &[], 10)
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(verdict.score, 5);
    assert!(transport.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn message_failure_reports_thread() {
    let transport =
        ScriptedTransport::new().fail_create_message(TransportError::http(404, "no thread"));

    let err = orchestrator(&transport, &[], 10)
        .run_text(&request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        RunError::Transport { context, source } => {
            assert_eq!(context.thread_id, thread_id());
            assert_eq!(context.run_id, None);
            assert_eq!(source, TransportError::http(404, "no thread"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn message_listing_failure_is_transport_error() {
    let transport = ScriptedTransport::new()
        .then_run(run(RunStatus::Completed))
        .fail_list_messages(TransportError::connection("closed"));

    let err = orchestrator(&transport, &[], 10)
        .run_text(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.context().and_then(|c| c.run_id.clone()),
        Some(id) if id == run_id()
    ));
    assert!(matches!(err, RunError::Transport { .. }));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_polling() {
    let transport = ScriptedTransport::new().then_run(run(RunStatus::InProgress));
    let cancel = CancellationToken::new();

    let handle = orchestrator(&transport, &[], 100).spawn::<Verdict>(request(), cancel.clone());
    tokio::time::sleep(Duration::from_millis(250)).await;
    cancel.cancel();

    let err = handle.await.unwrap().unwrap_err();
    match err {
        RunError::Cancelled { context } => assert_eq!(context.run_id, Some(run_id())),
        other => panic!("expected cancellation, got {other:?}"),
    }
    let polls = transport.poll_count();
    assert!((1..100).contains(&polls), "polled {polls} times");
}

#[tokio::test(start_paused = true)]
async fn spawn_returns_deferred_result() {
    let transport = ScriptedTransport::new()
        .then_run(run(RunStatus::InProgress))
        .then_run(run(RunStatus::Completed))
        .with_messages(reply("{\"score\": 9}"));

    let handle = orchestrator(&transport, &[], 10).spawn::<Verdict>(request(), CancellationToken::new());
    let verdict = handle.await.unwrap().unwrap();
    assert_eq!(verdict.score, 9);
}
