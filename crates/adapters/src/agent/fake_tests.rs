// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn spec(prompt: &str) -> LaunchSpec {
    LaunchSpec {
        binary: "claude".to_string(),
        prompt: prompt.to_string(),
        ..LaunchSpec::default()
    }
}

#[tokio::test]
async fn replays_script_then_closes() {
    let launcher = FakeAgentLauncher::new();
    launcher.push_success("s-abc", "$0.10", 42);

    let mut handle = launcher.launch(spec("go")).await.unwrap();

    assert!(matches!(
        handle.events.recv().await,
        Some(AgentEvent::Init { .. })
    ));
    assert!(matches!(
        handle.events.recv().await,
        Some(AgentEvent::Result { success: true, .. })
    ));
    assert!(handle.events.recv().await.is_none());
    assert_eq!(handle.control.session_id(), Some("s-abc".to_string()));
}

#[tokio::test]
async fn records_launch_specs_in_order() {
    let launcher = FakeAgentLauncher::new();
    launcher.push_success("s-1", "$0", 0);
    launcher.push_success("s-2", "$0", 0);

    let _ = launcher.launch(spec("first")).await.unwrap();
    let mut resumed = spec("second");
    resumed.resume_session = Some("s-1".to_string());
    let _ = launcher.launch(resumed).await.unwrap();

    let launches = launcher.launches();
    assert_eq!(launches.len(), 2);
    assert_eq!(launches[0].prompt, "first");
    assert_eq!(launches[1].resume_session.as_deref(), Some("s-1"));
}

#[tokio::test]
async fn hanging_launch_records_inputs_and_replies() {
    let launcher = FakeAgentLauncher::new();
    launcher.hang_without_script();
    launcher.push_reply(AgentEvent::AssistantText {
        text: "sure thing".to_string(),
    });

    let mut handle = launcher.launch(spec("chat")).await.unwrap();
    handle.control.send_input("hello").await.unwrap();

    let reply = handle.events.recv().await.unwrap();
    assert_eq!(
        reply,
        AgentEvent::AssistantText {
            text: "sure thing".to_string()
        }
    );
    assert_eq!(launcher.inputs(), ["hello"]);

    handle.control.stop();
    assert!(handle.events.recv().await.is_none());
    assert_eq!(launcher.stop_count(), 1);
}
