//! End-to-end pipeline runs against a scripted model.
//!
//! Each test queues the planner reply, the architect reply and then the coder
//! turns (tool-call replies followed by a closing text reply per task).

use std::fs;

use serde_json::json;

use devagent::core::budget::RecursionLimitError;
use devagent::io::model::{Message, Role};
use devagent::io::project::list_generated_files;
use devagent::io::tools::{READ_FILE, WRITE_FILE};
use devagent::pipeline::{PipelineConfig, PipelineEvent, run_pipeline};
use devagent::test_support::{
    ScriptedModel, json_reply, sample_plan, task_plan, tool_call, tool_call_reply,
};

fn config(root: &std::path::Path, recursion_limit: u32) -> PipelineConfig {
    PipelineConfig {
        output_dir: root.join("generated_project"),
        recursion_limit,
        prompt_budget_bytes: 60_000,
        max_tool_rounds: 4,
        tool_output_limit_bytes: 10_000,
    }
}

/// Three tasks, the second one revisiting a file the first one wrote.
///
/// ```text
/// planner -> architect -> coder(index.html) -> coder(index.html) -> coder(app.js) -> coder(DONE)
/// ```
#[test]
fn full_run_writes_files_through_tools() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cfg = config(temp.path(), 100);
    let model = ScriptedModel::new(vec![
        json_reply(&sample_plan()),
        json_reply(&task_plan(&[
            ("index.html", "Create the page skeleton"),
            ("index.html", "Link app.js"),
            ("app.js", "Implement addTodo()"),
        ])),
        // Task 1.
        tool_call_reply(vec![tool_call(
            "c1",
            WRITE_FILE,
            json!({"path": "index.html", "content": "<html></html>"}),
        )]),
        Message::assistant("page created"),
        // Task 2: reads the file back before rewriting it.
        tool_call_reply(vec![tool_call("c2", READ_FILE, json!({"path": "index.html"}))]),
        tool_call_reply(vec![tool_call(
            "c3",
            WRITE_FILE,
            json!({"path": "index.html", "content": "<html><script src=\"app.js\"></script></html>"}),
        )]),
        Message::assistant("linked"),
        // Task 3.
        tool_call_reply(vec![tool_call(
            "c4",
            WRITE_FILE,
            json!({"path": "app.js", "content": "function addTodo() {}"}),
        )]),
        Message::assistant("done"),
    ]);
    let mut events = Vec::new();

    let outcome = run_pipeline(&model, &cfg, "Build a todo app", |event| {
        events.push(event.clone());
    })
    .expect("run");

    assert_eq!(outcome.steps_executed, 3);
    assert_eq!(outcome.node_executions, 6);
    assert_eq!(outcome.plan, sample_plan());
    assert_eq!(model.remaining(), 0);

    let files: Vec<String> = list_generated_files(&cfg.output_dir)
        .expect("list")
        .into_iter()
        .map(|file| file.path)
        .collect();
    assert_eq!(files, vec!["app.js", "index.html"]);
    assert_eq!(
        fs::read_to_string(cfg.output_dir.join("index.html")).expect("read"),
        "<html><script src=\"app.js\"></script></html>"
    );

    // The second task's prompt embeds what the first task wrote.
    let requests = model.requests();
    let second_task_prompt = requests[4].messages[1].content.clone().unwrap_or_default();
    assert_eq!(requests[4].messages[1].role, Role::User);
    assert!(second_task_prompt.contains("Existing content:\n<html></html>"));

    let completed: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::StepCompleted { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![0, 1, 2]);
    assert_eq!(
        events.last(),
        Some(&PipelineEvent::Finished { steps_executed: 3 })
    );
}

#[test]
fn empty_task_plan_writes_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cfg = config(temp.path(), 100);
    let model = ScriptedModel::new(vec![
        json_reply(&sample_plan()),
        json_reply(&task_plan(&[])),
    ]);

    let outcome = run_pipeline(&model, &cfg, "Build a todo app", |_| {}).expect("run");

    assert_eq!(outcome.steps_executed, 0);
    assert!(list_generated_files(&cfg.output_dir).expect("list").is_empty());
}

/// With a limit of 5 only `limit - 3 = 2` tasks fit; a third one trips the limit
/// after the first two files are on disk.
#[test]
fn recursion_limit_keeps_files_already_written() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cfg = config(temp.path(), 5);
    let mut replies = vec![
        json_reply(&sample_plan()),
        json_reply(&task_plan(&[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "c")])),
    ];
    for name in ["a.txt", "b.txt"] {
        replies.push(tool_call_reply(vec![tool_call(
            name,
            WRITE_FILE,
            json!({"path": name, "content": name}),
        )]));
        replies.push(Message::assistant("ok"));
    }
    let model = ScriptedModel::new(replies);

    let err = run_pipeline(&model, &cfg, "letters", |_| {}).unwrap_err();

    assert_eq!(
        err.downcast_ref::<RecursionLimitError>(),
        Some(&RecursionLimitError { limit: 5 })
    );
    let files: Vec<String> = list_generated_files(&cfg.output_dir)
        .expect("list")
        .into_iter()
        .map(|file| file.path)
        .collect();
    assert_eq!(files, vec!["a.txt", "b.txt"]);
}

#[test]
fn tasks_fitting_the_limit_exactly_complete() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cfg = config(temp.path(), 5);
    let model = ScriptedModel::new(vec![
        json_reply(&sample_plan()),
        json_reply(&task_plan(&[("a.txt", "a"), ("b.txt", "b")])),
        Message::assistant("a"),
        Message::assistant("b"),
    ]);

    let outcome = run_pipeline(&model, &cfg, "letters", |_| {}).expect("run");
    assert_eq!(outcome.node_executions, 5);
}

#[test]
fn escaping_write_is_reported_to_the_model() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cfg = config(temp.path(), 100);
    let model = ScriptedModel::new(vec![
        json_reply(&sample_plan()),
        json_reply(&task_plan(&[("index.html", "markup")])),
        tool_call_reply(vec![tool_call(
            "c1",
            WRITE_FILE,
            json!({"path": "../escape.txt", "content": "nope"}),
        )]),
        Message::assistant("gave up"),
    ]);

    run_pipeline(&model, &cfg, "todo", |_| {}).expect("run");

    assert!(!temp.path().join("escape.txt").exists());
    let requests = model.requests();
    let tool_reply = requests[3]
        .messages
        .last()
        .and_then(|message| message.content.clone())
        .unwrap_or_default();
    assert!(tool_reply.starts_with("ERROR: "));
    assert!(tool_reply.contains("outside project root"));
}
