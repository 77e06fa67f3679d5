use assert_cmd::prelude::*;
use predicates::prelude::*;
use assert_cmd::Command;

/// Environment for a run whose ingest endpoint refuses every connection.
fn dlq_events() -> Command {
    let mut cmd = Command::cargo_bin("dlq-events").unwrap();
    cmd.env("DT_URL", "http://127.0.0.1:1")
        .env("DT_TOKEN", "secret")
        .env("RUST_LOG", "off")
        .args(["--local", "--endpoint", "http://127.0.0.1:1"]);
    cmd
}

fn sqs_event(records: &[(&str, &str)]) -> String {
    let records: Vec<serde_json::Value> = records
        .iter()
        .map(|(id, body)| {
            serde_json::json!({
                "messageId": id,
                "receiptHandle": "handle",
                "body": body,
                "attributes": { "ApproximateReceiveCount": "1" },
                "messageAttributes": {},
                "eventSource": "aws:sqs",
                "eventSourceARN": "",
                "awsRegion": "us-east-1"
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}

#[test]
fn command_does_not_exist() {
    let mut cmd = Command::cargo_bin("dlq-events").unwrap();

    cmd.arg("something");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("error: unrecognized subcommand"));
}

#[test]
fn missing_configuration_is_fatal() {
    let mut cmd = Command::cargo_bin("dlq-events").unwrap();

    cmd.env_remove("DT_URL")
        .env_remove("DT_TOKEN")
        .env("RUST_LOG", "off")
        .args(["--local", "process"])
        .write_stdin(sqs_event(&[]));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("missing required env var: DT_URL"));
}

#[test]
fn empty_batch_has_no_failures() {
    let mut cmd = dlq_events();

    cmd.arg("process").write_stdin(sqs_event(&[]));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#"{"batchItemFailures":[]}"#));
}

#[test]
fn undeliverable_records_are_reported() {
    let mut cmd = dlq_events();

    cmd.arg("process").write_stdin(sqs_event(&[
        ("m-1", "hello"),
        ("m-2", r#"{"eventType":"ERROR_EVENT","title":"boom"}"#),
    ]));
    cmd.assert().success().stdout(predicate::str::contains(
        r#"{"batchItemFailures":[{"itemIdentifier":"m-1"},{"itemIdentifier":"m-2"}]}"#,
    ));
}

#[test]
fn rejects_input_that_is_not_an_event() {
    let mut cmd = dlq_events();

    cmd.arg("process").write_stdin("definitely not json");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("input is not an SQS event"));
}
