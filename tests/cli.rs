use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Output, Stdio};
use std::thread;

fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let addr = listener.local_addr().expect("address should be available");
    drop(listener);
    format!("http://{addr}/v1")
}

fn run_chat(envs: &[(&str, &str)], stdin: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_thinkchat"));
    cmd.env_remove("HF_TOKEN")
        .env("RUST_LOG", "off")
        .env("LOG_OUTPUT", "stderr")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().expect("failed to spawn thinkchat binary");
    {
        let mut child_stdin = child.stdin.take().expect("stdin should be piped");
        // The process may exit before reading everything.
        let _ = child_stdin.write_all(stdin.as_bytes());
    }
    child
        .wait_with_output()
        .expect("failed to wait for thinkchat binary")
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let read = stream.read(&mut buf).expect("read should succeed");
        if read == 0 {
            break;
        }
        data.extend_from_slice(&buf[..read]);
        let Some(header_end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if data.len() >= header_end + 4 + content_length {
            break;
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

/// Serves one canned SSE completion and hands back the raw request.
fn serve_completion(fragments: &[&str]) -> (String, thread::JoinHandle<String>) {
    let mut body = String::new();
    for fragment in fragments {
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": fragment}}]})
        ));
    }
    body.push_str("data: [DONE]\n\n");

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let addr = listener.local_addr().expect("address should be available");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept should succeed");
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream
            .write_all(response.as_bytes())
            .expect("write should succeed");
        request
    });
    (format!("http://{addr}/v1"), handle)
}

#[test]
fn missing_credential_exits_before_prompt() {
    let output = run_chat(&[], "hello\nexit\n");

    assert!(!output.status.success(), "missing HF_TOKEN should fail startup");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stdout.contains("You:"), "no prompt expected, got stdout:\n{stdout}");
    assert!(
        stderr.contains("HF_TOKEN not found in environment variables"),
        "expected credential error, got stderr:\n{stderr}"
    );
}

#[test]
fn exit_in_any_case_ends_session_cleanly() {
    let base_url = closed_base_url();
    let output = run_chat(
        &[("HF_TOKEN", "hf_test_token"), ("MODEL_BASE_URL", &base_url)],
        "ExIt\nthis is never sent\n",
    );

    assert!(output.status.success(), "exit should return status 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.starts_with("Hugging Face Chat Bot Initialized! Type 'exit' to quit.\n"),
        "unexpected stdout:\n{stdout}"
    );
    assert!(stdout.ends_with("You: "), "unexpected stdout:\n{stdout}");
    assert_eq!(stdout.matches("You: ").count(), 1);
}

#[test]
fn failed_turn_is_reported_and_session_continues() {
    let base_url = closed_base_url();
    let output = run_chat(
        &[("HF_TOKEN", "hf_test_token"), ("MODEL_BASE_URL", &base_url)],
        "what is 2 + 2?\nexit\n",
    );

    assert!(output.status.success(), "turn failures are not fatal");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("An error occurred during the API call: connection refused by model API"),
        "unexpected stdout:\n{stdout}"
    );
    assert_eq!(stdout.matches("You: ").count(), 2);
}

#[test]
fn streamed_turn_prints_reasoning_and_final_answer() {
    let (base_url, server) = serve_completion(&[
        "Six times seven ",
        "is **42**.\n\nFinal ",
        "Answer: 42",
    ]);
    let output = run_chat(
        &[
            ("HF_TOKEN", "hf_test_token"),
            ("MODEL_BASE_URL", &base_url),
            ("MODEL", "openai/gpt-oss-20b"),
        ],
        "What is 6 * 7?\nexit\n",
    );

    assert!(output.status.success(), "session should exit cleanly");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let expected_turn = format!(
        "You: Six times seven is **42**.\n\nFinal Answer: 42\n\n\n--- Reasoning ---\nSix times seven is 42.\n\n--- Final Answer: ---\n42\n{}\nYou: ",
        "-".repeat(50)
    );
    assert!(
        stdout.contains(&expected_turn),
        "unexpected stdout:\n{stdout}"
    );

    let request = server.join().expect("server thread should join");
    assert!(request.starts_with("POST /v1/chat/completions "), "{request}");
    assert!(
        request.contains("Question: What is 6 * 7?"),
        "prompt should be wrapped in the reasoning template: {request}"
    );
    assert!(request.contains("Final Answer:"), "{request}");
}
