//! Integration tests for the HTTP+XML backend
//!
//! A loopback axum server stands in for the player's embedded control
//! server, returning controlled status documents and recording the
//! commands and auth headers it receives. A fake sleeper script stands
//! in for the player binary where a live child process is needed.

#![cfg(unix)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::routing::get;
use axum::Router;
use karaoke_player::{Error, HttpPlayerClient, PlayerClient, PlayerConfig};
use serial_test::serial;
use tokio::net::TcpListener;
use tokio::time::sleep;

/// Shared state of the stub control server
#[derive(Clone, Default)]
struct Stub {
    state: Arc<Mutex<String>>,
    volume: Arc<Mutex<i32>>,
    commands: Arc<Mutex<Vec<String>>>,
    auth_headers: Arc<Mutex<Vec<String>>>,
    /// When set, returned verbatim instead of a well-formed document
    raw_body: Arc<Mutex<Option<String>>>,
}

impl Stub {
    fn new(state: &str, volume: i32) -> Self {
        Self {
            state: Arc::new(Mutex::new(state.to_string())),
            volume: Arc::new(Mutex::new(volume)),
            ..Default::default()
        }
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

async fn status_handler(
    State(stub): State<Stub>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> String {
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        stub.auth_headers
            .lock()
            .unwrap()
            .push(auth.to_str().unwrap_or("").to_string());
    }
    if let Some(cmd) = params.get("command") {
        stub.commands.lock().unwrap().push(cmd.clone());
        if cmd == "volume" {
            if let Some(val) = params.get("val").and_then(|v| v.parse().ok()) {
                *stub.volume.lock().unwrap() = val;
            }
        }
    }
    if let Some(body) = stub.raw_body.lock().unwrap().clone() {
        return body;
    }
    format!(
        "<root><state>{}</state><volume>{}</volume></root>",
        stub.state.lock().unwrap(),
        stub.volume.lock().unwrap()
    )
}

/// Serve the stub on the given port (0 picks an ephemeral one) and
/// return the bound port
async fn spawn_stub(stub: Stub, port: u16) -> u16 {
    let app = Router::new()
        .route("/requests/status.xml", get(status_handler))
        .with_state(stub);
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

/// Create an executable script that ignores its arguments and sleeps
fn fake_player(dir: &tempfile::TempDir) -> PathBuf {
    let script = dir.path().join("fakevlc.sh");
    std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();
    script
}

fn config_with(script: Option<&Path>, port: u16) -> PlayerConfig {
    PlayerConfig {
        player_path: script.map(Path::to_path_buf),
        http_port: port,
        ..PlayerConfig::default()
    }
}

#[tokio::test]
async fn test_status_round_trip_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_player(&dir);
    let port = spawn_stub(Stub::new("playing", 150), 0).await;
    let mut client = HttpPlayerClient::new(&config_with(Some(&script), port));

    client.play_file(Path::new("/songs/track.mp4")).await.unwrap();
    assert!(client.is_running());
    assert!(client.is_playing().await.unwrap());
    assert!(!client.is_paused().await.unwrap());
    assert_eq!(client.get_volume().await.unwrap(), 150);

    client.kill().await;
    assert!(!client.is_running());
}

#[tokio::test]
#[serial]
async fn test_paused_status_on_port_5002() {
    let port = spawn_stub(Stub::new("paused", 80), 5002).await;
    assert_eq!(port, 5002);
    let mut client = HttpPlayerClient::new(&config_with(None, 5002));

    // No process is running: not playing regardless of remote state.
    assert!(!client.is_playing().await.unwrap());
    // Volume is read straight from the status document.
    assert_eq!(client.get_volume().await.unwrap(), 80);
}

#[tokio::test]
async fn test_volume_is_read_modify_write() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_player(&dir);
    let stub = Stub::new("playing", 100);
    let port = spawn_stub(stub.clone(), 0).await;
    let mut client = HttpPlayerClient::new(&config_with(Some(&script), port));

    client.play_file(Path::new("/songs/track.mp4")).await.unwrap();

    client.vol_up().await.unwrap();
    assert_eq!(client.get_volume().await.unwrap(), 110);

    client.vol_down().await.unwrap();
    assert_eq!(client.get_volume().await.unwrap(), 100);

    assert_eq!(stub.commands(), vec!["volume", "volume"]);
    client.kill().await;
}

#[tokio::test]
async fn test_command_tokens_on_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_player(&dir);
    let stub = Stub::new("playing", 100);
    let port = spawn_stub(stub.clone(), 0).await;
    let mut client = HttpPlayerClient::new(&config_with(Some(&script), port));

    client.play_file(Path::new("/songs/track.mp4")).await.unwrap();
    client.pause().await.unwrap();
    client.play().await.unwrap();
    client.restart().await.unwrap();
    client.stop().await.unwrap();

    // "seek&val=0" splits into the seek token plus its val parameter.
    assert_eq!(stub.commands(), vec!["pl_pause", "pl_play", "seek", "pl_stop"]);
    client.kill().await;
}

#[tokio::test]
async fn test_commands_without_process_are_dropped() {
    let stub = Stub::new("playing", 100);
    let port = spawn_stub(stub.clone(), 0).await;
    let mut client = HttpPlayerClient::new(&config_with(None, port));

    let response = client.command("pl_pause").await.unwrap();
    assert!(response.is_none());
    assert!(stub.commands().is_empty());
}

#[tokio::test]
async fn test_basic_auth_password_is_sent() {
    let stub = Stub::new("playing", 100);
    let port = spawn_stub(stub.clone(), 0).await;
    let mut client = HttpPlayerClient::new(&config_with(None, port));

    client.get_volume().await.unwrap();

    let headers = stub.auth_headers.lock().unwrap().clone();
    assert!(!headers.is_empty());
    assert!(headers[0].starts_with("Basic "));
}

#[tokio::test]
async fn test_unreachable_server_is_an_error() {
    // Bind then drop a listener so the port is almost surely closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut client = HttpPlayerClient::new(&config_with(None, port));
    let err = client.get_volume().await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
}

#[tokio::test]
async fn test_malformed_status_is_an_error() {
    let stub = Stub::new("playing", 100);
    *stub.raw_body.lock().unwrap() = Some("this is not xml".to_string());
    let port = spawn_stub(stub, 0).await;
    let mut client = HttpPlayerClient::new(&config_with(None, port));

    let err = client.get_volume().await.unwrap_err();
    assert!(matches!(err, Error::Status(_)));
}

#[tokio::test]
async fn test_stop_swallows_transport_errors() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_player(&dir);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut client = HttpPlayerClient::new(&config_with(Some(&script), port));
    client.play_file(Path::new("/songs/track.mp4")).await.unwrap();

    // No control server is listening; stop must not propagate that.
    client.stop().await.unwrap();
    client.kill().await;
}

#[tokio::test]
async fn test_transpose_window_bridges_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_player(&dir);
    let port = spawn_stub(Stub::new("playing", 100), 0).await;
    let mut client = HttpPlayerClient::new(&config_with(Some(&script), port));

    client
        .play_file_transpose(Path::new("/songs/track.mp4"), 2)
        .await
        .unwrap();
    assert!(client.is_running());

    // Kill the underlying process mid-window: liveness must hold.
    client.kill().await;
    assert!(client.is_running());

    sleep(Duration::from_millis(2500)).await;
    assert!(!client.is_running());
}

#[tokio::test]
async fn test_play_file_supersedes_previous_process() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_player(&dir);
    let port = spawn_stub(Stub::new("playing", 100), 0).await;
    let mut client = HttpPlayerClient::new(&config_with(Some(&script), port));

    client.play_file(Path::new("/songs/first.mp4")).await.unwrap();
    let first_pid = client.pid().unwrap();

    client.play_file(Path::new("/songs/second.mp4")).await.unwrap();
    let second_pid = client.pid().unwrap();
    assert_ne!(first_pid, second_pid);

    let alive = std::process::Command::new("kill")
        .arg("-0")
        .arg(first_pid.to_string())
        .status()
        .unwrap()
        .success();
    assert!(!alive);

    client.kill().await;
}
