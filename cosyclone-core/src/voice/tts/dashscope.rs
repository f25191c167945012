//! DashScope CosyVoice speech synthesis over the duplex inference WebSocket.
//!
//! One synthesis is one task: `run-task`, wait for `task-started`, send the
//! text with `continue-task`, close the input with `finish-task`, then
//! collect binary audio frames until `task-finished` (or `task-failed`).

use anyhow::anyhow;
use async_trait::async_trait;
use futures_util::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, tungstenite::client::IntoClientRequest};
use tracing::{debug, info};
use uuid::Uuid;

use super::provider::SpeechSynthesis;
use super::types::{SynthesisOptions, SynthesisRequest, SynthesizedAudio};
use crate::error::ProviderError;
use crate::voice::config::DashScopeConfig;

pub struct DashScopeSynthesizer {
    config: DashScopeConfig,
}

impl DashScopeSynthesizer {
    pub fn new(config: DashScopeConfig) -> Self {
        Self { config }
    }

    async fn run_task(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, ProviderError> {
        let mut ws_request = self
            .config
            .websocket_url
            .as_str()
            .into_client_request()
            .map_err(|e| ProviderError::Transport(anyhow!("Failed to build request: {e}")))?;
        ws_request.headers_mut().insert(
            "Authorization",
            format!("bearer {}", self.config.api_key)
                .parse()
                .map_err(|_| {
                    ProviderError::Transport(anyhow!("Invalid API key for HTTP header"))
                })?,
        );

        let (mut ws, _) = connect_async(ws_request).await.map_err(|e| {
            ProviderError::Transport(anyhow!("Failed to connect to DashScope WebSocket: {e}"))
        })?;

        let task_id = Uuid::new_v4().simple().to_string();
        debug!(%task_id, voice_id = %request.voice, "Starting synthesis task");

        send_json(&mut ws, &run_task_message(&task_id, request)).await?;

        let mut audio = Vec::new();
        while let Some(message) = ws.next().await {
            let message = message
                .map_err(|e| ProviderError::Transport(anyhow!("WebSocket read failed: {e}")))?;

            let text = match message {
                Message::Binary(chunk) => {
                    audio.extend_from_slice(&chunk);
                    continue;
                }
                Message::Text(t) => t,
                Message::Close(frame) => {
                    return Err(ProviderError::Transport(anyhow!(
                        "WebSocket closed before the task finished: {frame:?}"
                    )))
                }
                _ => continue,
            };

            match parse_event(&text)? {
                TaskEvent::Started => {
                    send_json(&mut ws, &continue_task_message(&task_id, &request.text)).await?;
                    send_json(&mut ws, &finish_task_message(&task_id)).await?;
                }
                TaskEvent::Finished => {
                    if let Err(e) = ws.close(None).await {
                        debug!(%task_id, error = %e, "WebSocket close handshake failed");
                    }
                    if audio.is_empty() {
                        return Err(ProviderError::Malformed(anyhow!(
                            "Synthesis task {task_id} finished without audio"
                        )));
                    }
                    info!(%task_id, bytes = audio.len(), "Synthesis task finished");
                    return Ok(SynthesizedAudio {
                        data: audio,
                        format: request.options.format,
                        request_id: Some(task_id),
                    });
                }
                TaskEvent::Failed { code, message } => {
                    if let Err(e) = ws.close(None).await {
                        debug!(%task_id, error = %e, "WebSocket close handshake failed");
                    }
                    return Err(ProviderError::Api {
                        status: None,
                        code,
                        message,
                        request_id: Some(task_id),
                    });
                }
                TaskEvent::ResultGenerated => {}
                TaskEvent::Other(event) => debug!(%event, "Ignoring server event"),
            }
        }

        Err(ProviderError::Transport(anyhow!(
            "WebSocket stream ended before the task finished"
        )))
    }
}

async fn send_json<S, T>(ws: &mut S, message: &T) -> Result<(), ProviderError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
    T: Serialize,
{
    let json = serde_json::to_string(message)?;
    ws.send(Message::Text(json))
        .await
        .map_err(|e| ProviderError::Transport(anyhow!("WebSocket send failed: {e}")))
}

#[derive(Serialize)]
struct ClientMessage<'a, P> {
    header: ClientHeader<'a>,
    payload: P,
}

#[derive(Serialize)]
struct ClientHeader<'a> {
    action: &'static str,
    task_id: &'a str,
    streaming: &'static str,
}

impl<'a> ClientHeader<'a> {
    fn new(action: &'static str, task_id: &'a str) -> Self {
        Self {
            action,
            task_id,
            streaming: "duplex",
        }
    }
}

#[derive(Serialize)]
struct RunTaskPayload<'a> {
    task_group: &'static str,
    task: &'static str,
    function: &'static str,
    model: &'a str,
    parameters: SynthesisParameters<'a>,
    input: EmptyInput,
}

#[derive(Serialize)]
struct SynthesisParameters<'a> {
    text_type: &'static str,
    voice: &'a str,
    format: String,
    sample_rate: u32,
    volume: u32,
    rate: f32,
    pitch: f32,
}

impl<'a> SynthesisParameters<'a> {
    fn new(voice: &'a str, options: &SynthesisOptions) -> Self {
        Self {
            text_type: "PlainText",
            voice,
            format: options.format.to_string(),
            sample_rate: options.sample_rate,
            volume: options.volume,
            rate: options.rate,
            pitch: options.pitch,
        }
    }
}

#[derive(Serialize)]
struct EmptyInput {}

#[derive(Serialize)]
struct InputPayload<I> {
    input: I,
}

#[derive(Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

fn run_task_message<'a>(
    task_id: &'a str,
    request: &'a SynthesisRequest,
) -> ClientMessage<'a, RunTaskPayload<'a>> {
    ClientMessage {
        header: ClientHeader::new("run-task", task_id),
        payload: RunTaskPayload {
            task_group: "audio",
            task: "tts",
            function: "SpeechSynthesizer",
            model: &request.model,
            parameters: SynthesisParameters::new(request.voice.as_str(), &request.options),
            input: EmptyInput {},
        },
    }
}

fn continue_task_message<'a>(
    task_id: &'a str,
    text: &'a str,
) -> ClientMessage<'a, InputPayload<TextInput<'a>>> {
    ClientMessage {
        header: ClientHeader::new("continue-task", task_id),
        payload: InputPayload {
            input: TextInput { text },
        },
    }
}

fn finish_task_message(task_id: &str) -> ClientMessage<'_, InputPayload<EmptyInput>> {
    ClientMessage {
        header: ClientHeader::new("finish-task", task_id),
        payload: InputPayload { input: EmptyInput {} },
    }
}

#[derive(Deserialize)]
struct ServerMessage {
    header: ServerHeader,
}

#[derive(Deserialize)]
struct ServerHeader {
    event: String,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum TaskEvent {
    Started,
    ResultGenerated,
    Finished,
    Failed { code: String, message: String },
    Other(String),
}

fn parse_event(text: &str) -> Result<TaskEvent, ProviderError> {
    let server_msg: ServerMessage = serde_json::from_str(text).map_err(|e| {
        ProviderError::Malformed(anyhow!("Failed to parse server message: {e} - {text}"))
    })?;

    let header = server_msg.header;
    Ok(match header.event.as_str() {
        "task-started" => TaskEvent::Started,
        "result-generated" => TaskEvent::ResultGenerated,
        "task-finished" => TaskEvent::Finished,
        "task-failed" => TaskEvent::Failed {
            code: header.error_code.unwrap_or_else(|| "Unknown".to_string()),
            message: header.error_message.unwrap_or_default(),
        },
        _ => TaskEvent::Other(header.event),
    })
}

#[async_trait]
impl SpeechSynthesis for DashScopeSynthesizer {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, ProviderError> {
        match tokio::time::timeout(self.config.request_timeout, self.run_task(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Transport(anyhow!(
                "Synthesis timed out after {:?}",
                self.config.request_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::EndpointSettings;
    use crate::voice::enrollment::VoiceIdentity;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn sample_request() -> SynthesisRequest {
        SynthesisRequest {
            model: "cosyvoice-v3-plus".to_string(),
            voice: VoiceIdentity::parse("cosyvoice-v3-plus-myvoice-0001").unwrap(),
            text: "Hello there".to_string(),
            options: SynthesisOptions::default(),
        }
    }

    #[test]
    fn test_run_task_message_shape() {
        let request = sample_request();
        let value = serde_json::to_value(run_task_message("task-1", &request)).unwrap();

        assert_eq!(value["header"]["action"], "run-task");
        assert_eq!(value["header"]["streaming"], "duplex");
        assert_eq!(value["payload"]["function"], "SpeechSynthesizer");
        assert_eq!(value["payload"]["model"], "cosyvoice-v3-plus");
        assert_eq!(
            value["payload"]["parameters"]["voice"],
            "cosyvoice-v3-plus-myvoice-0001"
        );
        assert_eq!(value["payload"]["parameters"]["format"], "mp3");
        assert_eq!(value["payload"]["parameters"]["sample_rate"], 22050);
        assert_eq!(value["payload"]["input"], json!({}));
    }

    #[test]
    fn test_continue_task_carries_text() {
        let value = serde_json::to_value(continue_task_message("task-1", "Hello")).unwrap();
        assert_eq!(value["header"]["action"], "continue-task");
        assert_eq!(value["payload"]["input"]["text"], "Hello");
    }

    #[test]
    fn test_parse_failed_event() {
        let event = parse_event(
            r#"{"header":{"task_id":"t","event":"task-failed","error_code":"InvalidParameter","error_message":"voice not found"},"payload":{}}"#,
        )
        .unwrap();

        assert_eq!(
            event,
            TaskEvent::Failed {
                code: "InvalidParameter".to_string(),
                message: "voice not found".to_string()
            }
        );
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        assert!(matches!(
            parse_event("not json"),
            Err(ProviderError::Malformed(_))
        ));
    }

    fn event(name: &str) -> Message {
        Message::Text(
            json!({"header": {"task_id": "t", "event": name, "attributes": {}}, "payload": {}})
                .to_string(),
        )
    }

    /// How the local server plays out a synthesis task.
    #[derive(Clone, Copy)]
    enum ServerScript {
        Succeed,
        FailTask,
        FinishWithoutAudio,
        CloseAfterStart,
        DropAfterStart,
    }

    /// Serves one scripted synthesis task and returns the actions it received.
    async fn spawn_server(script: ServerScript) -> (String, tokio::task::JoinHandle<Vec<Value>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/api-ws/v1/inference", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut received = Vec::new();

            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let value: Value = serde_json::from_str(&text).unwrap();
                let action = value["header"]["action"].as_str().unwrap().to_string();
                received.push(value);

                match (action.as_str(), script) {
                    ("run-task", ServerScript::FailTask) => {
                        ws.send(Message::Text(
                            json!({"header": {"task_id": "t", "event": "task-failed",
                                "error_code": "InvalidParameter",
                                "error_message": "voice not ready"}, "payload": {}})
                            .to_string(),
                        ))
                        .await
                        .unwrap();
                        break;
                    }
                    ("run-task", ServerScript::CloseAfterStart) => {
                        ws.send(event("task-started")).await.unwrap();
                        ws.close(None).await.unwrap();
                        break;
                    }
                    ("run-task", ServerScript::DropAfterStart) => {
                        ws.send(event("task-started")).await.unwrap();
                        drop(ws);
                        return received;
                    }
                    ("run-task", _) => ws.send(event("task-started")).await.unwrap(),
                    ("finish-task", ServerScript::FinishWithoutAudio) => {
                        ws.send(event("task-finished")).await.unwrap();
                        break;
                    }
                    ("finish-task", _) => {
                        ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
                        ws.send(event("result-generated")).await.unwrap();
                        ws.send(Message::Binary(vec![4, 5])).await.unwrap();
                        ws.send(event("task-finished")).await.unwrap();
                        break;
                    }
                    _ => {}
                }
            }
            received
        });

        (url, handle)
    }

    fn synthesizer_for(url: String) -> DashScopeSynthesizer {
        let endpoints = EndpointSettings {
            websocket_url: url,
            ..EndpointSettings::default()
        };
        DashScopeSynthesizer::new(DashScopeConfig::new("sk-test".to_string(), &endpoints))
    }

    #[tokio::test]
    async fn test_synthesize_collects_binary_frames() {
        let (url, server) = spawn_server(ServerScript::Succeed).await;

        let audio = synthesizer_for(url)
            .synthesize(&sample_request())
            .await
            .unwrap();

        assert_eq!(audio.data, vec![1, 2, 3, 4, 5]);
        assert!(audio.request_id.is_some());

        let received = server.await.unwrap();
        let actions: Vec<&str> = received
            .iter()
            .map(|v| v["header"]["action"].as_str().unwrap())
            .collect();
        assert_eq!(actions, vec!["run-task", "continue-task", "finish-task"]);
        assert_eq!(received[1]["payload"]["input"]["text"], "Hello there");
    }

    #[tokio::test]
    async fn test_task_failed_is_api_error() {
        let (url, server) = spawn_server(ServerScript::FailTask).await;

        let result = synthesizer_for(url).synthesize(&sample_request()).await;

        assert!(matches!(
            result,
            Err(ProviderError::Api { ref code, .. }) if code == "InvalidParameter"
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_finished_without_audio_is_malformed() {
        let (url, server) = spawn_server(ServerScript::FinishWithoutAudio).await;

        let result = synthesizer_for(url).synthesize(&sample_request()).await;

        assert!(matches!(result, Err(ProviderError::Malformed(_))));
        let received = server.await.unwrap();
        assert_eq!(received.len(), 3);
    }

    /// A request timeout far longer than the test allows, so a hang shows up
    /// as a test failure rather than as a timeout error.
    async fn synthesize_expecting_prompt_failure(url: String) -> ProviderError {
        let endpoints = EndpointSettings {
            websocket_url: url,
            request_timeout_secs: 300,
            ..EndpointSettings::default()
        };
        let synthesizer =
            DashScopeSynthesizer::new(DashScopeConfig::new("sk-test".to_string(), &endpoints));

        tokio::time::timeout(
            Duration::from_secs(10),
            synthesizer.synthesize(&sample_request()),
        )
        .await
        .expect("synthesis should fail without waiting for the request timeout")
        .unwrap_err()
    }

    #[tokio::test]
    async fn test_close_before_finish_is_transport_error() {
        let (url, server) = spawn_server(ServerScript::CloseAfterStart).await;

        let error = synthesize_expecting_prompt_failure(url).await;

        assert!(matches!(error, ProviderError::Transport(_)), "{error:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_connection_is_transport_error() {
        let (url, server) = spawn_server(ServerScript::DropAfterStart).await;

        let error = synthesize_expecting_prompt_failure(url).await;

        assert!(matches!(error, ProviderError::Transport(_)), "{error:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/", listener.local_addr().unwrap());
        drop(listener);

        let result = synthesizer_for(url).synthesize(&sample_request()).await;

        assert!(matches!(result, Err(ProviderError::Transport(_))));
    }
}
