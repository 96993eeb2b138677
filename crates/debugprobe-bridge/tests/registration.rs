//! End-to-end registration handshake against a bare-bones in-process
//! Hub stand-in, using a local `TcpListener` accept loop to stand in
//! for the Hub's WebSocket server.

use debugprobe_bridge::{BridgeClient, BridgeConfig};
use debugprobe_kernel::Kernel;
use debugprobe_types::{BridgeEnvelope, DeviceInfo, FrameType};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

async fn spawn_accepting_hub(
    accept_registration: bool,
) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let msg = ws.next().await.unwrap().unwrap();
        let text = msg.into_text().unwrap();
        let envelope: BridgeEnvelope = serde_json::from_str(&text).unwrap();
        assert!(matches!(envelope.frame, FrameType::RegisterDevice(_)));

        let reply = if accept_registration {
            BridgeEnvelope::new(FrameType::RegisterAck { reason: None })
        } else {
            BridgeEnvelope::new(FrameType::RegisterReject {
                reason: Some("bad token".to_string()),
            })
        };
        ws.send(Message::Text(serde_json::to_string(&reply).unwrap().into()))
            .await
            .unwrap();

        // keep the socket open briefly so the client has time to observe
        // the registered state before we drop it.
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    (format!("127.0.0.1:{}", addr.port()), handle)
}

#[tokio::test]
async fn registers_successfully_against_an_accepting_hub() {
    let (addr, hub) = spawn_accepting_hub(true).await;
    let (host, port) = addr.split_once(':').unwrap();

    let config = BridgeConfig {
        host: host.to_string(),
        port: port.parse().unwrap(),
        path: "/".to_string(),
        token: "secret".to_string(),
        ..Default::default()
    };

    let kernel = Arc::new(Kernel::new());
    let device = DeviceInfo::new("dev-1", "model", "os", "1.0", "app", "1.0");
    let client = BridgeClient::new(config, kernel, device, Vec::new()).unwrap();

    let client = Arc::new(client);
    let runner = {
        let client = client.clone();
        tokio::spawn(async move { client.run().await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.state(), debugprobe_bridge::ConnectionState::Registered);

    client.stop();
    let _ = tokio::time::timeout(Duration::from_secs(2), runner).await;
    hub.await.unwrap();
}

#[tokio::test]
async fn a_rejection_moves_to_failed_and_does_not_retry() {
    let (addr, hub) = spawn_accepting_hub(false).await;
    let (host, port) = addr.split_once(':').unwrap();

    let config = BridgeConfig {
        host: host.to_string(),
        port: port.parse().unwrap(),
        path: "/".to_string(),
        token: "secret".to_string(),
        ..Default::default()
    };

    let kernel = Arc::new(Kernel::new());
    let device = DeviceInfo::new("dev-1", "model", "os", "1.0", "app", "1.0");
    let client = Arc::new(BridgeClient::new(config, kernel, device, Vec::new()).unwrap());

    let runner = {
        let client = client.clone();
        tokio::spawn(async move { client.run().await })
    };

    let _ = tokio::time::timeout(Duration::from_secs(2), runner).await;
    assert_eq!(client.state(), debugprobe_bridge::ConnectionState::Failed);
    hub.await.unwrap();
}
