//! WebSocket client helpers built on tokio-tungstenite.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long helpers wait for an expected frame.
pub const FRAME_WAIT: Duration = Duration::from_secs(3);

pub async fn connect(url: &str) -> Client {
    let (client, _) = connect_async(url).await.unwrap();
    client
}

/// Status code of a rejected handshake.
pub async fn connect_status(url: &str) -> u16 {
    match connect_async(url).await {
        Ok(_) => 101,
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => response.status().as_u16(),
        Err(e) => panic!("unexpected handshake error: {:?}", e),
    }
}

pub async fn send_text(client: &mut Client, text: &str) {
    client.send(Message::text(text.to_string())).await.unwrap();
}

pub async fn send_message(client: &mut Client, message: &str) {
    let frame = serde_json::json!({ "message": message }).to_string();
    send_text(client, &frame).await;
}

/// Next text frame as JSON within `within`, skipping control frames.
pub async fn next_json_within(client: &mut Client, within: Duration) -> Option<serde_json::Value> {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        let next = tokio::time::timeout_at(deadline, client.next()).await.ok()??;
        match next.ok()? {
            Message::Text(text) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

pub async fn next_json(client: &mut Client) -> serde_json::Value {
    next_json_within(client, FRAME_WAIT)
        .await
        .expect("expected a text frame")
}

/// Whether the server ends the connection within `within`.
pub async fn closed_within(client: &mut Client, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        match tokio::time::timeout_at(deadline, client.next()).await {
            Err(_) => return false,
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(_))) => continue,
        }
    }
}

/// Read frames for `duration`, counting pings.
pub async fn count_pings_for(client: &mut Client, duration: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + duration;
    let mut pings = 0;
    while let Ok(Some(Ok(frame))) = tokio::time::timeout_at(deadline, client.next()).await {
        if matches!(frame, Message::Ping(_)) {
            pings += 1;
        }
    }
    pings
}
