/**
 * Connection Session
 *
 * Lifecycle of one upgraded WebSocket connection, bound to a `(from, to)`
 * pair:
 *
 * ```text
 * Connecting ──▶ Upgraded ──▶ Active ──▶ Closing ──▶ Closed
 * ```
 *
 * `Connecting` is the HTTP handler's validation step (see
 * `handlers::upgrade`). Everything after the upgrade lives here.
 *
 * # Tasks
 *
 * Each session runs two tasks sharing one cancellation token:
 *
 * - **Read loop** - sliding read deadline, decodes `{"message"}` frames,
 *   persists them, hands them to the router on a detached task and writes the
 *   ack back to the sender.
 * - **Write loop** - keepalive pings (with a directory refresh on every tick)
 *   and pushes from the user's local channel.
 *
 * Writes from both tasks go through a mutex-guarded sink and are bounded by
 * the write deadline.
 *
 * # Cancellation
 *
 * The session token is a child of the server-wide shutdown token, never of
 * the upgrade request. Whichever loop finishes first cancels it, and the other
 * loop exits on the next select.
 *
 * # Teardown
 *
 * The local channel entry is released only if it still belongs to this
 * session, and the directory entry is forgotten only in that case and only
 * while it still names this backend, so a superseded session never removes
 * its replacement here or on another node.
 *
 * Directory writes are bounded by the write deadline and race the session
 * token, so a stalled store never holds a loop open past cancellation.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::backend::realtime::LocalChannelReceiver;
use crate::backend::server::state::AppState;
use crate::shared::{Ack, InboundFrame, UserId};

type SharedSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Close code for a normal closure.
const CLOSE_NORMAL: u16 = 1000;

/// Close code sent when the server is going away.
const CLOSE_GOING_AWAY: u16 = 1001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Upgraded,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    /// Whether `next` directly follows `self` in the lifecycle.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Connecting, SessionState::Upgraded)
                | (SessionState::Upgraded, SessionState::Active)
                | (SessionState::Upgraded, SessionState::Closing)
                | (SessionState::Active, SessionState::Closing)
                | (SessionState::Closing, SessionState::Closed)
        )
    }
}

/// Why the read loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReadEnd {
    /// Peer sent a close frame or ended the stream
    PeerClosed,
    /// No frame within the read deadline
    DeadlineExpired,
    /// Transport failure
    Failed(String),
    /// Session cancelled from elsewhere
    Cancelled,
}

/// Why the write loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteEnd {
    Cancelled,
    /// The local channel was detached (replaced by a newer connection)
    Superseded,
    Failed(String),
}

/// Timings copied out of configuration for one session.
#[derive(Debug, Clone, Copy)]
struct Timings {
    ping_period: Duration,
    read_wait: Duration,
    write_wait: Duration,
    directory_ttl: Duration,
}

/// One upgraded connection.
pub struct Session {
    from: UserId,
    to: UserId,
    state: SessionState,
    app: AppState,
    cancel: CancellationToken,
    timings: Timings,
}

impl Session {
    /// Create a session for a validated `(from, to)` pair whose socket has
    /// just been upgraded.
    pub fn new(app: AppState, from: UserId, to: UserId) -> Self {
        let config = &app.config;
        let timings = Timings {
            ping_period: config.ping_period(),
            read_wait: config.read_wait(),
            write_wait: config.write_wait(),
            directory_ttl: config.directory_ttl(),
        };
        let cancel = app.shutdown.child_token();

        Self {
            from,
            to,
            state: SessionState::Upgraded,
            app,
            cancel,
            timings,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn advance(&mut self, next: SessionState) {
        if !self.state.can_advance_to(next) {
            tracing::warn!(
                user_id = self.from,
                from_state = ?self.state,
                to_state = ?next,
                "[Session] Unexpected state transition"
            );
        }
        tracing::debug!(user_id = self.from, state = ?next, "[Session] State change");
        self.state = next;
    }

    /// Serve the socket until either side ends the session, then tear down.
    pub async fn run(mut self, socket: WebSocket) {
        let receiver = self.app.registry.put(self.from);
        let channel_id = receiver.id();

        announce(&self.app, self.from, self.timings, &self.cancel).await;

        self.advance(SessionState::Active);
        tracing::info!(user_id = self.from, to_user_id = self.to, "[Session] Connected");

        let (sink, stream) = socket.split();
        let sink: SharedSink = Arc::new(Mutex::new(sink));

        let writer = self.app.tasks.spawn(write_loop(
            self.app.clone(),
            self.from,
            receiver,
            sink.clone(),
            self.cancel.clone(),
            self.timings,
        ));

        let read_end = read_loop(
            &self.app,
            self.from,
            self.to,
            stream,
            sink.clone(),
            &self.cancel,
            self.timings,
        )
        .await;

        self.advance(SessionState::Closing);
        self.cancel.cancel();

        match &read_end {
            ReadEnd::PeerClosed => tracing::info!(user_id = self.from, "[Session] Closed by peer"),
            ReadEnd::Cancelled => tracing::debug!(user_id = self.from, "[Session] Read loop cancelled"),
            ReadEnd::DeadlineExpired => {
                tracing::warn!(user_id = self.from, "[Session] Read deadline expired")
            }
            ReadEnd::Failed(e) => {
                tracing::warn!(user_id = self.from, error = %e, "[Session] Unexpected read failure")
            }
        }

        let write_end = writer.await.unwrap_or_else(|e| WriteEnd::Failed(e.to_string()));
        match &write_end {
            WriteEnd::Superseded => {
                tracing::info!(user_id = self.from, "[Session] Superseded by a newer connection")
            }
            WriteEnd::Failed(e) => {
                tracing::warn!(user_id = self.from, error = %e, "[Session] Write failed")
            }
            WriteEnd::Cancelled => {}
        }

        if read_end != ReadEnd::PeerClosed {
            let code = if self.app.shutdown.is_cancelled() {
                CLOSE_GOING_AWAY
            } else {
                CLOSE_NORMAL
            };
            send_close(&sink, code, self.timings.write_wait).await;
        }

        self.teardown(channel_id).await;
    }

    /// Release the local channel and directory entry with a fresh,
    /// uncancelled context.
    async fn teardown(&mut self, channel_id: u64) {
        if self.app.registry.release(self.from, channel_id) {
            let forget = self.app.directory.forget_owned(self.from, self.app.backend_id());
            match tokio::time::timeout(self.timings.write_wait, forget).await {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => tracing::debug!(
                    user_id = self.from,
                    "[Session] Directory entry already names another backend; left in place"
                ),
                Ok(Err(e)) => {
                    tracing::warn!(user_id = self.from, error = %e, "[Session] Failed to forget directory entry")
                }
                Err(_) => {
                    tracing::warn!(user_id = self.from, "[Session] Timed out forgetting directory entry")
                }
            }
        } else {
            tracing::debug!(
                user_id = self.from,
                "[Session] Channel owned by a newer session; leaving registry and directory intact"
            );
        }

        self.advance(SessionState::Closed);
        tracing::info!(user_id = self.from, "[Session] Disconnected");
    }
}

async fn read_loop(
    app: &AppState,
    from: UserId,
    to: UserId,
    mut stream: SplitStream<WebSocket>,
    sink: SharedSink,
    cancel: &CancellationToken,
    timings: Timings,
) -> ReadEnd {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return ReadEnd::Cancelled,
            next = tokio::time::timeout(timings.read_wait, stream.next()) => next,
        };

        let message = match next {
            Err(_) => return ReadEnd::DeadlineExpired,
            Ok(None) => return ReadEnd::PeerClosed,
            Ok(Some(Err(e))) => return ReadEnd::Failed(e.to_string()),
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                if let Err(e) = handle_text(app, from, to, text.as_str(), &sink, timings.write_wait).await {
                    return ReadEnd::Failed(e);
                }
            }
            Message::Close(_) => return ReadEnd::PeerClosed,
            // Any frame refreshes the read deadline; pongs need nothing else.
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Binary(_) => {
                tracing::warn!(user_id = from, "[Session] Ignoring non-text frame");
            }
        }
    }
}

/// Persist, dispatch and acknowledge one inbound text frame.
///
/// Returns an error only when the ack could not be written.
async fn handle_text(
    app: &AppState,
    from: UserId,
    to: UserId,
    raw: &str,
    sink: &SharedSink,
    write_wait: Duration,
) -> Result<(), String> {
    let frame = match InboundFrame::decode(raw) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(user_id = from, error = %e, "[Session] Skipping malformed frame");
            return Ok(());
        }
    };

    let ack = match app.messages.create_message(from, to, &frame.message).await {
        Ok(message_id) => {
            tracing::debug!(user_id = from, to_user_id = to, message_id, "[Session] Message stored");
            dispatch(app, from, to, frame.message);
            Ack::ok()
        }
        Err(e) => {
            tracing::error!(user_id = from, to_user_id = to, error = %e, "[Session] Failed to store message");
            Ack::not_sent()
        }
    };

    write(sink, Message::Text(Utf8Bytes::from(ack.encode())), write_wait).await
}

/// Hand a stored message to the router on a detached, tracked task.
///
/// The task is scoped to server shutdown, not to this session: the sender
/// disconnecting does not abort delivery.
fn dispatch(app: &AppState, from: UserId, to: UserId, text: String) {
    let router = app.router.clone();
    let cancel = app.shutdown.clone();
    app.tasks.spawn(async move {
        router.deliver(&cancel, from, to, &text).await;
    });
}

async fn write_loop(
    app: AppState,
    user: UserId,
    mut receiver: LocalChannelReceiver,
    sink: SharedSink,
    cancel: CancellationToken,
    timings: Timings,
) -> WriteEnd {
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + timings.ping_period,
        timings.ping_period,
    );

    let end = loop {
        tokio::select! {
            _ = cancel.cancelled() => break WriteEnd::Cancelled,
            _ = ticker.tick() => {
                if let Err(e) = write(&sink, Message::Ping(Default::default()), timings.write_wait).await {
                    break WriteEnd::Failed(e);
                }
                announce(&app, user, timings, &cancel).await;
            }
            push = receiver.recv() => {
                let Some(push) = push else {
                    break WriteEnd::Superseded;
                };
                let text = match push.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(user_id = user, error = %e, "[Session] Failed to encode push");
                        continue;
                    }
                };
                if let Err(e) = write(&sink, Message::Text(Utf8Bytes::from(text)), timings.write_wait).await {
                    break WriteEnd::Failed(e);
                }
            }
        }
    };

    cancel.cancel();
    end
}

/// Announce `user` as connected here. Bounded by the write deadline and
/// abandoned on cancellation; failures only log.
async fn announce(app: &AppState, user: UserId, timings: Timings, cancel: &CancellationToken) {
    let pending = app
        .directory
        .announce(user, app.backend_id(), timings.directory_ttl);

    tokio::select! {
        _ = cancel.cancelled() => {}
        result = tokio::time::timeout(timings.write_wait, pending) => match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(user_id = user, error = %e, "[Session] Directory announce failed")
            }
            Err(_) => tracing::warn!(user_id = user, "[Session] Directory announce timed out"),
        },
    }
}

/// Write one frame, bounded by the write deadline.
async fn write(sink: &SharedSink, message: Message, write_wait: Duration) -> Result<(), String> {
    let send = async {
        let mut sink = sink.lock().await;
        sink.send(message).await
    };
    match tokio::time::timeout(write_wait, send).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("write deadline expired".to_string()),
    }
}

async fn send_close(sink: &SharedSink, code: u16, write_wait: Duration) {
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(""),
    };
    let _ = write(sink, Message::Close(Some(frame)), write_wait).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_order() {
        use SessionState::*;
        assert!(Connecting.can_advance_to(Upgraded));
        assert!(Upgraded.can_advance_to(Active));
        assert!(Active.can_advance_to(Closing));
        assert!(Closing.can_advance_to(Closed));

        assert!(!Connecting.can_advance_to(Active));
        assert!(!Closed.can_advance_to(Active));
        assert!(!Active.can_advance_to(Upgraded));
    }
}
