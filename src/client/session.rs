use crate::client::format::RenderedMessage;
use crate::client::transport::RelayTransport;
use crate::config::ClientConfig;
use crate::constants::{CLIENT_FALLBACKS, HISTORY_WINDOW, OFFLINE_MESSAGE};
use crate::errors::ErrorKind;
use crate::llm::ChatMessage;
use crate::protocol::{ChatRequest, ChatResponse, ConversationEnd};
use crate::relay::pick_fallback;
use crate::utils::recent_messages;
use chrono::Utc;
use rand::distr::{Distribution, Uniform};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Reachability of the relay as seen by one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    /// Connection attempts exhausted; only an explicit new check leaves this state
    Error,
}

/// Where the text of a reply came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplySource {
    Relay,
    /// The relay answered with a failure of this kind
    Fallback(ErrorKind),
    /// The relay could not be reached at all
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub source: ReplySource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty text, or another submission was still in flight
    Ignored,
    Replied(Reply),
}

/// Drives one chat session against the relay
#[derive(Debug)]
pub struct SessionController<T> {
    transport: Arc<T>,
    config: ClientConfig,
    session_id: String,
    history: Mutex<Vec<ChatMessage>>,
    state: Mutex<ConnectionState>,
    busy: AtomicBool,
}

/// Clears the in-flight flag however the submission ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("Session lock poisoned, recovering...");
        poisoned.into_inner()
    })
}

/// Generates `session_<unix-millis>_<9 lowercase alphanumerics>`
pub fn new_session_id() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    let suffix: String = match Uniform::new(0, ALPHABET.len()) {
        Ok(dist) => dist
            .sample_iter(&mut rng)
            .take(9)
            .map(|i| ALPHABET[i] as char)
            .collect(),
        Err(_) => "000000000".to_string(),
    };
    format!("session_{}_{}", Utc::now().timestamp_millis(), suffix)
}

impl<T: RelayTransport + 'static> SessionController<T> {
    /// Creates a controller; a history window above `HISTORY_WINDOW` is capped
    pub fn new(transport: Arc<T>, mut config: ClientConfig) -> Self {
        if config.history_window > HISTORY_WINDOW {
            warn!(
                "History window {} capped at {}",
                config.history_window, HISTORY_WINDOW
            );
            config.history_window = HISTORY_WINDOW;
        }
        let session_id = new_session_id();
        info!("Starting chat session {}", session_id);
        SessionController {
            transport,
            config,
            session_id,
            history: Mutex::new(Vec::new()),
            state: Mutex::new(ConnectionState::Connecting),
            busy: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn connection_state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    #[cfg(test)]
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        lock(&self.history).clone()
    }

    /// Pings the relay until it answers or the attempt ceiling is reached
    ///
    /// Once connected the state stays connected. Exhausting the attempts
    /// leaves the session in `Error` without scheduling further attempts.
    pub async fn check_connectivity(&self) -> ConnectionState {
        if self.connection_state() == ConnectionState::Connected {
            return ConnectionState::Connected;
        }
        *lock(&self.state) = ConnectionState::Connecting;

        let max_attempts = self.config.max_connect_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.transport.ping().await {
                Ok(()) => {
                    info!("Relay reachable after {} attempt(s)", attempt);
                    *lock(&self.state) = ConnectionState::Connected;
                    return ConnectionState::Connected;
                }
                Err(e) => {
                    warn!("Relay ping {}/{} failed: {}", attempt, max_attempts, e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        *lock(&self.state) = ConnectionState::Error;
        ConnectionState::Error
    }

    /// Sends `text` to the relay and records the reply
    ///
    /// Blank text, or a call made while another submission is in flight,
    /// is ignored. Every other outcome appends both the user message and
    /// the shown reply to the history.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Submission ignored, another one is in flight");
            return SubmitOutcome::Ignored;
        }
        let _in_flight = InFlight(&self.busy);

        let request = {
            let mut history = lock(&self.history);
            history.push(ChatMessage::user(text));
            ChatRequest {
                messages: recent_messages(&history, self.config.history_window),
                temperature: Some(self.config.temperature),
                session_id: Some(self.session_id.clone()),
            }
        };

        let reply = match self.transport.send_chat(&request).await {
            Ok(ChatResponse::Success(success)) => Reply {
                content: success.content,
                source: ReplySource::Relay,
            },
            Ok(ChatResponse::Failure(failure)) => {
                warn!("Relay failure {}: {}", failure.code, failure.error);
                let content = failure
                    .fallback
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or_else(|| pick_fallback(CLIENT_FALLBACKS, None).to_string());
                Reply {
                    content,
                    source: ReplySource::Fallback(failure.code),
                }
            }
            Err(e) => {
                warn!("Relay unreachable: {}", e);
                Reply {
                    content: OFFLINE_MESSAGE.to_string(),
                    source: ReplySource::Offline,
                }
            }
        };

        lock(&self.history).push(ChatMessage::assistant(&reply.content));
        SubmitOutcome::Replied(reply)
    }

    /// Prepares `content` for display
    pub fn render(&self, content: &str, from_user: bool) -> RenderedMessage {
        RenderedMessage::new(content, from_user)
    }

    /// Sends the full history for logging without waiting for the result
    ///
    /// Failures are swallowed; the returned handle may be awaited or dropped.
    pub fn on_unload(&self) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let conversation = ConversationEnd {
            messages: self.history(),
            session_id: self.session_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
        };
        tokio::spawn(async move {
            if let Err(e) = transport.end_conversation(&conversation).await {
                debug!("Conversation log not delivered: {}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::TransportError;
    use crate::llm::Role;
    use crate::protocol::{ChatFailure, ChatSuccess};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Debug)]
    enum Script {
        Succeed,
        Fail(Option<String>),
        Unreachable,
    }

    #[derive(Debug)]
    struct StubTransport {
        ping_failures: u32,
        pings: AtomicU32,
        script: Script,
        gate: Option<Arc<Notify>>,
        sent: Mutex<Vec<ChatRequest>>,
        ended: Mutex<Vec<ConversationEnd>>,
    }

    impl StubTransport {
        fn new(script: Script) -> Self {
            StubTransport {
                ping_failures: 0,
                pings: AtomicU32::new(0),
                script,
                gate: None,
                sent: Mutex::new(Vec::new()),
                ended: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RelayTransport for StubTransport {
        async fn ping(&self) -> Result<(), TransportError> {
            let n = self.pings.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.ping_failures {
                Err(TransportError::Status(502))
            } else {
                Ok(())
            }
        }

        async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.script {
                Script::Succeed => Ok(ChatResponse::Success(ChatSuccess {
                    success: true,
                    content: "hello from relay".into(),
                    usage: None,
                    timestamp: "now".into(),
                })),
                Script::Fail(fallback) => Ok(ChatResponse::Failure(ChatFailure {
                    success: false,
                    error: "Too many requests".into(),
                    code: ErrorKind::RateLimited,
                    fallback: fallback.clone(),
                })),
                Script::Unreachable => Err(TransportError::Status(0)),
            }
        }

        async fn end_conversation(
            &self,
            conversation: &ConversationEnd,
        ) -> Result<(), TransportError> {
            self.ended.lock().unwrap().push(conversation.clone());
            Err(TransportError::Status(500))
        }
    }

    fn config(attempts: u32) -> ClientConfig {
        ClientConfig {
            relay_url: "http://localhost:3000".into(),
            temperature: 0.7,
            max_connect_attempts: attempts,
            retry_delay: Duration::from_millis(1),
            history_window: 10,
        }
    }

    fn controller(transport: StubTransport) -> (Arc<StubTransport>, SessionController<StubTransport>) {
        let transport = Arc::new(transport);
        let controller = SessionController::new(transport.clone(), config(5));
        (transport, controller)
    }

    #[test]
    fn session_ids_have_timestamp_and_suffix() {
        let id = new_session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn connects_after_transient_ping_failures() {
        let transport = Arc::new(StubTransport {
            ping_failures: 2,
            ..StubTransport::new(Script::Succeed)
        });
        let controller = SessionController::new(transport.clone(), config(5));
        assert_eq!(controller.connection_state(), ConnectionState::Connecting);
        assert_eq!(controller.check_connectivity().await, ConnectionState::Connected);
        assert_eq!(transport.pings.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_attempt_ceiling() {
        let transport = Arc::new(StubTransport {
            ping_failures: u32::MAX,
            ..StubTransport::new(Script::Succeed)
        });
        let controller = SessionController::new(transport.clone(), config(3));
        assert_eq!(controller.check_connectivity().await, ConnectionState::Error);
        assert_eq!(transport.pings.load(Ordering::SeqCst), 3);
        assert_eq!(controller.connection_state(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn connected_state_survives_failed_chat_calls() {
        let (transport, controller) = controller(StubTransport::new(Script::Unreachable));
        controller.check_connectivity().await;
        controller.submit("hello").await;
        assert_eq!(controller.connection_state(), ConnectionState::Connected);
        assert_eq!(controller.check_connectivity().await, ConnectionState::Connected);
        assert_eq!(transport.pings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_text_is_a_no_op() {
        let (transport, controller) = controller(StubTransport::new(Script::Succeed));
        assert_eq!(controller.submit("   \n\t").await, SubmitOutcome::Ignored);
        assert_eq!(controller.submit("").await, SubmitOutcome::Ignored);
        assert!(controller.history().is_empty());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_reply_is_recorded() {
        let (transport, controller) = controller(StubTransport::new(Script::Succeed));
        let outcome = controller.submit("  hi there ").await;
        assert_eq!(
            outcome,
            SubmitOutcome::Replied(Reply {
                content: "hello from relay".into(),
                source: ReplySource::Relay,
            })
        );
        let history = controller.history();
        assert_eq!(history[0], ChatMessage::user("hi there"));
        assert_eq!(history[1], ChatMessage::assistant("hello from relay"));
        assert!(!controller.is_busy());

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].session_id.as_deref(), Some(controller.session_id()));
    }

    #[tokio::test]
    async fn only_the_last_ten_messages_are_sent() {
        let (transport, controller) = controller(StubTransport::new(Script::Succeed));
        for i in 0..6 {
            controller.submit(&format!("message {}", i)).await;
        }
        assert_eq!(controller.history().len(), 12);

        controller.submit("one more").await;
        let sent = transport.sent.lock().unwrap();
        let last = sent.last().unwrap();
        assert_eq!(last.messages.len(), 10);
        assert_eq!(last.messages.last().unwrap(), &ChatMessage::user("one more"));
        assert_eq!(last.messages[0], ChatMessage::assistant("hello from relay"));
        assert_eq!(last.messages[1], ChatMessage::user("message 2"));
        assert!(sent.iter().all(|r| r.messages.len() <= 10));
    }

    #[tokio::test]
    async fn oversized_history_window_is_capped() {
        let transport = Arc::new(StubTransport::new(Script::Succeed));
        let controller = SessionController::new(
            transport.clone(),
            ClientConfig {
                history_window: 50,
                ..config(5)
            },
        );
        for i in 0..8 {
            controller.submit(&format!("message {}", i)).await;
        }
        assert_eq!(controller.history().len(), 16);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.last().unwrap().messages.len(), HISTORY_WINDOW);
    }

    #[tokio::test]
    async fn relay_fallback_is_shown_and_recorded() {
        let (_, controller) = controller(StubTransport::new(Script::Fail(Some(
            "Let me catch my breath.".into(),
        ))));
        let outcome = controller.submit("hello").await;
        assert_eq!(
            outcome,
            SubmitOutcome::Replied(Reply {
                content: "Let me catch my breath.".into(),
                source: ReplySource::Fallback(ErrorKind::RateLimited),
            })
        );
        let last = controller.history().pop().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Let me catch my breath.");
    }

    #[tokio::test]
    async fn local_fallback_used_when_relay_gives_none() {
        let (_, controller) = controller(StubTransport::new(Script::Fail(None)));
        match controller.submit("hello").await {
            SubmitOutcome::Replied(reply) => {
                assert!(CLIENT_FALLBACKS.contains(&reply.content.as_str()));
            }
            SubmitOutcome::Ignored => panic!("submission should not be ignored"),
        }
    }

    #[tokio::test]
    async fn unreachable_relay_shows_offline_message() {
        let (_, controller) = controller(StubTransport::new(Script::Unreachable));
        match controller.submit("hello").await {
            SubmitOutcome::Replied(reply) => {
                assert_eq!(reply.content, OFFLINE_MESSAGE);
                assert_eq!(reply.source, ReplySource::Offline);
            }
            SubmitOutcome::Ignored => panic!("submission should not be ignored"),
        }
        assert_eq!(controller.history().len(), 2);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_ignored() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(StubTransport {
            gate: Some(gate.clone()),
            ..StubTransport::new(Script::Succeed)
        });
        let controller = Arc::new(SessionController::new(transport.clone(), config(5)));

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit("first").await })
        };
        while !controller.is_busy() {
            tokio::task::yield_now().await;
        }

        assert_eq!(controller.submit("second").await, SubmitOutcome::Ignored);

        gate.notify_one();
        assert!(matches!(first.await.unwrap(), SubmitOutcome::Replied(_)));
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
        assert!(!controller.is_busy());
        assert_eq!(controller.history().len(), 2);
    }

    #[tokio::test]
    async fn unload_sends_full_history_and_swallows_failure() {
        let (transport, controller) = controller(StubTransport::new(Script::Succeed));
        for i in 0..7 {
            controller.submit(&format!("message {}", i)).await;
        }
        controller.on_unload().await.unwrap();

        let ended = transport.ended.lock().unwrap();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].messages.len(), 14);
        assert_eq!(ended[0].session_id, controller.session_id());
    }

    #[test]
    fn render_delegates_to_formatter() {
        let transport = Arc::new(StubTransport::new(Script::Succeed));
        let controller = SessionController::new(transport, config(1));
        let rendered = controller.render("see https://example.com", true);
        assert!(rendered.from_user);
        assert_eq!(rendered.segments.len(), 2);
    }
}
