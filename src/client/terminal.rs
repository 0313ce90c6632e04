use crate::client::format::{RenderedMessage, Segment};
use crate::client::session::{ConnectionState, ReplySource, SessionController, SubmitOutcome};
use crate::client::transport::{HttpTransport, RelayTransport};
use crate::config::ClientConfig;
use crate::errors::Error;
use async_trait::async_trait;
use colored::*;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

const UNLOAD_GRACE: Duration = Duration::from_secs(2);

/// One thing the person chatting did at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Line(String),
    /// `/quit`, Ctrl-C, Ctrl-D or a closed terminal
    Quit,
}

/// Where typed lines come from
#[async_trait]
trait LineSource: Send + Sync {
    async fn next_entry(&self) -> Entry;

    /// Resolves when the person asks to leave while a reply is pending
    async fn interrupted(&self);
}

/// Interactive `dialoguer` prompt on the controlling terminal
struct Prompt;

#[async_trait]
impl LineSource for Prompt {
    async fn next_entry(&self) -> Entry {
        tokio::select! {
            read = read_prompt() => match read {
                Ok(Ok(line)) => Entry::Line(line),
                Ok(Err(e)) => {
                    debug!("Prompt closed: {}", e);
                    Entry::Quit
                }
                Err(_) => Entry::Quit,
            },
            _ = self.interrupted() => Entry::Quit,
        }
    }

    async fn interrupted(&self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            debug!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Reads one line on a plain thread so a pending read never holds up exit
fn read_prompt() -> oneshot::Receiver<Result<String, dialoguer::Error>> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let line = Input::<String>::new()
            .with_prompt("You".cyan().bold().to_string())
            .allow_empty(true)
            .interact_text();
        let _ = tx.send(line);
    });
    rx
}

/// Runs an interactive chat session in the terminal until the user quits
///
/// When `transcript` is set, the displayed conversation is written there as
/// HTML on exit.
pub async fn run_chat(config: ClientConfig, transcript: Option<&Path>) -> Result<(), Error> {
    let relay_url = config.relay_url.clone();
    let transport = HttpTransport::new(&relay_url)?;
    let controller = SessionController::new(Arc::new(transport), config);

    if !connect(&controller).await {
        return Err(Error::Unreachable(relay_url));
    }
    println!(
        "{} {}",
        "Connected.".green().bold(),
        "Type /quit to leave.".dimmed()
    );

    drive(&controller, &Prompt, transcript).await
}

/// Chats until the source quits, then always hands the conversation over
/// for logging and writes the transcript
async fn drive<T, S>(
    controller: &SessionController<T>,
    lines: &S,
    transcript: Option<&Path>,
) -> Result<(), Error>
where
    T: RelayTransport + 'static,
    S: LineSource,
{
    let shown = chat_loop(controller, lines).await;

    if tokio::time::timeout(UNLOAD_GRACE, controller.on_unload())
        .await
        .is_err()
    {
        debug!("Conversation log still pending at exit");
    }
    if let Some(path) = transcript {
        tokio::fs::write(path, transcript_html(controller.session_id(), &shown)).await?;
        println!("{} {}", "Transcript saved to".dimmed(), path.display());
    }
    println!("{}", "Bye!".dimmed());
    Ok(())
}

async fn chat_loop<T, S>(controller: &SessionController<T>, lines: &S) -> Vec<RenderedMessage>
where
    T: RelayTransport + 'static,
    S: LineSource,
{
    let mut shown = Vec::new();
    loop {
        let line = match lines.next_entry().await {
            Entry::Line(line) => line,
            Entry::Quit => break,
        };
        let trimmed = line.trim();
        if trimmed == "/quit" || trimmed == "/exit" {
            break;
        }
        if trimmed.is_empty() {
            continue;
        }

        let spinner = spinner("Thinking...");
        let outcome = tokio::select! {
            outcome = controller.submit(&line) => Some(outcome),
            _ = lines.interrupted() => None,
        };
        spinner.finish_and_clear();

        match outcome {
            None => {
                debug!("Interrupted while waiting for a reply");
                break;
            }
            Some(SubmitOutcome::Ignored) => continue,
            Some(SubmitOutcome::Replied(reply)) => {
                let rendered = controller.render(&reply.content, false);
                print_reply(&rendered, &reply.source);
                shown.push(controller.render(trimmed, true));
                shown.push(rendered);
            }
        }
    }
    shown
}

fn transcript_html(session_id: &str, messages: &[RenderedMessage]) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n",
        session_id
    );
    for message in messages {
        html.push_str(&message.to_html());
        html.push('\n');
    }
    html.push_str("</body>\n</html>\n");
    html
}

async fn connect<T: RelayTransport + 'static>(controller: &SessionController<T>) -> bool {
    let spinner = spinner("Connecting to relay...");
    let state = controller.check_connectivity().await;
    match state {
        ConnectionState::Connected => {
            spinner.finish_and_clear();
            true
        }
        ConnectionState::Connecting | ConnectionState::Error => {
            spinner.finish_with_message("Could not reach the relay.".red().to_string());
            false
        }
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_reply(rendered: &RenderedMessage, source: &ReplySource) {
    let mut line = String::new();
    for segment in &rendered.segments {
        let piece = match segment {
            Segment::Text(text) => match source {
                ReplySource::Relay => text.normal(),
                ReplySource::Fallback(_) | ReplySource::Offline => text.dimmed(),
            },
            Segment::Link(url) => url.blue().underline(),
        };
        line.push_str(&piece.to_string());
    }
    println!("{} {}", "Aria:".magenta().bold(), line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::TransportError;
    use crate::llm::ChatMessage;
    use crate::protocol::{ChatRequest, ChatResponse, ChatSuccess, ConversationEnd};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Lines typed in advance; input closes once they run out
    struct Scripted {
        lines: Mutex<VecDeque<&'static str>>,
        interrupt: bool,
    }

    impl Scripted {
        fn new(lines: &[&'static str]) -> Self {
            Scripted {
                lines: Mutex::new(lines.iter().copied().collect()),
                interrupt: false,
            }
        }
    }

    #[async_trait]
    impl LineSource for Scripted {
        async fn next_entry(&self) -> Entry {
            match self.lines.lock().unwrap().pop_front() {
                Some(line) => Entry::Line(line.to_string()),
                None => Entry::Quit,
            }
        }

        async fn interrupted(&self) {
            if !self.interrupt {
                std::future::pending::<()>().await;
            }
        }
    }

    #[derive(Debug, Default)]
    struct StubRelay {
        stalls: bool,
        ended: Mutex<Vec<ConversationEnd>>,
    }

    #[async_trait]
    impl RelayTransport for StubRelay {
        async fn ping(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send_chat(&self, _: &ChatRequest) -> Result<ChatResponse, TransportError> {
            if self.stalls {
                std::future::pending::<()>().await;
            }
            Ok(ChatResponse::Success(ChatSuccess {
                success: true,
                content: "hi back".into(),
                usage: None,
                timestamp: "now".into(),
            }))
        }

        async fn end_conversation(
            &self,
            conversation: &ConversationEnd,
        ) -> Result<(), TransportError> {
            self.ended.lock().unwrap().push(conversation.clone());
            Ok(())
        }
    }

    fn controller(relay: StubRelay) -> (Arc<StubRelay>, SessionController<StubRelay>) {
        let relay = Arc::new(relay);
        let config = ClientConfig {
            relay_url: "http://localhost:3000".into(),
            temperature: 0.7,
            max_connect_attempts: 1,
            retry_delay: Duration::from_millis(1),
            history_window: 10,
        };
        (relay.clone(), SessionController::new(relay, config))
    }

    #[test]
    fn transcript_wraps_each_message() {
        let messages = vec![
            RenderedMessage::new("hi", true),
            RenderedMessage::new("see https://example.com", false),
        ];
        let html = transcript_html("session_1_abcdefghi", &messages);
        assert!(html.contains("<title>session_1_abcdefghi</title>"));
        assert!(html.contains("<div class=\"message user\">hi</div>"));
        assert!(html.contains("rel=\"noopener noreferrer\""));
    }

    #[tokio::test]
    async fn quit_command_stops_reading_and_logs_the_conversation() {
        let (relay, controller) = controller(StubRelay::default());
        let lines = Scripted::new(&["hello", "  ", "/quit", "never sent"]);
        let path = std::env::temp_dir().join(format!("{}.html", controller.session_id()));

        drive(&controller, &lines, Some(&path)).await.unwrap();

        let ended = relay.ended.lock().unwrap();
        assert_eq!(ended.len(), 1);
        assert_eq!(
            ended[0].messages,
            vec![ChatMessage::user("hello"), ChatMessage::assistant("hi back")]
        );
        assert_eq!(lines.lines.lock().unwrap().len(), 1);

        let html = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(html.contains("hi back"));
    }

    #[tokio::test]
    async fn closed_input_still_logs_the_conversation() {
        let (relay, controller) = controller(StubRelay::default());
        drive(&controller, &Scripted::new(&["hello"]), None)
            .await
            .unwrap();

        let ended = relay.ended.lock().unwrap();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn interrupt_during_a_pending_reply_still_logs_the_conversation() {
        let (relay, controller) = controller(StubRelay {
            stalls: true,
            ..StubRelay::default()
        });
        let lines = Scripted {
            interrupt: true,
            ..Scripted::new(&["hello", "again"])
        };

        drive(&controller, &lines, None).await.unwrap();

        let ended = relay.ended.lock().unwrap();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].messages, vec![ChatMessage::user("hello")]);
        assert_eq!(lines.lines.lock().unwrap().len(), 1);
    }
}
