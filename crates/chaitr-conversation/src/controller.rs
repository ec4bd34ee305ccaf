use chaitr_client::ChatBackend;
use chaitr_config::{AppConfig, ConnectionSettings};
use chaitr_core::{Author, ChaitrError, Message, Result, BACKEND_UNREACHABLE_NOTICE, SETTINGS_MISSING_NOTICE};
use chaitr_storage::{KeyValueStore, StoredValue};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// How a single `submit` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Replied,
    ServerError,
    TransportFailure,
    Misconfigured,
}

/// Drives the send/receive cycle and keeps the history slot in sync
pub struct ConversationController {
    history: StoredValue<Vec<Message>>,
    settings: StoredValue<ConnectionSettings>,
    backend: Arc<dyn ChatBackend>,
    messages: RwLock<Vec<Message>>,
    typing: watch::Sender<bool>,
    in_flight: Mutex<()>,
    user: Author,
    assistant: Author,
}

/// Clears the typing indicator however the exchange ends.
struct TypingGuard<'a>(&'a watch::Sender<bool>);

impl<'a> TypingGuard<'a> {
    fn start(typing: &'a watch::Sender<bool>) -> Self {
        typing.send_replace(true);
        Self(typing)
    }
}

impl Drop for TypingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl ConversationController {
    /// Open the history and settings slots and wait for both to load
    pub async fn open(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn ChatBackend>,
        config: &AppConfig,
    ) -> Self {
        let history = StoredValue::open(
            Arc::clone(&store),
            &config.storage.history_key,
            Some(Vec::new()),
        );
        let settings = StoredValue::open(store, &config.storage.settings_key, None);

        history.loaded().await;
        settings.loaded().await;

        let messages = history.value().unwrap_or_default();
        info!("Loaded conversation with {} messages", messages.len());

        let (typing, _) = watch::channel(false);

        Self {
            history,
            settings,
            backend,
            messages: RwLock::new(messages),
            typing,
            in_flight: Mutex::new(()),
            user: Author::user(&config.client.user_name),
            assistant: Author::assistant(&config.client.assistant_name),
        }
    }

    /// Send `text` and reconcile whatever comes back into the history.
    ///
    /// Calls on the same controller run one at a time.
    #[instrument(skip(self, text))]
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let _in_flight = self.in_flight.lock().await;

        self.append(Message::new(text, self.user.clone())).await;

        if let Err(e) = self.settings.refresh().await {
            warn!("Could not re-read connection settings: {}", e);
        }
        let settings = match self.usable_settings() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Send attempted without connection settings: {}", e);
                self.append(Message::system(SETTINGS_MISSING_NOTICE, self.assistant.clone()))
                    .await;
                return SubmitOutcome::Misconfigured;
            }
        };

        let _typing = TypingGuard::start(&self.typing);
        debug!("Sending message to {}", settings.chat_url());

        let exchange = self
            .backend
            .exchange(&settings, text)
            .await
            .and_then(|outcome| outcome.into_reply());

        let (message, outcome) = match exchange {
            Ok(reply) => (Message::new(reply, self.assistant.clone()), SubmitOutcome::Replied),
            Err(ChaitrError::ServerReported(error)) => {
                warn!("Backend reported an error: {}", error);
                (Message::system(error, self.assistant.clone()), SubmitOutcome::ServerError)
            }
            Err(e) => {
                warn!("Chat exchange failed: {}", e);
                (
                    Message::system(BACKEND_UNREACHABLE_NOTICE, self.assistant.clone()),
                    SubmitOutcome::TransportFailure,
                )
            }
        };
        self.append(message).await;

        outcome
    }

    /// Append to the in-memory list, then persist the whole list.
    ///
    /// A failed write is logged and the in-memory append stands.
    async fn append(&self, message: Message) {
        let snapshot = {
            let mut messages = self.messages.write().await;
            messages.push(message);
            messages.clone()
        };

        if let Err(e) = self.history.save(snapshot).await {
            warn!("Failed to persist conversation history: {}", e);
        }
    }

    /// Messages in insertion order.
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    /// Messages in render order.
    pub async fn messages_newest_first(&self) -> Vec<Message> {
        let mut messages = self.messages().await;
        messages.reverse();
        messages
    }

    pub fn is_typing(&self) -> bool {
        *self.typing.borrow()
    }

    pub fn typing(&self) -> watch::Receiver<bool> {
        self.typing.subscribe()
    }

    fn usable_settings(&self) -> Result<ConnectionSettings> {
        match self.settings.value() {
            Some(settings) if settings.is_complete() => Ok(settings),
            _ => Err(ChaitrError::ConfigurationMissing),
        }
    }

    /// Blocking banner to show while no usable settings are stored
    pub fn configuration_banner(&self) -> Option<&'static str> {
        self.usable_settings().err().map(|_| SETTINGS_MISSING_NOTICE)
    }

    /// Pick up settings saved through another handle.
    pub async fn refresh_settings(&self) -> Result<()> {
        self.settings.refresh().await
    }

    /// Replace the stored history with an empty one.
    pub async fn clear_history(&self) -> Result<()> {
        let _in_flight = self.in_flight.lock().await;

        self.history.save(Vec::new()).await?;
        self.messages.write().await.clear();
        info!("Cleared conversation history");
        Ok(())
    }
}
