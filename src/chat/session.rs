//! Per-turn orchestration and conversation state.
//!
//! `ChatSession` owns the history store and the model client and drives one
//! request/response cycle at a time. A turn appends the user message, bounds
//! the history, streams the response through a renderer while accumulating
//! it, and commits the assistant message only when the stream completes. A
//! failed or interrupted turn commits nothing: the history reads as "no
//! response received".

use futures::StreamExt;

use crate::chat::config::ChatConfig;
use crate::client::ModelClient;
use crate::error::Result;
use crate::history::HistoryStore;
use crate::observability::{TURNS_ABORTED, TURNS_COMPLETED};
use crate::render::Renderer;
use crate::types::{ChatMessage, ChatRequest};

/// How a turn ended.
///
/// `Completed` always committed the assistant message; `Interrupted` never
/// did, and the partial accumulator was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream finished and the assistant message was committed.
    Completed,

    /// The user interrupted the stream; nothing was committed.
    Interrupted,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: String,

    /// The active conversation id.
    pub conversation_id: String,

    /// Number of conversations created so far.
    pub conversation_count: usize,

    /// Number of messages in the active conversation.
    pub message_count: usize,

    /// The retention bound.
    pub max_history: usize,

    /// The maximum tokens per response.
    pub max_tokens: u32,

    /// Turns that committed an assistant message.
    pub turns_completed: u64,

    /// Turns that failed or were interrupted.
    pub turns_aborted: u64,
}

/// A chat session that manages conversation state and API interactions.
///
/// The session is generic over the model client, so it cannot exist without
/// one: the "no credentials" path is a client construction error, reached
/// before any session or network call.
pub struct ChatSession<C: ModelClient> {
    client: C,
    config: ChatConfig,
    history: HistoryStore,
    turns_completed: u64,
    turns_aborted: u64,
}

impl<C: ModelClient> ChatSession<C> {
    /// Creates a new chat session with the given client and configuration.
    pub fn new(client: C, config: ChatConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            history: HistoryStore::new(),
            turns_completed: 0,
            turns_aborted: 0,
        })
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Appends the user message to the active conversation
    /// 2. Applies the retention bound
    /// 3. Streams the model response, rendering fragments as they arrive
    /// 4. Commits the complete assistant response to the conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails before or during
    /// streaming. The user message stays in history either way; the
    /// assistant message is committed only on completion.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let conversation_id = self.config.conversation_id.clone();
        self.history
            .append(&conversation_id, ChatMessage::user(user_input))?;
        self.history
            .truncate(&conversation_id, self.config.max_history)?;

        let request = self.build_request(&conversation_id, user_input)?;
        match self.stream_turn(request, renderer).await {
            Ok(Some(reply)) => {
                self.history
                    .append(&conversation_id, ChatMessage::assistant(reply))?;
                self.history
                    .truncate(&conversation_id, self.config.max_history)?;
                self.turns_completed += 1;
                TURNS_COMPLETED.click();
                Ok(TurnOutcome::Completed)
            }
            Ok(None) => {
                self.turns_aborted += 1;
                TURNS_ABORTED.click();
                renderer.print_interrupted();
                Ok(TurnOutcome::Interrupted)
            }
            Err(err) => {
                self.turns_aborted += 1;
                TURNS_ABORTED.click();
                Err(err)
            }
        }
    }

    /// Builds the model request for this turn.
    ///
    /// The just-appended user message travels as `input`, so the request
    /// history is everything before it; the input is never duplicated.
    fn build_request(&mut self, conversation_id: &str, user_input: &str) -> Result<ChatRequest> {
        let conversation = self.history.get_or_create(conversation_id)?;
        let history = match conversation.messages().split_last() {
            Some((_, prior)) => prior.to_vec(),
            None => Vec::new(),
        };
        Ok(ChatRequest {
            model: self.config.model.clone(),
            system: self.config.system_prompt.clone(),
            history,
            input: user_input.to_string(),
            max_tokens: Some(self.config.max_tokens),
            temperature: self.config.temperature,
        })
    }

    /// Streams one response. Returns the accumulated reply on completion,
    /// `None` if the user interrupted mid-stream.
    async fn stream_turn(
        &mut self,
        request: ChatRequest,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<String>> {
        let mut stream = self.client.stream_chat(request).await?;
        let mut accumulator = String::new();
        loop {
            if renderer.should_interrupt() {
                return Ok(None);
            }
            match stream.next().await {
                Some(Ok(fragment)) => {
                    renderer.print_text(&fragment);
                    accumulator.push_str(&fragment);
                }
                Some(Err(err)) => return Err(err),
                None => {
                    renderer.finish_response();
                    return Ok(Some(accumulator));
                }
            }
        }
    }

    /// Clears the active conversation's history.
    pub fn clear(&mut self) -> Result<()> {
        let conversation_id = self.config.conversation_id.clone();
        self.history.clear(&conversation_id)
    }

    /// Switches to (or creates) another conversation.
    pub fn switch_conversation(&mut self, id: &str) -> Result<()> {
        self.history.get_or_create(id)?;
        self.config.conversation_id = id.to_string();
        Ok(())
    }

    /// Returns the active conversation id.
    pub fn conversation_id(&self) -> &str {
        &self.config.conversation_id
    }

    /// Returns the number of messages in the active conversation.
    pub fn message_count(&self) -> usize {
        self.history.message_count(&self.config.conversation_id)
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    /// Returns the current model.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sets the system prompt; `None` restores the built-in persona.
    pub fn set_system_prompt(&mut self, prompt: Option<String>) {
        self.config.system_prompt = prompt.unwrap_or_else(|| crate::persona::PERSONA.to_string());
    }

    /// Returns the current system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.config.system_prompt
    }

    /// Sets the maximum tokens per response.
    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.config.max_tokens = max_tokens;
    }

    /// Sets the retention bound. Rejects a bound of zero.
    pub fn set_max_history(&mut self, max_history: usize) -> Result<()> {
        let candidate = ChatConfig {
            max_history,
            ..self.config.clone()
        };
        candidate.validate()?;
        self.config = candidate;
        Ok(())
    }

    /// Returns the retention bound.
    pub fn max_history(&self) -> usize {
        self.config.max_history
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            conversation_id: self.config.conversation_id.clone(),
            conversation_count: self.history.conversation_count(),
            message_count: self.message_count(),
            max_history: self.config.max_history,
            max_tokens: self.config.max_tokens,
            turns_completed: self.turns_completed,
            turns_aborted: self.turns_aborted,
        }
    }

    #[cfg(test)]
    fn messages(&mut self) -> Vec<ChatMessage> {
        let conversation_id = self.config.conversation_id.clone();
        self.history
            .get_or_create(&conversation_id)
            .expect("valid id")
            .messages()
            .to_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures::stream;

    use super::*;
    use crate::client::FragmentStream;
    use crate::error::Error;
    use crate::types::Role;

    /// Model client that replays a script and records every request.
    #[derive(Clone, Default)]
    struct ScriptedClient {
        fragments: Vec<Result<String>>,
        fail_before_stream: Option<Error>,
        calls: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<ChatRequest>>>,
    }

    impl ScriptedClient {
        fn replying(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
                ..Self::default()
            }
        }

        fn failing_before_stream(err: Error) -> Self {
            Self {
                fail_before_stream: Some(err),
                ..Self::default()
            }
        }

        fn failing_mid_stream(prefix: &str, err: Error) -> Self {
            Self {
                fragments: vec![Ok(prefix.to_string()), Err(err)],
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ModelClient for ScriptedClient {
        async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.requests.lock().unwrap().push(request);
            if let Some(err) = &self.fail_before_stream {
                return Err(err.clone());
            }
            Ok(Box::pin(stream::iter(self.fragments.clone())))
        }
    }

    /// Renderer that collects output and can interrupt after N fragments.
    #[derive(Default)]
    struct CollectingRenderer {
        printed: String,
        infos: Vec<String>,
        errors: Vec<String>,
        interruptions: usize,
        fragments_seen: usize,
        interrupt_after: Option<usize>,
    }

    impl CollectingRenderer {
        fn interrupting_after(fragments: usize) -> Self {
            Self {
                interrupt_after: Some(fragments),
                ..Self::default()
            }
        }
    }

    impl Renderer for CollectingRenderer {
        fn print_text(&mut self, text: &str) {
            self.printed.push_str(text);
            self.fragments_seen += 1;
        }

        fn print_info(&mut self, info: &str) {
            self.infos.push(info.to_string());
        }

        fn print_error(&mut self, error: &str) {
            self.errors.push(error.to_string());
        }

        fn print_interrupted(&mut self) {
            self.interruptions += 1;
        }

        fn finish_response(&mut self) {}

        fn should_interrupt(&self) -> bool {
            self.interrupt_after
                .is_some_and(|after| self.fragments_seen >= after)
        }
    }

    fn session(client: ScriptedClient) -> ChatSession<ScriptedClient> {
        ChatSession::new(client, ChatConfig::new()).unwrap()
    }

    #[tokio::test]
    async fn completed_turn_commits_assistant_message() {
        let client = ScriptedClient::replying(&["Hm", "ph", "~"]);
        let mut session = session(client.clone());
        let mut renderer = CollectingRenderer::default();

        let outcome = session.send_streaming("hi", &mut renderer).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(renderer.printed, "Hmph~");
        assert_eq!(
            session.messages(),
            vec![ChatMessage::user("hi"), ChatMessage::assistant("Hmph~")]
        );
        assert_eq!(client.calls(), 1);
        assert_eq!(session.stats().turns_completed, 1);
    }

    #[tokio::test]
    async fn request_history_excludes_new_input() {
        let client = ScriptedClient::replying(&["b"]);
        let mut session = session(client.clone());
        let mut renderer = CollectingRenderer::default();

        session.send_streaming("a", &mut renderer).await.unwrap();
        session.send_streaming("c", &mut renderer).await.unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        // First turn: empty history, input alone.
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[0].input, "a");
        // Second turn: prior pair as history, new input separate.
        assert_eq!(
            requests[1].history,
            vec![ChatMessage::user("a"), ChatMessage::assistant("b")]
        );
        assert_eq!(requests[1].input, "c");
        assert!(requests[1].history.iter().all(|m| m.content != "c"));
    }

    #[tokio::test]
    async fn retention_bounds_request_history() {
        let client = ScriptedClient::replying(&["r"]);
        let config = ChatConfig::new().with_max_history(2);
        let mut session = ChatSession::new(client.clone(), config).unwrap();
        let mut renderer = CollectingRenderer::default();

        session.send_streaming("one", &mut renderer).await.unwrap();
        session.send_streaming("two", &mut renderer).await.unwrap();
        session.send_streaming("three", &mut renderer).await.unwrap();

        // After append + truncate the conversation holds [assistant "r",
        // user "three"]; the request carries the prior message only.
        let last = client.requests().pop().unwrap();
        assert_eq!(last.history, vec![ChatMessage::assistant("r")]);
        assert_eq!(last.input, "three");
        assert_eq!(session.message_count(), 2);
    }

    #[tokio::test]
    async fn pre_stream_failure_commits_nothing() {
        let client =
            ScriptedClient::failing_before_stream(Error::authentication("key rejected"));
        let mut session = session(client.clone());
        let mut renderer = CollectingRenderer::default();

        let err = session
            .send_streaming("hi", &mut renderer)
            .await
            .unwrap_err();

        assert!(err.is_authentication());
        // Only the user message remains: "no response received".
        assert_eq!(session.messages(), vec![ChatMessage::user("hi")]);
        assert_eq!(client.calls(), 1);
        assert_eq!(session.stats().turns_aborted, 1);
    }

    #[tokio::test]
    async fn mid_stream_failure_discards_partial_reply() {
        let client = ScriptedClient::failing_mid_stream(
            "par",
            Error::streaming("connection dropped", None),
        );
        let mut session = session(client);
        let mut renderer = CollectingRenderer::default();

        let before_turn = session.message_count();
        let err = session
            .send_streaming("hi", &mut renderer)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Streaming { .. }));
        assert_eq!(renderer.printed, "par");
        // The partial fragment was rendered but never committed.
        assert_eq!(session.message_count(), before_turn + 1);
        assert_eq!(session.messages(), vec![ChatMessage::user("hi")]);
    }

    #[tokio::test]
    async fn interrupt_discards_partial_reply() {
        let client = ScriptedClient::replying(&["first", "second", "third"]);
        let mut session = session(client);
        let mut renderer = CollectingRenderer::interrupting_after(1);

        let outcome = session.send_streaming("hi", &mut renderer).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Interrupted);
        assert_eq!(renderer.printed, "first");
        assert_eq!(renderer.interruptions, 1);
        assert_eq!(session.messages(), vec![ChatMessage::user("hi")]);
        assert_eq!(session.stats().turns_aborted, 1);
    }

    #[test]
    fn missing_credentials_fail_before_any_session_exists() {
        // Key resolution is the credentials gate: without a key there is no
        // client, and a session cannot be constructed without one, so the
        // configuration-error path can never reach `stream_chat`.
        let err = crate::client::resolve_api_key(None, None).unwrap_err();
        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn conversations_switch_and_stay_isolated() {
        let client = ScriptedClient::replying(&["reply"]);
        let mut session = session(client);
        let mut renderer = CollectingRenderer::default();

        session.send_streaming("for one", &mut renderer).await.unwrap();
        assert_eq!(session.message_count(), 2);

        session.switch_conversation("conv-2").unwrap();
        assert_eq!(session.conversation_id(), "conv-2");
        assert_eq!(session.message_count(), 0);

        session.send_streaming("for two", &mut renderer).await.unwrap();
        assert_eq!(session.message_count(), 2);

        // Switching back resolves the same conversation, history intact.
        session.switch_conversation("conv-1").unwrap();
        assert_eq!(session.messages()[0], ChatMessage::user("for one"));
        assert_eq!(session.stats().conversation_count, 2);
    }

    #[tokio::test]
    async fn switch_to_blank_conversation_rejected() {
        let mut session = session(ScriptedClient::default());
        assert!(session.switch_conversation(" ").unwrap_err().is_validation());
        assert_eq!(session.conversation_id(), "conv-1");
    }

    #[test]
    fn zero_retention_bound_rejected_at_construction() {
        let config = ChatConfig::new().with_max_history(0);
        let err = ChatSession::new(ScriptedClient::default(), config)
            .err()
            .unwrap();
        assert!(err.is_validation());
    }

    #[test]
    fn set_max_history_validates() {
        let mut session = session(ScriptedClient::default());
        assert!(session.set_max_history(0).is_err());
        assert_eq!(session.max_history(), 10);
        session.set_max_history(3).unwrap();
        assert_eq!(session.max_history(), 3);
    }

    #[tokio::test]
    async fn clear_empties_active_conversation() {
        let client = ScriptedClient::replying(&["ok"]);
        let mut session = session(client);
        let mut renderer = CollectingRenderer::default();

        session.send_streaming("hi", &mut renderer).await.unwrap();
        session.clear().unwrap();
        assert_eq!(session.message_count(), 0);
    }

    #[test]
    fn system_prompt_restores_persona() {
        let mut session = session(ScriptedClient::default());
        session.set_system_prompt(Some("terse".to_string()));
        assert_eq!(session.system_prompt(), "terse");
        session.set_system_prompt(None);
        assert_eq!(session.system_prompt(), crate::persona::PERSONA);
    }

    #[tokio::test]
    async fn user_roles_recorded_correctly() {
        let client = ScriptedClient::replying(&["r"]);
        let mut session = session(client);
        let mut renderer = CollectingRenderer::default();
        session.send_streaming("q", &mut renderer).await.unwrap();

        let messages = session.messages();
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }
}
