//! assistant - the per-utterance pipeline
//!
//! extract event -> extract note -> classify -> dispatch -> log.
//! Every turn is logged, including failed ones, and no handler error escapes
//! `process_command`.

use anyhow::Result;
use std::sync::Arc;

use crate::calendar::CalendarManager;
use crate::config::{AssistantConfig, Mode};
use crate::dates::{Clock, SystemClock};
use crate::extract::{extract_event, extract_note};
use crate::handlers::{self, HandlerContext, TaskResponse, Utterance};
use crate::intent::{Intent, IntentClassifier};
use crate::learning::{InteractionLog, PreferenceManager, MAX_INTERACTIONS};
use crate::notes::NoteManager;
use crate::shell::{CommandExecutor, Platform, SystemShell};
use crate::store::{JsonFileStore, KeyValueStore};

pub const CALCULATION_FALLBACK: &str = "I couldn't perform that calculation. Could you rephrase it?";

pub struct Assistant {
    store: Arc<dyn KeyValueStore>,
    ctx: HandlerContext,
    classifier: IntentClassifier,
    interactions: InteractionLog,
}

impl Assistant {
    /// Browser-mode assistant on the host platform.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let preferences = PreferenceManager::new(store.clone());
        let ctx = HandlerContext {
            notes: NoteManager::new(store.clone()),
            calendar: CalendarManager::new(store.clone()),
            preferences: preferences.clone(),
            clock,
            platform: Platform::current(),
            executor: None,
        };
        let interactions = InteractionLog::new(store.clone(), preferences, MAX_INTERACTIONS);

        Self {
            store,
            ctx,
            classifier: IntentClassifier::new(),
            interactions,
        }
    }

    /// File-backed store under `data_dir`; desktop mode gets a `SystemShell`.
    pub fn from_config(config: &AssistantConfig) -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.data_dir));
        let platform = config.platform();

        let assistant = Self::new(store, Arc::new(SystemClock))
            .with_platform(platform)
            .with_max_interactions(config.max_interactions);

        match config.mode {
            Mode::Desktop => assistant.with_executor(Arc::new(SystemShell::new(platform, config.shell_timeout_ms))),
            Mode::Browser => assistant,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.ctx.executor = Some(executor);
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.ctx.platform = platform;
        self
    }

    pub fn with_max_interactions(mut self, max: usize) -> Self {
        self.interactions = InteractionLog::new(self.store.clone(), self.ctx.preferences.clone(), max);
        self
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    pub fn interactions(&self) -> &InteractionLog {
        &self.interactions
    }

    pub fn executor(&self) -> Option<Arc<dyn CommandExecutor>> {
        self.ctx.executor.clone()
    }

    /// Run one utterance through the pipeline and log the turn.
    pub async fn process_command(&self, text: &str) -> TaskResponse {
        let response = match self.respond(text).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Handler failed");
                TaskResponse::fail(format!("I encountered an error: {}", e))
            }
        };

        if let Err(e) = self.interactions.log(text.trim(), &response.message) {
            tracing::warn!(error = %e, "Failed to log interaction");
        }

        response
    }

    async fn respond(&self, text: &str) -> Result<TaskResponse> {
        let utterance = Utterance::new(text);

        if let Some(draft) = extract_event(utterance.raw(), self.ctx.clock.today()) {
            tracing::debug!(title = %draft.title, date = %draft.date, "Extracted calendar event");
            return handlers::calendar::handle(&utterance, &self.ctx, Some(draft));
        }

        if let Some(draft) = extract_note(utterance.raw()) {
            tracing::debug!(title = %draft.title, "Extracted note");
            return handlers::note::handle(&utterance, &self.ctx, Some(draft));
        }

        let intent = self.classifier.classify(utterance.lower());
        self.dispatch(intent, &utterance).await
    }

    /// Run the handler for `intent` directly, skipping extraction.
    pub async fn dispatch(&self, intent: Intent, utterance: &Utterance) -> Result<TaskResponse> {
        let ctx = &self.ctx;
        let response = match intent {
            Intent::Calculation => {
                let result = handlers::calculation::handle(utterance);
                if result.success {
                    result
                } else {
                    tracing::debug!(detail = %result.message, "Calculation did not succeed");
                    TaskResponse::fail(CALCULATION_FALLBACK)
                }
            }
            Intent::Calendar => handlers::calendar::handle(utterance, ctx, None)?,
            Intent::Note => handlers::note::handle(utterance, ctx, None)?,
            Intent::Learning => handlers::learning::handle(utterance, ctx)?,
            Intent::App => handlers::system::handle_app(utterance, ctx).await,
            Intent::File => handlers::system::handle_file(utterance, ctx).await,
            Intent::Search => handlers::system::handle_search(utterance, ctx).await,
            Intent::Music => handlers::system::handle_music(utterance, ctx).await,
            Intent::Timer => handlers::system::handle_timer(utterance, ctx).await,
            Intent::Weather => handlers::system::handle_weather(utterance, ctx).await,
            Intent::Chat => handlers::chat::handle(utterance, ctx)?,
        };
        Ok(response)
    }
}
