//! The background task and its handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use lex_builder::{BuildError, BuildEvent, Builder};
use lex_grammar::Language;
use lex_span::Edit;
use lex_tree::{Context, LexiconId};
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;

use crate::error::WorkerError;
use crate::status::{RootHandle, WorkerStatus};

const EVENT_CHANNEL_CAPACITY: usize = 256;

struct PendingEdit {
    text: String,
    edit: Edit,
}

struct Shared {
    root: RwLock<RootHandle>,
    idle: AtomicBool,
    callbacks: Mutex<Vec<Box<dyn FnOnce(Arc<Context>) + Send>>>,
}

/// Runs a [`Builder`] on a background `tokio` task, reusing it across
/// submissions and publishing each completed rebuild for readers.
///
/// A `Worker` owns the language and root lexicon for its lifetime; there is
/// no way to swap them out short of spawning a new `Worker`.
pub struct Worker {
    shared: Arc<Shared>,
    pending: Arc<Mutex<Option<PendingEdit>>>,
    wake: Arc<Notify>,
    finished_rx: watch::Receiver<u64>,
    events: broadcast::Sender<BuildEvent>,
    shutdown: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Spawns the background task, lexing `initial_text` synchronously (on
    /// the caller's thread) to seed the first published tree.
    #[must_use]
    pub fn spawn(language: Language, root: LexiconId, initial_text: impl Into<String>) -> Self {
        let initial_text = initial_text.into();
        let initial_root = {
            let mut builder = Builder::new(&language, root.clone());
            builder.tree(&initial_text)
        };

        let shared = Arc::new(Shared {
            root: RwLock::new(RootHandle { root: Arc::new(initial_root), generation: 0 }),
            idle: AtomicBool::new(true),
            callbacks: Mutex::new(Vec::new()),
        });
        let pending: Arc<Mutex<Option<PendingEdit>>> = Arc::new(Mutex::new(None));
        let wake = Arc::new(Notify::new());
        let (finished_tx, finished_rx) = watch::channel(0u64);
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let cancel = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_loop(
            language,
            root,
            Arc::clone(&shared),
            Arc::clone(&pending),
            Arc::clone(&wake),
            finished_tx,
            events.clone(),
            Arc::clone(&shutdown),
            Arc::clone(&cancel),
        ));

        Self {
            shared,
            pending,
            wake,
            finished_rx,
            events,
            shutdown,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Submits an edit to `text`. Non-blocking: if a submission is already
    /// pending (the background task hasn't picked it up yet), the edits are
    /// coalesced into a single `(min pos, total removed, total added)` edit
    /// instead of queued as a second rebuild.
    ///
    /// If a rebuild is already in flight for a previous submission, it is
    /// interrupted: the background task observes the signal between lexer
    /// events, abandons that rebuild without publishing it, and re-merges
    /// its edit with this one before restarting (spec §4.5 "in-flight
    /// interrupt"). The interrupted rebuild's partial work is simply
    /// discarded; only the coalesced edit against the last published tree
    /// is ever retried.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Closed`] if `shutdown` has already been
    /// called.
    pub fn update(
        &self,
        text: impl Into<String>,
        edits: impl IntoIterator<Item = Edit>,
    ) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(WorkerError::Closed);
        }
        let Some(incoming) = edits.into_iter().reduce(|acc, next| acc.merge(&next)) else {
            return Ok(());
        };

        #[allow(clippy::unwrap_used)]
        let mut guard = self.pending.lock().unwrap();
        let combined = match guard.take() {
            Some(existing) => existing.edit.merge(&incoming),
            None => incoming,
        };
        *guard = Some(PendingEdit { text: text.into(), edit: combined });
        drop(guard);

        self.cancel.store(true, Ordering::Release);
        self.wake.notify_one();
        Ok(())
    }

    /// Returns the currently published tree. If `block` is set, first waits
    /// for the rebuild in flight (if any) to finish, so the returned tree
    /// reflects every submission made before this call returned.
    pub async fn get_root(&self, block: bool) -> RootHandle {
        if block {
            let mut rx = self.finished_rx.clone();
            let observed = *rx.borrow();
            while *rx.borrow() <= observed {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
        #[allow(clippy::unwrap_used)]
        self.shared.root.read().unwrap().clone()
    }

    /// Registers a one-shot callback run with the published tree after the
    /// next rebuild finishes (spec: after the next `finished` event).
    pub fn on_root<F>(&self, callback: F)
    where
        F: FnOnce(Arc<Context>) + Send + 'static,
    {
        #[allow(clippy::unwrap_used)]
        self.shared.callbacks.lock().unwrap().push(Box::new(callback));
    }

    /// Subscribes to the worker's build-event stream: `Replace`,
    /// `Invalidate`, `Updated`, and `Finished`, in the order `Builder`
    /// itself emits them for each rebuild.
    #[must_use]
    pub fn connect(&self) -> broadcast::Receiver<BuildEvent> {
        self.events.subscribe()
    }

    /// Whether no rebuild is currently in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.shared.idle.load(Ordering::Acquire)
    }

    /// The worker's current activity.
    #[must_use]
    pub fn status(&self) -> WorkerStatus {
        if self.is_idle() {
            WorkerStatus::Idle
        } else {
            WorkerStatus::Rebuilding
        }
    }

    /// Stops the background task. A rebuild already in flight is
    /// interrupted between lexer events and abandoned without publishing;
    /// the loop doesn't start another one. Idempotent: calling `shutdown`
    /// again after the task has already been awaited is a no-op.
    ///
    /// Takes `&self`, not `self`, so a `Worker` shared behind an `Arc` can be
    /// shut down from one holder while another's in-flight `update` still
    /// observes [`WorkerError::Closed`] rather than silently racing it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::TaskPanicked`] if the background task panicked
    /// rather than returning normally.
    pub async fn shutdown(&self) -> Result<(), WorkerError> {
        self.shutdown.store(true, Ordering::Release);
        self.cancel.store(true, Ordering::Release);
        self.wake.notify_one();
        #[allow(clippy::unwrap_used)]
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            task.await.map_err(|_| WorkerError::TaskPanicked)?;
        }
        Ok(())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.cancel.store(true, Ordering::Release);
        self.wake.notify_one();
    }
}

async fn run_loop(
    language: Language,
    root_lexicon: LexiconId,
    shared: Arc<Shared>,
    pending: Arc<Mutex<Option<PendingEdit>>>,
    wake: Arc<Notify>,
    finished_tx: watch::Sender<u64>,
    events: broadcast::Sender<BuildEvent>,
    shutdown: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
) {
    let mut builder = Builder::new(&language, root_lexicon);
    loop {
        wake.notified().await;
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        #[allow(clippy::unwrap_used)]
        let submission = pending.lock().unwrap().take();
        let Some(PendingEdit { mut text, mut edit }) = submission else {
            continue;
        };

        shared.idle.store(false, Ordering::Release);

        // A newer `update()` can interrupt this rebuild between lexer
        // events (it sets `cancel` when it stores its own pending edit).
        // Keep retrying against the latest coalesced edit until one run
        // completes without being cut off, or the worker is shutting down.
        let outcome = loop {
            cancel.store(false, Ordering::Release);
            #[allow(clippy::unwrap_used)]
            let old_root = Arc::clone(&shared.root.read().unwrap().root);

            match builder.rebuild(&old_root, &text, edit, &cancel) {
                Err(BuildError::Cancelled) => {
                    if shutdown.load(Ordering::Acquire) {
                        break None;
                    }
                    #[allow(clippy::unwrap_used)]
                    let newer = pending.lock().unwrap().take();
                    if let Some(PendingEdit { text: newer_text, edit: newer_edit }) = newer {
                        edit = edit.merge(&newer_edit);
                        text = newer_text;
                    }
                }
                other => break Some(other),
            }
        };

        let Some(result) = outcome else {
            shared.idle.store(true, Ordering::Release);
            continue;
        };

        match result {
            Ok(result) => {
                tracing::debug!(
                    reused = result.stats.nodes_reused,
                    relexed = result.stats.nodes_relexed,
                    "rebuild finished"
                );
                for event in builder.events() {
                    let _ = events.send(event.clone());
                }
                let generation = *finished_tx.borrow() + 1;
                #[allow(clippy::unwrap_used)]
                {
                    *shared.root.write().unwrap() =
                        RootHandle { root: Arc::new(result.root), generation };
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "rebuild failed, republishing previous tree");
                let _ = events.send(BuildEvent::Replace);
                let _ = events.send(BuildEvent::Finished);
            }
        }

        shared.idle.store(true, Ordering::Release);
        #[allow(clippy::unwrap_used)]
        let current_root = Arc::clone(&shared.root.read().unwrap().root);
        #[allow(clippy::unwrap_used)]
        let callbacks: Vec<_> = shared.callbacks.lock().unwrap().drain(..).collect();
        for callback in callbacks {
            callback(Arc::clone(&current_root));
        }
        finished_tx.send_modify(|generation| *generation += 1);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;

    use lex_grammar::{ActionSpec, Arg, Language, LexiconEntry, LexiconSpec, PatternSpec, RuleSpec, Targets};
    use lex_span::Edit;
    use lex_tree::Node;

    use super::*;

    fn number_spec(_arg: Option<&Arg>) -> LexiconSpec {
        LexiconSpec {
            rules: vec![RuleSpec::new(
                PatternSpec::Static(r"\d+".to_string()),
                ActionSpec::Literal(StdArc::from("Number")),
                Targets::none(),
            )],
            default_action: Some(ActionSpec::Skip),
            ..Default::default()
        }
    }

    static ENTRIES: &[LexiconEntry] = &[LexiconEntry { name: "root", build: number_spec }];

    fn language_and_root() -> (Language, LexiconId) {
        let lang = Language::new("test", ENTRIES);
        let root = lang.get("root", None).unwrap();
        (lang, root)
    }

    fn token_texts(ctx: &Context, out: &mut Vec<String>) {
        for child in &ctx.children {
            match child {
                Node::Token(t) => out.push(t.text.to_string()),
                Node::Context(c) => token_texts(c, out),
            }
        }
    }

    #[tokio::test]
    async fn spawn_seeds_the_initial_tree() {
        let (lang, root) = language_and_root();
        let worker = Worker::spawn(lang, root, "11 22");
        let handle = worker.get_root(false).await;

        let mut texts = Vec::new();
        token_texts(&handle.root, &mut texts);
        assert_eq!(texts, vec!["11", "22"]);
    }

    #[tokio::test]
    async fn update_rebuilds_and_publishes_the_new_tree() {
        let (lang, root) = language_and_root();
        let worker = Worker::spawn(lang, root, "11 22");

        worker.update("11 99", [Edit::new(3, 2, 2)]).unwrap();
        let handle = worker.get_root(true).await;

        let mut texts = Vec::new();
        token_texts(&handle.root, &mut texts);
        assert_eq!(texts, vec!["11", "99"]);
        assert!(worker.is_idle());
        assert_eq!(worker.status(), WorkerStatus::Idle);
    }

    #[tokio::test]
    async fn connect_observes_the_full_event_sequence() {
        let (lang, root) = language_and_root();
        let worker = Worker::spawn(lang, root, "11 22");
        let mut events = worker.connect();

        worker.update("11 99", [Edit::new(3, 2, 2)]).unwrap();
        worker.get_root(true).await;

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(matches!(seen.first(), Some(BuildEvent::Replace)));
        assert!(matches!(seen.last(), Some(BuildEvent::Finished)));
    }

    #[tokio::test]
    async fn on_root_callback_runs_after_the_rebuild_it_was_registered_before() {
        let (lang, root) = language_and_root();
        let worker = Worker::spawn(lang, root, "11 22");

        let (tx, rx) = tokio::sync::oneshot::channel();
        worker.on_root(move |root| {
            let _ = tx.send(root);
        });
        worker.update("11 99", [Edit::new(3, 2, 2)]).unwrap();

        let callback_root = rx.await.unwrap();
        let mut texts = Vec::new();
        token_texts(&callback_root, &mut texts);
        assert_eq!(texts, vec!["11", "99"]);
    }

    #[tokio::test]
    async fn update_after_shutdown_is_rejected() {
        let (lang, root) = language_and_root();
        let worker = Worker::spawn(lang, root, "11 22");
        worker.shutdown().await.unwrap();

        let err = worker.update("11 22 33", []).unwrap_err();
        assert!(matches!(err, WorkerError::Closed));
    }
}
