use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot},
    time::{Duration, Instant},
};

use crate::{
    config::RuntimeConfig,
    core::store::{QuizStore, StoreError, StoreSnapshotV1},
    op::StoredOp,
    persist::{OpSink, PersistError},
    quiz::Quiz,
    types::{OpSeq, QuizKey},
};

use super::events::QuizEvent;

/// Failures surfaced through [`QuizStoreHandle`].
#[derive(Debug)]
pub enum RuntimeError {
    /// The store rejected the request.
    Store(StoreError),
    /// The journal could not be written.
    Persist(PersistError),
    /// The runtime task is gone.
    ChannelClosed,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Store(err) => write!(f, "{err}"),
            RuntimeError::Persist(err) => write!(f, "{err}"),
            RuntimeError::ChannelClosed => f.write_str("quiz store is no longer running"),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Store(err) => Some(err),
            RuntimeError::Persist(err) => Some(err),
            RuntimeError::ChannelClosed => None,
        }
    }
}

impl From<StoreError> for RuntimeError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PersistError> for RuntimeError {
    fn from(value: PersistError) -> Self {
        Self::Persist(value)
    }
}

/// Cloneable client of the task that owns the [`QuizStore`].
///
/// Every request is a message answered over a oneshot channel, so mutations
/// are applied one at a time and reads never see a half-applied delete.
#[derive(Clone)]
pub struct QuizStoreHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<QuizEvent>,
}

enum Command {
    All {
        resp: oneshot::Sender<Vec<Quiz>>,
    },
    Get {
        key: QuizKey,
        resp: oneshot::Sender<Result<Quiz, RuntimeError>>,
    },
    Count {
        resp: oneshot::Sender<usize>,
    },
    Add {
        quiz: Quiz,
        resp: oneshot::Sender<Result<QuizKey, RuntimeError>>,
    },
    Update {
        key: QuizKey,
        quiz: Quiz,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Delete {
        key: QuizKey,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Flush {
        resp: oneshot::Sender<Result<OpSeq, RuntimeError>>,
    },
    Checkpoint {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

enum PersistMsg {
    Op(StoredOp),
    Flush {
        resp: oneshot::Sender<Result<OpSeq, PersistError>>,
    },
    Checkpoint {
        snapshot: StoreSnapshotV1,
        last_seq: OpSeq,
        compact: bool,
        resp: oneshot::Sender<Result<(), PersistError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), PersistError>>,
    },
}

/// Moves `store` into a background task and returns a handle to it.
///
/// With a `sink`, every mutation is journaled by a separate persistence worker.
/// A batch the sink rejects stays queued in journal order and is retried on
/// the next write, flush or latency tick; [`QuizStoreHandle::flush`] reports
/// the failure while it lasts. Must be called from within a tokio runtime.
pub fn spawn_quiz_runtime(
    store: QuizStore,
    sink: Option<Box<dyn OpSink>>,
    config: RuntimeConfig,
) -> QuizStoreHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);
    let (events_tx, _) = broadcast::channel::<QuizEvent>(1024);

    let (persist_tx_opt, mut durable_rx) = if let Some(sink) = sink {
        let (persist_tx, persist_rx) = mpsc::channel::<PersistMsg>(config.persist_queue_bound);
        let (durable_tx, durable_rx) = mpsc::unbounded_channel::<Result<OpSeq, PersistError>>();
        spawn_persistence_worker(sink, persist_rx, durable_tx, config.clone());
        (Some(persist_tx), Some(durable_rx))
    } else {
        (None, None)
    };

    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut store = store;
        let mut ops_since_snapshot = 0usize;
        debug!("quiz runtime started with {} quizzes", store.count());

        loop {
            if let Some(rx) = durable_rx.as_mut() {
                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        let Some(cmd) = cmd else { break; };
                        let done = handle_command(
                            cmd,
                            &mut store,
                            &events_tx_loop,
                            persist_tx_opt.as_ref(),
                            &config,
                            &mut ops_since_snapshot,
                        ).await;
                        if done {
                            break;
                        }
                    }
                    durable = rx.recv() => {
                        match durable {
                            Some(Ok(op_seq)) => {
                                let _ = events_tx_loop.send(QuizEvent::DurableUpTo { op_seq });
                            }
                            Some(Err(err)) => warn!("journal write failed, batch kept for retry: {err}"),
                            None => {}
                        }
                    }
                }
            } else {
                let Some(cmd) = cmd_rx.recv().await else { break; };
                let done = handle_command(
                    cmd,
                    &mut store,
                    &events_tx_loop,
                    persist_tx_opt.as_ref(),
                    &config,
                    &mut ops_since_snapshot,
                )
                .await;
                if done {
                    break;
                }
            }
        }
        debug!("quiz runtime stopped");
    });

    QuizStoreHandle { cmd_tx, events_tx }
}

impl QuizStoreHandle {
    /// Subscribes to mutation and durability events.
    pub fn subscribe(&self) -> broadcast::Receiver<QuizEvent> {
        self.events_tx.subscribe()
    }

    /// Returns every quiz in key order.
    pub async fn all(&self) -> Result<Vec<Quiz>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::All { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Returns the quiz at `key`.
    pub async fn get(&self, key: QuizKey) -> Result<Quiz, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Get { key, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Number of quizzes currently stored.
    pub async fn count(&self) -> Result<usize, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Count { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Appends a quiz and returns its key.
    pub async fn add(&self, question: impl Into<String>, answer: impl Into<String>) -> Result<QuizKey, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        let quiz = Quiz::new(question, answer);
        self.send(Command::Add { quiz, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Replaces the quiz at `key`.
    pub async fn update(
        &self,
        key: QuizKey,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        let quiz = Quiz::new(question, answer);
        self.send(Command::Update { key, quiz, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Removes the quiz at `key`.
    pub async fn delete(&self, key: QuizKey) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Delete { key, resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Waits until every queued op is durable.
    pub async fn flush(&self) -> Result<OpSeq, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Flush { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Writes a snapshot of the current store.
    pub async fn checkpoint(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Checkpoint { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Flushes persistence and stops the runtime task.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    async fn send(&self, cmd: Command) -> Result<(), RuntimeError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| RuntimeError::ChannelClosed)
    }
}

async fn handle_command(
    cmd: Command,
    store: &mut QuizStore,
    events_tx: &broadcast::Sender<QuizEvent>,
    persist_tx: Option<&mpsc::Sender<PersistMsg>>,
    config: &RuntimeConfig,
    ops_since_snapshot: &mut usize,
) -> bool {
    match cmd {
        Command::All { resp } => {
            let _ = resp.send(store.get_all().map(|(_, quiz)| quiz.clone()).collect());
        }
        Command::Get { key, resp } => {
            let _ = resp.send(store.get_by_index(key).cloned().map_err(RuntimeError::from));
        }
        Command::Count { resp } => {
            let _ = resp.send(store.count());
        }
        Command::Add { quiz, resp } => {
            let (key, stored) = store.add(quiz.question, quiz.answer);
            let res = publish(store, stored, persist_tx, events_tx, QuizEvent::Added { key })
                .await
                .map(|()| key);
            finish_mutation(res.is_ok(), store, persist_tx, config, ops_since_snapshot).await;
            let _ = resp.send(res);
        }
        Command::Update { key, quiz, resp } => {
            let res = match store.update(key, quiz.question, quiz.answer) {
                Ok(stored) => publish(store, stored, persist_tx, events_tx, QuizEvent::Updated { key }).await,
                Err(err) => Err(err.into()),
            };
            finish_mutation(res.is_ok(), store, persist_tx, config, ops_since_snapshot).await;
            let _ = resp.send(res);
        }
        Command::Delete { key, resp } => {
            let res = match store.delete_by_index(key) {
                Ok(stored) => publish(store, stored, persist_tx, events_tx, QuizEvent::Deleted { key }).await,
                Err(err) => Err(err.into()),
            };
            finish_mutation(res.is_ok(), store, persist_tx, config, ops_since_snapshot).await;
            let _ = resp.send(res);
        }
        Command::Flush { resp } => {
            let out = if let Some(tx) = persist_tx {
                let (flush_tx, flush_rx) = oneshot::channel();
                if tx.send(PersistMsg::Flush { resp: flush_tx }).await.is_err() {
                    Err(RuntimeError::ChannelClosed)
                } else {
                    flush_rx
                        .await
                        .map_err(|_| RuntimeError::ChannelClosed)
                        .and_then(|r| r.map_err(RuntimeError::from))
                }
            } else {
                Ok(store.latest_op_seq())
            };
            let _ = resp.send(out);
        }
        Command::Checkpoint { resp } => {
            let out = match persist_tx {
                Some(tx) => {
                    let res = send_checkpoint(store, tx, config.compact_after_snapshot).await;
                    if res.is_ok() {
                        *ops_since_snapshot = 0;
                    }
                    res
                }
                None => Ok(()),
            };
            let _ = resp.send(out);
        }
        Command::Shutdown { resp } => {
            let out = if let Some(tx) = persist_tx {
                let (done_tx, done_rx) = oneshot::channel();
                if tx.send(PersistMsg::Shutdown { resp: done_tx }).await.is_err() {
                    Err(RuntimeError::ChannelClosed)
                } else {
                    done_rx
                        .await
                        .map_err(|_| RuntimeError::ChannelClosed)
                        .and_then(|r| r.map_err(RuntimeError::from))
                }
            } else {
                Ok(())
            };
            let _ = resp.send(out);
            return true;
        }
    }

    false
}

async fn publish(
    store: &mut QuizStore,
    stored: StoredOp,
    persist_tx: Option<&mpsc::Sender<PersistMsg>>,
    events_tx: &broadcast::Sender<QuizEvent>,
    event: QuizEvent,
) -> Result<(), RuntimeError> {
    // Journaled through the worker; the store's own pending list would only grow.
    store.drain_pending_ops();
    if let Some(tx) = persist_tx {
        // Waits for room; a dropped op would leave a gap in the journal.
        tx.send(PersistMsg::Op(stored))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
    } else {
        let _ = events_tx.send(QuizEvent::DurableUpTo {
            op_seq: store.latest_op_seq(),
        });
    }
    let _ = events_tx.send(event);
    Ok(())
}

async fn finish_mutation(
    applied: bool,
    store: &QuizStore,
    persist_tx: Option<&mpsc::Sender<PersistMsg>>,
    config: &RuntimeConfig,
    ops_since_snapshot: &mut usize,
) {
    if !applied {
        return;
    }
    *ops_since_snapshot += 1;
    if config.snapshot_every_ops == 0 || *ops_since_snapshot < config.snapshot_every_ops {
        return;
    }
    let Some(tx) = persist_tx else {
        return;
    };
    match send_checkpoint(store, tx, config.compact_after_snapshot).await {
        Ok(()) => *ops_since_snapshot = 0,
        Err(err) => warn!("automatic snapshot failed: {err}"),
    }
}

async fn send_checkpoint(
    store: &QuizStore,
    tx: &mpsc::Sender<PersistMsg>,
    compact: bool,
) -> Result<(), RuntimeError> {
    let (cp_tx, cp_rx) = oneshot::channel();
    tx.send(PersistMsg::Checkpoint {
        snapshot: store.export_snapshot(),
        last_seq: store.latest_op_seq(),
        compact,
        resp: cp_tx,
    })
    .await
    .map_err(|_| RuntimeError::ChannelClosed)?;
    cp_rx
        .await
        .map_err(|_| RuntimeError::ChannelClosed)?
        .map_err(RuntimeError::from)
}

fn spawn_persistence_worker(
    sink: Box<dyn OpSink>,
    mut rx: mpsc::Receiver<PersistMsg>,
    durable_tx: mpsc::UnboundedSender<Result<OpSeq, PersistError>>,
    config: RuntimeConfig,
) {
    let sink = Arc::new(Mutex::new(sink));
    tokio::spawn(async move {
        let latency = Duration::from_millis(config.batch_max_latency_ms);
        let mut buf = Vec::<StoredOp>::new();
        let mut deadline = Instant::now() + latency;
        let mut last_durable: OpSeq = 0;

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                        break;
                    };

                    match msg {
                        PersistMsg::Op(stored) => {
                            buf.push(stored);
                            if config.flush_on_write || buf.len() >= config.batch_max_ops {
                                let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                                deadline = Instant::now() + latency;
                            }
                        }
                        PersistMsg::Flush { resp } => {
                            let result = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                            let _ = resp.send(result.map(|_| last_durable));
                            deadline = Instant::now() + latency;
                        }
                        PersistMsg::Checkpoint { snapshot, last_seq, compact, resp } => {
                            let result = match flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await {
                                Err(err) => Err(err),
                                Ok(()) => {
                                    let sink_ref = Arc::clone(&sink);
                                    tokio::task::spawn_blocking(move || {
                                        let mut sink = sink_ref.blocking_lock();
                                        sink.write_snapshot(&snapshot, last_seq)?;
                                        if compact {
                                            let removed = sink.compact_through(last_seq)?;
                                            debug!("compacted {removed} journal entries");
                                        }
                                        Result::<(), PersistError>::Ok(())
                                    })
                                    .await
                                    .unwrap_or_else(|e| Err(PersistError::Message(format!("join error: {e}"))))
                                }
                            };
                            let _ = resp.send(result);
                            deadline = Instant::now() + latency;
                        }
                        PersistMsg::Shutdown { resp } => {
                            let result = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                            if !buf.is_empty() {
                                warn!("{} journal ops were not written before shutdown", buf.len());
                            }
                            let _ = resp.send(result);
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline), if !buf.is_empty() => {
                    let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, false).await;
                    deadline = Instant::now() + latency;
                }
            }
        }
    });
}

async fn flush_buf(
    sink: &Arc<Mutex<Box<dyn OpSink>>>,
    buf: &mut Vec<StoredOp>,
    last_durable: &mut OpSeq,
    durable_tx: &mpsc::UnboundedSender<Result<OpSeq, PersistError>>,
    call_flush: bool,
) -> Result<(), PersistError> {
    if buf.is_empty() {
        if call_flush {
            let sink_ref = Arc::clone(sink);
            tokio::task::spawn_blocking(move || {
                let mut sink = sink_ref.blocking_lock();
                sink.flush()
            })
            .await
            .map_err(|e| PersistError::Message(format!("join error: {e}")))??;
        }
        return Ok(());
    }

    let ops = std::mem::take(buf);
    let sink_ref = Arc::clone(sink);
    let (ops, appended, flushed) = tokio::task::spawn_blocking(move || {
        let mut sink = sink_ref.blocking_lock();
        let appended = sink.append_ops(&ops);
        let flushed = match appended {
            Ok(_) if call_flush => sink.flush(),
            _ => Ok(()),
        };
        (ops, appended, flushed)
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))?;

    match appended {
        Ok(seq) => {
            *last_durable = (*last_durable).max(seq);
            let _ = durable_tx.send(Ok(*last_durable));
            flushed
        }
        Err(err) => {
            // Nothing from this batch is in the journal; later ops must not land before it.
            *buf = ops;
            let _ = durable_tx.send(Err(PersistError::Message(format!(
                "append of {} ops failed: {err}",
                buf.len()
            ))));
            Err(err)
        }
    }
}
