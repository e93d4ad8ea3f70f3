//! The control loop that keeps the mirror in sync.
//!
//! # Architecture
//!
//! ```text
//! notify thread --(FsEvent)----> events  --+
//!               --(WatchError)-> errors  --+--> Dispatcher::run
//!                                                 classify -> plan -> execute
//!                                                   |            |
//!                                                WatchSet    mirror ops, Rebuilder
//! ```
//!
//! One thread does all the work, one event at a time, so the watch set needs
//! no locking and a directory creation is fully applied before the next event
//! is classified.

use crossbeam_channel::{Receiver, after, never, select, unbounded};
use notify::Event;

use crate::config::RebuildConfig;
use crate::context::{MirrorContext, StartupError};
use crate::mirror::{self, ops};
use crate::rebuild::{CompilerCommand, Rebuilder};

use super::debouncer::Debouncer;
use super::dispatcher::{MirrorCommand, plan};
use super::error::WatchError;
use super::event::FsEvent;
use super::watch_set::{WatchBackend, WatchSet};

/// Event dispatcher with its state: the context, the watch set and the rebuilder.
pub struct Dispatcher<B, R> {
    ctx: MirrorContext,
    watch_set: WatchSet<B>,
    rebuilder: R,
    debouncer: Debouncer,
    rebuilds: usize,
}

impl<B: WatchBackend, R: Rebuilder> Dispatcher<B, R> {
    /// `debounce_ms` of 0 rebuilds once per qualifying event.
    pub fn new(ctx: MirrorContext, watch_set: WatchSet<B>, rebuilder: R, debounce_ms: u64) -> Self {
        Self {
            ctx,
            watch_set,
            rebuilder,
            debouncer: Debouncer::new(debounce_ms),
            rebuilds: 0,
        }
    }

    /// Mirror the whole source tree and register every directory.
    pub fn initial_sync(&mut self) -> mirror::SyncStats {
        mirror::sync(&self.ctx, &mut self.watch_set)
    }

    /// Handle one event to completion.
    pub fn handle_event(&mut self, event: FsEvent) {
        crate::debug_event!("watcher", "event", "{} {}", event.op, event.path.display());

        if !event.is_well_formed() {
            crate::debug_event!("watcher", "discarded", "{:?}", event.path);
            return;
        }

        let dir_hint = event.dir_hint;
        let info = mirror::classify(&self.ctx, &event.path, |p| {
            dir_hint || self.watch_set.contains(p)
        });
        let target = self.ctx.output_path(&info.relative_path);

        for command in plan(&info, &target, event.op) {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: MirrorCommand) {
        match command {
            MirrorCommand::Watch(dir) => {
                if let Err(e) = self.watch_set.add(&dir) {
                    tracing::warn!("[watcher] {e}");
                }
            }
            MirrorCommand::Unwatch(dir) => {
                self.watch_set.remove_tree(&dir);
            }
            MirrorCommand::MakeDir { src, dst } => {
                if let Err(e) = ops::mk_dir_like(&src, &dst) {
                    tracing::warn!("[mirror] {e}");
                }
            }
            MirrorCommand::RemoveTree(dst) => {
                let left = ops::remove_tree(&dst);
                if left > 0 {
                    tracing::warn!("[mirror] {left} entries left under {}", dst.display());
                }
            }
            MirrorCommand::CopyFile { src, dst } => {
                if let Err(e) = ops::copy_file(&src, &dst) {
                    tracing::warn!("[mirror] {e}");
                }
            }
            MirrorCommand::RemoveFile(dst) => {
                if let Err(e) = ops::remove_file(&dst) {
                    tracing::warn!("[mirror] {e}");
                }
            }
            MirrorCommand::MirrorTree(src) => {
                let stats = mirror::sync_tree(&self.ctx, &mut self.watch_set, &src);
                crate::log_event!("mirror", "subtree", "{} ({stats})", src.display());
            }
            MirrorCommand::Rebuild => self.request_rebuild(),
        }
    }

    fn request_rebuild(&mut self) {
        if self.debouncer.is_immediate() {
            self.run_rebuild();
        } else {
            self.debouncer.record();
        }
    }

    fn run_rebuild(&mut self) {
        self.rebuilds += 1;

        match self.rebuilder.rebuild() {
            Ok(outcome) => {
                crate::log_event!("rebuild", "done", "{:.2?}", outcome.duration);
                if !outcome.output.is_empty() {
                    tracing::info!("{}", outcome.output);
                }
            }
            Err(e) => {
                tracing::error!("[rebuild] {e}");
            }
        }
    }

    /// Run a debounced rebuild whose quiet period has elapsed.
    pub fn flush_ready(&mut self) {
        if self.debouncer.take_ready() {
            self.run_rebuild();
        }
    }

    /// Consume both queues until they are disconnected.
    ///
    /// Events and errors are served in arrival order with no priority between
    /// the two. A pending debounced rebuild is run when its quiet period ends,
    /// or before returning.
    pub fn run(&mut self, events: &Receiver<FsEvent>, errors: &Receiver<WatchError>) {
        let closed_events = never();
        let closed_errors = never();
        let mut events_open = true;
        let mut errors_open = true;

        crate::log_event!("watcher", "started");

        while events_open || errors_open {
            let events_rx = if events_open { events } else { &closed_events };
            let errors_rx = if errors_open { errors } else { &closed_errors };
            let deadline = match self.debouncer.time_until_ready() {
                Some(wait) => after(wait),
                None => never(),
            };

            select! {
                recv(events_rx) -> msg => match msg {
                    Ok(event) => self.handle_event(event),
                    Err(_) => events_open = false,
                },
                recv(errors_rx) -> msg => match msg {
                    Ok(err) => tracing::error!("[watcher] {err}"),
                    Err(_) => errors_open = false,
                },
                recv(deadline) -> _ => self.flush_ready(),
            }
        }

        if self.debouncer.take_pending() {
            self.run_rebuild();
        }
        crate::log_event!("watcher", "stopped");
    }

    pub fn context(&self) -> &MirrorContext {
        &self.ctx
    }

    pub fn watch_set(&self) -> &WatchSet<B> {
        &self.watch_set
    }

    pub fn rebuilder(&self) -> &R {
        &self.rebuilder
    }

    /// Number of rebuilds attempted so far, failed ones included.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }
}

/// Start watching `ctx`'s source root and mirror it until the process ends.
///
/// The watcher is created before the initial mirror so changes made during
/// the walk are queued instead of lost.
pub fn run_watch(ctx: MirrorContext, config: &RebuildConfig) -> Result<(), StartupError> {
    let (event_tx, event_rx) = unbounded::<FsEvent>();
    let (error_tx, error_rx) = unbounded::<WatchError>();

    let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for fs_event in FsEvent::from_notify(event) {
                let _ = event_tx.send(fs_event);
            }
        }
        Err(e) => {
            let _ = error_tx.send(WatchError::from(e));
        }
    })
    .map_err(|e| WatchError::InitFailed {
        reason: e.to_string(),
    })?;

    let rebuilder = CompilerCommand::new(&ctx, config);
    let mut dispatcher = Dispatcher::new(ctx, WatchSet::new(watcher), rebuilder, config.debounce_ms);

    let stats = dispatcher.initial_sync();
    crate::log_event!("mirror", "initial sync", "{stats}");

    if !dispatcher.watch_set().contains(dispatcher.context().source_root()) {
        return Err(WatchError::PathWatchFailed {
            path: dispatcher.context().source_root().to_path_buf(),
            reason: "root directory could not be watched".to_string(),
        }
        .into());
    }

    crate::log_event!(
        "watcher",
        "watch",
        "{} => {} ({} directories)",
        dispatcher.context().source_root().display(),
        dispatcher.context().output_root().display(),
        dispatcher.watch_set().len()
    );

    dispatcher.run(&event_rx, &error_rx);
    Ok(())
}
