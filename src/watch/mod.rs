// src/watch/mod.rs

//! File watching and change classification.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Composing `.dockerignore`, built-in and per-trigger ignore rules.
//! - Turning raw changes into [`FileEvent`]s for a trigger.
//! - Debouncing bursts of events into ordered batches.
//!
//! It does **not** know how a batch is applied to a container; that is the
//! job of [`crate::engine`].

pub mod debounce;
pub mod event;
pub mod ignore;
pub mod path_utils;
pub mod watcher;

pub use debounce::{batch_debounce_events, QUIET_PERIOD};
pub use event::{maybe_file_event, FileEvent, PathMapping};
pub use ignore::{
    load_dockerignore, service_ignores, trigger_ignores, CompositeMatcher,
    DockerPatternMatcher, EphemeralPathMatcher, PathMatcher,
};
pub use watcher::{
    FileChange, Notify, NotifyWatcher, NotifyWatcherFactory, WatchStreams, WatcherFactory,
};
