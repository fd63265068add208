//! ytsort-org library interface
//!
//! Builds a desired ordering for each category's primary, backlog and queue
//! collections and reconciles the live remote collections against it.
//! Exposed as a library so integration tests can drive the full loop against
//! [`remote::MemoryRemote`].

pub mod builder;
pub mod cache;
pub mod controller;
pub mod duplicates;
pub mod error;
pub mod models;
pub mod organizer;
pub mod ranks;
pub mod remote;
pub mod sequencer;
pub mod store;
pub mod sync;

pub use crate::error::{Error, Result};

use crate::builder::CapacityLimits;
use crate::cache::RecordCache;
use crate::models::ValidityWindow;
use crate::remote::CollectionAccessor;
use crate::store::StateStore;
use std::sync::Arc;
use std::time::Duration;
use ytsort_common::config::OrganizerConfig;

/// Tunables shared by every phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizerSettings {
    pub limits: CapacityLimits,
    pub window: ValidityWindow,
    pub max_iterations: usize,
    /// Pause between a correction pass and the next verification
    pub verify_wait: Duration,
    /// Classify and log operations without mutating the remote
    pub dry_run: bool,
}

impl OrganizerSettings {
    pub fn from_config(config: &OrganizerConfig, dry_run: bool) -> Self {
        Self {
            limits: CapacityLimits::from_config(config),
            window: ValidityWindow::from_config(config),
            max_iterations: config.max_iterations,
            verify_wait: Duration::from_secs(config.verify_wait_secs),
            dry_run,
        }
    }
}

/// Collaborators handed to every component
#[derive(Clone)]
pub struct OrganizerContext {
    pub accessor: Arc<dyn CollectionAccessor>,
    pub cache: Arc<dyn RecordCache>,
    pub store: StateStore,
    pub settings: OrganizerSettings,
}

impl OrganizerContext {
    pub fn new(
        accessor: Arc<dyn CollectionAccessor>,
        cache: Arc<dyn RecordCache>,
        store: StateStore,
        settings: OrganizerSettings,
    ) -> Self {
        Self {
            accessor,
            cache,
            store,
            settings,
        }
    }

    pub fn dry_run(&self) -> bool {
        self.settings.dry_run
    }
}
