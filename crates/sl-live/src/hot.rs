//! Delivery of rebuilt units to a running session.
//!
//! A [`HotContext`] lives as long as the session. It holds the single reload
//! callback and the identity of the unit delivered last, so a unit delivered
//! twice in a row is only handed to the callback once.

use std::fmt;

use sl_build::{ModuleId, StoryModule};
use sl_story::Story;
use tracing::{debug, info};

use crate::error::LiveResult;

/// Reason given when a unit arrives and no callback is registered.
pub const NO_CALLBACK_REASON: &str =
    "no reload callback is registered; register one with on_hot_reload to keep the session across rebuilds";

/// Reason given when a rebuild produced no unit.
pub const NO_MODULE_REASON: &str = "the rebuilt root produced no module";

/// Callback receiving the story built from each newly delivered unit.
pub type ReloadCallback = Box<dyn FnMut(Story)>;

/// What happened to a delivered unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotUpdate {
    /// The callback received a story built from the unit.
    Transferred {
        /// The delivered unit.
        id: ModuleId,
    },
    /// The unit is the one delivered last; the callback was not invoked.
    Duplicate,
    /// The session cannot be kept and the host has to restart it.
    FullReload {
        /// Why the state could not be transferred.
        reason: String,
    },
}

/// Reload state carried across deliveries.
#[derive(Default)]
pub struct HotContext {
    callback: Option<ReloadCallback>,
    last_delivered: Option<ModuleId>,
}

impl fmt::Debug for HotContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotContext")
            .field("callback", &self.callback.is_some())
            .field("last_delivered", &self.last_delivered)
            .finish()
    }
}

impl HotContext {
    /// Context with nothing delivered yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a session started from `module`.
    pub fn for_module(module: &StoryModule) -> Self {
        Self {
            callback: None,
            last_delivered: Some(module.id()),
        }
    }

    /// Install the reload callback, replacing any earlier one.
    pub fn on_hot_reload(&mut self, callback: impl FnMut(Story) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Returns `true` once a callback is installed.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// The unit delivered last.
    pub fn last_delivered(&self) -> Option<ModuleId> {
        self.last_delivered
    }

    /// Deliver a rebuilt unit, or `None` when the rebuild failed.
    ///
    /// With a callback installed and a unit different from the last one, the
    /// callback is invoked exactly once with a fresh story and stays installed
    /// for the next delivery.
    pub fn accept(&mut self, module: Option<StoryModule>) -> LiveResult<HotUpdate> {
        let Some(module) = module else {
            return Ok(HotUpdate::FullReload {
                reason: NO_MODULE_REASON.to_string(),
            });
        };

        let Some(callback) = self.callback.as_mut() else {
            info!(id = %module.id(), "full reload required");
            self.last_delivered = Some(module.id());
            return Ok(HotUpdate::FullReload {
                reason: NO_CALLBACK_REASON.to_string(),
            });
        };

        if self.last_delivered == Some(module.id()) {
            debug!(id = %module.id(), "duplicate delivery ignored");
            return Ok(HotUpdate::Duplicate);
        }

        let story = module.story()?;
        self.last_delivered = Some(module.id());
        debug!(id = %module.id(), root = %module.root().display(), "transferring session");
        callback(story);
        Ok(HotUpdate::Transferred { id: module.id() })
    }
}
