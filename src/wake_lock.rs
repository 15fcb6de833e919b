// Screen wake lock for the live tally.
//
// The lock is held exactly while the live tab is in front and the screen is
// visible. The platform can refuse or revoke the lock at any time; that is
// logged and retried on the next tab or visibility event, never fatal.

use anyhow::Result;
use tracing::{debug, warn};

/// Main navigation tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabId {
    Roster,
    Matches,
    Stats,
    Live,
    Results,
}

impl TabId {
    pub fn as_str(self) -> &'static str {
        match self {
            TabId::Roster => "roster",
            TabId::Matches => "matches",
            TabId::Stats => "stats",
            TabId::Live => "live",
            TabId::Results => "results",
        }
    }

    pub fn parse(s: &str) -> Option<TabId> {
        match s {
            "roster" => Some(TabId::Roster),
            "matches" => Some(TabId::Matches),
            "stats" => Some(TabId::Stats),
            "live" => Some(TabId::Live),
            "results" => Some(TabId::Results),
            _ => None,
        }
    }
}

/// Platform seam for the actual lock.
pub trait WakeLock: Send {
    fn request(&mut self) -> Result<()>;
    fn release(&mut self) -> Result<()>;
}

/// Backend for platforms without a wake lock.
#[derive(Debug, Default)]
pub struct NoopWakeLock;

impl WakeLock for NoopWakeLock {
    fn request(&mut self) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Tracks the active tab and the visibility state and keeps the backend lock
/// in step with them.
pub struct WakeLockController {
    backend: Box<dyn WakeLock>,
    active_tab: TabId,
    visible: bool,
    held: bool,
}

impl WakeLockController {
    pub fn new(backend: Box<dyn WakeLock>) -> Self {
        WakeLockController {
            backend,
            active_tab: TabId::Roster,
            visible: true,
            held: false,
        }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn active_tab(&self) -> TabId {
        self.active_tab
    }

    pub fn tab_changed(&mut self, tab: TabId) {
        self.active_tab = tab;
        self.sync();
    }

    /// The screen was hidden or shown again. Regaining visibility while the
    /// live tab was last active re-requests the lock.
    pub fn visibility_changed(&mut self, visible: bool) {
        self.visible = visible;
        self.sync();
    }

    fn sync(&mut self) {
        let wanted = self.active_tab == TabId::Live && self.visible;
        if wanted == self.held {
            return;
        }
        let result = if wanted {
            self.backend.request()
        } else {
            self.backend.release()
        };
        match result {
            Ok(()) => {
                self.held = wanted;
                debug!(held = self.held, "wake lock state changed");
            }
            Err(err) => warn!(error = %err, "wake lock backend failure"),
        }
    }
}

impl Drop for WakeLockController {
    fn drop(&mut self) {
        if self.held {
            if let Err(err) = self.backend.release() {
                warn!(error = %err, "failed to release wake lock on shutdown");
            }
        }
    }
}
