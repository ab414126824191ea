use parking_lot::Mutex;

use crate::WatchKind;

/// Lifecycle of a one-shot watch on a single path.
///
/// The underlying service fires a watch once and forgets it; the
/// synchronizer re-arms by re-reading the path while still holding the
/// update lock, so no change can slip between the firing and the reinstall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No watch installed yet
    Unarmed,
    /// Watch installed; the next change delivers one event
    Armed,
    /// Event delivered, reinstall pending
    Fired,
    /// Synchronizer closed; the watch is never re-armed
    Abandoned,
}

#[derive(Debug)]
pub(crate) struct PathWatch {
    path: &'static str,
    kind: WatchKind,
    state: Mutex<WatchState>,
}

impl PathWatch {
    pub(crate) fn new(path: &'static str, kind: WatchKind) -> Self {
        Self {
            path,
            kind,
            state: Mutex::new(WatchState::Unarmed),
        }
    }

    pub(crate) fn path(&self) -> &'static str {
        self.path
    }

    pub(crate) fn kind(&self) -> WatchKind {
        self.kind
    }

    pub(crate) fn state(&self) -> WatchState {
        *self.state.lock()
    }

    /// A read with `watch = true` completed; the service holds a live watch.
    pub(crate) fn armed(&self) {
        let mut state = self.state.lock();
        if *state != WatchState::Abandoned {
            *state = WatchState::Armed;
        }
    }

    /// An event for this path arrived. Returns false when the watch was
    /// already abandoned and the event should be ignored.
    pub(crate) fn fired(&self) -> bool {
        let mut state = self.state.lock();
        if *state == WatchState::Abandoned {
            return false;
        }
        *state = WatchState::Fired;
        true
    }

    pub(crate) fn abandon(&self) {
        *self.state.lock() = WatchState::Abandoned;
    }
}
