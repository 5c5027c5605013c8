//! Connectivity adapter: takes level-triggered online/offline notifications
//! from the platform and hands out edge-triggered subscriptions.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CameOnline,
    WentOffline,
}

pub struct NetworkMonitor {
    state: watch::Sender<bool>,
}

impl NetworkMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self { state }
    }

    /// Feed a level notification. Repeating the current level is a no-op.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            tracing::info!(
                "[NET] connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> NetworkTransitions {
        NetworkTransitions {
            rx: self.state.subscribe(),
        }
    }
}

/// Stream of connectivity edges for one subscriber.
pub struct NetworkTransitions {
    rx: watch::Receiver<bool>,
}

impl NetworkTransitions {
    /// Wait for the next edge. Returns `None` once the monitor is dropped.
    ///
    /// Notifications only fire on real changes, so every wake-up means at
    /// least one edge happened; when several were coalesced (a quick flap)
    /// the last one points at the current level.
    pub async fn next(&mut self) -> Option<Transition> {
        self.rx.changed().await.ok()?;
        let online = *self.rx.borrow_and_update();
        Some(if online {
            Transition::CameOnline
        } else {
            Transition::WentOffline
        })
    }
}
