use crate::directions::DirectionsOutcome;
use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::model::{AuthOutcome, Club};
use crate::store::ClubStore;
use tokio::sync::mpsc;

/// What the UI is told about.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryEvent {
    /// A fresh list arrived; carries the visible subset under the current filter.
    ClubsLoaded(Vec<Club>),
    ClubLoadFailed(ClientError),
    FilterChanged(Vec<Club>),
    /// A single club requested through `open_club`.
    ClubLoaded(Club),
    AuthResult(Result<AuthOutcome, ClientError>),
    DirectionsOutcome(DirectionsOutcome),
}

// Results posted back by spawned gateway calls.
enum Completion {
    Clubs(Result<Vec<Club>, ClientError>),
    Club(Result<Club, ClientError>),
}

/// Screen-scoped owner of the club list.
///
/// Gateway calls run as spawned tasks; their results come back over a channel and
/// are applied to the `ClubStore` only inside `next_event`, i.e. on whichever task
/// owns the screen. Dropping the screen discards completions still in flight.
pub struct DirectoryScreen {
    gateway: Gateway,
    store: ClubStore,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    pending: usize,
}

impl DirectoryScreen {
    pub fn new(gateway: Gateway, category_keyword: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            gateway,
            store: ClubStore::new(category_keyword),
            tx,
            rx,
            pending: 0,
        }
    }

    pub fn store(&self) -> &ClubStore {
        &self.store
    }

    /// Number of requests whose completion has not been consumed yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Starts a full list fetch. Must be called from within a tokio runtime.
    pub fn refresh(&mut self) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            let result = gateway.list_clubs().await;
            // The screen may be gone; that is fine.
            let _ = tx.send(Completion::Clubs(result));
        });
    }

    /// Starts a server-side name search; the result replaces the whole list.
    pub fn search_remote(&mut self, query: &str) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        let query = query.to_string();
        self.pending += 1;
        tokio::spawn(async move {
            let result = gateway.search_clubs(&query).await;
            let _ = tx.send(Completion::Clubs(result));
        });
    }

    pub fn open_club(&mut self, id: &str) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        let id = id.to_string();
        self.pending += 1;
        tokio::spawn(async move {
            let result = gateway.get_club_by_id(&id).await;
            let _ = tx.send(Completion::Club(result));
        });
    }

    /// Synchronous: the visible list is re-derived before this returns.
    pub fn set_filter(&mut self, query: &str, category_only: bool) -> DirectoryEvent {
        self.store.apply_filter(query, category_only);
        DirectoryEvent::FilterChanged(self.store.visible().to_vec())
    }

    /// Waits for the next completion and applies it. Returns `None` when nothing
    /// is in flight.
    pub async fn next_event(&mut self) -> Option<DirectoryEvent> {
        if self.pending == 0 {
            return None;
        }
        let completion = self.rx.recv().await?;
        self.pending -= 1;

        Some(match completion {
            Completion::Clubs(Ok(clubs)) => {
                self.store.set_data(clubs);
                DirectoryEvent::ClubsLoaded(self.store.visible().to_vec())
            }
            Completion::Clubs(Err(e)) | Completion::Club(Err(e)) => {
                DirectoryEvent::ClubLoadFailed(e)
            }
            Completion::Club(Ok(club)) => DirectoryEvent::ClubLoaded(club),
        })
    }
}
