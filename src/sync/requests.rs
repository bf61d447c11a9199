use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(Uuid);

impl OperationId {
    fn new() -> Self {
        OperationId(Uuid::new_v4())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an outstanding storage request was for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingRequest {
    ListNotebooks { offset: usize, limit: usize },
    ListLinkedNotebooks { offset: usize, limit: usize },
    FindLinkedNotebook { guid: String },
    VerifyName { local_id: String, name: String },
    CreateNotebook { local_id: String },
    UpdateNotebook { local_id: String },
    ExpungeNotebook { local_id: String },
    NoteCount { local_id: String },
}

impl PendingRequest {
    pub fn label(&self) -> &'static str {
        match self {
            PendingRequest::ListNotebooks { .. } => "list notebooks",
            PendingRequest::ListLinkedNotebooks { .. } => "list linked notebooks",
            PendingRequest::FindLinkedNotebook { .. } => "find linked notebook",
            PendingRequest::VerifyName { .. } => "verify notebook name",
            PendingRequest::CreateNotebook { .. } => "create notebook",
            PendingRequest::UpdateNotebook { .. } => "update notebook",
            PendingRequest::ExpungeNotebook { .. } => "expunge notebook",
            PendingRequest::NoteCount { .. } => "note count",
        }
    }
}

struct TrackedRequest {
    request: PendingRequest,
    issued_at: DateTime<Utc>,
}

/// Every request in flight, keyed by its operation id.
#[derive(Default)]
pub struct RequestTracker {
    pending: HashMap<OperationId, TrackedRequest>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, request: PendingRequest) -> OperationId {
        let id = OperationId::new();
        log::debug!("[RequestTracker] {} issued: {:?}", id, request);
        self.pending.insert(
            id,
            TrackedRequest {
                request,
                issued_at: Utc::now(),
            },
        );
        id
    }

    /// Forget a finished request and hand back what it was for. Unknown ids
    /// give `None`.
    pub fn complete(&mut self, id: OperationId) -> Option<PendingRequest> {
        let tracked = self.pending.remove(&id)?;
        let elapsed = Utc::now() - tracked.issued_at;
        log::debug!(
            "[RequestTracker] {} {} finished in {} ms",
            id,
            tracked.request.label(),
            elapsed.num_milliseconds()
        );
        Some(tracked.request)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&PendingRequest) -> bool,
    {
        self.pending.values().filter(|t| predicate(&t.request)).count()
    }
}
