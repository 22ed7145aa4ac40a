use std::collections::HashMap;
use std::sync::Mutex;

use super::flows::FlowState;

/// In-progress state for one chat's active flow. Never persisted; lost on
/// restart, which is fine because flows are short.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub chat_id: i64,
    pub flow: FlowState,
}

/// All live sessions, keyed by chat. At most one per chat; putting a new one
/// supersedes whatever was there.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the chat's session; the caller owns the step and
    /// puts the session back only if the flow continues.
    pub fn take(&self, chat_id: i64) -> Option<Session> {
        self.inner.lock().unwrap().remove(&chat_id)
    }

    pub fn put(&self, session: Session) {
        self.inner.lock().unwrap().insert(session.chat_id, session);
    }

    /// Discard any active flow; returns whether one existed.
    pub fn clear(&self, chat_id: i64) -> bool {
        self.inner.lock().unwrap().remove(&chat_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::flows::{FlowState, MealFlow};

    #[test]
    fn sessions_are_independent_per_chat() {
        let store = SessionStore::new();
        store.put(Session {
            chat_id: 1,
            flow: FlowState::Water,
        });
        store.put(Session {
            chat_id: 2,
            flow: FlowState::Meal(MealFlow::SelectMealType),
        });
        assert_eq!(store.len(), 2);
        assert_eq!(store.take(1).unwrap().flow, FlowState::Water);
        assert_eq!(store.len(), 1);
        assert!(store.take(1).is_none());
    }

    #[test]
    fn put_supersedes_existing_session() {
        let store = SessionStore::new();
        store.put(Session {
            chat_id: 7,
            flow: FlowState::Water,
        });
        store.put(Session {
            chat_id: 7,
            flow: FlowState::Meal(MealFlow::SelectMealType),
        });
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.take(7).unwrap().flow,
            FlowState::Meal(MealFlow::SelectMealType)
        );
    }

    #[test]
    fn clear_reports_whether_a_session_existed() {
        let store = SessionStore::new();
        assert!(!store.clear(9));
        store.put(Session {
            chat_id: 9,
            flow: FlowState::Water,
        });
        assert!(store.clear(9));
        assert!(store.is_empty());
    }
}
