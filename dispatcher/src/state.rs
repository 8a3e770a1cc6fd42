//! Persisted conversation state: the current step frame and the stack of previous frames.
//!
//! Stored per user at `users/{id}` as `{ "state": frame, "previous_state": [frame, ...] }`
//! (bottom of the stack first). Answers collected by mid-flow steps live at `users/{id}/updates`.

use dbot_core::{Message, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::RouteKey;

pub const USERS_ROOT: &str = "users";

pub fn user_path(user_id: i64) -> String {
    format!("{}/{}", USERS_ROOT, user_id)
}

pub fn answers_path(user_id: i64) -> String {
    format!("{}/{}/updates", USERS_ROOT, user_id)
}

/// One visited step: its name, the message that triggered it, and the registry route that handled it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    pub step: String,
    pub snapshot: Value,
    #[serde(default)]
    pub content: Option<String>,
    pub route: RouteKey,
}

impl StackFrame {
    pub fn new(step: impl Into<String>, message: &Message, route: RouteKey) -> Self {
        Self {
            step: step.into(),
            snapshot: message.raw.clone(),
            content: message.content.clone(),
            route,
        }
    }

    /// Rebuilds the triggering message from the stored snapshot.
    pub fn message(&self) -> Result<Message> {
        Message::from_raw(self.snapshot.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub state: StackFrame,
    #[serde(default)]
    pub previous_state: Vec<StackFrame>,
}

/// Result of stepping back one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewind {
    /// Frame being returned to; its step is replayed.
    pub top: StackFrame,
    /// Frame below `top`, present when `top` was reached by a mid-flow transition.
    pub answer: Option<StackFrame>,
}

impl ConversationState {
    /// Fresh conversation rooted at `frame`.
    pub fn start(frame: StackFrame) -> Self {
        Self {
            state: frame,
            previous_state: Vec::new(),
        }
    }

    pub fn current_step(&self) -> &str {
        &self.state.step
    }

    pub fn depth(&self) -> usize {
        self.previous_state.len()
    }

    pub fn is_root(&self) -> bool {
        self.previous_state.is_empty()
    }

    /// Forward transition. The current frame is pushed only when `frame` names a different step.
    pub fn advance(&mut self, frame: StackFrame) {
        if frame.step != self.state.step {
            let current = std::mem::replace(&mut self.state, frame);
            self.previous_state.push(current);
        } else {
            self.state = frame;
        }
    }

    /// Backward transition; `None` at the root.
    ///
    /// Pops `top`. If a frame lies below it, that frame is popped too and becomes the current step,
    /// then `top` is re-entered from it, so the net result is `top` current with the frame below
    /// back on the stack. Without a frame below, `top` simply becomes current.
    pub fn rewind(&mut self) -> Option<Rewind> {
        let top = self.previous_state.pop()?;
        match self.previous_state.pop() {
            Some(answer) => {
                self.state = answer.clone();
                self.advance(top.clone());
                Some(Rewind {
                    top,
                    answer: Some(answer),
                })
            }
            None => {
                self.state = top.clone();
                Some(Rewind { top, answer: None })
            }
        }
    }
}

/// Shape of the user document as read back; `state` is absent before the first entry step.
#[derive(Debug, Deserialize)]
pub(crate) struct UserDocument {
    #[serde(default)]
    pub state: Option<StackFrame>,
    #[serde(default)]
    pub previous_state: Vec<StackFrame>,
}

impl UserDocument {
    pub(crate) fn into_state(self) -> Option<ConversationState> {
        self.state.map(|state| ConversationState {
            state,
            previous_state: self.previous_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(step: &str) -> StackFrame {
        StackFrame {
            step: step.to_string(),
            snapshot: json!({"text": step}),
            content: Some(step.to_string()),
            route: RouteKey::Text(step.to_string()),
        }
    }

    fn steps(frames: &[StackFrame]) -> Vec<&str> {
        frames.iter().map(|f| f.step.as_str()).collect()
    }

    #[test]
    fn test_paths() {
        assert_eq!(user_path(7), "users/7");
        assert_eq!(answers_path(7), "users/7/updates");
    }

    #[test]
    fn test_advance_distinct_steps_grows_stack() {
        let mut conversation = ConversationState::start(frame("start"));
        for (i, step) in ["a", "b", "c"].iter().enumerate() {
            conversation.advance(frame(step));
            assert_eq!(conversation.depth(), i + 1);
            assert_eq!(conversation.current_step(), *step);
        }
        assert_eq!(steps(&conversation.previous_state), vec!["start", "a", "b"]);
    }

    #[test]
    fn test_advance_same_step_keeps_depth() {
        let mut conversation = ConversationState::start(frame("start"));
        conversation.advance(frame("a"));
        let mut again = frame("a");
        again.content = Some("second".to_string());
        conversation.advance(again);

        assert_eq!(conversation.depth(), 1);
        assert_eq!(conversation.state.content.as_deref(), Some("second"));
    }

    #[test]
    fn test_rewind_at_root_is_none() {
        let mut conversation = ConversationState::start(frame("start"));
        assert!(conversation.rewind().is_none());
        assert_eq!(conversation.current_step(), "start");
    }

    #[test]
    fn test_rewind_single_frame() {
        let mut conversation = ConversationState::start(frame("start"));
        conversation.advance(frame("a"));

        let rewind = conversation.rewind().unwrap();
        assert_eq!(rewind.top.step, "start");
        assert!(rewind.answer.is_none());
        assert_eq!(conversation.current_step(), "start");
        assert!(conversation.is_root());
    }

    #[test]
    fn test_rewind_with_answer_frame_reenters_top() {
        let mut conversation = ConversationState::start(frame("start"));
        conversation.advance(frame("a"));
        conversation.advance(frame("b"));

        let rewind = conversation.rewind().unwrap();
        assert_eq!(rewind.top.step, "a");
        assert_eq!(rewind.answer.map(|f| f.step), Some("start".to_string()));
        assert_eq!(conversation.current_step(), "a");
        assert_eq!(steps(&conversation.previous_state), vec!["start"]);
    }

    #[test]
    fn test_push_pop_symmetry() {
        let mut conversation = ConversationState::start(frame("start"));
        let names = ["a", "b", "c", "d"];
        for step in names {
            conversation.advance(frame(step));
        }
        for _ in names {
            assert!(conversation.rewind().is_some());
        }
        assert!(conversation.is_root());
        assert_eq!(conversation.current_step(), "start");
    }

    #[test]
    fn test_serialized_shape() {
        let conversation = ConversationState::start(frame("start"));
        let value = serde_json::to_value(&conversation).unwrap();
        assert_eq!(value["state"]["step"], json!("start"));
        assert_eq!(value["state"]["route"], json!({"kind": "text", "key": "start"}));
        assert_eq!(value["previous_state"], json!([]));
    }

    #[test]
    fn test_user_document_without_state() {
        let doc: UserDocument = serde_json::from_value(json!({"updates": {"a": {}}})).unwrap();
        assert!(doc.into_state().is_none());

        let doc: UserDocument =
            serde_json::from_value(json!({"state": serde_json::to_value(frame("start")).unwrap()}))
                .unwrap();
        let state = doc.into_state().unwrap();
        assert!(state.is_root());
    }
}
