//! Shared helpers for dispatcher integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use dbot_core::{handler_fn, step_fn, Answers, Handler, Message, StepHandler};
use serde_json::{json, Value};

pub fn raw_message(user_id: i64, message_id: i64, text: Option<&str>) -> Value {
    let mut raw = json!({
        "message_id": message_id,
        "date": 1706529600 + message_id,
        "chat": {"id": user_id, "type": "private"},
        "from": {"id": user_id, "is_bot": false, "first_name": "Test", "username": "test_user"}
    });
    if let Some(text) = text {
        raw["text"] = json!(text);
    }
    raw
}

pub fn create_test_message(user_id: i64, message_id: i64, text: &str) -> Message {
    Message::from_raw(raw_message(user_id, message_id, Some(text))).unwrap()
}

pub fn create_photo_message(user_id: i64, message_id: i64) -> Message {
    let mut raw = raw_message(user_id, message_id, None);
    raw["photo"] = json!([{"file_id": "p1", "width": 90, "height": 90}]);
    Message::from_raw(raw).unwrap()
}

/// One recorded handler call: label, message text and, for step handlers, the answer keys with
/// their texts.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub label: String,
    pub text: Option<String>,
    pub answers: Option<Vec<(String, Option<String>)>>,
}

#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.label).collect()
    }

    pub fn handler(&self, label: &str) -> Arc<dyn Handler> {
        let calls = self.calls.clone();
        let label = label.to_string();
        handler_fn(move |msg: Message| {
            let calls = calls.clone();
            let label = label.clone();
            async move {
                calls.lock().unwrap().push(Call {
                    label,
                    text: msg.content.clone(),
                    answers: None,
                });
                Ok(())
            }
        })
    }

    pub fn step(&self, label: &str) -> Arc<dyn StepHandler> {
        let calls = self.calls.clone();
        let label = label.to_string();
        step_fn(move |msg: Message, answers: Answers| {
            let calls = calls.clone();
            let label = label.clone();
            async move {
                let answers = answers
                    .iter()
                    .map(|(step, m)| (step.clone(), m.content.clone()))
                    .collect();
                calls.lock().unwrap().push(Call {
                    label,
                    text: msg.content.clone(),
                    answers: Some(answers),
                });
                Ok(())
            }
        })
    }
}
