//! Demo order conversation driven end to end through the dispatcher with a recording bot.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dbot_cli::demo::{COLOUR_PROMPT, HELP_TEXT, ROOT_BACK_TEXT, SIZE_PROMPT, UNKNOWN_TEXT};
use dbot_cli::order_registry;
use dbot_core::{Bot, Message, Reply, Result, SendOptions};
use dispatcher::{DispatchOutcome, Dispatcher};
use serde_json::{json, Value};
use storage::InMemoryDocumentStore;

const USER: i64 = 321;

#[derive(Debug, Clone)]
struct Sent {
    text: String,
    markup: Option<Value>,
}

#[derive(Default)]
struct RecordingBot {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingBot {
    fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|s| s.text.clone()).collect()
    }

    fn last(&self) -> Sent {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }

    fn echo(&self, chat_id: i64, text: &str) -> Message {
        Message::from_raw(json!({
            "message_id": 1000,
            "date": 1706529600,
            "chat": {"id": chat_id, "type": "private"},
            "from": {"id": 1, "is_bot": true, "first_name": "OrderBot"},
            "text": text
        }))
        .unwrap()
    }
}

#[async_trait]
impl Bot for RecordingBot {
    async fn send_message(&self, chat_id: i64, text: &str, options: SendOptions) -> Result<Message> {
        self.sent.lock().unwrap().push(Sent {
            text: text.to_string(),
            markup: options.reply_markup,
        });
        Ok(self.echo(chat_id, text))
    }

    async fn reply_to(&self, message: &Message, text: &str, options: SendOptions) -> Result<Reply> {
        let sent = self.send_message(message.chat_id(), text, options).await?;
        Ok(Reply {
            message: sent,
            reply_to_message: Some(message.clone()),
        })
    }
}

fn message(id: i64, text: &str) -> Message {
    Message::from_raw(json!({
        "message_id": id,
        "date": 1706529600 + id,
        "chat": {"id": USER, "type": "private"},
        "from": {"id": USER, "is_bot": false, "first_name": "Ann"},
        "text": text
    }))
    .unwrap()
}

fn setup() -> (Arc<RecordingBot>, Dispatcher) {
    let bot = Arc::new(RecordingBot::default());
    let registry = order_registry(bot.clone()).unwrap();
    let dispatcher = Dispatcher::new(registry, Arc::new(InMemoryDocumentStore::new()));
    (bot, dispatcher)
}

/// **Test: full order flow collects size and colour**
#[tokio::test]
async fn test_order_flow() {
    let (bot, dispatcher) = setup();

    dispatcher.dispatch(&message(1, "/start")).await.unwrap();
    dispatcher.dispatch(&message(2, "M")).await.unwrap();
    dispatcher.dispatch(&message(3, "Blue")).await.unwrap();

    assert_eq!(
        bot.texts(),
        vec![
            SIZE_PROMPT.to_string(),
            COLOUR_PROMPT.to_string(),
            "Order placed: size M, colour Blue.".to_string()
        ]
    );
    assert!(bot.last().markup.is_none());
}

/// **Test: size keyboard carries the choices and a Back row**
#[tokio::test]
async fn test_size_prompt_keyboard() {
    let (bot, dispatcher) = setup();
    dispatcher.dispatch(&message(1, "/start")).await.unwrap();

    let markup = bot.last().markup.unwrap();
    assert_eq!(
        markup["keyboard"],
        json!([[{"text": "S"}, {"text": "M"}, {"text": "L"}], [{"text": "Back"}]])
    );
}

/// **Test: Back re-asks the previous question, then the first one**
#[tokio::test]
async fn test_back_steps_through_questions() {
    let (bot, dispatcher) = setup();

    dispatcher.dispatch(&message(1, "/start")).await.unwrap();
    dispatcher.dispatch(&message(2, "L")).await.unwrap();
    dispatcher.dispatch(&message(3, "Red")).await.unwrap();
    dispatcher.dispatch(&message(4, "Back")).await.unwrap();
    assert_eq!(bot.last().text, COLOUR_PROMPT);

    dispatcher.dispatch(&message(5, "Back")).await.unwrap();
    assert_eq!(bot.last().text, SIZE_PROMPT);

    dispatcher.dispatch(&message(6, "Back")).await.unwrap();
    assert_eq!(bot.last().text, ROOT_BACK_TEXT);
}

/// **Test: a colour before a size is ignored**
#[tokio::test]
async fn test_out_of_order_choice_is_ignored() {
    let (bot, dispatcher) = setup();

    dispatcher.dispatch(&message(1, "/start")).await.unwrap();
    let outcome = dispatcher.dispatch(&message(2, "Red")).await.unwrap();

    assert!(matches!(outcome, DispatchOutcome::Gated(_)));
    assert_eq!(bot.texts(), vec![SIZE_PROMPT.to_string()]);
}

/// **Test: help and unknown input**
#[tokio::test]
async fn test_help_and_unknown() {
    let (bot, dispatcher) = setup();

    dispatcher.dispatch(&message(1, "/help")).await.unwrap();
    dispatcher.dispatch(&message(2, "pizza")).await.unwrap();

    assert_eq!(bot.texts(), vec![HELP_TEXT.to_string(), UNKNOWN_TEXT.to_string()]);
}

/// **Test: commands are published in registration order**
#[test]
fn test_published_commands() {
    let registry = order_registry(Arc::new(RecordingBot::default())).unwrap();
    let names: Vec<&str> = registry.commands().iter().map(|c| c.command.as_str()).collect();
    assert_eq!(names, vec!["start", "help"]);
}
