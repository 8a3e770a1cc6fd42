//! Reply keyboard layout helper.
//!
//! ```
//! use dbot_telegram::ReplyKeyboardMarkup;
//!
//! let markup = ReplyKeyboardMarkup::new().row(["S", "M", "L"]).column(["Back"]);
//! assert_eq!(markup.keyboard.len(), 2);
//! ```

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

impl From<&str> for KeyboardButton {
    fn from(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl From<String> for KeyboardButton {
    fn from(text: String) -> Self {
        Self { text }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    pub one_time_keyboard: bool,
    pub selective: bool,
}

impl Default for ReplyKeyboardMarkup {
    fn default() -> Self {
        Self {
            keyboard: Vec::new(),
            resize_keyboard: true,
            one_time_keyboard: false,
            selective: true,
        }
    }
}

impl ReplyKeyboardMarkup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resize_keyboard(mut self, resize: bool) -> Self {
        self.resize_keyboard = resize;
        self
    }

    pub fn one_time_keyboard(mut self, one_time: bool) -> Self {
        self.one_time_keyboard = one_time;
        self
    }

    /// Appends one row holding all `buttons`.
    pub fn row<I, B>(mut self, buttons: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<KeyboardButton>,
    {
        self.keyboard
            .push(buttons.into_iter().map(Into::into).collect());
        self
    }

    /// Appends one row per button.
    pub fn column<I, B>(mut self, buttons: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<KeyboardButton>,
    {
        self.keyboard
            .extend(buttons.into_iter().map(|b| vec![b.into()]));
        self
    }
}

impl From<ReplyKeyboardMarkup> for Value {
    fn from(markup: ReplyKeyboardMarkup) -> Self {
        serde_json::json!({
            "keyboard": markup.keyboard,
            "resize_keyboard": markup.resize_keyboard,
            "one_time_keyboard": markup.one_time_keyboard,
            "selective": markup.selective,
        })
    }
}
