//! Demo order conversation.
//!
//! `/start` asks for a size, a size asks for a colour, a colour confirms the order. `Back` steps back
//! one question; `/help` and unknown input are answered without touching the conversation.

use std::sync::Arc;

use dbot_core::{handler_fn, step_fn, Answers, Bot, Message, Result, SendOptions};
use dbot_telegram::ReplyKeyboardMarkup;
use dispatcher::{HandlerSpec, Registry};
use tracing::info;

pub const SIZES: [&str; 3] = ["S", "M", "L"];
pub const COLOURS: [&str; 3] = ["Red", "Green", "Blue"];
pub const BACK: &str = "Back";

pub const SIZE_PROMPT: &str = "Which size would you like?";
pub const COLOUR_PROMPT: &str = "Which colour?";
pub const HELP_TEXT: &str = "Send /start to place an order. Use Back to change your previous answer.";
pub const ROOT_BACK_TEXT: &str = "Nothing to go back to. Send /start to begin.";
pub const UNKNOWN_TEXT: &str = "Sorry, I did not get that. Send /help for help.";

fn keyboard(choices: &[&str]) -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::new()
        .row(choices.iter().copied())
        .row([BACK])
}

fn answer<'a>(answers: &'a Answers, step: &str) -> &'a str {
    answers
        .get(step)
        .and_then(|m| m.text())
        .unwrap_or("?")
}

/// Builds the order bot's routing table. Replies go through `bot`.
pub fn order_registry(bot: Arc<dyn Bot>) -> Result<Registry> {
    let start = {
        let bot = bot.clone();
        handler_fn(move |msg: Message| {
            let bot = bot.clone();
            async move {
                info!(user_id = msg.user.id, "step: order started");
                bot.reply_to(
                    &msg,
                    SIZE_PROMPT,
                    SendOptions::new().reply_markup(keyboard(&SIZES)),
                )
                .await?;
                Ok(())
            }
        })
    };

    let pick_size = {
        let bot = bot.clone();
        step_fn(move |msg: Message, _answers: Answers| {
            let bot = bot.clone();
            async move {
                bot.send_message(
                    msg.chat_id(),
                    COLOUR_PROMPT,
                    SendOptions::new().reply_markup(keyboard(&COLOURS)),
                )
                .await?;
                Ok(())
            }
        })
    };

    let pick_colour = {
        let bot = bot.clone();
        step_fn(move |msg: Message, answers: Answers| {
            let bot = bot.clone();
            async move {
                let summary = format!(
                    "Order placed: size {}, colour {}.",
                    answer(&answers, "pick_size"),
                    answer(&answers, "pick_colour")
                );
                info!(user_id = msg.user.id, summary = %summary, "step: order completed");
                bot.send_message(msg.chat_id(), &summary, SendOptions::new())
                    .await?;
                Ok(())
            }
        })
    };

    let reply_with = |text: &'static str| {
        let bot = bot.clone();
        handler_fn(move |msg: Message| {
            let bot = bot.clone();
            async move {
                bot.send_message(msg.chat_id(), text, SendOptions::new())
                    .await?;
                Ok(())
            }
        })
    };

    let registry = Registry::builder()
        .command("start", "Start an order", HandlerSpec::enter("start", start))?
        .command("help", "How to use this bot", HandlerSpec::plain("help", reply_with(HELP_TEXT)))?
        .text(SIZES, HandlerSpec::advance("pick_size", "start", pick_size))?
        .text(COLOURS, HandlerSpec::advance("pick_colour", "pick_size", pick_colour))?
        .text([BACK], HandlerSpec::back("back", reply_with(ROOT_BACK_TEXT)))?
        .fallback(HandlerSpec::plain("unknown", reply_with(UNKNOWN_TEXT)))
        .build();
    Ok(registry)
}
