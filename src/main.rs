mod config;
mod quiz;
mod sessions;
mod view;

use std::sync::Arc;

use dotenv::dotenv;
use quiz::{
    effects::QuizServices,
    gateway::{GeminiGateway, ModelClient},
    session::{Command, Event},
};
use sessions::SessionStore;
use teloxide::{
    prelude::*,
    types::{ChatAction, KeyboardButton, KeyboardMarkup},
    utils::command::BotCommands,
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
enum BotCommand {
    #[command(description = "start over from subject selection.")]
    Start,
    #[command(description = "show this text.")]
    Help,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting drill bot...");

    let settings = config::Settings::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        e
    })?;
    log::info!(
        "Using model {} at {} ({} attempts per request)",
        settings.gemini_model,
        settings.gemini_api_base,
        settings.retry.max_attempts()
    );

    let gateway = GeminiGateway::new(
        &settings.gemini_api_base,
        &settings.gemini_model,
        settings.gemini_api_key.clone(),
        settings.request_timeout,
    )?;
    let client = Arc::new(ModelClient::new(Arc::new(gateway), settings.retry));
    let services = Arc::new(QuizServices::new(client, settings.regeneration));
    let store = Arc::new(SessionStore::new(settings.session_idle));

    let bot = Bot::from_env();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<BotCommand>()
                    .endpoint(receive_command),
            )
            .branch(dptree::endpoint(receive_text)),
    )
    .dependencies(dptree::deps![store, services])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

fn keyboard(rows: &[Vec<String>]) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = rows
        .iter()
        .map(|row| row.iter().map(|label| KeyboardButton::new(label.clone())).collect())
        .collect();
    KeyboardMarkup::new(rows)
}

async fn show(bot: &Bot, chat: ChatId, screen: view::Screen) -> HandlerResult {
    bot.send_message(chat, screen.text)
        .reply_markup(keyboard(&screen.buttons))
        .await?;
    Ok(())
}

async fn receive_command(
    bot: Bot,
    msg: Message,
    cmd: BotCommand,
    store: Arc<SessionStore>,
) -> HandlerResult {
    match cmd {
        BotCommand::Start => {
            let applied = store.apply(msg.chat.id, Event::Back);
            show(&bot, msg.chat.id, view::render(&applied.state)).await?;
        }
        BotCommand::Help => {
            bot.send_message(msg.chat.id, BotCommand::descriptions().to_string())
                .await?;
        }
    }
    Ok(())
}

async fn receive_text(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
    services: Arc<QuizServices>,
) -> HandlerResult {
    let chat = msg.chat.id;
    let Some(text) = msg.text() else {
        bot.send_message(chat, view::UNRECOGNIZED).await?;
        show(&bot, chat, view::render(&store.snapshot(chat))).await?;
        return Ok(());
    };

    let mut understood = true;
    let applied = store.apply_with(chat, |state| {
        let events = view::interpret(state, text);
        understood = !events.is_empty();
        events
    });

    // The new state is already stored, so its commands must run even if a send fails.
    spawn_commands(bot.clone(), chat, store, services, applied.commands);

    if !understood {
        bot.send_message(chat, view::UNRECOGNIZED).await?;
    }
    show(&bot, chat, view::render(&applied.state)).await?;
    Ok(())
}

/// Runs each command in the background and feeds its result back into the chat's session.
fn spawn_commands(
    bot: Bot,
    chat: ChatId,
    store: Arc<SessionStore>,
    services: Arc<QuizServices>,
    commands: Vec<Command>,
) {
    for command in commands {
        let bot = bot.clone();
        let store = store.clone();
        let services = services.clone();
        tokio::spawn(async move {
            if let Err(e) = bot.send_chat_action(chat, ChatAction::Typing).await {
                log::debug!("Could not send typing action to chat {}: {}", chat, e);
            }

            let event = services.execute(command).await;
            let applied = store.apply(chat, event);
            if !applied.changed {
                log::debug!("Dropped a stale result for chat {}", chat);
                return;
            }

            if let Err(e) = show(&bot, chat, view::render(&applied.state)).await {
                log::error!("Failed to update chat {}: {}", chat, e);
            }
            spawn_commands(bot, chat, store, services, applied.commands);
        });
    }
}
