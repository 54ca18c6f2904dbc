use std::sync::Arc;

use dotenvy::dotenv;
use pdfquizbot::{commands::Command, config::Config, openai::OpenAi, schema::schema, session::SessionStorage};
use teloxide::error_handlers::{IgnoringErrorHandlerSafe, LoggingErrorHandler};
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use teloxide::utils::command::BotCommands;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let level = config.log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_line_number(true)
        .with_target(false)
        .init();

    log::info!("Starting PDF quiz bot with {:?}", config);

    let openai = match OpenAi::new(&config.openai) {
        Ok(openai) => Arc::new(openai),
        Err(e) => {
            log::error!("Failed to build the model client: {}", e);
            std::process::exit(1);
        }
    };

    let bot = Bot::new(config.bot_token.clone());
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema::<Bot, OpenAi>())
        .dependencies(dptree::deps![
            SessionStorage::new(),
            Arc::new(config.quiz.clone()),
            openai
        ])
        .default_handler(|upd| async move {
            log::trace!("Ignoring update {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build();

    if let Some(webhook) = config.webhook {
        log::info!("Listening for webhook updates on {}", webhook.addr);
        let listener = match webhooks::axum(bot, Options::new(webhook.addr, webhook.url)).await {
            Ok(listener) => listener,
            Err(e) => {
                log::error!("Failed to build a webhook listener: {}", e);
                std::process::exit(1);
            }
        };
        dispatcher
            .dispatch_with_listener(listener, Arc::new(IgnoringErrorHandlerSafe))
            .await
    } else {
        log::info!("Polling for updates");
        dispatcher.dispatch().await
    }
}
