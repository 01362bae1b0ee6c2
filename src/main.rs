use std::sync::Arc;

use log::*;

use serenity::{
    async_trait,
    framework::StandardFramework,
    http::Http,
    model::prelude::Ready,
    prelude::{Client, Context, EventHandler, GatewayIntents},
};

mod commands;
mod config;
mod error;
mod map;
mod render;
mod scout;
mod services;

pub use error::{GenericError, ScoutError};

use commands::{ScoutContainer, SessionsContainer, GENERAL_GROUP, HELP};
use config::Config;
use scout::{Scout, Sessions};

struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
    }
}

#[tokio::main]
async fn main() -> Result<(), GenericError> {
    env_logger::builder()
        .filter_module("route_scout", log::LevelFilter::Trace)
        .parse_default_env()
        .init();
    trace!("Logger init with level TRACE.");

    let config = Config::from_env()?;
    let scout = Scout::new(&config)?;

    let token = dotenv::var("DISCORD_TOKEN").map_err(|_| ScoutError::MissingConfig("DISCORD_TOKEN"))?;
    let http = Http::new(&token);
    let bot_id = http.get_current_user().await?.id;

    let framework = StandardFramework::new()
        .configure(|c| {
            c.with_whitespace(true)
                .on_mention(Some(bot_id))
                .prefix("!scout")
        })
        .help(&HELP)
        .group(&GENERAL_GROUP);

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&token, intents)
        .event_handler(Handler)
        .framework(framework)
        .type_map_insert::<ScoutContainer>(Arc::new(scout))
        .type_map_insert::<SessionsContainer>(Arc::new(Sessions::new(&config)))
        .await?;

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
        return Err(why.into());
    }
    Ok(())
}
