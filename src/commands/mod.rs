use std::collections::HashSet;
use std::sync::Arc;

use crate::render;
use crate::scout::{Scout, Session, Sessions};
use crate::services::location::ReportedFix;
use crate::{GenericError, ScoutError};

use log::*;
use serenity::{
    framework::standard::{
        help_commands::with_embeds,
        macros::{command, group, help},
        Args, CommandGroup, CommandResult, HelpOptions,
    },
    model::{channel::Message, id::UserId},
    prelude::*,
};

/// Discord rejects longer messages.
const MESSAGE_LIMIT: usize = 2000;

pub struct ScoutContainer;

impl TypeMapKey for ScoutContainer {
    type Value = Arc<Scout>;
}

pub struct SessionsContainer;

impl TypeMapKey for SessionsContainer {
    type Value = Arc<Sessions>;
}

#[help]
pub async fn help(
    context: &Context,
    msg: &Message,
    args: Args,
    help_options: &'static HelpOptions,
    groups: &[&'static CommandGroup],
    owners: HashSet<UserId>,
) -> CommandResult {
    let _ = with_embeds(context, msg, args, help_options, groups, owners).await?;
    Ok(())
}

#[group]
#[commands(locate, search, show, clear)]
pub struct General;

async fn scout_for(ctx: &Context, msg: &Message) -> Result<(Arc<Scout>, Session), GenericError> {
    let data = ctx.data.read().await;
    let scout = data
        .get::<ScoutContainer>()
        .ok_or("Scout is not initialised.")?
        .clone();
    let sessions = data
        .get::<SessionsContainer>()
        .ok_or("Sessions are not initialised.")?
        .clone();
    Ok((scout, sessions.open(msg.author.id.0).await))
}

fn clip(mut text: String) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text;
    }
    let cut = text
        .char_indices()
        .nth(MESSAGE_LIMIT - 1)
        .map_or(text.len(), |(index, _)| index);
    text.truncate(cut);
    text.push('…');
    text
}

/// Replies with pending notices followed by the current map.
async fn reply(ctx: &Context, msg: &Message, session: &Session) {
    let text = {
        let mut state = session.lock().await;
        let notices = state.take_notices();
        format!("{}{}", render::notices(&notices), render::summary(&state))
    };
    if let Err(why) = msg.channel_id.say(&ctx.http, clip(text)).await {
        warn!("Error sending message: {:?}", why);
    }
}

#[command]
#[description("Set your position from your device's fix, or use the default location.")]
#[usage("[lat] [lng] [accuracy]")]
#[example("37.7599 -122.4148 25")]
async fn locate(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    trace!("Received locate command.");
    let (scout, session) = scout_for(ctx, msg).await?;
    let device = ReportedFix::parse(args.rest());
    scout.locate(&session, &device).await;
    reply(ctx, msg, &session).await;
    Ok(())
}

#[command]
#[description("Route to a destination and list places of a category along the way.")]
#[usage("[destination] | [category]")]
#[example("Golden Gate Bridge | coffee")]
async fn search(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    trace!("Received search command.");
    let (scout, session) = scout_for(ctx, msg).await?;
    let (destination, category) = args.rest().split_once('|').unwrap_or((args.rest(), ""));

    match scout.search(&session, destination, category).await {
        Ok(report) => info!(
            "Search {} for {} finished with {:?} places.",
            report.search, msg.author.name, report.places
        ),
        // A newer search from the same user will reply instead.
        Err(ScoutError::Superseded) => return Ok(()),
        Err(why) => debug!("Search for {} stopped: {why}", msg.author.name),
    }
    reply(ctx, msg, &session).await;
    Ok(())
}

#[command]
#[description("Show your current map.")]
async fn show(ctx: &Context, msg: &Message) -> CommandResult {
    let (_, session) = scout_for(ctx, msg).await?;
    reply(ctx, msg, &session).await;
    Ok(())
}

#[command]
#[description = "Forget your position, route and results."]
#[usage("")]
async fn clear(ctx: &Context, msg: &Message) -> CommandResult {
    let sessions = {
        let data = ctx.data.read().await;
        data.get::<SessionsContainer>()
            .ok_or("Sessions are not initialised.")?
            .clone()
    };
    if sessions.close(msg.author.id.0).await {
        trace!("Cleared map session for {}.", msg.author.name);
    }
    if let Err(why) = msg.channel_id.say(&ctx.http, "Map cleared.").await {
        warn!("Error sending message: {:?}", why);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_untouched() {
        assert_eq!(clip("hello".to_string()), "hello");
    }

    #[test]
    fn long_messages_are_clipped_on_char_boundaries() {
        let clipped = clip("é".repeat(MESSAGE_LIMIT + 10));
        assert_eq!(clipped.chars().count(), MESSAGE_LIMIT);
        assert!(clipped.ends_with('…'));
    }
}
