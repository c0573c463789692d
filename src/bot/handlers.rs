use anyhow::Result;
use serenity::{
    model::{application::CommandInteraction, channel::Message},
    prelude::Context,
};
use tracing::{debug, info};

use super::{
    commands::BotCommand,
    context::{CommandContext, Reply},
};
use crate::audio::manager::{MusicManager, NOT_IN_GUILD};

/// Entry point for slash commands.
pub async fn handle_command(ctx: &Context, command: CommandInteraction, music: &MusicManager) -> Result<()> {
    info!(
        "📝 /{} used by {} in guild {:?}",
        command.data.name, command.user.name, command.guild_id
    );

    // Extraction can take longer than the 3s interaction deadline.
    command.defer_ephemeral(&ctx.http).await?;

    let Some(bot_command) = BotCommand::from_interaction(&command) else {
        command.delete_response(&ctx.http).await?;
        return Ok(());
    };

    let cmd_ctx = CommandContext::from_interaction(ctx, &command);
    if !execute(music, &cmd_ctx, bot_command).await {
        // Nothing was said, so clear the pending "thinking" state.
        command.delete_response(&ctx.http).await?;
    }

    Ok(())
}

/// Entry point for prefix text commands. Other chat messages are ignored.
pub async fn handle_message(ctx: &Context, message: &Message, prefix: &str, music: &MusicManager) -> Result<()> {
    let Some(bot_command) = BotCommand::from_text(prefix, &message.content) else {
        return Ok(());
    };

    info!(
        "📝 {}{} used by {} in guild {:?}",
        prefix,
        bot_command.name(),
        message.author.name,
        message.guild_id
    );

    let cmd_ctx = CommandContext::from_message(ctx, message);
    execute(music, &cmd_ctx, bot_command).await;

    Ok(())
}

/// Runs a command against the manager. Returns whether anything was sent back.
pub async fn execute(music: &MusicManager, ctx: &CommandContext, command: BotCommand) -> bool {
    if let BotCommand::Play(query) = &command {
        if let Err(e) = music.submit_track(ctx, query).await {
            debug!("play '{}' ended early: {}", query, e);
        }
        return true;
    }

    let Some(guild_id) = ctx.guild_id() else {
        ctx.reply(Reply::text(NOT_IN_GUILD).ephemeral()).await;
        return true;
    };

    let text = match command {
        BotCommand::Pause => music.pause(guild_id).await.reply_text(),
        BotCommand::Resume => music.resume(guild_id).await.reply_text(),
        BotCommand::Skip => music.skip(guild_id).await.reply_text(),
        BotCommand::Stop => music.stop(guild_id).await.reply_text(),
        BotCommand::Play(_) => None,
    };

    match text {
        Some(text) => {
            ctx.reply(Reply::text(text).ephemeral()).await;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::manager::SEARCHING,
        testing::{context, FakeResolver, FakeVoice, RecordingReplies},
    };
    use pretty_assertions::assert_eq;
    use serenity::model::id::{ChannelId, GuildId};
    use std::{sync::Arc, time::Duration};

    fn setup() -> (Arc<FakeVoice>, MusicManager, Arc<RecordingReplies>) {
        let voice = Arc::new(FakeVoice::new());
        let music = MusicManager::new(
            voice.clone(),
            Arc::new(FakeResolver::new()),
            Duration::from_millis(5),
        );
        (voice, music, Arc::new(RecordingReplies::new()))
    }

    #[tokio::test]
    async fn test_control_commands_reply_with_outcome() {
        let (voice, music, replies) = setup();
        let guild = GuildId::new(10);
        voice.connected_session(guild);
        let ctx = context(Some(guild), Some(ChannelId::new(3)), &replies);

        assert!(execute(&music, &ctx, BotCommand::Pause).await);
        assert!(execute(&music, &ctx, BotCommand::Skip).await);
        assert!(!execute(&music, &ctx, BotCommand::Resume).await);
        assert!(execute(&music, &ctx, BotCommand::Stop).await);
        assert!(!execute(&music, &ctx, BotCommand::Stop).await);

        assert_eq!(
            replies.texts(),
            vec!["Nothing is playing", "Nothing to skip", "Disconnected"]
        );
        assert!(replies.all_ephemeral());
    }

    #[tokio::test]
    async fn test_play_goes_through_submission() {
        let (voice, music, replies) = setup();
        let guild = GuildId::new(11);
        let ctx = context(Some(guild), Some(ChannelId::new(3)), &replies);

        assert!(execute(&music, &ctx, BotCommand::Play("song".to_string())).await);
        assert_eq!(replies.texts(), vec![SEARCHING]);

        let session = voice.fake_session(guild).expect("session");
        session.wait_for_plays(1).await;
        assert_eq!(session.played(), vec!["song"]);
    }

    #[tokio::test]
    async fn test_commands_outside_guild() {
        let (_voice, music, replies) = setup();
        let ctx = context(None, None, &replies);

        assert!(execute(&music, &ctx, BotCommand::Skip).await);
        assert_eq!(replies.texts(), vec![NOT_IN_GUILD]);
    }
}
