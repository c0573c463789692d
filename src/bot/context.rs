//! Command context shared by slash and prefix commands.
//!
//! The playback core only ever sees a [`CommandContext`]: who asked, which
//! voice channel they sit in, and somewhere to send replies. Whether the
//! command arrived as an interaction or a chat message is decided here and
//! nowhere else.

use async_trait::async_trait;
use serenity::{
    builder::{CreateInteractionResponseFollowup, CreateMessage},
    model::{
        application::CommandInteraction,
        channel::Message,
        id::{ChannelId, GuildId, MessageId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::warn;

use crate::ui::embeds::TrackCard;

/// Outgoing reply: text, a track card, or both.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reply {
    pub content: Option<String>,
    pub card: Option<TrackCard>,
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn card(card: TrackCard) -> Self {
        Self {
            card: Some(card),
            ..Default::default()
        }
    }

    /// Only visible to the invoking user where the platform supports it.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

/// Somewhere replies can be delivered. Fire-and-forget: delivery failures
/// are logged by the implementation and never reach the caller.
#[async_trait]
pub trait ReplyTarget: Send + Sync {
    async fn send(&self, reply: Reply) -> Option<MessageId>;

    async fn delete(&self, message: MessageId);
}

/// Everything the core needs to know about an incoming command.
#[derive(Clone)]
pub struct CommandContext {
    guild_id: Option<GuildId>,
    requester: UserId,
    voice_channel: Option<ChannelId>,
    replies: Arc<dyn ReplyTarget>,
}

impl CommandContext {
    pub fn new(
        guild_id: Option<GuildId>,
        requester: UserId,
        voice_channel: Option<ChannelId>,
        replies: Arc<dyn ReplyTarget>,
    ) -> Self {
        Self {
            guild_id,
            requester,
            voice_channel,
            replies,
        }
    }

    /// Builds a context for a slash command. The interaction must already be deferred.
    pub fn from_interaction(ctx: &Context, command: &CommandInteraction) -> Self {
        let voice_channel = command
            .guild_id
            .and_then(|guild_id| user_voice_channel(ctx, guild_id, command.user.id));

        Self::new(
            command.guild_id,
            command.user.id,
            voice_channel,
            Arc::new(InteractionReplies {
                ctx: ctx.clone(),
                command: command.clone(),
            }),
        )
    }

    /// Builds a context for a prefix text command.
    pub fn from_message(ctx: &Context, message: &Message) -> Self {
        let voice_channel = message
            .guild_id
            .and_then(|guild_id| user_voice_channel(ctx, guild_id, message.author.id));

        Self::new(
            message.guild_id,
            message.author.id,
            voice_channel,
            Arc::new(ChannelReplies {
                ctx: ctx.clone(),
                channel_id: message.channel_id,
            }),
        )
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        self.guild_id
    }

    pub fn requester(&self) -> UserId {
        self.requester
    }

    /// Voice channel the requester was in when the command arrived.
    pub fn voice_channel(&self) -> Option<ChannelId> {
        self.voice_channel
    }

    pub fn reply_target(&self) -> Arc<dyn ReplyTarget> {
        self.replies.clone()
    }

    pub async fn reply(&self, reply: Reply) -> Option<MessageId> {
        self.replies.send(reply).await
    }
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

/// Replies through interaction followups (the response is deferred up front).
struct InteractionReplies {
    ctx: Context,
    command: CommandInteraction,
}

#[async_trait]
impl ReplyTarget for InteractionReplies {
    async fn send(&self, reply: Reply) -> Option<MessageId> {
        let mut followup = CreateInteractionResponseFollowup::new().ephemeral(reply.ephemeral);
        if let Some(content) = reply.content {
            followup = followup.content(content);
        }
        if let Some(card) = reply.card {
            followup = followup.embed(card.to_embed());
        }

        match self.command.create_followup(&self.ctx, followup).await {
            Ok(message) => Some(message.id),
            Err(e) => {
                warn!("Failed to send interaction followup: {:?}", e);
                None
            }
        }
    }

    async fn delete(&self, message: MessageId) {
        if let Err(e) = self.command.delete_followup(&self.ctx, message).await {
            warn!("Failed to delete followup {}: {:?}", message, e);
        }
    }
}

/// Replies as plain channel messages. Ephemeral has no meaning here.
struct ChannelReplies {
    ctx: Context,
    channel_id: ChannelId,
}

#[async_trait]
impl ReplyTarget for ChannelReplies {
    async fn send(&self, reply: Reply) -> Option<MessageId> {
        let mut message = CreateMessage::new();
        if let Some(content) = reply.content {
            message = message.content(content);
        }
        if let Some(card) = reply.card {
            message = message.embed(card.to_embed());
        }

        match self.channel_id.send_message(&self.ctx, message).await {
            Ok(sent) => Some(sent.id),
            Err(e) => {
                warn!("Failed to send message to {}: {:?}", self.channel_id, e);
                None
            }
        }
    }

    async fn delete(&self, message: MessageId) {
        if let Err(e) = self.channel_id.delete_message(&self.ctx, message).await {
            warn!("Failed to delete message {}: {:?}", message, e);
        }
    }
}
