use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{
        application::{CommandDataOptionValue, CommandInteraction, CommandOptionType},
        id::GuildId,
    },
    prelude::Context,
};

/// A command the bot understands, however it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Play(String),
    Pause,
    Resume,
    Skip,
    Stop,
}

impl BotCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BotCommand::Play(_) => "play",
            BotCommand::Pause => "pause",
            BotCommand::Resume => "resume",
            BotCommand::Skip => "skip",
            BotCommand::Stop => "stop",
        }
    }

    /// Reads a slash command. `None` for unknown names or a `play` without a url.
    pub fn from_interaction(command: &CommandInteraction) -> Option<Self> {
        match command.data.name.as_str() {
            "play" => command
                .data
                .options
                .iter()
                .find(|option| option.name == "url")
                .and_then(|option| match &option.value {
                    CommandDataOptionValue::String(url) => Some(url.clone()),
                    _ => None,
                })
                .and_then(|url| Self::play(&url)),
            name => Self::simple(name),
        }
    }

    /// Reads a prefix command such as `/play <url>` from chat.
    pub fn from_text(prefix: &str, content: &str) -> Option<Self> {
        let rest = content.trim_start().strip_prefix(prefix)?;
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args),
            None => (rest, ""),
        };

        match name.to_lowercase().as_str() {
            "play" => Self::play(args),
            name => Self::simple(name),
        }
    }

    fn play(query: &str) -> Option<Self> {
        let query = query.trim();
        (!query.is_empty()).then(|| BotCommand::Play(query.to_string()))
    }

    fn simple(name: &str) -> Option<Self> {
        match name {
            "pause" => Some(BotCommand::Pause),
            "resume" => Some(BotCommand::Resume),
            "skip" => Some(BotCommand::Skip),
            "stop" => Some(BotCommand::Stop),
            _ => None,
        }
    }
}

pub fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        stop_command(),
    ]
}

pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Guild commands show up immediately; handy while developing.
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play a song from a URL or search term")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "url", "URL or search term")
                .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pause the current song")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resume the paused song")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skip the current song")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Disconnect from the voice channel")
}
