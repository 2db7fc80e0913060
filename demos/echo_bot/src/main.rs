//! Echo Bot Example
//!
//! A console transport for Herald: every stdin line becomes a message, every
//! reply is printed as `[#channel] text`.
//!
//! # Routes
//!
//! ```text
//! e! echo <text>        Echoing! <text>
//! e! e fmt <text>       "<text>" - <author>
//! e! say "a b" c        one reply per shell-style argument
//! e! which              admins only (--admin <id>)
//! e! prefix <p>         change this guild's prefix (guilds only)
//! <anything>            counted by the message counter
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --guild g1 --admin console-user
//! echo '{"author":{"id":"x","bot":true},"content":"e! echo hi","channel_id":"c"}' \
//!     | cargo run --package echo-bot -- --json
//! ```

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use herald::prelude::*;
use herald::runtime::ConfigLoader;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

const DEFAULT_PREFIX: &str = "e!";
const BOT_ID: &str = "echo-bot";

/// Command line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "echo-bot", about = "A console echo bot built on Herald")]
struct Args {
    /// Configuration file to load instead of searching for herald.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read each line as a JSON-encoded message.
    #[arg(long)]
    json: bool,

    /// Author id for plain-text lines.
    #[arg(long, default_value = "console-user")]
    user: String,

    /// Guild id for plain-text lines. Lines are direct messages without one.
    #[arg(long)]
    guild: Option<String>,

    /// User ids allowed to run privileged commands.
    #[arg(long = "admin")]
    admins: Vec<String>,
}

// ============================================================================
// Console transport
// ============================================================================

struct ConsoleSession;

#[async_trait]
impl Session for ConsoleSession {
    fn self_id(&self) -> Option<String> {
        Some(BOT_ID.to_string())
    }

    async fn send(&self, channel_id: &str, content: &str) -> SendResult<()> {
        println!("[#{channel_id}] {content}");
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

fn to_message(line: &str, args: &Args) -> Result<BoxedMessage> {
    if args.json {
        return Ok(TextMessage::from_json(line)?.boxed());
    }

    let message = TextMessage::new(line)
        .sent_by(Author::user(args.user.as_str()))
        .channel("console");

    Ok(match &args.guild {
        Some(guild) => message.guild(guild.as_str()).kind(ChannelKind::GuildText),
        None => message.kind(ChannelKind::Direct),
    }
    .boxed())
}

async fn read_console(inbound: Inbound, args: Args) {
    let session: BoxedSession = Arc::new(ConsoleSession);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        };

        let message = match to_message(&line, &args) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Skipping malformed message");
                continue;
            }
        };

        if inbound.deliver(Arc::clone(&session), message).await.is_err() {
            break;
        }
    }

    info!("Console closed");
}

// ============================================================================
// Handlers
// ============================================================================

/// Replies with the pipeline error, except for messages the bot sent itself.
async fn report_error(ctx: &Context) {
    let Some(err) = ctx.err() else {
        return;
    };

    if err.filtered().is_some_and(|bits| bits.contains(Filter::SELF)) {
        debug!(%err, "Ignoring own message");
        return;
    }

    if let Err(e) = ctx.reply(&err.to_string()).await {
        warn!(error = %e, "Failed to report error");
    }
}

struct EchoCmd;

#[async_trait]
impl Handler for EchoCmd {
    async fn handle(&self, ctx: &Context) -> HandlerResult {
        if ctx.args().is_empty() {
            return Err("nothing to echo".into());
        }
        ctx.reply(&format!("Echoing! {}", ctx.args().join(" ")))
            .await?;
        Ok(())
    }

    async fn resolve(&self, ctx: &Context) {
        report_error(ctx).await;
    }
}

struct EchoFmtCmd;

#[async_trait]
impl Handler for EchoFmtCmd {
    async fn handle(&self, ctx: &Context) -> HandlerResult {
        if ctx.args().is_empty() {
            return Err("nothing to format echo".into());
        }
        let author = ctx
            .message()
            .author()
            .map_or("unknown", |author| author.id.as_str());
        ctx.reply(&format!("\"{}\" - {author}", ctx.args().join(" ")))
            .await?;
        Ok(())
    }

    async fn resolve(&self, ctx: &Context) {
        report_error(ctx).await;
    }
}

/// Counts every message that is not from a bot, empty, or our own.
#[derive(Default)]
struct MessageCounter {
    total: Mutex<usize>,
}

#[async_trait]
impl Handler for MessageCounter {
    async fn handle(&self, _ctx: &Context) -> HandlerResult {
        let mut total = self.total.lock();
        *total += 1;
        info!("Message count: {}", *total);
        Ok(())
    }

    async fn resolve(&self, ctx: &Context) {
        if let Some(bits) = ctx.err().and_then(DispatchError::filtered) {
            debug!(filter = %bits, "Message not counted");
        }
    }
}

/// Rejects authors that are not in the admin list.
struct AdminOnly {
    admins: Arc<Vec<String>>,
}

#[async_trait]
impl Middleware for AdminOnly {
    async fn run(&self, ctx: &Context) -> Result<(), BoxError> {
        let is_admin = ctx
            .message()
            .author()
            .is_some_and(|author| self.admins.contains(&author.id));
        if is_admin {
            Ok(())
        } else {
            Err("you don't have admin perms :(".into())
        }
    }
}

// ============================================================================
// Router
// ============================================================================

fn build_router(prefixes: &PrefixMap, admins: Arc<Vec<String>>) -> Router {
    let echo = Route::new()
        .aliases(["echo", "e"])
        .prefixer(prefixes.clone())
        .filter(Filter::SELF)
        .handler(EchoCmd)
        .subroute(Route::new().aliases(["fmt", "f"]).handler(EchoFmtCmd));

    let say = Route::new()
        .alias("say")
        .prefixer(prefixes.clone())
        .parser(ShellParser)
        .filter(Filter::SELF | Filter::BOT)
        .handler(
            handler_fn(|ctx| {
                Box::pin(async move {
                    for arg in ctx.args() {
                        ctx.reply(arg).await?;
                    }
                    Ok::<(), BoxError>(())
                })
            })
            .on_resolve(|ctx| Box::pin(report_error(ctx))),
        );

    let which = Route::new()
        .alias("which")
        .prefixer(prefixes.clone())
        .middleware(AdminOnly {
            admins: Arc::clone(&admins),
        })
        .handler(
            handler_fn(|ctx| {
                Box::pin(async move {
                    ctx.reply("You are privileged!").await?;
                    Ok::<(), BoxError>(())
                })
            })
            .on_resolve(|ctx| Box::pin(report_error(ctx))),
        );

    let table = prefixes.clone();
    let prefix = Route::new()
        .alias("prefix")
        .prefixer(prefixes.clone())
        .filter(Filter::PRIVATE | Filter::BOT)
        .middleware(AdminOnly { admins })
        .handler(
            handler_fn(move |ctx| {
                let table = table.clone();
                Box::pin(async move {
                    let guild = ctx.message().guild_id().unwrap_or_default().to_string();
                    match ctx.args() {
                        [reset] if reset == "reset" => {
                            table.remove(&guild);
                            ctx.reply("Prefix reset").await?;
                        }
                        [new_prefix] => {
                            table.set(guild, new_prefix.as_str());
                            ctx.reply(&format!("Prefix is now {new_prefix}")).await?;
                        }
                        _ => return Err("usage: prefix <new prefix> | prefix reset".into()),
                    }
                    Ok::<(), BoxError>(())
                })
            })
            .on_resolve(|ctx| Box::pin(report_error(ctx))),
        );

    let greeting = Route::new().name("greeting").handler(handler_fn(|ctx| {
        Box::pin(async move {
            ctx.reply("Hello! Try `e! echo <text>`.").await?;
            Ok::<(), BoxError>(())
        })
    }));

    Router::new()
        .route(echo)
        .route(say)
        .route(which)
        .route(prefix)
        .route(
            Route::new()
                .name("counter")
                .filter(Filter::BOT | Filter::EMPTY | Filter::SELF)
                .handler(MessageCounter::default()),
        )
        .route_once(greeting)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let mut config = loader.load_validated()?;
    if config.router.default_prefix.is_empty() {
        config.router.default_prefix = DEFAULT_PREFIX.to_string();
    }

    let prefixes = config.router.prefix_map();
    let router = build_router(&prefixes, Arc::new(args.admins.clone()));
    let runtime = HeraldRuntime::from_config(&config, router);

    tokio::spawn(read_console(runtime.inbound(), args));

    info!(prefix = %config.router.default_prefix, "Echo bot is reading from stdin");
    let stats = runtime.run().await?;
    info!(?stats, "Echo bot stopped");

    Ok(())
}
