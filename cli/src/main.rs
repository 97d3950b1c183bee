use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use minsoto::config::generate_oauth_state;
use minsoto::net::api;
use minsoto::net::types::{
    CircleType, FeedQuery, FeedType, HabitPatch, NewCircle, NewHabit, NewInterest, NewPost, PostType, ProfilePatch,
    Registration, RequestAction, RequestType, Visibility,
};
use minsoto::routes::LogNavigator;
use minsoto::state::circles::CirclesHook;
use minsoto::state::connections::ConnectionsHook;
use minsoto::state::feed::FeedHook;
use minsoto::state::habits::HabitsHook;
use minsoto::state::interests::InterestsHook;
use minsoto::state::notify::Notifications;
use minsoto::state::profile::{ProfileHook, ProfileView};
use minsoto::state::resource::ResourceState;
use minsoto::storage::StorageError;
use minsoto::{ApiError, AuthOutcome, ClientConfig, ConfigError, FileTokenStore, Gateway, GoogleCredential, SessionController};
use serde::Serialize;
use time::Date;
use time::macros::format_description;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("token file: {0}")]
    Storage(#[from] StorageError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Fetch(String),
    #[error("no home directory; pass --token-file or set MINSOTO_TOKEN_FILE")]
    NoHome,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "minsoto", about = "Minsoto social network API client")]
struct Cli {
    /// Overrides the API origin from the environment.
    #[arg(long, env = "MINSOTO_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Where the access/refresh token pair is kept between runs.
    #[arg(long, env = "MINSOTO_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MINSOTO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the Google consent-screen URL.
    GoogleUrl {
        #[arg(long)]
        state: Option<String>,
    },
    /// Exchange the `code` from the Google redirect.
    GoogleCallback { code: String },
    /// Sign in with a Google identity token.
    GoogleIdToken { token: String },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Confirmation; defaults to `--password`.
        #[arg(long)]
        password2: Option<String>,
    },
    Logout,
    /// Validate stored tokens and print the signed-in user.
    Whoami,
    Connections(ConnectionsCommand),
    Habits(HabitsCommand),
    Interests(InterestsCommand),
    Circles(CirclesCommand),
    Feed(FeedCommand),
    /// Show a public profile.
    Profile { username: String },
    /// Claim a username and fill in the profile after first sign-in.
    CompleteProfile {
        username: String,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        picture_url: Option<String>,
        #[arg(long)]
        theme_color: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ConnectionsCommand {
    #[command(subcommand)]
    command: ConnectionsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ConnectionsSubcommand {
    List,
    Send {
        receiver_id: i64,
        #[arg(long, default_value_t = false)]
        friend: bool,
        #[arg(long)]
        interest_id: Option<i64>,
        #[arg(long, default_value = "")]
        message: String,
    },
    Respond {
        request_id: i64,
        #[arg(value_enum)]
        action: ActionArg,
    },
}

#[derive(Args, Debug)]
struct HabitsCommand {
    #[command(subcommand)]
    command: HabitsSubcommand,
}

#[derive(Subcommand, Debug)]
enum HabitsSubcommand {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = 1)]
        target_frequency: u32,
        #[arg(long, default_value_t = false)]
        public: bool,
    },
    Complete {
        habit_id: i64,
        /// `YYYY-MM-DD`; defaults to today (UTC).
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    Update {
        habit_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        target_frequency: Option<u32>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        public: Option<bool>,
    },
    Delete {
        habit_id: i64,
    },
}

#[derive(Args, Debug)]
struct InterestsCommand {
    #[command(subcommand)]
    command: InterestsSubcommand,
}

#[derive(Subcommand, Debug)]
enum InterestsSubcommand {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Args, Debug)]
struct CirclesCommand {
    #[command(subcommand)]
    command: CirclesSubcommand,
}

#[derive(Subcommand, Debug)]
enum CirclesSubcommand {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "type", value_enum, default_value_t = CircleTypeArg::Project)]
        circle_type: CircleTypeArg,
        #[arg(long, default_value_t = false)]
        private: bool,
        #[arg(long, default_value_t = 10)]
        max_members: u32,
        #[arg(long = "interest")]
        interests: Vec<i64>,
    },
}

#[derive(Args, Debug)]
struct FeedCommand {
    #[command(subcommand)]
    command: FeedSubcommand,
}

#[derive(Subcommand, Debug)]
enum FeedSubcommand {
    List {
        /// Only posts from connections.
        #[arg(long, default_value_t = false)]
        connections: bool,
        /// Interest name, or `all`.
        #[arg(long, default_value = "all")]
        filter: String,
    },
    Post {
        content: String,
        #[arg(long = "type", value_enum, default_value_t = PostTypeArg::Text)]
        post_type: PostTypeArg,
        #[arg(long, value_enum, default_value_t = VisibilityArg::Public)]
        visibility: VisibilityArg,
        #[arg(long, default_value = "")]
        image_url: String,
    },
    Like {
        post_id: i64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ActionArg {
    Accept,
    Decline,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CircleTypeArg {
    Project,
    Habit,
    Learning,
    Accountability,
    Social,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PostTypeArg {
    Text,
    Image,
    Progress,
    Achievement,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum VisibilityArg {
    Public,
    Connections,
    Friends,
    Circle,
}

impl From<ActionArg> for RequestAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Accept => Self::Accept,
            ActionArg::Decline => Self::Decline,
        }
    }
}

impl From<CircleTypeArg> for CircleType {
    fn from(arg: CircleTypeArg) -> Self {
        match arg {
            CircleTypeArg::Project => Self::Project,
            CircleTypeArg::Habit => Self::Habit,
            CircleTypeArg::Learning => Self::Learning,
            CircleTypeArg::Accountability => Self::Accountability,
            CircleTypeArg::Social => Self::Social,
        }
    }
}

impl From<PostTypeArg> for PostType {
    fn from(arg: PostTypeArg) -> Self {
        match arg {
            PostTypeArg::Text => Self::Text,
            PostTypeArg::Image => Self::Image,
            PostTypeArg::Progress => Self::Progress,
            PostTypeArg::Achievement => Self::Achievement,
        }
    }
}

impl From<VisibilityArg> for Visibility {
    fn from(arg: VisibilityArg) -> Self {
        match arg {
            VisibilityArg::Public => Self::Public,
            VisibilityArg::Connections => Self::Connections,
            VisibilityArg::Friends => Self::Friends,
            VisibilityArg::Circle => Self::Circle,
        }
    }
}

struct CliContext {
    config: ClientConfig,
    gateway: Arc<Gateway>,
    session: SessionController,
    notices: Notifications,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = build_context(&cli)?;

    match cli.command {
        Command::Login { email, password } => finish_auth(ctx.session.login(&email, &password).await),
        Command::GoogleUrl { state } => {
            let state = state.unwrap_or_else(generate_oauth_state);
            println!("{}", ctx.config.google.authorize_url(Some(&state)));
            Ok(())
        }
        Command::GoogleCallback { code } => finish_auth(ctx.session.complete_google_callback(&code).await),
        Command::GoogleIdToken { token } => {
            finish_auth(ctx.session.login_with_google(&GoogleCredential::IdToken(token)).await)
        }
        Command::Register { email, username, password, password2 } => {
            let password2 = password2.unwrap_or_else(|| password.clone());
            let registration = Registration { email, username, password, password2 };
            finish_auth(ctx.session.register(&registration).await)?;
            println!("registered; check your email to verify the account");
            Ok(())
        }
        Command::Logout => {
            ctx.session.logout().await;
            println!("signed out");
            Ok(())
        }
        Command::Whoami => run_whoami(&ctx).await,
        Command::Connections(cmd) => run_connections(&ctx, cmd).await,
        Command::Habits(cmd) => run_habits(&ctx, cmd).await,
        Command::Interests(cmd) => run_interests(&ctx, cmd).await,
        Command::Circles(cmd) => run_circles(&ctx, cmd).await,
        Command::Feed(cmd) => run_feed(&ctx, cmd).await,
        Command::Profile { username } => run_profile(&ctx, &username).await,
        Command::CompleteProfile { username, bio, picture_url, theme_color } => {
            let patch = ProfilePatch { bio, profile_picture_url: picture_url, theme_color, ..ProfilePatch::default() };
            finish_auth(ctx.session.complete_profile(&username, &patch).await)
        }
    }
}

fn build_context(cli: &Cli) -> Result<CliContext, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.api_base_url {
        config = config.with_base_url(base_url);
    }
    let token_file = match &cli.token_file {
        Some(path) => path.clone(),
        None => default_token_file()?,
    };
    tracing::debug!(path = %token_file.display(), base_url = %config.api_base_url, "opening token store");
    let store = Arc::new(FileTokenStore::open(token_file)?);
    let gateway = Arc::new(Gateway::from_config(&config, store, Arc::new(LogNavigator))?);
    let session = SessionController::new(gateway.clone());
    let notices = Notifications::new(config.notice_ttl);
    Ok(CliContext { config, gateway, session, notices })
}

fn default_token_file() -> Result<PathBuf, CliError> {
    let home = std::env::var_os("HOME").ok_or(CliError::NoHome)?;
    Ok(PathBuf::from(home).join(".minsoto").join("tokens.json"))
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).map_err(|e| e.to_string())
}

fn finish_auth(outcome: AuthOutcome) -> Result<(), CliError> {
    match outcome {
        AuthOutcome::Success { redirect: Some(route) } => {
            println!("ok; next: {}", route.path());
            Ok(())
        }
        AuthOutcome::Success { redirect: None } => Ok(()),
        AuthOutcome::Failure { error } => Err(CliError::Rejected(error)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Echo the pending success notice on stderr so stdout stays parseable.
fn announce(notices: &Notifications) {
    if let Some(message) = notices.snapshot().success_message {
        eprintln!("{message}");
    }
}

fn settled<T>(state: ResourceState<T>) -> Result<T, CliError> {
    match state.error {
        Some(message) => Err(CliError::Fetch(message)),
        None => Ok(state.data),
    }
}

async fn run_whoami(ctx: &CliContext) -> Result<(), CliError> {
    let session = ctx.session.recover().await;
    match session.user {
        Some(user) => print_json(&user),
        None => Err(CliError::Rejected("not signed in".to_owned())),
    }
}

async fn run_connections(ctx: &CliContext, cmd: ConnectionsCommand) -> Result<(), CliError> {
    match cmd.command {
        ConnectionsSubcommand::List => {
            let hook = ConnectionsHook::mount(ctx.gateway.clone()).await;
            let data = settled(hook.state())?;
            print_json(&serde_json::json!({
                "connections": data.connections,
                "requests": data.requests,
            }))
        }
        ConnectionsSubcommand::Send { receiver_id, friend, interest_id, message } => {
            let request_type = if friend { RequestType::Friend } else { RequestType::Connection };
            let hook = ConnectionsHook::new(ctx.gateway.clone());
            let sent = ctx
                .notices
                .track(hook.send_request(receiver_id, request_type, interest_id, &message), "Request sent!")
                .await?;
            announce(&ctx.notices);
            print_json(&sent)
        }
        ConnectionsSubcommand::Respond { request_id, action } => {
            let hook = ConnectionsHook::new(ctx.gateway.clone());
            let success = match action {
                ActionArg::Accept => "Request accepted!",
                ActionArg::Decline => "Request declined.",
            };
            let ack = ctx.notices.track(hook.respond(request_id, action.into()), success).await?;
            announce(&ctx.notices);
            if let Some(message) = ack.message.or(ack.success) {
                println!("{message}");
            }
            Ok(())
        }
    }
}

async fn run_habits(ctx: &CliContext, cmd: HabitsCommand) -> Result<(), CliError> {
    let hook = HabitsHook::new(ctx.gateway.clone());
    match cmd.command {
        HabitsSubcommand::List => {
            hook.refetch().await;
            print_json(&settled(hook.state())?)
        }
        HabitsSubcommand::Create { name, description, target_frequency, public } => {
            let habit = NewHabit { name, description, target_frequency, is_public: public };
            let created = ctx.notices.track(hook.create(&habit), "Habit created!").await?;
            announce(&ctx.notices);
            print_json(&created)
        }
        HabitsSubcommand::Complete { habit_id, date, notes } => {
            let date = date.unwrap_or_else(|| time::OffsetDateTime::now_utc().date());
            let result = ctx
                .notices
                .track(hook.mark_complete(habit_id, date, &notes), "Habit marked complete!")
                .await?;
            announce(&ctx.notices);
            let streak = result.habit.and_then(|h| h.current_streak);
            match (result.message, streak) {
                (_, Some(streak)) => println!("current streak: {streak}"),
                (Some(message), None) => println!("{message}"),
                (None, None) => {}
            }
            Ok(())
        }
        HabitsSubcommand::Update { habit_id, name, description, target_frequency, active, public } => {
            let patch = HabitPatch { name, description, target_frequency, is_public: public, is_active: active };
            let updated = ctx.notices.track(hook.update(habit_id, &patch), "Habit updated!").await?;
            announce(&ctx.notices);
            print_json(&updated)
        }
        HabitsSubcommand::Delete { habit_id } => {
            ctx.notices.track(hook.delete(habit_id), "Habit deleted.").await?;
            announce(&ctx.notices);
            Ok(())
        }
    }
}

async fn run_interests(ctx: &CliContext, cmd: InterestsCommand) -> Result<(), CliError> {
    let hook = InterestsHook::new(ctx.gateway.clone());
    match cmd.command {
        InterestsSubcommand::List => {
            hook.refetch().await;
            print_json(&settled(hook.state())?)
        }
        InterestsSubcommand::Create { name, description, category } => {
            let interest = NewInterest { name, description, category };
            let created = ctx.notices.track(hook.create(&interest), "Interest added!").await?;
            announce(&ctx.notices);
            print_json(&created)
        }
    }
}

async fn run_circles(ctx: &CliContext, cmd: CirclesCommand) -> Result<(), CliError> {
    let hook = CirclesHook::new(ctx.gateway.clone());
    match cmd.command {
        CirclesSubcommand::List => {
            hook.refetch().await;
            print_json(&settled(hook.state())?)
        }
        CirclesSubcommand::Create { name, description, circle_type, private, max_members, interests } => {
            let circle = NewCircle {
                name,
                description,
                circle_type: circle_type.into(),
                is_private: private,
                max_members,
                interests,
            };
            ctx.notices.track(hook.create(&circle), "Circle created!").await?;
            announce(&ctx.notices);
            print_json(&settled(hook.state())?)
        }
    }
}

async fn run_feed(ctx: &CliContext, cmd: FeedCommand) -> Result<(), CliError> {
    match cmd.command {
        FeedSubcommand::List { connections, filter } => {
            let feed_type = if connections { FeedType::Connections } else { FeedType::Global };
            let hook = FeedHook::mount(ctx.gateway.clone(), FeedQuery { feed_type, filter }).await;
            print_json(&settled(hook.state())?)
        }
        FeedSubcommand::Post { content, post_type, visibility, image_url } => {
            let post = NewPost { content, post_type: post_type.into(), visibility: visibility.into(), image_url };
            let created = ctx.notices.track(api::create_post(&ctx.gateway, &post), "Post shared!").await?;
            announce(&ctx.notices);
            print_json(&created)
        }
        FeedSubcommand::Like { post_id } => {
            let state = ctx.notices.track(api::toggle_like(&ctx.gateway, post_id), "Like updated.").await?;
            println!("{}", if state.liked { "liked" } else { "unliked" });
            Ok(())
        }
    }
}

async fn run_profile(ctx: &CliContext, username: &str) -> Result<(), CliError> {
    let hook = ProfileHook::mount(ctx.gateway.clone(), username).await;
    match settled(hook.state())? {
        ProfileView::Loaded(profile) => print_json(&profile),
        ProfileView::NotFound => Err(CliError::Rejected(format!("no user named {username}"))),
        ProfileView::Pending => Err(CliError::Fetch("profile did not load".to_owned())),
    }
}
