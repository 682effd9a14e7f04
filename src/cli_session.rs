use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pezzottube_session::{
    ProfileUpdate, RegistryUser, SessionStore, SqliteStorage, SqliteUserRegistry, UserRegistry,
};

const DEMO_EMAIL: &str = "demo@pezzottube.local";
const DEMO_SECRET: &str = "demo123";

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the registry and storage databases. Created if
    /// missing.
    #[clap(value_parser = parse_path)]
    pub data_dir: PathBuf,

    /// Skip seeding the demo account into an empty registry.
    #[clap(long)]
    pub no_demo_user: bool,
}

#[derive(Parser)]
#[command(name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Registers a new user and logs it in.
    Register {
        email: String,
        secret: String,
        display_name: String,
    },

    /// Logs in with email and secret.
    Login { email: String, secret: String },

    /// Logs out the current user.
    Logout,

    /// Shows the current session user.
    Whoami,

    /// Toggles a like on a video.
    Like { video_id: String },

    /// Toggles a dislike on a video.
    Dislike { video_id: String },

    /// Toggles a channel subscription.
    Subscribe { channel_id: String },

    /// Toggles a video in the watch-later list.
    WatchLater { video_id: String },

    /// Records a video at the front of the watch history.
    Watch { video_id: String },

    /// Shows the watch history, most recent first.
    History,

    /// Updates profile fields of the current user.
    Profile {
        #[clap(long)]
        display_name: Option<String>,
        #[clap(long)]
        avatar_ref: Option<String>,
    },

    /// Adds a comment to a video.
    Comment { video_id: String, text: String },

    /// Shows all comments on a video.
    Comments { video_id: String },

    /// Toggles a like on a comment.
    LikeComment { comment_id: u64 },

    /// Close this program.
    Exit,
}

fn seed_demo_user(registry: &SqliteUserRegistry) -> Result<()> {
    if registry.find_by_email(DEMO_EMAIL)?.is_some() {
        return Ok(());
    }
    let mut demo = RegistryUser::new(
        "demo-user",
        DEMO_EMAIL,
        DEMO_SECRET,
        "DemoUser",
        "avatars/demo.png",
    );
    demo.subscribed_channel_ids = vec!["2".to_string(), "3".to_string()];
    demo.liked_video_ids = vec!["1".to_string(), "3".to_string()];
    demo.watch_history = vec!["1".to_string(), "2".to_string(), "3".to_string()];
    demo.watch_later_ids = vec!["4".to_string(), "5".to_string()];
    registry.insert(demo)?;
    info!("Seeded demo account {}", DEMO_EMAIL);
    Ok(())
}

fn execute_command(command: InnerCommand, store: &SessionStore) -> Result<bool> {
    match command {
        InnerCommand::Register {
            email,
            secret,
            display_name,
        } => {
            let user = store.register(&email, &secret, &display_name)?;
            println!("Registered and logged in as {} ({})", user.display_name, user.id);
        }
        InnerCommand::Login { email, secret } => {
            let user = store.login(&email, &secret)?;
            println!("Logged in as {} ({})", user.display_name, user.id);
        }
        InnerCommand::Logout => {
            store.logout()?;
            println!("Logged out.");
        }
        InnerCommand::Whoami => match store.current_user() {
            Some(user) => println!(
                "{} <{}> likes: {:?} subscriptions: {:?} watch later: {:?}",
                user.display_name,
                user.email,
                user.liked_video_ids,
                user.subscribed_channel_ids,
                user.watch_later_ids
            ),
            None => println!("Not logged in."),
        },
        InnerCommand::Like { video_id } => {
            store.toggle_like_video(&video_id)?;
            println!(
                "Video {} liked: {}",
                video_id,
                store.is_video_liked(&video_id)
            );
        }
        InnerCommand::Dislike { video_id } => {
            store.toggle_dislike_video(&video_id)?;
            println!(
                "Video {} disliked: {}",
                video_id,
                store.is_video_disliked(&video_id)
            );
        }
        InnerCommand::Subscribe { channel_id } => {
            store.toggle_subscription(&channel_id)?;
            println!(
                "Subscribed to channel {}: {}",
                channel_id,
                store.is_subscribed(&channel_id)
            );
        }
        InnerCommand::WatchLater { video_id } => {
            store.toggle_watch_later(&video_id)?;
            println!(
                "Video {} in watch later: {}",
                video_id,
                store.is_in_watch_later(&video_id)
            );
        }
        InnerCommand::Watch { video_id } => {
            store.add_to_watch_history(&video_id)?;
            println!("Recorded {} in watch history.", video_id);
        }
        InnerCommand::History => match store.current_user() {
            Some(user) => {
                for (i, video_id) in user.watch_history.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, video_id);
                }
            }
            None => println!("Not logged in."),
        },
        InnerCommand::Profile {
            display_name,
            avatar_ref,
        } => {
            let user = store.update_profile(ProfileUpdate {
                display_name,
                avatar_ref,
            })?;
            println!("Profile updated: {} ({})", user.display_name, user.avatar_ref);
        }
        InnerCommand::Comment { video_id, text } => {
            let comment = store.add_comment(&video_id, &text)?;
            println!("Comment {} added to video {}.", comment.id, comment.video_id);
        }
        InnerCommand::Comments { video_id } => {
            for comment in store.get_comments_for_video(&video_id)? {
                println!(
                    "#{} {} [{} likes]: {}",
                    comment.id, comment.author_display_name, comment.like_count, comment.text
                );
            }
        }
        InnerCommand::LikeComment { comment_id } => {
            store.toggle_like_comment(comment_id)?;
            println!("Toggled like on comment {}.", comment_id);
        }
        InnerCommand::Exit => return Ok(true),
    }
    Ok(false)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let cli_args = CliArgs::parse();
    std::fs::create_dir_all(&cli_args.data_dir)
        .with_context(|| format!("Failed to create data dir {:?}", cli_args.data_dir))?;

    let registry = SqliteUserRegistry::new(cli_args.data_dir.join("registry.db"))?;
    if !cli_args.no_demo_user {
        seed_demo_user(&registry)?;
    }
    let storage = SqliteStorage::new(cli_args.data_dir.join("session.db"))?;

    let store = SessionStore::new(Box::new(registry), Box::new(storage));
    store.initialize();
    match store.current_user() {
        Some(user) => println!("Welcome back, {}.", user.display_name),
        None => println!("Not logged in. Try: login {} {}", DEMO_EMAIL, DEMO_SECRET),
    }

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        if reader.read_line(&mut line).context("Failed to read line")? == 0 {
            break;
        }
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        let args = shlex::split(line)
            .unwrap_or_else(|| line.split_whitespace().map(String::from).collect());
        let cli =
            InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

        match cli {
            Ok(cli) => match execute_command(cli.command, &store) {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => {
                    eprintln!("Something went wrong: {}", err);
                }
            },
            Err(e) => {
                eprintln!("{}", e);
            }
        }
    }
    Ok(())
}
