mod config;
mod error;

use chrono::{DateTime, Local, TimeZone, Utc};
use clap::{Parser, Subcommand};
use policy::Action;
use service::Platform;
use storage::{CommentId, Post, PostId, UserId};

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "scuttlebutt.toml";

#[derive(Parser)]
#[command(name = "scuttlebutt")]
#[command(about = "A small social-content platform over a local database", long_about = None)]
#[command(version)]
struct Cli {
    /// Act as the user registered with this email. Anonymous if omitted.
    #[arg(long = "as", global = true, value_name = "EMAIL")]
    acting_as: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and seed the hardcoded roles
    Init,
    /// Manage users
    #[command(subcommand)]
    User(UserCommands),
    /// Manage roles and memberships
    #[command(subcommand)]
    Role(RoleCommands),
    /// Manage posts and opinions on them
    #[command(subcommand)]
    Post(PostCommands),
    /// Manage comments
    #[command(subcommand)]
    Comment(CommentCommands),
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a new user
    Add {
        name: String,
        email: String,
        /// Content scrambler selector for this user's text
        #[arg(long, default_value = "0")]
        scrambler: i64,
        /// Grant the Administrator role (local bootstrap, bypasses policy)
        #[arg(long)]
        admin: bool,
    },
    /// List all users
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one user's profile, fields filtered by what the actor may see
    Show { email: String },
    /// Delete a user and everything they created
    Rm { email: String },
}

#[derive(Subcommand)]
enum RoleCommands {
    /// List all roles
    List {
        #[arg(long)]
        json: bool,
    },
    /// Create a new role
    Add { name: String },
    /// Rename a role
    Rename { name: String, new_name: String },
    /// Delete a role
    Rm { name: String },
    /// Grant a role to a user
    Grant { role: String, email: String },
    /// Remove a role from a user
    Revoke { role: String, email: String },
    /// List users holding a role
    Members { role: String },
}

#[derive(Subcommand)]
enum PostCommands {
    /// Create a post
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
    },
    /// List all posts, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show a post with its reactions and comments
    Show { id: i64 },
    /// Edit a post
    Update {
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
    },
    /// Delete a post
    Rm { id: i64 },
    /// Like a post
    Like { id: i64 },
    /// Dislike a post
    Dislike { id: i64 },
    /// Withdraw a like or dislike
    Unlike { id: i64 },
}

#[derive(Subcommand)]
enum CommentCommands {
    /// Comment on a post
    Add { post: i64, content: String },
    /// List comments on a post, oldest first
    List {
        post: i64,
        #[arg(long)]
        json: bool,
    },
    /// Delete a comment
    Rm { id: i64 },
    /// Like a comment
    Like { id: i64 },
    /// Dislike a comment
    Dislike { id: i64 },
    /// Withdraw a like or dislike
    Unlike { id: i64 },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(CONFIG_FILE)?;
    init_logging(&config);

    let mut platform = Platform::open(&config.database.path)?;
    let actor = resolve_actor(&platform, cli.acting_as.as_deref())?;

    match cli.command {
        Commands::Init => {
            // Platform::open already created the schema and seeded roles.
            println!("Database ready at {}", config.database.path.display());
            Ok(())
        }
        Commands::User(cmd) => cmd_user(&mut platform, actor, cmd),
        Commands::Role(cmd) => cmd_role(&mut platform, actor, cmd),
        Commands::Post(cmd) => cmd_post(&mut platform, actor, cmd),
        Commands::Comment(cmd) => cmd_comment(&mut platform, actor, cmd),
    }
}

fn init_logging(config: &Config) {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_actor(platform: &Platform, email: Option<&str>) -> Result<Option<UserId>> {
    let Some(email) = email else {
        return Ok(None);
    };
    let user = platform
        .store()
        .user_by_email(email)?
        .ok_or_else(|| Error::UnknownUser { email: email.to_string() })?;
    Ok(Some(user.id))
}

fn require_actor(actor: Option<UserId>) -> Result<UserId> {
    actor.ok_or(Error::ActorRequired)
}

fn cmd_user(platform: &mut Platform, actor: Option<UserId>, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Add { name, email, scrambler, admin } => {
            let user = platform.register_user(&name, &email, scrambler)?;
            if admin {
                platform.bootstrap_administrator(user.id)?;
            }
            println!("Registered {} <{}> (user {})", user.name, user.email, user.id);
            Ok(())
        }
        UserCommands::List { json } => {
            let users = platform.store().users()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
                return Ok(());
            }
            println!("{:<6}  {:<20}  {:<20}  JOINED", "ID", "NAME", "EMAIL");
            println!("{}", "-".repeat(70));
            for user in users {
                println!(
                    "{:<6}  {:<20}  {:<20}  {}",
                    user.id,
                    user.name,
                    user.email,
                    local_time(user.created_at)
                );
            }
            Ok(())
        }
        UserCommands::Show { email } => {
            let user = platform
                .store()
                .user_by_email(&email)?
                .ok_or(Error::UnknownUser { email })?;

            println!("{} (user {})", user.name, user.id);
            if platform
                .authorize(actor, &Action::ViewEmail { target: user.id })?
                .is_allowed()
            {
                println!("  email: {}", user.email);
            }
            if platform.authorize(actor, &Action::ViewScramblerInfo)?.is_allowed() {
                println!("  scrambler: {}", user.scrambler_algorithm);
            }
            for role in platform.store().roles_of(user.id)? {
                let visible = platform
                    .authorize(actor, &Action::ViewUserRole { target: user.id, role: &role })?
                    .is_allowed();
                if visible {
                    println!("  role: {}", role.name);
                }
            }
            Ok(())
        }
        UserCommands::Rm { email } => {
            let user = platform
                .store()
                .user_by_email(&email)?
                .ok_or(Error::UnknownUser { email })?;
            platform.delete_user(require_actor(actor)?, user.id)?;
            println!("Deleted user {}", user.id);
            Ok(())
        }
    }
}

fn cmd_role(platform: &mut Platform, actor: Option<UserId>, cmd: RoleCommands) -> Result<()> {
    match cmd {
        RoleCommands::List { json } => {
            let roles = platform.roles(actor)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&roles)?);
                return Ok(());
            }
            for role in roles {
                println!("{:<6}  {}", role.id, role.name);
            }
            Ok(())
        }
        RoleCommands::Add { name } => {
            let role = platform.create_role(require_actor(actor)?, &name)?;
            println!("Created role {} ({})", role.name, role.id);
            Ok(())
        }
        RoleCommands::Rename { name, new_name } => {
            let role = find_role(platform, &name)?;
            let role = platform.rename_role(require_actor(actor)?, role, &new_name)?;
            println!("Renamed to {}", role.name);
            Ok(())
        }
        RoleCommands::Rm { name } => {
            let role = find_role(platform, &name)?;
            platform.delete_role(require_actor(actor)?, role)?;
            println!("Deleted role {name}");
            Ok(())
        }
        RoleCommands::Grant { role, email } => {
            let role_id = find_role(platform, &role)?;
            let target = find_user(platform, &email)?;
            platform.grant_role(require_actor(actor)?, role_id, target)?;
            println!("Granted {role} to {email}");
            Ok(())
        }
        RoleCommands::Revoke { role, email } => {
            let role_id = find_role(platform, &role)?;
            let target = find_user(platform, &email)?;
            if platform.revoke_role(require_actor(actor)?, role_id, target)? {
                println!("Revoked {role} from {email}");
            } else {
                println!("{email} did not hold {role}");
            }
            Ok(())
        }
        RoleCommands::Members { role } => {
            let role_id = find_role(platform, &role)?;
            for user in platform.role_members(actor, role_id)? {
                println!("{:<6}  {:<20}  {}", user.id, user.name, user.email);
            }
            Ok(())
        }
    }
}

fn cmd_post(platform: &mut Platform, actor: Option<UserId>, cmd: PostCommands) -> Result<()> {
    match cmd {
        PostCommands::Add { title, body } => {
            let post = platform.create_post(require_actor(actor)?, &title, &body)?;
            println!("Created post {}", post.id);
            Ok(())
        }
        PostCommands::List { json } => {
            let posts = platform.posts(actor)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&posts)?);
                return Ok(());
            }
            println!("{:<6}  {:<40}  POSTED", "ID", "TITLE");
            println!("{}", "-".repeat(70));
            for post in posts {
                println!(
                    "{:<6}  {:<40}  {}",
                    post.id,
                    post.title,
                    local_time(post.created_at)
                );
            }
            Ok(())
        }
        PostCommands::Show { id } => {
            let post = platform.post(actor, PostId(id))?;
            print_post(platform, actor, &post)?;
            Ok(())
        }
        PostCommands::Update { id, title, body } => {
            platform.update_post(require_actor(actor)?, PostId(id), &title, &body)?;
            println!("Updated post {id}");
            Ok(())
        }
        PostCommands::Rm { id } => {
            platform.delete_post(require_actor(actor)?, PostId(id))?;
            println!("Deleted post {id}");
            Ok(())
        }
        PostCommands::Like { id } => {
            platform.like_post(require_actor(actor)?, PostId(id))?;
            println!("Liked post {id}");
            Ok(())
        }
        PostCommands::Dislike { id } => {
            platform.dislike_post(require_actor(actor)?, PostId(id))?;
            println!("Disliked post {id}");
            Ok(())
        }
        PostCommands::Unlike { id } => {
            if platform.unlike_post(require_actor(actor)?, PostId(id))? {
                println!("Opinion withdrawn from post {id}");
            } else {
                println!("No opinion to withdraw from post {id}");
            }
            Ok(())
        }
    }
}

fn cmd_comment(platform: &mut Platform, actor: Option<UserId>, cmd: CommentCommands) -> Result<()> {
    match cmd {
        CommentCommands::Add { post, content } => {
            let comment = platform.create_comment(require_actor(actor)?, PostId(post), &content)?;
            println!("Created comment {}", comment.id);
            Ok(())
        }
        CommentCommands::List { post, json } => {
            let comments = platform.comments(actor, PostId(post))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&comments)?);
                return Ok(());
            }
            for comment in comments {
                let reactions = platform.comment_reactions(actor, comment.id)?;
                let shown = comment_text_for(actor, &comment);
                println!(
                    "[{}] (+{} / -{}) {}",
                    comment.id, reactions.likes, reactions.dislikes, shown
                );
            }
            Ok(())
        }
        CommentCommands::Rm { id } => {
            platform.delete_comment(require_actor(actor)?, CommentId(id))?;
            println!("Deleted comment {id}");
            Ok(())
        }
        CommentCommands::Like { id } => {
            platform.like_comment(require_actor(actor)?, CommentId(id))?;
            println!("Liked comment {id}");
            Ok(())
        }
        CommentCommands::Dislike { id } => {
            platform.dislike_comment(require_actor(actor)?, CommentId(id))?;
            println!("Disliked comment {id}");
            Ok(())
        }
        CommentCommands::Unlike { id } => {
            if platform.unlike_comment(require_actor(actor)?, CommentId(id))? {
                println!("Opinion withdrawn from comment {id}");
            } else {
                println!("No opinion to withdraw from comment {id}");
            }
            Ok(())
        }
    }
}

fn print_post(platform: &Platform, viewer: Option<UserId>, post: &Post) -> Result<()> {
    let reactions = platform.post_reactions(viewer, post.id)?;

    println!("# {} (post {})", post.title, post.id);
    println!("Posted: {}", local_time(post.created_at));
    println!("Likes: {}  Dislikes: {}", reactions.likes, reactions.dislikes);
    println!();
    // Owners see their own words; everyone else gets the scrambled copy.
    if viewer == Some(post.user_id) {
        println!("{}", post.body);
    } else {
        println!("{}", post.scrambled_body);
    }

    let comments = platform.comments(viewer, post.id)?;
    if !comments.is_empty() {
        println!();
        println!("Comments:");
        for comment in comments {
            let shown = comment_text_for(viewer, &comment);
            println!("  [{}] {}", comment.id, shown);
        }
    }
    Ok(())
}

fn comment_text_for(viewer: Option<UserId>, comment: &storage::Comment) -> String {
    if viewer == Some(comment.user_id) {
        comment.content.clone()
    } else {
        comment.scrambled_content.clone()
    }
}

fn find_user(platform: &Platform, email: &str) -> Result<UserId> {
    Ok(platform
        .store()
        .user_by_email(email)?
        .ok_or_else(|| Error::UnknownUser { email: email.to_string() })?
        .id)
}

fn find_role(platform: &Platform, name: &str) -> Result<storage::RoleId> {
    Ok(platform
        .store()
        .role_by_name(name)?
        .ok_or_else(|| Error::UnknownRole { name: name.to_string() })?
        .id)
}

fn local_time(timestamp: DateTime<Utc>) -> String {
    Local
        .from_utc_datetime(&timestamp.naive_utc())
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
