// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - chat: open the chat (default when no subcommand is given)
// - login / register / logout: account management
// - profile / conversations: read-only account views
// - config: show, reset, edit or locate the configuration file

use crate::api::{ApiClient, ApiError};
use crate::auth::validation::{password_strength, strength_label, DEFAULT_COUNTRY};
use crate::auth::{AuthSession, LoginForm, RegistrationForm};
use crate::chat::{ChatController, SessionHandle, WsConnector};
use crate::config::{Config, VERSION};
use crate::logging::LogBuffer;
use crate::routes::{self, ChannelNavigator, RouteDecision, HOME_PATH, LOGIN_PATH};
use crate::tui::Exit;
use crate::{repl, startup, tui};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{BufRead, IsTerminal, Write};
use std::process::Command;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Terminal client for the shopping assistant
#[derive(Parser)]
#[command(name = "shopchat")]
#[command(version = VERSION)]
#[command(about = "Chat with the shopping assistant from your terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the chat (default)
    Chat {
        /// Resume an existing conversation by id
        #[arg(long)]
        conversation: Option<String>,

        /// Line-oriented mode instead of the full-screen interface
        #[arg(long)]
        no_tui: bool,
    },

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },

    /// Create an account
    Register,

    /// Forget the stored credential
    Logout,

    /// Show the signed-in user's profile
    Profile,

    /// List stored conversations
    Conversations,

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(long)]
        edit: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

impl Commands {
    /// Whether this command takes over the terminal with the TUI
    pub fn uses_tui(command: Option<&Commands>, config: &Config) -> bool {
        match command {
            None => config.enable_tui,
            Some(Commands::Chat { no_tui, .. }) => config.enable_tui && !no_tui,
            Some(_) => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config command (handled before logging and config loading)
// ─────────────────────────────────────────────────────────────────────────────

/// Handle `config`. Returns true if it ran (exit after).
pub fn handle_config_command(command: Option<&Commands>) -> bool {
    let Some(Commands::Config {
        show,
        reset,
        edit,
        path,
    }) = command
    else {
        return false;
    };

    if *path {
        handle_config_path();
    } else if *show {
        handle_config_show();
    } else if *reset {
        handle_config_reset();
    } else if *edit {
        handle_config_edit();
    } else {
        // No flag provided, show help
        println!("Usage: shopchat config [--show|--reset|--edit|--path]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --reset   Reset config file to defaults");
        println!("  --edit    Open config file in $EDITOR");
        println!("  --path    Show config file path");
    }
    true
}

fn handle_config_path() {
    match Config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
    }
}

fn handle_config_show() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    println!("# Effective configuration (env > file > defaults)");
    println!();
    println!("backend_url = {:?}", config.backend_url);
    println!("data_dir = {:?}", config.data_dir.display().to_string());
    println!("tui = {}", config.enable_tui);
    println!();
    println!("[session]");
    println!("reconnect_delay_ms = {}", config.session.reconnect_delay_ms);
    println!();
    println!("[logging]");
    println!("level = {:?}", config.logging.level);
    println!("file_enabled = {}", config.logging.file_enabled);
    println!("file_dir = {:?}", config.logging.file_dir.display().to_string());
    println!("file_rotation = {:?}", config.logging.file_rotation.as_str());
    println!("file_prefix = {:?}", config.logging.file_prefix);

    match config.transport() {
        Ok(transport) => {
            println!();
            println!("# REST:   {}", transport.http_base());
            println!("# Socket: {}", transport.ws_base());
        }
        Err(e) => println!("# Warning: backend_url is not usable: {}", e),
    }

    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}

fn handle_config_reset() {
    let Some(path) = Config::config_path() else {
        eprintln!("Error: Could not determine config path");
        std::process::exit(1);
    };

    if path.exists() {
        let answer = prompt(&format!(
            "Config file exists at {}. Overwrite? [y/N]",
            path.display()
        ))
        .unwrap_or_default();
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return;
        }
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            std::process::exit(1);
        }
    }

    // Write the default config (using Config's single source of truth)
    if let Err(e) = std::fs::write(&path, Config::default().to_toml()) {
        eprintln!("Error writing config: {}", e);
        std::process::exit(1);
    }

    println!("Config reset to defaults: {}", path.display());
}

fn handle_config_edit() {
    let Some(path) = Config::config_path() else {
        eprintln!("Error: Could not determine config path");
        std::process::exit(1);
    };

    if !path.exists() {
        Config::ensure_config_exists();
        println!("Created new config file: {}", path.display());
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "nano".to_string()
            }
        });

    println!("Opening {} with {}", path.display(), editor);

    match Command::new(&editor).arg(&path).status() {
        Ok(s) if s.success() => {}
        Ok(s) => {
            eprintln!("Editor exited with status: {}", s);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to launch editor '{}': {}", editor, e);
            eprintln!("Set $EDITOR environment variable to your preferred editor");
            std::process::exit(1);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Prompts
// ─────────────────────────────────────────────────────────────────────────────

/// Read one trimmed line after printing `label`
fn prompt(label: &str) -> Result<String> {
    eprint!("{} ", label);
    std::io::stderr().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("input closed");
    }
    Ok(line.trim().to_string())
}

/// Like `prompt`, with a value used when the answer is empty
fn prompt_default(label: &str, default: &str) -> Result<String> {
    let answer = prompt(&format!("{} [{}]:", label, default))?;
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer
    })
}

/// Read a secret without echoing it. Falls back to a plain line when stdin
/// is not a terminal.
fn prompt_secret(label: &str) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        return prompt(label);
    }

    eprint!("{} ", label);
    std::io::stderr().flush()?;
    enable_raw_mode().context("Failed to enable raw mode")?;
    let secret = read_masked();
    disable_raw_mode().context("Failed to disable raw mode")?;
    eprintln!();
    secret
}

fn read_masked() -> Result<String> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("cancelled")
            }
            KeyCode::Char(c) => {
                secret.push(c);
                eprint!("*");
            }
            KeyCode::Backspace => {
                if secret.pop().is_some() {
                    eprint!("\x08 \x08");
                }
            }
            _ => {}
        }
        std::io::stderr().flush()?;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Account commands
// ─────────────────────────────────────────────────────────────────────────────

/// REST client over the persistent session, plus the channel the session
/// uses to ask for navigation.
pub struct ClientContext {
    pub api: ApiClient,
    pub navigation: mpsc::UnboundedReceiver<String>,
}

impl ClientContext {
    pub fn open(config: &Config) -> Result<Self> {
        let transport = config
            .transport()
            .with_context(|| format!("invalid backend_url {:?}", config.backend_url))?;
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("cannot create data directory {}", config.data_dir.display())
        })?;

        let (navigator, navigation) = ChannelNavigator::new();
        let session = AuthSession::open(&config.data_dir, Arc::new(navigator))
            .context("cannot open credential stores")?;

        Ok(Self {
            api: ApiClient::new(transport, Arc::new(session)),
            navigation,
        })
    }

    /// Drop navigation requests left over from earlier operations
    fn drain_navigation(&mut self) {
        while self.navigation.try_recv().is_ok() {}
    }
}

async fn login_flow(api: &ApiClient, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email:")?,
    };
    let form = LoginForm {
        email,
        password: prompt_secret("Password:")?,
    };
    form.validate()?;

    match api.sign_in(form.email.trim(), &form.password).await {
        Ok(_) => {
            println!("Login successful. Welcome back!");
            Ok(())
        }
        Err(ApiError::Unauthorized | ApiError::Status { status: 400..=401, .. }) => {
            bail!("Invalid email or password.")
        }
        Err(e) => Err(e).context("Login failed"),
    }
}

async fn handle_login(ctx: &ClientContext, email: Option<String>) -> Result<()> {
    if let RouteDecision::Redirect(_) = routes::guard(LOGIN_PATH, ctx.api.session().is_signed_in())
    {
        println!("Already signed in. Run `shopchat logout` to switch accounts.");
        return Ok(());
    }
    login_flow(&ctx.api, email).await
}

async fn handle_register(ctx: &ClientContext) -> Result<()> {
    let mut form = RegistrationForm {
        name: prompt("Full name:")?,
        email: prompt("Email:")?,
        phone: prompt("Phone number:")?,
        country: prompt_default("Country", DEFAULT_COUNTRY)?,
        dob: prompt("Date of birth (YYYY-MM-DD, optional):")?,
        profile_picture: prompt("Profile picture URL (optional):")?,
        ..Default::default()
    };

    form.password = prompt_secret("Password:")?;
    let strength = password_strength(&form.password);
    println!("Password strength: {} ({}/5)", strength_label(strength), strength);
    form.confirm_password = prompt_secret("Confirm password:")?;
    form.accept_terms = prompt("Accept the terms and conditions? [y/N]")?
        .eq_ignore_ascii_case("y");

    let payload = form.validate()?;
    ctx.api
        .register(&payload)
        .await
        .context("Registration failed")?;

    println!("Account created. You can sign in now with `shopchat login`.");
    Ok(())
}

fn handle_logout(ctx: &ClientContext) -> Result<()> {
    ctx.api
        .session()
        .logout()
        .context("could not clear stored credentials")?;
    println!("Signed out.");
    Ok(())
}

fn require_sign_in(ctx: &ClientContext, path: &str) -> Result<()> {
    if let RouteDecision::Redirect(to) = routes::guard(path, ctx.api.session().is_signed_in()) {
        tracing::debug!("{} redirected to {}", path, to);
        bail!("Not signed in. Run `shopchat login` first.");
    }
    Ok(())
}

async fn handle_profile(ctx: &ClientContext) -> Result<()> {
    require_sign_in(ctx, "/profile")?;
    let profile = ctx.api.profile().await?;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

async fn handle_conversations(ctx: &ClientContext) -> Result<()> {
    require_sign_in(ctx, "/conversations")?;
    let conversations = ctx.api.list_conversations().await?;
    if conversations.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }
    for conversation in &conversations {
        println!(
            "{:>10}  {}  {}",
            conversation.id,
            conversation.updated_at.as_deref().unwrap_or("-"),
            conversation.display_title()
        );
    }
    println!();
    println!("Resume one with `shopchat chat --conversation <id>`.");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_chat(
    mut ctx: ClientContext,
    config: &Config,
    mut conversation: Option<String>,
    use_tui: bool,
    log_buffer: LogBuffer,
) -> Result<()> {
    loop {
        if let RouteDecision::Redirect(to) =
            routes::guard(HOME_PATH, ctx.api.session().is_signed_in())
        {
            tracing::info!("Not signed in, redirecting to {}", to);
            println!("Please sign in to start chatting.");
            login_flow(&ctx.api, None).await?;
        }
        ctx.drain_navigation();

        let (session, mut events) = SessionHandle::spawn(
            Arc::new(WsConnector),
            ctx.api.transport().clone(),
            ctx.api.session().clone(),
            config.session.reconnect_delay(),
        );
        let mut controller = ChatController::new(ctx.api.clone(), session.clone());

        if let Some(id) = conversation.take() {
            controller
                .resume(&id)
                .await
                .with_context(|| format!("could not open conversation {}", id))?;
        }

        let exit = if use_tui {
            tui::run_tui(
                &mut controller,
                &mut events,
                &mut ctx.navigation,
                log_buffer.clone(),
            )
            .await
        } else {
            repl::run_repl(&mut controller, &mut events, &mut ctx.navigation).await
        };
        session.shutdown();

        match exit? {
            Exit::Quit => return Ok(()),
            Exit::LoginRequired => {
                println!("Your session has expired. Please sign in again.");
            }
        }
    }
}

async fn start_chat(
    ctx: ClientContext,
    config: &Config,
    conversation: Option<String>,
    use_tui: bool,
    log_buffer: LogBuffer,
) -> Result<()> {
    let signed_in = ctx.api.session().is_signed_in();
    if use_tui {
        startup::log_startup(config, signed_in);
    } else {
        startup::print_startup(config, signed_in);
    }
    handle_chat(ctx, config, conversation, use_tui, log_buffer).await
}

/// Run the selected command (chat when none was given)
pub async fn run(command: Option<Commands>, config: Config, log_buffer: LogBuffer) -> Result<()> {
    let use_tui = Commands::uses_tui(command.as_ref(), &config);
    let ctx = ClientContext::open(&config)?;

    match command {
        None => start_chat(ctx, &config, None, use_tui, log_buffer).await,
        Some(Commands::Chat { conversation, .. }) => {
            start_chat(ctx, &config, conversation, use_tui, log_buffer).await
        }
        Some(Commands::Login { email }) => handle_login(&ctx, email).await,
        Some(Commands::Register) => handle_register(&ctx).await,
        Some(Commands::Logout) => handle_logout(&ctx),
        Some(Commands::Profile) => handle_profile(&ctx).await,
        Some(Commands::Conversations) => handle_conversations(&ctx).await,
        // Handled before startup
        Some(Commands::Config { .. }) => Ok(()),
    }
}
