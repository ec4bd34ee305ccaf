use anyhow::Result;
use chaitr_client::HttpChatBackend;
use chaitr_config::{AppConfig, RawSettings};
use chaitr_conversation::{ConversationController, ErrorLog, SettingsEditor, SettingsError};
use chaitr_core::Message;
use chaitr_storage::{FileStore, KeyValueStore, MemoryStore};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chaitr")]
#[command(about = "Chat with a self-hosted backend from the terminal", long_about = None)]
struct Cli {
    /// Defaults to config.yaml in the user config directory
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    /// Keep everything in memory for this run
    #[arg(long, action = clap::ArgAction::SetTrue)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation mode
    Chat,

    /// Send a single message and print the answer
    Send {
        #[arg(short, long)]
        message: String,
    },

    /// Show or change the backend address
    Settings {
        #[arg(short, long)]
        ip_address: Option<String>,

        #[arg(short, long)]
        port: Option<String>,
    },

    /// Print the conversation, newest first
    History {
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print stored error logs
    Logs,

    /// Delete the conversation history
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config_path = cli.config.unwrap_or_else(AppConfig::default_config_path);
    let config = if config_path.exists() {
        info!("Loading configuration from: {:?}", config_path);
        AppConfig::from_yaml(&config_path)?
    } else {
        info!("Using default configuration");
        AppConfig::default()
    };

    let store: Arc<dyn KeyValueStore> = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(&config.storage.dir))
    };

    match cli.command {
        Commands::Chat => {
            let controller = open_controller(store, &config).await?;
            interactive_chat(controller, &config).await?;
        }
        Commands::Send { message } => {
            let controller = open_controller(store, &config).await?;
            send_once(&controller, &message).await;
        }
        Commands::Settings { ip_address, port } => {
            edit_settings(store, &config, ip_address, port).await?;
        }
        Commands::History { limit } => {
            let controller = open_controller(store, &config).await?;
            let messages = controller.messages_newest_first().await;
            if messages.is_empty() {
                println!("No messages yet");
            }
            for message in messages.iter().take(limit.unwrap_or(usize::MAX)) {
                print_message(message);
            }
        }
        Commands::Logs => {
            show_logs(store, &config).await;
        }
        Commands::Clear => {
            let controller = open_controller(store, &config).await?;
            controller.clear_history().await?;
            println!("Conversation cleared");
        }
    }

    Ok(())
}

async fn open_controller(store: Arc<dyn KeyValueStore>, config: &AppConfig) -> Result<ConversationController> {
    let backend = Arc::new(HttpChatBackend::new(&config.client)?);
    Ok(ConversationController::open(store, backend, config).await)
}

async fn send_once(controller: &ConversationController, text: &str) {
    let before = controller.messages().await.len();
    let outcome = controller.submit(text).await;
    info!("Send finished: {:?}", outcome);

    // Skip the echo of our own message
    for message in controller.messages().await.iter().skip(before + 1) {
        print_message(message);
    }
}

/// What a line typed into the chat loop asks for.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Empty,
    Exit,
    History,
    Clear,
    /// A message typed while no usable settings are stored
    Blocked,
    Send(&'a str),
}

impl<'a> ChatInput<'a> {
    fn parse(line: &'a str, misconfigured: bool) -> Self {
        let input = line.trim();
        if input.is_empty() {
            Self::Empty
        } else if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Self::Exit
        } else if input.eq_ignore_ascii_case("history") {
            Self::History
        } else if input.eq_ignore_ascii_case("clear") {
            Self::Clear
        } else if misconfigured {
            Self::Blocked
        } else {
            Self::Send(input)
        }
    }
}

async fn interactive_chat(controller: ConversationController, config: &AppConfig) -> Result<()> {
    println!("💬 Chaitr");
    println!("Type 'exit' or 'quit' to end the conversation");
    println!("Type 'history' to replay the conversation, 'clear' to delete it");
    println!("═══════════════════════════════════════\n");

    let mut typing = controller.typing();
    let assistant = config.client.assistant_name.clone();
    let indicator = tokio::spawn(async move {
        while typing.changed().await.is_ok() {
            if *typing.borrow_and_update() {
                println!("({assistant} is typing...)");
            }
        }
    });

    loop {
        if let Err(e) = controller.refresh_settings().await {
            tracing::warn!("Could not re-read settings: {}", e);
        }
        let banner = controller.configuration_banner();
        if let Some(banner) = banner {
            println!("⚠️  {banner} Run `chaitr settings --ip-address <ADDR> --port <PORT>`.");
        }

        print!("You> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        match ChatInput::parse(&input, banner.is_some()) {
            ChatInput::Empty => continue,
            ChatInput::Exit => {
                println!("Goodbye!");
                break;
            }
            ChatInput::History => {
                for message in controller.messages().await.iter() {
                    print_message(message);
                }
            }
            ChatInput::Clear => {
                controller.clear_history().await?;
                println!("Conversation cleared");
            }
            ChatInput::Blocked => {
                println!("Message not sent. Configure the backend address first.");
            }
            ChatInput::Send(text) => {
                send_once(&controller, text).await;
                println!();
            }
        }
    }

    indicator.abort();
    Ok(())
}

async fn edit_settings(
    store: Arc<dyn KeyValueStore>,
    config: &AppConfig,
    ip_address: Option<String>,
    port: Option<String>,
) -> Result<()> {
    let editor = SettingsEditor::open(store, &config.storage.settings_key).await;

    if ip_address.is_none() && port.is_none() {
        match editor.current() {
            Some(settings) => {
                println!("IP Address: {}", settings.ip_address);
                println!("Port:       {}", settings.port);
                println!("Endpoint:   {}", settings.chat_url());
            }
            None => println!("Settings are not configured yet"),
        }
        return Ok(());
    }

    let defaults = editor.form_defaults();
    let raw = RawSettings {
        ip_address: ip_address.or(defaults.ip_address),
        port: port.or(defaults.port),
    };

    match editor.submit(&raw).await {
        Ok(settings) => {
            println!("✅ Settings saved successfully! ({})", settings.chat_url());
        }
        Err(SettingsError::Invalid(errors)) => {
            for message in errors.ip_address.iter().chain(errors.port.iter()) {
                println!("❌ {message}");
            }
        }
        Err(SettingsError::Storage(e)) => return Err(e.into()),
    }

    Ok(())
}

async fn show_logs(store: Arc<dyn KeyValueStore>, config: &AppConfig) {
    let log = ErrorLog::open(store, &config.storage.logs_key).await;
    for block in log.render() {
        println!("{block}\n");
    }
}

fn print_message(message: &Message) {
    let time = message
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M");
    let marker = if message.is_system { "⚠️ " } else { "" };
    println!("[{}] {}: {}{}", time, message.author.name, marker, message.text);
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = default_filter(verbose);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter))
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    Ok(())
}
