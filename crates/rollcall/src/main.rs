use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use reqwest::{Method, StatusCode, Url};
use rollcall_config::{get_log_dir, is_daemon_running, Config};
use rollcall_output::*;
use rollcall_sheets::{save_token, InteractiveBootstrap, OAuthClient};
use rollcall_types::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::BufReader;

const MAIN_HELP: &str = r#"Rollcall keeps a small roster of users (name, age, commute method, college,
hobbies) in a background daemon and mirrors every newly added user to a
Google Sheet.

The roster lives in memory only: restarting the daemon resets it to the
seed users. Names are lookup keys but are not unique; `get`, `update` and
`delete` always act on the first user with the given name.

Before the first `add` with the Sheets mirror enabled, run `rollcall auth`
once to authorize access to the spreadsheet.

See `rollcall COMMAND --help` for more documentation and command-specific options."#;

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = MAIN_HELP)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RecordArgs {
    #[arg(long, default_value_t = 0, help = "Age")]
    age: i64,
    #[arg(long, default_value = "", help = "How the user commutes")]
    commute_method: String,
    #[arg(long, default_value = "", help = "College")]
    college: String,
    #[arg(long, default_value = "", help = "Hobbies")]
    hobbies: String,
}

impl RecordArgs {
    fn into_record(self, name: String) -> UserRecord {
        UserRecord::new(name, self.age, self.commute_method, self.college, self.hobbies)
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List all users in insertion order.")]
    List,

    #[command(about = "Show the first user with the given name.")]
    Get {
        #[arg(help = "User name (case-sensitive)")]
        name: String,
    },

    #[command(about = "Add a user and mirror it to the spreadsheet.")]
    Add {
        #[arg(long, help = "User name")]
        name: String,
        #[command(flatten)]
        record: RecordArgs,
    },

    #[command(
        about = "Replace every field of the first user with the given name.",
        long_about = "Replace every field of the first user with the given name.\n\n\
            This is a full replacement: fields that are not passed are reset to\n\
            their empty value, they do not keep the old value."
    )]
    Update {
        #[arg(help = "Name of the user to replace")]
        name: String,
        #[arg(long, help = "New name (default: keep NAME)")]
        new_name: Option<String>,
        #[command(flatten)]
        record: RecordArgs,
    },

    #[command(about = "Delete the first user with the given name.")]
    Delete {
        #[arg(help = "User name (case-sensitive)")]
        name: String,
    },

    #[command(about = "Authorize access to the spreadsheet and cache the token.")]
    Auth,

    #[command(about = "Manage the rollcall daemon.")]
    Daemon {
        #[command(subcommand)]
        command: DaemonCommands,
    },

    #[command(about = "Print config file location and contents.")]
    Config,

    #[command(about = "Print help for all commands.")]
    HelpAll,
}

#[derive(Subcommand)]
enum DaemonCommands {
    #[command(about = "Show current daemon state.")]
    Info,
    #[command(about = "Restart the rollcall daemon.")]
    Restart,
    #[command(about = "Start the rollcall daemon.")]
    Start,
    #[command(about = "Stop the rollcall daemon.")]
    Stop,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Daemon { command } => handle_daemon_command(&config, command).await,
        Commands::Auth => handle_auth(&config).await,
        Commands::Config => handle_config(),
        Commands::HelpAll => handle_help_all(),
        command => {
            let client = DaemonClient::new(&config)?;
            client.ensure_running().await?;

            match command {
                Commands::List => {
                    let users: Vec<UserRecord> =
                        client.request(Method::GET, &["getuser"], None::<&()>).await?;
                    print_result(cli.json, &users, |users| format_records(users))
                }
                Commands::Get { name } => {
                    let user: UserRecord = client
                        .request(Method::GET, &["getuser", name.as_str()], None::<&()>)
                        .await?;
                    print_result(cli.json, &user, format_record)
                }
                Commands::Add { name, record } => {
                    let record = record.into_record(name);
                    let user: UserRecord =
                        client.request(Method::POST, &["adduser"], Some(&record)).await?;
                    print_result(cli.json, &user, format_record)
                }
                Commands::Update {
                    name,
                    new_name,
                    record,
                } => {
                    let record = record.into_record(new_name.unwrap_or_else(|| name.clone()));
                    let user: UserRecord = client
                        .request(Method::PATCH, &["updateuser", name.as_str()], Some(&record))
                        .await?;
                    print_result(cli.json, &user, format_record)
                }
                Commands::Delete { name } => {
                    let response: MessageResponse = client
                        .request(Method::DELETE, &["deleteuser", name.as_str()], None::<&()>)
                        .await?;
                    print_result(cli.json, &response, format_message)
                }
                _ => unreachable!(),
            }
        }
    }
}

fn print_result<T: Serialize>(json_output: bool, value: &T, format: impl Fn(&T) -> String) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", format(value));
    }
    Ok(())
}

struct DaemonClient {
    base_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.daemon.request_timeout))
            .build()?;
        Ok(Self {
            base_url: config.daemon_url(),
            http,
        })
    }

    /// Daemon URL for the given path segments, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid daemon address {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn can_connect(&self) -> bool {
        let Ok(url) = self.url(&["session"]) else {
            return false;
        };
        self.http
            .get(url)
            .timeout(Duration::from_millis(500))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn ensure_running(&self) -> Result<()> {
        if self.can_connect().await {
            return Ok(());
        }

        let exe = std::env::current_exe()?;
        let daemon_exe = exe
            .parent()
            .ok_or_else(|| anyhow!("Cannot locate directory of {}", exe.display()))?
            .join("rollcall-daemon");

        Command::new(&daemon_exe)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .envs(std::env::vars())
            .spawn()?;

        for _ in 0..100 {
            if self.can_connect().await {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Err(anyhow!("Failed to start daemon"))
    }

    async fn request<B, R>(&self, method: Method, segments: &[&str], body: Option<&B>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.http.request(method, self.url(segments)?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach daemon at {}: {}", self.base_url, e))?;

        let status = response.status();
        let body: Value = response.json().await?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                return Err(anyhow!(
                    "{}\n\nThe user was stored but not mirrored. See {} for details.",
                    message,
                    get_log_dir().join("daemon.log").display()
                ));
            }
            return Err(anyhow!("{}", message));
        }

        Ok(serde_json::from_value(body)?)
    }
}

async fn handle_daemon_command(config: &Config, command: DaemonCommands) -> Result<()> {
    let client = DaemonClient::new(config)?;

    match command {
        DaemonCommands::Start => {
            if is_daemon_running() {
                println!("Daemon already running");
            } else {
                client.ensure_running().await?;
                println!("Daemon started");
            }
        }
        DaemonCommands::Stop => {
            if !is_daemon_running() {
                println!("Daemon is not running");
            } else {
                let _: ShutdownResult = client.request(Method::POST, &["shutdown"], None::<&()>).await?;
                println!("Daemon stopped");
            }
        }
        DaemonCommands::Restart => {
            if is_daemon_running() {
                let _: ShutdownResult = client.request(Method::POST, &["shutdown"], None::<&()>).await?;
                for _ in 0..50 {
                    if !client.can_connect().await {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
            client.ensure_running().await?;
            println!("Daemon restarted");
        }
        DaemonCommands::Info => {
            client.ensure_running().await?;
            let session: DescribeSessionResult =
                client.request(Method::GET, &["session"], None::<&()>).await?;
            println!("{}", format_describe_session_result(&session));
        }
    }
    Ok(())
}

async fn handle_auth(config: &Config) -> Result<()> {
    let credentials_path = config.sheets.credentials_path();
    let token_path = config.sheets.token_path();

    let client = OAuthClient::load(&credentials_path)?;
    let bootstrap = InteractiveBootstrap::new(client, config.sheets.scope.clone(), reqwest::Client::new());

    println!(
        "Go to the following link in your browser then type the authorization code:\n{}",
        bootstrap.authorization_url()?
    );

    let mut stdin = BufReader::new(tokio::io::stdin());
    let code = bootstrap.read_code(&mut stdin).await?;
    let token = bootstrap.exchange_code(&code).await?;

    println!("Saving credential file to: {}", token_path.display());
    save_token(&token_path, &token)?;
    Ok(())
}

fn handle_config() -> Result<()> {
    let config_path = rollcall_config::get_config_path();
    println!("Config file: {}", config_path.display());
    println!();

    if config_path.exists() {
        println!("{}", std::fs::read_to_string(&config_path)?);
    } else {
        println!("(file does not exist, using defaults)");
    }
    Ok(())
}

fn handle_help_all() -> Result<()> {
    use clap::CommandFactory;

    let mut cmd = Cli::command();

    cmd.write_long_help(&mut std::io::stdout())?;
    println!("\n");

    let subcommands: Vec<_> = cmd
        .get_subcommands()
        .map(|c| c.get_name().to_string())
        .collect();
    for name in subcommands {
        if name == "help-all" || name == "help" {
            continue;
        }
        let mut subcmd = Cli::command();
        if let Some(sub) = subcmd.find_subcommand_mut(&name) {
            println!(
                "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
            );
            println!("rollcall {}", name);
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
            sub.write_long_help(&mut std::io::stdout())?;
            println!("\n");
        }
    }

    Ok(())
}
