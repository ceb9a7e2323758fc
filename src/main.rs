//! devtron-client - Call the Devtron orchestrator API
//!
//! Entry point for the devtron-client application.

use clap::Parser;
use devtron_client::cli::{BodyArgs, CallArgs, Cli, Commands, ConfigCommands, PostArgs};
use devtron_client::client::ApiResponse;
use devtron_client::config::{Config, LogFormat, LogOutput, LoggingConfig};
use devtron_client::error::exit_code;
use devtron_client::{ApiClient, DevtronError, ServerError};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::process::ExitCode;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = load_config(&cli);
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();

    // Initialize logging based on config and CLI flags
    if let Err(e) = init_logging(&cli, &logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(exit_code::GENERAL_ERROR as u8);
    }

    // Execute the command
    match config.and_then(|config| run(&cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Initialize the tracing subscriber.
///
/// `-v`/`-q` win over `RUST_LOG`, which wins over the configured level.
fn init_logging(
    cli: &Cli,
    logging: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match cli.log_level() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str())),
    };

    let writer = match logging.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);

    match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
}

/// Main application logic.
fn run(cli: &Cli, config: Config) -> devtron_client::Result<()> {
    match &cli.command {
        Commands::Config(subcmd) => cmd_config(cli, subcmd, config),
        command => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(cmd_call(command, config))
        }
    }
}

/// Handle the request subcommands.
async fn cmd_call(command: &Commands, config: Config) -> devtron_client::Result<()> {
    let client = ApiClient::from_config(&config.api)?.with_session_handler(std::sync::Arc::new(
        || tracing::warn!("Session expired; refresh the token (--token / DEVTRON_TOKEN)"),
    ));

    tracing::debug!(root = %client.root_url(), "Created API client");

    let (call, outcome) = match command {
        Commands::Get(args) => (args, client.get(&args.path, args.options()).await),
        Commands::Post(args) => (&args.body.call, post(&client, args).await?),
        Commands::Put(args) => {
            let body = read_body(args).await?;
            let call = &args.call;
            (call, client.put(&call.path, &body, call.options()).await)
        }
        Commands::Delete(args) => {
            let body = read_body(args).await?;
            let call = &args.call;
            (call, client.trash(&call.path, &body, call.options()).await)
        }
        Commands::Config(_) => {
            return Err(DevtronError::invalid_request(
                "config commands do not send requests",
            ))
        }
    };

    match outcome {
        Ok(response) => print_response(call, response).await,
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e)?);
            Err(e.into())
        }
    }
}

async fn post(
    client: &ApiClient,
    args: &PostArgs,
) -> devtron_client::Result<Result<ApiResponse, ServerError>> {
    let call = &args.body.call;

    if !args.is_multipart() {
        let body = read_body(&args.body).await?;
        return Ok(client.post(&call.path, &body, call.options()).await);
    }

    let mut form = Form::new();
    for (key, value) in &args.form {
        form = form.text(key.clone(), value.clone());
    }
    for (key, path) in &args.file {
        let bytes = tokio::fs::read(path).await?;
        let file_name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| key.clone());
        form = form.part(key.clone(), Part::bytes(bytes).file_name(file_name));
    }

    Ok(client.post_multipart(&call.path, form, call.options()).await)
}

/// Reads the JSON body from `--data` or `--data-file`; `null` when neither is set.
async fn read_body(args: &BodyArgs) -> devtron_client::Result<serde_json::Value> {
    let raw = match (&args.data, &args.data_file) {
        (Some(data), _) => data.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path).await?,
        (None, None) => return Ok(serde_json::Value::Null),
    };

    serde_json::from_str(&raw)
        .map_err(|e| DevtronError::invalid_request(format!("Request body is not valid JSON: {}", e)))
}

async fn print_response(call: &CallArgs, response: ApiResponse) -> devtron_client::Result<()> {
    match response {
        ApiResponse::Json(envelope) => {
            println!("{}", serde_json::to_string_pretty(&envelope.body)?);
        }
        ApiResponse::Stream(response) => {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ServerError::network(e.to_string()))?;

            match &call.output {
                Some(path) => {
                    tokio::fs::write(path, &bytes).await?;
                    tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved response body");
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&bytes).await?;
                    stdout.flush().await?;
                }
            }
        }
        ApiResponse::Empty => {
            tracing::info!(path = %call.path, "Response content type not handled; nothing to print");
        }
    }

    Ok(())
}

/// Handle the `config` subcommand.
fn cmd_config(_cli: &Cli, subcmd: &ConfigCommands, config: Config) -> devtron_client::Result<()> {
    match subcmd {
        ConfigCommands::Validate => {
            println!("✓ Configuration is valid");
            tracing::debug!(root = %config.api.root_url, "Validated configuration");
            Ok(())
        }
        ConfigCommands::Show => {
            let mut config = config;
            if config.api.token.is_some() {
                config.api.token = Some("********".to_string());
            }
            let yaml = serde_yaml::to_string(&config).map_err(|e| {
                DevtronError::config_with_source("Failed to serialize configuration", e)
            })?;
            println!("{}", yaml);
            Ok(())
        }
    }
}

/// Load configuration and apply CLI overrides.
fn load_config(cli: &Cli) -> devtron_client::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(root) = &cli.root {
        config.apply_env(Some(root.clone()));
    }
    if let Some(token) = &cli.token {
        config.api.token = Some(token.clone());
    }

    config.validate()?;
    Ok(config)
}
