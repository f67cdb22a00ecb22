//! Docket CLI - case management for small law practices.

use clap::Parser;
use docket::action_log;
use docket::cli::{
    CaseCommands, Cli, ClientCommands, Commands, ConfigCommands, DocCommands, EventCommands,
    RecordAction, TaskCommands, TxnCommands,
};
use docket::commands::{self, Output, records};
use docket::config::{ConfigOverrides, ResolvedConfig, resolve_config};
use docket::models::{Case, Client, Document, Editable, Event, Searchable, Task, Transaction};
use docket::session::Session;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (`warn` by default).
const LOG_ENV: &str = "DOCKET_LOG";

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;
    init_tracing(cli.log_json);

    let mut overrides = ConfigOverrides::new();
    if let Some(dir) = cli.data_dir {
        overrides = overrides.with_data_dir(dir);
    }
    if let Some(backend) = cli.backend {
        overrides = overrides.with_backend(backend);
    }
    let config = match resolve_config(&overrides) {
        Ok(config) => config,
        Err(e) => exit_with_error(&e, human),
    };

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();
    let result = run_command(cli.command, &config, human);
    let duration = start.elapsed().as_millis() as u64;

    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };
    if config.action_log.value {
        action_log::log_action(
            &config.data_dir.value,
            &cmd_name,
            args_json,
            success,
            error,
            duration,
        );
    }

    if let Err(e) = result {
        exit_with_error(&e, human);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

fn exit_with_error(e: &docket::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
    process::exit(1);
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn print_warnings(session: &mut Session) {
    for warning in session.take_warnings() {
        eprintln!("warning: {}", warning);
    }
}

/// Open a session, optionally load records, run `action`, report warnings.
fn with_session<F>(config: &ResolvedConfig, load: bool, action: F) -> Result<(), docket::Error>
where
    F: FnOnce(&mut Session) -> Result<(), docket::Error>,
{
    let mut session = Session::open(config)?;
    if load {
        session.bootstrap();
    }
    let result = action(&mut session);
    print_warnings(&mut session);
    result
}

fn run_records<T: Editable + Searchable>(
    session: &mut Session,
    action: RecordAction,
    human: bool,
) -> Result<(), docket::Error> {
    match action {
        RecordAction::Add { fields, .. } => output(&records::add::<T>(session, &fields)?, human),
        RecordAction::List(filter) => output(&records::list::<T>(session, &filter), human),
        RecordAction::Edit { index, fields } => {
            output(&records::edit::<T>(session, index, &fields)?, human)
        }
        RecordAction::Remove { index } => output(&records::remove::<T>(session, index)?, human),
    }
    Ok(())
}

fn run_command(
    command: Option<Commands>,
    config: &ResolvedConfig,
    human: bool,
) -> Result<(), docket::Error> {
    match command {
        None | Some(Commands::Overview) => with_session(config, true, |session| {
            output(&commands::overview(session), human);
            Ok(())
        }),
        Some(Commands::Client { command }) => with_session(config, true, |session| {
            run_records::<Client>(session, command.action(), human)
        }),
        Some(Commands::Case { command }) => with_session(config, true, |session| {
            run_records::<Case>(session, command.action(), human)
        }),
        Some(Commands::Task { command }) => with_session(config, true, |session| {
            run_records::<Task>(session, command.action(), human)
        }),
        Some(Commands::Event { command }) => with_session(config, true, |session| {
            run_records::<Event>(session, command.action(), human)
        }),
        Some(Commands::Txn { command }) => with_session(config, true, |session| {
            run_records::<Transaction>(session, command.action(), human)
        }),
        Some(Commands::Doc { command }) => with_session(config, true, |session| {
            match command.action() {
                RecordAction::Add { fields, upload } => {
                    let result = records::add_document(session, &fields, upload.as_deref())?;
                    output(&result, human);
                    Ok(())
                }
                other => run_records::<Document>(session, other, human),
            }
        }),
        Some(Commands::ByClient { name }) => with_session(config, true, |session| {
            output(&commands::by_client(session, &name), human);
            Ok(())
        }),
        Some(Commands::Report) => with_session(config, true, |session| {
            output(&commands::report(session), human);
            Ok(())
        }),
        Some(Commands::Export {
            entity,
            format,
            output: path,
        }) => with_session(config, true, |session| {
            let result = commands::export(session, entity, format, path.as_deref())?;
            output(&result, human);
            Ok(())
        }),
        Some(Commands::Sync) => with_session(config, false, |session| {
            output(&commands::sync(session), human);
            Ok(())
        }),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => {
                output(&commands::config_show(config), human);
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(&config.data_dir.value, &key, &value)?, human);
                Ok(())
            }
            ConfigCommands::Unset { key } => {
                output(&commands::config_unset(&config.data_dir.value, &key)?, human);
                Ok(())
            }
        },
        #[cfg(feature = "gui")]
        Some(Commands::Serve { port, host }) => run_gui(config, &host, port),
    }
}

/// Run the web app until interrupted.
#[cfg(feature = "gui")]
fn run_gui(config: &ResolvedConfig, host: &str, port: u16) -> Result<(), docket::Error> {
    let mut session = Session::open(config)?;
    session.bootstrap();
    print_warnings(&mut session);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| docket::Error::Other(format!("Failed to create runtime: {}", e)))?
        .block_on(async {
            docket::gui::start_server(session, host, port)
                .await
                .map_err(|e| docket::Error::Other(format!("web server error: {}", e)))
        })
}

fn serialize_command(command: &Option<Commands>) -> (String, serde_json::Value) {
    let record = |entity: &str, (sub, args): (&str, serde_json::Value)| {
        (format!("{} {}", entity, sub), args)
    };
    match command {
        None | Some(Commands::Overview) => ("overview".to_string(), serde_json::json!({})),
        Some(Commands::Client { command }) => record("client", ClientCommands::describe(command)),
        Some(Commands::Case { command }) => record("case", CaseCommands::describe(command)),
        Some(Commands::Task { command }) => record("task", TaskCommands::describe(command)),
        Some(Commands::Event { command }) => record("event", EventCommands::describe(command)),
        Some(Commands::Txn { command }) => record("txn", TxnCommands::describe(command)),
        Some(Commands::Doc { command }) => record("doc", DocCommands::describe(command)),
        Some(Commands::ByClient { name }) => (
            "by-client".to_string(),
            serde_json::json!({ "name": name }),
        ),
        Some(Commands::Report) => ("report".to_string(), serde_json::json!({})),
        Some(Commands::Export {
            entity,
            format,
            output,
        }) => (
            "export".to_string(),
            serde_json::json!({
                "entity": entity,
                "format": format.extension(),
                "output": output,
            }),
        ),
        Some(Commands::Sync) => ("sync".to_string(), serde_json::json!({})),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => ("config show".to_string(), serde_json::json!({})),
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                serde_json::json!({ "setting": key, "value": value }),
            ),
            ConfigCommands::Unset { key } => (
                "config unset".to_string(),
                serde_json::json!({ "setting": key }),
            ),
        },
        #[cfg(feature = "gui")]
        Some(Commands::Serve { port, host }) => (
            "serve".to_string(),
            serde_json::json!({ "port": port, "host": host }),
        ),
    }
}
