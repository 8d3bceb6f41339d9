use log::{error, info};
use pipeline_client_lib::progress::{format_elapsed, format_file_size};
use pipeline_client_lib::{
    ApiClient, ClientConfig, GenerateParams, JobSubmitter, LifecycleGuard, PollOutcome,
    ProgressView, TransferKind,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

const USAGE: &str = "usage: pipeline-client <generate <records> [file-name] | convert <path> | upload <path> | health>";

enum Command {
    Generate {
        records: u64,
        file_name: Option<String>,
    },
    Transfer(TransferKind, PathBuf),
    Health,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    match args {
        [cmd, records, rest @ ..] if cmd == "generate" && rest.len() <= 1 => {
            let records = records
                .parse()
                .map_err(|_| format!("invalid record count: {}", records))?;
            Ok(Command::Generate {
                records,
                file_name: rest.first().cloned(),
            })
        }
        [cmd, path] if cmd == "convert" => Ok(Command::Transfer(
            TransferKind::ConvertExcelToCsv,
            PathBuf::from(path),
        )),
        [cmd, path] if cmd == "upload" => {
            Ok(Command::Transfer(TransferKind::UploadCsvToDb, PathBuf::from(path)))
        }
        [cmd] if cmd == "health" => Ok(Command::Health),
        _ => Err(USAGE.to_string()),
    }
}

fn load_config() -> Result<ClientConfig, String> {
    let config = match std::env::var("PIPELINE_CONFIG") {
        Ok(path) => ClientConfig::from_file(Path::new(&path)),
        Err(_) => ClientConfig::from_env(),
    };
    config.map_err(|e| e.to_string())
}

fn print_view(view: &ProgressView) {
    match view.records {
        Some((current, total)) => println!(
            "[{}] {:>3}% {}/{} records, {} - {}",
            view.state, view.percent, current, total, view.elapsed_label, view.message
        ),
        None => println!("[{}] {:>3}%", view.state, view.percent),
    }
}

async fn run_generate(
    client: ApiClient,
    config: &ClientConfig,
    guard: &LifecycleGuard,
    records: u64,
    file_name: Option<String>,
) -> Result<(), String> {
    let api = Arc::new(client);
    let mut params = GenerateParams::new(records);
    if let Some(name) = file_name {
        params = params.with_file_name(name);
    }

    let handle = JobSubmitter::new(api.clone())
        .submit(&params)
        .await
        .map_err(|e| e.to_string())?;
    println!("job started: {}", handle);

    let poller = guard.poller(api, config.poll_interval());
    let mut status = poller.subscribe();
    let task = poller.start(handle).map_err(|e| e.to_string())?;

    let printer = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            print_view(&ProgressView::from_status(
                current.state,
                current.snapshot.as_ref(),
            ));
            if current.state.is_terminal() {
                break;
            }
        }
    });

    let outcome = task.outcome().await;
    let _ = printer.await;

    match outcome {
        PollOutcome::Completed(snapshot) => {
            println!(
                "job completed: {} records in {}",
                snapshot.current_units,
                format_elapsed(snapshot.elapsed_ms)
            );
            Ok(())
        }
        PollOutcome::Failed { error, .. } => Err(error.to_string()),
        PollOutcome::Cancelled { .. } => Err("cancelled".to_string()),
    }
}

async fn run_transfer(
    client: ApiClient,
    guard: &LifecycleGuard,
    kind: TransferKind,
    path: &Path,
) -> Result<(), String> {
    if let Ok(meta) = tokio::fs::metadata(path).await {
        println!("{}: {} ({})", kind, path.display(), format_file_size(meta.len()));
    }

    let emitter = guard.emitter(client);
    let mut progress = emitter.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = None;
        while progress.changed().await.is_ok() {
            let percent = progress.borrow_and_update().percent;
            if last != Some(percent) {
                println!("upload {:>3}%", percent);
                last = Some(percent);
            }
        }
    });

    let result = emitter.transfer(kind, path).await;
    printer.abort();

    let data = result.map_err(|e| e.to_string())?;
    println!("upload {:>3}%", emitter.progress().percent);
    println!(
        "{} done: {} records -> {}",
        data.operation, data.records_processed, data.path
    );
    Ok(())
}

async fn run(command: Command, config: ClientConfig, guard: &LifecycleGuard) -> Result<(), String> {
    let client = ApiClient::new(&config).map_err(|e| e.to_string())?;
    info!("client_ready: base_url={}", client.base_url());

    match command {
        Command::Generate { records, file_name } => {
            run_generate(client, &config, guard, records, file_name).await
        }
        Command::Transfer(kind, path) => run_transfer(client, guard, kind, &path).await,
        Command::Health => {
            let response = client.health_check().await.map_err(|e| e.to_string())?;
            if response.success {
                println!("healthy: {}", response.message);
                Ok(())
            } else {
                Err(format!("unhealthy: {}", response.message))
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{}", usage);
            return ExitCode::from(2);
        }
    };
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("config_error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let guard = LifecycleGuard::new();
    let result = tokio::select! {
        result = run(command, config, &guard) => result,
        _ = tokio::signal::ctrl_c() => {
            guard.teardown();
            Err("interrupted".to_string())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("command_failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
