use crate::cli::args::Args;
use crate::cli::output::{ConfigSummary, ConsoleWriter};
use crate::cli::prompt::{confirm, ConsoleOperator};
use crate::core::session::{run_session, ProvisionReport, ProvisionSession};
use crate::domain::error::{ProvisionError, ProvisionResult};
use crate::domain::validation::validate;
use crate::infrastructure::config::{ConfigStore, SettingsManager};
use crate::infrastructure::serial::{available_ports, SerialClient};
use tracing::{debug, info};

/// Run the tool: load, validate, summarize, confirm, provision
pub async fn execute_command(args: Args) -> ProvisionResult<()> {
    let writer = ConsoleWriter::new();

    let mut settings = SettingsManager::new().load(args.settings.as_deref())?;
    args.apply_to(&mut settings);
    debug!("Effective settings: {:?}", settings);

    if args.list_ports {
        writer.write_ports(&available_ports()?);
        return Ok(());
    }

    writer.write_banner();

    let store = match &args.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::beside_executable(&settings.config_file)?,
    };

    let record = match store.load_record() {
        Ok(record) => record,
        Err(ProvisionError::TemplateCreated { path }) => {
            writer.write_template_created(&path);
            return Err(ProvisionError::TemplateCreated { path });
        }
        Err(e) => return Err(e),
    };
    info!("Loaded {} parameter(s) from {}", record.parameter_count(), store.path().display());

    let report = validate(&record);
    writer.write_validation(&report, store.path());
    if !report.is_valid() {
        return Err(ProvisionError::Validation { errors: report.errors });
    }

    let port = settings.serial.port.clone();
    writer.write_summary(&ConfigSummary::from_record(&record, &port));

    if !args.yes {
        let confirmed = tokio::select! {
            answer = confirm("Write this config to device? [y/N]: ") => answer?,
            _ = interrupted() => return Err(ProvisionError::Interrupted),
        };
        if !confirmed {
            return Err(ProvisionError::Cancelled);
        }
        println!();
    }

    writer.write_message(&format!("Connecting to {}...", port));
    let client = SerialClient::open(&port, &settings.serial)?;
    let baud_rate = settings.serial.baud_rate;

    let session = ProvisionSession::new(client, settings);
    let mut operator = ConsoleOperator::new(writer);
    let outcome: ProvisionReport = run_session(session, &record, &mut operator, interrupted()).await?;
    debug!("Provisioning report: {:?}", outcome);

    writer.write_message(&format!(
        "Monitor device: arduino-cli monitor -p {} -c baudrate={}",
        port, baud_rate
    ));
    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Print a failed run's error with the hints that fit it
pub fn report_failure(writer: &ConsoleWriter, error: &ProvisionError) {
    match error {
        // Already explained where they were detected
        ProvisionError::TemplateCreated { .. } | ProvisionError::Validation { .. } => {}
        _ if error.is_user_stop() => writer.write_message(&format!("\n{}", error)),
        ProvisionError::Connection { port, .. } => {
            writer.write_error(&error.to_string());
            writer.write_connection_hints(port);
        }
        other => writer.write_error(&other.to_string()),
    }
}
