//! ---
//! gw_section: "05-networking-external-interfaces"
//! gw_subsection: "binary"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Operator CLI for interacting with the GridWatch daemon."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};
use gridwatch_common::fault::{FaultKind, Severity};
use gridwatch_common::version::VersionInfo;
use serde_json::{json, Value};

mod client;

use client::ApiClient;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "GridWatch operator control utility",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    #[arg(
        long,
        env = "GRIDWATCH_ENDPOINT",
        default_value = "http://127.0.0.1:8080",
        help = "Daemon API endpoint"
    )]
    endpoint: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Show daemon status")]
    Status,
    #[command(about = "List monitored poles")]
    Poles,
    #[command(about = "Show one pole in detail")]
    Pole { pole_id: String },
    #[command(about = "List active alerts")]
    Alerts,
    #[command(about = "List recent notifications")]
    Notifications,
    #[command(about = "Isolate a pole from the grid")]
    Isolate {
        pole_id: String,
        #[arg(long, default_value = "operator")]
        operator: String,
    },
    #[command(about = "Restore an isolated or maintenance pole to service")]
    Restore {
        pole_id: String,
        #[arg(long, default_value = "operator")]
        operator: String,
    },
    #[command(about = "Mark a faulty pole as fixed")]
    Fix {
        pole_id: String,
        #[arg(long, default_value = "operator")]
        operator: String,
    },
    #[command(about = "Take a pole into planned maintenance")]
    Maintenance {
        pole_id: String,
        #[arg(long, default_value = "operator")]
        operator: String,
    },
    #[command(about = "Report an issue against a pole")]
    Report {
        pole_id: String,
        #[arg(long, help = "Fault kind, e.g. line_down, overload, voltage_sag")]
        fault: String,
        #[arg(long, help = "Override severity: low, medium, high, critical")]
        severity: Option<String>,
        #[arg(long, help = "Alert message")]
        message: Option<String>,
        #[arg(long, default_value = "operator")]
        reporter: String,
    },
    #[command(about = "Queue a simulated fault for a pole")]
    Inject {
        pole_id: String,
        #[arg(long, help = "Fault kind, e.g. line_down, overload, voltage_sag")]
        fault: String,
    },
    #[command(about = "Dismiss a single alert by id")]
    Dismiss { alert_id: String },
    #[command(about = "Reset all poles and alerts to the configured baseline")]
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", VersionInfo::current().extended());
        return Ok(());
    }
    let Some(command) = cli.command else {
        return Err(anyhow!("no command given; see --help"));
    };
    let client = ApiClient::new(&cli.endpoint)?;

    match command {
        Commands::Status => render(&client.status()?),
        Commands::Poles => render_poles(&client.poles()?),
        Commands::Pole { pole_id } => render(&client.pole(&pole_id)?),
        Commands::Alerts => render_alerts(&client.alerts()?),
        Commands::Notifications => render(&client.notifications()?),
        Commands::Isolate { pole_id, operator } => {
            render(&client.control(&pole_id, "isolate", &operator)?)
        }
        Commands::Restore { pole_id, operator } => {
            render(&client.control(&pole_id, "restore", &operator)?)
        }
        Commands::Fix { pole_id, operator } => render(&client.control(&pole_id, "fix", &operator)?),
        Commands::Maintenance { pole_id, operator } => {
            render(&client.control(&pole_id, "maintenance", &operator)?)
        }
        Commands::Report {
            pole_id,
            fault,
            severity,
            message,
            reporter,
        } => {
            let fault: FaultKind = fault
                .parse()
                .map_err(|_| anyhow!("unknown fault kind: {fault}"))?;
            let severity = severity
                .map(|raw| {
                    raw.parse::<Severity>()
                        .map_err(|_| anyhow!("unknown severity: {raw}"))
                })
                .transpose()?;
            let mut body = json!({
                "fault": fault.to_string(),
                "reported_by": reporter,
            });
            if let Some(severity) = severity {
                body["severity"] = json!(severity.to_string());
            }
            if let Some(message) = message {
                body["message"] = json!(message);
            }
            render(&client.report_issue(&pole_id, body)?)
        }
        Commands::Inject { pole_id, fault } => {
            let fault: FaultKind = fault
                .parse()
                .map_err(|_| anyhow!("unknown fault kind: {fault}"))?;
            render(&client.inject_fault(&pole_id, &fault.to_string())?)
        }
        Commands::Dismiss { alert_id } => render(&client.dismiss_alert(&alert_id)?),
        Commands::Reset => render(&client.reset()?),
    }

    Ok(())
}

fn render(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn render_poles(value: &Value) {
    let Some(poles) = value.as_array() else {
        return render(value);
    };
    println!(
        "{:<12} {:<12} {:>9} {:>9} {:>6}  {}",
        "POLE", "STATUS", "VOLTAGE", "CURRENT", "RISK", "FAULT"
    );
    for pole in poles {
        println!(
            "{:<12} {:<12} {:>9.1} {:>9.1} {:>6.2}  {}",
            field_str(pole, "id"),
            field_str(pole, "status"),
            pole.get("voltage_v").and_then(Value::as_f64).unwrap_or(0.0),
            pole.get("current_a").and_then(Value::as_f64).unwrap_or(0.0),
            pole.get("risk").and_then(Value::as_f64).unwrap_or(0.0),
            pole.get("fault")
                .and_then(Value::as_str)
                .unwrap_or("-"),
        );
    }
}

fn render_alerts(value: &Value) {
    let Some(alerts) = value.as_array() else {
        return render(value);
    };
    if alerts.is_empty() {
        println!("no active alerts");
        return;
    }
    println!(
        "{:<38} {:<12} {:<9} {}",
        "ALERT", "POLE", "SEVERITY", "MESSAGE"
    );
    for alert in alerts {
        println!(
            "{:<38} {:<12} {:<9} {}",
            field_str(alert, "id"),
            field_str(alert, "pole_id"),
            field_str(alert, "severity"),
            field_str(alert, "message"),
        );
    }
}

fn field_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("-")
}
