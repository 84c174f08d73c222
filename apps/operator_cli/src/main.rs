use anyhow::Context;
use chrono::{DateTime, Local};
use clap::Parser;
use client_core::{
    ConnectionMonitor, ConnectionStatus, MesClient, PhotoAttachment, ResetTimer, WizardConfig,
    WizardEngine,
};
use shared::{domain::SlaughterNumber, protocol::ActionKind};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

/// Terminal wizard for the slaughter recovery station.
#[derive(Debug, Parser)]
#[command(name = "operator_cli")]
struct Args {
    /// Base URL of the MES backend.
    #[arg(long, default_value = "http://127.0.0.1:3001")]
    server_url: String,

    /// Seconds between finishing the last step and the automatic reset.
    #[arg(long, default_value_t = 5)]
    reset_ticks: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args = Args::parse();
    let client = MesClient::new(&args.server_url);
    let monitor = ConnectionMonitor::spawn(client.clone(), ConnectionMonitor::DEFAULT_INTERVAL);

    match client.station().await {
        Ok(station) => println!(
            "{} (printer {}) | {}",
            station.name,
            station.printer,
            format_clock(Local::now())
        ),
        Err(err) => warn!(error = %err, "station lookup failed"),
    }

    let mut engine = WizardEngine::with_config(
        client.clone(),
        WizardConfig {
            reset_ticks: args.reset_ticks,
        },
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_offline_banner(&monitor);
        println!();
        println!("Scan or type a slaughter number (empty line to quit):");
        let Some(number) = read_line(&mut lines).await? else {
            break;
        };
        if number.is_empty() {
            break;
        }

        let unit = SlaughterNumber::new(number);
        if let Err(err) = engine.start(unit.clone()).await {
            println!("could not start the session: {err}");
            continue;
        }
        match client.animal_info(&unit).await {
            Ok(animal) => println!("Animal {} ({}, {})", animal.id, animal.species, animal.date),
            Err(err) => warn!(error = %err, "animal lookup failed"),
        }

        run_session(&mut engine, &mut lines, &monitor).await?;
    }
    Ok(())
}

fn print_offline_banner(monitor: &ConnectionMonitor) {
    if monitor.status() == ConnectionStatus::Offline {
        println!("! connection to the MES backend lost, retrying in the background");
    }
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<Option<String>> {
    Ok(lines
        .next_line()
        .await
        .context("reading stdin")?
        .map(|line| line.trim().to_string()))
}

/// Walks the operator through the dictated steps until the session
/// finishes, then runs the reset countdown. `back` at any prompt returns
/// to the previous step.
async fn run_session(
    engine: &mut WizardEngine<MesClient>,
    lines: &mut Lines<BufReader<Stdin>>,
    monitor: &ConnectionMonitor,
) -> anyhow::Result<()> {
    while let Some(action) = engine.current_action().cloned() {
        print_offline_banner(monitor);
        println!();
        println!(
            "[{}] Step {}: {}",
            format_clock(Local::now()),
            engine.history().len() + 1,
            action.description
        );
        let outcome = match &action.kind {
            ActionKind::Confirm => {
                println!("press enter to confirm (or `back`):");
                let Some(line) = read_line(lines).await? else {
                    return Ok(());
                };
                if line == "back" {
                    engine.undo();
                    continue;
                }
                engine.submit_with_value("confirmed").await
            }
            ActionKind::Input | ActionKind::Textarea => {
                println!("enter a value (or `back`):");
                let Some(line) = read_line(lines).await? else {
                    return Ok(());
                };
                if line == "back" {
                    engine.undo();
                    continue;
                }
                engine.set_draft(line);
                engine.submit().await
            }
            ActionKind::Select { options } => {
                for (index, option) in options.iter().enumerate() {
                    println!("  {}) {option}", index + 1);
                }
                println!(
                    "pick a number, enter for `{}` (or `back`):",
                    engine.draft()
                );
                let Some(line) = read_line(lines).await? else {
                    return Ok(());
                };
                if line == "back" {
                    engine.undo();
                    continue;
                }
                if let Some(option) = line
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| options.get(n.wrapping_sub(1)))
                {
                    engine.set_draft(option.clone());
                }
                engine.submit().await
            }
            ActionKind::Photo => {
                println!("path to the photo file (or `back`):");
                let Some(line) = read_line(lines).await? else {
                    return Ok(());
                };
                if line == "back" {
                    engine.undo();
                    continue;
                }
                match load_photo(&line).await {
                    Ok(photo) => engine.stage_photo(photo),
                    Err(err) => {
                        println!("could not read the photo: {err}");
                        continue;
                    }
                }
                engine.submit().await
            }
            ActionKind::Labels => {
                println!("how many labels? 2 or 4 (or `back`):");
                let Some(line) = read_line(lines).await? else {
                    return Ok(());
                };
                if line == "back" {
                    engine.undo();
                    continue;
                }
                if line != "2" && line != "4" {
                    println!("enter 2 or 4");
                    continue;
                }
                engine.submit_with_value(line).await
            }
        };

        if let Err(err) = outcome {
            println!("step not accepted, try again: {err}");
        }
    }

    if engine.is_done() {
        println!();
        println!("All steps complete.");
        ResetTimer::default()
            .run(engine, |remaining| println!("Resetting in {remaining}..."))
            .await;
        println!("Session closed.");
    }
    Ok(())
}

fn format_clock(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn load_photo(path: &str) -> anyhow::Result<PhotoAttachment> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {path}"))?;
    let filename = std::path::Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("photo.bin")
        .to_string();
    let mime_type = match std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some("jpg") | Some("jpeg") => Some("image/jpeg".to_string()),
        Some("png") => Some("image/png".to_string()),
        _ => None,
    };
    Ok(PhotoAttachment {
        filename,
        mime_type,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn clock_shows_date_and_seconds() {
        let instant = Local.with_ymd_and_hms(2026, 8, 24, 13, 5, 9).unwrap();
        assert_eq!(format_clock(instant), "2026-08-24 13:05:09");
    }
}
