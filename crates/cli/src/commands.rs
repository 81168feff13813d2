//! Command implementations over the deployment engine.

use crate::Cli;
use crate::Commands;
use crate::EnvsCommand;
use colored::Colorize;
use dk_core::engine::ConfigUpdate;
use dk_core::engine::DeployEngine;
use dk_core::envs;
use dk_protocol::process_events::ProcessEvent;
use std::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

pub async fn run(cli: Cli) -> color_eyre::Result<()> {
    let engine = DeployEngine::open(&cli.data_dir).await?;

    match cli.command {
        Commands::Deploy { archive } => {
            // Subscribe before the pipeline starts so no startup output is
            // missed.
            let events = engine.supervisor().subscribe();
            let name = engine.deploy(&archive).await?;
            println!("{} {name}", "Deployed".green().bold());
            follow(&engine, events).await?;
        }
        Commands::Rollback { version } => {
            let events = engine.supervisor().subscribe();
            engine.rollback(&version).await?;
            println!("{} {version}", "Rolled back to".green().bold());
            follow(&engine, events).await?;
        }
        Commands::Run => {
            let events = engine.supervisor().subscribe();
            engine.start_app().await?;
            if !engine.status().await.running {
                return Ok(());
            }
            follow(&engine, events).await?;
        }
        Commands::Status { json } => {
            let status = engine.status().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
        Commands::Deployments => {
            let current = engine.status().await.current_deployment;
            let deployments = engine.deployments().await?;
            if deployments.is_empty() {
                println!("No deployments yet.");
            }
            for name in deployments {
                if current.as_deref() == Some(name.as_str()) {
                    println!("{} {}", name.green(), "(current)".dimmed());
                } else {
                    println!("{name}");
                }
            }
        }
        Commands::Config {
            command,
            env,
            persistent_folders,
        } => {
            let config = engine
                .update_config(ConfigUpdate {
                    command,
                    selected_env: env,
                    persistent_folders,
                })
                .await?;
            println!("{}", "Config updated".green().bold());
            println!("  command: {}", config.command);
            println!(
                "  env: {}",
                config.selected_env.as_deref().unwrap_or("(none)")
            );
            println!(
                "  persistent folders: {}",
                config.persistent_folders_ui.as_deref().unwrap_or("(none)")
            );
        }
        Commands::Envs { command } => run_envs(&engine, command).await?,
    }

    Ok(())
}

async fn run_envs(engine: &DeployEngine, command: EnvsCommand) -> color_eyre::Result<()> {
    let envs_dir = engine.envs_dir();
    match command {
        EnvsCommand::List => {
            let names = envs::list_envs(&envs_dir).await?;
            if names.is_empty() {
                println!("No environment files yet.");
            }
            for name in names {
                println!("{name}");
            }
        }
        EnvsCommand::Show { name } => {
            print!("{}", envs::read_env(&envs_dir, &name).await?);
        }
        EnvsCommand::Set { name, file } => {
            let content = fs::read_to_string(&file)?;
            envs::write_env(&envs_dir, &name, &content).await?;
            println!("{} {name}", "Saved env".green().bold());
        }
        EnvsCommand::Delete { name } => {
            engine.delete_env(&name).await?;
            println!("{} {name}", "Deleted env".green().bold());
        }
    }
    Ok(())
}

fn print_status(status: &dk_protocol::status_models::AgentStatus) {
    let running = if status.running {
        "running".green().bold()
    } else {
        "stopped".red().bold()
    };
    println!("status: {running}");
    println!("command: {}", status.command);
    println!(
        "current deployment: {}",
        status.current_deployment.as_deref().unwrap_or("(none)")
    );
    println!(
        "selected env: {}",
        status.selected_env.as_deref().unwrap_or("(none)")
    );
    println!(
        "persistent folders: {}",
        status.persistent_folders_ui.as_deref().unwrap_or("(none)")
    );
    if let Some(date) = &status.last_upload_date {
        println!("last upload: {date}");
    }
}

/// Stream application output to stdout until the process exits or Ctrl+C
/// stops it.
async fn follow(
    engine: &DeployEngine,
    mut events: broadcast::Receiver<ProcessEvent>,
) -> color_eyre::Result<()> {
    let mut stdout = tokio::io::stdout();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("{}", "Stopping application...".yellow());
                engine.stop_app().await;
                break;
            }
            event = events.recv() => match event {
                Ok(ProcessEvent::Output { bytes }) => {
                    stdout.write_all(&bytes).await?;
                    stdout.flush().await?;
                }
                Ok(ProcessEvent::Diagnostic { message }) => {
                    eprintln!("{} {message}", "[agent]".yellow());
                }
                Ok(ProcessEvent::Exited { code }) => {
                    eprintln!("{} {code:?}", "Application exited with code".yellow());
                    break;
                }
                // Dropped chunks only affect this observer.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    Ok(())
}
