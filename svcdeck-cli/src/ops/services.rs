//! Service listing and lifecycle operations.

use super::output::{print_json, OutputFormat};
use super::ui::{
    finish_progress_error, finish_progress_success, format_state, print_empty, print_error,
    print_header, print_hint, print_kv_colored, print_progress, print_section,
    print_table_header, truncate, KvColor,
};
use crate::client::{handle_error, service_url};
use crossterm::style::Stylize;
use serde::{Deserialize, Serialize};
use svcdeck_core::{Service, ServiceCategory, ServiceStatus};

/// `{name, status}` returned by status and lifecycle endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub name: String,
    pub status: Option<ServiceStatus>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
}

impl ServiceAction {
    fn path(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
        }
    }

    fn progress(self) -> &'static str {
        match self {
            ServiceAction::Start => "Starting service",
            ServiceAction::Stop => "Stopping service",
            ServiceAction::Restart => "Restarting service",
            ServiceAction::Enable => "Enabling service",
            ServiceAction::Disable => "Disabling service",
        }
    }

    fn done(self) -> &'static str {
        match self {
            ServiceAction::Start => "Service started",
            ServiceAction::Stop => "Service stopped",
            ServiceAction::Restart => "Service restarted",
            ServiceAction::Enable => "Startup set to manual",
            ServiceAction::Disable => "Startup disabled",
        }
    }
}

/// Group services by category in display order; empty groups are omitted.
fn group_by_category(services: &[Service]) -> Vec<(ServiceCategory, Vec<&Service>)> {
    ServiceCategory::ALL
        .iter()
        .filter_map(|category| {
            let mut members: Vec<&Service> =
                services.iter().filter(|s| s.category == *category).collect();
            if members.is_empty() {
                return None;
            }
            members.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            Some((*category, members))
        })
        .collect()
}

/// List services.
pub async fn list_services(
    client: &reqwest::Client,
    base: &str,
    category: Option<ServiceCategory>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = format!("{}/services", base);
    let mut request = client.get(url);
    if let Some(category) = category {
        request = request.query(&[("category", category.to_string())]);
    }
    let resp = handle_error(request.send().await?).await?;
    let services: Vec<Service> = resp.json().await?;
    render_services(&services, output)
}

/// Force a detection pass, bypassing the daemon cache.
pub async fn refresh_services(
    client: &reqwest::Client,
    base: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = format!("{}/services/refresh", base);
    let resp = handle_error(client.post(url).send().await?).await?;
    let services: Vec<Service> = resp.json().await?;
    render_services(&services, output)
}

fn render_services(services: &[Service], output: OutputFormat) -> anyhow::Result<()> {
    if output == OutputFormat::Json {
        return print_json(&services);
    }
    print_header("📋 SERVICES");
    if services.is_empty() {
        print_empty("No database, cache or broker services detected on this host.");
        return Ok(());
    }

    let running = services
        .iter()
        .filter(|s| s.status == ServiceStatus::Running)
        .count();
    println!(
        "  Total: {}  |  {} Running  |  {} Other",
        services.len().to_string().white().bold(),
        running.to_string().green(),
        (services.len() - running).to_string().dark_grey()
    );

    for (category, members) in group_by_category(services) {
        print_section(category.label());
        print_table_header(&[("NAME", 28), ("TYPE", 22), ("STARTUP", 10), ("STATUS", 14)]);
        for svc in members {
            println!(
                "  {:<28} {:<22} {:<10} {}",
                truncate(&svc.name, 28).cyan(),
                truncate(svc.service_type.display_name(), 22),
                svc.startup_type.to_string(),
                format_state(svc.status)
            );
        }
    }
    println!();
    print_hint("Use 'status <name>' for a fresh reading of one service");
    Ok(())
}

/// Show one service's live status.
pub async fn status_service(
    client: &reqwest::Client,
    base: &str,
    name: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = service_url(base, name, "status")?;
    let resp = handle_error(client.get(url).send().await?).await?;
    let status: StatusResponse = resp.json().await?;
    match output {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            print_section(&format!("Service {}", status.name));
            print_status(status.status);
        }
    }
    Ok(())
}

fn print_status(status: Option<ServiceStatus>) {
    match status {
        Some(status) => {
            let color = match status {
                ServiceStatus::Running => KvColor::Green,
                ServiceStatus::Stopped => KvColor::Red,
                _ => KvColor::Yellow,
            };
            print_kv_colored("Status", &status.to_string(), color);
        }
        None => print_kv_colored("Status", "unknown", KvColor::Yellow),
    }
}

/// Run a lifecycle action and print the status read back afterwards.
pub async fn run_action(
    client: &reqwest::Client,
    base: &str,
    name: &str,
    action: ServiceAction,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = service_url(base, name, action.path())?;
    if output == OutputFormat::Json {
        let resp = handle_error(client.post(url).send().await?).await?;
        let status: StatusResponse = resp.json().await?;
        return print_json(&status);
    }

    print_header(&format!("{} {}", action.path().to_uppercase(), name));
    print_progress(action.progress());
    let resp = client.post(url).send().await?;
    match handle_error(resp).await {
        Ok(resp) => {
            let status: StatusResponse = resp.json().await?;
            finish_progress_success(action.done());
            println!();
            print_status(status.status);
            Ok(())
        }
        Err(e) => {
            finish_progress_error(&format!("Failed to {}", action.path()));
            println!();
            print_error(&e.to_string());
            Err(e)
        }
    }
}
