//! Global service-control switch.

use super::output::{print_json, OutputFormat};
use super::ui::{flag_color, print_kv_colored, print_section, print_warning, KvColor};
use crate::client::handle_error;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    On,
    Off,
    Toggle,
}

#[derive(Debug, Serialize, Deserialize)]
struct ControlState {
    enabled: bool,
    is_elevated: bool,
    status_message: String,
    can_control_services: bool,
}

/// Show the switch, or change it when an action is given.
pub async fn control(
    client: &reqwest::Client,
    base: &str,
    action: Option<ControlAction>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let request = match action {
        None => client.get(format!("{}/control", base)),
        Some(ControlAction::Toggle) => client.post(format!("{}/control/toggle", base)),
        Some(ControlAction::On) => client
            .put(format!("{}/control", base))
            .json(&json!({ "enabled": true })),
        Some(ControlAction::Off) => client
            .put(format!("{}/control", base))
            .json(&json!({ "enabled": false })),
    };
    let resp = handle_error(request.send().await?).await?;
    let state: ControlState = resp.json().await?;

    match output {
        OutputFormat::Json => print_json(&state)?,
        OutputFormat::Table => {
            print_section("Service control");
            let enabled = if state.enabled { "enabled" } else { "disabled" };
            print_kv_colored("Control", enabled, flag_color(state.enabled));
            print_kv_colored("Elevated", &state.is_elevated.to_string(), flag_color(state.is_elevated));
            print_kv_colored("Privileges", &state.status_message, KvColor::Plain);
            if !state.can_control_services {
                println!();
                print_warning("Start/stop operations will be rejected until control is enabled and the daemon runs elevated");
            }
        }
    }
    Ok(())
}
