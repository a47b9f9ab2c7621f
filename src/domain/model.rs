use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

// Receptor writes empty lists and strings as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Everything needed to desire a new docker app. Scaling goes through
/// [`super::AppRunner::scale_app`] and never touches these.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartAppParams {
    pub name: String,
    pub start_command: String,
    pub docker_image_path: String,
    #[serde(default)]
    pub app_args: Vec<String>,
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
    #[serde(default)]
    pub privileged: bool,
    pub instances: u32,
    pub memory_mb: u32,
    pub disk_mb: u32,
    pub port: u16,
    #[serde(default)]
    pub working_dir: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadAction {
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAction {
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub dir: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub privileged: bool,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub log_source: String,
}

/// Receptor actions are keyed by kind (`{"run": {...}}`). Kinds this crate
/// never builds (`serial`, `timeout`, ...) are kept verbatim in `Other` so
/// listings from a shared cluster still decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Download(DownloadAction),
    Run(RunAction),
    #[serde(untagged)]
    Other(serde_json::Value),
}

/// Desired state of one LRP, as sent on create and returned on list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredLrp {
    pub process_guid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rootfs: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instances: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stack: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub env: Vec<EnvironmentVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<Action>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disk_mb: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory_mb: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ports: Vec<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub routes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub log_guid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub log_source: String,
}

/// Partial update of a desired LRP. Absent fields are left untouched by
/// the scheduler.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredLrpUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActualLrpState {
    Unclaimed,
    Claimed,
    Running,
    Crashed,
    #[serde(other)]
    Unknown,
}

/// One instance of an LRP as reported by the scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualLrp {
    pub process_guid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instance_guid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cell_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    pub state: ActualLrpState,
}
