//! Provider records exchanged across the operation traits.
//!
//! The generated `azure_devops_rust_api` models carry every field of the REST schema. The
//! adapter reads and writes only a handful of them, so the operation traits speak in these
//! smaller records instead. They use the REST JSON field names, which lets [`reshape`]
//! move data between a record and the matching generated model through `serde`.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Object id Azure Repos interprets as "delete this ref" in a ref update.
pub const ZERO_OBJECT_ID: &str = "0000000000000000000000000000000000000000";

/// Converts one serde representation into another with the same JSON shape.
///
/// Fields the target does not model are dropped, which is what reading a response wants.
/// Request bodies go through [`reshape_body`] instead.
pub fn reshape<S, T>(value: &S) -> Result<T>
where
    S: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let json = serde_json::to_value(value).context("Failed to serialize Azure DevOps payload")?;
    serde_json::from_value(json).context("Azure DevOps payload did not have the expected shape")
}

/// Converts an outgoing record into a generated request model.
///
/// Fails when the model has no room for one of the record's fields, rather than sending a
/// request without it.
pub fn reshape_body<S, T>(value: &S) -> Result<T>
where
    S: Serialize + ?Sized,
    T: Serialize + DeserializeOwned,
{
    let sent = serde_json::to_value(value).context("Failed to serialize Azure DevOps request")?;
    let model: T = serde_json::from_value(sent.clone())
        .context("Azure DevOps request did not fit the request model")?;
    let carried =
        serde_json::to_value(&model).context("Failed to serialize Azure DevOps request model")?;

    let mut lost = Vec::new();
    lost_fields(&sent, &carried, "", &mut lost);
    if !lost.is_empty() {
        bail!(
            "Azure DevOps request model cannot carry {}",
            lost.join(", ")
        );
    }
    Ok(model)
}

/// Collects the paths of `sent` that `carried` does not reproduce. Null fields count as absent.
fn lost_fields(sent: &Value, carried: &Value, path: &str, lost: &mut Vec<String>) {
    match (sent, carried) {
        (Value::Object(sent), Value::Object(carried)) => {
            for (key, value) in sent {
                let field = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                match carried.get(key) {
                    Some(inner) => lost_fields(value, inner, &field, lost),
                    None if value.is_null() => {}
                    None => lost.push(field),
                }
            }
        }
        (Value::Array(sent), Value::Array(carried)) if sent.len() == carried.len() => {
            for (index, (item, carried_item)) in sent.iter().zip(carried).enumerate() {
                lost_fields(item, carried_item, &format!("{path}[{index}]"), lost);
            }
        }
        (sent, carried) if sent == carried => {}
        _ => lost.push(if path.is_empty() {
            "the body".to_string()
        } else {
            path.to_string()
        }),
    }
}

/// The `{ "count": n, "value": [...] }` envelope of REST list responses.
#[derive(Debug, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// Provisioning state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectState {
    Deleting,
    New,
    WellFormed,
    CreatePending,
    All,
    Unchanged,
    Deleted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProjectState {
    /// Query-string value accepted by the project listing endpoint.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deleting => "deleting",
            Self::New => "new",
            Self::WellFormed => "wellFormed",
            Self::CreatePending => "createPending",
            Self::All => "all",
            Self::Unchanged => "unchanged",
            Self::Deleted => "deleted",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: ProjectState,
}

/// Project reference embedded in repositories.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReference {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project: ProjectReference,
    /// Full ref of the default branch; absent until the first push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fork: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

/// Coarse lifecycle of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PullRequestLifecycle {
    #[default]
    NotSet,
    Active,
    Abandoned,
    Completed,
    /// Only meaningful as a search criterion.
    All,
    #[serde(other)]
    Unrecognized,
}

impl PullRequestLifecycle {
    /// Query-string value accepted by the pull request search criteria.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSet => "notSet",
            Self::Active => "active",
            Self::Abandoned => "abandoned",
            Self::Completed => "completed",
            Self::All => "all",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Outcome of the provider's asynchronous merge evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeStatus {
    NotSet,
    Queued,
    Conflicts,
    Succeeded,
    RejectedByPolicy,
    Failure,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRecord {
    pub pull_request_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub repository: RepositoryRecord,
    #[serde(default)]
    pub status: PullRequestLifecycle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_status: Option<MergeStatus>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub source_ref_name: String,
    #[serde(default)]
    pub target_ref_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_merge_source_commit: Option<CommitRef>,
}

/// Label attached to a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl TagRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// Reviewer entry of a pull request. `id` is the legacy identity id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub vote: i32,
    #[serde(default)]
    pub is_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub object_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefUpdate {
    pub name: String,
    pub old_object_id: String,
    pub new_object_id: String,
}

/// Merge strategy applied when a pull request auto-completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeStrategy {
    NoFastForward,
    #[default]
    Squash,
    Rebase,
    RebaseMerge,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoFastForward => "noFastForward",
            Self::Squash => "squash",
            Self::Rebase => "rebase",
            Self::RebaseMerge => "rebaseMerge",
        };
        f.write_str(name)
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "nofastforward" | "merge" => Ok(Self::NoFastForward),
            "squash" => Ok(Self::Squash),
            "rebase" => Ok(Self::Rebase),
            "rebasemerge" => Ok(Self::RebaseMerge),
            other => Err(format!(
                "unknown merge strategy '{other}' (expected no-fast-forward, squash, rebase or rebase-merge)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    pub delete_source_branch: bool,
    pub merge_strategy: MergeStrategy,
    pub transition_work_items: bool,
    pub merge_commit_message: String,
}

/// Identity reference carrying only the legacy id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityReference {
    pub id: String,
}

/// Body of a pull request creation.
///
/// Reviewers are added once the pull request exists, as the creation model only takes their
/// ids and would lose whether they are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestCreate {
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub title: String,
    pub description: String,
    pub is_draft: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<TagRecord>,
}

/// Body of a pull request update. Unset fields are left untouched by the provider.
///
/// Sent as is: the generated update model has no `targetRefName` or `lastMergeSourceCommit`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PullRequestLifecycle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_merge_source_commit: Option<CommitRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_complete_set_by: Option<IdentityReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_options: Option<CompletionOptions>,
}

/// Search criteria for listing the pull requests of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PullRequestQuery {
    pub status: Option<PullRequestLifecycle>,
    pub source_ref_name: Option<String>,
    pub top: Option<i32>,
}

/// Graph subject returned by a subject query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSubjectRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectQuery {
    pub query: String,
    pub subject_kind: Vec<String>,
}

/// Identity from the legacy identity service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDataRecord {
    #[serde(default)]
    pub authenticated_user: IdentityRecord,
}
