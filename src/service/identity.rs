//! Identity resolution for reviewers and the pull request author.
//!
//! Azure DevOps has two identity numbering schemes. Graph subject descriptors are the current
//! one, but the reviewer and auto-complete APIs still want legacy identity ids. A
//! [`Descriptor`] carries both so the rest of the service never has to care which lookup
//! produced it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::api::records::{IdentityRecord, ReviewerRecord, SubjectQuery};
use crate::api::{GraphOperations, IdentityOperations, LocationOperations};
use crate::scm::NewPullRequest;

/// Kind of graph subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectKind {
    User,
    Group,
    #[default]
    Unknown,
}

impl SubjectKind {
    fn from_provider(kind: Option<&str>) -> Self {
        match kind.map(str::to_lowercase).as_deref() {
            Some("user") => Self::User,
            Some("group") => Self::Group,
            _ => Self::Unknown,
        }
    }
}

/// A resolved identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Descriptor {
    /// Graph subject descriptor.
    pub subject_descriptor: Option<String>,
    /// Legacy identity id, required by the reviewer APIs.
    pub legacy_id: Option<String>,
    pub display_name: Option<String>,
    pub kind: SubjectKind,
}

impl Descriptor {
    fn from_identity(identity: &IdentityRecord) -> Self {
        Self {
            subject_descriptor: identity.subject_descriptor.clone(),
            legacy_id: identity.id.clone(),
            display_name: identity.provider_display_name.clone(),
            kind: SubjectKind::Unknown,
        }
    }

    /// Reviewer entry with no vote cast yet.
    ///
    /// `None` when the identity has no legacy id, as such identities cannot review.
    pub fn to_reviewer(&self, is_required: bool) -> Option<ReviewerRecord> {
        self.legacy_id.as_ref().map(|id| ReviewerRecord {
            id: id.clone(),
            display_name: self.display_name.clone(),
            vote: 0,
            is_required,
        })
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}] {} ({})",
            self.kind,
            self.display_name.as_deref().unwrap_or("<unnamed>"),
            self.subject_descriptor
                .as_deref()
                .or(self.legacy_id.as_deref())
                .unwrap_or("<no id>")
        )
    }
}

/// Which identity API resolves names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityApi {
    /// Free-text search of the legacy identity service.
    #[default]
    Legacy,
    /// Graph subject query, then a batch translation to legacy ids.
    Graph,
}

impl FromStr for IdentityApi {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "ims" => Ok(Self::Legacy),
            "graph" => Ok(Self::Graph),
            other => Err(format!(
                "unknown identity API '{other}' (expected legacy or graph)"
            )),
        }
    }
}

impl fmt::Display for IdentityApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Legacy => "legacy",
            Self::Graph => "graph",
        })
    }
}

impl IdentityApi {
    /// Resolves each name to an identity. The first match wins; names without a match are
    /// dropped with a warning.
    pub async fn resolve<O>(&self, ops: &O, names: &[String]) -> Result<Vec<Descriptor>>
    where
        O: GraphOperations + IdentityOperations + ?Sized,
    {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Self::Legacy => resolve_legacy(ops, names).await,
            Self::Graph => resolve_graph(ops, names).await,
        }
    }
}

async fn resolve_legacy<O>(ops: &O, names: &[String]) -> Result<Vec<Descriptor>>
where
    O: IdentityOperations + ?Sized,
{
    let mut descriptors = Vec::with_capacity(names.len());
    for name in names {
        let candidates = ops
            .read_identities(name)
            .await
            .with_context(|| format!("Failed to search identity '{name}'"))?;

        match candidates.first() {
            Some(identity) => {
                let descriptor = Descriptor::from_identity(identity);
                debug!(name = %name, identity = %descriptor, "Matched identity");
                descriptors.push(descriptor);
            }
            None => warn!(name = %name, "No identity found"),
        }
    }
    Ok(descriptors)
}

async fn resolve_graph<O>(ops: &O, names: &[String]) -> Result<Vec<Descriptor>>
where
    O: GraphOperations + IdentityOperations + ?Sized,
{
    let mut descriptors = Vec::with_capacity(names.len());
    for name in names {
        let query = SubjectQuery {
            query: name.clone(),
            subject_kind: vec!["User".to_string(), "Group".to_string()],
        };
        let subjects = ops
            .query_subjects(&query)
            .await
            .with_context(|| format!("Failed to query graph subjects for '{name}'"))?;

        match subjects.into_iter().find(|s| s.descriptor.is_some()) {
            Some(subject) => {
                let descriptor = Descriptor {
                    subject_descriptor: subject.descriptor,
                    legacy_id: None,
                    display_name: subject.display_name,
                    kind: SubjectKind::from_provider(subject.subject_kind.as_deref()),
                };
                debug!(name = %name, identity = %descriptor, "Matched graph subject");
                descriptors.push(descriptor);
            }
            None => warn!(name = %name, "No identity found"),
        }
    }

    if descriptors.is_empty() {
        return Ok(descriptors);
    }

    let subject_descriptors: Vec<String> = descriptors
        .iter()
        .filter_map(|d| d.subject_descriptor.clone())
        .collect();
    let legacy: HashMap<String, String> = ops
        .read_identity_batch(&subject_descriptors)
        .await
        .context("Failed to translate graph descriptors to legacy identities")?
        .into_iter()
        .filter_map(|identity| Some((identity.subject_descriptor?, identity.id?)))
        .collect();

    for descriptor in &mut descriptors {
        descriptor.legacy_id = descriptor
            .subject_descriptor
            .as_ref()
            .and_then(|d| legacy.get(d).cloned());
    }
    Ok(descriptors)
}

/// The identity the token authenticates as.
pub async fn current_identity<O>(ops: &O) -> Result<Descriptor>
where
    O: LocationOperations + ?Sized,
{
    let connection = ops
        .connection_data()
        .await
        .context("Failed to fetch the authenticated user")?;
    Ok(Descriptor {
        kind: SubjectKind::User,
        ..Descriptor::from_identity(&connection.authenticated_user)
    })
}

/// Identities resolved once per service instance, on the first pull request mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityCache {
    pub author: Descriptor,
    pub reviewers: Vec<ReviewerRecord>,
    pub team_reviewers: Vec<ReviewerRecord>,
    /// Assignees become required reviewers, as pull requests have no assignee.
    pub assignees: Vec<ReviewerRecord>,
}

impl IdentityCache {
    /// Resolves the author and every reviewer kind of `pull_request`.
    pub async fn populate<O>(
        ops: &O,
        identity_api: IdentityApi,
        pull_request: &NewPullRequest,
    ) -> Result<Self>
    where
        O: GraphOperations + IdentityOperations + LocationOperations + ?Sized,
    {
        let author = current_identity(ops).await?;

        let reviewers = identity_api.resolve(ops, &pull_request.reviewers).await?;
        let team_reviewers = identity_api
            .resolve(ops, &pull_request.team_reviewers)
            .await?;
        let assignees = identity_api.resolve(ops, &pull_request.assignees).await?;

        Ok(Self {
            author,
            reviewers: to_reviewers(&reviewers, false),
            team_reviewers: to_reviewers(&team_reviewers, false),
            assignees: to_reviewers(&assignees, true),
        })
    }

    /// Reviewers, team reviewers then assignees, one entry per identity.
    ///
    /// An identity listed more than once is required if any of its entries is.
    pub fn combined_reviewers(&self) -> Vec<ReviewerRecord> {
        let mut combined: Vec<ReviewerRecord> = Vec::new();
        for reviewer in self
            .reviewers
            .iter()
            .chain(&self.team_reviewers)
            .chain(&self.assignees)
        {
            match combined.iter_mut().find(|r| r.id == reviewer.id) {
                Some(existing) => existing.is_required |= reviewer.is_required,
                None => combined.push(reviewer.clone()),
            }
        }
        combined
    }
}

fn to_reviewers(descriptors: &[Descriptor], is_required: bool) -> Vec<ReviewerRecord> {
    descriptors
        .iter()
        .filter_map(|descriptor| {
            let reviewer = descriptor.to_reviewer(is_required);
            if reviewer.is_none() {
                warn!(identity = %descriptor, "Identity has no legacy id and cannot review");
            }
            reviewer
        })
        .collect()
}
