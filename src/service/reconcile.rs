//! Convergence of pull request reviewers and labels.
//!
//! [`reconcile`] brings the items attached to a pull request in line with a desired set:
//! missing items are added, unwanted ones removed, items already present are left alone.
//! A second run with the same desired set issues no mutations.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::pull_request::AdoPullRequest;
use crate::api::records::ReviewerRecord;
use crate::api::{LabelOperations, ReviewerOperations};

/// A set of items attached to a pull request, keyed by a string.
#[async_trait]
pub trait ReconcileTarget: Send + Sync {
    type Item: Send + Sync;

    /// Item kind used in log messages.
    fn kind(&self) -> &'static str;

    fn key(&self, item: &Self::Item) -> String;

    /// Keys of the items currently attached.
    async fn existing_keys(&self) -> Result<Vec<String>>;

    async fn add(&self, item: &Self::Item) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Keys whose add or remove call failed.
    pub failed: Vec<String>,
}

impl ReconcileOutcome {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.failed.is_empty()
    }
}

/// Converges `target` on `desired`.
///
/// Failing to read the current items is an error. Individual add and remove failures are
/// logged and reported in the outcome.
pub async fn reconcile<T>(target: &T, desired: &[T::Item]) -> Result<ReconcileOutcome>
where
    T: ReconcileTarget + ?Sized,
{
    let kind = target.kind();
    let mut keep: BTreeMap<String, bool> = target
        .existing_keys()
        .await
        .with_context(|| format!("Failed to list current {kind}s"))?
        .into_iter()
        .map(|key| (key, false))
        .collect();

    let mut outcome = ReconcileOutcome::default();
    for item in desired {
        let key = target.key(item);
        if let Some(kept) = keep.get_mut(&key) {
            *kept = true;
            continue;
        }

        match target.add(item).await {
            Ok(()) => outcome.added.push(key.clone()),
            Err(e) => {
                warn!(kind, key = %key, error = %e, "Failed to add");
                outcome.failed.push(key.clone());
            }
        }
        keep.insert(key, true);
    }

    debug!(kind, plan = ?keep, "Reconciled keep/remove plan");

    for (key, kept) in keep {
        if kept {
            continue;
        }
        match target.remove(&key).await {
            Ok(()) => outcome.removed.push(key),
            Err(e) => {
                warn!(kind, key = %key, error = %e, "Failed to remove");
                outcome.failed.push(key);
            }
        }
    }

    Ok(outcome)
}

/// Reviewers of a pull request, keyed by legacy identity id.
pub struct ReviewerTarget<'a, O: ?Sized> {
    ops: &'a O,
    pull_request: &'a AdoPullRequest,
}

impl<'a, O: ?Sized> ReviewerTarget<'a, O> {
    pub fn new(ops: &'a O, pull_request: &'a AdoPullRequest) -> Self {
        Self { ops, pull_request }
    }
}

#[async_trait]
impl<O> ReconcileTarget for ReviewerTarget<'_, O>
where
    O: ReviewerOperations + ?Sized,
{
    type Item = ReviewerRecord;

    fn kind(&self) -> &'static str {
        "reviewer"
    }

    fn key(&self, item: &ReviewerRecord) -> String {
        item.id.clone()
    }

    async fn existing_keys(&self) -> Result<Vec<String>> {
        let pr = self.pull_request;
        let reviewers = self
            .ops
            .list_reviewers(&pr.project_id, &pr.repository_id, pr.id)
            .await?;
        Ok(reviewers.into_iter().map(|r| r.id).collect())
    }

    async fn add(&self, item: &ReviewerRecord) -> Result<()> {
        let pr = self.pull_request;
        self.ops
            .create_reviewer(&pr.project_id, &pr.repository_id, pr.id, item)
            .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let pr = self.pull_request;
        self.ops
            .delete_reviewer(&pr.project_id, &pr.repository_id, pr.id, key)
            .await
    }
}

/// Labels of a pull request, keyed by name.
pub struct LabelTarget<'a, O: ?Sized> {
    ops: &'a O,
    pull_request: &'a AdoPullRequest,
}

impl<'a, O: ?Sized> LabelTarget<'a, O> {
    pub fn new(ops: &'a O, pull_request: &'a AdoPullRequest) -> Self {
        Self { ops, pull_request }
    }
}

#[async_trait]
impl<O> ReconcileTarget for LabelTarget<'_, O>
where
    O: LabelOperations + ?Sized,
{
    type Item = String;

    fn kind(&self) -> &'static str {
        "label"
    }

    fn key(&self, item: &String) -> String {
        item.clone()
    }

    async fn existing_keys(&self) -> Result<Vec<String>> {
        let pr = self.pull_request;
        let labels = self
            .ops
            .list_labels(&pr.project_id, &pr.repository_id, pr.id)
            .await?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn add(&self, item: &String) -> Result<()> {
        let pr = self.pull_request;
        self.ops
            .create_label(&pr.project_id, &pr.repository_id, pr.id, item)
            .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let pr = self.pull_request;
        self.ops
            .delete_label(&pr.project_id, &pr.repository_id, pr.id, key)
            .await
    }
}
