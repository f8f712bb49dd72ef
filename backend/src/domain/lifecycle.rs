//! Configuration lifecycle: transition guards and the orchestrating service.
//!
//! Guards are pure functions of [`ConfigStatus`](crate::domain::config::ConfigStatus)
//! so the rules governing who can do what, when, are unit-testable without a
//! database. The service composes them with the [`ConfigCommand`]/
//! [`ConfigQuery`] ports and the compiler.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::audit::{actions, AuditEntry};
use crate::domain::compiler::compile;
use crate::domain::config::{Configuration, ConfigStatus, NewConfiguration, RuleSet};
use crate::domain::ids::{AuditId, ConfigId, ProxyId, UserId};
use crate::domain::ports::{AuditLogRepository, ConfigCommand, ConfigPersistenceError, ConfigQuery};
use crate::domain::user::Role;
use crate::domain::Error;

/// Guard: can a configuration currently in `status` have its rules edited?
///
/// # Errors
///
/// Returns [`Error::invalid_status`] unless `status` is
/// [`ConfigStatus::Draft`].
pub fn guard_editable(status: ConfigStatus) -> Result<(), Error> {
    if status.is_editable() {
        Ok(())
    } else {
        Err(Error::invalid_status(format!(
            "configuration is not editable in status {status:?}"
        )))
    }
}

/// Guard: can a configuration currently in `status` be submitted for review?
///
/// # Errors
///
/// Returns [`Error::invalid_status`] unless `status` is
/// [`ConfigStatus::Draft`].
pub fn guard_submittable(status: ConfigStatus) -> Result<(), Error> {
    if matches!(status, ConfigStatus::Draft) {
        Ok(())
    } else {
        Err(Error::invalid_status(format!(
            "configuration cannot be submitted from status {status:?}"
        )))
    }
}

/// Guard: can a configuration currently in `status` be approved or rejected?
///
/// # Errors
///
/// Returns [`Error::invalid_status`] unless `status` is
/// [`ConfigStatus::PendingApproval`].
pub fn guard_reviewable(status: ConfigStatus) -> Result<(), Error> {
    if matches!(status, ConfigStatus::PendingApproval) {
        Ok(())
    } else {
        Err(Error::invalid_status(format!(
            "configuration is not pending approval, found {status:?}"
        )))
    }
}

/// Guard: can a configuration currently in `status` be deleted?
///
/// Only drafts may be deleted outright; anything that has been submitted
/// must be rejected back to draft first so the review history in the audit
/// log is never silently discarded.
///
/// # Errors
///
/// Returns [`Error::invalid_status`] unless `status` is
/// [`ConfigStatus::Draft`].
pub fn guard_deletable(status: ConfigStatus) -> Result<(), Error> {
    if matches!(status, ConfigStatus::Draft) {
        Ok(())
    } else {
        Err(Error::invalid_status(format!(
            "only draft configurations can be deleted, found {status:?}"
        )))
    }
}

/// Guard: does `role` permit approving or rejecting configurations?
///
/// # Errors
///
/// Returns [`Error::forbidden`] if `role` is [`Role::Regular`].
pub fn guard_can_review(role: Role) -> Result<(), Error> {
    if role.can_approve_configs() {
        Ok(())
    } else {
        Err(Error::forbidden(
            "only admin or root accounts may approve or reject configurations",
        ))
    }
}

/// Guard implementing the "two-person rule" as specified: the same user
/// who submitted a configuration must be the one to approve it, as a
/// dual-confirmation step rather than independent review.
///
/// # Errors
///
/// Returns [`Error::forbidden`] if `approved_by` does not match
/// `submitted_by`, including the case where the configuration was never
/// submitted.
pub fn guard_same_submitter(submitted_by: Option<UserId>, approved_by: UserId) -> Result<(), Error> {
    if submitted_by == Some(approved_by) {
        Ok(())
    } else {
        Err(Error::forbidden(
            "approval must be confirmed by the same user who submitted the configuration",
        ))
    }
}

/// Configuration lifecycle service: create, update, submit, approve, reject,
/// clone and delete, each guarded and audited.
#[derive(Clone)]
pub struct ConfigLifecycleService<CC, CQ, AL> {
    config_command: Arc<CC>,
    config_query: Arc<CQ>,
    audit_repo: Arc<AL>,
}

impl<CC, CQ, AL> ConfigLifecycleService<CC, CQ, AL> {
    /// Build a new lifecycle service from its ports.
    pub fn new(config_command: Arc<CC>, config_query: Arc<CQ>, audit_repo: Arc<AL>) -> Self {
        Self {
            config_command,
            config_query,
            audit_repo,
        }
    }
}

impl<CC, CQ, AL> ConfigLifecycleService<CC, CQ, AL>
where
    CC: ConfigCommand,
    CQ: ConfigQuery,
    AL: AuditLogRepository,
{
    fn map_config_error(error: ConfigPersistenceError) -> Error {
        match error {
            ConfigPersistenceError::Connection { message } | ConfigPersistenceError::Query { message } => {
                Error::internal(format!("config repository error: {message}"))
            }
            ConfigPersistenceError::StatusMismatch { expected, actual } => Error::conflict(format!(
                "expected configuration status {expected}, found {actual}"
            )),
            ConfigPersistenceError::NotFound { id } => Error::not_found(format!("configuration {id}")),
        }
    }

    /// Best-effort audit append: logs and swallows failures so an audit
    /// outage never blocks the operation it is recording.
    async fn audit(
        &self,
        actor: Option<UserId>,
        action: &str,
        config_id: ConfigId,
        now: DateTime<Utc>,
    ) {
        let entry = AuditEntry {
            id: AuditId::new(),
            actor,
            action: action.to_owned(),
            entity_kind: "configuration".to_owned(),
            entity_id: config_id.as_uuid(),
            before: None,
            after: None,
            source_ip: None,
            created_at: now,
        };
        if let Err(err) = self.audit_repo.append(entry).await {
            tracing::warn!(error = %err, %config_id, action, "failed to append audit entry");
        }
    }

    /// Create a new draft configuration.
    ///
    /// # Errors
    ///
    /// Propagates repository failures as [`Error::internal`].
    pub async fn create(
        &self,
        new_config: NewConfiguration,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, Error> {
        let config = self
            .config_command
            .create_draft(new_config, created_by, now)
            .await
            .map_err(Self::map_config_error)?;
        self.audit(Some(created_by), actions::CONFIG_CREATE, config.id, now)
            .await;
        Ok(config)
    }

    /// Replace a draft configuration's rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::invalid_status`] if the configuration is not a
    /// draft, [`Error::not_found`] if it does not exist, otherwise
    /// propagates repository failures as [`Error::internal`].
    pub async fn update_rules(
        &self,
        id: ConfigId,
        rules: RuleSet,
        modified_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, Error> {
        let current = self
            .config_query
            .get(id)
            .await
            .map_err(Self::map_config_error)?
            .ok_or_else(|| Error::not_found(format!("configuration {id}")))?;
        guard_editable(current.configuration.status)?;

        let config = self
            .config_command
            .replace_rules(id, rules, modified_by, now)
            .await
            .map_err(Self::map_config_error)?;
        self.audit(Some(modified_by), actions::CONFIG_UPDATE, id, now).await;
        Ok(config)
    }

    /// Submit a draft configuration for review.
    ///
    /// # Errors
    ///
    /// Returns [`Error::invalid_status`] if the configuration is not a
    /// draft, [`Error::not_found`] if it does not exist.
    pub async fn submit(
        &self,
        id: ConfigId,
        submitted_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, Error> {
        let current = self
            .config_query
            .get(id)
            .await
            .map_err(Self::map_config_error)?
            .ok_or_else(|| Error::not_found(format!("configuration {id}")))?;
        guard_submittable(current.configuration.status)?;

        let config = self
            .config_command
            .submit(id, submitted_by, now)
            .await
            .map_err(Self::map_config_error)?;
        self.audit(Some(submitted_by), actions::CONFIG_SUBMIT, id, now).await;
        Ok(config)
    }

    /// Reject a pending-approval configuration back to draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::forbidden`] if `reviewer_role` may not review,
    /// [`Error::invalid_status`] if the configuration is not pending
    /// approval, [`Error::not_found`] if it does not exist.
    pub async fn reject(
        &self,
        id: ConfigId,
        reviewer_role: Role,
        rejected_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, Error> {
        guard_can_review(reviewer_role)?;
        let current = self
            .config_query
            .get(id)
            .await
            .map_err(Self::map_config_error)?
            .ok_or_else(|| Error::not_found(format!("configuration {id}")))?;
        guard_reviewable(current.configuration.status)?;

        let config = self
            .config_command
            .reject(id, rejected_by, now)
            .await
            .map_err(Self::map_config_error)?;
        self.audit(Some(rejected_by), actions::CONFIG_REJECT, id, now).await;
        Ok(config)
    }

    /// Approve a pending-approval configuration, compile it, and assign it
    /// to `proxy_ids`. Whatever was previously active on those proxies is
    /// displaced by the repository in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::forbidden`] if `reviewer_role` may not review,
    /// [`Error::invalid_status`] if the configuration is not pending
    /// approval, [`Error::not_found`] if it does not exist.
    pub async fn approve(
        &self,
        id: ConfigId,
        reviewer_role: Role,
        approved_by: UserId,
        proxy_ids: Vec<ProxyId>,
        now: DateTime<Utc>,
    ) -> Result<Configuration, Error> {
        guard_can_review(reviewer_role)?;
        let current = self
            .config_query
            .get(id)
            .await
            .map_err(Self::map_config_error)?
            .ok_or_else(|| Error::not_found(format!("configuration {id}")))?;
        guard_reviewable(current.configuration.status)?;
        guard_same_submitter(current.configuration.submitted_by, approved_by)?;

        let artefacts = compile(&current.configuration, &current.rules);
        let (config, outcome) = self
            .config_command
            .approve(id, approved_by, artefacts.fingerprint, proxy_ids, now)
            .await
            .map_err(Self::map_config_error)?;

        self.audit(Some(approved_by), actions::CONFIG_APPROVE, id, now).await;
        for displaced_id in outcome.displaced {
            self.audit(Some(approved_by), "config.displace", displaced_id, now)
                .await;
        }
        Ok(config)
    }

    /// Clone an existing configuration's rules into a new draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::not_found`] if `source_id` does not exist.
    pub async fn clone(
        &self,
        source_id: ConfigId,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, Error> {
        self.config_query
            .get(source_id)
            .await
            .map_err(Self::map_config_error)?
            .ok_or_else(|| Error::not_found(format!("configuration {source_id}")))?;

        let config = self
            .config_command
            .clone_config(source_id, created_by, now)
            .await
            .map_err(Self::map_config_error)?;
        self.audit(Some(created_by), actions::CONFIG_CLONE, config.id, now)
            .await;
        Ok(config)
    }

    /// Delete a draft configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::invalid_status`] if the configuration is not a
    /// draft, [`Error::not_found`] if it does not exist.
    pub async fn delete(&self, id: ConfigId, deleted_by: UserId, now: DateTime<Utc>) -> Result<(), Error> {
        let current = self
            .config_query
            .get(id)
            .await
            .map_err(Self::map_config_error)?
            .ok_or_else(|| Error::not_found(format!("configuration {id}")))?;
        guard_deletable(current.configuration.status)?;

        self.config_command
            .delete(id)
            .await
            .map_err(Self::map_config_error)?;
        self.audit(Some(deleted_by), actions::CONFIG_DELETE, id, now).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editable_only_in_draft() {
        assert!(guard_editable(ConfigStatus::Draft).is_ok());
        assert!(guard_editable(ConfigStatus::PendingApproval).is_err());
        assert!(guard_editable(ConfigStatus::Active).is_err());
    }

    #[test]
    fn submittable_only_from_draft() {
        assert!(guard_submittable(ConfigStatus::Draft).is_ok());
        assert!(guard_submittable(ConfigStatus::Active).is_err());
    }

    #[test]
    fn reviewable_only_from_pending_approval() {
        assert!(guard_reviewable(ConfigStatus::PendingApproval).is_ok());
        assert!(guard_reviewable(ConfigStatus::Draft).is_err());
        assert!(guard_reviewable(ConfigStatus::Active).is_err());
    }

    #[test]
    fn deletable_only_from_draft() {
        assert!(guard_deletable(ConfigStatus::Draft).is_ok());
        assert!(guard_deletable(ConfigStatus::PendingApproval).is_err());
    }

    #[test]
    fn only_admin_and_root_can_review() {
        assert!(guard_can_review(Role::Admin).is_ok());
        assert!(guard_can_review(Role::Root).is_ok());
        assert!(guard_can_review(Role::Regular).is_err());
    }

    #[test]
    fn approval_requires_same_submitter() {
        let submitter = crate::domain::ids::UserId::new();
        assert!(guard_same_submitter(Some(submitter), submitter).is_ok());

        let other = crate::domain::ids::UserId::new();
        assert!(guard_same_submitter(Some(submitter), other).is_err());
        assert!(guard_same_submitter(None, submitter).is_err());
    }
}
