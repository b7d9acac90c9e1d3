//! Role policy
//!
//! Maps each lifecycle action to the roles allowed to perform it. The
//! default policy follows the role ladder: editors run the work,
//! approvers decide, admins release.

use ilm_model::{Caller, LotError, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role-checked lifecycle action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    /// Administrative status change
    UpdateStatus,
    /// Approval decision
    Approve,
    /// Rejection decision
    Reject,
    /// Release of an approved lot
    Publish,
    /// Adding or removing lot members
    EditMembership,
}

impl LifecycleAction {
    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::UpdateStatus => "update_status",
            LifecycleAction::Approve => "approve",
            LifecycleAction::Reject => "reject",
            LifecycleAction::Publish => "publish",
            LifecycleAction::EditMembership => "edit_membership",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permitted roles per action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePolicy {
    /// Roles allowed to change status administratively
    pub update_status: Vec<Role>,
    /// Roles allowed to approve
    pub approve: Vec<Role>,
    /// Roles allowed to reject
    pub reject: Vec<Role>,
    /// Roles allowed to publish
    pub publish: Vec<Role>,
    /// Roles allowed to edit lot membership
    pub edit_membership: Vec<Role>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self {
            update_status: Role::Editor.and_above(),
            approve: Role::Approver.and_above(),
            reject: Role::Approver.and_above(),
            publish: vec![Role::Admin],
            edit_membership: Role::Editor.and_above(),
        }
    }
}

impl RolePolicy {
    /// Roles permitted for an action
    #[must_use]
    pub fn permitted(&self, action: LifecycleAction) -> &[Role] {
        match action {
            LifecycleAction::UpdateStatus => &self.update_status,
            LifecycleAction::Approve => &self.approve,
            LifecycleAction::Reject => &self.reject,
            LifecycleAction::Publish => &self.publish,
            LifecycleAction::EditMembership => &self.edit_membership,
        }
    }

    /// With permitted roles for an action
    #[must_use]
    pub fn with_roles(mut self, action: LifecycleAction, roles: Vec<Role>) -> Self {
        match action {
            LifecycleAction::UpdateStatus => self.update_status = roles,
            LifecycleAction::Approve => self.approve = roles,
            LifecycleAction::Reject => self.reject = roles,
            LifecycleAction::Publish => self.publish = roles,
            LifecycleAction::EditMembership => self.edit_membership = roles,
        }
        self
    }

    /// Check that `caller` may perform `action`
    ///
    /// # Errors
    /// Returns [`LotError::Forbidden`] listing the permitted roles
    pub fn authorize(&self, action: LifecycleAction, caller: &Caller) -> Result<(), LotError> {
        let permitted = self.permitted(action);
        if permitted.contains(&caller.role) {
            return Ok(());
        }
        tracing::warn!(
            user_id = %caller.user_id,
            role = %caller.role,
            %action,
            "caller not permitted"
        );
        Err(LotError::Forbidden {
            action: action.to_string(),
            role: caller.role,
            permitted: permitted.to_vec(),
        })
    }

    /// Check that no action is left without a permitted role
    ///
    /// # Errors
    /// Returns the first action with an empty role list
    pub fn validate(&self) -> Result<(), LifecycleAction> {
        [
            LifecycleAction::UpdateStatus,
            LifecycleAction::Approve,
            LifecycleAction::Reject,
            LifecycleAction::Publish,
            LifecycleAction::EditMembership,
        ]
        .into_iter()
        .find(|action| self.permitted(*action).is_empty())
        .map_or(Ok(()), Err)
    }
}
