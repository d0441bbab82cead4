use tracing::{info, warn};

use crate::calendar::{
    AccessRole, CalendarRef, CalendarShare, Event, EventDraft, SharePermission, ShareStatus, User,
};
use crate::storage::{Store, StoreError};

use super::{AccessError, AccessGrant, UserDirectory};

#[derive(Debug, Clone, PartialEq)]
pub struct ShareRequest {
    pub calendar_id: String,
    pub email: String,
    pub permission: SharePermission,
    /// Display name for the invitee; falls back to the calendar's own name.
    pub calendar_name: Option<String>,
}

/// Resolves who may reach which calendar, and performs event operations on
/// behalf of share holders within their granted permission.
pub struct AccessService<'a, D: UserDirectory> {
    store: &'a Store,
    users: &'a D,
}

impl<'a, D: UserDirectory> AccessService<'a, D> {
    pub fn new(store: &'a Store, users: &'a D) -> Self {
        Self { store, users }
    }

    /// Resolves a calendar reference to an access grant. For shares, the
    /// first successful access by the invited party flips a pending grant to
    /// accepted and backfills the invitee's id; the update writes the same
    /// values on every call, so concurrent accepts are harmless.
    pub fn resolve(
        &self,
        requester: Option<&str>,
        reference: &CalendarRef,
    ) -> Result<AccessGrant, AccessError> {
        let requester = requester.ok_or(AccessError::NotAuthenticated)?;
        match reference {
            CalendarRef::Own { id } => {
                let calendar = self
                    .store
                    .calendar_by_id(requester, id)?
                    .ok_or(AccessError::NotFound)?;
                Ok(AccessGrant {
                    calendar_id: calendar.id,
                    owner_id: requester.to_string(),
                    role: AccessRole::Owner,
                    share: None,
                })
            }
            CalendarRef::Shared { token } => self.resolve_share(requester, token),
        }
    }

    fn resolve_share(&self, requester: &str, token: &str) -> Result<AccessGrant, AccessError> {
        let mut share = self.store.share_by_token(token)?.ok_or(AccessError::NotFound)?;
        let owner =
            self.users.user_by_id(&share.owner_id)?.ok_or(AccessError::OwnerMissing)?;

        if requester == share.owner_id {
            return Ok(AccessGrant {
                calendar_id: share.calendar_id.clone(),
                owner_id: owner.id,
                role: AccessRole::Owner,
                share: Some(share),
            });
        }

        let invited = match share.shared_with_id.as_deref() {
            Some(id) => id == requester,
            None => self
                .users
                .user_by_id(requester)?
                .is_some_and(|user| user.email.eq_ignore_ascii_case(&share.shared_with_email)),
        };
        if !invited {
            return Err(AccessError::Forbidden);
        }

        if share.status == ShareStatus::Pending {
            self.store.accept_share(&share.share_token, requester)?;
            share.status = ShareStatus::Accepted;
            share.shared_with_id = Some(requester.to_string());
            info!(share_id = %share.id, user_id = requester, "share accepted");
        }

        let role = match share.permission {
            SharePermission::Write => AccessRole::Writer,
            SharePermission::Read => AccessRole::Reader,
        };
        Ok(AccessGrant {
            calendar_id: share.calendar_id.clone(),
            owner_id: owner.id,
            role,
            share: Some(share),
        })
    }

    pub fn share_calendar(
        &self,
        requester: Option<&str>,
        request: ShareRequest,
    ) -> Result<CalendarShare, AccessError> {
        let requester = requester.ok_or(AccessError::NotAuthenticated)?;
        let current =
            self.users.user_by_id(requester)?.ok_or(AccessError::NotAuthenticated)?;

        let email = request.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AccessError::InvalidInput("an email is required".to_string()));
        }

        let calendar = self
            .store
            .calendar_by_id(requester, &request.calendar_id)?
            .ok_or(AccessError::NotFound)?;

        if current.email.eq_ignore_ascii_case(&email) {
            return Err(AccessError::SelfShare);
        }
        if self.store.find_share(requester, &calendar.id, &email)?.is_some() {
            return Err(AccessError::AlreadyShared(email));
        }

        let target = self.users.user_by_email(&email)?;
        let share = CalendarShare::new(
            requester,
            &calendar.id,
            &email,
            target.map(|user| user.id),
            request.permission,
            &request.calendar_name.unwrap_or_else(|| calendar.name.clone()),
        );
        self.store.insert_share(&share)?;
        info!(share_id = %share.id, calendar_id = %calendar.id, "calendar shared");
        Ok(share)
    }

    /// Deleting the grant revokes access for its token immediately.
    pub fn revoke_share(
        &self,
        requester: Option<&str>,
        token: &str,
    ) -> Result<(), AccessError> {
        let requester = requester.ok_or(AccessError::NotAuthenticated)?;
        let share = self.store.share_by_token(token)?.ok_or(AccessError::NotFound)?;
        if share.owner_id != requester {
            return Err(AccessError::Forbidden);
        }
        self.store.delete_share(&share.id)?;
        info!(share_id = %share.id, "share revoked");
        Ok(())
    }

    pub fn shares_owned_by(
        &self,
        requester: Option<&str>,
        calendar_id: Option<&str>,
    ) -> Result<Vec<CalendarShare>, AccessError> {
        let requester = requester.ok_or(AccessError::NotAuthenticated)?;
        Ok(self.store.shares_owned_by(requester, calendar_id)?)
    }

    /// Shares addressed to the requester, paired with their owners. Grants
    /// whose owner account has disappeared are skipped rather than failing
    /// the whole listing.
    pub fn shares_addressed_to(
        &self,
        requester: Option<&str>,
    ) -> Result<Vec<(CalendarShare, User)>, AccessError> {
        let requester = requester.ok_or(AccessError::NotAuthenticated)?;
        let current =
            self.users.user_by_id(requester)?.ok_or(AccessError::NotAuthenticated)?;

        let mut listed = Vec::new();
        for share in self.store.shares_addressed_to(requester, &current.email)? {
            match self.users.user_by_id(&share.owner_id)? {
                Some(owner) => listed.push((share, owner)),
                None => {
                    warn!(share_id = %share.id, owner_id = %share.owner_id, "skipping share with missing owner");
                }
            }
        }
        Ok(listed)
    }

    /// The shared calendar's events, in start order, together with the grant
    /// so callers can render the permission level.
    pub fn shared_events(
        &self,
        requester: Option<&str>,
        token: &str,
    ) -> Result<(AccessGrant, Vec<Event>), AccessError> {
        let grant = self.resolve(requester, &CalendarRef::Shared { token: token.to_string() })?;
        let events = self.store.events_for_calendar(&grant.owner_id, &grant.calendar_id)?;
        Ok((grant, events))
    }

    /// Creates an event on the shared calendar, owned by the calendar's
    /// owner. Requires write permission.
    pub fn create_shared_event(
        &self,
        requester: Option<&str>,
        token: &str,
        draft: EventDraft,
    ) -> Result<Event, AccessError> {
        let grant = self.writable_grant(requester, token)?;
        self.store
            .create_event(&grant.owner_id, &grant.calendar_id, draft)
            .map_err(map_event_error)
    }

    pub fn update_shared_event(
        &self,
        requester: Option<&str>,
        token: &str,
        event_id: &str,
        draft: EventDraft,
    ) -> Result<Event, AccessError> {
        let grant = self.writable_grant(requester, token)?;
        self.store.update_event(&grant.owner_id, event_id, draft).map_err(map_event_error)
    }

    pub fn delete_shared_event(
        &self,
        requester: Option<&str>,
        token: &str,
        event_id: &str,
    ) -> Result<(), AccessError> {
        let grant = self.writable_grant(requester, token)?;
        self.store.delete_event(&grant.owner_id, event_id).map_err(map_event_error)
    }

    fn writable_grant(
        &self,
        requester: Option<&str>,
        token: &str,
    ) -> Result<AccessGrant, AccessError> {
        let grant = self.resolve(requester, &CalendarRef::Shared { token: token.to_string() })?;
        if !grant.can_write() {
            return Err(AccessError::Forbidden);
        }
        Ok(grant)
    }
}

fn map_event_error(err: StoreError) -> AccessError {
    match err {
        StoreError::NotFound => AccessError::NotFound,
        other => AccessError::Store(other),
    }
}
