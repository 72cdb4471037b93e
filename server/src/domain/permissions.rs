//! Per-operation access policies.
//!
//! A policy inspects the acting user, the kind of access and the resource and
//! either allows or denies. Policies are evaluated in order and the first
//! denial wins.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, Registration, User};

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub is_staff: bool,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            is_staff: user.is_staff,
        }
    }
}

/// Reads never change state; writes cover create, update and delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PermissionDenied(pub &'static str);

pub type Policy<R> = fn(&Actor, Access, &R) -> Decision;

pub fn enforce<R>(
    policies: &[Policy<R>],
    actor: &Actor,
    access: Access,
    resource: &R,
) -> Result<(), PermissionDenied> {
    for policy in policies {
        if let Decision::Deny(reason) = policy(actor, access, resource) {
            return Err(PermissionDenied(reason));
        }
    }
    Ok(())
}

pub fn is_event_organizer(actor: &Actor, access: Access, event: &Event) -> Decision {
    if access == Access::Read || event.organizer_id == actor.id {
        Decision::Allow
    } else {
        Decision::Deny("Only the event organizer can modify this event")
    }
}

pub fn is_owner_or_staff(actor: &Actor, _access: Access, registration: &Registration) -> Decision {
    if registration.user_id == actor.id || actor.is_staff {
        Decision::Allow
    } else {
        Decision::Deny("You do not have access to this registration")
    }
}

pub fn is_staff<R>(actor: &Actor, _access: Access, _resource: &R) -> Decision {
    if actor.is_staff {
        Decision::Allow
    } else {
        Decision::Deny("Administrator privileges are required")
    }
}
