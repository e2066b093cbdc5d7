//! Authorization policy.
//!
//! Every mutating operation asks [`authorize`] first. The decision depends
//! only on the acting identity and the ownership facts of the target, so it
//! is testable without a database or a request.

use warbler_types::{Identity, UserId};

/// Why a request was refused. The HTTP boundary renders every variant as the
/// same "Access unauthorized." response; the reason is only for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("no authenticated user")]
    Anonymous,
    #[error("acting user does not own the target")]
    NotOwner,
    #[error("target does not exist")]
    MissingTarget,
    #[error("users cannot follow themselves")]
    SelfFollow,
    #[error("users cannot like their own messages")]
    SelfLike,
    #[error("current password did not verify")]
    WrongPassword,
}

/// What the acting identity wants to do. Targets that were looked up and
/// not found are passed as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PostMessage,
    /// Read anyone's follower / following lists.
    ViewGraph,
    Follow { target: Option<UserId> },
    Unfollow { target: Option<UserId> },
    DeleteMessage { author: Option<UserId> },
    Like { author: Option<UserId> },
    Unlike { author: Option<UserId> },
    EditProfile { owner: UserId },
    DeleteAccount { owner: UserId },
}

/// Allow or deny `action` for `identity`. On success returns the acting
/// user's id.
pub fn authorize(identity: Identity, action: Action) -> Result<UserId, Denial> {
    let actor = identity.user_id().ok_or(Denial::Anonymous)?;

    match action {
        Action::PostMessage | Action::ViewGraph => Ok(actor),
        Action::Follow { target } => {
            let target = target.ok_or(Denial::MissingTarget)?;
            if target == actor {
                return Err(Denial::SelfFollow);
            }
            Ok(actor)
        }
        Action::Unfollow { target } => {
            target.ok_or(Denial::MissingTarget)?;
            Ok(actor)
        }
        Action::DeleteMessage { author } => match author {
            Some(author) if author == actor => Ok(actor),
            Some(_) => Err(Denial::NotOwner),
            None => Err(Denial::MissingTarget),
        },
        Action::Like { author } => match author {
            Some(author) if author == actor => Err(Denial::SelfLike),
            Some(_) => Ok(actor),
            None => Err(Denial::MissingTarget),
        },
        Action::Unlike { author } => {
            author.ok_or(Denial::MissingTarget)?;
            Ok(actor)
        }
        Action::EditProfile { owner } | Action::DeleteAccount { owner } => {
            if owner == actor {
                Ok(actor)
            } else {
                Err(Denial::NotOwner)
            }
        }
    }
}
