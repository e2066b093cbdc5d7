//! Guarded Warbler operations.
//!
//! Every call takes the acting [`Identity`] explicitly. Mutations check the
//! guard and apply their writes inside one transaction, so a denial or a
//! constraint violation leaves nothing behind.

use tracing::info;

use warbler_db::models::{NewMessage, NewUser, ProfileChanges, UserRow};
use warbler_db::{Database, follows, likes, messages, users};
use warbler_types::api::{ProfileUpdateRequest, SignupRequest};
use warbler_types::models::MessageId;
use warbler_types::{Identity, Message, User, UserId};

use crate::error::ServiceError;
use crate::guard::{Action, Denial, authorize};

/// Most messages returned by [`Warbler::timeline`].
pub const TIMELINE_LIMIT: u32 = 100;

pub struct Warbler {
    db: Database,
}

impl Warbler {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    // -- Identity store --

    /// Hash the password and build the record to insert. Nothing is
    /// persisted; missing required fields are passed through so the
    /// database rejects them on commit.
    pub fn stage_signup(req: &SignupRequest) -> Result<NewUser, ServiceError> {
        let password = req
            .password
            .as_deref()
            .map(warbler_crypto::hash_password)
            .transpose()
            .map_err(ServiceError::Password)?;

        Ok(NewUser {
            id: None,
            username: req.username.clone(),
            email: req.email.clone(),
            password,
            image_url: req.image_url.clone(),
        })
    }

    pub fn signup(&self, req: &SignupRequest) -> Result<User, ServiceError> {
        let staged = Self::stage_signup(req)?;
        Ok(self.db.insert_user(&staged)?.into())
    }

    /// `None` for an unknown username or a wrong password.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, ServiceError> {
        let Some(row) = self.db.user_by_username(username)? else {
            return Ok(None);
        };

        if !warbler_crypto::verify_password(password, &row.password) {
            return Ok(None);
        }
        Ok(Some(row.into()))
    }

    pub fn user(&self, id: UserId) -> Result<Option<User>, ServiceError> {
        Ok(self.db.user(id)?.map(User::from))
    }

    pub fn search_users(&self, query: Option<&str>) -> Result<Vec<User>, ServiceError> {
        Ok(into_users(self.db.search_users(query)?))
    }

    /// Apply profile edits to `user_id`. Only the owner may do this, and
    /// only after their current password verifies.
    pub fn update_profile(
        &self,
        identity: Identity,
        user_id: UserId,
        req: &ProfileUpdateRequest,
    ) -> Result<User, ServiceError> {
        let actor = authorize(identity, Action::EditProfile { owner: user_id })?;

        let changes = ProfileChanges {
            username: req.username.clone(),
            email: req.email.clone(),
            image_url: req.image_url.clone(),
            header_image_url: req.header_image_url.clone(),
            bio: req.bio.clone(),
            location: req.location.clone(),
        };

        self.db.transaction(|tx| -> Result<_, ServiceError> {
            let row = users::user_by_id(tx, actor)?.ok_or(Denial::MissingTarget)?;
            if !warbler_crypto::verify_password(&req.password, &row.password) {
                return Err(Denial::WrongPassword.into());
            }

            let row = users::update_user(tx, actor, &changes)?.ok_or(Denial::MissingTarget)?;
            info!("User #{} updated their profile", actor);
            Ok(row.into())
        })
    }

    /// Delete `user_id` with all of their messages, likes and follow edges.
    pub fn delete_account(&self, identity: Identity, user_id: UserId) -> Result<(), ServiceError> {
        let actor = authorize(identity, Action::DeleteAccount { owner: user_id })?;

        self.db.transaction(|tx| -> Result<_, ServiceError> {
            if !users::delete_user(tx, actor)? {
                return Err(Denial::MissingTarget.into());
            }
            Ok(())
        })
    }

    // -- Social graph --

    /// Does `a` follow `b`?
    pub fn is_following(&self, a: UserId, b: UserId) -> Result<bool, ServiceError> {
        Ok(self.db.is_following(a, b)?)
    }

    /// Is `a` followed by `b`?
    pub fn is_followed_by(&self, a: UserId, b: UserId) -> Result<bool, ServiceError> {
        Ok(self.db.is_following(b, a)?)
    }

    /// Make the acting user follow `target`. Returns `false` when they
    /// already did.
    pub fn follow(&self, identity: Identity, target: UserId) -> Result<bool, ServiceError> {
        self.db.transaction(|tx| -> Result<_, ServiceError> {
            let target = users::user_by_id(tx, target)?.map(|u| u.id);
            let actor = authorize(identity, Action::Follow { target })?;
            let followed = target.ok_or(Denial::MissingTarget)?;

            let added = follows::insert_follow(tx, actor, followed)?;
            if added {
                info!("User #{} followed user #{}", actor, followed);
            }
            Ok(added)
        })
    }

    /// Returns `false` when the acting user was not following `target`.
    pub fn unfollow(&self, identity: Identity, target: UserId) -> Result<bool, ServiceError> {
        self.db.transaction(|tx| -> Result<_, ServiceError> {
            let target = users::user_by_id(tx, target)?.map(|u| u.id);
            let actor = authorize(identity, Action::Unfollow { target })?;
            let followed = target.ok_or(Denial::MissingTarget)?;

            let removed = follows::delete_follow(tx, actor, followed)?;
            if removed {
                info!("User #{} stopped following user #{}", actor, followed);
            }
            Ok(removed)
        })
    }

    /// Users `user_id` follows; `None` when there is no such user.
    pub fn following(&self, identity: Identity, user_id: UserId) -> Result<Option<Vec<User>>, ServiceError> {
        authorize(identity, Action::ViewGraph)?;
        self.db.with_conn(|conn| -> Result<_, ServiceError> {
            if users::user_by_id(conn, user_id)?.is_none() {
                return Ok(None);
            }
            Ok(Some(into_users(follows::following(conn, user_id)?)))
        })
    }

    /// Users following `user_id`; `None` when there is no such user.
    pub fn followers(&self, identity: Identity, user_id: UserId) -> Result<Option<Vec<User>>, ServiceError> {
        authorize(identity, Action::ViewGraph)?;
        self.db.with_conn(|conn| -> Result<_, ServiceError> {
            if users::user_by_id(conn, user_id)?.is_none() {
                return Ok(None);
            }
            Ok(Some(into_users(follows::followers(conn, user_id)?)))
        })
    }

    // -- Message store --

    pub fn post_message(&self, identity: Identity, text: &str) -> Result<Message, ServiceError> {
        let actor = authorize(identity, Action::PostMessage)?;
        let new = NewMessage {
            text: text.to_string(),
            user_id: Some(actor),
        };
        Ok(self.db.insert_message(&new)?)
    }

    pub fn message(&self, id: MessageId) -> Result<Option<Message>, ServiceError> {
        Ok(self.db.message(id)?)
    }

    /// Hard-delete a message. Only its author may do this.
    pub fn delete_message(&self, identity: Identity, id: MessageId) -> Result<(), ServiceError> {
        self.db.transaction(|tx| -> Result<_, ServiceError> {
            let author = messages::message_author(tx, id)?;
            let actor = authorize(identity, Action::DeleteMessage { author })?;

            messages::delete_message(tx, id)?;
            info!("User #{} deleted message #{}", actor, id);
            Ok(())
        })
    }

    pub fn messages_for_user(&self, user_id: UserId) -> Result<Vec<Message>, ServiceError> {
        Ok(self.db.messages_for_user(user_id)?)
    }

    /// Home feed: the acting user's messages and those of everyone they
    /// follow. Visitors get an empty feed.
    pub fn timeline(&self, identity: Identity) -> Result<Vec<Message>, ServiceError> {
        match identity {
            Identity::Visitor => Ok(Vec::new()),
            Identity::User(id) => Ok(self.db.timeline(id, TIMELINE_LIMIT)?),
        }
    }

    // -- Like index --

    /// Returns `false` when the acting user already liked the message.
    pub fn add_like(&self, identity: Identity, message_id: MessageId) -> Result<bool, ServiceError> {
        self.db.transaction(|tx| -> Result<_, ServiceError> {
            let author = messages::message_author(tx, message_id)?;
            let actor = authorize(identity, Action::Like { author })?;
            Ok(likes::insert_like(tx, actor, message_id)?)
        })
    }

    /// Returns `false` when there was no like to remove.
    pub fn remove_like(&self, identity: Identity, message_id: MessageId) -> Result<bool, ServiceError> {
        self.db.transaction(|tx| -> Result<_, ServiceError> {
            let author = messages::message_author(tx, message_id)?;
            let actor = authorize(identity, Action::Unlike { author })?;
            Ok(likes::delete_like(tx, actor, message_id)?)
        })
    }

    pub fn like_count(&self, message_id: MessageId) -> Result<u64, ServiceError> {
        Ok(self.db.like_count(message_id)?)
    }

    pub fn liked_messages(&self, user_id: UserId) -> Result<Vec<Message>, ServiceError> {
        Ok(self.db.liked_messages(user_id)?)
    }
}

fn into_users(rows: Vec<UserRow>) -> Vec<User> {
    rows.into_iter().map(User::from).collect()
}
