// src/services/policy.rs
//
// The single authorization check. Every service entry point calls
// `authorize` before touching the store.

use crate::{
    error::AppError,
    models::{post::PostStatus, user::Role},
    utils::jwt::Claims,
};

/// Who is making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User { id: i64, role: Role },
}

impl Actor {
    pub fn from_claims(claims: Option<&Claims>) -> Result<Self, AppError> {
        match claims {
            Some(claims) => Ok(Actor::User {
                id: claims.user_id()?,
                role: claims.role,
            }),
            None => Ok(Actor::Anonymous),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Actor::User { id, .. } => Some(*id),
            Actor::Anonymous => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::User { role: Role::Admin, .. })
    }

    /// The user id, or 401 for anonymous callers.
    pub fn require_user(&self) -> Result<i64, AppError> {
        self.user_id()
            .ok_or_else(|| AppError::AuthError("User not authenticated".to_string()))
    }

    fn owns(&self, author_id: i64) -> bool {
        self.user_id() == Some(author_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// An existing post.
    Post { author_id: i64, status: PostStatus },
    /// The post collection (creating a new post).
    Posts,
    Comment,
    Tag,
}

pub fn authorize(actor: &Actor, action: Action, resource: &Resource) -> Result<(), AppError> {
    let authenticated = matches!(actor, Actor::User { .. });

    match (resource, action) {
        (Resource::Post { author_id, status }, Action::Read | Action::Like) => {
            if action == Action::Like && !authenticated {
                return Err(unauthenticated());
            }
            if *status == PostStatus::Published || actor.owns(*author_id) || actor.is_admin() {
                Ok(())
            } else {
                Err(AppError::Forbidden("Not authorized to view this post".to_string()))
            }
        }
        (Resource::Post { author_id, .. }, Action::Update | Action::Delete | Action::Create) => {
            if !authenticated {
                return Err(unauthenticated());
            }
            if actor.owns(*author_id) || actor.is_admin() {
                Ok(())
            } else {
                let verb = if action == Action::Delete { "delete" } else { "update" };
                Err(AppError::Forbidden(format!("Not authorized to {} this post", verb)))
            }
        }
        (Resource::Posts | Resource::Comment | Resource::Tag, Action::Read) => Ok(()),
        (Resource::Posts | Resource::Comment, _) => {
            if authenticated {
                Ok(())
            } else {
                Err(unauthenticated())
            }
        }
        (Resource::Tag, _) => {
            if !authenticated {
                Err(unauthenticated())
            } else if actor.is_admin() {
                Ok(())
            } else {
                Err(AppError::Forbidden("Only admins can manage tags".to_string()))
            }
        }
    }
}

fn unauthenticated() -> AppError {
    AppError::AuthError("User not authenticated".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR: Actor = Actor::User { id: 1, role: Role::User };
    const OTHER: Actor = Actor::User { id: 2, role: Role::User };
    const ADMIN: Actor = Actor::User { id: 3, role: Role::Admin };

    fn post(status: PostStatus) -> Resource {
        Resource::Post { author_id: 1, status }
    }

    #[test]
    fn published_posts_are_public() {
        let published = post(PostStatus::Published);
        for actor in [Actor::Anonymous, AUTHOR, OTHER, ADMIN] {
            assert!(authorize(&actor, Action::Read, &published).is_ok());
        }
    }

    #[test]
    fn drafts_visible_to_author_and_admin_only() {
        let draft = post(PostStatus::Draft);
        assert!(matches!(
            authorize(&Actor::Anonymous, Action::Read, &draft),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(authorize(&OTHER, Action::Read, &draft), Err(AppError::Forbidden(_))));
        assert!(authorize(&AUTHOR, Action::Read, &draft).is_ok());
        assert!(authorize(&ADMIN, Action::Read, &post(PostStatus::Archived)).is_ok());
    }

    #[test]
    fn mutation_requires_owner_or_admin() {
        let published = post(PostStatus::Published);
        for action in [Action::Update, Action::Delete] {
            assert!(matches!(
                authorize(&Actor::Anonymous, action, &published),
                Err(AppError::AuthError(_))
            ));
            assert!(matches!(authorize(&OTHER, action, &published), Err(AppError::Forbidden(_))));
            assert!(authorize(&AUTHOR, action, &published).is_ok());
            assert!(authorize(&ADMIN, action, &published).is_ok());
        }
    }

    #[test]
    fn tag_management_is_admin_only() {
        assert!(authorize(&Actor::Anonymous, Action::Read, &Resource::Tag).is_ok());
        assert!(matches!(
            authorize(&OTHER, Action::Update, &Resource::Tag),
            Err(AppError::Forbidden(_))
        ));
        assert!(authorize(&ADMIN, Action::Update, &Resource::Tag).is_ok());
    }

    #[test]
    fn likes_need_authentication() {
        assert!(matches!(
            authorize(&Actor::Anonymous, Action::Like, &post(PostStatus::Published)),
            Err(AppError::AuthError(_))
        ));
        assert!(matches!(
            authorize(&Actor::Anonymous, Action::Like, &Resource::Comment),
            Err(AppError::AuthError(_))
        ));
        assert!(authorize(&OTHER, Action::Like, &Resource::Comment).is_ok());
        assert!(authorize(&OTHER, Action::Create, &Resource::Posts).is_ok());
    }
}
