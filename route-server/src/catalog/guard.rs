//! Catalog Guard
//!
//! Ownership layer on top of the role check: a librarian manages only the
//! books they created, an admin manages all of them.

use shared::error::{AppError, AppResult};
use shared::models::{Book, Role};

use crate::auth::Grant;
use crate::security_log;

/// Which books a management view may show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagementScope {
    All,
    OwnedBy(String),
}

pub struct CatalogGuard;

impl CatalogGuard {
    pub fn ensure_can_mutate(grant: &Grant, book: &Book) -> AppResult<()> {
        match grant.role {
            Role::Admin => Ok(()),
            Role::Librarian if book.owner_librarian_email == grant.email => Ok(()),
            _ => {
                security_log!(
                    "WARN",
                    "book_not_owner",
                    email = grant.email.as_str(),
                    book_id = book.id
                );
                Err(AppError::not_owner("book"))
            }
        }
    }

    pub fn management_scope(grant: &Grant) -> ManagementScope {
        if grant.is_admin() {
            ManagementScope::All
        } else {
            ManagementScope::OwnedBy(grant.email.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    fn book(owner: &str) -> Book {
        Book {
            id: 7,
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            description: None,
            image_url: None,
            price: 350.0,
            quantity: 3,
            status: "published".into(),
            owner_librarian_email: owner.into(),
            created_at: 0,
        }
    }

    fn grant(email: &str, role: Role) -> Grant {
        Grant {
            email: email.into(),
            role,
        }
    }

    #[test]
    fn test_owner_librarian_can_mutate() {
        let g = grant("lib@x.com", Role::Librarian);
        assert!(CatalogGuard::ensure_can_mutate(&g, &book("lib@x.com")).is_ok());
    }

    #[test]
    fn test_other_librarian_cannot_mutate() {
        let g = grant("other@x.com", Role::Librarian);
        let err = CatalogGuard::ensure_can_mutate(&g, &book("lib@x.com")).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotOwner);
    }

    #[test]
    fn test_admin_can_mutate_any() {
        let g = grant("root@x.com", Role::Admin);
        assert!(CatalogGuard::ensure_can_mutate(&g, &book("lib@x.com")).is_ok());
    }

    #[test]
    fn test_user_cannot_mutate_even_as_owner() {
        // 角色被降级后，原本属于自己的书也不能再改
        let g = grant("lib@x.com", Role::User);
        assert!(CatalogGuard::ensure_can_mutate(&g, &book("lib@x.com")).is_err());
    }

    #[test]
    fn test_management_scope() {
        assert_eq!(
            CatalogGuard::management_scope(&grant("root@x.com", Role::Admin)),
            ManagementScope::All
        );
        assert_eq!(
            CatalogGuard::management_scope(&grant("lib@x.com", Role::Librarian)),
            ManagementScope::OwnedBy("lib@x.com".into())
        );
    }
}
