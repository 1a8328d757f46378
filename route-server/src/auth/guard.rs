//! Access Guard
//!
//! Every protected operation has exactly one entry in [`Operation::requirement`].
//! Roles are read from the record store on each decision so a role change takes
//! effect on the caller's next request.

use shared::error::{AppError, AppResult};
use shared::models::Role;
use shared::util::normalize_email;

use super::identity::{Identity, IdentityResolver};
use crate::security_log;

/// Operations subject to access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListUsers,
    ChangeUserRole,
    ViewProfile,
    RegisterUser,
    ReadCatalog,
    CreateBook,
    UpdateBook,
    DeleteBook,
    ListManagedBooks,
    CreateOrder,
    UpdateOrderStatus,
    ListOwnOrders,
    ListLibrarianOrders,
    ViewOrder,
    CreateCheckoutSession,
    ConfirmPayment,
    ListOwnPayments,
    ListAllPayments,
}

/// What an operation demands of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// No identity needed
    Public,
    /// Any verified identity
    Authenticated,
    /// Verified identity whose email equals the subject email
    SelfOnly,
    /// Verified identity holding one of these roles
    Roles(&'static [Role]),
}

const ADMIN: &[Role] = &[Role::Admin];
const STAFF: &[Role] = &[Role::Librarian, Role::Admin];

impl Operation {
    pub const ALL: [Operation; 18] = [
        Operation::ListUsers,
        Operation::ChangeUserRole,
        Operation::ViewProfile,
        Operation::RegisterUser,
        Operation::ReadCatalog,
        Operation::CreateBook,
        Operation::UpdateBook,
        Operation::DeleteBook,
        Operation::ListManagedBooks,
        Operation::CreateOrder,
        Operation::UpdateOrderStatus,
        Operation::ListOwnOrders,
        Operation::ListLibrarianOrders,
        Operation::ViewOrder,
        Operation::CreateCheckoutSession,
        Operation::ConfirmPayment,
        Operation::ListOwnPayments,
        Operation::ListAllPayments,
    ];

    pub fn requirement(self) -> Requirement {
        use Operation::*;
        match self {
            ListUsers | ChangeUserRole | DeleteBook | ListAllPayments => Requirement::Roles(ADMIN),
            CreateBook | UpdateBook | ListManagedBooks | UpdateOrderStatus
            | ListLibrarianOrders => Requirement::Roles(STAFF),
            ListOwnOrders | ListOwnPayments => Requirement::SelfOnly,
            ViewProfile | CreateOrder | ConfirmPayment | ViewOrder => Requirement::Authenticated,
            ReadCatalog | RegisterUser | CreateCheckoutSession => Requirement::Public,
        }
    }

    pub fn name(self) -> &'static str {
        use Operation::*;
        match self {
            ListUsers => "list_users",
            ChangeUserRole => "change_user_role",
            ViewProfile => "view_profile",
            RegisterUser => "register_user",
            ReadCatalog => "read_catalog",
            CreateBook => "create_book",
            UpdateBook => "update_book",
            DeleteBook => "delete_book",
            ListManagedBooks => "list_managed_books",
            CreateOrder => "create_order",
            UpdateOrderStatus => "update_order_status",
            ListOwnOrders => "list_own_orders",
            ListLibrarianOrders => "list_librarian_orders",
            ViewOrder => "view_order",
            CreateCheckoutSession => "create_checkout_session",
            ConfirmPayment => "confirm_payment",
            ListOwnPayments => "list_own_payments",
            ListAllPayments => "list_all_payments",
        }
    }
}

impl Requirement {
    /// Role part of the decision. `SelfOnly` is role-independent and also
    /// needs [`AccessGuard::authorize_subject`].
    pub fn permits(self, role: Role) -> bool {
        match self {
            Requirement::Public | Requirement::Authenticated | Requirement::SelfOnly => true,
            Requirement::Roles(roles) => roles.contains(&role),
        }
    }

    /// Lowest role that satisfies this requirement
    pub fn minimum_role(self) -> Role {
        match self {
            Requirement::Roles(roles) => roles.iter().copied().min().unwrap_or(Role::Admin),
            _ => Role::User,
        }
    }
}

/// Result of a successful authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub email: String,
    pub role: Role,
}

impl Grant {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Clone)]
pub struct AccessGuard {
    resolver: IdentityResolver,
}

impl AccessGuard {
    pub fn new(resolver: IdentityResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Decide a role-based or authenticated operation.
    ///
    /// `SelfOnly` operations must go through [`Self::authorize_subject`].
    pub async fn authorize(&self, identity: &Identity, op: Operation) -> AppResult<Grant> {
        let requirement = op.requirement();
        if requirement == Requirement::SelfOnly {
            return Err(AppError::internal(format!(
                "{} needs a subject email",
                op.name()
            )));
        }

        let role = self.resolver.role_of(&identity.email).await?;
        if !requirement.permits(role) {
            security_log!(
                "WARN",
                "permission_denied",
                email = identity.email.as_str(),
                role = role.as_str(),
                operation = op.name()
            );
            return Err(AppError::role_required(requirement.minimum_role().as_str()));
        }

        Ok(Grant {
            email: identity.email.clone(),
            role,
        })
    }

    /// Decide an operation that targets another user's data by email.
    ///
    /// For `SelfOnly` operations the subject must be the caller; other
    /// requirements fall through to [`Self::authorize`].
    pub async fn authorize_subject(
        &self,
        identity: &Identity,
        op: Operation,
        subject_email: &str,
    ) -> AppResult<Grant> {
        if op.requirement() != Requirement::SelfOnly {
            return self.authorize(identity, op).await;
        }

        if normalize_email(subject_email) != identity.email {
            security_log!(
                "WARN",
                "subject_mismatch",
                email = identity.email.as_str(),
                operation = op.name()
            );
            return Err(AppError::forbidden("forbidden access"));
        }

        let role = self.resolver.role_of(&identity.email).await?;
        Ok(Grant {
            email: identity.email.clone(),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_table() {
        assert_eq!(Operation::ListUsers.requirement(), Requirement::Roles(ADMIN));
        assert_eq!(Operation::DeleteBook.requirement(), Requirement::Roles(ADMIN));
        assert_eq!(Operation::CreateBook.requirement(), Requirement::Roles(STAFF));
        assert_eq!(
            Operation::UpdateOrderStatus.requirement(),
            Requirement::Roles(STAFF)
        );
        assert_eq!(Operation::ListOwnOrders.requirement(), Requirement::SelfOnly);
        assert_eq!(
            Operation::ConfirmPayment.requirement(),
            Requirement::Authenticated
        );
        assert_eq!(Operation::ReadCatalog.requirement(), Requirement::Public);
    }

    #[test]
    fn test_role_monotonicity() {
        // 低权限角色允许的操作，高权限角色必须同样允许
        for op in Operation::ALL {
            let req = op.requirement();
            for low in Role::ALL {
                for high in Role::ALL {
                    if low <= high && req.permits(low) {
                        assert!(
                            req.permits(high),
                            "{} allows {} but not {}",
                            op.name(),
                            low,
                            high
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_minimum_role() {
        assert_eq!(Requirement::Roles(ADMIN).minimum_role(), Role::Admin);
        assert_eq!(Requirement::Roles(STAFF).minimum_role(), Role::Librarian);
        assert_eq!(Requirement::Authenticated.minimum_role(), Role::User);
    }

    #[test]
    fn test_user_denied_staff_operations() {
        assert!(!Operation::CreateBook.requirement().permits(Role::User));
        assert!(Operation::CreateBook.requirement().permits(Role::Librarian));
        assert!(!Operation::ListUsers.requirement().permits(Role::Librarian));
    }
}
