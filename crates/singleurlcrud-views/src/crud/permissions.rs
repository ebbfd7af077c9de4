//! Authorization hook for controller operations.

use singleurlcrud_db::Entity;
use singleurlcrud_http::HttpRequest;

use super::operation::Operation;

/// Decides whether a request may perform an operation.
///
/// Consulted on the read and write paths of Add, Edit, Delete and
/// DeleteMultiple. `entity` is the target for Edit and Delete, `None`
/// otherwise. A refusal surfaces as 404 Not Found.
///
/// # Examples
///
/// ```
/// use singleurlcrud_db::Entity;
/// use singleurlcrud_http::HttpRequest;
/// use singleurlcrud_views::crud::{Operation, PermissionChecker};
///
/// /// Only requests carrying the staff cookie may change anything.
/// struct StaffOnly;
///
/// impl<E: Entity> PermissionChecker<E> for StaffOnly {
///     fn check_permission(&self, _op: Operation, _entity: Option<&E>, request: &HttpRequest) -> bool {
///         request.cookie("staff") == Some("1")
///     }
/// }
/// ```
pub trait PermissionChecker<E: Entity>: Send + Sync {
    /// Returns `true` to allow. The default allows everything.
    fn check_permission(&self, op: Operation, entity: Option<&E>, request: &HttpRequest) -> bool {
        let _ = (op, entity, request);
        true
    }
}

/// Allows every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl<E: Entity> PermissionChecker<E> for AllowAll {}

/// Wraps a closure as a [`PermissionChecker`].
pub struct PermissionFn<F>(pub F);

impl<E, F> PermissionChecker<E> for PermissionFn<F>
where
    E: Entity,
    F: Fn(Operation, Option<&E>, &HttpRequest) -> bool + Send + Sync,
{
    fn check_permission(&self, op: Operation, entity: Option<&E>, request: &HttpRequest) -> bool {
        (self.0)(op, entity, request)
    }
}
