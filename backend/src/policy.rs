use actix_web::{HttpRequest, HttpResponse};

use crate::auth::current_user;
use crate::error::detail;
use crate::models::User;
use crate::AppState;

/// What an operation needs from its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Reading any listing or record.
    ViewRecords,
    /// Enrolling, editing and removing students.
    ManageStudents,
    /// Writing grades.
    RecordGrades,
    /// Subjects, class forms and teaching assignments.
    ManageCurriculum,
    /// Accounts of other users.
    ManageUsers,
}

impl Capability {
    pub fn allows(self, user: &User) -> bool {
        if !user.is_active {
            return false;
        }
        match self {
            Capability::ViewRecords | Capability::ManageStudents => true,
            Capability::RecordGrades => user.is_superuser || user.is_class_teacher,
            Capability::ManageCurriculum | Capability::ManageUsers => user.is_superuser,
        }
    }
}

pub fn require(user: &User, capability: Capability) -> Result<(), HttpResponse> {
    if capability.allows(user) {
        return Ok(());
    }

    Err(HttpResponse::Forbidden().json(detail("The user doesn't have enough privileges")))
}

/// Authenticates the caller and checks `capability` in one step.
pub async fn authorize(
    req: &HttpRequest,
    app_state: &AppState,
    capability: Capability,
) -> Result<User, HttpResponse> {
    let user = current_user(req, app_state).await?;
    require(&user, capability)?;
    Ok(user)
}
