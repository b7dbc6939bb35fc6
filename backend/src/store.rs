pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{
    Assignment, AssignmentCreate, AssignmentUpdate, ClassForm, ClassFormCreate, ClassFormUpdate,
    Grade, GradeCreate, GradeUpdate, NewUser, Page, Student, StudentCreate, StudentUpdate, Subject,
    SubjectCreate, SubjectUpdate, User, UserChanges,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const DUPLICATE_ASSIGNMENT: &str =
    "Assignment with the same teacher, subject, and class form already exists";
pub const DUPLICATE_EMAIL: &str = "The user with this email already exists in the system";
pub const CLASS_FORM_IN_USE: &str = "Class Form still has enrolled students";

/// Persistence for every school record.
///
/// Each call is one short unit of work: lookups fail with `StoreError::NotFound`
/// before anything is written, and the uniqueness rules (user email, assignment
/// triple, one grade per student and subject) are enforced atomically by the
/// implementation rather than by a read-then-write in the caller.
#[async_trait(?Send)]
pub trait SchoolStore: Send + Sync {
    async fn list_users(&self, skip: i64, limit: i64) -> StoreResult<Page<User>>;
    async fn get_user(&self, id: Uuid) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<User>;
    /// Removes the user together with the students they own and their assignments.
    async fn delete_user(&self, id: Uuid) -> StoreResult<()>;

    async fn list_class_forms(&self, skip: i64, limit: i64) -> StoreResult<Page<ClassForm>>;
    async fn get_class_form(&self, id: Uuid) -> StoreResult<ClassForm>;
    async fn create_class_form(&self, input: &ClassFormCreate) -> StoreResult<ClassForm>;
    async fn update_class_form(&self, id: Uuid, changes: &ClassFormUpdate) -> StoreResult<ClassForm>;
    async fn delete_class_form(&self, id: Uuid) -> StoreResult<()>;

    async fn list_subjects(&self, skip: i64, limit: i64) -> StoreResult<Page<Subject>>;
    async fn get_subject(&self, id: Uuid) -> StoreResult<Subject>;
    async fn create_subject(&self, input: &SubjectCreate) -> StoreResult<Subject>;
    async fn update_subject(&self, id: Uuid, changes: &SubjectUpdate) -> StoreResult<Subject>;
    async fn delete_subject(&self, id: Uuid) -> StoreResult<()>;

    async fn list_students(&self, skip: i64, limit: i64) -> StoreResult<Page<Student>>;
    async fn get_student(&self, id: Uuid) -> StoreResult<Student>;
    async fn create_student(&self, input: &StudentCreate, owner_id: Uuid) -> StoreResult<Student>;
    async fn update_student(&self, id: Uuid, changes: &StudentUpdate) -> StoreResult<Student>;
    async fn delete_student(&self, id: Uuid) -> StoreResult<()>;

    async fn list_assignments(&self, skip: i64, limit: i64) -> StoreResult<Page<Assignment>>;
    async fn get_assignment(&self, id: Uuid) -> StoreResult<Assignment>;
    /// Fails with `StoreError::Conflict` when the triple is already assigned.
    async fn create_assignment(&self, input: &AssignmentCreate) -> StoreResult<Assignment>;
    async fn update_assignment(&self, id: Uuid, changes: &AssignmentUpdate) -> StoreResult<Assignment>;
    async fn delete_assignment(&self, id: Uuid) -> StoreResult<()>;

    async fn list_grades(&self, skip: i64, limit: i64) -> StoreResult<Page<Grade>>;
    async fn get_grade(&self, id: Uuid) -> StoreResult<Grade>;
    /// Inserts a grade, or overwrites score and remark of the existing grade
    /// for the same student and subject.
    async fn upsert_grade(&self, input: &GradeCreate) -> StoreResult<Grade>;
    async fn update_grade(&self, id: Uuid, changes: &GradeUpdate) -> StoreResult<Grade>;
    async fn delete_grade(&self, id: Uuid) -> StoreResult<()>;
}
