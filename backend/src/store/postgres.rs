use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::{SchoolStore, CLASS_FORM_IN_USE, DUPLICATE_ASSIGNMENT, DUPLICATE_EMAIL};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Assignment, AssignmentCreate, AssignmentUpdate, ClassForm, ClassFormCreate, ClassFormUpdate,
    Grade, GradeCreate, GradeUpdate, NewUser, Page, Student, StudentCreate, StudentUpdate, Subject,
    SubjectCreate, SubjectUpdate, User, UserChanges,
};

const USER_COLUMNS: &str =
    "id, email, hashed_password, full_name, is_active, is_superuser, is_class_teacher, is_accountant";
const STUDENT_COLUMNS: &str = "id, first_name, middle_name, last_name, contact, fees, \
     class_teacher_remark, head_teacher_remark, form_id, owner_id";
const ASSIGNMENT_COLUMNS: &str = "id, teacher_id, subject_id, class_form_id";
const GRADE_COLUMNS: &str = "id, student_id, subject_id, score, remark";

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, table: &str) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_by_id(&self, table: &str, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn sql_state(err: &sqlx::Error) -> Option<(String, Option<String>)> {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| (code.into_owned(), db_err.constraint().map(str::to_string))),
        _ => None,
    }
}

/// Column named by a foreign key constraint, using the default Postgres naming.
fn reference_field(constraint: &str) -> &'static str {
    match constraint {
        "students_form_id_fkey" => "form_id",
        "students_owner_id_fkey" => "owner_id",
        "assignments_teacher_id_fkey" => "teacher_id",
        "assignments_subject_id_fkey" | "grades_subject_id_fkey" => "subject_id",
        "assignments_class_form_id_fkey" => "class_form_id",
        "grades_student_id_fkey" => "student_id",
        _ => "id",
    }
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    match sql_state(&err) {
        Some((code, constraint)) if code == FOREIGN_KEY_VIOLATION => {
            StoreError::InvalidReference(reference_field(constraint.as_deref().unwrap_or("")))
        }
        _ => StoreError::Database(err),
    }
}

fn map_user_write_error(err: sqlx::Error) -> StoreError {
    match sql_state(&err) {
        Some((code, _)) if code == UNIQUE_VIOLATION => StoreError::Conflict(DUPLICATE_EMAIL.to_string()),
        _ => map_write_error(err),
    }
}

fn map_assignment_write_error(err: sqlx::Error) -> StoreError {
    match sql_state(&err) {
        Some((code, _)) if code == UNIQUE_VIOLATION => {
            StoreError::Conflict(DUPLICATE_ASSIGNMENT.to_string())
        }
        _ => map_write_error(err),
    }
}

#[async_trait(?Send)]
impl SchoolStore for PgStore {
    async fn list_users(&self, skip: i64, limit: i64) -> StoreResult<Page<User>> {
        let count = self.count("users").await?;
        let data = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY email OFFSET $1 LIMIT $2",
            USER_COLUMNS
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { data, count })
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, hashed_password, full_name, is_active, is_superuser, is_class_teacher, is_accountant)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(&user.full_name)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(user.is_class_teacher)
        .bind(user.is_accountant)
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_write_error)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                email = COALESCE($1, email),
                hashed_password = COALESCE($2, hashed_password),
                full_name = COALESCE($3, full_name),
                is_active = COALESCE($4, is_active),
                is_superuser = COALESCE($5, is_superuser),
                is_class_teacher = COALESCE($6, is_class_teacher),
                is_accountant = COALESCE($7, is_accountant)
             WHERE id = $8
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&changes.email)
        .bind(&changes.hashed_password)
        .bind(&changes.full_name)
        .bind(changes.is_active)
        .bind(changes.is_superuser)
        .bind(changes.is_class_teacher)
        .bind(changes.is_accountant)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_user_write_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        self.delete_by_id("users", id).await
    }

    async fn list_class_forms(&self, skip: i64, limit: i64) -> StoreResult<Page<ClassForm>> {
        let count = self.count("class_forms").await?;
        let data = sqlx::query_as::<_, ClassForm>(
            "SELECT id, name FROM class_forms ORDER BY name, id OFFSET $1 LIMIT $2",
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { data, count })
    }

    async fn get_class_form(&self, id: Uuid) -> StoreResult<ClassForm> {
        sqlx::query_as::<_, ClassForm>("SELECT id, name FROM class_forms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn create_class_form(&self, input: &ClassFormCreate) -> StoreResult<ClassForm> {
        let form = sqlx::query_as::<_, ClassForm>(
            "INSERT INTO class_forms (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(form)
    }

    async fn update_class_form(&self, id: Uuid, changes: &ClassFormUpdate) -> StoreResult<ClassForm> {
        sqlx::query_as::<_, ClassForm>(
            "UPDATE class_forms SET name = COALESCE($1, name) WHERE id = $2 RETURNING id, name",
        )
        .bind(&changes.name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_class_form(&self, id: Uuid) -> StoreResult<()> {
        // students.form_id is ON DELETE RESTRICT
        match self.delete_by_id("class_forms", id).await {
            Err(StoreError::InvalidReference(_)) => {
                Err(StoreError::Conflict(CLASS_FORM_IN_USE.to_string()))
            }
            other => other,
        }
    }

    async fn list_subjects(&self, skip: i64, limit: i64) -> StoreResult<Page<Subject>> {
        let count = self.count("subjects").await?;
        let data = sqlx::query_as::<_, Subject>(
            "SELECT id, name FROM subjects ORDER BY name, id OFFSET $1 LIMIT $2",
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { data, count })
    }

    async fn get_subject(&self, id: Uuid) -> StoreResult<Subject> {
        sqlx::query_as::<_, Subject>("SELECT id, name FROM subjects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn create_subject(&self, input: &SubjectCreate) -> StoreResult<Subject> {
        let subject = sqlx::query_as::<_, Subject>(
            "INSERT INTO subjects (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(subject)
    }

    async fn update_subject(&self, id: Uuid, changes: &SubjectUpdate) -> StoreResult<Subject> {
        sqlx::query_as::<_, Subject>(
            "UPDATE subjects SET name = COALESCE($1, name) WHERE id = $2 RETURNING id, name",
        )
        .bind(&changes.name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_subject(&self, id: Uuid) -> StoreResult<()> {
        self.delete_by_id("subjects", id).await
    }

    async fn list_students(&self, skip: i64, limit: i64) -> StoreResult<Page<Student>> {
        let count = self.count("students").await?;
        let data = sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students ORDER BY last_name, first_name, id OFFSET $1 LIMIT $2",
            STUDENT_COLUMNS
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { data, count })
    }

    async fn get_student(&self, id: Uuid) -> StoreResult<Student> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE id = $1",
            STUDENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn create_student(&self, input: &StudentCreate, owner_id: Uuid) -> StoreResult<Student> {
        sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (id, first_name, middle_name, last_name, contact, fees,
                 class_teacher_remark, head_teacher_remark, form_id, owner_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {}",
            STUDENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.first_name)
        .bind(&input.middle_name)
        .bind(&input.last_name)
        .bind(&input.contact)
        .bind(input.fees)
        .bind(&input.class_teacher_remark)
        .bind(&input.head_teacher_remark)
        .bind(input.form_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_student(&self, id: Uuid, changes: &StudentUpdate) -> StoreResult<Student> {
        sqlx::query_as::<_, Student>(&format!(
            "UPDATE students SET
                first_name = COALESCE($1, first_name),
                middle_name = COALESCE($2, middle_name),
                last_name = COALESCE($3, last_name),
                contact = COALESCE($4, contact),
                form_id = COALESCE($5, form_id),
                fees = COALESCE($6, fees),
                class_teacher_remark = COALESCE($7, class_teacher_remark),
                head_teacher_remark = COALESCE($8, head_teacher_remark)
             WHERE id = $9
             RETURNING {}",
            STUDENT_COLUMNS
        ))
        .bind(&changes.first_name)
        .bind(&changes.middle_name)
        .bind(&changes.last_name)
        .bind(&changes.contact)
        .bind(changes.form_id)
        .bind(changes.fees)
        .bind(&changes.class_teacher_remark)
        .bind(&changes.head_teacher_remark)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_student(&self, id: Uuid) -> StoreResult<()> {
        self.delete_by_id("students", id).await
    }

    async fn list_assignments(&self, skip: i64, limit: i64) -> StoreResult<Page<Assignment>> {
        let count = self.count("assignments").await?;
        let data = sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {} FROM assignments ORDER BY class_form_id, subject_id, teacher_id OFFSET $1 LIMIT $2",
            ASSIGNMENT_COLUMNS
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { data, count })
    }

    async fn get_assignment(&self, id: Uuid) -> StoreResult<Assignment> {
        sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {} FROM assignments WHERE id = $1",
            ASSIGNMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn create_assignment(&self, input: &AssignmentCreate) -> StoreResult<Assignment> {
        // No row back means the unique triple already exists
        sqlx::query_as::<_, Assignment>(&format!(
            "INSERT INTO assignments (id, teacher_id, subject_id, class_form_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (teacher_id, subject_id, class_form_id) DO NOTHING
             RETURNING {}",
            ASSIGNMENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.teacher_id)
        .bind(input.subject_id)
        .bind(input.class_form_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_assignment_write_error)?
        .ok_or_else(|| StoreError::Conflict(DUPLICATE_ASSIGNMENT.to_string()))
    }

    async fn update_assignment(&self, id: Uuid, changes: &AssignmentUpdate) -> StoreResult<Assignment> {
        sqlx::query_as::<_, Assignment>(&format!(
            "UPDATE assignments SET
                teacher_id = COALESCE($1, teacher_id),
                subject_id = COALESCE($2, subject_id),
                class_form_id = COALESCE($3, class_form_id)
             WHERE id = $4
             RETURNING {}",
            ASSIGNMENT_COLUMNS
        ))
        .bind(changes.teacher_id)
        .bind(changes.subject_id)
        .bind(changes.class_form_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_assignment_write_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_assignment(&self, id: Uuid) -> StoreResult<()> {
        self.delete_by_id("assignments", id).await
    }

    async fn list_grades(&self, skip: i64, limit: i64) -> StoreResult<Page<Grade>> {
        let count = self.count("grades").await?;
        let data = sqlx::query_as::<_, Grade>(&format!(
            "SELECT {} FROM grades ORDER BY student_id, subject_id OFFSET $1 LIMIT $2",
            GRADE_COLUMNS
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { data, count })
    }

    async fn get_grade(&self, id: Uuid) -> StoreResult<Grade> {
        sqlx::query_as::<_, Grade>(&format!("SELECT {} FROM grades WHERE id = $1", GRADE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn upsert_grade(&self, input: &GradeCreate) -> StoreResult<Grade> {
        sqlx::query_as::<_, Grade>(&format!(
            "INSERT INTO grades (id, student_id, subject_id, score, remark)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (student_id, subject_id)
             DO UPDATE SET score = EXCLUDED.score, remark = EXCLUDED.remark
             RETURNING {}",
            GRADE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.student_id)
        .bind(input.subject_id)
        .bind(input.score)
        .bind(&input.remark)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_grade(&self, id: Uuid, changes: &GradeUpdate) -> StoreResult<Grade> {
        sqlx::query_as::<_, Grade>(&format!(
            "UPDATE grades SET
                score = COALESCE($1, score),
                remark = COALESCE($2, remark)
             WHERE id = $3
             RETURNING {}",
            GRADE_COLUMNS
        ))
        .bind(changes.score)
        .bind(&changes.remark)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_grade(&self, id: Uuid) -> StoreResult<()> {
        self.delete_by_id("grades", id).await
    }
}
