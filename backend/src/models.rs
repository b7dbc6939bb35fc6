use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::FieldError;

pub const DEFAULT_PAGE_LIMIT: i64 = 100;

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_class_teacher: bool,
    pub is_accountant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ClassForm {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub contact: Option<String>,
    pub fees: f64,
    pub class_teacher_remark: Option<String>,
    pub head_teacher_remark: Option<String>,
    pub form_id: Uuid,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub class_form_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Grade {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub score: f64,
    pub remark: Option<String>,
}

/// One page of a listing plus the total number of rows.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ListParams {
    /// Returns `(skip, limit)` with defaults applied.
    pub fn window(&self) -> Result<(i64, i64), Vec<FieldError>> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let mut errors = Vec::new();
        if skip < 0 {
            errors.push(query_error("skip", "ensure this value is greater than or equal to 0"));
        }
        if limit < 0 {
            errors.push(query_error("limit", "ensure this value is greater than or equal to 0"));
        }
        if errors.is_empty() {
            Ok((skip, limit))
        } else {
            Err(errors)
        }
    }
}

fn query_error(field: &str, msg: &str) -> FieldError {
    FieldError {
        loc: vec!["query".to_string(), field.to_string()],
        msg: msg.to_string(),
        kind: "value_error.number.not_ge".to_string(),
    }
}

// ============================================================================
// Request payloads
// ============================================================================

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_class_teacher: bool,
    #[serde(default)]
    pub is_accountant: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_class_teacher: Option<bool>,
    pub is_accountant: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdateMe {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePassword {
    pub current_password: String,
    pub new_password: String,
}

/// A user row ready for insertion; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_class_teacher: bool,
    pub is_accountant: bool,
}

/// Sparse set of user column changes; `None` leaves the column alone.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub hashed_password: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_class_teacher: Option<bool>,
    pub is_accountant: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentCreate {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub contact: Option<String>,
    pub form_id: Uuid,
    #[serde(default)]
    pub fees: f64,
    pub class_teacher_remark: Option<String>,
    pub head_teacher_remark: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUpdate {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub contact: Option<String>,
    pub form_id: Option<Uuid>,
    pub fees: Option<f64>,
    pub class_teacher_remark: Option<String>,
    pub head_teacher_remark: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradeCreate {
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub score: f64,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GradeUpdate {
    pub score: Option<f64>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectCreate {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassFormCreate {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassFormUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentCreate {
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub class_form_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentUpdate {
    pub teacher_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub class_form_id: Option<Uuid>,
}

// ============================================================================
// Field validation
// ============================================================================

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

#[derive(Default)]
struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.errors.push(FieldError::body(
                field,
                format!("ensure this value has at least {} characters", min),
                "value_error.any_str.min_length",
            ));
        } else if len > max {
            self.errors.push(FieldError::body(
                field,
                format!("ensure this value has at most {} characters", max),
                "value_error.any_str.max_length",
            ));
        }
    }

    fn optional_length(&mut self, field: &str, value: &Option<String>, min: usize, max: usize) {
        if let Some(value) = value {
            self.length(field, value, min, max);
        }
    }

    fn email(&mut self, field: &str, value: &str) {
        self.length(field, value, 3, 255);
        if !is_valid_email(value) {
            self.errors.push(FieldError::body(
                field,
                "value is not a valid email address",
                "value_error.email",
            ));
        }
    }

    fn finite(&mut self, field: &str, value: f64) {
        if !value.is_finite() {
            self.errors.push(FieldError::body(field, "value is not a valid number", "type_error.float"));
        }
    }

    fn score(&mut self, field: &str, value: f64) {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            self.errors.push(FieldError::body(
                field,
                "ensure this value is between 0 and 100",
                "value_error.number.out_of_range",
            ));
        }
    }

    fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

const NAME_MAX: usize = 255;
const REMARK_MAX: usize = 500;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 40;

impl Validate for UserCreate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        checks.email("email", &self.email);
        checks.length("password", &self.password, PASSWORD_MIN, PASSWORD_MAX);
        checks.optional_length("full_name", &self.full_name, 0, NAME_MAX);
        checks.finish()
    }
}

impl Validate for UserUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        if let Some(email) = &self.email {
            checks.email("email", email);
        }
        checks.optional_length("password", &self.password, PASSWORD_MIN, PASSWORD_MAX);
        checks.optional_length("full_name", &self.full_name, 0, NAME_MAX);
        checks.finish()
    }
}

impl Validate for UserUpdateMe {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        if let Some(email) = &self.email {
            checks.email("email", email);
        }
        checks.optional_length("full_name", &self.full_name, 0, NAME_MAX);
        checks.finish()
    }
}

impl Validate for UpdatePassword {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        checks.length("current_password", &self.current_password, PASSWORD_MIN, PASSWORD_MAX);
        checks.length("new_password", &self.new_password, PASSWORD_MIN, PASSWORD_MAX);
        checks.finish()
    }
}

impl Validate for StudentCreate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        checks.length("first_name", &self.first_name, 2, NAME_MAX);
        checks.optional_length("middle_name", &self.middle_name, 2, NAME_MAX);
        checks.length("last_name", &self.last_name, 2, NAME_MAX);
        checks.optional_length("contact", &self.contact, 10, NAME_MAX);
        checks.finite("fees", self.fees);
        checks.optional_length("class_teacher_remark", &self.class_teacher_remark, 0, REMARK_MAX);
        checks.optional_length("head_teacher_remark", &self.head_teacher_remark, 0, REMARK_MAX);
        checks.finish()
    }
}

impl Validate for StudentUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        checks.optional_length("first_name", &self.first_name, 2, NAME_MAX);
        checks.optional_length("middle_name", &self.middle_name, 2, NAME_MAX);
        checks.optional_length("last_name", &self.last_name, 2, NAME_MAX);
        checks.optional_length("contact", &self.contact, 10, NAME_MAX);
        if let Some(fees) = self.fees {
            checks.finite("fees", fees);
        }
        checks.optional_length("class_teacher_remark", &self.class_teacher_remark, 0, REMARK_MAX);
        checks.optional_length("head_teacher_remark", &self.head_teacher_remark, 0, REMARK_MAX);
        checks.finish()
    }
}

impl Validate for GradeCreate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        checks.score("score", self.score);
        checks.optional_length("remark", &self.remark, 0, REMARK_MAX);
        checks.finish()
    }
}

impl Validate for GradeUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        if let Some(score) = self.score {
            checks.score("score", score);
        }
        checks.optional_length("remark", &self.remark, 0, REMARK_MAX);
        checks.finish()
    }
}

impl Validate for SubjectCreate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        checks.length("name", &self.name, 1, NAME_MAX);
        checks.finish()
    }
}

impl Validate for SubjectUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        checks.optional_length("name", &self.name, 1, NAME_MAX);
        checks.finish()
    }
}

impl Validate for ClassFormCreate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        checks.length("name", &self.name, 1, NAME_MAX);
        checks.finish()
    }
}

impl Validate for ClassFormUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        checks.optional_length("name", &self.name, 1, NAME_MAX);
        checks.finish()
    }
}

// ============================================================================
// Applying partial updates
// ============================================================================

impl Student {
    pub fn apply(&mut self, changes: &StudentUpdate) {
        if let Some(first_name) = &changes.first_name {
            self.first_name = first_name.clone();
        }
        if let Some(middle_name) = &changes.middle_name {
            self.middle_name = Some(middle_name.clone());
        }
        if let Some(last_name) = &changes.last_name {
            self.last_name = last_name.clone();
        }
        if let Some(contact) = &changes.contact {
            self.contact = Some(contact.clone());
        }
        if let Some(form_id) = changes.form_id {
            self.form_id = form_id;
        }
        if let Some(fees) = changes.fees {
            self.fees = fees;
        }
        if let Some(remark) = &changes.class_teacher_remark {
            self.class_teacher_remark = Some(remark.clone());
        }
        if let Some(remark) = &changes.head_teacher_remark {
            self.head_teacher_remark = Some(remark.clone());
        }
    }
}

impl Grade {
    pub fn apply(&mut self, changes: &GradeUpdate) {
        if let Some(score) = changes.score {
            self.score = score;
        }
        if let Some(remark) = &changes.remark {
            self.remark = Some(remark.clone());
        }
    }
}

impl Assignment {
    pub fn apply(&mut self, changes: &AssignmentUpdate) {
        if let Some(teacher_id) = changes.teacher_id {
            self.teacher_id = teacher_id;
        }
        if let Some(subject_id) = changes.subject_id {
            self.subject_id = subject_id;
        }
        if let Some(class_form_id) = changes.class_form_id {
            self.class_form_id = class_form_id;
        }
    }
}

impl User {
    pub fn apply(&mut self, changes: &UserChanges) {
        if let Some(email) = &changes.email {
            self.email = email.clone();
        }
        if let Some(hashed_password) = &changes.hashed_password {
            self.hashed_password = hashed_password.clone();
        }
        if let Some(full_name) = &changes.full_name {
            self.full_name = Some(full_name.clone());
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
        if let Some(is_superuser) = changes.is_superuser {
            self.is_superuser = is_superuser;
        }
        if let Some(is_class_teacher) = changes.is_class_teacher {
            self.is_class_teacher = is_class_teacher;
        }
        if let Some(is_accountant) = changes.is_accountant {
            self.is_accountant = is_accountant;
        }
    }
}
