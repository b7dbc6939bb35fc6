use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SchoolStore, CLASS_FORM_IN_USE, DUPLICATE_ASSIGNMENT, DUPLICATE_EMAIL};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Assignment, AssignmentCreate, AssignmentUpdate, ClassForm, ClassFormCreate, ClassFormUpdate,
    Grade, GradeCreate, GradeUpdate, NewUser, Page, Student, StudentCreate, StudentUpdate, Subject,
    SubjectCreate, SubjectUpdate, User, UserChanges,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    class_forms: Vec<ClassForm>,
    subjects: Vec<Subject>,
    students: Vec<Student>,
    assignments: Vec<Assignment>,
    grades: Vec<Grade>,
}

impl Tables {
    fn has_user(&self, id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn has_class_form(&self, id: Uuid) -> bool {
        self.class_forms.iter().any(|f| f.id == id)
    }

    fn has_subject(&self, id: Uuid) -> bool {
        self.subjects.iter().any(|s| s.id == id)
    }

    fn has_student(&self, id: Uuid) -> bool {
        self.students.iter().any(|s| s.id == id)
    }

    fn check_assignment_refs(&self, assignment: &Assignment) -> StoreResult<()> {
        if !self.has_user(assignment.teacher_id) {
            return Err(StoreError::InvalidReference("teacher_id"));
        }
        if !self.has_subject(assignment.subject_id) {
            return Err(StoreError::InvalidReference("subject_id"));
        }
        if !self.has_class_form(assignment.class_form_id) {
            return Err(StoreError::InvalidReference("class_form_id"));
        }
        Ok(())
    }

    fn assignment_taken(&self, candidate: &Assignment) -> bool {
        self.assignments.iter().any(|a| {
            a.id != candidate.id
                && a.teacher_id == candidate.teacher_id
                && a.subject_id == candidate.subject_id
                && a.class_form_id == candidate.class_form_id
        })
    }

    fn remove_students_where(&mut self, doomed: impl Fn(&Student) -> bool) {
        let removed: Vec<Uuid> = self
            .students
            .iter()
            .filter(|s| doomed(s))
            .map(|s| s.id)
            .collect();
        self.students.retain(|s| !removed.contains(&s.id));
        self.grades.retain(|g| !removed.contains(&g.student_id));
    }
}

fn page<T: Clone>(rows: &[T], skip: i64, limit: i64) -> Page<T> {
    let data = rows
        .iter()
        .skip(skip.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect();
    Page {
        data,
        count: rows.len() as i64,
    }
}

fn find<T: Clone>(rows: &[T], matches: impl Fn(&T) -> bool) -> StoreResult<T> {
    rows.iter().find(|row| matches(row)).cloned().ok_or(StoreError::NotFound)
}

fn remove<T>(rows: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> StoreResult<()> {
    let before = rows.len();
    rows.retain(|row| !matches(row));
    if rows.len() == before {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Process-local store keeping every table behind one lock.
///
/// Rows are listed in insertion order. Writers take the lock exclusively, so
/// the uniqueness checks and the grade upsert cannot interleave.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl SchoolStore for MemoryStore {
    async fn list_users(&self, skip: i64, limit: i64) -> StoreResult<Page<User>> {
        Ok(page(&self.tables.read().await.users, skip, limit))
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        find(&self.tables.read().await.users, |u| u.id == id)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(DUPLICATE_EMAIL.to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            hashed_password: user.hashed_password,
            full_name: user.full_name,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            is_class_teacher: user.is_class_teacher,
            is_accountant: user.is_accountant,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if !tables.has_user(id) {
            return Err(StoreError::NotFound);
        }
        if let Some(email) = &changes.email {
            if tables.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Conflict(DUPLICATE_EMAIL.to_string()));
            }
        }

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        user.apply(&changes);
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        remove(&mut tables.users, |u| u.id == id)?;
        tables.remove_students_where(|s| s.owner_id == id);
        tables.assignments.retain(|a| a.teacher_id != id);
        Ok(())
    }

    async fn list_class_forms(&self, skip: i64, limit: i64) -> StoreResult<Page<ClassForm>> {
        Ok(page(&self.tables.read().await.class_forms, skip, limit))
    }

    async fn get_class_form(&self, id: Uuid) -> StoreResult<ClassForm> {
        find(&self.tables.read().await.class_forms, |f| f.id == id)
    }

    async fn create_class_form(&self, input: &ClassFormCreate) -> StoreResult<ClassForm> {
        let form = ClassForm {
            id: Uuid::new_v4(),
            name: input.name.clone(),
        };
        self.tables.write().await.class_forms.push(form.clone());
        Ok(form)
    }

    async fn update_class_form(&self, id: Uuid, changes: &ClassFormUpdate) -> StoreResult<ClassForm> {
        let mut tables = self.tables.write().await;
        let form = tables
            .class_forms
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(name) = &changes.name {
            form.name = name.clone();
        }
        Ok(form.clone())
    }

    async fn delete_class_form(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.has_class_form(id) {
            return Err(StoreError::NotFound);
        }
        if tables.students.iter().any(|s| s.form_id == id) {
            return Err(StoreError::Conflict(CLASS_FORM_IN_USE.to_string()));
        }
        tables.class_forms.retain(|f| f.id != id);
        tables.assignments.retain(|a| a.class_form_id != id);
        Ok(())
    }

    async fn list_subjects(&self, skip: i64, limit: i64) -> StoreResult<Page<Subject>> {
        Ok(page(&self.tables.read().await.subjects, skip, limit))
    }

    async fn get_subject(&self, id: Uuid) -> StoreResult<Subject> {
        find(&self.tables.read().await.subjects, |s| s.id == id)
    }

    async fn create_subject(&self, input: &SubjectCreate) -> StoreResult<Subject> {
        let subject = Subject {
            id: Uuid::new_v4(),
            name: input.name.clone(),
        };
        self.tables.write().await.subjects.push(subject.clone());
        Ok(subject)
    }

    async fn update_subject(&self, id: Uuid, changes: &SubjectUpdate) -> StoreResult<Subject> {
        let mut tables = self.tables.write().await;
        let subject = tables
            .subjects
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(name) = &changes.name {
            subject.name = name.clone();
        }
        Ok(subject.clone())
    }

    async fn delete_subject(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        remove(&mut tables.subjects, |s| s.id == id)?;
        tables.grades.retain(|g| g.subject_id != id);
        tables.assignments.retain(|a| a.subject_id != id);
        Ok(())
    }

    async fn list_students(&self, skip: i64, limit: i64) -> StoreResult<Page<Student>> {
        Ok(page(&self.tables.read().await.students, skip, limit))
    }

    async fn get_student(&self, id: Uuid) -> StoreResult<Student> {
        find(&self.tables.read().await.students, |s| s.id == id)
    }

    async fn create_student(&self, input: &StudentCreate, owner_id: Uuid) -> StoreResult<Student> {
        let mut tables = self.tables.write().await;
        if !tables.has_class_form(input.form_id) {
            return Err(StoreError::InvalidReference("form_id"));
        }
        if !tables.has_user(owner_id) {
            return Err(StoreError::InvalidReference("owner_id"));
        }

        let student = Student {
            id: Uuid::new_v4(),
            first_name: input.first_name.clone(),
            middle_name: input.middle_name.clone(),
            last_name: input.last_name.clone(),
            contact: input.contact.clone(),
            fees: input.fees,
            class_teacher_remark: input.class_teacher_remark.clone(),
            head_teacher_remark: input.head_teacher_remark.clone(),
            form_id: input.form_id,
            owner_id,
        };
        tables.students.push(student.clone());
        Ok(student)
    }

    async fn update_student(&self, id: Uuid, changes: &StudentUpdate) -> StoreResult<Student> {
        let mut tables = self.tables.write().await;
        if !tables.has_student(id) {
            return Err(StoreError::NotFound);
        }
        if let Some(form_id) = changes.form_id {
            if !tables.has_class_form(form_id) {
                return Err(StoreError::InvalidReference("form_id"));
            }
        }

        let student = tables
            .students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::NotFound)?;
        student.apply(changes);
        Ok(student.clone())
    }

    async fn delete_student(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        remove(&mut tables.students, |s| s.id == id)?;
        tables.grades.retain(|g| g.student_id != id);
        Ok(())
    }

    async fn list_assignments(&self, skip: i64, limit: i64) -> StoreResult<Page<Assignment>> {
        Ok(page(&self.tables.read().await.assignments, skip, limit))
    }

    async fn get_assignment(&self, id: Uuid) -> StoreResult<Assignment> {
        find(&self.tables.read().await.assignments, |a| a.id == id)
    }

    async fn create_assignment(&self, input: &AssignmentCreate) -> StoreResult<Assignment> {
        let mut tables = self.tables.write().await;
        let assignment = Assignment {
            id: Uuid::new_v4(),
            teacher_id: input.teacher_id,
            subject_id: input.subject_id,
            class_form_id: input.class_form_id,
        };
        tables.check_assignment_refs(&assignment)?;
        if tables.assignment_taken(&assignment) {
            return Err(StoreError::Conflict(DUPLICATE_ASSIGNMENT.to_string()));
        }

        tables.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(&self, id: Uuid, changes: &AssignmentUpdate) -> StoreResult<Assignment> {
        let mut tables = self.tables.write().await;
        let mut updated = find(&tables.assignments, |a| a.id == id)?;
        updated.apply(changes);
        tables.check_assignment_refs(&updated)?;
        if tables.assignment_taken(&updated) {
            return Err(StoreError::Conflict(DUPLICATE_ASSIGNMENT.to_string()));
        }

        if let Some(slot) = tables.assignments.iter_mut().find(|a| a.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    async fn delete_assignment(&self, id: Uuid) -> StoreResult<()> {
        remove(&mut self.tables.write().await.assignments, |a| a.id == id)
    }

    async fn list_grades(&self, skip: i64, limit: i64) -> StoreResult<Page<Grade>> {
        Ok(page(&self.tables.read().await.grades, skip, limit))
    }

    async fn get_grade(&self, id: Uuid) -> StoreResult<Grade> {
        find(&self.tables.read().await.grades, |g| g.id == id)
    }

    async fn upsert_grade(&self, input: &GradeCreate) -> StoreResult<Grade> {
        let mut tables = self.tables.write().await;
        if !tables.has_student(input.student_id) {
            return Err(StoreError::InvalidReference("student_id"));
        }
        if !tables.has_subject(input.subject_id) {
            return Err(StoreError::InvalidReference("subject_id"));
        }

        if let Some(existing) = tables
            .grades
            .iter_mut()
            .find(|g| g.student_id == input.student_id && g.subject_id == input.subject_id)
        {
            existing.score = input.score;
            existing.remark = input.remark.clone();
            return Ok(existing.clone());
        }

        let grade = Grade {
            id: Uuid::new_v4(),
            student_id: input.student_id,
            subject_id: input.subject_id,
            score: input.score,
            remark: input.remark.clone(),
        };
        tables.grades.push(grade.clone());
        Ok(grade)
    }

    async fn update_grade(&self, id: Uuid, changes: &GradeUpdate) -> StoreResult<Grade> {
        let mut tables = self.tables.write().await;
        let grade = tables
            .grades
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound)?;
        grade.apply(changes);
        Ok(grade.clone())
    }

    async fn delete_grade(&self, id: Uuid) -> StoreResult<()> {
        remove(&mut self.tables.write().await.grades, |g| g.id == id)
    }
}
