//! Per-entity repository over the line store and codec.
//!
//! Every mutation is a read-modify-write of a whole table file. The
//! repository owns one mutex per table and holds it for the duration of each
//! mutating call, so writers inside one process are serialised per table.
//! Separate processes writing the same data directory are not coordinated;
//! callers deploying that way must hold an external lock.
//!
//! Reads take no lock. With `atomic_writes` enabled a reader always sees
//! either the old or the new file; without it a reader can observe a
//! partially rewritten file.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::model::{
    Assessment, Class, Enrollment, Feedback, Grade, GradeBand, LeaderLecturer, Lecturer, Module,
    Student, User, LEADER_LECTURER_LIMIT,
};
use crate::storage::codec::{decode_all, decode_line, encode_line, Decoded, Record};
use crate::storage::schema::StudentJoin;
use crate::storage::{keys_match, LineStore, Table};

/// Records identified by an `(assessment_id, student_id)` pair.
pub trait CompositeKeyed: Record<Context = ()> {
    /// `(assessment_id, student_id)`.
    fn composite_key(&self) -> (&str, &str);

    /// Patch blank fields of `self` with the values in `stored`.
    fn merge_from(&mut self, stored: &Self);

    /// Fill generated ids and dates that are still blank.
    fn fill_defaults(&mut self);

    fn matches_key(&self, assessment_id: &str, student_id: &str) -> bool {
        let (a, s) = self.composite_key();
        keys_match(a, assessment_id) && keys_match(s, student_id)
    }
}

/// Result of a composite-key upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// No row had the key; the record was appended.
    Inserted,
    /// The first row with the key was patched; `collapsed` later duplicates
    /// were dropped.
    Updated { collapsed: usize },
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn keep_or(incoming: &mut String, stored: &str) {
    if incoming.trim().is_empty() {
        *incoming = stored.to_string();
    }
}

impl CompositeKeyed for Grade {
    fn composite_key(&self) -> (&str, &str) {
        (&self.assessment_id, &self.student_id)
    }

    fn merge_from(&mut self, stored: &Self) {
        keep_or(&mut self.grade_id, &stored.grade_id);
        if self.marks.is_none() {
            self.marks = stored.marks;
        }
        keep_or(&mut self.grade, &stored.grade);
        keep_or(&mut self.lecturer_id, &stored.lecturer_id);
        keep_or(&mut self.date_entered, &stored.date_entered);
    }

    fn fill_defaults(&mut self) {
        if self.grade_id.trim().is_empty() {
            self.grade_id = format!("grd_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        }
        if self.date_entered.trim().is_empty() {
            self.date_entered = today();
        }
    }
}

impl CompositeKeyed for Feedback {
    fn composite_key(&self) -> (&str, &str) {
        (&self.assessment_id, &self.student_id)
    }

    fn merge_from(&mut self, stored: &Self) {
        keep_or(&mut self.feedback_id, &stored.feedback_id);
        keep_or(&mut self.lecturer_id, &stored.lecturer_id);
        keep_or(&mut self.text, &stored.text);
        keep_or(&mut self.date, &stored.date);
    }

    fn fill_defaults(&mut self) {
        if self.feedback_id.trim().is_empty() {
            self.feedback_id = format!("fbk_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        }
        if self.date.trim().is_empty() {
            self.date = today();
        }
    }
}

/// Flat-file repository for every table.
#[derive(Debug)]
pub struct Repository {
    config: StoreConfig,
    lines: LineStore,
    locks: [Mutex<()>; Table::ALL.len()],
}

impl Repository {
    /// Open a repository over `config.data_dir`. No file is touched.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let lines = LineStore::new(config.delimiter, config.atomic_writes);
        Self {
            config,
            lines,
            locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn path(&self, table: Table) -> PathBuf {
        self.config.path(table)
    }

    /// Band table path: the primary file, or the legacy name when only that
    /// one exists.
    #[must_use]
    pub fn band_path(&self) -> PathBuf {
        let primary = self.path(Table::GradeBands);
        if primary.exists() {
            return primary;
        }
        let legacy = self.config.legacy_band_path();
        if legacy.exists() {
            debug!(path = %legacy.display(), "Using legacy band table");
            return legacy;
        }
        primary
    }

    fn lock(&self, table: Table) -> MutexGuard<'_, ()> {
        self.locks[table as usize]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn table_path<T: Record>(&self) -> PathBuf {
        if T::TABLE == Table::GradeBands {
            self.band_path()
        } else {
            self.path(T::TABLE)
        }
    }

    // ── Generic operations ────────────────────────────────────

    /// Decode every row of `T`'s table, keeping the generation that matched.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists and cannot be read.
    pub fn load_tagged<T: Record>(&self, ctx: &T::Context) -> Result<Vec<Decoded<T>>> {
        let raw = self.lines.read_all(&self.table_path::<T>())?;
        let (rows, _report) = decode_all::<T>(&raw, self.config.delimiter, ctx);
        Ok(rows)
    }

    /// Decode every row of `T`'s table. Malformed rows are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists and cannot be read.
    pub fn load<T: Record>(&self, ctx: &T::Context) -> Result<Vec<T>> {
        Ok(self
            .load_tagged(ctx)?
            .into_iter()
            .map(|d| d.record)
            .collect())
    }

    fn load_all<T: Record<Context = ()>>(&self) -> Result<Vec<T>> {
        self.load(&())
    }

    /// Append one record in canonical layout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Write` if the append fails.
    pub fn append<T: Record>(&self, record: &T) -> Result<()> {
        let _guard = self.lock(T::TABLE);
        self.lines.append(
            &self.path(T::TABLE),
            &encode_line(record, self.config.delimiter),
        )
    }

    /// Build a record from the current rows and append it, holding the table
    /// lock across both steps so the check and the write cannot interleave
    /// with another writer in this process.
    ///
    /// # Errors
    ///
    /// Returns whatever `build` rejects with, or a write error.
    pub fn append_with<T, F>(&self, build: F) -> Result<T>
    where
        T: Record<Context = ()>,
        F: FnOnce(&[T]) -> Result<T>,
    {
        let _guard = self.lock(T::TABLE);
        let existing = self.load_all::<T>()?;
        let record = build(&existing)?;
        self.lines.append(
            &self.path(T::TABLE),
            &encode_line(&record, self.config.delimiter),
        )?;
        Ok(record)
    }

    /// Replace the first row whose leading field equals `key`.
    /// Returns `false` (file untouched) if no row matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rewritten.
    pub fn update_by_key<T: Record>(&self, key: &str, record: &T) -> Result<bool> {
        let _guard = self.lock(T::TABLE);
        self.lines.update_by_id(
            &self.path(T::TABLE),
            key,
            &encode_line(record, self.config.delimiter),
        )
    }

    /// Remove every row whose leading field equals `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rewritten.
    pub fn delete_by_key(&self, table: Table, key: &str) -> Result<usize> {
        let _guard = self.lock(table);
        let removed = self.lines.delete_by_id(&self.path(table), key)?;
        if removed > 0 {
            info!(%table, key, removed, "Deleted rows");
        }
        Ok(removed)
    }

    /// Decode, transform in memory, and rewrite the whole table in canonical
    /// layout. Rows that fail to decode are dropped by the rewrite.
    ///
    /// `transform` returns whether anything changed; nothing is written
    /// otherwise.
    fn rewrite_decoded<T, F>(&self, transform: F) -> Result<bool>
    where
        T: Record<Context = ()>,
        F: FnOnce(&mut Vec<T>) -> bool,
    {
        let _guard = self.lock(T::TABLE);
        let mut rows = self.load_all::<T>()?;
        if !transform(&mut rows) {
            return Ok(false);
        }
        let encoded: Vec<String> = rows
            .iter()
            .map(|r| encode_line(r, self.config.delimiter))
            .collect();
        self.lines.rewrite(&self.path(T::TABLE), &encoded)?;
        Ok(true)
    }

    /// Insert-or-patch by composite key.
    ///
    /// 1. The first row whose key matches (case-insensitive) is the target.
    /// 2. Blank fields of `incoming` take the target's stored values.
    /// 3. Later rows with the same key are dropped.
    /// 4. With no match, `incoming` is appended with defaults filled in.
    ///
    /// Rows with other keys, including rows that fail to decode, are written
    /// back verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or written.
    pub fn upsert<T: CompositeKeyed>(&self, mut incoming: T) -> Result<(T, UpsertOutcome)> {
        let _guard = self.lock(T::TABLE);
        let path = self.path(T::TABLE);
        let delimiter = self.config.delimiter;
        let (assessment_id, student_id) = {
            let (a, s) = incoming.composite_key();
            (a.to_string(), s.to_string())
        };

        let raw = self.lines.read_all(&path)?;
        let mut out = Vec::with_capacity(raw.len() + 1);
        let mut matched = false;
        let mut collapsed = 0;

        for line in raw {
            match decode_line::<T>(&line, delimiter, &()) {
                Ok(stored) if stored.record.matches_key(&assessment_id, &student_id) => {
                    if matched {
                        collapsed += 1;
                        continue;
                    }
                    incoming.merge_from(&stored.record);
                    incoming.fill_defaults();
                    out.push(encode_line(&incoming, delimiter));
                    matched = true;
                }
                _ => out.push(line),
            }
        }

        if matched {
            self.lines.rewrite(&path, &out)?;
            info!(table = %T::TABLE, %assessment_id, %student_id, collapsed, "Updated row");
            return Ok((incoming, UpsertOutcome::Updated { collapsed }));
        }

        incoming.fill_defaults();
        self.lines.append(&path, &encode_line(&incoming, delimiter))?;
        info!(table = %T::TABLE, %assessment_id, %student_id, "Inserted row");
        Ok((incoming, UpsertOutcome::Inserted))
    }

    // ── Users ─────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.load_all()
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn find_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.list_users()?.into_iter().find(|u| keys_match(&u.id, id)))
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .list_users()?
            .into_iter()
            .find(|u| keys_match(&u.profile.username, username)))
    }

    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn save_user(&self, user: &User) -> Result<()> {
        self.append(user)
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be rewritten.
    pub fn update_user(&self, user: &User) -> Result<bool> {
        self.update_by_key(&user.id, user)
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be rewritten.
    pub fn delete_user(&self, id: &str) -> Result<usize> {
        self.delete_by_key(Table::Users, id)
    }

    // ── Lecturers ─────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn list_lecturers(&self) -> Result<Vec<Lecturer>> {
        self.load_all()
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn find_lecturer(&self, username: &str) -> Result<Option<Lecturer>> {
        Ok(self
            .list_lecturers()?
            .into_iter()
            .find(|l| keys_match(&l.profile.username, username)))
    }

    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn save_lecturer(&self, lecturer: &Lecturer) -> Result<()> {
        self.append(lecturer)
    }

    /// Rewrite the lecturer row keyed by its username. Does not insert.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be rewritten.
    pub fn update_lecturer(&self, lecturer: &Lecturer) -> Result<bool> {
        self.update_by_key(&lecturer.profile.username, lecturer)
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be rewritten.
    pub fn delete_lecturer(&self, username: &str) -> Result<usize> {
        self.delete_by_key(Table::Lecturers, username)
    }

    // ── Students ──────────────────────────────────────────────

    /// Build the join tables student layouts resolve against.
    ///
    /// # Errors
    ///
    /// Returns an error if a joined table cannot be read.
    pub fn student_join(&self) -> Result<StudentJoin> {
        Ok(StudentJoin::new(
            self.list_users()?,
            self.list_enrollments()?,
            self.list_classes()?,
        ))
    }

    /// Students from every stored layout, names and modules resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be read.
    pub fn list_students(&self) -> Result<Vec<Student>> {
        let join = self.student_join()?;
        self.load(&join)
    }

    /// # Errors
    ///
    /// Returns an error if a table cannot be read.
    pub fn list_students_tagged(&self) -> Result<Vec<Decoded<Student>>> {
        let join = self.student_join()?;
        self.load_tagged(&join)
    }

    /// Find by username or student id.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be read.
    pub fn find_student(&self, key: &str) -> Result<Option<Student>> {
        Ok(self.list_students()?.into_iter().find(|s| {
            keys_match(&s.profile.username, key) || keys_match(&s.student_id, key)
        }))
    }

    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn save_student(&self, student: &Student) -> Result<()> {
        self.append(student)
    }

    /// Remove rows whose leading field (username, or student id in older
    /// layouts) equals `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be rewritten.
    pub fn delete_student(&self, key: &str) -> Result<usize> {
        self.delete_by_key(Table::Students, key)
    }

    // ── Modules ───────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn list_modules(&self) -> Result<Vec<Module>> {
        self.load_all()
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn find_module(&self, module_id: &str) -> Result<Option<Module>> {
        Ok(self
            .list_modules()?
            .into_iter()
            .find(|m| keys_match(&m.module_id, module_id)))
    }

    /// Modules owned by `leader_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn modules_for_leader(&self, leader_id: &str) -> Result<Vec<Module>> {
        Ok(self
            .list_modules()?
            .into_iter()
            .filter(|m| keys_match(&m.leader_id, leader_id))
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn save_module(&self, module: &Module) -> Result<()> {
        self.append(module)
    }

    /// Rewrite the module row keyed by its id. Does not insert.
    ///
    /// Changing `lecturer_id` here bypasses the lecturer-side copy; use
    /// [`ModuleService`](crate::sync::ModuleService) for assignments.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be rewritten.
    pub fn update_module(&self, module: &Module) -> Result<bool> {
        self.update_by_key(&module.module_id, module)
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be rewritten.
    pub fn delete_module(&self, module_id: &str) -> Result<usize> {
        self.delete_by_key(Table::Modules, module_id)
    }

    // ── Assessments ───────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn list_assessments(&self) -> Result<Vec<Assessment>> {
        self.load_all()
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn assessments_for_module(&self, module_id: &str) -> Result<Vec<Assessment>> {
        Ok(self
            .list_assessments()?
            .into_iter()
            .filter(|a| keys_match(&a.module_id, module_id))
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn find_assessment(&self, assessment_id: &str) -> Result<Option<Assessment>> {
        Ok(self
            .list_assessments()?
            .into_iter()
            .find(|a| keys_match(&a.assessment_id, assessment_id)))
    }

    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn save_assessment(&self, assessment: &Assessment) -> Result<()> {
        self.append(assessment)
    }

    /// Replace the assessment with the same id. Full load, in-memory replace,
    /// full canonical rewrite. Returns `false` if no row had the id.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or rewritten.
    pub fn update_assessment(&self, assessment: &Assessment) -> Result<bool> {
        self.rewrite_decoded::<Assessment, _>(|rows| {
            let mut found = false;
            for row in rows.iter_mut() {
                if keys_match(&row.assessment_id, &assessment.assessment_id) {
                    *row = assessment.clone();
                    found = true;
                }
            }
            found
        })
    }

    /// Remove the assessment with `assessment_id`. Full load, filter, full
    /// canonical rewrite. Returns `false` if no row had the id.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or rewritten.
    pub fn delete_assessment(&self, assessment_id: &str) -> Result<bool> {
        self.rewrite_decoded::<Assessment, _>(|rows| {
            let before = rows.len();
            rows.retain(|a| !keys_match(&a.assessment_id, assessment_id));
            rows.len() != before
        })
    }

    // ── Grades ────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn list_grades(&self) -> Result<Vec<Grade>> {
        self.load_all()
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn grades_for_student(&self, student_id: &str) -> Result<Vec<Grade>> {
        Ok(self
            .list_grades()?
            .into_iter()
            .filter(|g| keys_match(&g.student_id, student_id))
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn grades_for_assessment(&self, assessment_id: &str) -> Result<Vec<Grade>> {
        Ok(self
            .list_grades()?
            .into_iter()
            .filter(|g| keys_match(&g.assessment_id, assessment_id))
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn find_grade(&self, assessment_id: &str, student_id: &str) -> Result<Option<Grade>> {
        Ok(self
            .list_grades()?
            .into_iter()
            .find(|g| g.matches_key(assessment_id, student_id)))
    }

    /// Upsert a grade by `(assessment_id, student_id)`; see [`Self::upsert`].
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or written.
    pub fn save_or_update_grade(&self, grade: Grade) -> Result<(Grade, UpsertOutcome)> {
        self.upsert(grade)
    }

    // ── Feedback ──────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn list_feedback(&self) -> Result<Vec<Feedback>> {
        self.load_all()
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn feedback_for_student(&self, student_id: &str) -> Result<Vec<Feedback>> {
        Ok(self
            .list_feedback()?
            .into_iter()
            .filter(|f| keys_match(&f.student_id, student_id))
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn find_feedback(
        &self,
        assessment_id: &str,
        student_id: &str,
    ) -> Result<Option<Feedback>> {
        Ok(self
            .list_feedback()?
            .into_iter()
            .find(|f| f.matches_key(assessment_id, student_id)))
    }

    /// Upsert feedback by `(assessment_id, student_id)`; see [`Self::upsert`].
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or written.
    pub fn save_or_update_feedback(&self, feedback: Feedback) -> Result<(Feedback, UpsertOutcome)> {
        self.upsert(feedback)
    }

    // ── Classes and enrollment ────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn list_classes(&self) -> Result<Vec<Class>> {
        self.load_all()
    }

    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn save_class(&self, class: &Class) -> Result<()> {
        self.append(class)
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be rewritten.
    pub fn delete_class(&self, class_id: &str) -> Result<usize> {
        self.delete_by_key(Table::Classes, class_id)
    }

    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn list_enrollments(&self) -> Result<Vec<Enrollment>> {
        self.load_all()
    }

    /// Enroll a student in a class. Returns `false` if already enrolled.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or written.
    pub fn enroll(&self, student_id: &str, class_id: &str) -> Result<bool> {
        let _guard = self.lock(Table::StudentClasses);
        let existing = self.load_all::<Enrollment>()?;
        if existing
            .iter()
            .any(|e| keys_match(&e.student_id, student_id) && keys_match(&e.class_id, class_id))
        {
            return Ok(false);
        }
        let row = Enrollment {
            student_id: student_id.to_string(),
            class_id: class_id.to_string(),
        };
        self.lines.append(
            &self.path(Table::StudentClasses),
            &encode_line(&row, self.config.delimiter),
        )?;
        Ok(true)
    }

    /// Remove one enrollment. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or rewritten.
    pub fn unenroll(&self, student_id: &str, class_id: &str) -> Result<bool> {
        self.rewrite_decoded::<Enrollment, _>(|rows| {
            let before = rows.len();
            rows.retain(|e| {
                !(keys_match(&e.student_id, student_id) && keys_match(&e.class_id, class_id))
            });
            rows.len() != before
        })
    }

    // ── Leader allow-list ─────────────────────────────────────

    /// Lecturer ids `leader_id` may assign, in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn lecturers_for_leader(&self, leader_id: &str) -> Result<Vec<String>> {
        Ok(self
            .load_all::<LeaderLecturer>()?
            .into_iter()
            .filter(|row| keys_match(&row.leader_id, leader_id))
            .map(|row| row.lecturer_id)
            .collect())
    }

    /// Add a lecturer to a leader's list. Returns `false` if already present.
    ///
    /// # Errors
    ///
    /// Returns `Error::LeaderLecturerLimit` if the leader already has
    /// [`LEADER_LECTURER_LIMIT`] lecturers, or a write error.
    pub fn allow_lecturer(&self, leader_id: &str, lecturer_id: &str) -> Result<bool> {
        let _guard = self.lock(Table::LeaderLecturers);
        let current: Vec<LeaderLecturer> = self
            .load_all::<LeaderLecturer>()?
            .into_iter()
            .filter(|row| keys_match(&row.leader_id, leader_id))
            .collect();

        if current.iter().any(|row| keys_match(&row.lecturer_id, lecturer_id)) {
            return Ok(false);
        }
        if current.len() >= LEADER_LECTURER_LIMIT {
            return Err(Error::LeaderLecturerLimit {
                leader_id: leader_id.to_string(),
                limit: LEADER_LECTURER_LIMIT,
            });
        }

        let row = LeaderLecturer {
            leader_id: leader_id.to_string(),
            lecturer_id: lecturer_id.to_string(),
        };
        self.lines.append(
            &self.path(Table::LeaderLecturers),
            &encode_line(&row, self.config.delimiter),
        )?;
        info!(leader_id, lecturer_id, "Allowed lecturer");
        Ok(true)
    }

    /// Remove a lecturer from a leader's list. Returns `false` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or rewritten.
    pub fn disallow_lecturer(&self, leader_id: &str, lecturer_id: &str) -> Result<bool> {
        self.rewrite_decoded::<LeaderLecturer, _>(|rows| {
            let before = rows.len();
            rows.retain(|r| {
                !(keys_match(&r.leader_id, leader_id) && keys_match(&r.lecturer_id, lecturer_id))
            });
            rows.len() != before
        })
    }

    // ── Bands ─────────────────────────────────────────────────

    /// Grade bands in file order, from the primary or legacy band file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and cannot be read.
    pub fn list_bands(&self) -> Result<Vec<GradeBand>> {
        self.load_all()
    }

    /// Replace the primary band table.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn replace_bands(&self, bands: &[GradeBand]) -> Result<()> {
        let _guard = self.lock(Table::GradeBands);
        let encoded: Vec<String> = bands
            .iter()
            .map(|b| encode_line(b, self.config.delimiter))
            .collect();
        self.lines.rewrite(&self.path(Table::GradeBands), &encoded)
    }

    // ── Setup ─────────────────────────────────────────────────

    /// Create every missing table file (empty). Existing files are left alone.
    /// Returns the tables that were created.
    ///
    /// # Errors
    ///
    /// Returns `Error::Write` if a file cannot be created.
    pub fn ensure_tables(&self) -> Result<Vec<Table>> {
        let mut created = Vec::new();
        for table in Table::ALL {
            if table == Table::GradeBands && self.band_path().exists() {
                continue;
            }
            let path = self.path(table);
            if path.exists() {
                continue;
            }
            self.lines.write_all(&path, &[])?;
            created.push(table);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn repo(temp_dir: &TempDir) -> Repository {
        Repository::new(StoreConfig::new(temp_dir.path()))
    }

    fn grade(assessment: &str, student: &str) -> Grade {
        Grade {
            assessment_id: assessment.into(),
            student_id: student.into(),
            ..Grade::default()
        }
    }

    #[test]
    fn test_upsert_twice_keeps_one_row_and_inherits_fields() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);

        let first = Grade {
            marks: Some(55.0),
            grade: "C".into(),
            lecturer_id: "T1".into(),
            ..grade("A1", "S1")
        };
        let (stored, outcome) = repo.save_or_update_grade(first).unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert!(stored.grade_id.starts_with("grd_"));

        let second = Grade {
            marks: Some(81.0),
            grade: "A".into(),
            ..grade("a1", "s1")
        };
        let (merged, outcome) = repo.save_or_update_grade(second).unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated { collapsed: 0 });

        let grades = repo.list_grades().unwrap();
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0].marks, Some(81.0));
        assert_eq!(grades[0].lecturer_id, "T1");
        assert_eq!(grades[0].grade_id, stored.grade_id);
        assert_eq!(grades[0].date_entered, stored.date_entered);
        assert_eq!(merged, grades[0]);
    }

    #[test]
    fn test_upsert_marks_only_keeps_lecturer() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        repo.save_or_update_grade(Grade {
            lecturer_id: "T9".into(),
            ..grade("A1", "S1")
        })
        .unwrap();

        repo.save_or_update_grade(Grade {
            marks: Some(40.0),
            ..grade("A1", "S1")
        })
        .unwrap();

        let stored = repo.find_grade("A1", "S1").unwrap().unwrap();
        assert_eq!(stored.marks, Some(40.0));
        assert_eq!(stored.lecturer_id, "T9");
    }

    #[test]
    fn test_upsert_collapses_existing_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let path = repo.path(Table::Grades);
        fs::write(
            &path,
            "G1|A1|S1|10|F|T1|2024-01-01\n\
             G2|A2|S1|70|A|T1|2024-01-01\n\
             G3|A1|S1|20|F|T2|2024-01-02\n\
             not a grade row\n",
        )
        .unwrap();

        let (_, outcome) = repo
            .save_or_update_grade(Grade {
                marks: Some(65.0),
                ..grade("A1", "S1")
            })
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated { collapsed: 1 });

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "G1|A1|S1|65|F|T1|2024-01-01\n\
             G2|A2|S1|70|A|T1|2024-01-01\n\
             not a grade row\n"
        );
    }

    #[test]
    fn test_upsert_patches_legacy_row_into_canonical_layout() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        fs::write(repo.path(Table::Grades), "G1|A1|S1|50|C\n").unwrap();

        let (stored, _) = repo
            .save_or_update_grade(Grade {
                lecturer_id: "T1".into(),
                date_entered: "2024-06-01".into(),
                ..grade("A1", "S1")
            })
            .unwrap();

        assert_eq!(encode_line(&stored, '|'), "G1|A1|S1|50|C|T1|2024-06-01");
    }

    #[test]
    fn test_feedback_upsert_merges_text() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);

        repo.save_or_update_feedback(Feedback {
            assessment_id: "A1".into(),
            student_id: "S1".into(),
            lecturer_id: "T1".into(),
            text: "Good structure".into(),
            ..Feedback::default()
        })
        .unwrap();
        repo.save_or_update_feedback(Feedback {
            assessment_id: "A1".into(),
            student_id: "S1".into(),
            lecturer_id: "T2".into(),
            ..Feedback::default()
        })
        .unwrap();

        let all = repo.list_feedback().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "Good structure");
        assert_eq!(all[0].lecturer_id, "T2");
    }

    #[test]
    fn test_update_and_delete_assessment() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let quiz = Assessment {
            assessment_id: "A1".into(),
            module_id: "M001".into(),
            title: "Quiz".into(),
            kind: "QUIZ".into(),
            max_marks: Some(20.0),
            weight: Some(10.0),
            date: "2024-03-01".into(),
        };
        let exam = Assessment {
            assessment_id: "A2".into(),
            title: "Exam".into(),
            kind: "EXAM".into(),
            ..quiz.clone()
        };
        repo.save_assessment(&quiz).unwrap();
        repo.save_assessment(&exam).unwrap();

        let renamed = Assessment {
            title: "Pop quiz".into(),
            ..quiz.clone()
        };
        assert!(repo.update_assessment(&renamed).unwrap());
        assert!(!repo
            .update_assessment(&Assessment {
                assessment_id: "A9".into(),
                ..quiz
            })
            .unwrap());
        assert_eq!(repo.find_assessment("a1").unwrap().unwrap().title, "Pop quiz");

        assert!(repo.delete_assessment("A1").unwrap());
        assert!(!repo.delete_assessment("A1").unwrap());
        let left = repo.list_assessments().unwrap();
        assert_eq!(left, vec![exam]);
    }

    #[test]
    fn test_update_module_absent_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let module = Module {
            module_id: "M001".into(),
            module_code: "CS101".into(),
            ..Module::default()
        };
        repo.save_module(&module).unwrap();
        let before = fs::read_to_string(repo.path(Table::Modules)).unwrap();

        let ghost = Module {
            module_id: "M404".into(),
            ..module
        };
        assert!(!repo.update_module(&ghost).unwrap());
        assert_eq!(fs::read_to_string(repo.path(Table::Modules)).unwrap(), before);
    }

    #[test]
    fn test_students_resolve_through_enrollment() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        fs::write(
            repo.path(Table::Users),
            "U7|sam|pw|Sam Lee|M|s@u.edu|555|19|STUDENT\n",
        )
        .unwrap();
        fs::write(repo.path(Table::Classes), "C1|Morning|M002\n").unwrap();
        repo.enroll("S1", "C1").unwrap();
        assert!(!repo.enroll("s1", "c1").unwrap());
        fs::write(repo.path(Table::Students), "S1|U7|2024-SEP\nS2|Dana|M003\n").unwrap();

        let sam = repo.find_student("S1").unwrap().unwrap();
        assert_eq!(sam.profile.name, "Sam Lee");
        assert_eq!(sam.module_id, "M002");

        let dana = repo.find_student("s2").unwrap().unwrap();
        assert_eq!(dana.module_id, "M003");

        assert!(repo.unenroll("S1", "C1").unwrap());
        let sam = repo.find_student("S1").unwrap().unwrap();
        assert_eq!(sam.module_id, "");
    }

    #[test]
    fn test_allow_list_is_capped_and_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);

        for lecturer in ["T1", "T2", "T3"] {
            assert!(repo.allow_lecturer("L1", lecturer).unwrap());
        }
        assert!(!repo.allow_lecturer("L1", "t2").unwrap());
        assert!(matches!(
            repo.allow_lecturer("L1", "T4"),
            Err(Error::LeaderLecturerLimit { limit: 3, .. })
        ));
        assert!(repo.allow_lecturer("L2", "T4").unwrap());

        assert!(repo.disallow_lecturer("L1", "T1").unwrap());
        assert!(!repo.disallow_lecturer("L1", "T1").unwrap());
        assert_eq!(repo.lecturers_for_leader("L1").unwrap(), ["T2", "T3"]);
    }

    #[test]
    fn test_bands_fall_back_to_legacy_file() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        fs::write(temp_dir.path().join("grading_system.txt"), "A|70|100\nB|60|69\n").unwrap();

        let bands = repo.list_bands().unwrap();
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[1].label, "B");

        fs::write(repo.path(Table::GradeBands), "P|50|100\n").unwrap();
        let bands = repo.list_bands().unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].label, "P");
    }

    #[test]
    fn test_ensure_tables_creates_missing_only() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        fs::write(repo.path(Table::Users), "U1|a|b|c|ADMIN\n").unwrap();

        let created = repo.ensure_tables().unwrap();
        assert!(!created.contains(&Table::Users));
        assert!(created.contains(&Table::Grades));
        assert_eq!(repo.list_users().unwrap().len(), 1);
        assert!(repo.ensure_tables().unwrap().is_empty());
    }
}
