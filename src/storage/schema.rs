//! Field layouts of every table, newest generation first.
//!
//! | Table | Generations |
//! |---|---|
//! | users | 9 `id,username,password,name,gender,email,phone,age,role`; 5 `id,username,password,name,role` |
//! | lecturers | 9 `username,password,name,gender,email,phone,age,assignedModuleId,academicLeaderId` |
//! | students | 10 canonical; 9 without moduleId; 3 `studentId,userId,intake`; 3 `studentId,name,moduleId`; 2 `studentId,userId` |
//! | modules | 6 `moduleId,moduleName,moduleCode,creditHours,leaderId,lecturerId`; 5 without lecturerId |
//! | assessments | 7 `assessmentId,moduleId,title,type,maxMarks,weight,date` |
//! | grades | 7 `gradeId,assessmentId,studentId,marks,grade,lecturerId,dateEntered`; 5 without lecturerId/date |
//! | feedback | 6 `feedbackId,assessmentId,studentId,lecturerId,text,date`; 4 `feedbackId,assessmentId,studentId,text` |
//! | classes | 3 `classId,className,moduleId` |
//! | student_classes | 2 `studentId,classId` |
//! | leader_lecturers | 2 `leaderId,lecturerId` |
//! | grade_bands | 3 `label,minPercent,maxPercent` |
//!
//! The two 3-field student layouts are told apart by whether field 2 is a
//! known user id. A student whose literal name equals an existing user id is
//! misread as the user-reference layout; this is a known ambiguity of the
//! stored data and is left as is.

use std::collections::HashMap;

use crate::model::{
    Assessment, Class, Enrollment, Feedback, Grade, GradeBand, LeaderLecturer, Lecturer, Module,
    Profile, Role, Student, User,
};
use crate::storage::codec::{
    any_fields, opt_to_field, parse_f64, parse_opt_f64, parse_opt_u32, FieldError, Generation,
    Record,
};
use crate::storage::Table;

// ── Shared profile columns ────────────────────────────────────

/// Build a profile from its 7 columns.
fn profile_from(f: &[&str]) -> Result<Profile, FieldError> {
    Ok(Profile {
        username: f[0].to_string(),
        password: f[1].to_string(),
        name: f[2].to_string(),
        gender: f[3].to_string(),
        email: f[4].to_string(),
        phone: f[5].to_string(),
        age: parse_opt_u32("age", f[6])?,
    })
}

fn profile_fields(p: &Profile) -> Vec<String> {
    vec![
        p.username.clone(),
        p.password.clone(),
        p.name.clone(),
        p.gender.clone(),
        p.email.clone(),
        p.phone.clone(),
        opt_to_field(p.age),
    ]
}

// ── Users ─────────────────────────────────────────────────────

fn build_user_9(f: &[&str], _: &()) -> Result<User, FieldError> {
    Ok(User {
        id: f[0].to_string(),
        profile: profile_from(&f[1..8])?,
        role: Role::parse(f[8]),
    })
}

fn build_user_5(f: &[&str], _: &()) -> Result<User, FieldError> {
    Ok(User {
        id: f[0].to_string(),
        profile: Profile {
            username: f[1].to_string(),
            password: f[2].to_string(),
            name: f[3].to_string(),
            ..Profile::default()
        },
        role: Role::parse(f[4]),
    })
}

static USER_GENERATIONS: [Generation<User>; 2] = [
    Generation {
        name: "user-9",
        arity: 9,
        accepts: any_fields,
        build: build_user_9,
    },
    Generation {
        name: "user-5-legacy",
        arity: 5,
        accepts: any_fields,
        build: build_user_5,
    },
];

impl Record for User {
    type Context = ();
    const TABLE: Table = Table::Users;

    fn generations() -> &'static [Generation<Self>] {
        &USER_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        let mut fields = vec![self.id.clone()];
        fields.extend(profile_fields(&self.profile));
        fields.push(self.role.as_str().to_string());
        fields
    }
}

// ── Lecturers ─────────────────────────────────────────────────

fn build_lecturer_9(f: &[&str], _: &()) -> Result<Lecturer, FieldError> {
    Ok(Lecturer {
        profile: profile_from(&f[..7])?,
        assigned_module_id: f[7].to_string(),
        academic_leader_id: f[8].to_string(),
    })
}

static LECTURER_GENERATIONS: [Generation<Lecturer>; 1] = [Generation {
    name: "lecturer-9",
    arity: 9,
    accepts: any_fields,
    build: build_lecturer_9,
}];

impl Record for Lecturer {
    type Context = ();
    const TABLE: Table = Table::Lecturers;

    fn generations() -> &'static [Generation<Self>] {
        &LECTURER_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        let mut fields = profile_fields(&self.profile);
        fields.push(self.assigned_module_id.clone());
        fields.push(self.academic_leader_id.clone());
        fields
    }
}

// ── Students ──────────────────────────────────────────────────

/// Lookup tables for student layouts that reference other tables.
///
/// - user id → user row (display name and profile)
/// - student id → class id (first enrollment wins)
/// - class id → module id
#[derive(Debug, Default)]
pub struct StudentJoin {
    users: HashMap<String, User>,
    class_of_student: HashMap<String, String>,
    module_of_class: HashMap<String, String>,
}

impl StudentJoin {
    #[must_use]
    pub fn new(users: Vec<User>, enrollments: Vec<Enrollment>, classes: Vec<Class>) -> Self {
        let mut class_of_student = HashMap::new();
        for e in enrollments {
            class_of_student
                .entry(e.student_id.to_lowercase())
                .or_insert(e.class_id);
        }

        Self {
            users: users
                .into_iter()
                .map(|u| (u.id.to_lowercase(), u))
                .collect(),
            class_of_student,
            module_of_class: classes
                .into_iter()
                .map(|c| (c.class_id.to_lowercase(), c.module_id))
                .collect(),
        }
    }

    #[must_use]
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(&id.to_lowercase())
    }

    #[must_use]
    pub fn is_user_id(&self, id: &str) -> bool {
        self.user(id).is_some()
    }

    /// Module of the student's class, or empty when either hop is missing.
    #[must_use]
    pub fn module_for(&self, student_id: &str) -> String {
        self.class_of_student
            .get(&student_id.to_lowercase())
            .and_then(|class_id| self.module_of_class.get(&class_id.to_lowercase()))
            .cloned()
            .unwrap_or_default()
    }

    fn profile_for(&self, user_id: &str, fallback_username: &str) -> Profile {
        self.user(user_id).map_or_else(
            || Profile {
                username: fallback_username.to_string(),
                ..Profile::default()
            },
            |u| u.profile.clone(),
        )
    }
}

fn build_student_10(f: &[&str], _: &StudentJoin) -> Result<Student, FieldError> {
    Ok(Student {
        profile: profile_from(&f[..7])?,
        student_id: f[7].to_string(),
        intake: f[8].to_string(),
        module_id: f[9].to_string(),
    })
}

fn build_student_9(f: &[&str], join: &StudentJoin) -> Result<Student, FieldError> {
    Ok(Student {
        profile: profile_from(&f[..7])?,
        student_id: f[7].to_string(),
        intake: f[8].to_string(),
        module_id: join.module_for(f[7]),
    })
}

fn second_field_is_user_id(f: &[&str], join: &StudentJoin) -> bool {
    join.is_user_id(f[1])
}

fn build_student_user_ref_3(f: &[&str], join: &StudentJoin) -> Result<Student, FieldError> {
    Ok(Student {
        profile: join.profile_for(f[1], f[0]),
        student_id: f[0].to_string(),
        intake: f[2].to_string(),
        module_id: join.module_for(f[0]),
    })
}

fn build_student_inline_3(f: &[&str], _: &StudentJoin) -> Result<Student, FieldError> {
    Ok(Student {
        profile: Profile {
            username: f[0].to_string(),
            name: f[1].to_string(),
            ..Profile::default()
        },
        student_id: f[0].to_string(),
        intake: String::new(),
        module_id: f[2].to_string(),
    })
}

fn build_student_user_ref_2(f: &[&str], join: &StudentJoin) -> Result<Student, FieldError> {
    Ok(Student {
        profile: join.profile_for(f[1], f[0]),
        student_id: f[0].to_string(),
        intake: String::new(),
        module_id: join.module_for(f[0]),
    })
}

static STUDENT_GENERATIONS: [Generation<Student>; 5] = [
    Generation {
        name: "student-10",
        arity: 10,
        accepts: any_fields,
        build: build_student_10,
    },
    Generation {
        name: "student-9",
        arity: 9,
        accepts: any_fields,
        build: build_student_9,
    },
    Generation {
        name: "student-3-user-ref",
        arity: 3,
        accepts: second_field_is_user_id,
        build: build_student_user_ref_3,
    },
    Generation {
        name: "student-3-inline",
        arity: 3,
        accepts: any_fields,
        build: build_student_inline_3,
    },
    Generation {
        name: "student-2-user-ref",
        arity: 2,
        accepts: any_fields,
        build: build_student_user_ref_2,
    },
];

impl Record for Student {
    type Context = StudentJoin;
    const TABLE: Table = Table::Students;

    fn generations() -> &'static [Generation<Self>] {
        &STUDENT_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        let mut fields = profile_fields(&self.profile);
        fields.push(self.student_id.clone());
        fields.push(self.intake.clone());
        fields.push(self.module_id.clone());
        fields
    }
}

// ── Modules ───────────────────────────────────────────────────

fn build_module_6(f: &[&str], _: &()) -> Result<Module, FieldError> {
    Ok(Module {
        module_id: f[0].to_string(),
        module_name: f[1].to_string(),
        module_code: f[2].to_string(),
        credit_hours: parse_opt_u32("creditHours", f[3])?,
        leader_id: f[4].to_string(),
        lecturer_id: f[5].to_string(),
    })
}

fn build_module_5(f: &[&str], ctx: &()) -> Result<Module, FieldError> {
    let mut padded = f.to_vec();
    padded.push("");
    build_module_6(&padded, ctx)
}

static MODULE_GENERATIONS: [Generation<Module>; 2] = [
    Generation {
        name: "module-6",
        arity: 6,
        accepts: any_fields,
        build: build_module_6,
    },
    Generation {
        name: "module-5-legacy",
        arity: 5,
        accepts: any_fields,
        build: build_module_5,
    },
];

impl Record for Module {
    type Context = ();
    const TABLE: Table = Table::Modules;

    fn generations() -> &'static [Generation<Self>] {
        &MODULE_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.module_id.clone(),
            self.module_name.clone(),
            self.module_code.clone(),
            opt_to_field(self.credit_hours),
            self.leader_id.clone(),
            self.lecturer_id.clone(),
        ]
    }
}

// ── Assessments ───────────────────────────────────────────────

fn build_assessment_7(f: &[&str], _: &()) -> Result<Assessment, FieldError> {
    Ok(Assessment {
        assessment_id: f[0].to_string(),
        module_id: f[1].to_string(),
        title: f[2].to_string(),
        kind: f[3].to_string(),
        max_marks: parse_opt_f64("maxMarks", f[4])?,
        weight: parse_opt_f64("weight", f[5])?,
        date: f[6].to_string(),
    })
}

static ASSESSMENT_GENERATIONS: [Generation<Assessment>; 1] = [Generation {
    name: "assessment-7",
    arity: 7,
    accepts: any_fields,
    build: build_assessment_7,
}];

impl Record for Assessment {
    type Context = ();
    const TABLE: Table = Table::Assessments;

    fn generations() -> &'static [Generation<Self>] {
        &ASSESSMENT_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.assessment_id.clone(),
            self.module_id.clone(),
            self.title.clone(),
            self.kind.clone(),
            opt_to_field(self.max_marks),
            opt_to_field(self.weight),
            self.date.clone(),
        ]
    }
}

// ── Grades ────────────────────────────────────────────────────

fn build_grade_7(f: &[&str], _: &()) -> Result<Grade, FieldError> {
    Ok(Grade {
        grade_id: f[0].to_string(),
        assessment_id: f[1].to_string(),
        student_id: f[2].to_string(),
        marks: parse_opt_f64("marks", f[3])?,
        grade: f[4].to_string(),
        lecturer_id: f[5].to_string(),
        date_entered: f[6].to_string(),
    })
}

fn build_grade_5(f: &[&str], _: &()) -> Result<Grade, FieldError> {
    Ok(Grade {
        grade_id: f[0].to_string(),
        assessment_id: f[1].to_string(),
        student_id: f[2].to_string(),
        marks: parse_opt_f64("marks", f[3])?,
        grade: f[4].to_string(),
        lecturer_id: String::new(),
        date_entered: String::new(),
    })
}

static GRADE_GENERATIONS: [Generation<Grade>; 2] = [
    Generation {
        name: "grade-7",
        arity: 7,
        accepts: any_fields,
        build: build_grade_7,
    },
    Generation {
        name: "grade-5-legacy",
        arity: 5,
        accepts: any_fields,
        build: build_grade_5,
    },
];

impl Record for Grade {
    type Context = ();
    const TABLE: Table = Table::Grades;

    fn generations() -> &'static [Generation<Self>] {
        &GRADE_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.grade_id.clone(),
            self.assessment_id.clone(),
            self.student_id.clone(),
            opt_to_field(self.marks),
            self.grade.clone(),
            self.lecturer_id.clone(),
            self.date_entered.clone(),
        ]
    }
}

// ── Feedback ──────────────────────────────────────────────────

fn build_feedback_6(f: &[&str], _: &()) -> Result<Feedback, FieldError> {
    Ok(Feedback {
        feedback_id: f[0].to_string(),
        assessment_id: f[1].to_string(),
        student_id: f[2].to_string(),
        lecturer_id: f[3].to_string(),
        text: f[4].to_string(),
        date: f[5].to_string(),
    })
}

fn build_feedback_4(f: &[&str], _: &()) -> Result<Feedback, FieldError> {
    Ok(Feedback {
        feedback_id: f[0].to_string(),
        assessment_id: f[1].to_string(),
        student_id: f[2].to_string(),
        text: f[3].to_string(),
        ..Feedback::default()
    })
}

static FEEDBACK_GENERATIONS: [Generation<Feedback>; 2] = [
    Generation {
        name: "feedback-6",
        arity: 6,
        accepts: any_fields,
        build: build_feedback_6,
    },
    Generation {
        name: "feedback-4-legacy",
        arity: 4,
        accepts: any_fields,
        build: build_feedback_4,
    },
];

impl Record for Feedback {
    type Context = ();
    const TABLE: Table = Table::Feedback;

    fn generations() -> &'static [Generation<Self>] {
        &FEEDBACK_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.feedback_id.clone(),
            self.assessment_id.clone(),
            self.student_id.clone(),
            self.lecturer_id.clone(),
            self.text.clone(),
            self.date.clone(),
        ]
    }
}

// ── Join tables and bands ─────────────────────────────────────

fn build_class_3(f: &[&str], _: &()) -> Result<Class, FieldError> {
    Ok(Class {
        class_id: f[0].to_string(),
        class_name: f[1].to_string(),
        module_id: f[2].to_string(),
    })
}

static CLASS_GENERATIONS: [Generation<Class>; 1] = [Generation {
    name: "class-3",
    arity: 3,
    accepts: any_fields,
    build: build_class_3,
}];

impl Record for Class {
    type Context = ();
    const TABLE: Table = Table::Classes;

    fn generations() -> &'static [Generation<Self>] {
        &CLASS_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.class_id.clone(),
            self.class_name.clone(),
            self.module_id.clone(),
        ]
    }
}

fn build_enrollment_2(f: &[&str], _: &()) -> Result<Enrollment, FieldError> {
    Ok(Enrollment {
        student_id: f[0].to_string(),
        class_id: f[1].to_string(),
    })
}

static ENROLLMENT_GENERATIONS: [Generation<Enrollment>; 1] = [Generation {
    name: "student-class-2",
    arity: 2,
    accepts: any_fields,
    build: build_enrollment_2,
}];

impl Record for Enrollment {
    type Context = ();
    const TABLE: Table = Table::StudentClasses;

    fn generations() -> &'static [Generation<Self>] {
        &ENROLLMENT_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        vec![self.student_id.clone(), self.class_id.clone()]
    }
}

fn build_leader_lecturer_2(f: &[&str], _: &()) -> Result<LeaderLecturer, FieldError> {
    Ok(LeaderLecturer {
        leader_id: f[0].to_string(),
        lecturer_id: f[1].to_string(),
    })
}

static LEADER_LECTURER_GENERATIONS: [Generation<LeaderLecturer>; 1] = [Generation {
    name: "leader-lecturer-2",
    arity: 2,
    accepts: any_fields,
    build: build_leader_lecturer_2,
}];

impl Record for LeaderLecturer {
    type Context = ();
    const TABLE: Table = Table::LeaderLecturers;

    fn generations() -> &'static [Generation<Self>] {
        &LEADER_LECTURER_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        vec![self.leader_id.clone(), self.lecturer_id.clone()]
    }
}

fn build_band_3(f: &[&str], _: &()) -> Result<GradeBand, FieldError> {
    Ok(GradeBand {
        label: f[0].trim().to_string(),
        min_percent: parse_f64("minPercent", f[1])?,
        max_percent: parse_f64("maxPercent", f[2])?,
    })
}

static BAND_GENERATIONS: [Generation<GradeBand>; 1] = [Generation {
    name: "band-3",
    arity: 3,
    accepts: any_fields,
    build: build_band_3,
}];

impl Record for GradeBand {
    type Context = ();
    const TABLE: Table = Table::GradeBands;

    fn generations() -> &'static [Generation<Self>] {
        &BAND_GENERATIONS
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.label.clone(),
            self.min_percent.to_string(),
            self.max_percent.to_string(),
        ]
    }
}

fn layout_names<T: Record>() -> Vec<&'static str> {
    T::generations().iter().map(|g| g.name).collect()
}

/// Every recognised layout per table, canonical first.
#[must_use]
pub fn layouts() -> Vec<(Table, Vec<&'static str>)> {
    vec![
        (Table::Users, layout_names::<User>()),
        (Table::Lecturers, layout_names::<Lecturer>()),
        (Table::Students, layout_names::<Student>()),
        (Table::Modules, layout_names::<Module>()),
        (Table::Assessments, layout_names::<Assessment>()),
        (Table::Grades, layout_names::<Grade>()),
        (Table::Feedback, layout_names::<Feedback>()),
        (Table::Classes, layout_names::<Class>()),
        (Table::StudentClasses, layout_names::<Enrollment>()),
        (Table::LeaderLecturers, layout_names::<LeaderLecturer>()),
        (Table::GradeBands, layout_names::<GradeBand>()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::codec::{decode_all, decode_line, encode_line};

    #[test]
    fn test_every_table_has_a_layout() {
        let all = layouts();
        assert_eq!(all.len(), Table::ALL.len());
        for (table, names) in all {
            assert!(!names.is_empty(), "{table} has no layout");
        }
    }

    fn join_with_user() -> StudentJoin {
        StudentJoin::new(
            vec![User {
                id: "U7".into(),
                profile: Profile {
                    username: "sam".into(),
                    password: "pw".into(),
                    name: "Sam Lee".into(),
                    ..Profile::default()
                },
                role: Role::Student,
            }],
            vec![Enrollment {
                student_id: "S1".into(),
                class_id: "C1".into(),
            }],
            vec![Class {
                class_id: "C1".into(),
                class_name: "Morning".into(),
                module_id: "M001".into(),
            }],
        )
    }

    #[test]
    fn test_user_round_trip() {
        let user = User {
            id: "U1".into(),
            profile: Profile {
                username: "alice".into(),
                password: "secret".into(),
                name: "Alice Tan".into(),
                gender: "F".into(),
                email: "alice@uni.edu".into(),
                phone: "0123".into(),
                age: Some(21),
            },
            role: Role::Leader,
        };
        let line = encode_line(&user, '|');
        assert_eq!(line, "U1|alice|secret|Alice Tan|F|alice@uni.edu|0123|21|LEADER");

        let decoded = decode_line::<User>(&line, '|', &()).unwrap();
        assert_eq!(decoded.record, user);
        assert_eq!(decoded.generation, 0);
    }

    #[test]
    fn test_legacy_user_decodes_and_encodes_canonical() {
        let decoded = decode_line::<User>("U2|bob|pw|Bob|lecturer", '|', &()).unwrap();
        assert_eq!(decoded.generation, 1);
        assert_eq!(decoded.record.role, Role::Lecturer);
        assert_eq!(encode_line(&decoded.record, '|'), "U2|bob|pw|Bob|||||LECTURER");
    }

    #[test]
    fn test_grade_round_trip_with_unset_marks() {
        let grade = Grade {
            grade_id: "G1".into(),
            assessment_id: "A1".into(),
            student_id: "S1".into(),
            marks: None,
            grade: String::new(),
            lecturer_id: "T1".into(),
            date_entered: "2024-05-01".into(),
        };
        let line = encode_line(&grade, '|');
        assert_eq!(decode_line::<Grade>(&line, '|', &()).unwrap().record, grade);

        let graded = Grade {
            marks: Some(72.5),
            ..grade
        };
        let line = encode_line(&graded, '|');
        assert_eq!(decode_line::<Grade>(&line, '|', &()).unwrap().record, graded);
    }

    #[test]
    fn test_unparseable_number_skips_row() {
        let result = decode_line::<Module>("M001|Intro|CS101|three|L1|", '|', &());
        assert!(matches!(result, Err(FieldError::NotANumber { field: "creditHours", .. })));
    }

    #[test]
    fn test_malformed_rows_do_not_abort_load() {
        let lines: Vec<String> = [
            "A1|M001|Quiz|QUIZ|20|10|2024-01-01",
            "broken",
            "",
            "A2|M001|Exam|EXAM|abc|50|2024-02-01",
            "A3|M001|Final|EXAM|100|40|2024-03-01",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let (rows, report) = decode_all::<Assessment>(&lines, '|', &());
        let ids: Vec<_> = rows.iter().map(|d| d.record.assessment_id.as_str()).collect();
        assert_eq!(ids, ["A1", "A3"]);
        assert_eq!(report.decoded, 2);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_delimiter_in_value_corrupts_row() {
        let class = Class {
            class_id: "C9".into(),
            class_name: "Lab|B".into(),
            module_id: "M001".into(),
        };
        let line = encode_line(&class, '|');
        assert!(decode_line::<Class>(&line, '|', &()).is_err());
    }

    #[test]
    fn test_student_three_fields_with_user_reference() {
        let join = join_with_user();
        let decoded = decode_line::<Student>("S1|U7|2024-SEP", '|', &join).unwrap();

        assert_eq!(decoded.generation, 2);
        assert_eq!(decoded.record.profile.name, "Sam Lee");
        assert_eq!(decoded.record.intake, "2024-SEP");
        assert_eq!(decoded.record.module_id, "M001");
    }

    #[test]
    fn test_student_three_fields_inline_name() {
        let join = join_with_user();
        let decoded = decode_line::<Student>("S2|Dana Wu|M002", '|', &join).unwrap();

        assert_eq!(decoded.generation, 3);
        assert_eq!(decoded.record.profile.name, "Dana Wu");
        assert_eq!(decoded.record.module_id, "M002");
    }

    #[test]
    fn test_student_name_equal_to_user_id_is_read_as_reference() {
        // Ambiguous by construction: "U7" is both a literal name and a user id.
        let join = join_with_user();
        let decoded = decode_line::<Student>("S3|U7|M002", '|', &join).unwrap();
        assert_eq!(decoded.generation, 2);
        assert_eq!(decoded.record.intake, "M002");
    }

    #[test]
    fn test_student_two_fields_without_enrollment_has_empty_module() {
        let join = join_with_user();
        let decoded = decode_line::<Student>("S9|U7", '|', &join).unwrap();

        assert_eq!(decoded.record.profile.name, "Sam Lee");
        assert_eq!(decoded.record.module_id, "");
    }

    #[test]
    fn test_student_nine_fields_joins_module() {
        let join = join_with_user();
        let decoded =
            decode_line::<Student>("sam|pw|Sam Lee|M|s@u.edu|555|19|S1|2024-SEP", '|', &join)
                .unwrap();
        assert_eq!(decoded.generation, 1);
        assert_eq!(decoded.record.module_id, "M001");
        assert_eq!(decoded.record.profile.age, Some(19));
    }

    #[test]
    fn test_legacy_module_has_no_lecturer() {
        let decoded = decode_line::<Module>("M001|Intro|CS101|3|L1", '|', &()).unwrap();
        assert_eq!(decoded.generation, 1);
        assert!(!decoded.record.has_lecturer());
        assert_eq!(encode_line(&decoded.record, '|'), "M001|Intro|CS101|3|L1|");
    }

    #[test]
    fn test_custom_delimiter() {
        let band = GradeBand {
            label: "A".into(),
            min_percent: 70.0,
            max_percent: 100.0,
        };
        let line = encode_line(&band, ';');
        assert_eq!(line, "A;70;100");
        assert_eq!(decode_line::<GradeBand>(&line, ';', &()).unwrap().record, band);
    }

    fn assert_canonical_round_trip<T>(record: &T, ctx: &T::Context)
    where
        T: Record + PartialEq + std::fmt::Debug,
    {
        let line = encode_line(record, '|');
        let decoded = decode_line::<T>(&line, '|', ctx).unwrap();
        assert_eq!(&decoded.record, record, "{line}");
        assert_eq!(decoded.generation, 0, "{line}");
        assert_eq!(encode_line(&decoded.record, '|'), line);
    }

    fn profile(username: &str) -> Profile {
        Profile {
            username: username.into(),
            password: "pw".into(),
            name: "Pat Doe".into(),
            gender: "F".into(),
            email: format!("{username}@uni.edu"),
            phone: "555-0100".into(),
            age: Some(41),
        }
    }

    #[test]
    fn test_user_with_unlisted_role_round_trips() {
        let user = User {
            id: "U9".into(),
            profile: profile("reg"),
            role: Role::Other("registrar".into()),
        };
        assert_canonical_round_trip(&user, &());
    }

    #[test]
    fn test_lecturer_round_trip() {
        let lecturer = Lecturer {
            profile: profile("tina"),
            assigned_module_id: "M002".into(),
            academic_leader_id: "L1".into(),
        };
        assert_canonical_round_trip(&lecturer, &());

        let unassigned = Lecturer {
            profile: Profile {
                age: None,
                ..profile("tom")
            },
            ..Lecturer::default()
        };
        assert_canonical_round_trip(&unassigned, &());
    }

    #[test]
    fn test_student_ten_fields_keep_stored_module() {
        let student = Student {
            profile: profile("sam"),
            student_id: "S1".into(),
            intake: "2024-SEP".into(),
            module_id: "M003".into(),
        };
        assert_canonical_round_trip(&student, &StudentJoin::default());
        // The join points S1 at M001; a 10-field row ignores it.
        assert_canonical_round_trip(&student, &join_with_user());
    }

    #[test]
    fn test_module_round_trip() {
        let module = Module {
            module_id: "M001".into(),
            module_name: "Intro".into(),
            module_code: "CS101".into(),
            credit_hours: Some(4),
            leader_id: "L1".into(),
            lecturer_id: "T1".into(),
        };
        assert_canonical_round_trip(&module, &());

        let bare = Module {
            credit_hours: None,
            lecturer_id: String::new(),
            ..module
        };
        assert_canonical_round_trip(&bare, &());
    }

    #[test]
    fn test_assessment_round_trip_with_fractions() {
        let assessment = Assessment {
            assessment_id: "A1".into(),
            module_id: "M001".into(),
            title: "Quiz".into(),
            kind: "QUIZ".into(),
            max_marks: Some(22.5),
            weight: Some(12.75),
            date: "2024-05-01".into(),
        };
        assert_eq!(
            encode_line(&assessment, '|'),
            "A1|M001|Quiz|QUIZ|22.5|12.75|2024-05-01"
        );
        assert_canonical_round_trip(&assessment, &());

        let unset = Assessment {
            max_marks: None,
            weight: None,
            ..assessment
        };
        assert_canonical_round_trip(&unset, &());
    }

    #[test]
    fn test_feedback_round_trip() {
        let feedback = Feedback {
            feedback_id: "fbk_1a2b3c4d".into(),
            assessment_id: "A1".into(),
            student_id: "S1".into(),
            lecturer_id: "T1".into(),
            text: "Good structure, weak conclusion".into(),
            date: "2024-05-02".into(),
        };
        assert_canonical_round_trip(&feedback, &());
    }

    #[test]
    fn test_join_tables_round_trip() {
        assert_canonical_round_trip(
            &Class {
                class_id: "C1".into(),
                class_name: "Morning".into(),
                module_id: "M001".into(),
            },
            &(),
        );
        assert_canonical_round_trip(
            &Enrollment {
                student_id: "S1".into(),
                class_id: "C1".into(),
            },
            &(),
        );
        assert_canonical_round_trip(
            &LeaderLecturer {
                leader_id: "L1".into(),
                lecturer_id: "T1".into(),
            },
            &(),
        );
    }
}
