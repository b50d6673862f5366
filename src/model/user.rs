//! People: users, lecturers, students and the authenticated principal.
//!
//! The shared personal fields live in [`Profile`]; each table adds its own
//! role-specific columns. Role dispatch is explicit through [`Principal`].

use serde::{Deserialize, Serialize};

/// Account role as stored in the user table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Lecturer,
    Leader,
    Admin,
    /// Any other stored role string, kept as written (trimmed).
    Other(String),
}

impl Role {
    /// Storage representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Student => "STUDENT",
            Self::Lecturer => "LECTURER",
            Self::Leader => "LEADER",
            Self::Admin => "ADMIN",
            Self::Other(s) => s,
        }
    }

    /// Parse a stored role. Known roles match case-insensitively; anything
    /// else is preserved as `Other` so it writes back unchanged.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_uppercase().as_str() {
            "STUDENT" => Self::Student,
            "LECTURER" => Self::Lecturer,
            "LEADER" => Self::Leader,
            "ADMIN" => Self::Admin,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Personal fields shared by every kind of account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub gender: String,
    pub email: String,
    pub phone: String,
    pub age: Option<u32>,
}

/// A row of the user table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier referenced by other tables.
    pub id: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub role: Role,
}

/// A row of the lecturer table, keyed by username.
///
/// `assigned_module_id` and `academic_leader_id` are a denormalised copy of
/// the module table's assignment and are only written by the assignment sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecturer {
    #[serde(flatten)]
    pub profile: Profile,
    pub assigned_module_id: String,
    pub academic_leader_id: String,
}

impl Lecturer {
    /// Whether this lecturer currently carries a module assignment.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        !self.assigned_module_id.is_empty()
    }
}

/// A row of the student table, keyed by username or student id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    #[serde(flatten)]
    pub profile: Profile,
    pub student_id: String,
    pub intake: String,
    /// Empty when no enrollment resolves to a module.
    pub module_id: String,
}

/// The account located by authentication, tagged by where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// Found in the user table; the role column decides what it may do.
    User(User),
    Lecturer(Lecturer),
    Student(Student),
}

impl Principal {
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::User(user) => user.role.clone(),
            Self::Lecturer(_) => Role::Lecturer,
            Self::Student(_) => Role::Student,
        }
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        match self {
            Self::User(user) => &user.profile,
            Self::Lecturer(lecturer) => &lecturer.profile,
            Self::Student(student) => &student.profile,
        }
    }

    /// Identifier used for ownership checks: the user id for user-table
    /// principals, the student id for students, the username for lecturers.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::User(user) => &user.id,
            Self::Lecturer(lecturer) => &lecturer.profile.username,
            Self::Student(student) => &student.student_id,
        }
    }

    /// Whether this principal may own modules.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        matches!(self.role(), Role::Leader | Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_known_and_unknown() {
        assert_eq!(Role::parse("lecturer"), Role::Lecturer);
        assert_eq!(Role::parse(" ADMIN "), Role::Admin);
        assert_eq!(Role::parse(" registrar "), Role::Other("registrar".into()));
        assert_eq!(Role::parse("Registrar").as_str(), "Registrar");
    }

    #[test]
    fn test_principal_dispatch() {
        let leader = Principal::User(User {
            id: "L1".into(),
            profile: Profile {
                username: "lee".into(),
                ..Profile::default()
            },
            role: Role::Leader,
        });
        assert!(leader.is_leader());
        assert_eq!(leader.id(), "L1");

        let student = Principal::Student(Student {
            student_id: "S1".into(),
            ..Student::default()
        });
        assert_eq!(student.role(), Role::Student);
        assert!(!student.is_leader());
        assert_eq!(student.id(), "S1");
    }
}
