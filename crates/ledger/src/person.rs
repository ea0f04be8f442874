use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fintrack_core::{DomainError, DomainResult, Entity, Owned, PersonId, UserId, Violations};

use crate::section::SectionType;
use crate::validate;

/// Free-form annotations on a person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PersonMetadata {
    /// Shallow merge: keys present in `patch` overwrite, the rest are kept.
    pub fn merge(&mut self, patch: PersonMetadata) {
        if patch.category.is_some() {
            self.category = patch.category;
        }
        if patch.notes.is_some() {
            self.notes = patch.notes;
        }
    }
}

/// A counterparty record scoping a set of transactions within one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub section_type: SectionType,
    pub metadata: PersonMetadata,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Person {
    type Id = PersonId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Person {
    fn owner(&self) -> UserId {
        self.user_id
    }
}

impl Person {
    pub fn register(user_id: UserId, new: NewPerson, now: DateTime<Utc>) -> Self {
        Self {
            id: PersonId::new(),
            user_id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            section_type: new.section_type,
            metadata: new.metadata,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this active record occupies the `(user, name, section)` slot.
    pub fn occupies(&self, user_id: UserId, name: &str, section_type: SectionType) -> bool {
        self.is_active
            && self.user_id == user_id
            && self.section_type == section_type
            && self.name == name
    }

    /// Apply a validated patch. The section never changes after creation.
    pub fn apply(&mut self, patch: PersonPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata.merge(metadata);
        }
        self.updated_at = now;
    }

    /// Soft delete. Transactions referencing this person are left untouched.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }
}

/// Conflict raised when a name is already taken inside a section.
pub fn duplicate_name(name: &str, section_type: SectionType) -> DomainError {
    DomainError::conflict(format!(
        "A person named \"{name}\" already exists in {section_type} section"
    ))
}

/// Unvalidated person creation input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub section_type: Option<String>,
    pub metadata: Option<PersonMetadata>,
}

/// Validated, normalised person creation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub section_type: SectionType,
    pub metadata: PersonMetadata,
}

impl PersonDraft {
    pub fn validate(self) -> DomainResult<NewPerson> {
        let mut v = Violations::new();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            v.push("name", "Person name is required");
        } else {
            v.check(
                validate::is_valid_name(name),
                "name",
                "Name must be between 2 and 100 characters",
            );
        }

        let section_type = match self.section_type.as_deref().map(str::parse::<SectionType>) {
            Some(Ok(section)) => Some(section),
            _ => {
                v.push("sectionType", "Invalid section type");
                None
            }
        };

        let email = normalize_email(self.email.as_deref());
        v.check(
            email.is_empty() || validate::is_valid_email(&email),
            "email",
            "Invalid email format",
        );

        let phone = self.phone.as_deref().map(str::trim).unwrap_or_default().to_string();
        v.check(validate::is_valid_phone(&phone), "phone", "Invalid phone format");

        v.into_result()?;

        Ok(NewPerson {
            name: name.to_string(),
            email,
            phone,
            // Checked above: a missing section is always recorded as a violation.
            section_type: section_type.ok_or_else(|| {
                DomainError::invalid_field("sectionType", "Invalid section type")
            })?,
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

/// Partial person update; only present fields mutate the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub metadata: Option<PersonMetadata>,
}

impl PersonPatch {
    /// Validate and normalise (trim, lowercase email) the present fields.
    pub fn validate(self) -> DomainResult<PersonPatch> {
        let mut v = Violations::new();

        let name = self.name.map(|n| n.trim().to_string());
        if let Some(name) = &name {
            v.check(
                validate::is_valid_name(name),
                "name",
                "Name must be between 2 and 100 characters",
            );
        }

        let email = self.email.as_deref().map(|e| normalize_email(Some(e)));
        if let Some(email) = &email {
            v.check(
                email.is_empty() || validate::is_valid_email(email),
                "email",
                "Invalid email format",
            );
        }

        let phone = self.phone.map(|p| p.trim().to_string());
        if let Some(phone) = &phone {
            v.check(validate::is_valid_phone(phone), "phone", "Invalid phone format");
        }

        v.into_result()?;

        Ok(PersonPatch {
            name,
            email,
            phone,
            metadata: self.metadata,
        })
    }

    /// The new name, if this patch actually renames `person`.
    pub fn renames<'a>(&'a self, person: &Person) -> Option<&'a str> {
        self.name.as_deref().filter(|name| *name != person.name)
    }
}

fn normalize_email(email: Option<&str>) -> String {
    email.map(|e| e.trim().to_lowercase()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, section: &str) -> PersonDraft {
        PersonDraft {
            name: Some(name.to_string()),
            section_type: Some(section.to_string()),
            ..Default::default()
        }
    }

    fn alice() -> Person {
        let new = draft("Alice", "lending").validate().unwrap();
        Person::register(UserId::new(), new, Utc::now())
    }

    fn fields(err: DomainError) -> Vec<&'static str> {
        match err {
            DomainError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn draft_trims_and_normalises() {
        let new = PersonDraft {
            name: Some("  Alice  ".to_string()),
            email: Some(" Alice@Example.COM ".to_string()),
            phone: Some(" +1 555 ".to_string()),
            section_type: Some("borrowing".to_string()),
            metadata: None,
        }
        .validate()
        .unwrap();

        assert_eq!(new.name, "Alice");
        assert_eq!(new.email, "alice@example.com");
        assert_eq!(new.phone, "+1 555");
        assert_eq!(new.section_type, SectionType::Borrowing);
        assert_eq!(new.metadata, PersonMetadata::default());
    }

    #[test]
    fn draft_reports_every_bad_field() {
        let err = PersonDraft {
            name: Some(" ".to_string()),
            email: Some("nope".to_string()),
            phone: Some("abc".to_string()),
            section_type: Some("savings".to_string()),
            metadata: None,
        }
        .validate()
        .unwrap_err();

        assert_eq!(fields(err), vec!["name", "sectionType", "email", "phone"]);
    }

    #[test]
    fn draft_rejects_short_name_and_missing_section() {
        let err = PersonDraft {
            name: Some("A".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        assert_eq!(fields(err), vec!["name", "sectionType"]);
    }

    #[test]
    fn new_person_is_active() {
        let person = alice();
        assert!(person.is_active);
        assert_eq!(person.created_at, person.updated_at);
    }

    #[test]
    fn occupies_requires_active_same_owner_section_and_name() {
        let mut person = alice();
        let owner = person.user_id;

        assert!(person.occupies(owner, "Alice", SectionType::Lending));
        assert!(!person.occupies(owner, "Alice", SectionType::Borrowing));
        assert!(!person.occupies(owner, "alice", SectionType::Lending));
        assert!(!person.occupies(UserId::new(), "Alice", SectionType::Lending));

        person.deactivate(Utc::now());
        assert!(!person.occupies(owner, "Alice", SectionType::Lending));
    }

    #[test]
    fn patch_merges_metadata_and_keeps_absent_fields() {
        let mut person = alice();
        person.metadata = PersonMetadata {
            category: Some("family".to_string()),
            notes: Some("old".to_string()),
        };
        person.phone = "123".to_string();

        let patch = PersonPatch {
            metadata: Some(PersonMetadata {
                category: None,
                notes: Some("new".to_string()),
            }),
            ..Default::default()
        }
        .validate()
        .unwrap();
        person.apply(patch, Utc::now());

        assert_eq!(person.name, "Alice");
        assert_eq!(person.phone, "123");
        assert_eq!(person.metadata.category.as_deref(), Some("family"));
        assert_eq!(person.metadata.notes.as_deref(), Some("new"));
    }

    #[test]
    fn renames_only_when_the_name_changes() {
        let person = alice();

        let same = PersonPatch {
            name: Some(" Alice ".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(same.renames(&person), None);

        let other = PersonPatch {
            name: Some("Bob".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(other.renames(&person), Some("Bob"));
    }

    #[test]
    fn patch_validates_present_fields_only() {
        assert!(PersonPatch::default().validate().is_ok());

        let err = PersonPatch {
            name: Some("B".to_string()),
            email: Some("bad".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(fields(err), vec!["name", "email"]);
    }

    #[test]
    fn duplicate_name_is_a_conflict() {
        match duplicate_name("Alice", SectionType::Lending) {
            DomainError::Conflict(msg) => {
                assert_eq!(msg, "A person named \"Alice\" already exists in lending section")
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
