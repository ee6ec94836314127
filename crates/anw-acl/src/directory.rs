//! The member directory stored under the users key.
//!
//! Records are normalized once when the directory is loaded: the email is
//! trimmed and lower-cased, and the scattered role signals (explicit role,
//! elected role, coordinator and volunteer flags) collapse into a single
//! [`Role`]. Readers never look at the raw flags again.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use anw_core::normalize_email;

use crate::Role;

/// A directory record as stored remotely.
///
/// Every field is optional on the wire; older records only carry a subset.
/// Only the email must be a string. Other fields of the wrong type are read
/// leniently: flags accept truthy strings and numbers, text fields accept
/// numbers, and anything else counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRecord {
    /// Member email, the identity key.
    pub email: String,
    /// Explicitly assigned role.
    #[serde(deserialize_with = "lenient_text")]
    pub role: Option<String>,
    /// Membership status.
    #[serde(deserialize_with = "lenient_text")]
    pub status: Option<String>,
    /// Legacy approval flag.
    #[serde(deserialize_with = "lenient_opt_flag")]
    pub approved: Option<bool>,
    /// Eircode of the household.
    #[serde(deserialize_with = "lenient_text")]
    pub eircode: Option<String>,
    /// Street address.
    #[serde(deserialize_with = "lenient_text")]
    pub address: Option<String>,
    /// Self-declared coordinator.
    #[serde(alias = "isCoordinator", deserialize_with = "lenient_flag")]
    pub coordinator: bool,
    /// Self-declared volunteer.
    #[serde(alias = "isVolunteer", deserialize_with = "lenient_flag")]
    pub volunteer: bool,
    /// Role won in an election.
    #[serde(deserialize_with = "lenient_text")]
    pub elected_role: Option<String>,
}

fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => Some(matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "y" | "1" | "on"
        )),
        _ => None,
    }
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(truthy(&Value::deserialize(deserializer)?).unwrap_or(false))
}

fn lenient_opt_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(truthy(&Value::deserialize(deserializer)?))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Awaiting approval.
    Pending,
    /// Approved member.
    Active,
    /// Suspended by an admin.
    Suspended,
}

impl UserStatus {
    fn from_record(record: &UserRecord) -> Self {
        match record
            .status
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            Some("active" | "approved") => UserStatus::Active,
            Some("suspended") => UserStatus::Suspended,
            Some("pending") => UserStatus::Pending,
            _ if record.approved == Some(true) => UserStatus::Active,
            _ => UserStatus::Pending,
        }
    }
}

/// A normalized directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Normalized email.
    pub email: String,
    /// Effective directory role; never [`Role::Public`].
    pub role: Role,
    /// Membership status.
    pub status: UserStatus,
    /// Eircode, if recorded.
    pub eircode: Option<String>,
}

impl DirectoryEntry {
    /// Normalize a raw record. Records without an email yield `None`.
    pub fn from_record(record: &UserRecord) -> Option<Self> {
        let email = normalize_email(&record.email);
        if email.is_empty() {
            return None;
        }
        Some(Self {
            role: directory_role(record),
            status: UserStatus::from_record(record),
            eircode: record
                .eircode
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_uppercase),
            email,
        })
    }
}

// `public` is the anonymous sentinel and cannot be granted by a record.
fn member_role(name: Option<&str>) -> Option<Role> {
    name.and_then(Role::parse).filter(|r| *r != Role::Public)
}

fn directory_role(record: &UserRecord) -> Role {
    if let Some(role) = member_role(record.role.as_deref()) {
        return role;
    }
    if let Some(raw) = record.role.as_deref()
        && !raw.trim().is_empty()
    {
        log::warn!("Ignoring unknown role '{raw}' for {}", record.email.trim());
    }
    if let Some(role) = member_role(record.elected_role.as_deref()) {
        return role;
    }
    if record.coordinator {
        Role::Coordinator
    } else if record.volunteer {
        Role::Volunteer
    } else {
        Role::Resident
    }
}

/// Email-indexed member directory.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    entries: HashMap<String, DirectoryEntry>,
}

impl UserDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from typed records. The first record for an email wins.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a UserRecord>,
    {
        let mut directory = Self::new();
        for record in records {
            match DirectoryEntry::from_record(record) {
                Some(entry) => directory.insert(entry),
                None => log::warn!("Skipping directory record without email"),
            }
        }
        directory
    }

    /// Build from the stored JSON. Anything but an array gives an empty
    /// directory; malformed elements are skipped.
    pub fn from_value(value: &Value) -> Self {
        let Some(items) = value.as_array() else {
            if !value.is_null() {
                log::warn!("User directory is not a list; treating it as empty");
            }
            return Self::new();
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match serde_json::from_value::<UserRecord>(item.clone()) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping malformed directory record #{index}: {e}"),
            }
        }
        Self::from_records(&records)
    }

    fn insert(&mut self, entry: DirectoryEntry) {
        if self.entries.contains_key(&entry.email) {
            log::warn!("Duplicate directory record for {}; keeping the first", entry.email);
            return;
        }
        self.entries.insert(entry.email.clone(), entry);
    }

    /// Look up an email; the argument is normalized first.
    pub fn lookup(&self, email: &str) -> Option<&DirectoryEntry> {
        self.entries.get(&normalize_email(email))
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no members.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by email.
    pub fn entries(&self) -> Vec<&DirectoryEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.email.cmp(&b.email));
        entries
    }
}
