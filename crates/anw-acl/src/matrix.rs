//! The ACL matrix: permission key to [`Rule`].
//!
//! The stored JSON mixes shapes in one field (`"Public"`, `"Authenticated"`,
//! a role array, or a comma-separated string). It is parsed once here into
//! [`Rule`], so nothing downstream inspects raw JSON.
//!
//! The matrix in effect is the built-in default with the remote matrix
//! merged over it key by key, so an admin editing one key never blanks the
//! others.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{Map, Value};

use anw_core::normalize_key;

use crate::{Error, Result, Role};

const PUBLIC: &str = "Public";
const AUTHENTICATED: &str = "Authenticated";

/// Pages that are always labelled public, whatever the matrix says.
const STATIC_PUBLIC_PAGES: [&str; 4] = ["page:home", "page:about", "page:privacy", "page:login"];

/// Who may access a permission key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Everyone, signed in or not.
    Public,
    /// Anyone signed in, whatever their role.
    Authenticated,
    /// The listed roles; owner always passes.
    RoleSet(BTreeSet<Role>),
}

impl Rule {
    /// A role-set rule.
    pub fn roles<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        Rule::RoleSet(roles.into_iter().collect())
    }

    /// Parse the stored shape of `key`'s rule.
    ///
    /// `Ok(None)` means "no rule": `null`, `""` or `[]`.
    pub fn parse(key: &str, value: &Value) -> Result<Option<Rule>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case(PUBLIC) {
                    Ok(Some(Rule::Public))
                } else if s.eq_ignore_ascii_case(AUTHENTICATED) {
                    Ok(Some(Rule::Authenticated))
                } else {
                    Ok(role_list(key, s.split(',')))
                }
            }
            Value::Array(items) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_str() {
                        Some(name) => names.push(name),
                        None => {
                            return Err(Error::validation_key(
                                key,
                                format!("role list entries must be strings, got {item}"),
                            ));
                        }
                    }
                }
                Ok(role_list(key, names))
            }
            other => Err(Error::validation_key(
                key,
                format!("expected a role list or sentinel, got {other}"),
            )),
        }
    }

    /// The stored JSON shape.
    ///
    /// An empty role set is written as `["owner"]`; `[]` would read back as
    /// "no rule".
    pub fn to_value(&self) -> Value {
        match self {
            Rule::Public => Value::String(PUBLIC.to_string()),
            Rule::Authenticated => Value::String(AUTHENTICATED.to_string()),
            Rule::RoleSet(roles) if roles.is_empty() => Value::from(vec![Role::Owner.as_str()]),
            Rule::RoleSet(roles) => Value::from(roles.iter().map(Role::as_str).collect::<Vec<_>>()),
        }
    }
}

fn role_list<'a, I>(key: &str, names: I) -> Option<Rule>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut any = false;
    let mut roles = BTreeSet::new();
    for name in names.into_iter().map(str::trim).filter(|n| !n.is_empty()) {
        any = true;
        match Role::parse(name) {
            Some(role) => {
                roles.insert(role);
            }
            None => log::warn!("ACL '{key}': dropping unknown role '{name}'"),
        }
    }
    // Only unknown names still restrict the key (owner-only), never open it.
    any.then_some(Rule::RoleSet(roles))
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Public => f.write_str(PUBLIC),
            Rule::Authenticated => f.write_str(AUTHENTICATED),
            Rule::RoleSet(roles) if roles.is_empty() => f.write_str("(owner only)"),
            Rule::RoleSet(roles) => {
                let names: Vec<_> = roles.iter().map(Role::as_str).collect();
                f.write_str(&names.join(", "))
            }
        }
    }
}

/// Audience label for a page, as shown in admin tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLabel {
    /// Open to everyone.
    Public,
    /// Members only.
    Private,
    /// Admins or owner only.
    Exclusive,
}

impl fmt::Display for PageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PageLabel::Public => "Public",
            PageLabel::Private => "Private",
            PageLabel::Exclusive => "Exclusive",
        })
    }
}

/// Permission key to rule mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclMatrix {
    rules: BTreeMap<String, Rule>,
}

impl AclMatrix {
    /// An empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in matrix covering every known page, feature, dashboard
    /// and admin-tab key.
    pub fn default_matrix() -> Self {
        use Role::*;

        let members = [Resident, Volunteer, Coordinator, Admin, Owner];
        let field = [Volunteer, Coordinator, Admin, Owner];
        let organisers = [Coordinator, Admin, Owner];
        let elevated = [Admin, Owner];

        let mut m = Self::new();
        for page in STATIC_PUBLIC_PAGES {
            m.set(page, Rule::Public);
        }
        for page in [
            "page:dashboard",
            "page:report",
            "page:report-map",
            "page:alerts",
            "page:projects",
            "page:handbook",
            "page:household",
        ] {
            m.set(page, Rule::roles(members));
        }
        m.set("page:admin", Rule::roles(elevated));

        m.set("feature:home_notice_bar", Rule::roles(Role::ALL));
        m.set("feature:report:submit", Rule::Authenticated);
        m.set("feature:household:edit", Rule::Authenticated);
        m.set("feature:alerts:create", Rule::roles(organisers));
        m.set("feature:alerts:tab_contacts", Rule::roles(organisers));
        m.set("feature:projects:edit", Rule::roles(organisers));

        m.set("dashboard:incidents", Rule::roles(field));
        m.set("dashboard:tasks", Rule::roles(field));
        m.set("dashboard:members", Rule::roles(organisers));

        for tab in ["admin:users", "admin:acl", "admin:backups", "admin:elections"] {
            m.set(tab, Rule::roles(elevated));
        }
        m
    }

    /// Parse a stored matrix.
    ///
    /// A non-object is an error. Keys with an invalid rule are skipped with
    /// a warning; keys with no rule are left out.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(Error::validation(format!(
                "ACL matrix must be an object, got {}",
                json_kind(value)
            )));
        };

        let mut m = Self::new();
        for (key, raw) in object {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            match Rule::parse(key, raw) {
                Ok(Some(rule)) => m.set(key, rule),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping ACL entry: {e}"),
            }
        }
        Ok(m)
    }

    /// The default matrix with `remote` merged over it.
    ///
    /// A missing, empty or malformed remote leaves the default unchanged.
    pub fn effective(remote: Option<&Value>) -> Self {
        let mut matrix = Self::default_matrix();
        match remote {
            None | Some(Value::Null) => {}
            Some(value) => match Self::from_value(value) {
                Ok(overrides) => matrix.merge(overrides),
                Err(e) => log::warn!("Ignoring remote ACL matrix: {e}"),
            },
        }
        matrix
    }

    /// Per-key override by `other`.
    pub fn merge(&mut self, other: AclMatrix) {
        self.rules.extend(other.rules);
    }

    /// Only the rules that differ from [`default_matrix`](Self::default_matrix),
    /// the shape admin edits store so later default changes still apply.
    pub fn overrides(&self) -> AclMatrix {
        let defaults = Self::default_matrix();
        AclMatrix {
            rules: self
                .rules
                .iter()
                .filter(|&(k, r)| defaults.rules.get(k) != Some(r))
                .map(|(k, r)| (k.clone(), r.clone()))
                .collect(),
        }
    }

    /// Rule for `key`.
    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.rules.get(key.trim())
    }

    /// Replace the rule for `key`.
    pub fn set(&mut self, key: &str, rule: Rule) {
        self.rules.insert(normalize_key(key), rule);
    }

    /// Drop the rule for `key`.
    pub fn remove(&mut self, key: &str) -> Option<Rule> {
        self.rules.remove(key.trim())
    }

    /// Add `role` to `key`'s role set. Returns whether anything changed.
    ///
    /// A key without a rule becomes restricted to `role`. `Public` already
    /// admits every role, and `Authenticated` every signed-in role.
    pub fn grant(&mut self, key: &str, role: Role) -> bool {
        match self.rules.get_mut(key.trim()) {
            None => {
                self.set(key, Rule::roles([role]));
                true
            }
            Some(Rule::Public) => false,
            Some(Rule::Authenticated) if role != Role::Public => false,
            Some(rule @ Rule::Authenticated) => {
                // Authenticated plus anonymous is everyone.
                *rule = Rule::Public;
                true
            }
            Some(Rule::RoleSet(roles)) => roles.insert(role),
        }
    }

    /// Remove `role` from `key`'s role set. Returns whether anything
    /// changed.
    ///
    /// Sentinel rules have no set to edit and are rejected. Removing the
    /// last role leaves the key owner-only.
    pub fn revoke(&mut self, key: &str, role: Role) -> Result<bool> {
        match self.rules.get_mut(key.trim()) {
            None => Ok(false),
            Some(Rule::RoleSet(roles)) => Ok(roles.remove(&role)),
            Some(rule) => Err(Error::validation_key(
                key.trim(),
                format!("rule is {rule}; set an explicit role list before revoking"),
            )),
        }
    }

    /// Audience label for a page key.
    pub fn classify_page(&self, key: &str) -> PageLabel {
        let key = key.trim();
        if STATIC_PUBLIC_PAGES.contains(&key) {
            return PageLabel::Public;
        }
        match self.get(key) {
            Some(Rule::Public) => PageLabel::Public,
            Some(Rule::RoleSet(roles))
                if !roles.contains(&Role::Resident)
                    && (roles.is_empty() || roles.iter().any(Role::is_elevated)) =>
            {
                PageLabel::Exclusive
            }
            _ => PageLabel::Private,
        }
    }

    /// Iterate rules in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, r)| (k.as_str(), r))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the matrix has no keys.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The stored JSON shape.
    pub fn to_value(&self) -> Value {
        let object: Map<String, Value> = self
            .rules
            .iter()
            .map(|(k, r)| (k.clone(), r.to_value()))
            .collect();
        Value::Object(object)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sentinels_case_insensitive() {
        assert_eq!(Rule::parse("k", &json!("public")).unwrap(), Some(Rule::Public));
        assert_eq!(
            Rule::parse("k", &json!(" AUTHENTICATED ")).unwrap(),
            Some(Rule::Authenticated)
        );
    }

    #[test]
    fn test_parse_lists_and_csv() {
        let expected = Some(Rule::roles([Role::Admin, Role::Owner]));
        assert_eq!(Rule::parse("k", &json!(["Admin", "owner", "admin"])).unwrap(), expected);
        assert_eq!(Rule::parse("k", &json!("admin, owner")).unwrap(), expected);
    }

    #[test]
    fn test_parse_absent_shapes() {
        assert_eq!(Rule::parse("k", &json!(null)).unwrap(), None);
        assert_eq!(Rule::parse("k", &json!([])).unwrap(), None);
        assert_eq!(Rule::parse("k", &json!("  ")).unwrap(), None);
        assert_eq!(Rule::parse("k", &json!(" , ")).unwrap(), None);
    }

    #[test]
    fn test_parse_unknown_roles_restrict() {
        assert_eq!(
            Rule::parse("k", &json!(["treasurer"])).unwrap(),
            Some(Rule::RoleSet(BTreeSet::new()))
        );
        assert_eq!(
            Rule::parse("k", &json!(["treasurer", "volunteer"])).unwrap(),
            Some(Rule::roles([Role::Volunteer]))
        );
    }

    #[test]
    fn test_parse_invalid_shapes() {
        assert!(Rule::parse("k", &json!(true)).is_err());
        assert!(Rule::parse("k", &json!({"roles": []})).is_err());
        assert!(Rule::parse("k", &json!(["admin", 3])).is_err());
    }

    #[test]
    fn test_to_value_shapes() {
        assert_eq!(Rule::Public.to_value(), json!("Public"));
        assert_eq!(
            Rule::roles([Role::Owner, Role::Admin]).to_value(),
            json!(["admin", "owner"])
        );
        let owner_only = Rule::RoleSet(BTreeSet::new());
        let back = Rule::parse("k", &owner_only.to_value()).unwrap().unwrap();
        assert_eq!(back, Rule::roles([Role::Owner]));
    }

    #[test]
    fn test_default_matrix_least_privilege() {
        let m = AclMatrix::default_matrix();
        assert_eq!(m.get("page:home"), Some(&Rule::Public));
        assert_eq!(m.get("page:admin"), Some(&Rule::roles([Role::Admin, Role::Owner])));
        for (key, rule) in m.iter().filter(|(k, _)| k.starts_with("admin:")) {
            assert_eq!(rule, &Rule::roles([Role::Admin, Role::Owner]), "{key}");
        }
        assert!(m.get("feature:home_notice_bar").is_some());
    }

    #[test]
    fn test_effective_merges_per_key() {
        let remote = json!({
            "feature:alerts:tab_contacts": ["admin"],
            "page:new-thing": "Authenticated",
            "page:dashboard": []
        });
        let m = AclMatrix::effective(Some(&remote));
        let default = AclMatrix::default_matrix();

        assert_eq!(m.get("feature:alerts:tab_contacts"), Some(&Rule::roles([Role::Admin])));
        assert_eq!(m.get("page:new-thing"), Some(&Rule::Authenticated));
        // untouched and empty-valued keys keep the default
        assert_eq!(m.get("page:dashboard"), default.get("page:dashboard"));
        assert_eq!(m.get("page:admin"), default.get("page:admin"));
        assert_eq!(m.len(), default.len() + 1);
    }

    #[test]
    fn test_effective_ignores_bad_remote() {
        let default = AclMatrix::default_matrix();
        assert_eq!(AclMatrix::effective(None), default);
        assert_eq!(AclMatrix::effective(Some(&json!(null))), default);
        assert_eq!(AclMatrix::effective(Some(&json!({}))), default);
        assert_eq!(AclMatrix::effective(Some(&json!(["page:home"]))), default);
        assert_eq!(AclMatrix::effective(Some(&json!("Public"))), default);
    }

    #[test]
    fn test_effective_skips_invalid_entries() {
        let m = AclMatrix::effective(Some(&json!({"page:admin": 5, "page:x": ["owner"]})));
        assert_eq!(m.get("page:admin"), AclMatrix::default_matrix().get("page:admin"));
        assert_eq!(m.get("page:x"), Some(&Rule::roles([Role::Owner])));
    }

    #[test]
    fn test_to_value_round_trips_through_from_value() {
        let m = AclMatrix::default_matrix();
        assert_eq!(AclMatrix::from_value(&m.to_value()).unwrap(), m);
    }

    #[test]
    fn test_grant() {
        let mut m = AclMatrix::default_matrix();
        assert!(m.grant("page:admin", Role::Coordinator));
        assert!(!m.grant("page:admin", Role::Coordinator));
        assert!(!m.grant("page:home", Role::Volunteer));
        assert!(!m.grant("feature:report:submit", Role::Volunteer));
        assert!(m.grant("feature:report:submit", Role::Public));
        assert_eq!(m.get("feature:report:submit"), Some(&Rule::Public));
        assert!(m.grant("feature:brand-new", Role::Admin));
        assert_eq!(m.get("feature:brand-new"), Some(&Rule::roles([Role::Admin])));
    }

    #[test]
    fn test_revoke() {
        let mut m = AclMatrix::default_matrix();
        assert!(m.revoke("page:admin", Role::Admin).unwrap());
        assert!(m.revoke("page:admin", Role::Owner).unwrap());
        assert_eq!(m.get("page:admin"), Some(&Rule::RoleSet(BTreeSet::new())));
        assert!(!m.revoke("page:missing", Role::Admin).unwrap());
        assert!(m.revoke("page:home", Role::Public).is_err());
    }

    #[test]
    fn test_classify_page() {
        let mut m = AclMatrix::default_matrix();
        assert_eq!(m.classify_page("page:home"), PageLabel::Public);
        assert_eq!(m.classify_page("page:dashboard"), PageLabel::Private);
        assert_eq!(m.classify_page("page:admin"), PageLabel::Exclusive);
        assert_eq!(m.classify_page("page:unknown"), PageLabel::Private);

        // static public pages stay public even when restricted
        m.set("page:about", Rule::roles([Role::Owner]));
        assert_eq!(m.classify_page("page:about"), PageLabel::Public);

        m.set("page:x", Rule::roles([Role::Volunteer]));
        assert_eq!(m.classify_page("page:x"), PageLabel::Private);
        m.set("page:y", Rule::Public);
        assert_eq!(m.classify_page("page:y"), PageLabel::Public);
    }

    #[test]
    fn test_overrides_drop_default_rules() {
        let mut m = AclMatrix::default_matrix();
        assert!(m.overrides().is_empty());

        m.set("page:report", Rule::roles([Role::Volunteer]));
        m.set("feature:new", Rule::Authenticated);
        let overrides = m.overrides();
        assert_eq!(overrides.len(), 2);
        assert!(overrides.get("page:admin").is_none());
        assert_eq!(overrides.get("feature:new"), Some(&Rule::Authenticated));
        assert_eq!(AclMatrix::effective(Some(&overrides.to_value())), m);
    }

    #[test]
    fn test_rule_display() {
        assert_eq!(Rule::roles([Role::Owner, Role::Admin]).to_string(), "admin, owner");
        assert_eq!(Rule::Authenticated.to_string(), "Authenticated");
    }
}
