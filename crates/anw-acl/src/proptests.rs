//! Property-based tests for the evaluator and matrix.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;
    use serde_json::Value;

    use crate::{AclMatrix, Role, Rule, allows};

    fn role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn role_set() -> impl Strategy<Value = BTreeSet<Role>> {
        prop::collection::btree_set(role(), 0..=Role::ALL.len())
    }

    fn keys_where(pred: impl Fn(&Rule) -> bool) -> Vec<String> {
        AclMatrix::default_matrix()
            .iter()
            .filter(|&(_, r)| pred(r))
            .map(|(k, _)| k.to_string())
            .collect()
    }

    proptest! {
        #[test]
        fn test_public_keys_allow_everyone(
            key in prop::sample::select(keys_where(|r| *r == Rule::Public)),
            role in role(),
            logged_in in any::<bool>(),
        ) {
            let m = AclMatrix::default_matrix();
            prop_assert!(allows(m.get(&key), role, logged_in));
        }

        #[test]
        fn test_authenticated_keys_follow_login(
            key in prop::sample::select(keys_where(|r| *r == Rule::Authenticated)),
            role in role(),
        ) {
            let m = AclMatrix::default_matrix();
            prop_assert!(!allows(m.get(&key), role, false));
            prop_assert!(allows(m.get(&key), role, true));
        }

        #[test]
        fn test_owner_passes_any_role_set(roles in role_set()) {
            prop_assert!(allows(Some(&Rule::RoleSet(roles)), Role::Owner, true));
        }

        #[test]
        fn test_role_set_membership(roles in role_set(), role in role()) {
            let allowed = allows(Some(&Rule::RoleSet(roles.clone())), role, true);
            prop_assert_eq!(allowed, role == Role::Owner || roles.contains(&role));
        }

        #[test]
        fn test_stored_shape_preserves_decisions(
            roles in role_set(),
            role in role(),
            logged_in in any::<bool>(),
        ) {
            let rule = Rule::RoleSet(roles);
            let back = Rule::parse("k", &rule.to_value()).unwrap();
            prop_assert_eq!(
                allows(Some(&rule), role, logged_in),
                allows(back.as_ref(), role, logged_in)
            );
        }

        #[test]
        fn test_effective_never_drops_default_keys(
            overrides in prop::collection::btree_map("[a-z]{1,8}:[a-z_]{1,12}", role_set(), 0..8),
        ) {
            let remote: serde_json::Map<String, Value> = overrides
                .iter()
                .map(|(k, v)| (k.clone(), Rule::RoleSet(v.clone()).to_value()))
                .collect();
            let m = AclMatrix::effective(Some(&Value::Object(remote)));
            for (key, _) in AclMatrix::default_matrix().iter() {
                prop_assert!(m.get(key).is_some(), "missing {}", key);
            }
        }
    }
}
