use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

/// Owner kind of objects created by the Flagger canary controller.
pub const CANARY_KIND: &str = "Canary";

/// True when the deployment was generated by a canary controller next to the
/// primary one and must not be matched to the application.
pub fn is_canary_auxiliary(owner_references: &[OwnerReference]) -> bool {
    owner_references.iter().any(|r| r.kind == CANARY_KIND)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(kind: &str) -> OwnerReference {
        OwnerReference {
            api_version: "flagger.app/v1beta1".into(),
            kind: kind.into(),
            name: "myapp".into(),
            uid: "1234".into(),
            ..Default::default()
        }
    }

    #[test]
    fn detects_canary_owner() {
        assert!(is_canary_auxiliary(&[owner("ReplicaSet"), owner("Canary")]));
    }

    #[test]
    fn empty_or_unrelated_owners() {
        assert!(!is_canary_auxiliary(&[]));
        assert!(!is_canary_auxiliary(&[owner("ReplicaSet")]));
        assert!(!is_canary_auxiliary(&[owner("canary")]));
    }
}
