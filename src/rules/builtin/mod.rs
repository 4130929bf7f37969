mod compute;
mod identity;
mod storage;

use std::sync::LazyLock;

use crate::rules::types::Check;
use crate::snapshot::Service;

static ALL_CHECKS: LazyLock<Vec<Check>> = LazyLock::new(|| {
    let mut checks = Vec::with_capacity(24);
    checks.extend(identity::checks());
    checks.extend(storage::checks());
    checks.extend(compute::checks());
    checks
});

pub fn all_checks() -> &'static [Check] {
    &ALL_CHECKS
}

pub fn checks_for(service: Service) -> impl Iterator<Item = &'static Check> {
    ALL_CHECKS.iter().filter(move |check| check.service == service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Severity;
    use std::collections::HashSet;

    #[test]
    fn test_check_ids_are_unique() {
        let mut seen = HashSet::new();
        for check in all_checks() {
            assert!(seen.insert(check.id), "duplicate check id: {}", check.id);
        }
    }

    #[test]
    fn test_every_service_has_checks() {
        for service in Service::ALL {
            assert!(
                checks_for(service).next().is_some(),
                "no checks registered for {service}"
            );
        }
    }

    #[test]
    fn test_checks_are_scoped_to_their_service() {
        for service in Service::ALL {
            for check in checks_for(service) {
                assert_eq!(check.service, service);
            }
        }
    }

    #[test]
    fn test_fired_findings_respect_severity_bands() {
        // Sweep the catalog against misconfigured fixtures and verify the
        // scoring invariant on whatever fires.
        use crate::test_utils::fixtures::{context, misconfigured_account};

        let ctx = context();
        let mut fired = 0;
        for snapshot in misconfigured_account() {
            for check in checks_for(snapshot.service()) {
                if let Some(draft) = check.evaluate(&snapshot, &ctx) {
                    fired += 1;
                    assert!((1..=10).contains(&draft.risk_score), "{}", check.id);
                    assert_eq!(draft.severity(), Severity::from_score(draft.risk_score));
                }
            }
        }
        assert!(fired > 10, "expected a misconfigured account to fire broadly");
    }
}
