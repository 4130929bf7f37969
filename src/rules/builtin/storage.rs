use crate::rules::types::{Check, CheckOutcome};
use crate::scoring;
use crate::snapshot::{ResourceSnapshot, Service};

pub(crate) fn checks() -> Vec<Check> {
    vec![
        public_access_unblocked(),
        public_bucket_policy(),
        public_acl(),
        encryption_disabled(),
        versioning_disabled(),
        access_logging_disabled(),
    ]
}

fn public_access_unblocked() -> Check {
    Check {
        id: "public_access_unblocked",
        service: Service::Storage,
        title: "Public Access Not Fully Blocked",
        description: "A bucket's public-access block is missing or incomplete",
        recommendation: "Enable all public access block settings unless public access is required",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Bucket {
                name,
                public_access_block,
                ..
            } => {
                let score = scoring::public_access_block_score(public_access_block.as_ref())?;
                let description = if public_access_block.is_none() {
                    format!("Bucket {name} has no public access block configuration")
                } else {
                    format!("Bucket {name} does not have all public access blocks enabled")
                };
                Some(CheckOutcome {
                    description,
                    risk_score: score,
                })
            }
            _ => None,
        },
    }
}

fn public_bucket_policy() -> Check {
    Check {
        id: "public_bucket_policy",
        service: Service::Storage,
        title: "Public Bucket Policy",
        description: "A bucket policy allows access to any principal",
        recommendation: "Remove public access from bucket policy",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Bucket {
                name,
                wildcard_principal_policy: true,
                ..
            } => Some(CheckOutcome {
                description: format!("Bucket {name} has a policy allowing public access"),
                risk_score: 10,
            }),
            _ => None,
        },
    }
}

fn public_acl() -> Check {
    Check {
        id: "public_acl",
        service: Service::Storage,
        title: "Public ACL",
        description: "A bucket ACL grants access to a public grantee class",
        recommendation: "Remove public ACL grants",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Bucket {
                name, acl_grants, ..
            } => {
                let grant = acl_grants
                    .iter()
                    .max_by_key(|grant| scoring::acl_grant_score(grant.grantee))?;
                Some(CheckOutcome {
                    description: format!(
                        "Bucket {name} has public ACL granting {} to {:?}",
                        grant.permission, grant.grantee
                    ),
                    risk_score: scoring::acl_grant_score(grant.grantee),
                })
            }
            _ => None,
        },
    }
}

fn encryption_disabled() -> Check {
    Check {
        id: "encryption_disabled",
        service: Service::Storage,
        title: "No Encryption",
        description: "A bucket has no default encryption configured",
        recommendation: "Enable default encryption (AES-256 or KMS)",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Bucket {
                name,
                encryption_enabled: false,
                ..
            } => Some(CheckOutcome {
                description: format!("Bucket {name} does not have default encryption enabled"),
                risk_score: 7,
            }),
            _ => None,
        },
    }
}

fn versioning_disabled() -> Check {
    Check {
        id: "versioning_disabled",
        service: Service::Storage,
        title: "Versioning Not Enabled",
        description: "A bucket does not keep object versions",
        recommendation: "Enable versioning to protect against accidental deletion",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Bucket {
                name,
                versioning_enabled: false,
                ..
            } => Some(CheckOutcome {
                description: format!("Bucket {name} does not have versioning enabled"),
                risk_score: 5,
            }),
            _ => None,
        },
    }
}

fn access_logging_disabled() -> Check {
    Check {
        id: "access_logging_disabled",
        service: Service::Storage,
        title: "Access Logging Not Enabled",
        description: "A bucket has no access logging configured",
        recommendation: "Enable access logging for audit trail",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Bucket {
                name,
                logging_enabled: false,
                ..
            } => Some(CheckOutcome {
                description: format!("Bucket {name} does not have access logging enabled"),
                risk_score: 4,
            }),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{AclGrant, AclGrantee, PublicAccessBlock};
    use crate::test_utils::fixtures::{bucket, context};

    #[test]
    fn test_public_access_unblocked_missing_scores_ten() {
        let check = public_access_unblocked();
        let ctx = context();

        let unblocked = bucket("b1", |b| {
            b.public_access_block = None;
        });
        let draft = check.evaluate(&unblocked, &ctx).unwrap();
        assert_eq!(draft.risk_score, 10);

        let partial = bucket("b2", |b| {
            b.public_access_block = Some(PublicAccessBlock {
                block_public_acls: true,
                block_public_policy: false,
                ignore_public_acls: true,
                restrict_public_buckets: true,
            });
        });
        let draft = check.evaluate(&partial, &ctx).unwrap();
        assert_eq!(draft.risk_score, 9);

        let full = bucket("b3", |_| {});
        assert!(check.evaluate(&full, &ctx).is_none());
    }

    #[test]
    fn test_public_bucket_policy() {
        let check = public_bucket_policy();
        let ctx = context();

        let public = bucket("b1", |b| {
            b.wildcard_principal_policy = true;
        });
        let draft = check.evaluate(&public, &ctx).unwrap();
        assert_eq!(draft.risk_score, 10);
        assert_eq!(draft.check_id, "public_bucket_policy");

        let private = bucket("b2", |_| {});
        assert!(check.evaluate(&private, &ctx).is_none());
    }

    #[test]
    fn test_public_acl_picks_worst_grant() {
        let check = public_acl();
        let ctx = context();

        let both = bucket("b1", |b| {
            b.acl_grants = vec![
                AclGrant {
                    grantee: AclGrantee::AuthenticatedUsers,
                    permission: "READ".to_string(),
                },
                AclGrant {
                    grantee: AclGrantee::AllUsers,
                    permission: "FULL_CONTROL".to_string(),
                },
            ];
        });
        let draft = check.evaluate(&both, &ctx).unwrap();
        assert_eq!(draft.risk_score, 10);
        assert!(draft.description.contains("FULL_CONTROL"));

        let authenticated_only = bucket("b2", |b| {
            b.acl_grants = vec![AclGrant {
                grantee: AclGrantee::AuthenticatedUsers,
                permission: "READ".to_string(),
            }];
        });
        let draft = check.evaluate(&authenticated_only, &ctx).unwrap();
        assert_eq!(draft.risk_score, 8);
    }

    #[test]
    fn test_hygiene_checks_fire_independently() {
        let ctx = context();
        let neglected = bucket("b1", |b| {
            b.encryption_enabled = false;
            b.versioning_enabled = false;
            b.logging_enabled = false;
        });

        assert_eq!(
            encryption_disabled()
                .evaluate(&neglected, &ctx)
                .unwrap()
                .risk_score,
            7
        );
        assert_eq!(
            versioning_disabled()
                .evaluate(&neglected, &ctx)
                .unwrap()
                .risk_score,
            5
        );
        assert_eq!(
            access_logging_disabled()
                .evaluate(&neglected, &ctx)
                .unwrap()
                .risk_score,
            4
        );
    }

    #[test]
    fn test_well_configured_bucket_is_clean() {
        let ctx = context();
        let clean = bucket("b1", |_| {});

        for check in checks() {
            assert!(
                check.evaluate(&clean, &ctx).is_none(),
                "check {} fired on a clean bucket",
                check.id
            );
        }
    }
}
