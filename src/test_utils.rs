#[cfg(test)]
pub mod fixtures {
    use std::collections::BTreeMap;

    use chrono::{DateTime, TimeZone, Utc};

    use crate::config::Config;
    use crate::rules::DraftFinding;
    use crate::snapshot::{
        AccessKey, AccountContext, AclGrant, IngressRule, PublicAccessBlock, ResourceSnapshot,
        Service,
    };

    pub fn capture_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    pub fn context() -> AccountContext {
        AccountContext::new(capture_time(), &Config::default())
    }

    /// Principal fixture defaults to a well-configured user; tests flip the
    /// fields they care about.
    pub struct PrincipalFixture {
        pub is_root: bool,
        pub mfa_enabled: bool,
        pub console_access: bool,
        pub attached_policies: Vec<String>,
        pub inline_policy_count: u32,
        pub access_keys: Vec<AccessKey>,
    }

    pub fn principal(
        id: &str,
        name: &str,
        configure: impl FnOnce(&mut PrincipalFixture),
    ) -> ResourceSnapshot {
        let mut fixture = PrincipalFixture {
            is_root: false,
            mfa_enabled: true,
            console_access: false,
            attached_policies: Vec::new(),
            inline_policy_count: 0,
            access_keys: Vec::new(),
        };
        configure(&mut fixture);
        ResourceSnapshot::Principal {
            id: id.to_string(),
            name: name.to_string(),
            is_root: fixture.is_root,
            mfa_enabled: fixture.mfa_enabled,
            console_access: fixture.console_access,
            attached_policies: fixture.attached_policies,
            inline_policy_count: fixture.inline_policy_count,
            access_keys: fixture.access_keys,
        }
    }

    /// Bucket fixture defaults to fully locked down.
    pub struct BucketFixture {
        pub public_access_block: Option<PublicAccessBlock>,
        pub encryption_enabled: bool,
        pub versioning_enabled: bool,
        pub logging_enabled: bool,
        pub wildcard_principal_policy: bool,
        pub acl_grants: Vec<AclGrant>,
    }

    pub fn bucket(name: &str, configure: impl FnOnce(&mut BucketFixture)) -> ResourceSnapshot {
        let mut fixture = BucketFixture {
            public_access_block: Some(PublicAccessBlock {
                block_public_acls: true,
                block_public_policy: true,
                ignore_public_acls: true,
                restrict_public_buckets: true,
            }),
            encryption_enabled: true,
            versioning_enabled: true,
            logging_enabled: true,
            wildcard_principal_policy: false,
            acl_grants: Vec::new(),
        };
        configure(&mut fixture);
        ResourceSnapshot::Bucket {
            name: name.to_string(),
            public_access_block: fixture.public_access_block,
            encryption_enabled: fixture.encryption_enabled,
            versioning_enabled: fixture.versioning_enabled,
            logging_enabled: fixture.logging_enabled,
            wildcard_principal_policy: fixture.wildcard_principal_policy,
            acl_grants: fixture.acl_grants,
        }
    }

    pub fn security_group(id: &str, name: &str, ingress_rules: Vec<IngressRule>) -> ResourceSnapshot {
        ResourceSnapshot::SecurityGroup {
            id: id.to_string(),
            name: name.to_string(),
            ingress_rules,
        }
    }

    /// Instance fixture defaults to a compliant running instance.
    pub struct InstanceFixture {
        pub running: bool,
        pub tags: BTreeMap<String, String>,
        pub public_ip: Option<String>,
        pub imds_v2_required: bool,
        pub monitoring_enabled: bool,
    }

    pub fn instance(id: &str, configure: impl FnOnce(&mut InstanceFixture)) -> ResourceSnapshot {
        let mut tags = BTreeMap::new();
        tags.insert("Name".to_string(), id.to_string());
        tags.insert("Environment".to_string(), "test".to_string());
        tags.insert("Owner".to_string(), "platform".to_string());

        let mut fixture = InstanceFixture {
            running: true,
            tags,
            public_ip: None,
            imds_v2_required: true,
            monitoring_enabled: true,
        };
        configure(&mut fixture);
        ResourceSnapshot::Instance {
            id: id.to_string(),
            running: fixture.running,
            tags: fixture.tags,
            public_ip: fixture.public_ip,
            imds_v2_required: fixture.imds_v2_required,
            monitoring_enabled: fixture.monitoring_enabled,
        }
    }

    /// Draft finding shaped like catalog output, for store-level tests.
    pub fn draft(check_id: &str, service: Service, resource_id: &str, risk_score: u8) -> DraftFinding {
        DraftFinding {
            check_id: check_id.to_string(),
            service,
            resource_id: resource_id.to_string(),
            resource_name: resource_id.to_string(),
            title: check_id.replace('_', " "),
            description: format!("{check_id} fired for {resource_id}"),
            recommendation: "fix it".to_string(),
            risk_score,
        }
    }

    /// An account with one misconfiguration of nearly every kind, for
    /// catalog-wide sweeps.
    pub fn misconfigured_account() -> Vec<ResourceSnapshot> {
        use chrono::Duration;

        let captured = capture_time();
        vec![
            principal("root-account", "Root Account", |p| {
                p.is_root = true;
                p.mfa_enabled = false;
            }),
            principal("alice", "alice", |p| {
                p.console_access = true;
                p.mfa_enabled = false;
                p.attached_policies = vec!["AdministratorAccess".to_string()];
                p.inline_policy_count = 1;
                p.access_keys = vec![AccessKey {
                    key_id: "AKIA1".to_string(),
                    active: true,
                    created_at: captured - Duration::days(500),
                    last_used_at: Some(captured - Duration::days(200)),
                }];
            }),
            ResourceSnapshot::PasswordPolicy {
                configured: true,
                minimum_length: Some(8),
                require_symbols: false,
                require_numbers: false,
            },
            bucket("exposed", |b| {
                b.public_access_block = None;
                b.wildcard_principal_policy = true;
                b.encryption_enabled = false;
                b.versioning_enabled = false;
                b.logging_enabled = false;
            }),
            security_group(
                "sg-1",
                "bastion",
                vec![IngressRule {
                    protocol: "tcp".to_string(),
                    from_port: Some(22),
                    to_port: Some(22),
                    ipv4_sources: vec!["0.0.0.0/0".to_string()],
                    ipv6_sources: vec!["::/0".to_string()],
                }],
            ),
            instance("i-1", |i| {
                i.public_ip = Some("203.0.113.10".to_string());
                i.imds_v2_required = false;
                i.monitoring_enabled = false;
                i.tags.clear();
            }),
            ResourceSnapshot::Volume {
                id: "vol-1".to_string(),
                name: None,
                encrypted: false,
                size_gb: 50,
            },
            ResourceSnapshot::BlockSnapshot {
                id: "snap-1".to_string(),
                volume_id: Some("vol-1".to_string()),
                public: true,
            },
        ]
    }
}
