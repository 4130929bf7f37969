use crate::rules::types::{Check, CheckOutcome};
use crate::scoring;
use crate::snapshot::{AccessKey, AccountContext, ResourceSnapshot, Service};

/// Managed policies that grant administrative reach.
const ADMIN_POLICIES: &[&str] = &["AdministratorAccess", "PowerUserAccess", "IAMFullAccess"];

pub(crate) fn checks() -> Vec<Check> {
    vec![
        root_mfa_disabled(),
        user_mfa_disabled(),
        admin_policy_attached(),
        unused_access_key(),
        stale_access_key(),
        password_policy_missing(),
        weak_password_policy(),
        inline_policies(),
    ]
}

fn days_idle(key: &AccessKey, ctx: &AccountContext) -> i64 {
    let reference = key.last_used_at.unwrap_or(key.created_at);
    (ctx.captured_at - reference).num_days()
}

fn key_age_days(key: &AccessKey, ctx: &AccountContext) -> i64 {
    (ctx.captured_at - key.created_at).num_days()
}

fn root_mfa_disabled() -> Check {
    Check {
        id: "root_mfa_disabled",
        service: Service::Identity,
        title: "Root Account MFA Not Enabled",
        description: "The account's root principal does not require multi-factor authentication",
        recommendation: "Enable MFA on the root account immediately",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Principal {
                is_root: true,
                mfa_enabled: false,
                name,
                ..
            } => Some(CheckOutcome {
                description: format!("{name} does not have MFA enabled"),
                risk_score: 10,
            }),
            _ => None,
        },
    }
}

fn user_mfa_disabled() -> Check {
    Check {
        id: "user_mfa_disabled",
        service: Service::Identity,
        title: "User Without MFA",
        description: "A principal with console access has no MFA device enrolled",
        recommendation: "Enable MFA for this user",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Principal {
                is_root: false,
                mfa_enabled: false,
                console_access: true,
                name,
                ..
            } => Some(CheckOutcome {
                description: format!("User {name} has console access but no MFA enabled"),
                risk_score: 8,
            }),
            _ => None,
        },
    }
}

fn admin_policy_attached() -> Check {
    Check {
        id: "admin_policy_attached",
        service: Service::Identity,
        title: "User with Admin Privileges",
        description: "A principal carries an administrative managed policy",
        recommendation: "Review if admin access is necessary, use groups instead",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Principal {
                is_root: false,
                name,
                attached_policies,
                ..
            } => {
                let admin = attached_policies.iter().find(|policy| {
                    ADMIN_POLICIES.iter().any(|known| policy.contains(known))
                })?;
                Some(CheckOutcome {
                    description: format!("User {name} has administrative policy {admin}"),
                    risk_score: 8,
                })
            }
            _ => None,
        },
    }
}

fn unused_access_key() -> Check {
    Check {
        id: "unused_access_key",
        service: Service::Identity,
        title: "Unused Access Key",
        description: "An active access key has not been used past the staleness threshold",
        recommendation: "Rotate or deactivate unused access keys",
        eval: |snapshot, ctx| match snapshot {
            ResourceSnapshot::Principal {
                name, access_keys, ..
            } => {
                // Report the worst offender; one finding per principal so
                // the lifecycle tracks the principal, not the key.
                let (key, idle) = access_keys
                    .iter()
                    .filter(|key| key.active)
                    .map(|key| (key, days_idle(key, ctx)))
                    .filter(|(_, idle)| *idle > ctx.unused_key_days)
                    .max_by_key(|(_, idle)| *idle)?;
                Some(CheckOutcome {
                    description: format!(
                        "Access key {} for user {name} unused for {idle} days",
                        key.key_id
                    ),
                    risk_score: scoring::unused_key_score(idle),
                })
            }
            _ => None,
        },
    }
}

fn stale_access_key() -> Check {
    Check {
        id: "stale_access_key",
        service: Service::Identity,
        title: "Old Access Key",
        description: "An active access key is older than the rotation threshold",
        recommendation: "Rotate access keys regularly (at least annually)",
        eval: |snapshot, ctx| match snapshot {
            ResourceSnapshot::Principal {
                name, access_keys, ..
            } => {
                let (key, age) = access_keys
                    .iter()
                    .filter(|key| key.active)
                    .map(|key| (key, key_age_days(key, ctx)))
                    .filter(|(_, age)| *age > ctx.stale_key_days)
                    .max_by_key(|(_, age)| *age)?;
                Some(CheckOutcome {
                    description: format!(
                        "Access key {} for user {name} is {age} days old",
                        key.key_id
                    ),
                    risk_score: 5,
                })
            }
            _ => None,
        },
    }
}

fn password_policy_missing() -> Check {
    Check {
        id: "password_policy_missing",
        service: Service::Identity,
        title: "No Password Policy",
        description: "The account has no password policy configured",
        recommendation: "Configure a strong password policy",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::PasswordPolicy {
                configured: false, ..
            } => Some(CheckOutcome {
                description: "No password policy configured for the account".to_string(),
                risk_score: 7,
            }),
            _ => None,
        },
    }
}

fn weak_password_policy() -> Check {
    Check {
        id: "weak_password_policy",
        service: Service::Identity,
        title: "Weak Password Policy",
        description: "The account password policy is below recommended strength",
        recommendation: "Require at least 14 characters with symbols and numbers",
        eval: |snapshot, ctx| match snapshot {
            ResourceSnapshot::PasswordPolicy {
                configured: true,
                minimum_length,
                require_symbols,
                require_numbers,
            } => {
                let length = minimum_length.unwrap_or(0);
                let too_short = length < ctx.min_password_length;
                let mut weaknesses = Vec::new();
                if too_short {
                    weaknesses.push(format!(
                        "minimum length is {length} (recommended: {}+)",
                        ctx.min_password_length
                    ));
                }
                if !require_symbols {
                    weaknesses.push("symbols are not required".to_string());
                }
                if !require_numbers {
                    weaknesses.push("numbers are not required".to_string());
                }
                if weaknesses.is_empty() {
                    return None;
                }
                Some(CheckOutcome {
                    description: format!("Password policy is weak: {}", weaknesses.join(", ")),
                    risk_score: scoring::password_policy_score(too_short),
                })
            }
            _ => None,
        },
    }
}

fn inline_policies() -> Check {
    Check {
        id: "inline_policies",
        service: Service::Identity,
        title: "Inline Policy Usage",
        description: "A principal carries inline policies instead of managed ones",
        recommendation: "Use managed policies instead of inline policies for better governance",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Principal {
                name,
                inline_policy_count,
                ..
            } if *inline_policy_count > 0 => Some(CheckOutcome {
                description: format!("User {name} has {inline_policy_count} inline policies"),
                risk_score: 3,
            }),
            _ => None,
        },
    }
}
