use crate::rules::types::{Check, CheckOutcome};
use crate::scoring;
use crate::snapshot::{IngressRule, ResourceSnapshot, Service};

pub(crate) fn checks() -> Vec<Check> {
    vec![
        sg_all_ports_open(),
        sg_critical_port_open(),
        sg_port_open(),
        sg_ipv6_open(),
        instance_missing_tags(),
        instance_public_ip(),
        instance_imdsv1(),
        instance_monitoring_disabled(),
        volume_unencrypted(),
        snapshot_public(),
    ]
}

/// Single port targeted by a rule, when the rule covers exactly one.
fn single_port(rule: &IngressRule) -> Option<u16> {
    match (rule.from_port, rule.to_port) {
        (Some(from), Some(to)) if from == to => Some(from),
        (Some(from), None) => Some(from),
        _ => None,
    }
}

fn sg_all_ports_open() -> Check {
    Check {
        id: "sg_all_ports_open",
        service: Service::Compute,
        title: "Security Group - All Ports Open",
        description: "A security group allows all traffic from the internet",
        recommendation: "Restrict security group to specific ports and IP ranges",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::SecurityGroup {
                name,
                ingress_rules,
                ..
            } => {
                ingress_rules
                    .iter()
                    .find(|rule| rule.open_to_world() && rule.all_ports())?;
                Some(CheckOutcome {
                    description: format!(
                        "Security group {name} allows all traffic from 0.0.0.0/0"
                    ),
                    risk_score: 10,
                })
            }
            _ => None,
        },
    }
}

fn sg_critical_port_open() -> Check {
    Check {
        id: "sg_critical_port_open",
        service: Service::Compute,
        title: "Security Group - Critical Port Open to Internet",
        description: "A remote-access or database port is reachable from the internet",
        recommendation: "Restrict remote-access and database ports to specific IP ranges",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::SecurityGroup {
                name,
                ingress_rules,
                ..
            } => {
                let port = ingress_rules
                    .iter()
                    .filter(|rule| rule.open_to_world() && !rule.all_ports())
                    .filter_map(single_port)
                    .find(|port| scoring::critical_port_name(*port).is_some())?;
                let port_name = scoring::critical_port_name(port)?;
                Some(CheckOutcome {
                    description: format!(
                        "Security group {name} allows {port_name} (port {port}) from 0.0.0.0/0"
                    ),
                    risk_score: scoring::open_port_score(port),
                })
            }
            _ => None,
        },
    }
}

fn sg_port_open() -> Check {
    Check {
        id: "sg_port_open",
        service: Service::Compute,
        title: "Security Group - Port Open to Internet",
        description: "A non-web port is reachable from the internet",
        recommendation: "Restrict access to specific IP ranges",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::SecurityGroup {
                name,
                ingress_rules,
                ..
            } => {
                let port = ingress_rules
                    .iter()
                    .filter(|rule| rule.open_to_world() && !rule.all_ports())
                    .filter_map(single_port)
                    .find(|port| {
                        scoring::critical_port_name(*port).is_none() && !scoring::is_web_port(*port)
                    })?;
                Some(CheckOutcome {
                    description: format!(
                        "Security group {name} allows port {port} from 0.0.0.0/0"
                    ),
                    risk_score: 7,
                })
            }
            _ => None,
        },
    }
}

fn sg_ipv6_open() -> Check {
    Check {
        id: "sg_ipv6_open",
        service: Service::Compute,
        title: "Security Group - IPv6 Open to Internet",
        description: "A security group allows IPv6 traffic from anywhere",
        recommendation: "Restrict IPv6 access to specific ranges",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::SecurityGroup {
                name,
                ingress_rules,
                ..
            } => {
                ingress_rules.iter().find(|rule| rule.open_to_world_v6())?;
                Some(CheckOutcome {
                    description: format!("Security group {name} allows IPv6 traffic from ::/0"),
                    risk_score: 8,
                })
            }
            _ => None,
        },
    }
}

fn instance_missing_tags() -> Check {
    Check {
        id: "instance_missing_tags",
        service: Service::Compute,
        title: "Missing Security Tags",
        description: "A running instance is missing required management tags",
        recommendation: "Add required tags for proper resource management",
        eval: |snapshot, ctx| match snapshot {
            ResourceSnapshot::Instance {
                id,
                running: true,
                tags,
                ..
            } => {
                let missing: Vec<&str> = ctx
                    .required_tags
                    .iter()
                    .filter(|tag| !tags.contains_key(*tag))
                    .map(String::as_str)
                    .collect();
                if missing.is_empty() {
                    return None;
                }
                Some(CheckOutcome {
                    description: format!("Instance {id} missing tags: {}", missing.join(", ")),
                    risk_score: 3,
                })
            }
            _ => None,
        },
    }
}

fn instance_public_ip() -> Check {
    Check {
        id: "instance_public_ip",
        service: Service::Compute,
        title: "Instance with Public IP",
        description: "A running instance is directly reachable from the internet",
        recommendation: "Review if public IP is necessary, use bastion host or VPN instead",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Instance {
                id,
                running: true,
                public_ip: Some(ip),
                ..
            } => Some(CheckOutcome {
                description: format!("Instance {id} has public IP address {ip}"),
                risk_score: 5,
            }),
            _ => None,
        },
    }
}

fn instance_imdsv1() -> Check {
    Check {
        id: "instance_imdsv1",
        service: Service::Compute,
        title: "IMDSv1 Enabled",
        description: "A running instance accepts metadata requests without session tokens",
        recommendation: "Require IMDSv2 for better security",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Instance {
                id,
                running: true,
                imds_v2_required: false,
                ..
            } => Some(CheckOutcome {
                description: format!("Instance {id} allows IMDSv1 (insecure metadata service)"),
                risk_score: 6,
            }),
            _ => None,
        },
    }
}

fn instance_monitoring_disabled() -> Check {
    Check {
        id: "instance_monitoring_disabled",
        service: Service::Compute,
        title: "Detailed Monitoring Not Enabled",
        description: "A running instance has no detailed monitoring",
        recommendation: "Enable detailed monitoring for better visibility",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Instance {
                id,
                running: true,
                monitoring_enabled: false,
                ..
            } => Some(CheckOutcome {
                description: format!("Instance {id} does not have detailed monitoring enabled"),
                risk_score: 2,
            }),
            _ => None,
        },
    }
}

fn volume_unencrypted() -> Check {
    Check {
        id: "volume_unencrypted",
        service: Service::Compute,
        title: "Unencrypted Volume",
        description: "A block volume is not encrypted at rest",
        recommendation: "Enable encryption for all volumes",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::Volume {
                id,
                encrypted: false,
                ..
            } => Some(CheckOutcome {
                description: format!("Volume {id} is not encrypted"),
                risk_score: 7,
            }),
            _ => None,
        },
    }
}

fn snapshot_public() -> Check {
    Check {
        id: "snapshot_public",
        service: Service::Compute,
        title: "Public Snapshot",
        description: "A block snapshot is shared publicly",
        recommendation: "Remove public access from snapshot",
        eval: |snapshot, _ctx| match snapshot {
            ResourceSnapshot::BlockSnapshot {
                id, public: true, ..
            } => Some(CheckOutcome {
                description: format!("Snapshot {id} is publicly accessible"),
                risk_score: 9,
            }),
            _ => None,
        },
    }
}
