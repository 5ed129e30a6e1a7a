#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use cluster_conductor_core::{
    Catalog, Count, HostId, Hypervisor, Infrastructure, Level, NodeId, NodeSpec, NodeType,
    ObjectiveRule, ObjectiveSpec, PhysicalHostSpec, Pin, PodId, PodSelector, PodSpec,
    ResourceRequest, SchedulingHints, ValidationFlags,
};

pub fn node(id: &str, capacity: usize, vcpu: f64, memory: f64) -> NodeSpec {
    NodeSpec {
        id: NodeId::new(id),
        name: id.to_owned(),
        capacity,
        vcpu,
        memory,
        infrastructure: Infrastructure {
            node_type: NodeType::Worker,
            hypervisor: None,
            physical_host: None,
            storage_types: BTreeSet::new(),
            zone: None,
        },
    }
}

pub fn virtual_node(id: &str, host: &str) -> NodeSpec {
    let mut spec = node(id, 1, 4.0, 8.0);
    spec.infrastructure.hypervisor = Some(Hypervisor::Kvm);
    spec.infrastructure.physical_host = Some(HostId::new(host));
    spec
}

pub fn pod(id: &str, vcpu: f64, memory: f64) -> PodSpec {
    PodSpec {
        id: PodId::new(id),
        name: id.to_owned(),
        tag: id.split('-').next().unwrap_or(id).to_owned(),
        node: None,
        status: None,
        request: ResourceRequest { vcpu, memory },
        storage: None,
        scheduling: SchedulingHints::default(),
    }
}

fn solution(entries: &[(&str, &str)]) -> BTreeMap<PodId, NodeId> {
    entries
        .iter()
        .map(|(pod, node)| (PodId::new(*pod), NodeId::new(*node)))
        .collect()
}

/// Level 1: two frontend pods on node-1, one backend pod on node-2.
pub fn basic_scheduling() -> Level {
    Level {
        name: "Basic Scheduling".to_owned(),
        description: "Place pods onto nodes.".to_owned(),
        hint: Some("Frontends share node-1.".to_owned()),
        nodes: vec![
            node("node-1", 3, 4.0, 8.0),
            node("node-2", 3, 4.0, 8.0),
            node("node-3", 3, 4.0, 8.0),
        ],
        pods: vec![
            pod("frontend-1", 1.0, 1.0),
            pod("frontend-2", 1.0, 1.0),
            pod("backend-1", 1.0, 1.0),
        ],
        objectives: vec![
            ObjectiveSpec {
                description: "Schedule 2 frontend pods on node-1".to_owned(),
                rule: ObjectiveRule::CountOnNodes {
                    pods: PodSelector::Prefix("frontend".to_owned()),
                    nodes: vec![NodeId::new("node-1")],
                    count: Count::AtLeast(2),
                },
            },
            ObjectiveSpec {
                description: "Schedule the backend pod on node-2".to_owned(),
                rule: ObjectiveRule::CountOnNodes {
                    pods: PodSelector::Prefix("backend".to_owned()),
                    nodes: vec![NodeId::new("node-2")],
                    count: Count::AtLeast(1),
                },
            },
        ],
        physical_hosts: Vec::new(),
        control_plane: Vec::new(),
        validation: ValidationFlags::default(),
        solution: solution(&[
            ("frontend-1", "node-1"),
            ("frontend-2", "node-1"),
            ("backend-1", "node-2"),
        ]),
    }
}

/// Level 2: a job too large for node-1 must land on node-2.
pub fn resource_limits() -> Level {
    Level {
        name: "Resource Limits".to_owned(),
        description: "Respect vCPU and memory budgets.".to_owned(),
        hint: None,
        nodes: vec![node("node-1", 3, 4.0, 8.0), node("node-2", 3, 8.0, 16.0)],
        pods: vec![pod("big-job", 5.0, 2.0)],
        objectives: vec![ObjectiveSpec {
            description: "Run big-job on node-2".to_owned(),
            rule: ObjectiveRule::Pinned {
                pins: vec![Pin {
                    pod: "big-job".to_owned(),
                    node: NodeId::new("node-2"),
                }],
            },
        }],
        physical_hosts: Vec::new(),
        control_plane: Vec::new(),
        validation: ValidationFlags {
            resources: true,
            ..ValidationFlags::default()
        },
        solution: solution(&[("big-job", "node-2")]),
    }
}

/// Level 3: two ingress replicas must live on different physical hosts.
pub fn physical_hosts() -> Level {
    let mut ingress_1 = pod("ingress-1", 1.0, 1.0);
    ingress_1.scheduling.anti_affinity_key = Some("ingress".to_owned());
    let mut ingress_2 = pod("ingress-2", 1.0, 1.0);
    ingress_2.scheduling.anti_affinity_key = Some("ingress".to_owned());

    Level {
        name: "Physical Hosts".to_owned(),
        description: "Virtual machines can share hardware.".to_owned(),
        hint: None,
        nodes: vec![
            virtual_node("node-a", "host-1"),
            virtual_node("node-b", "host-1"),
            virtual_node("node-c", "host-2"),
        ],
        pods: vec![ingress_1, ingress_2],
        objectives: vec![ObjectiveSpec {
            description: "Keep ingress replicas on separate nodes".to_owned(),
            rule: ObjectiveRule::SeparatedPairs {
                pairs: vec![("ingress-1".to_owned(), "ingress-2".to_owned())],
            },
        }],
        physical_hosts: vec![
            PhysicalHostSpec {
                id: HostId::new("host-1"),
                name: "rack-1".to_owned(),
                pcpu: 16.0,
                memory: 64.0,
                zone: None,
            },
            PhysicalHostSpec {
                id: HostId::new("host-2"),
                name: "rack-2".to_owned(),
                pcpu: 16.0,
                memory: 64.0,
                zone: None,
            },
        ],
        control_plane: Vec::new(),
        validation: ValidationFlags {
            anti_affinity: true,
            ..ValidationFlags::default()
        },
        solution: solution(&[("ingress-1", "node-a"), ("ingress-2", "node-c")]),
    }
}

pub fn catalog() -> Catalog {
    Catalog::new(vec![basic_scheduling(), resource_limits(), physical_hosts()])
        .expect("fixture catalog is valid")
}

pub fn pod_id(value: &str) -> PodId {
    PodId::new(value)
}

pub fn node_id(value: &str) -> NodeId {
    NodeId::new(value)
}
