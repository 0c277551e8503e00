use crate::graph::types::LABELS_KEY;
use serde::Serialize;
use std::fmt;

/// Kind of graph element a query applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Node,
    Edge,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node => f.write_str("node"),
            Target::Edge => f.write_str("edge"),
        }
    }
}

/// How a field's value is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Plain string attribute
    Text,
    /// Rate, percentage or duration counter
    Numeric,
    /// Node kind enumeration
    NodeKind,
    /// Workload, app or service name
    Name,
    /// Presence flag, used as a unary expression
    Flag,
    /// Kubernetes label: compared as a string, or tested for presence
    Label,
}

/// Display option a query asks the host to turn on so that what it
/// filters on is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionRequest {
    ResponseTimeLabels,
    ThroughputLabels,
    Security,
    UnusedNodes,
    Rank,
}

impl OptionRequest {
    /// Message shown when the host honors the request
    pub fn message(self) -> &'static str {
        match self {
            OptionRequest::ResponseTimeLabels => {
                "Enabling \"response time\" edge labels for graph find/hide expression"
            }
            OptionRequest::ThroughputLabels => {
                "Enabling \"throughput\" edge labels for graph find/hide expression"
            }
            OptionRequest::Security => {
                "Enabling \"security\" display option for graph find/hide expression"
            }
            OptionRequest::UnusedNodes => {
                "Enabling \"unused nodes\" display option for graph find/hide expression"
            }
            OptionRequest::Rank => "Enabling \"rank\" display option for graph find/hide expression",
        }
    }
}

/// Every field an expression can refer to.
///
/// Each variant knows its element target, the attribute key it reads and how
/// its value is compared, so operator checks are exhaustive matches on
/// [`ValueKind`] rather than string lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    // node strings
    App,
    Cluster,
    Namespace,
    Service,
    Version,
    Workload,
    Name,
    NodeKind,
    // node counters
    GrpcIn,
    GrpcOut,
    HttpIn,
    HttpOut,
    TcpIn,
    TcpOut,
    Rank,
    // node flags
    CircuitBreaker,
    Dead,
    FaultInjection,
    Healthy,
    Inaccessible,
    Mirroring,
    OutOfMesh,
    Outside,
    RequestRouting,
    RequestTimeout,
    ServiceEntry,
    Sidecar,
    TcpTrafficShifting,
    TrafficShifting,
    TrafficSource,
    Unused,
    VirtualService,
    WorkloadEntry,
    /// `label:<name>`; the label name travels with the condition
    Label,
    // edge strings
    DestPrincipal,
    Protocol,
    SourcePrincipal,
    // edge counters
    Grpc,
    GrpcErr,
    GrpcTraffic,
    Http,
    HttpErr,
    HttpTraffic,
    ResponseTime,
    Tcp,
    Throughput,
    // edge flags
    Mtls,
    Traffic,
}

/// Operand names offered for completion
pub const OPERANDS: &[&str] = &[
    "%grpcerr",
    "%grpctraffic",
    "%httperr",
    "%httptraffic",
    "app",
    "circuitbreaker",
    "cluster",
    "dead",
    "destprincipal",
    "faultinjection",
    "grpc",
    "grpcin",
    "grpcout",
    "healthy",
    "http",
    "httpin",
    "httpout",
    "idle",
    "inaccessible",
    "label:",
    "mirroring",
    "mtls",
    "name",
    "namespace",
    "node",
    "outofmesh",
    "outside",
    "protocol",
    "rank",
    "requestrouting",
    "requesttimeout",
    "responsetime",
    "service",
    "serviceentry",
    "sidecar",
    "sourceprincipal",
    "tcp",
    "tcpin",
    "tcpout",
    "tcptrafficshifting",
    "throughput",
    "traffic",
    "trafficshifting",
    "trafficsource",
    "unused",
    "version",
    "virtualservice",
    "workload",
    "workloadentry",
];

/// Prefix of Kubernetes label operands
pub const LABEL_PREFIX: &str = "label:";

/// Label name of a `label:<name>` operand, case preserved
pub fn label_name(operand: &str) -> Option<&str> {
    let prefix = operand.get(..LABEL_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(LABEL_PREFIX) {
        return None;
    }
    Some(&operand[LABEL_PREFIX.len()..]).filter(|name| !name.is_empty())
}

impl FieldId {
    /// Resolve the left-hand side of a binary expression
    pub fn from_operand(name: &str) -> Option<Self> {
        if label_name(name).is_some() {
            return Some(FieldId::Label);
        }
        let field = match name.to_lowercase().as_str() {
            "app" => FieldId::App,
            "cluster" => FieldId::Cluster,
            "ns" | "namespace" => FieldId::Namespace,
            "svc" | "service" => FieldId::Service,
            "version" => FieldId::Version,
            "wl" | "workload" => FieldId::Workload,
            "name" => FieldId::Name,
            "node" => FieldId::NodeKind,
            "grpcin" => FieldId::GrpcIn,
            "grpcout" => FieldId::GrpcOut,
            "httpin" => FieldId::HttpIn,
            "httpout" => FieldId::HttpOut,
            "tcpin" => FieldId::TcpIn,
            "tcpout" => FieldId::TcpOut,
            "rank" => FieldId::Rank,
            "destprincipal" => FieldId::DestPrincipal,
            "protocol" => FieldId::Protocol,
            "sourceprincipal" => FieldId::SourcePrincipal,
            "grpc" => FieldId::Grpc,
            "%grpcerr" | "%grpcerror" => FieldId::GrpcErr,
            "%grpctraffic" => FieldId::GrpcTraffic,
            "http" => FieldId::Http,
            "%httperr" | "%httperror" => FieldId::HttpErr,
            "%httptraffic" => FieldId::HttpTraffic,
            "rt" | "responsetime" => FieldId::ResponseTime,
            "tcp" => FieldId::Tcp,
            "throughput" => FieldId::Throughput,
            _ => return None,
        };
        Some(field)
    }

    /// Resolve the word of a unary expression
    pub fn from_flag(name: &str) -> Option<Self> {
        if label_name(name).is_some() {
            return Some(FieldId::Label);
        }
        let field = match name.to_lowercase().as_str() {
            "cb" | "circuitbreaker" => FieldId::CircuitBreaker,
            "dead" => FieldId::Dead,
            "fi" | "faultinjection" => FieldId::FaultInjection,
            "healthy" => FieldId::Healthy,
            "inaccessible" => FieldId::Inaccessible,
            "mirroring" => FieldId::Mirroring,
            "om" | "outofmesh" => FieldId::OutOfMesh,
            "outside" | "outsider" => FieldId::Outside,
            "rr" | "requestrouting" => FieldId::RequestRouting,
            "rto" | "requesttimeout" => FieldId::RequestTimeout,
            "se" | "serviceentry" => FieldId::ServiceEntry,
            "sc" | "sidecar" => FieldId::Sidecar,
            "tcpts" | "tcptrafficshifting" => FieldId::TcpTrafficShifting,
            "ts" | "trafficshifting" => FieldId::TrafficShifting,
            "root" | "trafficsource" => FieldId::TrafficSource,
            "unused" | "idle" => FieldId::Unused,
            "vs" | "virtualservice" => FieldId::VirtualService,
            "we" | "workloadentry" => FieldId::WorkloadEntry,
            "mtls" => FieldId::Mtls,
            "traffic" => FieldId::Traffic,
            _ => return None,
        };
        Some(field)
    }

    pub fn target(self) -> Target {
        match self {
            FieldId::DestPrincipal
            | FieldId::Protocol
            | FieldId::SourcePrincipal
            | FieldId::Grpc
            | FieldId::GrpcErr
            | FieldId::GrpcTraffic
            | FieldId::Http
            | FieldId::HttpErr
            | FieldId::HttpTraffic
            | FieldId::ResponseTime
            | FieldId::Tcp
            | FieldId::Throughput
            | FieldId::Mtls
            | FieldId::Traffic => Target::Edge,
            _ => Target::Node,
        }
    }

    /// Attribute key read from element data.
    ///
    /// [`FieldId::Name`] reads several keys and has no single one; it
    /// returns an empty key.
    pub fn key(self) -> &'static str {
        match self {
            FieldId::App => "app",
            FieldId::Cluster => "cluster",
            FieldId::Namespace => "namespace",
            FieldId::Service => "service",
            FieldId::Version => "version",
            FieldId::Workload => "workload",
            FieldId::Name => "",
            FieldId::NodeKind => "nodeType",
            FieldId::GrpcIn => "grpcIn",
            FieldId::GrpcOut => "grpcOut",
            FieldId::HttpIn => "httpIn",
            FieldId::HttpOut => "httpOut",
            FieldId::TcpIn => "tcpIn",
            FieldId::TcpOut => "tcpOut",
            FieldId::Rank => "rank",
            FieldId::CircuitBreaker => "hasCB",
            FieldId::Dead => "isDead",
            FieldId::FaultInjection => "hasFaultInjection",
            FieldId::Healthy => "healthStatus",
            FieldId::Inaccessible => "isInaccessible",
            FieldId::Mirroring => "hasMirroring",
            FieldId::OutOfMesh | FieldId::Sidecar => "hasMissingSC",
            FieldId::Outside => "isOutside",
            FieldId::RequestRouting => "hasRequestRouting",
            FieldId::RequestTimeout => "hasRequestTimeout",
            FieldId::ServiceEntry => "isServiceEntry",
            FieldId::TcpTrafficShifting => "hasTCPTrafficShifting",
            FieldId::TrafficShifting => "hasTrafficShifting",
            FieldId::TrafficSource => "isRoot",
            FieldId::Unused => "isUnused",
            FieldId::VirtualService => "hasVS",
            FieldId::WorkloadEntry => "hasWorkloadEntry",
            FieldId::Label => LABELS_KEY,
            FieldId::DestPrincipal => "destPrincipal",
            FieldId::Protocol => "protocol",
            FieldId::SourcePrincipal => "sourcePrincipal",
            FieldId::Grpc => "grpc",
            FieldId::GrpcErr => "grpcPercentErr",
            FieldId::GrpcTraffic => "grpcPercentReq",
            FieldId::Http => "http",
            FieldId::HttpErr => "httpPercentErr",
            FieldId::HttpTraffic => "httpPercentReq",
            FieldId::ResponseTime => "responseTime",
            FieldId::Tcp => "tcp",
            FieldId::Throughput => "throughput",
            FieldId::Mtls => "isMTLS",
            FieldId::Traffic => "hasTraffic",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            FieldId::App
            | FieldId::Cluster
            | FieldId::Namespace
            | FieldId::Service
            | FieldId::Version
            | FieldId::Workload
            | FieldId::DestPrincipal
            | FieldId::Protocol
            | FieldId::SourcePrincipal => ValueKind::Text,
            FieldId::Name => ValueKind::Name,
            FieldId::Label => ValueKind::Label,
            FieldId::NodeKind => ValueKind::NodeKind,
            FieldId::GrpcIn
            | FieldId::GrpcOut
            | FieldId::HttpIn
            | FieldId::HttpOut
            | FieldId::TcpIn
            | FieldId::TcpOut
            | FieldId::Rank
            | FieldId::Grpc
            | FieldId::GrpcErr
            | FieldId::GrpcTraffic
            | FieldId::Http
            | FieldId::HttpErr
            | FieldId::HttpTraffic
            | FieldId::ResponseTime
            | FieldId::Tcp
            | FieldId::Throughput => ValueKind::Numeric,
            _ => ValueKind::Flag,
        }
    }

    /// Flags whose plain form matches elements that do NOT carry the
    /// attribute: `sidecar` means "has no missing-sidecar marker".
    pub fn inverted(self) -> bool {
        matches!(self, FieldId::Sidecar)
    }

    pub fn option_request(self) -> Option<OptionRequest> {
        match self {
            FieldId::ResponseTime => Some(OptionRequest::ResponseTimeLabels),
            FieldId::Throughput => Some(OptionRequest::ThroughputLabels),
            FieldId::Mtls | FieldId::DestPrincipal | FieldId::SourcePrincipal => {
                Some(OptionRequest::Security)
            }
            FieldId::Unused => Some(OptionRequest::UnusedNodes),
            FieldId::Rank => Some(OptionRequest::Rank),
            _ => None,
        }
    }
}
