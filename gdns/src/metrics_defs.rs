use shared::metrics_defs::{MetricDef, MetricType};

pub const ACTION_REQUESTS: MetricDef = MetricDef {
    name: "globaldns.action.requests",
    metric_type: MetricType::Counter,
    description: "Action requests handled. Tagged with action, outcome.",
};

pub const UPDATE_CONFLICTS: MetricDef = MetricDef {
    name: "globaldns.update.conflicts",
    metric_type: MetricType::Counter,
    description: "Revision conflicts absorbed by the update retry loop",
};

pub const UPDATE_RETRIES_EXHAUSTED: MetricDef = MetricDef {
    name: "globaldns.update.retries_exhausted",
    metric_type: MetricType::Counter,
    description: "Updates that spent the whole retry budget on conflicts",
};

pub const ALL_METRICS: &[MetricDef] = &[ACTION_REQUESTS, UPDATE_CONFLICTS, UPDATE_RETRIES_EXHAUSTED];
