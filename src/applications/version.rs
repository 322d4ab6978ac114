//! Best-effort version extraction from resource labels.
use std::collections::BTreeMap;

/// Label Knative Serving puts on revision-owned deployments.
pub const REVISION_LABEL: &str = "serving.knative.dev/revision";

type Rule = (&'static str, fn(&str) -> Option<String>);

/// Probed in order; the first rule producing a value wins.
const RULES: &[Rule] = &[
    ("version", verbatim),
    ("chart", chart_version),
    (REVISION_LABEL, revision_version),
];

/// Version of a deployment, or an empty string when no known label is set.
///
/// Not a semver parser: a chart named `my-chart-1-2-3` yields `3`.
pub fn extract_version(labels: &BTreeMap<String, String>) -> String {
    RULES
        .iter()
        .find_map(|(key, extract)| {
            labels
                .get(*key)
                .filter(|value| !value.is_empty())
                .and_then(|value| extract(value))
        })
        .unwrap_or_default()
}

fn verbatim(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn chart_version(chart: &str) -> Option<String> {
    match chart.rsplit('-').next() {
        Some(last) if !last.is_empty() => Some(last.to_string()),
        _ => Some(chart.to_string()),
    }
}

fn revision_version(revision: &str) -> Option<String> {
    let version = match revision.rsplit_once('-') {
        Some((_, suffix)) => suffix,
        None => revision,
    };
    Some(version.to_string())
}
