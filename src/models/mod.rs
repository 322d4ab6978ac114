pub mod crd;
pub mod k8s;
pub mod release_report;
