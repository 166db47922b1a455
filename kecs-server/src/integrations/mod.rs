//! L2 integrations: each owns a translation from one AWS concept to a
//! Kubernetes concept, plus lifecycle sync against the emulation backend
//! (spec 4.6).

pub mod cloudwatch_logs;
pub mod iam;
pub mod s3_artifacts;
pub mod secrets;
pub mod service_discovery;
