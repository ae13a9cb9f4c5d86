//! # teltrip-ocs
//!
//! Request/response client for the OCS (Online Charging System) API.
//!
//! This crate provides:
//! - [`OcsRequest`] - Typed request envelopes for the operations teltrip consumes
//! - [`OcsApi`] - Trait for executing one operation against the OCS
//! - [`OcsClient`] - reqwest implementation of [`OcsApi`]
//! - [`LimitedOcs`] - Semaphore-bounded wrapper capping in-flight requests
//! - [`MockOcs`] - Scripted in-memory implementation for tests
//! - Lenient payload types plus [`extract_payload`] for decoding responses
//!
//! ## Operations
//!
//! | Operation | Request | Response payload |
//! |---|---|---|
//! | `listSubscriber` | `accountId` | [`SubscriberListPayload`] |
//! | `getSingleSubscriber` | `iccid`, `withSimInfo`, `onlySubsInfo` | [`SubscriberListPayload`] |
//! | `listSubscriberPrepaidPackages` | `subscriberId` | [`PackageListPayload`] |
//! | `listPrepaidPackageTemplate` | `templateId` | [`TemplatePayload`] |
//! | `subscriberUsageOverPeriod` | `subscriber`, `period` | [`UsagePayload`] |

pub mod client;
pub mod error;
pub mod limit;
pub mod mock;
pub mod types;

pub use client::{OcsApi, OcsClient};
pub use error::{OcsError, Result};
pub use limit::LimitedOcs;
pub use mock::MockOcs;
pub use types::{
    OcsRequest, OneOrMany, PackageListPayload, Period, RawImsi, RawPackageTemplateRef,
    RawPrepaidPackage, RawSubscriber, RawTemplate, SubscriberListPayload, SubscriberRef,
    TemplatePayload, UsagePayload, UsageTotal, extract_payload,
};
