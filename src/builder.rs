use std::sync::atomic::AtomicU32;
use std::time::Instant;

use tracing::{debug, warn};

use crate::build_cache::BuildCache;
use crate::certificate::{Certificate, CertificateStore};
use crate::emitter::{emit, Request};
use crate::error::Error;
use crate::manifest::request_hash;
use crate::project::Project;
use crate::verifier::verify_certificate;

static NEXT_BUILD_ID: AtomicU32 = AtomicU32::new(1);

/// The Builder contains all the mutable state for a single build.
/// This is separate from the Project, which only holds what the build reads.
pub struct Builder<'a> {
    /// Reference to the project being built.
    project: &'a Project,

    /// A single event handler is used across all requests.
    event_handler: Box<dyn FnMut(BuildEvent) + 'a>,

    pub status: BuildStatus,

    /// A unique id for each build.
    pub id: u32,

    /// Build metrics collected during verification.
    pub metrics: BuildMetrics,

    /// Whether we skip emission for requests that match hashes in the cache.
    pub check_hashes: bool,

    /// Whether build events carry the rendered certificate.
    pub render: bool,

    /// The new build cache, that is being produced as a result of this build.
    pub build_cache: Option<BuildCache>,
}

/// Metrics collected during a build.
#[derive(Clone, Debug, Default)]
pub struct BuildMetrics {
    /// The total number of certificates to be verified.
    pub certs_total: i32,

    /// The number of certificates that passed verification.
    pub certs_verified: i32,

    /// How many certificates were reused from the cache.
    pub certs_cached: i32,

    /// How many new certificates were created in this build.
    pub certs_created: i32,

    /// How many requests were rejected before anything was emitted.
    pub requests_rejected: i32,

    /// The number of declarations elaborated by the verifier.
    pub declarations: i32,

    /// The number of assertions checked by the verifier.
    pub assertions: i32,

    /// The total amount of time spent verifying, in seconds.
    pub verification_time: f64,
}

impl BuildMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(&self, status: BuildStatus) {
        println!();
        if self.certs_created > 0 {
            println!("{} certificates created", self.certs_created);
        }
        if self.certs_cached > 0 {
            println!("{} certificates cached", self.certs_cached);
        }
        if self.requests_rejected > 0 {
            println!("{} requests rejected", self.requests_rejected);
        }
        println!(
            "{} declarations elaborated, {} assertions checked",
            self.declarations, self.assertions
        );
        if self.certs_verified > 0 {
            let time_ms = 1000.0 * self.verification_time / self.certs_verified as f64;
            println!("{:.1} ms average verification time", time_ms);
        }
        println!("{}/{} OK", self.certs_verified, self.certs_total);
        match status {
            BuildStatus::Error => {
                println!("Compilation failed.");
            }
            BuildStatus::Warning => {
                println!("Verification failed.");
            }
            BuildStatus::Good => {
                println!("Verification succeeded.");
            }
        }
    }
}

/// A "build" is when we verify a set of certificates, determined by a Project.
/// For each build, we report many build events.
#[derive(Debug, Clone)]
pub struct BuildEvent {
    /// Which build this is an event for.
    pub build_id: u32,

    /// Current progress is done / total.
    pub progress: Option<(i32, i32)>,

    /// Human-readable
    pub log_message: Option<String>,

    /// The container that the build event is coming from.
    pub container: Option<String>,

    /// Whenever we run into a problem, report its kind.
    pub error_type: Option<&'static str>,

    /// Whenever we verify a certificate, report how many assertions it checked.
    pub verified: Option<usize>,

    /// The certificate as source text, when the builder is asked to render.
    pub rendered: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BuildStatus {
    /// No problems of any kind
    Good,

    /// Warnings indicate a well-formed request whose trace could not be computed
    Warning,

    /// Errors indicate either the user entered a bad request, or a certificate was rejected
    Error,
}

impl BuildStatus {
    pub fn verb(&self) -> &str {
        match self {
            BuildStatus::Good => "succeeded",
            BuildStatus::Warning => "warned",
            BuildStatus::Error => "errored",
        }
    }

    pub fn warn(&mut self) {
        if *self == BuildStatus::Good {
            *self = BuildStatus::Warning;
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, BuildStatus::Error)
    }

    pub fn is_good(&self) -> bool {
        matches!(self, BuildStatus::Good)
    }
}

impl<'a> Builder<'a> {
    pub fn new(project: &'a Project, event_handler: impl FnMut(BuildEvent) + 'a) -> Self {
        let event_handler = Box::new(event_handler);
        Builder {
            project,
            event_handler,
            status: BuildStatus::Good,
            id: NEXT_BUILD_ID.fetch_add(1, std::sync::atomic::Ordering::SeqCst),
            metrics: BuildMetrics::new(),
            check_hashes: true,
            render: false,
            build_cache: None,
        }
    }

    fn default_event(&self) -> BuildEvent {
        BuildEvent {
            build_id: self.id,
            progress: None,
            log_message: None,
            container: None,
            error_type: None,
            verified: None,
            rendered: None,
        }
    }

    /// Logs an informational message not tied to any particular container.
    /// This doesn't change build status.
    pub fn log_global(&mut self, message: String) {
        let event = BuildEvent {
            log_message: Some(message),
            ..self.default_event()
        };
        (self.event_handler)(event);
    }

    /// Logs a problem with one container and updates the build status.
    fn log_error(&mut self, container: &str, error: &Error) {
        warn!(container = %container, error = %error, kind = error.error_type(), "build problem");
        let event = BuildEvent {
            log_message: Some(format!("{}: {}", container, error)),
            container: Some(container.to_string()),
            error_type: Some(error.error_type()),
            ..self.default_event()
        };
        (self.event_handler)(event);
        if error.is_fatal() {
            self.status = BuildStatus::Error;
        } else {
            self.status.warn();
        }
    }

    /// Runs the verifier on one certificate, recording metrics and reporting the outcome.
    /// Returns whether the certificate was accepted.
    fn verify(&mut self, cert: &Certificate) -> bool {
        let start = Instant::now();
        let outcome = verify_certificate(cert, self.project.config.max_chain_length);
        self.metrics.verification_time += start.elapsed().as_secs_f64();
        match outcome {
            Ok(checker) => {
                self.metrics.certs_verified += 1;
                self.metrics.declarations += checker.len() as i32;
                self.metrics.assertions += cert.assertion_count() as i32;
                let event = BuildEvent {
                    container: Some(cert.container.clone()),
                    verified: Some(cert.assertion_count()),
                    rendered: if self.render {
                        Some(cert.render())
                    } else {
                        None
                    },
                    ..self.default_event()
                };
                (self.event_handler)(event);
                true
            }
            Err(e) => {
                self.log_error(&cert.container, &Error::from(e));
                false
            }
        }
    }

    /// Reuses the cached certificate for a request when its hash still matches.
    fn cached(&self, request: &Request) -> Option<Certificate> {
        if !self.check_hashes {
            return None;
        }
        self.project.find_cert(request).cloned()
    }

    /// Emits and verifies every request in the project.
    /// Accepted certificates go into a new build cache, which is written out if the
    /// whole build is good and the project is configured to write.
    pub fn build(&mut self) {
        let project = self.project;
        let max_chain_length = project.config.max_chain_length;
        self.metrics.certs_total = project.requests.len() as i32;
        self.event_progress(0);

        let mut new_cache = BuildCache::new();
        for (i, request) in project.requests.iter().enumerate() {
            let cert = match self.cached(request) {
                Some(cert) => {
                    debug!(container = %request.container, "using cached certificate");
                    self.metrics.certs_cached += 1;
                    cert
                }
                None => match emit(request, max_chain_length) {
                    Ok(cert) => {
                        self.metrics.certs_created += 1;
                        cert
                    }
                    Err(e) => {
                        self.metrics.requests_rejected += 1;
                        self.log_error(&request.container, &e);
                        self.event_progress(i as i32 + 1);
                        continue;
                    }
                },
            };

            if self.verify(&cert) {
                new_cache
                    .manifest
                    .insert(&request.container, request_hash(request));
                new_cache.insert(&request.container, CertificateStore { certs: vec![cert] });
            }
            self.event_progress(i as i32 + 1);
        }

        if project.config.write_cache && self.status.is_good() {
            if let Err(e) = new_cache.save(&project.config.build_dir) {
                self.log_global(format!("error saving build cache: {}", e));
                self.status = BuildStatus::Error;
            }
        }
        self.build_cache = Some(new_cache);
    }

    /// Verifies stored certificates from scratch, with no emission and no cache.
    pub fn reverify(&mut self, store: &CertificateStore) {
        self.metrics.certs_total = store.certs.len() as i32;
        self.event_progress(0);
        for (i, cert) in store.certs.iter().enumerate() {
            self.verify(cert);
            self.event_progress(i as i32 + 1);
        }
    }

    fn event_progress(&mut self, done: i32) {
        let event = BuildEvent {
            progress: Some((done, self.metrics.certs_total)),
            ..self.default_event()
        };
        (self.event_handler)(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::ProofKind;
    use crate::project::ProjectConfig;

    fn collect(project: &Project) -> (BuildStatus, BuildMetrics, Vec<BuildEvent>) {
        let mut events = Vec::new();
        let (status, metrics) = {
            let mut builder = Builder::new(project, |event| events.push(event));
            builder.build();
            (builder.status, builder.metrics.clone())
        };
        (status, metrics, events)
    }

    #[test]
    fn test_build_single_request() {
        let project = Project::single(
            Request::new("Fib", ProofKind::Fibonacci { depth: 4 }),
            ProjectConfig::default(),
        );
        let (status, metrics, events) = collect(&project);
        assert!(status.is_good());
        assert_eq!(metrics.certs_created, 1);
        assert_eq!(metrics.certs_verified, 1);
        assert_eq!(metrics.declarations, 8);
        assert_eq!(metrics.assertions, 6);
        assert_eq!(events.iter().filter(|e| e.verified.is_some()).count(), 1);
        assert_eq!(events.last().and_then(|e| e.progress), Some((1, 1)));
    }

    #[test]
    fn test_rejected_request_is_an_error() {
        let mut project = Project::single(
            Request::new("Table", ProofKind::MultiplicationTable { multiplier: 1, depth: 2 }),
            ProjectConfig::default(),
        );
        project
            .requests
            .push(Request::new("Sum", ProofKind::Addition { left: 2, right: 2 }));
        let (status, metrics, events) = collect(&project);
        assert_eq!(status, BuildStatus::Error);
        assert_eq!(metrics.requests_rejected, 1);
        assert_eq!(metrics.certs_verified, 1);
        let messages: Vec<_> = events.iter().filter_map(|e| e.log_message.clone()).collect();
        assert_eq!(
            messages,
            vec!["Table: Table.multiplier: multiplier must be at least 2".to_string()]
        );
        assert_eq!(
            events.iter().find_map(|e| e.error_type),
            Some("ValidationError")
        );
    }

    #[test]
    fn test_reverify_rejects_tampered_certificate() {
        let request = Request::new("Sum", ProofKind::Addition { left: 2, right: 3 });
        let mut cert = emit(&request, 4096).unwrap();
        cert.declarations.swap(0, 1);
        let project = Project::new(ProjectConfig {
            read_cache: false,
            write_cache: false,
            ..ProjectConfig::default()
        });
        let mut builder = Builder::new(&project, |_| {});
        builder.reverify(&CertificateStore { certs: vec![cert] });
        assert!(builder.status.is_error());
        assert_eq!(builder.metrics.certs_verified, 0);
    }
}
