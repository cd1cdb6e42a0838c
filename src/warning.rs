use std::cell::RefCell;

use tracing::warn;

use crate::filter::ClassNameFilter;

/// Category of a resolution problem.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum WarningKind {
    MissingClass,
    MissingProgramMember,
    MissingLibraryMember,
    MissingSuperclass,
    LibraryDependsOnProgram,
    MissingEnclosingMethod,
    InvalidSignature,
}

impl WarningKind {
    pub fn id(self) -> &'static str {
        match self {
            WarningKind::MissingClass => "MISSING_CLASS",
            WarningKind::MissingProgramMember => "MISSING_PROGRAM_MEMBER",
            WarningKind::MissingLibraryMember => "MISSING_LIBRARY_MEMBER",
            WarningKind::MissingSuperclass => "MISSING_SUPERCLASS",
            WarningKind::LibraryDependsOnProgram => "LIBRARY_DEPENDS_ON_PROGRAM",
            WarningKind::MissingEnclosingMethod => "MISSING_ENCLOSING_METHOD",
            WarningKind::InvalidSignature => "INVALID_SIGNATURE",
        }
    }

    pub const ALL: [WarningKind; 7] = [
        WarningKind::MissingClass,
        WarningKind::MissingProgramMember,
        WarningKind::MissingLibraryMember,
        WarningKind::MissingSuperclass,
        WarningKind::LibraryDependsOnProgram,
        WarningKind::MissingEnclosingMethod,
        WarningKind::InvalidSignature,
    ];
}

/// One diagnostic: the referencing class, the class it failed to reach, and a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub context: String,
    pub target: Option<String>,
    pub message: String,
}

/// Receiver of resolution diagnostics. `None` where a sink is optional means silent.
pub trait WarningSink {
    fn warn(&self, warning: Warning);
}

pub(crate) fn emit(
    sink: Option<&dyn WarningSink>,
    kind: WarningKind,
    context: &str,
    target: Option<&str>,
    message: String,
) {
    if let Some(sink) = sink {
        sink.warn(Warning {
            kind,
            context: context.to_string(),
            target: target.map(str::to_string),
            message,
        });
    }
}

/// Logs each warning through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn warn(&self, warning: Warning) {
        warn!(
            kind = warning.kind.id(),
            context = %warning.context,
            subject = warning.target.as_deref().unwrap_or(""),
            "{}",
            warning.message
        );
    }
}

/// Keeps every warning in arrival order.
#[derive(Debug, Default)]
pub struct WarningCollector {
    warnings: RefCell<Vec<Warning>>,
}

impl WarningCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.warnings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.borrow().is_empty()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings
            .borrow()
            .iter()
            .filter(|warning| warning.kind == kind)
            .count()
    }

    pub fn snapshot(&self) -> Vec<Warning> {
        self.warnings.borrow().clone()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings.into_inner()
    }
}

impl WarningSink for WarningCollector {
    fn warn(&self, warning: Warning) {
        self.warnings.borrow_mut().push(warning);
    }
}

/// Drops warnings whose target class (or referencing class, without a target) matches the
/// filter.
pub struct FilteredSink<'a> {
    inner: &'a dyn WarningSink,
    filter: ClassNameFilter,
}

impl<'a> FilteredSink<'a> {
    pub fn new(inner: &'a dyn WarningSink, filter: ClassNameFilter) -> Self {
        Self { inner, filter }
    }
}

impl WarningSink for FilteredSink<'_> {
    fn warn(&self, warning: Warning) {
        let subject = warning.target.as_deref().unwrap_or(&warning.context);
        if self.filter.matches(subject) {
            return;
        }
        self.inner.warn(warning);
    }
}
