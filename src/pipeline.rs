//! Initialization pipeline over a populated universe: hierarchy linking, reference
//! initialization, and method linking, in that order.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::attribute::code_attribute;
use crate::classpath::Universe;
use crate::filter::ClassNameFilter;
use crate::hierarchy::{link_subclasses, link_supers};
use crate::instruction::decode_all;
use crate::ir::PoolKind;
use crate::linker::{MethodChains, MethodLinker};
use crate::logging::in_phase;
use crate::matcher::{ArrayInitialization, ArrayInitializationMatcher};
use crate::reference::ReferenceInitializer;
use crate::warning::{
    FilteredSink, TracingSink, Warning, WarningCollector, WarningKind, WarningSink,
};

/// Pipeline switches.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Collect resolution warnings; when off every phase runs silently.
    pub warn: bool,
    /// Member references are also searched in ancestors of the named class.
    pub search_hierarchy: bool,
    /// Warnings naming a matching class are dropped.
    pub dont_warn: Option<ClassNameFilter>,
    pub link_methods: bool,
    /// Also log each kept warning at `warn` level once the run finishes.
    pub log_warnings: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            warn: true,
            search_hierarchy: true,
            dont_warn: None,
            link_methods: true,
            log_warnings: false,
        }
    }
}

/// Duration of each pipeline phase.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineTimings {
    pub super_link: Duration,
    pub sub_link: Duration,
    pub references: Duration,
    pub method_link: Duration,
}

impl PipelineTimings {
    pub fn total(&self) -> Duration {
        self.super_link + self.sub_link + self.references + self.method_link
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub program_classes: usize,
    pub library_classes: usize,
    pub warnings: Vec<Warning>,
    /// `None` when method linking is disabled.
    pub chains: Option<MethodChains>,
    pub timings: PipelineTimings,
}

impl PipelineOutput {
    pub fn warning_counts(&self) -> BTreeMap<WarningKind, usize> {
        let mut counts = BTreeMap::new();
        for warning in &self.warnings {
            *counts.entry(warning.kind).or_insert(0) += 1;
        }
        counts
    }
}

/// Runs the initialization phases over a universe.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, universe: &mut Universe) -> PipelineOutput {
        let collector = WarningCollector::new();
        let filtered = self
            .config
            .dont_warn
            .clone()
            .map(|filter| FilteredSink::new(&collector, filter));
        let sink: Option<&dyn WarningSink> = match (&filtered, self.config.warn) {
            (_, false) => None,
            (Some(filtered), true) => Some(filtered),
            (None, true) => Some(&collector),
        };

        let mut timings = PipelineTimings::default();
        timings.super_link = in_phase("hierarchy.super", || {
            link_supers(universe, PoolKind::Program, sink);
            link_supers(universe, PoolKind::Library, sink);
        })
        .1;
        timings.sub_link = in_phase("hierarchy.sub", || {
            link_subclasses(universe, &[PoolKind::Program, PoolKind::Library]);
        })
        .1;
        timings.references = in_phase("references", || {
            let mut initializer = ReferenceInitializer::new(universe, sink);
            if !self.config.search_hierarchy {
                initializer = initializer.without_hierarchy_search();
            }
            initializer.initialize_pool(universe, PoolKind::Program);
            initializer.initialize_pool(universe, PoolKind::Library);
        })
        .1;
        let chains = if self.config.link_methods {
            let (chains, duration) =
                in_phase("methods.link", || MethodLinker::new().link(universe));
            timings.method_link = duration;
            Some(chains)
        } else {
            None
        };
        drop(filtered);

        let output = PipelineOutput {
            program_classes: universe.pool(PoolKind::Program).len(),
            library_classes: universe.pool(PoolKind::Library).len(),
            warnings: collector.into_warnings(),
            chains,
            timings,
        };
        if self.config.log_warnings {
            for warning in &output.warnings {
                TracingSink.warn(warning.clone());
            }
        }
        info!(
            program = output.program_classes,
            library = output.library_classes,
            warnings = output.warnings.len(),
            "initialized class graph in {:?}",
            timings.total()
        );
        output
    }
}

/// A primitive array initializer found in a program method.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayInitializerSite {
    pub class_name: String,
    pub method_name: String,
    pub method_descriptor: String,
    pub initialization: ArrayInitialization,
}

/// Scans the code of every program method for primitive array initializers.
///
/// Methods whose code cannot be decoded are skipped.
pub fn find_array_initializers(universe: &Universe) -> Vec<ArrayInitializerSite> {
    let matcher = ArrayInitializationMatcher::new();
    let mut sites = Vec::new();
    for id in universe.class_ids(PoolKind::Program) {
        let class = universe.class(id);
        for method in &class.methods {
            let Some(code) = code_attribute(&method.attributes) else {
                continue;
            };
            let instructions = match decode_all(&code.code) {
                Ok(instructions) => instructions,
                Err(err) => {
                    debug!(
                        "skipping {}.{}{}: {err:#}",
                        class.name, method.name, method.descriptor
                    );
                    continue;
                }
            };
            for initialization in matcher.find_all(class.constant_pool(), &instructions) {
                sites.push(ArrayInitializerSite {
                    class_name: class.name.clone(),
                    method_name: method.name.clone(),
                    method_descriptor: method.descriptor.clone(),
                    initialization,
                });
            }
        }
    }
    sites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessFlags;
    use crate::ir::MemberId;
    use crate::matcher::ArrayValues;
    use crate::opcodes;
    use crate::test_harness::{
        CodeBuilder, member, method_with_code, program_class, universe_with_platform,
    };

    fn universe_with_chain() -> Universe {
        let mut universe = universe_with_platform();
        universe
            .add_program(
                program_class("app/Base", Some("java/lang/Object"), &[])
                    .with_method(member("run", "()V", AccessFlags::PUBLIC)),
            )
            .expect("add base");
        universe
            .add_program(
                program_class("app/Child", Some("app/Base"), &["app/Missing"])
                    .with_method(member("run", "()V", AccessFlags::PUBLIC)),
            )
            .expect("add child");
        universe
    }

    #[test]
    fn run_links_hierarchy_and_methods() {
        let mut universe = universe_with_chain();

        let output = Pipeline::default().run(&mut universe);

        let base = universe.lookup("app/Base").expect("base");
        let child = universe.lookup("app/Child").expect("child");
        assert_eq!(universe.class(child).super_class, Some(base));
        assert!(universe.class(base).subclasses.contains(&child));
        let chains = output.chains.expect("chains");
        assert!(chains.are_linked(MemberId::method(base, 0), MemberId::method(child, 0)));
        assert_eq!(output.program_classes, 2);
        assert_eq!(output.warning_counts().get(&WarningKind::MissingSuperclass), Some(&1));
    }

    #[test]
    fn dont_warn_filter_and_silent_mode_drop_warnings() {
        let mut universe = universe_with_chain();
        let config = PipelineConfig {
            dont_warn: Some(ClassNameFilter::parse("app/Missing")),
            ..PipelineConfig::default()
        };
        assert!(Pipeline::new(config).run(&mut universe).warnings.is_empty());

        let mut universe = universe_with_chain();
        let config = PipelineConfig {
            warn: false,
            link_methods: false,
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(config).run(&mut universe);
        assert!(output.warnings.is_empty());
        assert!(output.chains.is_none());
    }

    #[test]
    fn logging_warnings_keeps_them_in_output() {
        let mut universe = universe_with_chain();
        let config = PipelineConfig {
            log_warnings: true,
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(config).run(&mut universe);
        assert_eq!(output.warning_counts().get(&WarningKind::MissingSuperclass), Some(&1));
    }

    #[test]
    fn run_twice_keeps_subclass_sets_stable() {
        let mut universe = universe_with_chain();
        let pipeline = Pipeline::default();
        pipeline.run(&mut universe);
        let base = universe.lookup("app/Base").expect("base");
        let first = universe.class(base).subclasses.clone();

        pipeline.run(&mut universe);

        assert_eq!(universe.class(base).subclasses, first);
    }

    #[test]
    fn array_initializers_are_found_in_program_methods() {
        let code = CodeBuilder::new()
            .iconst(2)
            .newarray(opcodes::T_CHAR)
            .op(opcodes::DUP)
            .iconst(0)
            .iconst(104)
            .op(opcodes::CASTORE)
            .op(opcodes::DUP)
            .iconst(1)
            .iconst(105)
            .op(opcodes::CASTORE)
            .op(opcodes::ARETURN)
            .build();
        let mut universe = universe_with_platform();
        universe
            .add_program(
                program_class("app/Greeting", Some("java/lang/Object"), &[]).with_method(
                    method_with_code("chars", "()[C", AccessFlags::STATIC, code),
                ),
            )
            .expect("add class");

        let sites = find_array_initializers(&universe);

        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].class_name, "app/Greeting");
        assert_eq!(sites[0].method_name, "chars");
        assert_eq!(
            sites[0].initialization.values,
            ArrayValues::Char(vec![104, 105])
        );
    }
}
