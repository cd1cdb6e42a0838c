//! SARIF 2.1.0 rendering of a run: resolution warnings and array initializers become results,
//! the run summary goes into the invocation properties.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use serde_sarif::sarif::{
    Artifact, Invocation, Location, LogicalLocation, Message, MultiformatMessageString,
    PropertyBag, ReportingDescriptor, Result as SarifResult, Run, SCHEMA_URL, Sarif, Tool,
    ToolComponent,
};

use crate::matcher::ArrayValues;
use crate::pipeline::{ArrayInitializerSite, PipelineOutput};
use crate::warning::{Warning, WarningKind};

const TOOL_NAME: &str = "classweave";
const ARRAY_INITIALIZER_RULE: &str = "ARRAY_INITIALIZER";

/// Counts and durations reported in the invocation properties.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    pub scan_ms: u128,
    pub pipeline_ms: u128,
    pub class_count: usize,
    pub artifact_count: usize,
    pub program_class_count: usize,
    pub library_class_count: usize,
    pub warning_count: usize,
    pub method_chain_links: usize,
    pub array_initializer_count: usize,
    pub warnings_by_kind: BTreeMap<&'static str, usize>,
}

impl RunSummary {
    pub fn from_pipeline(output: &PipelineOutput, initializers: &[ArrayInitializerSite]) -> Self {
        Self {
            pipeline_ms: output.timings.total().as_millis(),
            program_class_count: output.program_classes,
            library_class_count: output.library_classes,
            warning_count: output.warnings.len(),
            method_chain_links: output.chains.as_ref().map_or(0, |chains| chains.len()),
            array_initializer_count: initializers.len(),
            warnings_by_kind: output
                .warning_counts()
                .into_iter()
                .map(|(kind, count)| (kind.id(), count))
                .collect(),
            ..Self::default()
        }
    }
}

pub fn build_invocation(summary: &RunSummary, arguments: Vec<String>) -> Result<Invocation> {
    let command_line = arguments.join(" ");
    let mut properties = BTreeMap::new();
    let summary = serde_json::to_value(summary).context("serialize run summary")?;
    if let serde_json::Value::Object(fields) = summary {
        for (key, value) in fields {
            properties.insert(format!("{TOOL_NAME}.{key}"), value);
        }
    }

    Ok(Invocation::builder()
        .execution_successful(true)
        .arguments(arguments)
        .command_line(command_line)
        .properties(PropertyBag::builder().additional_properties(properties).build())
        .build())
}

pub fn build_sarif(
    artifacts: Vec<Artifact>,
    invocation: Invocation,
    warnings: &[Warning],
    initializers: &[ArrayInitializerSite],
) -> Sarif {
    let mut results: Vec<SarifResult> = warnings
        .iter()
        .map(warning_result)
        .chain(initializers.iter().map(initializer_result))
        .collect();
    results.sort_by(|left, right| {
        let left_id = left.rule_id.as_deref().unwrap_or("");
        let right_id = right.rule_id.as_deref().unwrap_or("");
        let left_msg = left.message.text.as_deref().unwrap_or("");
        let right_msg = right.message.text.as_deref().unwrap_or("");
        left_id.cmp(right_id).then(left_msg.cmp(right_msg))
    });

    let driver = ToolComponent::builder()
        .name(TOOL_NAME)
        .rules(rule_descriptors())
        .build();
    let tool = Tool {
        driver,
        extensions: None,
        properties: None,
    };
    let run = if artifacts.is_empty() {
        Run::builder()
            .tool(tool)
            .invocations(vec![invocation])
            .results(results)
            .build()
    } else {
        Run::builder()
            .tool(tool)
            .invocations(vec![invocation])
            .results(results)
            .artifacts(artifacts)
            .build()
    };

    Sarif::builder()
        .schema(SCHEMA_URL)
        .runs(vec![run])
        .version(json!("2.1.0"))
        .build()
}

fn rule_descriptors() -> Vec<ReportingDescriptor> {
    let mut descriptors: Vec<ReportingDescriptor> = WarningKind::ALL
        .iter()
        .map(|kind| rule_descriptor(kind.id(), warning_description(*kind)))
        .collect();
    descriptors.push(rule_descriptor(
        ARRAY_INITIALIZER_RULE,
        "Primitive array filled with constant values right after its creation.",
    ));
    descriptors.sort_by(|left, right| left.id.cmp(&right.id));
    descriptors
}

fn rule_descriptor(id: &str, description: &str) -> ReportingDescriptor {
    ReportingDescriptor::builder()
        .id(id)
        .short_description(MultiformatMessageString::builder().text(description).build())
        .build()
}

fn warning_description(kind: WarningKind) -> &'static str {
    match kind {
        WarningKind::MissingClass => "Referenced class is in neither the program nor the library.",
        WarningKind::MissingProgramMember => "Referenced member of a program class not found.",
        WarningKind::MissingLibraryMember => "Referenced member of a library class not found.",
        WarningKind::MissingSuperclass => "Superclass or interface not found.",
        WarningKind::LibraryDependsOnProgram => "Library class depends on a program class.",
        WarningKind::MissingEnclosingMethod => "Enclosing method of a local class not found.",
        WarningKind::InvalidSignature => "Generic signature is invalid and was removed.",
    }
}

fn warning_result(warning: &Warning) -> SarifResult {
    let logical = LogicalLocation::builder()
        .name(warning.context.as_str())
        .kind("type")
        .build();
    let mut result = SarifResult::builder()
        .message(result_message(warning.message.as_str()))
        .locations(vec![Location::builder().logical_locations(vec![logical]).build()])
        .build();
    result.rule_id = Some(warning.kind.id().to_string());
    result
}

fn initializer_result(site: &ArrayInitializerSite) -> SarifResult {
    let initialization = &site.initialization;
    let logical = LogicalLocation::builder()
        .name(format!(
            "{}.{}{}",
            site.class_name, site.method_name, site.method_descriptor
        ))
        .kind("function")
        .build();
    let message = format!(
        "{} array of {} elements initialized at offsets {}..={}",
        element_type_name(&initialization.values),
        initialization.values.len(),
        initialization.start,
        initialization.end
    );
    let mut result = SarifResult::builder()
        .message(result_message(message))
        .locations(vec![Location::builder().logical_locations(vec![logical]).build()])
        .build();
    result.rule_id = Some(ARRAY_INITIALIZER_RULE.to_string());
    result
}

fn element_type_name(values: &ArrayValues) -> &'static str {
    match values {
        ArrayValues::Boolean(_) => "boolean",
        ArrayValues::Byte(_) => "byte",
        ArrayValues::Char(_) => "char",
        ArrayValues::Short(_) => "short",
        ArrayValues::Int(_) => "int",
        ArrayValues::Long(_) => "long",
        ArrayValues::Float(_) => "float",
        ArrayValues::Double(_) => "double",
    }
}

fn result_message(text: impl Into<String>) -> Message {
    Message::builder().text(text.into()).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::ArrayInitialization;

    fn sample_warning() -> Warning {
        Warning {
            kind: WarningKind::MissingClass,
            context: "app/Main".to_string(),
            target: Some("org/gone/Type".to_string()),
            message: "can't find referenced class org/gone/Type".to_string(),
        }
    }

    fn sample_site() -> ArrayInitializerSite {
        ArrayInitializerSite {
            class_name: "app/Main".to_string(),
            method_name: "table".to_string(),
            method_descriptor: "()[I".to_string(),
            initialization: ArrayInitialization {
                values: ArrayValues::Int(vec![1, 2]),
                start: 3,
                end: 10,
            },
        }
    }

    #[test]
    fn sarif_is_minimal_and_valid_shape() {
        let invocation = build_invocation(&RunSummary::default(), Vec::new()).expect("invocation");
        let sarif = build_sarif(Vec::new(), invocation, &[], &[]);
        let value = serde_json::to_value(&sarif).expect("serialize SARIF");

        assert_eq!(value["version"], "2.1.0");
        assert_eq!(value["$schema"], SCHEMA_URL);
        assert_eq!(value["runs"][0]["tool"]["driver"]["name"], "classweave");
        assert!(
            value["runs"][0]["results"]
                .as_array()
                .expect("results array")
                .is_empty()
        );
        assert_eq!(value["runs"][0]["invocations"][0]["executionSuccessful"], true);
        assert_eq!(
            value["runs"][0]["invocations"][0]["properties"]["classweave.warning_count"],
            0
        );
    }

    #[test]
    fn warnings_and_initializers_become_sorted_results() {
        let invocation = build_invocation(&RunSummary::default(), Vec::new()).expect("invocation");
        let sarif = build_sarif(Vec::new(), invocation, &[sample_warning()], &[sample_site()]);
        let value = serde_json::to_value(&sarif).expect("serialize SARIF");

        let results = value["runs"][0]["results"].as_array().expect("results array");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["ruleId"], "ARRAY_INITIALIZER");
        assert_eq!(
            results[0]["message"]["text"],
            "int array of 2 elements initialized at offsets 3..=10"
        );
        assert_eq!(results[1]["ruleId"], "MISSING_CLASS");
        assert_eq!(
            results[1]["locations"][0]["logicalLocations"][0]["name"],
            "app/Main"
        );
        let rules = value["runs"][0]["tool"]["driver"]["rules"]
            .as_array()
            .expect("rules array");
        assert_eq!(rules.len(), WarningKind::ALL.len() + 1);
    }
}
