//! Input traversal: class files, directories, and JARs (following manifest `Class-Path`
//! entries) are read into program or library classes and listed as SARIF artifacts.

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use serde_sarif::sarif::{Artifact, ArtifactLocation, ArtifactRoles};
use tracing::{debug, debug_span};
use zip::ZipArchive;

use crate::classfile::{read_library_class, read_program_class};
use crate::classpath::Universe;
use crate::ir::{Class, PoolKind};

/// Parsed artifacts and classes of one scan, split by pool.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub artifacts: Vec<Artifact>,
    pub class_count: usize,
    pub program: Vec<Class>,
    pub library: Vec<Class>,
}

impl ScanOutput {
    /// Moves the scanned classes into a fresh universe.
    ///
    /// Duplicate program classes are an error; later duplicate library classes are skipped.
    pub fn into_universe(self) -> Result<(Universe, Vec<Artifact>)> {
        let mut universe = Universe::new();
        for class in self.program {
            universe.add_program(class)?;
        }
        for class in self.library {
            universe.add_library(class);
        }
        Ok((universe, self.artifacts))
    }
}

/// Accumulates scan results while walking inputs.
struct Scan {
    output: ScanOutput,
}

impl Scan {
    fn push_class(&mut self, kind: PoolKind, class: Class) {
        self.output.class_count += 1;
        match kind {
            PoolKind::Program => self.output.program.push(class),
            PoolKind::Library => self.output.library.push(class),
        }
    }
}

/// Reads `input` as program classes and every classpath entry (plus manifest references) as
/// library classes.
pub fn scan_inputs(input: &Path, classpath: &[PathBuf]) -> Result<ScanOutput> {
    let mut scan = Scan {
        output: ScanOutput::default(),
    };
    scan_path(input, PoolKind::Program, true, true, &mut scan)?;

    // Keep deterministic ordering by sorting classpath entries and directory listings.
    let mut classpath_entries = classpath.to_vec();
    classpath_entries.sort_by_key(|entry| path_key(entry));

    if is_jar_path(input) {
        classpath_entries.extend(manifest_classpath(input)?);
    }

    let expanded = expand_classpath(classpath_entries)?;
    for entry in expanded {
        if entry == input {
            continue;
        }
        scan_path(&entry, PoolKind::Library, false, true, &mut scan)?;
    }

    debug!(
        "scanned {} program and {} library classes",
        scan.output.program.len(),
        scan.output.library.len()
    );
    Ok(scan.output)
}

fn scan_path(
    path: &Path,
    kind: PoolKind,
    is_input: bool,
    strict: bool,
    scan: &mut Scan,
) -> Result<()> {
    if path.is_dir() {
        return scan_dir(path, kind, scan);
    }

    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    let roles = if is_input {
        Some(vec![
            serde_json::to_value(ArtifactRoles::AnalysisTarget)
                .context("serialize artifact role")?,
        ])
    } else {
        None
    };

    match extension {
        "class" => scan_class_file(path, kind, roles, scan),
        "jar" => scan_jar_file(path, kind, roles, scan),
        _ => {
            if strict {
                anyhow::bail!("unsupported input file: {}", path.display())
            } else {
                Ok(())
            }
        }
    }
}

fn scan_dir(path: &Path, kind: PoolKind, scan: &mut Scan) -> Result<()> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)
        .with_context(|| format!("failed to read directory {}", path.display()))?
    {
        let entry =
            entry.with_context(|| format!("failed to read entry under {}", path.display()))?;
        entries.push(entry.path());
    }

    entries.sort_by_key(|entry| path_key(entry));

    for entry in entries {
        if entry.is_dir() {
            scan_dir(&entry, kind, scan)?;
        } else {
            scan_path(&entry, kind, false, false, scan)?;
        }
    }

    Ok(())
}

fn scan_class_file(
    path: &Path,
    kind: PoolKind,
    roles: Option<Vec<Value>>,
    scan: &mut Scan,
) -> Result<()> {
    let span = debug_span!("class.scan", path = %path.display());
    let (len, class) = span.in_scope(|| -> Result<(u64, Class)> {
        let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let class = read_class(kind, &data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok((data.len() as u64, class))
    })?;

    if roles.is_some() {
        push_path_artifact(path, roles, len, None, &mut scan.output.artifacts);
    }
    scan.push_class(kind, class);
    Ok(())
}

fn scan_jar_file(
    path: &Path,
    kind: PoolKind,
    roles: Option<Vec<Value>>,
    scan: &mut Scan,
) -> Result<()> {
    let span = debug_span!("jar.scan", path = %path.display());
    let _entered = span.enter();

    let file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("failed to read {}", path.display()))?;
    let jar_len = fs::metadata(path)
        .with_context(|| format!("failed to read {}", path.display()))?
        .len();
    push_path_artifact(path, roles, jar_len, None, &mut scan.output.artifacts);

    let mut entry_names = Vec::new();
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        // Multi-release variants would shadow the base classes with the same names.
        if name.ends_with(".class")
            && !name.ends_with("module-info.class")
            && !name.starts_with("META-INF/versions/")
        {
            entry_names.push(name);
        }
    }

    entry_names.sort();

    for name in entry_names {
        let mut entry = archive
            .by_name(&name)
            .with_context(|| format!("failed to read {}:{}", path.display(), name))?;
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .with_context(|| format!("failed to read {}:{}", path.display(), name))?;
        let class = read_class(kind, &data)
            .with_context(|| format!("failed to parse {}:{}", path.display(), name))?;
        scan.push_class(kind, class);
    }

    Ok(())
}

fn read_class(kind: PoolKind, data: &[u8]) -> Result<Class> {
    match kind {
        PoolKind::Program => read_program_class(data),
        PoolKind::Library => read_library_class(data),
    }
}

/// Push a path-based artifact and return its index for parent linkage (e.g., JAR entries).
fn push_path_artifact(
    path: &Path,
    roles: Option<Vec<Value>>,
    len: u64,
    parent_index: Option<i64>,
    artifacts: &mut Vec<Artifact>,
) -> i64 {
    let location = ArtifactLocation::builder().uri(path_to_uri(path)).build();
    let artifact = match (parent_index, roles) {
        (Some(parent_index), Some(roles)) => Artifact::builder()
            .location(location)
            .length(len as i64)
            .parent_index(parent_index)
            .roles(roles)
            .build(),
        (Some(parent_index), None) => Artifact::builder()
            .location(location)
            .length(len as i64)
            .parent_index(parent_index)
            .build(),
        (None, Some(roles)) => Artifact::builder()
            .location(location)
            .length(len as i64)
            .roles(roles)
            .build(),
        (None, None) => Artifact::builder()
            .location(location)
            .length(len as i64)
            .build(),
    };
    let index = artifacts.len() as i64;
    artifacts.push(artifact);
    index
}

fn path_to_uri(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("file://{}", absolute.to_string_lossy())
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Breadth-first closure of classpath entries over manifest `Class-Path` references.
fn expand_classpath(initial: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let mut initial_sorted = initial;
    initial_sorted.sort_by_key(|entry| path_key(entry));
    let mut queue: VecDeque<PathBuf> = initial_sorted.into_iter().collect();

    let mut seen = BTreeSet::new();
    let mut result = Vec::new();
    while let Some(entry) = queue.pop_front() {
        if !seen.insert(path_key(&entry)) {
            continue;
        }
        if !entry.exists() {
            anyhow::bail!("classpath entry not found: {}", entry.display());
        }
        if is_jar_path(&entry) {
            let mut referenced = manifest_classpath(&entry)?;
            referenced.sort_by_key(|item| path_key(item));
            queue.extend(referenced);
        }
        result.push(entry);
    }

    Ok(result)
}

fn manifest_classpath(path: &Path) -> Result<Vec<PathBuf>> {
    let file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("failed to read {}", path.display()))?;
    let Ok(mut entry) = archive.by_name("META-INF/MANIFEST.MF") else {
        return Ok(Vec::new());
    };
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .with_context(|| format!("failed to read manifest of {}", path.display()))?;
    Ok(parse_manifest_classpath(path, &content))
}

/// `Class-Path` entries of a manifest, resolved against the JAR's directory. Continuation
/// lines start with a single space.
fn parse_manifest_classpath(jar_path: &Path, content: &str) -> Vec<PathBuf> {
    let mut class_path = None;
    let mut current_key: Option<String> = None;
    let mut current_value = String::new();

    for raw_line in content.lines() {
        let line = raw_line.trim_end_matches('\r');
        if let Some(continuation) = line.strip_prefix(' ') {
            if current_key.is_some() {
                current_value.push_str(continuation);
            }
            continue;
        }

        if current_key.take().as_deref() == Some("Class-Path") {
            class_path = Some(current_value.clone());
        }
        current_value.clear();

        if let Some((key, value)) = line.split_once(':') {
            current_key = Some(key.trim().to_string());
            current_value.push_str(value.trim_start());
        }
    }
    if current_key.as_deref() == Some("Class-Path") {
        class_path = Some(current_value);
    }

    let Some(class_path) = class_path else {
        return Vec::new();
    };

    let base_dir = jar_path.parent().unwrap_or_else(|| Path::new(""));
    class_path
        .split_whitespace()
        .map(|entry| {
            let entry_path = PathBuf::from(entry);
            if entry_path.is_absolute() {
                entry_path
            } else {
                base_dir.join(entry_path)
            }
        })
        .collect()
}

fn is_jar_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jar"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::writer::class_bytes;
    use crate::opcodes;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_jar(path: &Path, class_path: Option<&str>, classes: &[(&str, Vec<u8>)]) {
        let file = fs::File::create(path).expect("create jar");
        let mut writer = zip::ZipWriter::new(file);
        let mut manifest = String::from("Manifest-Version: 1.0\n");
        if let Some(class_path) = class_path {
            manifest.push_str(&format!("Class-Path: {class_path}\n"));
        }
        manifest.push('\n');
        writer
            .start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
            .expect("start manifest entry");
        writer.write_all(manifest.as_bytes()).expect("write manifest");
        for (name, bytes) in classes {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start class entry");
            writer.write_all(bytes).expect("write class");
        }
        writer.finish().expect("finish jar");
    }

    fn simple_class(name: &str) -> Vec<u8> {
        class_bytes(name, "java/lang/Object", &[("run", "()V", &[opcodes::RETURN])])
    }

    #[test]
    fn scan_inputs_rejects_invalid_class_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let class_path = temp_dir.path().join("bad.class");
        fs::write(&class_path, b"nope").expect("write test class");

        assert!(scan_inputs(&class_path, &[]).is_err());
    }

    #[test]
    fn scan_inputs_reads_class_file_as_program_class() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let class_path = temp_dir.path().join("Sample.class");
        fs::write(&class_path, simple_class("com/example/Sample")).expect("write class");

        let output = scan_inputs(&class_path, &[]).expect("scan class");

        assert_eq!(output.class_count, 1);
        assert_eq!(output.artifacts.len(), 1);
        assert_eq!(output.program.len(), 1);
        assert!(output.program[0].is_program());
        assert!(output.library.is_empty());
    }

    #[test]
    fn scan_inputs_splits_program_and_library_classes() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let input = temp_dir.path().join("classes");
        fs::create_dir_all(input.join("com/example")).expect("create dirs");
        fs::write(input.join("com/example/B.class"), simple_class("com/example/B"))
            .expect("write B");
        fs::write(input.join("com/example/A.class"), simple_class("com/example/A"))
            .expect("write A");
        fs::write(input.join("README.txt"), b"ignored").expect("write text");
        let lib = temp_dir.path().join("lib.jar");
        write_jar(
            &lib,
            None,
            &[
                ("META-INF/versions/11/lib/Old.class", simple_class("lib/Old")),
                ("lib/Dep.class", simple_class("lib/Dep")),
            ],
        );

        let output = scan_inputs(&input, &[lib]).expect("scan inputs");

        let program: Vec<&str> = output.program.iter().map(|class| class.name.as_str()).collect();
        assert_eq!(program, vec!["com/example/A", "com/example/B"]);
        assert_eq!(output.library.len(), 1);
        assert_eq!(output.library[0].name, "lib/Dep");
        assert!(!output.library[0].is_program());
        assert_eq!(output.artifacts.len(), 1);

        let (universe, _) = output.into_universe().expect("universe");
        assert!(universe.lookup("lib/Dep").is_some());
    }

    #[test]
    fn scan_inputs_resolves_manifest_classpath() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let dep_path = temp_dir.path().join("dep.jar");
        write_jar(&dep_path, None, &[("dep/Util.class", simple_class("dep/Util"))]);
        let jar_path = temp_dir.path().join("main.jar");
        write_jar(
            &jar_path,
            Some("dep.jar"),
            &[("app/Main.class", simple_class("app/Main"))],
        );

        let output = scan_inputs(&jar_path, &[]).expect("scan jar");

        assert_eq!(output.program.len(), 1);
        assert_eq!(output.library.len(), 1);
        assert_eq!(output.library[0].name, "dep/Util");
        assert_eq!(output.artifacts.len(), 2);
    }

    #[test]
    fn scan_inputs_errors_on_missing_manifest_classpath_entry() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let jar_path = temp_dir.path().join("main.jar");
        write_jar(&jar_path, Some("missing.jar"), &[]);

        assert!(scan_inputs(&jar_path, &[]).is_err());
    }

    #[test]
    fn duplicate_program_classes_are_rejected() {
        let output = ScanOutput {
            program: vec![
                crate::test_harness::program_class("a/A", None, &[]),
                crate::test_harness::program_class("a/A", None, &[]),
            ],
            ..ScanOutput::default()
        };

        assert!(output.into_universe().is_err());
    }

    #[test]
    fn manifest_continuation_lines_are_joined() {
        let manifest = "Manifest-Version: 1.0\r\nClass-Path: a.jar b\r\n .jar\r\nMain-Class: x\r\n";
        let entries = parse_manifest_classpath(Path::new("/opt/app/main.jar"), manifest);

        assert_eq!(
            entries,
            vec![PathBuf::from("/opt/app/a.jar"), PathBuf::from("/opt/app/b.jar")]
        );
    }
}
