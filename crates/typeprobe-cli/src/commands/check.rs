//! `typeprobe check` command implementation.

use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::PathBuf;
use typeprobe_core::{
    check_package, Analysis, CheckOptions, EntrypointFilter, Package, ResolutionKind, TypesTag,
};

/// Everything `check` was asked to do.
#[derive(Debug, Clone, Default)]
pub struct CheckAction {
    pub dir: PathBuf,
    pub types_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub entrypoints: Vec<String>,
    pub include_entrypoints: Vec<String>,
    pub exclude_entrypoints: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub legacy: bool,
    pub exclude_kinds: Vec<ResolutionKind>,
}

/// Options from the config file, with command-line flags applied on top.
pub fn options(action: &CheckAction) -> Result<CheckOptions> {
    let mut options = match &action.config {
        Some(path) => CheckOptions::from_json_file(path).into_diagnostic()?,
        None => CheckOptions::new(),
    };

    if !action.entrypoints.is_empty() {
        options = options.with_entrypoints(action.entrypoints.clone());
    }
    options
        .include_entrypoints
        .extend(action.include_entrypoints.iter().cloned());
    options.exclude_entrypoints.extend(
        action
            .exclude_entrypoints
            .iter()
            .map(|s| EntrypointFilter::Exact(s.clone())),
    );
    for pattern in &action.exclude_patterns {
        options
            .exclude_entrypoints
            .push(EntrypointFilter::pattern(pattern.clone()).into_diagnostic()?);
    }
    if action.legacy {
        options = options.with_entrypoints_legacy(true);
    }
    for kind in &action.exclude_kinds {
        if !options.exclude_resolution_kinds.contains(kind) {
            options.exclude_resolution_kinds.push(*kind);
        }
    }
    Ok(options)
}

/// Run the check command. Returns whether the package is free of problems.
pub fn run(action: &CheckAction, json: bool) -> Result<bool> {
    let options = options(action)?;

    let mut package = Package::load(&action.dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to load package at {}", action.dir.display()))?;
    if let Some(types_dir) = &action.types_dir {
        package = package
            .with_types_dir(types_dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to load types package at {}", types_dir.display()))?;
    }
    tracing::debug!(files = package.file_count(), "package loaded");

    let analysis = check_package(&package, &options)
        .into_diagnostic()
        .wrap_err("analysis failed")?;

    if json {
        let text = serde_json::to_string_pretty(&analysis).into_diagnostic()?;
        println!("{text}");
    } else {
        print_human(&analysis);
    }
    Ok(analysis.problems.is_empty())
}

fn print_human(analysis: &Analysis) {
    let types = match &analysis.types {
        TypesTag::None => "none".to_string(),
        TypesTag::Included => "included".to_string(),
        TypesTag::PairedTypesPackage {
            package_name,
            package_version,
        } => format!("{package_name}@{package_version}"),
    };
    println!(
        "{}@{} (types: {types})",
        analysis.package_name, analysis.package_version
    );
    if !analysis.build_tools.is_empty() {
        let tools: Vec<String> = analysis
            .build_tools
            .iter()
            .map(|(name, version)| format!("{name}@{version}"))
            .collect();
        println!("Build tools: {}", tools.join(", "));
    }
    println!();

    for entrypoint in &analysis.entrypoints {
        println!("\"{}\"", entrypoint.subpath);
        for cell in &entrypoint.resolutions {
            let target = if cell.disabled {
                "(disabled)".to_string()
            } else {
                cell.resolution
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |r| r.file_name.clone())
            };
            let status = if cell.visible_problems.is_empty() {
                "ok".to_string()
            } else {
                let ids: Vec<String> = cell
                    .visible_problems
                    .iter()
                    .map(|i| format!("#{i}"))
                    .collect();
                ids.join(" ")
            };
            println!("  {:<9} {:<48} {status}", cell.kind.as_str(), target);
        }
    }
    println!();

    if analysis.problems.is_empty() {
        println!("No problems found.");
        return;
    }
    println!("Problems ({}):", analysis.problems.len());
    for (index, problem) in analysis.problems.iter().enumerate() {
        println!("  #{index} {problem}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_flags_apply_over_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{ "excludeEntrypoints": ["./internal"], "excludeResolutionKinds": ["classic"] }"#,
        )
        .unwrap();
        file.flush().unwrap();

        let action = CheckAction {
            config: Some(file.path().to_path_buf()),
            exclude_entrypoints: vec!["./other".into()],
            exclude_patterns: vec!["^\\./legacy/".into()],
            exclude_kinds: vec![ResolutionKind::Classic, ResolutionKind::Bundler],
            legacy: true,
            ..CheckAction::default()
        };
        let options = options(&action).unwrap();
        assert_eq!(options.exclude_entrypoints.len(), 3);
        assert_eq!(
            options.exclude_resolution_kinds,
            vec![ResolutionKind::Classic, ResolutionKind::Bundler]
        );
        assert!(options.entrypoints_legacy);
    }

    #[test]
    fn test_bad_pattern_is_an_error() {
        let action = CheckAction {
            exclude_patterns: vec!["(".into()],
            ..CheckAction::default()
        };
        assert!(options(&action).is_err());
    }
}
