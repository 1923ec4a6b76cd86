//! Module kind detection.

use super::Host;
use crate::kinds::{DetectedReason, ModuleKind, ModuleKindRecord, ResolutionOption};
use typeprobe_util::vpath;

const ESM_EXTENSIONS: &[&str] = &[".mjs", ".mts"];
const CJS_EXTENSIONS: &[&str] = &[".cjs", ".cts", ".json"];

pub(super) fn detect(host: &Host<'_>, file: &str) -> ModuleKindRecord {
    let record = |kind, reason, reason_file: &str| ModuleKindRecord {
        detected_kind: kind,
        detected_reason: reason,
        reason_file_name: reason_file.to_string(),
    };

    // `.d.mts` and `.d.cts` are covered by their final extension.
    if ESM_EXTENSIONS.iter().any(|ext| file.ends_with(ext)) {
        return record(ModuleKind::Esm, DetectedReason::Extension, file);
    }
    if CJS_EXTENSIONS.iter().any(|ext| file.ends_with(ext)) {
        return record(ModuleKind::Cjs, DetectedReason::Extension, file);
    }
    if host.option == ResolutionOption::Classic {
        return record(ModuleKind::Cjs, DetectedReason::Default, file);
    }

    match host.nearest_manifest(vpath::dirname(file)) {
        Some((dir, manifest)) => {
            let manifest_path = vpath::join(&dir, "package.json");
            if manifest.has_type_field() {
                let kind = if manifest.is_module_type() {
                    ModuleKind::Esm
                } else {
                    ModuleKind::Cjs
                };
                record(kind, DetectedReason::PackageTypeField, &manifest_path)
            } else {
                record(ModuleKind::Cjs, DetectedReason::Default, &manifest_path)
            }
        }
        None => record(ModuleKind::Cjs, DetectedReason::Default, file),
    }
}
