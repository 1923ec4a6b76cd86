#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! Benchmark fixtures for typeprobe.
//!
//! Run benchmarks with: `cargo bench -p typeprobe-bench`

use typeprobe_core::Package;

/// A transpiled CommonJS module with `size` named exports.
#[must_use]
pub fn commonjs_source(size: usize) -> String {
    let mut out = String::from(
        "\"use strict\";\nObject.defineProperty(exports, \"__esModule\", { value: true });\n",
    );
    for i in 0..size {
        out.push_str(&format!("exports.value{i} = void 0;\n"));
    }
    for i in 0..size {
        out.push_str(&format!(
            "function value{i}(a, b) {{ return a + b + {i}; }}\nexports.value{i} = value{i};\n"
        ));
    }
    out.push_str("var helper_1 = require(\"./helper\");\n__exportStar(require(\"./more\"), exports);\n");
    out
}

/// An ES module with `size` named exports and a few re-exports.
#[must_use]
pub fn esm_source(size: usize) -> String {
    let mut out = String::from("import { helper } from './helper.js';\n");
    for i in 0..size {
        out.push_str(&format!(
            "export function value{i}(a, b) {{ return helper(a, b) + {i}; }}\n"
        ));
    }
    out.push_str("export * from './more.js';\nexport { helper as default };\n");
    out
}

/// A dual package with `subpaths` exported entrypoints.
#[must_use]
pub fn dual_package(subpaths: usize) -> Package {
    let mut exports = vec![r#"".":{"types":"./index.d.ts","import":"./index.mjs","default":"./index.js"}"#.to_string()];
    let mut files = vec![
        ("index.d.ts".to_string(), "export declare function value0(a: number, b: number): number;".to_string()),
        ("index.mjs".to_string(), esm_source(8)),
        ("index.js".to_string(), commonjs_source(8)),
    ];
    for i in 0..subpaths {
        exports.push(format!(
            r#""./sub{i}":{{"types":"./sub{i}.d.ts","default":"./sub{i}.js"}}"#
        ));
        files.push((
            format!("sub{i}.d.ts"),
            "declare const x: number;\nexport default x;".to_string(),
        ));
        files.push((format!("sub{i}.js"), commonjs_source(4)));
    }
    files.push((
        "package.json".to_string(),
        format!(r#"{{"name":"bench","version":"1.0.0","exports":{{{}}}}}"#, exports.join(",")),
    ));
    Package::new("bench", "1.0.0", files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_lexes() {
        let exports = typeprobe_core::lexers::cjs::lex(&commonjs_source(3));
        assert!(exports.exported_names.iter().any(|e| e == "value2"));
        let esm = typeprobe_core::lexers::esm::lex(&esm_source(3));
        assert!(esm.exported_names.iter().any(|e| e == "value1"));
    }
}
