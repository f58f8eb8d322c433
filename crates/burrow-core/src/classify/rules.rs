//! Ordered suffix rule tables.
//!
//! A table is scanned top to bottom and the first rule owning a suffix of the
//! lower-cased name wins. Special cases (`tsconfig.json`, `license.md`) must
//! therefore sit above the generic extension rules (`.json`, `.md`), and the
//! broadest catch-alls live at the very bottom. [`RuleTable::new`] enforces
//! this: a suffix that could never be reached because an earlier rule already
//! owns one of its tails is an authoring error.

use super::TypeTag;
use crate::error::{EngineError, EngineResult};
use std::collections::HashSet;

/// One tag and the suffixes that select it.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub tag: TypeTag,
    pub suffixes: &'static [&'static str],
}

impl Rule {
    pub const fn new(tag: &'static str, suffixes: &'static [&'static str]) -> Self {
        Self {
            tag: TypeTag::new(tag),
            suffixes,
        }
    }
}

/// A validated, ordered rule list plus the tag used when nothing matches.
#[derive(Debug, Clone)]
pub struct RuleTable {
    default: TypeTag,
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Validate `rules` and build a table.
    ///
    /// Fails when a tag repeats (or reuses `default`), a rule has no
    /// suffixes, a suffix is empty or not lower-case, or a suffix is
    /// unreachable because an earlier rule owns a tail of it.
    pub fn new(default: TypeTag, rules: &[Rule]) -> EngineResult<Self> {
        let mut tags: HashSet<&str> = HashSet::with_capacity(rules.len() + 1);
        tags.insert(default.as_str());

        for (i, rule) in rules.iter().enumerate() {
            if !tags.insert(rule.tag.as_str()) {
                return Err(EngineError::RuleTable(format!(
                    "duplicate tag {:?}",
                    rule.tag.as_str()
                )));
            }
            if rule.suffixes.is_empty() {
                return Err(EngineError::RuleTable(format!(
                    "rule {:?} has no suffixes",
                    rule.tag.as_str()
                )));
            }
            for &suffix in rule.suffixes {
                if suffix.is_empty() || suffix != suffix.to_lowercase() {
                    return Err(EngineError::RuleTable(format!(
                        "rule {:?} has empty or non-lower-case suffix {suffix:?}",
                        rule.tag.as_str()
                    )));
                }
                for earlier in &rules[..i] {
                    if let Some(owner) = earlier.suffixes.iter().find(|s| suffix.ends_with(**s)) {
                        return Err(EngineError::RuleTable(format!(
                            "suffix {suffix:?} of {:?} is shadowed by {owner:?} of earlier rule {:?}",
                            rule.tag.as_str(),
                            earlier.tag.as_str()
                        )));
                    }
                }
            }
        }

        Ok(Self {
            default,
            rules: rules.to_vec(),
        })
    }

    /// Tag of the first rule matching `lower_name`, or the default.
    pub fn first_match(&self, lower_name: &str) -> TypeTag {
        self.rules
            .iter()
            .find(|rule| rule.suffixes.iter().any(|s| lower_name.ends_with(s)))
            .map(|rule| rule.tag)
            .unwrap_or(self.default)
    }
}

// ── Standard tables ─────────────────────────────────────────────────────────

/// Folder rules. Views precede build output because `layout` ends in `out`.
pub const FOLDER_RULES: &[Rule] = &[
    Rule::new("folder-vscode", &[".vscode", "vscode"]),
    Rule::new("folder-node-modules", &["node_modules"]),
    Rule::new("folder-public", &["public"]),
    Rule::new("folder-src", &["src", "source", "sources"]),
    Rule::new(
        "folder-component",
        &["component", "components", "gui", "ui", "widgets"],
    ),
    Rule::new(
        "folder-view",
        &["html", "view", "views", "layout", "layouts", "page", "pages"],
    ),
    Rule::new(
        "folder-dist",
        &[
            "dist", "dists", "out", "outs", "export", "exports", "build", "builds", "release",
            "releases", "target", "targets",
        ],
    ),
    Rule::new("folder-assets", &["assets", "asset", "static"]),
    Rule::new("folder-git", &["git", "submodules"]),
    Rule::new(
        "folder-cli",
        &["cli", "cmd", "command", "commands", "commandline", "console"],
    ),
    Rule::new("folder-github", &[".github"]),
    Rule::new(
        "folder-test",
        &[
            "tests",
            "test",
            "__tests__",
            "__test__",
            "spec",
            "specs",
            "integration",
        ],
    ),
    Rule::new("folder-docs", &["docs", "doc"]),
    Rule::new("folder-next", &[".next"]),
];

/// File rules. Everything above the marker comment is a special case; the
/// rules below it are the generic extension catch-alls.
pub const FILE_RULES: &[Rule] = &[
    Rule::new("file-python", &[".py"]),
    Rule::new("file-rust", &[".rs"]),
    Rule::new("file-cargo", &["cargo.toml", "cargo.lock"]),
    Rule::new("file-prettier", &[".prettierrc", ".prettierignore"]),
    Rule::new(
        "file-tsconfig",
        &[
            "tsconfig.json",
            "tsconfig.app.json",
            "tsconfig.base.json",
            "tsconfig.common.json",
            "tsconfig.dev.json",
            "tsconfig.development.json",
            "tsconfig.e2e.json",
            "tsconfig.eslint.json",
            "tsconfig.lib.json",
            "tsconfig.lib.prod.json",
            "tsconfig.node.json",
            "tsconfig.prod.json",
            "tsconfig.production.json",
            "tsconfig.server.json",
            "tsconfig.spec.json",
            "tsconfig.staging.json",
            "tsconfig.test.json",
        ],
    ),
    Rule::new(
        "file-git",
        &[
            ".gitattributes",
            ".gitconfig",
            ".gitignore",
            ".gitmodules",
            ".gitkeep",
            ".issuetracker",
            ".mailmap",
        ],
    ),
    Rule::new(
        "file-license",
        &[
            "enc",
            "lic",
            "license",
            "licence",
            "license_dark",
            "copying",
            "copying.lesser",
            "license-mit",
            "license-apache",
            "license.md",
            "license.txt",
            "licence.md",
            "licence.txt",
            "copying.md",
            "copying.txt",
            "copying.lesser.md",
            "copying.lesser.txt",
            "license-mit.md",
            "license-mit.txt",
            "license-apache.md",
            "license-apache.txt",
        ],
    ),
    Rule::new("file-markdown", &[".markdown", ".md", ".mdown"]),
    Rule::new("file-toml", &[".toml"]),
    Rule::new("file-astro", &[".astro"]),
    Rule::new(
        "file-astro-config",
        &[
            "astro.config.js",
            "astro.config.cjs",
            "astro.config.mjs",
            "astro.config.ts",
        ],
    ),
    Rule::new(
        "file-tailwind",
        &[
            "tailwind.js",
            "tailwind.cjs",
            "tailwind.coffee",
            "tailwind.ts",
            "tailwind.json",
            "tailwind.config.js",
            "tailwind.config.cjs",
            "tailwind.config.coffee",
            "tailwind.config.ts",
            "tailwind.config.json",
            ".tailwindrc.js",
            ".tailwindrc.cjs",
            ".tailwindrc.coffee",
            ".tailwindrc.ts",
            ".tailwindrc.json",
        ],
    ),
    Rule::new("file-typescript-definition", &[".d.ts", ".d.cts", ".d.mts"]),
    Rule::new("file-database", &[".db", ".sqlite", ".sqlite3"]),
    Rule::new("file-svg", &[".svg"]),
    Rule::new("file-html", &[".html", ".htm"]),
    Rule::new("file-css", &[".css"]),
    Rule::new(
        "file-font",
        &[
            ".woff", ".woff2", ".ttf", ".otf", ".eot", ".pfa", ".pfb", ".sfd",
        ],
    ),
    Rule::new("file-text", &[".csv", ".tsv", ".txt"]),
    Rule::new("file-config", &[".plist", ".properties", ".env"]),
    Rule::new(
        "file-yarn",
        &[
            "yarn.lock",
            ".yarnrc",
            ".yarnrc.yml",
            ".yarnclean",
            ".yarn-integrity",
            ".yarn-metadata.json",
            ".yarnignore",
        ],
    ),
    Rule::new(
        "file-pnpm",
        &["pnpmfile.js", "pnpm-lock.yaml", "pnpm-workspace.yaml"],
    ),
    Rule::new("file-pdf", &[".pdf"]),
    Rule::new(
        "file-docker",
        &[
            ".dockerignore",
            "compose.yaml",
            "compose.yml",
            "docker-compose.override.yaml",
            "docker-compose.override.yml",
            "docker-compose.ci-build.yaml",
            "docker-compose.ci-build.yml",
            "docker-compose.vs.debug.yaml",
            "docker-compose.vs.debug.yml",
            "docker-compose.vs.release.yaml",
            "docker-compose.vs.release.yml",
            "docker-cloud.yaml",
            "docker-cloud.yml",
            "dockerfile",
        ],
    ),
    Rule::new("file-rst", &[".rst"]),
    Rule::new(
        "file-image",
        &[
            ".jpeg", ".jpg", ".gif", ".png", ".bmp", ".tiff", ".ico", ".webp",
        ],
    ),
    Rule::new(
        "file-eslint",
        &[
            ".eslintrc",
            ".eslintignore",
            ".eslintcache",
            ".eslintrc.js",
            ".eslintrc.mjs",
            ".eslintrc.cjs",
            ".eslintrc.json",
            ".eslintrc.yaml",
            ".eslintrc.yml",
        ],
    ),
    Rule::new(
        "file-npm",
        &[
            ".npmignore",
            ".npmrc",
            "package.json",
            "package-lock.json",
            "npm-shrinkwrap.json",
        ],
    ),
    Rule::new(
        "file-postcss-config",
        &[
            ".postcssrc",
            ".postcssrc.json",
            ".postcssrc.yaml",
            ".postcssrc.yml",
            ".postcssrc.ts",
            ".postcssrc.js",
            ".postcssrc.cjs",
            "postcss.config.ts",
            "postcss.config.js",
            "postcss.config.cjs",
        ],
    ),
    Rule::new(
        "file-zip",
        &[
            ".zip", ".rar", ".7z", ".tar", ".tgz", ".bz", ".gz", ".bzip2", ".xz", ".bz2", ".zipx",
        ],
    ),
    Rule::new(
        "file-video",
        &[
            ".3g2", ".3gp", ".asf", ".amv", ".avi", ".divx", ".qt", ".f4a", ".f4b", ".f4p",
            ".f4v", ".flv", ".m2v", ".m4v", ".mkv", ".mk3d", ".mov", ".mp2", ".mp4", ".mpe",
            ".mpeg", ".mpeg2", ".mpg", ".mpv", ".nsv", ".ogv", ".rm", ".rmvb", ".svi", ".vob",
            ".webm", ".wmv",
        ],
    ),
    // Generic catch-alls: keep below every special case.
    Rule::new(
        "file-json",
        &[".json", ".jsonl", ".ndjson", ".json-tmlanguage", ".jsonc"],
    ),
    Rule::new("file-javascript", &[".js", ".cjs", ".mjs"]),
    Rule::new("file-typescript", &[".ts", ".cts", ".mts"]),
    Rule::new("file-yaml", &[".yaml", ".yml", ".yaml-tmlanguage"]),
    Rule::new(
        "file-binary",
        &[
            ".a", ".app", ".bin", ".cmo", ".cmx", ".cma", ".cmxa", ".cmi", ".dll", ".exe", ".hl",
            ".ilk", ".lib", ".n", ".ndll", ".o", ".obj", ".pyc", ".pyd", ".pyo", ".pdb", ".scpt",
            ".scptd", ".so",
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tables_validate() {
        RuleTable::new(TypeTag::FOLDER, FOLDER_RULES).expect("folder table");
        RuleTable::new(TypeTag::FILE, FILE_RULES).expect("file table");
    }

    #[test]
    fn standard_file_table_special_cases() {
        let table = RuleTable::new(TypeTag::FILE, FILE_RULES).unwrap();
        let tag = |name: &str| table.first_match(name).as_str();
        assert_eq!(tag("license.md"), "file-license");
        assert_eq!(tag("copying.lesser.txt"), "file-license");
        assert_eq!(tag("license_dark"), "file-license");
        assert_eq!(tag("secrets.enc"), "file-license");
        assert_eq!(tag("notes.md"), "file-markdown");
        assert_eq!(tag("tsconfig.lib.prod.json"), "file-tsconfig");
        assert_eq!(tag("tsconfig.staging.json"), "file-tsconfig");
        assert_eq!(tag("data.json"), "file-json");
        assert_eq!(tag(".issuetracker"), "file-git");
        assert_eq!(tag("tailwind.config.coffee"), "file-tailwind");
        assert_eq!(tag(".tailwind.json"), "file-tailwind");
        assert_eq!(tag(".tailwindrc.ts"), "file-tailwind");
        assert_eq!(tag("docker-compose.ci-build.yml"), "file-docker");
        assert_eq!(tag("docker-compose.vs.release.yaml"), "file-docker");
        assert_eq!(tag("ci.yaml"), "file-yaml");
        assert_eq!(tag("clip.rm"), "file-video");
        assert_eq!(tag("clip.mpeg2"), "file-video");
        assert_eq!(tag("clip.f4b"), "file-video");
        assert_eq!(tag("module.n"), "file-binary");
    }

    #[test]
    fn specific_rule_registered_first_wins() {
        let table = RuleTable::new(
            TypeTag::FILE,
            &[
                Rule::new("config-json", &[".config.json"]),
                Rule::new("json", &[".json"]),
            ],
        )
        .unwrap();
        assert_eq!(table.first_match("app.config.json").as_str(), "config-json");
        assert_eq!(table.first_match("data.json").as_str(), "json");
        assert_eq!(table.first_match("readme"), TypeTag::FILE);
    }

    #[test]
    fn generic_rule_before_specific_is_rejected() {
        let err = RuleTable::new(
            TypeTag::FILE,
            &[
                Rule::new("json", &[".json"]),
                Rule::new("config-json", &[".config.json"]),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("shadowed"), "{err}");
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let err = RuleTable::new(
            TypeTag::FILE,
            &[Rule::new("x", &[".a"]), Rule::new("x", &[".b"])],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate tag"));
    }

    #[test]
    fn default_tag_cannot_be_reused() {
        assert!(RuleTable::new(TypeTag::FILE, &[Rule::new("file", &[".x"])]).is_err());
    }

    #[test]
    fn empty_rule_is_rejected() {
        let err = RuleTable::new(TypeTag::FILE, &[Rule::new("nothing", &[])]).unwrap_err();
        assert!(err.to_string().contains("no suffixes"));
    }

    #[test]
    fn upper_case_suffix_is_rejected() {
        assert!(RuleTable::new(TypeTag::FILE, &[Rule::new("docker", &["Dockerfile"])]).is_err());
        assert!(RuleTable::new(TypeTag::FILE, &[Rule::new("blank", &[""])]).is_err());
    }

    #[test]
    fn duplicate_suffix_in_later_rule_is_rejected() {
        let err = RuleTable::new(
            TypeTag::FILE,
            &[Rule::new("one", &[".md"]), Rule::new("two", &[".md"])],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::RuleTable(_)));
    }
}
