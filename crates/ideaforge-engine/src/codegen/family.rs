//! Template families and the file plan each one produces
//!
//! Families are tried in a fixed order: a stack with no backend language is
//! a static site, a stack with no frontend language is a script, a stack
//! whose backend shares or hosts the frontend is integrated, and everything
//! else is split into `frontend/` and `backend/`.

use serde::Serialize;

use ideaforge_config::StackRecord;
use ideaforge_config::catalog::is_none;

/// Backend frameworks that host their own frontend
const FULL_STACK_HOSTS: &[&str] = &["Next.js", "Electron"];

/// Path of the optional data-model document
pub const DATA_MODEL_DOC: &str = "docs/data-model.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemplateFamily {
    StaticSite,
    Script,
    Integrated,
    SplitStack,
}

pub fn select_family(stack: &StackRecord) -> TemplateFamily {
    if is_none(&stack.backend.language) {
        return TemplateFamily::StaticSite;
    }
    if is_none(&stack.frontend.language) {
        return TemplateFamily::Script;
    }

    let backend_framework = stack.backend.framework.as_str();
    let integrated = is_none(backend_framework)
        || backend_framework.eq_ignore_ascii_case(&stack.frontend.framework)
        || FULL_STACK_HOSTS
            .iter()
            .any(|host| backend_framework.eq_ignore_ascii_case(host));

    if integrated {
        TemplateFamily::Integrated
    } else {
        TemplateFamily::SplitStack
    }
}

/// Files rendered locally without a provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticTemplate {
    Readme,
    EnvExample,
    Dockerfile,
    DockerCompose,
    JekyllConfig,
    HugoConfig,
    DataModelDoc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Static(StaticTemplate),
    /// Content requested from the provider with these instructions
    Provider { instructions: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub path: String,
    pub source: FileSource,
}

impl PlannedFile {
    fn fixed(path: impl Into<String>, template: StaticTemplate) -> Self {
        Self {
            path: path.into(),
            source: FileSource::Static(template),
        }
    }

    fn provider(path: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: FileSource::Provider {
                instructions: instructions.into(),
            },
        }
    }

    pub fn is_provider_backed(&self) -> bool {
        matches!(self.source, FileSource::Provider { .. })
    }
}

/// Ordered file plan for a stack. The order is stable across runs.
pub fn plan_files(stack: &StackRecord, include_data_model: bool) -> (TemplateFamily, Vec<PlannedFile>) {
    let family = select_family(stack);
    let mut files = match family {
        TemplateFamily::StaticSite => static_site(stack),
        TemplateFamily::Script => script(stack),
        TemplateFamily::Integrated => integrated(stack),
        TemplateFamily::SplitStack => split_stack(stack),
    };
    if include_data_model {
        files.push(PlannedFile::fixed(DATA_MODEL_DOC, StaticTemplate::DataModelDoc));
    }
    (family, files)
}

fn static_site(stack: &StackRecord) -> Vec<PlannedFile> {
    let generator = stack.frontend.framework.as_str();
    let mut files = vec![
        PlannedFile::provider(
            "index.html",
            format!(
                "Home page of the site. Semantic HTML5 that links css/style.css and js/main.js. \
                 Cover every page and section named in the architecture. Generator: {generator}."
            ),
        ),
        PlannedFile::provider(
            "css/style.css",
            "Stylesheet for index.html. Responsive layout, readable typography, no external frameworks.",
        ),
        PlannedFile::provider(
            "js/main.js",
            "Plain JavaScript for the interactive behaviour described in the architecture. No build step.",
        ),
    ];
    if generator.eq_ignore_ascii_case("Jekyll") {
        files.push(PlannedFile::fixed("_config.yml", StaticTemplate::JekyllConfig));
    } else if generator.eq_ignore_ascii_case("Hugo") {
        files.push(PlannedFile::fixed("hugo.toml", StaticTemplate::HugoConfig));
    }
    files.push(PlannedFile::fixed("README.md", StaticTemplate::Readme));
    files
}

fn script(stack: &StackRecord) -> Vec<PlannedFile> {
    let language = stack.backend.language.as_str();
    let mut files = vec![PlannedFile::provider(
        script_entry(language),
        format!(
            "Main {language} script implementing the automation described in the architecture. \
             Read settings from environment variables listed in .env.example, log progress, \
             and exit non-zero on failure."
        ),
    )];
    if let Some(manifest) = manifest_for(language) {
        files.push(PlannedFile::provider(
            manifest,
            format!("Dependency manifest for the {language} script. Pin major versions."),
        ));
    }
    files.push(PlannedFile::fixed(".env.example", StaticTemplate::EnvExample));
    files.push(PlannedFile::fixed("README.md", StaticTemplate::Readme));
    files
}

fn integrated(stack: &StackRecord) -> Vec<PlannedFile> {
    let language = stack.backend.language.as_str();
    let framework = integrated_framework(stack);
    let manifest = manifest_for(language).unwrap_or("package.json");
    vec![
        PlannedFile::provider(
            manifest,
            format!(
                "Single dependency manifest for the {framework} application ({language}), \
                 including start and build scripts where the ecosystem has them."
            ),
        ),
        PlannedFile::provider(
            integrated_entry(framework, language),
            format!(
                "Entry point of the {framework} application. Render the main screen from the \
                 UX design and wire the core features from the architecture."
            ),
        ),
        PlannedFile::fixed(".env.example", StaticTemplate::EnvExample),
        PlannedFile::fixed("Dockerfile", StaticTemplate::Dockerfile),
        PlannedFile::fixed("README.md", StaticTemplate::Readme),
    ]
}

fn split_stack(stack: &StackRecord) -> Vec<PlannedFile> {
    let backend_language = stack.backend.language.as_str();
    let backend_framework = stack.backend.framework.as_str();
    let frontend_framework = stack.frontend.framework.as_str();
    let manifest = manifest_for(backend_language).unwrap_or("package.json");
    vec![
        PlannedFile::provider(
            format!("backend/{manifest}"),
            format!("Dependency manifest for the {backend_framework} backend ({backend_language})."),
        ),
        PlannedFile::provider(
            format!("backend/{}", backend_entry(backend_language)),
            format!(
                "{backend_framework} server entry point. Expose the REST endpoints from the \
                 architecture, read PORT and DATABASE_URL from the environment, and include a \
                 /health endpoint."
            ),
        ),
        PlannedFile::fixed("backend/.env.example", StaticTemplate::EnvExample),
        PlannedFile::provider(
            format!("frontend/{}", frontend_entry(frontend_framework)),
            format!(
                "Root {frontend_framework} component. Implement the main screens from the UX \
                 design and call the backend API."
            ),
        ),
        PlannedFile::fixed("docker-compose.yml", StaticTemplate::DockerCompose),
        PlannedFile::fixed("README.md", StaticTemplate::Readme),
    ]
}

pub(crate) fn manifest_for(language: &str) -> Option<&'static str> {
    match language.to_ascii_lowercase().as_str() {
        "javascript" | "typescript" | "node.js" | "nodejs" => Some("package.json"),
        "python" => Some("requirements.txt"),
        "ruby" => Some("Gemfile"),
        "dart" => Some("pubspec.yaml"),
        _ => None,
    }
}

fn script_entry(language: &str) -> &'static str {
    match language.to_ascii_lowercase().as_str() {
        "python" => "main.py",
        "javascript" | "node.js" | "nodejs" => "index.js",
        "typescript" => "index.ts",
        "powershell" => "script.ps1",
        _ => "script.sh",
    }
}

fn backend_entry(language: &str) -> &'static str {
    match language.to_ascii_lowercase().as_str() {
        "python" => "main.py",
        "typescript" => "server.ts",
        _ => "server.js",
    }
}

fn frontend_entry(framework: &str) -> &'static str {
    match framework.to_ascii_lowercase().as_str() {
        "react" | "react.js" => "src/App.js",
        "vue.js" | "vue" => "src/App.vue",
        "react native" => "App.js",
        "flutter" => "lib/main.dart",
        "ionic" | "angular" => "src/app/app.component.ts",
        "svelte" => "src/App.svelte",
        _ => "src/main.js",
    }
}

/// The framework that owns the integrated app
fn integrated_framework(stack: &StackRecord) -> &str {
    if is_none(&stack.backend.framework) {
        &stack.frontend.framework
    } else {
        &stack.backend.framework
    }
}

fn integrated_entry(framework: &str, language: &str) -> &'static str {
    match (
        framework.to_ascii_lowercase().as_str(),
        language.to_ascii_lowercase().as_str(),
    ) {
        ("next.js", "typescript") => "app/page.tsx",
        ("next.js", _) => "pages/index.js",
        ("electron", _) => "main.js",
        (_, "python") => "main.py",
        (_, "typescript") => "src/index.ts",
        _ => "index.js",
    }
}
