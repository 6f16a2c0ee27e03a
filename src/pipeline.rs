//! Per-module documentation run: parse, enhance, translate, test examples,
//! and write the Markdown page.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analyze::{module_name_for, parse_module};
use crate::emit::{output_path_for, write_module};
use crate::error::{DocError, ProviderError, Result};
use crate::llm::{CompletionProvider, Enhancer, Translator};
use crate::runner::{ExampleRunner, ModuleContext};
use crate::types::{
    CodeExample, CodeUnit, EnhancementResult, ExampleOrigin, ExampleTestResult, UnitKey, UnitKind,
};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Language the provider writes in
    pub language: String,
    /// Translate generated text into this language afterwards
    pub translate_to: Option<String>,
    pub run_examples: bool,
    /// Also execute the provider-generated example for each unit
    pub test_generated: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            translate_to: None,
            run_examples: true,
            test_generated: false,
        }
    }
}

#[derive(Debug)]
pub struct UnitFailure {
    pub qualified_name: String,
    pub error: DocError,
}

#[derive(Debug)]
pub struct ModuleReport {
    pub output: PathBuf,
    pub units: usize,
    pub documented: usize,
    pub failures: Vec<UnitFailure>,
    pub examples_passed: usize,
    pub examples_failed: usize,
}

impl ModuleReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Pipeline {
    enhancer: Enhancer,
    translator: Translator,
    runner: ExampleRunner,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        runner: ExampleRunner,
        options: PipelineOptions,
    ) -> Self {
        Self {
            enhancer: Enhancer::new(provider.clone()),
            translator: Translator::new(provider),
            runner,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Document one module. Per-unit provider failures are collected in the
    /// report; read, parse and write failures abort the module.
    pub async fn run(
        &self,
        module_path: &Path,
        root: &Path,
        output_dir: &Path,
    ) -> Result<ModuleReport> {
        let source =
            fs::read_to_string(module_path).map_err(|e| DocError::io(module_path, e))?;
        let module = parse_module(&source, &module_name_for(module_path)).map_err(|e| match e {
            DocError::Parse { line, message, .. } => DocError::Parse {
                path: module_path.display().to_string(),
                line,
                message,
            },
            other => other,
        })?;

        let units: Vec<&CodeUnit> = module
            .walk()
            .into_iter()
            .filter(|u| u.kind != UnitKind::Module)
            .collect();
        info!(module = %module.name, units = units.len(), "documenting module");

        let (results, failures) = self.enhance_units(&units).await;
        let tests = if self.options.run_examples {
            let context = ModuleContext::new(&module.name, &source);
            self.run_examples(&units, &results, context.as_ref()).await
        } else {
            BTreeMap::new()
        };

        let destination = output_path_for(
            &canonical(module_path),
            &canonical(root),
            output_dir,
        );
        let fallback_language = self
            .options
            .translate_to
            .as_deref()
            .unwrap_or(&self.options.language);
        write_module(&module, &results, &tests, &destination, fallback_language)?;

        let all_tests = tests.values().flatten();
        let examples_passed = all_tests.clone().filter(|t| t.is_passed()).count();
        let examples_failed = all_tests.count() - examples_passed;

        let report = ModuleReport {
            output: destination,
            units: units.len(),
            documented: results.len(),
            failures,
            examples_passed,
            examples_failed,
        };
        info!(
            output = %report.output.display(),
            documented = report.documented,
            failed = report.failures.len(),
            examples_passed,
            examples_failed,
            "module written"
        );
        Ok(report)
    }

    async fn enhance_units(
        &self,
        units: &[&CodeUnit],
    ) -> (BTreeMap<UnitKey, EnhancementResult>, Vec<UnitFailure>) {
        let mut results = BTreeMap::new();
        let mut failures = Vec::new();
        // Once the provider is known to be unreachable, no further calls are made.
        let mut unreachable: Option<ProviderError> = None;

        for unit in units {
            if let Some(err) = &unreachable {
                failures.push(UnitFailure {
                    qualified_name: unit.qualified_name.clone(),
                    error: DocError::Provider(err.clone()),
                });
                continue;
            }

            match self.enhance_unit(unit).await {
                Ok(result) => {
                    results.insert(unit.key(), result);
                }
                Err(error) => {
                    warn!(unit = %unit.qualified_name, error = %error, "enhancement failed");
                    if let DocError::Provider(p) = &error {
                        if p.is_unreachable() {
                            unreachable = Some(p.clone());
                        }
                    }
                    failures.push(UnitFailure {
                        qualified_name: unit.qualified_name.clone(),
                        error,
                    });
                }
            }
        }

        (results, failures)
    }

    async fn enhance_unit(&self, unit: &CodeUnit) -> Result<EnhancementResult> {
        let result = self.enhancer.enhance(unit, &self.options.language).await?;
        match &self.options.translate_to {
            Some(target) => self.translator.translate_result(&result, target).await,
            None => Ok(result),
        }
    }

    async fn run_examples(
        &self,
        units: &[&CodeUnit],
        results: &BTreeMap<UnitKey, EnhancementResult>,
        context: Option<&ModuleContext>,
    ) -> BTreeMap<UnitKey, Vec<ExampleTestResult>> {
        let mut tests = BTreeMap::new();

        for unit in units {
            let mut examples = unit.examples();
            if self.options.test_generated {
                if let Some(result) = results
                    .get(&unit.key())
                    .filter(|r| !r.example.trim().is_empty())
                {
                    examples.push(CodeExample::new(
                        result.example.clone(),
                        Some("python".to_string()),
                        ExampleOrigin::Generated,
                    ));
                }
            }

            let mut unit_tests = Vec::new();
            for example in &examples {
                if let Some(test) = self.runner.run_example(example, context).await {
                    debug!(unit = %unit.qualified_name, status = %test.status, "example ran");
                    unit_tests.push(test);
                }
            }
            if !unit_tests.is_empty() {
                tests.insert(unit.key(), unit_tests);
            }
        }

        tests
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use crate::llm::testing::{sections, unreachable, StubProvider};

    const SOURCE: &str = r#""""Geometry helpers."""

def area(r):
    """Area of a circle.

    >>> print(area(1) > 3)
    True
    """
    return 3.14159 * r * r


def perimeter(r):
    """Perimeter of a circle."""
    return 2 * 3.14159 * r


class Shape:
    def name(self):
        return "shape"
"#;

    struct Fixture {
        dir: tempfile::TempDir,
        module: PathBuf,
    }

    impl Fixture {
        fn new(source: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let module = dir.path().join("geometry.py");
            fs::write(&module, source).unwrap();
            Self { dir, module }
        }

        fn output_dir(&self) -> PathBuf {
            self.dir.path().join("docs")
        }

        async fn run(
            &self,
            stub: Arc<StubProvider>,
            options: PipelineOptions,
        ) -> Result<ModuleReport> {
            let pipeline = Pipeline::new(stub, ExampleRunner::new(RunnerConfig::default()), options);
            pipeline
                .run(&self.module, self.dir.path(), &self.output_dir())
                .await
        }
    }

    fn no_examples() -> PipelineOptions {
        PipelineOptions {
            run_examples: false,
            ..PipelineOptions::default()
        }
    }

    fn reply(summary: &str) -> std::result::Result<String, ProviderError> {
        Ok(sections(summary, "Details.", "print(1)"))
    }

    #[tokio::test]
    async fn test_documents_every_unit() {
        let fixture = Fixture::new(SOURCE);
        let stub = Arc::new(StubProvider::new(vec![
            reply("Computes area."),
            reply("Computes perimeter."),
            reply("A shape."),
            reply("Names the shape."),
        ]));

        let report = fixture.run(stub.clone(), no_examples()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.units, 4);
        assert_eq!(report.documented, 4);
        assert_eq!(stub.calls(), 4);
        assert_eq!(report.output, fixture.output_dir().join("geometry.py.md"));

        let page = fs::read_to_string(&report.output).unwrap();
        assert!(page.starts_with("# Documentation for `geometry` [en]"));
        assert!(page.contains("**Summary**: Computes perimeter."));
        assert!(page.contains("## Method: `Shape.name`"));
    }

    #[tokio::test]
    async fn test_unit_failure_does_not_abort_module() {
        let fixture = Fixture::new(SOURCE);
        let stub = Arc::new(StubProvider::new(vec![
            Ok("no sections here".into()),
            reply("Computes perimeter."),
            reply("A shape."),
            reply("Names the shape."),
        ]));

        let report = fixture.run(stub.clone(), no_examples()).await.unwrap();
        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].qualified_name, "geometry.area");
        assert_eq!(report.failures[0].error.kind(), "ProviderError");
        assert_eq!(report.documented, 3);
        assert_eq!(stub.calls(), 4);

        let page = fs::read_to_string(&report.output).unwrap();
        assert!(page.contains("## Function: `area`"));
        assert!(page.contains("**Summary**: Computes perimeter."));
        assert_eq!(page.matches("**Summary**").count(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_provider_short_circuits() {
        let fixture = Fixture::new(SOURCE);
        let stub = Arc::new(StubProvider::new(vec![Err(unreachable())]));

        let report = fixture.run(stub.clone(), no_examples()).await.unwrap();
        assert_eq!(stub.calls(), 1);
        assert_eq!(report.failures.len(), 4);
        assert!(report.failures.iter().all(|f| f.error.is_unreachable()));
        assert_eq!(report.documented, 0);
        assert!(report.output.exists());
    }

    #[tokio::test]
    async fn test_translation_sets_header_language() {
        let fixture = Fixture::new("def only():\n    pass\n");
        let stub = Arc::new(StubProvider::new(vec![
            reply("Does nothing."),
            Ok("Ne fait rien.".into()),
            Ok("Détails.".into()),
            Ok("```python\nprint(1)\n```".into()),
        ]));
        let options = PipelineOptions {
            translate_to: Some("fr".into()),
            ..no_examples()
        };

        let report = fixture.run(stub.clone(), options).await.unwrap();
        assert!(report.is_success());
        assert_eq!(stub.calls(), 4);

        let page = fs::read_to_string(&report.output).unwrap();
        assert!(page.starts_with("# Documentation for `geometry` [fr]"));
        assert!(page.contains("**Summary**: Ne fait rien."));
    }

    #[tokio::test]
    async fn test_property_getter_and_setter_documented_separately() {
        let fixture = Fixture::new(
            "class Box:\n    @property\n    def size(self):\n        return 1\n\n    @size.setter\n    def size(self, value):\n        pass\n",
        );
        let stub = Arc::new(StubProvider::new(vec![
            reply("A box."),
            reply("Reads the size."),
            reply("Sets the size."),
        ]));

        let report = fixture.run(stub.clone(), no_examples()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.units, 3);
        assert_eq!(report.documented, 3);
        assert_eq!(stub.calls(), 3);

        let page = fs::read_to_string(&report.output).unwrap();
        assert_eq!(page.matches("## Method: `Box.size`").count(), 2);
        assert_eq!(page.matches("**Summary**: Reads the size.").count(), 1);
        assert_eq!(page.matches("**Summary**: Sets the size.").count(), 1);
    }

    #[tokio::test]
    async fn test_parse_error_aborts_before_provider() {
        let fixture = Fixture::new("def broken(:\n    pass\n");
        let stub = Arc::new(StubProvider::new(vec![]));

        let err = fixture.run(stub.clone(), no_examples()).await.unwrap_err();
        assert_eq!(err.kind(), "ParseError");
        assert!(err.to_string().contains("geometry.py:1:"));
        assert_eq!(stub.calls(), 0);
        assert!(!fixture.output_dir().exists());
    }

    #[tokio::test]
    async fn test_missing_module_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubProvider::new(vec![]));
        let pipeline = Pipeline::new(
            stub,
            ExampleRunner::new(RunnerConfig::default()),
            no_examples(),
        );
        let err = pipeline
            .run(&dir.path().join("absent.py"), dir.path(), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "IOError");
    }

    #[tokio::test]
    async fn test_docstring_and_generated_examples_run() {
        let python = std::process::Command::new("python3").arg("--version").output();
        if !python.is_ok_and(|o| o.status.success()) {
            return;
        }

        let fixture = Fixture::new(SOURCE);
        let stub = Arc::new(StubProvider::new(vec![
            Ok(sections("Area.", "Details.", "return 1/0")),
            reply("Perimeter."),
            reply("Shape."),
            reply("Name."),
        ]));
        let options = PipelineOptions {
            test_generated: true,
            ..PipelineOptions::default()
        };

        let report = fixture.run(stub, options).await.unwrap();
        // area: docstring doctest passes, generated example fails; the other
        // three generated examples print 1.
        assert_eq!(report.examples_passed, 4);
        assert_eq!(report.examples_failed, 1);

        let page = fs::read_to_string(&report.output).unwrap();
        assert!(page.contains("ZeroDivisionError: division by zero"));
    }
}
