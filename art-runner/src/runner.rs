//! Suite execution: environment build, setup, ordered cases, teardown, cleanup

use art_api::high_level::datacenters;
use art_api::version::version_at_least;
use art_api::Engine;
use art_shared::{ArtConfig, ArtError, Result};
use regex::Regex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::report::{Outcome, RunReport};
use crate::suites::{Suite, SuiteContext};

pub struct Runner {
    config: ArtConfig,
    filter: Option<Regex>,
}

impl Runner {
    /// `filter` is a regex matched against `suite::case`
    pub fn new(config: ArtConfig, filter: Option<&str>) -> Result<Self> {
        let filter = filter
            .map(Regex::new)
            .transpose()
            .map_err(|e| ArtError::Config(format!("Invalid case filter: {e}")))?;
        Ok(Self { config, filter })
    }

    /// Cases of `suite` selected by the filter, in suite order
    pub fn selected_cases(&self, suite: &dyn Suite) -> Vec<&'static str> {
        suite
            .cases()
            .into_iter()
            .filter(|case| match &self.filter {
                Some(filter) => filter.is_match(&format!("{}::{}", suite.name(), case)),
                None => true,
            })
            .collect()
    }

    /// `suite::case` ids of every selected case
    pub fn list(&self, suites: &[Box<dyn Suite>]) -> Vec<String> {
        suites
            .iter()
            .flat_map(|suite| {
                self.selected_cases(suite.as_ref())
                    .into_iter()
                    .map(move |case| format!("{}::{}", suite.name(), case))
            })
            .collect()
    }

    /// Run the selected cases; every path ends with a finished, logged report
    pub async fn run(&self, engine: Engine, suites: Vec<Box<dyn Suite>>) -> RunReport {
        let mut report = RunReport::new();
        self.execute(engine, suites, &mut report).await;
        report.finish();
        report.log_summary();
        report
    }

    async fn execute(&self, engine: Engine, suites: Vec<Box<dyn Suite>>, report: &mut RunReport) {
        let planned: Vec<(Box<dyn Suite>, Vec<&'static str>)> = suites
            .into_iter()
            .map(|suite| {
                let cases = self.selected_cases(suite.as_ref());
                (suite, cases)
            })
            .filter(|(_, cases)| !cases.is_empty())
            .collect();

        if planned.is_empty() {
            warn!("No cases match the filter");
            return;
        }

        let engine_version = match engine.versions().engine_version().await {
            Ok(version) => version.to_string(),
            Err(e) => {
                report.record_error("Engine version lookup", &e);
                return;
            }
        };
        report.engine_version = Some(engine_version.clone());

        let ctx = SuiteContext::new(engine, self.config.topology.clone());
        let build = self.config.topology.build_setup;
        let skip_teardown = self.config.execution.skip_teardown;

        if build {
            if let Err(e) = datacenters::build_setup(&ctx.engine, &ctx.topology).await {
                report.record_error("Environment setup", &e);
                for (suite, cases) in &planned {
                    for case in cases {
                        report.record(
                            suite.name(),
                            case,
                            Outcome::Error,
                            Duration::ZERO,
                            Some("environment setup failed".to_string()),
                        );
                    }
                }
                self.clean_environment(&ctx, report, skip_teardown).await;
                return;
            }
        }

        for (mut suite, cases) in planned {
            self.run_suite(suite.as_mut(), &cases, &ctx, &engine_version, report)
                .await;
        }

        if build {
            self.clean_environment(&ctx, report, skip_teardown).await;
        }
    }

    async fn run_suite(
        &self,
        suite: &mut dyn Suite,
        cases: &[&'static str],
        ctx: &SuiteContext,
        engine_version: &str,
        report: &mut RunReport,
    ) {
        let name = suite.name();
        if let Some(minimum) = suite.min_engine_version() {
            if !version_at_least(engine_version, minimum) {
                for case in cases {
                    report.record(
                        name,
                        case,
                        Outcome::Skipped,
                        Duration::ZERO,
                        Some(format!("needs engine {minimum}, found {engine_version}")),
                    );
                }
                return;
            }
        }

        info!("Setting up suite {}", name);
        if let Err(e) = suite.setup(ctx).await {
            for case in cases {
                report.record(
                    name,
                    case,
                    Outcome::Error,
                    Duration::ZERO,
                    Some(format!("suite setup failed: {e}")),
                );
            }
            // Setup may have created entities before failing
            self.teardown(suite, ctx, report).await;
            return;
        }

        for case in cases {
            match suite.case_supported(ctx, case).await {
                Ok(true) => {}
                Ok(false) => {
                    report.record(
                        name,
                        case,
                        Outcome::Skipped,
                        Duration::ZERO,
                        Some("not supported by this environment".to_string()),
                    );
                    continue;
                }
                Err(e) => {
                    report.record_result(name, case, &Err(e), Duration::ZERO);
                    continue;
                }
            }

            info!("Running {}::{}", name, case);
            let started = Instant::now();
            let result = suite.run_case(ctx, case).await;
            report.record_result(name, case, &result, started.elapsed());
        }

        self.teardown(suite, ctx, report).await;
    }

    async fn teardown(&self, suite: &mut dyn Suite, ctx: &SuiteContext, report: &mut RunReport) {
        if self.config.execution.skip_teardown {
            debug!("Skipping teardown of suite {}", suite.name());
            return;
        }
        info!("Tearing down suite {}", suite.name());
        if let Err(e) = suite.teardown(ctx).await {
            report.record_error(&format!("Teardown of suite {}", suite.name()), &e);
        }
    }

    async fn clean_environment(&self, ctx: &SuiteContext, report: &mut RunReport, skip: bool) {
        if skip {
            info!("Leaving datacenter {} in place", ctx.topology.datacenter);
            return;
        }
        if let Err(e) = datacenters::clean_datacenter(&ctx.engine, &ctx.topology).await {
            report.record_error("Environment cleanup", &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use art_api::RestClient;
    use art_shared::{ensure, AuthMode, EngineConnection};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Suite whose cases pass, fail or error by name
    struct ScriptedSuite {
        calls: Arc<Mutex<Vec<String>>>,
        fail_setup: bool,
    }

    impl ScriptedSuite {
        fn new(calls: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                calls,
                fail_setup: false,
            }
        }

        fn log(&self, entry: &str) {
            self.calls.lock().unwrap().push(entry.to_string());
        }
    }

    #[async_trait]
    impl Suite for ScriptedSuite {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn cases(&self) -> Vec<&'static str> {
            vec!["passes", "fails", "errors", "unsupported"]
        }

        async fn case_supported(&self, _ctx: &SuiteContext, case: &str) -> Result<bool> {
            Ok(case != "unsupported")
        }

        async fn setup(&mut self, _ctx: &SuiteContext) -> Result<()> {
            self.log("setup");
            if self.fail_setup {
                return Err(ArtError::DataCenter("no datacenter".to_string()));
            }
            Ok(())
        }

        async fn run_case(&mut self, _ctx: &SuiteContext, case: &str) -> Result<()> {
            self.log(case);
            match case {
                "fails" => {
                    let status = "down";
                    ensure!(status == "up", "VM vm_0 is {status}, expected up");
                    Ok(())
                }
                "errors" => Err(ArtError::Vm("Failed to start VM vm_0".to_string())),
                _ => Ok(()),
            }
        }

        async fn teardown(&mut self, _ctx: &SuiteContext) -> Result<()> {
            self.log("teardown");
            Ok(())
        }
    }

    async fn engine_at(server: &MockServer) -> Engine {
        Mock::given(method("GET"))
            .and(path("/ovirt-engine/api/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "product_info": {"version": {"major": 4, "minor": 5, "build": 4, "revision": 0}}
            })))
            .mount(server)
            .await;

        let connection = EngineConnection {
            name: "mock".to_string(),
            url: format!("{}/ovirt-engine/api", server.uri()),
            username: "admin@internal".to_string(),
            password: Some("secret".to_string()),
            auth: AuthMode::Basic,
            verify_tls: true,
        };
        let client = RestClient::with_password(&connection, "secret".to_string()).unwrap();
        Engine::new(client, Default::default(), 2)
    }

    fn config() -> ArtConfig {
        let mut config = ArtConfig::sample();
        config.topology.build_setup = false;
        config
    }

    #[test]
    fn test_filter_selects_suite_case_ids() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let suites: Vec<Box<dyn Suite>> = vec![Box::new(ScriptedSuite::new(calls))];

        let runner = Runner::new(config(), Some("^scripted::(passes|errors)$")).unwrap();
        assert_eq!(runner.list(&suites), vec!["scripted::passes", "scripted::errors"]);

        let runner = Runner::new(config(), None).unwrap();
        assert_eq!(runner.list(&suites).len(), 4);
    }

    #[test]
    fn test_invalid_filter_is_a_config_error() {
        let err = Runner::new(config(), Some("(unclosed")).err().unwrap();
        assert!(matches!(err, ArtError::Config(_)));
    }

    #[tokio::test]
    async fn test_run_classifies_cases_and_tears_down() {
        let server = MockServer::start().await;
        let engine = engine_at(&server).await;
        let calls = Arc::new(Mutex::new(Vec::new()));

        let runner = Runner::new(config(), None).unwrap();
        let report = runner
            .run(engine, vec![Box::new(ScriptedSuite::new(calls.clone()))])
            .await;

        let outcomes: Vec<(String, Outcome)> = report
            .results
            .iter()
            .map(|r| (r.case.clone(), r.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                ("passes".to_string(), Outcome::Passed),
                ("fails".to_string(), Outcome::Failed),
                ("errors".to_string(), Outcome::Error),
                ("unsupported".to_string(), Outcome::Skipped),
            ]
        );
        assert_eq!(report.engine_version.as_deref(), Some("4.5.4.0"));
        assert!(!report.all_passed());
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["setup", "passes", "fails", "errors", "teardown"]
        );
    }

    #[tokio::test]
    async fn test_failed_setup_errors_every_selected_case() {
        let server = MockServer::start().await;
        let engine = engine_at(&server).await;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let suite = ScriptedSuite {
            calls: calls.clone(),
            fail_setup: true,
        };

        let runner = Runner::new(config(), Some("passes|fails")).unwrap();
        let report = runner.run(engine, vec![Box::new(suite)]).await;

        assert_eq!(report.results.len(), 2);
        assert!(report.results.iter().all(|r| r.outcome == Outcome::Error));
        assert!(report.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("no datacenter"));
        assert_eq!(*calls.lock().unwrap(), vec!["setup", "teardown"]);
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_a_run_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "reason": "Service Unavailable"
            })))
            .mount(&server)
            .await;
        let connection = EngineConnection {
            name: "down".to_string(),
            url: format!("{}/ovirt-engine/api", server.uri()),
            username: "admin@internal".to_string(),
            password: None,
            auth: AuthMode::Basic,
            verify_tls: true,
        };
        let client = RestClient::with_password(&connection, "secret".to_string()).unwrap();
        let engine = Engine::new(client, Default::default(), 1);

        let calls = Arc::new(Mutex::new(Vec::new()));
        let runner = Runner::new(config(), None).unwrap();
        let report = runner
            .run(engine, vec![Box::new(ScriptedSuite::new(calls.clone()))])
            .await;

        assert!(report.results.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert!(report.finished_at.is_some());
        assert!(!report.all_passed());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_selection_still_finishes_the_report() {
        let server = MockServer::start().await;
        let engine = engine_at(&server).await;
        let calls = Arc::new(Mutex::new(Vec::new()));

        let runner = Runner::new(config(), Some("^nothing::")).unwrap();
        let report = runner
            .run(engine, vec![Box::new(ScriptedSuite::new(calls.clone()))])
            .await;

        assert!(report.finished_at.is_some());
        assert_eq!(report.summary_line(), "0 cases: 0 passed, 0 failed, 0 errors, 0 skipped");
        assert!(report.all_passed());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_environment_build_errors_cases_and_finishes() {
        let server = MockServer::start().await;
        let engine = engine_at(&server).await;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut config = config();
        config.topology.build_setup = true;
        config.topology.hosts.clear();

        let runner = Runner::new(config, Some("passes")).unwrap();
        let report = runner
            .run(engine, vec![Box::new(ScriptedSuite::new(calls.clone()))])
            .await;

        assert!(report.finished_at.is_some());
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.results[0].outcome, Outcome::Error);
        assert!(report.errors[0].starts_with("Environment setup"));
        assert!(calls.lock().unwrap().is_empty());
    }
}
