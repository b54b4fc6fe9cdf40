use std::fmt;
use std::path::Path;

use vesla::VeslaConfig;
use vesla::config::CONFIG_FILE;
use vesla::engine::{ContainerEngine, DockerEngine};

#[derive(Debug, Default, Clone)]
struct CheckResult {
    passed: bool,
    detail: String,
}

impl CheckResult {
    fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

#[derive(Debug, Default)]
struct DoctorReport {
    config_file: CheckResult,
    allowed_domains: CheckResult,
    docker: CheckResult,
    network: CheckResult,
    dns_token: CheckResult,
}

impl DoctorReport {
    fn checks(&self) -> [(&'static str, &CheckResult); 5] {
        [
            ("Config file", &self.config_file),
            ("Allowed domains", &self.allowed_domains),
            ("Docker engine", &self.docker),
            ("App network", &self.network),
            ("DNS token", &self.dns_token),
        ]
    }

    fn all_passed(&self) -> bool {
        self.checks().iter().all(|(_, check)| check.passed)
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vesla Doctor")?;
        writeln!(f, "------------------------------")?;
        for (name, check) in self.checks() {
            writeln!(f, "{name:<18}{:<4}{}", check.icon(), check.detail)?;
        }
        Ok(())
    }
}

pub async fn doctor(config_dir: &Path) -> anyhow::Result<()> {
    let mut report = DoctorReport::default();

    let config_path = config_dir.join(CONFIG_FILE);
    report.config_file = if config_path.exists() {
        CheckResult::ok(&config_path.display().to_string())
    } else {
        CheckResult::fail(&format!("{} not found, using defaults", config_path.display()))
    };

    let config = match VeslaConfig::load(config_dir) {
        Ok(config) => config,
        Err(e) => {
            report.config_file = CheckResult::fail(&e.to_string());
            VeslaConfig::default()
        }
    };

    let domains = &config.server.allowed_domains;
    report.allowed_domains = if domains.is_empty() {
        CheckResult::fail("none configured, every deploy will be rejected")
    } else {
        CheckResult::ok(&domains.join(", "))
    };

    report.dns_token = if std::env::var_os(vesla::dns::TOKEN_ENV).is_some_and(|v| !v.is_empty()) {
        CheckResult::ok("Set")
    } else {
        CheckResult::fail(&format!("{} not set", vesla::dns::TOKEN_ENV))
    };

    match DockerEngine::connect() {
        Ok(engine) => check_engine(&engine, &config, &mut report).await,
        Err(e) => {
            report.docker = CheckResult::fail(&e.to_string());
            report.network = CheckResult::fail("Docker not reachable");
        }
    }

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed, see above for details");
    }

    Ok(())
}

async fn check_engine(engine: &impl ContainerEngine, config: &VeslaConfig, report: &mut DoctorReport) {
    match engine.version().await {
        Ok(version) => report.docker = CheckResult::ok(&version),
        Err(e) => {
            report.docker = CheckResult::fail(&e.to_string());
            report.network = CheckResult::fail("Docker not reachable");
            return;
        }
    }

    let network = &config.docker.network;
    report.network = match engine.network_exists(network).await {
        Ok(true) => CheckResult::ok(network),
        Ok(false) => CheckResult::ok(&format!("{network} (created on first deploy)")),
        Err(e) => CheckResult::fail(&e.to_string()),
    };
}
