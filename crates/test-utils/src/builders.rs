use devloop::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults but replaces the server and generator
/// with harmless `sleep` processes (the post-restart notify becomes
/// `sleep 0`), so tests never depend on Go or templ being installed.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.server.cmd = "sleep".to_string();
        config.server.args = vec!["30".to_string()];
        config.server.stop_timeout_ms = 2000;
        config.generator.cmd = "sleep".to_string();
        config.generator.args = vec!["30".to_string()];
        config.generator.notify_args = vec!["0".to_string()];
        config.generator.stop_timeout_ms = 2000;
        Self { config }
    }

    pub fn quiet_period_ms(mut self, ms: u64) -> Self {
        self.config.watch.quiet_period_ms = ms;
        self
    }

    pub fn exclude(mut self, dir: &str) -> Self {
        self.config.watch.exclude.push(dir.to_string());
        self
    }

    pub fn manifest(mut self, on: bool) -> Self {
        self.config.bundler.manifest = on;
        self
    }

    pub fn bundler_program(mut self, program: &str) -> Self {
        self.config.bundler.program = program.to_string();
        self
    }

    pub fn server(mut self, cmd: &str, args: &[&str]) -> Self {
        self.config.server.cmd = cmd.to_string();
        self.config.server.args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn generator(mut self, cmd: &str, args: &[&str]) -> Self {
        self.config.generator.cmd = cmd.to_string();
        self.config.generator.args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn generator_notify(mut self, args: &[&str]) -> Self {
        self.config.generator.notify_args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn raw(&self) -> &RawConfigFile {
        &self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
