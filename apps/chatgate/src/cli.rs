use clap::Parser;

use chatgate_core::ConfigOverrides;

#[derive(Parser)]
#[command(name = "chatgate", about = "OpenAI-compatible chat completions gateway")]
pub(crate) struct Cli {
    /// Deployment environment: development, test, staging or production.
    /// Overrides the ENVIRONMENT variable.
    #[arg(long)]
    pub(crate) environment: Option<String>,
    /// Bind host, overrides the HOST variable.
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Bind port, overrides the PORT variable.
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

impl Cli {
    pub(crate) fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            environment: self.environment.clone(),
            host: self.host.clone(),
            port: self.port,
        }
    }
}
