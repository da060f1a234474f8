//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::client::CentralClient;
use crate::config::ClientConfig;
use crate::endpoints::{self, Access, ENDPOINTS};
use crate::error::{Result, ResultExt};
use crate::types::StringMap;
use futures::TryStreamExt;
use serde_json::Value;
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Endpoints { all: true } => self.endpoints(None),
            Commands::Endpoints { all: false } => {
                let client = self.connect().await?;
                self.endpoints(Some(&client))
            }
            Commands::Whoami => {
                let client = self.connect().await?;
                self.output_value(&serde_json::to_value(client.identity())?);
                Ok(())
            }
            Commands::Tenants => {
                let client = self.connect().await?;
                let tenants = client.tenants().await?;
                self.output_value(&serde_json::to_value(tenants)?);
                Ok(())
            }
            Commands::Call {
                name,
                args,
                params,
                tenant,
            } => {
                let client = self.connect().await?;
                self.call(&client, name, args, params, tenant.as_deref())
                    .await
            }
        }
    }

    /// Load configuration: the config file if given, the environment otherwise
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)
                .with_context(|| format!("Loading {}", path.display()))?,
            None => ClientConfig::from_env()?,
        };
        if let Some(page_size) = self.cli.page_size {
            config.page_size = page_size;
        }
        Ok(config)
    }

    async fn connect(&self) -> Result<CentralClient> {
        CentralClient::connect(self.load_config()?).await
    }

    /// List endpoints, limited to the client's scope when a client is given
    fn endpoints(&self, client: Option<&CentralClient>) -> Result<()> {
        let descriptors: Vec<_> = match client {
            Some(client) => endpoints::available_to(client.id_type()).collect(),
            None => ENDPOINTS.iter().collect(),
        };
        self.output_value(&serde_json::to_value(descriptors)?);
        Ok(())
    }

    /// Call an endpoint, optionally on behalf of a tenant
    async fn call(
        &self,
        client: &CentralClient,
        name: &str,
        args: &[String],
        params: &[(String, String)],
        tenant: Option<&str>,
    ) -> Result<()> {
        let scoped;
        let client = match tenant {
            Some(tenant_id) => {
                let tenant = client.tenant(tenant_id).await?;
                debug!(tenant = tenant.display_name(), "Calling on behalf of tenant");
                scoped = client.for_tenant(&tenant)?;
                &scoped
            }
            None => client,
        };

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let params: StringMap = params.iter().cloned().collect();

        if self.cli.format == OutputFormat::Ndjson {
            let (descriptor, access) = client.resolve(name)?;
            if access == Access::Collection && descriptor.paged {
                let path = descriptor.render_path(&args)?;
                let mut pages = std::pin::pin!(client.stream_paged(&path, params));
                while let Some(records) = pages.try_next().await? {
                    for record in &records {
                        self.output_line(record);
                    }
                }
                return Ok(());
            }
        }

        let value = client.invoke(name, &args, &params).await?;
        self.output_value(&value);
        Ok(())
    }

    /// Output a whole document
    fn output_value(&self, value: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(value).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            }
            OutputFormat::Ndjson => match value {
                Value::Array(records) => records.iter().for_each(|r| self.output_line(r)),
                other => self.output_line(other),
            },
        }
    }

    /// Output one record on its own line
    fn output_line(&self, value: &Value) {
        println!("{}", serde_json::to_string(value).unwrap_or_default());
    }
}
