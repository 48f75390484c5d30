use anyhow::{Result, anyhow, bail};
use clap::Parser;
use color_print::cstr;
use dialoguer::Confirm;
use ebsnap::config::{self, FileConfig};
use ebsnap::report::{self, Columns, Property};
use ebsnap::{AwsConfig, BulkDelete, BulkDeleteConfig, FailedSnapshot, Hooks, Snapshot};
use indicatif::{ProgressBar, ProgressStyle};
use log::{LevelFilter, info};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

const AFTER_HELP: &str = cstr!(
    r#"
<bold><underline>ENVIRONMENT VARIABLES:</underline></bold>
  <bold>EBSNAP_CONFIG</bold>
      Path to the TOML configuration file (e.g., /etc/ebsnap.toml).
  <bold>AWS_REGION</bold>, <bold>AWS_PROFILE</bold>, <bold>AWS_ACCESS_KEY_ID</bold>, <bold>AWS_SECRET_ACCESS_KEY</bold>, <bold>AWS_SESSION_TOKEN</bold>
      Fallbacks for the matching flags.

<bold><underline>EXAMPLES:</underline></bold>
  ebsnap --region us-east-1 --age 30 --plan
  ebsnap --region us-east-1 --age 7 --tags 'Env=qa,dev' --tags Team=storage
"#
);

const CONFIRM_MESSAGE: &str = "Do you want to perform this actions?
ebsnap will perform the actions described above.
Only 'y' will be accepted to approve.
";

#[derive(Parser)]
#[command(
    about,
    version,
    after_help = AFTER_HELP
)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short = 'c', long, env = "EBSNAP_CONFIG")]
    config: Option<PathBuf>,
    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,
    /// AWS profile
    #[arg(long, env = "AWS_PROFILE")]
    profile: Option<String>,
    /// AWS access key id
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,
    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,
    /// AWS session token
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,
    /// Verbose mode (debug logging)
    #[arg(short, long)]
    verbose: bool,
    /// Don't make any changes; only show what would be deleted
    #[arg(long)]
    plan: bool,
    /// Snapshot retention period (days)
    #[arg(long)]
    age: Option<u32>,
    /// Snapshot tag (repeatable), e.g. Name=foo or Name="foo,bar,baz"
    #[arg(long = "tags", value_name = "KEY=VALUE")]
    tags: Vec<String>,
    /// Per-request timeout (e.g., 30s, 2m)
    #[arg(long)]
    timeout: Option<humantime::Duration>,
    /// Properties to show (comma separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    show_properties: Vec<Property>,
    /// Tag keys to show in the Tags column (comma separated)
    #[arg(long, value_delimiter = ',')]
    show_tags: Vec<String>,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

impl Cli {
    fn bulk_delete_config(&self, file: &FileConfig) -> Result<BulkDeleteConfig> {
        let region = self
            .region
            .clone()
            .or_else(|| file.region.clone())
            .ok_or_else(|| anyhow!("Region not specified (use --region, AWS_REGION or the config file)"))?;
        let timeout = match self.timeout.clone() {
            Some(timeout) => Some(timeout),
            None => file.request_timeout()?,
        };
        Ok(BulkDeleteConfig {
            aws: AwsConfig {
                region,
                profile: self.profile.clone().or_else(|| file.profile.clone()),
                access_key_id: self.access_key_id.clone(),
                secret_access_key: self.secret_access_key.clone(),
                session_token: self.session_token.clone(),
                timeout: timeout.map(Into::into),
            },
            plan: self.plan,
            age: self.age.or(file.age).unwrap_or(0),
            tags: prefer(&self.tags, &file.tags),
        })
    }

    fn columns(&self, file: &FileConfig) -> Result<Columns> {
        let properties = if self.show_properties.is_empty() {
            file.show_properties
                .iter()
                .map(|p| Property::parse(p))
                .collect::<Result<Vec<_>>>()?
        } else {
            self.show_properties.clone()
        };
        Ok(Columns::new(&properties, &prefer(&self.show_tags, &file.show_tags)))
    }
}

fn prefer(cli: &[String], file: &[String]) -> Vec<String> {
    let chosen = if cli.is_empty() { file } else { cli };
    chosen.to_vec()
}

/// Terminal front end: tables, confirmation and progress.
struct Console {
    region: String,
    columns: Columns,
    plan: bool,
    assume_yes: bool,
    progress: Option<ProgressBar>,
}

impl Hooks for Console {
    fn before_list(&mut self) -> Result<()> {
        info!("Describing snapshots in {}", self.region);
        Ok(())
    }

    fn after_list(&mut self, snapshots: &[Snapshot]) -> Result<()> {
        print!("{}", report::render_plan(snapshots, &self.columns));
        if self.plan || self.assume_yes {
            return Ok(());
        }
        println!("{}", CONFIRM_MESSAGE);
        confirm()
    }

    fn before_delete(&mut self, snapshots: &[Snapshot]) -> Result<()> {
        let bar = ProgressBar::new(snapshots.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} snapshots ({elapsed})")?
                .progress_chars("#>-"),
        );
        self.progress = Some(bar);
        Ok(())
    }

    fn snapshot_deleted(&mut self, _snapshot: &Snapshot) -> Result<()> {
        if let Some(bar) = &self.progress {
            bar.inc(1);
        }
        Ok(())
    }

    fn after_delete(&mut self, successful: &[Snapshot], failed: &[FailedSnapshot]) -> Result<()> {
        if let Some(bar) = self.progress.take() {
            bar.finish();
        }
        print!("{}", report::render_result(successful, failed, &self.columns));
        Ok(())
    }
}

fn confirm() -> Result<()> {
    // A closed or non-interactive terminal counts as a refusal.
    let approved = Confirm::new()
        .with_prompt("Enter a value")
        .default(false)
        .interact()
        .unwrap_or(false);
    if !approved {
        bail!("Apply cancelled.");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();
    info!("Starting ebsnap");

    let file = config::load(cli.config.clone())?;
    let bulk_config = cli.bulk_delete_config(&file)?;
    let mut console = Console {
        region: bulk_config.aws.region.clone(),
        columns: cli.columns(&file)?,
        plan: bulk_config.plan,
        assume_yes: cli.yes,
        progress: None,
    };

    let mut bulk_delete = BulkDelete::new(&bulk_config)?;
    bulk_delete.run_with_hooks(&CancellationToken::new(), &mut console)
}
