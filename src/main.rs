use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use oci_client::secrets::RegistryAuth;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use gitimages::{
    GitRepo, Identification, ImageIdentifier, LabelMatcher, Matcher, Notifier, OciRegistry,
    PrefixMatcher, REVISION_LABEL,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Strategy {
    /// Match the commit hash against an image label
    Label {
        #[arg(long, default_value = REVISION_LABEL, help = "Label holding the source revision")]
        key: String,
    },
    /// Match the commit hash against tag names like sha-abcd123
    Prefix {
        #[arg(long, default_value = "sha-", help = "Prefix stripped from tags before comparing")]
        prefix: String,
    },
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(help = "Git repository to walk: a local directory or a URL to clone")]
    repository: String,

    #[arg(short, long, help = "Branch to start from (defaults to HEAD)")]
    branch: Option<String>,

    #[arg(
        short,
        long,
        help = "Image repository to search (e.g., bigkevmcd/go-demo)"
    )]
    image: String,

    #[arg(long, value_name = "SECONDS", help = "Deadline for each registry request")]
    timeout: Option<u64>,

    #[arg(long, env = "GITIMAGES_USERNAME", help = "Registry username")]
    username: Option<String>,

    #[arg(
        long,
        env = "GITIMAGES_PASSWORD",
        hide_env_values = true,
        help = "Registry password or token"
    )]
    password: Option<String>,

    #[arg(short, long, value_enum, default_value = "text", help = "Output format")]
    format: Format,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Verbose mode (-v for info, -vv for debug, -vvv for trace)"
    )]
    verbose: u8,

    #[command(subcommand)]
    strategy: Strategy,
}

#[derive(Serialize)]
struct Report<'a> {
    image: &'a str,
    tag: Option<&'a str>,
    commit: Option<&'a str>,
    committed_at: Option<DateTime<Utc>>,
}

fn registry_auth(username: Option<String>, password: Option<String>) -> Result<RegistryAuth> {
    match (username, password) {
        (Some(username), Some(password)) => Ok(RegistryAuth::Basic(username, password)),
        (None, None) => Ok(RegistryAuth::Anonymous),
        _ => bail!("--username and --password must be given together"),
    }
}

fn print_result(cli: &Cli, found: Option<&Identification>, notifier: &Notifier) -> Result<()> {
    match cli.format {
        Format::Text => match found {
            Some(found) => {
                notifier.debug(&format!(
                    "{} was built from {} ({}), committed {}",
                    found.tag, found.commit, found.summary, found.committed_at
                ));
                println!("{}", found.tag);
            }
            None => notifier.warn(&format!(
                "No image in {} matches a commit of {}",
                cli.image, cli.repository
            )),
        },
        Format::Json => {
            let report = Report {
                image: &cli.image,
                tag: found.map(|f| f.tag.as_str()),
                commit: found.map(|f| f.commit.as_str()),
                committed_at: found.map(|f| f.committed_at),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

/// Clones or opens the repository and walks it for an image.
fn run(cli: &Cli, notifier: &Notifier) -> Result<Option<Identification>> {
    let auth = registry_auth(cli.username.clone(), cli.password.clone())?;
    let registry = OciRegistry::new(auth, cli.timeout.map(Duration::from_secs))?;

    let repo = if Path::new(&cli.repository).is_dir() {
        GitRepo::open(Path::new(&cli.repository), cli.branch.as_deref())?
    } else {
        GitRepo::clone_remote(&cli.repository, cli.branch.as_deref(), notifier)?
    };
    debug!("Walking history in {}", repo.path().display());

    notifier.info(&format!("Listing tags of {}", cli.image));
    let matcher: Box<dyn Matcher> = match &cli.strategy {
        Strategy::Label { key } => Box::new(LabelMatcher::new(registry, &cli.image, key.as_str())?),
        Strategy::Prefix { prefix } => {
            Box::new(PrefixMatcher::new(&registry, &cli.image, prefix.as_str())?)
        }
    };

    notifier.info("Searching commit history for a published image");
    Ok(ImageIdentifier::new(matcher).identify(&repo)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let notifier = Notifier::init(cli.verbose);

    debug!("Repository: {}", cli.repository);
    debug!("Image: {}", cli.image);
    debug!("Strategy: {:?}", cli.strategy);

    // The spinner must be gone before anything, including an error, is printed
    let found = run(&cli, &notifier);
    notifier.finish();

    print_result(&cli, found?.as_ref(), &notifier)
}
