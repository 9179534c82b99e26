use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::IntoDiagnostic;
use remtrace_ssh::{ConnectOptions, Connection, Credential, Target, TrustPolicy};

use crate::cli::CliConnection;

/// Profile describing how to reach a target.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct Profile {
    /// Host name or address of the target.
    #[knus(child, unwrap(argument))]
    pub host: Option<String>,

    /// Port of the SSH service.
    #[knus(child, default = remtrace_ssh::DEFAULT_PORT, unwrap(argument))]
    pub port: u16,

    /// Remote user name.
    #[knus(child, default = "fuchsia".to_owned(), unwrap(argument))]
    pub user: String,

    /// Private key file.
    #[knus(child, unwrap(argument))]
    pub key: Option<String>,

    /// Host identity policy: `"insecure"`, a `"SHA256:..."` fingerprint, or a
    /// known hosts file.
    #[knus(child, unwrap(argument, str))]
    pub host_key: Option<TrustPolicy>,

    /// Deadline for connecting to the target, in seconds.
    #[knus(child, unwrap(argument))]
    pub connect_timeout: Option<u64>,

    /// Deadline for the target to connect back a trace stream, in seconds.
    #[knus(child, unwrap(argument))]
    pub accept_timeout: Option<u64>,

    /// Deadline for each response of the time service, in seconds.
    #[knus(child, unwrap(argument))]
    pub sync_timeout: Option<u64>,
}

impl Profile {
    /// Loads the profile given on the command line, applying its overrides.
    pub fn from_cli(cli: &CliConnection) -> miette::Result<Self> {
        let mut profile = match &cli.profile {
            Some(profile) => parse_profile(profile)?,
            None => knus::parse("<content>", "")?,
        };

        if let Some(target) = &cli.target {
            let target = target.parse::<Target>().into_diagnostic()?;
            profile.host = Some(target.host);
            profile.port = target.port;
        }

        if let Some(key) = &cli.key {
            profile.key = Some(key.to_string_lossy().into_owned());
        }

        Ok(profile)
    }

    /// Connects to the target described by this profile.
    pub async fn connect(&self) -> miette::Result<Connection> {
        let host = self
            .host
            .clone()
            .ok_or_else(|| miette::miette!("no target given (use --target or a profile)"))?;

        let credential = Credential {
            user: self.user.clone(),
            private_key: self.private_key(),
            passphrase: None,
        };

        let options = ConnectOptions {
            trust: self.trust_policy(),
            timeout: self.connect_timeout.map(Duration::from_secs),
        };

        Connection::connect(Target::new(host, self.port), credential, options)
            .await
            .into_diagnostic()
    }

    /// Deadline for the target to connect back a trace stream.
    pub fn accept_timeout(&self) -> Option<Duration> {
        self.accept_timeout.map(Duration::from_secs)
    }

    /// Deadline for each response of the time service.
    pub fn sync_timeout(&self) -> Option<Duration> {
        self.sync_timeout.map(Duration::from_secs)
    }

    fn private_key(&self) -> PathBuf {
        expand_home(self.key.as_deref().unwrap_or("~/.ssh/id_ed25519"))
    }

    fn trust_policy(&self) -> TrustPolicy {
        match &self.host_key {
            Some(TrustPolicy::KnownHosts(path)) => {
                TrustPolicy::KnownHosts(expand_home(&path.to_string_lossy()))
            }
            Some(policy) => policy.clone(),
            None => TrustPolicy::KnownHosts(expand_home("~/.ssh/known_hosts")),
        }
    }
}

fn parse_profile(profile: &str) -> miette::Result<Profile> {
    let path = Path::new(profile);

    let profile = if let Some((filename, "kdl")) = path
        .file_name()
        .and_then(OsStr::to_str)
        .zip(path.extension().and_then(OsStr::to_str))
    {
        let content = std::fs::read_to_string(path).into_diagnostic()?;
        knus::parse(filename, &content)?
    } else {
        knus::parse("<content>", profile)?
    };

    Ok(profile)
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ => PathBuf::from(path),
    }
}
