use cachefirst_core::{DiskStorage, WorkerConfig};

use super::args::{Cli, Command, CommonArgs};

pub mod fetch;
pub mod install;
pub mod list;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(&cli.common)?;
    match cli.cmd {
        Command::Install => install::run(config).await,
        Command::Fetch(args) => fetch::run(config, args).await,
        Command::List => list::run(config).await,
    }
}

/// Defaults, then the config file, then environment, then flags.
pub(crate) fn load_config(common: &CommonArgs) -> anyhow::Result<WorkerConfig> {
    let mut config = match &common.config {
        Some(path) => WorkerConfig::load(path)?,
        None => WorkerConfig::default(),
    }
    .with_env_overrides();

    if let Some(origin) = &common.origin {
        config = config.with_origin(origin.as_str());
    }
    if let Some(dir) = &common.cache_dir {
        config = config.with_cache_dir(dir);
    }
    if let Some(name) = &common.cache_name {
        config = config.with_cache_name(name.as_str());
    }

    config.validate()?;
    Ok(config)
}

pub(crate) fn storage_for(config: &WorkerConfig) -> anyhow::Result<DiskStorage> {
    Ok(match &config.cache_dir {
        Some(dir) => DiskStorage::with_dir(dir),
        None => DiskStorage::new()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache_name: from-file\norigin: https://file.example").unwrap();

        let common = CommonArgs {
            config: Some(file.path().to_path_buf()),
            origin: Some("https://flag.example".into()),
            cache_dir: None,
            cache_name: None,
        };
        let config = load_config(&common).unwrap();
        assert_eq!(config.origin, "https://flag.example");
        assert_eq!(config.cache_name, "from-file");
    }

    #[test]
    fn test_invalid_flag_origin_rejected() {
        let common = CommonArgs {
            origin: Some("nowhere".into()),
            ..CommonArgs::default()
        };
        assert!(load_config(&common).is_err());
    }
}
