//! Init command implementation

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use addonlint_core::LinterConfig;
use miette::{IntoDiagnostic, Result};
use tracing::info;

const DEFAULT_CONFIG: &str = r#"{
  // Lint as a privileged add-on
  "privileged": false,
  // The add-on is distributed outside the store
  "self_hosted": false,
  // Permission name to the minimum Firefox version it requires
  "restricted_permissions": {},
  "blocked_content_script_hosts": [],
  "restricted_homepage_urls": []
}
"#;

pub fn run_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(LinterConfig::CONFIG_FILES[0]);

    let mut file = match create_exclusive(&config_path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists && force => {
            remove_existing(&config_path)?;
            create_exclusive(&config_path).into_diagnostic()?
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(miette::miette!(
                "Config file already exists. Use --force to overwrite."
            ));
        }
        Err(e) => return Err(e).into_diagnostic(),
    };

    file.write_all(DEFAULT_CONFIG.as_bytes()).into_diagnostic()?;
    info!("Created {}", config_path.display());
    Ok(())
}

/// Creates a new file, refusing to follow a symlink at `path`.
fn create_exclusive(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOFOLLOW);
    }

    options.open(path)
}

fn remove_existing(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).into_diagnostic(),
    }
}
