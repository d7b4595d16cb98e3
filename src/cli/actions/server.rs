use crate::api;
use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{Context, Result};
use rand::{rngs::OsRng, RngCore};
use secrecy::SecretSlice;
use std::{fs, path::Path, sync::Arc};
use tracing::warn;

const KEY_LEN: usize = 64;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            environment,
            key_file,
            frontend_dir,
            frontend_dev_url,
        } => {
            let key = load_or_create_key(&key_file)?;

            let mut globals = GlobalArgs::new(environment, key);
            globals.set_frontend(frontend_dir, frontend_dev_url);

            api::new(port, dsn, Arc::new(globals)).await?;
        }
    }

    Ok(())
}

/// Load the session signing key, creating a fresh one on first boot
fn load_or_create_key(path: &Path) -> Result<SecretSlice<u8>> {
    if path.exists() {
        let key = fs::read(path)
            .with_context(|| format!("Failed to read key file: {}", path.display()))?;

        if key.len() != KEY_LEN {
            anyhow::bail!(
                "Key file {} holds {} bytes, expected {KEY_LEN}",
                path.display(),
                key.len()
            );
        }

        return Ok(SecretSlice::from(key));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let mut key = vec![0_u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);

    fs::write(path, &key)
        .with_context(|| format!("Failed to write key file: {}", path.display()))?;

    warn!("Created new session key: {}", path.display());

    Ok(SecretSlice::from(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_key_created_then_reloaded() {
        let path = std::env::temp_dir().join(format!("pordisto-key-{}", uuid::Uuid::now_v7()));

        let first = load_or_create_key(&path).unwrap();
        assert_eq!(first.expose_secret().len(), KEY_LEN);

        let second = load_or_create_key(&path).unwrap();
        assert_eq!(first.expose_secret(), second.expose_secret());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_key_rejects_wrong_length() {
        let path = std::env::temp_dir().join(format!("pordisto-key-{}", uuid::Uuid::now_v7()));
        fs::write(&path, b"short").unwrap();

        let result = load_or_create_key(&path);
        assert!(result.is_err());

        let _ = fs::remove_file(&path);
    }
}
