use secrecy::SecretSlice;
use std::path::PathBuf;

/// Deployment environment, drives cookie naming and the Secure attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    #[must_use]
    pub const fn is_prod(self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug)]
pub struct GlobalArgs {
    pub environment: Environment,
    pub session_key: SecretSlice<u8>,
    pub frontend_dir: PathBuf,
    pub frontend_dev_url: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(environment: Environment, session_key: SecretSlice<u8>) -> Self {
        Self {
            environment,
            session_key,
            frontend_dir: PathBuf::from("build"),
            frontend_dev_url: "http://localhost:4200".to_string(),
        }
    }

    pub fn set_frontend(&mut self, dir: PathBuf, dev_url: String) {
        self.frontend_dir = dir;
        self.frontend_dev_url = dev_url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let key = SecretSlice::from(vec![7u8; 64]);
        let args = GlobalArgs::new(Environment::Dev, key);
        assert_eq!(args.environment, Environment::Dev);
        assert_eq!(args.session_key.expose_secret().len(), 64);
        assert_eq!(args.frontend_dir, PathBuf::from("build"));
        assert_eq!(args.frontend_dev_url, "http://localhost:4200");
    }

    #[test]
    fn test_set_frontend() {
        let key = SecretSlice::from(vec![0u8; 64]);
        let mut args = GlobalArgs::new(Environment::Prod, key);
        args.set_frontend(PathBuf::from("dist"), "http://localhost:5173".to_string());
        assert!(args.environment.is_prod());
        assert_eq!(args.frontend_dir, PathBuf::from("dist"));
        assert_eq!(args.frontend_dev_url, "http://localhost:5173");
    }
}
