// Session authentication
//
// `user.login` exchanges username/password for a session token that is
// attached to every later request. The token can optionally be written to
// a file readable only by the owner, for external tooling that shares the
// session.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, info};

use crate::client::ZabbixClient;
use crate::error::Error;

impl ZabbixClient {
    /// Authenticate with username/password and keep the session token.
    ///
    /// `POST user.login` with `{"user": ..., "password": ...}`
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        debug!(username, "logging in");

        let params = json!({
            "user": username,
            "password": password.expose_secret(),
        });

        let token: String = self
            .call_anonymous("user.login", &params)
            .await
            .map_err(|e| match e {
                Error::Rpc { message, data, .. } => Error::Authentication {
                    message: format!("{message} {data}").trim().to_owned(),
                },
                other => other,
            })?;

        self.set_session(SecretString::from(token));
        info!("authenticated to Zabbix");
        Ok(())
    }

    /// End the current session. A client without a session is a no-op.
    ///
    /// `POST user.logout` with `[]`
    pub async fn logout(&self) -> Result<(), Error> {
        if !self.is_authenticated() {
            return Ok(());
        }

        let _: bool = self.call("user.logout", &json!([])).await?;
        self.take_session();
        debug!("logout complete");
        Ok(())
    }

    /// Write the session token to `path`, replacing any previous content.
    ///
    /// On Unix the file is created with mode `0600`.
    pub fn write_session_file(&self, path: &Path) -> Result<(), Error> {
        use std::io::Write;

        let token = self.session_secret().ok_or(Error::NotAuthenticated)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(token.expose_secret().as_bytes())?;
        debug!(path = %path.display(), "session token written");
        Ok(())
    }
}
