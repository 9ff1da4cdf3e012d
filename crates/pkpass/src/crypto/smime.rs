//! Signing through an external `openssl smime` process.
//!
//! The manifest bytes are handed over in a private temporary directory and the
//! DER signature is read back from it. The process is given a bounded amount
//! of time; when it overruns it is killed and the run fails.

use super::{Signer, SignerCredentials};
use crate::{Error, Result};
use secrecy::ExposeSecret;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Default bound on one signing invocation.
pub const DEFAULT_SIGNING_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable carrying the key passphrase to the child process.
const PASSPHRASE_ENV: &str = "PKPASS_SIGNING_PASSPHRASE";

/// Longest stderr excerpt quoted in an error.
const STDERR_LIMIT: usize = 4096;

/// Signs by running `openssl smime -binary -sign ... -outform DER`.
pub struct SmimeProcessSigner {
    credentials: SignerCredentials,
    program: PathBuf,
    timeout: Duration,
}

impl SmimeProcessSigner {
    pub fn new(credentials: SignerCredentials) -> Self {
        Self {
            credentials,
            program: PathBuf::from("openssl"),
            timeout: DEFAULT_SIGNING_TIMEOUT,
        }
    }

    /// Use a different `openssl` executable.
    pub fn program(mut self, program: impl AsRef<Path>) -> Self {
        self.program = program.as_ref().to_path_buf();
        self
    }

    /// Set the wait bound for the signing process.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["smime", "-binary", "-sign"])
            .arg("-certfile")
            .arg(&self.credentials.authority_certificate)
            .arg("-signer")
            .arg(&self.credentials.certificate)
            .arg("-inkey")
            .arg(&self.credentials.private_key)
            .arg("-in")
            .arg(input)
            .arg("-out")
            .arg(output)
            .args(["-outform", "DER"]);

        // The passphrase travels in the environment, never in argv.
        if let Some(ref password) = self.credentials.password {
            cmd.args(["-passin", &format!("env:{}", PASSPHRASE_ENV)])
                .env(PASSPHRASE_ENV, password.expose_secret());
        }
        cmd
    }
}

impl Signer for SmimeProcessSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let work = tempfile::Builder::new().prefix("pkpass-sign-").tempdir()?;
        let input = work.path().join("manifest.json");
        let output = work.path().join("signature");
        let stderr_path = work.path().join("stderr");
        fs::write(&input, data)?;

        let mut child = self
            .command(&input, &output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(File::create(&stderr_path)?)
            .spawn()
            .map_err(|e| Error::Signing(format!("failed to start {}: {}", self.program.display(), e)))?;

        tracing::debug!(program = %self.program.display(), "waiting for signing process");

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) if status.success() => {
                let signature = fs::read(&output)?;
                if signature.is_empty() {
                    return Err(Error::Signing(format!(
                        "{} produced an empty signature",
                        self.program.display()
                    )));
                }
                Ok(signature)
            }
            Ok(Some(status)) => Err(Error::Signing(format!(
                "{} exited with {}: {}",
                self.program.display(),
                status,
                read_stderr(&stderr_path)
            ))),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(Error::SigningTimeout(self.timeout))
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(e.into())
            }
        }
    }
}

fn read_stderr(path: &Path) -> String {
    let mut text = fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();
    if text.len() > STDERR_LIMIT {
        let mut cut = STDERR_LIMIT;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}
