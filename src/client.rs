//! Typed upload client for the analysis endpoint.
//!
//! Follows the same flow as the web page's upload script: pick one file,
//! send it as a multipart POST to `/analyze`, decode the JSON body whatever
//! the HTTP status, and collapse every failure into a single status line.
//! One submission at a time is the expected usage but nothing enforces it;
//! overlapping submits race exactly like the browser flow does.

use crate::error::UploadError;
use crate::pipeline::AnalysisResult;
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, UploadError>;

pub struct UploadClient {
    base_url: String,
    http: reqwest::Client,
    selected: Option<PathBuf>,
    status: String,
}

impl UploadClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            selected: None,
            status: String::new(),
        }
    }

    /// Replace the current selection with one file.
    pub fn select(&mut self, path: impl AsRef<Path>) {
        self.selected = Some(path.as_ref().to_path_buf());
    }

    /// Drop semantics: take the first candidate, silently ignore the rest.
    /// An empty drop leaves the current selection untouched.
    pub fn select_first<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        if let Some(first) = paths.into_iter().next() {
            self.select(first);
        }
    }

    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    /// The user-facing status line, updated by every submission step.
    pub fn status_line(&self) -> &str {
        &self.status
    }

    /// Submit the selected file for analysis. Every failure is terminal for
    /// this attempt only and lands in the status line as `Error: <message>`
    /// (or the selection prompt when nothing was chosen).
    pub async fn submit(&mut self) -> Result<AnalysisResult> {
        match self.try_submit().await {
            Ok(result) => {
                self.status = "Done.".to_string();
                Ok(result)
            }
            Err(err) => {
                tracing::error!("upload failed: {}", err);
                self.status = err.status_line();
                Err(err)
            }
        }
    }

    async fn try_submit(&mut self) -> Result<AnalysisResult> {
        let Some(path) = self.selected.clone() else {
            return Err(UploadError::NoFileSelected);
        };

        self.status = "Analyzing...".to_string();

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| UploadError::Transport(format!("cannot read {:?}: {}", path, e)))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/analyze", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        // Body is JSON for both outcomes; decode before branching on status
        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("Server error")
                .to_string();
            return Err(UploadError::Server { message });
        }

        serde_json::from_value(body).map_err(|e| UploadError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_without_selection_never_touches_network() {
        // Unroutable base URL: any network contact would error differently
        let mut client = UploadClient::new("http://127.0.0.1:1");
        let err = client.submit().await.unwrap_err();
        assert!(matches!(err, UploadError::NoFileSelected));
        assert_eq!(client.status_line(), "Please select an image.");
    }

    #[test]
    fn select_first_takes_only_the_first() {
        let mut client = UploadClient::new("http://localhost");
        client.select_first(["a.png", "b.png", "c.png"]);
        assert_eq!(client.selected(), Some(Path::new("a.png")));
    }

    #[test]
    fn empty_drop_keeps_existing_selection() {
        let mut client = UploadClient::new("http://localhost");
        client.select("chosen.png");
        client.select_first(Vec::<&str>::new());
        assert_eq!(client.selected(), Some(Path::new("chosen.png")));
    }

    #[test]
    fn later_selection_replaces_earlier() {
        let mut client = UploadClient::new("http://localhost");
        client.select("dialog.png");
        client.select_first(["dropped.png"]);
        assert_eq!(client.selected(), Some(Path::new("dropped.png")));
    }
}
