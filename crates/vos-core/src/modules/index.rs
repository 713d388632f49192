//! Remote package index client.
//!
//! Wire contract: `GET <endpoint>/package/<name>` answers with
//! `{"status": "ok", "package": {name, version, download_url, filename}}`.
//! Any other status means the package does not exist.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use vos_types::config::PackageIndexConfig;
use vos_types::error::{Result, VosError};

/// One package as the index describes it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub download_url: String,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    status: String,
    #[serde(default)]
    package: Option<PackageRecord>,
}

/// Source of installable modules.
pub trait PackageIndex {
    /// Look a package up by name.
    fn lookup(&self, name: &str) -> Result<PackageRecord>;

    /// Download the artifact a record points at.
    fn fetch(&self, record: &PackageRecord) -> Result<Vec<u8>>;
}

/// Blocking HTTP client for the package index.
pub struct HttpPackageIndex {
    endpoint: Url,
    client: reqwest::blocking::Client,
}

impl HttpPackageIndex {
    pub fn new(config: &PackageIndexConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            VosError::Config(format!(
                "package_index.endpoint \"{}\": {e}",
                config.endpoint
            ))
        })?;
        Ok(Self {
            endpoint,
            client: http_client(config.timeout_secs)?,
        })
    }

    /// URL queried for `name`.
    pub fn package_url(&self, name: &str) -> Result<Url> {
        package_url(&self.endpoint, name)
    }
}

impl PackageIndex for HttpPackageIndex {
    fn lookup(&self, name: &str) -> Result<PackageRecord> {
        let url = self.package_url(name)?;
        log::debug!("package lookup: GET {url}");
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.text())
            .map_err(network)?;
        parse_response(name, &body)
    }

    fn fetch(&self, record: &PackageRecord) -> Result<Vec<u8>> {
        log::debug!("package download: GET {}", record.download_url);
        let resp = self
            .client
            .get(&record.download_url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(network)?;
        let bytes = resp.bytes().map_err(network)?;
        Ok(bytes.to_vec())
    }
}

/// Build a blocking client with a request timeout.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(network)
}

fn network(e: reqwest::Error) -> VosError {
    VosError::Network(e.to_string())
}

fn package_url(endpoint: &Url, name: &str) -> Result<Url> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|()| VosError::Config(format!("package index endpoint {endpoint} cannot take a path")))?
        .pop_if_empty()
        .push("package")
        .push(name);
    Ok(url)
}

/// Decode an index answer for `name`.
pub fn parse_response(name: &str, body: &str) -> Result<PackageRecord> {
    let response: IndexResponse = serde_json::from_str(body)?;
    match response {
        IndexResponse {
            status,
            package: Some(record),
        } if status == "ok" => {
            validate_filename(&record.filename)?;
            Ok(record)
        },
        _ => Err(VosError::Module(format!("package \"{name}\" does not exist"))),
    }
}

/// Artifact names must be plain `*.toml` file names.
pub fn validate_filename(filename: &str) -> Result<()> {
    let plain = !filename.is_empty()
        && !filename.contains(['/', '\\'])
        && !filename.contains("..")
        && filename.ends_with(".toml");
    if plain {
        Ok(())
    } else {
        Err(VosError::Module(format!(
            "refusing package file name \"{filename}\""
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_yields_record() {
        let body = r#"{"status":"ok","package":{"name":"web_module","version":"1.1",
            "download_url":"http://idx/files/web_module.toml","filename":"web_module.toml"}}"#;
        let record = parse_response("web_module", body).unwrap();
        assert_eq!(record.version, "1.1");
        assert_eq!(record.filename, "web_module.toml");
    }

    #[test]
    fn other_status_means_missing() {
        let body = r#"{"status":"not_found"}"#;
        let err = parse_response("ghost", body).unwrap_err();
        assert_eq!(err.to_string(), "module error: package \"ghost\" does not exist");
    }

    #[test]
    fn ok_without_package_means_missing() {
        assert!(matches!(
            parse_response("ghost", r#"{"status":"ok"}"#),
            Err(VosError::Module(_))
        ));
    }

    #[test]
    fn garbage_body_is_json_error() {
        assert!(matches!(
            parse_response("x", "<html>"),
            Err(VosError::Json(_))
        ));
    }

    #[test]
    fn unsafe_filenames_are_refused() {
        for bad in ["", "../evil.toml", "a/b.toml", "a\\b.toml", "mod.py", "..toml"] {
            assert!(validate_filename(bad).is_err(), "{bad:?}");
        }
        assert!(validate_filename("date_module.toml").is_ok());
    }

    #[test]
    fn package_url_encodes_name() {
        let endpoint = Url::parse("http://127.0.0.1:8080/").unwrap();
        let url = package_url(&endpoint, "Ethical Hacking Module").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8080/package/Ethical%20Hacking%20Module"
        );

        let nested = Url::parse("http://idx.local/api").unwrap();
        assert_eq!(
            package_url(&nested, "date_module").unwrap().as_str(),
            "http://idx.local/api/package/date_module"
        );
    }

    #[test]
    fn bad_endpoint_is_config_error() {
        let config = PackageIndexConfig {
            endpoint: "not a url".to_string(),
            timeout_secs: 1,
        };
        assert!(matches!(
            HttpPackageIndex::new(&config),
            Err(VosError::Config(_))
        ));
    }
}
