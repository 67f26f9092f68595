//! Store URL parsing
//!
//! A store URL names an S3-compatible endpoint, the credentials used against it,
//! and the location/bucket pair holding the logs:
//!
//! ```text
//! s3://access_key_id:secret_access_key@host[:port]/location/bucket_name?ssl=true
//! ```

use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{Error, Result};

/// Example shown in every path-related configuration error
const URL_EXAMPLE: &str = "s3://s3.com/us-east-1/my_bucket";

/// Connection settings derived from a store URL
#[derive(Clone, PartialEq, Eq)]
pub struct StoreUrl {
    /// URL scheme as written (usually "s3")
    pub scheme: String,

    /// Endpoint host, including the port when one was given
    pub endpoint: String,

    /// Access key ID (empty for anonymous access)
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Connect over TLS
    pub use_ssl: bool,

    /// Bucket location / region
    pub location: String,

    /// Bucket holding the logs
    pub bucket: String,
}

impl StoreUrl {
    /// Parse a store URL
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)?;

        let endpoint = match (url.host_str(), url.port()) {
            (None, _) | (Some(""), _) => {
                return Err(Error::Config(format!(
                    "must provide a host in s3 api url. e.g. {URL_EXAMPLE}"
                )));
            }
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
        };

        let access_key = decode_userinfo(url.username())?;
        let secret_key = url
            .password()
            .map(decode_userinfo)
            .transpose()?
            .unwrap_or_default();

        let use_ssl = url
            .query_pairs()
            .find(|(k, _)| k == "ssl")
            .is_some_and(|(_, v)| v == "true");

        let (location, bucket) = parse_location_and_bucket(url.path())?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            endpoint,
            access_key,
            secret_key,
            use_ssl,
            location,
            bucket,
        })
    }

    /// HTTP(S) endpoint URL for the SDK client
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{scheme}://{}", self.endpoint)
    }

    /// Whether the URL carries no credentials
    pub fn is_anonymous(&self) -> bool {
        self.access_key.is_empty()
    }

    /// URL text with the secret key masked, safe for logs and terminal output
    pub fn redacted(&self) -> String {
        let userinfo = if self.is_anonymous() {
            String::new()
        } else {
            format!("{}:****@", self.access_key)
        };
        format!(
            "{}://{userinfo}{}/{}/{}?ssl={}",
            self.scheme, self.endpoint, self.location, self.bucket, self.use_ssl
        )
    }
}

impl FromStr for StoreUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Debug for StoreUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreUrl")
            .field("scheme", &self.scheme)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"****")
            .field("use_ssl", &self.use_ssl)
            .field("location", &self.location)
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl fmt::Display for StoreUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

fn decode_userinfo(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| Error::Config(format!("credentials in s3 api url are not valid UTF-8: {e}")))
}

/// Split "/location/bucket" into its two segments
fn parse_location_and_bucket(path: &str) -> Result<(String, String)> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);

    let Some((location, bucket)) = path.split_once('/') else {
        return Err(Error::Config(format!(
            "must provide bucket name and region in path of s3 api url. e.g. {URL_EXAMPLE}"
        )));
    };

    if location.is_empty() {
        return Err(Error::Config(format!(
            "must provide non-empty location in path of s3 api url. e.g. {URL_EXAMPLE}"
        )));
    }
    if bucket.is_empty() {
        return Err(Error::Config(format!(
            "must provide non-empty bucket name in path of s3 api url. e.g. {URL_EXAMPLE}"
        )));
    }
    if bucket.contains('/') {
        return Err(Error::Config(format!(
            "path of s3 api url must contain exactly a location and a bucket name. e.g. {URL_EXAMPLE}"
        )));
    }

    Ok((location.to_string(), bucket.to_string()))
}
