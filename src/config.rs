//! Client configuration: API base, refresh and login locations, credential keys, expiry leeway.

// self
use crate::{_prelude::*, error::ConfigError};

/// Default refresh endpoint path, relative to the API base.
pub const DEFAULT_REFRESH_PATH: &str = "/api/refresh-token";
/// Default login location, relative to the API base.
pub const DEFAULT_LOGIN_PATH: &str = "/login";
/// Default store key for the access token.
pub const DEFAULT_ACCESS_KEY: &str = "access_token";
/// Default store key for the refresh token.
pub const DEFAULT_REFRESH_KEY: &str = "refresh_token";
/// Largest accepted expiry leeway.
pub const MAX_EXPIRY_LEEWAY: Duration = Duration::DAY;

/// Store key names for the two session credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialKeys {
	/// Key holding the access token.
	pub access: String,
	/// Key holding the refresh token.
	pub refresh: String,
}
impl Default for CredentialKeys {
	fn default() -> Self {
		Self { access: DEFAULT_ACCESS_KEY.into(), refresh: DEFAULT_REFRESH_KEY.into() }
	}
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
	/// Absolute base URL every request path is resolved against.
	pub base_url: Url,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Absolute login location used by the redirect side effect.
	pub login_url: Url,
	/// Credential store keys.
	pub keys: CredentialKeys,
	/// Tokens expiring within this window are refreshed before dispatch.
	pub expiry_leeway: Duration,
}
impl ClientConfig {
	/// Starts a builder for the given API base URL.
	pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Builds a configuration with every default applied.
	pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
		Self::builder(base_url).build()
	}

	/// Parses a JSON configuration document.
	///
	/// Only `base_url` is required; every other field falls back to its default.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let doc: ConfigDocument =
			serde_path_to_error::deserialize(de).map_err(ConfigError::Parse)?;
		let mut builder = Self::builder(doc.base_url);

		if let Some(path) = doc.refresh_path {
			builder = builder.refresh_path(path);
		}
		if let Some(path) = doc.login_path {
			builder = builder.login_path(path);
		}
		if let Some(keys) = doc.keys {
			builder = builder.credential_keys(keys.access, keys.refresh);
		}
		if let Some(secs) = doc.expiry_leeway_secs {
			builder = builder.expiry_leeway(Duration::seconds(secs));
		}

		builder.build()
	}

	/// Resolves `path` against the base URL, keeping any base path prefix.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		join_path(&self.base_url, path)
	}

	/// Absolute refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.refresh_path)
	}
}

/// Builder for [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	base_url: String,
	refresh_path: String,
	login_path: String,
	keys: CredentialKeys,
	expiry_leeway: Duration,
}
impl ClientConfigBuilder {
	fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			refresh_path: DEFAULT_REFRESH_PATH.into(),
			login_path: DEFAULT_LOGIN_PATH.into(),
			keys: CredentialKeys::default(),
			expiry_leeway: Duration::ZERO,
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login location path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the credential store keys.
	pub fn credential_keys(mut self, access: impl Into<String>, refresh: impl Into<String>) -> Self {
		self.keys = CredentialKeys { access: access.into(), refresh: refresh.into() };

		self
	}

	/// Refreshes tokens this long before their `exp` (defaults to zero, at most one day).
	pub fn expiry_leeway(mut self, leeway: Duration) -> Self {
		self.expiry_leeway = leeway;

		self
	}

	/// Validates the inputs and produces a [`ClientConfig`].
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url = Url::parse(&self.base_url)
			.map_err(|source| ConfigError::InvalidUrl { value: self.base_url.clone(), source })?;

		if !matches!(base_url.scheme(), "http" | "https")
			|| base_url.host_str().is_none()
			|| base_url.cannot_be_a_base()
		{
			return Err(ConfigError::UnsupportedBaseUrl(self.base_url));
		}
		if self.keys.access.is_empty() {
			return Err(ConfigError::EmptyCredentialKey { which: "access" });
		}
		if self.keys.refresh.is_empty() {
			return Err(ConfigError::EmptyCredentialKey { which: "refresh" });
		}
		if self.keys.access == self.keys.refresh {
			return Err(ConfigError::DuplicateCredentialKey);
		}
		if self.expiry_leeway.is_negative() {
			return Err(ConfigError::NegativeLeeway);
		}
		if self.expiry_leeway > MAX_EXPIRY_LEEWAY {
			return Err(ConfigError::LeewayTooLarge {
				secs: self.expiry_leeway.whole_seconds(),
				max_secs: MAX_EXPIRY_LEEWAY.whole_seconds(),
			});
		}

		let login_url = join_path(&base_url, &self.login_path)?;

		join_path(&base_url, &self.refresh_path)?;

		Ok(ClientConfig {
			base_url,
			refresh_path: self.refresh_path,
			login_url,
			keys: self.keys,
			expiry_leeway: self.expiry_leeway,
		})
	}
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDocument {
	base_url: String,
	#[serde(default)]
	refresh_path: Option<String>,
	#[serde(default)]
	login_path: Option<String>,
	#[serde(default)]
	keys: Option<CredentialKeys>,
	#[serde(default)]
	expiry_leeway_secs: Option<i64>,
}

fn join_path(base: &Url, path: &str) -> Result<Url, ConfigError> {
	let raw = format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));

	Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { value: raw, source })
}
