//! Client-credentials bearer tokens for calls made on behalf of the process itself.
//!
//! Every authenticated call resolves a token through the configured [`TokenPolicy`]:
//! [`TokenPolicy::PerRequest`] exchanges credentials at the token endpoint for each call, while
//! [`TokenPolicy::Cached`] keeps the record in a [`TokenStore`] behind a single-flight guard and
//! revokes it when the downstream answers `401` to a request that carried it. A failed exchange
//! fails the call; the request is dropped without being sent.

// crates.io
use reqwest::header::HeaderValue;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, TokenRecord, TokenSecret},
	ext::{BearerSigner, RequestSignerExt},
	http::ReqwestHttpClient,
	oauth::ClientCredentialsFacade,
	obs::{self, AuthKind, AuthSpan},
	outbound::{AuthFuture, RequestAuthenticator, TokenMetrics, TokenPolicy},
	provider::{ProviderDescriptor, ProviderStrategy},
	store::{MemoryStore, StoreKey, TokenStore},
};

/// Credentials the process presents to the identity provider.
#[derive(Clone, Debug)]
pub struct ServiceCredentials {
	/// Identity provider descriptor.
	pub descriptor: ProviderDescriptor,
	/// OAuth client identifier.
	pub client_id: ClientId,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Scopes requested with each token (empty means provider default).
	pub scope: ScopeSet,
	/// Token reuse policy.
	pub policy: TokenPolicy,
}
impl ServiceCredentials {
	/// Credentials with no scope and the [`TokenPolicy::PerRequest`] policy.
	pub fn new(
		descriptor: ProviderDescriptor,
		client_id: ClientId,
		client_secret: impl Into<String>,
	) -> Self {
		Self {
			descriptor,
			client_id,
			client_secret: TokenSecret::new(client_secret),
			scope: ScopeSet::default(),
			policy: TokenPolicy::default(),
		}
	}

	/// Requests `scope` with every token.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Overrides the token reuse policy.
	pub fn with_policy(mut self, policy: TokenPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Key under which cached tokens for these credentials are stored.
	pub fn store_key(&self) -> StoreKey {
		StoreKey::new(&self.descriptor.id, &self.client_id, &self.scope)
	}
}

/// Attaches client-credentials bearer tokens to outbound requests.
pub struct ServiceCredentialAuthenticator {
	credentials: ServiceCredentials,
	facade: ClientCredentialsFacade,
	strategy: Arc<dyn ProviderStrategy>,
	store: Arc<dyn TokenStore>,
	singleflight: AsyncMutex<()>,
	metrics: Arc<TokenMetrics>,
}
impl ServiceCredentialAuthenticator {
	/// Creates an authenticator that exchanges `credentials` over `http_client`.
	///
	/// Cached policies use a private [`MemoryStore`] unless [`with_store`](Self::with_store)
	/// supplies a shared one.
	pub fn new(
		credentials: ServiceCredentials,
		http_client: ReqwestHttpClient,
		strategy: Arc<dyn ProviderStrategy>,
	) -> Result<Self> {
		let facade = ClientCredentialsFacade::new(&credentials, http_client)?;

		Ok(Self {
			credentials,
			facade,
			strategy,
			store: Arc::new(MemoryStore::default()),
			singleflight: AsyncMutex::new(()),
			metrics: Default::default(),
		})
	}

	/// Replaces the token store used by cached policies.
	pub fn with_store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.store = store;

		self
	}

	/// Configured credentials.
	pub fn credentials(&self) -> &ServiceCredentials {
		&self.credentials
	}

	/// Token counters for this authenticator.
	pub fn metrics(&self) -> &TokenMetrics {
		&self.metrics
	}

	/// Exchanges the credentials for a new token, bypassing any cache.
	pub async fn fetch_token(&self) -> Result<TokenRecord> {
		self.tracked(self.exchange()).await
	}

	/// Resolves the token for the next outbound call according to the policy.
	pub async fn current_token(&self) -> Result<TokenRecord> {
		self.tracked(async {
			match self.credentials.policy {
				TokenPolicy::PerRequest => self.exchange().await,
				TokenPolicy::Cached { .. } => self.cached_token().await,
			}
		})
		.await
	}

	/// Revokes the cached token so the next call fetches a fresh one.
	pub async fn invalidate(&self) -> Result<()> {
		if self.credentials.policy.is_cached() {
			let key = self.credentials.store_key();
			let _singleflight = self.singleflight.lock().await;

			self.store.revoke(&key, OffsetDateTime::now_utc()).await?;
		}

		Ok(())
	}

	/// Revokes the cached token only if it is the one `rejected` carried.
	///
	/// Returns `true` when a record was revoked. A newer token stored by a concurrent caller
	/// after the rejected request went out stays cached.
	pub async fn invalidate_rejected(&self, rejected: &HeaderValue) -> Result<bool> {
		if !self.credentials.policy.is_cached() {
			return Ok(false);
		}

		let key = self.credentials.store_key();
		let _singleflight = self.singleflight.lock().await;
		let stale = self.store.fetch(&key).await?.is_some_and(|record| {
			!record.is_revoked() && record.access_token.is_bearer_of(rejected)
		});

		if stale {
			self.store.revoke(&key, OffsetDateTime::now_utc()).await?;
		}

		Ok(stale)
	}

	async fn cached_token(&self) -> Result<TokenRecord> {
		let key = self.credentials.store_key();
		let _singleflight = self.singleflight.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some(current) = self
			.store
			.fetch(&key)
			.await?
			.filter(|record| !self.credentials.policy.should_refresh(record, now))
		{
			self.metrics.record_cache_hit();
			obs::log_token_source(&self.credentials.descriptor.id, true);

			return Ok(current);
		}

		let record = self.exchange().await?;

		self.store.save(record.clone()).await?;

		Ok(record)
	}

	async fn exchange(&self) -> Result<TokenRecord> {
		let provider = &self.credentials.descriptor.id;

		self.metrics.record_fetch();
		obs::log_token_source(provider, false);

		AuthSpan::token(provider)
			.instrument(self.facade.exchange(&self.credentials, self.strategy.as_ref()))
			.await
	}

	async fn tracked<F>(&self, fut: F) -> Result<TokenRecord>
	where
		F: Future<Output = Result<TokenRecord>>,
	{
		let result = fut.await;

		if result.is_err() {
			self.metrics.record_failure();
		}

		result
	}
}
impl RequestAuthenticator for ServiceCredentialAuthenticator {
	fn kind(&self) -> AuthKind {
		AuthKind::ServiceCredential
	}

	fn authenticate(&self, request: ReqwestRequest) -> AuthFuture<'_> {
		Box::pin(async move {
			let record = self.current_token().await?;

			Ok(BearerSigner.attach_token(request, &record)?)
		})
	}

	fn on_unauthorized<'a>(
		&'a self,
		sent: Option<&'a HeaderValue>,
	) -> Pin<Box<dyn Future<Output = ()> + 'a + Send>> {
		Box::pin(async move {
			let Some(rejected) = sent else {
				return;
			};

			if let Err(e) = self.invalidate_rejected(rejected).await {
				obs::log_invalidation_failure(&e);
			}
		})
	}
}
impl Debug for ServiceCredentialAuthenticator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceCredentialAuthenticator")
			.field("credentials", &self.credentials)
			.field("metrics", &self.metrics)
			.finish()
	}
}
